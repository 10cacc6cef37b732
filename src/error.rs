// file: src/error.rs
// description: Custom error types, result type aliases and process exit codes
// reference: https://docs.rs/thiserror

use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, ZowieError>;

/// Run-level failures. Anything that reaches `main` as a `ZowieError` ends
/// the run with the matching exit code.
#[derive(Error, Debug)]
pub enum ZowieError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("{0}")]
    BadArgument(String),

    #[error("No network connection: {0}")]
    NoNetwork(String),

    #[error("Unable to connect to Zotero: {0}")]
    Auth(String),

    #[error("Zotero server error: {0}")]
    Server(String),

    #[error("Credential store error: {0}")]
    Credentials(String),

    #[error("File operation failed for {path}: {source}")]
    FileOperation {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Interrupted")]
    Interrupted,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl ZowieError {
    pub fn exit_code(&self) -> ExitCode {
        match self {
            ZowieError::Config(_) | ZowieError::BadArgument(_) | ZowieError::Validation(_) => {
                ExitCode::BadArg
            }
            ZowieError::Auth(_) | ZowieError::Credentials(_) => ExitCode::BadArg,
            ZowieError::NoNetwork(_) => ExitCode::NoNetwork,
            ZowieError::Server(_) => ExitCode::ServerError,
            ZowieError::FileOperation { .. } | ZowieError::Io(_) => ExitCode::FileError,
            ZowieError::Interrupted => ExitCode::UserInterrupt,
        }
    }
}

/// Failures confined to one (file, channel) pair. These never abort a run.
#[derive(Error, Debug)]
pub enum ChannelError {
    #[error("cannot access {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("malformed value in {attribute} of {path}: {message}")]
    Malformed {
        path: PathBuf,
        attribute: &'static str,
        message: String,
    },

    #[error("PDF error in {path}: {message}")]
    Pdf { path: PathBuf, message: String },

    #[error("AppleScript call failed for {path}: {message}")]
    Script { path: PathBuf, message: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitCode {
    Success = 0,
    UserInterrupt = 1,
    BadArg = 2,
    NoNetwork = 3,
    FileError = 4,
    ServerError = 5,
    Exception = 6,
}

impl From<ExitCode> for std::process::ExitCode {
    fn from(code: ExitCode) -> Self {
        std::process::ExitCode::from(code as u8)
    }
}
