// file: src/config.rs
// description: application configuration management with toml support
// reference: https://docs.rs/config

use crate::channels::{ChannelKind, MalformedPolicy, ReconcileOptions};
use crate::error::{Result, ZowieError};
use crate::utils::Validator;
use chrono::{DateTime, Local};
use dotenvy::dotenv;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const DEFAULT_CONFIG_FILE: &str = "zowie.toml";
pub const DEFAULT_API_BASE: &str = "https://api.zotero.org";

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    pub zotero: ZoteroConfig,
    pub scan: ScanConfig,
    pub writer: WriterConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ZoteroConfig {
    pub api_base: String,
    pub timeout_secs: u64,
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default)]
    pub user_id: Option<String>,
    #[serde(default = "default_true")]
    pub use_keyring: bool,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ScanConfig {
    pub extensions: Vec<String>,
    pub skip_hidden: bool,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct WriterConfig {
    pub methods: Vec<ChannelKind>,
    #[serde(default)]
    pub malformed_policy: MalformedPolicy,
}

/// Settings for one run, after command-line values have been applied.
/// Built once in `main` and only read afterwards.
#[derive(Debug, Clone)]
pub struct RunConfig {
    pub inputs: Vec<PathBuf>,
    pub channels: Vec<ChannelKind>,
    pub scan: ScanConfig,
    pub reconcile: ReconcileOptions,
    pub dry_run: bool,
    pub after_date: Option<DateTime<Local>>,
}

fn default_true() -> bool {
    true
}

impl Config {
    /// Layers built-in defaults, the TOML file (when present) and `ZOWIE__*`
    /// environment variables, in that order.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        dotenv().ok();

        let defaults = config::Config::try_from(&Self::default_config())
            .map_err(|e| ZowieError::Config(e.to_string()))?;

        let mut builder = config::Config::builder().add_source(defaults);

        if let Some(path) = path {
            builder = builder.add_source(config::File::from(path));
        } else {
            builder = builder
                .add_source(config::File::from(Path::new(DEFAULT_CONFIG_FILE)).required(false));
        }

        builder = builder.add_source(
            config::Environment::with_prefix("ZOWIE")
                .separator("__")
                .list_separator(",")
                .with_list_parse_key("scan.extensions")
                .with_list_parse_key("writer.methods")
                .try_parsing(true),
        );

        let settings = builder
            .build()
            .map_err(|e| ZowieError::Config(e.to_string()))?;

        let config: Config = settings
            .try_deserialize()
            .map_err(|e| ZowieError::Config(e.to_string()))?;

        config.validate()?;
        Ok(config)
    }

    pub fn default_config() -> Self {
        Self {
            zotero: ZoteroConfig {
                api_base: DEFAULT_API_BASE.to_string(),
                timeout_secs: 30,
                api_key: None,
                user_id: None,
                use_keyring: true,
            },
            scan: ScanConfig {
                extensions: vec!["pdf".to_string()],
                skip_hidden: true,
            },
            writer: WriterConfig {
                methods: vec![ChannelKind::FinderComment],
                malformed_policy: MalformedPolicy::Deny,
            },
        }
    }

    fn validate(&self) -> Result<()> {
        if self.zotero.timeout_secs == 0 {
            return Err(ZowieError::Config(
                "timeout_secs must be greater than 0".to_string(),
            ));
        }

        Validator::validate_url(&self.zotero.api_base)
            .map_err(|e| ZowieError::Config(format!("zotero.api_base: {}", e)))?;

        if self.scan.extensions.iter().all(|e| e.trim().is_empty()) {
            return Err(ZowieError::Config(
                "scan.extensions must name at least one extension".to_string(),
            ));
        }

        if self.writer.methods.is_empty() {
            return Err(ZowieError::Config(
                "writer.methods must name at least one method".to_string(),
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_default_config_is_valid() {
        let config = Config::default_config();
        assert!(config.validate().is_ok());
        assert_eq!(config.writer.methods, vec![ChannelKind::FinderComment]);
        assert_eq!(config.writer.malformed_policy, MalformedPolicy::Deny);
    }

    #[test]
    fn test_load_partial_file_over_defaults() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("zowie.toml");
        fs::write(
            &path,
            r#"
[writer]
methods = ["wherefrom", "pdfsubject"]
malformed_policy = "normalize"

[scan]
extensions = ["pdf", "epub"]
"#,
        )
        .unwrap();

        let config = Config::load(Some(&path)).unwrap();
        assert_eq!(
            config.writer.methods,
            vec![ChannelKind::WhereFrom, ChannelKind::PdfSubject]
        );
        assert_eq!(config.writer.malformed_policy, MalformedPolicy::Normalize);
        assert_eq!(config.scan.extensions, vec!["pdf", "epub"]);
        assert_eq!(config.zotero.api_base, DEFAULT_API_BASE);
    }

    #[test]
    fn test_unknown_method_is_rejected() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("zowie.toml");
        fs::write(&path, "[writer]\nmethods = [\"tags\"]\n").unwrap();

        assert!(matches!(Config::load(Some(&path)), Err(ZowieError::Config(_))));
    }

    #[test]
    fn test_zero_timeout_is_rejected() {
        let mut config = Config::default_config();
        config.zotero.timeout_secs = 0;
        assert!(config.validate().is_err());
    }
}
