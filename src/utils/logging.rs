// file: src/utils/logging.rs
// description: Tracing subscriber initialization with optional ANSI coloring

use colored::*;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verbosity {
    Quiet,
    Normal,
    Verbose,
}

impl Verbosity {
    pub fn from_flags(quiet: bool, verbose: bool) -> Self {
        if verbose {
            Verbosity::Verbose
        } else if quiet {
            Verbosity::Quiet
        } else {
            Verbosity::Normal
        }
    }

    pub fn level(&self) -> &'static str {
        match self {
            Verbosity::Quiet => "warn",
            Verbosity::Normal => "info",
            Verbosity::Verbose => "debug",
        }
    }
}

/// `RUST_LOG` wins over the level picked from the command line.
pub fn init_logger(colored_output: bool, verbosity: Verbosity) {
    colored::control::set_override(colored_output);

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(verbosity.level()));

    let fmt_layer = fmt::layer()
        .with_target(false)
        .with_thread_ids(false)
        .with_thread_names(false)
        .with_file(verbosity == Verbosity::Verbose)
        .with_line_number(verbosity == Verbosity::Verbose)
        .without_time()
        .compact()
        .with_ansi(colored_output)
        .with_writer(std::io::stderr);

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt_layer)
        .init();
}

pub fn format_success(msg: &str) -> String {
    format!("{} {}", "✓".green().bold(), msg.green())
}

pub fn format_error(msg: &str) -> String {
    format!("{} {}", "✗".red().bold(), msg.red())
}

pub fn format_warning(msg: &str) -> String {
    format!("{} {}", "⚠".yellow().bold(), msg.yellow())
}

pub fn format_info(msg: &str) -> String {
    format!("{} {}", "ℹ".blue().bold(), msg)
}

pub fn format_step(step: usize, total: usize, msg: &str) -> String {
    format!("{} {}", format!("[{}/{}]", step, total).cyan().bold(), msg)
}
