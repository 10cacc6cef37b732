// file: src/main.rs
// description: commandline application entry point with exit code mapping
// reference: application bootstrap and orchestration

use anyhow::{Context, Result};
use chrono::Local;
use clap::Parser;
use std::path::PathBuf;
use tracing::{debug, info};
use zowie::channels::{ChannelKind, MalformedPolicy, ReconcileOptions};
use zowie::utils::Verbosity;
use zowie::utils::logging::{format_error, format_info, format_success, format_warning, init_logger};
use zowie::zotero::{CredentialStore, TerminalPrompter, default_store, resolve_credentials};
use zowie::{
    Config, ExitCode, Interrupt, Orchestrator, RunConfig, RunReport, Validator, ZoteroClient,
    ZowieError, parse_after_date,
};

#[derive(Parser)]
#[command(name = "zowie")]
#[command(version)]
#[command(
    about = "Write Zotero select links into the metadata of Zotero attachment files",
    long_about = None
)]
struct Cli {
    /// Zotero API key
    #[arg(short = 'a', long, value_name = "KEY")]
    api_key: Option<String>,

    /// Zotero user ID
    #[arg(short = 'i', long, value_name = "ID")]
    identifier: Option<String>,

    /// Do not read or store credentials in the credential store (requires -a and -i)
    #[arg(short = 'K', long)]
    no_keyring: bool,

    /// List the available methods and exit
    #[arg(short = 'l', long)]
    list: bool,

    /// Comma-separated list of methods to use
    #[arg(short = 'm', long, value_name = "METHODS")]
    method: Option<String>,

    /// Report what would be done without changing any file
    #[arg(short = 'n', long)]
    dry_run: bool,

    /// Replace existing values instead of keeping their content
    #[arg(short = 'o', long)]
    overwrite: bool,

    /// Only process files modified on or after DATE
    #[arg(short = 'd', long, value_name = "DATE")]
    after_date: Option<String>,

    /// Add the link in front of unparseable "where from" values instead of skipping them
    #[arg(long)]
    normalize_malformed: bool,

    /// Only print warnings and errors
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Print debug output
    #[arg(short, long)]
    verbose: bool,

    /// Do not color the output
    #[arg(short = 'C', long)]
    no_color: bool,

    /// Configuration file (default: ./zowie.toml when present)
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Files and directories to process
    #[arg(value_name = "FILES")]
    files: Vec<PathBuf>,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> std::process::ExitCode {
    let cli = Cli::parse();
    let verbosity = Verbosity::from_flags(cli.quiet, cli.verbose);

    init_logger(!cli.no_color, verbosity);

    if cli.list {
        print_methods();
        return ExitCode::Success.into();
    }

    let code = match run(cli).await {
        Ok(report) => {
            if verbosity != Verbosity::Quiet {
                println!("{}", format_info(&report.summary()));
                println!("{}", format_success("Done."));
            }
            ExitCode::Success
        }
        Err(error) => report_error(&error),
    };

    code.into()
}

async fn run(cli: Cli) -> Result<RunReport> {
    let config = Config::load(cli.config.as_deref()).context("Failed to load configuration")?;

    Validator::validate_not_option_like(&cli.files)?;
    if cli.files.is_empty() {
        return Err(ZowieError::BadArgument(
            "No files or directories given (see --help for usage)".to_string(),
        )
        .into());
    }

    let channels = match cli.method.as_deref() {
        Some(list) => ChannelKind::parse_list(list).map_err(ZowieError::BadArgument)?,
        None => config.writer.methods.clone(),
    };

    let after_date = cli
        .after_date
        .as_deref()
        .map(|date| parse_after_date(date, Local::now()))
        .transpose()
        .map_err(ZowieError::BadArgument)?;

    let malformed_policy = if cli.normalize_malformed {
        MalformedPolicy::Normalize
    } else {
        config.writer.malformed_policy
    };

    let run_config = RunConfig {
        inputs: cli.files,
        channels,
        scan: config.scan.clone(),
        reconcile: ReconcileOptions {
            overwrite: cli.overwrite,
            malformed_policy,
        },
        dry_run: cli.dry_run,
        after_date,
    };
    debug!("Run configuration: {:?}", run_config);

    let mut store = default_store();
    let store: Option<&mut dyn CredentialStore> = if !cli.no_keyring && config.zotero.use_keyring {
        Some(store.as_mut())
    } else {
        None
    };
    let credential = resolve_credentials(
        cli.api_key.or_else(|| config.zotero.api_key.clone()),
        cli.identifier.or_else(|| config.zotero.user_id.clone()),
        store,
        &TerminalPrompter,
    )?;

    let interrupt = Interrupt::new();
    interrupt.listen();

    let client = ZoteroClient::new(&config.zotero, &credential)?;
    info!("Using Zotero API at {}", config.zotero.api_base);

    let report = Orchestrator::new(run_config, client, interrupt).run().await?;
    Ok(report)
}

fn print_methods() {
    println!("Known methods:");
    for kind in ChannelKind::ALL {
        println!("  {:<14} {}", kind.name(), kind.channel().description());
    }
    println!("Default: {}", ChannelKind::FinderComment);
}

fn report_error(error: &anyhow::Error) -> ExitCode {
    match error.downcast_ref::<ZowieError>() {
        Some(ZowieError::Interrupted) => {
            eprintln!("{}", format_warning("Interrupted."));
            ExitCode::UserInterrupt
        }
        Some(zowie_error) => {
            eprintln!("{}", format_error(&format!("{:#}", error)));
            zowie_error.exit_code()
        }
        None => {
            eprintln!("{}", format_error(&format!("Unexpected error: {:#}", error)));
            ExitCode::Exception
        }
    }
}
