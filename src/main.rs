//! feishu2md command line
//!
//! Downloads Feishu/Lark documents, wiki spaces, drive folders and Bitable
//! tables as Markdown, CSV or XLSX, and keeps a configured set of documents
//! in sync.

mod commands;

use std::process::ExitCode;

use clap::{Parser, Subcommand};
use core_runtime::logging::{init_logging, LogFormat, LoggingConfig};
use tracing::error;

#[derive(Parser, Debug)]
#[command(name = "feishu2md", version, about, long_about = None)]
struct Cli {
    /// Log output format: compact, pretty or json
    #[arg(long, global = true, default_value = "compact", env = "FEISHU2MD_LOG_FORMAT")]
    log_format: LogFormat,

    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Show or update the application config (credentials, output options)
    Config(commands::config::ConfigArgs),

    /// Download a document, a drive folder or a whole wiki space as Markdown
    Download(commands::download::DownloadArgs),

    /// Export a Bitable table as CSV or XLSX
    Export(commands::export::ExportArgs),

    /// Manage and sync documents listed in a configuration file
    #[command(subcommand)]
    Sync(commands::sync::SyncCommand),

    /// Merge downloaded Markdown files into a single document
    Merge(commands::merge::MergeArgs),
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let logging = LoggingConfig::from_verbosity(cli.verbose).with_format(cli.log_format);
    if let Err(e) = init_logging(logging) {
        eprintln!("Failed to initialize logging: {}", e);
    }

    let result = match cli.command {
        Commands::Config(args) => commands::config::run(args),
        Commands::Download(args) => commands::download::run(args).await,
        Commands::Export(args) => commands::export::run(args).await,
        Commands::Sync(command) => commands::sync::run(command).await,
        Commands::Merge(args) => commands::merge::run(args),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, "Command failed");
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}
