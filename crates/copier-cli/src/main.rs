//! # file-copier CLI
//!
//! Command-line entry point for the webhook-driven file replicator.

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;
mod runtime_config;

/// file-copier - webhook-driven file replicator
#[derive(Parser, Debug)]
#[command(name = "file-copier")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Increase verbosity
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Start the webhook HTTP server (default).
    Serve,

    /// Validate a configuration document (local path or directory)
    /// without starting the server.
    CheckConfig {
        /// Path to the main document, or a directory containing
        /// `copier.yaml`.
        path: PathBuf,
    },

    /// Run the matcher/transformer against a literal list of file paths,
    /// printing would-be destinations without touching any host.
    DryRun {
        /// Path to the main document, or a directory containing
        /// `copier.yaml`.
        config: PathBuf,
        /// Changed file paths to match against.
        files: Vec<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command.unwrap_or(Commands::Serve) {
        Commands::Serve => commands::serve().await,
        Commands::CheckConfig { path } => commands::check_config(&path).await,
        Commands::DryRun { config, files } => commands::dry_run(&config, &files).await,
    }
}

/// Wires up `tracing-subscriber` (§6 "toggle flags for cloud logging and
/// debug"): `-v`/`-vv` and `COPIER_DEBUG` both raise the default level, and
/// `COPIER_CLOUD_LOGGING` switches the formatter to single-line JSON
/// records instead of `guts-cli`'s plain terminal layer, matching what a
/// log-aggregating sink expects.
fn init_tracing(verbose: u8) {
    let debug_env = matches!(std::env::var("COPIER_DEBUG").as_deref(), Ok("1") | Ok("true") | Ok("TRUE"));
    let log_level = match (verbose, debug_env) {
        (0, false) => "info",
        (1, _) | (0, true) => "debug",
        _ => "trace",
    };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| format!("file_copier={log_level},copier={log_level}").into());

    let cloud_logging = matches!(std::env::var("COPIER_CLOUD_LOGGING").as_deref(), Ok("1") | Ok("true") | Ok("TRUE"));
    if cloud_logging {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json().flatten_event(true))
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }
}
