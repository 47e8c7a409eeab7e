//! proctorcache - command line monitor for exam assessments and submissions.
//!
//! Loads a JSON seed database into the in-memory store and runs the table,
//! query cache, mutation and polling layers of `proctorcache-core` over it.

mod cli;
mod commands;
mod output;

use std::io;
use std::path::Path;

use anyhow::Result;
use clap::Parser;
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use cli::Cli;
use proctorcache_core::Config;

/// Prefix of the daily rolling log files
const LOG_FILE_PREFIX: &str = "proctorcache.log";

/// Initialize the tracing subscriber for logging.
///
/// Logs go to stderr, or to a daily rolling file under `log_dir`. The
/// returned guard must live until exit so buffered lines are flushed.
fn init_tracing(log_dir: Option<&Path>) -> Option<WorkerGuard> {
    // Use RUST_LOG env var to control log level (e.g., RUST_LOG=debug)
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    match log_dir {
        Some(dir) => {
            let appender = tracing_appender::rolling::daily(dir, LOG_FILE_PREFIX);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            tracing_subscriber::registry()
                .with(fmt::layer().with_writer(writer).with_ansi(false))
                .with(filter)
                .init();
            Some(guard)
        }
        None => {
            tracing_subscriber::registry()
                .with(fmt::layer().with_writer(io::stderr))
                .with(filter)
                .init();
            None
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (silently ignore if not found)
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();
    let _guard = init_tracing(cli.log_dir.as_deref());
    info!("proctorcache starting");

    let mut config = Config::load()?;
    if let Some(data) = cli.data {
        config.data_path = data;
    }

    let result = commands::run(cli.command, config).await;
    if let Err(e) = &result {
        tracing::error!(error = %e, "Command failed");
    }
    result
}
