//! Command line argument definitions.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "proctorcache",
    version,
    about = "Monitor exam assessments and student submissions"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Seed database JSON (overrides config and PROCTORCACHE_DATA).
    #[arg(long, value_name = "PATH", global = true)]
    pub data: Option<PathBuf>,

    /// Write daily rolling log files to this directory instead of stderr.
    #[arg(long, value_name = "DIR", env = "PROCTORCACHE_LOG_DIR", global = true)]
    pub log_dir: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Command {
    /// List assessments.
    Assessments(TableArgs),

    /// List the submissions of one assessment.
    Submissions {
        #[arg(value_name = "ASSESSMENT_ID")]
        assessment_id: String,

        #[command(flatten)]
        table: TableArgs,
    },

    /// Perform a row action (unlock, sync, download) on a submission.
    Action {
        #[arg(value_name = "ASSESSMENT_ID")]
        assessment_id: String,

        #[arg(value_name = "SUBMISSION_ID")]
        submission_id: String,

        #[arg(value_name = "ACTION")]
        action: String,
    },

    /// Poll an assessment's submissions and print a status summary per tick.
    Watch {
        #[arg(value_name = "ASSESSMENT_ID")]
        assessment_id: String,

        /// Stop after this many ticks.
        #[arg(long, default_value_t = 3)]
        ticks: usize,

        /// Seconds between ticks (default: poll_interval_secs from config).
        #[arg(long, value_name = "S")]
        interval_secs: Option<u64>,
    },
}

/// Filter, sort and page flags shared by the table commands.
#[derive(Args, Debug, Default)]
pub struct TableArgs {
    /// Filter on a field, e.g. --filter status="Manual Locked". Repeatable.
    #[arg(long = "filter", value_name = "KEY=VALUE", value_parser = parse_key_val)]
    pub filters: Vec<(String, String)>,

    /// Sort by a column key.
    #[arg(long, value_name = "KEY")]
    pub sort: Option<String>,

    /// Sort descending.
    #[arg(long, requires = "sort")]
    pub desc: bool,

    /// Page to show (1-based).
    #[arg(long, default_value_t = 1)]
    pub page: usize,

    /// Rows per page (default: page_size from config).
    #[arg(long, value_name = "N")]
    pub page_size: Option<usize>,
}

fn parse_key_val(s: &str) -> Result<(String, String), String> {
    let (key, value) = s
        .split_once('=')
        .ok_or_else(|| format!("expected KEY=VALUE, got '{}'", s))?;
    let key = key.trim();
    if key.is_empty() {
        return Err(format!("missing key in '{}'", s));
    }
    Ok((key.to_string(), value.trim().to_string()))
}
