//! Command line interface.
//!
//! This module contains the CLI parser and dispatches to command-specific modules.

mod commands;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::config::{load_settings, LoadOptions};

#[derive(Parser)]
#[command(name = "casefetch")]
#[command(about = "Delhi High Court case-status retrieval")]
#[command(version)]
pub struct Cli {
    /// Config file path (overrides auto-discovery)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Check if verbose mode is enabled (for early logging setup).
pub fn is_verbose() -> bool {
    std::env::args().any(|arg| arg == "-v" || arg == "--verbose")
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP API
    Serve {
        /// Address to bind to: PORT, HOST, or HOST:PORT (default from config, 127.0.0.1:5001)
        #[arg(short, long)]
        bind: Option<String>,
    },

    /// Run one search in the foreground and print the case record
    Search {
        /// Case type code as listed on the court website (e.g. "W.P.(C)")
        case_type: String,
        /// Case number
        case_number: String,
        /// Filing year (1990-2030)
        filing_year: String,
        /// Show the browser window while the form is filled
        #[arg(long)]
        headed: bool,
    },

    /// Check that the court website answers and a browser can be started
    Check,

    /// Show recent searches from the search log
    Logs {
        /// Number of searches to show
        #[arg(short, long, default_value = "20")]
        limit: usize,
    },

    /// Show search statistics
    Stats {
        /// Days of per-day statistics to show
        #[arg(short, long, default_value = "7")]
        days: usize,
    },

    /// Delete search log records older than the given age
    Cleanup {
        /// Keep records newer than this many days
        #[arg(short, long, default_value = "30")]
        days: u32,
    },
}

/// Run the CLI.
pub async fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let options = LoadOptions {
        config_path: cli.config,
    };
    let (mut settings, _config) = load_settings(options).await?;

    match cli.command {
        Commands::Serve { bind } => {
            let bind = bind.unwrap_or_else(|| settings.bind.clone());
            commands::serve::cmd_serve(&settings, &bind).await
        }
        Commands::Search {
            case_type,
            case_number,
            filing_year,
            headed,
        } => {
            if headed {
                settings.browser.headless = false;
            }
            commands::search::cmd_search(&settings, &case_type, &case_number, &filing_year).await
        }
        Commands::Check => commands::search::cmd_check(&settings).await,
        Commands::Logs { limit } => commands::db::cmd_logs(&settings, limit).await,
        Commands::Stats { days } => commands::db::cmd_stats(&settings, days).await,
        Commands::Cleanup { days } => commands::db::cmd_cleanup(&settings, days).await,
    }
}
