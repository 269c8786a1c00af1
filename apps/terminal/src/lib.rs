//! # Sari POS Terminal
//!
//! Command-line front end for the counter: ring up sales, process refunds,
//! print reports, browse history and see what needs restocking.
//!
//! ## Startup Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  1. Parse the command line (clap derive, see `cli`)                     │
//! │  2. Load AppConfig (defaults → sari.toml → SARI_*)                      │
//! │  3. Initialize tracing (RUST_LOG, else logging.filter), to stderr       │
//! │  4. Open the database (migrations run on connect)                       │
//! │  5. Build AppState and dispatch the command                             │
//! │  6. Print text, or JSON with --json; exit code from the error kind      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

pub mod cli;
pub mod commands;
pub mod config;
pub mod error;
pub mod state;

use clap::error::ErrorKind;
use clap::Parser;
use std::ffi::OsString;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

use cli::Cli;
use commands::Command;
use config::AppConfig;
use error::{AppError, AppResult, ErrorBody};
use sari_db::{Database, DbConfig};
use state::AppState;

/// Runs one command line (program name first) and returns the exit code.
pub async fn run<I, T>(argv: I) -> i32
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    let argv: Vec<OsString> = argv.into_iter().map(Into::into).collect();

    let cli = match Cli::try_parse_from(&argv) {
        Ok(cli) => cli,
        Err(err) => {
            let json = argv.iter().any(|arg| arg.as_os_str() == "--json");
            return report_parse_error(err, json);
        }
    };

    let config = match AppConfig::load(cli.config.as_deref()) {
        Ok(config) => config,
        Err(err) => return report_error(&err.into(), cli.json),
    };
    init_tracing(&config.logging.filter);

    match execute(config, cli.command).await {
        Ok(output) => {
            if cli.json {
                println!("{}", output.json);
            } else {
                println!("{}", output.text);
            }
            0
        }
        Err(err) => report_error(&err, cli.json),
    }
}

async fn execute(config: AppConfig, command: Command) -> AppResult<commands::CommandOutput> {
    let db_path = config.database_path()?;
    info!(db = %db_path.display(), "Starting Sari POS terminal");

    let db = Database::new(
        DbConfig::new(db_path.clone()).max_connections(config.database.max_connections),
    )
    .await?;

    let state = AppState::new(db, config);
    let result = commands::dispatch(&state, command).await;
    state.db.close().await;
    result
}

/// Help and version go to stdout with exit 0; anything else is a usage error.
fn report_parse_error(err: clap::Error, json: bool) -> i32 {
    match err.kind() {
        ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => {
            let _ = err.print();
            0
        }
        _ if json => report_error(&AppError::from(err), true),
        _ => {
            let _ = err.print();
            AppError::from(err).exit_code()
        }
    }
}

fn report_error(err: &AppError, json: bool) -> i32 {
    debug!(code = ?err.code(), exit = err.exit_code(), "Command failed");
    if json {
        match serde_json::to_string(&ErrorBody::from(err)) {
            Ok(body) => println!("{}", body),
            Err(_) => eprintln!("error: {}", err),
        }
    } else {
        eprintln!("error: {}", err);
    }
    err.exit_code()
}

/// Installs the global subscriber. `RUST_LOG` overrides the configured filter.
fn init_tracing(configured: &str) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(configured))
        .unwrap_or_else(|_| EnvFilter::new(config::DEFAULT_LOG_FILTER));

    // Output goes to stdout; keep logs off it
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_help_exits_cleanly() {
        assert_eq!(run(["sari", "--help"]).await, 0);
        assert_eq!(run(["sari", "--version"]).await, 0);
    }

    #[tokio::test]
    async fn test_bad_command_lines_exit_with_usage() {
        // Rejected before any config or database is touched
        assert_eq!(run(["sari"]).await, 2);
        assert_eq!(run(["sari", "restock"]).await, 2);
        assert_eq!(run(["sari", "--json", "sell"]).await, 2);
        assert_eq!(run(["sari", "report", "daily"]).await, 2);
    }
}
