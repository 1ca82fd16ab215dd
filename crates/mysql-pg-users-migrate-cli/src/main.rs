//! Administrative entry point for the one-shot users-table migration.
//!
//! Takes no flags: everything is driven by environment variables (a local
//! `.env` file is honored). See the library's `config` module for the
//! variable list; the process surface adds `LOG_LEVEL`, `LOG_FORMAT`
//! (`text`|`json`) and `OUTPUT_FORMAT` (`json` for a machine-readable
//! report on stdout).

use std::process::ExitCode;

use mysql_pg_users_migrate::{Config, MigrationReport, Migrator, Result};
use tracing::Level;

#[tokio::main]
async fn main() -> ExitCode {
    // The configuration surface is environment-only; anything on the
    // command line is a mistake worth stopping for.
    if let Some(arg) = std::env::args().nth(1) {
        eprintln!(
            "This tool takes no arguments (got '{}'); it is configured entirely through environment variables",
            arg
        );
        return ExitCode::from(2);
    }

    // Load .env before anything reads the environment.
    dotenvy::dotenv().ok();
    setup_logging();

    match run().await {
        Ok(report) => {
            print_report(&report);
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!(
                "Migration failed during {}: {}",
                e.stage(),
                e.format_detailed()
            );
            ExitCode::from(e.exit_code())
        }
    }
}

async fn run() -> Result<MigrationReport> {
    let config = Config::from_env()?;
    Migrator::new(config).run().await
}

fn setup_logging() {
    let level = std::env::var("LOG_LEVEL")
        .ok()
        .and_then(|v| v.parse::<Level>().ok())
        .unwrap_or(Level::INFO);

    match std::env::var("LOG_FORMAT").unwrap_or_default().as_str() {
        "json" => {
            tracing_subscriber::fmt()
                .json()
                .with_max_level(level)
                .with_target(false)
                .init();
        }
        _ => {
            tracing_subscriber::fmt()
                .with_max_level(level)
                .with_target(false)
                .init();
        }
    }
}

fn print_report(report: &MigrationReport) {
    if std::env::var("OUTPUT_FORMAT").as_deref() == Ok("json") {
        match report.to_json() {
            Ok(json) => println!("{}", json),
            Err(e) => eprintln!("Failed to serialize report: {}", e),
        }
    } else {
        println!(
            "Migration complete: {} rows extracted, {} inserted, {} skipped",
            report.rows_extracted, report.rows_inserted, report.rows_skipped
        );
    }
}
