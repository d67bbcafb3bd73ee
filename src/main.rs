//! Scheduled Database Backup Agent
//!
//! Dumps a MySQL or PostgreSQL database on a cron schedule, optionally uploads
//! the dump to S3-compatible storage and reports the outcome to chat webhooks.

// dbbackup-agent/src/main.rs
mod backup;
mod config;
mod errors;
mod notify;
mod scheduler;
mod utils;

use anyhow::{Context, Result};
use backup::RunMode;
use config::AppConfig;
use std::env;
use std::process::ExitCode;
use tracing::{error, info};

#[tokio::main]
async fn main() -> ExitCode {
    match run_app().await {
        Ok(_) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = ?e, "Backup agent stopped with an error");
            eprintln!("❌ Error: {:?}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run_app() -> Result<()> {
    // A missing .env file is fine; the environment may already be populated.
    dotenv::dotenv().ok();

    let app_config = AppConfig::load_from_env().context("Failed to load configuration")?;
    utils::logging::init(&app_config.logging);

    let args: Vec<String> = env::args().collect();
    let run_mode = parse_run_mode(args.get(1).map(String::as_str))?;

    utils::prepare_output_dir(&app_config.backup.output_dir)?;
    utils::check_executable(utils::required_executable(&app_config.engine));

    info!(
        database_type = ?app_config.database_type(),
        s3_enabled = app_config.s3.is_some(),
        retention_days = app_config.backup.retention_days,
        "Backup agent starting"
    );
    backup::run_backup_flow(&app_config, run_mode)
        .await
        .context("Backup process failed")
}

fn parse_run_mode(arg: Option<&str>) -> Result<RunMode> {
    match arg.map(str::trim) {
        None | Some("run") => Ok(RunMode::Scheduled),
        Some("once") => Ok(RunMode::Once),
        Some(other) => {
            anyhow::bail!("Invalid argument '{}'. Use 'run' (default) or 'once'.", other)
        }
    }
}
