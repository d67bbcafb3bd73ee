pub(crate) mod command;    // Dump invocation assembly shared by both engines
pub(crate) mod engine;     // Per-engine dump strategies (MySQL, PostgreSQL)
pub(crate) mod executor;   // Child process execution behind CommandRunner
pub(crate) mod naming;     // Timestamped artifact paths
pub(crate) mod orchestrator;
pub(crate) mod s3_upload;  // Object storage gateway

use anyhow::Result;
use std::sync::Arc;
use tracing::info;

use crate::config::{AppConfig, EngineSettings};
use crate::notify::{Notifier, WebhookNotifier};
use crate::scheduler;
use engine::{EngineStrategy, MySqlEngine, PostgresEngine};
use executor::{CommandRunner, ProcessRunner};
use orchestrator::BackupOrchestrator;
use s3_upload::{S3Uploader, UploadGateway};

/// How the agent should drive backups once wired up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunMode {
    /// Back up once now, then on every scheduled tick until interrupted.
    Scheduled,
    /// Back up once and report the outcome.
    Once,
}

/// Public entry point for the backup agent.
/// Wires the production collaborators and hands the orchestrator to the scheduler.
pub async fn run_backup_flow(app_config: &AppConfig, run_mode: RunMode) -> Result<()> {
    let runner: Arc<dyn CommandRunner> = Arc::new(ProcessRunner);
    let webhooks = WebhookNotifier::from_config(&app_config.notification);
    info!(channels = webhooks.channel_count(), "Notification channels configured");
    let notifier: Arc<dyn Notifier> = Arc::new(webhooks);
    let uploader: Option<Arc<dyn UploadGateway>> = match &app_config.s3 {
        Some(s3_config) => Some(Arc::new(S3Uploader::new(s3_config).await)),
        None => None,
    };

    match &app_config.engine {
        EngineSettings::MySql(cfg) => {
            let orchestrator = BackupOrchestrator::new(
                MySqlEngine::new(cfg.clone()),
                &app_config.backup,
                runner,
                uploader,
                notifier,
            );
            drive(orchestrator, app_config, run_mode).await
        }
        EngineSettings::Postgres(cfg) => {
            let orchestrator = BackupOrchestrator::new(
                PostgresEngine::new(cfg.clone()),
                &app_config.backup,
                runner,
                uploader,
                notifier,
            );
            drive(orchestrator, app_config, run_mode).await
        }
    }
}

async fn drive<E: EngineStrategy>(
    orchestrator: BackupOrchestrator<E>,
    app_config: &AppConfig,
    run_mode: RunMode,
) -> Result<()> {
    match run_mode {
        RunMode::Once => {
            let report = orchestrator.perform_backup().await?;
            info!(
                path = %report.artifact.path.display(),
                uploaded = report.uploaded,
                "🎉 Backup completed successfully"
            );
            Ok(())
        }
        RunMode::Scheduled => {
            scheduler::run(&orchestrator, &app_config.backup.schedule).await;
            Ok(())
        }
    }
}
