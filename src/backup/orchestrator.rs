// dbbackup-agent/src/backup/orchestrator.rs
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, error, info};

use crate::backup::engine::EngineStrategy;
use crate::backup::executor::CommandRunner;
use crate::backup::naming::{self, BackupArtifact};
use crate::backup::s3_upload::UploadGateway;
use crate::config::BackupSettings;
use crate::errors::BackupError;
use crate::notify::{NotificationMessage, Notifier};

/// Steps of a single run. A run always moves forward through them in this order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackupStage {
    Dumping,
    Uploading,
    Notifying,
}

impl fmt::Display for BackupStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            BackupStage::Dumping => "dumping",
            BackupStage::Uploading => "uploading",
            BackupStage::Notifying => "notifying",
        };
        f.write_str(name)
    }
}

/// What a successful run produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackupReport {
    pub artifact: BackupArtifact,
    pub uploaded: bool,
}

/// Drives dump → upload → notify for one database engine.
///
/// A run fails if either the dump or the configured upload fails; both produce a
/// failure notification and the error is returned. Notification delivery never
/// changes the outcome.
pub struct BackupOrchestrator<E> {
    engine: E,
    output_dir: PathBuf,
    filename_prefix: String,
    runner: Arc<dyn CommandRunner>,
    uploader: Option<Arc<dyn UploadGateway>>,
    notifier: Arc<dyn Notifier>,
}

impl<E: EngineStrategy> BackupOrchestrator<E> {
    /// `uploader` is `None` when object storage is disabled.
    pub fn new(
        engine: E,
        settings: &BackupSettings,
        runner: Arc<dyn CommandRunner>,
        uploader: Option<Arc<dyn UploadGateway>>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        BackupOrchestrator {
            engine,
            output_dir: settings.output_dir.clone(),
            filename_prefix: settings.filename_prefix.clone(),
            runner,
            uploader,
            notifier,
        }
    }

    pub async fn perform_backup(&self) -> Result<BackupReport, BackupError> {
        let engine = self.engine.display_name();
        let database = self.engine.database();
        info!(engine, database, "🚀 Starting database backup");

        let artifact = naming::next_artifact(&self.output_dir, &self.filename_prefix);
        debug!(path = %artifact.path.display(), created_at = %artifact.created_at, "Reserved artifact path");

        match self.dump_and_upload(&artifact).await {
            Ok(uploaded) => {
                info!(stage = %BackupStage::Notifying, path = %artifact.path.display(), "Backup run succeeded");
                let message = NotificationMessage::success(engine, database, &artifact.path);
                self.notifier.notify(&message).await;
                Ok(BackupReport { artifact, uploaded })
            }
            Err(e) => {
                error!(engine, database, error = %e, "❌ Backup process failed");
                let message = NotificationMessage::failure(engine, database, &e);
                self.notifier.notify(&message).await;
                Err(e)
            }
        }
    }

    async fn dump_and_upload(&self, artifact: &BackupArtifact) -> Result<bool, BackupError> {
        let command = self.engine.build_command(&artifact.path);
        info!(stage = %BackupStage::Dumping, command = %command, "Running dump");
        self.runner.run(&command).await?;
        info!(path = %artifact.path.display(), "✓ Dump completed");

        let Some(uploader) = &self.uploader else {
            return Ok(false);
        };
        info!(stage = %BackupStage::Uploading, path = %artifact.path.display(), "Uploading backup");
        uploader.upload(&artifact.path).await?;
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backup::command::DumpCommand;
    use crate::backup::engine::{MySqlEngine, PostgresEngine};
    use crate::config::{
        EngineConfig, ExecutionMode, MySqlDumpOptions, NotificationConfig, PostgresDumpOptions,
        SlackConfig, parse_schedule,
    };
    use crate::errors::{ExecutionError, UploadError};
    use crate::notify::WebhookNotifier;
    use async_trait::async_trait;
    use std::path::Path;
    use std::sync::Mutex;

    type Events = Arc<Mutex<Vec<String>>>;

    struct ScriptedRunner {
        fail: bool,
        events: Events,
        commands: Mutex<Vec<DumpCommand>>,
    }

    #[async_trait]
    impl CommandRunner for ScriptedRunner {
        async fn run(&self, command: &DumpCommand) -> Result<(), ExecutionError> {
            self.events.lock().unwrap().push("dump".to_string());
            self.commands.lock().unwrap().push(command.clone());
            if self.fail {
                Err(ExecutionError::Spawn {
                    program: command.program.clone(),
                    source: std::io::Error::new(std::io::ErrorKind::NotFound, "not found"),
                })
            } else {
                Ok(())
            }
        }
    }

    struct CountingUploader {
        fail: bool,
        events: Events,
        uploads: Mutex<Vec<PathBuf>>,
    }

    #[async_trait]
    impl UploadGateway for CountingUploader {
        async fn upload(&self, local_path: &Path) -> Result<(), UploadError> {
            self.events.lock().unwrap().push("upload".to_string());
            self.uploads.lock().unwrap().push(local_path.to_path_buf());
            if self.fail {
                Err(UploadError::Put {
                    bucket: "db-backups".to_string(),
                    key: "backups/x.sql".to_string(),
                    message: "AccessDenied".to_string(),
                })
            } else {
                Ok(())
            }
        }
    }

    struct RecordingNotifier {
        events: Events,
        messages: Mutex<Vec<NotificationMessage>>,
    }

    #[async_trait]
    impl Notifier for RecordingNotifier {
        async fn notify(&self, message: &NotificationMessage) {
            self.events.lock().unwrap().push("notify".to_string());
            self.messages.lock().unwrap().push(message.clone());
        }
    }

    struct Harness {
        events: Events,
        runner: Arc<ScriptedRunner>,
        uploader: Arc<CountingUploader>,
        notifier: Arc<RecordingNotifier>,
    }

    impl Harness {
        fn new(dump_fails: bool, upload_fails: bool) -> Self {
            let events: Events = Arc::new(Mutex::new(Vec::new()));
            Harness {
                runner: Arc::new(ScriptedRunner {
                    fail: dump_fails,
                    events: events.clone(),
                    commands: Mutex::new(Vec::new()),
                }),
                uploader: Arc::new(CountingUploader {
                    fail: upload_fails,
                    events: events.clone(),
                    uploads: Mutex::new(Vec::new()),
                }),
                notifier: Arc::new(RecordingNotifier {
                    events: events.clone(),
                    messages: Mutex::new(Vec::new()),
                }),
                events,
            }
        }

        fn orchestrator(&self, upload_enabled: bool) -> BackupOrchestrator<MySqlEngine> {
            let uploader: Option<Arc<dyn UploadGateway>> = if upload_enabled {
                Some(self.uploader.clone())
            } else {
                None
            };
            BackupOrchestrator::new(
                MySqlEngine::new(mysql_config()),
                &settings(),
                self.runner.clone(),
                uploader,
                self.notifier.clone(),
            )
        }

        fn events(&self) -> Vec<String> {
            self.events.lock().unwrap().clone()
        }

        fn messages(&self) -> Vec<NotificationMessage> {
            self.notifier.messages.lock().unwrap().clone()
        }

        fn upload_count(&self) -> usize {
            self.uploader.uploads.lock().unwrap().len()
        }
    }

    fn settings() -> BackupSettings {
        BackupSettings {
            output_dir: PathBuf::from("/var/backups"),
            filename_prefix: "backup".to_string(),
            retention_days: 7,
            schedule: parse_schedule("0 0 * * *").unwrap(),
        }
    }

    fn mysql_config() -> EngineConfig<MySqlDumpOptions> {
        EngineConfig {
            host: "localhost".to_string(),
            port: 3306,
            user: "root".to_string(),
            password: "pw".to_string(),
            database: "app".to_string(),
            mode: ExecutionMode::Local,
            dump_options: MySqlDumpOptions::default(),
        }
    }

    #[tokio::test]
    async fn test_full_success_uploads_then_notifies_once() {
        let harness = Harness::new(false, false);

        let report = harness.orchestrator(true).perform_backup().await.unwrap();

        assert!(report.uploaded);
        assert_eq!(harness.events(), vec!["dump", "upload", "notify"]);

        let executed = harness.runner.commands.lock().unwrap()[0].output.clone();
        assert_eq!(report.artifact.path, executed);
        assert_eq!(harness.uploader.uploads.lock().unwrap()[0], executed);

        let messages = harness.messages();
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].title, "MySQL Backup Successful");
        assert_eq!(messages[0].artifact_path.as_ref(), Some(&executed));
        assert!(messages[0].body.contains("Database: app"));
        assert!(!messages[0].is_failure());
    }

    #[tokio::test]
    async fn test_success_without_object_storage() {
        let harness = Harness::new(false, false);

        let report = harness.orchestrator(false).perform_backup().await.unwrap();

        assert!(!report.uploaded);
        assert_eq!(harness.upload_count(), 0);
        assert_eq!(harness.events(), vec!["dump", "notify"]);
        assert_eq!(harness.messages().len(), 1);
    }

    #[tokio::test]
    async fn test_dump_failure_skips_upload_and_reports_failure() {
        let harness = Harness::new(true, false);

        let err = harness.orchestrator(true).perform_backup().await.unwrap_err();

        assert!(matches!(err, BackupError::Dump(ExecutionError::Spawn { .. })));
        assert_eq!(harness.upload_count(), 0);
        assert_eq!(harness.events(), vec!["dump", "notify"]);

        let messages = harness.messages();
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].title, "MySQL Backup Failed");
        assert_eq!(messages[0].body, "Database backup failed.\nDatabase: app");
        assert_eq!(
            messages[0].error.as_deref(),
            Some("database dump failed: failed to spawn mysqldump: not found")
        );
    }

    #[tokio::test]
    async fn test_upload_failure_fails_the_run() {
        let harness = Harness::new(false, true);

        let err = harness.orchestrator(true).perform_backup().await.unwrap_err();

        assert!(matches!(err, BackupError::Upload(_)));
        assert_eq!(harness.events(), vec!["dump", "upload", "notify"]);

        let messages = harness.messages();
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].title, "MySQL Backup Failed");
        assert!(messages[0].is_failure());
        assert!(messages[0].error.as_deref().unwrap_or_default().contains("AccessDenied"));
    }

    #[tokio::test]
    async fn test_notifier_failure_does_not_change_outcome() {
        let harness = Harness::new(false, false);
        let notifier = WebhookNotifier::from_config(&NotificationConfig {
            enabled: true,
            on_success: true,
            on_error: true,
            slack: Some(SlackConfig {
                webhook_url: "http://127.0.0.1:9/unreachable".to_string(),
            }),
            google_chat: None,
        });
        let orchestrator = BackupOrchestrator::new(
            MySqlEngine::new(mysql_config()),
            &settings(),
            harness.runner.clone(),
            None,
            Arc::new(notifier),
        );

        assert!(orchestrator.perform_backup().await.is_ok());
    }

    #[tokio::test]
    async fn test_same_state_machine_for_postgres() {
        let harness = Harness::new(false, false);
        let orchestrator = BackupOrchestrator::new(
            PostgresEngine::new(EngineConfig {
                host: "localhost".to_string(),
                port: 5432,
                user: "postgres".to_string(),
                password: String::new(),
                database: "shop".to_string(),
                mode: ExecutionMode::Containerized {
                    container: "pg1".to_string(),
                },
                dump_options: PostgresDumpOptions::default(),
            }),
            &settings(),
            harness.runner.clone(),
            None,
            harness.notifier.clone(),
        );

        orchestrator.perform_backup().await.unwrap();

        let command = harness.runner.commands.lock().unwrap()[0].clone();
        assert_eq!(command.program, "docker");
        assert!(command.output.starts_with("/var/backups"));
        assert_eq!(harness.messages()[0].title, "PostgreSQL Backup Successful");
    }

    #[test]
    fn test_orchestrator_is_shareable_across_tasks() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<BackupOrchestrator<MySqlEngine>>();
        assert_send_sync::<BackupOrchestrator<PostgresEngine>>();
    }

    #[test]
    fn test_stage_names() {
        assert_eq!(BackupStage::Dumping.to_string(), "dumping");
        assert_eq!(BackupStage::Uploading.to_string(), "uploading");
        assert_eq!(BackupStage::Notifying.to_string(), "notifying");
    }
}
