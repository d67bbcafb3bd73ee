// dbbackup-agent/src/notify/mod.rs
pub mod google_chat;
pub mod slack;

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::config::NotificationConfig;
use crate::errors::NotifyError;
use google_chat::GoogleChatChannel;
use slack::SlackChannel;

const WEBHOOK_TIMEOUT: Duration = Duration::from_secs(15);

/// Outcome report for one backup run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotificationMessage {
    pub title: String,
    pub body: String,
    pub error: Option<String>,
    pub artifact_path: Option<PathBuf>,
}

impl NotificationMessage {
    pub fn success(engine: &str, database: &str, artifact_path: &Path) -> Self {
        NotificationMessage {
            title: format!("{} Backup Successful", engine),
            body: format!(
                "Database backup completed successfully.\nDatabase: {}\nPath: {}",
                database,
                artifact_path.display()
            ),
            error: None,
            artifact_path: Some(artifact_path.to_path_buf()),
        }
    }

    pub fn failure(engine: &str, database: &str, error: &dyn std::error::Error) -> Self {
        NotificationMessage {
            title: format!("{} Backup Failed", engine),
            body: format!("Database backup failed.\nDatabase: {}", database),
            error: Some(error.to_string()),
            artifact_path: None,
        }
    }

    pub fn is_failure(&self) -> bool {
        self.error.is_some()
    }
}

/// Best-effort delivery. Implementations swallow their own failures.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, message: &NotificationMessage);
}

/// A chat destination reachable through an incoming webhook.
pub trait WebhookChannel: Send + Sync {
    fn name(&self) -> &'static str;

    fn webhook_url(&self) -> &str;

    fn payload(&self, message: &NotificationMessage) -> Result<serde_json::Value, NotifyError>;
}

/// Fans a message out to every configured webhook channel.
pub struct WebhookNotifier {
    client: reqwest::Client,
    enabled: bool,
    on_success: bool,
    on_error: bool,
    channels: Vec<Box<dyn WebhookChannel>>,
}

impl WebhookNotifier {
    pub fn from_config(config: &NotificationConfig) -> Self {
        let mut channels: Vec<Box<dyn WebhookChannel>> = Vec::new();
        if let Some(slack) = &config.slack {
            channels.push(Box::new(SlackChannel::new(slack.webhook_url.clone())));
        }
        if let Some(chat) = &config.google_chat {
            channels.push(Box::new(GoogleChatChannel::new(
                chat.webhook_url.clone(),
                chat.thread_key.clone(),
            )));
        }

        WebhookNotifier {
            client: reqwest::Client::new(),
            enabled: config.enabled,
            on_success: config.on_success,
            on_error: config.on_error,
            channels,
        }
    }

    pub fn channel_count(&self) -> usize {
        self.channels.len()
    }

    fn should_send(&self, message: &NotificationMessage) -> bool {
        if !self.enabled {
            return false;
        }
        if message.is_failure() {
            self.on_error
        } else {
            self.on_success
        }
    }

    async fn deliver(
        &self,
        channel: &dyn WebhookChannel,
        message: &NotificationMessage,
    ) -> Result<(), NotifyError> {
        let payload = channel.payload(message)?;
        self.client
            .post(channel.webhook_url())
            .timeout(WEBHOOK_TIMEOUT)
            .json(&payload)
            .send()
            .await?
            .error_for_status()?;
        Ok(())
    }
}

#[async_trait]
impl Notifier for WebhookNotifier {
    async fn notify(&self, message: &NotificationMessage) {
        if !self.should_send(message) {
            debug!(title = %message.title, "Notification suppressed by configuration");
            return;
        }

        for channel in &self.channels {
            match self.deliver(channel.as_ref(), message).await {
                Ok(()) => info!(channel = channel.name(), title = %message.title, "Notification sent"),
                Err(e) => warn!(channel = channel.name(), error = %e, "Failed to send notification"),
            }
        }
    }
}
