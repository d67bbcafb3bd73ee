// dbbackup-agent/src/notify/slack.rs
use serde::Serialize;

use super::{NotificationMessage, WebhookChannel};
use crate::errors::NotifyError;

/// Slack incoming webhook rendered with Block Kit.
pub struct SlackChannel {
    webhook_url: String,
}

impl SlackChannel {
    pub fn new(webhook_url: String) -> Self {
        SlackChannel { webhook_url }
    }
}

#[derive(Debug, Serialize)]
struct SlackPayload {
    text: String,
    blocks: Vec<Block>,
}

#[derive(Debug, Serialize)]
struct Block {
    #[serde(rename = "type")]
    kind: &'static str,
    text: Text,
}

#[derive(Debug, Serialize)]
struct Text {
    #[serde(rename = "type")]
    kind: &'static str,
    text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    emoji: Option<bool>,
}

impl Block {
    fn header(text: &str) -> Self {
        Block {
            kind: "header",
            text: Text {
                kind: "plain_text",
                text: text.to_string(),
                emoji: Some(true),
            },
        }
    }

    fn section(markdown: String) -> Self {
        Block {
            kind: "section",
            text: Text {
                kind: "mrkdwn",
                text: markdown,
                emoji: None,
            },
        }
    }
}

impl WebhookChannel for SlackChannel {
    fn name(&self) -> &'static str {
        "slack"
    }

    fn webhook_url(&self) -> &str {
        &self.webhook_url
    }

    fn payload(&self, message: &NotificationMessage) -> Result<serde_json::Value, NotifyError> {
        let mut blocks = vec![
            Block::header(&message.title),
            Block::section(message.body.clone()),
        ];
        if let Some(error) = &message.error {
            blocks.push(Block::section(format!("*Error:*\n```{}```", error)));
        }
        if let Some(path) = &message.artifact_path {
            blocks.push(Block::section(format!("*Backup Path:*\n{}", path.display())));
        }

        let payload = SlackPayload {
            text: message.title.clone(),
            blocks,
        };
        Ok(serde_json::to_value(payload)?)
    }
}
