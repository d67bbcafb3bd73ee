// dbbackup-agent/src/notify/google_chat.rs
use serde::Serialize;

use super::{NotificationMessage, WebhookChannel};
use crate::errors::NotifyError;

/// Google Chat incoming webhook rendered as a card.
/// Messages sharing a thread key are grouped into one conversation thread.
pub struct GoogleChatChannel {
    webhook_url: String,
    thread_key: Option<String>,
}

impl GoogleChatChannel {
    pub fn new(webhook_url: String, thread_key: Option<String>) -> Self {
        GoogleChatChannel {
            webhook_url,
            thread_key,
        }
    }
}

#[derive(Debug, Serialize)]
struct ChatPayload {
    cards: Vec<Card>,
    #[serde(skip_serializing_if = "Option::is_none")]
    thread: Option<Thread>,
}

#[derive(Debug, Serialize)]
struct Card {
    header: CardHeader,
    sections: Vec<Section>,
}

#[derive(Debug, Serialize)]
struct CardHeader {
    title: String,
}

#[derive(Debug, Serialize)]
struct Section {
    widgets: Vec<Widget>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct Widget {
    text_paragraph: TextParagraph,
}

#[derive(Debug, Serialize)]
struct TextParagraph {
    text: String,
}

#[derive(Debug, Serialize)]
struct Thread {
    name: String,
}

impl Section {
    fn paragraph(text: String) -> Self {
        Section {
            widgets: vec![Widget {
                text_paragraph: TextParagraph { text },
            }],
        }
    }
}

impl WebhookChannel for GoogleChatChannel {
    fn name(&self) -> &'static str {
        "google_chat"
    }

    fn webhook_url(&self) -> &str {
        &self.webhook_url
    }

    fn payload(&self, message: &NotificationMessage) -> Result<serde_json::Value, NotifyError> {
        let mut sections = vec![Section::paragraph(message.body.clone())];
        if let Some(error) = &message.error {
            sections.push(Section::paragraph(format!("<b>Error:</b>\n<pre>{}</pre>", error)));
        }
        if let Some(path) = &message.artifact_path {
            sections.push(Section::paragraph(format!(
                "<b>Backup Path:</b>\n{}",
                path.display()
            )));
        }

        let payload = ChatPayload {
            cards: vec![Card {
                header: CardHeader {
                    title: message.title.clone(),
                },
                sections,
            }],
            thread: self.thread_key.clone().map(|name| Thread { name }),
        };
        Ok(serde_json::to_value(payload)?)
    }
}
