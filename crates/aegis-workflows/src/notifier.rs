//! Notification dispatchers.
//!
//! [`WebhookNotifier`] delivers security notices to a chat webhook as embed
//! payloads; [`MemoryNotifier`] records them for embedding without a
//! configured channel and for tests.

use aegis_core::{NotificationDispatcher, NotificationError, SecurityNotice};
use async_trait::async_trait;
use chrono::Utc;
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, error, instrument};

/// Embed color for high-priority notices (red).
const HIGH_PRIORITY_COLOR: u32 = 16711680;
/// Embed color for normal notices (orange).
const NORMAL_COLOR: u32 = 15105570;
/// Chat embeds cap descriptions at this many characters.
const MAX_EMBED_DESCRIPTION: usize = 2000;

/// A notifier that posts notices to a chat webhook URL.
pub struct WebhookNotifier {
    /// The webhook URL to post notices to.
    url: String,
    /// HTTP client for sending requests.
    #[cfg(not(test))]
    client: reqwest::Client,
}

impl WebhookNotifier {
    /// Creates a new webhook notifier.
    pub fn new(url: impl Into<String>) -> Result<Self, NotificationError> {
        let url = url.into();
        if url.is_empty() {
            return Err(NotificationError::InvalidConfig(
                "Webhook URL cannot be empty".to_string(),
            ));
        }

        Ok(Self {
            url,
            #[cfg(not(test))]
            client: reqwest::Client::new(),
        })
    }

    /// Creates the JSON payload for a notice.
    fn create_payload(&self, notice: &SecurityNotice) -> WebhookPayload {
        WebhookPayload {
            content: if notice.high_priority {
                "@here ".to_string()
            } else {
                String::new()
            },
            embeds: vec![WebhookEmbed {
                title: notice.subject.clone(),
                description: truncate_description(&notice.body),
                color: if notice.high_priority {
                    HIGH_PRIORITY_COLOR
                } else {
                    NORMAL_COLOR
                },
                timestamp: Utc::now().to_rfc3339(),
            }],
        }
    }

    /// Posts the payload to the webhook URL (actual HTTP call).
    #[cfg(not(test))]
    async fn post(&self, payload: &WebhookPayload) -> Result<(), NotificationError> {
        let response = self
            .client
            .post(&self.url)
            .json(payload)
            .send()
            .await
            .map_err(|e| NotificationError::SendFailed(format!("HTTP request failed: {}", e)))?;

        if response.status().is_success() {
            Ok(())
        } else {
            let status = response.status();
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unable to read response body".to_string());
            Err(NotificationError::SendFailed(format!(
                "Webhook returned {}: {}",
                status, body
            )))
        }
    }

    /// Mock post for testing.
    #[cfg(test)]
    async fn post(&self, _payload: &WebhookPayload) -> Result<(), NotificationError> {
        Ok(())
    }
}

#[async_trait]
impl NotificationDispatcher for WebhookNotifier {
    #[instrument(skip(self, notice), fields(url = %self.url, subject = %notice.subject))]
    async fn send(&self, notice: &SecurityNotice) -> Result<(), NotificationError> {
        let payload = self.create_payload(notice);
        debug!(high_priority = notice.high_priority, "posting notice to webhook");

        match self.post(&payload).await {
            Ok(()) => Ok(()),
            Err(e) => {
                error!(error = %e, "failed to post notice to webhook");
                Err(e)
            }
        }
    }

    fn name(&self) -> &str {
        "webhook"
    }
}

fn truncate_description(body: &str) -> String {
    if body.chars().count() <= MAX_EMBED_DESCRIPTION {
        body.to_string()
    } else {
        let mut truncated: String = body.chars().take(MAX_EMBED_DESCRIPTION - 3).collect();
        truncated.push_str("...");
        truncated
    }
}

/// The JSON payload posted to the webhook.
#[derive(Debug, Serialize)]
pub struct WebhookPayload {
    /// Leading message content; carries the mention for urgent notices.
    pub content: String,
    /// Embeds describing the incident.
    pub embeds: Vec<WebhookEmbed>,
}

/// One embed within the webhook payload.
#[derive(Debug, Serialize)]
pub struct WebhookEmbed {
    pub title: String,
    pub description: String,
    pub color: u32,
    pub timestamp: String,
}

/// A notifier that records notices in memory.
#[derive(Default)]
pub struct MemoryNotifier {
    sent: Arc<RwLock<Vec<SecurityNotice>>>,
}

impl MemoryNotifier {
    /// Creates an empty notifier.
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of every notice sent so far.
    pub async fn sent(&self) -> Vec<SecurityNotice> {
        self.sent.read().await.clone()
    }
}

#[async_trait]
impl NotificationDispatcher for MemoryNotifier {
    async fn send(&self, notice: &SecurityNotice) -> Result<(), NotificationError> {
        self.sent.write().await.push(notice.clone());
        Ok(())
    }

    fn name(&self) -> &str {
        "memory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_webhook_notifier_creation() {
        let notifier = WebhookNotifier::new("https://chat.example.com/webhook").unwrap();
        assert_eq!(notifier.name(), "webhook");
    }

    #[test]
    fn test_webhook_notifier_empty_url() {
        let result = WebhookNotifier::new("");
        assert!(matches!(
            result,
            Err(NotificationError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_payload_normal_priority() {
        let notifier = WebhookNotifier::new("https://chat.example.com/webhook").unwrap();
        let notice = SecurityNotice::new("Brute Force Attack Detected: login storm", "dump");

        let payload = notifier.create_payload(&notice);
        assert_eq!(payload.content, "");
        assert_eq!(payload.embeds.len(), 1);
        assert_eq!(payload.embeds[0].color, NORMAL_COLOR);
        assert_eq!(
            payload.embeds[0].title,
            "Brute Force Attack Detected: login storm"
        );
    }

    #[test]
    fn test_payload_high_priority_mentions_channel() {
        let notifier = WebhookNotifier::new("https://chat.example.com/webhook").unwrap();
        let notice = SecurityNotice::new("URGENT: Data Exfiltration Detected", "dump")
            .high_priority();

        let payload = notifier.create_payload(&notice);
        assert_eq!(payload.content, "@here ");
        assert_eq!(payload.embeds[0].color, HIGH_PRIORITY_COLOR);
    }

    #[test]
    fn test_payload_truncates_long_bodies() {
        let notifier = WebhookNotifier::new("https://chat.example.com/webhook").unwrap();
        let notice = SecurityNotice::new("subject", "x".repeat(3000));

        let payload = notifier.create_payload(&notice);
        assert_eq!(payload.embeds[0].description.chars().count(), 2000);
        assert!(payload.embeds[0].description.ends_with("..."));
    }

    #[test]
    fn test_payload_keeps_short_bodies_intact() {
        let notifier = WebhookNotifier::new("https://chat.example.com/webhook").unwrap();
        let notice = SecurityNotice::new("subject", "short body");

        let payload = notifier.create_payload(&notice);
        assert_eq!(payload.embeds[0].description, "short body");
    }

    #[tokio::test]
    async fn test_webhook_send_in_test_mode() {
        let notifier = WebhookNotifier::new("https://chat.example.com/webhook").unwrap();
        let notice = SecurityNotice::new("subject", "body");
        assert!(notifier.send(&notice).await.is_ok());
    }

    #[tokio::test]
    async fn test_memory_notifier_records() {
        let notifier = MemoryNotifier::new();
        notifier
            .send(&SecurityNotice::new("first", "a"))
            .await
            .unwrap();
        notifier
            .send(&SecurityNotice::new("second", "b").high_priority())
            .await
            .unwrap();

        let sent = notifier.sent().await;
        assert_eq!(sent.len(), 2);
        assert_eq!(sent[0].subject, "first");
        assert!(sent[1].high_priority);
    }

    #[test]
    fn test_payload_serialization() {
        let notifier = WebhookNotifier::new("https://chat.example.com/webhook").unwrap();
        let notice = SecurityNotice::new("subject", "body").high_priority();
        let payload = notifier.create_payload(&notice);

        let json = serde_json::to_string(&payload).unwrap();
        assert!(json.contains("\"content\":\"@here \""));
        assert!(json.contains("\"color\":16711680"));
        assert!(json.contains("\"timestamp\":"));
    }
}
