//! Notification channel port.
//!
//! Select workflow steps deliver a human-readable incident summary to an
//! operator channel. Delivery mechanics are owned by the embedding
//! application; this module defines the notice shape and the dispatcher
//! contract.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// An operator-facing security notification.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecurityNotice {
    /// Subject line.
    pub subject: String,
    /// Formatted incident dump (see [`crate::format_incident_report`]).
    pub body: String,
    /// Whether the channel should treat the notice as urgent.
    pub high_priority: bool,
}

impl SecurityNotice {
    /// Creates a normal-priority notice.
    pub fn new(subject: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            subject: subject.into(),
            body: body.into(),
            high_priority: false,
        }
    }

    /// Marks the notice as high priority.
    pub fn high_priority(mut self) -> Self {
        self.high_priority = true;
        self
    }
}

/// Errors reported by notification dispatchers.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum NotificationError {
    /// The dispatcher is misconfigured (e.g. empty webhook URL).
    #[error("invalid notifier configuration: {0}")]
    InvalidConfig(String),

    /// Delivery failed.
    #[error("failed to send notification: {0}")]
    SendFailed(String),
}

/// Delivers security notices to an operator channel.
#[async_trait]
pub trait NotificationDispatcher: Send + Sync {
    /// Sends a notice.
    async fn send(&self, notice: &SecurityNotice) -> Result<(), NotificationError>;

    /// Name of the dispatcher, for logging.
    fn name(&self) -> &str;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_notice_defaults_to_normal_priority() {
        let notice = SecurityNotice::new("subject", "body");
        assert!(!notice.high_priority);

        let urgent = SecurityNotice::new("subject", "body").high_priority();
        assert!(urgent.high_priority);
    }

    #[test]
    fn test_notice_serialization() {
        let notice = SecurityNotice::new("Brute Force Attack Detected", "dump").high_priority();
        let json = serde_json::to_string(&notice).unwrap();
        assert!(json.contains("\"high_priority\":true"));
    }
}
