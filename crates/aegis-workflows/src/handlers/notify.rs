//! Notification handler: delivers the formatted incident dump to the
//! operator channel.

use aegis_core::{
    format_incident_report, HandlerError, NotificationDispatcher, SecurityIncident, SecurityNotice,
    StepHandler,
};
use async_trait::async_trait;
use serde_json::json;
use std::sync::Arc;
use tracing::{info, instrument};

/// Sends the incident summary to the security team.
pub struct NotifyOperators {
    dispatcher: Arc<dyn NotificationDispatcher>,
    subject_prefix: String,
    high_priority: bool,
}

impl NotifyOperators {
    /// Creates a normal-priority notification step.
    pub fn new(dispatcher: Arc<dyn NotificationDispatcher>, subject_prefix: impl Into<String>) -> Self {
        Self {
            dispatcher,
            subject_prefix: subject_prefix.into(),
            high_priority: false,
        }
    }

    /// Creates a high-priority notification step.
    pub fn high_priority(
        dispatcher: Arc<dyn NotificationDispatcher>,
        subject_prefix: impl Into<String>,
    ) -> Self {
        Self {
            dispatcher,
            subject_prefix: subject_prefix.into(),
            high_priority: true,
        }
    }
}

#[async_trait]
impl StepHandler for NotifyOperators {
    #[instrument(skip(self, incident), fields(incident_id = %incident.id, channel = %self.dispatcher.name()))]
    async fn run(&self, incident: &SecurityIncident) -> Result<serde_json::Value, HandlerError> {
        let subject = format!("{}: {}", self.subject_prefix, incident.summary);
        let mut notice = SecurityNotice::new(subject.clone(), format_incident_report(incident));
        if self.high_priority {
            notice = notice.high_priority();
        }

        self.dispatcher.send(&notice).await?;
        info!(subject = %subject, high_priority = self.high_priority, "security notification sent");

        Ok(json!({"notification_sent": true, "subject": subject}))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notifier::MemoryNotifier;
    use aegis_core::{IncidentCategory, NewIncident, Severity};

    fn incident() -> SecurityIncident {
        SecurityIncident::open(
            NewIncident::new(
                IncidentCategory::SqlInjection,
                Severity::Critical,
                "UNION SELECT in query parameter",
                json!({"path": "/search"}),
            )
            .with_source_address("198.51.100.3"),
        )
    }

    #[tokio::test]
    async fn test_notification_carries_incident_report() {
        let notifier = Arc::new(MemoryNotifier::new());
        let handler = NotifyOperators::high_priority(
            Arc::clone(&notifier) as Arc<dyn NotificationDispatcher>,
            "CRITICAL: SQL Injection Attempt",
        );

        let incident = incident();
        let result = handler.run(&incident).await.unwrap();
        assert_eq!(result["notification_sent"], true);
        assert_eq!(
            result["subject"],
            "CRITICAL: SQL Injection Attempt: UNION SELECT in query parameter"
        );

        let sent = notifier.sent().await;
        assert_eq!(sent.len(), 1);
        assert!(sent[0].high_priority);
        assert!(sent[0].body.contains(&format!("Incident ID: {}", incident.id)));
        assert!(sent[0].body.contains("Type: sql_injection"));
        assert!(sent[0].body.contains("Source IP: 198.51.100.3"));
    }

    #[tokio::test]
    async fn test_normal_priority_notification() {
        let notifier = Arc::new(MemoryNotifier::new());
        let handler = NotifyOperators::new(
            Arc::clone(&notifier) as Arc<dyn NotificationDispatcher>,
            "System Misconfiguration Detected",
        );

        handler.run(&incident()).await.unwrap();
        let sent = notifier.sent().await;
        assert!(!sent[0].high_priority);
    }
}
