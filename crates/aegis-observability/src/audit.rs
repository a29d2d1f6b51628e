//! Audit trail for the response engine.
//!
//! Every incident creation, action settlement, approval, and lifecycle
//! mutation is reported into an [`AuditSink`]. Persistence of the trail is
//! owned by the embedding application; this module ships the sink contract
//! and a bounded in-memory implementation.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::info;
use uuid::Uuid;

/// Kinds of auditable engine events.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AuditEventKind {
    /// Incident was created.
    IncidentCreated,
    /// Incident transitioned to mitigated.
    IncidentMitigated,
    /// Incident was resolved by an operator.
    IncidentResolved,
    /// Incident was marked as a false positive.
    IncidentFalsePositive,
    /// Incident was assigned to an operator.
    IncidentAssigned,
    /// A note was appended to an incident.
    NoteAdded,
    /// A response action completed successfully.
    ActionCompleted,
    /// A response action failed.
    ActionFailed,
    /// A gated response action was approved.
    ActionApproved,
    /// A failed response action was re-submitted.
    ActionRetried,
}

/// A single entry in the audit trail.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditRecord {
    /// Unique entry ID.
    pub id: Uuid,
    /// Timestamp.
    pub timestamp: DateTime<Utc>,
    /// Event kind.
    pub kind: AuditEventKind,
    /// Actor (human principal or "system").
    pub actor: String,
    /// Human-readable description of the event.
    pub message: String,
    /// Structured context payload.
    pub context: serde_json::Value,
    /// Subject network address, or "system" when none applies.
    pub subject: String,
    /// Incident the event belongs to, if any.
    pub incident_id: Option<Uuid>,
    /// Response action the event belongs to, if any.
    pub action_id: Option<Uuid>,
}

impl AuditRecord {
    /// Creates a new record with an empty context and a "system" subject.
    pub fn new(kind: AuditEventKind, actor: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            timestamp: Utc::now(),
            kind,
            actor: actor.into(),
            message: message.into(),
            context: serde_json::json!({}),
            subject: "system".to_string(),
            incident_id: None,
            action_id: None,
        }
    }

    /// Sets the structured context payload.
    pub fn with_context(mut self, context: serde_json::Value) -> Self {
        self.context = context;
        self
    }

    /// Sets the subject address.
    pub fn with_subject(mut self, subject: impl Into<String>) -> Self {
        self.subject = subject.into();
        self
    }

    /// Associates the record with an incident.
    pub fn with_incident(mut self, incident_id: Uuid) -> Self {
        self.incident_id = Some(incident_id);
        self
    }

    /// Associates the record with a response action.
    pub fn with_action(mut self, action_id: Uuid) -> Self {
        self.action_id = Some(action_id);
        self
    }
}

/// Sink the engine reports audit records into.
#[async_trait]
pub trait AuditSink: Send + Sync {
    /// Records an audit entry. Sinks must not fail the calling operation.
    async fn record(&self, record: AuditRecord);
}

/// Audit log with bounded in-memory storage.
pub struct MemoryAuditLog {
    /// In-memory log entries.
    entries: Arc<RwLock<VecDeque<AuditRecord>>>,
    /// Maximum entries to keep in memory.
    max_entries: usize,
    /// Whether to also emit entries to tracing.
    log_to_tracing: bool,
}

impl MemoryAuditLog {
    /// Creates a new audit log.
    pub fn new(max_entries: usize) -> Self {
        Self {
            entries: Arc::new(RwLock::new(VecDeque::with_capacity(max_entries))),
            max_entries,
            log_to_tracing: true,
        }
    }

    /// Creates an audit log without tracing output.
    pub fn without_tracing(max_entries: usize) -> Self {
        Self {
            entries: Arc::new(RwLock::new(VecDeque::with_capacity(max_entries))),
            max_entries,
            log_to_tracing: false,
        }
    }

    /// Returns a snapshot of all entries, oldest first.
    pub async fn entries(&self) -> Vec<AuditRecord> {
        self.entries.read().await.iter().cloned().collect()
    }

    /// Returns all entries recorded for an incident, oldest first.
    pub async fn for_incident(&self, incident_id: Uuid) -> Vec<AuditRecord> {
        self.entries
            .read()
            .await
            .iter()
            .filter(|e| e.incident_id == Some(incident_id))
            .cloned()
            .collect()
    }

    /// Number of entries currently retained.
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    /// Whether the log is empty.
    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}

#[async_trait]
impl AuditSink for MemoryAuditLog {
    async fn record(&self, record: AuditRecord) {
        if self.log_to_tracing {
            info!(
                kind = ?record.kind,
                actor = %record.actor,
                incident_id = ?record.incident_id,
                subject = %record.subject,
                "Audit: {}",
                record.message
            );
        }

        let mut entries = self.entries.write().await;
        if entries.len() >= self.max_entries {
            entries.pop_front();
        }
        entries.push_back(record);
    }
}
