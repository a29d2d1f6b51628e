//! Incident data models for Aegis.
//!
//! This module defines the core data structures used throughout the engine
//! to represent security incidents and their remediation actions.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Categories of security incidents.
///
/// The category selects which remediation workflow applies and is immutable
/// once the incident is created.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum IncidentCategory {
    /// Repeated authentication failures from one source
    BruteForce,
    /// Signs that an account is controlled by someone other than its owner
    AccountTakeover,
    /// Unusual volume or pattern of data leaving the system
    DataExfiltration,
    /// Abusive use of an API credential
    ApiAbuse,
    /// Behavior that warrants monitoring but fits no sharper category
    SuspiciousActivity,
    /// Malicious or policy-violating file uploads
    FileUploadAbuse,
    /// Cross-site scripting payload detected in request content
    XssAttempt,
    /// SQL injection payload detected in request content
    SqlInjection,
    /// A honeypot resource was accessed
    HoneypotTriggered,
    /// Insecure system configuration detected
    SystemMisconfiguration,
}

impl fmt::Display for IncidentCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            IncidentCategory::BruteForce => "brute_force",
            IncidentCategory::AccountTakeover => "account_takeover",
            IncidentCategory::DataExfiltration => "data_exfiltration",
            IncidentCategory::ApiAbuse => "api_abuse",
            IncidentCategory::SuspiciousActivity => "suspicious_activity",
            IncidentCategory::FileUploadAbuse => "file_upload_abuse",
            IncidentCategory::XssAttempt => "xss_attempt",
            IncidentCategory::SqlInjection => "sql_injection",
            IncidentCategory::HoneypotTriggered => "honeypot_triggered",
            IncidentCategory::SystemMisconfiguration => "system_misconfiguration",
        };
        write!(f, "{}", name)
    }
}

/// Severity levels for incidents.
///
/// Carried from the detector; used for display and notification urgency
/// only, never for control flow in this engine.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Informational - no immediate action required
    Info,
    /// Low severity
    Low,
    /// Medium severity
    Medium,
    /// High severity - requires attention
    High,
    /// Critical - immediate response required
    Critical,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Severity::Info => "info",
            Severity::Low => "low",
            Severity::Medium => "medium",
            Severity::High => "high",
            Severity::Critical => "critical",
        };
        write!(f, "{}", name)
    }
}

/// Lifecycle status of a security incident.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum IncidentStatus {
    /// Newly created; automated remediation may still be running
    Open,
    /// Automated remediation ran with at least partial success
    Mitigated,
    /// Human-confirmed resolution
    Resolved,
    /// Human-confirmed false positive
    FalsePositive,
}

impl IncidentStatus {
    /// Whether this is a human-set terminal disposition. Terminal states are
    /// sticky: no later operation changes the status again.
    pub fn is_terminal(&self) -> bool {
        matches!(self, IncidentStatus::Resolved | IncidentStatus::FalsePositive)
    }
}

impl fmt::Display for IncidentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            IncidentStatus::Open => "open",
            IncidentStatus::Mitigated => "mitigated",
            IncidentStatus::Resolved => "resolved",
            IncidentStatus::FalsePositive => "false_positive",
        };
        write!(f, "{}", name)
    }
}

/// Status of a response action.
///
/// `Pending → InProgress → Completed | Failed`; approval-gated actions start
/// in `RequiresApproval` and move to `Pending` only through approval. The
/// one sanctioned way back from `Failed` to `Pending` is an explicit
/// operator retry.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ActionStatus {
    /// Runnable, waiting to be picked up
    Pending,
    /// Handler is executing
    InProgress,
    /// Handler finished successfully
    Completed,
    /// Handler failed, timed out, or was cancelled
    Failed,
    /// Waiting for a human principal to approve execution
    RequiresApproval,
}

impl ActionStatus {
    /// Whether the action has reached a final outcome.
    pub fn is_settled(&self) -> bool {
        matches!(self, ActionStatus::Completed | ActionStatus::Failed)
    }
}

impl fmt::Display for ActionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ActionStatus::Pending => "pending",
            ActionStatus::InProgress => "in_progress",
            ActionStatus::Completed => "completed",
            ActionStatus::Failed => "failed",
            ActionStatus::RequiresApproval => "requires_approval",
        };
        write!(f, "{}", name)
    }
}

/// Input for opening a new incident, as reported by the detection layer.
#[derive(Debug, Clone)]
pub struct NewIncident {
    /// Incident category; selects the remediation workflow.
    pub category: IncidentCategory,
    /// Severity assigned by the detector.
    pub severity: Severity,
    /// Free-text summary.
    pub summary: String,
    /// Structured detail payload; opaque to the engine.
    pub details: serde_json::Value,
    /// Source network address, if known.
    pub source_address: Option<String>,
    /// Subject user identifier, if known.
    pub subject_user: Option<String>,
    /// Identifier of the originating alert, if any.
    pub alert_id: Option<String>,
}

impl NewIncident {
    /// Creates a new incident report.
    pub fn new(
        category: IncidentCategory,
        severity: Severity,
        summary: impl Into<String>,
        details: serde_json::Value,
    ) -> Self {
        Self {
            category,
            severity,
            summary: summary.into(),
            details,
            source_address: None,
            subject_user: None,
            alert_id: None,
        }
    }

    /// Sets the source network address.
    pub fn with_source_address(mut self, address: impl Into<String>) -> Self {
        self.source_address = Some(address.into());
        self
    }

    /// Sets the subject user identifier.
    pub fn with_subject_user(mut self, user: impl Into<String>) -> Self {
        self.subject_user = Some(user.into());
        self
    }

    /// Sets the originating alert reference.
    pub fn with_alert_id(mut self, alert_id: impl Into<String>) -> Self {
        self.alert_id = Some(alert_id.into());
        self
    }
}

/// A tracked security incident and its remediation lifecycle.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecurityIncident {
    /// Unique identifier for this incident.
    pub id: Uuid,
    /// Incident category.
    pub category: IncidentCategory,
    /// Severity level.
    pub severity: Severity,
    /// Free-text summary.
    pub summary: String,
    /// Structured detail payload; opaque to the engine.
    pub details: serde_json::Value,
    /// Timestamp when the incident was created.
    pub created_at: DateTime<Utc>,
    /// Source network address, if known.
    pub source_address: Option<String>,
    /// Subject user identifier, if known.
    pub subject_user: Option<String>,
    /// Current lifecycle status.
    pub status: IncidentStatus,
    /// Identifier of the originating alert, if any.
    pub alert_id: Option<String>,
    /// Related incident ids.
    pub related_incidents: Vec<Uuid>,
    /// Response actions owned by this incident, in workflow order.
    pub actions: Vec<ResponseAction>,
    /// Operator the incident is assigned to.
    pub assigned_to: Option<String>,
    /// Who closed the incident (resolved or false positive).
    pub resolved_by: Option<String>,
    /// When the incident was closed.
    pub resolved_at: Option<DateTime<Utc>>,
    /// Timestamped, attributed notes.
    pub notes: Vec<String>,
}

impl SecurityIncident {
    /// Opens a new incident from a detection report. Status starts `Open`
    /// with an empty action list; the orchestrator fills in the workflow.
    pub fn open(report: NewIncident) -> Self {
        Self {
            id: Uuid::new_v4(),
            category: report.category,
            severity: report.severity,
            summary: report.summary,
            details: report.details,
            created_at: Utc::now(),
            source_address: report.source_address,
            subject_user: report.subject_user,
            status: IncidentStatus::Open,
            alert_id: report.alert_id,
            related_incidents: Vec::new(),
            actions: Vec::new(),
            assigned_to: None,
            resolved_by: None,
            resolved_at: None,
            notes: Vec::new(),
        }
    }

    /// Finds an owned action by id.
    pub fn action(&self, action_id: Uuid) -> Option<&ResponseAction> {
        self.actions.iter().find(|a| a.id == action_id)
    }

    /// Finds an owned action by id, mutably.
    pub fn action_mut(&mut self, action_id: Uuid) -> Option<&mut ResponseAction> {
        self.actions.iter_mut().find(|a| a.id == action_id)
    }

    /// Whether every owned action is settled or waiting on approval.
    /// Vacuously true for an incident with no actions; the mitigation rule
    /// additionally requires at least one completed action.
    pub fn all_actions_settled_or_gated(&self) -> bool {
        self.actions
            .iter()
            .all(|a| a.status.is_settled() || a.status == ActionStatus::RequiresApproval)
    }

    /// Whether at least one owned action completed successfully.
    pub fn any_action_completed(&self) -> bool {
        self.actions
            .iter()
            .any(|a| a.status == ActionStatus::Completed)
    }

    /// Appends a timestamped, attributed note.
    pub fn push_note(&mut self, author: &str, note: &str) {
        let stamped = format!(
            "[{}] {}: {}",
            Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
            author,
            note
        );
        self.notes.push(stamped);
    }
}

/// One remediation step belonging to an incident's workflow.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResponseAction {
    /// Unique identifier for this action.
    pub id: Uuid,
    /// Owning incident. Lookup relation only; the action list on the
    /// incident is the ownership edge.
    pub incident_id: Uuid,
    /// Step name, matching the workflow catalog entry.
    pub name: String,
    /// Step description.
    pub description: String,
    /// Current status.
    pub status: ActionStatus,
    /// When the action was created.
    pub created_at: DateTime<Utc>,
    /// When the action was last updated.
    pub updated_at: DateTime<Utc>,
    /// When the action completed, if it did.
    pub completed_at: Option<DateTime<Utc>>,
    /// Result payload returned by the handler, stored verbatim.
    pub result: Option<serde_json::Value>,
    /// Error text when the action failed.
    pub error: Option<String>,
    /// Who approved the action, if it was approval-gated.
    pub approved_by: Option<String>,
    /// When the action was approved.
    pub approved_at: Option<DateTime<Utc>>,
    /// How many times the action has been re-submitted after failure.
    pub retry_count: u32,
}

impl ResponseAction {
    /// Creates a new action for an incident. Approval-gated steps start in
    /// `RequiresApproval`, everything else in `Pending`.
    pub fn new(
        incident_id: Uuid,
        name: impl Into<String>,
        description: impl Into<String>,
        requires_approval: bool,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            incident_id,
            name: name.into(),
            description: description.into(),
            status: if requires_approval {
                ActionStatus::RequiresApproval
            } else {
                ActionStatus::Pending
            },
            created_at: now,
            updated_at: now,
            completed_at: None,
            result: None,
            error: None,
            approved_by: None,
            approved_at: None,
            retry_count: 0,
        }
    }
}

/// Formats the operator-facing incident dump used in notifications.
///
/// The shape is deterministic and consumed by operator tooling; keep field
/// order and labels stable.
pub fn format_incident_report(incident: &SecurityIncident) -> String {
    let details = serde_json::to_string_pretty(&incident.details)
        .unwrap_or_else(|_| incident.details.to_string());
    let actions = incident
        .actions
        .iter()
        .map(|a| format!("- {}: {}", a.name, a.status))
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        "Incident ID: {}\n\
         Type: {}\n\
         Severity: {}\n\
         Timestamp: {}\n\
         User: {}\n\
         Source IP: {}\n\
         Status: {}\n\
         \n\
         Summary: {}\n\
         \n\
         Details:\n{}\n\
         \n\
         Actions:\n{}\n",
        incident.id,
        incident.category,
        incident.severity,
        incident
            .created_at
            .to_rfc3339_opts(SecondsFormat::Millis, true),
        incident.subject_user.as_deref().unwrap_or("N/A"),
        incident.source_address.as_deref().unwrap_or("N/A"),
        incident.status,
        incident.summary,
        details,
        actions,
    )
}
