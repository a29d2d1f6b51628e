//! Incident lifecycle operations outside the automated workflow.
//!
//! Resolution, false-positive disposition, notes, and assignment are
//! human-driven mutations. Terminal dispositions are sticky and cancel any
//! in-flight automated execution for the incident.

use crate::incident::{ActionStatus, IncidentStatus};
use crate::orchestrator::ResponseOrchestrator;
use crate::remediation::RiskScoreStore;
use crate::store::IncidentStore;
use crate::tasks::{ActionTasks, IncidentLocks};
use aegis_observability::{AuditEventKind, AuditRecord, AuditSink};
use chrono::Utc;
use serde_json::json;
use std::sync::Arc;
use tracing::{info, instrument, warn};
use uuid::Uuid;

/// Human-driven incident mutations: resolve, false positive, notes,
/// assignment.
pub struct IncidentLifecycleManager {
    store: Arc<dyn IncidentStore>,
    audit: Arc<dyn AuditSink>,
    risk_scores: Arc<dyn RiskScoreStore>,
    locks: IncidentLocks,
    tasks: ActionTasks,
}

impl IncidentLifecycleManager {
    /// Creates a lifecycle manager sharing the orchestrator's store, audit
    /// sink, and concurrency registries.
    pub fn new(
        orchestrator: &ResponseOrchestrator,
        risk_scores: Arc<dyn RiskScoreStore>,
    ) -> Self {
        Self {
            store: Arc::clone(&orchestrator.store),
            audit: Arc::clone(&orchestrator.audit),
            risk_scores,
            locks: orchestrator.locks.clone(),
            tasks: orchestrator.tasks.clone(),
        }
    }

    /// Resolves an incident. Returns `false` for unknown ids and incidents
    /// already in a terminal state.
    #[instrument(skip(self, notes), fields(incident_id = %incident_id, resolved_by = %resolved_by))]
    pub async fn resolve(
        &self,
        incident_id: Uuid,
        resolved_by: &str,
        notes: Option<&str>,
    ) -> bool {
        self.close(incident_id, IncidentStatus::Resolved, resolved_by, notes)
            .await
    }

    /// Marks an incident as a false positive. Returns `false` for unknown
    /// ids and incidents already in a terminal state.
    #[instrument(skip(self, notes), fields(incident_id = %incident_id, marked_by = %marked_by))]
    pub async fn mark_false_positive(
        &self,
        incident_id: Uuid,
        marked_by: &str,
        notes: Option<&str>,
    ) -> bool {
        self.close(
            incident_id,
            IncidentStatus::FalsePositive,
            marked_by,
            notes,
        )
        .await
    }

    async fn close(
        &self,
        incident_id: Uuid,
        terminal: IncidentStatus,
        closed_by: &str,
        notes: Option<&str>,
    ) -> bool {
        let incident = {
            let _guard = self.locks.acquire(incident_id).await;
            let Ok(mut incident) = self.store.get(incident_id).await else {
                warn!("lifecycle operation on unknown incident");
                return false;
            };
            if incident.status.is_terminal() {
                warn!(status = %incident.status, "incident already closed");
                return false;
            }

            // Cancel whatever automation is still running; the incident's
            // disposition has been decided by a human.
            let aborted = self.tasks.abort_for_incident(incident_id).await;
            if aborted > 0 {
                info!(aborted, "cancelled in-flight response actions");
            }

            let now = Utc::now();
            incident.status = terminal;
            incident.resolved_by = Some(closed_by.to_string());
            incident.resolved_at = Some(now);
            if let Some(note) = notes {
                incident.push_note(closed_by, note);
            }
            for action in incident.actions.iter_mut() {
                if action.status == ActionStatus::InProgress {
                    action.status = ActionStatus::Failed;
                    action.error = Some(format!(
                        "execution cancelled: incident closed as {}",
                        terminal
                    ));
                    action.updated_at = now;
                }
            }
            if self.store.update(&incident).await.is_err() {
                return false;
            }

            let (kind, message) = match terminal {
                IncidentStatus::FalsePositive => (
                    AuditEventKind::IncidentFalsePositive,
                    format!(
                        "Security incident marked as false positive: {}",
                        incident.summary
                    ),
                ),
                _ => (
                    AuditEventKind::IncidentResolved,
                    format!("Security incident resolved: {}", incident.summary),
                ),
            };
            self.audit
                .record(
                    AuditRecord::new(kind, closed_by, message)
                        .with_incident(incident_id)
                        .with_context(json!({"notes": notes})),
                )
                .await;

            incident
        };

        info!(status = %terminal, "security incident closed");

        // The subject's behavioral score is tied to the incident; clear it
        // now that the incident has a human-confirmed disposition.
        if let Some(user) = &incident.subject_user {
            if let Err(e) = self.risk_scores.reset_risk_score(user).await {
                warn!(user = %user, error = %e, "failed to reset user risk score");
            }
        }

        true
    }

    /// Appends a timestamped, attributed note. Legal in any status,
    /// including terminal ones: notes are an audit trail, not a workflow
    /// input.
    #[instrument(skip(self, note), fields(incident_id = %incident_id, author = %author))]
    pub async fn add_note(&self, incident_id: Uuid, note: &str, author: &str) -> bool {
        let _guard = self.locks.acquire(incident_id).await;
        let Ok(mut incident) = self.store.get(incident_id).await else {
            warn!("note for unknown incident");
            return false;
        };

        incident.push_note(author, note);
        if self.store.update(&incident).await.is_err() {
            return false;
        }

        self.audit
            .record(
                AuditRecord::new(
                    AuditEventKind::NoteAdded,
                    author,
                    "Note added to security incident",
                )
                .with_incident(incident_id)
                .with_context(json!({"note": note})),
            )
            .await;
        true
    }

    /// Assigns the incident to an operator. Legal in any non-terminal
    /// status.
    #[instrument(skip(self), fields(incident_id = %incident_id, assignee = %assignee))]
    pub async fn assign(&self, incident_id: Uuid, assignee: &str, assigned_by: &str) -> bool {
        let _guard = self.locks.acquire(incident_id).await;
        let Ok(mut incident) = self.store.get(incident_id).await else {
            warn!("assignment for unknown incident");
            return false;
        };
        if incident.status.is_terminal() {
            warn!(status = %incident.status, "cannot assign a closed incident");
            return false;
        }

        incident.assigned_to = Some(assignee.to_string());
        if self.store.update(&incident).await.is_err() {
            return false;
        }

        self.audit
            .record(
                AuditRecord::new(
                    AuditEventKind::IncidentAssigned,
                    assigned_by,
                    "Security incident assigned",
                )
                .with_incident(incident_id)
                .with_context(json!({"assigned_to": assignee})),
            )
            .await;
        true
    }
}
