//! Approval gate for sensitive remediation steps.
//!
//! Approval-gated actions sit in `RequiresApproval` until a human principal
//! authorizes them; approval records the approver and hands the action back
//! to the orchestrator for execution.

use crate::incident::ActionStatus;
use crate::orchestrator::ResponseOrchestrator;
use aegis_observability::{AuditEventKind, AuditRecord};
use chrono::Utc;
use std::sync::Arc;
use tracing::{info, instrument, warn};
use uuid::Uuid;

/// Transitions approval-gated actions into execution.
pub struct ApprovalGate {
    orchestrator: Arc<ResponseOrchestrator>,
}

impl ApprovalGate {
    /// Creates a gate bound to an orchestrator.
    pub fn new(orchestrator: Arc<ResponseOrchestrator>) -> Self {
        Self { orchestrator }
    }

    /// Approves a gated action and submits it for execution.
    ///
    /// Returns `false` without mutating anything when the action is
    /// unknown, not awaiting approval, or belongs to a closed incident.
    /// Callers should treat a negative result as an idempotency signal, not
    /// an error: a second approval of the same action reports `false` and
    /// does not re-invoke the handler.
    #[instrument(skip(self), fields(action_id = %action_id, approved_by = %approved_by))]
    pub async fn approve(&self, action_id: Uuid, approved_by: &str) -> bool {
        let Ok(action) = self.orchestrator.store.get_action(action_id).await else {
            warn!("approval requested for unknown action");
            return false;
        };
        let incident_id = action.incident_id;

        {
            let _guard = self.orchestrator.locks.acquire(incident_id).await;
            let Ok(incident) = self.orchestrator.store.get(incident_id).await else {
                return false;
            };
            if incident.status.is_terminal() {
                warn!(status = %incident.status, "cannot approve an action on a closed incident");
                return false;
            }
            let Ok(mut action) = self.orchestrator.store.get_action(action_id).await else {
                return false;
            };
            if action.status != ActionStatus::RequiresApproval {
                warn!(status = %action.status, "action is not awaiting approval");
                return false;
            }

            let now = Utc::now();
            action.approved_by = Some(approved_by.to_string());
            action.approved_at = Some(now);
            action.status = ActionStatus::Pending;
            action.updated_at = now;
            if self.orchestrator.store.update_action(&action).await.is_err() {
                return false;
            }

            info!(action = %action.name, "security response action approved");
            self.orchestrator
                .audit
                .record(
                    AuditRecord::new(
                        AuditEventKind::ActionApproved,
                        approved_by,
                        format!("Security response action approved: {}", action.name),
                    )
                    .with_incident(incident_id)
                    .with_action(action_id),
                )
                .await;
        }

        self.orchestrator.submit(action_id, incident_id).await;
        true
    }
}
