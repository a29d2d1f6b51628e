//! Response orchestrator for Aegis.
//!
//! The orchestrator turns a detection report into a tracked incident,
//! instantiates the response actions configured for the incident's
//! category, and drives their asynchronous execution.
//!
//! ## Concurrency
//!
//! Every action executes as its own spawned task; sibling actions are
//! independent and carry no ordering guarantee, even within one incident.
//! Status mutations for a single incident are serialized through
//! [`IncidentLocks`]; the lock is never held across a handler invocation,
//! which is the only potentially slow point in the pipeline.

use crate::catalog::WorkflowCatalog;
use crate::incident::{
    ActionStatus, IncidentStatus, NewIncident, ResponseAction, SecurityIncident,
};
use crate::store::{IncidentStore, StoreError};
use crate::tasks::{ActionTasks, IncidentLocks};
use aegis_observability::{AuditEventKind, AuditRecord, AuditSink};
use chrono::Utc;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

/// Errors that can occur in the orchestrator.
#[derive(Error, Debug)]
pub enum OrchestratorError {
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Configuration for the orchestrator.
#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    /// Bound on a single handler invocation. A handler that exceeds it
    /// settles the action as failed with a timeout error.
    pub handler_timeout: Duration,
    /// Maximum number of times a failed action may be re-submitted.
    pub max_retries: u32,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            handler_timeout: Duration::from_secs(30),
            max_retries: 3,
        }
    }
}

/// Orchestrates incident creation and response action execution.
pub struct ResponseOrchestrator {
    catalog: Arc<WorkflowCatalog>,
    pub(crate) store: Arc<dyn IncidentStore>,
    pub(crate) audit: Arc<dyn AuditSink>,
    config: OrchestratorConfig,
    pub(crate) locks: IncidentLocks,
    pub(crate) tasks: ActionTasks,
}

impl ResponseOrchestrator {
    /// Creates an orchestrator with default configuration.
    pub fn new(
        catalog: Arc<WorkflowCatalog>,
        store: Arc<dyn IncidentStore>,
        audit: Arc<dyn AuditSink>,
    ) -> Self {
        Self::with_config(catalog, store, audit, OrchestratorConfig::default())
    }

    /// Creates an orchestrator with the specified configuration.
    pub fn with_config(
        catalog: Arc<WorkflowCatalog>,
        store: Arc<dyn IncidentStore>,
        audit: Arc<dyn AuditSink>,
        config: OrchestratorConfig,
    ) -> Self {
        Self {
            catalog,
            store,
            audit,
            config,
            locks: IncidentLocks::new(),
            tasks: ActionTasks::new(),
        }
    }

    /// Opens a new incident and kicks off its automated remediation.
    ///
    /// The incident is persisted before any actions are generated, so it is
    /// observable even if step generation fails. Actions not requiring
    /// approval are submitted for asynchronous execution before this
    /// returns; approval-gated actions wait for [`crate::ApprovalGate`].
    ///
    /// A category with no configured workflow yields an incident with zero
    /// actions. That is accepted behavior, not an error, but such an
    /// incident can never reach `Mitigated` without human intervention: no
    /// automation exists for the category.
    #[instrument(skip(self, report), fields(category = %report.category, severity = %report.severity))]
    pub async fn open_incident(
        self: &Arc<Self>,
        report: NewIncident,
    ) -> Result<SecurityIncident, OrchestratorError> {
        let mut incident = SecurityIncident::open(report);
        let incident_id = incident.id;

        self.store.create(&incident).await?;
        self.audit
            .record(
                AuditRecord::new(
                    AuditEventKind::IncidentCreated,
                    "system",
                    format!("Security incident created: {}", incident.summary),
                )
                .with_incident(incident_id)
                .with_context(json!({
                    "category": incident.category,
                    "severity": incident.severity,
                }))
                .with_subject(
                    incident
                        .source_address
                        .clone()
                        .unwrap_or_else(|| "system".to_string()),
                ),
            )
            .await;

        let steps = self.catalog.steps_for(incident.category);
        if steps.is_empty() {
            warn!(
                incident_id = %incident_id,
                category = %incident.category,
                "no workflow configured for category; incident will not auto-mitigate"
            );
            return Ok(incident);
        }

        for step in steps {
            incident.actions.push(ResponseAction::new(
                incident_id,
                &step.name,
                &step.description,
                step.requires_approval,
            ));
        }
        self.store.update(&incident).await?;

        info!(
            incident_id = %incident_id,
            actions = incident.actions.len(),
            "created incident with response workflow"
        );

        for action in &incident.actions {
            if action.status == ActionStatus::Pending {
                self.submit(action.id, incident_id).await;
            }
        }

        Ok(incident)
    }

    /// Gets an incident by id.
    pub async fn get_incident(&self, id: Uuid) -> Option<SecurityIncident> {
        self.store.get(id).await.ok()
    }

    /// Lists all incidents, most recently created first.
    pub async fn list_incidents(&self) -> Vec<SecurityIncident> {
        self.store.list_all().await.unwrap_or_default()
    }

    /// Re-submits a failed action through the normal execution path.
    ///
    /// Never automatic: remediation handlers are assumed idempotent but not
    /// guaranteed twice-safe, so retrying is an explicit operator decision,
    /// capped at [`OrchestratorConfig::max_retries`] per action. Returns
    /// `false` for unknown ids, non-failed actions, closed incidents, and
    /// exhausted retry budgets.
    #[instrument(skip(self), fields(action_id = %action_id, requested_by = %requested_by))]
    pub async fn retry(self: &Arc<Self>, action_id: Uuid, requested_by: &str) -> bool {
        let Ok(action) = self.store.get_action(action_id).await else {
            warn!("retry requested for unknown action");
            return false;
        };
        let incident_id = action.incident_id;

        {
            let _guard = self.locks.acquire(incident_id).await;
            let Ok(incident) = self.store.get(incident_id).await else {
                return false;
            };
            if incident.status.is_terminal() {
                warn!(status = %incident.status, "cannot retry an action on a closed incident");
                return false;
            }
            let Ok(mut action) = self.store.get_action(action_id).await else {
                return false;
            };
            if action.status != ActionStatus::Failed {
                warn!(status = %action.status, "only failed actions can be retried");
                return false;
            }
            if action.retry_count >= self.config.max_retries {
                warn!(
                    retry_count = action.retry_count,
                    "retry limit reached for action"
                );
                return false;
            }

            action.retry_count += 1;
            action.status = ActionStatus::Pending;
            action.error = None;
            action.updated_at = Utc::now();
            if self.store.update_action(&action).await.is_err() {
                return false;
            }

            self.audit
                .record(
                    AuditRecord::new(
                        AuditEventKind::ActionRetried,
                        requested_by,
                        format!("Security response action re-submitted: {}", action.name),
                    )
                    .with_incident(incident_id)
                    .with_action(action_id)
                    .with_context(json!({"retry_count": action.retry_count})),
                )
                .await;
        }

        self.submit(action_id, incident_id).await;
        true
    }

    /// Spawns the execution task for a runnable action and registers it for
    /// cancellation.
    pub(crate) async fn submit(self: &Arc<Self>, action_id: Uuid, incident_id: Uuid) {
        let orchestrator = Arc::clone(self);
        let handle = tokio::spawn(async move {
            orchestrator.execute(action_id).await;
            orchestrator.tasks.complete(action_id).await;
        });
        self.tasks
            .register(action_id, incident_id, handle.abort_handle())
            .await;
    }

    /// Executes one response action.
    ///
    /// A missing action or incident is a no-op: the record may have been
    /// settled or removed concurrently. One action's failure never aborts
    /// its siblings; each action's outcome is independent.
    #[instrument(skip(self), fields(action_id = %action_id))]
    async fn execute(&self, action_id: Uuid) {
        let action = match self.store.get_action(action_id).await {
            Ok(action) => action,
            Err(_) => {
                debug!("action no longer present, skipping execution");
                return;
            }
        };
        let incident_id = action.incident_id;

        // Claim the action under the incident lock. Anything other than a
        // still-pending action on a live incident means another path
        // settled or cancelled it first.
        {
            let _guard = self.locks.acquire(incident_id).await;
            let incident = match self.store.get(incident_id).await {
                Ok(incident) => incident,
                Err(_) => {
                    debug!("owning incident no longer present, skipping execution");
                    return;
                }
            };
            if incident.status.is_terminal() {
                debug!(status = %incident.status, "incident closed, skipping execution");
                return;
            }
            let mut action = match self.store.get_action(action_id).await {
                Ok(action) => action,
                Err(_) => return,
            };
            if action.status != ActionStatus::Pending {
                debug!(status = %action.status, "action not pending, skipping execution");
                return;
            }
            action.status = ActionStatus::InProgress;
            action.updated_at = Utc::now();
            if self.store.update_action(&action).await.is_err() {
                return;
            }
        }

        // Handler invocation runs outside the incident lock so siblings
        // keep making progress while this one awaits its collaborator.
        let outcome = match self.store.get(incident_id).await {
            Ok(incident) => match self.catalog.find_step(incident.category, &action.name) {
                Some(step) => {
                    match tokio::time::timeout(
                        self.config.handler_timeout,
                        step.handler.run(&incident),
                    )
                    .await
                    {
                        Ok(result) => result.map_err(|e| e.to_string()),
                        Err(_) => Err(format!(
                            "timed out after {}ms",
                            self.config.handler_timeout.as_millis()
                        )),
                    }
                }
                None => Err(format!(
                    "no workflow step named '{}' configured for category {}",
                    action.name, incident.category
                )),
            },
            Err(_) => return,
        };

        let _guard = self.locks.acquire(incident_id).await;
        let mut action = match self.store.get_action(action_id).await {
            Ok(action) => action,
            Err(_) => return,
        };
        if action.status != ActionStatus::InProgress {
            debug!(status = %action.status, "action settled elsewhere, dropping result");
            return;
        }

        let now = Utc::now();
        action.updated_at = now;
        match outcome {
            Ok(result) => {
                action.status = ActionStatus::Completed;
                action.completed_at = Some(now);
                action.result = Some(result);
                if self.store.update_action(&action).await.is_err() {
                    return;
                }
                info!(
                    incident_id = %incident_id,
                    action = %action.name,
                    "security response action completed"
                );
                self.audit
                    .record(
                        AuditRecord::new(
                            AuditEventKind::ActionCompleted,
                            "system",
                            format!("Security response action completed: {}", action.name),
                        )
                        .with_incident(incident_id)
                        .with_action(action_id)
                        .with_context(json!({"result": action.result})),
                    )
                    .await;
            }
            Err(error) => {
                action.status = ActionStatus::Failed;
                action.error = Some(error.clone());
                if self.store.update_action(&action).await.is_err() {
                    return;
                }
                warn!(
                    incident_id = %incident_id,
                    action = %action.name,
                    error = %error,
                    "security response action failed"
                );
                self.audit
                    .record(
                        AuditRecord::new(
                            AuditEventKind::ActionFailed,
                            "system",
                            format!("Security response action failed: {}", action.name),
                        )
                        .with_incident(incident_id)
                        .with_action(action_id)
                        .with_context(json!({"error": error})),
                    )
                    .await;
            }
        }

        // Mitigation check, still under the incident lock: once every
        // action is settled or waiting on approval and at least one
        // completed, the incident counts as mitigated. Only an open
        // incident transitions; the check is idempotent.
        if let Ok(mut incident) = self.store.get(incident_id).await {
            if incident.status == IncidentStatus::Open
                && incident.all_actions_settled_or_gated()
                && incident.any_action_completed()
            {
                incident.status = IncidentStatus::Mitigated;
                if self.store.update(&incident).await.is_ok() {
                    info!(incident_id = %incident_id, "security incident mitigated");
                    self.audit
                        .record(
                            AuditRecord::new(
                                AuditEventKind::IncidentMitigated,
                                "system",
                                format!("Security incident mitigated: {}", incident.summary),
                            )
                            .with_incident(incident_id),
                        )
                        .await;
                }
            }
        }
    }
}
