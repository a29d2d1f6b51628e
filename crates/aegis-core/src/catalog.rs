//! Workflow catalog for Aegis.
//!
//! The catalog is an immutable mapping from incident category to the
//! ordered remediation steps that make up its response workflow. It is
//! configuration data: lookups have no side effects, and a category with no
//! entry yields an empty step list rather than an error.

use crate::incident::{IncidentCategory, SecurityIncident};
use crate::notify::NotificationError;
use crate::remediation::RemediationError;
use async_trait::async_trait;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

/// Errors a step handler can produce.
#[derive(Error, Debug)]
pub enum HandlerError {
    /// The incident lacks a field this step needs.
    #[error("missing incident field: {0}")]
    MissingField(&'static str),

    #[error(transparent)]
    Remediation(#[from] RemediationError),

    #[error(transparent)]
    Notification(#[from] NotificationError),
}

/// An idempotent remediation capability invoked with the incident as its
/// sole input. The returned payload is stored verbatim as the action result.
#[async_trait]
pub trait StepHandler: Send + Sync {
    async fn run(&self, incident: &SecurityIncident) -> Result<serde_json::Value, HandlerError>;
}

/// One step of a remediation workflow.
#[derive(Clone)]
pub struct StepDefinition {
    /// Step name; unique within its workflow.
    pub name: String,
    /// Human-readable description.
    pub description: String,
    /// Whether a human principal must approve the step before it runs.
    pub requires_approval: bool,
    /// The capability executed for this step.
    pub handler: Arc<dyn StepHandler>,
}

impl StepDefinition {
    /// Creates a step that runs without approval.
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        handler: Arc<dyn StepHandler>,
    ) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            requires_approval: false,
            handler,
        }
    }

    /// Marks the step as approval-gated.
    pub fn with_approval(mut self) -> Self {
        self.requires_approval = true;
        self
    }
}

impl fmt::Debug for StepDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StepDefinition")
            .field("name", &self.name)
            .field("requires_approval", &self.requires_approval)
            .finish_non_exhaustive()
    }
}

/// Immutable mapping from incident category to its remediation workflow.
#[derive(Debug, Default)]
pub struct WorkflowCatalog {
    workflows: HashMap<IncidentCategory, Vec<StepDefinition>>,
}

impl WorkflowCatalog {
    /// Creates an empty catalog.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds the workflow for a category, replacing any previous entry.
    pub fn with_workflow(
        mut self,
        category: IncidentCategory,
        steps: Vec<StepDefinition>,
    ) -> Self {
        self.workflows.insert(category, steps);
        self
    }

    /// Returns the ordered steps for a category. A category with no entry
    /// yields an empty slice: no automation exists for it.
    pub fn steps_for(&self, category: IncidentCategory) -> &[StepDefinition] {
        self.workflows
            .get(&category)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Finds a step by name within a category's workflow.
    pub fn find_step(&self, category: IncidentCategory, name: &str) -> Option<&StepDefinition> {
        self.steps_for(category).iter().find(|s| s.name == name)
    }

    /// Number of categories with a configured workflow.
    pub fn len(&self) -> usize {
        self.workflows.len()
    }

    /// Whether the catalog has no workflows at all.
    pub fn is_empty(&self) -> bool {
        self.workflows.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::incident::{NewIncident, Severity};

    struct NoopHandler;

    #[async_trait]
    impl StepHandler for NoopHandler {
        async fn run(
            &self,
            _incident: &SecurityIncident,
        ) -> Result<serde_json::Value, HandlerError> {
            Ok(serde_json::json!({"ok": true}))
        }
    }

    fn catalog() -> WorkflowCatalog {
        WorkflowCatalog::new().with_workflow(
            IncidentCategory::BruteForce,
            vec![
                StepDefinition::new("Block Source IP", "block", Arc::new(NoopHandler)),
                StepDefinition::new("Lock User Account", "lock", Arc::new(NoopHandler))
                    .with_approval(),
            ],
        )
    }

    #[test]
    fn test_steps_for_known_category() {
        let catalog = catalog();
        let steps = catalog.steps_for(IncidentCategory::BruteForce);
        assert_eq!(steps.len(), 2);
        assert_eq!(steps[0].name, "Block Source IP");
        assert!(!steps[0].requires_approval);
        assert!(steps[1].requires_approval);
    }

    #[test]
    fn test_steps_for_unknown_category_is_empty() {
        let catalog = catalog();
        assert!(catalog.steps_for(IncidentCategory::ApiAbuse).is_empty());
    }

    #[test]
    fn test_find_step() {
        let catalog = catalog();
        assert!(catalog
            .find_step(IncidentCategory::BruteForce, "Lock User Account")
            .is_some());
        assert!(catalog
            .find_step(IncidentCategory::BruteForce, "No Such Step")
            .is_none());
        assert!(catalog
            .find_step(IncidentCategory::ApiAbuse, "Block Source IP")
            .is_none());
    }

    #[tokio::test]
    async fn test_handler_runs_against_incident() {
        let catalog = catalog();
        let incident = SecurityIncident::open(NewIncident::new(
            IncidentCategory::BruteForce,
            Severity::High,
            "test",
            serde_json::json!({}),
        ));

        let step = catalog
            .find_step(IncidentCategory::BruteForce, "Block Source IP")
            .unwrap();
        let result = step.handler.run(&incident).await.unwrap();
        assert_eq!(result["ok"], true);
    }
}
