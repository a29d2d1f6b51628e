//! # aegis-core
//!
//! Core orchestration engine for Aegis.
//!
//! This crate turns a detected security event into a tracked incident,
//! instantiates the remediation workflow configured for the incident's
//! category, executes or approval-gates each step, and tracks the incident
//! through to a terminal disposition. It is a library-level engine meant to
//! be embedded behind an HTTP or RPC layer owned by the surrounding
//! application.

pub mod approval;
pub mod catalog;
pub mod incident;
pub mod lifecycle;
pub mod notify;
pub mod orchestrator;
pub mod remediation;
pub mod store;
pub mod tasks;

pub use approval::ApprovalGate;
pub use catalog::{HandlerError, StepDefinition, StepHandler, WorkflowCatalog};
pub use incident::{
    format_incident_report, ActionStatus, IncidentCategory, IncidentStatus, NewIncident,
    ResponseAction, SecurityIncident, Severity,
};
pub use lifecycle::IncidentLifecycleManager;
pub use notify::{NotificationDispatcher, NotificationError, SecurityNotice};
pub use orchestrator::{OrchestratorConfig, OrchestratorError, ResponseOrchestrator};
pub use remediation::{AddressBlocker, RemediationError, RiskScoreStore, TwoFactorAdmin};
pub use store::{IncidentStore, MemoryIncidentStore, StoreError};
pub use tasks::{ActionTasks, IncidentLocks};
