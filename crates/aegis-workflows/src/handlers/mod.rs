//! Step handler implementations for the default remediation workflows.
//!
//! Handlers are grouped by family: containment (perimeter and file
//! measures), account (subject-user measures), monitoring (scoring and
//! sanitization), and notification.

pub mod account;
pub mod containment;
pub mod monitoring;
pub mod notify;

pub use account::{
    BlockDataAccess, BlockDatabaseAccess, BlockUploadCapability, BlockUserSession,
    ForcePasswordReset, InvalidateSessions, LockUserAccount, ResetTwoFactor,
};
pub use containment::{AddToWatchlist, BlockSourceAddress, QuarantineFile};
pub use monitoring::{
    ApplyDefaultConfiguration, ApplyQuerySanitization, DisableApiKey, EnableEnhancedMonitoring,
    IncreaseRiskScore, SanitizeUserInput, ThrottleUserRequests,
};
pub use notify::NotifyOperators;

use aegis_core::{HandlerError, SecurityIncident};

/// Returns the subject user or fails the step.
pub(crate) fn require_user(incident: &SecurityIncident) -> Result<&str, HandlerError> {
    incident
        .subject_user
        .as_deref()
        .ok_or(HandlerError::MissingField("subject_user"))
}

/// Returns the source address or fails the step.
pub(crate) fn require_address(incident: &SecurityIncident) -> Result<&str, HandlerError> {
    incident
        .source_address
        .as_deref()
        .ok_or(HandlerError::MissingField("source_address"))
}

/// Returns a string field from the detail payload or fails the step.
pub(crate) fn require_detail<'a>(
    incident: &'a SecurityIncident,
    key: &'static str,
) -> Result<&'a str, HandlerError> {
    incident
        .details
        .get(key)
        .and_then(serde_json::Value::as_str)
        .ok_or(HandlerError::MissingField(key))
}
