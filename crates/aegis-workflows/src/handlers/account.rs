//! Account handlers: measures applied to the incident's subject user.
//!
//! Apart from the two-factor reset, which goes through the identity
//! collaborator, these report the measure back to the surrounding
//! application through the action result payload.

use super::require_user;
use aegis_core::{HandlerError, SecurityIncident, StepHandler, TwoFactorAdmin};
use async_trait::async_trait;
use serde_json::json;
use std::sync::Arc;
use tracing::{info, instrument};

/// Temporarily locks the affected user account.
pub struct LockUserAccount;

#[async_trait]
impl StepHandler for LockUserAccount {
    async fn run(&self, incident: &SecurityIncident) -> Result<serde_json::Value, HandlerError> {
        let user = require_user(incident)?;
        Ok(json!({"account_locked": true, "user": user}))
    }
}

/// Forces a password reset for the affected account.
pub struct ForcePasswordReset;

#[async_trait]
impl StepHandler for ForcePasswordReset {
    async fn run(&self, incident: &SecurityIncident) -> Result<serde_json::Value, HandlerError> {
        let user = require_user(incident)?;
        Ok(json!({"password_reset_initiated": true, "user": user}))
    }
}

/// Invalidates all active sessions for the user.
pub struct InvalidateSessions;

#[async_trait]
impl StepHandler for InvalidateSessions {
    async fn run(&self, incident: &SecurityIncident) -> Result<serde_json::Value, HandlerError> {
        let user = require_user(incident)?;
        Ok(json!({"sessions_invalidated": true, "user": user}))
    }
}

/// Resets two-factor authentication for the account via the identity
/// collaborator.
pub struct ResetTwoFactor {
    admin: Arc<dyn TwoFactorAdmin>,
}

impl ResetTwoFactor {
    pub fn new(admin: Arc<dyn TwoFactorAdmin>) -> Self {
        Self { admin }
    }
}

#[async_trait]
impl StepHandler for ResetTwoFactor {
    #[instrument(skip(self, incident), fields(incident_id = %incident.id))]
    async fn run(&self, incident: &SecurityIncident) -> Result<serde_json::Value, HandlerError> {
        let user = require_user(incident)?;
        info!(user = %user, "resetting two-factor authentication");
        let result = self.admin.disable_two_factor(user).await?;
        Ok(result)
    }
}

/// Temporarily blocks the user from uploading files.
pub struct BlockUploadCapability;

#[async_trait]
impl StepHandler for BlockUploadCapability {
    async fn run(&self, incident: &SecurityIncident) -> Result<serde_json::Value, HandlerError> {
        let user = require_user(incident)?;
        Ok(json!({"upload_blocked": true, "user": user}))
    }
}

/// Temporarily blocks the user's access to sensitive data.
pub struct BlockDataAccess;

#[async_trait]
impl StepHandler for BlockDataAccess {
    async fn run(&self, incident: &SecurityIncident) -> Result<serde_json::Value, HandlerError> {
        let user = require_user(incident)?;
        Ok(json!({"data_access_blocked": true, "user": user}))
    }
}

/// Terminates and blocks the user's current session.
pub struct BlockUserSession;

#[async_trait]
impl StepHandler for BlockUserSession {
    async fn run(&self, incident: &SecurityIncident) -> Result<serde_json::Value, HandlerError> {
        let user = require_user(incident)?;
        Ok(json!({"session_blocked": true, "user": user}))
    }
}

/// Temporarily blocks database access for the user.
pub struct BlockDatabaseAccess;

#[async_trait]
impl StepHandler for BlockDatabaseAccess {
    async fn run(&self, incident: &SecurityIncident) -> Result<serde_json::Value, HandlerError> {
        let user = require_user(incident)?;
        Ok(json!({"database_access_blocked": true, "user": user}))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::remediation::MemoryIdentityProvider;
    use aegis_core::{IncidentCategory, NewIncident, Severity};

    fn incident_with_user() -> SecurityIncident {
        SecurityIncident::open(
            NewIncident::new(
                IncidentCategory::AccountTakeover,
                Severity::Critical,
                "impossible travel",
                json!({}),
            )
            .with_subject_user("jdoe"),
        )
    }

    fn incident_without_user() -> SecurityIncident {
        SecurityIncident::open(NewIncident::new(
            IncidentCategory::AccountTakeover,
            Severity::Critical,
            "impossible travel",
            json!({}),
        ))
    }

    #[tokio::test]
    async fn test_lock_user_account() {
        let result = LockUserAccount.run(&incident_with_user()).await.unwrap();
        assert_eq!(result["account_locked"], true);
        assert_eq!(result["user"], "jdoe");
    }

    #[tokio::test]
    async fn test_reset_two_factor() {
        let provider = Arc::new(MemoryIdentityProvider::new());
        let handler = ResetTwoFactor::new(Arc::clone(&provider) as Arc<dyn TwoFactorAdmin>);

        let result = handler.run(&incident_with_user()).await.unwrap();
        assert_eq!(result["two_factor_disabled"], true);
        assert_eq!(provider.two_factor_resets().await, ["jdoe"]);
    }

    #[tokio::test]
    async fn test_handlers_require_subject_user() {
        let incident = incident_without_user();

        assert!(matches!(
            LockUserAccount.run(&incident).await,
            Err(HandlerError::MissingField("subject_user"))
        ));
        assert!(matches!(
            ForcePasswordReset.run(&incident).await,
            Err(HandlerError::MissingField("subject_user"))
        ));
        assert!(matches!(
            InvalidateSessions.run(&incident).await,
            Err(HandlerError::MissingField("subject_user"))
        ));
        assert!(matches!(
            BlockDataAccess.run(&incident).await,
            Err(HandlerError::MissingField("subject_user"))
        ));
    }

    #[tokio::test]
    async fn test_session_and_access_measures() {
        let incident = incident_with_user();

        let result = InvalidateSessions.run(&incident).await.unwrap();
        assert_eq!(result["sessions_invalidated"], true);

        let result = BlockUserSession.run(&incident).await.unwrap();
        assert_eq!(result["session_blocked"], true);

        let result = BlockUploadCapability.run(&incident).await.unwrap();
        assert_eq!(result["upload_blocked"], true);

        let result = BlockDatabaseAccess.run(&incident).await.unwrap();
        assert_eq!(result["database_access_blocked"], true);
    }
}
