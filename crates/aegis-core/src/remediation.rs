//! Port traits for the external remediation collaborators.
//!
//! The engine treats IP blocking, two-factor administration, and risk-score
//! storage as black-box, at-least-once-callable services. Concrete
//! implementations (and the in-memory doubles used for embedding and tests)
//! live outside this crate.

use async_trait::async_trait;
use thiserror::Error;

/// Errors reported by remediation collaborators.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RemediationError {
    /// The collaborator could not be reached or is unhealthy.
    #[error("remediation provider unavailable: {0}")]
    Unavailable(String),

    /// The collaborator refused the request.
    #[error("remediation request rejected: {0}")]
    Rejected(String),
}

/// Blocks network addresses at the perimeter.
#[async_trait]
pub trait AddressBlocker: Send + Sync {
    /// Blocks a source address. The returned payload is stored verbatim as
    /// the action result.
    async fn block_address(
        &self,
        address: &str,
        reason: &str,
    ) -> Result<serde_json::Value, RemediationError>;
}

/// Administers two-factor authentication enrollment.
#[async_trait]
pub trait TwoFactorAdmin: Send + Sync {
    /// Disables two-factor authentication for a user so it can be
    /// re-enrolled from a trusted device.
    async fn disable_two_factor(&self, user: &str)
        -> Result<serde_json::Value, RemediationError>;
}

/// Stores behavioral risk scores for users.
#[async_trait]
pub trait RiskScoreStore: Send + Sync {
    /// Resets the risk score for a user, typically after an incident is
    /// closed.
    async fn reset_risk_score(&self, user: &str) -> Result<serde_json::Value, RemediationError>;
}
