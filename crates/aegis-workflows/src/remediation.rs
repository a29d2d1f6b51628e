//! In-memory remediation collaborators.
//!
//! Recording implementations of the core remediation ports, for embedding
//! the engine without live collaborators and for tests. Each double records
//! the calls it receives and can be switched into a failing mode to
//! exercise error paths.

use aegis_core::{AddressBlocker, RemediationError, RiskScoreStore, TwoFactorAdmin};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::json;
use std::sync::Arc;
use tokio::sync::RwLock;

/// One blocked address entry.
#[derive(Debug, Clone)]
pub struct BlockedAddress {
    pub address: String,
    pub reason: String,
    pub blocked_at: DateTime<Utc>,
}

/// In-memory address blocker.
#[derive(Default)]
pub struct MemoryAddressBlocker {
    blocked: Arc<RwLock<Vec<BlockedAddress>>>,
    fail_message: Arc<RwLock<Option<String>>>,
}

impl MemoryAddressBlocker {
    /// Creates an empty blocker.
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every subsequent call fail with the given message.
    pub async fn fail_with(&self, message: impl Into<String>) {
        *self.fail_message.write().await = Some(message.into());
    }

    /// Clears a previously injected failure.
    pub async fn clear_failure(&self) {
        *self.fail_message.write().await = None;
    }

    /// Whether an address has been blocked.
    pub async fn is_blocked(&self, address: &str) -> bool {
        self.blocked
            .read()
            .await
            .iter()
            .any(|b| b.address == address)
    }

    /// Snapshot of all blocked addresses.
    pub async fn blocked(&self) -> Vec<BlockedAddress> {
        self.blocked.read().await.clone()
    }
}

#[async_trait]
impl AddressBlocker for MemoryAddressBlocker {
    async fn block_address(
        &self,
        address: &str,
        reason: &str,
    ) -> Result<serde_json::Value, RemediationError> {
        if let Some(message) = self.fail_message.read().await.clone() {
            return Err(RemediationError::Unavailable(message));
        }

        self.blocked.write().await.push(BlockedAddress {
            address: address.to_string(),
            reason: reason.to_string(),
            blocked_at: Utc::now(),
        });

        Ok(json!({
            "blocked": true,
            "address": address,
            "reason": reason,
        }))
    }
}

/// In-memory identity provider covering two-factor administration and risk
/// score storage.
#[derive(Default)]
pub struct MemoryIdentityProvider {
    two_factor_resets: Arc<RwLock<Vec<String>>>,
    risk_score_resets: Arc<RwLock<Vec<String>>>,
    fail_message: Arc<RwLock<Option<String>>>,
}

impl MemoryIdentityProvider {
    /// Creates an empty provider.
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every subsequent call fail with the given message.
    pub async fn fail_with(&self, message: impl Into<String>) {
        *self.fail_message.write().await = Some(message.into());
    }

    /// Clears a previously injected failure.
    pub async fn clear_failure(&self) {
        *self.fail_message.write().await = None;
    }

    /// Users whose two-factor enrollment was reset.
    pub async fn two_factor_resets(&self) -> Vec<String> {
        self.two_factor_resets.read().await.clone()
    }

    /// Users whose risk score was reset.
    pub async fn risk_score_resets(&self) -> Vec<String> {
        self.risk_score_resets.read().await.clone()
    }

    async fn check_failure(&self) -> Result<(), RemediationError> {
        match self.fail_message.read().await.clone() {
            Some(message) => Err(RemediationError::Unavailable(message)),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl TwoFactorAdmin for MemoryIdentityProvider {
    async fn disable_two_factor(
        &self,
        user: &str,
    ) -> Result<serde_json::Value, RemediationError> {
        self.check_failure().await?;
        self.two_factor_resets.write().await.push(user.to_string());
        Ok(json!({"two_factor_disabled": true, "user": user}))
    }
}

#[async_trait]
impl RiskScoreStore for MemoryIdentityProvider {
    async fn reset_risk_score(&self, user: &str) -> Result<serde_json::Value, RemediationError> {
        self.check_failure().await?;
        self.risk_score_resets.write().await.push(user.to_string());
        Ok(json!({"risk_score_reset": true, "user": user}))
    }
}
