//! Monitoring and hardening handlers: rate limits, risk scoring, input
//! sanitization, credential and configuration measures.

use super::{require_detail, require_user};
use aegis_core::{HandlerError, SecurityIncident, StepHandler};
use async_trait::async_trait;
use serde_json::json;

/// Applies stricter rate limits to the user.
pub struct ThrottleUserRequests;

#[async_trait]
impl StepHandler for ThrottleUserRequests {
    async fn run(&self, incident: &SecurityIncident) -> Result<serde_json::Value, HandlerError> {
        let user = require_user(incident)?;
        Ok(json!({"rate_limit": "strict", "user": user}))
    }
}

/// Raises the user's behavioral risk score for closer monitoring.
pub struct IncreaseRiskScore;

#[async_trait]
impl StepHandler for IncreaseRiskScore {
    async fn run(&self, incident: &SecurityIncident) -> Result<serde_json::Value, HandlerError> {
        let user = require_user(incident)?;
        Ok(json!({"risk_score_increased": true, "user": user}))
    }
}

/// Applies enhanced monitoring to the user.
pub struct EnableEnhancedMonitoring;

#[async_trait]
impl StepHandler for EnableEnhancedMonitoring {
    async fn run(&self, incident: &SecurityIncident) -> Result<serde_json::Value, HandlerError> {
        let user = require_user(incident)?;
        Ok(json!({"enhanced_monitoring": true, "user": user}))
    }
}

/// Applies additional sanitization to the user's input.
pub struct SanitizeUserInput;

#[async_trait]
impl StepHandler for SanitizeUserInput {
    async fn run(&self, incident: &SecurityIncident) -> Result<serde_json::Value, HandlerError> {
        let user = require_user(incident)?;
        Ok(json!({"sanitization_enhanced": true, "user": user}))
    }
}

/// Applies additional query sanitization for the user.
pub struct ApplyQuerySanitization;

#[async_trait]
impl StepHandler for ApplyQuerySanitization {
    async fn run(&self, incident: &SecurityIncident) -> Result<serde_json::Value, HandlerError> {
        let user = require_user(incident)?;
        Ok(json!({"query_sanitization_enhanced": true, "user": user}))
    }
}

/// Temporarily disables the abused API key named in the detail payload.
pub struct DisableApiKey;

#[async_trait]
impl StepHandler for DisableApiKey {
    async fn run(&self, incident: &SecurityIncident) -> Result<serde_json::Value, HandlerError> {
        let key = require_detail(incident, "api_key")?;
        Ok(json!({"api_key_disabled": true, "key": key}))
    }
}

/// Reverts the misconfigured component to its default secure configuration.
pub struct ApplyDefaultConfiguration;

#[async_trait]
impl StepHandler for ApplyDefaultConfiguration {
    async fn run(&self, incident: &SecurityIncident) -> Result<serde_json::Value, HandlerError> {
        let component = require_detail(incident, "component")?;
        Ok(json!({"default_config_applied": true, "component": component}))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use aegis_core::{IncidentCategory, NewIncident, Severity};

    fn incident(category: IncidentCategory, details: serde_json::Value) -> SecurityIncident {
        SecurityIncident::open(
            NewIncident::new(category, Severity::Medium, "test", details)
                .with_subject_user("jdoe"),
        )
    }

    #[tokio::test]
    async fn test_throttle_applies_strict_rate_limit() {
        let incident = incident(IncidentCategory::DataExfiltration, json!({}));
        let result = ThrottleUserRequests.run(&incident).await.unwrap();
        assert_eq!(result["rate_limit"], "strict");
        assert_eq!(result["user"], "jdoe");
    }

    #[tokio::test]
    async fn test_monitoring_measures() {
        let incident = incident(IncidentCategory::SuspiciousActivity, json!({}));

        let result = IncreaseRiskScore.run(&incident).await.unwrap();
        assert_eq!(result["risk_score_increased"], true);

        let result = EnableEnhancedMonitoring.run(&incident).await.unwrap();
        assert_eq!(result["enhanced_monitoring"], true);
    }

    #[tokio::test]
    async fn test_sanitization_measures() {
        let incident = incident(IncidentCategory::XssAttempt, json!({}));

        let result = SanitizeUserInput.run(&incident).await.unwrap();
        assert_eq!(result["sanitization_enhanced"], true);

        let result = ApplyQuerySanitization.run(&incident).await.unwrap();
        assert_eq!(result["query_sanitization_enhanced"], true);
    }

    #[tokio::test]
    async fn test_disable_api_key_reads_detail_payload() {
        let incident = incident(
            IncidentCategory::ApiAbuse,
            json!({"api_key": "ak_live_deadbeef"}),
        );
        let result = DisableApiKey.run(&incident).await.unwrap();
        assert_eq!(result["api_key_disabled"], true);
        assert_eq!(result["key"], "ak_live_deadbeef");
    }

    #[tokio::test]
    async fn test_disable_api_key_without_key() {
        let incident = incident(IncidentCategory::ApiAbuse, json!({}));
        let result = DisableApiKey.run(&incident).await;
        assert!(matches!(result, Err(HandlerError::MissingField("api_key"))));
    }

    #[tokio::test]
    async fn test_apply_default_configuration() {
        let incident = incident(
            IncidentCategory::SystemMisconfiguration,
            json!({"component": "admin-panel"}),
        );
        let result = ApplyDefaultConfiguration.run(&incident).await.unwrap();
        assert_eq!(result["default_config_applied"], true);
        assert_eq!(result["component"], "admin-panel");
    }
}
