//! The default workflow catalog.
//!
//! Maps every incident category to its predefined remediation workflow.
//! Steps marked with approval touch account access or data availability and
//! wait for a human principal; everything else executes automatically when
//! the incident is opened.

use crate::handlers::{
    AddToWatchlist, ApplyDefaultConfiguration, ApplyQuerySanitization, BlockDataAccess,
    BlockDatabaseAccess, BlockSourceAddress, BlockUploadCapability, BlockUserSession,
    DisableApiKey, EnableEnhancedMonitoring, ForcePasswordReset, IncreaseRiskScore,
    InvalidateSessions, LockUserAccount, NotifyOperators, QuarantineFile, ResetTwoFactor,
    SanitizeUserInput, ThrottleUserRequests,
};
use aegis_core::{
    AddressBlocker, IncidentCategory, NotificationDispatcher, StepDefinition, TwoFactorAdmin,
    WorkflowCatalog,
};
use std::sync::Arc;

/// Builds the default catalog over the given collaborators.
pub fn default_catalog(
    blocker: Arc<dyn AddressBlocker>,
    two_factor: Arc<dyn TwoFactorAdmin>,
    notifier: Arc<dyn NotificationDispatcher>,
) -> WorkflowCatalog {
    WorkflowCatalog::new()
        .with_workflow(
            IncidentCategory::BruteForce,
            vec![
                StepDefinition::new(
                    "Block Source IP",
                    "Automatically block the source IP address",
                    Arc::new(BlockSourceAddress::new(
                        Arc::clone(&blocker),
                        "Brute force attack detected",
                    )),
                ),
                StepDefinition::new(
                    "Lock User Account",
                    "Temporarily lock the affected user account",
                    Arc::new(LockUserAccount),
                )
                .with_approval(),
                StepDefinition::new(
                    "Send Notification",
                    "Send notification to security team",
                    Arc::new(NotifyOperators::new(
                        Arc::clone(&notifier),
                        "Brute Force Attack Detected",
                    )),
                ),
            ],
        )
        .with_workflow(
            IncidentCategory::AccountTakeover,
            vec![
                StepDefinition::new(
                    "Force Password Reset",
                    "Force a password reset for the affected account",
                    Arc::new(ForcePasswordReset),
                ),
                StepDefinition::new(
                    "Invalidate Sessions",
                    "Invalidate all active sessions for the user",
                    Arc::new(InvalidateSessions),
                ),
                StepDefinition::new(
                    "Reset 2FA",
                    "Reset two-factor authentication for the account",
                    Arc::new(ResetTwoFactor::new(Arc::clone(&two_factor))),
                )
                .with_approval(),
            ],
        )
        .with_workflow(
            IncidentCategory::DataExfiltration,
            vec![
                StepDefinition::new(
                    "Throttle User Requests",
                    "Apply stricter rate limits to the user",
                    Arc::new(ThrottleUserRequests),
                ),
                StepDefinition::new(
                    "Block Data Access",
                    "Temporarily block access to sensitive data",
                    Arc::new(BlockDataAccess),
                )
                .with_approval(),
                StepDefinition::new(
                    "Send High Priority Alert",
                    "Send high priority alert to security team",
                    Arc::new(NotifyOperators::high_priority(
                        Arc::clone(&notifier),
                        "URGENT: Data Exfiltration Detected",
                    )),
                ),
            ],
        )
        .with_workflow(
            IncidentCategory::ApiAbuse,
            vec![
                StepDefinition::new(
                    "Disable API Key",
                    "Temporarily disable the abused API key",
                    Arc::new(DisableApiKey),
                ),
                StepDefinition::new(
                    "Block Source IP",
                    "Block the source IP address",
                    Arc::new(BlockSourceAddress::new(
                        Arc::clone(&blocker),
                        "API abuse detected",
                    )),
                ),
            ],
        )
        .with_workflow(
            IncidentCategory::SuspiciousActivity,
            vec![
                StepDefinition::new(
                    "Increase Risk Score",
                    "Increase user risk score for monitoring",
                    Arc::new(IncreaseRiskScore),
                ),
                StepDefinition::new(
                    "Enable Enhanced Monitoring",
                    "Apply enhanced monitoring to the user",
                    Arc::new(EnableEnhancedMonitoring),
                ),
            ],
        )
        .with_workflow(
            IncidentCategory::FileUploadAbuse,
            vec![
                StepDefinition::new(
                    "Quarantine File",
                    "Move the file to quarantine for further analysis",
                    Arc::new(QuarantineFile),
                ),
                StepDefinition::new(
                    "Block Upload Capability",
                    "Temporarily block the user from uploading files",
                    Arc::new(BlockUploadCapability),
                )
                .with_approval(),
            ],
        )
        .with_workflow(
            IncidentCategory::XssAttempt,
            vec![
                StepDefinition::new(
                    "Sanitize User Input",
                    "Apply additional sanitization to user input",
                    Arc::new(SanitizeUserInput),
                ),
                StepDefinition::new(
                    "Block User Session",
                    "Terminate and block the current user session",
                    Arc::new(BlockUserSession),
                ),
            ],
        )
        .with_workflow(
            IncidentCategory::SqlInjection,
            vec![
                StepDefinition::new(
                    "Block Database Access",
                    "Temporarily block database access for the user",
                    Arc::new(BlockDatabaseAccess),
                )
                .with_approval(),
                StepDefinition::new(
                    "Apply Query Sanitization",
                    "Apply additional query sanitization for the user",
                    Arc::new(ApplyQuerySanitization),
                ),
                StepDefinition::new(
                    "Send Critical Alert",
                    "Send critical alert to security team",
                    Arc::new(NotifyOperators::high_priority(
                        Arc::clone(&notifier),
                        "CRITICAL: SQL Injection Attempt",
                    )),
                ),
            ],
        )
        .with_workflow(
            IncidentCategory::HoneypotTriggered,
            vec![
                StepDefinition::new(
                    "Block Source IP",
                    "Block the source IP address",
                    Arc::new(BlockSourceAddress::new(
                        Arc::clone(&blocker),
                        "Honeypot triggered",
                    )),
                ),
                StepDefinition::new(
                    "Add to Watchlist",
                    "Add the IP to a security watchlist",
                    Arc::new(AddToWatchlist),
                ),
            ],
        )
        .with_workflow(
            IncidentCategory::SystemMisconfiguration,
            vec![
                StepDefinition::new(
                    "Apply Default Configuration",
                    "Revert to default secure configuration",
                    Arc::new(ApplyDefaultConfiguration),
                )
                .with_approval(),
                StepDefinition::new(
                    "Notify Administrator",
                    "Send notification to system administrator",
                    Arc::new(NotifyOperators::new(
                        Arc::clone(&notifier),
                        "System Misconfiguration Detected",
                    )),
                ),
            ],
        )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notifier::MemoryNotifier;
    use crate::remediation::{MemoryAddressBlocker, MemoryIdentityProvider};

    fn catalog() -> WorkflowCatalog {
        default_catalog(
            Arc::new(MemoryAddressBlocker::new()),
            Arc::new(MemoryIdentityProvider::new()),
            Arc::new(MemoryNotifier::new()),
        )
    }

    #[test]
    fn test_every_category_has_a_workflow() {
        let catalog = catalog();
        let categories = [
            IncidentCategory::BruteForce,
            IncidentCategory::AccountTakeover,
            IncidentCategory::DataExfiltration,
            IncidentCategory::ApiAbuse,
            IncidentCategory::SuspiciousActivity,
            IncidentCategory::FileUploadAbuse,
            IncidentCategory::XssAttempt,
            IncidentCategory::SqlInjection,
            IncidentCategory::HoneypotTriggered,
            IncidentCategory::SystemMisconfiguration,
        ];

        assert_eq!(catalog.len(), categories.len());
        for category in categories {
            assert!(
                !catalog.steps_for(category).is_empty(),
                "no workflow for {}",
                category
            );
        }
    }

    #[test]
    fn test_approval_gates_match_configuration() {
        let catalog = catalog();

        let gated = [
            (IncidentCategory::BruteForce, "Lock User Account"),
            (IncidentCategory::AccountTakeover, "Reset 2FA"),
            (IncidentCategory::DataExfiltration, "Block Data Access"),
            (IncidentCategory::FileUploadAbuse, "Block Upload Capability"),
            (IncidentCategory::SqlInjection, "Block Database Access"),
            (
                IncidentCategory::SystemMisconfiguration,
                "Apply Default Configuration",
            ),
        ];
        for (category, name) in gated {
            let step = catalog.find_step(category, name).unwrap();
            assert!(step.requires_approval, "{} should be gated", name);
        }

        // Spot-check that automated steps are not gated.
        assert!(
            !catalog
                .find_step(IncidentCategory::BruteForce, "Block Source IP")
                .unwrap()
                .requires_approval
        );
        assert!(
            !catalog
                .find_step(IncidentCategory::SqlInjection, "Send Critical Alert")
                .unwrap()
                .requires_approval
        );
    }

    #[test]
    fn test_workflow_step_counts() {
        let catalog = catalog();
        assert_eq!(catalog.steps_for(IncidentCategory::BruteForce).len(), 3);
        assert_eq!(catalog.steps_for(IncidentCategory::AccountTakeover).len(), 3);
        assert_eq!(catalog.steps_for(IncidentCategory::DataExfiltration).len(), 3);
        assert_eq!(catalog.steps_for(IncidentCategory::ApiAbuse).len(), 2);
        assert_eq!(catalog.steps_for(IncidentCategory::SqlInjection).len(), 3);
        assert_eq!(catalog.steps_for(IncidentCategory::HoneypotTriggered).len(), 2);
    }
}
