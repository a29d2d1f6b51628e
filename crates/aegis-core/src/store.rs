//! Pluggable incident storage.
//!
//! The engine persists incidents and addresses individual response actions
//! through the [`IncidentStore`] trait so persistence can vary independently
//! of orchestration logic. [`MemoryIncidentStore`] is the default
//! implementation for embedding and tests.

use crate::incident::{ResponseAction, SecurityIncident};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::RwLock;
use uuid::Uuid;

/// Errors reported by incident stores.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("incident not found: {0}")]
    IncidentNotFound(Uuid),

    #[error("response action not found: {0}")]
    ActionNotFound(Uuid),

    #[error("incident already exists: {0}")]
    AlreadyExists(Uuid),
}

/// Keyed storage of incidents and their response actions.
///
/// Implementations must guarantee that concurrent readers observe
/// fully-formed records. No cross-incident transactionality is required;
/// each incident or action mutation is independent.
#[async_trait]
pub trait IncidentStore: Send + Sync {
    /// Persists a new incident.
    async fn create(&self, incident: &SecurityIncident) -> Result<(), StoreError>;

    /// Fetches an incident by id.
    async fn get(&self, id: Uuid) -> Result<SecurityIncident, StoreError>;

    /// Replaces a persisted incident.
    async fn update(&self, incident: &SecurityIncident) -> Result<(), StoreError>;

    /// Lists all incidents, most recently created first.
    async fn list_all(&self) -> Result<Vec<SecurityIncident>, StoreError>;

    /// Fetches a response action by id.
    async fn get_action(&self, id: Uuid) -> Result<ResponseAction, StoreError>;

    /// Replaces a response action within its owning incident.
    async fn update_action(&self, action: &ResponseAction) -> Result<(), StoreError>;
}

/// In-memory incident store.
///
/// Incidents own their action lists; a secondary index keeps actions
/// addressable by id without aliasing the records.
pub struct MemoryIncidentStore {
    incidents: Arc<RwLock<HashMap<Uuid, SecurityIncident>>>,
    /// action id -> owning incident id
    action_index: Arc<RwLock<HashMap<Uuid, Uuid>>>,
}

impl Default for MemoryIncidentStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryIncidentStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self {
            incidents: Arc::new(RwLock::new(HashMap::new())),
            action_index: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    async fn reindex(&self, incident: &SecurityIncident) {
        let mut index = self.action_index.write().await;
        for action in &incident.actions {
            index.insert(action.id, incident.id);
        }
    }
}

#[async_trait]
impl IncidentStore for MemoryIncidentStore {
    async fn create(&self, incident: &SecurityIncident) -> Result<(), StoreError> {
        {
            let mut incidents = self.incidents.write().await;
            if incidents.contains_key(&incident.id) {
                return Err(StoreError::AlreadyExists(incident.id));
            }
            incidents.insert(incident.id, incident.clone());
        }
        self.reindex(incident).await;
        Ok(())
    }

    async fn get(&self, id: Uuid) -> Result<SecurityIncident, StoreError> {
        let incidents = self.incidents.read().await;
        incidents
            .get(&id)
            .cloned()
            .ok_or(StoreError::IncidentNotFound(id))
    }

    async fn update(&self, incident: &SecurityIncident) -> Result<(), StoreError> {
        {
            let mut incidents = self.incidents.write().await;
            if !incidents.contains_key(&incident.id) {
                return Err(StoreError::IncidentNotFound(incident.id));
            }
            incidents.insert(incident.id, incident.clone());
        }
        self.reindex(incident).await;
        Ok(())
    }

    async fn list_all(&self) -> Result<Vec<SecurityIncident>, StoreError> {
        let incidents = self.incidents.read().await;
        let mut result: Vec<SecurityIncident> = incidents.values().cloned().collect();
        result.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(result)
    }

    async fn get_action(&self, id: Uuid) -> Result<ResponseAction, StoreError> {
        let incident_id = {
            let index = self.action_index.read().await;
            *index.get(&id).ok_or(StoreError::ActionNotFound(id))?
        };
        let incidents = self.incidents.read().await;
        incidents
            .get(&incident_id)
            .and_then(|incident| incident.action(id))
            .cloned()
            .ok_or(StoreError::ActionNotFound(id))
    }

    async fn update_action(&self, action: &ResponseAction) -> Result<(), StoreError> {
        let mut incidents = self.incidents.write().await;
        let incident = incidents
            .get_mut(&action.incident_id)
            .ok_or(StoreError::ActionNotFound(action.id))?;
        let slot = incident
            .action_mut(action.id)
            .ok_or(StoreError::ActionNotFound(action.id))?;
        *slot = action.clone();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::incident::{ActionStatus, IncidentCategory, NewIncident, Severity};

    fn incident(summary: &str) -> SecurityIncident {
        SecurityIncident::open(NewIncident::new(
            IncidentCategory::ApiAbuse,
            Severity::Medium,
            summary,
            serde_json::json!({}),
        ))
    }

    #[tokio::test]
    async fn test_create_and_get() {
        let store = MemoryIncidentStore::new();
        let incident = incident("abuse");

        store.create(&incident).await.unwrap();

        let fetched = store.get(incident.id).await.unwrap();
        assert_eq!(fetched.id, incident.id);
        assert_eq!(fetched.summary, "abuse");
    }

    #[tokio::test]
    async fn test_create_duplicate_rejected() {
        let store = MemoryIncidentStore::new();
        let incident = incident("abuse");

        store.create(&incident).await.unwrap();
        let result = store.create(&incident).await;
        assert_eq!(result, Err(StoreError::AlreadyExists(incident.id)));
    }

    #[tokio::test]
    async fn test_get_missing() {
        let store = MemoryIncidentStore::new();
        let id = Uuid::new_v4();
        assert!(matches!(
            store.get(id).await,
            Err(StoreError::IncidentNotFound(missing)) if missing == id
        ));
    }

    #[tokio::test]
    async fn test_update_missing() {
        let store = MemoryIncidentStore::new();
        let incident = incident("abuse");
        let result = store.update(&incident).await;
        assert_eq!(result, Err(StoreError::IncidentNotFound(incident.id)));
    }

    #[tokio::test]
    async fn test_list_all_most_recent_first() {
        let store = MemoryIncidentStore::new();

        let first = incident("first");
        store.create(&first).await.unwrap();
        tokio::time::sleep(std::time::Duration::from_millis(2)).await;
        let second = incident("second");
        store.create(&second).await.unwrap();

        let all = store.list_all().await.unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].summary, "second");
        assert_eq!(all[1].summary, "first");
    }

    #[tokio::test]
    async fn test_action_lookup_and_update() {
        let store = MemoryIncidentStore::new();
        let mut incident = incident("abuse");
        incident.actions.push(crate::incident::ResponseAction::new(
            incident.id,
            "Disable API Key",
            "disable",
            false,
        ));
        let action_id = incident.actions[0].id;
        store.create(&incident).await.unwrap();

        let mut action = store.get_action(action_id).await.unwrap();
        assert_eq!(action.incident_id, incident.id);
        assert_eq!(action.status, ActionStatus::Pending);

        action.status = ActionStatus::Completed;
        store.update_action(&action).await.unwrap();

        let fetched = store.get(incident.id).await.unwrap();
        assert_eq!(fetched.actions[0].status, ActionStatus::Completed);
    }

    #[tokio::test]
    async fn test_actions_indexed_on_update() {
        let store = MemoryIncidentStore::new();
        let mut incident = incident("abuse");
        store.create(&incident).await.unwrap();

        // Actions appended after creation become addressable once the
        // incident is updated.
        incident.actions.push(crate::incident::ResponseAction::new(
            incident.id,
            "Block Source IP",
            "block",
            false,
        ));
        let action_id = incident.actions[0].id;
        assert!(store.get_action(action_id).await.is_err());

        store.update(&incident).await.unwrap();
        assert!(store.get_action(action_id).await.is_ok());
    }

    #[tokio::test]
    async fn test_unknown_action() {
        let store = MemoryIncidentStore::new();
        let id = Uuid::new_v4();
        assert!(matches!(
            store.get_action(id).await,
            Err(StoreError::ActionNotFound(_))
        ));
    }
}
