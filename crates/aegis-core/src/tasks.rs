//! Shared concurrency registries.
//!
//! Scheduling is single-writer-per-incident with many concurrent incidents:
//! [`IncidentLocks`] hands out one mutex per incident so status mutations
//! for a single incident are serialized without a global lock, and
//! [`ActionTasks`] tracks the spawned execution task for each in-flight
//! action so terminal lifecycle transitions can cancel them.

use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tokio::task::AbortHandle;
use uuid::Uuid;

/// Per-incident mutual exclusion.
#[derive(Clone, Default)]
pub struct IncidentLocks {
    locks: Arc<Mutex<HashMap<Uuid, Arc<Mutex<()>>>>>,
}

impl IncidentLocks {
    /// Creates an empty lock registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Acquires the mutex for an incident, creating it on first use. The
    /// guard must not be held across a handler invocation.
    pub async fn acquire(&self, incident_id: Uuid) -> OwnedMutexGuard<()> {
        let lock = {
            let mut locks = self.locks.lock().await;
            Arc::clone(locks.entry(incident_id).or_default())
        };
        lock.lock_owned().await
    }
}

struct TaskEntry {
    incident_id: Uuid,
    handle: AbortHandle,
}

/// Registry of in-flight action execution tasks, keyed by action id.
#[derive(Clone, Default)]
pub struct ActionTasks {
    tasks: Arc<Mutex<HashMap<Uuid, TaskEntry>>>,
}

impl ActionTasks {
    /// Creates an empty task registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers the task executing an action.
    pub async fn register(&self, action_id: Uuid, incident_id: Uuid, handle: AbortHandle) {
        let mut tasks = self.tasks.lock().await;
        tasks.insert(
            action_id,
            TaskEntry {
                incident_id,
                handle,
            },
        );
    }

    /// Removes the entry for a settled action.
    pub async fn complete(&self, action_id: Uuid) {
        let mut tasks = self.tasks.lock().await;
        tasks.remove(&action_id);
    }

    /// Aborts every in-flight task belonging to an incident. Returns the
    /// number of tasks that were aborted.
    pub async fn abort_for_incident(&self, incident_id: Uuid) -> usize {
        let mut tasks = self.tasks.lock().await;
        let ids: Vec<Uuid> = tasks
            .iter()
            .filter(|(_, entry)| entry.incident_id == incident_id)
            .map(|(id, _)| *id)
            .collect();
        for id in &ids {
            if let Some(entry) = tasks.remove(id) {
                entry.handle.abort();
            }
        }
        ids.len()
    }

    /// Number of tasks currently registered.
    pub async fn in_flight(&self) -> usize {
        self.tasks.lock().await.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_lock_serializes_per_incident() {
        let locks = IncidentLocks::new();
        let incident_id = Uuid::new_v4();

        let guard = locks.acquire(incident_id).await;

        let contender = {
            let locks = locks.clone();
            tokio::spawn(async move {
                let _guard = locks.acquire(incident_id).await;
            })
        };

        // The contender cannot finish while the guard is held.
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!contender.is_finished());

        drop(guard);
        contender.await.unwrap();
    }

    #[tokio::test]
    async fn test_distinct_incidents_do_not_contend() {
        let locks = IncidentLocks::new();
        let _first = locks.acquire(Uuid::new_v4()).await;
        // A different incident's lock is immediately available.
        let _second = locks.acquire(Uuid::new_v4()).await;
    }

    #[tokio::test]
    async fn test_abort_for_incident() {
        let tasks = ActionTasks::new();
        let incident_id = Uuid::new_v4();
        let other_incident = Uuid::new_v4();

        let hung = tokio::spawn(async {
            tokio::time::sleep(Duration::from_secs(600)).await;
        });
        let unrelated = tokio::spawn(async {
            tokio::time::sleep(Duration::from_secs(600)).await;
        });

        tasks
            .register(Uuid::new_v4(), incident_id, hung.abort_handle())
            .await;
        tasks
            .register(Uuid::new_v4(), other_incident, unrelated.abort_handle())
            .await;

        let aborted = tasks.abort_for_incident(incident_id).await;
        assert_eq!(aborted, 1);
        assert_eq!(tasks.in_flight().await, 1);

        assert!(hung.await.unwrap_err().is_cancelled());
        unrelated.abort();
    }

    #[tokio::test]
    async fn test_complete_removes_entry() {
        let tasks = ActionTasks::new();
        let action_id = Uuid::new_v4();
        let handle = tokio::spawn(async {});

        tasks
            .register(action_id, Uuid::new_v4(), handle.abort_handle())
            .await;
        assert_eq!(tasks.in_flight().await, 1);

        tasks.complete(action_id).await;
        assert_eq!(tasks.in_flight().await, 0);
        handle.await.unwrap();
    }
}
