//! Helpers for wiring up the real in-memory backends used across test
//! suites, instead of hand-rolled fakes: an in-memory `SurrealDB` state
//! store and a fresh in-process event bus.

use basecamp_events::EventBus;
use basecamp_storage::{Database, StorageResult, SurrealStateStore};

/// A `SurrealStateStore` backed by `SurrealDB`'s in-memory engine
/// (`mem://`), freshly namespaced so tests never see another test's
/// data.
///
/// # Errors
///
/// Returns a [`basecamp_storage::StorageError`] if the in-memory engine
/// fails to initialize, which should not happen in practice.
pub async fn test_store() -> StorageResult<SurrealStateStore> {
    let db = Database::connect_memory().await?;
    Ok(SurrealStateStore::new(db))
}

/// A fresh, unsubscribed event bus.
#[must_use]
pub fn test_event_bus() -> EventBus {
    EventBus::new()
}

#[cfg(test)]
mod tests {
    use basecamp_core::ids::WorkspaceId;
    use basecamp_storage::StateStore;

    use super::*;
    use crate::fixtures::test_workspace;

    #[tokio::test]
    async fn test_store_round_trips_a_workspace() {
        let store = test_store().await.unwrap();
        let workspace = test_workspace();
        store.put_workspace(&workspace).await.unwrap();

        let fetched = store.get_workspace(workspace.id).await.unwrap();
        assert_eq!(fetched.id, workspace.id);
    }

    #[tokio::test]
    async fn test_store_missing_workspace_errors() {
        let store = test_store().await.unwrap();
        assert!(store.get_workspace(WorkspaceId::new()).await.is_err());
    }

    #[tokio::test]
    async fn test_event_bus_delivers_published_events() {
        let bus = test_event_bus();
        let mut receiver = bus.subscribe();

        bus.publish(basecamp_events::EventRecord::new(
            basecamp_events::EventKind::WorkspaceRunning,
            basecamp_events::SubjectType::Workspace,
            "w-1",
            "test",
            serde_json::json!({}),
        ));

        let event = receiver.recv().await.unwrap();
        assert_eq!(event.kind, basecamp_events::EventKind::WorkspaceRunning);
    }
}
