//! Event store interface (port) and its log-backed implementation

use crate::backend::LogBackend;
use crate::error::{Result, StoreError};
use crate::history::EventHistory;
use crate::resolver::current_record;
use crate::types::Record;
use crate::writer::{apply_write, stored_record, WriteOp};
use async_trait::async_trait;

/// Key/value operations over an append-only event log.
///
/// Each call concerns exactly one key and runs as one unit against the log.
/// Writes reject an empty key with `InvalidKey` before touching the log;
/// storage failures surface as `Internal`.
#[async_trait]
pub trait EventStore: Send + Sync {
    /// Create a record. Fails with `AlreadyExists` if the key is present,
    /// `InvalidKey` if it is empty.
    async fn create(&self, key: &str, value: &str) -> Result<Record>;

    /// Replace the value of a present key. Fails with `NotFound` if absent,
    /// `InvalidKey` if the key is empty.
    async fn update(&self, key: &str, value: &str) -> Result<Record>;

    /// Remove a present key. Fails with `NotFound` if absent, `InvalidKey`
    /// if the key is empty.
    async fn delete(&self, key: &str) -> Result<()>;

    /// Current record for a key. Fails with `NotFound` if absent.
    async fn get_current(&self, key: &str) -> Result<Record>;

    /// All events for a key, oldest first. An unknown key yields an empty
    /// history.
    async fn get_history(&self, key: &str) -> Result<EventHistory>;
}

/// [`EventStore`] over any [`LogBackend`]
#[derive(Debug, Clone)]
pub struct EventLogStore<B> {
    backend: B,
}

impl<B: LogBackend> EventLogStore<B> {
    pub fn new(backend: B) -> Self {
        Self { backend }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Whether the key currently resolves to a record
    pub async fn exists(&self, key: &str) -> Result<bool> {
        match self.get_current(key).await {
            Ok(_) => Ok(true),
            Err(StoreError::NotFound { .. }) => Ok(false),
            Err(e) => Err(e),
        }
    }
}

#[async_trait]
impl<B: LogBackend> EventStore for EventLogStore<B> {
    async fn create(&self, key: &str, value: &str) -> Result<Record> {
        let event = apply_write(&self.backend, WriteOp::Create { key, value }).await?;
        Ok(stored_record(event))
    }

    async fn update(&self, key: &str, value: &str) -> Result<Record> {
        let event = apply_write(&self.backend, WriteOp::Update { key, value }).await?;
        Ok(stored_record(event))
    }

    async fn delete(&self, key: &str) -> Result<()> {
        apply_write(&self.backend, WriteOp::Delete { key }).await?;
        Ok(())
    }

    async fn get_current(&self, key: &str) -> Result<Record> {
        let latest = self.backend.latest_event(key).await?;
        current_record(key, latest)
    }

    async fn get_history(&self, key: &str) -> Result<EventHistory> {
        self.backend.history(key).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryLog;
    use crate::types::EventKind;

    fn store() -> EventLogStore<MemoryLog> {
        EventLogStore::new(MemoryLog::new())
    }

    #[tokio::test]
    async fn test_create_then_get() {
        let store = store();

        let created = store.create("Hello", "World!").await.unwrap();
        assert_eq!(created, Record::new("Hello", "World!"));
        assert_eq!(store.get_current("Hello").await.unwrap(), created);

        let again = store.create("Hello", "World!").await;
        assert!(matches!(again, Err(StoreError::AlreadyExists { .. })));
        assert_eq!(store.backend().event_count().await, 1);
    }

    #[tokio::test]
    async fn test_update_absent_appends_nothing() {
        let store = store();

        let result = store.update("hello", "").await;
        assert!(matches!(result, Err(StoreError::NotFound { .. })));
        assert_eq!(store.backend().event_count().await, 0);
    }

    #[tokio::test]
    async fn test_lifecycle_history() {
        let store = store();

        store.create("x", "1").await.unwrap();
        assert_eq!(store.get_current("x").await.unwrap().value, "1");
        store.update("x", "2").await.unwrap();
        assert_eq!(store.get_current("x").await.unwrap().value, "2");
        store.delete("x").await.unwrap();
        assert!(matches!(store.get_current("x").await, Err(StoreError::NotFound { .. })));

        let history = store.get_history("x").await.unwrap().collect_all().await.unwrap();
        let summary: Vec<(EventKind, &str)> =
            history.iter().map(|e| (e.kind, e.value_str())).collect();
        assert_eq!(
            summary,
            vec![
                (EventKind::Create, "1"),
                (EventKind::Update, "2"),
                (EventKind::Delete, ""),
            ]
        );
    }

    #[tokio::test]
    async fn test_recreate_after_delete() {
        let store = store();

        store.create("x", "old").await.unwrap();
        store.delete("x").await.unwrap();
        assert!(!store.exists("x").await.unwrap());

        assert!(matches!(store.delete("x").await, Err(StoreError::NotFound { .. })));

        store.create("x", "new").await.unwrap();
        assert_eq!(store.get_current("x").await.unwrap().value, "new");
        assert!(store.exists("x").await.unwrap());
    }

    #[tokio::test]
    async fn test_empty_key_rejected() {
        let store = store();

        assert!(matches!(store.create("", "v").await, Err(StoreError::InvalidKey(_))));
        assert!(matches!(store.update("", "v").await, Err(StoreError::InvalidKey(_))));
        assert!(matches!(store.delete("").await, Err(StoreError::InvalidKey(_))));
        assert!(matches!(store.get_current("").await, Err(StoreError::NotFound { .. })));
        assert_eq!(store.backend().event_count().await, 0);
    }

    #[tokio::test]
    async fn test_unknown_key_history_is_empty() {
        let store = store();
        store.create("other", "1").await.unwrap();

        let history = store.get_history("never").await.unwrap();
        assert!(history.collect_all().await.unwrap().is_empty());
    }
}
