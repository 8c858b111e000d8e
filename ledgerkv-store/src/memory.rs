//! In-memory log backend
//!
//! Used for testing and development without a database.
//! Rows live in one table behind an async `RwLock` that is only held for
//! short reads and inserts. Writers of the same key are serialized by a
//! per-key mutex that a write transaction owns until it commits or rolls
//! back, so writers and readers of other keys never wait on it.
//! Rows are kept in their stored text form and decoded on read.

use crate::backend::{LogBackend, LogTransaction};
use crate::codec::{decode_event, StoredRow};
use crate::error::{Result, StoreError};
use crate::history::EventHistory;
use crate::types::{Event, EventKind};
use async_stream::try_stream;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard, RwLock};

#[derive(Debug, Default)]
struct LogTable {
    rows: Vec<StoredRow>,
    /// Row positions per key, ascending by sequence
    by_key: HashMap<String, Vec<usize>>,
    last_sequence: i64,
}

impl LogTable {
    fn next_sequence(&mut self) -> i64 {
        self.last_sequence += 1;
        self.last_sequence
    }

    fn latest_row(&self, key: &str) -> Option<&StoredRow> {
        let position = *self.by_key.get(key)?.last()?;
        self.rows.get(position)
    }

    fn row_for(&self, key: &str, nth: usize) -> Option<&StoredRow> {
        let position = *self.by_key.get(key)?.get(nth)?;
        self.rows.get(position)
    }

    fn insert(&mut self, row: StoredRow) {
        let position = self.rows.len();
        self.by_key.entry(row.key.clone()).or_default().push(position);
        self.rows.push(row);
    }
}

/// In-memory event log
#[derive(Debug, Clone, Default)]
pub struct MemoryLog {
    table: Arc<RwLock<LogTable>>,
    /// Writer lock per key; entries are created on first write
    key_locks: Arc<Mutex<HashMap<String, Arc<Mutex<()>>>>>,
}

impl MemoryLog {
    /// Create a new empty log
    pub fn new() -> Self {
        Self::default()
    }

    /// Total number of committed events
    pub async fn event_count(&self) -> usize {
        self.table.read().await.rows.len()
    }

    /// Number of committed events for one key
    pub async fn key_event_count(&self, key: &str) -> usize {
        self.table.read().await.by_key.get(key).map_or(0, Vec::len)
    }

    async fn key_lock(&self, key: &str) -> Arc<Mutex<()>> {
        let mut locks = self.key_locks.lock().await;
        Arc::clone(locks.entry(key.to_string()).or_default())
    }

    #[cfg(test)]
    pub(crate) async fn insert_raw(&self, row: StoredRow) {
        let mut table = self.table.write().await;
        table.last_sequence = table.last_sequence.max(row.sequence);
        table.insert(row);
    }
}

/// Write transaction holding its key's writer lock
pub struct MemoryTransaction {
    table: Arc<RwLock<LogTable>>,
    _key_guard: OwnedMutexGuard<()>,
    staged: Vec<StoredRow>,
}

#[async_trait]
impl LogTransaction for MemoryTransaction {
    async fn latest_event(&mut self, key: &str) -> Result<Option<Event>> {
        if let Some(row) = self.staged.iter().rev().find(|row| row.key == key) {
            return decode_event(row).map(Some);
        }

        let table = self.table.read().await;
        table.latest_row(key).map(decode_event).transpose()
    }

    async fn append(&mut self, kind: EventKind, key: &str, value: Option<&str>) -> Result<Event> {
        let sequence = self.table.write().await.next_sequence();
        let row = StoredRow::new(sequence, kind, key, value);
        let event = decode_event(&row)?;
        self.staged.push(row);
        Ok(event)
    }

    async fn commit(mut self) -> Result<()> {
        let mut table = self.table.write().await;
        for row in std::mem::take(&mut self.staged) {
            table.insert(row);
        }
        Ok(())
    }

    async fn rollback(self) -> Result<()> {
        Ok(())
    }
}

#[async_trait]
impl LogBackend for MemoryLog {
    type Transaction = MemoryTransaction;

    async fn begin_write(&self, key: &str) -> Result<MemoryTransaction> {
        let key_guard = self.key_lock(key).await.lock_owned().await;
        Ok(MemoryTransaction {
            table: Arc::clone(&self.table),
            _key_guard: key_guard,
            staged: Vec::new(),
        })
    }

    async fn latest_event(&self, key: &str) -> Result<Option<Event>> {
        let table = self.table.read().await;
        table.latest_row(key).map(decode_event).transpose()
    }

    async fn history(&self, key: &str) -> Result<EventHistory> {
        // Rows are never rewritten, so the first `visible` rows for the key
        // stay valid while the history is being read.
        let visible = self.key_event_count(key).await;
        if visible == 0 {
            return Ok(EventHistory::empty(key));
        }

        let table = Arc::clone(&self.table);
        let owned_key = key.to_string();
        let rows = try_stream! {
            for nth in 0..visible {
                let row = {
                    let table = table.read().await;
                    table.row_for(&owned_key, nth).cloned()
                };
                let row = row.ok_or_else(|| {
                    StoreError::internal(format!("row {} of {} vanished", nth, owned_key))
                })?;
                yield decode_event(&row)?;
            }
        };

        Ok(EventHistory::new(key, rows))
    }
}
