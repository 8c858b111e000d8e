//! Storage backend traits (ports)
//!
//! The event store is written once against these traits. A backend is an
//! ordered, durable, transactional table of event rows; it only has to
//! provide per-key latest-event lookup, append, and an ordered scan.

use crate::error::Result;
use crate::history::EventHistory;
use crate::types::{Event, EventKind};
use async_trait::async_trait;

/// A write transaction scoped to one key.
///
/// Dropping a transaction without committing discards its appends.
#[async_trait]
pub trait LogTransaction: Send {
    /// Latest event for `key` as seen inside this transaction
    async fn latest_event(&mut self, key: &str) -> Result<Option<Event>>;

    /// Append an event; the backend assigns the sequence number
    async fn append(&mut self, kind: EventKind, key: &str, value: Option<&str>) -> Result<Event>;

    async fn commit(self) -> Result<()>;

    async fn rollback(self) -> Result<()>;
}

/// An append-only event log table
#[async_trait]
pub trait LogBackend: Send + Sync {
    type Transaction: LogTransaction;

    /// Begin a write transaction for `key`.
    ///
    /// Transactions for the same key must be serialized: a second caller
    /// blocks here until the first commits or rolls back.
    async fn begin_write(&self, key: &str) -> Result<Self::Transaction>;

    /// Latest committed event for `key`
    async fn latest_event(&self, key: &str) -> Result<Option<Event>>;

    /// Open an ordered history over the committed events for `key`
    async fn history(&self, key: &str) -> Result<EventHistory>;
}
