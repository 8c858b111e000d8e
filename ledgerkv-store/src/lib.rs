//! ledgerkv storage layer
//!
//! Key/value records kept as an append-only log of create, update and
//! delete events. The current value of a key is derived on every read from
//! its latest event; nothing else is stored.
//!
//! # Architecture
//!
//! - **Event store trait**: the five operations callers use (port)
//! - **Log writer**: resolve-check-append inside one transaction per write
//! - **State resolver**: latest event → current record, shared by reads and
//!   write preconditions
//! - **Backends**: in-memory log (always), PostgreSQL (feature `postgres`)
//!
//! # Usage
//!
//! ```rust
//! use ledgerkv_store::{EventStore, MemoryEventStore, MemoryLog};
//!
//! #[tokio::main]
//! async fn main() {
//!     let store = MemoryEventStore::new(MemoryLog::new());
//!
//!     store.create("x", "1").await.unwrap();
//!     store.update("x", "2").await.unwrap();
//!     assert_eq!(store.get_current("x").await.unwrap().value, "2");
//!
//!     let mut history = store.get_history("x").await.unwrap();
//!     while let Some(event) = history.next_event().await {
//!         let event = event.unwrap();
//!         println!("{} {} {}", event.sequence, event.kind, event.value_str());
//!     }
//!     history.close();
//! }
//! ```

#![warn(clippy::all)]

// Modules
mod backend;
mod codec;
mod error;
mod history;
mod memory;
#[cfg(feature = "postgres")]
mod postgres;
mod repository;
mod resolver;
mod types;
mod writer;

// Re-exports
pub use backend::{LogBackend, LogTransaction};
pub use codec::{decode_event, EventRow, StoredRow};
pub use error::{Result, StoreError};
pub use history::EventHistory;
pub use memory::{MemoryLog, MemoryTransaction};
#[cfg(feature = "postgres")]
pub use postgres::{PgEventLog, PgLogTransaction};
pub use repository::{EventLogStore, EventStore};
pub use resolver::{current_record, resolve};
pub use types::{Event, EventKind, Record};
pub use writer::{apply_write, check_precondition, WriteOp};

/// Event store backed by the in-memory log
pub type MemoryEventStore = EventLogStore<MemoryLog>;

/// Event store backed by PostgreSQL
#[cfg(feature = "postgres")]
pub type PgEventStore = EventLogStore<PgEventLog>;
