//! State resolution
//!
//! A key's current record is a pure function of its latest event. Reads and
//! write preconditions both go through [`resolve`], so "does this key exist"
//! has one answer everywhere.

use crate::error::{Result, StoreError};
use crate::types::{Event, Record};

/// Resolve the latest event for a key into its current record.
///
/// Returns `None` when the key has no events or was last deleted.
pub fn resolve(latest: Option<Event>) -> Option<Record> {
    let event = latest?;
    if !event.kind.leaves_present() {
        return None;
    }
    Some(Record {
        key: event.key,
        value: event.value.unwrap_or_default(),
    })
}

/// Like [`resolve`], but an absent key is `NotFound`.
pub fn current_record(key: &str, latest: Option<Event>) -> Result<Record> {
    resolve(latest).ok_or_else(|| StoreError::not_found(key))
}
