//! Row codec
//!
//! Every backend exposes its stored rows through [`EventRow`], a positional
//! column accessor, and decodes them with the single [`decode_event`]
//! function. Column order matches the `event_log` table:
//! `(sequence, kind, key, value)`.

use crate::error::{Result, StoreError};
use crate::types::{Event, EventKind};

pub const SEQUENCE_COLUMN: usize = 0;
pub const KIND_COLUMN: usize = 1;
pub const KEY_COLUMN: usize = 2;
pub const VALUE_COLUMN: usize = 3;

/// Column-by-position access to a stored event row
pub trait EventRow {
    fn integer_at(&self, index: usize) -> Result<i64>;
    fn text_at(&self, index: usize) -> Result<String>;
    fn optional_text_at(&self, index: usize) -> Result<Option<String>>;
}

/// Decode a stored row into an [`Event`].
///
/// Create and update rows must carry a value. A delete row's value is
/// dropped even if the storage layer kept one.
pub fn decode_event<R: EventRow + ?Sized>(row: &R) -> Result<Event> {
    let sequence = row.integer_at(SEQUENCE_COLUMN)?;
    let kind: EventKind = row.text_at(KIND_COLUMN)?.parse()?;
    let key = row.text_at(KEY_COLUMN)?;
    let value = row.optional_text_at(VALUE_COLUMN)?;

    let value = match kind {
        EventKind::Delete => None,
        EventKind::Create | EventKind::Update => match value {
            Some(v) => Some(v),
            None => {
                return Err(StoreError::internal(format!(
                    "event {} ({} {}) has no value",
                    sequence, kind, key
                )))
            }
        },
    };

    Ok(Event {
        sequence,
        kind,
        key,
        value,
    })
}

fn missing_column(index: usize) -> StoreError {
    StoreError::internal(format!("column {} out of range", index))
}

/// Raw row as kept by the in-memory log table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredRow {
    pub sequence: i64,
    pub kind: String,
    pub key: String,
    pub value: Option<String>,
}

impl StoredRow {
    pub fn new(sequence: i64, kind: EventKind, key: &str, value: Option<&str>) -> Self {
        Self {
            sequence,
            kind: kind.as_str().to_string(),
            key: key.to_string(),
            value: value.map(str::to_string),
        }
    }
}

impl EventRow for StoredRow {
    fn integer_at(&self, index: usize) -> Result<i64> {
        match index {
            SEQUENCE_COLUMN => Ok(self.sequence),
            _ => Err(missing_column(index)),
        }
    }

    fn text_at(&self, index: usize) -> Result<String> {
        match index {
            KIND_COLUMN => Ok(self.kind.clone()),
            KEY_COLUMN => Ok(self.key.clone()),
            VALUE_COLUMN => self
                .value
                .clone()
                .ok_or_else(|| StoreError::internal("value column is NULL")),
            _ => Err(missing_column(index)),
        }
    }

    fn optional_text_at(&self, index: usize) -> Result<Option<String>> {
        match index {
            VALUE_COLUMN => Ok(self.value.clone()),
            _ => self.text_at(index).map(Some),
        }
    }
}

#[cfg(feature = "postgres")]
mod pg {
    use super::EventRow;
    use crate::error::Result;
    use sqlx::postgres::PgRow;
    use sqlx::Row;

    impl EventRow for PgRow {
        fn integer_at(&self, index: usize) -> Result<i64> {
            Ok(self.try_get::<i64, _>(index)?)
        }

        fn text_at(&self, index: usize) -> Result<String> {
            Ok(self.try_get::<String, _>(index)?)
        }

        fn optional_text_at(&self, index: usize) -> Result<Option<String>> {
            Ok(self.try_get::<Option<String>, _>(index)?)
        }
    }
}
