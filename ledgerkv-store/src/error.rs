//! Storage layer errors

use thiserror::Error;

/// Errors returned by event store operations.
///
/// `AlreadyExists`, `NotFound` and `InvalidKey` are ordinary outcomes a caller
/// branches on. `Internal` covers everything the store could not do: I/O,
/// transaction failures and rows that fail to decode.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Create against a key that currently resolves to a record
    #[error("Record already exists: {key}")]
    AlreadyExists {
        /// Key that was written
        key: String,
    },

    /// Update, delete or read against an absent key
    #[error("Record not found: {key}")]
    NotFound {
        /// Key that was looked up
        key: String,
    },

    /// Write with a key that cannot be stored
    #[error("Invalid key: {0}")]
    InvalidKey(String),

    /// Storage failure, transaction abort or decode failure
    #[error("Internal storage error: {0}")]
    Internal(String),
}

impl StoreError {
    /// Create an already-exists error
    pub fn already_exists(key: impl Into<String>) -> Self {
        Self::AlreadyExists { key: key.into() }
    }

    /// Create a not found error
    pub fn not_found(key: impl Into<String>) -> Self {
        Self::NotFound { key: key.into() }
    }

    /// Create an internal error
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    /// True for outcomes that leave the store healthy and are expected
    /// in normal operation.
    pub fn is_expected(&self) -> bool {
        !matches!(self, Self::Internal(_))
    }
}

#[cfg(feature = "postgres")]
impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::Database(db_err) => StoreError::Internal(format!(
                "database error{}: {}",
                db_err.code().map(|c| format!(" [{}]", c)).unwrap_or_default(),
                db_err.message()
            )),
            _ => StoreError::Internal(err.to_string()),
        }
    }
}

pub type Result<T> = std::result::Result<T, StoreError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_expected_outcomes() {
        assert!(StoreError::already_exists("k").is_expected());
        assert!(StoreError::not_found("k").is_expected());
        assert!(StoreError::InvalidKey("empty".into()).is_expected());
        assert!(!StoreError::internal("disk").is_expected());
    }

    #[test]
    fn test_display_includes_key() {
        assert_eq!(StoreError::not_found("answer").to_string(), "Record not found: answer");
        assert_eq!(
            StoreError::already_exists("answer").to_string(),
            "Record already exists: answer"
        );
    }
}
