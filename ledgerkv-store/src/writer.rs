//! Log writer
//!
//! Every write runs resolve-check-append inside one backend transaction:
//!
//! 1. begin a transaction for the key (serializes writers of that key)
//! 2. resolve the key's latest event into its current record
//! 3. check the operation's precondition against it
//! 4. append one event and commit, or roll back and return the violation

use crate::backend::{LogBackend, LogTransaction};
use crate::error::{Result, StoreError};
use crate::resolver::resolve;
use crate::types::{Event, EventKind, Record};
use tracing::{debug, warn};

/// A single-key write
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteOp<'a> {
    Create { key: &'a str, value: &'a str },
    Update { key: &'a str, value: &'a str },
    Delete { key: &'a str },
}

impl<'a> WriteOp<'a> {
    pub fn key(&self) -> &'a str {
        match *self {
            WriteOp::Create { key, .. } | WriteOp::Update { key, .. } | WriteOp::Delete { key } => {
                key
            }
        }
    }

    pub fn kind(&self) -> EventKind {
        match self {
            WriteOp::Create { .. } => EventKind::Create,
            WriteOp::Update { .. } => EventKind::Update,
            WriteOp::Delete { .. } => EventKind::Delete,
        }
    }

    pub fn value(&self) -> Option<&'a str> {
        match *self {
            WriteOp::Create { value, .. } | WriteOp::Update { value, .. } => Some(value),
            WriteOp::Delete { .. } => None,
        }
    }
}

/// Check a write against the key's current record.
///
/// Create needs an absent key; update and delete need a present one.
pub fn check_precondition(op: &WriteOp<'_>, current: Option<&Record>) -> Result<()> {
    match (op, current) {
        (WriteOp::Create { key, .. }, Some(_)) => Err(StoreError::already_exists(*key)),
        (WriteOp::Create { .. }, None) => Ok(()),
        (WriteOp::Update { key, .. } | WriteOp::Delete { key }, None) => {
            Err(StoreError::not_found(*key))
        }
        (WriteOp::Update { .. } | WriteOp::Delete { .. }, Some(_)) => Ok(()),
    }
}

fn validate_key(key: &str) -> Result<()> {
    if key.is_empty() {
        return Err(StoreError::InvalidKey("key must not be empty".to_string()));
    }
    Ok(())
}

/// Apply a write to the log and return the appended event.
pub async fn apply_write<B: LogBackend>(backend: &B, op: WriteOp<'_>) -> Result<Event> {
    let key = op.key();
    validate_key(key)?;

    let mut tx = backend.begin_write(key).await.map_err(log_failure(op))?;

    let latest = match tx.latest_event(key).await {
        Ok(latest) => latest,
        Err(e) => return abort(tx, op, e).await,
    };
    let current = resolve(latest);

    if let Err(violation) = check_precondition(&op, current.as_ref()) {
        debug!(key = %key, kind = %op.kind(), reason = %violation, "Write rejected");
        return abort(tx, op, violation).await;
    }

    let event = match tx.append(op.kind(), key, op.value()).await {
        Ok(event) => event,
        Err(e) => return abort(tx, op, e).await,
    };

    tx.commit().await.map_err(log_failure(op))?;

    debug!(
        sequence = event.sequence,
        kind = %event.kind,
        key = %event.key,
        "Event appended"
    );

    Ok(event)
}

/// Roll back and return `err`, unless the rollback itself fails.
async fn abort<T, Tx: LogTransaction>(tx: Tx, op: WriteOp<'_>, err: StoreError) -> Result<T> {
    if !err.is_expected() {
        warn!(key = %op.key(), kind = %op.kind(), error = %err, "Write failed");
    }
    tx.rollback().await.map_err(log_failure(op))?;
    Err(err)
}

fn log_failure(op: WriteOp<'_>) -> impl FnOnce(StoreError) -> StoreError + '_ {
    move |err| {
        warn!(key = %op.key(), kind = %op.kind(), error = %err, "Write failed");
        err
    }
}

/// Record view of an event appended by create or update
pub(crate) fn stored_record(event: Event) -> Record {
    Record {
        key: event.key,
        value: event.value.unwrap_or_default(),
    }
}
