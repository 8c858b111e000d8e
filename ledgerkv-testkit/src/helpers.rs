//! Store-driving helpers shared by unit and integration tests.

use anyhow::{anyhow, bail, ensure};
use rand::Rng;

use crate::model::{Expected, KeyModel};
use crate::Result;
use ledgerkv_store::{EventKind, EventStore, StoreError};

/// An owned store operation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Op {
    Create { key: String, value: String },
    Update { key: String, value: String },
    Delete { key: String },
}

impl Op {
    pub fn key(&self) -> &str {
        match self {
            Op::Create { key, .. } | Op::Update { key, .. } | Op::Delete { key } => key,
        }
    }
}

/// Pick a random operation on one of `key_space` keys (`"0"`, `"1"`, ...).
pub fn random_op<R: Rng>(rng: &mut R, key_space: usize) -> Op {
    let key = rng.gen_range(0..key_space).to_string();
    let value = rng.gen::<u64>().to_string();

    match rng.gen_range(0..3) {
        0 => Op::Create { key, value },
        1 => Op::Update { key, value },
        _ => Op::Delete { key },
    }
}

fn classify<T>(result: std::result::Result<T, StoreError>) -> Result<Expected> {
    match result {
        Ok(_) => Ok(Expected::Appended),
        Err(StoreError::AlreadyExists { .. }) => Ok(Expected::AlreadyExists),
        Err(StoreError::NotFound { .. }) => Ok(Expected::NotFound),
        Err(e) => Err(anyhow!("unexpected store error: {}", e)),
    }
}

/// Apply `count` random operations to `store`, checking every outcome and
/// the resulting current value against `model`.
pub async fn run_random_ops<S, R>(
    store: &S,
    model: &mut KeyModel,
    rng: &mut R,
    count: usize,
    key_space: usize,
) -> Result<()>
where
    S: EventStore + ?Sized,
    R: Rng,
{
    for step in 0..count {
        let op = random_op(rng, key_space);

        let (actual, expected) = match &op {
            Op::Create { key, value } => {
                (classify(store.create(key, value).await)?, model.create(key, value))
            }
            Op::Update { key, value } => {
                (classify(store.update(key, value).await)?, model.update(key, value))
            }
            Op::Delete { key } => (classify(store.delete(key).await)?, model.delete(key)),
        };
        ensure!(
            actual == expected,
            "step {}: {:?} returned {:?}, expected {:?}",
            step,
            op,
            actual,
            expected
        );

        let key = op.key();
        match (store.get_current(key).await, model.current(key)) {
            (Ok(record), Some(value)) => ensure!(
                record.value == value,
                "step {}: {} resolved to {:?}, expected {:?}",
                step,
                key,
                record.value,
                value
            ),
            (Err(StoreError::NotFound { .. }), None) => {}
            (other, expected) => {
                bail!("step {}: get_current({}) = {:?}, expected {:?}", step, key, other, expected)
            }
        }
    }
    Ok(())
}

/// Create `key` with the first value, then update it with the rest.
pub async fn seed_lifecycle<S>(store: &S, key: &str, values: &[&str]) -> Result<()>
where
    S: EventStore + ?Sized,
{
    let (first, rest) = values
        .split_first()
        .ok_or_else(|| anyhow!("seed_lifecycle needs at least one value"))?;

    store.create(key, first).await?;
    for value in rest {
        store.update(key, value).await?;
    }
    Ok(())
}

/// Read a key's full history as `(kind, value)` pairs, checking that
/// sequences strictly increase.
pub async fn history_summary<S>(store: &S, key: &str) -> Result<Vec<(EventKind, String)>>
where
    S: EventStore + ?Sized,
{
    let mut history = store.get_history(key).await?;
    let mut last = None;
    let mut summary = Vec::new();

    while let Some(event) = history.next_event().await {
        let event = event?;
        ensure!(event.key == key, "history for {} returned key {}", key, event.key);
        if let Some(last) = last {
            ensure!(event.sequence > last, "sequence {} after {}", event.sequence, last);
        }
        last = Some(event.sequence);
        summary.push((event.kind, event.value_str().to_string()));
    }
    history.close();

    Ok(summary)
}

/// Assert the store's history for `key` matches the model.
pub async fn assert_history<S>(store: &S, model: &KeyModel, key: &str) -> Result<()>
where
    S: EventStore + ?Sized,
{
    let actual = history_summary(store, key).await?;
    ensure!(
        actual.as_slice() == model.history(key),
        "history for {} = {:?}, expected {:?}",
        key,
        actual,
        model.history(key)
    );
    Ok(())
}
