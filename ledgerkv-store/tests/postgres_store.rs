//! PostgreSQL-backed event store tests.
//!
//! Each test gets a fresh database from `#[sqlx::test]` with the workspace
//! migrations applied.
//!
//! Run with: `DATABASE_URL=postgres://... cargo test -p ledgerkv-store --features integration-tests`

#![cfg(feature = "integration-tests")]

use std::sync::Arc;

use ledgerkv_store::{EventKind, EventStore, PgEventLog, PgEventStore, StoreError};
use ledgerkv_testkit::{assert_history, history_summary, run_random_ops, KeyModel};
use rand::rngs::StdRng;
use rand::SeedableRng;
use sqlx::PgPool;

fn new_store(pool: PgPool) -> PgEventStore {
    PgEventStore::new(PgEventLog::new(pool))
}

#[sqlx::test(migrations = "../migrations")]
async fn test_create_update_delete_scenario(pool: PgPool) {
    let store = new_store(pool);

    assert!(matches!(store.get_current("x").await, Err(StoreError::NotFound { .. })));
    assert!(history_summary(&store, "x").await.unwrap().is_empty());

    store.create("x", "1").await.unwrap();
    assert_eq!(store.get_current("x").await.unwrap().value, "1");
    assert!(matches!(store.create("x", "9").await, Err(StoreError::AlreadyExists { .. })));

    store.update("x", "2").await.unwrap();
    assert_eq!(store.get_current("x").await.unwrap().value, "2");

    store.delete("x").await.unwrap();
    assert!(matches!(store.get_current("x").await, Err(StoreError::NotFound { .. })));
    assert!(matches!(store.delete("x").await, Err(StoreError::NotFound { .. })));

    assert_eq!(
        history_summary(&store, "x").await.unwrap(),
        vec![
            (EventKind::Create, "1".to_string()),
            (EventKind::Update, "2".to_string()),
            (EventKind::Delete, String::new()),
        ]
    );

    store.create("x", "3").await.unwrap();
    assert_eq!(store.get_current("x").await.unwrap().value, "3");
}

#[sqlx::test(migrations = "../migrations")]
async fn test_random_operations_match_model(pool: PgPool) {
    let store = new_store(pool);
    let mut model = KeyModel::new();
    let mut rng = StdRng::seed_from_u64(42);

    run_random_ops(&store, &mut model, &mut rng, 200, 5).await.unwrap();

    for key in (0..5).map(|k| k.to_string()) {
        assert_history(&store, &model, &key).await.unwrap();
    }
}

#[sqlx::test(migrations = "../migrations")]
async fn test_concurrent_creates_single_winner(pool: PgPool) {
    let store = Arc::new(new_store(pool));
    let contenders = 8;

    let handles: Vec<_> = (0..contenders)
        .map(|i| {
            let store = Arc::clone(&store);
            tokio::spawn(async move { store.create("fresh", &i.to_string()).await })
        })
        .collect();

    let mut created = 0;
    let mut rejected = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(_) => created += 1,
            Err(StoreError::AlreadyExists { .. }) => rejected += 1,
            Err(e) => panic!("unexpected error: {}", e),
        }
    }

    assert_eq!(created, 1);
    assert_eq!(rejected, contenders - 1);
    assert_eq!(history_summary(&*store, "fresh").await.unwrap().len(), 1);
}

#[sqlx::test(migrations = "../migrations")]
async fn test_abandoned_history_does_not_block_writers(pool: PgPool) {
    let store = new_store(pool);
    store.create("x", "0").await.unwrap();
    for i in 1..20 {
        store.update("x", &i.to_string()).await.unwrap();
    }

    {
        let mut history = store.get_history("x").await.unwrap();
        assert!(history.next_event().await.is_some());
        // dropped without close
    }

    let mut history = store.get_history("x").await.unwrap();
    history.close();

    store.update("x", "20").await.unwrap();
    assert_eq!(history_summary(&store, "x").await.unwrap().len(), 21);
}
