//! PostgreSQL log backend.
//!
//! Events live in the `event_log` table (see `migrations/`):
//! `sequence BIGSERIAL PRIMARY KEY, kind TEXT, key TEXT, value TEXT NULL`,
//! indexed on `(key, sequence)`.
//!
//! Writers of the same key are serialized with a transaction-scoped advisory
//! lock derived from the key. It is taken before the latest-event lookup, so
//! two creates racing on a key that has no rows yet still see each other.
//! Writers of different keys only contend on hash collisions.
//!
//! This module uses dynamic queries (sqlx::query) instead of compile-time
//! checked macros (sqlx::query!) to allow compilation without DATABASE_URL.

use crate::backend::{LogBackend, LogTransaction};
use crate::codec::decode_event;
use crate::error::Result;
use crate::history::EventHistory;
use crate::types::{Event, EventKind};
use async_stream::try_stream;
use async_trait::async_trait;
use futures_util::TryStreamExt;
use sqlx::{PgPool, Postgres, Transaction};
use tracing::debug;

const LOCK_KEY: &str = "SELECT pg_advisory_xact_lock(hashtextextended($1, 0))";

const SELECT_LATEST: &str = r#"
    SELECT sequence, kind, key, value
    FROM event_log
    WHERE key = $1
    ORDER BY sequence DESC
    LIMIT 1
"#;

const SELECT_HISTORY: &str = r#"
    SELECT sequence, kind, key, value
    FROM event_log
    WHERE key = $1
    ORDER BY sequence ASC
"#;

const INSERT_EVENT: &str = r#"
    INSERT INTO event_log (kind, key, value)
    VALUES ($1, $2, $3)
    RETURNING sequence, kind, key, value
"#;

/// Event log stored in PostgreSQL
#[derive(Debug, Clone)]
pub struct PgEventLog {
    pool: PgPool,
}

impl PgEventLog {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Get a reference to the underlying pool (for testing).
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

/// Write transaction holding the key's advisory lock
pub struct PgLogTransaction {
    tx: Transaction<'static, Postgres>,
}

#[async_trait]
impl LogTransaction for PgLogTransaction {
    async fn latest_event(&mut self, key: &str) -> Result<Option<Event>> {
        let row = sqlx::query(SELECT_LATEST)
            .bind(key)
            .fetch_optional(&mut *self.tx)
            .await?;

        row.as_ref().map(decode_event).transpose()
    }

    async fn append(&mut self, kind: EventKind, key: &str, value: Option<&str>) -> Result<Event> {
        let row = sqlx::query(INSERT_EVENT)
            .bind(kind.as_str())
            .bind(key)
            .bind(value)
            .fetch_one(&mut *self.tx)
            .await?;

        decode_event(&row)
    }

    async fn commit(self) -> Result<()> {
        self.tx.commit().await?;
        Ok(())
    }

    async fn rollback(self) -> Result<()> {
        self.tx.rollback().await?;
        Ok(())
    }
}

#[async_trait]
impl LogBackend for PgEventLog {
    type Transaction = PgLogTransaction;

    async fn begin_write(&self, key: &str) -> Result<PgLogTransaction> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(LOCK_KEY).bind(key).execute(&mut *tx).await?;

        Ok(PgLogTransaction { tx })
    }

    async fn latest_event(&self, key: &str) -> Result<Option<Event>> {
        let row = sqlx::query(SELECT_LATEST)
            .bind(key)
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(decode_event).transpose()
    }

    async fn history(&self, key: &str) -> Result<EventHistory> {
        // The connection moves into the stream and goes back to the pool
        // when the history is exhausted, closed or dropped.
        let mut conn = self.pool.acquire().await?;
        let owned_key = key.to_string();

        debug!(key = %key, "History opened");

        let rows = try_stream! {
            let mut cursor = sqlx::query(SELECT_HISTORY)
                .bind(owned_key.as_str())
                .fetch(&mut *conn);

            while let Some(row) = cursor.try_next().await? {
                yield decode_event(&row)?;
            }
        };

        Ok(EventHistory::new(key, rows))
    }
}

// Needs a reachable DATABASE_URL:
// `cargo test -p ledgerkv-store --features integration-tests`
#[cfg(all(test, feature = "integration-tests"))]
mod tests {
    use super::*;
    use crate::error::StoreError;
    use crate::writer::{apply_write, WriteOp};

    #[sqlx::test(migrations = "../migrations")]
    async fn test_sequence_is_assigned_by_table(pool: PgPool) {
        let log = PgEventLog::new(pool);

        let a = apply_write(&log, WriteOp::Create { key: "a", value: "1" }).await.unwrap();
        let b = apply_write(&log, WriteOp::Create { key: "b", value: "1" }).await.unwrap();

        assert!(b.sequence > a.sequence);
        assert_eq!(log.latest_event("a").await.unwrap(), Some(a));
    }

    #[sqlx::test(migrations = "../migrations")]
    async fn test_rejected_write_appends_nothing(pool: PgPool) {
        let log = PgEventLog::new(pool.clone());

        let result = apply_write(&log, WriteOp::Delete { key: "ghost" }).await;
        assert!(matches!(result, Err(StoreError::NotFound { .. })));

        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM event_log")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(count, 0);
    }

    #[sqlx::test(migrations = "../migrations")]
    async fn test_delete_stores_null_value(pool: PgPool) {
        let log = PgEventLog::new(pool.clone());

        apply_write(&log, WriteOp::Create { key: "x", value: "1" }).await.unwrap();
        let deleted = apply_write(&log, WriteOp::Delete { key: "x" }).await.unwrap();

        let value: Option<String> =
            sqlx::query_scalar("SELECT value FROM event_log WHERE sequence = $1")
                .bind(deleted.sequence)
                .fetch_one(&pool)
                .await
                .unwrap();
        assert_eq!(value, None);
    }

    #[sqlx::test(migrations = "../migrations")]
    async fn test_rows_cannot_be_rewritten(pool: PgPool) {
        let log = PgEventLog::new(pool.clone());
        apply_write(&log, WriteOp::Create { key: "x", value: "1" }).await.unwrap();

        let update = sqlx::query("UPDATE event_log SET value = 'tampered'").execute(&pool).await;
        assert!(update.is_err());

        let delete = sqlx::query("DELETE FROM event_log").execute(&pool).await;
        assert!(delete.is_err());
    }

    #[sqlx::test(migrations = "../migrations")]
    async fn test_history_releases_connection_on_close(pool: PgPool) {
        let log = PgEventLog::new(pool.clone());
        for i in 0..5 {
            let value = i.to_string();
            let op = if i == 0 {
                WriteOp::Create { key: "x", value: &value }
            } else {
                WriteOp::Update { key: "x", value: &value }
            };
            apply_write(&log, op).await.unwrap();
        }

        let mut history = log.history("x").await.unwrap();
        assert_eq!(history.next_event().await.unwrap().unwrap().value_str(), "0");
        history.close();
        history.close();

        // Writes still go through after early abandonment
        apply_write(&log, WriteOp::Update { key: "x", value: "5" }).await.unwrap();
        let all = log.history("x").await.unwrap().collect_all().await.unwrap();
        assert_eq!(all.len(), 6);
    }
}
