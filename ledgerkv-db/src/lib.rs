//! Database lifecycle management for ledgerkv.
//!
//! Provides pool construction, migration running, and status checking.

mod config;

pub use config::{ConfigError, DbConfig, Environment, DEFAULT_ACQUIRE_TIMEOUT, DEFAULT_MAX_CONNECTIONS};

use sqlx::postgres::PgPoolOptions;
use sqlx::{PgPool, Row};
use tracing::{info, warn};

/// Result type for DB operations.
pub type Result<T> = std::result::Result<T, anyhow::Error>;

/// Open a connection pool for the configured database.
pub async fn connect(config: &DbConfig) -> Result<PgPool> {
    let pool = PgPoolOptions::new()
        .max_connections(config.max_connections)
        .acquire_timeout(config.acquire_timeout)
        .connect(&config.database_url)
        .await?;

    info!(
        max_connections = config.max_connections,
        environment = %config.environment,
        "Database pool ready"
    );
    Ok(pool)
}

/// Run all pending migrations.
///
/// Uses sqlx migrations from the workspace `migrations` directory.
/// Idempotent: safe to run multiple times.
pub async fn migrate(pool: &PgPool) -> Result<()> {
    info!("Running database migrations...");

    sqlx::migrate!("../migrations").run(pool).await?;

    info!("Migrations completed successfully");
    Ok(())
}

/// Snapshot of the event log table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogStatus {
    pub events: i64,
    pub keys: i64,
    pub last_sequence: Option<i64>,
}

/// Check database connectivity, migration status and event log size.
pub async fn status(pool: &PgPool) -> Result<Option<LogStatus>> {
    // Check connectivity
    let result: i32 = sqlx::query_scalar("SELECT 1").fetch_one(pool).await?;

    if result != 1 {
        return Err(anyhow::anyhow!("Database connectivity check failed"));
    }

    info!("Database connectivity: OK");

    // Check migration status using runtime query (sqlx::query! requires DB at compile time)
    let rows = sqlx::query(
        r#"
        SELECT version, description, success
        FROM _sqlx_migrations
        ORDER BY version DESC
        LIMIT 10
        "#,
    )
    .fetch_all(pool)
    .await;

    match rows {
        Ok(migs) if !migs.is_empty() => {
            info!("Latest migrations:");
            for mig in migs {
                let version: i64 = mig.try_get("version")?;
                let description: String = mig.try_get("description")?;
                let success: bool = mig.try_get("success")?;

                let status = if success { "ok" } else { "FAILED" };
                info!("  v{}: {} ({})", version, description, status);
            }
        },
        Ok(_) => {
            warn!("No migrations found in database (run `ledgerkvctl db migrate` first)");
            return Ok(None);
        },
        Err(e) => {
            // Table might not exist yet
            if e.to_string().contains("_sqlx_migrations") {
                warn!("Migration table not found (run `ledgerkvctl db migrate` first)");
                return Ok(None);
            }
            return Err(e.into());
        },
    }

    let row = sqlx::query(
        "SELECT COUNT(*) AS events, COUNT(DISTINCT key) AS keys, MAX(sequence) AS last_sequence FROM event_log",
    )
    .fetch_one(pool)
    .await?;

    let log = LogStatus {
        events: row.try_get("events")?,
        keys: row.try_get("keys")?,
        last_sequence: row.try_get("last_sequence")?,
    };

    info!(
        events = log.events,
        keys = log.keys,
        last_sequence = ?log.last_sequence,
        "Event log status"
    );

    Ok(Some(log))
}
