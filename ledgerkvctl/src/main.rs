//! ledgerkv command-line client
//!
//! # Usage
//!
//! ```bash
//! # Apply the schema
//! DATABASE_URL=postgres://localhost/ledgerkv ledgerkvctl db migrate
//!
//! # Write and read
//! ledgerkvctl create x 1
//! ledgerkvctl update x 2
//! ledgerkvctl get x
//! ledgerkvctl history x
//! ```
//!
//! # Environment Variables
//!
//! - `DATABASE_URL`: PostgreSQL connection URL (required)
//! - `LEDGERKV_ENV`: Environment (test, development, production)
//! - `LEDGERKV_MAX_CONNECTIONS`: Pool size (default: 10)
//! - `LEDGERKV_ACQUIRE_TIMEOUT_SECS`: Pool acquire timeout (default: 5)
//! - `RUST_LOG`: Log filter (default: `ledgerkvctl=info`)

use std::io;

use ledgerkv_db::DbConfig;
use ledgerkv_store::{PgEventLog, PgEventStore};
use ledgerkvctl::{run_store_command, Command, DbCommand};
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Logs go to stderr; stdout carries command output
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr))
        .with(EnvFilter::from_default_env().add_directive("ledgerkvctl=info".parse()?))
        .init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let command = Command::parse(&args)?;

    let config = DbConfig::from_env()?;
    let pool = ledgerkv_db::connect(&config).await?;

    match command {
        Command::Db(DbCommand::Migrate) => {
            ledgerkv_db::migrate(&pool).await?;
        },
        Command::Db(DbCommand::Status) => {
            if ledgerkv_db::status(&pool).await?.is_none() {
                anyhow::bail!("event log schema is not installed");
            }
        },
        command => {
            let store = PgEventStore::new(PgEventLog::new(pool.clone()));
            let stdout = io::stdout();
            let mut out = stdout.lock();
            run_store_command(&store, &command, &mut out).await?;
            info!(command = ?command, "Done");
        },
    }

    pool.close().await;
    Ok(())
}
