//! Command parsing and store commands.
//!
//! Supported commands:
//! - `ledgerkvctl create <key> <value>`
//! - `ledgerkvctl update <key> <value>`
//! - `ledgerkvctl delete <key>`
//! - `ledgerkvctl get <key>`
//! - `ledgerkvctl history <key>` - JSON array, streamed event by event
//! - `ledgerkvctl db <migrate|status>`

use std::io::Write;

use ledgerkv_store::EventStore;
use tracing::debug;

use crate::error::{CtlError, CtlResult};

pub const USAGE: &str =
    "ledgerkvctl <create <key> <value> | update <key> <value> | delete <key> | get <key> | history <key> | db <migrate|status>>";

/// Database maintenance subcommand
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DbCommand {
    Migrate,
    Status,
}

/// A parsed command line
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Create { key: String, value: String },
    Update { key: String, value: String },
    Delete { key: String },
    Get { key: String },
    History { key: String },
    Db(DbCommand),
}

impl Command {
    /// Parse arguments, excluding the program name.
    pub fn parse(args: &[String]) -> CtlResult<Self> {
        let (name, rest) = args
            .split_first()
            .ok_or_else(|| CtlError::Usage(USAGE.to_string()))?;

        let arity = |n: usize| -> CtlResult<()> {
            if rest.len() == n {
                Ok(())
            } else {
                Err(CtlError::Usage(format!(
                    "`{}` takes {} argument(s), got {}",
                    name,
                    n,
                    rest.len()
                )))
            }
        };

        match name.as_str() {
            "create" => {
                arity(2)?;
                Ok(Command::Create {
                    key: rest[0].clone(),
                    value: rest[1].clone(),
                })
            },
            "update" => {
                arity(2)?;
                Ok(Command::Update {
                    key: rest[0].clone(),
                    value: rest[1].clone(),
                })
            },
            "delete" => {
                arity(1)?;
                Ok(Command::Delete { key: rest[0].clone() })
            },
            "get" => {
                arity(1)?;
                Ok(Command::Get { key: rest[0].clone() })
            },
            "history" => {
                arity(1)?;
                Ok(Command::History { key: rest[0].clone() })
            },
            "db" => {
                arity(1)?;
                match rest[0].as_str() {
                    "migrate" => Ok(Command::Db(DbCommand::Migrate)),
                    "status" => Ok(Command::Db(DbCommand::Status)),
                    other => Err(CtlError::Usage(format!(
                        "Unknown db command: {}. Use migrate or status",
                        other
                    ))),
                }
            },
            other => Err(CtlError::Usage(format!("Unknown command: {}. {}", other, USAGE))),
        }
    }
}

/// Run a store command, writing its result to `out`.
///
/// `db` commands are not store commands and are rejected here.
pub async fn run_store_command<S, W>(store: &S, command: &Command, out: &mut W) -> CtlResult<()>
where
    S: EventStore + ?Sized,
    W: Write,
{
    match command {
        Command::Create { key, value } => {
            let record = store.create(key, value).await?;
            serde_json::to_writer(&mut *out, &record)?;
            writeln!(out)?;
        },
        Command::Update { key, value } => {
            let record = store.update(key, value).await?;
            serde_json::to_writer(&mut *out, &record)?;
            writeln!(out)?;
        },
        Command::Delete { key } => {
            store.delete(key).await?;
        },
        Command::Get { key } => {
            let record = store.get_current(key).await?;
            serde_json::to_writer(&mut *out, &record)?;
            writeln!(out)?;
        },
        Command::History { key } => write_history(store, key, out).await?,
        Command::Db(_) => {
            return Err(CtlError::Usage("db commands need a database connection".to_string()))
        },
    }
    Ok(())
}

async fn write_history<S, W>(store: &S, key: &str, out: &mut W) -> CtlResult<()>
where
    S: EventStore + ?Sized,
    W: Write,
{
    let mut history = store.get_history(key).await?;

    let result = async {
        out.write_all(b"[")?;
        let mut first = true;
        while let Some(event) = history.next_event().await {
            let event = event?;
            if !first {
                out.write_all(b",")?;
            }
            first = false;
            serde_json::to_writer(&mut *out, &event)?;
        }
        out.write_all(b"]\n")?;
        out.flush()?;
        CtlResult::Ok(())
    }
    .await;

    debug!(key = %key, events = history.yielded(), "History written");
    history.close();
    result
}
