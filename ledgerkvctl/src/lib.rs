//! ledgerkv command-line client
//!
//! Drives the event store and database maintenance from a shell.

pub mod commands;
pub mod error;

pub use commands::{run_store_command, Command, DbCommand, USAGE};
pub use error::{CtlError, CtlResult};
