//! Test helpers for ledgerkv store tests.
//!
//! Provides a reference model of per-key state, history assertions and
//! random operation generation. Works against any `EventStore`.

mod helpers;
mod model;

pub use helpers::{assert_history, history_summary, random_op, run_random_ops, seed_lifecycle, Op};
pub use model::{Expected, KeyModel};

pub use anyhow::Result;
