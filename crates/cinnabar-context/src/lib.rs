//! Cinnabar Context
//!
//! This crate provides the in-memory state of a single workflow run:
//!
//! - Per-node execution results ([`NodeExecutionContext`])
//! - A free-form global data bag
//! - Named variables
//!
//! A [`RunContext`] is owned by exactly one run and is never shared across
//! runs. Nothing here is persisted.

mod context;
mod types;

pub use context::RunContext;
pub use types::{NodeExecutionContext, NodeStatus, PendingExecution};
