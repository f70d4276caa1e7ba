//! Cinnabar Workflow
//!
//! This crate provides the [`Graph`] index over a workflow's nodes and
//! connections. It answers the structural questions the orchestrator asks
//! while traversing:
//!
//! - Which nodes are triggers (never the target of a connection)?
//! - Which nodes feed into / follow a given node?
//! - In what order do the nodes depend on each other?
//!
//! Dangling connections are tolerated. Lookups for unknown ids return
//! nothing, and [`Graph::validate`] reports them for tooling that wants to
//! be strict.

mod error;
mod graph;

pub use error::WorkflowError;
pub use graph::Graph;
