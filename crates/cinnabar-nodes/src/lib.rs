//! Node dispatch for Cinnabar workflows.
//!
//! This crate provides the [`Dispatcher`], which executes exactly one node
//! and always returns a definite result. Failures inside a node's behavior
//! are converted into data: the node's [`NodeExecutionContext`] gets an
//! `error` status and its output becomes `{"error": "..."}`. Whether such an
//! error is fatal is the orchestrator's decision, not the dispatcher's.
//!
//! Each [`NodeSubtype`] maps to a [`NodeHandler`] in a lookup table. The
//! built-in handlers are deterministic stand-ins for real integrations; swap
//! one for a real connector with [`Dispatcher::register`]. The only handler
//! that leaves the process is the LLM completion handler, which calls the
//! [`CompletionService`] collaborator.
//!
//! [`NodeExecutionContext`]: cinnabar_context::NodeExecutionContext
//! [`NodeSubtype`]: cinnabar_config::NodeSubtype

mod completion;
mod dispatcher;
mod error;
mod handler;
pub mod handlers;

pub use completion::{
  ChatMessage, Completion, CompletionConfig, CompletionError, CompletionService,
  EchoCompletionService, Usage,
};
pub use dispatcher::Dispatcher;
pub use error::NodeError;
pub use handler::{Invocation, NodeHandler};
