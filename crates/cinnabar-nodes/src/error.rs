//! Node execution errors.

use crate::completion::CompletionError;

/// Errors raised inside a node's behavior.
///
/// The dispatcher never lets these escape; they end up as the `error`
/// field of the node's execution context.
#[derive(Debug, thiserror::Error)]
pub enum NodeError {
  /// The node's type is not one the engine knows.
  #[error("Unknown node type: {node_type}")]
  UnknownNodeType { node_id: String, node_type: String },

  /// The node's configuration could not be parsed.
  #[error("invalid config for node '{node_id}': {message}")]
  InvalidConfig { node_id: String, message: String },

  /// A required value was found neither in the config nor in the input.
  #[error("missing required field '{field}'")]
  MissingField { field: String },

  /// Prompt template rendering failed.
  #[error("template rendering failed: {message}")]
  Template { message: String },

  /// The completion service returned an error.
  #[error("completion failed: {0}")]
  Completion(#[from] CompletionError),

  /// The run was stopped while the node was in flight.
  #[error("execution cancelled")]
  Cancelled,
}
