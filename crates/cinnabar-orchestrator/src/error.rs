//! Run error types.

/// Ways a run can end early.
///
/// `execute` never returns these; it folds them into the [`RunResult`]
/// status so the caller always gets the logs gathered so far.
///
/// [`RunResult`]: crate::RunResult
#[derive(Debug, thiserror::Error)]
pub enum RunError {
  /// Every node has an incoming connection.
  #[error("No trigger nodes found in workflow")]
  NoTriggers,

  /// A node failed outside debug mode.
  #[error("Node '{node_name}' failed: {message}")]
  NodeFailed {
    node_id: String,
    node_name: String,
    message: String,
  },

  /// The run was stopped through its [`StopHandle`](crate::StopHandle).
  #[error("Workflow execution stopped by user")]
  Cancelled,
}
