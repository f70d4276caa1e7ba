use thiserror::Error;

#[derive(Debug, Error)]
pub enum WorkflowError {
  #[error("node not found: {0}")]
  NodeNotFound(String),

  #[error("connection '{id}' references unknown node: from={from}, to={to}")]
  InvalidConnection { id: String, from: String, to: String },

  #[error("no trigger nodes found (all nodes have incoming connections)")]
  NoTriggers,

  #[error("duplicate node id: {0}")]
  DuplicateNode(String),
}
