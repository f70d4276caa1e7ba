use serde::{Deserialize, Serialize};

/// A directed edge from one node's output to another node's input.
///
/// Source and target are expected to reference nodes of the same graph,
/// but this is not enforced here. Consumers treat a dangling reference as
/// "no node found".
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Connection {
  pub id: String,
  pub source: String,
  pub target: String,
}

impl Connection {
  pub fn new(id: impl Into<String>, source: impl Into<String>, target: impl Into<String>) -> Self {
    Self {
      id: id.into(),
      source: source.into(),
      target: target.into(),
    }
  }
}
