use serde::{Deserialize, Serialize};

/// When a node with several incoming connections becomes eligible to run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JoinPolicy {
  /// Run as soon as the first predecessor completes. Inputs from
  /// predecessors that have not run yet are `null`.
  #[default]
  First,
  /// Wait until every predecessor has a result in the current run.
  All,
}
