//! Run options and results.

use std::collections::HashSet;

use cinnabar_config::{JoinPolicy, RunDefaults};
use cinnabar_context::RunContext;
use serde::{Deserialize, Serialize};

use crate::log::ExecutionLogEntry;

/// Lifecycle of a run: `Idle -> Running -> {Completed, Failed, Stopped}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunStatus {
  Idle,
  Running,
  Completed,
  Failed,
  Stopped,
}

/// Per-run behavior switches.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RunOptions {
  /// Keep going after a node fails instead of aborting the run.
  pub debug_mode: bool,
  /// Node ids at which to log a breakpoint hit.
  pub breakpoints: HashSet<String>,
  /// Suspend at each breakpoint until the observer resumes.
  pub step_mode: bool,
  pub join_policy: JoinPolicy,
  /// Input handed to every trigger node. Defaults to `{}`.
  pub trigger_input: Option<serde_json::Value>,
}

impl RunOptions {
  /// Options seeded from settings.
  pub fn from_defaults(defaults: &RunDefaults) -> Self {
    Self {
      debug_mode: defaults.debug_mode,
      join_policy: defaults.join_policy,
      ..Self::default()
    }
  }

  pub fn with_breakpoint(mut self, node_id: impl Into<String>) -> Self {
    self.breakpoints.insert(node_id.into());
    self
  }
}

/// The outcome of one run.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RunResult {
  pub execution_id: String,
  pub status: RunStatus,
  /// True only for `Completed`.
  pub success: bool,
  /// One trigger's return value, or an array of them in trigger order.
  pub output: serde_json::Value,
  pub logs: Vec<ExecutionLogEntry>,
  pub context: RunContext,
}

#[cfg(test)]
mod tests {
  use super::*;
  use serde_json::json;

  #[test]
  fn test_options_deserialize_camel_case() {
    let options: RunOptions = serde_json::from_value(json!({
      "debugMode": true,
      "breakpoints": ["a"],
      "joinPolicy": "all"
    }))
    .unwrap();
    assert!(options.debug_mode);
    assert!(options.breakpoints.contains("a"));
    assert_eq!(options.join_policy, JoinPolicy::All);
    assert!(!options.step_mode);
  }

  #[test]
  fn test_options_from_defaults() {
    let defaults = RunDefaults {
      debug_mode: true,
      join_policy: JoinPolicy::All,
    };
    let options = RunOptions::from_defaults(&defaults).with_breakpoint("x");
    assert!(options.debug_mode);
    assert_eq!(options.join_policy, JoinPolicy::All);
    assert_eq!(options.breakpoints.len(), 1);
  }
}
