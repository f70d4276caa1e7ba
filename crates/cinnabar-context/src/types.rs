use std::time::Instant;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Status of a node execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeStatus {
  Pending,
  Success,
  Error,
}

/// The recorded result of one node execution within a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeExecutionContext {
  pub node_id: String,
  pub input: serde_json::Value,
  pub output: serde_json::Value,
  pub timestamp: DateTime<Utc>,
  pub duration_ms: u64,
  pub status: NodeStatus,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub error: Option<String>,
}

impl NodeExecutionContext {
  /// Begin a node execution. The returned handle can only move forward to
  /// success or error.
  pub fn start(node_id: impl Into<String>, input: serde_json::Value) -> PendingExecution {
    PendingExecution {
      node_id: node_id.into(),
      input,
      timestamp: Utc::now(),
      started: Instant::now(),
    }
  }

  pub fn is_success(&self) -> bool {
    self.status == NodeStatus::Success
  }

  pub fn is_error(&self) -> bool {
    self.status == NodeStatus::Error
  }
}

/// A node execution that has started but not finished.
#[derive(Debug)]
pub struct PendingExecution {
  node_id: String,
  input: serde_json::Value,
  timestamp: DateTime<Utc>,
  started: Instant,
}

impl PendingExecution {
  pub fn node_id(&self) -> &str {
    &self.node_id
  }

  pub fn input(&self) -> &serde_json::Value {
    &self.input
  }

  /// A `pending` snapshot, for observers that want to show in-flight nodes.
  pub fn snapshot(&self) -> NodeExecutionContext {
    NodeExecutionContext {
      node_id: self.node_id.clone(),
      input: self.input.clone(),
      output: serde_json::Value::Null,
      timestamp: self.timestamp,
      duration_ms: 0,
      status: NodeStatus::Pending,
      error: None,
    }
  }

  /// Finish successfully.
  pub fn succeed(self, output: serde_json::Value) -> NodeExecutionContext {
    self.finish(NodeStatus::Success, output, None)
  }

  /// Finish with an error. The output is `{"error": message}`.
  pub fn fail(self, message: impl Into<String>) -> NodeExecutionContext {
    let message = message.into();
    let output = serde_json::json!({ "error": message });
    self.finish(NodeStatus::Error, output, Some(message))
  }

  fn finish(
    self,
    status: NodeStatus,
    output: serde_json::Value,
    error: Option<String>,
  ) -> NodeExecutionContext {
    NodeExecutionContext {
      duration_ms: self.started.elapsed().as_millis() as u64,
      node_id: self.node_id,
      input: self.input,
      output,
      timestamp: self.timestamp,
      status,
      error,
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use serde_json::json;

  #[test]
  fn test_pending_snapshot() {
    let pending = NodeExecutionContext::start("n1", json!({"a": 1}));
    let snapshot = pending.snapshot();
    assert_eq!(snapshot.status, NodeStatus::Pending);
    assert_eq!(snapshot.output, serde_json::Value::Null);
    assert_eq!(pending.node_id(), "n1");
  }

  #[test]
  fn test_succeed() {
    let ctx = NodeExecutionContext::start("n1", json!({})).succeed(json!({"ok": true}));
    assert!(ctx.is_success());
    assert_eq!(ctx.output["ok"], true);
    assert!(ctx.error.is_none());
  }

  #[test]
  fn test_fail_wraps_message() {
    let ctx = NodeExecutionContext::start("n1", json!({})).fail("boom");
    assert!(ctx.is_error());
    assert_eq!(ctx.output, json!({"error": "boom"}));
    assert_eq!(ctx.error.as_deref(), Some("boom"));
  }

  #[test]
  fn test_serializes_camel_case() {
    let ctx = NodeExecutionContext::start("n1", json!(null)).succeed(json!(1));
    let value = serde_json::to_value(&ctx).unwrap();
    assert_eq!(value["nodeId"], "n1");
    assert_eq!(value["status"], "success");
    assert!(value.get("durationMs").is_some());
    assert!(value.get("error").is_none());
  }
}
