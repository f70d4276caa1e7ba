//! Execution log entries.

use chrono::{DateTime, Utc};
use cinnabar_config::Node;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
  Info,
  Success,
  Error,
  Warning,
}

/// One line of a run's execution log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionLogEntry {
  pub id: String,
  pub timestamp: DateTime<Utc>,
  pub level: LogLevel,
  pub message: String,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub node_id: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub node_name: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub data: Option<serde_json::Value>,
}

impl ExecutionLogEntry {
  pub fn new(level: LogLevel, message: impl Into<String>) -> Self {
    Self {
      id: uuid::Uuid::new_v4().to_string(),
      timestamp: Utc::now(),
      level,
      message: message.into(),
      node_id: None,
      node_name: None,
      data: None,
    }
  }

  /// Attach the node this entry is about.
  pub fn for_node(mut self, node: &Node) -> Self {
    self.node_id = Some(node.id.clone());
    self.node_name = Some(node.display_name().to_string());
    self
  }

  pub fn with_data(mut self, data: serde_json::Value) -> Self {
    self.data = Some(data);
    self
  }
}
