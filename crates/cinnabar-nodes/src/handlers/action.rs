//! `action` handlers. An action's output is what a run reports as its result.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;

use super::input_text_or_json;
use crate::error::NodeError;
use crate::handler::{Invocation, NodeHandler};

#[derive(Debug, Clone, Copy, Default)]
pub struct ReturnValue;

#[async_trait]
impl NodeHandler for ReturnValue {
  async fn handle(&self, invocation: Invocation<'_>) -> Result<serde_json::Value, NodeError> {
    Ok(json!({
      "executed": true,
      "action": "return",
      "result": invocation.input,
    }))
  }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
struct NotifyConfig {
  channel: String,
  message: Option<String>,
}

impl Default for NotifyConfig {
  fn default() -> Self {
    Self {
      channel: "email".to_string(),
      message: None,
    }
  }
}

/// Reports a notification as delivered on the configured channel.
#[derive(Debug, Clone, Copy, Default)]
pub struct Notify;

#[async_trait]
impl NodeHandler for Notify {
  async fn handle(&self, invocation: Invocation<'_>) -> Result<serde_json::Value, NodeError> {
    let config: NotifyConfig = invocation.config()?;
    let message = config
      .message
      .unwrap_or_else(|| input_text_or_json(invocation.input));
    Ok(json!({
      "executed": true,
      "action": "notify",
      "result": {
        "channel": config.channel,
        "message": message,
        "delivered": true,
      },
    }))
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::handlers::test_support::run;
  use cinnabar_config::{Node, NodeType};

  #[tokio::test]
  async fn test_return_wraps_input() {
    let node = Node::new("r", NodeType::Action, "Return Response");
    let output = run(&ReturnValue, &node, json!({"answer": 42}))
      .await
      .unwrap();
    assert_eq!(
      output,
      json!({"executed": true, "action": "return", "result": {"answer": 42}})
    );
  }

  #[tokio::test]
  async fn test_notify_message_from_input() {
    let node =
      Node::new("n", NodeType::Action, "Slack Notify").with_config("channel", json!("slack"));
    let output = run(&Notify, &node, json!({"message": "deployed"}))
      .await
      .unwrap();
    assert_eq!(output["action"], "notify");
    assert_eq!(output["result"]["channel"], "slack");
    assert_eq!(output["result"]["message"], "deployed");
  }
}
