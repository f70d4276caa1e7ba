//! `memory` handlers. Stored values land in the run's context so later
//! nodes and the caller can read them back.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;

use crate::error::NodeError;
use crate::handler::{Invocation, NodeHandler};

#[derive(Debug, Deserialize)]
#[serde(default)]
struct ShortTermConfig {
  key: String,
  ttl: u64,
}

impl Default for ShortTermConfig {
  fn default() -> Self {
    Self {
      key: "memory".to_string(),
      ttl: 3600,
    }
  }
}

/// Stores the input as a run variable.
#[derive(Debug, Clone, Copy, Default)]
pub struct ShortTermMemory;

#[async_trait]
impl NodeHandler for ShortTermMemory {
  async fn handle(&self, invocation: Invocation<'_>) -> Result<serde_json::Value, NodeError> {
    let config: ShortTermConfig = invocation.config()?;
    let Invocation { input, context, .. } = invocation;
    context.set_variable(config.key.clone(), input.clone());
    Ok(json!({
      "stored": true,
      "key": config.key,
      "value": input,
      "ttl": config.ttl,
    }))
  }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
struct LongTermConfig {
  key: String,
}

impl Default for LongTermConfig {
  fn default() -> Self {
    Self {
      key: "memory".to_string(),
    }
  }
}

/// Stores the input in the run's global data.
#[derive(Debug, Clone, Copy, Default)]
pub struct LongTermMemory;

#[async_trait]
impl NodeHandler for LongTermMemory {
  async fn handle(&self, invocation: Invocation<'_>) -> Result<serde_json::Value, NodeError> {
    let config: LongTermConfig = invocation.config()?;
    let Invocation { input, context, .. } = invocation;
    context.set_global_data(config.key.clone(), input.clone());
    Ok(json!({
      "stored": true,
      "key": config.key,
      "value": input,
    }))
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::handlers::test_support::run_in;
  use cinnabar_config::{Node, NodeType};
  use cinnabar_context::RunContext;

  #[tokio::test]
  async fn test_short_term_sets_variable() {
    let node =
      Node::new("m", NodeType::Memory, "Short-term Memory").with_config("key", json!("chat"));
    let mut context = RunContext::new("wf", "exec");
    let output = run_in(&ShortTermMemory, &node, json!(["hi"]), &mut context)
      .await
      .unwrap();

    assert_eq!(output, json!({"stored": true, "key": "chat", "value": ["hi"], "ttl": 3600}));
    assert_eq!(context.variable("chat"), Some(&json!(["hi"])));
    assert!(context.global_data("chat").is_none());
  }

  #[tokio::test]
  async fn test_long_term_sets_global_data() {
    let node = Node::new("m", NodeType::Memory, "Long-term Memory");
    let mut context = RunContext::new("wf", "exec");
    run_in(&LongTermMemory, &node, json!({"fact": 1}), &mut context)
      .await
      .unwrap();

    assert_eq!(context.global_data("memory"), Some(&json!({"fact": 1})));
    assert!(context.variable("memory").is_none());
  }
}
