//! The handler seam between the dispatcher and node behaviors.

use async_trait::async_trait;
use cinnabar_config::Node;
use cinnabar_context::RunContext;
use serde::de::DeserializeOwned;
use tokio_util::sync::CancellationToken;

use crate::error::NodeError;

/// Everything a handler can see while executing one node.
pub struct Invocation<'a> {
  pub node: &'a Node,
  pub input: &'a serde_json::Value,
  /// The run's context store. Memory handlers write to it.
  pub context: &'a mut RunContext,
  pub cancel: &'a CancellationToken,
}

impl Invocation<'_> {
  /// Parse the node's config into a typed struct.
  pub fn config<T: DeserializeOwned>(&self) -> Result<T, NodeError> {
    serde_json::from_value(serde_json::Value::Object(self.node.config.clone())).map_err(|e| {
      NodeError::InvalidConfig {
        node_id: self.node.id.clone(),
        message: e.to_string(),
      }
    })
  }
}

/// The behavior of one node subtype.
///
/// Implementations return the node's output. Returning an error marks the
/// node as failed; the dispatcher records it and carries on.
#[async_trait]
pub trait NodeHandler: Send + Sync {
  async fn handle(&self, invocation: Invocation<'_>) -> Result<serde_json::Value, NodeError>;
}
