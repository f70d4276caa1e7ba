use std::collections::HashMap;
use std::sync::Arc;

use cinnabar_config::{CompletionDefaults, Node, NodeSubtype, NodeType};
use cinnabar_context::{NodeExecutionContext, RunContext};
use tokio_util::sync::CancellationToken;
use tracing::{debug, instrument, warn};

use crate::completion::CompletionService;
use crate::error::NodeError;
use crate::handler::{Invocation, NodeHandler};
use crate::handlers;

/// Executes single nodes by looking their subtype up in a handler table.
pub struct Dispatcher {
  handlers: HashMap<NodeSubtype, Arc<dyn NodeHandler>>,
}

impl Dispatcher {
  /// Create a dispatcher with the built-in handlers and default LLM settings.
  pub fn new(completion: Arc<dyn CompletionService>) -> Self {
    Self::with_defaults(completion, CompletionDefaults::default())
  }

  /// Create a dispatcher whose LLM handler falls back to `defaults` for any
  /// setting a node does not configure.
  pub fn with_defaults(
    completion: Arc<dyn CompletionService>,
    defaults: CompletionDefaults,
  ) -> Self {
    Self {
      handlers: handlers::builtin(completion, defaults),
    }
  }

  /// Replace the handler for a subtype. Returns the previous one.
  pub fn register(
    &mut self,
    subtype: NodeSubtype,
    handler: Arc<dyn NodeHandler>,
  ) -> Option<Arc<dyn NodeHandler>> {
    self.handlers.insert(subtype, handler)
  }

  /// Execute one node and record the outcome in `context`.
  ///
  /// Always returns the node's output. A failing handler yields
  /// `{"error": message}` and an `error` status in the recorded context;
  /// callers inspect that status rather than a `Result`.
  #[instrument(
    name = "node_execute",
    skip(self, node, input, context, cancel),
    fields(
      node_id = %node.id,
      node_type = %node.node_type,
      execution_id = %context.execution_id(),
    )
  )]
  pub async fn execute_node(
    &self,
    node: &Node,
    input: serde_json::Value,
    context: &mut RunContext,
    cancel: &CancellationToken,
  ) -> serde_json::Value {
    let pending = NodeExecutionContext::start(&node.id, input);

    let result = self.invoke(node, pending.input(), context, cancel).await;

    let record = match result {
      Ok(output) => {
        debug!("node_succeeded");
        pending.succeed(output)
      }
      Err(e) => {
        warn!(error = %e, "node_failed");
        pending.fail(e.to_string())
      }
    };

    let output = record.output.clone();
    context.record_node_result(&node.id, record);
    output
  }

  async fn invoke(
    &self,
    node: &Node,
    input: &serde_json::Value,
    context: &mut RunContext,
    cancel: &CancellationToken,
  ) -> Result<serde_json::Value, NodeError> {
    if let NodeType::Unknown(name) = &node.node_type {
      return Err(NodeError::UnknownNodeType {
        node_id: node.id.clone(),
        node_type: name.clone(),
      });
    }

    let subtype = node.resolved_subtype();
    debug!(subtype = ?subtype, label = %node.label, "node_dispatch");

    let handler = match self.handlers.get(&subtype) {
      Some(handler) => handler,
      None => self
        .handlers
        .get(&NodeSubtype::Passthrough)
        .ok_or_else(|| NodeError::UnknownNodeType {
          node_id: node.id.clone(),
          node_type: node.node_type.to_string(),
        })?,
    };

    handler
      .handle(Invocation {
        node,
        input,
        context,
        cancel,
      })
      .await
  }
}
