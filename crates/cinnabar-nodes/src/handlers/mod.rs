//! Built-in node handlers.
//!
//! Every handler is a deterministic stand-in for a real integration: given
//! a node's config and input it returns a structured output of the shape
//! the real connector would produce.

mod action;
mod eval;
mod guardrail;
mod knowledge;
mod llm;
mod memory;
mod tool;
mod trigger;

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{SecondsFormat, Utc};
use cinnabar_config::{CompletionDefaults, NodeSubtype};

use crate::completion::CompletionService;
use crate::error::NodeError;
use crate::handler::{Invocation, NodeHandler};

pub use action::{Notify, ReturnValue};
pub use eval::{Evaluator, Logger};
pub use guardrail::{ContentModeration, PiiDetection, RateLimit};
pub use knowledge::{DocumentIngest, KnowledgeSearch};
pub use llm::{ChatBuilder, LlmCompletion, PromptTemplate};
pub use memory::{LongTermMemory, ShortTermMemory};
pub use tool::{HttpRequest, Ocr, Script, SqlQuery};
pub use trigger::{EventTrigger, ManualTrigger, ScheduleTrigger, WebhookTrigger};

/// Returns the input unchanged.
#[derive(Debug, Clone, Copy, Default)]
pub struct Passthrough;

#[async_trait]
impl NodeHandler for Passthrough {
  async fn handle(&self, invocation: Invocation<'_>) -> Result<serde_json::Value, NodeError> {
    Ok(invocation.input.clone())
  }
}

/// The default handler table.
pub fn builtin(
  completion: Arc<dyn CompletionService>,
  defaults: CompletionDefaults,
) -> HashMap<NodeSubtype, Arc<dyn NodeHandler>> {
  let mut table: HashMap<NodeSubtype, Arc<dyn NodeHandler>> = HashMap::new();
  table.insert(NodeSubtype::ManualTrigger, Arc::new(ManualTrigger));
  table.insert(NodeSubtype::ScheduleTrigger, Arc::new(ScheduleTrigger));
  table.insert(NodeSubtype::WebhookTrigger, Arc::new(WebhookTrigger));
  table.insert(NodeSubtype::EventTrigger, Arc::new(EventTrigger));
  table.insert(
    NodeSubtype::LlmCompletion,
    Arc::new(LlmCompletion::new(completion, defaults)),
  );
  table.insert(NodeSubtype::ChatBuilder, Arc::new(ChatBuilder));
  table.insert(NodeSubtype::PromptTemplate, Arc::new(PromptTemplate));
  table.insert(NodeSubtype::KnowledgeSearch, Arc::new(KnowledgeSearch));
  table.insert(NodeSubtype::DocumentIngest, Arc::new(DocumentIngest));
  table.insert(NodeSubtype::HttpRequest, Arc::new(HttpRequest));
  table.insert(NodeSubtype::SqlQuery, Arc::new(SqlQuery));
  table.insert(NodeSubtype::Script, Arc::new(Script));
  table.insert(NodeSubtype::Ocr, Arc::new(Ocr));
  table.insert(NodeSubtype::ShortTermMemory, Arc::new(ShortTermMemory));
  table.insert(NodeSubtype::LongTermMemory, Arc::new(LongTermMemory));
  table.insert(NodeSubtype::PiiDetection, Arc::new(PiiDetection));
  table.insert(NodeSubtype::ContentModeration, Arc::new(ContentModeration));
  table.insert(NodeSubtype::RateLimit, Arc::new(RateLimit));
  table.insert(NodeSubtype::Logger, Arc::new(Logger));
  table.insert(NodeSubtype::Evaluator, Arc::new(Evaluator));
  table.insert(NodeSubtype::ReturnValue, Arc::new(ReturnValue));
  table.insert(NodeSubtype::Notify, Arc::new(Notify));
  table.insert(NodeSubtype::Passthrough, Arc::new(Passthrough));
  table
}

/// Current time as an ISO-8601 string with millisecond precision.
pub(crate) fn now_iso() -> String {
  Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Keys checked, in order, when a handler needs free text from its input.
const TEXT_KEYS: &[&str] = &["text", "content", "message", "prompt", "query"];

/// Free text carried by an input: the input itself if it is a string,
/// otherwise the first string value under one of the well-known keys.
pub(crate) fn input_text(input: &serde_json::Value) -> Option<&str> {
  if let Some(text) = input.as_str() {
    return Some(text);
  }
  TEXT_KEYS
    .iter()
    .find_map(|key| input.get(*key).and_then(|v| v.as_str()))
}

/// Like [`input_text`], but falls back to the input's JSON rendering.
pub(crate) fn input_text_or_json(input: &serde_json::Value) -> String {
  match input_text(input) {
    Some(text) => text.to_string(),
    None => input.to_string(),
  }
}

#[cfg(test)]
pub(crate) mod test_support {
  use cinnabar_config::Node;
  use cinnabar_context::RunContext;
  use tokio_util::sync::CancellationToken;

  use crate::error::NodeError;
  use crate::handler::{Invocation, NodeHandler};

  /// Run a handler against a throwaway context.
  pub async fn run(
    handler: &dyn NodeHandler,
    node: &Node,
    input: serde_json::Value,
  ) -> Result<serde_json::Value, NodeError> {
    let mut context = RunContext::new("wf", "exec");
    run_in(handler, node, input, &mut context).await
  }

  pub async fn run_in(
    handler: &dyn NodeHandler,
    node: &Node,
    input: serde_json::Value,
    context: &mut RunContext,
  ) -> Result<serde_json::Value, NodeError> {
    let cancel = CancellationToken::new();
    handler
      .handle(Invocation {
        node,
        input: &input,
        context,
        cancel: &cancel,
      })
      .await
  }
}
