//! `llm` handlers: the completion call and the prompt-building steps around it.

use std::sync::Arc;

use async_trait::async_trait;
use cinnabar_config::CompletionDefaults;
use serde::Deserialize;
use serde_json::json;
use tracing::debug;

use super::input_text;
use crate::completion::{ChatMessage, CompletionConfig, CompletionService};
use crate::error::NodeError;
use crate::handler::{Invocation, NodeHandler};

/// Per-node overrides. Anything unset falls back to the engine defaults.
#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct CompletionNodeConfig {
  model: Option<String>,
  temperature: Option<f64>,
  max_tokens: Option<u32>,
  system_prompt: Option<String>,
  /// Used when the input carries no prompt of its own.
  prompt: Option<String>,
}

/// Sends the node's messages to the [`CompletionService`].
pub struct LlmCompletion {
  service: Arc<dyn CompletionService>,
  defaults: CompletionDefaults,
}

impl LlmCompletion {
  pub fn new(service: Arc<dyn CompletionService>, defaults: CompletionDefaults) -> Self {
    Self { service, defaults }
  }

  fn completion_config(&self, config: &CompletionNodeConfig) -> CompletionConfig {
    CompletionConfig {
      model: config
        .model
        .clone()
        .unwrap_or_else(|| self.defaults.model.clone()),
      temperature: config.temperature.unwrap_or(self.defaults.temperature),
      max_tokens: config.max_tokens.unwrap_or(self.defaults.max_tokens),
      system_prompt: config
        .system_prompt
        .clone()
        .or_else(|| self.defaults.system_prompt.clone()),
    }
  }
}

/// Messages for the call: `input.messages` if present, otherwise a single
/// user message built from the input's text, the configured prompt, or the
/// input's JSON.
fn build_messages(
  node_id: &str,
  input: &serde_json::Value,
  config: &CompletionNodeConfig,
) -> Result<Vec<ChatMessage>, NodeError> {
  if let Some(messages) = input.get("messages") {
    return serde_json::from_value(messages.clone()).map_err(|e| NodeError::InvalidConfig {
      node_id: node_id.to_string(),
      message: format!("input.messages: {}", e),
    });
  }

  let text = match (input_text(input), &config.prompt) {
    (Some(text), _) => text.to_string(),
    (None, Some(prompt)) => prompt.clone(),
    (None, None) => input.to_string(),
  };

  Ok(vec![ChatMessage::user(text)])
}

#[async_trait]
impl NodeHandler for LlmCompletion {
  async fn handle(&self, invocation: Invocation<'_>) -> Result<serde_json::Value, NodeError> {
    let node_config: CompletionNodeConfig = invocation.config()?;
    let messages = build_messages(&invocation.node.id, invocation.input, &node_config)?;
    let config = self.completion_config(&node_config);

    debug!(
      model = %config.model,
      message_count = messages.len(),
      "completion_request"
    );

    let completion = tokio::select! {
      biased;
      _ = invocation.cancel.cancelled() => return Err(NodeError::Cancelled),
      result = self.service.send_completion(messages, config) => result?,
    };

    Ok(json!({
      "content": completion.content,
      "model": completion.model,
      "usage": completion.usage,
    }))
  }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ChatBuilderConfig {
  examples: Vec<serde_json::Value>,
}

/// Collects conversation messages and few-shot examples for a later call.
#[derive(Debug, Clone, Copy, Default)]
pub struct ChatBuilder;

#[async_trait]
impl NodeHandler for ChatBuilder {
  async fn handle(&self, invocation: Invocation<'_>) -> Result<serde_json::Value, NodeError> {
    let config: ChatBuilderConfig = invocation.config()?;
    let messages = invocation
      .input
      .get("messages")
      .cloned()
      .unwrap_or_else(|| json!([]));
    Ok(json!({
      "messages": messages,
      "examples": config.examples,
    }))
  }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct PromptTemplateConfig {
  template: Option<String>,
}

/// Renders `config.template` against the input.
///
/// Object inputs expose their keys as top-level variables; the whole input
/// is always available as `input`.
#[derive(Debug, Clone, Copy, Default)]
pub struct PromptTemplate;

#[async_trait]
impl NodeHandler for PromptTemplate {
  async fn handle(&self, invocation: Invocation<'_>) -> Result<serde_json::Value, NodeError> {
    let config: PromptTemplateConfig = invocation.config()?;
    let template = config.template.ok_or_else(|| NodeError::MissingField {
      field: "template".to_string(),
    })?;

    let mut vars = match invocation.input {
      serde_json::Value::Object(map) => map.clone(),
      _ => serde_json::Map::new(),
    };
    vars.insert("input".to_string(), invocation.input.clone());

    let env = minijinja::Environment::new();
    let prompt = env
      .render_str(&template, &vars)
      .map_err(|e| NodeError::Template {
        message: e.to_string(),
      })?;

    Ok(json!({ "prompt": prompt }))
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::completion::{Completion, CompletionError};
  use crate::handlers::test_support::run;
  use crate::EchoCompletionService;
  use cinnabar_config::{Node, NodeType};
  use cinnabar_context::RunContext;
  use std::time::Duration;
  use tokio_util::sync::CancellationToken;

  fn llm() -> LlmCompletion {
    LlmCompletion::new(Arc::new(EchoCompletionService), CompletionDefaults::default())
  }

  #[tokio::test]
  async fn test_completion_uses_input_prompt() {
    let node = Node::new("l", NodeType::Llm, "LLM Node");
    let output = run(&llm(), &node, json!({"prompt": "hello there"}))
      .await
      .unwrap();

    assert_eq!(output["content"], "Echo: hello there");
    assert_eq!(output["model"], "gpt-4");
    assert_eq!(output["usage"]["totalTokens"], 5);
  }

  #[tokio::test]
  async fn test_completion_node_config_overrides_defaults() {
    let node = Node::new("l", NodeType::Llm, "LLM Node")
      .with_config("model", json!("local-7b"))
      .with_config("prompt", json!("configured"));
    let output = run(&llm(), &node, json!({})).await.unwrap();

    assert_eq!(output["model"], "local-7b");
    assert_eq!(output["content"], "Echo: configured");
  }

  #[tokio::test]
  async fn test_completion_falls_back_to_input_json() {
    let node = Node::new("l", NodeType::Llm, "LLM Node");
    let output = run(&llm(), &node, json!({"triggered": true}))
      .await
      .unwrap();
    assert_eq!(output["content"], r#"Echo: {"triggered":true}"#);
  }

  #[tokio::test]
  async fn test_completion_uses_input_messages() {
    let node = Node::new("l", NodeType::Llm, "LLM Node");
    let input = json!({
      "messages": [
        {"role": "system", "content": "be brief"},
        {"role": "user", "content": "hi"}
      ]
    });
    let output = run(&llm(), &node, input).await.unwrap();
    assert_eq!(output["content"], "Echo: hi");
  }

  #[tokio::test]
  async fn test_completion_rejects_malformed_messages() {
    let node = Node::new("l", NodeType::Llm, "LLM Node");
    let err = run(&llm(), &node, json!({"messages": "nope"}))
      .await
      .unwrap_err();
    assert!(matches!(err, NodeError::InvalidConfig { node_id, .. } if node_id == "l"));
  }

  struct Hanging;

  #[async_trait]
  impl CompletionService for Hanging {
    async fn send_completion(
      &self,
      _messages: Vec<ChatMessage>,
      _config: CompletionConfig,
    ) -> Result<Completion, CompletionError> {
      tokio::time::sleep(Duration::from_secs(3600)).await;
      Err(CompletionError::RequestFailed("unreachable".to_string()))
    }
  }

  #[tokio::test]
  async fn test_completion_aborts_on_cancel() {
    let handler = LlmCompletion::new(Arc::new(Hanging), CompletionDefaults::default());
    let node = Node::new("l", NodeType::Llm, "LLM Node");
    let input = json!({});
    let mut context = RunContext::new("wf", "exec");
    let cancel = CancellationToken::new();

    let canceller = cancel.clone();
    tokio::spawn(async move {
      tokio::time::sleep(Duration::from_millis(10)).await;
      canceller.cancel();
    });

    let err = handler
      .handle(Invocation {
        node: &node,
        input: &input,
        context: &mut context,
        cancel: &cancel,
      })
      .await
      .unwrap_err();
    assert!(matches!(err, NodeError::Cancelled));
  }

  #[tokio::test]
  async fn test_chat_builder() {
    let node = Node::new("c", NodeType::Llm, "Chat Builder")
      .with_config("examples", json!([{"q": "1+1", "a": "2"}]));
    let output = run(&ChatBuilder, &node, json!({})).await.unwrap();
    assert_eq!(output["messages"], json!([]));
    assert_eq!(output["examples"][0]["a"], "2");
  }

  #[tokio::test]
  async fn test_prompt_template_renders_input() {
    let node = Node::new("p", NodeType::Llm, "Prompt Template")
      .with_config("template", json!("Summarize {{ topic }} for {{ input.audience }}"));
    let output = run(
      &PromptTemplate,
      &node,
      json!({"topic": "lifetimes", "audience": "beginners"}),
    )
    .await
    .unwrap();
    assert_eq!(output["prompt"], "Summarize lifetimes for beginners");
  }

  #[tokio::test]
  async fn test_prompt_template_requires_template() {
    let node = Node::new("p", NodeType::Llm, "Prompt Template");
    let err = run(&PromptTemplate, &node, json!({})).await.unwrap_err();
    assert!(matches!(err, NodeError::MissingField { field } if field == "template"));
  }

  #[tokio::test]
  async fn test_prompt_template_syntax_error() {
    let node =
      Node::new("p", NodeType::Llm, "Prompt Template").with_config("template", json!("{{ oops"));
    let err = run(&PromptTemplate, &node, json!({})).await.unwrap_err();
    assert!(matches!(err, NodeError::Template { .. }));
  }
}
