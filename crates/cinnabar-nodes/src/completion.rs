//! Completion service collaborator.
//!
//! `llm` nodes labelled as a completion call hand their messages to a
//! [`CompletionService`]. The engine has no retry or rate limiting around
//! this call; that belongs to the service implementation.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// A chat message sent to the completion service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
  pub role: String,
  pub content: String,
}

impl ChatMessage {
  pub fn new(role: impl Into<String>, content: impl Into<String>) -> Self {
    Self {
      role: role.into(),
      content: content.into(),
    }
  }

  pub fn user(content: impl Into<String>) -> Self {
    Self::new("user", content)
  }
}

/// Model settings for one completion call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompletionConfig {
  pub model: String,
  pub temperature: f64,
  pub max_tokens: u32,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub system_prompt: Option<String>,
}

/// Token accounting reported by the service.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Usage {
  pub prompt_tokens: u32,
  pub completion_tokens: u32,
  pub total_tokens: u32,
}

/// A completion returned by the service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Completion {
  pub content: String,
  pub model: String,
  pub usage: Usage,
}

#[derive(Debug, thiserror::Error)]
pub enum CompletionError {
  #[error("request failed: {0}")]
  RequestFailed(String),

  #[error("invalid response: {0}")]
  InvalidResponse(String),
}

/// The external chat/completion service.
#[async_trait]
pub trait CompletionService: Send + Sync {
  async fn send_completion(
    &self,
    messages: Vec<ChatMessage>,
    config: CompletionConfig,
  ) -> Result<Completion, CompletionError>;
}

/// A local service that echoes the last user message back.
///
/// Deterministic: the same messages and config always produce the same
/// completion. Token counts are whitespace-separated word counts.
#[derive(Debug, Clone, Default)]
pub struct EchoCompletionService;

#[async_trait]
impl CompletionService for EchoCompletionService {
  async fn send_completion(
    &self,
    messages: Vec<ChatMessage>,
    config: CompletionConfig,
  ) -> Result<Completion, CompletionError> {
    let last_user = messages
      .iter()
      .rev()
      .find(|m| m.role == "user")
      .map(|m| m.content.as_str())
      .unwrap_or_default();
    let content = format!("Echo: {}", last_user);

    let prompt_tokens = messages
      .iter()
      .map(|m| word_count(&m.content))
      .sum::<u32>()
      + config.system_prompt.as_deref().map(word_count).unwrap_or(0);
    let completion_tokens = word_count(&content);

    Ok(Completion {
      content,
      model: config.model,
      usage: Usage {
        prompt_tokens,
        completion_tokens,
        total_tokens: prompt_tokens + completion_tokens,
      },
    })
  }
}

fn word_count(text: &str) -> u32 {
  text.split_whitespace().count() as u32
}

#[cfg(test)]
mod tests {
  use super::*;

  fn config() -> CompletionConfig {
    CompletionConfig {
      model: "gpt-4".to_string(),
      temperature: 0.7,
      max_tokens: 100,
      system_prompt: None,
    }
  }

  #[tokio::test]
  async fn test_echo_uses_last_user_message() {
    let messages = vec![
      ChatMessage::user("first question"),
      ChatMessage::new("assistant", "an answer"),
      ChatMessage::user("second question"),
    ];

    let completion = EchoCompletionService
      .send_completion(messages, config())
      .await
      .unwrap();

    assert_eq!(completion.content, "Echo: second question");
    assert_eq!(completion.model, "gpt-4");
    assert_eq!(completion.usage.prompt_tokens, 6);
    assert_eq!(completion.usage.completion_tokens, 3);
    assert_eq!(completion.usage.total_tokens, 9);
  }

  #[test]
  fn test_usage_serializes_camel_case() {
    let value = serde_json::to_value(Usage {
      prompt_tokens: 1,
      completion_tokens: 2,
      total_tokens: 3,
    })
    .unwrap();
    assert_eq!(value["promptTokens"], 1);
    assert_eq!(value["totalTokens"], 3);
  }
}
