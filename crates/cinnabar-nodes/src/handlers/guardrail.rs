//! `guardrail` handlers.

use std::sync::LazyLock;

use async_trait::async_trait;
use regex::Regex;
use serde::Deserialize;
use serde_json::json;

use super::input_text_or_json;
use crate::error::NodeError;
use crate::handler::{Invocation, NodeHandler};

static EMAIL: LazyLock<Regex> = LazyLock::new(|| {
  Regex::new(r"[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}").unwrap()
});

static SSN: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\b\d{3}-\d{2}-\d{4}\b").unwrap());

static PHONE: LazyLock<Regex> = LazyLock::new(|| {
  Regex::new(r"(?:\+?1[-.\s]?)?(?:\(\d{3}\)|\b\d{3})[-.\s]?\d{3}[-.\s]?\d{4}\b").unwrap()
});

/// Scan order matters: each pass runs on the text already redacted by the
/// passes before it.
static PATTERNS: LazyLock<[(&'static str, &'static Regex); 3]> =
  LazyLock::new(|| [("email", &*EMAIL), ("ssn", &*SSN), ("phone", &*PHONE)]);

/// Finds emails, SSNs and phone numbers and returns a redacted copy.
#[derive(Debug, Clone, Copy, Default)]
pub struct PiiDetection;

#[async_trait]
impl NodeHandler for PiiDetection {
  async fn handle(&self, invocation: Invocation<'_>) -> Result<serde_json::Value, NodeError> {
    let mut redacted = input_text_or_json(invocation.input);
    let mut entities = Vec::new();

    for (kind, pattern) in PATTERNS.iter() {
      for found in pattern.find_iter(&redacted) {
        entities.push(json!({ "type": kind, "value": found.as_str() }));
      }
      let replacement = format!("[REDACTED_{}]", kind.to_uppercase());
      redacted = pattern
        .replace_all(&redacted, replacement.as_str())
        .into_owned();
    }

    Ok(json!({
      "detected": !entities.is_empty(),
      "entities": entities,
      "redacted": redacted,
    }))
  }
}

/// Always reports content as safe.
#[derive(Debug, Clone, Copy, Default)]
pub struct ContentModeration;

#[async_trait]
impl NodeHandler for ContentModeration {
  async fn handle(&self, _invocation: Invocation<'_>) -> Result<serde_json::Value, NodeError> {
    Ok(json!({
      "moderated": true,
      "safe": true,
      "categories": [],
    }))
  }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
struct RateLimitConfig {
  limit: u64,
  window: String,
}

impl Default for RateLimitConfig {
  fn default() -> Self {
    Self {
      limit: 100,
      window: "1m".to_string(),
    }
  }
}

/// Admits the request and reports the quota left after it.
#[derive(Debug, Clone, Copy, Default)]
pub struct RateLimit;

#[async_trait]
impl NodeHandler for RateLimit {
  async fn handle(&self, invocation: Invocation<'_>) -> Result<serde_json::Value, NodeError> {
    let config: RateLimitConfig = invocation.config()?;
    Ok(json!({
      "allowed": config.limit > 0,
      "limit": config.limit,
      "remaining": config.limit.saturating_sub(1),
      "window": config.window,
    }))
  }
}
