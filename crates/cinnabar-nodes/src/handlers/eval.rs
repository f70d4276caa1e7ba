//! `eval` handlers: logging sink and rule-based scoring.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, error, info, trace, warn};

use crate::error::NodeError;
use crate::handler::{Invocation, NodeHandler};

#[derive(Debug, Deserialize)]
#[serde(default)]
struct LoggerConfig {
  level: String,
  message: Option<String>,
}

impl Default for LoggerConfig {
  fn default() -> Self {
    Self {
      level: "info".to_string(),
      message: None,
    }
  }
}

/// Emits the input as a tracing event at the configured level.
#[derive(Debug, Clone, Copy, Default)]
pub struct Logger;

#[async_trait]
impl NodeHandler for Logger {
  async fn handle(&self, invocation: Invocation<'_>) -> Result<serde_json::Value, NodeError> {
    let config: LoggerConfig = invocation.config()?;
    let level = config.level.to_lowercase();
    let message = config.message.as_deref().unwrap_or("workflow_log");
    let node_id = invocation.node.id.as_str();
    let data = invocation.input;

    match level.as_str() {
      "trace" => trace!(node_id, data = %data, "{}", message),
      "debug" => debug!(node_id, data = %data, "{}", message),
      "info" => info!(node_id, data = %data, "{}", message),
      "warn" | "warning" => warn!(node_id, data = %data, "{}", message),
      "error" => error!(node_id, data = %data, "{}", message),
      other => {
        return Err(NodeError::InvalidConfig {
          node_id: node_id.to_string(),
          message: format!("unknown log level '{}'", other),
        });
      }
    }

    Ok(json!({
      "logged": true,
      "level": level,
      "data": data,
    }))
  }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
struct EvaluatorConfig {
  criteria: Vec<String>,
  threshold: f64,
}

impl Default for EvaluatorConfig {
  fn default() -> Self {
    Self {
      criteria: Vec::new(),
      threshold: 0.7,
    }
  }
}

/// Scores the input by the share of `criteria` keys it carries with a
/// non-null value. No criteria scores 1.0.
#[derive(Debug, Clone, Copy, Default)]
pub struct Evaluator;

#[async_trait]
impl NodeHandler for Evaluator {
  async fn handle(&self, invocation: Invocation<'_>) -> Result<serde_json::Value, NodeError> {
    let config: EvaluatorConfig = invocation.config()?;
    let input = invocation.input;

    let score = if config.criteria.is_empty() {
      1.0
    } else {
      let met = config
        .criteria
        .iter()
        .filter(|key| input.get(key.as_str()).is_some_and(|v| !v.is_null()))
        .count();
      met as f64 / config.criteria.len() as f64
    };

    Ok(json!({
      "evaluated": true,
      "criteria": config.criteria,
      "score": score,
      "passed": score >= config.threshold,
      "data": input,
    }))
  }
}
