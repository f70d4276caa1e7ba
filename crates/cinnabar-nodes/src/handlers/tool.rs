//! `tool` handlers. None of these leave the process; they describe the call
//! they would have made.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;

use super::input_text;
use crate::error::NodeError;
use crate::handler::{Invocation, NodeHandler};

const HTTP_METHODS: &[&str] = &["GET", "POST", "PUT", "PATCH", "DELETE", "HEAD", "OPTIONS"];

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct HttpConfig {
  url: Option<String>,
  method: Option<String>,
  body: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct HttpRequest;

#[async_trait]
impl NodeHandler for HttpRequest {
  async fn handle(&self, invocation: Invocation<'_>) -> Result<serde_json::Value, NodeError> {
    let config: HttpConfig = invocation.config()?;
    let input = invocation.input;

    let url = config
      .url
      .or_else(|| input.get("url").and_then(|v| v.as_str()).map(str::to_string))
      .ok_or_else(|| NodeError::MissingField {
        field: "url".to_string(),
      })?;

    let method = config
      .method
      .unwrap_or_else(|| "GET".to_string())
      .to_uppercase();
    if !HTTP_METHODS.contains(&method.as_str()) {
      return Err(NodeError::InvalidConfig {
        node_id: invocation.node.id.clone(),
        message: format!("unsupported HTTP method '{}'", method),
      });
    }

    let body = config
      .body
      .or_else(|| input.get("body").cloned())
      .unwrap_or(serde_json::Value::Null);

    Ok(json!({
      "status": 200,
      "data": {
        "url": url,
        "method": method,
        "body": body,
      },
    }))
  }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
struct SqlConfig {
  query: Option<String>,
  database: String,
}

impl Default for SqlConfig {
  fn default() -> Self {
    Self {
      query: None,
      database: "default".to_string(),
    }
  }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SqlQuery;

#[async_trait]
impl NodeHandler for SqlQuery {
  async fn handle(&self, invocation: Invocation<'_>) -> Result<serde_json::Value, NodeError> {
    let config: SqlConfig = invocation.config()?;
    let query = config
      .query
      .or_else(|| {
        invocation
          .input
          .get("query")
          .and_then(|v| v.as_str())
          .map(str::to_string)
      })
      .filter(|q| !q.trim().is_empty())
      .ok_or_else(|| NodeError::MissingField {
        field: "query".to_string(),
      })?;

    Ok(json!({
      "rows": [],
      "count": 0,
      "query": query,
      "database": config.database,
    }))
  }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
struct ScriptConfig {
  language: String,
}

impl Default for ScriptConfig {
  fn default() -> Self {
    Self {
      language: "javascript".to_string(),
    }
  }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct Script;

#[async_trait]
impl NodeHandler for Script {
  async fn handle(&self, invocation: Invocation<'_>) -> Result<serde_json::Value, NodeError> {
    let config: ScriptConfig = invocation.config()?;
    Ok(json!({
      "status": "completed",
      "data": {
        "language": config.language,
        "input": invocation.input,
      },
    }))
  }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
struct OcrConfig {
  language: String,
}

impl Default for OcrConfig {
  fn default() -> Self {
    Self {
      language: "en".to_string(),
    }
  }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct Ocr;

#[async_trait]
impl NodeHandler for Ocr {
  async fn handle(&self, invocation: Invocation<'_>) -> Result<serde_json::Value, NodeError> {
    let config: OcrConfig = invocation.config()?;
    let text = input_text(invocation.input).unwrap_or("Extracted text from document");
    Ok(json!({
      "status": "completed",
      "data": {
        "text": text,
        "confidence": 0.95,
        "language": config.language,
      },
    }))
  }
}
