//! `knowledge` handlers: retrieval and document ingestion.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;

use super::input_text;
use crate::error::NodeError;
use crate::handler::{Invocation, NodeHandler};

#[derive(Debug, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct SearchConfig {
  top_k: usize,
  query: Option<String>,
  collection: String,
}

impl Default for SearchConfig {
  fn default() -> Self {
    Self {
      top_k: 5,
      query: None,
      collection: "default".to_string(),
    }
  }
}

/// Upper bound on search results; scores reach zero at the last one.
const MAX_RESULTS: usize = 20;

/// Returns `topK` ranked documents for the query, best first. `topK` is
/// capped at [`MAX_RESULTS`] and the output reports the capped value.
#[derive(Debug, Clone, Copy, Default)]
pub struct KnowledgeSearch;

#[async_trait]
impl NodeHandler for KnowledgeSearch {
  async fn handle(&self, invocation: Invocation<'_>) -> Result<serde_json::Value, NodeError> {
    let config: SearchConfig = invocation.config()?;
    let query = input_text(invocation.input)
      .map(str::to_string)
      .or(config.query)
      .unwrap_or_default();

    let top_k = config.top_k.min(MAX_RESULTS);
    // Scores step down by 0.05 from 0.95
    let results: Vec<serde_json::Value> = (0..top_k)
      .map(|i| {
        let rank = i + 1;
        json!({
          "id": format!("doc_{}", rank),
          "score": (95 - 5 * i as i64) as f64 / 100.0,
          "content": format!("Result {} for \"{}\"", rank, query),
          "source": config.collection,
        })
      })
      .collect();

    Ok(json!({
      "query": query,
      "results": results,
      "topK": top_k,
    }))
  }
}

#[derive(Debug, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct IngestConfig {
  chunk_size: usize,
}

impl Default for IngestConfig {
  fn default() -> Self {
    Self { chunk_size: 512 }
  }
}

/// Splits the input documents into fixed-size character chunks and reports
/// the counts.
#[derive(Debug, Clone, Copy, Default)]
pub struct DocumentIngest;

#[async_trait]
impl NodeHandler for DocumentIngest {
  async fn handle(&self, invocation: Invocation<'_>) -> Result<serde_json::Value, NodeError> {
    let config: IngestConfig = invocation.config()?;
    if config.chunk_size == 0 {
      return Err(NodeError::InvalidConfig {
        node_id: invocation.node.id.clone(),
        message: "chunkSize must be greater than zero".to_string(),
      });
    }

    let documents = documents(invocation.input);
    let chunks: usize = documents
      .iter()
      .map(|doc| doc.chars().count().div_ceil(config.chunk_size).max(1))
      .sum();

    Ok(json!({
      "ingested": true,
      "documents": documents.len(),
      "chunks": chunks,
      "chunkSize": config.chunk_size,
    }))
  }
}

/// Document bodies in an input: `documents` (strings or objects with
/// `content`), a single text, or nothing.
fn documents(input: &serde_json::Value) -> Vec<String> {
  if let Some(list) = input.get("documents").and_then(|v| v.as_array()) {
    return list
      .iter()
      .map(|doc| match doc {
        serde_json::Value::String(text) => text.clone(),
        other => other
          .get("content")
          .and_then(|c| c.as_str())
          .map(str::to_string)
          .unwrap_or_else(|| other.to_string()),
      })
      .collect();
  }
  input_text(input)
    .map(|text| vec![text.to_string()])
    .unwrap_or_default()
}
