use std::fmt;

use serde::{Deserialize, Serialize};

/// The broad category of a node.
///
/// Serialized as its lowercase name. Unrecognized names are kept verbatim in
/// [`NodeType::Unknown`] so errors can report them.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum NodeType {
  /// Entry point (schedule, webhook, manual, event).
  Trigger,
  /// Completion call or prompt-construction step.
  Llm,
  /// Retrieval-augmented search or document ingestion.
  Knowledge,
  /// External action (HTTP, SQL, script, OCR).
  Tool,
  /// Short- or long-term key/value storage.
  Memory,
  /// PII detection, moderation, rate limiting.
  Guardrail,
  /// Structured logging / evaluation sink.
  Eval,
  /// Terminal side-effecting step.
  Action,
  /// Any type string the engine does not know. Dispatching it fails.
  Unknown(String),
}

impl NodeType {
  pub fn as_str(&self) -> &str {
    match self {
      NodeType::Trigger => "trigger",
      NodeType::Llm => "llm",
      NodeType::Knowledge => "knowledge",
      NodeType::Tool => "tool",
      NodeType::Memory => "memory",
      NodeType::Guardrail => "guardrail",
      NodeType::Eval => "eval",
      NodeType::Action => "action",
      NodeType::Unknown(name) => name,
    }
  }
}

impl From<String> for NodeType {
  fn from(name: String) -> Self {
    match name.as_str() {
      "trigger" => NodeType::Trigger,
      "llm" => NodeType::Llm,
      "knowledge" => NodeType::Knowledge,
      "tool" => NodeType::Tool,
      "memory" => NodeType::Memory,
      "guardrail" => NodeType::Guardrail,
      "eval" => NodeType::Eval,
      "action" => NodeType::Action,
      _ => NodeType::Unknown(name),
    }
  }
}

impl From<NodeType> for String {
  fn from(node_type: NodeType) -> Self {
    match node_type {
      NodeType::Unknown(name) => name,
      known => known.as_str().to_string(),
    }
  }
}

impl fmt::Display for NodeType {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

/// The concrete simulated behavior of a node within its type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeSubtype {
  ManualTrigger,
  ScheduleTrigger,
  WebhookTrigger,
  EventTrigger,
  LlmCompletion,
  ChatBuilder,
  PromptTemplate,
  KnowledgeSearch,
  DocumentIngest,
  HttpRequest,
  SqlQuery,
  Script,
  Ocr,
  ShortTermMemory,
  LongTermMemory,
  PiiDetection,
  ContentModeration,
  RateLimit,
  Logger,
  Evaluator,
  ReturnValue,
  Notify,
  /// Returns the input unchanged. Valid for every node type.
  Passthrough,
}

/// Label keywords used to infer a subtype when a node does not declare one.
/// Matched case-insensitively, first hit wins.
const LABEL_KEYWORDS: &[(NodeType, &str, NodeSubtype)] = &[
  (NodeType::Trigger, "manual", NodeSubtype::ManualTrigger),
  (NodeType::Trigger, "schedule", NodeSubtype::ScheduleTrigger),
  (NodeType::Trigger, "cron", NodeSubtype::ScheduleTrigger),
  (NodeType::Trigger, "webhook", NodeSubtype::WebhookTrigger),
  (NodeType::Trigger, "event", NodeSubtype::EventTrigger),
  (NodeType::Llm, "llm node", NodeSubtype::LlmCompletion),
  (NodeType::Llm, "chat builder", NodeSubtype::ChatBuilder),
  (NodeType::Llm, "prompt template", NodeSubtype::PromptTemplate),
  (NodeType::Knowledge, "search", NodeSubtype::KnowledgeSearch),
  (NodeType::Knowledge, "retriev", NodeSubtype::KnowledgeSearch),
  (NodeType::Knowledge, "rag", NodeSubtype::KnowledgeSearch),
  (NodeType::Knowledge, "document", NodeSubtype::DocumentIngest),
  (NodeType::Knowledge, "ingest", NodeSubtype::DocumentIngest),
  (NodeType::Knowledge, "upload", NodeSubtype::DocumentIngest),
  (NodeType::Tool, "http", NodeSubtype::HttpRequest),
  (NodeType::Tool, "api", NodeSubtype::HttpRequest),
  (NodeType::Tool, "sql", NodeSubtype::SqlQuery),
  (NodeType::Tool, "database", NodeSubtype::SqlQuery),
  (NodeType::Tool, "script", NodeSubtype::Script),
  (NodeType::Tool, "code", NodeSubtype::Script),
  (NodeType::Tool, "ocr", NodeSubtype::Ocr),
  (NodeType::Memory, "short", NodeSubtype::ShortTermMemory),
  (NodeType::Memory, "long", NodeSubtype::LongTermMemory),
  (NodeType::Guardrail, "pii", NodeSubtype::PiiDetection),
  (NodeType::Guardrail, "moderat", NodeSubtype::ContentModeration),
  (NodeType::Guardrail, "rate", NodeSubtype::RateLimit),
  (NodeType::Eval, "evaluat", NodeSubtype::Evaluator),
  (NodeType::Eval, "score", NodeSubtype::Evaluator),
  (NodeType::Eval, "log", NodeSubtype::Logger),
  (NodeType::Action, "return", NodeSubtype::ReturnValue),
  (NodeType::Action, "respon", NodeSubtype::ReturnValue),
  (NodeType::Action, "output", NodeSubtype::ReturnValue),
  (NodeType::Action, "notif", NodeSubtype::Notify),
  (NodeType::Action, "email", NodeSubtype::Notify),
  (NodeType::Action, "slack", NodeSubtype::Notify),
];

impl NodeSubtype {
  /// The node type this subtype belongs to. `None` for [`NodeSubtype::Passthrough`].
  pub fn node_type(&self) -> Option<NodeType> {
    let node_type = match self {
      NodeSubtype::ManualTrigger
      | NodeSubtype::ScheduleTrigger
      | NodeSubtype::WebhookTrigger
      | NodeSubtype::EventTrigger => NodeType::Trigger,
      NodeSubtype::LlmCompletion | NodeSubtype::ChatBuilder | NodeSubtype::PromptTemplate => {
        NodeType::Llm
      }
      NodeSubtype::KnowledgeSearch | NodeSubtype::DocumentIngest => NodeType::Knowledge,
      NodeSubtype::HttpRequest | NodeSubtype::SqlQuery | NodeSubtype::Script | NodeSubtype::Ocr => {
        NodeType::Tool
      }
      NodeSubtype::ShortTermMemory | NodeSubtype::LongTermMemory => NodeType::Memory,
      NodeSubtype::PiiDetection | NodeSubtype::ContentModeration | NodeSubtype::RateLimit => {
        NodeType::Guardrail
      }
      NodeSubtype::Logger | NodeSubtype::Evaluator => NodeType::Eval,
      NodeSubtype::ReturnValue | NodeSubtype::Notify => NodeType::Action,
      NodeSubtype::Passthrough => return None,
    };
    Some(node_type)
  }

  /// Infer a subtype from a node's label.
  ///
  /// Falls back to [`NodeSubtype::Passthrough`] when no keyword of the given
  /// type appears in the label.
  pub fn infer(node_type: &NodeType, label: &str) -> NodeSubtype {
    let label = label.to_lowercase();
    LABEL_KEYWORDS
      .iter()
      .find(|(ty, keyword, _)| ty == node_type && label.contains(keyword))
      .map(|(_, _, subtype)| *subtype)
      .unwrap_or(NodeSubtype::Passthrough)
  }

  /// All subtypes declared for a node type, in catalog order.
  pub fn for_type(node_type: &NodeType) -> Vec<NodeSubtype> {
    let mut subtypes: Vec<NodeSubtype> = Vec::new();
    for (ty, _, subtype) in LABEL_KEYWORDS {
      if ty == node_type && !subtypes.contains(subtype) {
        subtypes.push(*subtype);
      }
    }
    subtypes
  }
}

/// A typed unit of work in a workflow graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
  /// Unique within a graph.
  pub id: String,
  #[serde(rename = "type")]
  pub node_type: NodeType,
  #[serde(default)]
  pub label: String,
  /// Free-form configuration. Each subtype parses the keys it understands.
  #[serde(default)]
  pub config: serde_json::Map<String, serde_json::Value>,
  /// Explicit behavior selection. When absent the label decides.
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub subtype: Option<NodeSubtype>,
}

impl Node {
  pub fn new(id: impl Into<String>, node_type: NodeType, label: impl Into<String>) -> Self {
    Self {
      id: id.into(),
      node_type,
      label: label.into(),
      config: serde_json::Map::new(),
      subtype: None,
    }
  }

  /// Set a configuration value.
  pub fn with_config(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
    self.config.insert(key.into(), value);
    self
  }

  /// Select the behavior explicitly instead of inferring it from the label.
  pub fn with_subtype(mut self, subtype: NodeSubtype) -> Self {
    self.subtype = Some(subtype);
    self
  }

  /// Resolve the behavior for this node.
  ///
  /// An explicit subtype is honored only when it belongs to the node's type
  /// (or is `Passthrough`); otherwise the label is used.
  pub fn resolved_subtype(&self) -> NodeSubtype {
    match self.subtype {
      Some(subtype) if subtype.node_type().is_none_or(|ty| ty == self.node_type) => subtype,
      _ => NodeSubtype::infer(&self.node_type, &self.label),
    }
  }

  /// Label used in logs and as the key for fan-in inputs. Falls back to the id.
  pub fn display_name(&self) -> &str {
    if self.label.is_empty() {
      &self.id
    } else {
      &self.label
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use serde_json::json;

  #[test]
  fn test_infer_is_case_insensitive() {
    assert_eq!(
      NodeSubtype::infer(&NodeType::Llm, "my llm NODE"),
      NodeSubtype::LlmCompletion
    );
    assert_eq!(
      NodeSubtype::infer(&NodeType::Guardrail, "Content Moderation"),
      NodeSubtype::ContentModeration
    );
  }

  #[test]
  fn test_infer_is_scoped_to_type() {
    // "manual" is a trigger keyword, not an action keyword
    assert_eq!(
      NodeSubtype::infer(&NodeType::Action, "Manual"),
      NodeSubtype::Passthrough
    );
  }

  #[test]
  fn test_explicit_subtype_wins() {
    let node = Node::new("n1", NodeType::Tool, "Fetch things").with_subtype(NodeSubtype::SqlQuery);
    assert_eq!(node.resolved_subtype(), NodeSubtype::SqlQuery);
  }

  #[test]
  fn test_explicit_subtype_of_other_type_is_ignored() {
    let node = Node::new("n1", NodeType::Tool, "HTTP Request").with_subtype(NodeSubtype::Logger);
    assert_eq!(node.resolved_subtype(), NodeSubtype::HttpRequest);
  }

  #[test]
  fn test_unknown_type_deserializes() {
    let node: Node = serde_json::from_value(json!({
      "id": "x",
      "type": "teleporter",
      "label": "Beam me up"
    }))
    .unwrap();
    assert_eq!(node.node_type, NodeType::Unknown("teleporter".to_string()));
    assert_eq!(node.node_type.to_string(), "teleporter");
    assert!(node.config.is_empty());

    let value = serde_json::to_value(&node).unwrap();
    assert_eq!(value["type"], "teleporter");
  }

  #[test]
  fn test_ui_graph_shape() {
    let node: Node = serde_json::from_value(json!({
      "id": "l1",
      "type": "llm",
      "label": "LLM Node",
      "config": { "model": "gpt-4", "temperature": 0.2 }
    }))
    .unwrap();
    assert_eq!(node.node_type, NodeType::Llm);
    assert_eq!(node.config["model"], "gpt-4");
    assert_eq!(node.resolved_subtype(), NodeSubtype::LlmCompletion);
  }

  #[test]
  fn test_display_name_falls_back_to_id() {
    let node = Node::new("n7", NodeType::Action, "");
    assert_eq!(node.display_name(), "n7");
  }

  #[test]
  fn test_for_type_deduplicates() {
    assert_eq!(
      NodeSubtype::for_type(&NodeType::Knowledge),
      vec![NodeSubtype::KnowledgeSearch, NodeSubtype::DocumentIngest]
    );
  }
}
