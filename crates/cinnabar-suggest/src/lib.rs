//! Cinnabar Suggest
//!
//! Ranks likely next steps after a node. The ranking is a fixed table of
//! follow-ups per node type, adjusted for what the graph already contains:
//! kinds of node already reachable downstream of the current node are
//! demoted, and a graph without any `action` node gets its return step
//! promoted.
//!
//! This crate only reads the graph. It has no knowledge of execution.

use std::collections::{HashSet, VecDeque};

use cinnabar_config::{Node, NodeSubtype, NodeType};
use cinnabar_workflow::Graph;
use serde::Serialize;

/// Multiplier for a suggestion whose type is already downstream.
const DOWNSTREAM_PENALTY: f64 = 0.5;

/// Added to the return step when the graph has no action node.
const MISSING_ACTION_BOOST: f64 = 0.1;

/// A ranked candidate for the node to add after the current one.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Suggestion {
  pub node_type: NodeType,
  pub subtype: NodeSubtype,
  /// A label that selects `subtype` when used for a new node.
  pub label: &'static str,
  /// In `0.0..=1.0`, higher is better.
  pub score: f64,
  pub reason: String,
}

struct FollowUp {
  subtype: NodeSubtype,
  label: &'static str,
  score: f64,
  reason: &'static str,
}

const fn follow(
  subtype: NodeSubtype,
  label: &'static str,
  score: f64,
  reason: &'static str,
) -> FollowUp {
  FollowUp {
    subtype,
    label,
    score,
    reason,
  }
}

const TRIGGER_FOLLOW_UPS: &[FollowUp] = &[
  follow(NodeSubtype::PiiDetection, "PII Detection", 0.9, "Screen incoming data for PII"),
  follow(NodeSubtype::PromptTemplate, "Prompt Template", 0.85, "Shape the payload into a prompt"),
  follow(NodeSubtype::KnowledgeSearch, "Knowledge Search", 0.8, "Retrieve context for the request"),
  follow(NodeSubtype::HttpRequest, "HTTP Request", 0.6, "Fetch data from an external API"),
  follow(NodeSubtype::ShortTermMemory, "Short-term Memory", 0.5, "Keep the request for later"),
];

const LLM_FOLLOW_UPS: &[FollowUp] = &[
  follow(NodeSubtype::ContentModeration, "Content Moderation", 0.9, "Check the model output"),
  follow(NodeSubtype::Evaluator, "Evaluator", 0.8, "Score the response quality"),
  follow(NodeSubtype::ReturnValue, "Return Response", 0.75, "Return the answer to the caller"),
  follow(NodeSubtype::ShortTermMemory, "Short-term Memory", 0.6, "Remember the exchange"),
  follow(NodeSubtype::HttpRequest, "HTTP Request", 0.4, "Act on the model output"),
];

const KNOWLEDGE_FOLLOW_UPS: &[FollowUp] = &[
  follow(NodeSubtype::PromptTemplate, "Prompt Template", 0.9, "Ground a prompt in the results"),
  follow(NodeSubtype::LlmCompletion, "LLM Node", 0.85, "Answer using the retrieved context"),
  follow(NodeSubtype::Evaluator, "Evaluator", 0.5, "Check retrieval relevance"),
];

const TOOL_FOLLOW_UPS: &[FollowUp] = &[
  follow(NodeSubtype::LlmCompletion, "LLM Node", 0.8, "Interpret the tool result"),
  follow(NodeSubtype::ReturnValue, "Return Response", 0.7, "Return the tool result"),
  follow(NodeSubtype::Logger, "Logger", 0.6, "Record the call for auditing"),
];

const MEMORY_FOLLOW_UPS: &[FollowUp] = &[
  follow(NodeSubtype::LlmCompletion, "LLM Node", 0.85, "Use the remembered context"),
  follow(NodeSubtype::KnowledgeSearch, "Knowledge Search", 0.6, "Combine memory with retrieval"),
];

const GUARDRAIL_FOLLOW_UPS: &[FollowUp] = &[
  follow(NodeSubtype::LlmCompletion, "LLM Node", 0.85, "Pass the vetted input to a model"),
  follow(NodeSubtype::ReturnValue, "Return Response", 0.6, "Return the checked content"),
  follow(NodeSubtype::Logger, "Logger", 0.5, "Record guardrail decisions"),
];

const EVAL_FOLLOW_UPS: &[FollowUp] = &[
  follow(NodeSubtype::ReturnValue, "Return Response", 0.85, "Return the evaluated result"),
  follow(NodeSubtype::Notify, "Notify", 0.7, "Alert someone about the evaluation"),
  follow(NodeSubtype::Logger, "Logger", 0.4, "Keep an evaluation trail"),
];

const ACTION_FOLLOW_UPS: &[FollowUp] = &[
  follow(NodeSubtype::Logger, "Logger", 0.7, "Record what was done"),
  follow(NodeSubtype::Notify, "Notify", 0.5, "Tell someone the workflow finished"),
];

fn follow_ups(node_type: &NodeType) -> &'static [FollowUp] {
  match node_type {
    NodeType::Trigger => TRIGGER_FOLLOW_UPS,
    NodeType::Llm => LLM_FOLLOW_UPS,
    NodeType::Knowledge => KNOWLEDGE_FOLLOW_UPS,
    NodeType::Tool => TOOL_FOLLOW_UPS,
    NodeType::Memory => MEMORY_FOLLOW_UPS,
    NodeType::Guardrail => GUARDRAIL_FOLLOW_UPS,
    NodeType::Eval => EVAL_FOLLOW_UPS,
    NodeType::Action => ACTION_FOLLOW_UPS,
    NodeType::Unknown(_) => &[],
  }
}

/// Ranked next-step suggestions for `current`, best first.
///
/// Ties keep table order. Unknown node types get no suggestions.
pub fn suggest_next(current: &Node, graph: &Graph) -> Vec<Suggestion> {
  let downstream = downstream_types(graph, &current.id);
  let has_action = graph
    .nodes()
    .iter()
    .any(|n| n.node_type == NodeType::Action);

  let mut suggestions: Vec<Suggestion> = follow_ups(&current.node_type)
    .iter()
    .filter_map(|follow_up| {
      let node_type = follow_up.subtype.node_type()?;
      let mut score = follow_up.score;
      let mut reason = follow_up.reason.to_string();

      if downstream.contains(&node_type) {
        score *= DOWNSTREAM_PENALTY;
        reason.push_str(&format!(" (a {} step already follows)", node_type));
      } else if follow_up.subtype == NodeSubtype::ReturnValue && !has_action {
        score = (score + MISSING_ACTION_BOOST).min(1.0);
        reason.push_str(" (the workflow has no action yet)");
      }

      Some(Suggestion {
        node_type,
        subtype: follow_up.subtype,
        label: follow_up.label,
        score,
        reason,
      })
    })
    .collect();

  // Stable sort keeps table order for equal scores
  suggestions.sort_by(|a, b| b.score.total_cmp(&a.score));
  suggestions
}

/// Types of all nodes reachable from `start`, excluding `start` itself.
fn downstream_types(graph: &Graph, start: &str) -> HashSet<NodeType> {
  let mut seen: HashSet<&str> = HashSet::from([start]);
  let mut types = HashSet::new();
  let mut queue: VecDeque<&str> = graph.downstream(start).iter().map(String::as_str).collect();

  while let Some(id) = queue.pop_front() {
    if !seen.insert(id) {
      continue;
    }
    if let Some(node) = graph.node(id) {
      types.insert(node.node_type.clone());
    }
    queue.extend(graph.downstream(id).iter().map(String::as_str));
  }

  types
}

#[cfg(test)]
mod tests {
  use super::*;
  use cinnabar_config::Connection;

  fn graph(nodes: &[Node], edges: &[(&str, &str)]) -> Graph {
    let connections: Vec<Connection> = edges
      .iter()
      .enumerate()
      .map(|(i, (s, t))| Connection::new(format!("e{}", i), *s, *t))
      .collect();
    Graph::new(nodes, &connections)
  }

  #[test]
  fn test_trigger_suggestions_are_ranked() {
    let trigger = Node::new("t", NodeType::Trigger, "Manual");
    let suggestions = suggest_next(&trigger, &graph(&[trigger.clone()], &[]));

    assert_eq!(suggestions[0].subtype, NodeSubtype::PiiDetection);
    assert!(suggestions.windows(2).all(|w| w[0].score >= w[1].score));
    assert!(suggestions.iter().all(|s| s.node_type != NodeType::Trigger));
  }

  #[test]
  fn test_downstream_types_are_demoted() {
    let llm = Node::new("l", NodeType::Llm, "LLM Node");
    let nodes = vec![
      llm.clone(),
      Node::new("m", NodeType::Tool, "Script"),
      Node::new("g", NodeType::Guardrail, "Content Moderation"),
    ];
    // Reachable through an intermediate node
    let suggestions = suggest_next(&llm, &graph(&nodes, &[("l", "m"), ("m", "g")]));

    let moderation = suggestions
      .iter()
      .find(|s| s.subtype == NodeSubtype::ContentModeration)
      .unwrap();
    assert_eq!(moderation.score, 0.45);
    assert!(moderation.reason.contains("already follows"));
    assert_ne!(suggestions[0].subtype, NodeSubtype::ContentModeration);
  }

  #[test]
  fn test_missing_action_promotes_return() {
    let eval = Node::new("e", NodeType::Eval, "Evaluator");
    let suggestions = suggest_next(&eval, &graph(&[eval.clone()], &[]));

    assert_eq!(suggestions[0].subtype, NodeSubtype::ReturnValue);
    assert!((suggestions[0].score - 0.95).abs() < 1e-9);
  }

  #[test]
  fn test_suggested_label_selects_subtype() {
    for node_type in [
      NodeType::Trigger,
      NodeType::Llm,
      NodeType::Knowledge,
      NodeType::Tool,
      NodeType::Memory,
      NodeType::Guardrail,
      NodeType::Eval,
      NodeType::Action,
    ] {
      for follow_up in follow_ups(&node_type) {
        let target_type = follow_up.subtype.node_type().unwrap();
        assert_eq!(
          NodeSubtype::infer(&target_type, follow_up.label),
          follow_up.subtype,
          "label '{}' does not select its subtype",
          follow_up.label
        );
      }
    }
  }

  #[test]
  fn test_unknown_type_has_no_suggestions() {
    let node = Node::new("x", NodeType::Unknown("mystery".to_string()), "Mystery");
    assert!(suggest_next(&node, &graph(&[node.clone()], &[])).is_empty());
  }

  #[test]
  fn test_suggestion_serializes() {
    let trigger = Node::new("t", NodeType::Trigger, "Manual");
    let suggestions = suggest_next(&trigger, &graph(&[trigger.clone()], &[]));
    let value = serde_json::to_value(&suggestions[0]).unwrap();
    assert_eq!(value["nodeType"], "guardrail");
    assert_eq!(value["subtype"], "pii_detection");
  }
}
