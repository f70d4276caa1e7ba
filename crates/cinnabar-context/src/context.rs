use std::collections::{HashMap, VecDeque};

use chrono::{DateTime, Utc};
use cinnabar_config::Connection;
use serde::Serialize;

use crate::types::NodeExecutionContext;

/// All state of one workflow run.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RunContext {
  workflow_id: String,
  execution_id: String,
  start_time: DateTime<Utc>,
  /// Results in first-execution order.
  node_results: Vec<NodeExecutionContext>,
  #[serde(skip)]
  index: HashMap<String, usize>,
  global_data: serde_json::Map<String, serde_json::Value>,
  variables: serde_json::Map<String, serde_json::Value>,
}

impl RunContext {
  /// Create a fresh context with empty maps, started now.
  pub fn new(workflow_id: impl Into<String>, execution_id: impl Into<String>) -> Self {
    Self {
      workflow_id: workflow_id.into(),
      execution_id: execution_id.into(),
      start_time: Utc::now(),
      node_results: Vec::new(),
      index: HashMap::new(),
      global_data: serde_json::Map::new(),
      variables: serde_json::Map::new(),
    }
  }

  pub fn workflow_id(&self) -> &str {
    &self.workflow_id
  }

  pub fn execution_id(&self) -> &str {
    &self.execution_id
  }

  pub fn start_time(&self) -> DateTime<Utc> {
    self.start_time
  }

  /// Record a node's result. Overwrites any earlier result for the node,
  /// which keeps its original position.
  pub fn record_node_result(&mut self, node_id: &str, context: NodeExecutionContext) {
    match self.index.get(node_id) {
      Some(&position) => self.node_results[position] = context,
      None => {
        self.index.insert(node_id.to_string(), self.node_results.len());
        self.node_results.push(context);
      }
    }
  }

  /// `None` if the node has not executed in this run.
  pub fn node_result(&self, node_id: &str) -> Option<&NodeExecutionContext> {
    self.index.get(node_id).map(|&position| &self.node_results[position])
  }

  /// `None` if the node has not executed in this run.
  pub fn node_output(&self, node_id: &str) -> Option<&serde_json::Value> {
    self.node_result(node_id).map(|r| &r.output)
  }

  /// All recorded results, in first-execution order.
  pub fn node_results(&self) -> &[NodeExecutionContext] {
    &self.node_results
  }

  /// Ids of executed nodes, in first-execution order.
  pub fn node_ids(&self) -> impl Iterator<Item = &str> {
    self.node_results.iter().map(|r| r.node_id.as_str())
  }

  pub fn node_count(&self) -> usize {
    self.node_results.len()
  }

  pub fn set_global_data(&mut self, key: impl Into<String>, value: serde_json::Value) {
    self.global_data.insert(key.into(), value);
  }

  pub fn global_data(&self, key: &str) -> Option<&serde_json::Value> {
    self.global_data.get(key)
  }

  pub fn set_variable(&mut self, name: impl Into<String>, value: serde_json::Value) {
    self.variables.insert(name.into(), value);
  }

  pub fn variable(&self, name: &str) -> Option<&serde_json::Value> {
    self.variables.get(name)
  }

  pub fn variables(&self) -> &serde_json::Map<String, serde_json::Value> {
    &self.variables
  }

  /// Milliseconds since the run started.
  pub fn elapsed_ms(&self) -> u64 {
    (Utc::now() - self.start_time).num_milliseconds().max(0) as u64
  }

  /// Order the executed nodes so that every connection between two of
  /// them points forward.
  ///
  /// Kahn's algorithm over the ids currently recorded. Nodes that become
  /// ready at the same time keep FIFO order, seeded in first-execution
  /// order. Nodes on a cycle are left out.
  pub fn topological_order(&self, connections: &[Connection]) -> Vec<String> {
    let mut in_degree: HashMap<&str, usize> = self.node_ids().map(|id| (id, 0)).collect();
    let mut adjacency: HashMap<&str, Vec<&str>> = HashMap::new();

    for connection in connections {
      let (source, target) = (connection.source.as_str(), connection.target.as_str());
      if !in_degree.contains_key(source) || !in_degree.contains_key(target) {
        continue;
      }
      adjacency.entry(source).or_default().push(target);
      if let Some(degree) = in_degree.get_mut(target) {
        *degree += 1;
      }
    }

    let mut queue: VecDeque<&str> = self
      .node_ids()
      .filter(|id| in_degree.get(id).is_some_and(|d| *d == 0))
      .collect();
    let mut order = Vec::with_capacity(self.node_results.len());

    while let Some(id) = queue.pop_front() {
      order.push(id.to_string());
      for &next in adjacency.get(id).map(|v| v.as_slice()).unwrap_or(&[]) {
        if let Some(degree) = in_degree.get_mut(next) {
          *degree -= 1;
          if *degree == 0 {
            queue.push_back(next);
          }
        }
      }
    }

    order
  }

  /// Clear results, global data and variables. Ids and start time stay.
  pub fn reset(&mut self) {
    self.node_results.clear();
    self.index.clear();
    self.global_data.clear();
    self.variables.clear();
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use serde_json::json;

  fn done(node_id: &str, output: serde_json::Value) -> NodeExecutionContext {
    NodeExecutionContext::start(node_id, json!({})).succeed(output)
  }

  fn record(ctx: &mut RunContext, ids: &[&str]) {
    for id in ids {
      ctx.record_node_result(id, done(id, json!(id)));
    }
  }

  #[test]
  fn test_missing_result_is_none() {
    let ctx = RunContext::new("wf", "exec");
    assert!(ctx.node_result("nope").is_none());
    assert!(ctx.node_output("nope").is_none());
    assert_eq!(ctx.node_count(), 0);
  }

  #[test]
  fn test_overwrite_keeps_position() {
    let mut ctx = RunContext::new("wf", "exec");
    record(&mut ctx, &["a", "b"]);
    ctx.record_node_result("a", done("a", json!("again")));

    assert_eq!(ctx.node_count(), 2);
    assert_eq!(ctx.node_output("a"), Some(&json!("again")));
    assert_eq!(ctx.node_ids().collect::<Vec<_>>(), ["a", "b"]);
  }

  #[test]
  fn test_bags_are_independent() {
    let mut ctx = RunContext::new("wf", "exec");
    ctx.set_global_data("k", json!(1));
    ctx.set_variable("k", json!(2));

    assert_eq!(ctx.global_data("k"), Some(&json!(1)));
    assert_eq!(ctx.variable("k"), Some(&json!(2)));
    assert_eq!(ctx.variables().len(), 1);
  }

  #[test]
  fn test_reset_keeps_ids() {
    let mut ctx = RunContext::new("wf", "exec");
    let started = ctx.start_time();
    record(&mut ctx, &["a"]);
    ctx.set_global_data("g", json!(true));
    ctx.set_variable("v", json!(true));

    ctx.reset();

    assert_eq!(ctx.node_count(), 0);
    assert!(ctx.node_result("a").is_none());
    assert!(ctx.global_data("g").is_none());
    assert!(ctx.variable("v").is_none());
    assert_eq!(ctx.execution_id(), "exec");
    assert_eq!(ctx.workflow_id(), "wf");
    assert_eq!(ctx.start_time(), started);
  }

  #[test]
  fn test_topological_order_respects_edges() {
    let mut ctx = RunContext::new("wf", "exec");
    // Recorded out of dependency order on purpose
    record(&mut ctx, &["c", "b", "a"]);
    let connections = vec![
      Connection::new("e1", "a", "b"),
      Connection::new("e2", "b", "c"),
    ];

    assert_eq!(ctx.topological_order(&connections), ["a", "b", "c"]);
  }

  #[test]
  fn test_topological_order_fifo_tie_break() {
    let mut ctx = RunContext::new("wf", "exec");
    record(&mut ctx, &["x", "t", "p", "q"]);
    // t -> q, t -> p : both become ready together, in connection order
    let connections = vec![
      Connection::new("e1", "t", "q"),
      Connection::new("e2", "t", "p"),
    ];

    // Seeds in record order: x, t. Then t's neighbors in adjacency order.
    assert_eq!(ctx.topological_order(&connections), ["x", "t", "q", "p"]);
  }

  #[test]
  fn test_topological_order_ignores_unknown_ids() {
    let mut ctx = RunContext::new("wf", "exec");
    record(&mut ctx, &["b"]);
    let connections = vec![Connection::new("e1", "a", "b")];

    assert_eq!(ctx.topological_order(&connections), ["b"]);
  }

  #[test]
  fn test_topological_order_drops_cycles() {
    let mut ctx = RunContext::new("wf", "exec");
    record(&mut ctx, &["a", "b", "c"]);
    let connections = vec![
      Connection::new("e1", "b", "c"),
      Connection::new("e2", "c", "b"),
    ];

    assert_eq!(ctx.topological_order(&connections), ["a"]);
  }

  #[test]
  fn test_elapsed_is_monotonic() {
    let ctx = RunContext::new("wf", "exec");
    let first = ctx.elapsed_ms();
    assert!(ctx.elapsed_ms() >= first);
  }
}
