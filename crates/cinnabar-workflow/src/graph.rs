use std::collections::{HashMap, HashSet, VecDeque};

use cinnabar_config::{Connection, Node, WorkflowDef};

use crate::error::WorkflowError;

/// Graph structure for traversal and analysis.
#[derive(Debug, Clone)]
pub struct Graph {
  /// Nodes in authoring order.
  nodes: Vec<Node>,
  /// node_id -> position in `nodes`. First occurrence wins on duplicates.
  index: HashMap<String, usize>,
  /// Adjacency list: node_id -> downstream node_ids, in connection order.
  adjacency: HashMap<String, Vec<String>>,
  /// Reverse adjacency: node_id -> upstream node_ids, in connection order.
  reverse_adjacency: HashMap<String, Vec<String>>,
  /// Nodes never referenced as a connection target, in node order.
  triggers: Vec<String>,
  connections: Vec<Connection>,
}

impl Graph {
  /// Build a graph from nodes and connections.
  pub fn new(nodes: &[Node], connections: &[Connection]) -> Self {
    let mut index = HashMap::new();
    for (position, node) in nodes.iter().enumerate() {
      index.entry(node.id.clone()).or_insert(position);
    }

    let mut adjacency: HashMap<String, Vec<String>> = HashMap::new();
    let mut reverse_adjacency: HashMap<String, Vec<String>> = HashMap::new();

    for connection in connections {
      adjacency
        .entry(connection.source.clone())
        .or_default()
        .push(connection.target.clone());
      reverse_adjacency
        .entry(connection.target.clone())
        .or_default()
        .push(connection.source.clone());
    }

    // Triggers: ids that never appear as a target
    let targets: HashSet<&str> = connections.iter().map(|c| c.target.as_str()).collect();
    let triggers: Vec<String> = nodes
      .iter()
      .filter(|n| !targets.contains(n.id.as_str()))
      .map(|n| n.id.clone())
      .collect();

    Self {
      nodes: nodes.to_vec(),
      index,
      adjacency,
      reverse_adjacency,
      triggers,
      connections: connections.to_vec(),
    }
  }

  /// Build the graph for a workflow definition.
  pub fn from_workflow(workflow: &WorkflowDef) -> Self {
    Self::new(&workflow.nodes, &workflow.connections)
  }

  /// Nodes in authoring order.
  pub fn nodes(&self) -> &[Node] {
    &self.nodes
  }

  /// Look up a node. `None` for dangling references.
  pub fn node(&self, node_id: &str) -> Option<&Node> {
    self.index.get(node_id).map(|&position| &self.nodes[position])
  }

  /// Look up a node, failing if it does not exist.
  pub fn require_node(&self, node_id: &str) -> Result<&Node, WorkflowError> {
    self
      .node(node_id)
      .ok_or_else(|| WorkflowError::NodeNotFound(node_id.to_string()))
  }

  /// Trigger nodes (no incoming connection), in node order.
  pub fn triggers(&self) -> &[String] {
    &self.triggers
  }

  /// Get downstream nodes for a given node.
  pub fn downstream(&self, node_id: &str) -> &[String] {
    self
      .adjacency
      .get(node_id)
      .map(|v| v.as_slice())
      .unwrap_or(&[])
  }

  /// Get upstream nodes for a given node, one entry per incoming connection.
  pub fn upstream(&self, node_id: &str) -> &[String] {
    self
      .reverse_adjacency
      .get(node_id)
      .map(|v| v.as_slice())
      .unwrap_or(&[])
  }

  /// Node ids in dependency order, without executing anything.
  ///
  /// Kahn's algorithm over the graph's nodes; ties keep node order and
  /// dangling connections are ignored. Nodes on a cycle, and everything
  /// only reachable through one, are left out.
  pub fn topological_order(&self) -> Vec<String> {
    let mut in_degree: HashMap<&str, usize> = HashMap::new();
    for connection in self.live_connections() {
      *in_degree.entry(connection.target.as_str()).or_default() += 1;
    }

    let mut ready: VecDeque<&str> = self
      .index
      .keys()
      .filter(|id| !in_degree.contains_key(id.as_str()))
      .map(String::as_str)
      .collect();
    ready.make_contiguous().sort_by_key(|id| self.index[*id]);

    let mut order = Vec::with_capacity(self.index.len());
    while let Some(id) = ready.pop_front() {
      order.push(id.to_string());
      for next in self.downstream(id) {
        let Some(degree) = in_degree.get_mut(next.as_str()) else {
          continue;
        };
        *degree -= 1;
        if *degree == 0 {
          ready.push_back(next.as_str());
        }
      }
    }
    order
  }

  fn live_connections(&self) -> impl Iterator<Item = &Connection> {
    self
      .connections
      .iter()
      .filter(|c| self.index.contains_key(&c.source) && self.index.contains_key(&c.target))
  }

  /// Connections whose source or target is not a node of this graph.
  pub fn dangling_connections(&self) -> Vec<&Connection> {
    self
      .connections
      .iter()
      .filter(|c| !self.index.contains_key(&c.source) || !self.index.contains_key(&c.target))
      .collect()
  }

  /// Strict structural check for tooling. Execution does not require it.
  pub fn validate(&self) -> Result<(), WorkflowError> {
    let mut seen = HashSet::new();
    for node in &self.nodes {
      if !seen.insert(node.id.as_str()) {
        return Err(WorkflowError::DuplicateNode(node.id.clone()));
      }
    }

    if let Some(connection) = self.dangling_connections().first() {
      return Err(WorkflowError::InvalidConnection {
        id: connection.id.clone(),
        from: connection.source.clone(),
        to: connection.target.clone(),
      });
    }

    if self.triggers.is_empty() {
      return Err(WorkflowError::NoTriggers);
    }

    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use cinnabar_config::NodeType;

  fn node(id: &str, node_type: NodeType) -> Node {
    Node::new(id, node_type, id)
  }

  fn diamond() -> Graph {
    let nodes = vec![
      node("t", NodeType::Trigger),
      node("a", NodeType::Llm),
      node("b", NodeType::Tool),
      node("j", NodeType::Action),
    ];
    let connections = vec![
      Connection::new("e1", "t", "a"),
      Connection::new("e2", "t", "b"),
      Connection::new("e3", "a", "j"),
      Connection::new("e4", "b", "j"),
    ];
    Graph::new(&nodes, &connections)
  }

  #[test]
  fn test_triggers_and_adjacency() {
    let graph = diamond();
    assert_eq!(graph.triggers(), ["t"]);
    assert_eq!(graph.downstream("t"), ["a", "b"]);
    assert_eq!(graph.upstream("j"), ["a", "b"]);
    assert!(graph.upstream("t").is_empty());
    assert!(graph.validate().is_ok());
  }

  #[test]
  fn test_triggers_follow_node_order() {
    let nodes = vec![
      node("z", NodeType::Trigger),
      node("a", NodeType::Trigger),
      node("m", NodeType::Trigger),
    ];
    let graph = Graph::new(&nodes, &[]);
    assert_eq!(graph.triggers(), ["z", "a", "m"]);
  }

  #[test]
  fn test_no_triggers_when_cyclic() {
    let nodes = vec![node("a", NodeType::Llm), node("b", NodeType::Llm)];
    let connections = vec![Connection::new("e1", "a", "b"), Connection::new("e2", "b", "a")];
    let graph = Graph::new(&nodes, &connections);
    assert!(graph.triggers().is_empty());
    assert!(matches!(graph.validate(), Err(WorkflowError::NoTriggers)));
  }

  #[test]
  fn test_dangling_connection_is_tolerated() {
    let nodes = vec![node("t", NodeType::Trigger)];
    let connections = vec![Connection::new("e1", "t", "ghost")];
    let graph = Graph::new(&nodes, &connections);

    assert_eq!(graph.downstream("t"), ["ghost"]);
    assert!(graph.node("ghost").is_none());
    assert_eq!(graph.dangling_connections().len(), 1);
    assert!(matches!(
      graph.validate(),
      Err(WorkflowError::InvalidConnection { .. })
    ));
    assert!(matches!(
      graph.require_node("ghost"),
      Err(WorkflowError::NodeNotFound(_))
    ));
  }

  #[test]
  fn test_duplicate_ids_keep_first() {
    let nodes = vec![
      Node::new("t", NodeType::Trigger, "first"),
      Node::new("t", NodeType::Trigger, "second"),
    ];
    let graph = Graph::new(&nodes, &[]);
    assert_eq!(graph.node("t").unwrap().label, "first");
    assert!(matches!(
      graph.validate(),
      Err(WorkflowError::DuplicateNode(_))
    ));
  }

  #[test]
  fn test_topological_order_without_results() {
    let graph = diamond();
    assert_eq!(graph.topological_order(), ["t", "a", "b", "j"]);
  }

  #[test]
  fn test_topological_order_skips_cycles_and_dangling() {
    let nodes = vec![
      node("t", NodeType::Trigger),
      node("a", NodeType::Llm),
      node("b", NodeType::Llm),
      node("c", NodeType::Action),
    ];
    let connections = vec![
      Connection::new("e1", "t", "a"),
      Connection::new("e2", "a", "b"),
      Connection::new("e3", "b", "a"),
      Connection::new("e4", "b", "c"),
      Connection::new("e5", "t", "ghost"),
    ];
    let graph = Graph::new(&nodes, &connections);
    assert_eq!(graph.topological_order(), ["t"]);
  }
}
