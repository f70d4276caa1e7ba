use serde::{Deserialize, Serialize};

use crate::connection::Connection;
use crate::node::Node;

/// A workflow definition as authored on the canvas.
///
/// Node order is significant: triggers are run in the order they appear
/// in `nodes`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkflowDef {
  #[serde(alias = "id")]
  pub workflow_id: String,
  #[serde(default)]
  pub name: String,
  #[serde(default)]
  pub nodes: Vec<Node>,
  #[serde(default, alias = "edges")]
  pub connections: Vec<Connection>,
}

#[cfg(test)]
mod tests {
  use super::*;
  use serde_json::json;

  #[test]
  fn test_parse_workflow() {
    let workflow: WorkflowDef = serde_json::from_value(json!({
      "id": "wf-1",
      "name": "Support bot",
      "nodes": [
        { "id": "t1", "type": "trigger", "label": "Manual" },
        { "id": "l1", "type": "llm", "label": "LLM Node" }
      ],
      "edges": [
        { "id": "e1", "source": "t1", "target": "l1" }
      ]
    }))
    .unwrap();

    assert_eq!(workflow.workflow_id, "wf-1");
    assert_eq!(workflow.nodes.len(), 2);
    assert_eq!(workflow.connections[0].target, "l1");
    assert_eq!(workflow.nodes[1].label, "LLM Node");
  }
}
