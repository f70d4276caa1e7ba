use std::collections::{HashSet, VecDeque};
use std::sync::Arc;

use cinnabar_config::{Connection, JoinPolicy, Node, NodeType, WorkflowDef};
use cinnabar_context::{NodeExecutionContext, RunContext};
use cinnabar_nodes::Dispatcher;
use cinnabar_workflow::Graph;
use serde_json::json;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, warn};

use crate::error::RunError;
use crate::events::{NoopObserver, ResumeHandle, RunObserver};
use crate::log::{ExecutionLogEntry, LogLevel};
use crate::result::{RunOptions, RunResult, RunStatus};

/// Stops a run from outside.
///
/// Cloneable and usable from any task. Stopping is cooperative: the node
/// in flight finishes (an LLM call is aborted) and no further node starts.
#[derive(Debug, Clone)]
pub struct StopHandle {
  token: CancellationToken,
}

impl StopHandle {
  pub fn stop(&self) {
    self.token.cancel();
  }

  pub fn is_stopped(&self) -> bool {
    self.token.is_cancelled()
  }
}

/// Drives one run of a workflow graph.
///
/// One orchestrator per execution id; [`execute`](Self::execute) consumes it.
pub struct RunOrchestrator {
  workflow_id: String,
  execution_id: String,
  dispatcher: Arc<Dispatcher>,
  observer: Arc<dyn RunObserver>,
  cancel: CancellationToken,
  status: RunStatus,
  logs: Vec<ExecutionLogEntry>,
}

impl RunOrchestrator {
  pub fn new(workflow_id: impl Into<String>, dispatcher: Arc<Dispatcher>) -> Self {
    Self {
      workflow_id: workflow_id.into(),
      execution_id: uuid::Uuid::new_v4().to_string(),
      dispatcher,
      observer: Arc::new(NoopObserver),
      cancel: CancellationToken::new(),
      status: RunStatus::Idle,
      logs: Vec::new(),
    }
  }

  pub fn with_observer(mut self, observer: Arc<dyn RunObserver>) -> Self {
    self.observer = observer;
    self
  }

  /// Stop this run whenever `parent` is cancelled.
  pub fn with_parent_token(mut self, parent: &CancellationToken) -> Self {
    self.cancel = parent.child_token();
    self
  }

  pub fn execution_id(&self) -> &str {
    &self.execution_id
  }

  pub fn status(&self) -> RunStatus {
    self.status
  }

  pub fn stop_handle(&self) -> StopHandle {
    StopHandle {
      token: self.cancel.clone(),
    }
  }

  /// Run a loaded workflow definition.
  pub async fn execute_workflow(self, workflow: &WorkflowDef, options: RunOptions) -> RunResult {
    self
      .execute(&workflow.nodes, &workflow.connections, options)
      .await
  }

  /// Execute the graph from every trigger, one trigger after another.
  ///
  /// Never fails: configuration errors, aborts and stops are reported
  /// through the result's status, with all logs gathered so far.
  #[instrument(
    name = "run_execute",
    skip(self, nodes, connections, options),
    fields(
      workflow_id = %self.workflow_id,
      execution_id = %self.execution_id,
    )
  )]
  pub async fn execute(
    mut self,
    nodes: &[Node],
    connections: &[Connection],
    options: RunOptions,
  ) -> RunResult {
    let graph = Graph::new(nodes, connections);
    let mut context = RunContext::new(&self.workflow_id, &self.execution_id);

    self.logs.clear();
    self.set_status(RunStatus::Running);
    info!(
      node_count = nodes.len(),
      connection_count = connections.len(),
      debug_mode = options.debug_mode,
      "workflow_started"
    );
    self.log(ExecutionLogEntry::new(
      LogLevel::Info,
      "Starting workflow execution",
    ));

    let mut outputs = Vec::new();
    let outcome = self
      .run_triggers(&graph, &options, &mut context, &mut outputs)
      .await;
    let trigger_count = graph.triggers().len();

    let (status, output) = match outcome {
      Ok(()) => {
        self.log(ExecutionLogEntry::new(
          LogLevel::Success,
          "Workflow execution completed",
        ));
        info!(elapsed_ms = context.elapsed_ms(), "workflow_completed");
        (RunStatus::Completed, fold_outputs(outputs, trigger_count))
      }
      Err(RunError::Cancelled) => {
        self.log(ExecutionLogEntry::new(
          LogLevel::Warning,
          RunError::Cancelled.to_string(),
        ));
        (RunStatus::Stopped, fold_outputs(outputs, trigger_count))
      }
      Err(e) => {
        error!(error = %e, "workflow_failed");
        self.log(ExecutionLogEntry::new(
          LogLevel::Error,
          format!("Workflow execution failed: {}", e),
        ));
        (RunStatus::Failed, serde_json::Value::Null)
      }
    };

    self.set_status(status);

    RunResult {
      execution_id: self.execution_id,
      status,
      success: status == RunStatus::Completed,
      output,
      logs: self.logs,
      context,
    }
  }

  async fn run_triggers(
    &mut self,
    graph: &Graph,
    options: &RunOptions,
    context: &mut RunContext,
    outputs: &mut Vec<serde_json::Value>,
  ) -> Result<(), RunError> {
    if graph.triggers().is_empty() {
      return Err(RunError::NoTriggers);
    }

    let mut deferred: Vec<String> = Vec::new();

    for trigger_id in graph.triggers() {
      if self.cancel.is_cancelled() {
        return Err(RunError::Cancelled);
      }

      let mut visited = Visited::default();
      let result = self
        .execute_from_node(trigger_id, graph, options, context, &mut visited)
        .await;

      match result {
        Ok(()) => outputs.push(visited.return_value(graph, context)),
        Err(RunError::Cancelled) => {
          if !visited.is_empty() {
            outputs.push(visited.return_value(graph, context));
          }
          return Err(RunError::Cancelled);
        }
        Err(e) => return Err(e),
      }

      for node_id in visited.deferred {
        if !deferred.contains(&node_id) {
          deferred.push(node_id);
        }
      }
    }

    // A join can be released by a later trigger, so only report at the end
    for node_id in deferred {
      if context.node_result(&node_id).is_some() {
        continue;
      }
      let Some(node) = graph.node(&node_id) else {
        continue;
      };
      let waiting: Vec<&String> = graph
        .upstream(&node_id)
        .iter()
        .filter(|id| graph.node(id).is_some() && context.node_result(id).is_none())
        .collect();
      self.log(
        ExecutionLogEntry::new(
          LogLevel::Warning,
          format!("Node never ran: {} (waiting on predecessors)", node.display_name()),
        )
        .for_node(node)
        .with_data(json!({ "waitingOn": waiting })),
      );
    }

    Ok(())
  }

  /// Breadth-first traversal from one trigger.
  async fn execute_from_node(
    &mut self,
    start: &str,
    graph: &Graph,
    options: &RunOptions,
    context: &mut RunContext,
    visited: &mut Visited,
  ) -> Result<(), RunError> {
    let seed = options
      .trigger_input
      .clone()
      .unwrap_or_else(|| json!({}));
    let mut queue = VecDeque::from([(start.to_string(), seed)]);

    while let Some((node_id, queued_input)) = queue.pop_front() {
      if self.cancel.is_cancelled() {
        return Err(RunError::Cancelled);
      }
      if visited.contains(&node_id) {
        continue;
      }
      let Some(node) = graph.node(&node_id) else {
        debug!(node_id = %node_id, "node_not_found");
        continue;
      };

      if options.join_policy == JoinPolicy::All && !predecessors_ready(graph, &node_id, context) {
        debug!(node_id = %node_id, "join_deferred");
        visited.defer(&node_id);
        continue;
      }

      let input = resolve_input(graph, &node_id, queued_input, context);

      if options.breakpoints.contains(&node_id) {
        self.pause_at(node, &input, options.step_mode).await;
        if self.cancel.is_cancelled() {
          return Err(RunError::Cancelled);
        }
      }

      visited.insert(&node_id);
      self.log(
        ExecutionLogEntry::new(
          LogLevel::Info,
          format!("Executing node: {}", node.display_name()),
        )
        .for_node(node),
      );

      let output = self
        .dispatcher
        .execute_node(node, input, context, &self.cancel)
        .await;

      let Some(record) = context.node_result(&node_id).cloned() else {
        continue;
      };

      if record.is_error() {
        let message = record.error.clone().unwrap_or_default();

        if self.cancel.is_cancelled() {
          self.log(
            ExecutionLogEntry::new(
              LogLevel::Warning,
              format!("Node stopped: {}", node.display_name()),
            )
            .for_node(node)
            .with_data(json!({ "error": message })),
          );
          return Err(RunError::Cancelled);
        }

        self.log(
          ExecutionLogEntry::new(
            LogLevel::Error,
            format!("Node failed: {}", node.display_name()),
          )
          .for_node(node)
          .with_data(json!({ "error": message })),
        );
        if !options.debug_mode {
          return Err(RunError::NodeFailed {
            node_id: node_id.clone(),
            node_name: node.display_name().to_string(),
            message,
          });
        }
      } else {
        self.log(
          ExecutionLogEntry::new(
            LogLevel::Success,
            format!("Node completed: {}", node.display_name()),
          )
          .for_node(node)
          .with_data(output.clone()),
        );
        self.observer.on_step(&node_id, &record);
      }

      for next in graph.downstream(&node_id) {
        queue.push_back((next.clone(), output.clone()));
      }
    }

    Ok(())
  }

  /// Report a breakpoint and, in step mode, wait for the observer to
  /// resume or for the run to be stopped.
  async fn pause_at(&mut self, node: &Node, input: &serde_json::Value, step_mode: bool) {
    self.log(
      ExecutionLogEntry::new(
        LogLevel::Info,
        format!("Breakpoint hit at node: {}", node.display_name()),
      )
      .for_node(node),
    );
    let pending = NodeExecutionContext::start(&node.id, input.clone()).snapshot();
    self.observer.on_step(&node.id, &pending);

    if !step_mode {
      return;
    }

    let (handle, released) = ResumeHandle::new();
    self.observer.on_pause(&node.id, handle);
    info!(node_id = %node.id, "run_paused");

    tokio::select! {
      biased;
      _ = self.cancel.cancelled() => {}
      _ = released => {}
    }
    info!(node_id = %node.id, "run_resumed");
  }

  fn set_status(&mut self, status: RunStatus) {
    self.status = status;
    self.observer.on_state(status);
  }

  /// Append to the run log, mirror to tracing and stream to the observer.
  fn log(&mut self, entry: ExecutionLogEntry) {
    let node_id = entry.node_id.as_deref().unwrap_or_default();
    match entry.level {
      LogLevel::Info | LogLevel::Success => info!(node_id, "{}", entry.message),
      LogLevel::Warning => warn!(node_id, "{}", entry.message),
      LogLevel::Error => error!(node_id, "{}", entry.message),
    }
    self.observer.on_log(&entry);
    self.logs.push(entry);
  }
}

/// Node ids visited by one trigger's traversal, in visit order.
#[derive(Debug, Default)]
struct Visited {
  order: Vec<String>,
  seen: HashSet<String>,
  /// Join nodes held back by `JoinPolicy::All`, first deferral first.
  deferred: Vec<String>,
}

impl Visited {
  fn contains(&self, node_id: &str) -> bool {
    self.seen.contains(node_id)
  }

  fn insert(&mut self, node_id: &str) {
    if self.seen.insert(node_id.to_string()) {
      self.order.push(node_id.to_string());
    }
  }

  fn defer(&mut self, node_id: &str) {
    if !self.deferred.iter().any(|id| id == node_id) {
      self.deferred.push(node_id.to_string());
    }
  }

  fn is_empty(&self) -> bool {
    self.order.is_empty()
  }

  /// Output of the last visited `action` node, else of the last visited
  /// node, else null.
  fn return_value(&self, graph: &Graph, context: &RunContext) -> serde_json::Value {
    let last_action = self.order.iter().rev().find(|id| {
      graph
        .node(id)
        .is_some_and(|n| n.node_type == NodeType::Action)
    });
    last_action
      .or_else(|| self.order.last())
      .and_then(|id| context.node_output(id))
      .cloned()
      .unwrap_or(serde_json::Value::Null)
  }
}

/// Input for a node from its upstream outputs.
///
/// One upstream: its output (or the queued value if it has no result yet).
/// Several: an object keyed by each upstream's label, `null` for those that
/// have not run. None: the queued value.
fn resolve_input(
  graph: &Graph,
  node_id: &str,
  queued: serde_json::Value,
  context: &RunContext,
) -> serde_json::Value {
  match graph.upstream(node_id) {
    [] => queued,
    [single] => context.node_output(single).cloned().unwrap_or(queued),
    many => {
      let mut inputs = serde_json::Map::new();
      for upstream_id in many {
        let key = graph
          .node(upstream_id)
          .map(|n| n.display_name())
          .unwrap_or(upstream_id.as_str());
        let value = context
          .node_output(upstream_id)
          .cloned()
          .unwrap_or(serde_json::Value::Null);
        inputs.insert(key.to_string(), value);
      }
      serde_json::Value::Object(inputs)
    }
  }
}

/// True unless the node is a join point with an existing predecessor that
/// has no result yet in this run.
fn predecessors_ready(graph: &Graph, node_id: &str, context: &RunContext) -> bool {
  let upstream = graph.upstream(node_id);
  if upstream.len() < 2 {
    return true;
  }
  upstream
    .iter()
    .filter(|id| graph.node(id).is_some())
    .all(|id| context.node_result(id).is_some())
}

fn fold_outputs(outputs: Vec<serde_json::Value>, trigger_count: usize) -> serde_json::Value {
  if trigger_count == 1 {
    outputs
      .into_iter()
      .next()
      .unwrap_or(serde_json::Value::Null)
  } else {
    serde_json::Value::Array(outputs)
  }
}
