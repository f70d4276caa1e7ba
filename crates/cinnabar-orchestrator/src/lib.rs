//! Cinnabar Run Orchestrator
//!
//! Executes a workflow graph once. A [`RunOrchestrator`] owns all state of a
//! single run (its context store, log buffer and cancellation token) and is
//! consumed by [`RunOrchestrator::execute`].
//!
//! # Traversal
//!
//! Triggers (nodes that are never the target of a connection) run one after
//! another in node order. From each trigger the graph is walked breadth
//! first; each node runs at most once per trigger. A node's input is its
//! single upstream's output, or an object keyed by upstream label when it
//! has several.
//!
//! ```text
//! execute(nodes, connections, options)
//!   └─ for trigger in triggers
//!        └─ BFS: poll stop → join policy → breakpoint → dispatch → log → enqueue successors
//! ```
//!
//! # Error policy
//!
//! A failing node aborts the run (status `Failed`, output `null`) unless
//! `debug_mode` is set, in which case it is logged and traversal continues.
//! A stop through the [`StopHandle`] ends the run as `Stopped` with whatever
//! output was produced so far. Under `JoinPolicy::All`, a join node whose
//! predecessors never all complete is reported as a warning at the end.
//!
//! # Usage
//!
//! ```ignore
//! let dispatcher = Arc::new(Dispatcher::new(Arc::new(EchoCompletionService)));
//! let orchestrator = RunOrchestrator::new("my-workflow", dispatcher);
//! let stop = orchestrator.stop_handle();
//!
//! let result = orchestrator
//!   .execute(&nodes, &connections, RunOptions::default())
//!   .await;
//! ```

mod error;
mod events;
mod log;
mod orchestrator;
mod result;

pub use error::RunError;
pub use events::{
  CallbackObserver, ChannelObserver, NoopObserver, ResumeHandle, RunEvent, RunObserver,
};
pub use log::{ExecutionLogEntry, LogLevel};
pub use orchestrator::{RunOrchestrator, StopHandle};
pub use result::{RunOptions, RunResult, RunStatus};
