//! Run events and observers.
//!
//! The orchestrator reports progress through a [`RunObserver`]: every log
//! entry as it is written, every successful node and breakpoint, state
//! changes, and step-mode pauses.

use cinnabar_context::NodeExecutionContext;
use tokio::sync::{mpsc, oneshot};

use crate::log::ExecutionLogEntry;
use crate::result::RunStatus;

/// Releases a run suspended at a breakpoint in step mode.
///
/// Single use. Dropping the handle without calling [`resume`](Self::resume)
/// also releases the run.
#[derive(Debug)]
pub struct ResumeHandle {
  sender: oneshot::Sender<()>,
}

impl ResumeHandle {
  pub(crate) fn new() -> (Self, oneshot::Receiver<()>) {
    let (sender, receiver) = oneshot::channel();
    (Self { sender }, receiver)
  }

  pub fn resume(self) {
    // The run may already have been stopped
    let _ = self.sender.send(());
  }
}

/// Receives progress from a run.
///
/// Called inline from the run; implementations must not block.
pub trait RunObserver: Send + Sync {
  /// A log entry was appended.
  fn on_log(&self, entry: &ExecutionLogEntry);

  /// A node completed successfully, or a breakpoint was reached (the
  /// context is then still `pending`).
  fn on_step(&self, node_id: &str, context: &NodeExecutionContext);

  /// The run is suspended at a breakpoint until `resume` is released.
  fn on_pause(&self, node_id: &str, resume: ResumeHandle) {
    let _ = node_id;
    resume.resume();
  }

  /// The run moved to a new state.
  fn on_state(&self, status: RunStatus) {
    let _ = status;
  }
}

/// An observer that discards everything. Pauses resume immediately.
#[derive(Debug, Clone, Default)]
pub struct NoopObserver;

impl RunObserver for NoopObserver {
  fn on_log(&self, _entry: &ExecutionLogEntry) {}

  fn on_step(&self, _node_id: &str, _context: &NodeExecutionContext) {}
}

/// Events delivered by [`ChannelObserver`].
#[derive(Debug)]
pub enum RunEvent {
  Log(ExecutionLogEntry),
  Step {
    node_id: String,
    context: NodeExecutionContext,
  },
  Paused {
    node_id: String,
    resume: ResumeHandle,
  },
  StateChanged(RunStatus),
}

/// An observer that forwards events to an unbounded channel.
///
/// If the receiver is gone, pauses resume immediately since the handle is
/// dropped with the unsent event.
#[derive(Debug, Clone)]
pub struct ChannelObserver {
  sender: mpsc::UnboundedSender<RunEvent>,
}

impl ChannelObserver {
  pub fn new(sender: mpsc::UnboundedSender<RunEvent>) -> Self {
    Self { sender }
  }

  /// Create an observer together with the receiving end of its channel.
  pub fn channel() -> (Self, mpsc::UnboundedReceiver<RunEvent>) {
    let (sender, receiver) = mpsc::unbounded_channel();
    (Self::new(sender), receiver)
  }
}

impl RunObserver for ChannelObserver {
  fn on_log(&self, entry: &ExecutionLogEntry) {
    let _ = self.sender.send(RunEvent::Log(entry.clone()));
  }

  fn on_step(&self, node_id: &str, context: &NodeExecutionContext) {
    let _ = self.sender.send(RunEvent::Step {
      node_id: node_id.to_string(),
      context: context.clone(),
    });
  }

  fn on_pause(&self, node_id: &str, resume: ResumeHandle) {
    let _ = self.sender.send(RunEvent::Paused {
      node_id: node_id.to_string(),
      resume,
    });
  }

  fn on_state(&self, status: RunStatus) {
    let _ = self.sender.send(RunEvent::StateChanged(status));
  }
}

type LogCallback = Box<dyn Fn(&ExecutionLogEntry) + Send + Sync>;
type StepCallback = Box<dyn Fn(&str, &NodeExecutionContext) + Send + Sync>;

/// An observer built from closures. Unset callbacks are skipped.
#[derive(Default)]
pub struct CallbackObserver {
  log: Option<LogCallback>,
  step: Option<StepCallback>,
}

impl CallbackObserver {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn with_log(mut self, callback: impl Fn(&ExecutionLogEntry) + Send + Sync + 'static) -> Self {
    self.log = Some(Box::new(callback));
    self
  }

  pub fn with_step(
    mut self,
    callback: impl Fn(&str, &NodeExecutionContext) + Send + Sync + 'static,
  ) -> Self {
    self.step = Some(Box::new(callback));
    self
  }
}

impl RunObserver for CallbackObserver {
  fn on_log(&self, entry: &ExecutionLogEntry) {
    if let Some(callback) = &self.log {
      callback(entry);
    }
  }

  fn on_step(&self, node_id: &str, context: &NodeExecutionContext) {
    if let Some(callback) = &self.step {
      callback(node_id, context);
    }
  }
}
