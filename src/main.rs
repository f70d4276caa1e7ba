use std::io::{self, BufRead, IsTerminal, Read};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand, ValueEnum};
use tokio_util::sync::CancellationToken;
use tracing::debug;
use tracing_subscriber::EnvFilter;

use cinnabar_config::{JoinPolicy, Settings, WorkflowDef};
use cinnabar_nodes::{Dispatcher, EchoCompletionService};
use cinnabar_orchestrator::{ChannelObserver, RunEvent, RunOptions, RunOrchestrator, RunStatus};
use cinnabar_workflow::Graph;

/// Cinnabar - run AI workflow graphs from the command line
#[derive(Parser)]
#[command(name = "cinnabar")]
#[command(version, about, long_about = None)]
struct Cli {
  /// Path to the data directory (default: ~/.cinnabar)
  #[arg(long, global = true)]
  data_dir: Option<PathBuf>,

  #[command(subcommand)]
  command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
  /// Run an entire workflow. A JSON payload on stdin becomes the trigger input.
  Run {
    /// Path to the workflow file (JSON)
    workflow_file: PathBuf,

    /// Keep going after a node fails
    #[arg(long)]
    debug: bool,

    /// Node ID to pause at (repeatable)
    #[arg(long = "breakpoint")]
    breakpoints: Vec<String>,

    /// Wait for Enter at each breakpoint
    #[arg(long)]
    step: bool,

    /// When a node with several inputs may run
    #[arg(long, value_enum)]
    join_policy: Option<JoinArg>,
  },

  /// Check that every connection references an existing node
  Validate {
    /// Path to the workflow file (JSON)
    workflow_file: PathBuf,
  },

  /// Suggest what to add after a node
  Suggest {
    /// Path to the workflow file (JSON)
    workflow_file: PathBuf,

    /// The node ID to suggest follow-ups for
    #[arg(long)]
    node: String,
  },
}

#[derive(Clone, Copy, ValueEnum)]
enum JoinArg {
  First,
  All,
}

impl From<JoinArg> for JoinPolicy {
  fn from(arg: JoinArg) -> Self {
    match arg {
      JoinArg::First => JoinPolicy::First,
      JoinArg::All => JoinPolicy::All,
    }
  }
}

fn main() -> Result<()> {
  let cli = Cli::parse();

  tracing_subscriber::fmt()
    .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
    .with_writer(io::stderr)
    .init();

  let data_dir = match cli.data_dir {
    Some(dir) => dir,
    None => dirs::home_dir()
      .context("could not determine home directory")?
      .join(".cinnabar"),
  };

  let settings_path = data_dir.join("settings.json");
  let settings = Settings::load_or_default(&settings_path)
    .with_context(|| format!("failed to load settings: {}", settings_path.display()))?;
  debug!(path = %settings_path.display(), model = %settings.completion.model, "settings_loaded");

  let rt = tokio::runtime::Runtime::new()?;

  match cli.command {
    Some(Commands::Run {
      workflow_file,
      debug,
      breakpoints,
      step,
      join_policy,
    }) => {
      let mut options = RunOptions::from_defaults(&settings.run);
      options.debug_mode |= debug;
      options.step_mode = step;
      options.breakpoints.extend(breakpoints);
      if let Some(policy) = join_policy {
        options.join_policy = policy.into();
      }
      rt.block_on(run_workflow(&workflow_file, &settings, options))?;
    }
    Some(Commands::Validate { workflow_file }) => {
      validate(&workflow_file)?;
    }
    Some(Commands::Suggest {
      workflow_file,
      node,
    }) => {
      suggest(&workflow_file, &node)?;
    }
    None => {
      println!("cinnabar - use --help to see available commands");
    }
  }

  Ok(())
}

async fn run_workflow(
  workflow_file: &Path,
  settings: &Settings,
  mut options: RunOptions,
) -> Result<()> {
  let workflow = load_workflow(workflow_file)?;
  eprintln!("Loaded workflow: {}", workflow.name);

  let payload = read_payload_from_stdin()?;
  options.trigger_input = Some(payload);
  let step_mode = options.step_mode;

  let dispatcher = Arc::new(Dispatcher::with_defaults(
    Arc::new(EchoCompletionService),
    settings.completion.clone(),
  ));
  let (observer, mut events) = ChannelObserver::channel();

  let shutdown = CancellationToken::new();
  let orchestrator = RunOrchestrator::new(&workflow.workflow_id, dispatcher)
    .with_observer(Arc::new(observer))
    .with_parent_token(&shutdown);

  tokio::spawn({
    let shutdown = shutdown.clone();
    async move {
      if tokio::signal::ctrl_c().await.is_ok() {
        eprintln!("Stopping...");
        shutdown.cancel();
      }
    }
  });

  let printer = tokio::spawn(async move {
    while let Some(event) = events.recv().await {
      match event {
        RunEvent::Log(entry) => {
          let node = entry.node_name.as_deref().unwrap_or("-");
          eprintln!("[{:?}] {} ({})", entry.level, entry.message, node);
        }
        RunEvent::Paused { node_id, resume } => {
          if step_mode && io::stdin().is_terminal() {
            eprintln!("Paused at '{}'. Press Enter to continue.", node_id);
            let _ = tokio::task::spawn_blocking(|| {
              let mut line = String::new();
              io::stdin().lock().read_line(&mut line)
            })
            .await;
          }
          resume.resume();
        }
        RunEvent::Step { .. } | RunEvent::StateChanged(_) => {}
      }
    }
  });

  let result = orchestrator.execute_workflow(&workflow, options).await;
  // The observer is dropped with the orchestrator, which closes the channel
  let _ = printer.await;

  eprintln!("Execution {}: {:?}", result.execution_id, result.status);
  eprintln!("Nodes executed: {}", result.context.node_count());
  println!("{}", serde_json::to_string_pretty(&result.output)?);

  if result.status == RunStatus::Failed {
    bail!("workflow execution failed");
  }
  Ok(())
}

fn validate(workflow_file: &Path) -> Result<()> {
  let workflow = load_workflow(workflow_file)?;
  let graph = Graph::from_workflow(&workflow);

  graph.validate().context("workflow is invalid")?;

  let order = graph.topological_order();
  eprintln!(
    "Workflow '{}' is valid: {} nodes, {} triggers",
    workflow.name,
    workflow.nodes.len(),
    graph.triggers().len()
  );
  println!("{}", serde_json::to_string_pretty(&order)?);
  Ok(())
}

fn suggest(workflow_file: &Path, node_id: &str) -> Result<()> {
  let workflow = load_workflow(workflow_file)?;
  let graph = Graph::from_workflow(&workflow);
  let node = graph.require_node(node_id)?;

  let suggestions = cinnabar_suggest::suggest_next(node, &graph);
  println!("{}", serde_json::to_string_pretty(&suggestions)?);
  Ok(())
}

fn load_workflow(workflow_file: &Path) -> Result<WorkflowDef> {
  let content = std::fs::read_to_string(workflow_file)
    .with_context(|| format!("failed to read workflow file: {}", workflow_file.display()))?;

  serde_json::from_str(&content)
    .with_context(|| format!("failed to parse workflow file: {}", workflow_file.display()))
}

fn read_payload_from_stdin() -> Result<serde_json::Value> {
  if io::stdin().is_terminal() {
    return Ok(serde_json::json!({}));
  }

  let mut input = String::new();
  io::stdin()
    .read_to_string(&mut input)
    .context("failed to read payload from stdin")?;

  if input.trim().is_empty() {
    Ok(serde_json::json!({}))
  } else {
    serde_json::from_str(&input).context("failed to parse payload JSON from stdin")
  }
}
