//! Cinnabar Config
//!
//! This crate contains the serializable types for Cinnabar: the workflow
//! graph model (nodes and connections) and the engine settings file.
//! These types are plain data with no execution behavior.
//!
//! Configuration can be loaded from:
//! - JSON files (via CLI with `cinnabar run workflow.json`)
//! - UI-authored graphs (camelCase JSON, as exported by the canvas)
//!
//! The orchestrator takes these types, builds a graph index over them, and
//! executes the nodes.

mod connection;
mod enums;
mod node;
mod settings;
mod workflow;

pub use connection::Connection;
pub use enums::JoinPolicy;
pub use node::{Node, NodeSubtype, NodeType};
pub use settings::{CompletionDefaults, RunDefaults, Settings, SettingsError};
pub use workflow::WorkflowDef;
