//! Engine settings.
//!
//! Settings are read from `settings.json` in the data directory. Every field
//! is optional; a missing file yields [`Settings::default`].
//!
//! ```json
//! {
//!   "completion": { "model": "gpt-4", "temperature": 0.7, "maxTokens": 1000 },
//!   "run": { "debugMode": false, "joinPolicy": "first" }
//! }
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::enums::JoinPolicy;

/// Errors loading settings.
#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
  #[error("failed to read settings: {0}")]
  Io(#[from] std::io::Error),

  #[error("invalid settings JSON: {0}")]
  Parse(#[from] serde_json::Error),
}

/// Defaults applied to `llm` nodes that do not set these keys themselves.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CompletionDefaults {
  pub model: String,
  pub temperature: f64,
  pub max_tokens: u32,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub system_prompt: Option<String>,
}

impl Default for CompletionDefaults {
  fn default() -> Self {
    Self {
      model: "gpt-4".to_string(),
      temperature: 0.7,
      max_tokens: 1000,
      system_prompt: None,
    }
  }
}

/// Defaults for run options. CLI flags override these.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RunDefaults {
  pub debug_mode: bool,
  pub join_policy: JoinPolicy,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
  pub completion: CompletionDefaults,
  pub run: RunDefaults,
}

impl Settings {
  /// Load settings from a JSON file.
  pub fn load(path: &Path) -> Result<Self, SettingsError> {
    let content = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&content)?)
  }

  /// Load settings from a JSON file, or defaults if it does not exist.
  pub fn load_or_default(path: &Path) -> Result<Self, SettingsError> {
    if path.exists() {
      Self::load(path)
    } else {
      Ok(Self::default())
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_missing_file_yields_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let settings = Settings::load_or_default(&dir.path().join("settings.json")).unwrap();
    assert_eq!(settings, Settings::default());
    assert_eq!(settings.completion.model, "gpt-4");
  }

  #[test]
  fn test_partial_file_keeps_other_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("settings.json");
    std::fs::write(
      &path,
      r#"{ "completion": { "model": "local-7b" }, "run": { "joinPolicy": "all" } }"#,
    )
    .unwrap();

    let settings = Settings::load_or_default(&path).unwrap();
    assert_eq!(settings.completion.model, "local-7b");
    assert_eq!(settings.completion.max_tokens, 1000);
    assert_eq!(settings.run.join_policy, JoinPolicy::All);
    assert!(!settings.run.debug_mode);
  }

  #[test]
  fn test_invalid_json_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("settings.json");
    std::fs::write(&path, "{ not json").unwrap();

    let err = Settings::load(&path).unwrap_err();
    assert!(matches!(err, SettingsError::Parse(_)));
  }
}
