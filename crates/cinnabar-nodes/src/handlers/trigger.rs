//! Trigger handlers. Each stamps the activation time.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;

use super::now_iso;
use crate::error::NodeError;
use crate::handler::{Invocation, NodeHandler};

#[derive(Debug, Clone, Copy, Default)]
pub struct ManualTrigger;

#[async_trait]
impl NodeHandler for ManualTrigger {
  async fn handle(&self, _invocation: Invocation<'_>) -> Result<serde_json::Value, NodeError> {
    Ok(json!({
      "triggered": true,
      "timestamp": now_iso(),
      "user": "current_user",
    }))
  }
}

#[derive(Debug, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct ScheduleConfig {
  schedule: String,
  timezone: String,
}

impl Default for ScheduleConfig {
  fn default() -> Self {
    Self {
      schedule: "0 * * * *".to_string(),
      timezone: "UTC".to_string(),
    }
  }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ScheduleTrigger;

#[async_trait]
impl NodeHandler for ScheduleTrigger {
  async fn handle(&self, invocation: Invocation<'_>) -> Result<serde_json::Value, NodeError> {
    let config: ScheduleConfig = invocation.config()?;
    Ok(json!({
      "triggered": true,
      "timestamp": now_iso(),
      "schedule": config.schedule,
      "timezone": config.timezone,
    }))
  }
}

#[derive(Debug, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct WebhookConfig {
  method: String,
  path: String,
}

impl Default for WebhookConfig {
  fn default() -> Self {
    Self {
      method: "POST".to_string(),
      path: "/webhook".to_string(),
    }
  }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct WebhookTrigger;

#[async_trait]
impl NodeHandler for WebhookTrigger {
  async fn handle(&self, invocation: Invocation<'_>) -> Result<serde_json::Value, NodeError> {
    let config: WebhookConfig = invocation.config()?;
    Ok(json!({
      "triggered": true,
      "timestamp": now_iso(),
      "method": config.method.to_uppercase(),
      "path": config.path,
      "payload": invocation.input,
    }))
  }
}

#[derive(Debug, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct EventConfig {
  event: String,
}

impl Default for EventConfig {
  fn default() -> Self {
    Self {
      event: "custom_event".to_string(),
    }
  }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct EventTrigger;

#[async_trait]
impl NodeHandler for EventTrigger {
  async fn handle(&self, invocation: Invocation<'_>) -> Result<serde_json::Value, NodeError> {
    let config: EventConfig = invocation.config()?;
    Ok(json!({
      "triggered": true,
      "timestamp": now_iso(),
      "event": config.event,
      "data": invocation.input,
    }))
  }
}
