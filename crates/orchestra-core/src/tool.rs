//! The tool invocation contract.
//!
//! A [`Tool`] is an externally provided capability exposed to the
//! orchestrator as declarative metadata (see [`crate::definition::ToolDefinition`])
//! plus an `execute` handle. Tools are invoked by the executor, never by the
//! planner or registry directly.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use crate::error::ToolExecutionError;

/// Input handed to a tool at invocation time.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ToolInput {
    /// Structured arguments, resolved from the plan step's input template.
    pub arguments: serde_json::Value,
    /// The raw query text, when a tool wants it verbatim.
    pub raw_query: Option<String>,
}

impl ToolInput {
    pub fn from_json(arguments: serde_json::Value) -> Self {
        Self {
            arguments,
            raw_query: None,
        }
    }

    pub fn get<T: serde::de::DeserializeOwned>(&self, key: &str) -> Option<T> {
        self.arguments
            .get(key)
            .and_then(|v| serde_json::from_value(v.clone()).ok())
    }

    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.arguments.get(key).and_then(|v| v.as_str())
    }
}

/// Output produced by a successful tool invocation.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ToolOutput {
    /// The primary value, typed by the tool's declared output type.
    pub value: serde_json::Value,
    /// Optional human-readable text, folded into synthesis directly.
    pub text: Option<String>,
    /// Source attributions surfaced to the caller (see `QueryResult::sources`).
    #[serde(default)]
    pub sources: Vec<String>,
}

impl ToolOutput {
    pub fn text(text: impl Into<String>) -> Self {
        let text = text.into();
        Self {
            value: serde_json::Value::String(text.clone()),
            text: Some(text),
            sources: Vec::new(),
        }
    }
}

/// Supplied by the executor to every step invocation. A tool that needs
/// to introspect the registry receives it here rather than capturing a
/// reference at registration time, so a `ToolDefinition` remains a plain
/// value.
pub struct StepContext {
    pub plan_id: String,
    pub step_id: String,
    pub deadline: Duration,
    /// Outputs of dependency steps, keyed by the edge label declared in the
    /// plan (see `PlanStep::dependencies`).
    pub prior_outputs: HashMap<String, ToolOutput>,
    /// A best-effort hint channel; tools may push partial progress text.
    pub progress_hint: Option<tokio::sync::mpsc::UnboundedSender<String>>,
}

impl StepContext {
    pub fn prior_output(&self, label: &str) -> Option<&ToolOutput> {
        self.prior_outputs.get(label)
    }
}

/// The unified tool trait. Implementations are registered with the
/// [`crate::definition::ToolDefinition`] describing them.
#[async_trait]
pub trait Tool: Send + Sync {
    async fn execute(
        &self,
        input: ToolInput,
        ctx: &StepContext,
    ) -> Result<ToolOutput, ToolExecutionError>;
}

/// Type-erased handle stored in the registry.
pub type ToolHandle = Arc<dyn Tool>;
