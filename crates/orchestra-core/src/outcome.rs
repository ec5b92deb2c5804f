//! Observable result and state of one [`crate::plan::PlanStep`].
//!
//! Transitions are monotone and terminate in one of `{Succeeded, Failed,
//! Skipped, TimedOut}`.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::error::ToolExecutionError;
use crate::tool::ToolOutput;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StepStatus {
    Pending,
    Running,
    Succeeded,
    Failed,
    Skipped,
    TimedOut,
}

impl StepStatus {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            StepStatus::Succeeded | StepStatus::Failed | StepStatus::Skipped | StepStatus::TimedOut
        )
    }

    pub fn is_success(self) -> bool {
        matches!(self, StepStatus::Succeeded)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepOutcome {
    pub step_id: String,
    pub status: StepStatus,
    pub output: Option<ToolOutput>,
    pub error: Option<String>,
    pub start: Option<chrono::DateTime<chrono::Utc>>,
    pub end: Option<chrono::DateTime<chrono::Utc>>,
    /// Number of execution attempts against the primary tool (including
    /// retries).
    pub attempts: u32,
    pub elapsed: Duration,
}

impl StepOutcome {
    pub fn pending(step_id: impl Into<String>) -> Self {
        Self {
            step_id: step_id.into(),
            status: StepStatus::Pending,
            output: None,
            error: None,
            start: None,
            end: None,
            attempts: 0,
            elapsed: Duration::ZERO,
        }
    }

    pub fn mark_running(&mut self) {
        self.status = StepStatus::Running;
        self.start = Some(chrono::Utc::now());
    }

    pub fn mark_succeeded(&mut self, output: ToolOutput, elapsed: Duration) {
        self.status = StepStatus::Succeeded;
        self.output = Some(output);
        self.end = Some(chrono::Utc::now());
        self.elapsed = elapsed;
    }

    pub fn mark_failed(&mut self, error: &ToolExecutionError, elapsed: Duration) {
        self.status = StepStatus::Failed;
        self.error = Some(error.message.clone());
        self.end = Some(chrono::Utc::now());
        self.elapsed = elapsed;
    }

    pub fn mark_timed_out(&mut self, elapsed: Duration) {
        self.status = StepStatus::TimedOut;
        self.error = Some("step deadline exceeded".to_string());
        self.end = Some(chrono::Utc::now());
        self.elapsed = elapsed;
    }

    pub fn mark_skipped(&mut self, reason: impl Into<String>) {
        self.status = StepStatus::Skipped;
        self.error = Some(reason.into());
        self.end = Some(chrono::Utc::now());
    }
}

/// One progress notification, published after every state transition.
/// `seq` permits gap detection when a slow consumer causes events to be
/// dropped.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProgressEvent {
    pub seq: u64,
    pub step_id: String,
    pub state: StepStatus,
    pub partial_output: Option<String>,
    pub elapsed_ms: u64,
}
