//! The unified response produced once per query.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolUsageSummary {
    pub name: String,
    pub execution_time_ms: u64,
}

/// The taxonomy tags surfaced to callers: `tool_failure`, `canceled`,
/// `deadline_exceeded`, `empty_plan`, `validation_error`, `session_busy`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    ToolFailure,
    Canceled,
    DeadlineExceeded,
    EmptyPlan,
    ValidationError,
    SessionBusy,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorInfo {
    #[serde(rename = "type")]
    pub kind: ErrorKind,
    pub user_message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryResult {
    pub session_id: String,
    pub text: String,
    pub html: Option<String>,
    #[serde(default)]
    pub sources: Vec<String>,
    #[serde(default)]
    pub tools_used: Vec<ToolUsageSummary>,
    pub processing_time_ms: u64,
    pub error: Option<ErrorInfo>,
}

impl QueryResult {
    pub fn ok(session_id: impl Into<String>, text: impl Into<String>, processing_time_ms: u64) -> Self {
        Self {
            session_id: session_id.into(),
            text: text.into(),
            html: None,
            sources: Vec::new(),
            tools_used: Vec::new(),
            processing_time_ms,
            error: None,
        }
    }
}
