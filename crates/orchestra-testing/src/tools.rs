//! Canned `Tool` implementations used by the scenario tests.

use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use async_trait::async_trait;

use orchestra_core::{StepContext, Tool, ToolDefinition, ToolExecutionError, ToolInput, ToolOutput};

pub fn echo_tool_definition() -> ToolDefinition {
    ToolDefinition::builder("Echo")
        .keyword("echo")
        .description("repeats the input query back to the caller")
        .output_type("text/plain")
        .build()
}

pub struct EchoTool;

#[async_trait]
impl Tool for EchoTool {
    async fn execute(&self, input: ToolInput, _ctx: &StepContext) -> Result<ToolOutput, ToolExecutionError> {
        let text = input
            .get_str("query")
            .or(input.raw_query.as_deref())
            .unwrap_or_default()
            .to_string();
        Ok(ToolOutput::text(text))
    }
}

pub fn fetch_tool_definition() -> ToolDefinition {
    ToolDefinition::builder("Fetch")
        .keyword("fetch")
        .keyword("front page")
        .description("retrieves a URL and returns its raw text")
        .output_type("text/plain")
        .build()
}

/// Always returns a fixed page body; `fail_times` lets scenario tests
/// exercise the retry path.
pub struct FetchTool {
    body: String,
    fail_times: u32,
    calls: AtomicU32,
}

impl FetchTool {
    pub fn new(body: impl Into<String>) -> Self {
        Self {
            body: body.into(),
            fail_times: 0,
            calls: AtomicU32::new(0),
        }
    }

    pub fn flaky(body: impl Into<String>, fail_times: u32) -> Self {
        Self {
            body: body.into(),
            fail_times,
            calls: AtomicU32::new(0),
        }
    }
}

#[async_trait]
impl Tool for FetchTool {
    async fn execute(&self, _input: ToolInput, _ctx: &StepContext) -> Result<ToolOutput, ToolExecutionError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        if call < self.fail_times {
            return Err(ToolExecutionError::transient("front page temporarily unavailable"));
        }
        Ok(ToolOutput::text(self.body.clone()))
    }
}

pub fn summarize_tool_definition() -> ToolDefinition {
    ToolDefinition::builder("Summarize")
        .keyword("summarize")
        .description("summarizes plain text into a shorter form")
        .input_type("text/plain")
        .output_type("text/summary")
        .build()
}

pub struct SummarizeTool;

#[async_trait]
impl Tool for SummarizeTool {
    async fn execute(&self, input: ToolInput, ctx: &StepContext) -> Result<ToolOutput, ToolExecutionError> {
        let source = ctx
            .prior_outputs
            .values()
            .next()
            .and_then(|o| o.text.clone())
            .or_else(|| input.get_str("text").map(str::to_string))
            .unwrap_or_default();
        let summary: String = source.chars().take(40).collect();
        Ok(ToolOutput::text(summary))
    }
}

/// Fails every call with a permanent error; used for partial-failure
/// scenarios where no fallback is attached.
pub struct FailingTool {
    pub message: String,
}

#[async_trait]
impl Tool for FailingTool {
    async fn execute(&self, _input: ToolInput, _ctx: &StepContext) -> Result<ToolOutput, ToolExecutionError> {
        Err(ToolExecutionError::permanent(self.message.clone()))
    }
}

/// Sleeps for a configurable duration before succeeding; used to exercise
/// cancellation and parallelism-saturation scenarios.
pub struct SlowTool {
    pub delay: Duration,
}

#[async_trait]
impl Tool for SlowTool {
    async fn execute(&self, _input: ToolInput, _ctx: &StepContext) -> Result<ToolOutput, ToolExecutionError> {
        tokio::time::sleep(self.delay).await;
        Ok(ToolOutput::text("done"))
    }
}

/// Never completes; used to exercise the per-step timeout boundary.
pub struct NeverReturnsTool;

#[async_trait]
impl Tool for NeverReturnsTool {
    async fn execute(&self, _input: ToolInput, _ctx: &StepContext) -> Result<ToolOutput, ToolExecutionError> {
        std::future::pending().await
    }
}
