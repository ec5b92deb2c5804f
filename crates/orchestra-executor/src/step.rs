//! Per-step execution contract: resolve input, invoke the tool under a
//! deadline, retry transient failures with backoff, fall back to alternate
//! tools, and report a terminal [`StepOutcome`].

use std::collections::HashMap;
use std::time::{Duration, Instant};

use orchestra_core::{PlanStep, StepContext, StepOutcome, ToolHandle, ToolInput, ToolOutput};
use orchestra_registry::ToolRegistry;

use crate::cancellation::CancellationToken;

pub struct StepRunInput<'a> {
    pub plan_id: &'a str,
    pub step: &'a PlanStep,
    pub deadline: Duration,
    pub prior_outputs: HashMap<String, ToolOutput>,
}

/// Runs one step to a terminal outcome: success, permanent failure (after
/// exhausting the primary tool's retry budget and any fallbacks), or
/// timeout. Never panics on tool error — tool failures are data, not
/// control flow.
#[tracing::instrument(skip(registry, run, cancel), fields(step_id = %run.step.id))]
pub async fn run_step(
    registry: &ToolRegistry,
    run: StepRunInput<'_>,
    cancel: &CancellationToken,
) -> StepOutcome {
    let mut outcome = StepOutcome::pending(run.step.id.clone());
    outcome.mark_running();
    let started = Instant::now();

    let mut tool_chain: Vec<&str> = vec![run.step.tool_id.as_str()];
    tool_chain.extend(run.step.fallback_tool_ids.iter().map(|s| s.as_str()));

    let mut last_message = String::new();
    let mut total_attempts: u32 = 0;

    for (chain_idx, tool_id) in tool_chain.iter().enumerate() {
        let is_primary = chain_idx == 0;
        let max_attempts = if is_primary { run.step.retry.max_attempts } else { 1 };

        for attempt in 0..max_attempts {
            if cancel.is_canceled() {
                outcome.mark_skipped("canceled before invocation");
                return outcome;
            }

            let remaining = run.deadline.saturating_sub(started.elapsed());
            if remaining.is_zero() {
                outcome.mark_timed_out(started.elapsed());
                outcome.attempts = total_attempts;
                return outcome;
            }

            let Some(handle) = registry.get_handle(tool_id) else {
                last_message = format!("tool {tool_id} is not registered");
                break;
            };

            total_attempts += 1;
            let outcome_result = invoke_with_deadline(
                &handle,
                ToolInput::from_json(run.step.input_template.clone()),
                StepContext {
                    plan_id: run.plan_id.to_string(),
                    step_id: run.step.id.clone(),
                    deadline: remaining,
                    prior_outputs: run.prior_outputs.clone(),
                    progress_hint: None,
                },
                remaining,
                cancel,
            )
            .await;

            match outcome_result {
                Ok(output) => {
                    registry.record_usage(tool_id, true, started.elapsed().as_millis() as u64).ok();
                    outcome.mark_succeeded(output, started.elapsed());
                    outcome.attempts = total_attempts;
                    return outcome;
                }
                Err(StepAttemptError::TimedOut) => {
                    registry.record_usage(tool_id, false, started.elapsed().as_millis() as u64).ok();
                    outcome.mark_timed_out(started.elapsed());
                    outcome.attempts = total_attempts;
                    return outcome;
                }
                Err(StepAttemptError::Tool(err)) => {
                    registry.record_usage(tool_id, false, started.elapsed().as_millis() as u64).ok();
                    last_message = err.message.clone();
                    let retries_remain = is_primary && attempt + 1 < max_attempts;
                    if err.retryable && retries_remain {
                        let delay = run.step.retry.policy.delay_for(attempt);
                        tracing::debug!(tool = %tool_id, attempt, delay_ms = delay.as_millis() as u64, "retrying step after transient failure");
                        tokio::select! {
                            _ = tokio::time::sleep(delay) => {}
                            _ = cancel.canceled() => {
                                outcome.mark_skipped("canceled during retry backoff");
                                return outcome;
                            }
                        }
                        continue;
                    }
                    // Exhausted retries on this tool; fall through to the
                    // next entry in `tool_chain` (a fallback, if any).
                    break;
                }
            }
        }
    }

    outcome.mark_failed(
        &orchestra_core::ToolExecutionError::permanent(last_message),
        started.elapsed(),
    );
    outcome.attempts = total_attempts;
    outcome
}

enum StepAttemptError {
    Tool(orchestra_core::ToolExecutionError),
    TimedOut,
}

async fn invoke_with_deadline(
    handle: &ToolHandle,
    input: ToolInput,
    ctx: StepContext,
    deadline: Duration,
    cancel: &CancellationToken,
) -> Result<ToolOutput, StepAttemptError> {
    tokio::select! {
        result = tokio::time::timeout(deadline, handle.execute(input, &ctx)) => {
            match result {
                Ok(Ok(output)) => Ok(output),
                Ok(Err(err)) => Err(StepAttemptError::Tool(err)),
                Err(_) => Err(StepAttemptError::TimedOut),
            }
        }
        _ = cancel.canceled() => Err(StepAttemptError::TimedOut),
    }
}
