//! The seven-step per-query sequence composing the four subsystems plus
//! the language-model collaborator.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use dashmap::DashMap;
use tokio::sync::{mpsc, Mutex as AsyncMutex};

use orchestra_context::ContextManager;
use orchestra_core::{
    Entity, ErrorInfo, ErrorKind, Intent, LanguageModel, ProgressEvent, QueryResult, StepStatus, Turn,
    ToolUsageSummary,
};
use orchestra_executor::{cancellation_pair, CancellationToken, Executor, ExecutorConfig, PlanStatus};
use orchestra_planner::{Planner, PlannerConfig, PlannerError};
use orchestra_registry::ToolRegistry;

use crate::config::OrchestratorConfig;
use crate::error::OrchestratorError;

struct SessionGate {
    mutex: AsyncMutex<()>,
    queued: AtomicUsize,
}

impl SessionGate {
    fn new() -> Self {
        Self {
            mutex: AsyncMutex::new(()),
            queued: AtomicUsize::new(0),
        }
    }
}

/// Composes the Registry, Context manager, Planner, and Executor behind a
/// single per-query entry point.
pub struct Orchestrator {
    config: OrchestratorConfig,
    registry: Arc<ToolRegistry>,
    context: Arc<ContextManager>,
    planner: Planner,
    executor: Executor,
    language_model: Arc<dyn LanguageModel>,
    session_gates: DashMap<String, Arc<SessionGate>>,
}

impl Orchestrator {
    pub fn new(
        config: OrchestratorConfig,
        registry: Arc<ToolRegistry>,
        context: Arc<ContextManager>,
        language_model: Arc<dyn LanguageModel>,
    ) -> Self {
        let planner = Planner::new(PlannerConfig {
            candidate_top_k: config.candidate_top_k,
            default_step_timeout: config.step_timeout(),
            plan_deadline: config.plan_timeout(),
        });
        let executor = Executor::new(ExecutorConfig {
            parallelism: config.parallelism,
            plan_deadline: config.plan_timeout(),
            cancellation_grace: config.cancellation_grace(),
        });

        Self {
            config,
            registry,
            context,
            planner,
            executor,
            language_model,
            session_gates: DashMap::new(),
        }
    }

    pub fn registry(&self) -> &Arc<ToolRegistry> {
        &self.registry
    }

    pub fn context_manager(&self) -> &Arc<ContextManager> {
        &self.context
    }

    /// Spawns the background idle-session sweep loop.
    pub fn spawn_background_sweep(self_arc: &Arc<Self>) -> tokio::task::JoinHandle<()> {
        let context = self_arc.context.clone();
        let interval = self_arc.config.session_sweep_interval();
        let idle_ttl = self_arc.config.session_idle_ttl();
        context.spawn_sweep_task(interval, idle_ttl)
    }

    #[tracing::instrument(skip(self, progress_sink, cancel), fields(session_id = %session_id))]
    pub async fn handle_query(
        &self,
        text: &str,
        session_id: String,
        user_id: Option<String>,
        progress_sink: Option<mpsc::Sender<ProgressEvent>>,
        cancel: Option<CancellationToken>,
    ) -> Result<QueryResult, OrchestratorError> {
        if text.trim().is_empty() {
            return Err(OrchestratorError::Validation("query text is empty".to_string()));
        }

        let gate = self
            .session_gates
            .entry(session_id.clone())
            .or_insert_with(|| Arc::new(SessionGate::new()))
            .clone();

        let queued_before = gate.queued.fetch_add(1, Ordering::SeqCst);
        if queued_before >= self.config.max_queued_queries_per_session {
            gate.queued.fetch_sub(1, Ordering::SeqCst);
            return Err(OrchestratorError::SessionBusy(session_id));
        }
        let _permit = gate.mutex.lock().await;
        gate.queued.fetch_sub(1, Ordering::SeqCst);

        let started = Instant::now();
        let query_deadline = self.config.query_timeout();
        let (_owned_handle, cancel) = match cancel {
            Some(token) => (None, token),
            None => {
                let (handle, token) = cancellation_pair();
                (Some(handle), token)
            }
        };

        // Step 1: load Context.
        let shared_context = self.context.get_or_create(&session_id, user_id).await;

        // Step 2: analyze.
        let remaining = query_deadline.saturating_sub(started.elapsed());
        let analysis = self.language_model.analyze(text, remaining).await;
        let (intent, entities): (Intent, Vec<Entity>) = match analysis {
            Ok(result) => (result.intent, result.entities),
            Err(e) => {
                tracing::warn!(session_id = %session_id, error = %e, "analysis collaborator failed, using unknown intent");
                (Intent::unknown(), Vec::new())
            }
        };

        // Step 3: plan.
        let plan = {
            let ctx = shared_context.lock().await;
            self.planner.plan(text, &intent, &entities, Some(&*ctx), &self.registry)
        };
        let plan = match plan {
            Ok(plan) => plan,
            Err(PlannerError::EmptyPlan) => {
                return Ok(self
                    .empty_plan_result(text, &session_id, started.elapsed(), query_deadline.saturating_sub(started.elapsed()))
                    .await);
            }
        };

        // Step 4: execute.
        let report = self
            .executor
            .run_plan(&plan, &self.registry, progress_sink, cancel)
            .await?;

        if self.config.enable_tool_learning {
            // ToolStats are updated inside the executor via `record_usage`
            // on every attempt; nothing further to do here.
        }

        let outcomes: Vec<_> = plan
            .steps
            .iter()
            .filter_map(|s| report.outcomes.get(&s.id).cloned())
            .collect();

        // Step 5: synthesize.
        let history = shared_context.lock().await.turns.clone();
        let remaining = query_deadline.saturating_sub(started.elapsed());
        let synthesis = self
            .language_model
            .synthesize(text, &plan, &outcomes, &history, remaining)
            .await;

        let (response_text, html, sources) = match synthesis {
            Ok(result) => (result.text, result.html, result.sources),
            Err(e) => {
                tracing::warn!(session_id = %session_id, error = %e, "synthesis collaborator failed, falling back to tool-output concatenation");
                (deterministic_fallback_text(&outcomes), None, Vec::new())
            }
        };

        let tools_used: Vec<ToolUsageSummary> = plan
            .steps
            .iter()
            .zip(outcomes.iter())
            .map(|(step, outcome)| {
                let name = self
                    .registry
                    .get(&step.tool_id)
                    .map(|def| def.name)
                    .unwrap_or_else(|| step.tool_id.clone());
                ToolUsageSummary {
                    name,
                    execution_time_ms: outcome.elapsed.as_millis() as u64,
                }
            })
            .collect();

        // Step 6: append turns, snapshot.
        {
            let mut ctx = shared_context.lock().await;
            ctx.append_turn(Turn::user(text));
            ctx.append_turn(Turn::assistant(response_text.clone(), tools_used.iter().map(|t| t.name.clone()).collect()));
            ctx.last_execution_summary = Some(format!("{:?}", report.status));
        }
        self.context.snapshot(&session_id).await;

        // Step 7: return QueryResult.
        let mut result = QueryResult::ok(session_id.clone(), response_text, started.elapsed().as_millis() as u64);
        result.html = html;
        result.sources = sources;
        result.tools_used = tools_used;
        let critical_succeeded = plan
            .steps
            .iter()
            .filter(|s| s.critical)
            .filter_map(|s| report.outcomes.get(&s.id))
            .any(|o| o.status.is_success());
        if matches!(report.status, PlanStatus::Failed) && !critical_succeeded {
            let any_timed_out = outcomes.iter().any(|o| o.status == StepStatus::TimedOut);
            result.error = Some(if any_timed_out {
                ErrorInfo {
                    kind: ErrorKind::DeadlineExceeded,
                    user_message: "the request did not complete before its deadline".to_string(),
                }
            } else {
                ErrorInfo {
                    kind: ErrorKind::ToolFailure,
                    user_message: "none of the requested tools completed successfully".to_string(),
                }
            });
        } else if matches!(report.status, PlanStatus::Canceled) {
            result.error = Some(ErrorInfo {
                kind: ErrorKind::Canceled,
                user_message: "the query was canceled".to_string(),
            });
        }

        Ok(result)
    }

    async fn empty_plan_result(
        &self,
        text: &str,
        session_id: &str,
        elapsed: Duration,
        remaining: Duration,
    ) -> QueryResult {
        let fallback_text = if self.config.llm_fallback_enabled {
            match self.language_model.analyze(text, remaining).await {
                Ok(_) => "I couldn't find a tool to help with that request.".to_string(),
                Err(_) => "I couldn't find a tool to help with that request.".to_string(),
            }
        } else {
            "I couldn't find a tool to help with that request.".to_string()
        };

        let mut result = QueryResult::ok(session_id, fallback_text, elapsed.as_millis() as u64);
        result.error = Some(ErrorInfo {
            kind: ErrorKind::EmptyPlan,
            user_message: "no registered tool matches this request".to_string(),
        });
        result
    }
}

fn deterministic_fallback_text(outcomes: &[orchestra_core::StepOutcome]) -> String {
    let mut parts: Vec<String> = Vec::new();
    for outcome in outcomes {
        if let Some(output) = &outcome.output {
            if let Some(text) = &output.text {
                parts.push(text.clone());
            }
        }
    }
    if parts.is_empty() {
        "No results were produced for this query.".to_string()
    } else {
        parts.join("\n\n")
    }
}
