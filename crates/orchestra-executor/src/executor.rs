//! Scheduling model: a bounded-parallelism ready/in-flight/blocked queue
//! over a [`Plan`]'s dependency graph.

use std::collections::{HashMap, HashSet};
use std::time::Duration;

use futures::future::BoxFuture;
use futures::stream::FuturesUnordered;
use futures::StreamExt;
use orchestra_core::{Plan, ProgressEvent, StepOutcome, StepStatus};
use orchestra_registry::ToolRegistry;
use tokio::sync::mpsc;

use crate::cancellation::CancellationToken;
use crate::error::ExecutorError;
use crate::step::{run_step, StepRunInput};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlanStatus {
    Succeeded,
    Failed,
    Canceled,
}

pub struct ExecutionReport {
    pub plan_id: String,
    pub status: PlanStatus,
    pub outcomes: HashMap<String, StepOutcome>,
}

#[derive(Debug, Clone)]
pub struct ExecutorConfig {
    /// Max steps in-flight at once.
    pub parallelism: usize,
    pub plan_deadline: Duration,
    /// Bounded grace window the executor waits for in-flight tools to
    /// unwind after cancellation (default 2 s).
    pub cancellation_grace: Duration,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            parallelism: 4,
            plan_deadline: Duration::from_secs(120),
            cancellation_grace: Duration::from_secs(2),
        }
    }
}

pub struct Executor {
    config: ExecutorConfig,
}

impl Executor {
    pub fn new(config: ExecutorConfig) -> Self {
        Self { config }
    }

    #[tracing::instrument(skip(self, plan, registry, progress_tx, cancel), fields(plan_id = %plan.id))]
    pub async fn run_plan(
        &self,
        plan: &Plan,
        registry: &ToolRegistry,
        progress_tx: Option<mpsc::Sender<ProgressEvent>>,
        cancel: CancellationToken,
    ) -> Result<ExecutionReport, ExecutorError> {
        if !plan.dependencies_resolve() || plan.topological_order().is_none() {
            return Err(ExecutorError::MalformedPlan(plan.id.clone()));
        }

        let deadline = self.config.plan_deadline.min(plan.deadline);
        let started = std::time::Instant::now();

        let mut remaining_deps: HashMap<String, HashSet<String>> = plan
            .steps
            .iter()
            .map(|s| (s.id.clone(), s.dependencies.iter().cloned().collect()))
            .collect();
        let mut dependents: HashMap<String, Vec<String>> = HashMap::new();
        for step in &plan.steps {
            for dep in &step.dependencies {
                dependents.entry(dep.clone()).or_default().push(step.id.clone());
            }
        }

        let mut outcomes: HashMap<String, StepOutcome> = plan
            .steps
            .iter()
            .map(|s| (s.id.clone(), StepOutcome::pending(s.id.clone())))
            .collect();

        let mut ready: Vec<String> = remaining_deps
            .iter()
            .filter(|(_, deps)| deps.is_empty())
            .map(|(id, _)| id.clone())
            .collect();
        ready.sort();

        let mut seq: u64 = 0;
        let mut in_flight: FuturesUnordered<BoxFuture<'_, StepOutcome>> = FuturesUnordered::new();
        let mut canceled = false;

        loop {
            while in_flight.len() < self.config.parallelism && !ready.is_empty() {
                let step_id = ready.remove(0);
                let step = plan.step(&step_id).expect("ready step exists in plan");
                let prior_outputs = step
                    .dependencies
                    .iter()
                    .filter_map(|dep| {
                        outcomes
                            .get(dep)
                            .and_then(|o| o.output.clone())
                            .map(|out| (dep.clone(), out))
                    })
                    .collect();

                let remaining = deadline.saturating_sub(started.elapsed());
                let step_deadline = step.timeout.min(remaining);

                if let Some(outcome) = outcomes.get_mut(&step_id) {
                    outcome.mark_running();
                }
                publish(&progress_tx, &mut seq, &step_id, StepStatus::Running, 0);

                let cancel_ref = &cancel;
                let fut: BoxFuture<'_, StepOutcome> = Box::pin(run_step(
                    registry,
                    StepRunInput {
                        plan_id: &plan.id,
                        step,
                        deadline: step_deadline,
                        prior_outputs,
                    },
                    cancel_ref,
                ));
                in_flight.push(fut);
            }

            if in_flight.is_empty() {
                break;
            }

            tokio::select! {
                outcome = in_flight.next() => {
                    let Some(outcome) = outcome else { break };
                    let step_id = outcome.step_id.clone();
                    publish(&progress_tx, &mut seq, &step_id, outcome.status, outcome.elapsed.as_millis() as u64);

                    let succeeded = outcome.status.is_success();
                    outcomes.insert(step_id.clone(), outcome);

                    if succeeded {
                        if let Some(deps) = dependents.get(&step_id) {
                            for dependent in deps {
                                if let Some(set) = remaining_deps.get_mut(dependent) {
                                    set.remove(&step_id);
                                    if set.is_empty() {
                                        ready.push(dependent.clone());
                                    }
                                }
                            }
                            ready.sort();
                        }
                    } else {
                        cascade_skip(&step_id, &dependents, &mut outcomes, &mut remaining_deps, &progress_tx, &mut seq);
                    }
                }
                _ = cancel.canceled(), if !canceled => {
                    canceled = true;
                    skip_pending(&ready, &remaining_deps, &mut outcomes, &progress_tx, &mut seq);
                    ready.clear();
                }
            }

            if canceled {
                let grace = self.config.cancellation_grace;
                let _ = tokio::time::timeout(grace, async {
                    while in_flight.next().await.is_some() {}
                })
                .await;
                // Anything still unresolved after the grace window is
                // abandoned; its outcome stays whatever it last was
                // (Running), which `plan_status` treats as not-succeeded.
                break;
            }
        }

        let status = if canceled {
            PlanStatus::Canceled
        } else {
            plan_status(plan, &outcomes)
        };

        Ok(ExecutionReport {
            plan_id: plan.id.clone(),
            status,
            outcomes,
        })
    }
}

fn plan_status(plan: &Plan, outcomes: &HashMap<String, StepOutcome>) -> PlanStatus {
    let any_succeeded = outcomes.values().any(|o| o.status.is_success());
    let critical_failed = plan.steps.iter().any(|s| {
        s.critical
            && outcomes
                .get(&s.id)
                .map(|o| !o.status.is_success())
                .unwrap_or(true)
    });
    if any_succeeded && !critical_failed {
        PlanStatus::Succeeded
    } else {
        PlanStatus::Failed
    }
}

fn cascade_skip(
    failed_step: &str,
    dependents: &HashMap<String, Vec<String>>,
    outcomes: &mut HashMap<String, StepOutcome>,
    remaining_deps: &mut HashMap<String, HashSet<String>>,
    progress_tx: &Option<mpsc::Sender<ProgressEvent>>,
    seq: &mut u64,
) {
    let mut stack = vec![failed_step.to_string()];
    while let Some(id) = stack.pop() {
        let Some(children) = dependents.get(&id) else { continue };
        for child in children {
            remaining_deps.remove(child);
            if let Some(outcome) = outcomes.get_mut(child) {
                if !outcome.status.is_terminal() {
                    outcome.mark_skipped(format!("dependency {id} did not succeed"));
                    publish(progress_tx, seq, child, StepStatus::Skipped, 0);
                    stack.push(child.clone());
                }
            }
        }
    }
}

fn skip_pending(
    ready: &[String],
    remaining_deps: &HashMap<String, HashSet<String>>,
    outcomes: &mut HashMap<String, StepOutcome>,
    progress_tx: &Option<mpsc::Sender<ProgressEvent>>,
    seq: &mut u64,
) {
    let pending_ids: Vec<String> = ready
        .iter()
        .cloned()
        .chain(remaining_deps.keys().cloned())
        .collect();
    for id in pending_ids {
        if let Some(outcome) = outcomes.get_mut(&id) {
            if !outcome.status.is_terminal() {
                outcome.mark_skipped("canceled");
                publish(progress_tx, seq, &id, StepStatus::Skipped, 0);
            }
        }
    }
}

fn publish(
    progress_tx: &Option<mpsc::Sender<ProgressEvent>>,
    seq: &mut u64,
    step_id: &str,
    state: StepStatus,
    elapsed_ms: u64,
) {
    let Some(tx) = progress_tx else { return };
    *seq += 1;
    let event = ProgressEvent {
        seq: *seq,
        step_id: step_id.to_string(),
        state,
        partial_output: None,
        elapsed_ms,
    };
    // Non-blocking: a slow consumer drops events rather than stalling
    // execution.
    let _ = tx.try_send(event);
}
