//! The core of the planning algorithm: decompose, bind, wire, prune.

use std::collections::{HashMap, HashSet};
use std::time::Duration;

use orchestra_core::{Context, Entity, Intent, Plan, PlanStep};
use orchestra_registry::ToolRegistry;
use uuid::Uuid;

use crate::decompose::decompose;
use crate::error::PlannerError;

#[derive(Debug, Clone)]
pub struct PlannerConfig {
    /// Top *K* candidates retained per sub-goal (default 8).
    pub candidate_top_k: usize,
    pub default_step_timeout: Duration,
    pub plan_deadline: Duration,
}

impl Default for PlannerConfig {
    fn default() -> Self {
        Self {
            candidate_top_k: 8,
            default_step_timeout: Duration::from_secs(30),
            plan_deadline: Duration::from_secs(120),
        }
    }
}

pub struct Planner {
    config: PlannerConfig,
}

impl Planner {
    pub fn new(config: PlannerConfig) -> Self {
        Self { config }
    }

    /// The initial input types available before any step runs: the raw
    /// query, extracted entities (as `entity/<kind>`), and any context
    /// scratch values (as `scratch/<key>`).
    fn initial_inputs(entities: &[Entity], context: Option<&Context>) -> HashSet<String> {
        let mut inputs = HashSet::new();
        inputs.insert("text/query".to_string());
        for entity in entities {
            inputs.insert(format!("entity/{:?}", entity.kind).to_lowercase());
        }
        if let Some(ctx) = context {
            for key in ctx.scratch.keys() {
                inputs.insert(format!("scratch/{key}"));
            }
        }
        inputs
    }

    #[tracing::instrument(skip(self, registry, context, entities), fields(query = %query))]
    pub fn plan(
        &self,
        query: &str,
        intent: &Intent,
        entities: &[Entity],
        context: Option<&Context>,
        registry: &ToolRegistry,
    ) -> Result<Plan, PlannerError> {
        let sub_goals = decompose(query, intent);
        let initial_inputs = Self::initial_inputs(entities, context);

        let mut plan = Plan::new(Uuid::new_v4().to_string(), query.to_string());
        plan.deadline = self.config.plan_deadline;

        // available_outputs[type] = step id that produces it, used for
        // dependency wiring (step 4).
        let mut available_outputs: HashMap<String, String> = HashMap::new();

        for (idx, sub_goal) in sub_goals.iter().enumerate() {
            let candidates = registry.recommend(sub_goal, context);
            let candidates: Vec<_> = candidates.into_iter().take(self.config.candidate_top_k).collect();

            let Some(primary) = candidates.first() else {
                continue;
            };

            let step_id = format!("step-{idx}-{}", primary.name.to_lowercase().replace(' ', "_"));
            let mut step = PlanStep::new(step_id.clone(), primary.id.clone())
                .with_input(serde_json::json!({ "query": sub_goal }))
                .with_timeout(self.config.default_step_timeout);

            // Step 4: dependency wiring. Any required input type not in the
            // initial set must be produced by another already-selected step.
            for input_type in &primary.input_types {
                if initial_inputs.contains(input_type) {
                    continue;
                }
                if let Some(producer_step) = available_outputs.get(input_type) {
                    if producer_step != &step_id {
                        step = step.depends_on(producer_step.clone());
                    }
                }
            }

            // Step 5: fallbacks — up to two next-scoring candidates whose
            // output types match the primary's.
            for alt in candidates.iter().skip(1) {
                if step.fallback_tool_ids.len() >= 2 {
                    break;
                }
                if alt
                    .output_types
                    .iter()
                    .any(|t| primary.output_types.contains(t))
                {
                    step = step.with_fallback(alt.id.clone());
                }
            }

            for output_type in &primary.output_types {
                available_outputs.insert(output_type.clone(), step_id.clone());
            }

            plan.steps.push(step);
        }

        if plan.steps.is_empty() {
            return Err(PlannerError::EmptyPlan);
        }

        // Reject cyclic plans by dropping the offending dependent step
        // until the graph is acyclic or empty.
        while !plan.is_acyclic() {
            if let Some(offender) = find_cycle_member(&plan) {
                tracing::warn!(step_id = %offender, "dropping step to break dependency cycle");
                plan.steps.retain(|s| s.id != offender);
            } else {
                break;
            }
        }
        if plan.steps.is_empty() {
            return Err(PlannerError::EmptyPlan);
        }

        mark_critical_steps(&mut plan);
        self.estimate_completion(&mut plan, registry);

        Ok(plan)
    }

    /// `estimatedCompletionTime = max over topological layers of sum
    /// EWMA(step)`.
    fn estimate_completion(&self, plan: &mut Plan, registry: &ToolRegistry) {
        let Some(order) = plan.topological_order() else {
            return;
        };

        let mut layer_of: HashMap<String, usize> = HashMap::new();
        for id in &order {
            let step = plan.step(id).expect("topological order only lists plan steps");
            let layer = step
                .dependencies
                .iter()
                .filter_map(|d| layer_of.get(d))
                .max()
                .map(|l| l + 1)
                .unwrap_or(0);
            layer_of.insert(id.clone(), layer);
        }

        let mut per_layer: HashMap<usize, Duration> = HashMap::new();
        for step in &plan.steps {
            let layer = *layer_of.get(&step.id).unwrap_or(&0);
            let ewma_ms = registry
                .stats(&step.tool_id)
                .map(|s| s.ewma_execution_ms)
                .unwrap_or(0.0);
            *per_layer.entry(layer).or_insert(Duration::ZERO) += Duration::from_millis(ewma_ms as u64);
        }

        plan.estimated_completion = per_layer.values().cloned().max().unwrap_or(Duration::ZERO);
    }
}

/// Flags leaf steps (no dependents) as critical: their failure classifies
/// the whole plan as failed by default.
fn mark_critical_steps(plan: &mut Plan) {
    let mut has_dependent: HashSet<String> = HashSet::new();
    for step in &plan.steps {
        for dep in &step.dependencies {
            has_dependent.insert(dep.clone());
        }
    }
    for step in &mut plan.steps {
        step.critical = !has_dependent.contains(&step.id);
    }
}

/// Finds an arbitrary step participating in a cycle via DFS coloring.
fn find_cycle_member(plan: &Plan) -> Option<String> {
    #[derive(Clone, Copy, PartialEq)]
    enum Color {
        White,
        Gray,
        Black,
    }

    let mut color: HashMap<&str, Color> = plan.steps.iter().map(|s| (s.id.as_str(), Color::White)).collect();

    fn visit<'a>(
        id: &'a str,
        plan: &'a Plan,
        color: &mut HashMap<&'a str, Color>,
    ) -> Option<String> {
        color.insert(id, Color::Gray);
        if let Some(step) = plan.step(id) {
            for dep in &step.dependencies {
                match color.get(dep.as_str()) {
                    Some(Color::Gray) => return Some(id.to_string()),
                    Some(Color::White) => {
                        if let Some(found) = visit(dep, plan, color) {
                            return Some(found);
                        }
                    }
                    _ => {}
                }
            }
        }
        color.insert(id, Color::Black);
        None
    }

    for step in &plan.steps {
        if color.get(step.id.as_str()) == Some(&Color::White) {
            if let Some(found) = visit(&step.id, plan, &mut color) {
                return Some(found);
            }
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use orchestra_core::{StepContext, Tool, ToolDefinition, ToolExecutionError, ToolInput, ToolOutput};
    use std::sync::Arc;

    struct Noop;

    #[async_trait::async_trait]
    impl Tool for Noop {
        async fn execute(&self, _input: ToolInput, _ctx: &StepContext) -> Result<ToolOutput, ToolExecutionError> {
            Ok(ToolOutput::text(""))
        }
    }

    fn registry_with(defs: Vec<ToolDefinition>) -> ToolRegistry {
        let registry = ToolRegistry::new();
        for def in defs {
            registry.register(def, Arc::new(Noop)).unwrap();
        }
        registry
    }

    fn fetch_def() -> ToolDefinition {
        ToolDefinition::builder("Fetch")
            .keyword("fetch")
            .keyword("front page")
            .output_type("text/plain")
            .description("fetches a URL and returns its raw text")
            .build()
    }

    fn summarize_def() -> ToolDefinition {
        ToolDefinition::builder("Summarize")
            .keyword("summarize")
            .input_type("text/plain")
            .output_type("text/summary")
            .description("summarizes plain text into a shorter form")
            .build()
    }

    #[test]
    fn single_tool_query_produces_one_step() {
        let registry = registry_with(vec![ToolDefinition::builder("Echo")
            .keyword("echo")
            .description("repeats input back")
            .build()]);
        let planner = Planner::new(PlannerConfig::default());
        let plan = planner
            .plan("please echo hello", &Intent::unknown(), &[], None, &registry)
            .unwrap();
        assert_eq!(plan.steps.len(), 1);
        assert!(plan.steps[0].critical);
    }

    #[test]
    fn two_step_chain_wires_summarize_after_fetch() {
        let registry = registry_with(vec![fetch_def(), summarize_def()]);
        let mut intent = Intent::unknown();
        intent.compound = true;
        let planner = Planner::new(PlannerConfig::default());
        let plan = planner
            .plan(
                "fetch the front page and then summarize it",
                &intent,
                &[],
                None,
                &registry,
            )
            .unwrap();

        assert_eq!(plan.steps.len(), 2);
        let summarize_step = plan
            .steps
            .iter()
            .find(|s| s.tool_id == registry.resolve_name("Summarize").unwrap())
            .unwrap();
        let fetch_id = registry.resolve_name("Fetch").unwrap();
        let fetch_step = plan.steps.iter().find(|s| s.tool_id == fetch_id).unwrap();
        assert!(summarize_step.dependencies.contains(&fetch_step.id));
        assert!(plan.is_acyclic());
    }

    #[test]
    fn empty_plan_error_when_no_candidate_matches() {
        let registry = registry_with(vec![fetch_def()]);
        let planner = Planner::new(PlannerConfig::default());
        let err = planner.plan("tell me a joke", &Intent::unknown(), &[], None, &registry);
        assert!(matches!(err, Err(PlannerError::EmptyPlan)));
    }
}
