//! The execution DAG: `Plan` and `PlanStep`.
//!
//! Plans are immutable once the executor starts: step *outcomes* live in
//! a parallel structure (see [`crate::outcome`]) keyed by step id, never
//! mutated in place here.

use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::time::Duration;

use crate::retry::RetryConfig;

/// One node in the execution DAG.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlanStep {
    pub id: String,
    pub tool_id: String,
    /// Input template; values are resolved against dependency outputs and
    /// the query/entities/scratch values at execution time.
    pub input_template: serde_json::Value,
    /// Step ids this step depends on. Must all resolve within the same plan.
    pub dependencies: Vec<String>,
    pub timeout: Duration,
    pub retry: RetryConfig,
    /// Up to two alternate tools tried, in order, after the retry budget on
    /// the primary tool is exhausted.
    #[serde(default)]
    pub fallback_tool_ids: Vec<String>,
    /// Failure of a critical step classifies the whole plan as failed.
    /// Defaults to true for leaf steps feeding the synthesizer; the
    /// planner sets this explicitly per step.
    #[serde(default)]
    pub critical: bool,
}

impl PlanStep {
    pub fn new(id: impl Into<String>, tool_id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            tool_id: tool_id.into(),
            input_template: serde_json::Value::Null,
            dependencies: Vec::new(),
            timeout: Duration::from_secs(30),
            retry: RetryConfig::default(),
            fallback_tool_ids: Vec::new(),
            critical: false,
        }
    }

    pub fn depends_on(mut self, step_id: impl Into<String>) -> Self {
        self.dependencies.push(step_id.into());
        self
    }

    pub fn with_input(mut self, input: serde_json::Value) -> Self {
        self.input_template = input;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn critical(mut self, critical: bool) -> Self {
        self.critical = critical;
        self
    }

    pub fn with_fallback(mut self, tool_id: impl Into<String>) -> Self {
        if self.fallback_tool_ids.len() < 2 {
            self.fallback_tool_ids.push(tool_id.into());
        }
        self
    }
}

/// A dependency-ordered collection of [`PlanStep`]s produced per query.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Plan {
    pub id: String,
    pub query: String,
    /// Insertion-ordered.
    pub steps: Vec<PlanStep>,
    pub estimated_completion: Duration,
    pub deadline: Duration,
}

impl Plan {
    pub fn new(id: impl Into<String>, query: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            query: query.into(),
            steps: Vec::new(),
            estimated_completion: Duration::ZERO,
            deadline: Duration::from_secs(120),
        }
    }

    pub fn step(&self, id: &str) -> Option<&PlanStep> {
        self.steps.iter().find(|s| s.id == id)
    }

    /// Returns a topological ordering of step ids, or `None` if the
    /// dependency graph contains a cycle.
    pub fn topological_order(&self) -> Option<Vec<String>> {
        let mut in_degree: HashMap<&str, usize> =
            self.steps.iter().map(|s| (s.id.as_str(), 0)).collect();
        let mut dependents: HashMap<&str, Vec<&str>> = HashMap::new();

        for step in &self.steps {
            for dep in &step.dependencies {
                *in_degree.entry(step.id.as_str()).or_insert(0) += 1;
                dependents
                    .entry(dep.as_str())
                    .or_default()
                    .push(step.id.as_str());
            }
        }

        let mut ready: Vec<&str> = in_degree
            .iter()
            .filter(|(_, deg)| **deg == 0)
            .map(|(id, _)| *id)
            .collect();
        ready.sort();

        let mut order = Vec::with_capacity(self.steps.len());
        let mut queue = std::collections::VecDeque::from(ready.clone());

        while let Some(id) = queue.pop_front() {
            order.push(id.to_string());
            if let Some(next) = dependents.get(id) {
                let mut unlocked: Vec<&str> = Vec::new();
                for dep_id in next {
                    let deg = in_degree.get_mut(dep_id).unwrap();
                    *deg -= 1;
                    if *deg == 0 {
                        unlocked.push(dep_id);
                    }
                }
                unlocked.sort();
                for u in unlocked {
                    queue.push_back(u);
                }
            }
        }

        if order.len() == self.steps.len() {
            Some(order)
        } else {
            None
        }
    }

    pub fn is_acyclic(&self) -> bool {
        self.topological_order().is_some()
    }

    /// All step ids referenced anywhere as a dependency are present in this
    /// plan.
    pub fn dependencies_resolve(&self) -> bool {
        let ids: HashSet<&str> = self.steps.iter().map(|s| s.id.as_str()).collect();
        self.steps
            .iter()
            .flat_map(|s| s.dependencies.iter())
            .all(|dep| ids.contains(dep.as_str()))
    }
}
