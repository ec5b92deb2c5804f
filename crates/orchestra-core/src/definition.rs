//! Declarative tool metadata and rolling telemetry.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// A named, versioned capability. Immutable once registered — see
/// `orchestra-registry` for the mutation operations (`register`,
/// `unregister`) that produce and remove these.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolDefinition {
    /// Stable identifier. Assigned by the registry if absent at registration.
    pub id: String,
    /// Display name. Resolves case-insensitively and uniquely to one id.
    pub name: String,
    pub category: Option<String>,
    pub version: String,
    pub input_types: Vec<String>,
    pub output_types: Vec<String>,
    pub capability_tags: HashSet<String>,
    pub keyword_tags: HashSet<String>,
    pub description: String,
}

impl ToolDefinition {
    pub fn builder(name: impl Into<String>) -> ToolDefinitionBuilder {
        ToolDefinitionBuilder::new(name)
    }
}

/// Convenience builder; fluent `with_*`-style construction matching
/// `PlanStep`'s own builder methods (`depends_on`, `with_fallback`).
pub struct ToolDefinitionBuilder {
    id: Option<String>,
    name: String,
    category: Option<String>,
    version: String,
    input_types: Vec<String>,
    output_types: Vec<String>,
    capability_tags: HashSet<String>,
    keyword_tags: HashSet<String>,
    description: String,
}

impl ToolDefinitionBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: None,
            name: name.into(),
            category: None,
            version: "0.1.0".to_string(),
            input_types: Vec::new(),
            output_types: Vec::new(),
            capability_tags: HashSet::new(),
            keyword_tags: HashSet::new(),
            description: String::new(),
        }
    }

    pub fn id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    pub fn version(mut self, version: impl Into<String>) -> Self {
        self.version = version.into();
        self
    }

    pub fn input_type(mut self, t: impl Into<String>) -> Self {
        self.input_types.push(t.into());
        self
    }

    pub fn output_type(mut self, t: impl Into<String>) -> Self {
        self.output_types.push(t.into());
        self
    }

    pub fn capability(mut self, tag: impl Into<String>) -> Self {
        self.capability_tags.insert(tag.into());
        self
    }

    pub fn keyword(mut self, tag: impl Into<String>) -> Self {
        self.keyword_tags.insert(tag.into());
        self
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn build(self) -> ToolDefinition {
        ToolDefinition {
            id: self.id.unwrap_or_else(|| uuid::Uuid::new_v4().to_string()),
            name: self.name,
            category: self.category,
            version: self.version,
            input_types: self.input_types,
            output_types: self.output_types,
            capability_tags: self.capability_tags,
            keyword_tags: self.keyword_tags,
            description: self.description,
        }
    }
}

/// Rolling per-tool telemetry, updated only by the executor on completion
/// (invariant: `successes + failures == total_invocations` outside an
/// in-flight update).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolStats {
    pub successes: u64,
    pub failures: u64,
    /// Exponentially-weighted moving average execution time, in milliseconds.
    pub ewma_execution_ms: f64,
    pub last_used: Option<chrono::DateTime<chrono::Utc>>,
}

impl Default for ToolStats {
    fn default() -> Self {
        Self {
            successes: 0,
            failures: 0,
            ewma_execution_ms: 0.0,
            last_used: None,
        }
    }
}

impl ToolStats {
    pub fn total_invocations(&self) -> u64 {
        self.successes + self.failures
    }

    /// `successes / max(1, successes + failures)`.
    pub fn success_rate(&self) -> f64 {
        self.successes as f64 / (self.total_invocations().max(1) as f64)
    }

    /// Folds one observation into the telemetry. Both success and failure
    /// durations feed the same EWMA series (see DESIGN.md's Open Question
    /// decisions for why this doesn't split by outcome).
    pub fn record(&mut self, success: bool, duration_ms: u64) {
        let n = self.total_invocations();
        self.ewma_execution_ms = if n == 0 {
            duration_ms as f64
        } else {
            (self.ewma_execution_ms * n as f64 + duration_ms as f64) / (n as f64 + 1.0)
        };
        if success {
            self.successes += 1;
        } else {
            self.failures += 1;
        }
        self.last_used = Some(chrono::Utc::now());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_assigns_uuid_when_id_absent() {
        let def = ToolDefinition::builder("Echo").build();
        assert!(!def.id.is_empty());
        assert_eq!(def.name, "Echo");
    }

    #[test]
    fn stats_invariant_holds_after_each_record() {
        let mut stats = ToolStats::default();
        stats.record(true, 100);
        stats.record(false, 300);
        stats.record(true, 50);
        assert_eq!(stats.successes + stats.failures, stats.total_invocations());
        assert_eq!(stats.total_invocations(), 3);
    }

    #[test]
    fn ewma_matches_closed_form_after_three_observations() {
        let mut stats = ToolStats::default();
        stats.record(true, 100);
        stats.record(true, 200);
        stats.record(true, 300);
        // (((100/1) * 1 + 200)/2 * 2 + 300) / 3 = 200
        assert!((stats.ewma_execution_ms - 200.0).abs() < 1e-9);
    }

    #[test]
    fn success_rate_defaults_to_zero_with_no_invocations() {
        let stats = ToolStats::default();
        assert_eq!(stats.success_rate(), 0.0);
    }
}
