//! `OrchestratorConfig` — every engine tunable, loaded by layering
//! defaults, a file, then env overrides (prefix `ORCHESTRA_`).

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

fn default_parallelism() -> usize {
    4
}
fn default_step_timeout_secs() -> u64 {
    30
}
fn default_plan_timeout_secs() -> u64 {
    120
}
fn default_query_timeout_secs() -> u64 {
    150
}
fn default_session_idle_ttl_secs() -> i64 {
    30 * 60
}
fn default_session_sweep_interval_secs() -> u64 {
    15 * 60
}
fn default_max_queued_queries_per_session() -> usize {
    4
}
fn default_candidate_top_k() -> usize {
    8
}
fn default_retry_budget_per_step() -> usize {
    2
}
fn default_cancellation_grace_secs() -> u64 {
    2
}
fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OrchestratorConfig {
    #[serde(default = "default_parallelism")]
    pub parallelism: usize,
    #[serde(default = "default_step_timeout_secs")]
    pub step_timeout_secs: u64,
    #[serde(default = "default_plan_timeout_secs")]
    pub plan_timeout_secs: u64,
    #[serde(default = "default_query_timeout_secs")]
    pub query_timeout_secs: u64,
    #[serde(default = "default_session_idle_ttl_secs")]
    pub session_idle_ttl_secs: i64,
    #[serde(default = "default_session_sweep_interval_secs")]
    pub session_sweep_interval_secs: u64,
    #[serde(default = "default_max_queued_queries_per_session")]
    pub max_queued_queries_per_session: usize,
    #[serde(default = "default_candidate_top_k")]
    pub candidate_top_k: usize,
    #[serde(default = "default_retry_budget_per_step")]
    pub retry_budget_per_step: usize,
    #[serde(default = "default_cancellation_grace_secs")]
    pub cancellation_grace_secs: u64,
    #[serde(default = "default_true")]
    pub enable_tool_learning: bool,
    #[serde(default = "default_true")]
    pub llm_fallback_enabled: bool,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            parallelism: default_parallelism(),
            step_timeout_secs: default_step_timeout_secs(),
            plan_timeout_secs: default_plan_timeout_secs(),
            query_timeout_secs: default_query_timeout_secs(),
            session_idle_ttl_secs: default_session_idle_ttl_secs(),
            session_sweep_interval_secs: default_session_sweep_interval_secs(),
            max_queued_queries_per_session: default_max_queued_queries_per_session(),
            candidate_top_k: default_candidate_top_k(),
            retry_budget_per_step: default_retry_budget_per_step(),
            cancellation_grace_secs: default_cancellation_grace_secs(),
            enable_tool_learning: default_true(),
            llm_fallback_enabled: default_true(),
        }
    }
}

impl OrchestratorConfig {
    /// Loads TOML or YAML by extension, layered over the defaults, then
    /// applies `ORCHESTRA_`-prefixed environment overrides. Falls back to
    /// [`OrchestratorConfig::default`] when `path` is `None`.
    pub fn from_file(path: Option<&Path>) -> Result<Self, config::ConfigError> {
        let mut builder = config::Config::builder()
            .add_source(config::Config::try_from(&OrchestratorConfig::default())?);

        if let Some(path) = path {
            builder = builder.add_source(config::File::from(path));
        }

        builder = builder.add_source(config::Environment::with_prefix("ORCHESTRA"));
        builder.build()?.try_deserialize()
    }

    pub fn step_timeout(&self) -> Duration {
        Duration::from_secs(self.step_timeout_secs)
    }

    pub fn plan_timeout(&self) -> Duration {
        Duration::from_secs(self.plan_timeout_secs)
    }

    pub fn query_timeout(&self) -> Duration {
        Duration::from_secs(self.query_timeout_secs)
    }

    pub fn session_idle_ttl(&self) -> chrono::Duration {
        chrono::Duration::seconds(self.session_idle_ttl_secs)
    }

    pub fn session_sweep_interval(&self) -> Duration {
        Duration::from_secs(self.session_sweep_interval_secs)
    }

    pub fn cancellation_grace(&self) -> Duration {
        Duration::from_secs(self.cancellation_grace_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_spec() {
        let cfg = OrchestratorConfig::default();
        assert_eq!(cfg.parallelism, 4);
        assert_eq!(cfg.step_timeout_secs, 30);
        assert_eq!(cfg.plan_timeout_secs, 120);
        assert_eq!(cfg.query_timeout_secs, 150);
        assert_eq!(cfg.max_queued_queries_per_session, 4);
        assert_eq!(cfg.candidate_top_k, 8);
        assert_eq!(cfg.retry_budget_per_step, 2);
        assert!(cfg.enable_tool_learning);
        assert!(cfg.llm_fallback_enabled);
    }

    #[test]
    fn from_file_falls_back_to_defaults_when_no_path_given() {
        let cfg = OrchestratorConfig::from_file(None).unwrap();
        assert_eq!(cfg.parallelism, OrchestratorConfig::default().parallelism);
    }
}
