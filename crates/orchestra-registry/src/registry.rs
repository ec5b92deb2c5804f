//! The tool catalog itself.
//!
//! Concurrency: single writer, many readers via `std::sync::RwLock`. A
//! flat name->tool map plus three secondary indices (category, capability,
//! keyword), kept coherent under one lock so readers never observe a torn
//! view.

use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::RwLock;

use orchestra_core::{Context, ToolDefinition, ToolHandle, ToolStats};

use crate::criteria::FindCriteria;
use crate::error::RegistryError;
use crate::scoring::recommend_score;
use crate::snapshot::{RegistrySnapshot, ToolSnapshotEntry};

struct ToolEntry {
    definition: ToolDefinition,
    handle: Option<ToolHandle>,
    stats: ToolStats,
}

#[derive(Default)]
struct Indices {
    by_name: HashMap<String, String>,
    by_category: HashMap<String, HashSet<String>>,
    by_capability: HashMap<String, HashSet<String>>,
    by_keyword: HashMap<String, HashSet<String>>,
}

impl Indices {
    fn insert(&mut self, def: &ToolDefinition) {
        self.by_name.insert(def.name.to_lowercase(), def.id.clone());
        if let Some(cat) = &def.category {
            self.by_category
                .entry(cat.to_lowercase())
                .or_default()
                .insert(def.id.clone());
        }
        for cap in &def.capability_tags {
            self.by_capability
                .entry(cap.to_lowercase())
                .or_default()
                .insert(def.id.clone());
        }
        for kw in &def.keyword_tags {
            self.by_keyword
                .entry(kw.to_lowercase())
                .or_default()
                .insert(def.id.clone());
        }
    }

    fn remove(&mut self, def: &ToolDefinition) {
        self.by_name.remove(&def.name.to_lowercase());
        if let Some(cat) = &def.category {
            if let Some(set) = self.by_category.get_mut(&cat.to_lowercase()) {
                set.remove(&def.id);
            }
        }
        for cap in &def.capability_tags {
            if let Some(set) = self.by_capability.get_mut(&cap.to_lowercase()) {
                set.remove(&def.id);
            }
        }
        for kw in &def.keyword_tags {
            if let Some(set) = self.by_keyword.get_mut(&kw.to_lowercase()) {
                set.remove(&def.id);
            }
        }
    }
}

#[derive(Default)]
struct Inner {
    tools: HashMap<String, ToolEntry>,
    indices: Indices,
}

/// The tool catalog. Wrapping it in an `Arc` is the caller's job — this
/// type is normally held behind an `Arc` by the orchestrator façade.
pub struct ToolRegistry {
    inner: RwLock<Inner>,
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(Inner::default()),
        }
    }

    /// Validates required fields, assigns an id if absent, and inserts into
    /// the primary map and every secondary index atomically under the one
    /// write lock. Fails on missing required fields or a case-insensitive
    /// name collision.
    pub fn register(
        &self,
        mut definition: ToolDefinition,
        handle: ToolHandle,
    ) -> Result<String, RegistryError> {
        if definition.name.trim().is_empty() {
            return Err(RegistryError::ValidationFailed("name".to_string()));
        }
        if definition.id.trim().is_empty() {
            definition.id = uuid::Uuid::new_v4().to_string();
        }

        let mut inner = self.inner.write().expect("registry lock poisoned");
        let lower_name = definition.name.to_lowercase();
        if inner.indices.by_name.contains_key(&lower_name) {
            return Err(RegistryError::NameCollision(definition.name));
        }

        inner.indices.insert(&definition);
        let id = definition.id.clone();
        inner.tools.insert(
            id.clone(),
            ToolEntry {
                definition,
                handle: Some(handle),
                stats: ToolStats::default(),
            },
        );
        Ok(id)
    }

    /// Removes from the primary map and every index. Accepts either a tool
    /// id or a name (case-insensitive). Returns `false` if unknown.
    pub fn unregister(&self, id_or_name: &str) -> bool {
        let mut inner = self.inner.write().expect("registry lock poisoned");
        let id = inner
            .tools
            .contains_key(id_or_name)
            .then(|| id_or_name.to_string())
            .or_else(|| inner.indices.by_name.get(&id_or_name.to_lowercase()).cloned());

        let Some(id) = id else {
            return false;
        };

        if let Some(entry) = inner.tools.remove(&id) {
            inner.indices.remove(&entry.definition);
            true
        } else {
            false
        }
    }

    /// Set intersection across every supplied criterion; an absent
    /// criterion does not filter.
    pub fn find(&self, criteria: &FindCriteria) -> Vec<ToolDefinition> {
        let inner = self.inner.read().expect("registry lock poisoned");

        if criteria.is_empty() {
            return inner.tools.values().map(|e| e.definition.clone()).collect();
        }

        let mut candidate_sets: Vec<HashSet<String>> = Vec::new();

        if let Some(cat) = &criteria.category {
            candidate_sets.push(
                inner
                    .indices
                    .by_category
                    .get(&cat.to_lowercase())
                    .cloned()
                    .unwrap_or_default(),
            );
        }
        if let Some(cap) = &criteria.capability {
            candidate_sets.push(
                inner
                    .indices
                    .by_capability
                    .get(&cap.to_lowercase())
                    .cloned()
                    .unwrap_or_default(),
            );
        }
        for kw in &criteria.keywords {
            candidate_sets.push(
                inner
                    .indices
                    .by_keyword
                    .get(&kw.to_lowercase())
                    .cloned()
                    .unwrap_or_default(),
            );
        }
        if let Some(input_type) = &criteria.input_type {
            let set: HashSet<String> = inner
                .tools
                .values()
                .filter(|e| e.definition.input_types.iter().any(|t| t == input_type))
                .map(|e| e.definition.id.clone())
                .collect();
            candidate_sets.push(set);
        }
        if let Some(output_type) = &criteria.output_type {
            let set: HashSet<String> = inner
                .tools
                .values()
                .filter(|e| e.definition.output_types.iter().any(|t| t == output_type))
                .map(|e| e.definition.id.clone())
                .collect();
            candidate_sets.push(set);
        }

        let mut iter = candidate_sets.into_iter();
        let mut result = iter.next().unwrap_or_default();
        for set in iter {
            result = result.intersection(&set).cloned().collect();
        }

        let mut out: Vec<ToolDefinition> = result
            .iter()
            .filter_map(|id| inner.tools.get(id).map(|e| e.definition.clone()))
            .collect();
        out.sort_by(|a, b| a.name.cmp(&b.name));
        out
    }

    /// Scores every tool against `query`, sorts descending (ties broken by
    /// success rate then lexicographic name), and drops zero-score tools.
    /// `context` is accepted for interface parity with callers that track
    /// per-session state, but scoring here is purely query text and
    /// telemetry — no per-session weighting is applied.
    pub fn recommend(&self, query: &str, _context: Option<&Context>) -> Vec<ToolDefinition> {
        let inner = self.inner.read().expect("registry lock poisoned");
        let query_folded = query.to_lowercase();

        let mut scored: Vec<(f64, f64, ToolDefinition)> = inner
            .tools
            .values()
            .filter_map(|entry| {
                let score = recommend_score(&entry.definition, &entry.stats, &query_folded);
                if score <= 0.0 {
                    None
                } else {
                    Some((score, entry.stats.success_rate(), entry.definition.clone()))
                }
            })
            .collect();

        scored.sort_by(|a, b| {
            b.0.partial_cmp(&a.0)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal))
                .then_with(|| a.2.name.cmp(&b.2.name))
        });

        scored.into_iter().map(|(_, _, def)| def).collect()
    }

    /// Atomic telemetry update. `ewma_new = (prior*n + dur) / (n+1)`.
    pub fn record_usage(&self, id: &str, success: bool, duration_ms: u64) -> Result<(), RegistryError> {
        let mut inner = self.inner.write().expect("registry lock poisoned");
        let entry = inner
            .tools
            .get_mut(id)
            .ok_or_else(|| RegistryError::NotFound(id.to_string()))?;
        entry.stats.record(success, duration_ms);
        Ok(())
    }

    pub fn get(&self, id: &str) -> Option<ToolDefinition> {
        let inner = self.inner.read().expect("registry lock poisoned");
        inner.tools.get(id).map(|e| e.definition.clone())
    }

    pub fn get_handle(&self, id: &str) -> Option<ToolHandle> {
        let inner = self.inner.read().expect("registry lock poisoned");
        inner.tools.get(id).and_then(|e| e.handle.clone())
    }

    pub fn resolve_name(&self, name: &str) -> Option<String> {
        let inner = self.inner.read().expect("registry lock poisoned");
        inner.indices.by_name.get(&name.to_lowercase()).cloned()
    }

    pub fn stats(&self, id: &str) -> Option<ToolStats> {
        let inner = self.inner.read().expect("registry lock poisoned");
        inner.tools.get(id).map(|e| e.stats.clone())
    }

    pub fn len(&self) -> usize {
        self.inner.read().expect("registry lock poisoned").tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Serializable form; `execute` handles are excluded.
    pub fn export(&self) -> RegistrySnapshot {
        let inner = self.inner.read().expect("registry lock poisoned");
        RegistrySnapshot {
            tools: inner
                .tools
                .values()
                .map(|e| ToolSnapshotEntry {
                    definition: e.definition.clone(),
                    stats: e.stats.clone(),
                })
                .collect(),
        }
    }

    /// Re-binds handles by name against a caller-provided handler table.
    /// A definition whose name has no entry in `handlers` is skipped with a
    /// warning rather than failing the whole import, since a partially
    /// stale handler table is a normal deployment scenario (rolling tool
    /// upgrades).
    pub fn import(&self, snapshot: RegistrySnapshot, handlers: &HashMap<String, ToolHandle>) {
        let mut inner = self.inner.write().expect("registry lock poisoned");
        *inner = Inner::default();

        for entry in snapshot.tools {
            let Some(handle) = handlers.get(&entry.definition.name).cloned() else {
                tracing::warn!(tool = %entry.definition.name, "no handler bound for imported tool, skipping");
                continue;
            };
            inner.indices.insert(&entry.definition);
            let id = entry.definition.id.clone();
            inner.tools.insert(
                id,
                ToolEntry {
                    definition: entry.definition,
                    handle: Some(handle),
                    stats: entry.stats,
                },
            );
        }
    }

    /// Discovers `*.yaml`/`*.yml` tool definitions under `path`.
    /// Unparseable entries are logged and skipped; returns the count
    /// registered. Each discovered definition must have a matching entry
    /// in `handlers` (keyed by name) or it is skipped.
    pub async fn load_from_directory(
        &self,
        path: &Path,
        handlers: &HashMap<String, ToolHandle>,
    ) -> Result<usize, RegistryError> {
        let mut read_dir = tokio::fs::read_dir(path).await.map_err(|e| RegistryError::LoadFailed {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;

        let mut count = 0;
        while let Some(entry) = read_dir.next_entry().await.map_err(|e| RegistryError::LoadFailed {
            path: path.display().to_string(),
            message: e.to_string(),
        })? {
            let file_path = entry.path();
            let is_yaml = matches!(
                file_path.extension().and_then(|e| e.to_str()),
                Some("yaml") | Some("yml")
            );
            if !is_yaml {
                continue;
            }

            let content = match tokio::fs::read_to_string(&file_path).await {
                Ok(c) => c,
                Err(e) => {
                    tracing::warn!(file = %file_path.display(), error = %e, "skipping unreadable tool definition");
                    continue;
                }
            };

            let definition: ToolDefinition = match serde_yaml::from_str(&content) {
                Ok(d) => d,
                Err(e) => {
                    tracing::warn!(file = %file_path.display(), error = %e, "skipping unparseable tool definition");
                    continue;
                }
            };

            let Some(handle) = handlers.get(&definition.name).cloned() else {
                tracing::warn!(file = %file_path.display(), tool = %definition.name, "no handler bound, skipping");
                continue;
            };

            match self.register(definition, handle) {
                Ok(_) => count += 1,
                Err(e) => tracing::warn!(file = %file_path.display(), error = %e, "skipping invalid tool definition"),
            }
        }

        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use orchestra_core::{StepContext, Tool, ToolInput, ToolOutput};
    use std::sync::Arc;

    struct Echo;

    #[async_trait::async_trait]
    impl Tool for Echo {
        async fn execute(
            &self,
            input: ToolInput,
            _ctx: &StepContext,
        ) -> Result<ToolOutput, orchestra_core::ToolExecutionError> {
            Ok(ToolOutput::text(input.get_str("text").unwrap_or("").to_string()))
        }
    }

    fn echo_def(name: &str) -> ToolDefinition {
        ToolDefinition::builder(name)
            .keyword("echo")
            .category("utility")
            .capability("text")
            .description("repeats the input back to the caller")
            .build()
    }

    #[test]
    fn register_and_find_roundtrip() {
        let registry = ToolRegistry::new();
        registry.register(echo_def("Echo"), Arc::new(Echo)).unwrap();

        assert_eq!(registry.len(), 1);
        let found = registry.find(&FindCriteria {
            category: Some("utility".to_string()),
            ..Default::default()
        });
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].name, "Echo");
    }

    #[test]
    fn find_with_no_criteria_returns_everything() {
        let registry = ToolRegistry::new();
        registry.register(echo_def("Echo"), Arc::new(Echo)).unwrap();
        registry
            .register(echo_def("Fetch"), Arc::new(Echo))
            .unwrap();

        let found = registry.find(&FindCriteria::default());
        assert_eq!(found.len(), registry.len());
    }

    #[test]
    fn case_insensitive_name_collision_is_rejected() {
        let registry = ToolRegistry::new();
        registry.register(echo_def("Echo"), Arc::new(Echo)).unwrap();
        let err = registry.register(echo_def("ECHO"), Arc::new(Echo));
        assert!(matches!(err, Err(RegistryError::NameCollision(_))));
    }

    #[test]
    fn unregister_by_name_removes_from_every_index() {
        let registry = ToolRegistry::new();
        registry.register(echo_def("Echo"), Arc::new(Echo)).unwrap();
        assert!(registry.unregister("echo"));
        assert_eq!(registry.len(), 0);
        assert!(registry.find(&FindCriteria {
            category: Some("utility".to_string()),
            ..Default::default()
        }).is_empty());
    }

    #[test]
    fn unregister_unknown_returns_false() {
        let registry = ToolRegistry::new();
        assert!(!registry.unregister("nope"));
    }

    #[test]
    fn recommend_orders_by_score_then_success_rate_then_name() {
        let registry = ToolRegistry::new();
        let id_a = registry.register(echo_def("Echo"), Arc::new(Echo)).unwrap();
        registry.record_usage(&id_a, true, 10).unwrap();

        let found = registry.recommend("please echo hello", None);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].name, "Echo");
    }

    #[test]
    fn recommend_omits_zero_score_tools() {
        let registry = ToolRegistry::new();
        registry.register(echo_def("Echo"), Arc::new(Echo)).unwrap();
        let found = registry.recommend("completely unrelated text", None);
        assert!(found.is_empty());
    }

    #[test]
    fn export_excludes_handles_and_import_rebinds_by_name() {
        let registry = ToolRegistry::new();
        let id = registry.register(echo_def("Echo"), Arc::new(Echo)).unwrap();
        registry.record_usage(&id, true, 42).unwrap();

        let snapshot = registry.export();
        let json = serde_json::to_string(&snapshot).unwrap();
        assert!(!json.contains("execute"));

        let restored = ToolRegistry::new();
        let mut handlers: HashMap<String, ToolHandle> = HashMap::new();
        handlers.insert("Echo".to_string(), Arc::new(Echo));
        restored.import(snapshot, &handlers);

        assert_eq!(restored.len(), 1);
        let stats = restored.stats(&id).unwrap();
        assert_eq!(stats.successes, 1);
    }

    #[tokio::test]
    async fn load_from_directory_skips_unparseable_files_and_counts_valid_ones() {
        let dir = tempfile::tempdir().unwrap();
        tokio::fs::write(
            dir.path().join("echo.yaml"),
            serde_yaml::to_string(&echo_def("Echo")).unwrap(),
        )
        .await
        .unwrap();
        tokio::fs::write(dir.path().join("broken.yaml"), "not: [valid yaml: at all")
            .await
            .unwrap();
        tokio::fs::write(dir.path().join("notes.txt"), "ignored, wrong extension")
            .await
            .unwrap();

        let registry = ToolRegistry::new();
        let mut handlers: HashMap<String, ToolHandle> = HashMap::new();
        handlers.insert("Echo".to_string(), Arc::new(Echo));

        let count = registry
            .load_from_directory(dir.path(), &handlers)
            .await
            .unwrap();
        assert_eq!(count, 1);
        assert_eq!(registry.len(), 1);
    }
}
