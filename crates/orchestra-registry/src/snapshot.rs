use serde::{Deserialize, Serialize};

use orchestra_core::{ToolDefinition, ToolStats};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolSnapshotEntry {
    pub definition: ToolDefinition,
    pub stats: ToolStats,
}

/// Serializable registry snapshot. `execute` handles are deliberately
/// absent — callers re-bind them by name against a handler table on
/// import.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct RegistrySnapshot {
    pub tools: Vec<ToolSnapshotEntry>,
}
