//! Normalized query meaning, produced once per query by the analysis step
//! and consumed by the planner.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Intent {
    pub primary: String,
    #[serde(default)]
    pub secondary: Vec<String>,
    pub confidence: f32,
    /// Set when the query carries multiple imperative clauses ("and then",
    /// multiple verbs) — drives the planner's decomposition step.
    #[serde(default)]
    pub compound: bool,
}

impl Intent {
    /// The trivial intent constructed when the analysis collaborator fails.
    pub fn unknown() -> Self {
        Self {
            primary: "unknown".to_string(),
            secondary: Vec::new(),
            confidence: 0.0,
            compound: false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EntityKind {
    Person,
    Place,
    Organization,
    DateTime,
    Url,
    Quantity,
    Other,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Entity {
    pub kind: EntityKind,
    pub surface_text: String,
    /// Byte-offset span into the original query text.
    pub span: (usize, usize),
    pub resolved_value: Option<serde_json::Value>,
}
