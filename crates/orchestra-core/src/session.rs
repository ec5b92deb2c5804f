//! Session-scoped state (`Context`).
//!
//! Generalized from a flat message list to a richer turn/intent/scratch
//! shape; on-disk persistence is delegated to the `PersistenceCollaborator`
//! boundary owned by `orchestra-context`.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::intent::{Entity, Intent};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Role {
    User,
    Assistant,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Turn {
    pub role: Role,
    pub content: String,
    #[serde(default)]
    pub tools_used: Vec<String>,
    pub ts: chrono::DateTime<chrono::Utc>,
}

impl Turn {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
            tools_used: Vec::new(),
            ts: chrono::Utc::now(),
        }
    }

    pub fn assistant(content: impl Into<String>, tools_used: Vec<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
            tools_used,
            ts: chrono::Utc::now(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Context {
    pub id: String,
    pub user_id: Option<String>,
    /// Alternates user/assistant; the last turn is always user-terminated
    /// before planning begins.
    pub turns: Vec<Turn>,
    pub current_intent: Option<Intent>,
    #[serde(default)]
    pub current_entities: Vec<Entity>,
    pub last_execution_summary: Option<String>,
    pub last_updated: chrono::DateTime<chrono::Utc>,
    #[serde(default)]
    pub scratch: HashMap<String, serde_json::Value>,
}

impl Context {
    pub fn new(id: impl Into<String>, user_id: Option<String>) -> Self {
        Self {
            id: id.into(),
            user_id,
            turns: Vec::new(),
            current_intent: None,
            current_entities: Vec::new(),
            last_execution_summary: None,
            last_updated: chrono::Utc::now(),
            scratch: HashMap::new(),
        }
    }

    pub fn append_turn(&mut self, turn: Turn) {
        self.turns.push(turn);
        self.last_updated = chrono::Utc::now();
    }

    /// "Clear history but keep session": resets turn history and scratch
    /// values, leaving id/user_id intact. Registry telemetry is untouched
    /// (see DESIGN.md's Open Question decisions).
    pub fn clear_turns(&mut self) {
        self.turns.clear();
        self.scratch.clear();
        self.current_intent = None;
        self.current_entities.clear();
        self.last_updated = chrono::Utc::now();
    }

    pub fn idle_for(&self, now: chrono::DateTime<chrono::Utc>) -> chrono::Duration {
        now - self.last_updated
    }

    /// Invariant check used by tests: turns alternate strictly
    /// user -> assistant -> user -> ...
    pub fn turns_alternate(&self) -> bool {
        self.turns
            .windows(2)
            .all(|w| w[0].role != w[1].role)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn turns_alternate_detects_violation() {
        let mut ctx = Context::new("s1", None);
        ctx.append_turn(Turn::user("hi"));
        ctx.append_turn(Turn::user("hi again"));
        assert!(!ctx.turns_alternate());
    }

    #[test]
    fn turns_alternate_holds_for_well_formed_history() {
        let mut ctx = Context::new("s1", None);
        ctx.append_turn(Turn::user("hi"));
        ctx.append_turn(Turn::assistant("hello", vec![]));
        ctx.append_turn(Turn::user("bye"));
        assert!(ctx.turns_alternate());
    }

    #[test]
    fn clear_turns_resets_history_but_keeps_id() {
        let mut ctx = Context::new("s1", Some("u1".to_string()));
        ctx.append_turn(Turn::user("hi"));
        ctx.scratch.insert("k".to_string(), serde_json::json!(1));
        ctx.clear_turns();
        assert!(ctx.turns.is_empty());
        assert!(ctx.scratch.is_empty());
        assert_eq!(ctx.id, "s1");
        assert_eq!(ctx.user_id.as_deref(), Some("u1"));
    }
}
