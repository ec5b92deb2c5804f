//! Per-session context store with idle eviction.
//!
//! The active-session map is a `DashMap`, which internally shards its
//! buckets for write scalability without hand rolling a shard table.
//! Each session's `Context` is wrapped in its own `tokio::sync::Mutex`
//! so that writers on the same session serialize while different
//! sessions never contend.

use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;

use orchestra_core::{Context, PersistenceCollaborator, Turn};

use crate::error::ContextError;

type SharedContext = Arc<Mutex<Context>>;

pub struct ContextManager {
    sessions: DashMap<String, SharedContext>,
    persistence: Arc<dyn PersistenceCollaborator>,
}

impl ContextManager {
    pub fn new(persistence: Arc<dyn PersistenceCollaborator>) -> Self {
        Self {
            sessions: DashMap::new(),
            persistence,
        }
    }

    /// In-memory lookup; on miss, attempt a persistent load; on miss again,
    /// instantiate a fresh `Context`.
    pub async fn get_or_create(&self, session_id: &str, user_id: Option<String>) -> SharedContext {
        if let Some(existing) = self.sessions.get(session_id) {
            return existing.clone();
        }

        let context = match self.persistence.load_session(session_id).await {
            Ok(Some(loaded)) => loaded,
            Ok(None) => Context::new(session_id, user_id),
            Err(e) => {
                tracing::warn!(session_id, error = %e, "failed to load persisted session, starting fresh");
                Context::new(session_id, user_id)
            }
        };

        let shared = Arc::new(Mutex::new(context));
        // Another task may have raced us to insertion; `entry` resolves that
        // without a torn write.
        let entry = self
            .sessions
            .entry(session_id.to_string())
            .or_insert_with(|| shared.clone());
        entry.clone()
    }

    /// Atomic append; updates `last_updated`.
    pub async fn append_turn(&self, session_id: &str, turn: Turn) -> Result<(), ContextError> {
        let Some(shared) = self.sessions.get(session_id).map(|e| e.clone()) else {
            return Err(ContextError::PersistenceFailed(format!(
                "no active context for session {session_id}"
            )));
        };
        let mut ctx = shared.lock().await;
        ctx.append_turn(turn);
        Ok(())
    }

    /// "Clear history but keep session": scoped to turn history/scratch
    /// only, registry telemetry is untouched.
    pub async fn clear_messages(&self, session_id: &str) {
        if let Some(shared) = self.sessions.get(session_id).map(|e| e.clone()) {
            shared.lock().await.clear_turns();
        }
    }

    /// Hands a serializable copy to the persistence collaborator,
    /// fire-and-forget: failure is logged, never propagated.
    pub async fn snapshot(&self, session_id: &str) {
        let Some(shared) = self.sessions.get(session_id).map(|e| e.clone()) else {
            return;
        };
        let snapshot = shared.lock().await.clone();
        if let Err(e) = self.persistence.store_session(session_id, &snapshot).await {
            tracing::warn!(session_id, error = %e, "session snapshot failed");
        }
    }

    /// Scans active sessions, evicting those idle past `max_idle_age`
    /// (default 30 min).
    pub async fn sweep(&self, max_idle_age: chrono::Duration) -> usize {
        let now = chrono::Utc::now();
        let mut idle: Vec<String> = Vec::new();

        for entry in self.sessions.iter() {
            let ctx = entry.value().lock().await;
            if ctx.idle_for(now) > max_idle_age {
                idle.push(entry.key().clone());
            }
        }

        for session_id in &idle {
            self.sessions.remove(session_id);
        }

        if !idle.is_empty() {
            tracing::debug!(count = idle.len(), "evicted idle sessions");
        }
        idle.len()
    }

    pub fn active_session_count(&self) -> usize {
        self.sessions.len()
    }

    /// Spawns the periodic sweep timer (default every 15 min).
    pub fn spawn_sweep_task(
        self: Arc<Self>,
        sweep_interval: Duration,
        max_idle_age: chrono::Duration,
    ) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(sweep_interval);
            loop {
                ticker.tick().await;
                self.sweep(max_idle_age).await;
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use orchestra_core::CollaboratorError;
    use std::collections::HashMap;
    use tokio::sync::Mutex as TokioMutex;

    #[derive(Default)]
    struct MemoryPersistence {
        store: TokioMutex<HashMap<String, Context>>,
    }

    #[async_trait]
    impl PersistenceCollaborator for MemoryPersistence {
        async fn load_session(&self, id: &str) -> Result<Option<Context>, CollaboratorError> {
            Ok(self.store.lock().await.get(id).cloned())
        }

        async fn store_session(&self, id: &str, context: &Context) -> Result<(), CollaboratorError> {
            self.store.lock().await.insert(id.to_string(), context.clone());
            Ok(())
        }

        async fn delete_session(&self, id: &str) -> Result<(), CollaboratorError> {
            self.store.lock().await.remove(id);
            Ok(())
        }
    }

    #[tokio::test]
    async fn get_or_create_returns_fresh_context_when_nothing_persisted() {
        let manager = ContextManager::new(Arc::new(MemoryPersistence::default()));
        let ctx = manager.get_or_create("s1", None).await;
        assert!(ctx.lock().await.turns.is_empty());
    }

    #[tokio::test]
    async fn get_or_create_is_stable_across_calls() {
        let manager = ContextManager::new(Arc::new(MemoryPersistence::default()));
        let first = manager.get_or_create("s1", None).await;
        first.lock().await.append_turn(Turn::user("hi"));

        let second = manager.get_or_create("s1", None).await;
        assert_eq!(second.lock().await.turns.len(), 1);
    }

    #[tokio::test]
    async fn snapshot_then_load_round_trips_modulo_last_updated() {
        let manager = ContextManager::new(Arc::new(MemoryPersistence::default()));
        let ctx = manager.get_or_create("s1", None).await;
        ctx.lock().await.append_turn(Turn::user("hi"));
        manager.snapshot("s1").await;

        let manager2 = ContextManager::new(manager.persistence.clone());
        let reloaded = manager2.get_or_create("s1", None).await;
        let reloaded = reloaded.lock().await;
        assert_eq!(reloaded.turns.len(), 1);
        assert_eq!(reloaded.turns[0].content, "hi");
    }

    #[tokio::test]
    async fn idle_eviction_then_get_or_create_returns_fresh_context() {
        let manager = Arc::new(ContextManager::new(Arc::new(MemoryPersistence::default())));
        let ctx = manager.get_or_create("s1", None).await;
        ctx.lock().await.append_turn(Turn::user("hi"));
        // Force it to look idle without sleeping in a test.
        ctx.lock().await.last_updated = chrono::Utc::now() - chrono::Duration::hours(1);

        let evicted = manager.sweep(chrono::Duration::minutes(30)).await;
        assert_eq!(evicted, 1);
        assert_eq!(manager.active_session_count(), 0);

        // Persistence was never snapshotted, so this truly is fresh.
        let fresh = manager.get_or_create("s1", None).await;
        assert!(fresh.lock().await.turns.is_empty());
    }

    #[tokio::test]
    async fn clear_messages_keeps_session_but_drops_history() {
        let manager = ContextManager::new(Arc::new(MemoryPersistence::default()));
        let ctx = manager.get_or_create("s1", Some("u1".to_string())).await;
        ctx.lock().await.append_turn(Turn::user("hi"));

        manager.clear_messages("s1").await;

        let ctx = manager.get_or_create("s1", None).await;
        let ctx = ctx.lock().await;
        assert!(ctx.turns.is_empty());
        assert_eq!(ctx.user_id.as_deref(), Some("u1"));
    }
}
