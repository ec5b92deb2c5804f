//! Deterministic `LanguageModel`/`PersistenceCollaborator` doubles so tests
//! never depend on network access.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Mutex;

use orchestra_core::{
    AnalyzeResult, CollaboratorError, Context, Entity, Intent, LanguageModel, PersistenceCollaborator,
    Plan, StepOutcome, SynthesizeResult, Turn,
};

/// Keyword-rule intent classifier plus a synthesizer that concatenates
/// successful tool outputs. Covers both halves of the language-model
/// collaborator with one deterministic implementation.
#[derive(Default)]
pub struct StubLanguageModel {
    /// When set, every call fails with this error instead of producing a
    /// result — used to exercise the Orchestrator's fallback branches.
    pub force_failure: Option<CollaboratorErrorMode>,
}

#[derive(Clone, Copy, Debug)]
pub enum CollaboratorErrorMode {
    Transient,
    Permanent,
}

impl StubLanguageModel {
    pub fn failing(mode: CollaboratorErrorMode) -> Self {
        Self {
            force_failure: Some(mode),
        }
    }
}

#[async_trait]
impl LanguageModel for StubLanguageModel {
    async fn analyze(&self, text: &str, _deadline: Duration) -> Result<AnalyzeResult, CollaboratorError> {
        if let Some(mode) = self.force_failure {
            return Err(as_collaborator_error(mode, "stub analyzer forced failure"));
        }

        let lower = text.to_lowercase();
        let compound = [" and then ", ";", " then "].iter().any(|sep| lower.contains(sep));
        let primary = lower.split_whitespace().next().unwrap_or("unknown").to_string();

        Ok(AnalyzeResult {
            intent: Intent {
                primary,
                secondary: Vec::new(),
                confidence: 0.8,
                compound,
            },
            entities: Vec::<Entity>::new(),
        })
    }

    async fn synthesize(
        &self,
        _query: &str,
        _plan: &Plan,
        outcomes: &[StepOutcome],
        _history: &[Turn],
        _deadline: Duration,
    ) -> Result<SynthesizeResult, CollaboratorError> {
        if let Some(mode) = self.force_failure {
            return Err(as_collaborator_error(mode, "stub synthesizer forced failure"));
        }

        let text = outcomes
            .iter()
            .filter_map(|o| o.output.as_ref().and_then(|out| out.text.clone()))
            .collect::<Vec<_>>()
            .join(" ");

        Ok(SynthesizeResult {
            text,
            html: None,
            sources: Vec::new(),
        })
    }
}

fn as_collaborator_error(mode: CollaboratorErrorMode, message: &str) -> CollaboratorError {
    match mode {
        CollaboratorErrorMode::Transient => CollaboratorError::transient(message),
        CollaboratorErrorMode::Permanent => CollaboratorError::permanent(message),
    }
}

/// In-memory `PersistenceCollaborator`, storing each session's `Context`
/// in a plain map rather than a file-backed store.
#[derive(Default)]
pub struct InMemoryPersistence {
    store: Mutex<HashMap<String, Context>>,
}

#[async_trait]
impl PersistenceCollaborator for InMemoryPersistence {
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
