//! Narrow interfaces over the external collaborators the core depends on
//! but does not implement: the upstream language model and the
//! persistence backend. Both a real provider and a deterministic stub
//! (see `orchestra-testing`) implement these traits; tests run only
//! against the stub.

use async_trait::async_trait;
use std::time::Duration;

use crate::error::CollaboratorError;
use crate::intent::{Entity, Intent};
use crate::plan::Plan;
use crate::outcome::StepOutcome;
use crate::session::Turn;

#[derive(Debug, Clone)]
pub struct AnalyzeResult {
    pub intent: Intent,
    pub entities: Vec<Entity>,
}

#[derive(Debug, Clone)]
pub struct SynthesizeResult {
    pub text: String,
    pub html: Option<String>,
    pub sources: Vec<String>,
}

/// The language-model collaborator. Both calls honor the deadline passed
/// by the caller.
#[async_trait]
pub trait LanguageModel: Send + Sync {
    async fn analyze(&self, text: &str, deadline: Duration) -> Result<AnalyzeResult, CollaboratorError>;

    async fn synthesize(
        &self,
        query: &str,
        plan: &Plan,
        outcomes: &[StepOutcome],
        history: &[Turn],
        deadline: Duration,
    ) -> Result<SynthesizeResult, CollaboratorError>;
}

/// The persistence collaborator. `store_session` is invoked fire-and-
/// forget by `orchestra-context::ContextManager::snapshot` — failures
/// are logged, never propagated.
#[async_trait]
pub trait PersistenceCollaborator: Send + Sync {
    async fn load_session(&self, id: &str) -> Result<Option<crate::session::Context>, CollaboratorError>;
    async fn store_session(&self, id: &str, context: &crate::session::Context) -> Result<(), CollaboratorError>;
    async fn delete_session(&self, id: &str) -> Result<(), CollaboratorError>;
}
