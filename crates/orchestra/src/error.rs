use thiserror::Error;

use orchestra_context::ContextError;
use orchestra_executor::ExecutorError;
use orchestra_planner::PlannerError;
use orchestra_registry::RegistryError;

/// Aggregates every subsystem's error into the handful of kinds callers
/// see, via a flat `#[from]`-heavy shape.
#[derive(Debug, Error)]
pub enum OrchestratorError {
    #[error("malformed query: {0}")]
    Validation(String),

    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error(transparent)]
    Context(#[from] ContextError),

    #[error(transparent)]
    Planner(#[from] PlannerError),

    #[error(transparent)]
    Executor(#[from] ExecutorError),

    /// Queue depth exceeded for a busy session. Surfaced as HTTP 429 by
    /// the transport layer this crate does not implement.
    #[error("session {0} has too many queries in flight")]
    SessionBusy(String),

    /// Step or plan-level deadline breach with no successful step —
    /// anything else is reported as a best-effort `QueryResult` instead
    /// of an error.
    #[error("query for session {0} exceeded its deadline")]
    DeadlineExceeded(String),

    #[error("query canceled")]
    Canceled,
}
