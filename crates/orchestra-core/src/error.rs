//! Shared error types that cross crate boundaries.
//!
//! Each crate in this workspace additionally defines its own scoped error
//! enum (`RegistryError`, `ContextError`, `PlannerError`, `ExecutorError`);
//! the types here are the ones that appear in more than one of those enums.

use thiserror::Error;

/// An error raised by a [`crate::tool::Tool::execute`] call.
///
/// `retryable` drives the executor's retry-vs-fallback decision: a
/// `Transient` failure (network blip, rate-limit with retry-after) is
/// retried against the same tool; anything else moves straight to the
/// fallback chain or terminal failure.
#[derive(Debug, Error, Clone)]
#[error("tool execution failed: {message}")]
pub struct ToolExecutionError {
    pub message: String,
    pub retryable: bool,
}

impl ToolExecutionError {
    pub fn transient(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            retryable: true,
        }
    }

    pub fn permanent(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            retryable: false,
        }
    }
}

/// The three error kinds a language-model collaborator call may report.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CollaboratorErrorKind {
    Transient,
    Permanent,
    QuotaExceeded,
}

/// An error from the `Analyze`/`Synthesize`/persistence collaborators.
#[derive(Debug, Error, Clone)]
#[error("collaborator error ({kind:?}): {message}")]
pub struct CollaboratorError {
    pub kind: CollaboratorErrorKind,
    pub message: String,
}

impl CollaboratorError {
    pub fn transient(message: impl Into<String>) -> Self {
        Self {
            kind: CollaboratorErrorKind::Transient,
            message: message.into(),
        }
    }

    pub fn permanent(message: impl Into<String>) -> Self {
        Self {
            kind: CollaboratorErrorKind::Permanent,
            message: message.into(),
        }
    }

    pub fn quota_exceeded(message: impl Into<String>) -> Self {
        Self {
            kind: CollaboratorErrorKind::QuotaExceeded,
            message: message.into(),
        }
    }

    pub fn is_retryable(&self) -> bool {
        matches!(self.kind, CollaboratorErrorKind::Transient)
    }
}
