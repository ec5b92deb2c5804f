//! Shared types and traits for the Orchestra agent orchestration engine.
//!
//! This crate has no dependency on any other workspace crate: it is the
//! vocabulary `orchestra-registry`, `orchestra-context`,
//! `orchestra-planner`, `orchestra-executor` and the `orchestra` façade all
//! speak.

pub mod collaborator;
pub mod definition;
pub mod error;
pub mod intent;
pub mod outcome;
pub mod plan;
pub mod result;
pub mod retry;
pub mod session;
pub mod tool;

pub use collaborator::{AnalyzeResult, LanguageModel, PersistenceCollaborator, SynthesizeResult};
pub use definition::{ToolDefinition, ToolDefinitionBuilder, ToolStats};
pub use error::{CollaboratorError, CollaboratorErrorKind, ToolExecutionError};
pub use intent::{Entity, EntityKind, Intent};
pub use outcome::{ProgressEvent, StepOutcome, StepStatus};
pub use plan::{Plan, PlanStep};
pub use result::{ErrorInfo, ErrorKind, QueryResult, ToolUsageSummary};
pub use retry::{RetryConfig, RetryPolicy};
pub use session::{Context, Role, Turn};
pub use tool::{StepContext, Tool, ToolHandle, ToolInput, ToolOutput};
