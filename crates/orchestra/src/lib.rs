//! The Orchestrator façade: composes the Registry, Context manager,
//! Planner and Executor into the seven-step per-query sequence.

pub mod api;
mod config;
mod error;
mod orchestrator;

pub use config::OrchestratorConfig;
pub use error::OrchestratorError;
pub use orchestrator::Orchestrator;

pub use orchestra_executor::{cancellation_pair, CancellationHandle, CancellationToken};
