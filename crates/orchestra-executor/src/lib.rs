//! Runs a [`orchestra_core::Plan`] to completion: bounded concurrency,
//! dependency ordering, per-step retries/fallbacks, progress emission, and
//! cooperative cancellation.

mod cancellation;
mod error;
mod executor;
mod step;

pub use cancellation::{cancellation_pair, CancellationHandle, CancellationToken};
pub use error::ExecutorError;
pub use executor::{ExecutionReport, Executor, ExecutorConfig, PlanStatus};
