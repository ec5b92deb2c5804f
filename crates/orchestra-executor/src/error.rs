use thiserror::Error;

#[derive(Debug, Error)]
pub enum ExecutorError {
    /// The plan's dependency graph is cyclic or references an unknown step;
    /// the executor refuses to schedule it.
    #[error("plan {0} has an unresolved or cyclic dependency graph")]
    MalformedPlan(String),
}
