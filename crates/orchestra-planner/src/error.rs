use thiserror::Error;

/// The planner found nothing. The orchestrator façade converts this to a
/// graceful user-visible message.
#[derive(Debug, Error)]
pub enum PlannerError {
    #[error("no candidate tool covers any sub-goal of the query")]
    EmptyPlan,
}
