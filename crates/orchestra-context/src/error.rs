use thiserror::Error;

#[derive(Debug, Error)]
pub enum ContextError {
    #[error("persistence collaborator failed: {0}")]
    PersistenceFailed(String),
}
