use thiserror::Error;

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("tool definition missing required field: {0}")]
    ValidationFailed(String),

    #[error("a tool named '{0}' is already registered (case-insensitive)")]
    NameCollision(String),

    #[error("tool not found: {0}")]
    NotFound(String),

    #[error("failed to read tool definitions from {path}: {message}")]
    LoadFailed { path: String, message: String },
}
