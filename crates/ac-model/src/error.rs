use thiserror::Error;

/// Errors originating from the model module.
#[derive(Error, Debug)]
pub enum ModelError {
    /// `runtime.model.name` names no known architecture.
    #[error("Model not found: {0}")]
    NotFound(String),

    /// Feature shape too small or class count zero.
    #[error("Invalid model configuration: {0}")]
    InvalidConfig(String),

    /// Checkpoint could not be written or read.
    #[error("Checkpoint error at {path}: {reason}")]
    Checkpoint {
        /// Checkpoint path.
        path: String,
        /// Underlying failure.
        reason: String,
    },
}
