//! Error types for the factorization crate.

use thiserror::Error;

/// Errors raised while training or evaluating latent factor models
#[derive(Error, Debug)]
pub enum FactorizationError {
    /// Input matrix is empty, malformed, or factor dimensions disagree
    #[error("Data shape error: {0}")]
    DataShape(String),

    /// A hyperparameter is outside its valid range
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// The requested execution backend could not be brought up
    ///
    /// Recovered inside [`crate::backend::select_backend`]; callers of the
    /// trainers never see it.
    #[error("Device placement failed for {backend} backend: {reason}")]
    DevicePlacement { backend: String, reason: String },

    /// The optimization produced non-finite values or a singular system
    #[error("Numerical failure: {0}")]
    Numerical(String),
}

/// Convenience type alias for Results in this crate
pub type Result<T> = std::result::Result<T, FactorizationError>;
