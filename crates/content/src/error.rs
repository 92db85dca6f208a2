//! Error types for the content-based models.

use thiserror::Error;

/// Errors raised while building business similarity and context tables
#[derive(Error, Debug)]
pub enum ContentError {
    /// No businesses (or other required rows) to work with
    #[error("Empty input: {0}")]
    EmptyInput(String),

    /// Lookup by a business name that is not in the model
    #[error("Unknown business: {0}")]
    UnknownBusiness(String),

    /// Calendar or other parameter outside its valid range
    #[error("Invalid parameter {name}: {value}")]
    InvalidParameter { name: String, value: String },

    /// Error bubbled up from the data loader
    #[error(transparent)]
    Data(#[from] data_loader::DataLoadError),
}

/// Convenience type alias for Results in this crate
pub type Result<T> = std::result::Result<T, ContentError>;
