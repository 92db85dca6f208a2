//! Error types for the data-loader crate.
//!
//! Every failure while reading the processed training files or while
//! assembling the interaction matrix is reported through [`DataLoadError`].

use thiserror::Error;

/// Errors that can occur during data loading and matrix construction
#[derive(Error, Debug)]
pub enum DataLoadError {
    /// File could not be found or opened
    #[error("Failed to open file: {path}")]
    FileNotFound { path: String },

    /// I/O error occurred while reading file
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// Line in data file couldn't be parsed
    ///
    /// Carries the file name and 1-based line number of the offending row
    #[error("Parse error at line {line} in {file}: {reason}")]
    ParseError {
        file: String,
        line: usize,
        reason: String,
    },

    /// A data field had an invalid value
    #[error("Invalid value for {field}: {value}")]
    InvalidValue { field: String, value: String },

    /// Header row is missing a column the parser needs
    #[error("Missing column {column} in {file}")]
    MissingColumn { file: String, column: String },

    /// Row/column labels and matrix dimensions disagree
    #[error("Shape mismatch: expected {expected_rows}x{expected_cols}, found {rows}x{cols}")]
    ShapeMismatch {
        expected_rows: usize,
        expected_cols: usize,
        rows: usize,
        cols: usize,
    },

    /// The same external id appeared twice in a label list
    #[error("Duplicate label in {axis} labels: {label}")]
    DuplicateLabel { axis: String, label: String },

    /// Data validation failed
    #[error("Validation failed: {0}")]
    ValidationError(String),
}

/// Convenience type alias for Results in this crate
pub type Result<T> = std::result::Result<T, DataLoadError>;
