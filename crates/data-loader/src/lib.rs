//! # Data Loader Crate
//!
//! This crate loads the processed exports of the post recommendation system
//! and turns them into typed, in-memory training inputs.
//!
//! ## Main Components
//!
//! - **types**: Domain records, [`IdMapping`] and the dense [`InteractionMatrix`]
//! - **parser**: Header-driven CSV parsing of the processed files
//! - **index**: Assembling and validating [`TrainingData`]
//! - **dummy**: In-memory fallback dataset
//! - **error**: Error types for data loading
//!
//! ## Example Usage
//!
//! ```ignore
//! use data_loader::TrainingData;
//! use std::path::Path;
//!
//! let data = TrainingData::load_or_dummy(Path::new("data/processed"))?;
//! let (users, posts) = data.interaction_matrix.shape();
//! println!("{} users x {} posts", users, posts);
//! ```

// Public modules
pub mod dummy;
pub mod error;
pub mod index;
pub mod parser;
pub mod types;

// Re-export commonly used types for convenience
pub use error::{DataLoadError, Result};
pub use types::{
    // Type aliases
    PostId,
    UserId,
    // Records
    BusinessProfile,
    CompanyPost,
    EconomicIndicators,
    Interaction,
    Product,
    UserPreference,
    // Matrices and datasets
    DataSource,
    IdMapping,
    InteractionMatrix,
    TrainingData,
};
