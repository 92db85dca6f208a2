//! # Content Crate
//!
//! Content-side models of the hybrid recommender: everything that is derived
//! from business attributes, post metadata and economic indicators rather
//! than from user interactions.
//!
//! ## Main Components
//!
//! - **similarity**: One-hot + numeric business features, z-scored, cosine similarity
//! - **evaluation**: Same-category ground truth evaluation of business recommendations
//! - **economic**: Economic indicators with seasonal flags and industry weights
//! - **affinity**: Keyword-based business–product matches and business–post listings
//! - **error**: Error types for content models

pub mod affinity;
pub mod economic;
pub mod error;
pub mod evaluation;
pub mod similarity;

pub use affinity::{
    PostSummary, ProductMatch, business_post_affinity, business_product_affinity,
    local_market_relevance,
};
pub use economic::{EconomicContext, ramadan_months};
pub use error::{ContentError, Result};
pub use evaluation::evaluate_business_recommendations;
pub use similarity::BusinessSimilarity;
