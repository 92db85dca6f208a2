//! The trained hybrid model and its metadata.

use crate::config::TrainingVariant;
use chrono::{DateTime, Utc};
use content::{BusinessSimilarity, EconomicContext, PostSummary, ProductMatch};
use data_loader::{DataSource, IdMapping, InteractionMatrix, PostId, UserId};
use factorization::{MetricsRecord, TrainedFactors};
use ndarray::Array2;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub const MODEL_TYPE: &str = "hybrid_post_recommendation";

pub const COMPONENTS: [&str; 3] = [
    "collaborative_filtering",
    "content_based_business",
    "economic_context",
];

/// Sizes of the training inputs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataSize {
    pub users: usize,
    pub posts: usize,
    pub interactions: usize,
    pub businesses: usize,
}

/// Contents of `model_info.json`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelInfo {
    pub model_type: String,
    pub components: Vec<String>,
    pub training_date: DateTime<Utc>,
    pub data_size: DataSize,
    pub data_source: DataSource,
    pub variant: TrainingVariant,
    pub trainer: String,
    pub backend: String,
    pub final_loss: f32,
    pub epochs_run: usize,
}

/// Row and column labels of the CF factor matrices
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IdMaps {
    pub users: IdMapping<UserId>,
    pub posts: IdMapping<PostId>,
}

impl IdMaps {
    pub fn from_matrix(matrix: &InteractionMatrix) -> Self {
        Self {
            users: matrix.users().clone(),
            posts: matrix.posts().clone(),
        }
    }

    /// Lay `matrix` out in this mapping's row and column order.
    ///
    /// Users or posts unknown to `matrix` become all-zero rows or columns;
    /// entries of `matrix` missing from the mapping are dropped.
    pub fn align(&self, matrix: &InteractionMatrix) -> Array2<f32> {
        if matrix.users().labels() == self.users.labels()
            && matrix.posts().labels() == self.posts.labels()
        {
            return matrix.values().clone();
        }

        let values = matrix.values();
        Array2::from_shape_fn((self.users.len(), self.posts.len()), |(u, p)| {
            let row = self
                .users
                .label_of(u)
                .and_then(|user| matrix.users().index_of(user.as_str()));
            let col = self
                .posts
                .label_of(p)
                .and_then(|post| matrix.posts().index_of(post));
            match (row, col) {
                (Some(row), Some(col)) => values[[row, col]],
                _ => 0.0,
            }
        })
    }
}

/// Everything one training run produces
#[derive(Debug, Clone)]
pub struct HybridModel {
    pub cf: TrainedFactors,
    pub id_maps: IdMaps,
    pub business_similarity: BusinessSimilarity,
    pub business_posts: BTreeMap<String, Vec<PostSummary>>,
    pub business_products: BTreeMap<String, Vec<ProductMatch>>,
    pub economic_context: EconomicContext,
    pub info: ModelInfo,
}

impl HybridModel {
    /// Predicted interaction strength of a known (user, post) pair
    pub fn score(&self, user_id: &str, post_id: PostId) -> Option<f32> {
        let user = self.id_maps.users.index_of(user_id)?;
        let post = self.id_maps.posts.index_of(&post_id)?;
        self.cf.score(user, post)
    }
}

/// Metrics of one evaluation pass, stored as `metrics/evaluation_metrics.json`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationReport {
    pub collaborative_filtering: MetricsRecord,
    pub company_recommendations: MetricsRecord,
    /// Mean of the CF `f1@k` and the business `f1@k`
    pub hybrid_score: f64,
    pub timestamp: DateTime<Utc>,
}
