//! The trainer abstraction and its output.
//!
//! Both the gradient trainer and the ALS trainer implement [`FactorTrainer`];
//! which one runs is decided by [`TrainerKind`] in the configuration.

use crate::als::AlsTrainer;
use crate::config::{AlsConfig, TrainerConfig, TrainerKind};
use crate::error::{FactorizationError, Result};
use crate::trainer::GradientTrainer;
use ndarray::{Array2, ArrayView2};
use serde::{Deserialize, Serialize};

/// Learns latent factors from a users × items interaction matrix.
///
/// ## Design Note
/// - `Send + Sync` so a trainer can be shared across threads
/// - Trainers hold configuration only; every call to `train` is independent
pub trait FactorTrainer: Send + Sync {
    /// Returns the name of this trainer (for logging)
    fn name(&self) -> &str;

    /// Train on a dense, non-negative interaction matrix.
    ///
    /// # Returns
    /// * `Ok(TrainedFactors)` - users × k user factors, k × items item factors
    /// * `Err` - if the matrix or the configuration is unusable
    fn train(&self, interactions: ArrayView2<'_, f32>) -> Result<TrainedFactors>;
}

/// Frozen result of a training run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainedFactors {
    /// users × k
    pub user_factors: Array2<f32>,
    /// k × items
    pub item_factors: Array2<f32>,
    /// Best loss observed during the run
    pub final_loss: f32,
    pub epochs_run: usize,
    pub loss_history: Vec<f32>,
    pub trainer: String,
    pub backend: String,
}

impl TrainedFactors {
    pub fn n_factors(&self) -> usize {
        self.user_factors.ncols()
    }

    pub fn n_users(&self) -> usize {
        self.user_factors.nrows()
    }

    pub fn n_items(&self) -> usize {
        self.item_factors.ncols()
    }

    /// Full users × items reconstruction
    pub fn predict(&self) -> Array2<f32> {
        self.user_factors.dot(&self.item_factors)
    }

    /// Predicted strength of a single (user, item) cell
    pub fn score(&self, user: usize, item: usize) -> Option<f32> {
        if user >= self.n_users() || item >= self.n_items() {
            return None;
        }
        Some(self.user_factors.row(user).dot(&self.item_factors.column(item)))
    }
}

/// Build the trainer selected by `kind`
pub fn build_trainer(
    kind: TrainerKind,
    gradient: TrainerConfig,
    als: AlsConfig,
) -> Result<Box<dyn FactorTrainer>> {
    let trainer: Box<dyn FactorTrainer> = match kind {
        TrainerKind::Gradient => Box::new(GradientTrainer::new(gradient)?),
        TrainerKind::Als => Box::new(AlsTrainer::new(als)?),
    };
    Ok(trainer)
}

/// Reject matrices no trainer can work with
pub(crate) fn validate_interactions(interactions: ArrayView2<'_, f32>) -> Result<()> {
    let (rows, cols) = interactions.dim();
    if rows == 0 || cols == 0 {
        return Err(FactorizationError::DataShape(format!(
            "interaction matrix is empty ({} x {})",
            rows, cols
        )));
    }
    if let Some(bad) = interactions.iter().find(|v| !v.is_finite()) {
        return Err(FactorizationError::DataShape(format!(
            "interaction matrix contains non-finite value {}",
            bad
        )));
    }
    if let Some(bad) = interactions.iter().find(|&&v| v < 0.0) {
        return Err(FactorizationError::DataShape(format!(
            "interaction matrix contains negative value {}",
            bad
        )));
    }
    Ok(())
}
