//! Offline evaluation of trained factors.
//!
//! ## Protocol
//! 1. Holdout: every user with more than [`MIN_OBSERVED_FOR_HOLDOUT`]
//!    observed cells gives up `max(1, round(test_fraction · observed))` of
//!    them, sampled uniformly without replacement. Held-out cells are zeroed
//!    in a copy that acts as the training view.
//! 2. RMSE between the reconstruction and the true values on held-out cells.
//! 3. Per user with held-out items: items still observed in the training view
//!    score `-inf`, the top `k` of the rest is compared with the held-out set.
//!
//! The factors are evaluated as given; nothing is retrained on the split.
//! Any failure yields [`MetricsRecord::zeroed`] instead of an error.

use crate::config::EvaluationConfig;
use crate::error::{FactorizationError, Result};
use crate::metrics::{MetricsRecord, RMSE, RankingAccumulator, top_k_indices};
use crate::trainer::seeded_rng;
use crate::traits::TrainedFactors;
use ndarray::{Array2, ArrayView2};
use rand::Rng;
use rand::seq::index;
use tracing::{debug, info, instrument, warn};

/// Users need strictly more observed cells than this to be held out
pub const MIN_OBSERVED_FOR_HOLDOUT: usize = 5;

/// Held-out split of an interaction matrix
#[derive(Debug, Clone)]
pub struct Holdout {
    /// `true` on held-out cells
    pub test_mask: Array2<bool>,
    /// Interactions with the held-out cells zeroed
    pub train: Array2<f32>,
}

impl Holdout {
    pub fn test_cells(&self) -> usize {
        self.test_mask.iter().filter(|&&held| held).count()
    }

    /// Held-out item indices of `user`
    pub fn test_items(&self, user: usize) -> Vec<usize> {
        self.test_mask
            .row(user)
            .iter()
            .enumerate()
            .filter_map(|(item, &held)| held.then_some(item))
            .collect()
    }
}

/// Number of cells held out for a user with `observed` interactions
pub fn holdout_size(observed: usize, test_fraction: f64) -> usize {
    if observed <= MIN_OBSERVED_FOR_HOLDOUT {
        return 0;
    }
    let wanted = (test_fraction * observed as f64).round() as usize;
    wanted.max(1).min(observed)
}

/// Build the per-user holdout split
pub fn sample_holdout<R: Rng + ?Sized>(
    interactions: ArrayView2<'_, f32>,
    test_fraction: f64,
    rng: &mut R,
) -> Holdout {
    let mut test_mask = Array2::from_elem(interactions.dim(), false);
    let mut train = interactions.to_owned();

    for (user, row) in interactions.outer_iter().enumerate() {
        let observed: Vec<usize> = row
            .iter()
            .enumerate()
            .filter_map(|(item, &value)| (value > 0.0).then_some(item))
            .collect();

        let n_test = holdout_size(observed.len(), test_fraction);
        if n_test == 0 {
            continue;
        }
        for pick in index::sample(rng, observed.len(), n_test).iter() {
            let item = observed[pick];
            test_mask[[user, item]] = true;
            train[[user, item]] = 0.0;
        }
    }

    Holdout { test_mask, train }
}

/// Users × items reconstruction, accepting item factors as k × items or
/// items × k.
pub fn reconstruct(user_factors: ArrayView2<'_, f32>, item_factors: ArrayView2<'_, f32>) -> Result<Array2<f32>> {
    let k = user_factors.ncols();
    if item_factors.nrows() == k {
        Ok(user_factors.dot(&item_factors))
    } else if item_factors.ncols() == k {
        Ok(user_factors.dot(&item_factors.t()))
    } else {
        Err(FactorizationError::DataShape(format!(
            "user factors {:?} and item factors {:?} share no latent dimension",
            user_factors.dim(),
            item_factors.dim()
        )))
    }
}

/// Holdout evaluator for latent factor models
pub struct OfflineEvaluator {
    config: EvaluationConfig,
}

impl OfflineEvaluator {
    pub fn new(config: EvaluationConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &EvaluationConfig {
        &self.config
    }

    /// Evaluate a training result against its interaction matrix
    pub fn evaluate_trained(&self, factors: &TrainedFactors, interactions: ArrayView2<'_, f32>) -> MetricsRecord {
        self.evaluate(factors.user_factors.view(), factors.item_factors.view(), interactions)
    }

    /// Compute `rmse`, `precision@k`, `recall@k` and `f1@k`.
    ///
    /// Never fails: invalid inputs are logged and reported as all zeros.
    #[instrument(skip_all, fields(k = self.config.k, test_fraction = self.config.test_fraction))]
    pub fn evaluate(
        &self,
        user_factors: ArrayView2<'_, f32>,
        item_factors: ArrayView2<'_, f32>,
        interactions: ArrayView2<'_, f32>,
    ) -> MetricsRecord {
        match self.try_evaluate(user_factors, item_factors, interactions) {
            Ok(record) => {
                info!("Collaborative filtering metrics: {}", record);
                record
            }
            Err(e) => {
                warn!("Evaluation failed, reporting zero metrics: {}", e);
                MetricsRecord::zeroed(self.config.k)
            }
        }
    }

    fn try_evaluate(
        &self,
        user_factors: ArrayView2<'_, f32>,
        item_factors: ArrayView2<'_, f32>,
        interactions: ArrayView2<'_, f32>,
    ) -> Result<MetricsRecord> {
        self.config.validate()?;
        let k = self.config.k;

        if interactions.is_empty() {
            return Err(FactorizationError::DataShape(
                "interaction matrix is empty".to_string(),
            ));
        }
        let predictions = reconstruct(user_factors, item_factors)?;
        if let Some(bad) = predictions.iter().find(|v| !v.is_finite()) {
            return Err(FactorizationError::DataShape(format!(
                "factors reconstruct to non-finite prediction {}",
                bad
            )));
        }
        if predictions.dim() != interactions.dim() {
            return Err(FactorizationError::DataShape(format!(
                "predictions {:?} do not match interactions {:?}",
                predictions.dim(),
                interactions.dim()
            )));
        }

        let mut rng = seeded_rng(self.config.seed);
        let holdout = sample_holdout(interactions, self.config.test_fraction, &mut rng);
        debug!("Held out {} test cells", holdout.test_cells());

        let rmse = holdout_rmse(&holdout, interactions, &predictions);

        let mut ranking = RankingAccumulator::new();
        for user in 0..interactions.nrows() {
            let test_items = holdout.test_items(user);
            if test_items.is_empty() {
                continue;
            }

            let scores: Vec<f32> = predictions
                .row(user)
                .iter()
                .zip(holdout.train.row(user))
                .map(|(&score, &seen)| if seen > 0.0 { f32::NEG_INFINITY } else { score })
                .collect();
            let recommended = top_k_indices(&scores, k);
            let hits = recommended
                .iter()
                .filter(|&&item| test_items.contains(&item))
                .count();
            ranking.add(hits, k, test_items.len());
        }

        if ranking.queries() == 0 {
            warn!(
                "No user has more than {} interactions, ranking metrics are zero",
                MIN_OBSERVED_FOR_HOLDOUT
            );
        }

        let mut record = MetricsRecord::new();
        record.insert(RMSE, rmse);
        record.insert_ranking(k, &ranking.finish());
        Ok(record)
    }
}

impl Default for OfflineEvaluator {
    fn default() -> Self {
        Self::new(EvaluationConfig::default())
    }
}

fn holdout_rmse(holdout: &Holdout, actual: ArrayView2<'_, f32>, predictions: &Array2<f32>) -> f64 {
    let mut sse = 0.0f64;
    let mut count = 0usize;
    for ((&held, &truth), &predicted) in holdout.test_mask.iter().zip(actual.iter()).zip(predictions.iter()) {
        if held {
            let diff = (truth - predicted) as f64;
            sse += diff * diff;
            count += 1;
        }
    }
    if count == 0 { 0.0 } else { (sse / count as f64).sqrt() }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::precision_key;
    use ndarray::array;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    #[test]
    fn test_holdout_size() {
        assert_eq!(holdout_size(5, 0.2), 0);
        assert_eq!(holdout_size(6, 0.2), 1);
        assert_eq!(holdout_size(10, 0.2), 2);
        assert_eq!(holdout_size(8, 0.01), 1);
        assert_eq!(holdout_size(7, 1.0), 7);
    }

    #[test]
    fn test_sample_holdout_zeroes_test_cells() {
        let interactions = Array2::from_shape_fn((3, 10), |(u, i)| if u == 2 { 0.0 } else { (i + 1) as f32 });
        let mut rng = StdRng::seed_from_u64(3);

        let holdout = sample_holdout(interactions.view(), 0.2, &mut rng);

        assert_eq!(holdout.test_items(0).len(), 2);
        assert_eq!(holdout.test_items(1).len(), 2);
        assert!(holdout.test_items(2).is_empty());
        for ((held, train), original) in holdout
            .test_mask
            .iter()
            .zip(holdout.train.iter())
            .zip(interactions.iter())
        {
            if *held {
                assert_eq!(*train, 0.0);
                assert!(*original > 0.0);
            } else {
                assert_eq!(train, original);
            }
        }
    }

    #[test]
    fn test_reconstruct_orientations() {
        let users = array![[1.0f32, 2.0]];
        let items_k_first = array![[1.0f32, 0.0, 1.0], [0.0, 1.0, 1.0]];

        let a = reconstruct(users.view(), items_k_first.view()).unwrap();
        let b = reconstruct(users.view(), items_k_first.t()).unwrap();
        assert_eq!(a, array![[1.0, 2.0, 3.0]]);
        assert_eq!(a, b);

        let mismatched = array![[1.0f32, 2.0, 3.0]];
        assert!(reconstruct(users.view(), mismatched.view()).is_err());
    }

    #[test]
    fn test_shape_mismatch_yields_zero_record() {
        let evaluator = OfflineEvaluator::default();
        let users = Array2::<f32>::ones((3, 2));
        let items = Array2::<f32>::ones((2, 4));
        let interactions = Array2::<f32>::ones((3, 5));

        let record = evaluator.evaluate(users.view(), items.view(), interactions.view());
        assert!(record.is_all_zero());
        assert_eq!(record.get(&precision_key(10)), Some(0.0));
    }

    #[test]
    fn test_non_finite_factors_yield_zero_record() {
        let evaluator = OfflineEvaluator::new(EvaluationConfig::default().with_seed(1));
        let users = Array2::<f32>::from_elem((3, 2), f32::NAN);
        let items = Array2::<f32>::ones((2, 8));
        let interactions = Array2::from_shape_fn((3, 8), |(u, i)| if i <= u + 5 { 1.0 } else { 0.0 });

        let record = evaluator.evaluate(users.view(), items.view(), interactions.view());
        assert!(record.is_all_zero());
        assert_eq!(record.rmse(), Some(0.0));

        let mut users = Array2::<f32>::ones((3, 2));
        users[[1, 0]] = f32::INFINITY;
        let record = evaluator.evaluate(users.view(), items.view(), interactions.view());
        assert!(record.is_all_zero());
    }

    #[test]
    fn test_zero_k_yields_zero_record() {
        let evaluator = OfflineEvaluator::new(EvaluationConfig::default().with_k(0));
        let users = Array2::<f32>::ones((2, 2));
        let items = Array2::<f32>::ones((2, 2));

        let record = evaluator.evaluate(users.view(), items.view(), users.view());
        assert!(record.is_all_zero());
    }

    #[test]
    fn test_perfect_factors_hit_held_out_items() {
        // Each user interacts with 6 of 8 items; the reconstruction ranks
        // exactly those 6 above the 2 unseen ones.
        let interactions = Array2::from_shape_fn((4, 8), |(u, i)| if (i + u) % 4 < 3 { 1.0 } else { 0.0 });
        let observed_per_user: Vec<usize> = interactions
            .outer_iter()
            .map(|row| row.iter().filter(|v| **v > 0.0).count())
            .collect();
        assert!(observed_per_user.iter().all(|&n| n == 6));

        let identity = Array2::<f32>::eye(4);
        let evaluator = OfflineEvaluator::new(EvaluationConfig::default().with_k(1).with_seed(5));
        let record = evaluator.evaluate(identity.view(), interactions.view(), interactions.view());

        assert_eq!(record.rmse(), Some(0.0));
        assert_eq!(record.precision_at(1), Some(1.0));
        assert_eq!(record.recall_at(1), Some(1.0));
        assert_eq!(record.f1_at(1), Some(1.0));
    }
}
