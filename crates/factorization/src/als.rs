//! Implicit-feedback Alternating Least Squares.
//!
//! Interactions are read as preferences `p = 1[r > 0]` with confidence
//! `c = 1 + α·r`. Each half-iteration fixes one side and solves, per row,
//!
//! ```text
//! (YᵀY + Σ_obs (c - 1)·y yᵀ + λI) x = Σ_obs c·y
//! ```
//!
//! with a Cholesky factorization. `YᵀY` is shared by all rows, so only
//! observed cells add work. Rows are solved in parallel with rayon.

use crate::config::AlsConfig;
use crate::error::{FactorizationError, Result};
use crate::trainer::seeded_rng;
use crate::traits::{FactorTrainer, TrainedFactors, validate_interactions};
use ndarray::{Array1, Array2, ArrayView2, Axis};
use rand::Rng;
use rayon::prelude::*;
use tracing::{debug, info, instrument};

/// ALS factor trainer
pub struct AlsTrainer {
    config: AlsConfig,
}

impl AlsTrainer {
    pub fn new(config: AlsConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &AlsConfig {
        &self.config
    }

    /// Recompute every row of the free side against the `fixed` factors.
    ///
    /// `interactions` has one row per entity being solved.
    fn solve_side(&self, interactions: ArrayView2<'_, f32>, fixed: &Array2<f64>) -> Result<Array2<f64>> {
        let k = self.config.n_factors;
        let lambda = self.config.regularization;
        let alpha = self.config.alpha;
        let gram = fixed.t().dot(fixed);

        let rows: Vec<Array1<f64>> = (0..interactions.nrows())
            .into_par_iter()
            .map(|row| {
                let mut a = gram.clone();
                let mut b = Array1::<f64>::zeros(k);

                for (col, &r) in interactions.row(row).iter().enumerate() {
                    if r <= 0.0 {
                        continue;
                    }
                    let confidence = 1.0 + alpha * r as f64;
                    let y = fixed.row(col);
                    for i in 0..k {
                        let weighted = (confidence - 1.0) * y[i];
                        for j in 0..k {
                            a[[i, j]] += weighted * y[j];
                        }
                        b[i] += confidence * y[i];
                    }
                }

                for i in 0..k {
                    a[[i, i]] += lambda;
                }
                cholesky_solve(&a, &b)
            })
            .collect::<Result<_>>()?;

        let mut solved = Array2::<f64>::zeros((interactions.nrows(), k));
        for (mut target, row) in solved.axis_iter_mut(Axis(0)).zip(rows) {
            target.assign(&row);
        }
        Ok(solved)
    }
}

impl FactorTrainer for AlsTrainer {
    fn name(&self) -> &str {
        "als"
    }

    #[instrument(skip_all, fields(shape = ?interactions.dim(), k = self.config.n_factors))]
    fn train(&self, interactions: ArrayView2<'_, f32>) -> Result<TrainedFactors> {
        validate_interactions(interactions)?;
        let (users, items) = interactions.dim();
        let k = self.config.n_factors;

        info!(
            "ALS: k={}, iterations={}, regularization={}",
            k, self.config.iterations, self.config.regularization
        );

        let mut rng = seeded_rng(self.config.seed);
        let mut user_factors =
            Array2::<f64>::from_shape_simple_fn((users, k), || rng.random_range(-0.1..0.1));
        let mut item_factors =
            Array2::<f64>::from_shape_simple_fn((items, k), || rng.random_range(-0.1..0.1));

        let mut loss_history = Vec::with_capacity(self.config.iterations);
        for iteration in 0..self.config.iterations {
            user_factors = self.solve_side(interactions, &item_factors)?;
            item_factors = self.solve_side(interactions.t(), &user_factors)?;

            let loss = weighted_loss(interactions, &user_factors, &item_factors, self.config.alpha);
            debug!("ALS iteration {}: loss = {:.6}", iteration + 1, loss);
            loss_history.push(loss);
        }

        let final_loss = if loss_history.is_empty() {
            weighted_loss(interactions, &user_factors, &item_factors, self.config.alpha)
        } else {
            loss_history.iter().copied().fold(f32::INFINITY, f32::min)
        };
        info!("ALS finished, loss {:.6}", final_loss);

        Ok(TrainedFactors {
            user_factors: user_factors.mapv(|v| v as f32),
            // Stored items × k, exposed k × items like the gradient trainer
            item_factors: item_factors.t().mapv(|v| v as f32),
            final_loss,
            epochs_run: loss_history.len(),
            loss_history,
            trainer: self.name().to_string(),
            backend: "host".to_string(),
        })
    }
}

/// Confidence-weighted squared error against the binary preferences, per cell
fn weighted_loss(
    interactions: ArrayView2<'_, f32>,
    user_factors: &Array2<f64>,
    item_factors: &Array2<f64>,
    alpha: f64,
) -> f32 {
    let predicted = user_factors.dot(&item_factors.t());
    let total: f64 = interactions
        .iter()
        .zip(predicted.iter())
        .map(|(&r, &p)| {
            let preference = if r > 0.0 { 1.0 } else { 0.0 };
            let confidence = 1.0 + alpha * r as f64;
            confidence * (preference - p).powi(2)
        })
        .sum();
    (total / interactions.len() as f64) as f32
}

/// Solve `A x = b` for symmetric positive definite `A` via Cholesky
fn cholesky_solve(a: &Array2<f64>, b: &Array1<f64>) -> Result<Array1<f64>> {
    let n = a.nrows();

    // A = L Lᵀ
    let mut l = Array2::<f64>::zeros((n, n));
    for i in 0..n {
        for j in 0..=i {
            let mut sum = 0.0;
            for k in 0..j {
                sum += l[[i, k]] * l[[j, k]];
            }

            if i == j {
                let diag = a[[i, i]] - sum;
                if diag <= 0.0 {
                    return Err(FactorizationError::Numerical(
                        "ALS system is not positive definite".to_string(),
                    ));
                }
                l[[i, j]] = diag.sqrt();
            } else {
                l[[i, j]] = (a[[i, j]] - sum) / l[[j, j]];
            }
        }
    }

    // L y = b
    let mut y = Array1::<f64>::zeros(n);
    for i in 0..n {
        let mut sum = 0.0;
        for j in 0..i {
            sum += l[[i, j]] * y[j];
        }
        y[i] = (b[i] - sum) / l[[i, i]];
    }

    // Lᵀ x = y
    let mut x = Array1::<f64>::zeros(n);
    for i in (0..n).rev() {
        let mut sum = 0.0;
        for j in (i + 1)..n {
            sum += l[[j, i]] * x[j];
        }
        x[i] = (y[i] - sum) / l[[i, i]];
    }

    Ok(x)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    fn small_als() -> AlsTrainer {
        AlsTrainer::new(
            AlsConfig::default()
                .with_n_factors(3)
                .with_iterations(15)
                .with_regularization(0.01)
                .with_seed(11),
        )
        .unwrap()
    }

    #[test]
    fn test_cholesky_solve() {
        let a = array![[4.0, 2.0], [2.0, 3.0]];
        let b = array![2.0, 1.0];

        let x = cholesky_solve(&a, &b).unwrap();
        let back = a.dot(&x);
        assert!((back[0] - 2.0).abs() < 1e-10);
        assert!((back[1] - 1.0).abs() < 1e-10);
    }

    #[test]
    fn test_cholesky_rejects_indefinite() {
        let a = array![[0.0, 1.0], [1.0, 0.0]];
        let b = array![1.0, 1.0];
        assert!(cholesky_solve(&a, &b).is_err());
    }

    #[test]
    fn test_als_orientation_matches_gradient_trainer() {
        let interactions = array![[1.0f32, 0.0, 0.0, 1.0], [0.0, 1.0, 1.0, 0.0]];

        let trained = small_als().train(interactions.view()).unwrap();
        assert_eq!(trained.user_factors.dim(), (2, 3));
        assert_eq!(trained.item_factors.dim(), (3, 4));
        assert_eq!(trained.epochs_run, 15);
        assert_eq!(trained.trainer, "als");
    }

    #[test]
    fn test_als_ranks_observed_items_first() {
        let interactions = array![
            [1.0f32, 1.0, 0.0, 0.0],
            [1.0, 1.0, 0.0, 0.0],
            [0.0, 0.0, 1.0, 1.0],
            [0.0, 0.0, 1.0, 1.0],
        ];

        let trained = small_als().train(interactions.view()).unwrap();
        let predicted = trained.predict();
        assert!(predicted[[0, 0]] > predicted[[0, 2]]);
        assert!(predicted[[2, 3]] > predicted[[2, 1]]);
        assert!(trained.final_loss.is_finite());
    }

    #[test]
    fn test_als_all_zero_matrix() {
        let interactions = Array2::<f32>::zeros((3, 3));

        let trained = small_als().train(interactions.view()).unwrap();
        assert!(trained.final_loss.is_finite());
        assert!(trained.user_factors.iter().all(|v| *v == 0.0));
    }
}
