//! Masked-MSE matrix factorization trained with Adam.
//!
//! ## Algorithm
//! 1. Draw `U` (users × k) and `V` (k × items) from a standard normal,
//!    optionally scaled by `1/sqrt(k)`
//! 2. Each epoch:
//!    - `P = U @ V`
//!    - residual `E = P - R` on cells with `R > 0` (all cells when nothing is
//!      observed), `mse = ‖E‖² / n`
//!    - add the factor penalty, differentiate analytically:
//!      `∂U = (2/n)·E·Vᵀ + ∂reg`, `∂V = (2/n)·Uᵀ·E + ∂reg`
//!    - one Adam step on both matrices
//! 3. Stop early after `patience` epochs without a new best loss
//!
//! The matrix products and the residual run on the configured
//! [`ExecutionBackend`].

use crate::backend::{ExecutionBackend, select_backend};
use crate::config::{RegularizationKind, TrainerConfig};
use crate::error::{FactorizationError, Result};
use crate::optimizer::Adam;
use crate::traits::{FactorTrainer, TrainedFactors, validate_interactions};
use ndarray::{Array2, ArrayView2};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::StandardNormal;
use tracing::{debug, info, instrument, warn};

/// Gradient-descent factor trainer
pub struct GradientTrainer {
    config: TrainerConfig,
    backend: Box<dyn ExecutionBackend>,
}

/// Loss of one forward pass and the gradients of both factor matrices
struct Step {
    loss: f32,
    grad_users: Array2<f32>,
    grad_items: Array2<f32>,
}

impl GradientTrainer {
    /// Create a trainer, bringing up the configured backend
    pub fn new(config: TrainerConfig) -> Result<Self> {
        config.validate()?;
        let backend = select_backend(config.backend);
        info!(
            "Gradient trainer: k={}, epochs={}, backend={}",
            config.n_factors,
            config.epochs,
            backend.name()
        );
        Ok(Self { config, backend })
    }

    /// Create a trainer on an explicit backend
    pub fn with_backend(config: TrainerConfig, backend: Box<dyn ExecutionBackend>) -> Result<Self> {
        config.validate()?;
        Ok(Self { config, backend })
    }

    pub fn config(&self) -> &TrainerConfig {
        &self.config
    }

    pub fn backend_name(&self) -> &str {
        self.backend.name()
    }

    fn initialize(&self, users: usize, items: usize, rng: &mut StdRng) -> (Array2<f32>, Array2<f32>) {
        let k = self.config.n_factors;
        let scale = if self.config.xavier_init {
            1.0 / (k as f32).sqrt()
        } else {
            1.0
        };
        let mut draw = || rng.sample::<f32, _>(StandardNormal) * scale;
        let user_factors = Array2::from_shape_simple_fn((users, k), &mut draw);
        let item_factors = Array2::from_shape_simple_fn((k, items), &mut draw);
        (user_factors, item_factors)
    }

    fn forward(
        &self,
        target: ArrayView2<'_, f32>,
        user_factors: &Array2<f32>,
        item_factors: &Array2<f32>,
        observed: usize,
    ) -> Step {
        let observed_only = observed > 0;
        let n = (if observed_only { observed } else { target.len() }) as f32;

        let predicted = self.backend.matmul(user_factors.view(), item_factors.view());
        let (residual, sse) = self.backend.masked_residual(&predicted, target, observed_only);
        let mse = (sse / n as f64) as f32;

        let grad_pred = residual * (2.0 / n);
        let mut grad_users = self.backend.matmul(grad_pred.view(), item_factors.t());
        let mut grad_items = self.backend.matmul(user_factors.t(), grad_pred.view());

        let lambda = self.config.regularization.lambda;
        let penalty = match self.config.regularization.kind {
            RegularizationKind::Norm => {
                let user_norm = frobenius(user_factors);
                let item_norm = frobenius(item_factors);
                if user_norm > 0.0 {
                    grad_users.scaled_add(lambda / user_norm, user_factors);
                }
                if item_norm > 0.0 {
                    grad_items.scaled_add(lambda / item_norm, item_factors);
                }
                lambda * (user_norm + item_norm)
            }
            RegularizationKind::SquaredNorm => {
                grad_users.scaled_add(2.0 * lambda, user_factors);
                grad_items.scaled_add(2.0 * lambda, item_factors);
                lambda * (squared_sum(user_factors) + squared_sum(item_factors))
            }
        };

        Step {
            loss: mse + penalty,
            grad_users,
            grad_items,
        }
    }
}

impl FactorTrainer for GradientTrainer {
    fn name(&self) -> &str {
        "gradient"
    }

    #[instrument(skip_all, fields(shape = ?interactions.dim(), k = self.config.n_factors))]
    fn train(&self, interactions: ArrayView2<'_, f32>) -> Result<TrainedFactors> {
        validate_interactions(interactions)?;
        let (users, items) = interactions.dim();

        let observed = interactions.iter().filter(|&&v| v > 0.0).count();
        if observed == 0 {
            warn!("No observed interactions, falling back to MSE over all cells");
        }

        let mut rng = seeded_rng(self.config.seed);
        let (mut user_factors, mut item_factors) = self.initialize(users, items, &mut rng);
        let mut optimizer = Adam::new(
            &[user_factors.dim(), item_factors.dim()],
            self.config.learning_rate,
            self.config.weight_decay,
        );

        let mut best_loss = f32::INFINITY;
        let mut stale_epochs = 0;
        let mut loss_history = Vec::with_capacity(self.config.epochs);

        for epoch in 0..self.config.epochs {
            if let Some(schedule) = &self.config.lr_schedule {
                optimizer.set_learning_rate(schedule.learning_rate(self.config.learning_rate, epoch));
            }

            let step = self.forward(interactions, &user_factors, &item_factors, observed);
            if !step.loss.is_finite() {
                return Err(FactorizationError::Numerical(format!(
                    "loss became {} at epoch {}",
                    step.loss,
                    epoch + 1
                )));
            }

            optimizer.step(
                &mut [&mut user_factors, &mut item_factors],
                &[step.grad_users, step.grad_items],
            );
            loss_history.push(step.loss);

            if self.config.log_every > 0 && epoch % self.config.log_every == 0 {
                info!(
                    "Epoch {}/{}: loss={:.4}, lr={:.5}",
                    epoch + 1,
                    self.config.epochs,
                    step.loss,
                    optimizer.learning_rate()
                );
            }

            if step.loss < best_loss {
                best_loss = step.loss;
                stale_epochs = 0;
            } else {
                stale_epochs += 1;
                if stale_epochs >= self.config.patience {
                    info!("Early stopping at epoch {}", epoch + 1);
                    break;
                }
            }
        }

        if loss_history.is_empty() {
            // Zero epoch budget: report the loss of the initialization
            best_loss = self
                .forward(interactions, &user_factors, &item_factors, observed)
                .loss;
        }

        debug!(
            "Training finished after {} epochs, best loss {:.6}",
            loss_history.len(),
            best_loss
        );

        Ok(TrainedFactors {
            user_factors,
            item_factors,
            final_loss: best_loss,
            epochs_run: loss_history.len(),
            loss_history,
            trainer: self.name().to_string(),
            backend: self.backend.name().to_string(),
        })
    }
}

pub(crate) fn seeded_rng(seed: Option<u64>) -> StdRng {
    match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_os_rng(),
    }
}

fn frobenius(matrix: &Array2<f32>) -> f32 {
    squared_sum(matrix).sqrt()
}

fn squared_sum(matrix: &Array2<f32>) -> f32 {
    matrix.iter().map(|&x| x * x).sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::HostBackend;
    use crate::config::Regularization;
    use ndarray::array;

    fn small_config() -> TrainerConfig {
        TrainerConfig::quick().with_n_factors(2).with_seed(7)
    }

    #[test]
    fn test_output_shapes() {
        let trainer = GradientTrainer::new(small_config().with_epochs(3)).unwrap();
        let interactions = Array2::<f32>::from_elem((4, 5), 0.5);

        let trained = trainer.train(interactions.view()).unwrap();
        assert_eq!(trained.user_factors.dim(), (4, 2));
        assert_eq!(trained.item_factors.dim(), (2, 5));
        assert_eq!(trained.epochs_run, 3);
        assert_eq!(trained.loss_history.len(), 3);
        assert_eq!(trained.backend, "host");
    }

    #[test]
    fn test_seeded_runs_are_reproducible() {
        let interactions = array![[1.0f32, 0.0, 0.5], [0.0, 0.3, 0.0]];
        let trainer = GradientTrainer::new(small_config().with_epochs(10)).unwrap();

        let a = trainer.train(interactions.view()).unwrap();
        let b = trainer.train(interactions.view()).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_zero_epochs_returns_initialization_loss() {
        let trainer = GradientTrainer::new(small_config().with_epochs(0)).unwrap();
        let interactions = array![[1.0f32, 0.0], [0.0, 1.0]];

        let trained = trainer.train(interactions.view()).unwrap();
        assert_eq!(trained.epochs_run, 0);
        assert!(trained.loss_history.is_empty());
        assert!(trained.final_loss.is_finite());
        assert!(trained.final_loss > 0.0);
    }

    #[test]
    fn test_final_loss_is_best_of_history() {
        let trainer = GradientTrainer::new(small_config().with_epochs(30)).unwrap();
        let interactions = array![[0.8f32, 0.0, 0.2], [0.0, 0.9, 0.0], [0.1, 0.0, 0.7]];

        let trained = trainer.train(interactions.view()).unwrap();
        let min = trained
            .loss_history
            .iter()
            .copied()
            .fold(f32::INFINITY, f32::min);
        assert_eq!(trained.final_loss, min);
    }

    #[test]
    fn test_early_stopping_with_zero_learning_signal() {
        // A vanishing learning rate leaves the loss flat
        let config = small_config()
            .with_epochs(50)
            .with_patience(2)
            .with_learning_rate(1e-12)
            .with_regularization(Regularization::squared(0.0));
        let trainer = GradientTrainer::with_backend(config, Box::new(HostBackend)).unwrap();
        let interactions = Array2::<f32>::zeros((2, 2));

        let trained = trainer.train(interactions.view()).unwrap();
        assert!(trained.epochs_run < 50);
    }

    #[test]
    fn test_rejects_negative_cells() {
        let trainer = GradientTrainer::new(small_config()).unwrap();
        let interactions = array![[1.0f32, -1.0]];

        assert!(matches!(
            trainer.train(interactions.view()),
            Err(FactorizationError::DataShape(_))
        ));
    }

    #[test]
    fn test_rejects_zero_factors() {
        assert!(GradientTrainer::new(TrainerConfig::quick().with_n_factors(0)).is_err());
    }

    #[test]
    fn test_norm_penalty_gradient_skips_zero_norm() {
        let config = small_config().with_regularization(Regularization::norm(0.5));
        let trainer = GradientTrainer::new(config).unwrap();
        let target = Array2::<f32>::zeros((2, 2));
        let zeros_u = Array2::<f32>::zeros((2, 2));
        let zeros_v = Array2::<f32>::zeros((2, 2));

        let step = trainer.forward(target.view(), &zeros_u, &zeros_v, 0);
        assert_eq!(step.loss, 0.0);
        assert!(step.grad_users.iter().all(|g| g.is_finite() && *g == 0.0));
        assert!(step.grad_items.iter().all(|g| g.is_finite() && *g == 0.0));
    }
}
