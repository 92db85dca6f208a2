//! Hyperparameters for the trainers and the offline evaluator.
//!
//! Two gradient presets reproduce the two training variants of the job:
//!
//! | preset   | k   | epochs | init   | regularization     | lr schedule       | patience |
//! |----------|-----|--------|--------|--------------------|-------------------|----------|
//! | `quick`  | 32  | 50     | normal | 0.01 · (‖U‖+‖V‖)   | constant          | 5        |
//! | `full`   | 128 | 25     | xavier | 0.001 · (‖U‖²+‖V‖²)| ×0.75 every 5     | 3        |

use crate::error::{FactorizationError, Result};
use serde::{Deserialize, Serialize};

/// Which factor trainer to run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum TrainerKind {
    /// Masked-MSE gradient descent with Adam
    #[default]
    Gradient,
    /// Implicit-feedback alternating least squares
    Als,
}

/// Where the dense matrix products run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum BackendKind {
    /// Single-threaded ndarray on the calling thread
    #[default]
    Host,
    /// Row-parallel products on a dedicated rayon pool.
    /// `None` lets rayon pick the thread count.
    Parallel { threads: Option<usize> },
}

/// How the factor penalty is computed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RegularizationKind {
    /// `λ · (‖U‖ + ‖V‖)` with Frobenius norms
    Norm,
    /// `λ · (‖U‖² + ‖V‖²)`
    SquaredNorm,
}

/// Penalty added to the reconstruction loss
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Regularization {
    pub lambda: f32,
    pub kind: RegularizationKind,
}

impl Regularization {
    pub fn norm(lambda: f32) -> Self {
        Self {
            lambda,
            kind: RegularizationKind::Norm,
        }
    }

    pub fn squared(lambda: f32) -> Self {
        Self {
            lambda,
            kind: RegularizationKind::SquaredNorm,
        }
    }
}

/// Multiply the learning rate by `gamma` every `step_size` epochs
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StepDecay {
    pub step_size: usize,
    pub gamma: f32,
}

impl StepDecay {
    /// Learning rate in effect during `epoch` (zero-based)
    pub fn learning_rate(&self, base: f32, epoch: usize) -> f32 {
        if self.step_size == 0 {
            return base;
        }
        let decays = (epoch / self.step_size) as i32;
        base * self.gamma.powi(decays)
    }
}

impl Default for StepDecay {
    fn default() -> Self {
        Self {
            step_size: 5,
            gamma: 0.75,
        }
    }
}

/// Configuration of the gradient trainer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainerConfig {
    /// Latent dimension k
    pub n_factors: usize,
    /// Epoch budget (upper bound, early stopping may end sooner)
    pub epochs: usize,
    pub learning_rate: f32,
    /// L2 term added to every gradient by the optimizer
    pub weight_decay: f32,
    pub regularization: Regularization,
    /// Consecutive non-improving epochs tolerated before stopping
    pub patience: usize,
    /// Scale the normal initialization by `1/sqrt(k)`
    pub xavier_init: bool,
    pub lr_schedule: Option<StepDecay>,
    /// Seed for the factor initialization; `None` draws from the OS
    pub seed: Option<u64>,
    pub backend: BackendKind,
    /// Log progress every `log_every` epochs
    pub log_every: usize,
}

impl TrainerConfig {
    /// The fast variant: 32 factors, 50 epochs
    pub fn quick() -> Self {
        Self {
            n_factors: 32,
            epochs: 50,
            learning_rate: 0.01,
            weight_decay: 0.001,
            regularization: Regularization::norm(0.01),
            patience: 5,
            xavier_init: false,
            lr_schedule: None,
            seed: None,
            backend: BackendKind::Host,
            log_every: 10,
        }
    }

    /// The full variant: 128 factors, Xavier init, step-decayed learning rate
    pub fn full() -> Self {
        Self {
            n_factors: 128,
            epochs: 25,
            learning_rate: 0.01,
            weight_decay: 0.0,
            regularization: Regularization::squared(0.001),
            patience: 3,
            xavier_init: true,
            lr_schedule: Some(StepDecay::default()),
            seed: None,
            backend: BackendKind::Host,
            log_every: 1,
        }
    }

    /// Configure the latent dimension
    pub fn with_n_factors(mut self, n_factors: usize) -> Self {
        self.n_factors = n_factors;
        self
    }

    /// Configure the epoch budget
    pub fn with_epochs(mut self, epochs: usize) -> Self {
        self.epochs = epochs;
        self
    }

    pub fn with_learning_rate(mut self, learning_rate: f32) -> Self {
        self.learning_rate = learning_rate;
        self
    }

    pub fn with_weight_decay(mut self, weight_decay: f32) -> Self {
        self.weight_decay = weight_decay;
        self
    }

    pub fn with_regularization(mut self, regularization: Regularization) -> Self {
        self.regularization = regularization;
        self
    }

    /// Configure early stopping patience (default: 5 quick, 3 full)
    pub fn with_patience(mut self, patience: usize) -> Self {
        self.patience = patience;
        self
    }

    pub fn with_xavier_init(mut self, xavier_init: bool) -> Self {
        self.xavier_init = xavier_init;
        self
    }

    pub fn with_lr_schedule(mut self, schedule: Option<StepDecay>) -> Self {
        self.lr_schedule = schedule;
        self
    }

    /// Fix the initialization seed for reproducible runs
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn with_backend(mut self, backend: BackendKind) -> Self {
        self.backend = backend;
        self
    }

    pub fn with_log_every(mut self, log_every: usize) -> Self {
        self.log_every = log_every;
        self
    }

    /// Reject hyperparameters the trainer cannot work with
    pub fn validate(&self) -> Result<()> {
        if self.n_factors == 0 {
            return Err(FactorizationError::InvalidConfig(
                "n_factors must be at least 1".to_string(),
            ));
        }
        if !(self.learning_rate.is_finite() && self.learning_rate > 0.0) {
            return Err(FactorizationError::InvalidConfig(format!(
                "learning_rate must be positive, got {}",
                self.learning_rate
            )));
        }
        if !(self.weight_decay.is_finite() && self.weight_decay >= 0.0) {
            return Err(FactorizationError::InvalidConfig(format!(
                "weight_decay must be non-negative, got {}",
                self.weight_decay
            )));
        }
        if !(self.regularization.lambda.is_finite() && self.regularization.lambda >= 0.0) {
            return Err(FactorizationError::InvalidConfig(format!(
                "regularization lambda must be non-negative, got {}",
                self.regularization.lambda
            )));
        }
        if let Some(schedule) = &self.lr_schedule
            && !(schedule.gamma.is_finite() && schedule.gamma > 0.0)
        {
            return Err(FactorizationError::InvalidConfig(format!(
                "lr schedule gamma must be positive, got {}",
                schedule.gamma
            )));
        }
        Ok(())
    }
}

impl Default for TrainerConfig {
    fn default() -> Self {
        Self::quick()
    }
}

/// Configuration of the implicit-feedback ALS trainer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlsConfig {
    pub n_factors: usize,
    pub regularization: f64,
    pub iterations: usize,
    /// Confidence scale: `c = 1 + alpha * r`
    pub alpha: f64,
    pub seed: Option<u64>,
}

impl AlsConfig {
    pub fn with_n_factors(mut self, n_factors: usize) -> Self {
        self.n_factors = n_factors;
        self
    }

    pub fn with_iterations(mut self, iterations: usize) -> Self {
        self.iterations = iterations;
        self
    }

    pub fn with_regularization(mut self, regularization: f64) -> Self {
        self.regularization = regularization;
        self
    }

    pub fn with_alpha(mut self, alpha: f64) -> Self {
        self.alpha = alpha;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.n_factors == 0 {
            return Err(FactorizationError::InvalidConfig(
                "n_factors must be at least 1".to_string(),
            ));
        }
        if !(self.regularization.is_finite() && self.regularization > 0.0) {
            return Err(FactorizationError::InvalidConfig(format!(
                "ALS regularization must be positive, got {}",
                self.regularization
            )));
        }
        if !(self.alpha.is_finite() && self.alpha >= 0.0) {
            return Err(FactorizationError::InvalidConfig(format!(
                "alpha must be non-negative, got {}",
                self.alpha
            )));
        }
        Ok(())
    }
}

impl Default for AlsConfig {
    fn default() -> Self {
        Self {
            n_factors: 128,
            regularization: 0.05,
            iterations: 50,
            alpha: 1.0,
            seed: None,
        }
    }
}

/// Configuration of the offline evaluator
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationConfig {
    /// Fraction of each eligible user's observed cells to hold out
    pub test_fraction: f64,
    /// Ranking cutoff
    pub k: usize,
    pub seed: Option<u64>,
}

impl EvaluationConfig {
    pub fn with_test_fraction(mut self, test_fraction: f64) -> Self {
        self.test_fraction = test_fraction;
        self
    }

    pub fn with_k(mut self, k: usize) -> Self {
        self.k = k;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.k == 0 {
            return Err(FactorizationError::InvalidConfig(
                "k must be at least 1".to_string(),
            ));
        }
        if !(self.test_fraction > 0.0 && self.test_fraction <= 1.0) {
            return Err(FactorizationError::InvalidConfig(format!(
                "test_fraction must be in (0, 1], got {}",
                self.test_fraction
            )));
        }
        Ok(())
    }
}

impl Default for EvaluationConfig {
    fn default() -> Self {
        Self {
            test_fraction: 0.2,
            k: 10,
            seed: None,
        }
    }
}
