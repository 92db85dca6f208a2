//! Settings of one hybrid training run.

use factorization::{AlsConfig, BackendKind, EvaluationConfig, TrainerConfig, TrainerKind};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Collaborative filtering preset
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrainingVariant {
    /// 32 factors, 50 epochs
    #[default]
    Quick,
    /// 128 factors, xavier init, step-decayed learning rate
    Full,
}

impl fmt::Display for TrainingVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TrainingVariant::Quick => write!(f, "quick"),
            TrainingVariant::Full => write!(f, "full"),
        }
    }
}

/// Configuration of [`crate::HybridTrainer`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HybridConfig {
    pub variant: TrainingVariant,
    pub trainer: TrainerKind,
    pub backend: BackendKind,
    /// Seeds factor initialization and the holdout draw
    pub seed: Option<u64>,
    /// Offline evaluation of the CF component
    pub evaluation: EvaluationConfig,
    /// Cutoff for business-to-business evaluation
    pub business_k: usize,
    /// `(year, month)` of the economic context; `None` uses today
    pub reference_month: Option<(i32, u32)>,
}

impl HybridConfig {
    pub fn with_variant(mut self, variant: TrainingVariant) -> Self {
        self.variant = variant;
        self
    }

    pub fn with_trainer(mut self, trainer: TrainerKind) -> Self {
        self.trainer = trainer;
        self
    }

    pub fn with_backend(mut self, backend: BackendKind) -> Self {
        self.backend = backend;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn with_evaluation(mut self, evaluation: EvaluationConfig) -> Self {
        self.evaluation = evaluation;
        self
    }

    pub fn with_business_k(mut self, business_k: usize) -> Self {
        self.business_k = business_k;
        self
    }

    pub fn with_reference_month(mut self, year: i32, month: u32) -> Self {
        self.reference_month = Some((year, month));
        self
    }

    /// Gradient trainer settings for the selected variant
    pub fn trainer_config(&self) -> TrainerConfig {
        let config = match self.variant {
            TrainingVariant::Quick => TrainerConfig::quick(),
            TrainingVariant::Full => TrainerConfig::full(),
        }
        .with_backend(self.backend);

        match self.seed {
            Some(seed) => config.with_seed(seed),
            None => config,
        }
    }

    /// ALS settings sharing the variant's latent dimension
    pub fn als_config(&self) -> AlsConfig {
        let config = AlsConfig::default().with_n_factors(self.trainer_config().n_factors);
        match self.seed {
            Some(seed) => config.with_seed(seed),
            None => config,
        }
    }

    /// Evaluation settings, inheriting the run seed when none is set
    pub fn evaluation_config(&self) -> EvaluationConfig {
        match (self.evaluation.seed, self.seed) {
            (None, Some(seed)) => self.evaluation.clone().with_seed(seed),
            _ => self.evaluation.clone(),
        }
    }
}

impl Default for HybridConfig {
    fn default() -> Self {
        Self {
            variant: TrainingVariant::Quick,
            trainer: TrainerKind::Gradient,
            backend: BackendKind::Host,
            seed: None,
            evaluation: EvaluationConfig::default(),
            business_k: 5,
            reference_month: None,
        }
    }
}
