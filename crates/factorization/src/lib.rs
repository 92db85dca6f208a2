//! # Factorization Crate
//!
//! Collaborative filtering core of the post recommendation trainer: learns
//! user and post latent factors from a dense interaction matrix and scores
//! them with an offline holdout protocol.
//!
//! ## Main Components
//!
//! - **config**: Trainer presets (`quick`, `full`), ALS and evaluation settings
//! - **backend**: Host and rayon-pool execution backends with host fallback
//! - **optimizer**: Adam with step-decayed learning rate
//! - **trainer**: Masked-MSE gradient trainer
//! - **als**: Implicit-feedback alternating least squares trainer
//! - **evaluation**: Holdout sampling, RMSE and top-k ranking metrics
//! - **metrics**: Metric records and ranking helpers
//!
//! ## Example Usage
//!
//! ```ignore
//! use factorization::{FactorTrainer, GradientTrainer, OfflineEvaluator, TrainerConfig};
//!
//! let trainer = GradientTrainer::new(TrainerConfig::quick().with_seed(42))?;
//! let trained = trainer.train(matrix.view())?;
//! let metrics = OfflineEvaluator::default().evaluate_trained(&trained, matrix.view());
//! println!("{}", metrics);
//! ```

pub mod als;
pub mod backend;
pub mod config;
pub mod error;
pub mod evaluation;
pub mod metrics;
pub mod optimizer;
pub mod trainer;
pub mod traits;

pub use als::AlsTrainer;
pub use backend::{ExecutionBackend, HostBackend, ParallelBackend, select_backend};
pub use config::{
    AlsConfig, BackendKind, EvaluationConfig, Regularization, RegularizationKind, StepDecay,
    TrainerConfig, TrainerKind,
};
pub use error::{FactorizationError, Result};
pub use evaluation::{Holdout, OfflineEvaluator, holdout_size, reconstruct, sample_holdout};
pub use metrics::{MetricsRecord, RankingAccumulator, RankingSummary, f1_score, top_k_indices};
pub use trainer::GradientTrainer;
pub use traits::{FactorTrainer, TrainedFactors, build_trainer};
