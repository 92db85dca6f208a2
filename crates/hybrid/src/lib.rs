//! # Hybrid Crate
//!
//! Orchestrates the offline training job: collaborative filtering on the
//! user × post interactions, content-based business similarity, affinity
//! tables and the economic context, combined into one [`HybridModel`].
//!
//! ## Main Components
//!
//! - **config**: Run settings (variant, trainer, backend, evaluation cutoffs)
//! - **orchestrator**: [`HybridTrainer`] training and evaluation
//! - **model**: [`HybridModel`], model info and the evaluation report
//! - **persistence**: [`ModelStore`] JSON artifacts
//!
//! ## Example Usage
//!
//! ```ignore
//! use hybrid::{HybridConfig, HybridTrainer, ModelStore};
//!
//! let trainer = HybridTrainer::new(HybridConfig::default().with_seed(42));
//! let model = trainer.train(&data)?;
//! let report = trainer.evaluate(&model, &data);
//!
//! let store = ModelStore::new("models");
//! store.save_model(&model)?;
//! store.save_metrics(&report)?;
//! ```

pub mod config;
pub mod model;
pub mod orchestrator;
pub mod persistence;

pub use config::{HybridConfig, TrainingVariant};
pub use model::{DataSize, EvaluationReport, HybridModel, IdMaps, ModelInfo};
pub use orchestrator::{HybridTrainer, hybrid_score};
pub use persistence::ModelStore;
