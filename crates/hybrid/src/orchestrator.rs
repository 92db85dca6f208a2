//! Training and evaluation of the hybrid model.
//!
//! ## Algorithm
//! 1. Train the collaborative filtering factors with the configured trainer
//! 2. Fit business similarity on the business profiles
//! 3. Build the business–post and business–product affinity tables
//! 4. Derive the economic context for the reference month
//!
//! Evaluation scores the CF component with the offline holdout protocol and
//! the business component with same-category ground truth, then averages
//! their F1 values into a single hybrid score.

use crate::config::HybridConfig;
use crate::model::{COMPONENTS, DataSize, EvaluationReport, HybridModel, IdMaps, MODEL_TYPE, ModelInfo};
use anyhow::{Context, Result};
use chrono::Utc;
use content::{
    BusinessSimilarity, EconomicContext, business_post_affinity, business_product_affinity,
    evaluate_business_recommendations,
};
use data_loader::TrainingData;
use factorization::{MetricsRecord, OfflineEvaluator, build_trainer};
use tracing::{info, instrument};

/// Runs every stage of the hybrid training job
pub struct HybridTrainer {
    config: HybridConfig,
}

impl HybridTrainer {
    pub fn new(config: HybridConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &HybridConfig {
        &self.config
    }

    /// Train all components on an in-memory dataset
    #[instrument(skip_all, fields(variant = %self.config.variant, trainer = ?self.config.trainer))]
    pub fn train(&self, data: &TrainingData) -> Result<HybridModel> {
        let (users, posts, interactions, businesses) = data.counts();
        info!(
            "Training hybrid model on {} users, {} posts, {} interactions, {} businesses",
            users, posts, interactions, businesses
        );

        let trainer = build_trainer(
            self.config.trainer,
            self.config.trainer_config(),
            self.config.als_config(),
        )
        .context("Failed to build the collaborative filtering trainer")?;
        let cf = trainer
            .train(data.interaction_matrix.view())
            .context("Collaborative filtering training failed")?;
        info!(
            "Collaborative filtering trained with {} on {}: loss {:.6} after {} epochs",
            cf.trainer, cf.backend, cf.final_loss, cf.epochs_run
        );

        let business_similarity = BusinessSimilarity::fit(&data.businesses)
            .context("Failed to fit business similarity")?;
        let business_posts = business_post_affinity(&data.company_posts);
        let business_products = business_product_affinity(&data.businesses, &data.products);

        let economic_context = match self.config.reference_month {
            Some((year, month)) => EconomicContext::from_indicators(&data.economic, year, month),
            None => EconomicContext::for_today(&data.economic),
        }
        .context("Failed to build the economic context")?;

        let info = ModelInfo {
            model_type: MODEL_TYPE.to_string(),
            components: COMPONENTS.iter().map(|c| c.to_string()).collect(),
            training_date: Utc::now(),
            data_size: DataSize {
                users,
                posts,
                interactions,
                businesses,
            },
            data_source: data.source,
            variant: self.config.variant,
            trainer: cf.trainer.clone(),
            backend: cf.backend.clone(),
            final_loss: cf.final_loss,
            epochs_run: cf.epochs_run,
        };

        Ok(HybridModel {
            cf,
            id_maps: IdMaps::from_matrix(&data.interaction_matrix),
            business_similarity,
            business_posts,
            business_products,
            economic_context,
            info,
        })
    }

    /// Score both components of a trained model against `data`
    #[instrument(skip_all)]
    pub fn evaluate(&self, model: &HybridModel, data: &TrainingData) -> EvaluationReport {
        let evaluator = OfflineEvaluator::new(self.config.evaluation_config());
        let interactions = model.id_maps.align(&data.interaction_matrix);
        let collaborative_filtering = evaluator.evaluate_trained(&model.cf, interactions.view());

        let company_recommendations =
            evaluate_business_recommendations(&model.business_similarity, self.config.business_k);

        let hybrid_score = hybrid_score(
            &collaborative_filtering,
            evaluator.config().k,
            &company_recommendations,
            self.config.business_k,
        );
        info!("Hybrid score: {:.4}", hybrid_score);

        EvaluationReport {
            collaborative_filtering,
            company_recommendations,
            hybrid_score,
            timestamp: Utc::now(),
        }
    }
}

impl Default for HybridTrainer {
    fn default() -> Self {
        Self::new(HybridConfig::default())
    }
}

/// Mean of the two F1 values; a missing value counts as 0
pub fn hybrid_score(
    cf: &MetricsRecord,
    cf_k: usize,
    business: &MetricsRecord,
    business_k: usize,
) -> f64 {
    let cf_f1 = cf.f1_at(cf_k).unwrap_or(0.0);
    let business_f1 = business.f1_at(business_k).unwrap_or(0.0);
    (cf_f1 + business_f1) / 2.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TrainingVariant;
    use data_loader::dummy::create_dummy_data;
    use factorization::{RankingSummary, TrainerKind};

    fn record(k: usize, f1: f64) -> MetricsRecord {
        let mut record = MetricsRecord::new();
        record.insert_ranking(
            k,
            &RankingSummary {
                precision: f1,
                recall: f1,
                f1,
                evaluated: 1,
            },
        );
        record
    }

    #[test]
    fn test_hybrid_score_averages_f1() {
        let score = hybrid_score(&record(10, 0.4), 10, &record(5, 0.2), 5);
        assert!((score - 0.3).abs() < 1e-12);

        let missing = hybrid_score(&MetricsRecord::new(), 10, &record(5, 0.2), 5);
        assert!((missing - 0.1).abs() < 1e-12);
    }

    #[test]
    fn test_train_on_dummy_data() {
        let data = create_dummy_data().unwrap();
        let trainer = HybridTrainer::new(
            HybridConfig::default()
                .with_seed(42)
                .with_reference_month(2025, 3),
        );

        let model = trainer.train(&data).unwrap();

        assert_eq!(model.cf.n_users(), 3);
        assert_eq!(model.cf.n_items(), 3);
        assert_eq!(model.cf.n_factors(), 32);
        assert!(model.cf.final_loss.is_finite());
        assert_eq!(model.business_similarity.len(), 3);
        assert_eq!(model.business_posts.len(), 3);
        assert!(model.economic_context.is_ramadan_season);
        assert_eq!(model.info.model_type, MODEL_TYPE);
        assert_eq!(model.info.components.len(), 3);
        assert_eq!(model.info.variant, TrainingVariant::Quick);
        assert!(model.score("1001", 2).is_some());
        assert!(model.score("unknown", 2).is_none());
    }

    #[test]
    fn test_als_trainer_is_selectable() {
        let data = create_dummy_data().unwrap();
        let trainer = HybridTrainer::new(
            HybridConfig::default()
                .with_trainer(TrainerKind::Als)
                .with_seed(1)
                .with_reference_month(2024, 6),
        );

        let model = trainer.train(&data).unwrap();
        assert_eq!(model.info.trainer, "als");
    }

    #[test]
    fn test_evaluate_dummy_model() {
        let data = create_dummy_data().unwrap();
        let trainer = HybridTrainer::new(
            HybridConfig::default()
                .with_seed(42)
                .with_reference_month(2025, 3),
        );
        let model = trainer.train(&data).unwrap();

        let report = trainer.evaluate(&model, &data);

        // Dummy users have one interaction each: no holdout, zero metrics
        assert_eq!(report.collaborative_filtering.rmse(), Some(0.0));
        assert_eq!(report.company_recommendations.get("category_coverage"), Some(1.0));
        assert!((0.0..=1.0).contains(&report.hybrid_score));
    }
}
