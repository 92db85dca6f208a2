//! End-to-end runs: processed files on disk → trained model → artifacts

use data_loader::{DataSource, TrainingData};
use factorization::{BackendKind, OfflineEvaluator};
use hybrid::{HybridConfig, HybridTrainer, ModelStore};
use std::fs;
use std::path::Path;
use tempfile::TempDir;

/// Eight users with seven interactions each, over ten posts
fn write_processed_dir(dir: &Path) {
    let mut interactions = String::from("UserID,PostID,InteractionScore\n");
    for user in 0..8 {
        for step in 0..7 {
            let post = (user + step * 3) % 10 + 1;
            let score = 0.5 + 0.05 * step as f32;
            interactions.push_str(&format!("u{},{},{}\n", user, post, score));
        }
    }
    fs::write(dir.join("user_post_interactions.csv"), interactions).unwrap();

    let companies = ["Nile Cotton", "Aswan Spice", "Red Sea Fish", "Delta Linen", "Sinai Herbs"];
    let mut posts = String::from("PostID,CompanyName,Industry,PostTitle,Engagement\n");
    for post in 1..=10 {
        let company = companies[(post - 1) % companies.len()];
        posts.push_str(&format!("{},{},Trade,Post {},{}\n", post, company, post, post * 10));
    }
    fs::write(dir.join("company_posts.csv"), posts).unwrap();

    fs::write(
        dir.join("business_features.csv"),
        "Business Name,Category,Trade Type,Business Size,Region\n\
         Nile Cotton,Textiles,Exporter,Large,Nile Delta\n\
         Delta Linen,Textiles,Exporter,Large,Nile Delta\n\
         Aswan Spice,Spices,Importer,Small,Upper Egypt\n\
         Sinai Herbs,Spices,Importer,Small,Sinai\n\
         Red Sea Fish,Seafood,Exporter,Medium,Red Sea\n",
    )
    .unwrap();

    let mut preferences =
        String::from("UserID,PreferredIndustries,PreferredSupplierType,PreferredOrderQuantity\n");
    for user in 0..8 {
        preferences.push_str(&format!("u{},Textiles,Exporter,Small orders\n", user));
    }
    fs::write(dir.join("user_preferences.csv"), preferences).unwrap();

    fs::write(
        dir.join("products.csv"),
        "StockCode,Description\n85123A,WHITE COTTON CUSHION\n22423,HERB TEA TIN\n",
    )
    .unwrap();
}

#[test]
fn test_train_evaluate_and_persist() {
    let data_dir = TempDir::new().unwrap();
    let models_dir = TempDir::new().unwrap();
    write_processed_dir(data_dir.path());

    let data = TrainingData::load_or_dummy(data_dir.path()).unwrap();
    assert_eq!(data.source, DataSource::Processed);

    let trainer = HybridTrainer::new(
        HybridConfig::default()
            .with_seed(11)
            .with_backend(BackendKind::Parallel { threads: Some(2) })
            .with_reference_month(2024, 7),
    );
    let model = trainer.train(&data).unwrap();
    let report = trainer.evaluate(&model, &data);

    // Every user has 7 observed cells: one test cell each
    assert!(report.collaborative_filtering.rmse().unwrap() > 0.0);
    for (_, value) in report.collaborative_filtering.iter() {
        assert!(value.is_finite());
    }
    for k in [10, 5] {
        let record = if k == 10 {
            &report.collaborative_filtering
        } else {
            &report.company_recommendations
        };
        assert!((0.0..=1.0).contains(&record.precision_at(k).unwrap()));
        assert!((0.0..=1.0).contains(&record.recall_at(k).unwrap()));
    }
    assert!(model.business_products["Nile Cotton"][0].stock_code == "85123A");

    let store = ModelStore::new(models_dir.path());
    store.save_model(&model).unwrap();
    store.save_metrics(&report).unwrap();

    let reloaded = store.load_cf_model().unwrap();
    assert_eq!(reloaded, model.cf);
    assert_eq!(store.load_id_maps().unwrap(), model.id_maps);
    assert_eq!(store.load_model_info().unwrap(), model.info);
    let metrics = store.load_metrics().unwrap();
    assert!((metrics.hybrid_score - report.hybrid_score).abs() < 1e-12);

    // A standalone evaluation with the same seed reproduces the CF metrics
    let evaluator = OfflineEvaluator::new(trainer.config().evaluation_config());
    let interactions = store.load_id_maps().unwrap().align(&data.interaction_matrix);
    let again = evaluator.evaluate_trained(&reloaded, interactions.view());
    assert_eq!(again, report.collaborative_filtering);
}

#[test]
fn test_missing_files_fall_back_to_dummy_data() {
    let empty = TempDir::new().unwrap();

    let data = TrainingData::load_or_dummy(empty.path()).unwrap();
    assert_eq!(data.source, DataSource::Dummy);

    let model = HybridTrainer::new(HybridConfig::default().with_seed(3).with_reference_month(2025, 2))
        .train(&data)
        .unwrap();
    assert_eq!(model.info.data_size.users, 3);
}
