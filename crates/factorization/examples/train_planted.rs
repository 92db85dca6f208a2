//! Example: Train latent factors on a planted low-rank matrix
//!
//! Run with: cargo run --package factorization --example train_planted
//!
//! This example shows how to:
//! 1. Build a synthetic users × posts matrix with a known rank-3 structure
//! 2. Train it with the gradient trainer on the host and parallel backends
//! 3. Train it with implicit ALS
//! 4. Score every run with the offline evaluator

use factorization::{
    AlsConfig, BackendKind, EvaluationConfig, OfflineEvaluator, Regularization, TrainerConfig,
    TrainerKind, build_trainer,
};
use ndarray::Array2;
use std::time::Instant;

fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt().with_env_filter("info").init();

    println!("=== Post Recommendation Factorization Example ===\n");

    // Users 0..60 prefer one of three post clusters
    let (users, posts) = (60, 90);
    let interactions = Array2::from_shape_fn((users, posts), |(u, p)| {
        if u % 3 == p % 3 && (u + p) % 4 != 0 {
            0.5 + ((u * 7 + p) % 5) as f32 * 0.1
        } else {
            0.0
        }
    });
    let observed = interactions.iter().filter(|&&v| v > 0.0).count();
    println!("Matrix: {} users x {} posts, {} observed cells\n", users, posts, observed);

    let gradient = TrainerConfig::quick()
        .with_n_factors(8)
        .with_epochs(300)
        .with_patience(20)
        .with_regularization(Regularization::squared(1e-4))
        .with_seed(7);
    let als = AlsConfig::default().with_n_factors(8).with_iterations(15).with_seed(7);
    let evaluator = OfflineEvaluator::new(EvaluationConfig::default().with_k(5).with_seed(7));

    let runs = [
        ("gradient / host", TrainerKind::Gradient, BackendKind::Host),
        ("gradient / parallel", TrainerKind::Gradient, BackendKind::Parallel { threads: None }),
        ("als", TrainerKind::Als, BackendKind::Host),
    ];

    for (label, kind, backend) in runs {
        let trainer = build_trainer(kind, gradient.clone().with_backend(backend), als.clone())?;

        let start = Instant::now();
        let trained = trainer.train(interactions.view())?;
        let elapsed = start.elapsed();

        let metrics = evaluator.evaluate_trained(&trained, interactions.view());
        println!("{}:", label);
        println!("  Trained in {:?} ({} epochs, loss {:.6})", elapsed, trained.epochs_run, trained.final_loss);
        println!("  {}", metrics);
        println!();
    }

    Ok(())
}
