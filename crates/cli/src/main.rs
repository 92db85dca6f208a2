use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use colored::Colorize;
use data_loader::{DataSource, TrainingData};
use factorization::{BackendKind, EvaluationConfig, MetricsRecord, OfflineEvaluator, TrainerKind};
use hybrid::{EvaluationReport, HybridConfig, HybridModel, HybridTrainer, ModelStore, TrainingVariant};
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::info;

/// Hybrid post recommendation trainer
#[derive(Parser)]
#[command(name = "hybrid-train")]
#[command(about = "Train and evaluate the hybrid post recommendation model", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Train every component, evaluate it and save the artifacts
    Train {
        /// Directory with the processed CSV exports
        #[arg(long, default_value = "data/processed")]
        data_dir: PathBuf,

        /// Where the model artifacts are written
        #[arg(long, default_value = "models")]
        models_dir: PathBuf,

        #[arg(long, value_enum, default_value_t = Variant::Quick)]
        variant: Variant,

        #[arg(long, value_enum, default_value_t = Trainer::Gradient)]
        trainer: Trainer,

        #[arg(long, value_enum, default_value_t = Backend::Host)]
        backend: Backend,

        /// Threads of the parallel backend (default: rayon's choice)
        #[arg(long)]
        threads: Option<usize>,

        /// Seed for initialization and the evaluation holdout
        #[arg(long)]
        seed: Option<u64>,
    },

    /// Re-run the offline evaluation of a saved collaborative filtering model
    Evaluate {
        #[arg(long, default_value = "data/processed")]
        data_dir: PathBuf,

        #[arg(long, default_value = "models")]
        models_dir: PathBuf,

        /// Ranking cutoff
        #[arg(long, default_value = "10")]
        k: usize,

        /// Fraction of each user's interactions to hold out
        #[arg(long, default_value = "0.2")]
        test_fraction: f64,

        #[arg(long)]
        seed: Option<u64>,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum Variant {
    Quick,
    Full,
}

#[derive(Clone, Copy, ValueEnum)]
enum Trainer {
    Gradient,
    Als,
}

#[derive(Clone, Copy, ValueEnum)]
enum Backend {
    Host,
    Parallel,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Train {
            data_dir,
            models_dir,
            variant,
            trainer,
            backend,
            threads,
            seed,
        } => {
            let mut config = HybridConfig::default()
                .with_variant(match variant {
                    Variant::Quick => TrainingVariant::Quick,
                    Variant::Full => TrainingVariant::Full,
                })
                .with_trainer(match trainer {
                    Trainer::Gradient => TrainerKind::Gradient,
                    Trainer::Als => TrainerKind::Als,
                })
                .with_backend(match backend {
                    Backend::Host => BackendKind::Host,
                    Backend::Parallel => BackendKind::Parallel { threads },
                });
            if let Some(seed) = seed {
                config = config.with_seed(seed);
            }
            handle_train(&data_dir, &models_dir, config)
        }
        Commands::Evaluate {
            data_dir,
            models_dir,
            k,
            test_fraction,
            seed,
        } => {
            let mut config = EvaluationConfig::default()
                .with_k(k)
                .with_test_fraction(test_fraction);
            if let Some(seed) = seed {
                config = config.with_seed(seed);
            }
            handle_evaluate(&data_dir, &models_dir, config)
        }
    }
}

fn load_data(data_dir: &Path) -> Result<TrainingData> {
    println!("Loading processed data from {}...", data_dir.display());
    let start = Instant::now();
    let data = TrainingData::load_or_dummy(data_dir)
        .with_context(|| format!("Failed to load training data from {}", data_dir.display()))?;

    let (users, posts, interactions, businesses) = data.counts();
    let source = match data.source {
        DataSource::Processed => "processed files".normal(),
        DataSource::Dummy => "dummy data".yellow(),
    };
    println!(
        "{} Loaded {} users, {} posts, {} interactions, {} businesses from {} in {:?}",
        "✓".green(),
        users,
        posts,
        interactions,
        businesses,
        source,
        start.elapsed()
    );
    Ok(data)
}

/// Handle the 'train' command
fn handle_train(data_dir: &Path, models_dir: &Path, config: HybridConfig) -> Result<()> {
    let data = load_data(data_dir)?;

    let start = Instant::now();
    let trainer = HybridTrainer::new(config);
    let model = trainer.train(&data).context("Hybrid training failed")?;
    println!("{} Trained hybrid model in {:?}", "✓".green(), start.elapsed());

    let report = trainer.evaluate(&model, &data);

    let store = ModelStore::new(models_dir);
    store.save_model(&model)?;
    let metrics_path = store.save_metrics(&report)?;
    info!("Artifacts written to {}", models_dir.display());

    print_summary(&model, &report);
    println!(
        "\n{} Model saved to {} (metrics: {})",
        "✓".green(),
        models_dir.display(),
        metrics_path.display()
    );
    Ok(())
}

/// Handle the 'evaluate' command
fn handle_evaluate(data_dir: &Path, models_dir: &Path, config: EvaluationConfig) -> Result<()> {
    let data = load_data(data_dir)?;

    let store = ModelStore::new(models_dir);
    let factors = store
        .load_cf_model()
        .context("No saved collaborative filtering model, run `train` first")?;
    let id_maps = store.load_id_maps()?;
    let interactions = id_maps.align(&data.interaction_matrix);

    let metrics = OfflineEvaluator::new(config).evaluate_trained(&factors, interactions.view());

    println!("{}", "Collaborative Filtering Evaluation:".bold().blue());
    print_metrics(&metrics);
    Ok(())
}

/// One line per metric, in name order
fn metric_lines(metrics: &MetricsRecord) -> Vec<String> {
    metrics
        .iter()
        .map(|(name, value)| format!("{}{}: {:.4}", "• ".green(), name, value))
        .collect()
}

fn print_metrics(metrics: &MetricsRecord) {
    for line in metric_lines(metrics) {
        println!("{}", line);
    }
}

/// Helper function to print the training summary
fn print_summary(model: &HybridModel, report: &EvaluationReport) {
    let info = &model.info;
    println!("\n{}", "Hybrid Post Recommendation Model".bold().blue());
    println!("{}Variant: {}", "• ".green(), info.variant);
    println!(
        "{}Collaborative filtering: {} on {} ({} factors, {} epochs, loss {:.6})",
        "• ".green(),
        info.trainer,
        info.backend,
        model.cf.n_factors(),
        info.epochs_run,
        info.final_loss
    );
    println!(
        "{}Business similarity: {} businesses",
        "• ".green(),
        model.business_similarity.len()
    );
    println!(
        "{}Economic context: {}-{:02} (winter tourism: {}, ramadan: {})",
        "• ".green(),
        model.economic_context.reference_year,
        model.economic_context.reference_month,
        model.economic_context.is_winter_tourism_season,
        model.economic_context.is_ramadan_season
    );

    println!("\n{}", "Collaborative Filtering Metrics:".bold());
    print_metrics(&report.collaborative_filtering);
    println!("\n{}", "Company Recommendation Metrics:".bold());
    print_metrics(&report.company_recommendations);

    println!(
        "\n{}Hybrid score: {}",
        "• ".cyan(),
        format!("{:.4}", report.hybrid_score).bold().green()
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_each_metric_printed_once() {
        let lines = metric_lines(&MetricsRecord::zeroed(10));

        assert_eq!(lines.len(), 4);
        assert_eq!(lines.iter().filter(|l| l.contains("f1@10")).count(), 1);
        assert!(lines.iter().any(|l| l.ends_with("rmse: 0.0000")));
    }
}
