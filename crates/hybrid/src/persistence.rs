//! JSON artifact store for trained hybrid models.
//!
//! Layout under the models directory:
//!
//! ```text
//! models/
//! ├── cf_model.json
//! ├── id_maps.json
//! ├── business_similarity.json
//! ├── economic_context.json
//! ├── business_post_affinity.json
//! ├── business_product_affinity.json
//! ├── model_info.json
//! └── metrics/
//!     └── evaluation_metrics.json
//! ```

use crate::model::{EvaluationReport, HybridModel, IdMaps, ModelInfo};
use anyhow::{Context, Result};
use factorization::TrainedFactors;
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info, instrument};

pub const CF_MODEL_FILE: &str = "cf_model.json";
pub const ID_MAPS_FILE: &str = "id_maps.json";
pub const BUSINESS_SIMILARITY_FILE: &str = "business_similarity.json";
pub const ECONOMIC_CONTEXT_FILE: &str = "economic_context.json";
pub const BUSINESS_POST_AFFINITY_FILE: &str = "business_post_affinity.json";
pub const BUSINESS_PRODUCT_AFFINITY_FILE: &str = "business_product_affinity.json";
pub const MODEL_INFO_FILE: &str = "model_info.json";
pub const METRICS_DIR: &str = "metrics";
pub const EVALUATION_METRICS_FILE: &str = "evaluation_metrics.json";

/// Reads and writes model artifacts below one directory
#[derive(Debug, Clone)]
pub struct ModelStore {
    root: PathBuf,
}

impl ModelStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn metrics_path(&self) -> PathBuf {
        self.root.join(METRICS_DIR).join(EVALUATION_METRICS_FILE)
    }

    /// Write every artifact of a trained model
    #[instrument(skip_all, fields(root = %self.root.display()))]
    pub fn save_model(&self, model: &HybridModel) -> Result<()> {
        fs::create_dir_all(&self.root)
            .with_context(|| format!("Failed to create models directory {}", self.root.display()))?;

        write_json(&self.root.join(CF_MODEL_FILE), &model.cf)?;
        write_json(&self.root.join(ID_MAPS_FILE), &model.id_maps)?;
        write_json(&self.root.join(BUSINESS_SIMILARITY_FILE), &model.business_similarity)?;
        write_json(&self.root.join(ECONOMIC_CONTEXT_FILE), &model.economic_context)?;
        write_json(&self.root.join(BUSINESS_POST_AFFINITY_FILE), &model.business_posts)?;
        write_json(&self.root.join(BUSINESS_PRODUCT_AFFINITY_FILE), &model.business_products)?;
        write_json(&self.root.join(MODEL_INFO_FILE), &model.info)?;

        info!("Saved hybrid model to {}", self.root.display());
        Ok(())
    }

    /// Write `metrics/evaluation_metrics.json`
    pub fn save_metrics(&self, report: &EvaluationReport) -> Result<PathBuf> {
        let path = self.metrics_path();
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir)
                .with_context(|| format!("Failed to create metrics directory {}", dir.display()))?;
        }
        write_json(&path, report)?;
        info!("Saved evaluation metrics to {}", path.display());
        Ok(path)
    }

    pub fn load_cf_model(&self) -> Result<TrainedFactors> {
        read_json(&self.root.join(CF_MODEL_FILE))
    }

    pub fn load_id_maps(&self) -> Result<IdMaps> {
        read_json(&self.root.join(ID_MAPS_FILE))
    }

    pub fn load_model_info(&self) -> Result<ModelInfo> {
        read_json(&self.root.join(MODEL_INFO_FILE))
    }

    pub fn load_metrics(&self) -> Result<EvaluationReport> {
        read_json(&self.metrics_path())
    }
}

fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<()> {
    let file = File::create(path).with_context(|| format!("Failed to create {}", path.display()))?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer_pretty(&mut writer, value)
        .with_context(|| format!("Failed to serialize {}", path.display()))?;
    writer
        .flush()
        .with_context(|| format!("Failed to write {}", path.display()))?;
    debug!("Wrote {}", path.display());
    Ok(())
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let file = File::open(path).with_context(|| format!("Failed to open {}", path.display()))?;
    serde_json::from_reader(BufReader::new(file))
        .with_context(|| format!("Failed to parse {}", path.display()))
}
