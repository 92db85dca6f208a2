//! Metric records and ranking helpers shared by the evaluators.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

pub const RMSE: &str = "rmse";
pub const CATEGORY_COVERAGE: &str = "category_coverage";

pub fn precision_key(k: usize) -> String {
    format!("precision@{k}")
}

pub fn recall_key(k: usize) -> String {
    format!("recall@{k}")
}

pub fn f1_key(k: usize) -> String {
    format!("f1@{k}")
}

/// Flat metric name → value map, serialized as a plain JSON object
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MetricsRecord {
    values: BTreeMap<String, f64>,
}

impl MetricsRecord {
    pub fn new() -> Self {
        Self::default()
    }

    /// `rmse`, `precision@k`, `recall@k`, `f1@k`, all zero
    pub fn zeroed(k: usize) -> Self {
        let mut record = Self::new();
        record.insert(RMSE, 0.0);
        record.insert_ranking(k, &RankingSummary::default());
        record
    }

    pub fn insert(&mut self, name: impl Into<String>, value: f64) {
        self.values.insert(name.into(), value);
    }

    /// Add `precision@k`, `recall@k` and `f1@k` from a ranking summary
    pub fn insert_ranking(&mut self, k: usize, summary: &RankingSummary) {
        self.insert(precision_key(k), summary.precision);
        self.insert(recall_key(k), summary.recall);
        self.insert(f1_key(k), summary.f1);
    }

    pub fn get(&self, name: &str) -> Option<f64> {
        self.values.get(name).copied()
    }

    pub fn rmse(&self) -> Option<f64> {
        self.get(RMSE)
    }

    pub fn precision_at(&self, k: usize) -> Option<f64> {
        self.get(&precision_key(k))
    }

    pub fn recall_at(&self, k: usize) -> Option<f64> {
        self.get(&recall_key(k))
    }

    pub fn f1_at(&self, k: usize) -> Option<f64> {
        self.get(&f1_key(k))
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.values.iter().map(|(name, value)| (name.as_str(), *value))
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn is_all_zero(&self) -> bool {
        self.values.values().all(|v| *v == 0.0)
    }
}

impl fmt::Display for MetricsRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for (name, value) in &self.values {
            if !first {
                write!(f, ", ")?;
            }
            write!(f, "{}={:.4}", name, value)?;
            first = false;
        }
        Ok(())
    }
}

/// Averaged ranking quality over a set of queries
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct RankingSummary {
    pub precision: f64,
    pub recall: f64,
    pub f1: f64,
    /// Number of queries that contributed
    pub evaluated: usize,
}

/// Running sums of per-query precision and recall
#[derive(Debug, Default)]
pub struct RankingAccumulator {
    precision_sum: f64,
    recall_sum: f64,
    queries: usize,
}

impl RankingAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one query: `hits` relevant items in a top-`k` list out of
    /// `relevant` relevant items overall.
    pub fn add(&mut self, hits: usize, k: usize, relevant: usize) {
        if k == 0 || relevant == 0 {
            return;
        }
        self.precision_sum += hits as f64 / k as f64;
        self.recall_sum += hits as f64 / relevant as f64;
        self.queries += 1;
    }

    pub fn queries(&self) -> usize {
        self.queries
    }

    pub fn finish(&self) -> RankingSummary {
        if self.queries == 0 {
            return RankingSummary::default();
        }
        let precision = self.precision_sum / self.queries as f64;
        let recall = self.recall_sum / self.queries as f64;
        RankingSummary {
            precision,
            recall,
            f1: f1_score(precision, recall),
            evaluated: self.queries,
        }
    }
}

/// Harmonic mean of precision and recall, 0 when both are 0
pub fn f1_score(precision: f64, recall: f64) -> f64 {
    let sum = precision + recall;
    if sum > 0.0 {
        2.0 * precision * recall / sum
    } else {
        0.0
    }
}

/// Indices of the `k` highest scores, best first.
///
/// Ties keep the lower index first; `-inf` entries sort last.
pub fn top_k_indices(scores: &[f32], k: usize) -> Vec<usize> {
    let mut order: Vec<usize> = (0..scores.len()).collect();
    order.sort_by(|&a, &b| scores[b].total_cmp(&scores[a]));
    order.truncate(k);
    order
}
