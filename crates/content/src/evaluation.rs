//! Evaluation of business-to-business recommendations.
//!
//! Ground truth: two distinct businesses are relevant to each other when
//! they share a category. Each business with at least one relevant peer is a
//! query; its top-k list comes from the similarity matrix with the business
//! itself excluded.

use crate::similarity::BusinessSimilarity;
use factorization::metrics::CATEGORY_COVERAGE;
use factorization::{MetricsRecord, RankingAccumulator};
use std::collections::HashSet;
use tracing::{info, instrument, warn};

/// `precision@k`, `recall@k`, `f1@k` and `category_coverage`
///
/// Never fails: an empty model or `k = 0` yields an all-zero record.
#[instrument(skip(similarity), fields(businesses = similarity.len()))]
pub fn evaluate_business_recommendations(similarity: &BusinessSimilarity, k: usize) -> MetricsRecord {
    if k == 0 || similarity.is_empty() {
        warn!("Cannot evaluate business recommendations (k={}, businesses={})", k, similarity.len());
        return zeroed(k);
    }

    let categories = similarity.categories();
    let distinct: HashSet<&str> = categories.iter().flatten().map(String::as_str).collect();

    let mut ranking = RankingAccumulator::new();
    let mut recommended_categories: HashSet<&str> = HashSet::new();

    for (i, category) in categories.iter().enumerate() {
        let top = similarity.top_k_for_index(i, k);
        recommended_categories.extend(top.iter().filter_map(|&j| categories[j].as_deref()));

        let Some(category) = category.as_deref() else {
            continue;
        };
        let relevant: HashSet<usize> = categories
            .iter()
            .enumerate()
            .filter(|&(j, other)| j != i && other.as_deref() == Some(category))
            .map(|(j, _)| j)
            .collect();
        if relevant.is_empty() {
            continue;
        }

        let hits = top.iter().filter(|j| relevant.contains(*j)).count();
        ranking.add(hits, k, relevant.len());
    }

    let coverage = if distinct.is_empty() {
        0.0
    } else {
        recommended_categories.len() as f64 / distinct.len() as f64
    };

    let mut record = MetricsRecord::new();
    record.insert_ranking(k, &ranking.finish());
    record.insert(CATEGORY_COVERAGE, coverage);
    info!("Business recommendation metrics: {}", record);
    record
}

fn zeroed(k: usize) -> MetricsRecord {
    let mut record = MetricsRecord::new();
    record.insert_ranking(k, &Default::default());
    record.insert(CATEGORY_COVERAGE, 0.0);
    record
}
