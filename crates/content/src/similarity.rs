//! Content-based business similarity.
//!
//! ## Algorithm
//! 1. Deduplicate businesses by name (first occurrence wins)
//! 2. One-hot encode each categorical attribute present in the data and
//!    append the numeric attributes that are present (missing values → 0)
//! 3. Standardize every column (z-score, zero-variance columns become 0)
//! 4. Cosine similarity between all rows; zero-norm rows are similar to
//!    nothing. Without any feature column the matrix is the identity.

use crate::error::{ContentError, Result};
use data_loader::{BusinessProfile, IdMapping};
use factorization::top_k_indices;
use ndarray::{Array2, Axis};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use tracing::{debug, info, instrument, warn};

const CATEGORICAL_FIELDS: [&str; 6] = [
    "region",
    "category",
    "location",
    "trade_type",
    "subcategory",
    "business_size",
];

const NUMERIC_FIELDS: [&str; 4] = [
    "annual_trade_volume",
    "trade_growth_rate",
    "trade_success_rate",
    "trade_frequency",
];

/// Categorical attributes in [`CATEGORICAL_FIELDS`] order
fn categorical_values(b: &BusinessProfile) -> [Option<&str>; 6] {
    [
        b.region.as_deref(),
        b.category.as_deref(),
        b.location.as_deref(),
        b.trade_type.as_deref(),
        b.subcategory.as_deref(),
        b.business_size.as_deref(),
    ]
}

/// Numeric attributes in [`NUMERIC_FIELDS`] order
fn numeric_values(b: &BusinessProfile) -> [Option<f32>; 4] {
    [
        b.annual_trade_volume,
        b.trade_growth_rate,
        b.trade_success_rate,
        b.trade_frequency,
    ]
}

/// Pairwise similarity between businesses
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BusinessSimilarity {
    businesses: IdMapping<String>,
    categories: Vec<Option<String>>,
    feature_names: Vec<String>,
    matrix: Array2<f32>,
}

impl BusinessSimilarity {
    /// Build the similarity matrix from business profiles
    #[instrument(skip_all, fields(businesses = profiles.len()))]
    pub fn fit(profiles: &[BusinessProfile]) -> Result<Self> {
        let mut seen = HashSet::new();
        let unique: Vec<&BusinessProfile> = profiles
            .iter()
            .filter(|b| seen.insert(b.name.as_str()))
            .collect();
        if unique.is_empty() {
            return Err(ContentError::EmptyInput("no businesses to compare".to_string()));
        }
        if unique.len() < profiles.len() {
            debug!("Dropped {} duplicate business rows", profiles.len() - unique.len());
        }

        let (feature_names, features) = encode_features(&unique);
        let matrix = if feature_names.is_empty() {
            warn!("Businesses carry no usable attributes, similarity is the identity");
            Array2::eye(unique.len())
        } else {
            cosine_similarity(&standardize(features))
        };

        let businesses = IdMapping::from_labels(
            "business",
            unique.iter().map(|b| b.name.clone()).collect(),
        )?;
        let categories = unique.iter().map(|b| b.category.clone()).collect();

        info!(
            "Business similarity built for {} businesses over {} features",
            businesses.len(),
            feature_names.len()
        );
        Ok(Self {
            businesses,
            categories,
            feature_names,
            matrix,
        })
    }

    pub fn businesses(&self) -> &IdMapping<String> {
        &self.businesses
    }

    /// Category of each business, aligned with [`Self::businesses`]
    pub fn categories(&self) -> &[Option<String>] {
        &self.categories
    }

    /// Encoded column names, e.g. `category=Textiles` or `trade_growth_rate`
    pub fn feature_names(&self) -> &[String] {
        &self.feature_names
    }

    pub fn matrix(&self) -> &Array2<f32> {
        &self.matrix
    }

    pub fn len(&self) -> usize {
        self.businesses.len()
    }

    pub fn is_empty(&self) -> bool {
        self.businesses.is_empty()
    }

    pub fn similarity(&self, a: &str, b: &str) -> Option<f32> {
        let i = self.businesses.index_of(a)?;
        let j = self.businesses.index_of(b)?;
        Some(self.matrix[[i, j]])
    }

    /// Indices of the `k` most similar businesses to row `index`, itself excluded
    pub fn top_k_for_index(&self, index: usize, k: usize) -> Vec<usize> {
        let mut scores = self.matrix.row(index).to_vec();
        scores[index] = f32::NEG_INFINITY;
        let mut top = top_k_indices(&scores, k);
        top.retain(|&j| j != index);
        top
    }

    /// The `k` businesses most similar to `name`, best first
    pub fn most_similar(&self, name: &str, k: usize) -> Result<Vec<(String, f32)>> {
        let index = self
            .businesses
            .index_of(name)
            .ok_or_else(|| ContentError::UnknownBusiness(name.to_string()))?;

        Ok(self
            .top_k_for_index(index, k)
            .into_iter()
            .filter_map(|j| {
                self.businesses
                    .label_of(j)
                    .map(|other| (other.clone(), self.matrix[[index, j]]))
            })
            .collect())
    }
}

/// One-hot and numeric encoding of the present attributes
fn encode_features(businesses: &[&BusinessProfile]) -> (Vec<String>, Array2<f32>) {
    let mut names = Vec::new();
    let mut columns: Vec<Vec<f32>> = Vec::new();

    for (c, field) in CATEGORICAL_FIELDS.iter().enumerate() {
        let column_values: Vec<Option<&str>> =
            businesses.iter().map(|b| categorical_values(b)[c]).collect();

        let mut distinct: Vec<&str> = Vec::new();
        for value in column_values.iter().flatten() {
            if !distinct.contains(value) {
                distinct.push(*value);
            }
        }
        for value in distinct {
            names.push(format!("{field}={value}"));
            columns.push(
                column_values
                    .iter()
                    .map(|v| if *v == Some(value) { 1.0 } else { 0.0 })
                    .collect(),
            );
        }
    }

    for (c, field) in NUMERIC_FIELDS.iter().enumerate() {
        let column_values: Vec<Option<f32>> =
            businesses.iter().map(|b| numeric_values(b)[c]).collect();
        if column_values.iter().any(Option::is_some) {
            names.push(field.to_string());
            columns.push(column_values.iter().map(|v| v.unwrap_or(0.0)).collect());
        }
    }

    let mut features = Array2::<f32>::zeros((businesses.len(), columns.len()));
    for (j, column) in columns.iter().enumerate() {
        for (i, &value) in column.iter().enumerate() {
            features[[i, j]] = value;
        }
    }
    (names, features)
}

/// Z-score each column with the population standard deviation
fn standardize(mut features: Array2<f32>) -> Array2<f32> {
    for mut column in features.axis_iter_mut(Axis(1)) {
        let n = column.len() as f32;
        let mean = column.sum() / n;
        let variance = column.iter().map(|v| (v - mean).powi(2)).sum::<f32>() / n;
        let std = variance.sqrt();
        if std > f32::EPSILON {
            column.mapv_inplace(|v| (v - mean) / std);
        } else {
            column.fill(0.0);
        }
    }
    features
}

/// Row-wise cosine similarity; zero rows give 0 everywhere
fn cosine_similarity(features: &Array2<f32>) -> Array2<f32> {
    let mut normalized = features.clone();
    for mut row in normalized.axis_iter_mut(Axis(0)) {
        let norm = row.dot(&row).sqrt();
        if norm > 0.0 {
            row.mapv_inplace(|v| v / norm);
        }
    }
    normalized.dot(&normalized.t())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn profile(name: &str, category: &str, size: &str, volume: f32) -> BusinessProfile {
        BusinessProfile {
            business_size: Some(size.to_string()),
            annual_trade_volume: Some(volume),
            ..BusinessProfile::new(name, category)
        }
    }

    #[test]
    fn test_same_category_is_most_similar() {
        let profiles = vec![
            profile("Cairo Cotton", "Textiles", "Large", 120.0),
            profile("Delta Linen", "Textiles", "Large", 110.0),
            profile("Aswan Spice", "Spices", "Small", 5.0),
            profile("Luxor Herbs", "Spices", "Small", 7.0),
        ];

        let sim = BusinessSimilarity::fit(&profiles).unwrap();
        let top = sim.most_similar("Cairo Cotton", 1).unwrap();

        assert_eq!(top[0].0, "Delta Linen");
        assert!(sim.similarity("Cairo Cotton", "Delta Linen").unwrap() > 0.9);
        assert!(sim.similarity("Cairo Cotton", "Aswan Spice").unwrap() < 0.0);
    }

    #[test]
    fn test_duplicates_first_wins() {
        let profiles = vec![
            profile("A", "Textiles", "Large", 1.0),
            profile("A", "Spices", "Small", 2.0),
            profile("B", "Spices", "Small", 3.0),
        ];

        let sim = BusinessSimilarity::fit(&profiles).unwrap();
        assert_eq!(sim.len(), 2);
        assert_eq!(sim.categories()[0].as_deref(), Some("Textiles"));
    }

    #[test]
    fn test_no_features_gives_identity() {
        let profiles = vec![
            BusinessProfile {
                name: "A".to_string(),
                ..BusinessProfile::default()
            },
            BusinessProfile {
                name: "B".to_string(),
                ..BusinessProfile::default()
            },
        ];

        let sim = BusinessSimilarity::fit(&profiles).unwrap();
        assert_eq!(sim.matrix(), &Array2::<f32>::eye(2));
    }

    #[test]
    fn test_zero_norm_rows_have_zero_similarity() {
        // Identical businesses: every column has zero variance
        let profiles = vec![
            profile("A", "Textiles", "Large", 1.0),
            profile("B", "Textiles", "Large", 1.0),
        ];

        let sim = BusinessSimilarity::fit(&profiles).unwrap();
        assert!(sim.matrix().iter().all(|v| *v == 0.0));
    }

    #[test]
    fn test_unknown_business() {
        let sim = BusinessSimilarity::fit(&[profile("A", "Textiles", "Large", 1.0)]).unwrap();
        assert!(matches!(
            sim.most_similar("Z", 3),
            Err(ContentError::UnknownBusiness(_))
        ));
        assert!(sim.most_similar("A", 3).unwrap().is_empty());
    }

    #[test]
    fn test_empty_input() {
        assert!(BusinessSimilarity::fit(&[]).is_err());
    }
}
