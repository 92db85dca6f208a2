//! Core domain types for the post recommendation training data.
//!
//! This module defines the records read from the processed data directory
//! and the dense [`InteractionMatrix`] the factorization trainer consumes.
//! External identifiers never leak into the numeric code: every matrix
//! carries an [`IdMapping`] per axis that translates between ids and
//! zero-based positions.

use crate::error::{DataLoadError, Result};
use ndarray::{Array2, ArrayView2};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::borrow::Borrow;
use std::collections::{BTreeMap, HashMap};
use std::fmt::Display;
use std::hash::Hash;

// =============================================================================
// Type Aliases
// =============================================================================

/// Unique identifier for a user (kept as a string, as exported upstream)
pub type UserId = String;

/// Unique identifier for a company post
pub type PostId = u32;

// =============================================================================
// Raw Records
// =============================================================================

/// One row of `user_post_interactions.csv`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Interaction {
    pub user_id: UserId,
    pub post_id: PostId,
    /// Non-negative interaction strength (0 means "no signal")
    pub score: f32,
}

/// A post published by a company
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompanyPost {
    pub post_id: PostId,
    pub company_name: String,
    pub industry: String,
    pub title: String,
    pub engagement: f32,
    /// Editorial quality score, absent in older exports
    pub quality_score: Option<f32>,
}

/// Attributes of a business used for content-based similarity
///
/// Only the name is mandatory; every other attribute is optional because the
/// processed exports differ in which columns they carry.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BusinessProfile {
    pub name: String,
    pub category: Option<String>,
    pub trade_type: Option<String>,
    pub business_size: Option<String>,
    pub region: Option<String>,
    pub subcategory: Option<String>,
    pub location: Option<String>,
    pub annual_trade_volume: Option<f32>,
    pub trade_growth_rate: Option<f32>,
    pub trade_success_rate: Option<f32>,
    pub trade_frequency: Option<f32>,
}

impl BusinessProfile {
    /// Create a profile with just a name and a category
    pub fn new(name: impl Into<String>, category: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            category: Some(category.into()),
            ..Self::default()
        }
    }
}

/// Stated preferences of a user
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserPreference {
    pub user_id: UserId,
    pub preferred_industries: String,
    pub preferred_supplier_type: String,
    pub preferred_order_quantity: String,
}

/// A retail product that businesses can be matched against
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub stock_code: String,
    pub description: String,
}

/// Named macro-economic indicators (first data row of `economic_data.csv`)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EconomicIndicators {
    values: BTreeMap<String, f64>,
}

impl EconomicIndicators {
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up an indicator by its column name
    pub fn get(&self, name: &str) -> Option<f64> {
        self.values.get(name).copied()
    }

    pub fn insert(&mut self, name: impl Into<String>, value: f64) {
        self.values.insert(name.into(), value);
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }
}

// =============================================================================
// ID Mappings
// =============================================================================

/// Bidirectional mapping between external ids and zero-based indices.
///
/// Built once from an ordered label list and never mutated afterwards: the
/// position of a label in that list is its matrix index. Serializes as the
/// plain label list.
#[derive(Debug, Clone, PartialEq)]
pub struct IdMapping<K: Eq + Hash> {
    labels: Vec<K>,
    index: HashMap<K, usize>,
}

impl<K> IdMapping<K>
where
    K: Eq + Hash + Clone + Display,
{
    /// Build a mapping from ordered labels, rejecting duplicates
    ///
    /// `axis` only names the axis in the error message ("user", "post", ...)
    pub fn from_labels(axis: &str, labels: Vec<K>) -> Result<Self> {
        let mut index = HashMap::with_capacity(labels.len());
        for (i, label) in labels.iter().enumerate() {
            if index.insert(label.clone(), i).is_some() {
                return Err(DataLoadError::DuplicateLabel {
                    axis: axis.to_string(),
                    label: label.to_string(),
                });
            }
        }
        Ok(Self { labels, index })
    }
}

impl<K: Eq + Hash> IdMapping<K> {
    /// Matrix index of an external id
    pub fn index_of<Q>(&self, id: &Q) -> Option<usize>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.index.get(id).copied()
    }

    /// External id stored at a matrix index
    pub fn label_of(&self, index: usize) -> Option<&K> {
        self.labels.get(index)
    }

    /// All labels in index order
    pub fn labels(&self) -> &[K] {
        &self.labels
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    /// Iterate `(index, label)` pairs in index order
    pub fn iter(&self) -> impl Iterator<Item = (usize, &K)> {
        self.labels.iter().enumerate()
    }
}

impl<K: Eq + Hash + Serialize> Serialize for IdMapping<K> {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        self.labels.serialize(serializer)
    }
}

impl<'de, K> Deserialize<'de> for IdMapping<K>
where
    K: Deserialize<'de> + Eq + Hash + Clone + Display,
{
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let labels = Vec::<K>::deserialize(deserializer)?;
        IdMapping::from_labels("serialized", labels).map_err(serde::de::Error::custom)
    }
}

// =============================================================================
// InteractionMatrix
// =============================================================================

/// Dense user × post interaction table.
///
/// Rows follow `users()`, columns follow `posts()`. A cell holds the summed
/// interaction strength; 0 means unobserved.
#[derive(Debug, Clone)]
pub struct InteractionMatrix {
    values: Array2<f32>,
    users: IdMapping<UserId>,
    posts: IdMapping<PostId>,
}

impl InteractionMatrix {
    /// Wrap an existing matrix with its row and column labels
    pub fn new(values: Array2<f32>, users: Vec<UserId>, posts: Vec<PostId>) -> Result<Self> {
        let (rows, cols) = values.dim();
        if rows != users.len() || cols != posts.len() {
            return Err(DataLoadError::ShapeMismatch {
                expected_rows: users.len(),
                expected_cols: posts.len(),
                rows,
                cols,
            });
        }
        if let Some(bad) = values.iter().find(|v| !v.is_finite() || **v < 0.0) {
            return Err(DataLoadError::InvalidValue {
                field: "interaction".to_string(),
                value: bad.to_string(),
            });
        }

        Ok(Self {
            values,
            users: IdMapping::from_labels("user", users)?,
            posts: IdMapping::from_labels("post", posts)?,
        })
    }

    /// Pivot raw interaction rows into a dense matrix.
    ///
    /// Users and posts are ordered by first appearance; repeated
    /// `(user, post)` pairs are summed into one cell.
    pub fn from_interactions(interactions: &[Interaction]) -> Result<Self> {
        if interactions.is_empty() {
            return Err(DataLoadError::ValidationError(
                "no interactions to build a matrix from".to_string(),
            ));
        }

        let mut user_labels: Vec<UserId> = Vec::new();
        let mut post_labels: Vec<PostId> = Vec::new();
        let mut user_index: HashMap<&str, usize> = HashMap::new();
        let mut post_index: HashMap<PostId, usize> = HashMap::new();
        let mut cells: Vec<(usize, usize, f32)> = Vec::with_capacity(interactions.len());

        for interaction in interactions {
            if !interaction.score.is_finite() || interaction.score < 0.0 {
                return Err(DataLoadError::InvalidValue {
                    field: "InteractionScore".to_string(),
                    value: interaction.score.to_string(),
                });
            }

            let row = *user_index
                .entry(interaction.user_id.as_str())
                .or_insert_with(|| {
                    user_labels.push(interaction.user_id.clone());
                    user_labels.len() - 1
                });
            let col = *post_index.entry(interaction.post_id).or_insert_with(|| {
                post_labels.push(interaction.post_id);
                post_labels.len() - 1
            });
            cells.push((row, col, interaction.score));
        }

        let mut values = Array2::<f32>::zeros((user_labels.len(), post_labels.len()));
        for (row, col, score) in cells {
            values[[row, col]] += score;
        }

        Self::new(values, user_labels, post_labels)
    }

    pub fn values(&self) -> &Array2<f32> {
        &self.values
    }

    pub fn view(&self) -> ArrayView2<'_, f32> {
        self.values.view()
    }

    pub fn users(&self) -> &IdMapping<UserId> {
        &self.users
    }

    pub fn posts(&self) -> &IdMapping<PostId> {
        &self.posts
    }

    /// `(users, posts)`
    pub fn shape(&self) -> (usize, usize) {
        self.values.dim()
    }

    /// Interaction strength for an external `(user, post)` pair
    pub fn get(&self, user_id: &str, post_id: PostId) -> Option<f32> {
        let row = self.users.index_of(user_id)?;
        let col = self.posts.index_of(&post_id)?;
        Some(self.values[[row, col]])
    }

    /// Number of observed (strictly positive) cells
    pub fn observed_count(&self) -> usize {
        self.values.iter().filter(|&&v| v > 0.0).count()
    }

    pub fn is_all_zero(&self) -> bool {
        self.observed_count() == 0
    }

    /// Fraction of observed cells
    pub fn density(&self) -> f32 {
        let total = self.values.len();
        if total == 0 {
            return 0.0;
        }
        self.observed_count() as f32 / total as f32
    }
}

// =============================================================================
// TrainingData - everything one training run reads
// =============================================================================

/// Where a [`TrainingData`] came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DataSource {
    /// Parsed from the processed data directory
    Processed,
    /// Built in memory because processed files were missing
    Dummy,
}

/// All inputs of one offline training run, resident in memory.
#[derive(Debug, Clone)]
pub struct TrainingData {
    pub user_preferences: Vec<UserPreference>,
    pub company_posts: Vec<CompanyPost>,
    pub interactions: Vec<Interaction>,
    pub interaction_matrix: InteractionMatrix,
    pub businesses: Vec<BusinessProfile>,
    pub economic: EconomicIndicators,
    pub products: Vec<Product>,
    pub source: DataSource,
}

impl TrainingData {
    /// `(users, posts, interactions, businesses)` for logging and model info
    pub fn counts(&self) -> (usize, usize, usize, usize) {
        (
            self.user_preferences.len(),
            self.company_posts.len(),
            self.interactions.len(),
            self.businesses.len(),
        )
    }
}
