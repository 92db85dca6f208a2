//! Building [`TrainingData`] from the processed data directory.
//!
//! Steps:
//! 1. Parse the independent CSV files in parallel with `rayon::join`
//! 2. Pivot the interactions into the dense [`InteractionMatrix`]
//! 3. Validate cross-file references
//!
//! When the processed files are missing altogether the loader falls back to
//! the small in-memory dataset from [`crate::dummy`].

use crate::dummy;
use crate::error::{DataLoadError, Result};
use crate::parser;
use crate::types::*;
use std::collections::HashSet;
use std::path::Path;
use tracing::{info, instrument, warn};

impl TrainingData {
    /// Load every processed file from `data_dir`.
    ///
    /// Required: user_post_interactions.csv, company_posts.csv,
    /// business_features.csv, user_preferences.csv.
    /// Optional: economic_data.csv (defaults apply), products.csv.
    #[instrument(skip_all, fields(data_dir = %data_dir.display()))]
    pub fn load_from_dir(data_dir: &Path) -> Result<Self> {
        info!("Loading processed data for post recommendation training");

        let interactions_path = data_dir.join("user_post_interactions.csv");
        let posts_path = data_dir.join("company_posts.csv");
        let businesses_path = data_dir.join("business_features.csv");
        let preferences_path = data_dir.join("user_preferences.csv");
        let economic_path = data_dir.join("economic_data.csv");
        let products_path = data_dir.join("products.csv");

        // Nested joins give us parallel parsing of the four required files
        let ((interactions, posts), (businesses, preferences)) = rayon::join(
            || {
                rayon::join(
                    || parser::parse_interactions(&interactions_path),
                    || parser::parse_company_posts(&posts_path),
                )
            },
            || {
                rayon::join(
                    || parser::parse_business_features(&businesses_path),
                    || parser::parse_user_preferences(&preferences_path),
                )
            },
        );

        let interactions = interactions?;
        let company_posts = posts?;
        let businesses = businesses?;
        let user_preferences = preferences?;

        let economic = optional(parser::parse_economic_data(&economic_path), "economic_data.csv")?
            .unwrap_or_default();
        let products = optional(parser::parse_products(&products_path), "products.csv")?
            .unwrap_or_default();

        info!(
            "Loaded {} interactions, {} posts, {} businesses, {} users, {} products",
            interactions.len(),
            company_posts.len(),
            businesses.len(),
            user_preferences.len(),
            products.len()
        );

        let interaction_matrix = InteractionMatrix::from_interactions(&interactions)?;

        let data = TrainingData {
            user_preferences,
            company_posts,
            interactions,
            interaction_matrix,
            businesses,
            economic,
            products,
            source: DataSource::Processed,
        };
        data.validate()?;

        let (users, posts) = data.interaction_matrix.shape();
        info!(
            "Interaction matrix built: {} users x {} posts, density {:.4}",
            users,
            posts,
            data.interaction_matrix.density()
        );
        Ok(data)
    }

    /// Load from `data_dir`, or build the dummy dataset if files are missing.
    ///
    /// Only a missing file triggers the fallback; malformed files are still
    /// reported as errors.
    pub fn load_or_dummy(data_dir: &Path) -> Result<Self> {
        match Self::load_from_dir(data_dir) {
            Ok(data) => Ok(data),
            Err(DataLoadError::FileNotFound { path }) => {
                warn!("Processed file {} not found, using dummy data", path);
                dummy::create_dummy_data()
            }
            Err(e) => Err(e),
        }
    }

    /// Check cross-file consistency
    ///
    /// Interactions pointing at posts missing from company_posts are only
    /// logged: the factorization does not need post metadata.
    pub fn validate(&self) -> Result<()> {
        if self.businesses.iter().any(|b| b.name.is_empty()) {
            return Err(DataLoadError::ValidationError(
                "business with empty name".to_string(),
            ));
        }

        let known_posts: HashSet<PostId> = self.company_posts.iter().map(|p| p.post_id).collect();
        let unknown = self
            .interaction_matrix
            .posts()
            .labels()
            .iter()
            .filter(|id| !known_posts.contains(*id))
            .count();
        if unknown > 0 {
            warn!("{} interacted posts have no company_posts entry", unknown);
        }

        if self.interaction_matrix.is_all_zero() {
            warn!("Interaction matrix has no observed cells; training will be degenerate");
        }
        Ok(())
    }
}

/// Turn a missing optional file into `None`, keep every other outcome
fn optional<T>(result: Result<T>, name: &str) -> Result<Option<T>> {
    match result {
        Ok(value) => Ok(Some(value)),
        Err(DataLoadError::FileNotFound { .. }) => {
            info!("Optional file {} not present, using defaults", name);
            Ok(None)
        }
        Err(e) => Err(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn write_processed_dir(dir: &Path) {
        fs::write(
            dir.join("user_post_interactions.csv"),
            "UserID,PostID,InteractionScore\n1000,1,0.8\n1001,2,0.9\n1002,3,0.7\n1000,3,0.4\n",
        )
        .unwrap();
        fs::write(
            dir.join("company_posts.csv"),
            "PostID,CompanyName,Industry,PostTitle,Engagement\n\
             1,Tech Egypt,Electronics,Latest Electronics,100\n\
             2,Food Corp,Agriculture & Food,Fresh Produce,200\n\
             3,Textile Co,Textiles & Garments,Quality Fabrics,150\n",
        )
        .unwrap();
        fs::write(
            dir.join("business_features.csv"),
            "Business Name,Category,Trade Type,Business Size\n\
             Tech Egypt,Electronics,Exporter,Small\n\
             Food Corp,Agriculture,Importer,Medium\n",
        )
        .unwrap();
        fs::write(
            dir.join("user_preferences.csv"),
            "UserID,PreferredIndustries,PreferredSupplierType,PreferredOrderQuantity\n\
             1000,Electronics,Small Businesses,Small orders\n",
        )
        .unwrap();
    }

    #[test]
    fn test_load_from_dir() {
        let dir = tempfile::tempdir().unwrap();
        write_processed_dir(dir.path());

        let data = TrainingData::load_from_dir(dir.path()).unwrap();

        assert_eq!(data.source, DataSource::Processed);
        assert_eq!(data.interaction_matrix.shape(), (3, 3));
        assert_eq!(data.interaction_matrix.get("1000", 3), Some(0.4));
        assert!(data.products.is_empty());
        assert!(data.economic.is_empty());
    }

    #[test]
    fn test_load_or_dummy_falls_back() {
        let dir = tempfile::tempdir().unwrap();

        let data = TrainingData::load_or_dummy(dir.path()).unwrap();
        assert_eq!(data.source, DataSource::Dummy);
    }

    #[test]
    fn test_load_or_dummy_keeps_parse_errors() {
        let dir = tempfile::tempdir().unwrap();
        write_processed_dir(dir.path());
        fs::write(
            dir.path().join("user_post_interactions.csv"),
            "UserID,PostID,InteractionScore\n1000,1,not-a-number\n",
        )
        .unwrap();

        assert!(TrainingData::load_or_dummy(dir.path()).is_err());
    }
}
