//! Business–product and business–post affinity tables.
//!
//! ## Product affinity
//! 1. Collect keywords for the business category and region
//! 2. Count the keywords found in each upper-cased product description
//! 3. Boost by `1 + relevance`, where relevance is the fraction of local
//!    market keywords found in the lower-cased description
//! 4. Normalize to `min(0.9, score / |keywords|)` and keep the top 20

use data_loader::{BusinessProfile, CompanyPost, PostId, Product};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use tracing::{info, instrument};

/// Matches kept per business
pub const MAX_PRODUCTS_PER_BUSINESS: usize = 20;

/// Quality score assumed for posts without one
pub const DEFAULT_QUALITY_SCORE: f32 = 4.0;

const MAX_PRODUCT_SCORE: f64 = 0.9;

/// Product vocabulary that signals a fit with the local market
const LOCAL_MARKET_KEYWORDS: [&str; 24] = [
    "cotton", "textile", "spice", "craft", "ceramic", "papyrus", "leather", "copper", "silver",
    "gold", "carpet", "rug", "dates", "olive", "tea", "coffee", "lamp", "glass", "metal",
    "furniture", "decoration", "ornament", "jewelry", "herb",
];

fn category_keywords(category: &str) -> &'static [&'static str] {
    match category {
        "Spices" => &["SPICES", "FOOD", "KITCHEN", "HERB", "TEA"],
        "Agriculture" => &["GARDEN", "PLANTS", "OUTDOOR", "ORGANIC", "COTTON", "FLOWER"],
        "Metals" => &["METAL", "HARDWARE", "TOOLS", "COPPER", "SILVER", "GOLD"],
        "Electronics" => &["ELECTRONICS", "TECHNOLOGY", "BATTERIES", "PHONE", "COMPUTER"],
        "Textiles" => &["TEXTILES", "FABRIC", "CLOTHING", "COTTON", "LINEN", "CARPET"],
        "Fruits & Vegetables" => &["FOOD", "KITCHEN", "STORAGE", "FRUIT", "ORGANIC"],
        "Machinery" => &["TOOLS", "HARDWARE", "EQUIPMENT", "METAL"],
        "Seafood" => &["FOOD", "KITCHEN", "STORAGE", "FISH"],
        "Pharmaceuticals" => &["HEALTH", "WELLNESS", "BATHROOM", "HERBAL", "MEDICINE"],
        "Manufacturing" => &["TOOLS", "EQUIPMENT", "HARDWARE", "FACTORY"],
        "Chemicals" => &["CLEANING", "HOUSEHOLD", "GARDEN", "LABORATORY"],
        "Automobiles" => &["TRANSPORT", "TRAVEL", "OUTDOOR", "VEHICLE", "CAR"],
        _ => &[],
    }
}

fn region_keywords(region: &str) -> &'static [&'static str] {
    match region {
        "Greater Cairo" => &["URBAN", "MODERN", "FURNITURE", "DECOR", "OFFICE"],
        "Mediterranean Coast" => &["SEAFOOD", "MARINE", "BEACH", "SUMMER", "FISH"],
        "Upper Egypt" => &["CRAFT", "TRADITIONAL", "HANDMADE", "POTTERY", "STATUE"],
        "Nile Delta" => &["COTTON", "TEXTILE", "AGRICULTURE", "FRUIT"],
        "Suez Canal" => &["SHIPPING", "LOGISTICS", "TRADE", "INTERNATIONAL"],
        "Red Sea" => &["TOURISM", "BEACH", "SUMMER", "CORAL", "DIVING"],
        "Sinai" => &["CRAFT", "TRADITIONAL", "BEDOUIN", "HERBS", "DESERT"],
        _ => &[],
    }
}

/// Fraction of [`LOCAL_MARKET_KEYWORDS`] found in a description
pub fn local_market_relevance(description: &str) -> f64 {
    let lower = description.to_lowercase();
    let found = LOCAL_MARKET_KEYWORDS
        .iter()
        .filter(|keyword| lower.contains(*keyword))
        .count();
    found as f64 / LOCAL_MARKET_KEYWORDS.len() as f64
}

/// A product matched to a business
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductMatch {
    pub stock_code: String,
    pub description: String,
    /// Normalized match score in `(0, 0.9]`
    pub score: f64,
    pub local_relevance: f64,
}

/// A post listed under its company
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PostSummary {
    pub post_id: PostId,
    pub title: String,
    pub industry: String,
    pub engagement: f32,
    pub quality_score: f32,
}

/// Keyword set of a business: category keywords, then region keywords
fn business_keywords(business: &BusinessProfile) -> Vec<&'static str> {
    let mut keywords: Vec<&'static str> = Vec::new();
    if let Some(category) = business.category.as_deref() {
        keywords.extend(category_keywords(category));
    }
    if let Some(region) = business.region.as_deref() {
        keywords.extend(region_keywords(region));
    }
    keywords
}

/// Score every product against one business and keep the best matches
fn match_products(business: &BusinessProfile, products: &[(Product, String, f64)]) -> Vec<ProductMatch> {
    let keywords = business_keywords(business);
    if keywords.is_empty() {
        return Vec::new();
    }

    let mut matches: Vec<ProductMatch> = products
        .iter()
        .filter_map(|(product, upper, relevance)| {
            let hits = keywords.iter().filter(|keyword| upper.contains(*keyword)).count();
            if hits == 0 {
                return None;
            }
            let score = hits as f64 * (1.0 + relevance);
            Some(ProductMatch {
                stock_code: product.stock_code.clone(),
                description: product.description.clone(),
                score: (score / keywords.len() as f64).min(MAX_PRODUCT_SCORE),
                local_relevance: *relevance,
            })
        })
        .collect();

    matches.sort_by(|a, b| b.score.total_cmp(&a.score));
    matches.truncate(MAX_PRODUCTS_PER_BUSINESS);
    matches
}

/// Best matching products per business name
///
/// A business listed more than once keeps its first profile.
#[instrument(skip_all, fields(businesses = businesses.len(), products = products.len()))]
pub fn business_product_affinity(
    businesses: &[BusinessProfile],
    products: &[Product],
) -> BTreeMap<String, Vec<ProductMatch>> {
    // Descriptions are shared by every business: normalize them once
    let prepared: Vec<(Product, String, f64)> = products
        .iter()
        .map(|p| {
            (
                p.clone(),
                p.description.to_uppercase(),
                local_market_relevance(&p.description),
            )
        })
        .collect();

    let mut seen = HashSet::new();
    let unique: Vec<&BusinessProfile> = businesses
        .iter()
        .filter(|b| seen.insert(b.name.as_str()))
        .collect();

    let affinity: BTreeMap<String, Vec<ProductMatch>> = unique
        .par_iter()
        .map(|business| (business.name.clone(), match_products(business, &prepared)))
        .collect();

    let matched = affinity.values().filter(|m| !m.is_empty()).count();
    info!(
        "Business-product affinity: {} of {} businesses matched at least one product",
        matched,
        affinity.len()
    );
    affinity
}

/// Posts grouped by company name, in file order
#[instrument(skip_all, fields(posts = posts.len()))]
pub fn business_post_affinity(posts: &[CompanyPost]) -> BTreeMap<String, Vec<PostSummary>> {
    let mut affinity: BTreeMap<String, Vec<PostSummary>> = BTreeMap::new();
    for post in posts {
        affinity
            .entry(post.company_name.clone())
            .or_default()
            .push(PostSummary {
                post_id: post.post_id,
                title: post.title.clone(),
                industry: post.industry.clone(),
                engagement: post.engagement,
                quality_score: post.quality_score.unwrap_or(DEFAULT_QUALITY_SCORE),
            });
    }
    info!("Business-post affinity created for {} companies", affinity.len());
    affinity
}

#[cfg(test)]
mod tests {
    use super::*;

    fn product(code: &str, description: &str) -> Product {
        Product {
            stock_code: code.to_string(),
            description: description.to_string(),
        }
    }

    #[test]
    fn test_local_market_relevance() {
        assert_eq!(local_market_relevance("plastic bucket"), 0.0);
        assert!((local_market_relevance("Copper tea lamp") - 3.0 / 24.0).abs() < 1e-12);
    }

    #[test]
    fn test_product_scores() {
        let textiles = BusinessProfile {
            region: Some("Nile Delta".to_string()),
            ..BusinessProfile::new("Delta Cotton", "Textiles")
        };
        let products = vec![
            product("A1", "cotton fabric cushion"),
            product("B2", "plastic bucket"),
        ];

        let affinity = business_product_affinity(&[textiles], &products);
        let matches = &affinity["Delta Cotton"];

        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].stock_code, "A1");
        // COTTON appears twice in the keyword list (category and region), FABRIC once
        let relevance = 1.0 / 24.0;
        let expected = 3.0 * (1.0 + relevance) / 10.0;
        assert!((matches[0].score - expected).abs() < 1e-12);
    }

    #[test]
    fn test_scores_are_capped() {
        let metals = BusinessProfile::new("Copper Works", "Metals");
        let products = vec![product("C", "METAL HARDWARE TOOLS COPPER SILVER GOLD")];

        let affinity = business_product_affinity(&[metals], &products);
        assert_eq!(affinity["Copper Works"][0].score, 0.9);
    }

    #[test]
    fn test_unknown_category_has_no_matches() {
        let other = BusinessProfile::new("Mystery", "Unknown");
        let affinity = business_product_affinity(&[other], &[product("A", "cotton")]);

        assert!(affinity["Mystery"].is_empty());
    }

    #[test]
    fn test_keeps_top_twenty() {
        let spices = BusinessProfile::new("Spice House", "Spices");
        let products: Vec<Product> = (0..30)
            .map(|i| product(&format!("P{i}"), "spices kitchen"))
            .collect();

        let affinity = business_product_affinity(&[spices], &products);
        assert_eq!(affinity["Spice House"].len(), MAX_PRODUCTS_PER_BUSINESS);
    }

    #[test]
    fn test_post_affinity_groups_by_company() {
        let posts = vec![
            CompanyPost {
                post_id: 1,
                company_name: "Tech Egypt".to_string(),
                industry: "Electronics".to_string(),
                title: "Chargers".to_string(),
                engagement: 10.0,
                quality_score: None,
            },
            CompanyPost {
                post_id: 2,
                company_name: "Tech Egypt".to_string(),
                industry: "Electronics".to_string(),
                title: "Cables".to_string(),
                engagement: 12.0,
                quality_score: Some(4.5),
            },
        ];

        let affinity = business_post_affinity(&posts);
        let tech = &affinity["Tech Egypt"];
        assert_eq!(tech.len(), 2);
        assert_eq!(tech[0].quality_score, DEFAULT_QUALITY_SCORE);
        assert_eq!(tech[1].quality_score, 4.5);
    }
}
