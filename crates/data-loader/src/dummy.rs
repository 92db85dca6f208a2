//! Small in-memory dataset used when the processed exports are missing.
//!
//! Three users, three posts from three companies and a diagonal interaction
//! matrix `[0.8, 0.9, 0.7]`. Enough to exercise every training stage end to
//! end without any files on disk.

use crate::error::Result;
use crate::types::*;

/// Build the dummy [`TrainingData`]
pub fn create_dummy_data() -> Result<TrainingData> {
    let user_preferences = vec![
        preference("1000", "Electronics", "Small Businesses", "Small orders"),
        preference("1001", "Agriculture & Food", "Medium Enterprises", "Medium orders"),
        preference("1002", "Textiles & Garments", "Large Corporations", "Large orders"),
    ];

    let company_posts = vec![
        post(1, "Tech Egypt", "Electronics", "Latest Electronics", 100.0),
        post(2, "Food Corp", "Agriculture & Food", "Fresh Produce", 200.0),
        post(3, "Textile Co", "Textiles & Garments", "Quality Fabrics", 150.0),
    ];

    let interactions = vec![
        interaction("1000", 1, 0.8),
        interaction("1001", 2, 0.9),
        interaction("1002", 3, 0.7),
    ];
    let interaction_matrix = InteractionMatrix::from_interactions(&interactions)?;

    let businesses = vec![
        business("Tech Egypt", "Electronics", "Exporter", "Small"),
        business("Food Corp", "Agriculture", "Importer", "Medium"),
        business("Textile Co", "Textiles", "Both", "Large"),
    ];

    let mut economic = EconomicIndicators::new();
    economic.insert("gdp_growth_annual_pct", 4.35);

    Ok(TrainingData {
        user_preferences,
        company_posts,
        interactions,
        interaction_matrix,
        businesses,
        economic,
        products: Vec::new(),
        source: DataSource::Dummy,
    })
}

fn preference(user: &str, industries: &str, supplier: &str, quantity: &str) -> UserPreference {
    UserPreference {
        user_id: user.to_string(),
        preferred_industries: industries.to_string(),
        preferred_supplier_type: supplier.to_string(),
        preferred_order_quantity: quantity.to_string(),
    }
}

fn post(post_id: PostId, company: &str, industry: &str, title: &str, engagement: f32) -> CompanyPost {
    CompanyPost {
        post_id,
        company_name: company.to_string(),
        industry: industry.to_string(),
        title: title.to_string(),
        engagement,
        quality_score: None,
    }
}

fn interaction(user: &str, post_id: PostId, score: f32) -> Interaction {
    Interaction {
        user_id: user.to_string(),
        post_id,
        score,
    }
}

fn business(name: &str, category: &str, trade_type: &str, size: &str) -> BusinessProfile {
    BusinessProfile {
        trade_type: Some(trade_type.to_string()),
        business_size: Some(size.to_string()),
        ..BusinessProfile::new(name, category)
    }
}
