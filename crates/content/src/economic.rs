//! Economic context features used to bias recommendations.
//!
//! Indicator values come from `economic_data.csv` when present, otherwise
//! the defaults below apply. Seasonal flags are derived from the reference
//! date: the winter tourism season runs October through March, and Ramadan
//! months are looked up per year.

use crate::error::{ContentError, Result};
use chrono::{Datelike, Local};
use data_loader::EconomicIndicators;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{debug, info};

const GDP_GROWTH: (&str, f64) = ("gdp_growth_annual_pct", 4.35);
const INFLATION: (&str, f64) = ("inflation_consumer_prices_annual_pct", 5.04);
const POPULATION_GROWTH: (&str, f64) = ("population_growth_annual_pct", 1.73);
const TOURISM_SENSITIVITY: (&str, f64) = ("tourism_sensitivity", 0.85);
const ECONOMIC_STABILITY: (&str, f64) = ("economic_stability_index", 0.65);
const TRADE_BALANCE: (&str, f64) = ("trade_balance", -0.12);

const MANUFACTURING_PCT: &str = "manufacturing_value_added_pct_of_gdp";
const AGRICULTURE_PCT: &str = "agriculture_forestry_and_fishing_value_added_pct_of_gdp";
const SERVICES_PCT: &str = "services_value_added_pct_of_gdp";

const WINTER_TOURISM_MONTHS: [u32; 6] = [10, 11, 12, 1, 2, 3];

/// Share of recommendation influence per industry
const INDUSTRY_WEIGHTS: [(&str, f64); 12] = [
    ("Textiles", 0.15),
    ("Agriculture", 0.18),
    ("Spices", 0.12),
    ("Fruits & Vegetables", 0.15),
    ("Chemicals", 0.08),
    ("Pharmaceuticals", 0.07),
    ("Electronics", 0.06),
    ("Machinery", 0.05),
    ("Metals", 0.08),
    ("Automobiles", 0.03),
    ("Seafood", 0.06),
    ("Manufacturing", 0.10),
];

/// Months overlapping Ramadan in a given year
///
/// Years outside 2023–2026 use the union of the listed months.
pub fn ramadan_months(year: i32) -> &'static [u32] {
    match year {
        2023 => &[3, 4],
        2024 => &[3],
        2025 => &[2, 3],
        2026 => &[2, 3],
        _ => &[2, 3, 4],
    }
}

/// Static economic feature set
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EconomicContext {
    pub gdp_growth: f64,
    pub inflation: f64,
    pub population_growth: f64,
    pub tourism_sensitivity: f64,
    pub economic_stability_index: f64,
    pub trade_balance: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub manufacturing_pct_gdp: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub agriculture_pct_gdp: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub services_pct_gdp: Option<f64>,
    pub is_winter_tourism_season: bool,
    pub is_ramadan_season: bool,
    pub industry_weights: BTreeMap<String, f64>,
    pub reference_year: i32,
    pub reference_month: u32,
}

impl EconomicContext {
    /// Build the context for a given calendar month
    pub fn from_indicators(indicators: &EconomicIndicators, year: i32, month: u32) -> Result<Self> {
        if !(1..=12).contains(&month) {
            return Err(ContentError::InvalidParameter {
                name: "month".to_string(),
                value: month.to_string(),
            });
        }

        let value = |(name, default): (&str, f64)| {
            indicators.get(name).unwrap_or_else(|| {
                debug!("Indicator {} missing, using default {}", name, default);
                default
            })
        };

        let context = Self {
            gdp_growth: value(GDP_GROWTH),
            inflation: value(INFLATION),
            population_growth: value(POPULATION_GROWTH),
            tourism_sensitivity: value(TOURISM_SENSITIVITY),
            economic_stability_index: value(ECONOMIC_STABILITY),
            trade_balance: value(TRADE_BALANCE),
            manufacturing_pct_gdp: indicators.get(MANUFACTURING_PCT),
            agriculture_pct_gdp: indicators.get(AGRICULTURE_PCT),
            services_pct_gdp: indicators.get(SERVICES_PCT),
            is_winter_tourism_season: WINTER_TOURISM_MONTHS.contains(&month),
            is_ramadan_season: ramadan_months(year).contains(&month),
            industry_weights: INDUSTRY_WEIGHTS
                .iter()
                .map(|&(industry, weight)| (industry.to_string(), weight))
                .collect(),
            reference_year: year,
            reference_month: month,
        };

        info!(
            "Economic context for {}-{:02}: gdp_growth={}, winter_tourism={}, ramadan={}",
            year, month, context.gdp_growth, context.is_winter_tourism_season, context.is_ramadan_season
        );
        Ok(context)
    }

    /// Build the context for the current local date
    pub fn for_today(indicators: &EconomicIndicators) -> Result<Self> {
        let today = Local::now().date_naive();
        Self::from_indicators(indicators, today.year(), today.month())
    }

    /// Weight of an industry, 0 when the industry is not tracked
    pub fn industry_weight(&self, industry: &str) -> f64 {
        self.industry_weights.get(industry).copied().unwrap_or(0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_apply() {
        let context = EconomicContext::from_indicators(&EconomicIndicators::new(), 2024, 6).unwrap();

        assert_eq!(context.gdp_growth, 4.35);
        assert_eq!(context.inflation, 5.04);
        assert_eq!(context.population_growth, 1.73);
        assert_eq!(context.tourism_sensitivity, 0.85);
        assert_eq!(context.economic_stability_index, 0.65);
        assert_eq!(context.trade_balance, -0.12);
        assert!(context.manufacturing_pct_gdp.is_none());
        assert!(!context.is_winter_tourism_season);
        assert!(!context.is_ramadan_season);
    }

    #[test]
    fn test_indicators_override_defaults() {
        let mut indicators = EconomicIndicators::new();
        indicators.insert("gdp_growth_annual_pct", 3.8);
        indicators.insert("manufacturing_value_added_pct_of_gdp", 15.2);

        let context = EconomicContext::from_indicators(&indicators, 2024, 1).unwrap();
        assert_eq!(context.gdp_growth, 3.8);
        assert_eq!(context.manufacturing_pct_gdp, Some(15.2));
        assert!(context.is_winter_tourism_season);
    }

    #[test]
    fn test_ramadan_table() {
        let none = EconomicIndicators::new();
        assert!(EconomicContext::from_indicators(&none, 2023, 4).unwrap().is_ramadan_season);
        assert!(!EconomicContext::from_indicators(&none, 2024, 4).unwrap().is_ramadan_season);
        assert!(EconomicContext::from_indicators(&none, 2025, 2).unwrap().is_ramadan_season);
    }

    #[test]
    fn test_ramadan_outside_table_uses_union() {
        let none = EconomicIndicators::new();
        assert_eq!(ramadan_months(2030), &[2, 3, 4]);
        assert!(EconomicContext::from_indicators(&none, 2030, 3).unwrap().is_ramadan_season);
        assert!(EconomicContext::from_indicators(&none, 2019, 4).unwrap().is_ramadan_season);
        assert!(!EconomicContext::from_indicators(&none, 2030, 6).unwrap().is_ramadan_season);
    }

    #[test]
    fn test_industry_weights() {
        let context = EconomicContext::from_indicators(&EconomicIndicators::new(), 2024, 6).unwrap();

        assert_eq!(context.industry_weight("Agriculture"), 0.18);
        assert_eq!(context.industry_weight("Automobiles"), 0.03);
        assert_eq!(context.industry_weight("Unknown"), 0.0);
        assert_eq!(context.industry_weights.len(), 12);
    }

    #[test]
    fn test_rejects_invalid_month() {
        assert!(EconomicContext::from_indicators(&EconomicIndicators::new(), 2024, 13).is_err());
        assert!(EconomicContext::from_indicators(&EconomicIndicators::new(), 2024, 0).is_err());
    }
}
