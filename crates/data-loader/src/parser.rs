//! Parsers for the processed CSV exports.
//!
//! Files handled here (all comma-separated with a header row):
//! - user_post_interactions.csv: UserID,PostID,InteractionScore
//! - company_posts.csv: PostID,CompanyName,Industry,PostTitle,Engagement[,QualityScore]
//! - business_features.csv: Business Name[,Category,Trade Type,Business Size,Region,...]
//! - user_preferences.csv: UserID,PreferredIndustries,PreferredSupplierType,PreferredOrderQuantity
//! - products.csv: StockCode,Description
//! - economic_data.csv: one header row of indicator names, first data row used
//!
//! Columns are located by header name, so extra columns are ignored and
//! column order does not matter.

use crate::error::{DataLoadError, Result};
use crate::types::*;
use csv::{ReaderBuilder, Trim};
use std::fs::File;
use std::io::{BufReader, ErrorKind};
use std::path::Path;

/// A parsed CSV file: header names plus `(line number, fields)` rows
struct Table {
    file: String,
    headers: Vec<String>,
    rows: Vec<(usize, Vec<String>)>,
}

impl Table {
    /// Index of a mandatory column
    fn column(&self, name: &str) -> Result<usize> {
        self.optional_column(name)
            .ok_or_else(|| DataLoadError::MissingColumn {
                file: self.file.clone(),
                column: name.to_string(),
            })
    }

    /// Index of a column that older exports may not have
    fn optional_column(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == name)
    }

    fn parse_error(&self, line: usize, reason: String) -> DataLoadError {
        DataLoadError::ParseError {
            file: self.file.clone(),
            line,
            reason,
        }
    }

    /// Field at `col`, failing if the row is too short
    fn field<'a>(&self, line: usize, fields: &'a [String], col: usize) -> Result<&'a str> {
        fields
            .get(col)
            .map(String::as_str)
            .ok_or_else(|| self.parse_error(line, format!("Missing {}", self.headers[col])))
    }

    /// Field at `col` if present and non-empty
    fn optional_field<'a>(&self, fields: &'a [String], col: Option<usize>) -> Option<&'a str> {
        col.and_then(|c| fields.get(c))
            .map(|s| s.as_str())
            .filter(|s| !s.is_empty())
    }

    fn parse_number<T>(&self, line: usize, col: usize, raw: &str) -> Result<T>
    where
        T: std::str::FromStr,
        T::Err: std::fmt::Display,
    {
        raw.parse::<T>().map_err(|e| {
            self.parse_error(line, format!("Invalid {}: {}", self.headers[col], e))
        })
    }
}

/// Read a whole CSV file into a [`Table`]
///
/// Quoted fields may contain commas, `""` escapes and line breaks; blank
/// lines are skipped and every field is trimmed.
fn read_table(path: &Path) -> Result<Table> {
    let handle = File::open(path).map_err(|e| match e.kind() {
        ErrorKind::NotFound => DataLoadError::FileNotFound {
            path: path.display().to_string(),
        },
        _ => DataLoadError::IoError(e),
    })?;

    let file = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());

    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(Trim::All)
        .from_reader(BufReader::new(handle));

    let headers: Vec<String> = reader
        .headers()
        .map_err(|e| csv_error(&file, e))?
        .iter()
        .map(|h| h.trim_start_matches('\u{feff}').to_string())
        .collect();
    if headers.iter().all(|h| h.is_empty()) {
        return Err(DataLoadError::ParseError {
            file,
            line: 1,
            reason: "Missing header row".to_string(),
        });
    }

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record.map_err(|e| csv_error(&file, e))?;
        if record.iter().all(str::is_empty) {
            continue;
        }
        let line = record.position().map_or(0, |p| p.line() as usize);
        rows.push((line, record.iter().map(str::to_string).collect()));
    }

    Ok(Table {
        file,
        headers,
        rows,
    })
}

/// Map a reader failure onto the crate error, keeping the line when known
fn csv_error(file: &str, err: csv::Error) -> DataLoadError {
    let line = err.position().map_or(0, |p| p.line() as usize);
    let reason = err.to_string();
    match err.into_kind() {
        csv::ErrorKind::Io(e) => DataLoadError::IoError(e),
        _ => DataLoadError::ParseError {
            file: file.to_string(),
            line,
            reason,
        },
    }
}

/// Parse user_post_interactions.csv
pub fn parse_interactions(path: &Path) -> Result<Vec<Interaction>> {
    let table = read_table(path)?;
    let user_col = table.column("UserID")?;
    let post_col = table.column("PostID")?;
    let score_col = table.column("InteractionScore")?;

    let mut interactions = Vec::with_capacity(table.rows.len());
    for (line, fields) in &table.rows {
        let user_id = table.field(*line, fields, user_col)?;
        let post_id = table.field(*line, fields, post_col)?;
        let score = table.field(*line, fields, score_col)?;

        interactions.push(Interaction {
            user_id: user_id.to_string(),
            post_id: parse_post_id(&table, *line, post_col, post_id)?,
            score: table.parse_number(*line, score_col, score)?,
        });
    }
    Ok(interactions)
}

/// Parse company_posts.csv
pub fn parse_company_posts(path: &Path) -> Result<Vec<CompanyPost>> {
    let table = read_table(path)?;
    let post_col = table.column("PostID")?;
    let company_col = table.column("CompanyName")?;
    let industry_col = table.column("Industry")?;
    let title_col = table.column("PostTitle")?;
    let engagement_col = table.column("Engagement")?;
    let quality_col = table.optional_column("QualityScore");

    let mut posts = Vec::with_capacity(table.rows.len());
    for (line, fields) in &table.rows {
        let post_id = table.field(*line, fields, post_col)?;
        let engagement = table.field(*line, fields, engagement_col)?;
        let quality_score = match (quality_col, table.optional_field(fields, quality_col)) {
            (Some(col), Some(raw)) => Some(table.parse_number(*line, col, raw)?),
            _ => None,
        };

        posts.push(CompanyPost {
            post_id: parse_post_id(&table, *line, post_col, post_id)?,
            company_name: table.field(*line, fields, company_col)?.to_string(),
            industry: table.field(*line, fields, industry_col)?.to_string(),
            title: table.field(*line, fields, title_col)?.to_string(),
            engagement: table.parse_number(*line, engagement_col, engagement)?,
            quality_score,
        });
    }
    Ok(posts)
}

/// Parse business_features.csv
pub fn parse_business_features(path: &Path) -> Result<Vec<BusinessProfile>> {
    let table = read_table(path)?;
    let name_col = table.column("Business Name")?;
    let category_col = table.optional_column("Category");
    let trade_type_col = table.optional_column("Trade Type");
    let size_col = table.optional_column("Business Size");
    let region_col = table.optional_column("Region");
    let subcategory_col = table.optional_column("Subcategory");
    let location_col = table.optional_column("Location");
    let volume_col = table.optional_column("Annual Trade Volume (M USD)");
    let growth_col = table.optional_column("Trade Growth Rate (%)");
    let success_col = table.optional_column("Trade Success Rate (%)");
    let frequency_col = table.optional_column("Trade Frequency (per year)");

    let text = |fields: &[String], col: Option<usize>| {
        table.optional_field(fields, col).map(str::to_string)
    };
    let number = |line: usize, fields: &[String], col: Option<usize>| -> Result<Option<f32>> {
        match (col, table.optional_field(fields, col)) {
            (Some(c), Some(raw)) => table.parse_number(line, c, raw).map(Some),
            _ => Ok(None),
        }
    };

    let mut businesses = Vec::with_capacity(table.rows.len());
    for (line, fields) in &table.rows {
        businesses.push(BusinessProfile {
            name: table.field(*line, fields, name_col)?.to_string(),
            category: text(fields, category_col),
            trade_type: text(fields, trade_type_col),
            business_size: text(fields, size_col),
            region: text(fields, region_col),
            subcategory: text(fields, subcategory_col),
            location: text(fields, location_col),
            annual_trade_volume: number(*line, fields, volume_col)?,
            trade_growth_rate: number(*line, fields, growth_col)?,
            trade_success_rate: number(*line, fields, success_col)?,
            trade_frequency: number(*line, fields, frequency_col)?,
        });
    }
    Ok(businesses)
}

/// Parse user_preferences.csv
pub fn parse_user_preferences(path: &Path) -> Result<Vec<UserPreference>> {
    let table = read_table(path)?;
    let user_col = table.column("UserID")?;
    let industries_col = table.optional_column("PreferredIndustries");
    let supplier_col = table.optional_column("PreferredSupplierType");
    let quantity_col = table.optional_column("PreferredOrderQuantity");

    let text = |fields: &[String], col: Option<usize>| {
        table
            .optional_field(fields, col)
            .unwrap_or_default()
            .to_string()
    };

    let mut preferences = Vec::with_capacity(table.rows.len());
    for (line, fields) in &table.rows {
        preferences.push(UserPreference {
            user_id: table.field(*line, fields, user_col)?.to_string(),
            preferred_industries: text(fields, industries_col),
            preferred_supplier_type: text(fields, supplier_col),
            preferred_order_quantity: text(fields, quantity_col),
        });
    }
    Ok(preferences)
}

/// Parse products.csv
pub fn parse_products(path: &Path) -> Result<Vec<Product>> {
    let table = read_table(path)?;
    let code_col = table.column("StockCode")?;
    let description_col = table.column("Description")?;

    let mut products = Vec::with_capacity(table.rows.len());
    for (line, fields) in &table.rows {
        products.push(Product {
            stock_code: table.field(*line, fields, code_col)?.to_string(),
            // Blank descriptions are common in retail exports
            description: table
                .optional_field(fields, Some(description_col))
                .unwrap_or_default()
                .to_string(),
        });
    }
    Ok(products)
}

/// Parse economic_data.csv: numeric cells of the first data row
///
/// Non-numeric cells (country names, dates) are skipped.
pub fn parse_economic_data(path: &Path) -> Result<EconomicIndicators> {
    let table = read_table(path)?;
    let mut indicators = EconomicIndicators::new();

    if let Some((_, fields)) = table.rows.first() {
        for (header, raw) in table.headers.iter().zip(fields) {
            if let Ok(value) = raw.parse::<f64>()
                && value.is_finite()
            {
                indicators.insert(header.clone(), value);
            }
        }
    }
    Ok(indicators)
}

/// Post ids are sometimes exported as floats ("3.0") by dataframe tooling
fn parse_post_id(table: &Table, line: usize, col: usize, raw: &str) -> Result<PostId> {
    if let Ok(id) = raw.parse::<PostId>() {
        return Ok(id);
    }
    match raw.parse::<f64>() {
        Ok(value) if value.fract() == 0.0 && value >= 0.0 && value <= PostId::MAX as f64 => {
            Ok(value as PostId)
        }
        _ => Err(table.parse_error(line, format!("Invalid {}: {}", table.headers[col], raw))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::io::Write;

    fn write_file(dir: &Path, name: &str, content: &str) -> std::path::PathBuf {
        let path = dir.join(name);
        let mut file = fs::File::create(&path).unwrap();
        file.write_all(content.as_bytes()).unwrap();
        path
    }

    #[test]
    fn test_quoted_fields() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(
            dir.path(),
            "products.csv",
            "StockCode,Description\n12,\"Cotton, Egyptian\"\n13,\"say \"\"hi\"\"\"\n",
        );

        let products = parse_products(&path).unwrap();
        assert_eq!(products.len(), 2);
        assert_eq!(products[0].description, "Cotton, Egyptian");
        assert_eq!(products[1].description, r#"say "hi""#);
    }

    #[test]
    fn test_quoted_field_spanning_lines() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(
            dir.path(),
            "products.csv",
            "StockCode,Description\nA1,\"COTTON BAG\nLARGE\"\nB2,COPPER LAMP\n",
        );

        let products = parse_products(&path).unwrap();
        assert_eq!(products.len(), 2);
        assert_eq!(products[0].stock_code, "A1");
        assert_eq!(products[0].description, "COTTON BAG\nLARGE");
        assert_eq!(products[1].stock_code, "B2");
        assert_eq!(products[1].description, "COPPER LAMP");
    }

    #[test]
    fn test_empty_file_has_no_header() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(dir.path(), "products.csv", "");
        assert!(matches!(
            parse_products(&path),
            Err(DataLoadError::ParseError { line: 1, .. })
        ));
    }

    #[test]
    fn test_parse_interactions() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(
            dir.path(),
            "user_post_interactions.csv",
            "UserID,PostID,InteractionScore\n1000,1,0.8\n\n1001,2.0,0.9\n",
        );

        let interactions = parse_interactions(&path).unwrap();
        assert_eq!(interactions.len(), 2);
        assert_eq!(interactions[1].user_id, "1001");
        assert_eq!(interactions[1].post_id, 2);
        assert_eq!(interactions[1].score, 0.9);
    }

    #[test]
    fn test_parse_interactions_reports_line() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(
            dir.path(),
            "user_post_interactions.csv",
            "UserID,PostID,InteractionScore\n1000,1,0.8\n1001,abc,0.9\n",
        );

        match parse_interactions(&path) {
            Err(DataLoadError::ParseError { line, .. }) => assert_eq!(line, 3),
            other => panic!("expected parse error, got {:?}", other),
        }
    }

    #[test]
    fn test_missing_column() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(dir.path(), "products.csv", "StockCode\nA1\n");
        assert!(matches!(
            parse_products(&path),
            Err(DataLoadError::MissingColumn { .. })
        ));
    }

    #[test]
    fn test_missing_file() {
        let result = parse_products(Path::new("/definitely/not/here.csv"));
        assert!(matches!(result, Err(DataLoadError::FileNotFound { .. })));
    }

    #[test]
    fn test_parse_business_features_optional_columns() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(
            dir.path(),
            "business_features.csv",
            "Business Name,Category,Trade Type,Annual Trade Volume (M USD)\n\
             Tech Egypt,Electronics,Exporter,12.5\n\
             Food Corp,Agriculture,,\n",
        );

        let businesses = parse_business_features(&path).unwrap();
        assert_eq!(businesses.len(), 2);
        assert_eq!(businesses[0].annual_trade_volume, Some(12.5));
        assert_eq!(businesses[1].trade_type, None);
        assert_eq!(businesses[1].region, None);
    }

    #[test]
    fn test_parse_economic_data_skips_text() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(
            dir.path(),
            "economic_data.csv",
            "country,gdp_growth_annual_pct,inflation_consumer_prices_annual_pct\nEgypt,4.35,5.04\nEgypt,3.1,9.0\n",
        );

        let indicators = parse_economic_data(&path).unwrap();
        assert_eq!(indicators.len(), 2);
        assert_eq!(indicators.get("gdp_growth_annual_pct"), Some(4.35));
        assert_eq!(indicators.get("country"), None);
    }
}
