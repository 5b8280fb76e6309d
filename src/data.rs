//! Sale record types and CSV loading using Polars

use anyhow::Context;
use chrono::NaiveDate;
use polars::prelude::*;
use std::collections::HashMap;
use std::fmt;
use std::path::PathBuf;
use tracing::debug;

/// Columns every input file must carry, after header normalization
pub const REQUIRED_COLUMNS: [&str; 10] = [
    "order_id",
    "order_date",
    "product_line",
    "product_name",
    "size",
    "units_sold",
    "mrp",
    "sales_channel",
    "region",
    "gender_category",
];

/// One input row as read from the CSV. Every field may be missing.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawSaleRecord {
    pub order_id: Option<String>,
    /// Order date text, either year-month-day or day-month-year
    pub order_date: Option<String>,
    pub product_line: Option<String>,
    pub product_name: Option<String>,
    /// Numeric shoe size or letter-coded garment size
    pub size: Option<String>,
    /// Signed as read; negative values are repaired during cleaning
    pub units_sold: Option<i64>,
    /// Maximum retail price in INR
    pub mrp: Option<f64>,
    pub sales_channel: Option<String>,
    pub region: Option<String>,
    pub gender_category: Option<String>,
    pub revenue: Option<f64>,
    pub profit: Option<f64>,
    pub discount_applied: Option<String>,
}

/// Product category derived from the size code
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ProductCategory {
    Footwear,
    Apparel,
}

impl ProductCategory {
    pub const ALL: [ProductCategory; 2] = [ProductCategory::Footwear, ProductCategory::Apparel];

    pub fn as_str(&self) -> &'static str {
        match self {
            ProductCategory::Footwear => "Footwear",
            ProductCategory::Apparel => "Apparel",
        }
    }
}

impl fmt::Display for ProductCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A sale row that passed every derivation and the completeness filter
#[derive(Debug, Clone, PartialEq)]
pub struct CleanedSaleRecord {
    pub order_id: String,
    pub order_date: NaiveDate,
    pub product_line: String,
    pub product_name: String,
    pub size: String,
    pub units_sold: u32,
    /// Source price in INR, kept so the USD price can be re-derived
    pub mrp: f64,
    /// `mrp / 88`, rounded to cents
    pub price_usd: f64,
    /// `units_sold * price_usd`, rounded to cents
    pub sales: f64,
    pub sales_channel: String,
    /// Normalized region label
    pub region: String,
    pub gender_category: String,
    pub product_category: ProductCategory,
}

impl From<&CleanedSaleRecord> for RawSaleRecord {
    fn from(record: &CleanedSaleRecord) -> Self {
        RawSaleRecord {
            order_id: Some(record.order_id.clone()),
            order_date: Some(record.order_date.format("%Y-%m-%d").to_string()),
            product_line: Some(record.product_line.clone()),
            product_name: Some(record.product_name.clone()),
            size: Some(record.size.clone()),
            units_sold: Some(i64::from(record.units_sold)),
            mrp: Some(record.mrp),
            sales_channel: Some(record.sales_channel.clone()),
            region: Some(record.region.clone()),
            gender_category: Some(record.gender_category.clone()),
            revenue: None,
            profit: None,
            discount_applied: None,
        }
    }
}

/// Load a sales CSV into raw records
///
/// Every column is read as text so that a single malformed cell cannot make
/// type inference reject the whole file; numeric fields are parsed per cell
/// and become `None` when they do not parse.
///
/// # Arguments
/// * `file_path` - Path to the CSV file
///
/// # Returns
/// * One `RawSaleRecord` per data row, in file order
pub fn load_sales_csv(file_path: &str) -> crate::Result<Vec<RawSaleRecord>> {
    let df = CsvReadOptions::default()
        .with_has_header(true)
        .with_infer_schema_length(Some(0))
        .try_into_reader_with_file_path(Some(PathBuf::from(file_path)))?
        .finish()
        .with_context(|| format!("Failed to read sales CSV: {}", file_path))?;

    debug!("Read {} rows x {} columns from {}", df.height(), df.width(), file_path);

    records_from_frame(&df)
}

/// Convert a text-typed DataFrame into raw records
pub fn records_from_frame(df: &DataFrame) -> crate::Result<Vec<RawSaleRecord>> {
    let columns: HashMap<String, String> = df
        .get_column_names()
        .into_iter()
        .map(|name| (normalize_header(name.as_str()), name.to_string()))
        .collect();

    if let Some(missing) = REQUIRED_COLUMNS.iter().find(|c| !columns.contains_key(**c)) {
        anyhow::bail!("Missing required column '{}' in input data", missing);
    }

    let text = |name: &str| text_column(df, columns.get(name).map(String::as_str));

    let order_ids = text("order_id")?;
    let order_dates = text("order_date")?;
    let product_lines = text("product_line")?;
    let product_names = text("product_name")?;
    let sizes = text("size")?;
    let units = text("units_sold")?;
    let mrps = text("mrp")?;
    let channels = text("sales_channel")?;
    let regions = text("region")?;
    let genders = text("gender_category")?;
    let revenues = text("revenue")?;
    let profits = text("profit")?;
    let discounts = text("discount_applied")?;

    let records = (0..df.height())
        .map(|i| RawSaleRecord {
            order_id: order_ids[i].clone(),
            order_date: order_dates[i].clone(),
            product_line: product_lines[i].clone(),
            product_name: product_names[i].clone(),
            size: sizes[i].clone(),
            units_sold: units[i].as_deref().and_then(parse_units),
            mrp: mrps[i].as_deref().and_then(parse_amount),
            sales_channel: channels[i].clone(),
            region: regions[i].clone(),
            gender_category: genders[i].clone(),
            revenue: revenues[i].as_deref().and_then(parse_amount),
            profit: profits[i].as_deref().and_then(parse_amount),
            discount_applied: discounts[i].clone(),
        })
        .collect();

    Ok(records)
}

/// Normalize a header so that `Order_Date`, `order date` and `ORDER-DATE` all match
pub fn normalize_header(name: &str) -> String {
    name.trim()
        .to_lowercase()
        .chars()
        .map(|c| if c == ' ' || c == '-' { '_' } else { c })
        .collect()
}

/// Extract a column as optional strings; empty cells and absent columns become `None`
fn text_column(df: &DataFrame, name: Option<&str>) -> crate::Result<Vec<Option<String>>> {
    let Some(name) = name else {
        return Ok(vec![None; df.height()]);
    };

    let column = df.column(name)?.cast(&DataType::String)?;
    let values = column
        .str()?
        .into_iter()
        .map(|value| value.filter(|s| !s.is_empty()).map(str::to_string))
        .collect();

    Ok(values)
}

/// Parse a unit count, accepting integral floats such as `3.0`
fn parse_units(value: &str) -> Option<i64> {
    let trimmed = value.trim();
    trimmed.parse::<i64>().ok().or_else(|| {
        trimmed
            .parse::<f64>()
            .ok()
            .filter(|v| v.is_finite() && v.fract() == 0.0)
            .map(|v| v as i64)
    })
}

fn parse_amount(value: &str) -> Option<f64> {
    value.trim().parse::<f64>().ok().filter(|v| v.is_finite())
}
