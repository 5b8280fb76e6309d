//! Sales aggregations computed with Polars group-bys over the cleaned records

use crate::clean::round2;
use crate::data::{CleanedSaleRecord, ProductCategory};
use chrono::Datelike;
use polars::prelude::*;
use tracing::{debug, warn};

/// Lower edges of the USD price bins; the last bin is open-ended
pub const PRICE_BIN_EDGES: [f64; 7] = [0.0, 50.0, 100.0, 150.0, 200.0, 250.0, 300.0];

/// Display labels matching `PRICE_BIN_EDGES`
pub const PRICE_BIN_LABELS: [&str; 7] = [
    "$0-50", "$50-100", "$100-150", "$150-200", "$200-250", "$250-300", "$300+",
];

const MONTH_NAMES: [&str; 12] = [
    "Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec",
];

/// One labelled measure of a single-key aggregation
#[derive(Debug, Clone, PartialEq)]
pub struct Breakdown {
    pub label: String,
    pub value: f64,
}

/// A breakdown carrying its percentage of the grand total
#[derive(Debug, Clone, PartialEq)]
pub struct ShareBreakdown {
    pub label: String,
    pub value: f64,
    /// Percent of the total, 0-100
    pub share: f64,
}

/// Two-key aggregation as a dense matrix; missing combinations are 0
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CrossTab {
    pub rows: Vec<String>,
    pub columns: Vec<String>,
    /// `values[row][column]`
    pub values: Vec<Vec<f64>>,
}

impl CrossTab {
    /// Pivot long-form (row, column, value) triples
    ///
    /// Rows keep their first-seen order, so feed them sorted. Columns are
    /// sorted alphabetically.
    fn from_long(row_keys: &[String], column_keys: &[String], measures: &[f64]) -> Self {
        let mut rows: Vec<String> = Vec::new();
        for key in row_keys {
            if !rows.contains(key) {
                rows.push(key.clone());
            }
        }
        let mut columns: Vec<String> = column_keys.to_vec();
        columns.sort();
        columns.dedup();

        let mut values = vec![vec![0.0; columns.len()]; rows.len()];
        for ((row, column), value) in row_keys.iter().zip(column_keys).zip(measures) {
            if let (Some(r), Some(c)) = (
                rows.iter().position(|x| x == row),
                columns.iter().position(|x| x == column),
            ) {
                values[r][c] += value;
            }
        }

        CrossTab { rows, columns, values }
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty() || self.columns.is_empty()
    }

    /// Value at (row label, column label), if both exist
    pub fn get(&self, row: &str, column: &str) -> Option<f64> {
        let r = self.rows.iter().position(|x| x == row)?;
        let c = self.columns.iter().position(|x| x == column)?;
        Some(self.values[r][c])
    }

    pub fn max_value(&self) -> f64 {
        self.values.iter().flatten().fold(0.0, |a, &b| a.max(b))
    }
}

/// Units sold per price bin for one product category
#[derive(Debug, Clone, PartialEq)]
pub struct PriceBinUnits {
    pub category: ProductCategory,
    /// One entry per bin, in `PRICE_BIN_LABELS` order
    pub bins: Vec<Breakdown>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RegionSummary {
    pub region: String,
    pub avg_price_usd: f64,
    pub total_sales: f64,
    pub total_units: f64,
}

/// Every aggregation the charts are drawn from
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SalesReport {
    pub record_count: usize,
    pub total_sales: f64,
    pub total_units: u64,
    pub sales_by_product_line: Vec<Breakdown>,
    pub sales_by_category: Vec<ShareBreakdown>,
    pub sales_by_region: Vec<Breakdown>,
    pub sales_by_gender: Vec<Breakdown>,
    pub sales_by_channel: Vec<Breakdown>,
    /// Rows: channel, columns: category
    pub units_by_channel_category: CrossTab,
    /// Rows: `YYYY-MM`, columns: channel
    pub monthly_units_by_channel: CrossTab,
    /// Keyed by `YYYY-MM`
    pub monthly_sales: Vec<Breakdown>,
    /// Rows: month of year with all years folded together, columns: category
    pub seasonal_units_by_category: CrossTab,
    pub units_by_price_bin: Vec<PriceBinUnits>,
    /// Rows: category, columns: gender
    pub units_by_category_gender: CrossTab,
    pub region_summary: Vec<RegionSummary>,
}

/// Index of the price bin holding `price`; `None` for negative or NaN prices
pub fn price_bin(price: f64) -> Option<usize> {
    if price.is_nan() || price < PRICE_BIN_EDGES[0] {
        return None;
    }
    PRICE_BIN_EDGES.iter().rposition(|edge| price >= *edge)
}

/// Build every aggregation from the cleaned records
///
/// # Arguments
/// * `records` - Output of the cleaning pipeline
///
/// # Returns
/// * `SalesReport`; empty (all tables empty) when there are no records
pub fn build_report(records: &[CleanedSaleRecord]) -> crate::Result<SalesReport> {
    if records.is_empty() {
        warn!("No cleaned records to aggregate");
        return Ok(SalesReport::default());
    }

    let df = sales_frame(records)?;
    debug!("Aggregating frame of shape {:?}", df.shape());

    let total_sales = round2(records.iter().map(|r| r.sales).sum());
    let total_units: u64 = records.iter().map(|r| u64::from(r.units_sold)).sum();

    let sales_by_category = sum_by(&df, "product_category", "sales")?
        .into_iter()
        .map(|b| ShareBreakdown {
            share: if total_sales > 0.0 { b.value / total_sales * 100.0 } else { 0.0 },
            label: b.label,
            value: b.value,
        })
        .collect();

    let mut seasonal_units_by_category =
        cross_sum(&df, "month_of_year", "product_category", "units_sold")?;
    seasonal_units_by_category.rows = seasonal_units_by_category
        .rows
        .iter()
        .map(|m| month_name(m))
        .collect();

    Ok(SalesReport {
        record_count: records.len(),
        total_sales,
        total_units,
        sales_by_product_line: sum_by(&df, "product_line", "sales")?,
        sales_by_category,
        sales_by_region: sum_by(&df, "region", "sales")?,
        sales_by_gender: sum_by(&df, "gender_category", "sales")?,
        sales_by_channel: sum_by(&df, "sales_channel", "sales")?,
        units_by_channel_category: cross_sum(&df, "sales_channel", "product_category", "units_sold")?,
        monthly_units_by_channel: cross_sum(&df, "month", "sales_channel", "units_sold")?,
        monthly_sales: sum_by(&df, "month", "sales")?,
        seasonal_units_by_category,
        units_by_price_bin: price_bin_units(&df, records)?,
        units_by_category_gender: cross_sum(&df, "product_category", "gender_category", "units_sold")?,
        region_summary: region_summary(&df)?,
    })
}

impl SalesReport {
    pub fn is_empty(&self) -> bool {
        self.record_count == 0
    }

    /// Print the headline tables to the console
    pub fn print_summary(&self) {
        println!("\n=== Sales Summary ===");
        println!("Cleaned records: {}", self.record_count);
        println!("Total sales (USD): {:.2}", self.total_sales);
        println!("Total units sold: {}", self.total_units);

        if self.is_empty() {
            println!("No data to summarize");
            return;
        }

        println!("\nSales by category:");
        for entry in &self.sales_by_category {
            println!("  {:<12} {:>12.2} ({:.1}%)", entry.label, entry.value, entry.share);
        }

        print_breakdown("Sales by product line", &self.sales_by_product_line);
        print_breakdown("Sales by region", &self.sales_by_region);
        print_breakdown("Sales by gender", &self.sales_by_gender);
        print_breakdown("Sales by channel", &self.sales_by_channel);

        println!("\nRegion summary:");
        println!("  Region          | Avg price | Total sales | Units");
        println!("  ----------------|-----------|-------------|------");
        for region in &self.region_summary {
            println!(
                "  {:<15} | {:9.2} | {:11.2} | {:5}",
                region.region, region.avg_price_usd, region.total_sales, region.total_units
            );
        }
    }
}

fn print_breakdown(title: &str, entries: &[Breakdown]) {
    println!("\n{}:", title);
    for entry in entries {
        println!("  {:<20} {:>12.2}", entry.label, entry.value);
    }
}

/// Flatten the records into a frame with the derived reporting keys
fn sales_frame(records: &[CleanedSaleRecord]) -> crate::Result<DataFrame> {
    let df = df!(
        "product_line" => records.iter().map(|r| r.product_line.as_str()).collect::<Vec<_>>(),
        "product_category" => records.iter().map(|r| r.product_category.as_str()).collect::<Vec<_>>(),
        "region" => records.iter().map(|r| r.region.as_str()).collect::<Vec<_>>(),
        "gender_category" => records.iter().map(|r| r.gender_category.as_str()).collect::<Vec<_>>(),
        "sales_channel" => records.iter().map(|r| r.sales_channel.as_str()).collect::<Vec<_>>(),
        "month" => records.iter().map(|r| r.order_date.format("%Y-%m").to_string()).collect::<Vec<_>>(),
        "month_of_year" => records.iter().map(|r| i64::from(r.order_date.month())).collect::<Vec<_>>(),
        "price_bin" => records
            .iter()
            .map(|r| price_bin(r.price_usd).map_or(-1, |bin| bin as i64))
            .collect::<Vec<_>>(),
        "units_sold" => records.iter().map(|r| i64::from(r.units_sold)).collect::<Vec<_>>(),
        "price_usd" => records.iter().map(|r| r.price_usd).collect::<Vec<_>>(),
        "sales" => records.iter().map(|r| r.sales).collect::<Vec<_>>()
    )?;

    Ok(df)
}

/// Group by `keys`, apply `aggs` and sort by the keys
fn aggregate(df: &DataFrame, keys: &[&str], aggs: Vec<Expr>) -> PolarsResult<DataFrame> {
    let key_exprs: Vec<Expr> = keys.iter().map(|key| col(*key)).collect();

    df.clone()
        .lazy()
        .group_by(key_exprs.clone())
        .agg(aggs)
        .sort_by_exprs(key_exprs, SortMultipleOptions::default())
        .collect()
}

/// Sum one measure per key
fn sum_by(df: &DataFrame, key: &str, measure: &str) -> crate::Result<Vec<Breakdown>> {
    let grouped = aggregate(df, &[key], vec![col(measure).sum()])?;

    let labels = text_values(&grouped, key)?;
    let values = float_values(&grouped, measure)?;

    Ok(labels
        .into_iter()
        .zip(values)
        .map(|(label, value)| Breakdown { label, value: round2(value) })
        .collect())
}

/// Sum one measure per (row key, column key) and pivot
fn cross_sum(df: &DataFrame, row_key: &str, column_key: &str, measure: &str) -> crate::Result<CrossTab> {
    let grouped = aggregate(df, &[row_key, column_key], vec![col(measure).sum()])?;

    let rows = text_values(&grouped, row_key)?;
    let columns = text_values(&grouped, column_key)?;
    let values: Vec<f64> = float_values(&grouped, measure)?.into_iter().map(round2).collect();

    Ok(CrossTab::from_long(&rows, &columns, &values))
}

/// Units per price bin, one full set of bins per category present
fn price_bin_units(df: &DataFrame, records: &[CleanedSaleRecord]) -> crate::Result<Vec<PriceBinUnits>> {
    let binned = df.clone().lazy().filter(col("price_bin").gt_eq(lit(0))).collect()?;
    let grouped = aggregate(&binned, &["product_category", "price_bin"], vec![col("units_sold").sum()])?;

    let categories = text_values(&grouped, "product_category")?;
    let bins = float_values(&grouped, "price_bin")?;
    let units = float_values(&grouped, "units_sold")?;

    let result = ProductCategory::ALL
        .iter()
        .filter(|category| records.iter().any(|r| r.product_category == **category))
        .map(|category| {
            let mut totals = [0.0; PRICE_BIN_LABELS.len()];
            for ((name, bin), value) in categories.iter().zip(&bins).zip(&units) {
                let index = *bin as usize;
                if name == category.as_str() && index < totals.len() {
                    totals[index] += value;
                }
            }
            PriceBinUnits {
                category: *category,
                bins: PRICE_BIN_LABELS
                    .iter()
                    .zip(totals)
                    .map(|(label, value)| Breakdown { label: label.to_string(), value })
                    .collect(),
            }
        })
        .collect();

    Ok(result)
}

/// Average price, total sales and total units per region
fn region_summary(df: &DataFrame) -> crate::Result<Vec<RegionSummary>> {
    let grouped = aggregate(
        df,
        &["region"],
        vec![
            col("price_usd").mean().alias("avg_price_usd"),
            col("sales").sum().alias("total_sales"),
            col("units_sold").sum().alias("total_units"),
        ],
    )?;

    let regions = text_values(&grouped, "region")?;
    let prices = float_values(&grouped, "avg_price_usd")?;
    let sales = float_values(&grouped, "total_sales")?;
    let units = float_values(&grouped, "total_units")?;

    Ok(regions
        .into_iter()
        .enumerate()
        .map(|(i, region)| RegionSummary {
            region,
            avg_price_usd: round2(prices[i]),
            total_sales: round2(sales[i]),
            total_units: units[i],
        })
        .collect())
}

fn text_values(df: &DataFrame, name: &str) -> crate::Result<Vec<String>> {
    let column = df.column(name)?.cast(&DataType::String)?;
    Ok(column
        .str()?
        .into_iter()
        .map(|value| value.unwrap_or_default().to_string())
        .collect())
}

fn float_values(df: &DataFrame, name: &str) -> crate::Result<Vec<f64>> {
    let column = df.column(name)?.cast(&DataType::Float64)?;
    Ok(column.f64()?.into_iter().map(|value| value.unwrap_or(0.0)).collect())
}

/// "1" -> "Jan"; anything unparseable is returned as is
fn month_name(month: &str) -> String {
    month
        .parse::<usize>()
        .ok()
        .and_then(|m| m.checked_sub(1))
        .and_then(|i| MONTH_NAMES.get(i))
        .map_or_else(|| month.to_string(), |name| name.to_string())
}
