//! SalesForge: a Rust CLI application for cleaning retail sales data and charting it
//!
//! This library loads a retail sales CSV, runs it through a staged cleaning
//! pipeline (units repair, INR to USD conversion, region and category
//! normalization, date parsing) and aggregates the cleaned records into the
//! eleven breakdowns rendered as charts.

pub mod clean;
pub mod cli;
pub mod data;
pub mod report;
pub mod viz;

// Re-export public items for easier access
pub use clean::{clean, clean_with_stats, CleanStats};
pub use cli::Args;
pub use data::{load_sales_csv, CleanedSaleRecord, ProductCategory, RawSaleRecord};
pub use report::{build_report, SalesReport};
pub use viz::{render_report, ChartOptions};

/// Common result type used throughout the application
pub type Result<T> = anyhow::Result<T>;
