//! Staged cleaning pipeline turning raw sale rows into cleaned, enriched records
//!
//! Each stage is a pure function over an owned working record and the stages
//! run in a fixed order, since later derivations read earlier outputs (sales
//! needs the USD price, which needs the repaired unit count). A row that still
//! has a missing field after the last stage is dropped.

use crate::data::{CleanedSaleRecord, ProductCategory, RawSaleRecord};
use chrono::NaiveDate;
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::debug;

/// Fixed conversion rate: INR per US dollar
pub const INR_PER_USD: f64 = 88.0;

static NUMERIC_SIZE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\d+(\.\d+)?$").expect("Invalid regex: numeric size"));
static LETTER_SIZE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)[smlx]").expect("Invalid regex: letter size"));

/// A textual date layout and where its four-digit year sits
struct DateLayout {
    format: &'static str,
    year_first: bool,
}

/// Tried in order, first success wins. Year-month-day must stay ahead of
/// day-month-year: `01/02/2023` only parses as 1 February because the
/// year-first layouts reject it.
const DATE_LAYOUTS: [DateLayout; 4] = [
    DateLayout { format: "%Y-%m-%d", year_first: true },
    DateLayout { format: "%Y/%m/%d", year_first: true },
    DateLayout { format: "%d-%m-%Y", year_first: false },
    DateLayout { format: "%d/%m/%Y", year_first: false },
];

/// Row counts from one cleaning run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CleanStats {
    pub input_rows: usize,
    pub kept_rows: usize,
    pub dropped_rows: usize,
}

/// A row in flight between stages
#[derive(Debug, Clone, Default)]
struct WorkingRecord {
    order_id: Option<String>,
    order_date_text: Option<String>,
    product_line: Option<String>,
    product_name: Option<String>,
    size: Option<String>,
    raw_units: Option<i64>,
    mrp: Option<f64>,
    sales_channel: Option<String>,
    region: Option<String>,
    gender_category: Option<String>,
    units_sold: Option<u32>,
    price_usd: Option<f64>,
    sales: Option<f64>,
    product_category: Option<ProductCategory>,
    order_date: Option<NaiveDate>,
}

type Stage = fn(WorkingRecord) -> WorkingRecord;

/// Derivation stages, applied to every row after pruning
const STAGES: [Stage; 6] = [
    normalize_units,
    convert_currency,
    derive_sales,
    normalize_region_stage,
    classify_category,
    parse_date_stage,
];

/// Clean a batch of raw records
///
/// Never fails: malformed unit counts are repaired to zero and any row left
/// with a missing field is dropped. The input is not modified.
pub fn clean(raw_records: &[RawSaleRecord]) -> Vec<CleanedSaleRecord> {
    clean_with_stats(raw_records).0
}

/// Clean a batch of raw records and report how many rows were dropped
pub fn clean_with_stats(raw_records: &[RawSaleRecord]) -> (Vec<CleanedSaleRecord>, CleanStats) {
    let cleaned: Vec<CleanedSaleRecord> = raw_records.iter().filter_map(clean_record).collect();

    let stats = CleanStats {
        input_rows: raw_records.len(),
        kept_rows: cleaned.len(),
        dropped_rows: raw_records.len() - cleaned.len(),
    };
    debug!(
        "Cleaning kept {} of {} rows ({} dropped)",
        stats.kept_rows, stats.input_rows, stats.dropped_rows
    );

    (cleaned, stats)
}

/// Run a single row through every stage; `None` when the row is incomplete
pub fn clean_record(raw: &RawSaleRecord) -> Option<CleanedSaleRecord> {
    let record = STAGES.iter().fold(prune(raw), |record, stage| stage(record));
    complete(record)
}

/// Round to two decimals, ties to even on the scaled value
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round_ties_even() / 100.0
}

/// INR price to USD, rounded to cents
pub fn to_usd(mrp: f64) -> f64 {
    round2(mrp / INR_PER_USD)
}

/// Map Bangalore/Bengaluru and Hyderabad spellings onto one label each
///
/// Matching is an anchored, case-insensitive prefix test: "Bangalore Urban"
/// becomes "Bengaluru" but "East Bangalore" is left alone.
pub fn normalize_region(region: &str) -> String {
    let lowered = region.trim().to_lowercase();
    if lowered.starts_with("beng") || lowered.starts_with("bang") {
        "Bengaluru".to_string()
    } else if lowered.starts_with("hyd") {
        "Hyderabad".to_string()
    } else {
        region.to_string()
    }
}

/// Derive the product category from a size code
///
/// Purely numeric sizes (`8`, `8.5`) are shoes; anything containing one of
/// the letters s, m, l or x is a garment. A code matching neither has no
/// category.
pub fn classify_size(size: Option<&str>) -> Option<ProductCategory> {
    let size = size?;
    if NUMERIC_SIZE.is_match(size) {
        Some(ProductCategory::Footwear)
    } else if LETTER_SIZE.is_match(size) {
        Some(ProductCategory::Apparel)
    } else {
        None
    }
}

/// Parse an order date written year-month-day or day-month-year
pub fn parse_order_date(text: &str) -> Option<NaiveDate> {
    let text = text.trim();
    DATE_LAYOUTS
        .iter()
        .filter(|layout| has_four_digit_year(text, layout.year_first))
        .find_map(|layout| NaiveDate::parse_from_str(text, layout.format).ok())
}

fn has_four_digit_year(text: &str, year_first: bool) -> bool {
    let bytes = text.as_bytes();
    if bytes.len() < 5 {
        return false;
    }
    let (year, neighbour) = if year_first {
        (&bytes[..4], bytes[4])
    } else {
        (&bytes[bytes.len() - 4..], bytes[bytes.len() - 5])
    };
    year.iter().all(u8::is_ascii_digit) && !neighbour.is_ascii_digit()
}

/// Step 1: drop revenue, profit and discount
fn prune(raw: &RawSaleRecord) -> WorkingRecord {
    WorkingRecord {
        order_id: raw.order_id.clone(),
        order_date_text: raw.order_date.clone(),
        product_line: raw.product_line.clone(),
        product_name: raw.product_name.clone(),
        size: raw.size.clone(),
        raw_units: raw.units_sold,
        mrp: raw.mrp,
        sales_channel: raw.sales_channel.clone(),
        region: raw.region.clone(),
        gender_category: raw.gender_category.clone(),
        ..WorkingRecord::default()
    }
}

/// Step 2: negative or missing unit counts become zero
fn normalize_units(mut record: WorkingRecord) -> WorkingRecord {
    let units = record.raw_units.filter(|units| *units > 0).unwrap_or(0);
    record.units_sold = Some(u32::try_from(units).unwrap_or(u32::MAX));
    record
}

/// Step 3
fn convert_currency(mut record: WorkingRecord) -> WorkingRecord {
    record.price_usd = record.mrp.map(to_usd);
    record
}

/// Step 4
fn derive_sales(mut record: WorkingRecord) -> WorkingRecord {
    record.sales = match (record.units_sold, record.price_usd) {
        (Some(units), Some(price)) => Some(round2(f64::from(units) * price)),
        _ => None,
    };
    record
}

/// Step 5
fn normalize_region_stage(mut record: WorkingRecord) -> WorkingRecord {
    record.region = record.region.as_deref().map(normalize_region);
    record
}

/// Step 6
fn classify_category(mut record: WorkingRecord) -> WorkingRecord {
    record.product_category = classify_size(record.size.as_deref());
    record
}

/// Step 7
fn parse_date_stage(mut record: WorkingRecord) -> WorkingRecord {
    record.order_date = record.order_date_text.as_deref().and_then(parse_order_date);
    record
}

/// Step 8: keep the row only if every field is present
fn complete(record: WorkingRecord) -> Option<CleanedSaleRecord> {
    Some(CleanedSaleRecord {
        order_id: record.order_id?,
        order_date: record.order_date?,
        product_line: record.product_line?,
        product_name: record.product_name?,
        size: record.size?,
        units_sold: record.units_sold?,
        mrp: record.mrp?,
        price_usd: record.price_usd?,
        sales: record.sales?,
        sales_channel: record.sales_channel?,
        region: record.region?,
        gender_category: record.gender_category?,
        product_category: record.product_category?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(
        units: Option<i64>,
        mrp: Option<f64>,
        region: &str,
        size: &str,
        order_date: &str,
    ) -> RawSaleRecord {
        RawSaleRecord {
            order_id: Some("ORD001".to_string()),
            order_date: Some(order_date.to_string()),
            product_line: Some("Running".to_string()),
            product_name: Some("Air Zoom".to_string()),
            size: Some(size.to_string()),
            units_sold: units,
            mrp,
            sales_channel: Some("Online".to_string()),
            region: Some(region.to_string()),
            gender_category: Some("Men".to_string()),
            revenue: Some(1.0),
            profit: Some(1.0),
            discount_applied: Some("0.1".to_string()),
        }
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn sample_batch() -> Vec<RawSaleRecord> {
        vec![
            raw(Some(-5), Some(880.0), "Bangalore", "8", "2023-01-15"),
            raw(Some(3), Some(264.0), "Hyderabad North", "M", "15-01-2023"),
            raw(None, Some(999.0), "bengaluru", "XL", "2023/03/02"),
            raw(Some(12), Some(4599.0), "Mumbai", "9.5", "01/02/2023"),
            raw(Some(1), Some(1299.0), "HYD", "xs", "2023-12-31"),
            raw(Some(7), Some(2500.0), "Delhi", "L", "2024-06-30"),
            raw(Some(2), None, "Chennai", "M", "2023-01-01"),
            raw(Some(2), Some(100.0), "Chennai", "Free", "2023-01-01"),
            raw(Some(2), Some(100.0), "Chennai", "M", "not a date"),
        ]
    }

    #[test]
    fn test_bangalore_footwear_scenario() {
        let cleaned = clean_record(&raw(Some(-5), Some(880.0), "Bangalore", "8", "2023-01-15")).unwrap();

        assert_eq!(cleaned.units_sold, 0);
        assert_eq!(cleaned.price_usd, 10.0);
        assert_eq!(cleaned.sales, 0.0);
        assert_eq!(cleaned.region, "Bengaluru");
        assert_eq!(cleaned.product_category, ProductCategory::Footwear);
        assert_eq!(cleaned.order_date, date(2023, 1, 15));
    }

    #[test]
    fn test_hyderabad_apparel_scenario() {
        let cleaned =
            clean_record(&raw(Some(3), Some(264.0), "Hyderabad North", "M", "15-01-2023")).unwrap();

        assert_eq!(cleaned.region, "Hyderabad");
        assert_eq!(cleaned.product_category, ProductCategory::Apparel);
        assert_eq!(cleaned.price_usd, 3.0);
        assert_eq!(cleaned.sales, 9.0);
        assert_eq!(cleaned.order_date, date(2023, 1, 15));
    }

    #[test]
    fn test_missing_mrp_drops_row() {
        assert!(clean_record(&raw(Some(3), None, "Delhi", "M", "2023-01-15")).is_none());
    }

    #[test]
    fn test_mixed_size_code_is_apparel() {
        let cleaned = clean_record(&raw(Some(1), Some(88.0), "Delhi", "XL7", "2023-01-15")).unwrap();
        assert_eq!(cleaned.product_category, ProductCategory::Apparel);
    }

    #[test]
    fn test_missing_units_become_zero() {
        let cleaned = clean_record(&raw(None, Some(999.0), "Pune", "XL", "2023-03-02")).unwrap();
        assert_eq!(cleaned.units_sold, 0);
        assert_eq!(cleaned.price_usd, 11.35);
        assert_eq!(cleaned.sales, 0.0);
    }

    #[test]
    fn test_missing_text_field_drops_row() {
        let mut record = raw(Some(1), Some(88.0), "Delhi", "M", "2023-01-15");
        record.gender_category = None;
        assert!(clean_record(&record).is_none());
    }

    #[test]
    fn test_pruned_fields_do_not_affect_completeness() {
        let mut record = raw(Some(1), Some(88.0), "Delhi", "M", "2023-01-15");
        record.revenue = None;
        record.profit = None;
        record.discount_applied = None;
        assert!(clean_record(&record).is_some());
    }

    #[test]
    fn test_clean_with_stats() {
        let batch = sample_batch();
        let (cleaned, stats) = clean_with_stats(&batch);

        assert_eq!(stats.input_rows, 9);
        assert_eq!(stats.kept_rows, 6);
        assert_eq!(stats.dropped_rows, 3);
        assert_eq!(cleaned.len(), 6);
        assert_eq!(clean(&batch), cleaned);
    }

    #[test]
    fn test_clean_does_not_mutate_input() {
        let batch = sample_batch();
        let before = batch.clone();
        let _ = clean(&batch);
        assert_eq!(batch, before);
    }

    #[test]
    fn test_cleaned_invariants() {
        let batch = sample_batch();
        let cleaned = clean(&batch);

        for record in &cleaned {
            assert_eq!(record.price_usd, round2(record.mrp / 88.0));
            assert_eq!(record.sales, round2(f64::from(record.units_sold) * record.price_usd));

            let lowered = record.region.to_lowercase();
            let raw_spelling = (lowered.starts_with("beng") || lowered.starts_with("bang") || lowered.starts_with("hyd"))
                && record.region != "Bengaluru"
                && record.region != "Hyderabad";
            assert!(!raw_spelling, "region {} was not normalized", record.region);
        }
    }

    #[test]
    fn test_clean_is_idempotent() {
        let cleaned = clean(&sample_batch());
        let reraw: Vec<RawSaleRecord> = cleaned.iter().map(RawSaleRecord::from).collect();

        assert_eq!(clean(&reraw), cleaned);
    }

    #[test]
    fn test_normalize_region() {
        assert_eq!(normalize_region("Bangalore"), "Bengaluru");
        assert_eq!(normalize_region("BENGALURU"), "Bengaluru");
        assert_eq!(normalize_region("bangalore urban"), "Bengaluru");
        assert_eq!(normalize_region("Hyderabad North"), "Hyderabad");
        assert_eq!(normalize_region("hyd"), "Hyderabad");
        assert_eq!(normalize_region("East Bangalore"), "East Bangalore");
        assert_eq!(normalize_region("Mumbai"), "Mumbai");
        assert_eq!(normalize_region("Bengaluru"), "Bengaluru");
    }

    #[test]
    fn test_classify_size() {
        assert_eq!(classify_size(Some("7")), Some(ProductCategory::Footwear));
        assert_eq!(classify_size(Some("8.5")), Some(ProductCategory::Footwear));
        assert_eq!(classify_size(Some("12")), Some(ProductCategory::Footwear));
        assert_eq!(classify_size(Some("M")), Some(ProductCategory::Apparel));
        assert_eq!(classify_size(Some("xxl")), Some(ProductCategory::Apparel));
        assert_eq!(classify_size(Some("XL7")), Some(ProductCategory::Apparel));
        assert_eq!(classify_size(Some("8.")), None);
        assert_eq!(classify_size(Some("Free")), None);
        assert_eq!(classify_size(Some("")), None);
        assert_eq!(classify_size(None), None);
    }

    #[test]
    fn test_parse_order_date() {
        assert_eq!(parse_order_date("2023-01-15"), Some(date(2023, 1, 15)));
        assert_eq!(parse_order_date("15-01-2023"), Some(date(2023, 1, 15)));
        assert_eq!(parse_order_date("2023/01/02"), Some(date(2023, 1, 2)));
        // year-first layouts fail, so this is 1 February
        assert_eq!(parse_order_date("01/02/2023"), Some(date(2023, 2, 1)));
        assert_eq!(parse_order_date(" 2024-02-29 "), Some(date(2024, 2, 29)));
        assert_eq!(parse_order_date("2023-02-29"), None);
        assert_eq!(parse_order_date("31-02-2023"), None);
        assert_eq!(parse_order_date("2023-13-01"), None);
        assert_eq!(parse_order_date("01-02-03"), None);
        assert_eq!(parse_order_date(""), None);
    }

    #[test]
    fn test_round2() {
        assert_eq!(round2(10.0), 10.0);
        assert_eq!(round2(11.352_272), 11.35);
        assert_eq!(round2(52.261_363), 52.26);
        assert_eq!(to_usd(880.0), 10.0);
        assert_eq!(to_usd(4599.0), 52.26);
    }
}
