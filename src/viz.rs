//! Chart rendering using Plotters, one PNG per aggregation

use crate::report::{Breakdown, CrossTab, RegionSummary, SalesReport};
use plotters::coord::Shift;
use plotters::prelude::*;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

type Area<'a> = DrawingArea<BitMapBackend<'a>, Shift>;

/// Color palette cycled through for bars and series
const SERIES_COLORS: [RGBColor; 6] = [
    RGBColor(31, 119, 180),
    RGBColor(255, 127, 14),
    RGBColor(44, 160, 44),
    RGBColor(214, 39, 40),
    RGBColor(148, 103, 189),
    RGBColor(140, 86, 75),
];

/// File names of the eleven charts, in rendering order
pub const CHART_FILES: [&str; 11] = [
    "01_sales_by_product_line.png",
    "02_sales_by_category.png",
    "03_sales_by_region.png",
    "04_sales_by_gender.png",
    "05_sales_by_channel.png",
    "06_units_by_channel_category.png",
    "07_monthly_trend.png",
    "08_seasonal_units_by_category.png",
    "09_units_by_price_bin.png",
    "10_units_by_category_gender.png",
    "11_region_summary.png",
];

/// Rendering settings shared by every chart
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChartOptions {
    /// (width, height) in pixels
    pub size: (u32, u32),
}

impl Default for ChartOptions {
    fn default() -> Self {
        Self { size: (1000, 600) }
    }
}

/// Render every chart of the report into `output_dir`
///
/// # Arguments
/// * `report` - Aggregated sales data
/// * `output_dir` - Directory for the PNG files, created if missing
/// * `options` - Chart size
///
/// # Returns
/// * Paths of the written files, in `CHART_FILES` order
pub fn render_report(
    report: &SalesReport,
    output_dir: &Path,
    options: &ChartOptions,
) -> crate::Result<Vec<PathBuf>> {
    fs::create_dir_all(output_dir)?;
    let paths: Vec<PathBuf> = CHART_FILES.iter().map(|name| output_dir.join(name)).collect();
    let size = options.size;

    render_chart(&paths[0], size, |root| {
        draw_bars(root, "Total Sales by Product Line", "Sales (USD)", &report.sales_by_product_line, 0)
    })?;

    let category_share: Vec<Breakdown> = report
        .sales_by_category
        .iter()
        .map(|c| Breakdown {
            label: format!("{} ({:.1}%)", c.label, c.share),
            value: c.value,
        })
        .collect();
    render_chart(&paths[1], size, |root| {
        draw_bars(root, "Total Sales by Product Category", "Sales (USD)", &category_share, 1)
    })?;

    render_chart(&paths[2], size, |root| {
        draw_bars(root, "Total Sales by Region", "Sales (USD)", &report.sales_by_region, 2)
    })?;
    render_chart(&paths[3], size, |root| {
        draw_bars(root, "Total Sales by Gender Category", "Sales (USD)", &report.sales_by_gender, 3)
    })?;
    render_chart(&paths[4], size, |root| {
        draw_bars(root, "Total Sales by Sales Channel", "Sales (USD)", &report.sales_by_channel, 4)
    })?;
    render_chart(&paths[5], size, |root| {
        draw_grouped_bars(
            root,
            "Units Sold by Channel and Category",
            "Units",
            &report.units_by_channel_category,
        )
    })?;

    let monthly_sales = single_series(&report.monthly_sales, "Sales (USD)");
    render_chart(&paths[6], size, |root| {
        let panels = root.split_evenly((2, 1));
        draw_lines(&panels[0], "Monthly Units Sold by Channel", "Units", &report.monthly_units_by_channel)?;
        draw_lines(&panels[1], "Monthly Total Sales", "Sales (USD)", &monthly_sales)
    })?;

    render_chart(&paths[7], size, |root| {
        draw_lines(
            root,
            "Units Sold by Month of Year and Category",
            "Units",
            &report.seasonal_units_by_category,
        )
    })?;

    render_chart(&paths[8], size, |root| {
        if report.units_by_price_bin.is_empty() {
            return draw_placeholder(root, "Units Sold by Price Range");
        }
        let panels = root.split_evenly((1, report.units_by_price_bin.len()));
        for (i, (panel, bins)) in panels.iter().zip(&report.units_by_price_bin).enumerate() {
            let title = format!("{} Units by Price Range", bins.category);
            draw_bars(panel, &title, "Units", &bins.bins, i)?;
        }
        Ok(())
    })?;

    render_chart(&paths[9], size, |root| {
        draw_grouped_bars(
            root,
            "Units Sold by Category and Gender",
            "Units",
            &report.units_by_category_gender,
        )
    })?;

    let (avg_price, total_sales, total_units) = region_panels(report);
    render_chart(&paths[10], size, |root| {
        let panels = root.split_evenly((1, 3));
        draw_bars(&panels[0], "Average Price by Region", "Price (USD)", &avg_price, 0)?;
        draw_bars(&panels[1], "Total Sales by Region", "Sales (USD)", &total_sales, 1)?;
        draw_bars(&panels[2], "Units Sold by Region", "Units", &total_units, 2)
    })?;

    Ok(paths)
}

/// Create a PNG canvas, hand it to `draw` and flush it to disk
fn render_chart(
    path: &Path,
    size: (u32, u32),
    draw: impl FnOnce(&Area<'_>) -> crate::Result<()>,
) -> crate::Result<()> {
    let root = BitMapBackend::new(path, size).into_drawing_area();
    root.fill(&WHITE)?;
    draw(&root)?;
    root.present()?;
    debug!("Chart saved to: {}", path.display());
    Ok(())
}

/// Vertical bar chart of a single-key breakdown
fn draw_bars(
    area: &Area<'_>,
    title: &str,
    y_desc: &str,
    entries: &[Breakdown],
    color_index: usize,
) -> crate::Result<()> {
    if entries.is_empty() {
        return draw_placeholder(area, title);
    }

    let labels: Vec<String> = entries.iter().map(|e| e.label.clone()).collect();
    let y_max = axis_max(entries.iter().map(|e| e.value));
    let color = series_color(color_index);

    let mut chart = ChartBuilder::on(area)
        .caption(title, ("sans-serif", 22))
        .margin(10)
        .x_label_area_size(40)
        .y_label_area_size(70)
        .build_cartesian_2d(-0.5f64..(labels.len() as f64 - 0.5), 0f64..y_max)?;

    let x_formatter = |x: &f64| category_label(&labels, *x);
    chart
        .configure_mesh()
        .disable_x_mesh()
        .x_labels(labels.len())
        .x_label_formatter(&x_formatter)
        .y_desc(y_desc)
        .axis_desc_style(("sans-serif", 15))
        .draw()?;

    chart.draw_series(entries.iter().enumerate().map(|(i, entry)| {
        let x = i as f64;
        Rectangle::new([(x - 0.4, 0.0), (x + 0.4, entry.value)], color.filled())
    }))?;

    Ok(())
}

/// Side-by-side bars: one group per row, one bar per column
fn draw_grouped_bars(area: &Area<'_>, title: &str, y_desc: &str, table: &CrossTab) -> crate::Result<()> {
    if table.is_empty() {
        return draw_placeholder(area, title);
    }

    let bar_width = 0.8 / table.columns.len() as f64;

    let mut chart = ChartBuilder::on(area)
        .caption(title, ("sans-serif", 22))
        .margin(10)
        .x_label_area_size(40)
        .y_label_area_size(70)
        .build_cartesian_2d(
            -0.5f64..(table.rows.len() as f64 - 0.5),
            0f64..axis_max(table.values.iter().flatten().copied()),
        )?;

    let x_formatter = |x: &f64| category_label(&table.rows, *x);
    chart
        .configure_mesh()
        .disable_x_mesh()
        .x_labels(table.rows.len())
        .x_label_formatter(&x_formatter)
        .y_desc(y_desc)
        .axis_desc_style(("sans-serif", 15))
        .draw()?;

    for (c, column) in table.columns.iter().enumerate() {
        let color = series_color(c);
        chart
            .draw_series(table.values.iter().enumerate().map(|(r, row)| {
                let x0 = r as f64 - 0.4 + c as f64 * bar_width;
                Rectangle::new([(x0, 0.0), (x0 + bar_width, row[c])], color.filled())
            }))?
            .label(column.as_str())
            .legend(move |(x, y)| Rectangle::new([(x, y - 5), (x + 10, y + 5)], color.filled()));
    }

    chart
        .configure_series_labels()
        .background_style(WHITE.mix(0.8))
        .border_style(BLACK)
        .draw()?;

    Ok(())
}

/// One line per column across the rows, e.g. months on the x axis
fn draw_lines(area: &Area<'_>, title: &str, y_desc: &str, table: &CrossTab) -> crate::Result<()> {
    if table.is_empty() {
        return draw_placeholder(area, title);
    }

    let mut chart = ChartBuilder::on(area)
        .caption(title, ("sans-serif", 22))
        .margin(10)
        .x_label_area_size(40)
        .y_label_area_size(70)
        .build_cartesian_2d(
            -0.5f64..(table.rows.len() as f64 - 0.5),
            0f64..axis_max(table.values.iter().flatten().copied()),
        )?;

    let x_formatter = |x: &f64| category_label(&table.rows, *x);
    chart
        .configure_mesh()
        .x_labels(table.rows.len())
        .x_label_formatter(&x_formatter)
        .y_desc(y_desc)
        .axis_desc_style(("sans-serif", 15))
        .draw()?;

    for (c, column) in table.columns.iter().enumerate() {
        let color = series_color(c);
        let points: Vec<(f64, f64)> = table
            .values
            .iter()
            .enumerate()
            .map(|(r, row)| (r as f64, row[c]))
            .collect();

        chart
            .draw_series(LineSeries::new(points.iter().copied(), color.stroke_width(2)))?
            .label(column.as_str())
            .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], color.stroke_width(2)));
        chart.draw_series(points.iter().map(|&point| Circle::new(point, 3, color.filled())))?;
    }

    chart
        .configure_series_labels()
        .background_style(WHITE.mix(0.8))
        .border_style(BLACK)
        .draw()?;

    Ok(())
}

/// Title plus a "No data" note, used when an aggregation is empty
fn draw_placeholder(area: &Area<'_>, title: &str) -> crate::Result<()> {
    let inner = area.titled(title, ("sans-serif", 22))?;
    let (width, height) = inner.dim_in_pixel();
    inner.draw(&Text::new(
        "No data",
        (width as i32 / 2 - 30, height as i32 / 2),
        ("sans-serif", 18).into_font(),
    ))?;
    Ok(())
}

/// The three region measures as separate bar series
fn region_panels(report: &SalesReport) -> (Vec<Breakdown>, Vec<Breakdown>, Vec<Breakdown>) {
    let series = |measure: fn(&RegionSummary) -> f64| -> Vec<Breakdown> {
        report
            .region_summary
            .iter()
            .map(|r| Breakdown { label: r.region.clone(), value: measure(r) })
            .collect()
    };

    (
        series(|r| r.avg_price_usd),
        series(|r| r.total_sales),
        series(|r| r.total_units),
    )
}

/// Wrap a single-key breakdown as a one-column cross tab
fn single_series(entries: &[Breakdown], name: &str) -> CrossTab {
    CrossTab {
        rows: entries.iter().map(|e| e.label.clone()).collect(),
        columns: vec![name.to_string()],
        values: entries.iter().map(|e| vec![e.value]).collect(),
    }
}

/// Label for an x position; blank between categories
fn category_label(labels: &[String], x: f64) -> String {
    let index = x.round();
    if (x - index).abs() > 1e-6 || index < 0.0 {
        return String::new();
    }
    labels.get(index as usize).cloned().unwrap_or_default()
}

/// Upper y bound with 10% headroom; 1.0 when everything is zero
fn axis_max(values: impl Iterator<Item = f64>) -> f64 {
    let max = values.fold(0.0, f64::max);
    if max > 0.0 {
        max * 1.1
    } else {
        1.0
    }
}

fn series_color(index: usize) -> RGBColor {
    SERIES_COLORS[index % SERIES_COLORS.len()]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::ProductCategory;
    use crate::report::{PriceBinUnits, ShareBreakdown};
    use tempfile::tempdir;

    fn breakdown(label: &str, value: f64) -> Breakdown {
        Breakdown { label: label.to_string(), value }
    }

    fn create_test_report() -> SalesReport {
        let cross = CrossTab {
            rows: vec!["Online".to_string(), "Retail".to_string()],
            columns: vec!["Apparel".to_string(), "Footwear".to_string()],
            values: vec![vec![4.0, 2.0], vec![3.0, 1.0]],
        };

        SalesReport {
            record_count: 4,
            total_sales: 555.0,
            total_units: 10,
            sales_by_product_line: vec![breakdown("Casual", 115.0), breakdown("Running", 440.0)],
            sales_by_category: vec![ShareBreakdown {
                label: "Footwear".to_string(),
                value: 440.0,
                share: 79.3,
            }],
            sales_by_region: vec![breakdown("Bengaluru", 160.0)],
            sales_by_gender: vec![breakdown("Men", 120.0)],
            sales_by_channel: vec![breakdown("Online", 160.0)],
            units_by_channel_category: cross.clone(),
            monthly_units_by_channel: cross.clone(),
            monthly_sales: vec![breakdown("2023-01", 440.0)],
            seasonal_units_by_category: cross.clone(),
            units_by_price_bin: vec![PriceBinUnits {
                category: ProductCategory::Footwear,
                bins: vec![breakdown("$0-50", 0.0), breakdown("$50-100", 2.0)],
            }],
            units_by_category_gender: cross,
            region_summary: vec![RegionSummary {
                region: "Bengaluru".to_string(),
                avg_price_usd: 35.0,
                total_sales: 160.0,
                total_units: 6.0,
            }],
        }
    }

    #[test]
    fn test_category_label() {
        let labels = vec!["Online".to_string(), "Retail".to_string()];
        assert_eq!(category_label(&labels, 0.0), "Online");
        assert_eq!(category_label(&labels, 1.0), "Retail");
        assert_eq!(category_label(&labels, 0.5), "");
        assert_eq!(category_label(&labels, 2.0), "");
        assert_eq!(category_label(&labels, -1.0), "");
    }

    #[test]
    fn test_axis_max() {
        assert!((axis_max([10.0, 20.0].into_iter()) - 22.0).abs() < 1e-9);
        assert_eq!(axis_max([0.0, 0.0].into_iter()), 1.0);
        assert_eq!(axis_max(std::iter::empty()), 1.0);
    }

    #[test]
    fn test_single_series_and_region_panels() {
        let report = create_test_report();

        let monthly = single_series(&report.monthly_sales, "Sales");
        assert_eq!(monthly.rows, vec!["2023-01"]);
        assert_eq!(monthly.columns, vec!["Sales"]);
        assert_eq!(monthly.get("2023-01", "Sales"), Some(440.0));

        let (price, sales, units) = region_panels(&report);
        assert_eq!(price[0].value, 35.0);
        assert_eq!(sales[0].value, 160.0);
        assert_eq!(units[0].value, 6.0);
    }

    #[test]
    #[ignore = "needs a system sans-serif font for text layout"]
    fn test_render_report() {
        let report = create_test_report();
        let temp_dir = tempdir().unwrap();

        let paths = render_report(&report, temp_dir.path(), &ChartOptions::default()).unwrap();
        assert_eq!(paths.len(), CHART_FILES.len());
        for path in &paths {
            assert!(path.exists(), "{} was not written", path.display());
        }
    }

    #[test]
    #[ignore = "needs a system sans-serif font for text layout"]
    fn test_render_empty_report() {
        let temp_dir = tempdir().unwrap();

        let paths = render_report(&SalesReport::default(), temp_dir.path(), &ChartOptions::default()).unwrap();
        assert!(paths.iter().all(|path| path.exists()));
    }
}
