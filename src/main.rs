//! SalesForge: retail sales cleaning and chart reporting CLI
//!
//! This is the main entrypoint that orchestrates data loading, cleaning,
//! aggregation and chart rendering.

use anyhow::Result;
use clap::Parser;
use salesforge::{build_report, clean_with_stats, load_sales_csv, render_report, Args, ChartOptions};
use std::path::Path;
use std::time::Instant;
use tracing::{info, warn};

fn main() -> Result<()> {
    // Parse command-line arguments
    let args = Args::parse();
    init_logging(args.verbose);
    args.validate()?;

    if args.verbose {
        println!("SalesForge - Retail Sales Cleaning and Reporting");
        println!("================================================\n");
    }

    run_pipeline(&args)
}

/// Install the tracing subscriber; `RUST_LOG` overrides the verbosity flag
fn init_logging(verbose: bool) {
    use tracing_subscriber::EnvFilter;

    let level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

/// Run load, clean, aggregate and render
fn run_pipeline(args: &Args) -> Result<()> {
    println!("=== Sales Reporting Pipeline ===\n");

    let start_time = Instant::now();

    // Step 1: Load raw records
    if args.verbose {
        println!("Step 1: Loading sales data");
        println!("  Input file: {}", args.input);
    }

    let load_start = Instant::now();
    let raw_records = load_sales_csv(&args.input)?;
    let load_time = load_start.elapsed();

    println!("✓ Data loaded: {} rows", raw_records.len());
    if args.verbose {
        println!("  Loading time: {:.2}s", load_time.as_secs_f64());
    }

    // Step 2: Clean and derive fields
    if args.verbose {
        println!("\nStep 2: Cleaning records");
    }

    let clean_start = Instant::now();
    let (cleaned, stats) = clean_with_stats(&raw_records);
    let clean_time = clean_start.elapsed();

    println!(
        "✓ Cleaning complete: {} kept, {} dropped",
        stats.kept_rows, stats.dropped_rows
    );
    if stats.kept_rows == 0 {
        warn!("Every row was dropped during cleaning; charts will be empty");
    }
    if args.verbose {
        println!("  Cleaning time: {:.2}s", clean_time.as_secs_f64());
    }

    // Step 3: Aggregate
    let report = build_report(&cleaned)?;
    report.print_summary();

    // Step 4: Render charts
    if args.summary_only {
        info!("Summary only, skipping chart rendering");
    } else {
        if args.verbose {
            println!("\nStep 3: Rendering charts");
            println!("  Output directory: {}", args.output_dir);
            println!("  Chart size: {}x{}", args.width, args.height);
        }

        let viz_start = Instant::now();
        let options = ChartOptions {
            size: args.chart_size(),
        };
        let paths = render_report(&report, Path::new(&args.output_dir), &options)?;
        let viz_time = viz_start.elapsed();

        println!("\n✓ {} charts written to {}", paths.len(), args.output_dir);
        if args.verbose {
            for path in &paths {
                println!("  {}", path.display());
            }
            println!("  Rendering time: {:.2}s", viz_time.as_secs_f64());
        }
    }

    let total_time = start_time.elapsed();
    println!("\n=== Pipeline Complete ===");
    println!("Total processing time: {:.2}s", total_time.as_secs_f64());

    Ok(())
}
