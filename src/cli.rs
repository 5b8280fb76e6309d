//! Command-line interface definitions and argument parsing

use clap::Parser;

/// Smallest chart dimension, in pixels, that still leaves room for axes and labels
pub const MIN_CHART_DIMENSION: u32 = 200;

/// Retail sales cleaning and reporting CLI
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Path to the input sales CSV file
    #[arg(short, long, default_value = "sales.csv")]
    pub input: String,

    /// Directory the charts are written to (created if missing)
    #[arg(short, long, default_value = "charts")]
    pub output_dir: String,

    /// Chart width in pixels
    #[arg(long, default_value = "1000")]
    pub width: u32,

    /// Chart height in pixels
    #[arg(long, default_value = "600")]
    pub height: u32,

    /// Print the aggregated tables without rendering any chart
    #[arg(long)]
    pub summary_only: bool,

    /// Enable verbose output
    #[arg(short, long)]
    pub verbose: bool,
}

impl Args {
    /// Check the values clap cannot check on its own
    pub fn validate(&self) -> crate::Result<()> {
        if self.width < MIN_CHART_DIMENSION || self.height < MIN_CHART_DIMENSION {
            anyhow::bail!(
                "Chart size must be at least {0}x{0} pixels, got {1}x{2}",
                MIN_CHART_DIMENSION,
                self.width,
                self.height
            );
        }
        if self.input.trim().is_empty() {
            anyhow::bail!("Input path must not be empty");
        }
        Ok(())
    }

    /// Chart dimensions as a (width, height) pair
    pub fn chart_size(&self) -> (u32, u32) {
        (self.width, self.height)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args() -> Args {
        Args {
            input: "sales.csv".to_string(),
            output_dir: "charts".to_string(),
            width: 1000,
            height: 600,
            summary_only: false,
            verbose: false,
        }
    }

    #[test]
    fn test_validate() {
        let mut args = args();
        assert!(args.validate().is_ok());
        assert_eq!(args.chart_size(), (1000, 600));

        args.width = 100;
        assert!(args.validate().is_err());

        args.width = 1000;
        args.input = "  ".to_string();
        assert!(args.validate().is_err());
    }

    #[test]
    fn test_parse_defaults() {
        let args = Args::parse_from(["salesforge"]);
        assert_eq!(args.input, "sales.csv");
        assert_eq!(args.output_dir, "charts");
        assert!(!args.summary_only);

        let args = Args::parse_from(["salesforge", "-i", "data.csv", "--summary-only", "-v"]);
        assert_eq!(args.input, "data.csv");
        assert!(args.summary_only);
        assert!(args.verbose);
    }
}
