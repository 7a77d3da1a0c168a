//! Command-line interface argument parsing.
//!
//! This module handles all CLI argument parsing using clap,
//! including validation and default values.

use clap::Parser;
use std::path::PathBuf;

use crate::models::Field;

/// casestat - descriptive statistics for case-record CSV datasets
///
/// Cleans a CSV of records, buckets a numeric field into a histogram and
/// writes summary statistics, distributions, a per-year time series and a
/// correlation as JSON or Markdown.
///
/// Examples:
///   casestat
///   casestat --input victims.csv --output analysis_data.json
///   casestat --url https://example.org/data.csv --format markdown
///   casestat --input-dir ./datasets --out-dir ./reports --concurrency 8
///   casestat --input victims.csv --dry-run
///   casestat --init-config
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Args {
    /// Local CSV file to analyse
    #[arg(short, long, value_name = "FILE", conflicts_with_all = ["url", "input_dir"])]
    pub input: Option<PathBuf>,

    /// CSV URL to download and analyse
    ///
    /// Without --input, --url or --input-dir, the dataset URL from the
    /// config file is used.
    #[arg(short, long, value_name = "URL", conflicts_with = "input_dir")]
    pub url: Option<String>,

    /// Directory of CSV files to analyse in one batch
    #[arg(long, value_name = "DIR")]
    pub input_dir: Option<PathBuf>,

    /// Output file path for a single-dataset report
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Output directory for batch reports
    #[arg(long, value_name = "DIR")]
    pub out_dir: Option<PathBuf>,

    /// Output format (json, markdown)
    #[arg(long, default_value = "json", value_name = "FORMAT")]
    pub format: OutputFormat,

    /// Path to configuration file
    ///
    /// If not specified, looks for .casestat.toml in the current directory
    #[arg(short, long, value_name = "FILE", env = "CASESTAT_CONFIG")]
    pub config: Option<PathBuf>,

    /// Primary numeric field to bucket and summarise
    #[arg(short, long, value_name = "FIELD")]
    pub field: Option<FieldArg>,

    /// Zero-fill years without records in the time series
    #[arg(long)]
    pub dense_years: bool,

    /// Skip the correlation step
    #[arg(long)]
    pub no_correlation: bool,

    /// Cleaned records copied into the report (0 disables the sample)
    #[arg(long, value_name = "COUNT")]
    pub sample_rows: Option<usize>,

    /// Number of datasets analysed at once in batch mode
    #[arg(long, value_name = "NUM")]
    pub concurrency: Option<usize>,

    /// Download timeout in seconds
    #[arg(long, value_name = "SECS")]
    pub timeout: Option<u64>,

    /// Enable verbose logging output
    #[arg(short, long)]
    pub verbose: bool,

    /// Run in quiet mode (minimal output)
    #[arg(short, long)]
    pub quiet: bool,

    /// Dry run: load and clean the input without writing a report
    ///
    /// Prints row counts, or the files a batch would analyse, and exits.
    #[arg(long)]
    pub dry_run: bool,

    /// Generate a default .casestat.toml configuration file
    #[arg(long)]
    pub init_config: bool,
}

/// Output format for the report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum OutputFormat {
    /// JSON format (default)
    #[default]
    Json,
    /// Markdown format
    Markdown,
}

impl OutputFormat {
    /// File extension for reports in this format.
    pub fn extension(&self) -> &'static str {
        match self {
            OutputFormat::Json => "json",
            OutputFormat::Markdown => "md",
        }
    }
}

/// Numeric fields selectable with --field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum FieldArg {
    Age,
    DeathTime,
    Hour,
}

impl From<FieldArg> for Field {
    fn from(arg: FieldArg) -> Self {
        match arg {
            FieldArg::Age => Field::Age,
            FieldArg::DeathTime => Field::DeathTime,
            FieldArg::Hour => Field::Hour,
        }
    }
}

impl Args {
    /// Parse command-line arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Validate the parsed arguments.
    pub fn validate(&self) -> Result<(), String> {
        // Skip validation for --init-config
        if self.init_config {
            return Ok(());
        }

        if let Some(ref url) = self.url {
            if !url.starts_with("http://") && !url.starts_with("https://") {
                return Err("Dataset URL must start with 'http://' or 'https://'".to_string());
            }
        }

        if let Some(ref input) = self.input {
            if !input.is_file() {
                return Err(format!("Input file does not exist: {}", input.display()));
            }
        }

        if let Some(ref dir) = self.input_dir {
            if !dir.exists() {
                return Err(format!("Input directory does not exist: {}", dir.display()));
            }
            if !dir.is_dir() {
                return Err(format!("Input path is not a directory: {}", dir.display()));
            }
        }

        if self.concurrency == Some(0) {
            return Err("Concurrency must be at least 1".to_string());
        }

        if self.timeout == Some(0) {
            return Err("Timeout must be at least 1 second".to_string());
        }

        // Check for conflicting options
        if self.verbose && self.quiet {
            return Err("Cannot use both --verbose and --quiet".to_string());
        }

        Ok(())
    }

    /// Returns the log level based on verbosity settings.
    pub fn log_level(&self) -> tracing::Level {
        if self.quiet {
            tracing::Level::ERROR
        } else if self.verbose {
            tracing::Level::DEBUG
        } else {
            tracing::Level::INFO
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_args() -> Args {
        Args {
            input: None,
            url: None,
            input_dir: None,
            output: None,
            out_dir: None,
            format: OutputFormat::Json,
            config: None,
            field: None,
            dense_years: false,
            no_correlation: false,
            sample_rows: None,
            concurrency: None,
            timeout: None,
            verbose: false,
            quiet: false,
            dry_run: false,
            init_config: false,
        }
    }

    #[test]
    fn test_validation_defaults_ok() {
        assert!(make_args().validate().is_ok());
    }

    #[test]
    fn test_validation_invalid_url() {
        let mut args = make_args();
        args.url = Some("ftp://example.org/data.csv".to_string());
        assert!(args.validate().is_err());

        args.url = Some("https://example.org/data.csv".to_string());
        assert!(args.validate().is_ok());
    }

    #[test]
    fn test_validation_missing_input() {
        let mut args = make_args();
        args.input = Some(PathBuf::from("/nonexistent/data.csv"));
        assert!(args.validate().is_err());

        let mut args = make_args();
        args.input_dir = Some(PathBuf::from("/nonexistent/dir"));
        assert!(args.validate().is_err());
    }

    #[test]
    fn test_validation_zero_values() {
        let mut args = make_args();
        args.concurrency = Some(0);
        assert!(args.validate().is_err());

        let mut args = make_args();
        args.timeout = Some(0);
        assert!(args.validate().is_err());
    }

    #[test]
    fn test_validation_conflicting_options() {
        let mut args = make_args();
        args.verbose = true;
        args.quiet = true;
        assert!(args.validate().is_err());
    }

    #[test]
    fn test_log_level() {
        let mut args = make_args();
        assert_eq!(args.log_level(), tracing::Level::INFO);

        args.verbose = true;
        assert_eq!(args.log_level(), tracing::Level::DEBUG);

        args.verbose = false;
        args.quiet = true;
        assert_eq!(args.log_level(), tracing::Level::ERROR);
    }

    #[test]
    fn test_parse_flags() {
        let args = Args::try_parse_from([
            "casestat",
            "--input-dir",
            "data",
            "--format",
            "markdown",
            "--field",
            "death-time",
            "--dense-years",
        ])
        .unwrap();

        assert_eq!(args.input_dir, Some(PathBuf::from("data")));
        assert_eq!(args.format, OutputFormat::Markdown);
        assert_eq!(args.field.map(Field::from), Some(Field::DeathTime));
        assert!(args.dense_years);
        assert_eq!(args.format.extension(), "md");
    }

    #[test]
    fn test_parse_rejects_two_sources() {
        let result = Args::try_parse_from(["casestat", "--input", "a.csv", "--input-dir", "data"]);
        assert!(result.is_err());

        let result = Args::try_parse_from(["casestat", "--input", "a.csv", "--url", "https://x/a.csv"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_parse_single_input() {
        let args = Args::try_parse_from(["casestat", "--input", "a.csv"]).unwrap();
        assert_eq!(args.input, Some(PathBuf::from("a.csv")));
        assert_eq!(args.url, None);
        assert_eq!(args.input_dir, None);
    }
}
