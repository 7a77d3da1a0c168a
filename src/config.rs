//! Configuration file handling.
//!
//! This module handles loading and merging configuration from
//! `.casestat.toml` files.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::analysis::buckets::{default_age_buckets, default_hour_buckets};
use crate::analysis::{BucketDef, BucketSet, Pipeline};
use crate::error::PipelineError;
use crate::models::{ColumnMap, Field};

/// Default configuration file name, looked up in the working directory.
pub const DEFAULT_CONFIG_FILE: &str = ".casestat.toml";

/// Root configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// General settings.
    #[serde(default)]
    pub general: GeneralConfig,

    /// Dataset location and column mapping.
    #[serde(default)]
    pub dataset: DatasetConfig,

    /// Aggregation settings.
    #[serde(default)]
    pub analysis: AnalysisConfig,

    /// Batch scanner settings.
    #[serde(default)]
    pub scanner: ScannerConfig,

    /// Report settings.
    #[serde(default)]
    pub report: ReportConfig,
}

/// General application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneralConfig {
    /// Default output file path for a single dataset.
    #[serde(default = "default_output")]
    pub output: String,

    /// Directory batch reports are written to.
    #[serde(default = "default_out_dir")]
    pub out_dir: String,

    /// Number of datasets analysed at once in batch mode.
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            output: default_output(),
            out_dir: default_out_dir(),
            concurrency: default_concurrency(),
        }
    }
}

fn default_output() -> String {
    "analysis_data.json".to_string()
}

fn default_out_dir() -> String {
    "reports".to_string()
}

fn default_concurrency() -> usize {
    4
}

/// Where the dataset comes from and how its columns are named.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatasetConfig {
    /// CSV fetched when no input is given on the command line.
    #[serde(default = "default_url")]
    pub url: String,

    /// Download timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout_seconds: u64,

    /// Fields whose absence drops a row, on top of age and death time.
    #[serde(default)]
    pub required: Vec<Field>,

    /// CSV header for each field.
    #[serde(default)]
    pub columns: ColumnMap,
}

impl Default for DatasetConfig {
    fn default() -> Self {
        Self {
            url: default_url(),
            timeout_seconds: default_timeout(),
            required: Vec::new(),
            columns: ColumnMap::default(),
        }
    }
}

fn default_url() -> String {
    "https://dspiegel29.github.io/ArtofStatistics/00-1-age-and-year-of-deathofharold-shipmans-victims/00-1-shipman-confirmed-victims-x.csv".to_string()
}

fn default_timeout() -> u64 {
    60
}

/// Aggregation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisConfig {
    /// Primary numeric field.
    #[serde(default = "default_field")]
    pub field: Field,

    /// Emit the per-year time series and time span.
    #[serde(default = "default_true")]
    pub time_series: bool,

    /// Field counted per year for the time series.
    #[serde(default = "default_year_field")]
    pub year_field: Field,

    /// Zero-fill years without records between the first and last one.
    #[serde(default)]
    pub dense_years: bool,

    /// Two fields to correlate. An empty list disables the correlation.
    #[serde(default = "default_correlation")]
    pub correlation: Vec<Field>,

    /// Emit day-of-week and season distributions when present.
    #[serde(default = "default_true")]
    pub categorical: bool,

    /// Age bins.
    #[serde(default = "default_age_buckets")]
    pub buckets: Vec<BucketDef>,

    /// Hour-of-day bins.
    #[serde(default = "default_hour_buckets")]
    pub hour_buckets: Vec<BucketDef>,

    /// Death-time bins. Empty means no death-time distribution.
    #[serde(default)]
    pub year_buckets: Vec<BucketDef>,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            field: default_field(),
            time_series: true,
            year_field: default_year_field(),
            dense_years: false,
            correlation: default_correlation(),
            categorical: true,
            buckets: default_age_buckets(),
            hour_buckets: default_hour_buckets(),
            year_buckets: Vec::new(),
        }
    }
}

fn default_field() -> Field {
    Field::Age
}

fn default_year_field() -> Field {
    Field::DeathTime
}

fn default_correlation() -> Vec<Field> {
    vec![Field::Age, Field::DeathTime]
}

fn default_true() -> bool {
    true
}

impl AnalysisConfig {
    /// Bucket definitions configured for a numeric field.
    pub fn buckets_for(&self, field: Field) -> &[BucketDef] {
        match field {
            Field::Age => &self.buckets,
            Field::Hour => &self.hour_buckets,
            Field::DeathTime => &self.year_buckets,
            Field::DayOfWeek | Field::Season => &[],
        }
    }

    /// Build the pipeline these settings describe.
    ///
    /// The primary field must have buckets. Every other numeric field with
    /// buckets gets a secondary distribution.
    pub fn build_pipeline(&self) -> crate::error::Result<Pipeline> {
        let primary = self.buckets_for(self.field);
        if primary.is_empty() {
            return Err(PipelineError::config(format!(
                "no buckets configured for field '{}'",
                self.field
            )));
        }

        let mut pipeline = Pipeline::new(self.field, BucketSet::new(primary.to_vec())?)?
            .with_categorical(self.categorical);

        for field in Field::ALL {
            let defs = self.buckets_for(field);
            if field == self.field || defs.is_empty() {
                continue;
            }
            pipeline = pipeline.with_distribution(field, BucketSet::new(defs.to_vec())?)?;
        }

        if self.time_series {
            pipeline = pipeline.with_time_series(self.year_field, self.dense_years)?;
        }
        match self.correlation[..] {
            [] => {}
            [a, b] => pipeline = pipeline.with_correlation(a, b)?,
            _ => {
                return Err(PipelineError::config(format!(
                    "correlation needs exactly two fields, got {}",
                    self.correlation.len()
                )))
            }
        }

        Ok(pipeline)
    }
}

/// Batch scanner settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScannerConfig {
    /// Maximum datasets per batch run.
    #[serde(default = "default_max_files")]
    pub max_files: usize,

    /// File extensions to include.
    #[serde(default = "default_extensions")]
    pub extensions: Vec<String>,

    /// Directory or file names to skip.
    #[serde(default)]
    pub excludes: Vec<String>,
}

impl Default for ScannerConfig {
    fn default() -> Self {
        Self {
            max_files: default_max_files(),
            extensions: default_extensions(),
            excludes: Vec::new(),
        }
    }
}

fn default_max_files() -> usize {
    100
}

fn default_extensions() -> Vec<String> {
    vec!["csv".to_string()]
}

/// Report generation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportConfig {
    /// Cleaned records copied into `raw_data_sample`. 0 disables it.
    #[serde(default = "default_sample_rows")]
    pub sample_rows: usize,

    /// Pretty-print JSON output.
    #[serde(default = "default_true")]
    pub pretty: bool,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            sample_rows: default_sample_rows(),
            pretty: true,
        }
    }
}

fn default_sample_rows() -> usize {
    20
}

impl Config {
    /// Load configuration from a file path.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    /// Try to load configuration from the default location.
    ///
    /// Returns `Ok(None)` if the file doesn't exist, `Err` if it exists but can't be parsed.
    pub fn load_default() -> Result<Option<Self>> {
        let default_path = Path::new(DEFAULT_CONFIG_FILE);

        if default_path.exists() {
            Ok(Some(Self::load(default_path)?))
        } else {
            Ok(None)
        }
    }

    /// Merge this configuration with CLI arguments.
    ///
    /// CLI arguments take precedence over config file settings.
    /// This method only overrides config when CLI provides explicit values.
    pub fn merge_with_args(&mut self, args: &crate::cli::Args) {
        if let Some(ref output) = args.output {
            self.general.output = output.display().to_string();
        }
        if let Some(ref out_dir) = args.out_dir {
            self.general.out_dir = out_dir.display().to_string();
        }
        if let Some(concurrency) = args.concurrency {
            self.general.concurrency = concurrency;
        }

        if let Some(ref url) = args.url {
            self.dataset.url = url.clone();
        }
        if let Some(timeout) = args.timeout {
            self.dataset.timeout_seconds = timeout;
        }

        if let Some(field) = args.field {
            self.analysis.field = field.into();
        }
        if args.no_correlation {
            self.analysis.correlation.clear();
        }

        if let Some(sample_rows) = args.sample_rows {
            self.report.sample_rows = sample_rows;
        }

        // Flags always override
        if args.dense_years {
            self.analysis.dense_years = true;
        }
    }

    /// Generate a default configuration file content.
    pub fn default_toml() -> Result<String> {
        toml::to_string_pretty(&Config::default()).context("Failed to serialize default config")
    }
}
