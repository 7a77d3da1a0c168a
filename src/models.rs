//! Data models for the aggregation pipeline.
//!
//! This module contains the input side (raw CSV rows, cleaned records,
//! the immutable dataset) and the output side (histograms, summaries,
//! reports) shared by the analysis and report modules.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::str::FromStr;

use crate::error::{PipelineError, Result};

/// A named column carried by a [`Record`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Field {
    /// Age of the subject in years.
    Age,
    /// Fractional year of death, e.g. `1996.45`.
    DeathTime,
    /// Hour of day in `[0, 24)`.
    Hour,
    /// Weekday of death.
    DayOfWeek,
    /// Season of death.
    Season,
}

impl Field {
    pub const ALL: [Field; 5] = [
        Field::Age,
        Field::DeathTime,
        Field::Hour,
        Field::DayOfWeek,
        Field::Season,
    ];

    /// Snake-case name used in configuration and output keys.
    pub fn as_str(&self) -> &'static str {
        match self {
            Field::Age => "age",
            Field::DeathTime => "death_time",
            Field::Hour => "hour",
            Field::DayOfWeek => "day_of_week",
            Field::Season => "season",
        }
    }

    /// Whether the field holds a number (and can be bucketed or correlated).
    pub fn is_numeric(&self) -> bool {
        matches!(self, Field::Age | Field::DeathTime | Field::Hour)
    }

    /// Output key of this field's histogram, e.g. `distribution_by_age`.
    pub fn distribution_key(&self) -> String {
        format!("distribution_by_{}", self.as_str())
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Field {
    type Err = PipelineError;

    fn from_str(s: &str) -> Result<Self> {
        let normalized = s.trim().to_lowercase().replace('-', "_");
        Field::ALL
            .into_iter()
            .find(|field| field.as_str() == normalized)
            .ok_or_else(|| PipelineError::config(format!("unknown field '{}'", s)))
    }
}

/// Day of the week, in calendar order starting on Monday.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum DayOfWeek {
    Monday,
    Tuesday,
    Wednesday,
    Thursday,
    Friday,
    Saturday,
    Sunday,
}

impl DayOfWeek {
    pub const ALL: [DayOfWeek; 7] = [
        DayOfWeek::Monday,
        DayOfWeek::Tuesday,
        DayOfWeek::Wednesday,
        DayOfWeek::Thursday,
        DayOfWeek::Friday,
        DayOfWeek::Saturday,
        DayOfWeek::Sunday,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            DayOfWeek::Monday => "Monday",
            DayOfWeek::Tuesday => "Tuesday",
            DayOfWeek::Wednesday => "Wednesday",
            DayOfWeek::Thursday => "Thursday",
            DayOfWeek::Friday => "Friday",
            DayOfWeek::Saturday => "Saturday",
            DayOfWeek::Sunday => "Sunday",
        }
    }

    pub fn is_weekend(&self) -> bool {
        matches!(self, DayOfWeek::Saturday | DayOfWeek::Sunday)
    }
}

impl fmt::Display for DayOfWeek {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for DayOfWeek {
    type Err = PipelineError;

    /// Accepts full names and three-letter abbreviations, any case.
    fn from_str(s: &str) -> Result<Self> {
        let lower = s.trim().to_lowercase();
        DayOfWeek::ALL
            .into_iter()
            .find(|day| {
                let name = day.label().to_lowercase();
                lower == name || (lower.len() == 3 && name.starts_with(&lower))
            })
            .ok_or_else(|| PipelineError::data(format!("unknown day of week '{}'", s)))
    }
}

/// Meteorological season.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Season {
    Winter,
    Spring,
    Summer,
    Fall,
}

impl Season {
    pub const ALL: [Season; 4] = [Season::Winter, Season::Spring, Season::Summer, Season::Fall];

    pub fn label(&self) -> &'static str {
        match self {
            Season::Winter => "Winter",
            Season::Spring => "Spring",
            Season::Summer => "Summer",
            Season::Fall => "Fall",
        }
    }
}

impl fmt::Display for Season {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Season {
    type Err = PipelineError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "winter" => Ok(Season::Winter),
            "spring" => Ok(Season::Spring),
            "summer" => Ok(Season::Summer),
            "fall" | "autumn" => Ok(Season::Fall),
            _ => Err(PipelineError::data(format!("unknown season '{}'", s))),
        }
    }
}

/// Maps each [`Field`] to the CSV header it is read from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnMap {
    #[serde(default = "default_age_column")]
    pub age: String,

    #[serde(default = "default_death_time_column")]
    pub death_time: String,

    #[serde(default = "default_hour_column")]
    pub hour: String,

    #[serde(default = "default_day_of_week_column")]
    pub day_of_week: String,

    #[serde(default = "default_season_column")]
    pub season: String,
}

impl Default for ColumnMap {
    fn default() -> Self {
        Self {
            age: default_age_column(),
            death_time: default_death_time_column(),
            hour: default_hour_column(),
            day_of_week: default_day_of_week_column(),
            season: default_season_column(),
        }
    }
}

fn default_age_column() -> String {
    "Age".to_string()
}

fn default_death_time_column() -> String {
    "fractionalDeathYear".to_string()
}

fn default_hour_column() -> String {
    "Hour".to_string()
}

fn default_day_of_week_column() -> String {
    "DayOfWeek".to_string()
}

fn default_season_column() -> String {
    "Season".to_string()
}

impl ColumnMap {
    /// CSV header for a field.
    pub fn column(&self, field: Field) -> &str {
        match field {
            Field::Age => &self.age,
            Field::DeathTime => &self.death_time,
            Field::Hour => &self.hour,
            Field::DayOfWeek => &self.day_of_week,
            Field::Season => &self.season,
        }
    }
}

/// Cell values treated as missing, in addition to the empty string.
const NA_TOKENS: &[&str] = &[
    "NA", "N/A", "n/a", "NaN", "nan", "-NaN", "null", "NULL", "None", "#N/A", "<NA>", "-",
];

/// One CSV line before cleaning: header -> cell text.
#[derive(Debug, Clone, Default)]
pub struct RawRow {
    line: usize,
    cells: HashMap<String, String>,
}

impl RawRow {
    pub fn new(line: usize, cells: HashMap<String, String>) -> Self {
        Self { line, cells }
    }

    /// Build a row from `(header, value)` pairs.
    #[cfg(test)]
    pub fn from_pairs<'a>(line: usize, pairs: impl IntoIterator<Item = (&'a str, &'a str)>) -> Self {
        let cells = pairs
            .into_iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Self { line, cells }
    }

    /// 1-based line number in the source file (header is line 1).
    pub fn line(&self) -> usize {
        self.line
    }

    /// Trimmed cell text, or `None` when the column is absent, blank, or NA.
    pub fn cell(&self, column: &str) -> Option<&str> {
        let value = self.cells.get(column)?.trim();
        if value.is_empty() || NA_TOKENS.contains(&value) {
            None
        } else {
            Some(value)
        }
    }
}

/// One observed subject after cleaning.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    pub age: f64,
    pub death_time: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hour: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub day_of_week: Option<DayOfWeek>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub season: Option<Season>,
}

impl Record {
    pub fn new(age: f64, death_time: f64) -> Self {
        Self {
            age,
            death_time,
            hour: None,
            day_of_week: None,
            season: None,
        }
    }

    #[cfg(test)]
    pub fn with_hour(mut self, hour: f64) -> Self {
        self.hour = Some(hour);
        self
    }

    #[cfg(test)]
    pub fn with_day_of_week(mut self, day: DayOfWeek) -> Self {
        self.day_of_week = Some(day);
        self
    }

    #[cfg(test)]
    pub fn with_season(mut self, season: Season) -> Self {
        self.season = Some(season);
        self
    }

    /// Value of a numeric field, `None` for categorical or absent fields.
    pub fn numeric(&self, field: Field) -> Option<f64> {
        match field {
            Field::Age => Some(self.age),
            Field::DeathTime => Some(self.death_time),
            Field::Hour => self.hour,
            Field::DayOfWeek | Field::Season => None,
        }
    }

    /// Check the record invariants: finite numbers, `age >= 0`, `hour` in `[0, 24)`.
    pub fn validate(&self) -> Result<()> {
        if !self.age.is_finite() || self.age < 0.0 {
            return Err(PipelineError::data(format!(
                "age must be a finite non-negative number, got {}",
                self.age
            )));
        }
        if !self.death_time.is_finite() {
            return Err(PipelineError::data(format!(
                "death_time must be finite, got {}",
                self.death_time
            )));
        }
        if let Some(hour) = self.hour {
            if !(0.0..24.0).contains(&hour) {
                return Err(PipelineError::data(format!(
                    "hour must lie in [0, 24), got {}",
                    hour
                )));
            }
        }
        Ok(())
    }
}

/// Cleaned, immutable, non-empty sequence of records.
#[derive(Debug, Clone, PartialEq)]
pub struct Dataset {
    records: Vec<Record>,
    dropped: usize,
}

impl Dataset {
    /// Build a dataset, remembering how many raw rows were dropped to get here.
    pub fn new(records: Vec<Record>, dropped: usize) -> Result<Self> {
        if records.is_empty() {
            return Err(PipelineError::data(format!(
                "dataset is empty after cleaning ({} rows dropped)",
                dropped
            )));
        }
        for (i, record) in records.iter().enumerate() {
            record
                .validate()
                .map_err(|e| PipelineError::data(format!("record {}: {}", i, e)))?;
        }
        Ok(Self { records, dropped })
    }

    #[cfg(test)]
    pub fn from_records(records: Vec<Record>) -> Result<Self> {
        Self::new(records, 0)
    }

    pub fn records(&self) -> &[Record] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Number of raw rows removed during cleaning.
    pub fn dropped(&self) -> usize {
        self.dropped
    }

    /// Values of a numeric field from the records that carry it, in order.
    pub fn values(&self, field: Field) -> Vec<f64> {
        self.records.iter().filter_map(|r| r.numeric(field)).collect()
    }

    /// `(a, b)` pairs from the records that carry both fields.
    pub fn pairs(&self, a: Field, b: Field) -> Vec<(f64, f64)> {
        self.records
            .iter()
            .filter_map(|r| Some((r.numeric(a)?, r.numeric(b)?)))
            .collect()
    }
}

/// Central-tendency statistics of one numeric field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldSummary {
    /// Field the statistics describe.
    pub field: Field,
    /// Records in the cleaned dataset.
    pub total_records: usize,
    /// Raw rows removed during cleaning.
    pub dropped_records: usize,
    /// Records carrying the field.
    pub count: usize,
    pub mean: f64,
    pub median: f64,
    pub min: f64,
    pub max: f64,
}

/// Columnar histogram: `labels[i]` has `counts[i]` members, `percentages[i]` percent.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Histogram {
    pub labels: Vec<String>,
    pub counts: Vec<usize>,
    pub percentages: Vec<f64>,
}

/// One row of a [`Histogram`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HistogramEntry<'a> {
    pub label: &'a str,
    pub count: usize,
    pub percentage: f64,
}

impl Histogram {
    /// Iterate over the buckets in emission order.
    pub fn entries(&self) -> impl Iterator<Item = HistogramEntry<'_>> {
        self.labels
            .iter()
            .zip(&self.counts)
            .zip(&self.percentages)
            .map(|((label, &count), &percentage)| HistogramEntry {
                label,
                count,
                percentage,
            })
    }

    /// Sum of all bucket counts.
    pub fn total(&self) -> usize {
        self.counts.iter().sum()
    }

    /// Most frequent label, first in emission order on ties. `None` when empty.
    pub fn mode(&self) -> Option<Mode> {
        self.entries()
            .filter(|entry| entry.count > 0)
            .fold(None::<HistogramEntry>, |best, entry| match best {
                Some(b) if b.count >= entry.count => Some(b),
                _ => Some(entry),
            })
            .map(|entry| Mode {
                value: entry.label.to_string(),
                count: entry.count,
            })
    }

    /// Count for a label, if the histogram has it.
    #[cfg(test)]
    pub fn count_of(&self, label: &str) -> Option<usize> {
        self.labels
            .iter()
            .position(|l| l == label)
            .map(|i| self.counts[i])
    }
}

/// Most common value of a field and how many records carry it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Mode {
    pub value: String,
    pub count: usize,
}

/// Occurrences per integer year, ascending.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TimeSeries {
    pub years: Vec<i32>,
    pub counts: Vec<usize>,
}

/// First and last value of the year field and the distance between them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimeSpan {
    pub field: Field,
    pub first: f64,
    pub last: f64,
    pub span: f64,
}

/// Records falling on weekdays (Mon-Fri) versus weekends (Sat-Sun).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WeekSplit {
    pub weekday: usize,
    pub weekend: usize,
}

/// The complete aggregate result of one pipeline run.
///
/// Serializes to `{summary, field_summaries?, time_span?, distribution_by_<field>...,
/// modes?, weekday_weekend?, time_series?, correlation?}`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Summary {
    pub summary: FieldSummary,
    /// Statistics of the secondary numeric fields, keyed by field name.
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub field_summaries: BTreeMap<String, FieldSummary>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time_span: Option<TimeSpan>,
    /// Histograms keyed by [`Field::distribution_key`].
    #[serde(flatten)]
    pub distributions: BTreeMap<String, Histogram>,
    /// Peak hour of day and most common weekday and season, keyed by field name.
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub modes: BTreeMap<String, Mode>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub weekday_weekend: Option<WeekSplit>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time_series: Option<TimeSeries>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub correlation: Option<f64>,
}

impl Summary {
    /// Histogram of a field, if one was computed.
    pub fn distribution(&self, field: Field) -> Option<&Histogram> {
        self.distributions.get(&field.distribution_key())
    }

    /// Statistics of a field: the primary summary or a secondary one.
    pub fn field_summary(&self, field: Field) -> Option<&FieldSummary> {
        if self.summary.field == field {
            Some(&self.summary)
        } else {
            self.field_summaries.get(field.as_str())
        }
    }

    /// Most common value of a field, if one was computed.
    pub fn mode(&self, field: Field) -> Option<&Mode> {
        self.modes.get(field.as_str())
    }
}

/// Metadata about one analysis run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportMetadata {
    /// File path or URL the dataset came from.
    pub source: String,
    /// Date and time the report was generated.
    pub generated_at: DateTime<Utc>,
    /// Version of the tool that produced the report.
    pub tool_version: String,
    /// Data rows read from the source.
    pub records_loaded: usize,
    /// Rows dropped for missing required fields.
    pub records_dropped: usize,
    /// Primary analysed field.
    pub field: Field,
    /// Fields the correlation was computed between.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub correlation_fields: Option<(Field, Field)>,
    /// Wall-clock time spent loading and aggregating, in seconds.
    pub duration_seconds: f64,
}

/// Everything written for one dataset.
#[derive(Debug, Clone, Serialize)]
pub struct Report {
    pub metadata: ReportMetadata,
    #[serde(flatten)]
    pub summary: Summary,
    /// First cleaned records, for display next to the charts.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub raw_data_sample: Vec<Record>,
}
