//! Bucket definitions and histogram assembly.
//!
//! A [`BucketSet`] is an ordered list of contiguous half-open ranges
//! `[low, high)`. The last bucket is open-ended and takes every value at
//! or above its `low`. A value sitting exactly on a boundary belongs to
//! the bucket that boundary opens.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use super::stats::percentage;
use crate::error::{PipelineError, Result};
use crate::models::Histogram;

/// One `(low, high, label)` tuple as written in configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BucketDef {
    pub low: f64,
    /// Upper bound (exclusive). Ignored on the last bucket, may be omitted there.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub high: Option<f64>,
    pub label: String,
}

impl BucketDef {
    pub fn new(low: f64, high: f64, label: &str) -> Self {
        Self {
            low,
            high: Some(high),
            label: label.to_string(),
        }
    }

    /// A bucket with no upper bound.
    pub fn open(low: f64, label: &str) -> Self {
        Self {
            low,
            high: None,
            label: label.to_string(),
        }
    }
}

/// Validated, ordered bucket definitions.
#[derive(Debug, Clone, PartialEq)]
pub struct BucketSet {
    buckets: Vec<BucketDef>,
}

impl BucketSet {
    /// Validate definitions: non-empty, finite, `low < high`, contiguous,
    /// only the last bucket unbounded, labels non-empty and unique.
    pub fn new(defs: Vec<BucketDef>) -> Result<Self> {
        if defs.is_empty() {
            return Err(PipelineError::config("at least one bucket is required"));
        }

        let mut labels = HashSet::new();
        let last = defs.len() - 1;

        for (i, def) in defs.iter().enumerate() {
            if def.label.trim().is_empty() {
                return Err(PipelineError::config(format!("bucket {} has an empty label", i)));
            }
            if !labels.insert(def.label.as_str()) {
                return Err(PipelineError::config(format!(
                    "duplicate bucket label '{}'",
                    def.label
                )));
            }
            if !def.low.is_finite() {
                return Err(PipelineError::config(format!(
                    "bucket '{}' has a non-finite lower bound",
                    def.label
                )));
            }

            match def.high {
                Some(high) if !high.is_finite() || high <= def.low => {
                    return Err(PipelineError::config(format!(
                        "bucket '{}' must satisfy low < high, got [{}, {})",
                        def.label, def.low, high
                    )));
                }
                None if i != last => {
                    return Err(PipelineError::config(format!(
                        "only the last bucket may omit its upper bound, '{}' does",
                        def.label
                    )));
                }
                _ => {}
            }

            if i < last {
                let next = &defs[i + 1];
                let high = def.high.unwrap_or(f64::INFINITY);
                if high > next.low {
                    return Err(PipelineError::config(format!(
                        "buckets '{}' and '{}' overlap",
                        def.label, next.label
                    )));
                }
                if high < next.low {
                    return Err(PipelineError::config(format!(
                        "gap between buckets '{}' and '{}': [{}, {}) is not covered",
                        def.label, next.label, high, next.low
                    )));
                }
            }
        }

        Ok(Self { buckets: defs })
    }

    /// Age bins of the published analysis: `<50, 50-59, ..., 90+`.
    #[cfg(test)]
    pub fn default_age() -> Self {
        Self {
            buckets: default_age_buckets(),
        }
    }

    /// Time-of-day clusters over `[0, 24)`.
    #[cfg(test)]
    pub fn default_hour() -> Self {
        Self {
            buckets: default_hour_buckets(),
        }
    }

    pub fn len(&self) -> usize {
        self.buckets.len()
    }

    pub fn labels(&self) -> impl Iterator<Item = &str> {
        self.buckets.iter().map(|b| b.label.as_str())
    }

    /// Index of the bucket holding `value`, `None` below the first bound or for NaN.
    pub fn classify(&self, value: f64) -> Option<usize> {
        if value.is_nan() {
            return None;
        }
        // Contiguous ranges: the holder is the last bucket whose low is <= value.
        self.buckets
            .partition_point(|b| b.low <= value)
            .checked_sub(1)
    }

    /// Count `values` per bucket. Every value must land in a bucket.
    pub fn histogram(&self, values: &[f64]) -> Result<Histogram> {
        let mut counts = vec![0usize; self.len()];

        for &value in values {
            let index = self.classify(value).ok_or_else(|| {
                PipelineError::data(format!(
                    "value {} is below the lowest bucket bound {}",
                    value, self.buckets[0].low
                ))
            })?;
            counts[index] += 1;
        }

        let total = values.len();
        Ok(Histogram {
            labels: self.labels().map(String::from).collect(),
            percentages: counts.iter().map(|&c| percentage(c, total)).collect(),
            counts,
        })
    }
}

pub fn default_age_buckets() -> Vec<BucketDef> {
    vec![
        BucketDef::new(0.0, 50.0, "<50"),
        BucketDef::new(50.0, 60.0, "50-59"),
        BucketDef::new(60.0, 70.0, "60-69"),
        BucketDef::new(70.0, 80.0, "70-79"),
        BucketDef::new(80.0, 90.0, "80-89"),
        BucketDef::new(90.0, 100.0, "90+"),
    ]
}

pub fn default_hour_buckets() -> Vec<BucketDef> {
    vec![
        BucketDef::new(0.0, 8.0, "Night (0-8)"),
        BucketDef::new(8.0, 11.0, "Morning (8-11)"),
        BucketDef::new(11.0, 14.0, "Midday (11-14)"),
        BucketDef::new(14.0, 17.0, "Afternoon (14-17)"),
        BucketDef::new(17.0, 20.0, "Evening (17-20)"),
        BucketDef::open(20.0, "Late (20-24)"),
    ]
}
