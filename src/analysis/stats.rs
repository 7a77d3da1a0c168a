//! Central-tendency statistics and rounding helpers.

use crate::error::{PipelineError, Result};
use crate::models::{Dataset, Field, FieldSummary, Mode};

/// Round `value` to `decimals` decimal places, ties to even on the scaled value.
pub fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round_ties_even() / factor
}

/// `100 * count / total`, rounded to one decimal. Zero when `total` is zero.
pub fn percentage(count: usize, total: usize) -> f64 {
    if total == 0 {
        return 0.0;
    }
    round_to(100.0 * count as f64 / total as f64, 1)
}

/// Arithmetic mean. `None` for an empty slice.
pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}

/// Median: middle of the sorted values, or the mean of the two middle values.
pub fn median(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);

    let n = sorted.len();
    if n % 2 == 0 {
        Some((sorted[n / 2 - 1] + sorted[n / 2]) / 2.0)
    } else {
        Some(sorted[n / 2])
    }
}

/// Most common whole hour of day, earliest hour on ties.
///
/// Hours are truncated, so 14.75 counts toward 14:00.
pub fn peak_hour(hours: &[f64]) -> Option<Mode> {
    let mut counts = [0usize; 24];
    for &hour in hours {
        if (0.0..24.0).contains(&hour) {
            counts[hour.floor() as usize] += 1;
        }
    }

    let (hour, &count) = counts
        .iter()
        .enumerate()
        .rev()
        .max_by_key(|&(_, count)| *count)?;
    (count > 0).then(|| Mode {
        value: format!("{:02}:00", hour),
        count,
    })
}

/// Compute the [`FieldSummary`] of a numeric field over a dataset.
pub fn summarize(dataset: &Dataset, field: Field) -> Result<FieldSummary> {
    if !field.is_numeric() {
        return Err(PipelineError::config(format!(
            "field '{}' is not numeric",
            field
        )));
    }

    let values = dataset.values(field);
    let (Some(mean), Some(median)) = (mean(&values), median(&values)) else {
        return Err(PipelineError::data(format!(
            "no record carries field '{}'",
            field
        )));
    };

    let min = values.iter().copied().fold(f64::INFINITY, f64::min);
    let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);

    Ok(FieldSummary {
        field,
        total_records: dataset.len(),
        dropped_records: dataset.dropped(),
        count: values.len(),
        mean,
        median,
        min,
        max,
    })
}
