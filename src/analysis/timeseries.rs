//! Per-year counts of a fractional year field.

use std::collections::BTreeMap;

use crate::error::{PipelineError, Result};
use crate::models::{Dataset, Field, TimeSeries, TimeSpan};

/// Widest span a dense series may cover.
pub const MAX_DENSE_YEARS: i64 = 10_000;

/// Round a fractional year to the nearest integer year, ties to even.
///
/// Values whose rounded year does not fit an `i32` are a data error.
pub fn to_year(value: f64) -> Result<i32> {
    let rounded = value.round_ties_even();
    if !rounded.is_finite() || rounded < i32::MIN as f64 || rounded > i32::MAX as f64 {
        return Err(PipelineError::data(format!(
            "year value {} is out of range",
            value
        )));
    }
    Ok(rounded as i32)
}

/// Count values per integer year, ascending.
///
/// With `dense` every year between the first and last observed one is
/// emitted, missing years with a zero count. Otherwise only observed years
/// appear. A dense range wider than [`MAX_DENSE_YEARS`] is a data error.
pub fn year_counts(values: &[f64], dense: bool) -> Result<TimeSeries> {
    let mut counts: BTreeMap<i32, usize> = BTreeMap::new();
    for &value in values {
        *counts.entry(to_year(value)?).or_default() += 1;
    }

    if dense {
        if let (Some((&first, _)), Some((&last, _))) =
            (counts.first_key_value(), counts.last_key_value())
        {
            let width = i64::from(last) - i64::from(first) + 1;
            if width > MAX_DENSE_YEARS {
                return Err(PipelineError::data(format!(
                    "dense time series would span {} years ({} to {}), limit is {}",
                    width, first, last, MAX_DENSE_YEARS
                )));
            }
            let years: Vec<i32> = (first..=last).collect();
            let filled = years
                .iter()
                .map(|y| counts.get(y).copied().unwrap_or(0))
                .collect();
            return Ok(TimeSeries {
                years,
                counts: filled,
            });
        }
    }

    let (years, counts) = counts.into_iter().unzip();
    Ok(TimeSeries { years, counts })
}

/// Year series of a numeric field over a dataset.
pub fn time_series(dataset: &Dataset, field: Field, dense: bool) -> Result<TimeSeries> {
    let values = numeric_values(dataset, field)?;
    year_counts(&values, dense)
}

/// First and last value of a numeric field and the span between them.
pub fn time_span(dataset: &Dataset, field: Field) -> Result<TimeSpan> {
    let values = numeric_values(dataset, field)?;
    let first = values.iter().copied().fold(f64::INFINITY, f64::min);
    let last = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    Ok(TimeSpan {
        field,
        first,
        last,
        span: last - first,
    })
}

fn numeric_values(dataset: &Dataset, field: Field) -> Result<Vec<f64>> {
    if !field.is_numeric() {
        return Err(PipelineError::config(format!(
            "year field '{}' is not numeric",
            field
        )));
    }
    let values = dataset.values(field);
    if values.is_empty() {
        return Err(PipelineError::data(format!(
            "no record carries year field '{}'",
            field
        )));
    }
    Ok(values)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Record;

    #[test]
    fn test_to_year_rounds_half_to_even() {
        assert_eq!(to_year(1996.4), Ok(1996));
        assert_eq!(to_year(1996.6), Ok(1997));
        assert_eq!(to_year(1985.5), Ok(1986));
        assert_eq!(to_year(1986.5), Ok(1986));
    }

    #[test]
    fn test_to_year_out_of_range() {
        assert!(matches!(to_year(3.0e9), Err(PipelineError::Data(_))));
        assert!(matches!(to_year(-3.0e9), Err(PipelineError::Data(_))));
        assert!(matches!(to_year(f64::INFINITY), Err(PipelineError::Data(_))));
    }

    #[test]
    fn test_year_counts_rejects_out_of_range_years() {
        let err = year_counts(&[3.0e9, 4.0e9], false).unwrap_err();
        assert!(matches!(err, PipelineError::Data(_)));
    }

    #[test]
    fn test_year_counts_dense_span_limit() {
        let err = year_counts(&[1975.0, 1.0e9], true).unwrap_err();
        assert!(matches!(err, PipelineError::Data(ref m) if m.contains("limit")));

        // Sparse output has no width limit
        let series = year_counts(&[1975.0, 1.0e9], false).unwrap();
        assert_eq!(series.years, vec![1975, 1_000_000_000]);
    }

    #[test]
    fn test_year_counts_sparse_by_default() {
        let series = year_counts(&[1975.2, 1978.9, 1975.4, 1979.1], false).unwrap();
        assert_eq!(series.years, vec![1975, 1979]);
        assert_eq!(series.counts, vec![2, 2]);
    }

    #[test]
    fn test_year_counts_dense_fills_gaps() {
        let series = year_counts(&[1975.2, 1978.9, 1975.4, 1981.0], true).unwrap();
        assert_eq!(series.years, vec![1975, 1976, 1977, 1978, 1979, 1980, 1981]);
        assert_eq!(series.counts, vec![2, 0, 0, 0, 1, 0, 1]);
    }

    #[test]
    fn test_year_counts_empty() {
        assert_eq!(year_counts(&[], true), Ok(TimeSeries::default()));
        assert_eq!(year_counts(&[], false), Ok(TimeSeries::default()));
    }

    #[test]
    fn test_time_span() {
        let dataset = Dataset::from_records(vec![
            Record::new(70.0, 1978.25),
            Record::new(80.0, 1998.75),
            Record::new(75.0, 1990.0),
        ])
        .unwrap();

        let span = time_span(&dataset, Field::DeathTime).unwrap();
        assert_eq!(span.first, 1978.25);
        assert_eq!(span.last, 1998.75);
        assert_eq!(span.span, 20.5);
    }

    #[test]
    fn test_time_series_rejects_categorical_field() {
        let dataset = Dataset::from_records(vec![Record::new(70.0, 1978.25)]).unwrap();
        assert!(matches!(
            time_series(&dataset, Field::Season, false),
            Err(PipelineError::Config(_))
        ));
    }
}
