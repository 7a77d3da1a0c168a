//! The aggregation pipeline: dataset in, [`Summary`] out.
//!
//! Every step is a pure function of the cleaned dataset; nothing here
//! mutates its input or performs I/O. A run either returns a complete
//! summary or the first error it hits.

use std::collections::BTreeMap;
use tracing::debug;

use super::buckets::BucketSet;
use super::categorical::{self, Category};
use super::correlation::correlation;
use super::stats::{peak_hour, summarize};
use super::timeseries::{time_series, time_span};
use crate::error::{PipelineError, Result};
use crate::models::{Dataset, DayOfWeek, Field, Histogram, Mode, Season, Summary};

/// Year field settings for the time series.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimeSeriesSpec {
    pub field: Field,
    /// Zero-fill years between the first and last observed one.
    pub dense: bool,
}

/// A configured aggregation, reusable across datasets.
#[derive(Debug, Clone, PartialEq)]
pub struct Pipeline {
    field: Field,
    buckets: BucketSet,
    secondary: Vec<(Field, BucketSet)>,
    time_series: Option<TimeSeriesSpec>,
    correlation: Option<(Field, Field)>,
    categorical: bool,
}

impl Pipeline {
    /// Pipeline with only the primary field histogram and its statistics.
    pub fn new(field: Field, buckets: BucketSet) -> Result<Self> {
        require_numeric(field)?;
        Ok(Self {
            field,
            buckets,
            secondary: Vec::new(),
            time_series: None,
            correlation: None,
            categorical: false,
        })
    }

    /// Add a histogram for another numeric field. Skipped when no record carries it.
    pub fn with_distribution(mut self, field: Field, buckets: BucketSet) -> Result<Self> {
        require_numeric(field)?;
        if field == self.field || self.secondary.iter().any(|(f, _)| *f == field) {
            return Err(PipelineError::config(format!(
                "field '{}' already has a distribution",
                field
            )));
        }
        self.secondary.push((field, buckets));
        Ok(self)
    }

    pub fn with_time_series(mut self, field: Field, dense: bool) -> Result<Self> {
        require_numeric(field)?;
        self.time_series = Some(TimeSeriesSpec { field, dense });
        Ok(self)
    }

    pub fn with_correlation(mut self, a: Field, b: Field) -> Result<Self> {
        require_numeric(a)?;
        require_numeric(b)?;
        self.correlation = Some((a, b));
        Ok(self)
    }

    /// Include weekday and season distributions when the data carries them.
    pub fn with_categorical(mut self, enabled: bool) -> Self {
        self.categorical = enabled;
        self
    }

    pub fn field(&self) -> Field {
        self.field
    }

    pub fn correlation_fields(&self) -> Option<(Field, Field)> {
        self.correlation
    }

    /// Run every configured step over `dataset`.
    pub fn run(&self, dataset: &Dataset) -> Result<Summary> {
        let summary = summarize(dataset, self.field)?;

        let mut distributions = BTreeMap::new();
        let primary = self.buckets.histogram(&dataset.values(self.field))?;
        debug_assert_eq!(primary.total(), summary.count);
        distributions.insert(self.field.distribution_key(), primary);

        let mut field_summaries = BTreeMap::new();
        for (field, buckets) in &self.secondary {
            let values = dataset.values(*field);
            if values.is_empty() {
                debug!("No record carries '{}', skipping its distribution", field);
                continue;
            }
            distributions.insert(field.distribution_key(), buckets.histogram(&values)?);
            field_summaries.insert(field.as_str().to_string(), summarize(dataset, *field)?);
        }

        let mut modes = BTreeMap::new();
        if distributions.contains_key(&Field::Hour.distribution_key()) {
            if let Some(peak) = peak_hour(&dataset.values(Field::Hour)) {
                modes.insert(Field::Hour.as_str().to_string(), peak);
            }
        }

        let mut weekday_weekend = None;
        if self.categorical {
            insert_categorical::<DayOfWeek>(dataset, &mut distributions, &mut modes);
            insert_categorical::<Season>(dataset, &mut distributions, &mut modes);
            weekday_weekend = categorical::weekday_weekend(dataset);
        }

        let (time_span, time_series) = match self.time_series {
            Some(spec) => (
                Some(time_span(dataset, spec.field)?),
                Some(time_series(dataset, spec.field, spec.dense)?),
            ),
            None => (None, None),
        };

        let correlation = match self.correlation {
            Some((a, b)) => Some(correlation(dataset, a, b)?),
            None => None,
        };

        Ok(Summary {
            summary,
            field_summaries,
            time_span,
            distributions,
            modes,
            weekday_weekend,
            time_series,
            correlation,
        })
    }
}

/// `aggregate(dataset, numeric_field, bucket_defs) -> Summary`: the primary
/// field's statistics and histogram only.
#[allow(dead_code)]
pub fn aggregate(dataset: &Dataset, field: Field, buckets: &BucketSet) -> Result<Summary> {
    Pipeline::new(field, buckets.clone())?.run(dataset)
}

fn insert_categorical<C: Category>(
    dataset: &Dataset,
    distributions: &mut BTreeMap<String, Histogram>,
    modes: &mut BTreeMap<String, Mode>,
) {
    if let Some(histogram) = categorical::distribution::<C>(dataset) {
        if let Some(mode) = histogram.mode() {
            modes.insert(C::FIELD.as_str().to_string(), mode);
        }
        distributions.insert(C::FIELD.distribution_key(), histogram);
    }
}

fn require_numeric(field: Field) -> Result<()> {
    if field.is_numeric() {
        Ok(())
    } else {
        Err(PipelineError::config(format!(
            "field '{}' is not numeric",
            field
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::buckets::BucketDef;
    use crate::analysis::clean::clean;
    use crate::models::{ColumnMap, RawRow, Record};

    fn ages(values: &[f64]) -> Dataset {
        Dataset::from_records(
            values
                .iter()
                .enumerate()
                .map(|(i, &age)| Record::new(age, 1980.0 + i as f64))
                .collect(),
        )
        .unwrap()
    }

    #[test]
    fn test_aggregate_end_to_end() {
        let dataset = ages(&[45.0, 55.0, 65.0, 75.0, 85.0, 95.0]);
        let summary = aggregate(&dataset, Field::Age, &BucketSet::default_age()).unwrap();

        let histogram = summary.distribution(Field::Age).unwrap();
        assert_eq!(histogram.counts, vec![1, 1, 1, 1, 1, 1]);
        assert_eq!(histogram.percentages, vec![16.7; 6]);
        assert_eq!(summary.summary.count, 6);
        assert_eq!(summary.summary.mean, 70.0);
        assert_eq!(summary.summary.median, 70.0);
        assert_eq!(summary.summary.min, 45.0);
        assert_eq!(summary.summary.max, 95.0);
        assert!(summary.time_series.is_none());
        assert!(summary.correlation.is_none());
    }

    #[test]
    fn test_aggregate_empty_input_after_cleaning() {
        let rows = vec![RawRow::from_pairs(2, [("Age", ""), ("fractionalDeathYear", "")])];
        let result = clean(&rows, &ColumnMap::default(), &[])
            .and_then(|dataset| aggregate(&dataset, Field::Age, &BucketSet::default_age()));
        assert!(matches!(result, Err(PipelineError::Data(_))));
    }

    #[test]
    fn test_histogram_total_matches_cleaned_count() {
        let dataset = ages(&[49.9, 50.0, 60.0, 60.0, 71.0, 88.0, 90.0, 101.0, 12.0]);
        let summary = aggregate(&dataset, Field::Age, &BucketSet::default_age()).unwrap();
        let histogram = summary.distribution(Field::Age).unwrap();

        assert_eq!(histogram.total(), dataset.len());
        assert_eq!(histogram.count_of("60-69"), Some(2));
        assert_eq!(histogram.count_of("50-59"), Some(1));
        assert_eq!(histogram.count_of("90+"), Some(2));
    }

    #[test]
    fn test_pipeline_full_run() {
        let dataset = Dataset::from_records(vec![
            Record::new(60.0, 1975.2)
                .with_hour(9.0)
                .with_day_of_week(DayOfWeek::Monday)
                .with_season(Season::Winter),
            Record::new(70.0, 1977.6)
                .with_hour(15.5)
                .with_day_of_week(DayOfWeek::Saturday),
            Record::new(80.0, 1980.0),
        ])
        .unwrap();

        let pipeline = Pipeline::new(Field::Age, BucketSet::default_age())
            .unwrap()
            .with_distribution(Field::Hour, BucketSet::default_hour())
            .unwrap()
            .with_time_series(Field::DeathTime, false)
            .unwrap()
            .with_correlation(Field::Age, Field::DeathTime)
            .unwrap()
            .with_categorical(true);

        let summary = pipeline.run(&dataset).unwrap();

        let hours = summary.distribution(Field::Hour).unwrap();
        assert_eq!(hours.total(), 2);
        assert_eq!(hours.count_of("Morning (8-11)"), Some(1));
        assert_eq!(hours.count_of("Afternoon (14-17)"), Some(1));

        let days = summary.distribution(Field::DayOfWeek).unwrap();
        assert_eq!(days.count_of("Monday"), Some(1));
        assert_eq!(days.count_of("Saturday"), Some(1));
        assert!(summary.distribution(Field::Season).is_some());

        let series = summary.time_series.as_ref().unwrap();
        assert_eq!(series.years, vec![1975, 1978, 1980]);
        assert_eq!(series.counts, vec![1, 1, 1]);

        let span = summary.time_span.as_ref().unwrap();
        assert_eq!(span.first, 1975.2);
        assert_eq!(span.last, 1980.0);

        assert!(summary.correlation.unwrap() > 0.9);
        assert_eq!(summary.weekday_weekend.unwrap().weekend, 1);
    }

    #[test]
    fn test_secondary_summaries_and_modes() {
        let dataset = Dataset::from_records(vec![
            Record::new(60.0, 1975.0)
                .with_hour(14.25)
                .with_day_of_week(DayOfWeek::Friday)
                .with_season(Season::Summer),
            Record::new(70.0, 1976.0)
                .with_hour(14.75)
                .with_day_of_week(DayOfWeek::Monday)
                .with_season(Season::Summer),
            Record::new(80.0, 1977.0)
                .with_hour(9.0)
                .with_day_of_week(DayOfWeek::Friday)
                .with_season(Season::Winter),
            Record::new(90.0, 1978.0).with_day_of_week(DayOfWeek::Monday),
        ])
        .unwrap();

        let summary = Pipeline::new(Field::Age, BucketSet::default_age())
            .unwrap()
            .with_distribution(Field::Hour, BucketSet::default_hour())
            .unwrap()
            .with_categorical(true)
            .run(&dataset)
            .unwrap();

        let hours = summary.field_summary(Field::Hour).unwrap();
        assert_eq!(hours.count, 3);
        assert_eq!(hours.total_records, 4);
        assert!((hours.mean - 38.0 / 3.0).abs() < 1e-9);
        assert_eq!(hours.median, 14.25);
        assert_eq!(hours.min, 9.0);
        assert_eq!(hours.max, 14.75);
        assert_eq!(summary.field_summary(Field::Age).unwrap().mean, 75.0);

        let peak = summary.mode(Field::Hour).unwrap();
        assert_eq!(peak.value, "14:00");
        assert_eq!(peak.count, 2);

        // Monday and Friday tie on two; Monday comes first in the week
        let day = summary.mode(Field::DayOfWeek).unwrap();
        assert_eq!(day.value, "Monday");
        assert_eq!(day.count, 2);

        let season = summary.mode(Field::Season).unwrap();
        assert_eq!(season.value, "Summer");
        assert_eq!(season.count, 2);

        let json = serde_json::to_value(&summary).unwrap();
        assert_eq!(json["field_summaries"]["hour"]["count"], 3);
        assert_eq!(json["modes"]["day_of_week"]["value"], "Monday");
        assert_eq!(json["modes"]["hour"]["count"], 2);
    }

    #[test]
    fn test_time_series_sparse_versus_dense() {
        let dataset = Dataset::from_records(vec![
            Record::new(60.0, 1975.0),
            Record::new(70.0, 1978.0),
        ])
        .unwrap();
        let base = Pipeline::new(Field::Age, BucketSet::default_age()).unwrap();

        let sparse = base
            .clone()
            .with_time_series(Field::DeathTime, false)
            .unwrap()
            .run(&dataset)
            .unwrap();
        assert_eq!(sparse.time_series.unwrap().years, vec![1975, 1978]);

        let dense = base
            .with_time_series(Field::DeathTime, true)
            .unwrap()
            .run(&dataset)
            .unwrap();
        let series = dense.time_series.unwrap();
        assert_eq!(series.years, vec![1975, 1976, 1977, 1978]);
        assert_eq!(series.counts, vec![1, 0, 0, 1]);
    }

    #[test]
    fn test_absent_secondary_field_is_skipped() {
        let dataset = ages(&[60.0, 70.0]);
        let summary = Pipeline::new(Field::Age, BucketSet::default_age())
            .unwrap()
            .with_distribution(Field::Hour, BucketSet::default_hour())
            .unwrap()
            .with_categorical(true)
            .run(&dataset)
            .unwrap();

        assert!(summary.distribution(Field::Hour).is_none());
        assert!(summary.distribution(Field::DayOfWeek).is_none());
        assert!(summary.weekday_weekend.is_none());
        assert!(summary.field_summaries.is_empty());
        assert!(summary.modes.is_empty());
    }

    #[test]
    fn test_correlation_needs_two_records() {
        let dataset = ages(&[60.0]);
        let err = Pipeline::new(Field::Age, BucketSet::default_age())
            .unwrap()
            .with_correlation(Field::Age, Field::DeathTime)
            .unwrap()
            .run(&dataset)
            .unwrap_err();
        assert!(matches!(err, PipelineError::Data(_)));
    }

    #[test]
    fn test_rejects_non_numeric_fields() {
        assert!(matches!(
            Pipeline::new(Field::Season, BucketSet::default_age()),
            Err(PipelineError::Config(_))
        ));

        let pipeline = Pipeline::new(Field::Age, BucketSet::default_age()).unwrap();
        assert!(pipeline
            .clone()
            .with_distribution(Field::Age, BucketSet::default_age())
            .is_err());
        assert!(pipeline.with_correlation(Field::Age, Field::DayOfWeek).is_err());
    }

    #[test]
    fn test_summary_json_shape() {
        let dataset = ages(&[45.0, 55.0, 65.0]);
        let buckets = BucketSet::new(vec![
            BucketDef::new(0.0, 60.0, "under 60"),
            BucketDef::open(60.0, "60+"),
        ])
        .unwrap();
        let summary = Pipeline::new(Field::Age, buckets)
            .unwrap()
            .with_time_series(Field::DeathTime, false)
            .unwrap()
            .with_correlation(Field::Age, Field::DeathTime)
            .unwrap()
            .run(&dataset)
            .unwrap();

        let json = serde_json::to_value(&summary).unwrap();
        assert_eq!(json["summary"]["count"], 3);
        assert_eq!(json["summary"]["field"], "age");
        assert_eq!(json["distribution_by_age"]["labels"][1], "60+");
        assert_eq!(json["distribution_by_age"]["counts"][0], 2);
        assert_eq!(json["time_series"]["years"][0], 1980);
        assert_eq!(json["correlation"], 1.0);
        assert!(json.get("weekday_weekend").is_none());
        assert!(json.get("field_summaries").is_none());
        assert!(json.get("modes").is_none());
    }
}
