//! Distributions over categorical fields (weekday, season).

use crate::models::{Dataset, DayOfWeek, Field, Histogram, Record, Season, WeekSplit};

use super::stats::percentage;

/// A closed set of categories with a canonical display order.
pub trait Category: Copy + PartialEq + 'static {
    /// Field the category is read from.
    const FIELD: Field;

    /// Every category, in display order.
    fn all() -> &'static [Self];

    fn label(&self) -> &'static str;

    fn of(record: &Record) -> Option<Self>;
}

impl Category for DayOfWeek {
    const FIELD: Field = Field::DayOfWeek;

    fn all() -> &'static [Self] {
        &DayOfWeek::ALL
    }

    fn label(&self) -> &'static str {
        DayOfWeek::label(self)
    }

    fn of(record: &Record) -> Option<Self> {
        record.day_of_week
    }
}

impl Category for Season {
    const FIELD: Field = Field::Season;

    fn all() -> &'static [Self] {
        &Season::ALL
    }

    fn label(&self) -> &'static str {
        Season::label(self)
    }

    fn of(record: &Record) -> Option<Self> {
        record.season
    }
}

/// Count records per category, in canonical order with zero categories kept.
///
/// Percentages are relative to the records carrying the field. Returns
/// `None` when no record carries it.
pub fn distribution<C: Category>(dataset: &Dataset) -> Option<Histogram> {
    let observed: Vec<C> = dataset.records().iter().filter_map(C::of).collect();
    if observed.is_empty() {
        return None;
    }

    let total = observed.len();
    let counts: Vec<usize> = C::all()
        .iter()
        .map(|category| observed.iter().filter(|c| *c == category).count())
        .collect();

    Some(Histogram {
        labels: C::all().iter().map(|c| c.label().to_string()).collect(),
        percentages: counts.iter().map(|&c| percentage(c, total)).collect(),
        counts,
    })
}

/// Weekday (Mon-Fri) and weekend (Sat-Sun) counts.
pub fn weekday_weekend(dataset: &Dataset) -> Option<WeekSplit> {
    let days: Vec<DayOfWeek> = dataset.records().iter().filter_map(|r| r.day_of_week).collect();
    if days.is_empty() {
        return None;
    }
    let weekend = days.iter().filter(|d| d.is_weekend()).count();
    Some(WeekSplit {
        weekday: days.len() - weekend,
        weekend,
    })
}
