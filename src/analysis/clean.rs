//! Turning raw CSV rows into a cleaned [`Dataset`].
//!
//! Rows missing a required field are dropped and counted. A cell that is
//! present but does not parse is an error naming the line and column;
//! it is never silently dropped.

use std::str::FromStr;
use tracing::{debug, info};

use crate::error::{PipelineError, Result};
use crate::models::{ColumnMap, Dataset, DayOfWeek, Field, RawRow, Record, Season};

/// Fields every record needs regardless of configuration.
pub const ALWAYS_REQUIRED: [Field; 2] = [Field::Age, Field::DeathTime];

/// Clean raw rows into an immutable dataset.
///
/// `required` lists extra fields whose absence drops a row; `age` and
/// `death_time` are always required. Fails with a data error when nothing
/// survives.
pub fn clean(rows: &[RawRow], columns: &ColumnMap, required: &[Field]) -> Result<Dataset> {
    let mut records = Vec::with_capacity(rows.len());
    let mut dropped = 0;

    for row in rows {
        match parse_row(row, columns, required)? {
            Some(record) => records.push(record),
            None => {
                debug!("Dropping line {}: missing required field", row.line());
                dropped += 1;
            }
        }
    }

    if dropped > 0 {
        info!(
            "Dropped {} of {} rows with missing required fields",
            dropped,
            rows.len()
        );
    }

    Dataset::new(records, dropped)
}

/// Parse one row. `Ok(None)` means a required field is missing.
fn parse_row(row: &RawRow, columns: &ColumnMap, required: &[Field]) -> Result<Option<Record>> {
    let missing = ALWAYS_REQUIRED
        .iter()
        .chain(required)
        .any(|&field| row.cell(columns.column(field)).is_none());
    if missing {
        return Ok(None);
    }

    let (Some(age), Some(death_time)) = (
        parse_cell::<f64>(row, columns, Field::Age)?,
        parse_cell::<f64>(row, columns, Field::DeathTime)?,
    ) else {
        return Ok(None);
    };

    let record = Record {
        hour: parse_cell::<f64>(row, columns, Field::Hour)?,
        day_of_week: parse_cell::<DayOfWeek>(row, columns, Field::DayOfWeek)?,
        season: parse_cell::<Season>(row, columns, Field::Season)?,
        ..Record::new(age, death_time)
    };

    record
        .validate()
        .map_err(|e| PipelineError::data(format!("line {}: {}", row.line(), e.message())))?;

    Ok(Some(record))
}

/// Parse a cell if present. Parse failures become data errors with location.
fn parse_cell<T>(row: &RawRow, columns: &ColumnMap, field: Field) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    let column = columns.column(field);
    let Some(text) = row.cell(column) else {
        return Ok(None);
    };

    text.parse::<T>().map(Some).map_err(|e| {
        PipelineError::data(format!(
            "line {}, column '{}': cannot parse '{}' ({})",
            row.line(),
            column,
            text,
            e
        ))
    })
}
