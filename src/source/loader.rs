//! CSV parsing into raw rows.
//!
//! The loader only splits the file into named cells; turning cells into
//! typed records is the cleaning step's job.

use anyhow::{Context, Result as AnyResult};
use std::collections::HashMap;
use std::fs::File;
use std::io::Read;
use std::path::Path;
use tracing::debug;

use crate::error::{PipelineError, Result};
use crate::models::RawRow;

/// Parse CSV with a header row into raw rows.
///
/// Ragged rows and invalid UTF-8 are data errors carrying the line number.
pub fn parse_csv<R: Read>(reader: R) -> Result<Vec<RawRow>> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let headers: Vec<String> = reader
        .headers()
        .map_err(csv_error)?
        .iter()
        .map(|h| h.to_string())
        .collect();

    let mut rows = Vec::new();
    for result in reader.records() {
        let record = result.map_err(csv_error)?;
        let line = record
            .position()
            .map(|p| p.line() as usize)
            .unwrap_or(rows.len() + 2);

        let cells: HashMap<String, String> = headers
            .iter()
            .cloned()
            .zip(record.iter().map(str::to_string))
            .collect();
        rows.push(RawRow::new(line, cells));
    }

    debug!("Parsed {} CSV rows with columns {:?}", rows.len(), headers);
    Ok(rows)
}

/// Parse CSV text already held in memory.
pub fn parse_csv_str(text: &str) -> Result<Vec<RawRow>> {
    parse_csv(text.as_bytes())
}

/// Read and parse a CSV file from disk.
pub fn load_path(path: &Path) -> AnyResult<Vec<RawRow>> {
    let file =
        File::open(path).with_context(|| format!("Failed to open dataset: {}", path.display()))?;
    let rows = parse_csv(file).with_context(|| format!("Failed to parse {}", path.display()))?;
    Ok(rows)
}

fn csv_error(err: csv::Error) -> PipelineError {
    match err.position() {
        Some(pos) => PipelineError::data(format!("malformed CSV at line {}: {}", pos.line(), err)),
        None => PipelineError::data(format!("malformed CSV: {}", err)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const SAMPLE: &str = "\
Name,Age,fractionalDeathYear,gender
Eileen Crompton,79,1975.33,0
Joseph Bardsley, 83 ,1978.75,1
Winifred Arrowsmith,,1978.92,0
";

    #[test]
    fn test_parse_csv_rows() {
        let rows = parse_csv_str(SAMPLE).unwrap();
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0].cell("Age"), Some("79"));
        assert_eq!(rows[1].cell("Age"), Some("83"));
        assert_eq!(rows[2].cell("Age"), None);
        assert_eq!(rows[0].cell("Name"), Some("Eileen Crompton"));
    }

    #[test]
    fn test_parse_csv_line_numbers() {
        let rows = parse_csv_str(SAMPLE).unwrap();
        assert_eq!(rows[0].line(), 2);
        assert_eq!(rows[2].line(), 4);
    }

    #[test]
    fn test_parse_csv_ragged_row() {
        let err = parse_csv_str("Age,fractionalDeathYear\n70,1990.1\n71\n").unwrap_err();
        assert!(matches!(err, PipelineError::Data(_)));
    }

    #[test]
    fn test_parse_csv_header_only() {
        assert!(parse_csv_str("Age,fractionalDeathYear\n").unwrap().is_empty());
    }

    #[test]
    fn test_load_path() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(SAMPLE.as_bytes()).unwrap();

        let rows = load_path(file.path()).unwrap();
        assert_eq!(rows.len(), 3);
    }

    #[test]
    fn test_load_missing_file() {
        let err = load_path(Path::new("/nonexistent/victims.csv")).unwrap_err();
        assert!(err.to_string().contains("Failed to open dataset"));
    }
}
