//! JSON and Markdown report generation.
//!
//! This module wraps a pipeline [`Summary`] with run metadata and renders
//! it for export.

use crate::analysis::Pipeline;
use crate::cli::OutputFormat;
use crate::models::{Dataset, Histogram, Record, Report, ReportMetadata, Summary};
use anyhow::{Context, Result};
use chrono::Utc;
use std::path::Path;

/// Assemble the report for one run.
///
/// `rows_loaded` is the raw row count before cleaning. The first
/// `sample_rows` cleaned records are copied into the report.
pub fn build_report(
    source: &str,
    rows_loaded: usize,
    dataset: &Dataset,
    pipeline: &Pipeline,
    summary: Summary,
    sample_rows: usize,
    duration_seconds: f64,
) -> Report {
    let metadata = ReportMetadata {
        source: source.to_string(),
        generated_at: Utc::now(),
        tool_version: env!("CARGO_PKG_VERSION").to_string(),
        records_loaded: rows_loaded,
        records_dropped: dataset.dropped(),
        field: pipeline.field(),
        correlation_fields: summary
            .correlation
            .and(pipeline.correlation_fields()),
        duration_seconds,
    };

    Report {
        metadata,
        summary,
        raw_data_sample: dataset.records().iter().take(sample_rows).cloned().collect(),
    }
}

/// Render a report in the requested format.
pub fn render_report(report: &Report, format: OutputFormat, pretty: bool) -> Result<String> {
    match format {
        OutputFormat::Json => generate_json_report(report, pretty),
        OutputFormat::Markdown => Ok(generate_markdown_report(report)),
    }
}

/// Render and write a report, creating the parent directory if needed.
pub fn write_report(report: &Report, path: &Path, format: OutputFormat, pretty: bool) -> Result<()> {
    let content = render_report(report, format, pretty)?;

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory {}", parent.display()))?;
    }

    std::fs::write(path, content)
        .with_context(|| format!("Failed to write report to {}", path.display()))
}

/// Generate a JSON report.
pub fn generate_json_report(report: &Report, pretty: bool) -> Result<String> {
    let json = if pretty {
        serde_json::to_string_pretty(report)?
    } else {
        serde_json::to_string(report)?
    };
    Ok(json)
}

/// Generate a complete Markdown report.
pub fn generate_markdown_report(report: &Report) -> String {
    let mut output = String::new();

    output.push_str("# casestat Report\n\n");

    output.push_str(&generate_metadata_section(&report.metadata));
    output.push_str(&generate_summary_section(&report.summary));

    for (key, histogram) in &report.summary.distributions {
        output.push_str(&generate_distribution_section(key, histogram));
    }

    output.push_str(&generate_time_series_section(&report.summary));
    output.push_str(&generate_correlation_section(report));
    output.push_str(&generate_sample_section(&report.raw_data_sample));

    output.push_str(&generate_footer());

    output
}

/// Generate the metadata section.
fn generate_metadata_section(metadata: &ReportMetadata) -> String {
    let mut section = String::new();

    section.push_str("## Metadata\n\n");
    section.push_str(&format!("- **Source:** {}\n", metadata.source));
    section.push_str(&format!(
        "- **Generated:** {}\n",
        metadata.generated_at.format("%Y-%m-%d %H:%M:%S UTC")
    ));
    section.push_str(&format!("- **Field:** `{}`\n", metadata.field));
    section.push_str(&format!(
        "- **Records Loaded:** {}\n",
        metadata.records_loaded
    ));
    if metadata.records_dropped > 0 {
        section.push_str(&format!(
            "- **Records Dropped:** {}\n",
            metadata.records_dropped
        ));
    }
    section.push_str(&format!(
        "- **Duration:** {:.2}s\n",
        metadata.duration_seconds
    ));
    section.push('\n');

    section
}

/// Generate the summary statistics table.
fn generate_summary_section(summary: &Summary) -> String {
    let stats = &summary.summary;
    let mut section = String::new();

    section.push_str("## Summary\n\n");
    section.push_str("| Statistic | Value |\n");
    section.push_str("|:---|---:|\n");
    section.push_str(&format!("| Records | {} |\n", stats.total_records));
    if stats.count != stats.total_records {
        section.push_str(&format!("| With `{}` | {} |\n", stats.field, stats.count));
    }
    section.push_str(&format!("| Mean | {:.2} |\n", stats.mean));
    section.push_str(&format!("| Median | {} |\n", stats.median));
    section.push_str(&format!("| Min | {} |\n", stats.min));
    section.push_str(&format!("| Max | {} |\n", stats.max));
    section.push('\n');

    if let Some(ref span) = summary.time_span {
        section.push_str(&format!(
            "Records span `{}` {:.2} to {:.2} ({:.1} years).\n\n",
            span.field, span.first, span.last, span.span
        ));
    }

    if !summary.field_summaries.is_empty() {
        section.push_str("### Other Fields\n\n");
        section.push_str("| Field | Count | Mean | Median | Min | Max |\n");
        section.push_str("|:---|---:|---:|---:|---:|---:|\n");
        for (name, stats) in &summary.field_summaries {
            section.push_str(&format!(
                "| `{}` | {} | {:.2} | {} | {} | {} |\n",
                name, stats.count, stats.mean, stats.median, stats.min, stats.max
            ));
        }
        section.push('\n');
    }

    if !summary.modes.is_empty() {
        section.push_str("### Most Common\n\n");
        section.push_str("| Field | Value | Count |\n");
        section.push_str("|:---|:---|---:|\n");
        for (name, mode) in &summary.modes {
            section.push_str(&format!("| `{}` | {} | {} |\n", name, mode.value, mode.count));
        }
        section.push('\n');
    }

    if let Some(split) = summary.weekday_weekend {
        section.push_str("### Weekday vs Weekend\n\n");
        section.push_str("| Weekday | Weekend |\n");
        section.push_str("|:---:|:---:|\n");
        section.push_str(&format!("| {} | {} |\n\n", split.weekday, split.weekend));
    }

    section
}

/// Generate one table per histogram.
fn generate_distribution_section(key: &str, histogram: &Histogram) -> String {
    let mut section = String::new();

    let title = key.trim_start_matches("distribution_by_").replace('_', " ");
    section.push_str(&format!("## Distribution by {}\n\n", title));
    section.push_str("| Bucket | Count | Percentage |\n");
    section.push_str("|:---|---:|---:|\n");

    for entry in histogram.entries() {
        section.push_str(&format!(
            "| {} | {} | {:.1}% |\n",
            entry.label, entry.count, entry.percentage
        ));
    }
    section.push('\n');

    section
}

/// Generate the per-year counts table.
fn generate_time_series_section(summary: &Summary) -> String {
    let Some(ref series) = summary.time_series else {
        return String::new();
    };

    let mut section = String::new();

    section.push_str("## Time Series\n\n");
    section.push_str("| Year | Count |\n");
    section.push_str("|:---|---:|\n");
    for (year, count) in series.years.iter().zip(&series.counts) {
        section.push_str(&format!("| {} | {} |\n", year, count));
    }
    section.push('\n');

    section
}

/// Generate the correlation line.
fn generate_correlation_section(report: &Report) -> String {
    let Some(r) = report.summary.correlation else {
        return String::new();
    };

    match report.metadata.correlation_fields {
        Some((a, b)) => format!(
            "## Correlation\n\nPearson r between `{}` and `{}`: **{:.3}**\n\n",
            a, b, r
        ),
        None => format!("## Correlation\n\nPearson r: **{:.3}**\n\n", r),
    }
}

/// Generate the raw data sample table.
fn generate_sample_section(records: &[Record]) -> String {
    if records.is_empty() {
        return String::new();
    }

    let mut section = String::new();

    section.push_str("## Data Sample\n\n");
    section.push_str("| Age | Death Time | Hour | Day | Season |\n");
    section.push_str("|---:|---:|---:|:---|:---|\n");

    for record in records {
        section.push_str(&format!(
            "| {} | {} | {} | {} | {} |\n",
            record.age,
            record.death_time,
            record.hour.map(|h| h.to_string()).unwrap_or_default(),
            record.day_of_week.map(|d| d.to_string()).unwrap_or_default(),
            record.season.map(|s| s.to_string()).unwrap_or_default(),
        ));
    }
    section.push('\n');

    section
}

/// Generate the report footer.
fn generate_footer() -> String {
    let mut footer = String::new();

    footer.push_str("---\n\n");
    footer.push_str(&format!(
        "*Report generated by casestat v{}*\n",
        env!("CARGO_PKG_VERSION")
    ));

    footer
}
