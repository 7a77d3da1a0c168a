//! casestat - descriptive statistics for case-record datasets
//!
//! Loads a CSV of case records, cleans it, buckets a numeric field and
//! exports summary statistics, distributions, a per-year time series and
//! a correlation as JSON or Markdown.
//!
//! Exit codes:
//!   0 - Success
//!   1 - Runtime error (I/O, network, config file, a failed batch file)
//!   2 - Pipeline error (bad data or bad bucket/field configuration)

mod analysis;
mod cli;
mod config;
mod error;
mod models;
mod report;
mod scanner;
mod source;

use anyhow::{Context, Result};
use cli::{Args, OutputFormat};
use config::Config;
use error::PipelineError;
use futures::stream::{self, StreamExt};
use indicatif::{ProgressBar, ProgressStyle};
use scanner::{DatasetScanner, ScanConfig, ScannedFile};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info, warn};
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use analysis::Pipeline;
use models::RawRow;

/// Where the dataset(s) for this run come from.
#[derive(Debug, Clone, PartialEq)]
enum Source {
    File(PathBuf),
    Url(String),
    Directory(PathBuf),
}

impl Source {
    /// Resolve from flags, falling back to the configured dataset URL.
    fn resolve(args: &Args, config: &Config) -> Self {
        if let Some(ref path) = args.input {
            Source::File(path.clone())
        } else if let Some(ref url) = args.url {
            Source::Url(url.clone())
        } else if let Some(ref dir) = args.input_dir {
            Source::Directory(dir.clone())
        } else {
            Source::Url(config.dataset.url.clone())
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command-line arguments
    let args = Args::parse_args();

    // Validate arguments
    if let Err(e) = args.validate() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }

    // Handle --init-config early (no logging needed)
    if args.init_config {
        return handle_init_config();
    }

    init_logging(&args);

    info!("casestat v{}", env!("CARGO_PKG_VERSION"));
    debug!("Arguments: {:?}", args);

    match run(args).await {
        Ok(exit_code) => {
            std::process::exit(exit_code);
        }
        Err(e) => {
            error!("Analysis failed: {:#}", e);
            eprintln!("\n❌ Error: {:#}", e);
            std::process::exit(exit_code_for(&e));
        }
    }
}

/// Pipeline failures exit with 2, everything else with 1.
fn exit_code_for(err: &anyhow::Error) -> i32 {
    if err.downcast_ref::<PipelineError>().is_some() {
        2
    } else {
        1
    }
}

/// Handle --init-config: generate a default .casestat.toml.
fn handle_init_config() -> Result<()> {
    let path = Path::new(config::DEFAULT_CONFIG_FILE);

    if path.exists() {
        eprintln!(
            "⚠️  {} already exists. Remove it first or edit it manually.",
            config::DEFAULT_CONFIG_FILE
        );
        std::process::exit(1);
    }

    let content = Config::default_toml()?;
    std::fs::write(path, &content)
        .with_context(|| format!("Failed to write {}", config::DEFAULT_CONFIG_FILE))?;

    println!(
        "✅ Created {} with default settings.",
        config::DEFAULT_CONFIG_FILE
    );
    println!("   Edit it to customize columns, buckets, correlation, and more.");
    Ok(())
}

/// Initialize logging based on verbosity settings. `RUST_LOG` wins when set.
fn init_logging(args: &Args) {
    let filter = EnvFilter::builder()
        .with_default_directive(LevelFilter::from_level(args.log_level()).into())
        .from_env_lossy();

    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .compact()
        .finish();

    tracing::subscriber::set_global_default(subscriber).expect("Failed to set tracing subscriber");
}

/// Run the requested analysis. Returns the exit code.
async fn run(args: Args) -> Result<i32> {
    let mut config = load_config(&args)?;
    config.merge_with_args(&args);

    // Bucket and field errors surface before any data is loaded
    let pipeline = config.analysis.build_pipeline()?;

    match Source::resolve(&args, &config) {
        Source::Directory(dir) => run_batch(&dir, &args, config, pipeline).await,
        input => run_single(&input, &args, &config, &pipeline).await,
    }
}

/// Analyse one dataset from a file or URL.
async fn run_single(input: &Source, args: &Args, config: &Config, pipeline: &Pipeline) -> Result<i32> {
    let start_time = Instant::now();

    let (label, rows) = match input {
        Source::File(path) => {
            println!("📂 Loading dataset: {}", path.display());
            (path.display().to_string(), source::load_path(path)?)
        }
        Source::Url(url) => {
            println!("📥 Downloading dataset: {}", url);
            let options = source::FetchOptions {
                timeout_seconds: config.dataset.timeout_seconds,
                show_progress: !args.quiet,
            };
            let text = source::fetch_csv(url, &options).await?;
            (url.clone(), source::parse_csv_str(&text)?)
        }
        Source::Directory(dir) => {
            anyhow::bail!("{} is a directory, use --input-dir", dir.display())
        }
    };
    info!("Read {} rows from {}", rows.len(), label);

    let dataset = analysis::clean(&rows, &config.dataset.columns, &config.dataset.required)?;

    if args.dry_run {
        println!("\n🔍 Dry run: no report written.\n");
        println!("   Rows read: {}", rows.len());
        println!("   Rows kept: {}", dataset.len());
        println!("   Rows dropped: {}", dataset.dropped());
        return Ok(0);
    }

    println!("🔬 Aggregating `{}`...", pipeline.field());
    let summary = pipeline.run(&dataset)?;

    let report = report::build_report(
        &label,
        rows.len(),
        &dataset,
        pipeline,
        summary,
        config.report.sample_rows,
        start_time.elapsed().as_secs_f64(),
    );

    let mut output = PathBuf::from(&config.general.output);
    if args.output.is_none() {
        output.set_extension(args.format.extension());
    }
    report::write_report(&report, &output, args.format, config.report.pretty)?;

    let stats = &report.summary.summary;
    println!("\n📊 Analysis Summary:");
    println!(
        "   Records: {} kept, {} dropped",
        stats.total_records, stats.dropped_records
    );
    println!(
        "   {}: mean {:.2} | median {} | min {} | max {}",
        stats.field, stats.mean, stats.median, stats.min, stats.max
    );
    if let Some(histogram) = report.summary.distribution(stats.field) {
        for entry in histogram.entries() {
            println!(
                "     {:<20} {:>5} ({:.1}%)",
                entry.label, entry.count, entry.percentage
            );
        }
    }
    for (name, mode) in &report.summary.modes {
        println!("   Most common {}: {} ({})", name, mode.value, mode.count);
    }
    if let Some(r) = report.summary.correlation {
        println!("   Correlation: {:.3}", r);
    }
    println!("   Duration: {:.2}s", report.metadata.duration_seconds);
    println!("\n✅ Analysis complete! Report saved to: {}", output.display());

    Ok(0)
}

/// Analyse every dataset under `dir`, a bounded number at a time.
async fn run_batch(dir: &Path, args: &Args, config: Config, pipeline: Pipeline) -> Result<i32> {
    let start_time = Instant::now();

    let scan_config = ScanConfig::from(&config.scanner);
    let files = DatasetScanner::new(dir.to_path_buf(), scan_config).scan()?;

    if args.dry_run {
        return handle_dry_run(&files);
    }

    if files.is_empty() {
        warn!("No datasets found under {}", dir.display());
        println!("   No matching dataset files found.");
        return Ok(0);
    }

    let out_dir = PathBuf::from(&config.general.out_dir);
    let concurrency = config.general.concurrency.max(1);
    println!(
        "🔬 Analysing {} datasets ({} at a time)...",
        files.len(),
        concurrency
    );

    let pb = if args.quiet {
        ProgressBar::hidden()
    } else {
        let pb = ProgressBar::new(files.len() as u64);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("#>-"),
        );
        pb
    };

    let config = Arc::new(config);
    let format = args.format;

    let results: Vec<(ScannedFile, Result<PathBuf>)> = stream::iter(files)
        .map(|file| {
            let config = Arc::clone(&config);
            let pipeline = pipeline.clone();
            let out_dir = out_dir.clone();
            let pb = pb.clone();
            async move {
                let task_file = file.clone();
                let result = tokio::task::spawn_blocking(move || {
                    analyse_file(&task_file, &config, &pipeline, &out_dir, format)
                })
                .await
                .context("Analysis task panicked")
                .and_then(|r| r);
                pb.set_message(file.relative.clone());
                pb.inc(1);
                (file, result)
            }
        })
        .buffer_unordered(concurrency)
        .collect()
        .await;

    pb.finish_and_clear();

    let mut failed = 0;
    for (file, result) in &results {
        match result {
            Ok(path) => println!("   ✅ {} -> {}", file.relative, path.display()),
            Err(e) => {
                failed += 1;
                error!("{}: {:#}", file.relative, e);
                println!("   ❌ {}: {:#}", file.relative, e);
            }
        }
    }

    println!("\n📊 Batch Summary:");
    println!("   Datasets analysed: {}", results.len() - failed);
    if failed > 0 {
        println!("   Datasets failed: {}", failed);
    }
    println!("   Duration: {:.1}s", start_time.elapsed().as_secs_f64());
    println!("\n✅ Reports saved to: {}", out_dir.display());

    Ok(if failed > 0 { 1 } else { 0 })
}

/// Load, clean, aggregate and write one dataset file. Runs on a blocking worker.
fn analyse_file(
    file: &ScannedFile,
    config: &Config,
    pipeline: &Pipeline,
    out_dir: &Path,
    format: OutputFormat,
) -> Result<PathBuf> {
    let start_time = Instant::now();

    let rows: Vec<RawRow> = source::load_path(&file.path)?;
    let dataset = analysis::clean(&rows, &config.dataset.columns, &config.dataset.required)
        .with_context(|| format!("Failed to clean {}", file.relative))?;
    let summary = pipeline
        .run(&dataset)
        .with_context(|| format!("Failed to aggregate {}", file.relative))?;

    let report = report::build_report(
        &file.path.display().to_string(),
        rows.len(),
        &dataset,
        pipeline,
        summary,
        config.report.sample_rows,
        start_time.elapsed().as_secs_f64(),
    );

    let path = out_dir.join(format!("{}.{}", file.stem(), format.extension()));
    report::write_report(&report, &path, format, config.report.pretty)?;
    debug!("Wrote {}", path.display());

    Ok(path)
}

/// Handle --dry-run for a batch: print the files that would be analysed.
fn handle_dry_run(files: &[ScannedFile]) -> Result<i32> {
    println!("\n🔍 Dry run: scanning datasets (no reports written)...\n");

    if files.is_empty() {
        println!("   No matching dataset files found.");
    } else {
        println!("   Found {} datasets that would be analysed:\n", files.len());
        for file in files {
            println!("     📄 {} ({} bytes)", file.relative, file.size);
        }
        println!("\n   Total: {} datasets", files.len());
    }

    println!("\n✅ Dry run complete.");
    Ok(0)
}

/// Load configuration from file or use defaults.
fn load_config(args: &Args) -> Result<Config> {
    // Try explicit config path
    if let Some(ref config_path) = args.config {
        info!("Loading config from: {}", config_path.display());
        return Config::load(config_path);
    }

    // Try default location
    match Config::load_default() {
        Ok(Some(config)) => {
            info!("Loaded default config from {}", config::DEFAULT_CONFIG_FILE);
            Ok(config)
        }
        Ok(None) => {
            debug!("No config file found, using defaults");
            Ok(Config::default())
        }
        Err(e) => {
            warn!("Failed to load config: {:#}", e);
            Ok(Config::default())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_source_resolution_order() {
        let config = Config::default();

        let args = Args::try_parse_from(["casestat", "--input", "a.csv"]).unwrap();
        assert_eq!(
            Source::resolve(&args, &config),
            Source::File(PathBuf::from("a.csv"))
        );

        let args = Args::try_parse_from(["casestat", "--input-dir", "data"]).unwrap();
        assert_eq!(
            Source::resolve(&args, &config),
            Source::Directory(PathBuf::from("data"))
        );

        let args = Args::try_parse_from(["casestat", "--url", "https://host/b.csv"]).unwrap();
        assert_eq!(
            Source::resolve(&args, &config),
            Source::Url("https://host/b.csv".to_string())
        );

        let args = Args::try_parse_from(["casestat"]).unwrap();
        assert_eq!(
            Source::resolve(&args, &config),
            Source::Url(config.dataset.url.clone())
        );
    }

    #[test]
    fn test_exit_code_for_pipeline_errors() {
        let err: anyhow::Error = PipelineError::data("dataset is empty").into();
        assert_eq!(exit_code_for(&err), 2);

        let err = anyhow::Error::from(PipelineError::config("buckets overlap"))
            .context("Failed to aggregate a.csv");
        assert_eq!(exit_code_for(&err), 2);

        let err = anyhow::anyhow!("connection refused");
        assert_eq!(exit_code_for(&err), 1);
    }

    #[test]
    fn test_analyse_file_writes_report() {
        let dir = TempDir::new().unwrap();
        let csv_path = dir.path().join("victims.csv");
        fs::write(
            &csv_path,
            "Age,fractionalDeathYear\n45,1990.2\n55,1991.4\n65,1993.6\n,1994.0\n75,1995.1\n",
        )
        .unwrap();

        let file = ScannedFile {
            path: csv_path,
            relative: "victims.csv".to_string(),
            size: 0,
        };
        let config = Config::default();
        let pipeline = config.analysis.build_pipeline().unwrap();
        let out_dir = dir.path().join("out");

        let path = analyse_file(&file, &config, &pipeline, &out_dir, OutputFormat::Json).unwrap();
        assert_eq!(path, out_dir.join("victims.json"));

        let value: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(value["summary"]["total_records"], 4);
        assert_eq!(value["summary"]["dropped_records"], 1);
        assert_eq!(value["metadata"]["records_loaded"], 5);
    }

    #[test]
    fn test_analyse_file_reports_bad_data() {
        let dir = TempDir::new().unwrap();
        let csv_path = dir.path().join("broken.csv");
        fs::write(&csv_path, "Age,fractionalDeathYear\nold,1990.2\n").unwrap();

        let file = ScannedFile {
            path: csv_path,
            relative: "broken.csv".to_string(),
            size: 0,
        };
        let config = Config::default();
        let pipeline = config.analysis.build_pipeline().unwrap();

        let err = analyse_file(&file, &config, &pipeline, dir.path(), OutputFormat::Json)
            .unwrap_err();
        assert_eq!(exit_code_for(&err), 2);
    }
}
