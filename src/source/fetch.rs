//! Dataset download over HTTP.
//!
//! A single GET with a timeout. The response body is returned as text for
//! the CSV loader; nothing is cached on disk.

use anyhow::{bail, Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;
use tracing::{debug, info};

/// Options for downloading a dataset.
#[derive(Debug, Clone)]
pub struct FetchOptions {
    /// Request timeout in seconds.
    pub timeout_seconds: u64,
    /// Whether to show a spinner while downloading.
    pub show_progress: bool,
}

impl Default for FetchOptions {
    fn default() -> Self {
        Self {
            timeout_seconds: 60,
            show_progress: true,
        }
    }
}

/// Reject anything that is not an HTTP(S) URL.
pub fn validate_url(url: &str) -> Result<()> {
    if url.starts_with("http://") || url.starts_with("https://") {
        Ok(())
    } else {
        bail!("Dataset URL must start with 'http://' or 'https://': {}", url)
    }
}

/// Download a CSV dataset and return its body.
pub async fn fetch_csv(url: &str, options: &FetchOptions) -> Result<String> {
    validate_url(url)?;
    info!("Downloading dataset: {}", url);

    let spinner = options.show_progress.then(|| {
        let pb = ProgressBar::new_spinner();
        pb.set_style(
            ProgressStyle::default_spinner()
                .template("{spinner:.green} [{elapsed_precise}] {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        pb.set_message(format!("Downloading {}", url));
        pb.enable_steady_tick(Duration::from_millis(100));
        pb
    });

    let result = download(url, options).await;

    if let Some(pb) = spinner {
        match &result {
            Ok(body) => pb.finish_with_message(format!("Downloaded {} bytes", body.len())),
            Err(_) => pb.abandon_with_message("Download failed"),
        }
    }

    result
}

async fn download(url: &str, options: &FetchOptions) -> Result<String> {
    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(options.timeout_seconds))
        .user_agent(concat!("casestat/", env!("CARGO_PKG_VERSION")))
        .build()
        .context("Failed to create HTTP client")?;

    let response = client.get(url).send().await.map_err(|e| {
        if e.is_timeout() {
            anyhow::anyhow!("Download timed out after {}s: {}", options.timeout_seconds, url)
        } else if e.is_connect() {
            anyhow::anyhow!("Cannot connect to {}", url)
        } else {
            anyhow::anyhow!("Failed to send request: {}", e)
        }
    })?;

    if !response.status().is_success() {
        let status = response.status();
        bail!("Dataset download failed with HTTP {}: {}", status, url);
    }

    let body = response
        .text()
        .await
        .context("Failed to read dataset response body")?;

    debug!("Downloaded {} bytes from {}", body.len(), url);
    Ok(body)
}
