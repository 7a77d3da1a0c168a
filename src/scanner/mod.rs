//! Dataset file discovery for batch runs.
//!
//! Walks a directory tree for CSV files, respecting the configured
//! extensions, exclude names and file limit.

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use walkdir::{DirEntry, WalkDir};

/// Configuration for dataset scanning.
#[derive(Debug, Clone)]
pub struct ScanConfig {
    /// File extensions to include, without the dot (e.g. ["csv"])
    pub extensions: Vec<String>,
    /// Directory or file names to skip (e.g. ["archive", "tmp"])
    pub excludes: Vec<String>,
    /// Maximum number of files to return
    pub max_files: Option<usize>,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            extensions: vec!["csv".to_string()],
            excludes: Vec::new(),
            max_files: None,
        }
    }
}

impl From<&crate::config::ScannerConfig> for ScanConfig {
    fn from(config: &crate::config::ScannerConfig) -> Self {
        Self {
            extensions: config.extensions.clone(),
            excludes: config.excludes.clone(),
            max_files: Some(config.max_files),
        }
    }
}

/// A dataset file found by the scanner.
#[derive(Debug, Clone, PartialEq)]
pub struct ScannedFile {
    /// Full path to the file
    pub path: PathBuf,
    /// Path relative to the scan root, for display
    pub relative: String,
    /// File size in bytes
    pub size: u64,
}

impl ScannedFile {
    /// File name without extension, used to name the file's report.
    pub fn stem(&self) -> String {
        self.path
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_else(|| self.relative.replace(['/', '\\'], "_"))
    }
}

/// Scanner for discovering dataset files.
pub struct DatasetScanner {
    config: ScanConfig,
    root: PathBuf,
}

impl DatasetScanner {
    /// Create a new scanner rooted at `root`.
    pub fn new(root: PathBuf, config: ScanConfig) -> Self {
        Self { config, root }
    }

    /// Scan for all matching files, sorted by path.
    pub fn scan(&self) -> Result<Vec<ScannedFile>> {
        if !self.root.is_dir() {
            anyhow::bail!("Not a directory: {}", self.root.display());
        }

        let mut files = Vec::new();
        let walker = WalkDir::new(&self.root)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|entry| entry.depth() == 0 || !self.is_excluded(entry));

        for entry in walker {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    warn!("Skipping unreadable entry: {}", e);
                    continue;
                }
            };

            if !entry.file_type().is_file() || !self.matches(entry.path()) {
                continue;
            }

            let metadata = entry
                .metadata()
                .with_context(|| format!("Failed to stat {}", entry.path().display()))?;
            let relative = entry
                .path()
                .strip_prefix(&self.root)
                .unwrap_or(entry.path())
                .to_string_lossy()
                .to_string();

            debug!("Found dataset {} ({} bytes)", relative, metadata.len());
            files.push(ScannedFile {
                path: entry.path().to_path_buf(),
                relative,
                size: metadata.len(),
            });

            if let Some(max) = self.config.max_files {
                if files.len() >= max {
                    warn!("Reached max_files limit ({}), stopping scan", max);
                    break;
                }
            }
        }

        Ok(files)
    }

    /// Check if a file has one of the configured extensions.
    pub fn matches(&self, path: &Path) -> bool {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("")
            .to_lowercase();
        self.config.extensions.iter().any(|e| e.to_lowercase() == ext)
    }

    /// Hidden entries and explicit excludes.
    fn is_excluded(&self, entry: &DirEntry) -> bool {
        let name = entry.file_name().to_string_lossy();
        name.starts_with('.') || self.config.excludes.iter().any(|pattern| name == pattern.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn setup() -> TempDir {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("b.csv"), "Age\n1\n").unwrap();
        fs::write(dir.path().join("a.CSV"), "Age\n1\n").unwrap();
        fs::write(dir.path().join("notes.txt"), "hello").unwrap();
        fs::create_dir(dir.path().join("nested")).unwrap();
        fs::write(dir.path().join("nested").join("c.csv"), "Age\n1\n").unwrap();
        fs::create_dir(dir.path().join("archive")).unwrap();
        fs::write(dir.path().join("archive").join("old.csv"), "Age\n1\n").unwrap();
        fs::create_dir(dir.path().join(".cache")).unwrap();
        fs::write(dir.path().join(".cache").join("hidden.csv"), "Age\n1\n").unwrap();
        dir
    }

    #[test]
    fn test_scan_finds_csv_files() {
        let dir = setup();
        let config = ScanConfig {
            excludes: vec!["archive".to_string()],
            ..ScanConfig::default()
        };

        let files = DatasetScanner::new(dir.path().to_path_buf(), config)
            .scan()
            .unwrap();
        let names: Vec<_> = files.iter().map(|f| f.stem()).collect();

        assert_eq!(names, vec!["a", "b", "c"]);
        assert!(files.iter().all(|f| f.size > 0));
    }

    #[test]
    fn test_scan_respects_max_files() {
        let dir = setup();
        let config = ScanConfig {
            max_files: Some(1),
            ..ScanConfig::default()
        };

        let files = DatasetScanner::new(dir.path().to_path_buf(), config)
            .scan()
            .unwrap();
        assert_eq!(files.len(), 1);
    }

    #[test]
    fn test_scan_rejects_missing_root() {
        let scanner = DatasetScanner::new(PathBuf::from("/nonexistent/dir"), ScanConfig::default());
        assert!(scanner.scan().is_err());
    }
}
