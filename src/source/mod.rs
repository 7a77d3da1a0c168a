//! Dataset sources: local CSV files and HTTP downloads.

pub mod fetch;
pub mod loader;

pub use fetch::{fetch_csv, FetchOptions};
pub use loader::{load_path, parse_csv_str};
