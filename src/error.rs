//! Error types for the aggregation pipeline.
//!
//! The pipeline has no I/O of its own, so every failure is either bad
//! input data or a bad bucket/field configuration. Both are surfaced to
//! the caller immediately.

use thiserror::Error;

/// Result type alias for pipeline operations.
pub type Result<T> = std::result::Result<T, PipelineError>;

/// Pipeline error kinds.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PipelineError {
    /// Malformed or insufficient input: empty dataset, unparseable field,
    /// degenerate statistic.
    #[error("data error: {0}")]
    Data(String),

    /// Invalid configuration: overlapping or non-covering bucket ranges,
    /// bad labels, unknown field names.
    #[error("config error: {0}")]
    Config(String),
}

impl PipelineError {
    /// Shorthand for a [`PipelineError::Data`].
    pub fn data(message: impl Into<String>) -> Self {
        PipelineError::Data(message.into())
    }

    /// Shorthand for a [`PipelineError::Config`].
    pub fn config(message: impl Into<String>) -> Self {
        PipelineError::Config(message.into())
    }

    /// The message without the kind prefix.
    pub fn message(&self) -> &str {
        match self {
            PipelineError::Data(m) | PipelineError::Config(m) => m,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = PipelineError::data("dataset is empty after cleaning");
        assert_eq!(err.to_string(), "data error: dataset is empty after cleaning");

        let err = PipelineError::config("buckets overlap");
        assert_eq!(err.to_string(), "config error: buckets overlap");
        assert_eq!(err.message(), "buckets overlap");
    }
}
