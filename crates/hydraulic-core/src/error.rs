//! Error types for the valve condition pipeline.

use thiserror::Error;

/// Errors raised by preprocessing, inference, persistence and data loading.
#[derive(Error, Debug)]
pub enum Error {
    /// Input matrix width does not match what the consumer was fitted on
    #[error("shape mismatch for {target}: expected {expected} columns, got {actual}")]
    ShapeMismatch {
        target: String,
        expected: usize,
        actual: usize,
    },

    /// Row counts (or fitted dimensions) of two pipeline parts disagree
    #[error("alignment error: {0}")]
    Alignment(String),

    /// Classifier emitted an index outside the condition alphabet
    #[error("unknown class index {0}")]
    UnknownClassIndex(usize),

    /// Percentage that is not one of the known valve conditions
    #[error("unknown condition label {0}")]
    UnknownConditionLabel(u8),

    /// Persisted artifact is unreadable or structurally incomplete
    #[error("corrupt artifact: {0}")]
    CorruptArtifact(String),

    /// Fitted parameters handed to an estimator are inconsistent
    #[error("invalid parameters: {0}")]
    InvalidParameters(String),

    /// Sensor data file content error
    #[error("data error: {0}")]
    Data(String),

    /// CSV reader error
    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),

    /// IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias using the pipeline Error.
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    pub(crate) fn shape(target: impl Into<String>, expected: usize, actual: usize) -> Self {
        Error::ShapeMismatch {
            target: target.into(),
            expected,
            actual,
        }
    }
}
