//! Error types for the adaptive-thresholds library.

use thiserror::Error;

/// Main error type for the library.
#[derive(Error, Debug)]
pub enum AtoError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV parsing error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Schema error: {0}")]
    Schema(String),

    #[error("Insufficient null set: need at least {required} low-significance features, found {available}")]
    InsufficientNullSet { required: usize, available: usize },

    #[error("Mixture model did not converge: {0}")]
    MixtureConvergence(String),

    #[error("No cutoff estimator succeeded: {0}")]
    NoCutoffAvailable(String),

    #[error("Invalid analysis goal '{0}' (expected discovery, balanced, or validation)")]
    InvalidGoal(String),

    #[error("Standard error unavailable: {0}")]
    StandardErrorUnavailable(String),

    #[error("Empty data: {0}")]
    EmptyData(String),

    #[error("Numerical error: {0}")]
    Numerical(String),
}

/// Result type alias for library operations.
pub type Result<T> = std::result::Result<T, AtoError>;
