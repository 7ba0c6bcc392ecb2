//! Error types for the sensor_forecast crate

use thiserror::Error;

/// Custom error types for the sensor_forecast crate
#[derive(Debug, Error)]
pub enum ForecastError {
    /// Model identifier not present in the registry
    #[error("Unknown model: '{0}'")]
    UnknownModel(String),

    /// Metric identifier not present in the registry
    #[error("Unknown metric: '{0}'")]
    UnknownMetric(String),

    /// Malformed input to a metric or model (mismatched or empty sequences)
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Operation requires a prior call to fit()
    #[error("{0} has not been fitted yet. Call fit() first.")]
    NotFitted(&'static str),

    /// Diagnostic error table requested before transform()
    #[error("The CrossValidator has not been transformed yet. Call transform() first.")]
    NotTransformed,

    /// Configuration rejected at construction time
    #[error("Unsupported configuration: {0}")]
    UnsupportedConfiguration(String),

    /// Error related to data validation or processing
    #[error("Data error: {0}")]
    DataError(String),

    /// Error from invalid parameters
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    /// Error from IO operations
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// Error from Polars operations
    #[error("Polars error: {0}")]
    PolarsError(String),
}

/// Result type with our custom error
pub type Result<T> = std::result::Result<T, ForecastError>;

impl From<polars::prelude::PolarsError> for ForecastError {
    fn from(err: polars::prelude::PolarsError) -> Self {
        ForecastError::PolarsError(err.to_string())
    }
}
