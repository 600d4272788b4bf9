//! Error types for the shared value models

use thiserror::Error;

/// Result type alias using the common Error
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Invalid parameter {name}: {reason}")]
    InvalidParameter { name: String, reason: String },

    #[error("Metric {0} not found")]
    MetricNotFound(String),

    #[error("Invalid metric operator: {0}")]
    InvalidOperator(String),

    #[error("Metric {metric} is not comparable: {reason}")]
    Incomparable { metric: String, reason: String },
}
