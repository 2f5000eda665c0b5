//! Error types for HRE

use thiserror::Error;

/// Core error type for HRE database operations
#[derive(Error, Debug)]
pub enum HreError {
    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Query error: {0}")]
    Query(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Not found: {0}")]
    NotFound(String),
}

/// Result type alias for HRE operations
pub type Result<T> = std::result::Result<T, HreError>;
