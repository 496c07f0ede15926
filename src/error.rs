//! Error types for Tandem.

use thiserror::Error;

/// Main error type for Tandem operations.
#[derive(Error, Debug)]
pub enum TandemError {
    /// The constraint list cannot form a limiter
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// Configuration file could not be parsed
    #[error("Configuration error: {0}")]
    Config(String),

    /// A cancellable acquisition was abandoned before admission
    #[error("Acquisition cancelled")]
    Cancelled,

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for Tandem operations.
pub type Result<T> = std::result::Result<T, TandemError>;
