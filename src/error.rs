//! # Error Types
//!
//! Custom error types for FPV Downlink using `thiserror`.

use thiserror::Error;

/// Main error type for FPV Downlink
#[derive(Debug, Error)]
pub enum DownlinkError {
    /// Flight-controller serial port errors (always fatal: without the
    /// serial link this process has no purpose)
    #[error("Serial error: {0}")]
    Serial(String),

    /// UDP link errors on the ground-station sockets
    #[error("Link error: {0}")]
    Link(String),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(#[from] toml::de::Error),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for FPV Downlink
pub type Result<T> = std::result::Result<T, DownlinkError>;
