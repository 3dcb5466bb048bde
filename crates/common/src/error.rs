//! Common error types for the OpenVPN exporter components.

use std::fmt;
use std::time::Duration;

/// A specialized Result type for exporter operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised while acquiring or serving status data.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Command error: {0}")]
    Command(String),

    #[error("Timed out after {0:?}")]
    Timeout(Duration),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl Error {
    /// Create a new command error.
    pub fn command(msg: impl fmt::Display) -> Self {
        Error::Command(msg.to_string())
    }

    /// Create a new configuration error.
    pub fn config(msg: impl fmt::Display) -> Self {
        Error::Config(msg.to_string())
    }

    /// Short machine-readable name, used as a metric label.
    pub fn kind(&self) -> &'static str {
        match self {
            Error::Io(_) => "io",
            Error::Command(_) => "command",
            Error::Timeout(_) => "timeout",
            Error::Config(_) => "config",
        }
    }
}
