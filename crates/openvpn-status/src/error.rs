//! Decode errors.

use std::num::ParseFloatError;
use thiserror::Error;

/// A specialized Result type for status decoding.
pub type Result<T> = std::result::Result<T, StatusError>;

/// Error raised while decoding a status blob.
///
/// Every variant is terminal for the source being decoded.
#[derive(Debug, Error)]
pub enum StatusError {
    /// Leading bytes match none of the known status formats.
    #[error("unexpected file contents: {prefix:?}")]
    Format { prefix: String },

    /// A data record appeared before the HEADER announcing its columns.
    #[error("{directive} should be preceded by its HEADER")]
    Sequence { directive: String },

    /// Field count mismatch or malformed structured input.
    #[error("schema mismatch: {0}")]
    Schema(String),

    /// A value that must be numeric is not.
    #[error("invalid numeric value {value:?} in {field}: {source}")]
    Parse {
        field: String,
        value: String,
        #[source]
        source: ParseFloatError,
    },

    /// A timestamp could not be interpreted.
    #[error("invalid timestamp {value:?}: {reason}")]
    TimeParse { value: String, reason: String },

    /// The first field of a line is not a known keyword.
    #[error("unsupported key: {0:?}")]
    UnsupportedKey(String),

    /// The blob could not be scanned into lines.
    #[error("failed to read status: {0}")]
    Io(#[from] std::io::Error),
}

impl StatusError {
    pub(crate) fn schema(msg: impl Into<String>) -> Self {
        StatusError::Schema(msg.into())
    }

    /// Short machine-readable name, used as a metric label.
    pub fn kind(&self) -> &'static str {
        match self {
            StatusError::Format { .. } => "format",
            StatusError::Sequence { .. } => "sequence",
            StatusError::Schema(_) => "schema",
            StatusError::Parse { .. } => "parse",
            StatusError::TimeParse { .. } => "time_parse",
            StatusError::UnsupportedKey(_) => "unsupported_key",
            StatusError::Io(_) => "io",
        }
    }
}

/// Parse a float the way the status formats write them.
pub(crate) fn parse_value(field: &str, value: &str) -> Result<f64> {
    value.parse::<f64>().map_err(|source| StatusError::Parse {
        field: field.to_string(),
        value: value.to_string(),
        source,
    })
}
