//! Logging utilities for the OpenVPN exporter components.

use tracing::Subscriber;
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::{EnvFilter, Layer, fmt, prelude::*};

/// Build the log filter.
///
/// RUST_LOG takes precedence; otherwise `default_level` applies.
pub fn env_filter(default_level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level))
}

/// Formatting layer, human-readable or JSON (useful for structured logging).
pub fn fmt_layer<S>(json: bool) -> Box<dyn Layer<S> + Send + Sync>
where
    S: Subscriber + for<'a> LookupSpan<'a>,
{
    if json {
        fmt::layer().json().boxed()
    } else {
        fmt::layer().boxed()
    }
}

/// Initialize tracing with only the formatting layer.
pub fn init(default_level: &str, json: bool) -> Result<(), tracing_subscriber::util::TryInitError> {
    tracing_subscriber::registry()
        .with(env_filter(default_level))
        .with(fmt_layer(json))
        .try_init()
}
