//! OpenVPN Exporter
//!
//! Prometheus exporter for OpenVPN. Each request to the metrics path reads
//! the configured status files (or runs Access Server's `sacli VPNStatus`),
//! decodes them with [`openvpn_status`], and renders the result as
//! OpenMetrics text.
//!
//! # Components
//!
//! - **Sources**: status files, expanded from glob patterns on every scrape,
//!   or the Access Server command
//! - **Scraper**: reads and decodes all sources concurrently, each under a
//!   timeout, and records an `openvpn_up` gauge per source
//! - **Metrics**: renders observations and the exporter's own metrics
//! - **HTTP server**: serves the metrics path and a landing page

pub mod cli;
pub mod config;
pub mod exporter;
pub mod http_server;
pub mod metrics;
pub mod scraper;
pub mod source;
pub mod telemetry;
pub mod types;

pub use cli::Cli;
pub use config::{Config, ConfigError};
pub use exporter::OpenVpnExporter;
pub use http_server::{AppState, MetricsServer, router};
pub use metrics::{MetricsRegistry, render};
pub use scraper::{ScrapeError, Scraper, SourceReport};
pub use source::{CommandReader, FileReader, Sources, StatusPath, StatusReader};
pub use telemetry::{TelemetryGuard, init_tracer_provider, setup_tracing};
pub use types::{ExporterConfig, StatusType};
