//! Runtime types for the exporter.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::SocketAddr;
use std::time::Duration;

/// Where status data comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum StatusType {
    /// `--status` files written by OpenVPN
    File,
    /// `sacli VPNStatus` output from Access Server
    Api,
}

impl fmt::Display for StatusType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StatusType::File => write!(f, "file"),
            StatusType::Api => write!(f, "api"),
        }
    }
}

/// Exporter configuration, resolved from YAML and command-line flags.
#[derive(Debug, Clone)]
pub struct ExporterConfig {
    /// Address the HTTP server binds to
    pub listen_address: SocketAddr,

    /// Path serving the metrics
    pub telemetry_path: String,

    /// Source kind
    pub status_type: StatusType,

    /// Status file paths or glob patterns (file mode), each optionally
    /// written as `name:path`
    pub status_paths: Vec<String>,

    /// Export only the common name for clients and routes
    pub ignore_individuals: bool,

    /// Program and arguments producing `VPNStatus` JSON (api mode)
    pub api_command: Vec<String>,

    /// `status_path` label value used in api mode
    pub api_source_label: String,

    /// Upper bound for reading a single source
    pub scrape_timeout: Duration,
}

impl Default for ExporterConfig {
    fn default() -> Self {
        Self {
            listen_address: SocketAddr::from(([0, 0, 0, 0], 9176)),
            telemetry_path: "/metrics".to_string(),
            status_type: StatusType::File,
            status_paths: vec!["examples/client.status".to_string()],
            ignore_individuals: false,
            api_command: vec![
                "/usr/local/openvpn_as/scripts/sacli".to_string(),
                "VPNStatus".to_string(),
            ],
            api_source_label: "api".to_string(),
            scrape_timeout: Duration::from_secs(10),
        }
    }
}
