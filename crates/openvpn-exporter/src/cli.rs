//! Command-line flags.
//!
//! Flag names follow the historical exporter so existing service units keep
//! working. Each flag that is given overrides the matching YAML setting.

use crate::config::Config;
use crate::types::StatusType;
use clap::{ArgAction, Parser};
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "openvpn-exporter", version, about = "Prometheus exporter for OpenVPN status files")]
pub struct Cli {
    /// Path to a YAML configuration file
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Address to listen on for web interface and telemetry
    #[arg(long = "web.listen-address", value_name = "ADDR")]
    pub listen_address: Option<String>,

    /// Path under which to expose metrics
    #[arg(long = "web.telemetry-path", value_name = "PATH")]
    pub telemetry_path: Option<String>,

    /// Paths or glob patterns of OpenVPN status files, comma separated.
    /// Optionally prefixed with an instance name and a colon.
    #[arg(long = "openvpn.status_paths", value_name = "PATHS", value_delimiter = ',')]
    pub status_paths: Option<Vec<String>>,

    /// Export only the common name of clients and routes
    #[arg(
        long = "ignore.individuals",
        action = ArgAction::Set,
        num_args = 0..=1,
        default_missing_value = "true",
        value_name = "BOOL"
    )]
    pub ignore_individuals: Option<bool>,

    /// Read status files or call the Access Server API
    #[arg(long = "openvpn.status_type", value_enum, value_name = "TYPE")]
    pub status_type: Option<StatusType>,
}

impl Cli {
    /// Apply the given flags on top of `config`.
    pub fn apply(&self, config: &mut Config) {
        if let Some(address) = &self.listen_address {
            config.web.listen_address = address.clone();
        }
        if let Some(path) = &self.telemetry_path {
            config.web.telemetry_path = path.clone();
        }
        if let Some(paths) = &self.status_paths {
            config.openvpn.status_paths = paths
                .iter()
                .map(|p| p.trim())
                .filter(|p| !p.is_empty())
                .map(String::from)
                .collect();
        }
        if let Some(ignore) = self.ignore_individuals {
            config.openvpn.ignore_individuals = ignore;
        }
        if let Some(status_type) = self.status_type {
            config.openvpn.status_type = status_type;
        }
    }
}
