//! Configuration loading and validation for the exporter

use crate::source::StatusPath;
use crate::types::{ExporterConfig, StatusType};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use validator::{Validate, ValidationError};

/// Configuration error types
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Configuration file not found: {}", .0.display())]
    FileNotFound(PathBuf),

    #[error("Failed to read configuration file: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Failed to parse YAML: {0}")]
    ParseError(#[from] serde_yaml::Error),

    #[error("Invalid configuration: {0}")]
    ValidationError(#[from] validator::ValidationErrors),
}

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub web: WebSettings,

    #[serde(default)]
    pub openvpn: OpenVpnSettings,

    #[serde(default)]
    pub scrape: ScrapeSettings,

    #[serde(default)]
    pub logging: LoggingSettings,

    #[serde(default)]
    pub telemetry: TelemetrySettings,
}

impl Validate for Config {
    fn validate(&self) -> Result<(), validator::ValidationErrors> {
        self.web.validate()?;
        self.openvpn.validate()?;
        self.scrape.validate()?;
        self.logging.validate()?;
        self.telemetry.validate()?;
        Ok(())
    }
}

/// HTTP listener settings
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct WebSettings {
    #[validate(custom = "validate_listen_address")]
    pub listen_address: String,

    #[validate(custom = "validate_telemetry_path")]
    pub telemetry_path: String,
}

/// Status source settings
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(default)]
#[validate(schema(function = "validate_openvpn_settings"))]
pub struct OpenVpnSettings {
    pub status_type: StatusType,

    pub status_paths: Vec<String>,

    pub ignore_individuals: bool,

    pub api_command: Vec<String>,

    #[validate(length(min = 1))]
    pub api_source_label: String,
}

/// Scrape settings
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct ScrapeSettings {
    #[serde(with = "humantime_serde")]
    #[validate(custom = "validate_scrape_timeout")]
    pub timeout: Duration,
}

/// Log output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Text,
    Json,
}

/// Logging settings
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct LoggingSettings {
    #[validate(custom = "validate_log_level")]
    pub level: String,
    pub format: LogFormat,
}

/// OTLP transport
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OtlpProtocol {
    Grpc,
    Http,
}

/// OpenTelemetry tracing settings
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct TelemetrySettings {
    pub enabled: bool,

    #[validate(length(min = 1))]
    pub service_name: String,

    #[validate(custom = "validate_otlp_endpoint")]
    pub otlp_endpoint: String,

    pub protocol: OtlpProtocol,
}

// Default implementations

impl Default for WebSettings {
    fn default() -> Self {
        Self {
            listen_address: "0.0.0.0:9176".to_string(),
            telemetry_path: "/metrics".to_string(),
        }
    }
}

impl Default for OpenVpnSettings {
    fn default() -> Self {
        let defaults = ExporterConfig::default();
        Self {
            status_type: defaults.status_type,
            status_paths: defaults.status_paths,
            ignore_individuals: defaults.ignore_individuals,
            api_command: defaults.api_command,
            api_source_label: defaults.api_source_label,
        }
    }
}

impl Default for ScrapeSettings {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(10),
        }
    }
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Text,
        }
    }
}

impl Default for TelemetrySettings {
    fn default() -> Self {
        Self {
            enabled: false,
            service_name: "openvpn-exporter".to_string(),
            otlp_endpoint: "http://localhost:4317".to_string(),
            protocol: OtlpProtocol::Grpc,
        }
    }
}

// Custom validators

fn validate_listen_address(address: &str) -> Result<(), ValidationError> {
    address
        .parse::<SocketAddr>()
        .map(|_| ())
        .map_err(|_| ValidationError::new("listen_address_invalid"))
}

fn validate_telemetry_path(path: &str) -> Result<(), ValidationError> {
    if !path.starts_with('/') {
        return Err(ValidationError::new("telemetry_path_not_absolute"));
    }
    // "/" serves the landing page
    if path == "/" {
        return Err(ValidationError::new("telemetry_path_is_root"));
    }
    Ok(())
}

fn validate_openvpn_settings(settings: &OpenVpnSettings) -> Result<(), ValidationError> {
    match settings.status_type {
        StatusType::File => {
            if settings.status_paths.is_empty() {
                return Err(ValidationError::new("status_paths_empty"));
            }
            for entry in &settings.status_paths {
                if entry.trim().is_empty() {
                    return Err(ValidationError::new("status_path_empty"));
                }
                let Some(status_path) = StatusPath::parse(entry) else {
                    return Err(ValidationError::new("status_path_malformed"));
                };
                if glob::Pattern::new(&status_path.path).is_err() {
                    return Err(ValidationError::new("status_path_invalid_pattern"));
                }
            }
        }
        StatusType::Api => {
            if settings.api_command.first().is_none_or(|program| program.trim().is_empty()) {
                return Err(ValidationError::new("api_command_empty"));
            }
        }
    }
    Ok(())
}

fn validate_scrape_timeout(timeout: &Duration) -> Result<(), ValidationError> {
    let millis = timeout.as_millis();
    if millis < 100 || millis > 300_000 {
        return Err(ValidationError::new("scrape_timeout_out_of_range"));
    }
    Ok(())
}

fn validate_log_level(level: &str) -> Result<(), ValidationError> {
    match level.to_ascii_lowercase().as_str() {
        "trace" | "debug" | "info" | "warn" | "error" => Ok(()),
        _ => Err(ValidationError::new("log_level_unknown")),
    }
}

fn validate_otlp_endpoint(endpoint: &str) -> Result<(), ValidationError> {
    if endpoint.starts_with("http://") || endpoint.starts_with("https://") {
        Ok(())
    } else {
        Err(ValidationError::new("otlp_endpoint_invalid_scheme"))
    }
}

// Configuration loading implementation

impl Config {
    /// Load and validate configuration.
    ///
    /// An explicit path must exist. Without one, the standard locations are
    /// searched and defaults apply if none holds a file.
    pub fn load(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        let config = Self::load_unvalidated(explicit)?;
        config.validate()?;
        Ok(config)
    }

    /// Like [`Config::load`], but leaves validation to the caller so that
    /// command-line overrides can be applied first.
    pub fn load_unvalidated(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        if let Some(path) = explicit {
            if !path.is_file() {
                return Err(ConfigError::FileNotFound(path.to_path_buf()));
            }
            return Self::from_file(path);
        }

        match Self::find_config_file() {
            Some(path) => {
                tracing::info!("Loading configuration from: {}", path.display());
                Self::from_file(&path)
            }
            None => {
                tracing::info!("No configuration file found, using defaults");
                Ok(Self::default())
            }
        }
    }

    /// Load configuration from a specific file
    pub fn load_from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let config = Self::from_file(path)?;
        config.validate()?;
        Ok(config)
    }

    fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path.as_ref())?;
        Ok(serde_yaml::from_str(&contents)?)
    }

    /// Find configuration file in standard locations
    fn find_config_file() -> Option<PathBuf> {
        Self::search_paths()
            .into_iter()
            .find(|p: &PathBuf| p.exists() && p.is_file())
    }

    fn search_paths() -> Vec<PathBuf> {
        let mut paths = vec![PathBuf::from("/etc/openvpn-exporter/openvpn-exporter.yaml")];

        if let Some(home_path) = Self::home_config_path() {
            paths.push(home_path);
        }

        paths.push(PathBuf::from("./openvpn-exporter.yaml"));
        paths
    }

    /// Get home directory config path
    fn home_config_path() -> Option<PathBuf> {
        dirs::home_dir().map(|home| home.join(".config/openvpn-exporter/openvpn-exporter.yaml"))
    }

    /// Convert to the runtime exporter configuration.
    ///
    /// Call on a validated config; an unparsable listen address falls back to
    /// the default.
    pub fn to_exporter_config(&self) -> ExporterConfig {
        let defaults = ExporterConfig::default();
        ExporterConfig {
            listen_address: self
                .web
                .listen_address
                .parse()
                .unwrap_or(defaults.listen_address),
            telemetry_path: self.web.telemetry_path.clone(),
            status_type: self.openvpn.status_type,
            status_paths: self.openvpn.status_paths.clone(),
            ignore_individuals: self.openvpn.ignore_individuals,
            api_command: self.openvpn.api_command.clone(),
            api_source_label: self.openvpn.api_source_label.clone(),
            scrape_timeout: self.scrape.timeout,
        }
    }
}
