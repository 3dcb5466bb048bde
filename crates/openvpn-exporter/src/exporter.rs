//! Exporter wiring: sources, scraper, metrics and the HTTP endpoint.

use crate::http_server::{AppState, MetricsServer};
use crate::metrics::MetricsRegistry;
use crate::scraper::Scraper;
use crate::source::Sources;
use crate::types::ExporterConfig;
use openvpn_status::DirectiveTable;
use std::future::Future;
use std::sync::Arc;
use tracing::{info, warn};

/// OpenVPN exporter
pub struct OpenVpnExporter {
    config: ExporterConfig,
}

impl OpenVpnExporter {
    /// Create a new exporter
    pub fn new(config: ExporterConfig) -> Self {
        Self { config }
    }

    /// Build the scraper for this configuration.
    pub fn scraper(&self, metrics: Arc<MetricsRegistry>) -> common::Result<Scraper> {
        let sources = Sources::from_config(&self.config)?;
        let directives = Arc::new(DirectiveTable::new(self.config.ignore_individuals));

        Ok(Scraper::new(sources, directives, self.config.scrape_timeout).with_metrics(metrics))
    }

    /// Serve until Ctrl-C.
    pub async fn run(self) -> Result<(), Box<dyn std::error::Error>> {
        self.run_until(shutdown_signal()).await
    }

    /// Serve until `shutdown` resolves.
    pub async fn run_until<F>(self, shutdown: F) -> Result<(), Box<dyn std::error::Error>>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        info!(
            status_type = %self.config.status_type,
            status_paths = ?self.config.status_paths,
            ignore_individuals = self.config.ignore_individuals,
            scrape_timeout = ?self.config.scrape_timeout,
            "Starting OpenVPN exporter"
        );

        let metrics = Arc::new(MetricsRegistry::new());
        let scraper = self.scraper(metrics)?;
        let state = Arc::new(AppState {
            scraper,
            telemetry_path: self.config.telemetry_path.clone(),
        });

        MetricsServer::new(state, self.config.listen_address)
            .run(shutdown)
            .await?;

        info!("OpenVPN exporter stopped");
        Ok(())
    }
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("Received Ctrl-C, shutting down"),
        Err(e) => {
            // Without a signal handler the server runs until killed
            warn!(error = %e, "Failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    }
}
