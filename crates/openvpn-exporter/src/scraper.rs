//! Concurrent scrape of all configured status sources.

use crate::metrics::MetricsRegistry;
use crate::source::{Sources, StatusReader};
use crate::types::StatusType;
use futures::future::join_all;
use openvpn_status::{
    DirectiveTable, Observation, StatusError, collect_api_status, collect_status,
};
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::{Instrument, debug, info_span, warn};

/// Why a single source failed.
#[derive(Debug, Error)]
pub enum ScrapeError {
    #[error("read failed: {0}")]
    Read(#[from] common::Error),

    #[error("decode failed: {0}")]
    Decode(#[from] StatusError),
}

impl ScrapeError {
    /// Error kind label
    pub fn kind(&self) -> &'static str {
        match self {
            ScrapeError::Read(e) => e.kind(),
            ScrapeError::Decode(e) => e.kind(),
        }
    }
}

/// Outcome of scraping one source.
#[derive(Debug)]
pub struct SourceReport {
    pub source: String,
    pub instance: Option<String>,
    /// Everything decoded before any failure, followed by `openvpn_up`
    pub observations: Vec<Observation>,
    pub error: Option<ScrapeError>,
}

impl SourceReport {
    pub fn is_up(&self) -> bool {
        self.error.is_none()
    }
}

/// Reads and decodes every source on demand.
pub struct Scraper {
    sources: Sources,
    directives: Arc<DirectiveTable>,
    timeout: Duration,
    metrics: Option<Arc<MetricsRegistry>>,
}

impl Scraper {
    pub fn new(sources: Sources, directives: Arc<DirectiveTable>, timeout: Duration) -> Self {
        Self {
            sources,
            directives,
            timeout,
            metrics: None,
        }
    }

    /// Record scrape counts, errors and durations in `metrics`.
    pub fn with_metrics(mut self, metrics: Arc<MetricsRegistry>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub fn metrics(&self) -> Option<&Arc<MetricsRegistry>> {
        self.metrics.as_ref()
    }

    /// Scrape all sources concurrently.
    ///
    /// Reports come back in source order. A failing source never affects the
    /// others.
    pub async fn scrape_sources(&self) -> Vec<SourceReport> {
        let readers = self.sources.readers();
        let span = info_span!("scrape", sources = readers.len());

        async {
            let started = Instant::now();
            let reports = join_all(readers.into_iter().map(|reader| self.scrape_one(reader))).await;

            let failed = reports.iter().filter(|r| !r.is_up()).count();
            debug!(
                sources = reports.len(),
                failed,
                elapsed_ms = started.elapsed().as_millis() as u64,
                "Scrape finished"
            );
            if let Some(metrics) = &self.metrics {
                metrics.record_scrape(reports.len(), started.elapsed());
            }
            reports
        }
        .instrument(span)
        .await
    }

    /// Scrape all sources and flatten the observations.
    pub async fn scrape(&self) -> Vec<Observation> {
        self.scrape_sources()
            .await
            .into_iter()
            .flat_map(|report| report.observations)
            .collect()
    }

    async fn scrape_one(&self, reader: Arc<dyn StatusReader>) -> SourceReport {
        let source = reader.source();
        let instance = reader.instance();
        let mut observations = Vec::new();

        let result = match tokio::time::timeout(self.timeout, reader.read()).await {
            Err(_) => Err(ScrapeError::Read(common::Error::Timeout(self.timeout))),
            Ok(Err(e)) => Err(ScrapeError::Read(e)),
            Ok(Ok(contents)) => {
                decode(reader.status_type(), &source, &contents, &self.directives, &mut observations)
            }
        };

        let error = result.err();
        if let Some(e) = &error {
            warn!(
                status_path = %source,
                instance_name = ?instance,
                error = %e,
                kind = e.kind(),
                "Failed to scrape status"
            );
            if let Some(metrics) = &self.metrics {
                metrics.record_error(e.kind());
            }
        }
        observations.push(Observation::up(&source, error.is_none()));
        if let Some(name) = &instance {
            for observation in &mut observations {
                observation.tag_instance(name);
            }
        }

        SourceReport {
            source,
            instance,
            observations,
            error,
        }
    }
}

fn decode(
    status_type: StatusType,
    source: &str,
    contents: &[u8],
    directives: &DirectiveTable,
    sink: &mut Vec<Observation>,
) -> Result<(), ScrapeError> {
    match status_type {
        StatusType::File => {
            collect_status(source, contents, directives, sink)?;
        }
        StatusType::Api => collect_api_status(source, contents, directives, sink)?,
    }
    Ok(())
}
