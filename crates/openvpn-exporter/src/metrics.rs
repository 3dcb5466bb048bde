//! Prometheus rendering for scraped observations and exporter self-metrics.

use openvpn_status::{MetricDesc, Observation, ValueKind};
use prometheus_client::collector::Collector;
use prometheus_client::encoding::text::encode;
use prometheus_client::encoding::{DescriptorEncoder, EncodeLabelSet, EncodeMetric};
use prometheus_client::metrics::MetricType;
use prometheus_client::metrics::counter::{ConstCounter, Counter};
use prometheus_client::metrics::family::Family;
use prometheus_client::metrics::gauge::{ConstGauge, Gauge};
use prometheus_client::metrics::histogram::{Histogram, exponential_buckets};
use prometheus_client::registry::Registry;
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::time::Duration;
use tracing::debug;

/// Content type of the rendered exposition.
pub const CONTENT_TYPE: &str = "application/openmetrics-text; version=1.0.0; charset=utf-8";

/// Labels for scrape error metrics
#[derive(Clone, Debug, Hash, PartialEq, Eq, EncodeLabelSet)]
pub struct ErrorLabels {
    /// Error kind (io, timeout, command, format, parse, ...)
    pub kind: String,
}

/// Metrics describing the exporter itself
#[derive(Debug)]
pub struct MetricsRegistry {
    /// Scrapes served
    scrapes_total: Counter,
    /// Failed source reads or decodes, by kind
    scrape_errors_total: Family<ErrorLabels, Counter>,
    /// Wall time of a full scrape
    scrape_duration_seconds: Histogram,
    /// Sources in the latest scrape
    sources: Gauge,
}

impl Default for MetricsRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl MetricsRegistry {
    pub fn new() -> Self {
        Self {
            scrapes_total: Counter::default(),
            scrape_errors_total: Family::default(),
            // 1ms to ~16s
            scrape_duration_seconds: Histogram::new(exponential_buckets(0.001, 2.0, 15)),
            sources: Gauge::default(),
        }
    }

    /// Register handles to the self-metrics in `registry`.
    ///
    /// The handles share state with `self`, so a registry built per request
    /// sees current values.
    pub fn register(&self, registry: &mut Registry) {
        registry.register(
            "openvpn_exporter_scrapes",
            "Total scrapes performed",
            self.scrapes_total.clone(),
        );
        registry.register(
            "openvpn_exporter_scrape_errors",
            "Total failed status sources by error kind",
            self.scrape_errors_total.clone(),
        );
        registry.register(
            "openvpn_exporter_scrape_duration_seconds",
            "Duration of a full scrape in seconds",
            self.scrape_duration_seconds.clone(),
        );
        registry.register(
            "openvpn_exporter_sources",
            "Status sources read in the latest scrape",
            self.sources.clone(),
        );
    }

    /// Record a finished scrape
    pub fn record_scrape(&self, sources: usize, duration: Duration) {
        self.scrapes_total.inc();
        self.sources.set(sources as i64);
        self.scrape_duration_seconds.observe(duration.as_secs_f64());
    }

    /// Record a failed source by error kind
    pub fn record_error(&self, kind: &str) {
        self.scrape_errors_total
            .get_or_create(&ErrorLabels {
                kind: kind.to_string(),
            })
            .inc();
    }

    #[cfg(test)]
    pub(crate) fn scrapes(&self) -> u64 {
        self.scrapes_total.get()
    }

    #[cfg(test)]
    pub(crate) fn errors(&self, kind: &str) -> u64 {
        self.scrape_errors_total
            .get_or_create(&ErrorLabels {
                kind: kind.to_string(),
            })
            .get()
    }
}

/// Observations sharing a metric name.
#[derive(Debug)]
struct ObservationFamily {
    desc: &'static MetricDesc,
    samples: Vec<Observation>,
}

/// Exposes one scrape's observations through the registry.
///
/// Samples are grouped by metric name in order of first appearance. A label
/// set repeated within a family is exported once, first value wins.
#[derive(Debug)]
pub struct ObservationCollector {
    families: Vec<ObservationFamily>,
}

impl ObservationCollector {
    pub fn new(observations: Vec<Observation>) -> Self {
        let mut families: Vec<ObservationFamily> = Vec::new();
        let mut index: HashMap<&'static str, usize> = HashMap::new();
        let mut seen: HashSet<(&'static str, Vec<String>)> = HashSet::new();

        for obs in observations {
            let key = (obs.name(), obs.label_values().into_iter().map(String::from).collect());
            if !seen.insert(key) {
                debug!(metric = obs.name(), labels = ?obs.labels, "Dropping repeated series");
                continue;
            }

            let slot = *index.entry(obs.name()).or_insert_with(|| {
                families.push(ObservationFamily {
                    desc: obs.desc,
                    samples: Vec::new(),
                });
                families.len() - 1
            });
            families[slot].samples.push(obs);
        }

        Self { families }
    }
}

impl Collector for ObservationCollector {
    fn encode(&self, mut encoder: DescriptorEncoder) -> Result<(), fmt::Error> {
        for family in &self.families {
            let desc = family.desc;
            let (name, metric_type) = match desc.kind {
                // the encoder appends the suffix itself
                ValueKind::Counter => (
                    desc.name.strip_suffix("_total").unwrap_or(desc.name),
                    MetricType::Counter,
                ),
                ValueKind::Gauge => (desc.name, MetricType::Gauge),
            };

            let mut metric_encoder = encoder.encode_descriptor(name, desc.help, None, metric_type)?;
            for obs in &family.samples {
                let labels: Vec<(&str, &str)> = obs
                    .labels
                    .iter()
                    .map(|(key, value)| (*key, value.as_str()))
                    .collect();
                let sample_encoder = metric_encoder.encode_family(&labels)?;
                match desc.kind {
                    ValueKind::Counter => ConstCounter::new(obs.value).encode(sample_encoder)?,
                    ValueKind::Gauge => ConstGauge::new(obs.value).encode(sample_encoder)?,
                }
            }
        }
        Ok(())
    }
}

/// Render observations, plus self-metrics when given, as OpenMetrics text.
pub fn render(
    observations: Vec<Observation>,
    metrics: Option<&MetricsRegistry>,
) -> Result<String, fmt::Error> {
    let mut registry = Registry::default();
    registry.register_collector(Box::new(ObservationCollector::new(observations)));
    if let Some(metrics) = metrics {
        metrics.register(&mut registry);
    }

    let mut buffer = String::new();
    encode(&mut buffer, &registry)?;
    Ok(buffer)
}
