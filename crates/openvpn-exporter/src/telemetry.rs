//! Logging setup and optional OpenTelemetry tracing
//!
//! Spans (one per scrape, one per HTTP request) are exported over OTLP when
//! telemetry is enabled. Logs always go to stdout.

use crate::config::{LogFormat, LoggingSettings, OtlpProtocol, TelemetrySettings};
use opentelemetry::{KeyValue, trace::TracerProvider as _};
use opentelemetry_otlp::WithExportConfig;
use opentelemetry_sdk::{
    Resource, runtime,
    trace::{RandomIdGenerator, Sampler, TracerProvider},
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// OpenTelemetry tracer guard
///
/// When dropped, flushes all pending spans and shuts down the tracer
pub struct TelemetryGuard;

impl Drop for TelemetryGuard {
    fn drop(&mut self) {
        opentelemetry::global::shutdown_tracer_provider();
    }
}

/// Build a tracer provider exporting to the configured OTLP collector.
pub fn init_tracer_provider(
    settings: &TelemetrySettings,
) -> Result<TracerProvider, Box<dyn std::error::Error>> {
    tracing::info!(
        service_name = %settings.service_name,
        otlp_endpoint = %settings.otlp_endpoint,
        protocol = ?settings.protocol,
        "Initializing OpenTelemetry tracing"
    );

    let exporter = match settings.protocol {
        OtlpProtocol::Grpc => opentelemetry_otlp::SpanExporter::builder()
            .with_tonic()
            .with_endpoint(settings.otlp_endpoint.clone())
            .build()?,
        OtlpProtocol::Http => opentelemetry_otlp::SpanExporter::builder()
            .with_http()
            .with_endpoint(settings.otlp_endpoint.clone())
            .build()?,
    };

    let resource = Resource::new(vec![
        KeyValue::new("service.name", settings.service_name.clone()),
        KeyValue::new("service.version", env!("CARGO_PKG_VERSION").to_string()),
    ]);

    Ok(TracerProvider::builder()
        .with_batch_exporter(exporter, runtime::Tokio)
        .with_config(
            opentelemetry_sdk::trace::Config::default()
                .with_sampler(Sampler::AlwaysOn)
                .with_id_generator(RandomIdGenerator::default())
                .with_resource(resource),
        )
        .build())
}

/// Install the global subscriber: env filter, text or JSON output, and the
/// OpenTelemetry layer when enabled.
///
/// Must run inside a Tokio runtime when telemetry is enabled. Keep the
/// returned guard alive for the lifetime of the process.
pub async fn setup_tracing(
    logging: &LoggingSettings,
    telemetry: &TelemetrySettings,
) -> Result<Option<TelemetryGuard>, Box<dyn std::error::Error>> {
    let json = logging.format == LogFormat::Json;

    if !telemetry.enabled {
        common::logging::init(&logging.level, json)?;
        tracing::info!("Tracing initialized without OpenTelemetry");
        return Ok(None);
    }

    let provider = init_tracer_provider(telemetry)?;
    let tracer = provider.tracer("openvpn-exporter");
    opentelemetry::global::set_tracer_provider(provider);

    tracing_subscriber::registry()
        .with(common::logging::env_filter(&logging.level))
        .with(common::logging::fmt_layer(json))
        .with(tracing_opentelemetry::layer().with_tracer(tracer))
        .try_init()?;

    tracing::info!("Tracing initialized with OpenTelemetry integration");
    Ok(Some(TelemetryGuard))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_telemetry_disabled() {
        let result = setup_tracing(&LoggingSettings::default(), &TelemetrySettings::default()).await;
        assert!(result.unwrap().is_none());
    }
}
