//! HTTP server for the Prometheus metrics endpoint.

use crate::metrics::{CONTENT_TYPE, render};
use crate::scraper::Scraper;
use axum::{
    Router,
    extract::State,
    http::{StatusCode, header},
    response::{Html, IntoResponse, Response},
    routing::get,
};
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

/// Shared handler state
pub struct AppState {
    pub scraper: Scraper,
    pub telemetry_path: String,
}

/// Build the router serving metrics at `telemetry_path` and a landing page at `/`.
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route(&state.telemetry_path, get(metrics_handler))
        .route("/", get(landing_handler))
        .layer(ServiceBuilder::new().layer(TraceLayer::new_for_http()))
        .with_state(state)
}

/// HTTP server for metrics endpoint
pub struct MetricsServer {
    state: Arc<AppState>,
    listen_addr: SocketAddr,
}

impl MetricsServer {
    /// Create a new metrics server
    pub fn new(state: Arc<AppState>, listen_addr: SocketAddr) -> Self {
        Self { state, listen_addr }
    }

    /// Run the HTTP server until `shutdown` resolves
    pub async fn run<F>(self, shutdown: F) -> Result<(), Box<dyn std::error::Error>>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        info!(
            listen_addr = %self.listen_addr,
            telemetry_path = %self.state.telemetry_path,
            "Starting metrics HTTP server"
        );

        let app = router(self.state);

        let listener = TcpListener::bind(self.listen_addr).await?;
        info!(listen_addr = %listener.local_addr()?, "Metrics server listening");

        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown)
            .await?;

        info!("Metrics server stopped");
        Ok(())
    }
}

/// Handler for the metrics endpoint: scrape, then render
async fn metrics_handler(State(state): State<Arc<AppState>>) -> Response {
    let observations = state.scraper.scrape().await;

    let body = match render(observations, state.scraper.metrics().map(|m| m.as_ref())) {
        Ok(body) => body,
        Err(e) => {
            warn!(error = %e, "Failed to encode metrics");
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Failed to encode metrics: {}", e),
            )
                .into_response();
        }
    };

    (StatusCode::OK, [(header::CONTENT_TYPE, CONTENT_TYPE)], body).into_response()
}

/// Handler for `/`
async fn landing_handler(State(state): State<Arc<AppState>>) -> Html<String> {
    Html(format!(
        "<html>\n\
<head><title>OpenVPN Exporter</title></head>\n\
<body>\n\
<h1>OpenVPN Exporter</h1>\n\
<p><a href=\"{path}\">Metrics</a></p>\n\
</body>\n\
</html>\n",
        path = state.telemetry_path
    ))
}
