//! Integration tests for the metrics endpoint

use axum::body::{Body, to_bytes};
use axum::http::{Request, StatusCode, header};
use openvpn_exporter::metrics::CONTENT_TYPE;
use openvpn_exporter::{AppState, ExporterConfig, MetricsRegistry, OpenVpnExporter, router};
use std::path::Path;
use std::sync::Arc;
use tower::ServiceExt;

const SERVER_STATUS: &str = "\
TITLE,OpenVPN 2.3.2 x86_64-pc-linux-gnu
TIME,Thu Jun 18 08:12:15 2015,1434608535
HEADER,CLIENT_LIST,Common Name,Real Address,Virtual Address,Bytes Received,Bytes Sent,Connected Since,Connected Since (time_t),Username
CLIENT_LIST,test@localhost,1.2.3.4:1234,10.8.0.6,2883,3034,Thu Jun 18 08:12:09 2015,1434608529,test@localhost
HEADER,ROUTING_TABLE,Virtual Address,Common Name,Real Address,Last Ref,Last Ref (time_t)
ROUTING_TABLE,10.8.0.6,test@localhost,1.2.3.4:1234,Thu Jun 18 08:12:09 2015,1434608529
GLOBAL_STATS,Max bcast/mcast queue length,0
END
";

/// Helper to build the router over the given status paths
fn app(status_paths: Vec<String>, ignore_individuals: bool) -> axum::Router {
    let config = ExporterConfig {
        status_paths,
        ignore_individuals,
        ..ExporterConfig::default()
    };
    let scraper = OpenVpnExporter::new(config)
        .scraper(Arc::new(MetricsRegistry::new()))
        .unwrap();
    router(Arc::new(AppState {
        scraper,
        telemetry_path: "/metrics".to_string(),
    }))
}

async fn get(app: axum::Router, uri: &str) -> (StatusCode, Option<String>, String) {
    let response = app
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let content_type = response
        .headers()
        .get(header::CONTENT_TYPE)
        .map(|v| v.to_str().unwrap().to_string());
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, content_type, String::from_utf8(body.to_vec()).unwrap())
}

fn path_string(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}

#[tokio::test]
async fn test_metrics_endpoint_renders_server_status() {
    let dir = tempfile::tempdir().unwrap();
    let status = dir.path().join("server.status");
    std::fs::write(&status, SERVER_STATUS).unwrap();
    let status = path_string(&status);

    let (code, content_type, body) = get(app(vec![status.clone()], false), "/metrics").await;

    assert_eq!(code, StatusCode::OK);
    assert_eq!(content_type.as_deref(), Some(CONTENT_TYPE));
    assert!(body.contains(&format!("openvpn_up{{status_path=\"{}\"}} 1", status)));
    assert!(body.contains(&format!(
        "openvpn_server_client_received_bytes_total{{status_path=\"{}\",common_name=\"test@localhost\",connection_time=\"1434608529\",real_address=\"1.2.3.4:1234\",virtual_address=\"10.8.0.6\",username=\"test@localhost\"}} 2883",
        status
    )));
    assert!(body.contains(&format!(
        "openvpn_server_route_last_reference_time_seconds{{status_path=\"{}\",common_name=\"test@localhost\",real_address=\"1.2.3.4:1234\",virtual_address=\"10.8.0.6\"}} 1434608529",
        status
    )));
    assert!(body.contains(&format!(
        "openvpn_server_connected_clients{{status_path=\"{}\"}} 1",
        status
    )));
    assert!(body.contains("openvpn_exporter_scrapes_total 1"));
    assert!(!body.contains("_total_total"));
    assert!(body.ends_with("# EOF\n"));
}

#[tokio::test]
async fn test_missing_file_reports_down() {
    let dir = tempfile::tempdir().unwrap();
    let good = dir.path().join("good.status");
    std::fs::write(&good, "OpenVPN STATISTICS\nAuth read bytes,7\nEND\n").unwrap();
    let good = path_string(&good);
    let missing = path_string(&dir.path().join("missing.status"));

    let (code, _, body) = get(app(vec![missing.clone(), good.clone()], false), "/metrics").await;

    assert_eq!(code, StatusCode::OK);
    assert!(body.contains(&format!("openvpn_up{{status_path=\"{}\"}} 0", missing)));
    assert!(body.contains(&format!("openvpn_up{{status_path=\"{}\"}} 1", good)));
    assert!(body.contains(&format!(
        "openvpn_client_auth_read_bytes_total{{status_path=\"{}\"}} 7",
        good
    )));
    assert!(body.contains("openvpn_exporter_scrape_errors_total{kind=\"io\"} 1"));
}

#[tokio::test]
async fn test_glob_sources_and_ignore_individuals() {
    let dir = tempfile::tempdir().unwrap();
    for name in ["a.status", "b.status"] {
        std::fs::write(dir.path().join(name), SERVER_STATUS).unwrap();
    }
    let pattern = path_string(&dir.path().join("*.status"));

    let (_, _, body) = get(app(vec![pattern], true), "/metrics").await;

    assert_eq!(body.matches("openvpn_up{").count(), 2);
    assert!(body.contains("common_name=\"test@localhost\"} 2883"));
    assert!(!body.contains("real_address"));
    assert!(body.contains("openvpn_exporter_sources 2"));
}

#[tokio::test]
async fn test_landing_page() {
    let (code, content_type, body) = get(app(Vec::new(), false), "/").await;
    assert_eq!(code, StatusCode::OK);
    assert!(content_type.unwrap().starts_with("text/html"));
    assert!(body.contains("<a href=\"/metrics\">"));
}

#[tokio::test]
async fn test_unknown_path() {
    let (code, _, _) = get(app(Vec::new(), false), "/nope").await;
    assert_eq!(code, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_instance_prefixed_status_path() {
    let dir = tempfile::tempdir().unwrap();
    let status = dir.path().join("server2.status");
    std::fs::write(&status, SERVER_STATUS).unwrap();
    let path = path_string(&status);

    let (code, _, body) = get(app(vec![format!("SomeServer:{}", path)], false), "/metrics").await;

    assert_eq!(code, StatusCode::OK);
    let labels = format!("status_path=\"{}\",instance_name=\"SomeServer\"", path);
    assert!(body.contains(&format!("openvpn_up{{{}}} 1", labels)));
    assert!(body.contains(&format!("openvpn_server_connected_clients{{{}}} 1", labels)));
    assert!(body.contains(&format!(
        "openvpn_server_client_received_bytes_total{{{},common_name=\"test@localhost\"",
        labels
    )));
    assert!(!body.contains("SomeServer:"));
}
