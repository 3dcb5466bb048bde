//! Parser for OpenVPN status output.
//!
//! Converts the text written by OpenVPN's `--status` option, or the JSON
//! printed by Access Server's `sacli VPNStatus`, into labeled numeric
//! observations ready to be exported as metrics.
//!
//! Supported inputs:
//! - client statistics (`OpenVPN STATISTICS`)
//! - server status, format version 2 (comma separated)
//! - server status, format version 3 (tab separated)
//! - Access Server `VPNStatus` JSON
//!
//! # Example
//!
//! ```
//! use openvpn_status::{DirectiveTable, Observation, collect_status};
//!
//! let blob = b"TITLE,OpenVPN 2.4.4\nTIME,Thu Jun 18 08:12:15 2015,1434608535\nEND\n";
//! let directives = DirectiveTable::new(false);
//! let mut observations: Vec<Observation> = Vec::new();
//!
//! collect_status("server.status", blob, &directives, &mut observations).unwrap();
//! assert_eq!(observations[0].name(), "openvpn_status_update_time_seconds");
//! assert_eq!(observations[1].name(), "openvpn_server_connected_clients");
//! ```

pub mod api;
pub mod client;
pub mod detect;
pub mod directives;
pub mod error;
pub mod server;
pub mod types;

pub use detect::detect_format;
pub use directives::{DirectiveTable, HeaderDirective, RecordColumns};
pub use error::{Result, StatusError};
pub use types::{
    MetricDesc, Observation, ObservationSink, StatusFormat, StatusSource, ValueKind,
};

use tracing::debug;

/// Detect the format of a text status blob and decode it into `sink`.
///
/// JSON from `sacli VPNStatus` is rejected with a format error here; use
/// [`collect_api_status`] for it.
///
/// Returns the detected format. The first decode error is returned as-is;
/// observations pushed before it stay in the sink.
pub fn collect_status<S>(
    source: &str,
    contents: &[u8],
    directives: &DirectiveTable,
    sink: &mut S,
) -> Result<StatusFormat>
where
    S: ObservationSink + ?Sized,
{
    let format = detect_format(contents)?;
    debug!(source, %format, bytes = contents.len(), "Decoding status");

    match format {
        StatusFormat::ServerV2 | StatusFormat::ServerV3 => {
            server::decode_server_status(source, contents, format.separator(), directives, sink)?;
        }
        StatusFormat::Client => client::decode_client_status(source, contents, sink)?,
    }

    Ok(format)
}

/// Decode Access Server `VPNStatus` JSON into `sink`.
pub fn collect_api_status<S>(
    source: &str,
    contents: &[u8],
    directives: &DirectiveTable,
    sink: &mut S,
) -> Result<()>
where
    S: ObservationSink + ?Sized,
{
    debug!(source, bytes = contents.len(), "Decoding API status");
    api::decode_api_status(source, contents, directives, sink)
}

impl StatusSource {
    /// Decode this source as a text status file.
    pub fn collect<S>(&self, directives: &DirectiveTable, sink: &mut S) -> Result<StatusFormat>
    where
        S: ObservationSink + ?Sized,
    {
        collect_status(&self.name, &self.contents, directives, sink)
    }

    /// Decode this source as `VPNStatus` JSON.
    pub fn collect_api<S>(&self, directives: &DirectiveTable, sink: &mut S) -> Result<()>
    where
        S: ObservationSink + ?Sized,
    {
        collect_api_status(&self.name, &self.contents, directives, sink)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dispatch_client() {
        let directives = DirectiveTable::default();
        let mut sink: Vec<Observation> = Vec::new();
        let format = collect_status(
            "client",
            b"OpenVPN STATISTICS\nAuth read bytes,42\nEND\n",
            &directives,
            &mut sink,
        )
        .unwrap();
        assert_eq!(format, StatusFormat::Client);
        assert_eq!(sink.len(), 1);
        assert_eq!(sink[0].value, 42.0);
    }

    #[test]
    fn test_dispatch_format_error_emits_nothing() {
        let directives = DirectiveTable::default();
        let mut sink: Vec<Observation> = Vec::new();
        let err = collect_status("junk", b"<html>", &directives, &mut sink).unwrap_err();
        assert_eq!(err.kind(), "format");
        assert!(sink.is_empty());
    }

    #[test]
    fn test_api_json_needs_api_entry_point() {
        let directives = DirectiveTable::default();
        let blob = br#"{"openvpn_0": {"title": "OpenVPN 2.4"}}"#;

        let mut sink: Vec<Observation> = Vec::new();
        let err = collect_status("api", blob, &directives, &mut sink).unwrap_err();
        assert_eq!(err.kind(), "format");
        assert!(sink.is_empty());

        collect_api_status("api", blob, &directives, &mut sink).unwrap();
        assert_eq!(sink[0].name(), "openvpn_server_build_info");
    }

    #[test]
    fn test_status_source_collect() {
        let directives = DirectiveTable::default();
        let source = StatusSource::new("v3", "TITLE\tOpenVPN\nEND\n");
        let mut sink: Vec<Observation> = Vec::new();
        assert_eq!(
            source.collect(&directives, &mut sink).unwrap(),
            StatusFormat::ServerV3
        );
        assert_eq!(sink.len(), 1);
        assert_eq!(sink[0].label_values(), vec!["v3"]);
    }

    #[test]
    fn test_status_source_collect_api() {
        let directives = DirectiveTable::default();
        let source = StatusSource::new("api", r#"{"openvpn_0": {"title": "OpenVPN 2.4"}}"#);
        let mut sink: Vec<Observation> = Vec::new();
        source.collect_api(&directives, &mut sink).unwrap();
        assert_eq!(sink.len(), 2);
    }
}
