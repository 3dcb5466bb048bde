//! Status format detection.

use crate::error::{Result, StatusError};
use crate::types::StatusFormat;

/// Number of leading bytes inspected; long enough for the client banner.
pub const PEEK_LEN: usize = 18;

const PREFIXES: [(&[u8], StatusFormat); 3] = [
    (b"TITLE,", StatusFormat::ServerV2),
    (b"TITLE\t", StatusFormat::ServerV3),
    (b"OpenVPN STATISTICS", StatusFormat::Client),
];

/// Classify a status blob by its leading bytes.
///
/// Only the first [`PEEK_LEN`] bytes are examined and nothing is consumed.
/// API JSON output is never detected here; callers select it explicitly.
pub fn detect_format(contents: &[u8]) -> Result<StatusFormat> {
    let head = &contents[..contents.len().min(PEEK_LEN)];

    PREFIXES
        .iter()
        .find(|(prefix, _)| head.starts_with(prefix))
        .map(|(_, format)| *format)
        .ok_or_else(|| StatusError::Format {
            prefix: String::from_utf8_lossy(head).into_owned(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detect_server_v2() {
        let blob = b"TITLE,OpenVPN 2.3.2 x86_64-pc-linux-gnu\nTIME,x,1\n";
        assert_eq!(detect_format(blob).unwrap(), StatusFormat::ServerV2);
    }

    #[test]
    fn test_detect_server_v3() {
        let blob = b"TITLE\tOpenVPN 2.3.2 x86_64-pc-linux-gnu\n";
        assert_eq!(detect_format(blob).unwrap(), StatusFormat::ServerV3);
    }

    #[test]
    fn test_detect_client() {
        let blob = b"OpenVPN STATISTICS\nUpdated,Thu Jun 18 08:12:15 2015\n";
        assert_eq!(detect_format(blob).unwrap(), StatusFormat::Client);
    }

    #[test]
    fn test_detect_exact_length_banner() {
        assert_eq!(
            detect_format(b"OpenVPN STATISTICS").unwrap(),
            StatusFormat::Client
        );
    }

    #[test]
    fn test_detect_ignores_content_past_peek() {
        let mut blob = b"TITLE,".to_vec();
        blob.extend(std::iter::repeat_n(0xffu8, 4096));
        assert_eq!(detect_format(&blob).unwrap(), StatusFormat::ServerV2);
    }

    #[test]
    fn test_detect_unknown_reports_prefix() {
        let err = detect_format(b"HELLO WORLD, this is not a status file").unwrap_err();
        match err {
            StatusError::Format { prefix } => {
                assert_eq!(prefix, "HELLO WORLD, this ");
                assert_eq!(prefix.len(), PEEK_LEN);
            }
            other => panic!("Expected Format error, got {:?}", other),
        }
    }

    #[test]
    fn test_detect_empty() {
        let err = detect_format(b"").unwrap_err();
        assert_eq!(err.kind(), "format");
    }

    #[test]
    fn test_detect_truncated_banner_is_not_client() {
        assert!(detect_format(b"OpenVPN STATS").is_err());
    }

    #[test]
    fn test_detect_json_is_rejected() {
        assert!(detect_format(br#"{"openvpn_0": {}}"#).is_err());
    }
}
