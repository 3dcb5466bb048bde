//! Decoder for client statistics files.

use crate::error::{Result, StatusError, parse_value};
use crate::types::{
    MetricDesc, Observation, ObservationSink, SOURCE_LABEL, STATUS_UPDATE_TIME, ValueKind,
};
use chrono::{Local, NaiveDateTime, TimeZone, Weekday};
use std::io::BufRead;

/// Layout of the `Updated` line after the weekday, e.g. `Jun 18 08:12:15 2015`.
const UPDATED_FORMAT: &str = "%b %e %H:%M:%S %Y";

macro_rules! client_counter {
    ($key:literal, $name:literal, $help:literal) => {
        (
            $key,
            MetricDesc {
                name: $name,
                help: $help,
                kind: ValueKind::Counter,
            },
        )
    };
}

/// Traffic counters keyed by their name in the status file.
pub static CLIENT_COUNTERS: [(&str, MetricDesc); 9] = [
    client_counter!(
        "TUN/TAP read bytes",
        "openvpn_client_tun_tap_read_bytes_total",
        "Total amount of TUN/TAP traffic read, in bytes."
    ),
    client_counter!(
        "TUN/TAP write bytes",
        "openvpn_client_tun_tap_write_bytes_total",
        "Total amount of TUN/TAP traffic written, in bytes."
    ),
    client_counter!(
        "TCP/UDP read bytes",
        "openvpn_client_tcp_udp_read_bytes_total",
        "Total amount of TCP/UDP traffic read, in bytes."
    ),
    client_counter!(
        "TCP/UDP write bytes",
        "openvpn_client_tcp_udp_write_bytes_total",
        "Total amount of TCP/UDP traffic written, in bytes."
    ),
    client_counter!(
        "Auth read bytes",
        "openvpn_client_auth_read_bytes_total",
        "Total amount of authentication traffic read, in bytes."
    ),
    client_counter!(
        "pre-compress bytes",
        "openvpn_client_pre_compress_bytes_total",
        "Total amount of data before compression, in bytes."
    ),
    client_counter!(
        "post-compress bytes",
        "openvpn_client_post_compress_bytes_total",
        "Total amount of data after compression, in bytes."
    ),
    client_counter!(
        "pre-decompress bytes",
        "openvpn_client_pre_decompress_bytes_total",
        "Total amount of data before decompression, in bytes."
    ),
    client_counter!(
        "post-decompress bytes",
        "openvpn_client_post_decompress_bytes_total",
        "Total amount of data after decompression, in bytes."
    ),
];

fn counter_desc(key: &str) -> Option<&'static MetricDesc> {
    CLIENT_COUNTERS
        .iter()
        .find(|(name, _)| *name == key)
        .map(|(_, desc)| desc)
}

/// Parse an `Updated` timestamp such as `Thu Jun 18 08:12:15 2015` in the
/// local timezone, returning Unix seconds.
///
/// The weekday must be a valid name but is not checked against the date.
pub fn parse_updated(value: &str) -> Result<i64> {
    let fail = |reason: String| StatusError::TimeParse {
        value: value.to_string(),
        reason,
    };

    let (weekday, rest) = value
        .trim()
        .split_once(' ')
        .ok_or_else(|| fail("missing date after weekday".to_string()))?;
    weekday
        .parse::<Weekday>()
        .map_err(|_| fail(format!("invalid weekday {:?}", weekday)))?;

    let naive = NaiveDateTime::parse_from_str(rest.trim_start(), UPDATED_FORMAT)
        .map_err(|e| fail(e.to_string()))?;

    Local
        .from_local_datetime(&naive)
        .earliest()
        .map(|local| local.timestamp())
        .ok_or_else(|| fail("time does not exist in the local timezone".to_string()))
}

/// Decode a complete client status blob.
pub fn decode_client_status<S>(source: &str, contents: &[u8], sink: &mut S) -> Result<()>
where
    S: ObservationSink + ?Sized,
{
    for line in contents.lines() {
        let line = line?;
        let fields: Vec<&str> = line.split(',').collect();

        match (fields[0], fields.len()) {
            ("END", 1) | ("OpenVPN STATISTICS", 1) => {}
            ("Updated", 2) => {
                let updated = parse_updated(fields[1])?;
                sink.observe(Observation::new(
                    &STATUS_UPDATE_TIME,
                    updated as f64,
                    vec![(SOURCE_LABEL, source.to_string())],
                ));
            }
            (key, n) => match counter_desc(key) {
                Some(desc) if n == 2 => {
                    let value = parse_value(key, fields[1])?;
                    sink.observe(Observation::new(
                        desc,
                        value,
                        vec![(SOURCE_LABEL, source.to_string())],
                    ));
                }
                _ => return Err(StatusError::UnsupportedKey(key.to_string())),
            },
        }
    }

    Ok(())
}
