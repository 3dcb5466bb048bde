//! Header directives for multi-column server records.
//!
//! A directive describes how one record type (`CLIENT_LIST`,
//! `ROUTING_TABLE`) maps onto metrics: which columns become labels and which
//! columns become values. The table is built once and shared read-only by
//! every decode.

use crate::error::{Result, parse_value};
use crate::types::{Label, MetricDesc, Observation, ObservationSink, ValueKind};
use std::collections::{HashMap, HashSet};
use tracing::info;

pub const CLIENT_LIST: &str = "CLIENT_LIST";
pub const ROUTING_TABLE: &str = "ROUTING_TABLE";

pub const COMMON_NAME: &str = "Common Name";
pub const REAL_ADDRESS: &str = "Real Address";
pub const VIRTUAL_ADDRESS: &str = "Virtual Address";
pub const CONNECTED_SINCE: &str = "Connected Since (time_t)";
pub const USERNAME: &str = "Username";
pub const BYTES_RECEIVED: &str = "Bytes Received";
pub const BYTES_SENT: &str = "Bytes Sent";
pub const LAST_REF: &str = "Last Ref (time_t)";

pub static CLIENT_RECEIVED_BYTES: MetricDesc = MetricDesc {
    name: "openvpn_server_client_received_bytes_total",
    help: "Amount of data received over a connection on the VPN server, in bytes.",
    kind: ValueKind::Counter,
};

pub static CLIENT_SENT_BYTES: MetricDesc = MetricDesc {
    name: "openvpn_server_client_sent_bytes_total",
    help: "Amount of data sent over a connection on the VPN server, in bytes.",
    kind: ValueKind::Counter,
};

pub static ROUTE_LAST_REFERENCE: MetricDesc = MetricDesc {
    name: "openvpn_server_route_last_reference_time_seconds",
    help: "Time at which a route was last referenced, in seconds.",
    kind: ValueKind::Gauge,
};

/// A source column exported as a label.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabelColumn {
    pub column: &'static str,
    pub label: &'static str,
}

/// A source column exported as a numeric observation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetricField {
    pub column: &'static str,
    pub desc: &'static MetricDesc,
}

/// Label and metric layout for one record type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeaderDirective {
    pub record_type: &'static str,
    pub labels: Vec<LabelColumn>,
    pub metrics: Vec<MetricField>,
}

/// Immutable registry of known record types.
#[derive(Debug, Clone)]
pub struct DirectiveTable {
    directives: HashMap<&'static str, HeaderDirective>,
    ignore_individuals: bool,
}

const fn label(column: &'static str, label: &'static str) -> LabelColumn {
    LabelColumn { column, label }
}

impl DirectiveTable {
    /// Build the table.
    ///
    /// With `ignore_individuals` set, client and route metrics carry only the
    /// common name, which keeps cardinality bounded on busy servers.
    pub fn new(ignore_individuals: bool) -> Self {
        let (client_labels, route_labels) = if ignore_individuals {
            (
                vec![label(COMMON_NAME, "common_name")],
                vec![label(COMMON_NAME, "common_name")],
            )
        } else {
            (
                vec![
                    label(COMMON_NAME, "common_name"),
                    label(CONNECTED_SINCE, "connection_time"),
                    label(REAL_ADDRESS, "real_address"),
                    label(VIRTUAL_ADDRESS, "virtual_address"),
                    label(USERNAME, "username"),
                ],
                vec![
                    label(COMMON_NAME, "common_name"),
                    label(REAL_ADDRESS, "real_address"),
                    label(VIRTUAL_ADDRESS, "virtual_address"),
                ],
            )
        };

        let directives = [
            HeaderDirective {
                record_type: CLIENT_LIST,
                labels: client_labels,
                metrics: vec![
                    MetricField {
                        column: BYTES_RECEIVED,
                        desc: &CLIENT_RECEIVED_BYTES,
                    },
                    MetricField {
                        column: BYTES_SENT,
                        desc: &CLIENT_SENT_BYTES,
                    },
                ],
            },
            HeaderDirective {
                record_type: ROUTING_TABLE,
                labels: route_labels,
                metrics: vec![MetricField {
                    column: LAST_REF,
                    desc: &ROUTE_LAST_REFERENCE,
                }],
            },
        ];

        Self {
            directives: directives
                .into_iter()
                .map(|directive| (directive.record_type, directive))
                .collect(),
            ignore_individuals,
        }
    }

    /// Directive for a record type, if the type is known.
    pub fn get(&self, record_type: &str) -> Option<&HeaderDirective> {
        self.directives.get(record_type)
    }

    pub fn ignore_individuals(&self) -> bool {
        self.ignore_individuals
    }
}

impl Default for DirectiveTable {
    fn default() -> Self {
        Self::new(false)
    }
}

/// Column lookup for one record, independent of how columns are located.
pub trait RecordColumns {
    /// Value of the named column, or `None` when the record lacks it.
    fn column(&self, name: &str) -> Option<&str>;
}

/// A text-format record resolved against its announced HEADER.
pub struct HeaderRecord<'a> {
    names: &'a [String],
    values: &'a [&'a str],
}

impl<'a> HeaderRecord<'a> {
    /// `names` and `values` must have equal length.
    pub fn new(names: &'a [String], values: &'a [&'a str]) -> Self {
        debug_assert_eq!(names.len(), values.len());
        Self { names, values }
    }
}

impl RecordColumns for HeaderRecord<'_> {
    fn column(&self, name: &str) -> Option<&str> {
        // A repeated header name resolves to its last occurrence.
        self.names
            .iter()
            .rposition(|candidate| candidate == name)
            .map(|index| self.values[index])
    }
}

/// Observations already emitted in one decode pass, keyed by metric and
/// label values.
#[derive(Debug, Default)]
pub struct DedupeSet {
    seen: HashSet<(&'static str, Vec<String>)>,
}

impl DedupeSet {
    /// Returns `true` the first time a key is seen.
    fn insert(&mut self, metric: &'static str, labels: &[Label]) -> bool {
        let values = labels.iter().map(|(_, value)| value.clone()).collect();
        self.seen.insert((metric, values))
    }
}

/// Emit every metric a directive defines for one record.
///
/// `base_labels` precede the directive's label columns. Metric columns the
/// record lacks are skipped. When `dedupe` is given, an observation whose
/// metric and label values were already emitted is skipped and logged.
pub fn emit_record<R, S>(
    directive: &HeaderDirective,
    base_labels: &[Label],
    record: &R,
    mut dedupe: Option<&mut DedupeSet>,
    sink: &mut S,
) -> Result<()>
where
    R: RecordColumns + ?Sized,
    S: ObservationSink + ?Sized,
{
    let mut labels = base_labels.to_vec();
    labels.extend(directive.labels.iter().map(|column| {
        (
            column.label,
            record.column(column.column).unwrap_or_default().to_string(),
        )
    }));

    for metric in &directive.metrics {
        let Some(raw) = record.column(metric.column) else {
            continue;
        };

        if let Some(seen) = dedupe.as_deref_mut()
            && !seen.insert(metric.desc.name, &labels)
        {
            info!(
                metric = metric.desc.name,
                labels = ?labels,
                "Metric entry with same labels, skipping duplicate"
            );
            continue;
        }

        let value = parse_value(metric.column, raw)?;
        sink.observe(Observation::new(metric.desc, value, labels.clone()));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::SOURCE_LABEL;

    struct MapRecord(HashMap<&'static str, &'static str>);

    impl RecordColumns for MapRecord {
        fn column(&self, name: &str) -> Option<&str> {
            self.0.get(name).copied()
        }
    }

    fn base() -> Vec<Label> {
        vec![(SOURCE_LABEL, "server.status".to_string())]
    }

    #[test]
    fn test_full_identity_labels() {
        let table = DirectiveTable::new(false);
        let client = table.get(CLIENT_LIST).unwrap();
        let names: Vec<_> = client.labels.iter().map(|l| l.label).collect();
        assert_eq!(
            names,
            vec![
                "common_name",
                "connection_time",
                "real_address",
                "virtual_address",
                "username"
            ]
        );

        let route = table.get(ROUTING_TABLE).unwrap();
        assert_eq!(route.labels.len(), 3);
        assert_eq!(route.metrics[0].desc.name, ROUTE_LAST_REFERENCE.name);
        assert!(!table.ignore_individuals());
    }

    #[test]
    fn test_common_name_only_labels() {
        let table = DirectiveTable::new(true);
        for record_type in [CLIENT_LIST, ROUTING_TABLE] {
            let directive = table.get(record_type).unwrap();
            assert_eq!(directive.labels, vec![label(COMMON_NAME, "common_name")]);
        }
        assert!(table.ignore_individuals());
    }

    #[test]
    fn test_unknown_record_type() {
        let table = DirectiveTable::default();
        assert!(table.get("GLOBAL_STATS").is_none());
        assert!(table.get("client_list").is_none());
    }

    #[test]
    fn test_header_record_last_duplicate_wins() {
        let names = vec!["A".to_string(), "B".to_string(), "A".to_string()];
        let values = ["1", "2", "3"];
        let record = HeaderRecord::new(&names, &values);
        assert_eq!(record.column("A"), Some("3"));
        assert_eq!(record.column("B"), Some("2"));
        assert_eq!(record.column("C"), None);
    }

    #[test]
    fn test_emit_record_missing_label_defaults_empty() {
        let table = DirectiveTable::new(false);
        let record = MapRecord(HashMap::from([
            (COMMON_NAME, "alice"),
            (BYTES_RECEIVED, "10"),
            (BYTES_SENT, "20"),
        ]));
        let mut sink: Vec<Observation> = Vec::new();
        emit_record(table.get(CLIENT_LIST).unwrap(), &base(), &record, None, &mut sink).unwrap();

        assert_eq!(sink.len(), 2);
        assert_eq!(
            sink[0].label_values(),
            vec!["server.status", "alice", "", "", "", ""]
        );
        assert_eq!(sink[0].name(), CLIENT_RECEIVED_BYTES.name);
        assert_eq!(sink[0].value, 10.0);
        assert_eq!(sink[1].name(), CLIENT_SENT_BYTES.name);
        assert_eq!(sink[1].value, 20.0);
    }

    #[test]
    fn test_emit_record_skips_absent_metric_column() {
        let table = DirectiveTable::new(true);
        let record = MapRecord(HashMap::from([(COMMON_NAME, "bob"), (BYTES_SENT, "5")]));
        let mut sink: Vec<Observation> = Vec::new();
        emit_record(table.get(CLIENT_LIST).unwrap(), &base(), &record, None, &mut sink).unwrap();

        assert_eq!(sink.len(), 1);
        assert_eq!(sink[0].name(), CLIENT_SENT_BYTES.name);
    }

    #[test]
    fn test_emit_record_dedupe() {
        let table = DirectiveTable::new(true);
        let directive = table.get(CLIENT_LIST).unwrap();
        let record = MapRecord(HashMap::from([
            (COMMON_NAME, "carol"),
            (BYTES_RECEIVED, "1"),
            (BYTES_SENT, "2"),
        ]));
        let mut seen = DedupeSet::default();
        let mut sink: Vec<Observation> = Vec::new();

        emit_record(directive, &base(), &record, Some(&mut seen), &mut sink).unwrap();
        emit_record(directive, &base(), &record, Some(&mut seen), &mut sink).unwrap();
        assert_eq!(sink.len(), 2);

        // Without a dedupe set every record is emitted.
        emit_record(directive, &base(), &record, None, &mut sink).unwrap();
        assert_eq!(sink.len(), 4);
    }

    #[test]
    fn test_emit_record_parse_error() {
        let table = DirectiveTable::new(true);
        let record = MapRecord(HashMap::from([
            (COMMON_NAME, "dave"),
            (BYTES_RECEIVED, "many"),
        ]));
        let mut sink: Vec<Observation> = Vec::new();
        let err = emit_record(table.get(CLIENT_LIST).unwrap(), &base(), &record, None, &mut sink)
            .unwrap_err();
        assert_eq!(err.kind(), "parse");
        assert!(sink.is_empty());
    }
}
