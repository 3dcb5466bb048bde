//! Decoder for OpenVPN Access Server `sacli VPNStatus` JSON.
//!
//! The document is an object keyed by instance id. Record arrays carry no
//! header, so columns are located through fixed position tables.

use crate::directives::{
    BYTES_RECEIVED, BYTES_SENT, CLIENT_LIST, COMMON_NAME, CONNECTED_SINCE, DirectiveTable,
    HeaderDirective, LAST_REF, REAL_ADDRESS, ROUTING_TABLE, RecordColumns, USERNAME,
    VIRTUAL_ADDRESS, emit_record,
};
use crate::error::{Result, StatusError, parse_value};
use crate::types::{
    INSTANCE_LABEL, Label, Observation, ObservationSink, SERVER_BUILD_INFO,
    SERVER_CONNECTED_CLIENTS, SOURCE_LABEL, STATUS_UPDATE_TIME,
};
use serde_json::Value;
use tracing::debug;

type Positions = &'static [(&'static str, usize)];

const CLIENT_LIST_POSITIONS: Positions = &[
    (COMMON_NAME, 0),
    (REAL_ADDRESS, 1),
    (VIRTUAL_ADDRESS, 2),
    (BYTES_RECEIVED, 4),
    (BYTES_SENT, 5),
    (CONNECTED_SINCE, 7),
    (USERNAME, 8),
];

const ROUTING_TABLE_POSITIONS: Positions = &[
    (VIRTUAL_ADDRESS, 0),
    (COMMON_NAME, 1),
    (REAL_ADDRESS, 2),
    (LAST_REF, 4),
];

/// Position table for a record category, keyed by the text-format name.
pub fn positions(record_type: &str) -> Option<Positions> {
    match record_type {
        CLIENT_LIST => Some(CLIENT_LIST_POSITIONS),
        ROUTING_TABLE => Some(ROUTING_TABLE_POSITIONS),
        _ => None,
    }
}

/// A JSON row with the columns a directive needs already located.
#[derive(Debug)]
pub struct PositionalRecord<'a> {
    columns: Vec<(&'static str, &'a str)>,
}

impl<'a> PositionalRecord<'a> {
    /// Resolve every label and metric column of `directive` in `row`.
    ///
    /// Fails when a mapped position is missing or not a string.
    pub fn resolve(directive: &HeaderDirective, row: &'a [Value]) -> Result<Self> {
        let table = positions(directive.record_type).unwrap_or_default();
        let wanted = directive
            .labels
            .iter()
            .map(|label| label.column)
            .chain(directive.metrics.iter().map(|metric| metric.column));

        let mut columns = Vec::new();
        for column in wanted {
            let Some(&(_, index)) = table.iter().find(|(name, _)| *name == column) else {
                continue;
            };
            let value = row
                .get(index)
                .ok_or_else(|| {
                    StatusError::schema(format!(
                        "{} row has {} fields, {:?} expected at index {}",
                        directive.record_type,
                        row.len(),
                        column,
                        index
                    ))
                })?
                .as_str()
                .ok_or_else(|| {
                    StatusError::schema(format!(
                        "{} field {} ({:?}) is not a string",
                        directive.record_type, index, column
                    ))
                })?;
            columns.push((column, value));
        }

        Ok(Self { columns })
    }
}

impl RecordColumns for PositionalRecord<'_> {
    fn column(&self, name: &str) -> Option<&str> {
        self.columns
            .iter()
            .find(|(column, _)| *column == name)
            .map(|(_, value)| *value)
    }
}

/// Decode a complete `VPNStatus` document.
///
/// Instances are visited in key order. Unknown categories are ignored.
pub fn decode_api_status<S>(
    source: &str,
    contents: &[u8],
    directives: &DirectiveTable,
    sink: &mut S,
) -> Result<()>
where
    S: ObservationSink + ?Sized,
{
    let document: Value = serde_json::from_slice(contents)
        .map_err(|e| StatusError::schema(format!("invalid JSON: {}", e)))?;
    let instances = document
        .as_object()
        .ok_or_else(|| StatusError::schema("document must be an object keyed by instance id"))?;

    let source_labels: Vec<Label> = vec![(SOURCE_LABEL, source.to_string())];
    let mut connected_clients: u64 = 0;

    for (instance_id, data) in instances {
        let categories = data.as_object().ok_or_else(|| {
            StatusError::schema(format!("instance {:?} must be an object", instance_id))
        })?;
        let instance_labels = || {
            vec![
                (SOURCE_LABEL, source.to_string()),
                (INSTANCE_LABEL, instance_id.clone()),
            ]
        };

        for (category, value) in categories {
            match category.as_str() {
                "title" => {
                    let title = value.as_str().ok_or_else(|| {
                        StatusError::schema(format!("{}: title must be a string", instance_id))
                    })?;
                    let mut labels = instance_labels();
                    labels.push(("title", title.to_string()));
                    sink.observe(Observation::new(&SERVER_BUILD_INFO, 1.0, labels));
                }
                "time" => {
                    let updated = value
                        .as_array()
                        .and_then(|time| time.get(1))
                        .and_then(Value::as_str)
                        .ok_or_else(|| {
                            StatusError::schema(format!(
                                "{}: time must be an array with a string timestamp at index 1",
                                instance_id
                            ))
                        })?;
                    let updated = parse_value("time", updated)?;
                    sink.observe(Observation::new(
                        &STATUS_UPDATE_TIME,
                        updated,
                        instance_labels(),
                    ));
                }
                "client_list" | "routing_table" => {
                    let record_type = category.to_uppercase();
                    let Some(directive) = directives.get(&record_type) else {
                        continue;
                    };
                    let rows = value.as_array().ok_or_else(|| {
                        StatusError::schema(format!("{}: {} must be an array", instance_id, category))
                    })?;

                    for row in rows {
                        let row = row.as_array().ok_or_else(|| {
                            StatusError::schema(format!(
                                "{}: {} entries must be arrays",
                                instance_id, category
                            ))
                        })?;
                        if directive.record_type == CLIENT_LIST {
                            connected_clients += 1;
                        }
                        let record = PositionalRecord::resolve(directive, row)?;
                        emit_record(directive, &source_labels, &record, None, sink)?;
                    }
                }
                other => debug!(instance_id = %instance_id, category = other, "Ignoring category"),
            }
        }
    }

    sink.observe(Observation::new(
        &SERVER_CONNECTED_CLIENTS,
        connected_clients as f64,
        source_labels,
    ));
    Ok(())
}
