//! Observation types shared by all decoders.

use std::fmt;

/// Label attached to every observation, naming the status source.
pub const SOURCE_LABEL: &str = "status_path";

/// Label naming the Access Server instance in API mode.
pub const INSTANCE_LABEL: &str = "instance_id";

/// Label carrying the instance name of a `name:path` status file.
pub const INSTANCE_NAME_LABEL: &str = "instance_name";

/// Whether an observation is monotonic or a point-in-time value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueKind {
    Counter,
    Gauge,
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValueKind::Counter => write!(f, "counter"),
            ValueKind::Gauge => write!(f, "gauge"),
        }
    }
}

/// Static description of an exported metric.
#[derive(Debug, PartialEq, Eq, Hash)]
pub struct MetricDesc {
    /// Fully qualified metric name
    pub name: &'static str,
    /// Help text
    pub help: &'static str,
    /// Counter or gauge
    pub kind: ValueKind,
}

/// Whether scraping a source succeeded.
pub static UP: MetricDesc = MetricDesc {
    name: "openvpn_up",
    help: "Whether scraping OpenVPN's metrics was successful.",
    kind: ValueKind::Gauge,
};

pub static STATUS_UPDATE_TIME: MetricDesc = MetricDesc {
    name: "openvpn_status_update_time_seconds",
    help: "UNIX timestamp at which the OpenVPN statistics were updated.",
    kind: ValueKind::Gauge,
};

pub static SERVER_BUILD_INFO: MetricDesc = MetricDesc {
    name: "openvpn_server_build_info",
    help: "application and build information on the running OpenVPN system.",
    kind: ValueKind::Gauge,
};

pub static SERVER_CONNECTED_CLIENTS: MetricDesc = MetricDesc {
    name: "openvpn_server_connected_clients",
    help: "Number Of Connected Clients",
    kind: ValueKind::Gauge,
};

/// A single `(name, value)` label pair.
pub type Label = (&'static str, String);

/// One decoded numeric sample.
#[derive(Debug, Clone, PartialEq)]
pub struct Observation {
    pub desc: &'static MetricDesc,
    pub value: f64,
    /// Ordered labels; the first is always the source label.
    pub labels: Vec<Label>,
}

impl Observation {
    pub fn new(desc: &'static MetricDesc, value: f64, labels: Vec<Label>) -> Self {
        Self {
            desc,
            value,
            labels,
        }
    }

    /// Build the `openvpn_up` gauge for a source.
    pub fn up(source: &str, success: bool) -> Self {
        Self::new(
            &UP,
            if success { 1.0 } else { 0.0 },
            vec![(SOURCE_LABEL, source.to_string())],
        )
    }

    /// Insert an `instance_name` label right after the source label.
    pub fn tag_instance(&mut self, instance: &str) {
        let at = self.labels.len().min(1);
        self.labels
            .insert(at, (INSTANCE_NAME_LABEL, instance.to_string()));
    }

    pub fn name(&self) -> &'static str {
        self.desc.name
    }

    pub fn kind(&self) -> ValueKind {
        self.desc.kind
    }

    /// Look up a label value by name.
    pub fn label(&self, name: &str) -> Option<&str> {
        self.labels
            .iter()
            .find(|(key, _)| *key == name)
            .map(|(_, value)| value.as_str())
    }

    /// Label values in order.
    pub fn label_values(&self) -> Vec<&str> {
        self.labels.iter().map(|(_, value)| value.as_str()).collect()
    }
}

/// Receiver of decoded observations.
///
/// Decoders push each observation as soon as it is produced; nothing is
/// retracted if decoding later fails.
pub trait ObservationSink {
    fn observe(&mut self, observation: Observation);
}

impl ObservationSink for Vec<Observation> {
    fn observe(&mut self, observation: Observation) {
        self.push(observation);
    }
}

/// Detected layout of a text status blob.
///
/// Access Server JSON is not a detected format; it is decoded through
/// [`collect_api_status`](crate::collect_api_status).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusFormat {
    /// `--status-version 2`, comma separated
    ServerV2,
    /// `--status-version 3`, tab separated
    ServerV3,
    /// Client-side statistics
    Client,
}

impl StatusFormat {
    /// Field separator.
    pub fn separator(&self) -> char {
        match self {
            StatusFormat::ServerV2 | StatusFormat::Client => ',',
            StatusFormat::ServerV3 => '\t',
        }
    }
}

impl fmt::Display for StatusFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StatusFormat::ServerV2 => write!(f, "server-v2"),
            StatusFormat::ServerV3 => write!(f, "server-v3"),
            StatusFormat::Client => write!(f, "client"),
        }
    }
}

/// A status blob together with the identifier it is labeled with.
#[derive(Debug, Clone)]
pub struct StatusSource {
    pub name: String,
    pub contents: Vec<u8>,
}

impl StatusSource {
    pub fn new(name: impl Into<String>, contents: impl Into<Vec<u8>>) -> Self {
        Self {
            name: name.into(),
            contents: contents.into(),
        }
    }
}
