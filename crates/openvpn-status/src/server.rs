//! Decoder for server status files (`--status-version 2` and `3`).

use crate::directives::{
    CLIENT_LIST, DedupeSet, DirectiveTable, HeaderDirective, HeaderRecord, emit_record,
};
use crate::error::{Result, StatusError, parse_value};
use crate::types::{
    Label, Observation, ObservationSink, SERVER_CONNECTED_CLIENTS, SOURCE_LABEL,
    STATUS_UPDATE_TIME,
};
use std::collections::HashMap;
use std::io::BufRead;
use tracing::debug;

/// Line-by-line state for one server status decode.
///
/// Column headers and the dedupe set live only as long as the decoder, so
/// decoders for different sources never share state.
pub struct ServerDecoder<'a> {
    source: &'a str,
    separator: char,
    directives: &'a DirectiveTable,
    /// Record type -> column names from the latest HEADER line
    headers: HashMap<String, Vec<String>>,
    seen: DedupeSet,
    connected_clients: u64,
}

impl<'a> ServerDecoder<'a> {
    pub fn new(source: &'a str, separator: char, directives: &'a DirectiveTable) -> Self {
        Self {
            source,
            separator,
            directives,
            headers: HashMap::new(),
            seen: DedupeSet::default(),
            connected_clients: 0,
        }
    }

    /// Decode one line, pushing any resulting observations.
    pub fn decode_line<S>(&mut self, line: &str, sink: &mut S) -> Result<()>
    where
        S: ObservationSink + ?Sized,
    {
        let fields: Vec<&str> = line.split(self.separator).collect();
        let directives = self.directives;

        match (fields[0], fields.len()) {
            ("END", 1) => {}
            ("GLOBAL_STATS", _) => {}
            ("HEADER", n) if n > 2 => {
                let columns = fields[2..].iter().map(|c| c.to_string()).collect();
                self.headers.insert(fields[1].to_string(), columns);
            }
            ("TIME", 3) => {
                let updated = parse_value("TIME", fields[2])?;
                sink.observe(Observation::new(
                    &STATUS_UPDATE_TIME,
                    updated,
                    self.source_labels(),
                ));
            }
            ("TITLE", 2) => {}
            (key, _) => match directives.get(key) {
                Some(directive) => self.decode_record(directive, &fields, sink)?,
                None => return Err(StatusError::UnsupportedKey(key.to_string())),
            },
        }

        Ok(())
    }

    fn decode_record<S>(
        &mut self,
        directive: &HeaderDirective,
        fields: &[&str],
        sink: &mut S,
    ) -> Result<()>
    where
        S: ObservationSink + ?Sized,
    {
        let base_labels = self.source_labels();

        let Some(columns) = self.headers.get(directive.record_type) else {
            return Err(StatusError::Sequence {
                directive: directive.record_type.to_string(),
            });
        };

        if fields.len() != columns.len() + 1 {
            return Err(StatusError::schema(format!(
                "HEADER for {} describes {} columns, record has {}",
                directive.record_type,
                columns.len(),
                fields.len() - 1
            )));
        }

        if directive.record_type == CLIENT_LIST {
            self.connected_clients += 1;
        }

        let record = HeaderRecord::new(columns, &fields[1..]);
        emit_record(directive, &base_labels, &record, Some(&mut self.seen), sink)
    }

    /// Emit the connected-client total. Call once the stream is exhausted.
    pub fn finish<S>(self, sink: &mut S)
    where
        S: ObservationSink + ?Sized,
    {
        debug!(
            source = self.source,
            connected_clients = self.connected_clients,
            "Server status decoded"
        );
        sink.observe(Observation::new(
            &SERVER_CONNECTED_CLIENTS,
            self.connected_clients as f64,
            self.source_labels(),
        ));
    }

    fn source_labels(&self) -> Vec<Label> {
        vec![(SOURCE_LABEL, self.source.to_string())]
    }
}

/// Decode a complete server status blob.
///
/// Stops at the first error; observations already pushed stay in the sink.
pub fn decode_server_status<S>(
    source: &str,
    contents: &[u8],
    separator: char,
    directives: &DirectiveTable,
    sink: &mut S,
) -> Result<()>
where
    S: ObservationSink + ?Sized,
{
    let mut decoder = ServerDecoder::new(source, separator, directives);
    for line in contents.lines() {
        decoder.decode_line(&line?, sink)?;
    }
    decoder.finish(sink);
    Ok(())
}
