//! Status acquisition: files on disk or the Access Server command.

use crate::types::{ExporterConfig, StatusType};
use async_trait::async_trait;
use std::collections::HashSet;
use std::process::Stdio;
use std::sync::Arc;
use tokio::process::Command;
use tracing::{debug, warn};

/// Something that yields a raw status blob.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait StatusReader: Send + Sync {
    /// Identifier used as the `status_path` label
    fn source(&self) -> String;

    /// Value of the `instance_name` label, if the source has one
    fn instance(&self) -> Option<String>;

    /// Decoder family for the blob
    fn status_type(&self) -> StatusType;

    /// Read the whole blob
    async fn read(&self) -> common::Result<Vec<u8>>;
}

/// A configured status path, optionally written as `name:path`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct StatusPath {
    pub instance: Option<String>,
    pub path: String,
}

impl StatusPath {
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            instance: None,
            path: path.into(),
        }
    }

    pub fn with_instance(mut self, instance: impl Into<String>) -> Self {
        self.instance = Some(instance.into());
        self
    }

    /// Parse `path` or `name:path`.
    ///
    /// Both parts must be non-empty; extra colons are rejected.
    pub fn parse(entry: &str) -> Option<Self> {
        let parts: Vec<&str> = entry.split(':').collect();
        match parts.as_slice() {
            [path] if !path.is_empty() => Some(Self::new(*path)),
            [name, path] if !name.is_empty() && !path.is_empty() => {
                Some(Self::new(*path).with_instance(*name))
            }
            _ => None,
        }
    }
}

/// Reads an OpenVPN `--status` file.
#[derive(Debug, Clone)]
pub struct FileReader {
    path: String,
    instance: Option<String>,
}

impl FileReader {
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            instance: None,
        }
    }

    pub fn with_instance(mut self, instance: impl Into<String>) -> Self {
        self.instance = Some(instance.into());
        self
    }
}

impl From<StatusPath> for FileReader {
    fn from(status_path: StatusPath) -> Self {
        Self {
            path: status_path.path,
            instance: status_path.instance,
        }
    }
}

#[async_trait]
impl StatusReader for FileReader {
    fn source(&self) -> String {
        self.path.clone()
    }

    fn instance(&self) -> Option<String> {
        self.instance.clone()
    }

    fn status_type(&self) -> StatusType {
        StatusType::File
    }

    async fn read(&self) -> common::Result<Vec<u8>> {
        Ok(tokio::fs::read(&self.path).await?)
    }
}

/// Runs a command and captures its stdout.
#[derive(Debug, Clone)]
pub struct CommandReader {
    label: String,
    program: String,
    args: Vec<String>,
}

impl CommandReader {
    /// `command` holds the program followed by its arguments.
    pub fn new(label: impl Into<String>, command: &[String]) -> common::Result<Self> {
        let (program, args) = command
            .split_first()
            .ok_or_else(|| common::Error::config("API command is empty"))?;
        Ok(Self {
            label: label.into(),
            program: program.clone(),
            args: args.to_vec(),
        })
    }
}

#[async_trait]
impl StatusReader for CommandReader {
    fn source(&self) -> String {
        self.label.clone()
    }

    fn instance(&self) -> Option<String> {
        None
    }

    fn status_type(&self) -> StatusType {
        StatusType::Api
    }

    async fn read(&self) -> common::Result<Vec<u8>> {
        debug!(program = %self.program, args = ?self.args, "Running status command");

        let output = Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| common::Error::command(format!("{}: {}", self.program, e)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(common::Error::command(format!(
                "{} exited with {}: {}",
                self.program,
                output.status,
                stderr.trim()
            )));
        }

        Ok(output.stdout)
    }
}

fn is_pattern(path: &str) -> bool {
    path.contains(['*', '?', '['])
}

/// Expand the configured paths.
///
/// Literal paths are kept whether or not they exist, so that a missing file
/// is reported as down. Patterns contribute their current matches in sorted
/// order, each carrying the pattern's instance name. Duplicates keep their
/// first position.
pub fn resolve_status_paths(configured: &[StatusPath]) -> Vec<StatusPath> {
    let mut seen = HashSet::new();
    let mut resolved = Vec::new();

    for entry in configured {
        let pattern = &entry.path;
        if !is_pattern(pattern) {
            if seen.insert(entry.clone()) {
                resolved.push(entry.clone());
            }
            continue;
        }

        let entries = match glob::glob(pattern) {
            Ok(entries) => entries,
            Err(e) => {
                warn!(pattern = %pattern, error = %e, "Invalid status path pattern");
                continue;
            }
        };

        let before = resolved.len();
        for matched in entries {
            match matched {
                Ok(path) => {
                    let found = StatusPath {
                        instance: entry.instance.clone(),
                        path: path.to_string_lossy().into_owned(),
                    };
                    if seen.insert(found.clone()) {
                        resolved.push(found);
                    }
                }
                Err(e) => warn!(pattern = %pattern, error = %e, "Unreadable status path"),
            }
        }
        if resolved.len() == before {
            debug!(pattern = %pattern, "Pattern matched no status files");
        }
    }

    resolved
}

/// The set of sources scraped on each request.
pub enum Sources {
    /// File paths and patterns, re-expanded on every scrape
    Files(Vec<StatusPath>),
    /// A single Access Server command
    Api(Arc<CommandReader>),
    /// A fixed list of readers
    Fixed(Vec<Arc<dyn StatusReader>>),
}

impl Sources {
    pub fn from_config(config: &ExporterConfig) -> common::Result<Self> {
        match config.status_type {
            StatusType::File => config
                .status_paths
                .iter()
                .map(|entry| {
                    StatusPath::parse(entry).ok_or_else(|| {
                        common::Error::config(format!("invalid status path {:?}", entry))
                    })
                })
                .collect::<common::Result<Vec<_>>>()
                .map(Sources::Files),
            StatusType::Api => Ok(Sources::Api(Arc::new(CommandReader::new(
                config.api_source_label.clone(),
                &config.api_command,
            )?))),
        }
    }

    /// Readers for the current scrape, in configured order.
    pub fn readers(&self) -> Vec<Arc<dyn StatusReader>> {
        match self {
            Sources::Files(configured) => resolve_status_paths(configured)
                .into_iter()
                .map(|path| Arc::new(FileReader::from(path)) as Arc<dyn StatusReader>)
                .collect(),
            Sources::Api(reader) => vec![reader.clone() as Arc<dyn StatusReader>],
            Sources::Fixed(readers) => readers.clone(),
        }
    }
}
