//! Destinations for per-file records.
//!
//! A [`MetadataStore`] receives each record once its file has been
//! classified. [`LogStore`] only reports it; [`MemoryStore`] keeps it;
//! [`JsonLinesStore`] writes one JSON object per line.

use crate::error::SpiderError;
use crate::record::{FileRecord, Inventory, Record};
use serde::Serialize;
use std::fs;
use std::io::Write;
use std::path::Path;
use tracing::info;

pub trait MetadataStore: Send {
    fn store(&mut self, path: &Path, record: &Record) -> Result<(), SpiderError>;
}

/// Reports every record at info level and keeps nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogStore;

impl MetadataStore for LogStore {
    fn store(&mut self, path: &Path, record: &Record) -> Result<(), SpiderError> {
        info!("Recording {} {}", path.display(), record);
        Ok(())
    }
}

/// Keeps every record in traversal order.
#[derive(Debug, Default)]
pub struct MemoryStore {
    records: Vec<FileRecord>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn records(&self) -> &[FileRecord] {
        &self.records
    }

    pub fn get(&self, path: impl AsRef<Path>) -> Option<&Record> {
        let path = path.as_ref();
        self.records
            .iter()
            .find(|entry| entry.path == path)
            .map(|entry| &entry.record)
    }

    pub fn into_records(self) -> Vec<FileRecord> {
        self.records
    }
}

impl MetadataStore for MemoryStore {
    fn store(&mut self, path: &Path, record: &Record) -> Result<(), SpiderError> {
        self.records.push(FileRecord {
            path: path.to_path_buf(),
            record: record.clone(),
        });
        Ok(())
    }
}

#[derive(Serialize)]
struct Line<'a> {
    path: &'a Path,
    #[serde(flatten)]
    record: &'a Record,
}

/// Writes `{"path": ..., "file type": ..., ...}` per record, one per line.
pub struct JsonLinesStore<W> {
    writer: W,
}

impl<W: Write> JsonLinesStore<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: Write + Send> MetadataStore for JsonLinesStore<W> {
    fn store(&mut self, path: &Path, record: &Record) -> Result<(), SpiderError> {
        serde_json::to_writer(&mut self.writer, &Line { path, record })
            .map_err(|e| SpiderError::Store(e.to_string()))?;
        writeln!(self.writer).map_err(|e| SpiderError::Store(e.to_string()))?;
        Ok(())
    }
}

/// Formats an inventory as a JSON document.
pub fn format_inventory(inventory: &Inventory, pretty: bool) -> Result<String, SpiderError> {
    let json = if pretty {
        serde_json::to_string_pretty(inventory)
    } else {
        serde_json::to_string(inventory)
    };
    json.map_err(|e| SpiderError::Store(e.to_string()))
}

/// Writes an inventory as a JSON document to `path`.
pub fn write_inventory(
    inventory: &Inventory,
    path: impl AsRef<Path>,
    pretty: bool,
) -> Result<(), SpiderError> {
    let path = path.as_ref();
    let content = format_inventory(inventory, pretty)?;
    fs::write(path, content).map_err(|e| {
        SpiderError::Store(format!("cannot write {}: {}", path.display(), e))
    })?;
    Ok(())
}
