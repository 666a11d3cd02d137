//! Row sinks for growth and lineage records.

use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use super::SinkError;

/// Append-only destination for rows of string fields.
pub trait RecordSink: Send {
    /// Append one row. The row is durable once this returns `Ok`.
    fn write_row(&mut self, fields: &[String]) -> Result<(), SinkError>;

    /// Finalize the sink. Further writes fail with [`SinkError::Closed`].
    fn close(&mut self) -> Result<(), SinkError>;
}

/// CSV file sink, flushed and synced after every row.
///
/// Usage:
/// ```ignore
/// let mut sink = CsvSink::create("data/size-3-iterations.csv")?;
/// sink.write_row(&["new_max".into(), "iterations".into()])?;
/// sink.close()?;
/// ```
#[derive(Debug)]
pub struct CsvSink {
    path: PathBuf,
    writer: Option<BufWriter<File>>,
    rows_written: u64,
}

impl CsvSink {
    /// Create or truncate `path`, creating parent directories as needed.
    pub fn create<P: AsRef<Path>>(path: P) -> std::io::Result<Self> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent)?;
        }
        let file = File::create(&path)?;

        Ok(Self {
            path,
            writer: Some(BufWriter::new(file)),
            rows_written: 0,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn rows_written(&self) -> u64 {
        self.rows_written
    }
}

impl RecordSink for CsvSink {
    fn write_row(&mut self, fields: &[String]) -> Result<(), SinkError> {
        let writer = self.writer.as_mut().ok_or(SinkError::Closed)?;
        writer.write_all(encode_row(fields).as_bytes())?;
        writer.flush()?;
        writer.get_ref().sync_data()?;
        self.rows_written += 1;
        Ok(())
    }

    fn close(&mut self) -> Result<(), SinkError> {
        let mut writer = self.writer.take().ok_or(SinkError::Closed)?;
        writer.flush()?;
        writer.get_ref().sync_all()?;
        Ok(())
    }
}

/// Encode one CSV line, quoting fields that need it.
pub fn encode_row(fields: &[String]) -> String {
    let mut line = String::new();
    for (i, field) in fields.iter().enumerate() {
        if i > 0 {
            line.push(',');
        }
        if field.contains([',', '"', '\n', '\r']) || field.starts_with(' ') {
            line.push('"');
            line.push_str(&field.replace('"', "\"\""));
            line.push('"');
        } else {
            line.push_str(field);
        }
    }
    line.push('\n');
    line
}

/// Rows captured in memory, shared with a [`MemorySinkHandle`].
#[derive(Debug, Default)]
struct MemoryRows {
    rows: Vec<Vec<String>>,
    closed: bool,
}

/// In-memory sink for inspection and tests.
#[derive(Debug, Default)]
pub struct MemorySink {
    inner: Arc<Mutex<MemoryRows>>,
}

/// Read access to the rows of a [`MemorySink`] after it has been moved.
#[derive(Debug, Clone)]
pub struct MemorySinkHandle {
    inner: Arc<Mutex<MemoryRows>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn handle(&self) -> MemorySinkHandle {
        MemorySinkHandle {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl MemorySinkHandle {
    /// Snapshot of every row written so far.
    pub fn rows(&self) -> Vec<Vec<String>> {
        self.inner
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .rows
            .clone()
    }

    pub fn is_closed(&self) -> bool {
        self.inner.lock().unwrap_or_else(|e| e.into_inner()).closed
    }
}

impl RecordSink for MemorySink {
    fn write_row(&mut self, fields: &[String]) -> Result<(), SinkError> {
        let mut inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        if inner.closed {
            return Err(SinkError::Closed);
        }
        inner.rows.push(fields.to_vec());
        Ok(())
    }

    fn close(&mut self) -> Result<(), SinkError> {
        let mut inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        if inner.closed {
            return Err(SinkError::Closed);
        }
        inner.closed = true;
        Ok(())
    }
}
