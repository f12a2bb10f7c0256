//! Streaming JSONL reader
//!
//! Records are decoded one line at a time. A bad line never aborts the file:
//! it is counted, logged and skipped.

use std::fs::File;
use std::io::{BufRead, BufReader, ErrorKind};
use std::path::Path;

use serde::Serialize;
use serde_json::Value;
use tracing::{error, info, warn};

use crate::entity::RawRecord;

use super::error::IngestError;

/// Line accounting for one pass over a file
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ReaderStats {
    /// Physical lines consumed, blank ones included
    pub lines_read: usize,
    /// Lines decoded into a JSON object
    pub records: usize,
    /// Non-blank lines that were not a JSON object
    pub malformed: usize,
}

/// Lazy iterator of records from a JSONL source
///
/// `limit` caps the number of physical lines consumed. `None` and `Some(0)`
/// both mean unlimited.
pub struct RecordReader<R = BufReader<File>> {
    source: String,
    reader: R,
    limit: Option<usize>,
    buf: Vec<u8>,
    stats: ReaderStats,
    finished: bool,
}

impl RecordReader {
    /// Open a file for streaming
    pub fn open(path: &Path, limit: Option<usize>) -> Result<Self, IngestError> {
        if !path.exists() {
            return Err(IngestError::FileNotFound(path.to_path_buf()));
        }
        let file = File::open(path)?;
        Ok(Self::from_reader(
            BufReader::new(file),
            path.display().to_string(),
            limit,
        ))
    }
}

impl<R: BufRead> RecordReader<R> {
    /// Stream from any buffered reader; `source` names it in log lines
    pub fn from_reader(reader: R, source: impl Into<String>, limit: Option<usize>) -> Self {
        Self {
            source: source.into(),
            reader,
            limit: limit.filter(|l| *l > 0),
            buf: Vec::new(),
            stats: ReaderStats::default(),
            finished: false,
        }
    }

    pub fn stats(&self) -> ReaderStats {
        self.stats
    }

    fn finish(&mut self) {
        if !self.finished {
            self.finished = true;
            info!(
                source = %self.source,
                records = self.stats.records,
                malformed = self.stats.malformed,
                "Finished reading records"
            );
        }
    }
}

impl<R: BufRead> Iterator for RecordReader<R> {
    type Item = RawRecord;

    fn next(&mut self) -> Option<RawRecord> {
        loop {
            if self.finished {
                return None;
            }
            if let Some(limit) = self.limit
                && self.stats.lines_read >= limit
            {
                self.finish();
                return None;
            }

            self.buf.clear();
            match self.reader.read_until(b'\n', &mut self.buf) {
                Ok(0) => {
                    self.finish();
                    return None;
                }
                Ok(_) => {}
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => {
                    error!(source = %self.source, line = self.stats.lines_read + 1, error = %e, "Read failed, stopping");
                    self.finish();
                    return None;
                }
            }

            self.stats.lines_read += 1;
            let line_no = self.stats.lines_read;
            let line = self.buf.trim_ascii();
            if line.is_empty() {
                continue;
            }

            match serde_json::from_slice::<Value>(line) {
                Ok(Value::Object(record)) => {
                    self.stats.records += 1;
                    return Some(record);
                }
                Ok(other) => {
                    self.stats.malformed += 1;
                    warn!(source = %self.source, line = line_no, found = json_kind(&other), "Skipping line: not a JSON object");
                }
                Err(e) => {
                    self.stats.malformed += 1;
                    warn!(source = %self.source, line = line_no, error = %e, "Skipping line: invalid JSON");
                }
            }
        }
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Number of non-blank lines in a file
pub fn count_lines(path: &Path) -> Result<u64, IngestError> {
    let mut reader = BufReader::new(File::open(path)?);
    let mut buf = Vec::new();
    let mut count = 0;
    loop {
        buf.clear();
        if reader.read_until(b'\n', &mut buf)? == 0 {
            break;
        }
        if !buf.trim_ascii().is_empty() {
            count += 1;
        }
    }
    Ok(count)
}
