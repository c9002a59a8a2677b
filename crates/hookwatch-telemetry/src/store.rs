//! Append-only JSONL event log shared by concurrent hook processes

use crate::io::AppendLock;
use crate::paths::lock_path;
use crate::types::{decode, encode, HookEvent};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, ErrorKind, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_LOCK_TIMEOUT: Duration = Duration::from_millis(2000);

/// Errors raised by the event store
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("event store {path} unavailable: {source}")]
    Unavailable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("timed out after {waited:?} waiting for append lock on {path}")]
    LockTimeout { path: PathBuf, waited: Duration },
    #[error("event store {path} is shorter ({len} bytes) than offset {offset}")]
    Truncated {
        path: PathBuf,
        offset: StoreOffset,
        len: u64,
    },
    #[error("failed to encode record: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Byte position in the log, always at a record boundary
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StoreOffset(pub u64);

impl StoreOffset {
    pub const START: StoreOffset = StoreOffset(0);
}

impl fmt::Display for StoreOffset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Every complete record in the log at the time of reading
#[derive(Debug, Default)]
pub struct LogSnapshot {
    pub events: Vec<HookEvent>,
    /// Complete lines that failed to decode
    pub skipped: usize,
    pub end_offset: StoreOffset,
}

/// Complete records read from some offset onwards
#[derive(Debug, Default)]
pub struct LogBatch {
    /// Each event with the offset just past its line
    pub entries: Vec<(HookEvent, StoreOffset)>,
    pub skipped: usize,
    pub next_offset: StoreOffset,
}

/// Handle to one durable event log
#[derive(Debug, Clone)]
pub struct EventStore {
    path: PathBuf,
    lock_timeout: Duration,
}

impl EventStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock_timeout: DEFAULT_LOCK_TIMEOUT,
        }
    }

    pub fn with_lock_timeout(mut self, timeout: Duration) -> Self {
        self.lock_timeout = timeout;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append one record as a single line.
    ///
    /// Writers serialize on the store's lock file, so no reader can ever
    /// see two records interleaved. On a failed write the log is truncated
    /// back to its previous length.
    pub fn append(&self, event: &HookEvent) -> Result<(), StoreError> {
        let mut line = encode(event)?.into_bytes();
        line.push(b'\n');

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|e| self.unavailable(e))?;
            }
        }

        let _lock = AppendLock::acquire(&lock_path(&self.path), self.lock_timeout).map_err(
            |e| match e.kind() {
                ErrorKind::TimedOut => StoreError::LockTimeout {
                    path: self.path.clone(),
                    waited: self.lock_timeout,
                },
                _ => self.unavailable(e),
            },
        )?;

        let mut file = OpenOptions::new()
            .create(true)
            .read(true)
            .append(true)
            .open(&self.path)
            .map_err(|e| self.unavailable(e))?;
        let len = file.metadata().map_err(|e| self.unavailable(e))?.len();

        if has_torn_tail(&mut file, len).map_err(|e| self.unavailable(e))? {
            // Seal the fragment a crashed writer left so it stays one bad line
            tracing::warn!(path = %self.path.display(), offset = len, "sealing torn record at end of log");
            line.insert(0, b'\n');
        }

        if let Err(err) = file.write_all(&line).and_then(|_| file.sync_data()) {
            let _ = file.set_len(len);
            return Err(self.unavailable(err));
        }
        Ok(())
    }

    /// Replay every complete record in append order.
    ///
    /// A missing log is an empty store. A trailing line with no newline is
    /// an append still in flight and is left out.
    pub fn read_all(&self) -> Result<LogSnapshot, StoreError> {
        let batch = self.read_from(StoreOffset::START)?;
        Ok(LogSnapshot {
            events: batch.entries.into_iter().map(|(event, _)| event).collect(),
            skipped: batch.skipped,
            end_offset: batch.next_offset,
        })
    }

    /// Read complete records starting at `offset`.
    pub fn read_from(&self, offset: StoreOffset) -> Result<LogBatch, StoreError> {
        let file = match File::open(&self.path) {
            Ok(file) => file,
            Err(err) if err.kind() == ErrorKind::NotFound && offset == StoreOffset::START => {
                return Ok(LogBatch::default());
            }
            Err(err) => return Err(self.unavailable(err)),
        };

        let len = file.metadata().map_err(|e| self.unavailable(e))?.len();
        if len < offset.0 {
            return Err(StoreError::Truncated {
                path: self.path.clone(),
                offset,
                len,
            });
        }

        let mut reader = BufReader::new(file);
        reader
            .seek(SeekFrom::Start(offset.0))
            .map_err(|e| self.unavailable(e))?;

        let mut batch = LogBatch {
            next_offset: offset,
            ..LogBatch::default()
        };
        let mut buf = Vec::new();
        loop {
            buf.clear();
            let bytes = reader
                .read_until(b'\n', &mut buf)
                .map_err(|e| self.unavailable(e))?;
            if bytes == 0 || buf.last() != Some(&b'\n') {
                break;
            }
            let line_start = batch.next_offset;
            batch.next_offset = StoreOffset(line_start.0 + bytes as u64);

            let Ok(line) = std::str::from_utf8(&buf) else {
                tracing::warn!(path = %self.path.display(), offset = line_start.0, "skipping non-utf8 record");
                batch.skipped += 1;
                continue;
            };
            if line.trim().is_empty() {
                continue;
            }
            match decode(line) {
                Ok(event) => batch.entries.push((event, batch.next_offset)),
                Err(err) => {
                    tracing::warn!(path = %self.path.display(), offset = line_start.0, error = %err, "skipping malformed record");
                    batch.skipped += 1;
                }
            }
        }
        Ok(batch)
    }

    fn unavailable(&self, source: std::io::Error) -> StoreError {
        StoreError::Unavailable {
            path: self.path.clone(),
            source,
        }
    }
}

fn has_torn_tail(file: &mut File, len: u64) -> std::io::Result<bool> {
    if len == 0 {
        return Ok(false);
    }
    let mut last = [0u8; 1];
    file.seek(SeekFrom::Start(len - 1))?;
    file.read_exact(&mut last)?;
    Ok(last[0] != b'\n')
}
