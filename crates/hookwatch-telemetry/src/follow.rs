//! Incremental reading of a growing event log

use crate::io::atomic_write;
use crate::paths::cursor_path;
use crate::store::{EventStore, StoreError, StoreOffset};
use crate::types::HookEvent;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::path::Path;
use std::sync::{Arc, Condvar, Mutex, PoisonError};
use std::time::Duration;

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(250);
pub const DEFAULT_RETRY_INTERVAL: Duration = Duration::from_secs(1);

/// Cooperative cancellation shared between a follower and its owner
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    inner: Arc<(Mutex<bool>, Condvar)>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        let (flag, cvar) = &*self.inner;
        *flag.lock().unwrap_or_else(PoisonError::into_inner) = true;
        cvar.notify_all();
    }

    pub fn is_cancelled(&self) -> bool {
        *self.inner.0.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Sleep up to `timeout`, waking early on cancellation.
    /// Returns whether the token is cancelled.
    pub fn wait_timeout(&self, timeout: Duration) -> bool {
        let (flag, cvar) = &*self.inner;
        let guard = flag.lock().unwrap_or_else(PoisonError::into_inner);
        let (guard, _) = cvar
            .wait_timeout_while(guard, timeout, |cancelled| !*cancelled)
            .unwrap_or_else(PoisonError::into_inner);
        *guard
    }
}

/// Unbounded iterator over the log's records, old and new.
///
/// Ends only once its [`CancelToken`] is cancelled.
#[derive(Debug)]
pub struct Follower {
    store: EventStore,
    cancel: CancelToken,
    /// Just past the last record handed out
    offset: StoreOffset,
    /// Where the next read starts
    scan_offset: StoreOffset,
    pending: VecDeque<(HookEvent, StoreOffset)>,
    skipped: usize,
    poll_interval: Duration,
    retry_interval: Duration,
}

impl Follower {
    pub(crate) fn new(store: EventStore, offset: StoreOffset, cancel: CancelToken) -> Self {
        Self {
            store,
            cancel,
            offset,
            scan_offset: offset,
            pending: VecDeque::new(),
            skipped: 0,
            poll_interval: DEFAULT_POLL_INTERVAL,
            retry_interval: DEFAULT_RETRY_INTERVAL,
        }
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    pub fn with_retry_interval(mut self, interval: Duration) -> Self {
        self.retry_interval = interval;
        self
    }

    /// Resume position: restarting from here neither repeats nor drops records.
    pub fn offset(&self) -> StoreOffset {
        self.offset
    }

    /// Malformed lines passed over so far
    pub fn skipped(&self) -> usize {
        self.skipped
    }
}

impl Iterator for Follower {
    type Item = HookEvent;

    fn next(&mut self) -> Option<HookEvent> {
        loop {
            if self.cancel.is_cancelled() {
                return None;
            }
            if let Some((event, end)) = self.pending.pop_front() {
                self.offset = if self.pending.is_empty() {
                    self.scan_offset
                } else {
                    end
                };
                return Some(event);
            }

            match self.store.read_from(self.scan_offset) {
                Ok(batch) => {
                    self.skipped += batch.skipped;
                    self.scan_offset = batch.next_offset;
                    if batch.entries.is_empty() {
                        self.offset = self.scan_offset;
                        self.cancel.wait_timeout(self.poll_interval);
                    } else {
                        self.pending.extend(batch.entries);
                    }
                }
                Err(StoreError::Truncated { len, .. }) => {
                    tracing::warn!(
                        path = %self.store.path().display(),
                        offset = self.scan_offset.0,
                        len,
                        "event log shrank; following from the start"
                    );
                    self.offset = StoreOffset::START;
                    self.scan_offset = StoreOffset::START;
                }
                Err(err) => {
                    tracing::warn!(offset = self.scan_offset.0, error = %err, "event log read failed; retrying");
                    self.cancel.wait_timeout(self.retry_interval);
                }
            }
        }
    }
}

impl EventStore {
    /// Follow the log from its first record.
    pub fn follow(&self, cancel: CancelToken) -> Follower {
        self.follow_from(StoreOffset::START, cancel)
    }

    /// Follow the log from a previously reported offset.
    pub fn follow_from(&self, offset: StoreOffset, cancel: CancelToken) -> Follower {
        Follower::new(self.clone(), offset, cancel)
    }
}

/// Where a finished `tail` stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TailStats {
    /// Resume offset just past the last record handed to the sink
    pub offset: StoreOffset,
    /// Malformed lines passed over while following
    pub skipped: usize,
}

/// Feed every record from `since` onwards into `sink` until cancelled.
///
/// The sink receives each record together with the resume offset just past
/// it.
pub fn tail<F>(store: &EventStore, since: StoreOffset, cancel: &CancelToken, mut sink: F) -> TailStats
where
    F: FnMut(&HookEvent, StoreOffset),
{
    let mut follower = store.follow_from(since, cancel.clone());
    while let Some(event) = follower.next() {
        sink(&event, follower.offset());
    }
    TailStats {
        offset: follower.offset(),
        skipped: follower.skipped(),
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct Cursor {
    offset: StoreOffset,
}

/// Load the persisted tail cursor for `log`, if one was saved.
pub fn load_cursor(log: &Path) -> Option<StoreOffset> {
    let content = std::fs::read_to_string(cursor_path(log)).ok()?;
    serde_json::from_str::<Cursor>(&content).ok().map(|c| c.offset)
}

/// Persist the tail cursor for `log`.
pub fn save_cursor(log: &Path, offset: StoreOffset) -> std::io::Result<()> {
    let json = serde_json::to_string(&Cursor { offset })?;
    atomic_write(&cursor_path(log), json.as_bytes())
}
