//! Hook event capture: record codec, append-only event store, live follower

mod follow;
mod io;
mod paths;
mod store;
mod tokens;
mod types;

pub use follow::{
    load_cursor, save_cursor, tail, CancelToken, Follower, TailStats, DEFAULT_POLL_INTERVAL,
    DEFAULT_RETRY_INTERVAL,
};
pub use io::{atomic_write, AppendLock};
pub use paths::{cursor_path, diagnostics_path, lock_path, Paths};
pub use store::{EventStore, LogBatch, LogSnapshot, StoreError, StoreOffset, DEFAULT_LOCK_TIMEOUT};
pub use tokens::{estimate_tokens, DEFAULT_CHARS_PER_TOKEN};
pub use types::{decode, encode, DecodeError, EventType, HookEvent};
