//! Session aggregation and duplicate-output detection over captured hook events

mod aggregate;
mod config;
mod dedup;
mod query;

pub use aggregate::{fold_sessions, SessionAggregator, SessionSummary, SessionTable};
pub use config::{Config, ConfigError, STORE_ENV};
pub use dedup::{detect, DedupPolicy, DuplicateReport, Fingerprint, HookIdentity};
pub use query::{detect_duplicates, summarize, SessionScope};
