//! Configuration for capture and auditing

use crate::dedup::DedupPolicy;
use hookwatch_telemetry::{EventStore, Paths, DEFAULT_CHARS_PER_TOKEN};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Environment variable overriding `storePath`
pub const STORE_ENV: &str = "HOOKWATCH_STORE";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("cannot read config {path}: {source}")]
    Unreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("malformed config {path}: {source}")]
    Malformed {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("invalid config value `{field}`: {reason}")]
    Invalid { field: &'static str, reason: String },
}

/// Hookwatch configuration (`~/.claude/hookwatch.json`)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Config {
    /// Event log location
    pub store_path: PathBuf,

    /// Fires with output needed before a hook can be flagged
    pub dedup_min_fires: usize,

    /// Share of fires carrying the most common output that flags a hook
    pub dedup_threshold: f64,

    /// Characters per estimated token
    pub token_heuristic_divisor: usize,

    /// Longest wait for the append lock
    pub lock_timeout_ms: u64,
}

impl Config {
    pub fn new() -> Self {
        Self {
            // Empty when there is no home directory; validate() reports it
            store_path: Paths::new().map(|p| p.events_file()).unwrap_or_default(),
            dedup_min_fires: 5,
            dedup_threshold: 0.8,
            token_heuristic_divisor: DEFAULT_CHARS_PER_TOKEN,
            lock_timeout_ms: 2000,
        }
    }

    /// Load from a JSON file. A missing file yields the defaults.
    ///
    /// The result is not validated; call [`Config::validate`] once all
    /// overrides are applied.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = match std::fs::read_to_string(path) {
            Ok(content) => content,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(Self::new()),
            Err(source) => {
                return Err(ConfigError::Unreadable {
                    path: path.to_path_buf(),
                    source,
                })
            }
        };
        serde_json::from_str(&content).map_err(|source| ConfigError::Malformed {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Load `path`, apply `HOOKWATCH_STORE` and then `store_flag`, validate.
    ///
    /// Without a config file (no home directory) the defaults are used, so
    /// an explicit store still resolves.
    pub fn resolve(path: Option<&Path>, store_flag: Option<PathBuf>) -> Result<Self, ConfigError> {
        let mut config = match path {
            Some(path) => Self::load(path)?,
            None => Self::new(),
        };
        if let Some(env_store) = std::env::var_os(STORE_ENV).filter(|v| !v.is_empty()) {
            config.store_path = PathBuf::from(env_store);
        }
        if let Some(store) = store_flag {
            config.store_path = store;
        }
        config.validate()?;
        tracing::debug!(store = %config.store_path.display(), "resolved config");
        Ok(config)
    }

    /// Reject out-of-range values. Nothing is clamped.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.store_path.as_os_str().is_empty() {
            return Err(invalid("storePath", "must not be empty"));
        }
        if self.dedup_min_fires < 1 {
            return Err(invalid("dedupMinFires", "must be at least 1"));
        }
        if !(self.dedup_threshold > 0.0 && self.dedup_threshold <= 1.0) {
            return Err(invalid(
                "dedupThreshold",
                format!("must be in (0, 1], got {}", self.dedup_threshold),
            ));
        }
        if self.token_heuristic_divisor < 1 {
            return Err(invalid("tokenHeuristicDivisor", "must be at least 1"));
        }
        if self.lock_timeout_ms < 1 {
            return Err(invalid("lockTimeoutMs", "must be at least 1"));
        }
        Ok(())
    }

    pub fn dedup_policy(&self) -> DedupPolicy {
        DedupPolicy {
            min_fires: self.dedup_min_fires,
            threshold: self.dedup_threshold,
        }
    }

    pub fn lock_timeout(&self) -> Duration {
        Duration::from_millis(self.lock_timeout_ms)
    }

    /// Store handle for the configured log
    pub fn open_store(&self) -> EventStore {
        EventStore::new(&self.store_path).with_lock_timeout(self.lock_timeout())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::new()
    }
}

fn invalid(field: &'static str, reason: impl Into<String>) -> ConfigError {
    ConfigError::Invalid {
        field,
        reason: reason.into(),
    }
}
