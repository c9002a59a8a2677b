//! Path resolution for hookwatch files

use std::path::{Path, PathBuf};

/// Resolves standard per-user paths
#[derive(Debug, Clone)]
pub struct Paths {
    pub home_claude: PathBuf,
}

impl Paths {
    /// Create a new Paths resolver rooted at the user's home directory
    pub fn new() -> std::io::Result<Self> {
        let home = dirs::home_dir().ok_or_else(|| {
            std::io::Error::new(std::io::ErrorKind::NotFound, "home directory not found")
        })?;

        Ok(Self {
            home_claude: home.join(".claude"),
        })
    }

    /// Get hookwatch data directory path
    pub fn hookwatch_dir(&self) -> PathBuf {
        self.home_claude.join("hookwatch")
    }

    /// Get default events.jsonl path
    pub fn events_file(&self) -> PathBuf {
        self.hookwatch_dir().join("events.jsonl")
    }

    /// Get hookwatch.json config path
    pub fn config_file(&self) -> PathBuf {
        self.home_claude.join("hookwatch.json")
    }
}

/// Lock file guarding appends to `log`
pub fn lock_path(log: &Path) -> PathBuf {
    sibling(log, "lock")
}

/// Persisted tail cursor for `log`
pub fn cursor_path(log: &Path) -> PathBuf {
    sibling(log, "cursor")
}

/// Side-channel diagnostics log living next to `log`
pub fn diagnostics_path(log: &Path) -> PathBuf {
    log.with_file_name("hookwatch.log")
}

fn sibling(log: &Path, suffix: &str) -> PathBuf {
    let mut name = log.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    name.push(".");
    name.push(suffix);
    log.with_file_name(name)
}
