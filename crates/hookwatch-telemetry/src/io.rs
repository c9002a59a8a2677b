//! Atomic file writes and the cross-process append lock

use std::fs::{File, OpenOptions, TryLockError};
use std::io::ErrorKind;
use std::path::Path;
use std::time::{Duration, Instant};

const LOCK_POLL_INTERVAL: Duration = Duration::from_millis(5);

/// Write data atomically using temp file + rename
pub fn atomic_write(path: &Path, data: &[u8]) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let temp_path = path.with_extension(format!("tmp.{}", std::process::id()));
    std::fs::write(&temp_path, data)?;
    std::fs::rename(temp_path, path)?;
    Ok(())
}

/// Exclusive append lock shared by every process writing one log.
///
/// An advisory lock on a persistent lock file. The kernel releases it when
/// the holding handle closes, including when the holder is killed, so a
/// crashed writer never blocks the next one.
#[derive(Debug)]
pub struct AppendLock {
    _file: File,
}

impl AppendLock {
    /// Acquire the lock, polling until `timeout` elapses.
    ///
    /// Fails with `ErrorKind::TimedOut` when another writer holds the lock
    /// for the whole wait.
    pub fn acquire(path: &Path, timeout: Duration) -> std::io::Result<Self> {
        let file = OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(path)?;
        let started = Instant::now();
        loop {
            match file.try_lock() {
                Ok(()) => return Ok(Self { _file: file }),
                Err(TryLockError::WouldBlock) => {}
                Err(TryLockError::Error(err)) => return Err(err),
            }

            if started.elapsed() >= timeout {
                return Err(std::io::Error::new(
                    ErrorKind::TimedOut,
                    format!("append lock {} held for {:?}", path.display(), timeout),
                ));
            }
            std::thread::sleep(LOCK_POLL_INTERVAL);
        }
    }
}
