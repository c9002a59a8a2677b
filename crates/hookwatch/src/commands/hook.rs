//! Ingestion entry point invoked by the host for every hook event.
//!
//! Whatever happens here, the host sees a successful exit and an empty
//! stdout. Failures go to the diagnostics log next to the store.

use super::load_config;
use anyhow::Context;
use chrono::{DateTime, Utc};
use hookwatch_telemetry::{diagnostics_path, EventStore, HookEvent};
use std::any::Any;
use std::fs::{File, OpenOptions};
use std::io::Read;
use std::panic::{self, AssertUnwindSafe};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing_subscriber::EnvFilter;

pub fn run(store: Option<PathBuf>) -> anyhow::Result<()> {
    let config = load_config(store);
    init_logging(config.as_ref().ok().map(|c| c.store_path.as_path()));

    observe(move || {
        // Drain stdin even when the config is unusable
        let mut input = String::new();
        std::io::stdin()
            .read_to_string(&mut input)
            .context("reading hook payload from stdin")?;
        let config = config?;
        ingest(&config.open_store(), &input, Utc::now()).map(|_| ())
    });
    Ok(())
}

/// Run one ingestion, absorbing every error and panic into the log.
pub fn observe<F>(ingestion: F)
where
    F: FnOnce() -> anyhow::Result<()>,
{
    let previous = panic::take_hook();
    panic::set_hook(Box::new(|info| {
        tracing::error!("hook ingestion panicked: {}", info);
    }));
    let outcome = panic::catch_unwind(AssertUnwindSafe(ingestion));
    panic::set_hook(previous);

    match outcome {
        Ok(Ok(())) => {}
        Ok(Err(err)) => tracing::warn!("hook event not recorded: {:#}", err),
        Err(payload) => tracing::error!("hook event dropped: {}", panic_message(&*payload)),
    }
}

/// Normalize one payload and append it to `store`.
pub fn ingest(store: &EventStore, input: &str, now: DateTime<Utc>) -> anyhow::Result<HookEvent> {
    let mut event = HookEvent::from_hook_input(input, now).context("decoding hook payload")?;
    if event.cwd.is_empty() {
        if let Ok(dir) = std::env::current_dir() {
            event.cwd = dir.display().to_string();
        }
    }
    store
        .append(&event)
        .with_context(|| format!("appending to {}", store.path().display()))?;
    tracing::debug!(
        session = %event.session_id,
        event_type = %event.event_type,
        "recorded hook event"
    );
    Ok(event)
}

fn init_logging(store_path: Option<&Path>) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_ansi(false);

    match store_path.and_then(open_diagnostics) {
        Some(file) => {
            let _ = builder.with_writer(Mutex::new(file)).try_init();
        }
        None => {
            let _ = builder.with_writer(std::io::stderr).try_init();
        }
    }
}

fn open_diagnostics(store_path: &Path) -> Option<File> {
    let path = diagnostics_path(store_path);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).ok()?;
    }
    OpenOptions::new().create(true).append(true).open(path).ok()
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.as_str()
    } else {
        "unknown panic"
    }
}
