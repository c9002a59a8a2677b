use super::load_config;
use hookwatch_telemetry::{
    load_cursor, save_cursor, tail, CancelToken, HookEvent, StoreOffset, TailStats,
};
use std::io::Write;
use std::path::PathBuf;

const OUTPUT_EXCERPT_CHARS: usize = 80;

pub fn run(
    store: Option<PathBuf>,
    since_offset: Option<u64>,
    resume: bool,
    session: Option<&str>,
) -> anyhow::Result<()> {
    let config = load_config(store)?;
    let store = config.open_store();
    let start = start_offset(since_offset, resume.then(|| load_cursor(store.path())).flatten());
    tracing::info!(path = %store.path().display(), offset = %start, "following event log");

    let cancel = CancelToken::new();
    cancel_on_shutdown_signal(cancel.clone())?;
    let stop = cancel.clone();
    let stdout = std::io::stdout();
    let mut shown = start;
    let stats = tail(&store, start, &cancel, |event, offset| {
        if session.map_or(true, |id| id == event.session_id) {
            let mut out = stdout.lock();
            if writeln!(out, "{}", format_event(event)).and_then(|_| out.flush()).is_err() {
                // Reader went away; this record was never shown
                stop.cancel();
                return;
            }
        }
        shown = offset;
        if resume {
            if let Err(err) = save_cursor(store.path(), offset) {
                tracing::warn!(error = %err, "could not save tail cursor");
            }
        }
    });

    if resume {
        save_cursor(store.path(), shown)?;
    }
    // Stdout may already be closed
    let _ = writeln!(stdout.lock(), "{}", build_footer(&stats));
    tracing::info!(offset = %stats.offset, skipped = stats.skipped, "tail stopped");
    Ok(())
}

/// Cancel `token` on Ctrl-C, or SIGTERM on unix.
fn cancel_on_shutdown_signal(token: CancelToken) -> anyhow::Result<()> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;
    // Listeners exist before the first record is read
    let shutdown = {
        let _guard = runtime.enter();
        ShutdownSignal::register()?
    };
    std::thread::spawn(move || {
        runtime.block_on(shutdown.recv());
        tracing::info!("received shutdown signal, stopping tail");
        token.cancel();
    });
    Ok(())
}

#[cfg(unix)]
struct ShutdownSignal {
    interrupt: tokio::signal::unix::Signal,
    terminate: tokio::signal::unix::Signal,
}

#[cfg(unix)]
impl ShutdownSignal {
    fn register() -> std::io::Result<Self> {
        use tokio::signal::unix::{signal, SignalKind};
        Ok(Self {
            interrupt: signal(SignalKind::interrupt())?,
            terminate: signal(SignalKind::terminate())?,
        })
    }

    async fn recv(mut self) {
        tokio::select! {
            _ = self.interrupt.recv() => {}
            _ = self.terminate.recv() => {}
        }
    }
}

#[cfg(not(unix))]
struct ShutdownSignal;

#[cfg(not(unix))]
impl ShutdownSignal {
    fn register() -> std::io::Result<Self> {
        Ok(Self)
    }

    async fn recv(self) {
        if let Err(err) = tokio::signal::ctrl_c().await {
            tracing::warn!("failed to listen for ctrl-c: {}", err);
            std::future::pending::<()>().await;
        }
    }
}

fn build_footer(stats: &TailStats) -> String {
    format!(
        "-- stopped at offset {} | skipped malformed records: {}",
        stats.offset, stats.skipped
    )
}

fn start_offset(since_offset: Option<u64>, saved: Option<StoreOffset>) -> StoreOffset {
    since_offset.map(StoreOffset).or(saved).unwrap_or(StoreOffset::START)
}

fn format_event(event: &HookEvent) -> String {
    let mut line = format!(
        "{}  {}  {}",
        event.timestamp.format("%H:%M:%S"),
        short_session(&event.session_id),
        event.event_type
    );
    if let Some(tool) = &event.tool_name {
        line.push(':');
        line.push_str(tool);
    }
    if let Some(output) = event.observed_output() {
        line.push_str("  -> ");
        line.push_str(&excerpt(&output, OUTPUT_EXCERPT_CHARS));
    }
    line
}

fn short_session(id: &str) -> &str {
    match id.char_indices().nth(8) {
        Some((idx, _)) => &id[..idx],
        None => id,
    }
}

fn excerpt(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let cut: String = text.chars().take(max_chars).collect();
    format!("{}...", cut)
}
