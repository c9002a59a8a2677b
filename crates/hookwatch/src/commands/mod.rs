pub mod audit;
pub mod hook;
pub mod sessions;
pub mod tail;
pub mod version;

use hookwatch_core::Config;
use hookwatch_telemetry::Paths;
use std::path::PathBuf;

/// Resolve configuration from `~/.claude/hookwatch.json`, the environment,
/// and the `--store` flag.
pub fn load_config(store: Option<PathBuf>) -> anyhow::Result<Config> {
    resolve_config(Paths::new(), store)
}

fn resolve_config(paths: std::io::Result<Paths>, store: Option<PathBuf>) -> anyhow::Result<Config> {
    let config_file = match paths {
        Ok(paths) => Some(paths.config_file()),
        Err(err) => {
            tracing::debug!(error = %err, "no home directory; using default config");
            None
        }
    };
    Ok(Config::resolve(config_file.as_deref(), store)?)
}

/// Compact `1h02m03s` style rendering
pub fn format_duration(duration: chrono::Duration) -> String {
    let secs = duration.num_seconds().max(0);
    let (h, m, s) = (secs / 3600, secs % 3600 / 60, secs % 60);
    if h > 0 {
        format!("{}h{:02}m{:02}s", h, m, s)
    } else if m > 0 {
        format!("{}m{:02}s", m, s)
    } else {
        format!("{}s", s)
    }
}

/// `key=count` pairs, largest count first
pub fn format_counts(counts: &std::collections::BTreeMap<String, usize>) -> String {
    let mut pairs: Vec<_> = counts.iter().collect();
    pairs.sort_by(|a, b| b.1.cmp(a.1).then_with(|| a.0.cmp(b.0)));
    pairs
        .iter()
        .map(|(k, v)| format!("{}={}", k, v))
        .collect::<Vec<_>>()
        .join(", ")
}
