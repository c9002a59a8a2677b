use super::{format_duration, load_config};
use hookwatch_core::{fold_sessions, SessionSummary};
use std::path::PathBuf;

pub fn run(store: Option<PathBuf>, limit: Option<usize>, json: bool) -> anyhow::Result<()> {
    let config = load_config(store)?;
    let snapshot = config.open_store().read_all()?;
    if snapshot.skipped > 0 {
        tracing::warn!(skipped = snapshot.skipped, "skipped malformed records");
    }

    let sessions = fold_sessions(&snapshot.events, config.token_heuristic_divisor).into_vec();
    let shown = most_recent(&sessions, limit);

    if json {
        println!("{}", serde_json::to_string_pretty(shown)?);
    } else {
        println!("{}", build_listing(shown));
    }
    Ok(())
}

/// Tail of the first-appearance ordering, so the newest session prints last
fn most_recent(sessions: &[SessionSummary], limit: Option<usize>) -> &[SessionSummary] {
    match limit {
        Some(n) if n < sessions.len() => &sessions[sessions.len() - n..],
        _ => sessions,
    }
}

fn build_listing(sessions: &[SessionSummary]) -> String {
    if sessions.is_empty() {
        return "No sessions recorded yet.".to_string();
    }

    let width = sessions
        .iter()
        .map(|s| s.session_id.len())
        .max()
        .unwrap_or(0);
    sessions
        .iter()
        .map(|s| {
            format!(
                "{:<width$}  {}  {:>8}  {:>5} events  ~{} tokens{}",
                s.session_id,
                s.start_time.format("%Y-%m-%d %H:%M"),
                format_duration(s.duration()),
                s.event_count,
                s.estimated_tokens,
                if s.is_open() { "  (open)" } else { "" },
                width = width
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use hookwatch_telemetry::{EventType, HookEvent};

    fn event(session: &str, kind: &str, secs: i64) -> HookEvent {
        HookEvent {
            session_id: session.to_string(),
            timestamp: Utc.timestamp_opt(1_735_732_800 + secs, 0).unwrap(),
            event_type: EventType::new(kind),
            tool_name: None,
            cwd: "/work".to_string(),
            raw_json: "{}".to_string(),
        }
    }

    #[test]
    fn test_listing_empty() {
        assert_eq!(build_listing(&[]), "No sessions recorded yet.");
    }

    #[test]
    fn test_listing_marks_open_sessions() {
        let events = vec![
            event("alpha", "SessionStart", 0),
            event("b", "SessionStart", 5),
            event("alpha", "SessionEnd", 65),
        ];
        let sessions = fold_sessions(&events, 4).into_vec();
        let listing = build_listing(&sessions);
        let lines: Vec<&str> = listing.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].starts_with("alpha  "));
        assert!(lines[0].contains("1m05s"));
        assert!(!lines[0].ends_with("(open)"));
        assert!(lines[1].starts_with("b      "));
        assert!(lines[1].ends_with("(open)"));
    }

    #[test]
    fn test_most_recent_keeps_newest() {
        let events: Vec<_> = (0..4).map(|i| event(&format!("s{i}"), "Stop", i)).collect();
        let sessions = fold_sessions(&events, 4).into_vec();
        let ids: Vec<_> = most_recent(&sessions, Some(2))
            .iter()
            .map(|s| s.session_id.as_str())
            .collect();
        assert_eq!(ids, vec!["s2", "s3"]);
        assert_eq!(most_recent(&sessions, Some(10)).len(), 4);
        assert_eq!(most_recent(&sessions, None).len(), 4);
    }
}
