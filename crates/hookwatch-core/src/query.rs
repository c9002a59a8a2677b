//! Fixed aggregate views over a record sequence

use crate::aggregate::{fold_sessions, SessionSummary};
use crate::dedup::{detect, DedupPolicy, DuplicateReport};
use hookwatch_telemetry::HookEvent;
use std::convert::Infallible;
use std::fmt;
use std::str::FromStr;

/// Which sessions a view covers
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionScope {
    Id(String),
    /// Session of the most recently appended record
    Latest,
    All,
}

impl FromStr for SessionScope {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "latest" => Self::Latest,
            "all" => Self::All,
            id => Self::Id(id.to_string()),
        })
    }
}

impl fmt::Display for SessionScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Id(id) => f.write_str(id),
            Self::Latest => f.write_str("latest"),
            Self::All => f.write_str("all"),
        }
    }
}

impl SessionScope {
    /// Concrete session id this scope narrows to; `None` means every session.
    /// `Latest` over an empty log resolves to an id nothing matches.
    fn resolve<'a>(&'a self, events: &'a [HookEvent]) -> Option<&'a str> {
        match self {
            Self::Id(id) => Some(id.as_str()),
            Self::Latest => Some(events.last().map(|e| e.session_id.as_str()).unwrap_or("")),
            Self::All => None,
        }
    }
}

/// Session summaries for `scope`, in order of first appearance.
///
/// Empty when the scope names a session the log has never seen.
pub fn summarize(
    events: &[HookEvent],
    scope: &SessionScope,
    token_divisor: usize,
) -> Vec<SessionSummary> {
    match scope.resolve(events) {
        None => fold_sessions(events, token_divisor).into_vec(),
        Some(session) => fold_sessions(
            events.iter().filter(|e| e.session_id == session),
            token_divisor,
        )
        .into_vec(),
    }
}

/// Duplicate-output reports for `scope`.
pub fn detect_duplicates(
    events: &[HookEvent],
    scope: &SessionScope,
    policy: &DedupPolicy,
) -> Vec<DuplicateReport> {
    match scope.resolve(events) {
        None => detect(events, policy),
        Some(session) => detect(events.iter().filter(|e| e.session_id == session), policy),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use hookwatch_telemetry::EventType;

    fn event(session: &str, kind: &str) -> HookEvent {
        HookEvent {
            session_id: session.to_string(),
            timestamp: Utc::now(),
            event_type: EventType::new(kind),
            tool_name: None,
            cwd: "/test".to_string(),
            raw_json: "{}".to_string(),
        }
    }

    #[test]
    fn test_scope_parse() {
        assert_eq!("latest".parse::<SessionScope>().unwrap(), SessionScope::Latest);
        assert_eq!("all".parse::<SessionScope>().unwrap(), SessionScope::All);
        assert_eq!(
            "abc-123".parse::<SessionScope>().unwrap(),
            SessionScope::Id("abc-123".to_string())
        );
        assert_eq!(SessionScope::Latest.to_string(), "latest");
    }

    #[test]
    fn test_summarize_scopes() {
        let events = vec![
            event("a", "SessionStart"),
            event("b", "SessionStart"),
            event("a", "Stop"),
        ];
        assert_eq!(summarize(&events, &SessionScope::All, 4).len(), 2);

        let latest = summarize(&events, &SessionScope::Latest, 4);
        assert_eq!(latest.len(), 1);
        assert_eq!(latest[0].session_id, "a");
        assert_eq!(latest[0].event_count, 2);

        let b = summarize(&events, &SessionScope::Id("b".to_string()), 4);
        assert_eq!(b[0].event_count, 1);

        assert!(summarize(&events, &SessionScope::Id("zzz".to_string()), 4).is_empty());
        assert!(summarize(&[], &SessionScope::Latest, 4).is_empty());
    }

    #[test]
    fn test_detect_duplicates_respects_scope() {
        let events = vec![event("a", "Stop"), event("b", "Stop"), event("b", "Stop")];
        let reports = detect_duplicates(
            &events,
            &SessionScope::Id("b".to_string()),
            &DedupPolicy::default(),
        );
        assert_eq!(reports.len(), 1);
        assert_eq!(reports[0].total_fires, 2);
        assert!(reports[0].zero_output);
    }
}
