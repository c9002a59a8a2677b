//! Per-session summaries folded from the event log

use chrono::{DateTime, Duration, Utc};
use hookwatch_telemetry::{estimate_tokens, HookEvent};
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};

/// Derived view of one session
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSummary {
    pub session_id: String,
    /// Timestamp of the first appended event
    pub start_time: DateTime<Utc>,
    /// Timestamp of the first terminal event, if any
    pub end_time: Option<DateTime<Utc>>,
    /// Latest timestamp seen for the session
    pub last_event_time: DateTime<Utc>,
    pub event_count: usize,
    pub by_event_type: BTreeMap<String, usize>,
    pub by_tool: BTreeMap<String, usize>,
    pub estimated_tokens: usize,
}

impl SessionSummary {
    fn start(event: &HookEvent) -> Self {
        Self {
            session_id: event.session_id.clone(),
            start_time: event.timestamp,
            end_time: None,
            last_event_time: event.timestamp,
            event_count: 0,
            by_event_type: BTreeMap::new(),
            by_tool: BTreeMap::new(),
            estimated_tokens: 0,
        }
    }

    /// No terminal event seen yet
    pub fn is_open(&self) -> bool {
        self.end_time.is_none()
    }

    /// Elapsed time from start to end (or to the last event while open)
    pub fn duration(&self) -> Duration {
        let until = self.end_time.unwrap_or(self.last_event_time);
        (until - self.start_time).max(Duration::zero())
    }
}

/// Single-pass fold of records into session summaries.
///
/// Relies on append order only: the first record of a session fixes its
/// start, the first terminal record fixes its end.
#[derive(Debug)]
pub struct SessionAggregator {
    divisor: usize,
    summaries: Vec<SessionSummary>,
    index: HashMap<String, usize>,
    latest: Option<usize>,
}

impl SessionAggregator {
    pub fn new(token_divisor: usize) -> Self {
        Self {
            divisor: token_divisor,
            summaries: Vec::new(),
            index: HashMap::new(),
            latest: None,
        }
    }

    pub fn push(&mut self, event: &HookEvent) {
        let idx = match self.index.get(&event.session_id) {
            Some(&idx) => idx,
            None => {
                self.summaries.push(SessionSummary::start(event));
                let idx = self.summaries.len() - 1;
                self.index.insert(event.session_id.clone(), idx);
                idx
            }
        };
        let summary = &mut self.summaries[idx];

        summary.event_count += 1;
        *summary
            .by_event_type
            .entry(event.event_type.as_str().to_string())
            .or_default() += 1;
        if let Some(tool) = &event.tool_name {
            *summary.by_tool.entry(tool.clone()).or_default() += 1;
        }
        if event.event_type.is_terminal() && summary.end_time.is_none() {
            summary.end_time = Some(event.timestamp);
        }
        summary.last_event_time = summary.last_event_time.max(event.timestamp);
        // rawJson holds the input and any captured output
        summary.estimated_tokens += estimate_tokens(&event.raw_json, self.divisor);

        self.latest = Some(idx);
    }

    pub fn finish(self) -> SessionTable {
        SessionTable {
            summaries: self.summaries,
            index: self.index,
            latest: self.latest,
        }
    }
}

/// Session summaries in order of first appearance
#[derive(Debug, Default)]
pub struct SessionTable {
    summaries: Vec<SessionSummary>,
    index: HashMap<String, usize>,
    latest: Option<usize>,
}

impl SessionTable {
    pub fn get(&self, session_id: &str) -> Option<&SessionSummary> {
        self.index.get(session_id).map(|&idx| &self.summaries[idx])
    }

    /// Session of the most recently appended record
    pub fn latest(&self) -> Option<&SessionSummary> {
        self.latest.map(|idx| &self.summaries[idx])
    }

    pub fn iter(&self) -> impl Iterator<Item = &SessionSummary> {
        self.summaries.iter()
    }

    pub fn len(&self) -> usize {
        self.summaries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.summaries.is_empty()
    }

    pub fn into_vec(self) -> Vec<SessionSummary> {
        self.summaries
    }
}

/// Fold an ordered record sequence into session summaries.
pub fn fold_sessions<'a>(
    events: impl IntoIterator<Item = &'a HookEvent>,
    token_divisor: usize,
) -> SessionTable {
    let mut aggregator = SessionAggregator::new(token_divisor);
    for event in events {
        aggregator.push(event);
    }
    aggregator.finish()
}
