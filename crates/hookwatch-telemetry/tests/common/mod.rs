use chrono::Utc;
use hookwatch_telemetry::{EventType, HookEvent};

pub fn sample_event(session: &str, kind: &str, payload: serde_json::Value) -> HookEvent {
    HookEvent {
        session_id: session.to_string(),
        timestamp: Utc::now(),
        event_type: EventType::new(kind),
        tool_name: None,
        cwd: "/test".to_string(),
        raw_json: payload.to_string(),
    }
}
