//! Hook event records and their line codec

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Payload keys that carry hook output when a hook is wrapped.
const OUTPUT_KEYS: &[&str] = &["hook_output", "output", "additional_context"];

/// Payload keys that identify which registered hook command fired.
const HOOK_COMMAND_KEYS: &[&str] = &["hook_id", "hook_command", "hook_name"];

/// Errors raised while decoding a hook payload or a stored record line.
#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    #[error("malformed json: {0}")]
    Json(#[from] serde_json::Error),
    #[error("expected a json object")]
    NotAnObject,
    #[error("missing required field `{0}`")]
    MissingField(&'static str),
    #[error("required field `{0}` is empty")]
    EmptyField(&'static str),
}

/// Hook event name. Open set: unknown names are carried as-is.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EventType(String);

impl EventType {
    pub const PRE_TOOL_USE: &'static str = "PreToolUse";
    pub const POST_TOOL_USE: &'static str = "PostToolUse";
    pub const USER_PROMPT_SUBMIT: &'static str = "UserPromptSubmit";
    pub const SESSION_START: &'static str = "SessionStart";
    pub const SESSION_END: &'static str = "SessionEnd";
    pub const STOP: &'static str = "Stop";
    pub const NOTIFICATION: &'static str = "Notification";
    pub const PRE_COMPACT: &'static str = "PreCompact";
    pub const SUBAGENT_STOP: &'static str = "SubagentStop";

    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// SessionEnd and Stop close a session.
    pub fn is_terminal(&self) -> bool {
        matches!(self.0.as_str(), Self::SESSION_END | Self::STOP)
    }

    /// Whether this name is one the host is known to emit.
    pub fn is_known(&self) -> bool {
        matches!(
            self.0.as_str(),
            Self::PRE_TOOL_USE
                | Self::POST_TOOL_USE
                | Self::USER_PROMPT_SUBMIT
                | Self::SESSION_START
                | Self::SESSION_END
                | Self::STOP
                | Self::NOTIFICATION
                | Self::PRE_COMPACT
                | Self::SUBAGENT_STOP
        )
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for EventType {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

/// One captured hook firing, as stored in the event log
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HookEvent {
    pub session_id: String,
    pub timestamp: DateTime<Utc>,
    pub event_type: EventType,
    pub tool_name: Option<String>,
    #[serde(default)]
    pub cwd: String,
    /// Original hook payload, verbatim
    pub raw_json: String,
}

impl HookEvent {
    /// Normalize one hook stdin payload into a record stamped with `now`.
    ///
    /// Only `session_id` and `hook_event_name` are required. Every other
    /// field, known or not, survives inside `raw_json`.
    pub fn from_hook_input(input: &str, now: DateTime<Utc>) -> Result<Self, DecodeError> {
        let raw = input.trim();
        let value: serde_json::Value = serde_json::from_str(raw)?;
        let obj = value.as_object().ok_or(DecodeError::NotAnObject)?;

        let session_id = required_str(obj, "session_id")?;
        let event_name = required_str(obj, "hook_event_name")?;
        let tool_name = obj
            .get("tool_name")
            .and_then(|v| v.as_str())
            .filter(|s| !s.is_empty())
            .map(str::to_string);
        let cwd = obj
            .get("cwd")
            .and_then(|v| v.as_str())
            .unwrap_or_default()
            .to_string();

        Ok(Self {
            session_id,
            timestamp: now,
            event_type: EventType::new(event_name),
            tool_name,
            cwd,
            raw_json: raw.to_string(),
        })
    }

    /// Parsed original payload, if it is still valid JSON.
    pub fn raw_value(&self) -> Option<serde_json::Value> {
        serde_json::from_str(&self.raw_json).ok()
    }

    /// Normalized hook output carried by the payload, if any.
    ///
    /// Strings are trimmed with inner whitespace collapsed; structured
    /// values are rendered as compact JSON. Empty output counts as none.
    pub fn observed_output(&self) -> Option<String> {
        let value = self.raw_value()?;
        let obj = value.as_object()?;
        let output = OUTPUT_KEYS.iter().find_map(|key| obj.get(*key))?;
        let normalized = match output {
            serde_json::Value::Null => return None,
            serde_json::Value::String(s) => s.split_whitespace().collect::<Vec<_>>().join(" "),
            other => other.to_string(),
        };
        if normalized.is_empty() {
            None
        } else {
            Some(normalized)
        }
    }

    /// Identifier of the hook command that fired, if the payload names one.
    pub fn hook_command(&self) -> Option<String> {
        let value = self.raw_value()?;
        let obj = value.as_object()?;
        HOOK_COMMAND_KEYS
            .iter()
            .find_map(|key| obj.get(*key).and_then(|v| v.as_str()))
            .filter(|s| !s.is_empty())
            .map(str::to_string)
    }

    fn validate(self) -> Result<Self, DecodeError> {
        if self.session_id.is_empty() {
            return Err(DecodeError::EmptyField("sessionId"));
        }
        if self.event_type.as_str().is_empty() {
            return Err(DecodeError::EmptyField("eventType"));
        }
        Ok(self)
    }
}

fn required_str(
    obj: &serde_json::Map<String, serde_json::Value>,
    key: &'static str,
) -> Result<String, DecodeError> {
    let value = obj
        .get(key)
        .and_then(|v| v.as_str())
        .ok_or(DecodeError::MissingField(key))?;
    if value.is_empty() {
        return Err(DecodeError::EmptyField(key));
    }
    Ok(value.to_string())
}

/// Encode a record as one newline-free line.
pub fn encode(event: &HookEvent) -> Result<String, serde_json::Error> {
    // serde_json escapes control characters, so the line never contains '\n'
    serde_json::to_string(event)
}

/// Decode one stored line back into a record.
pub fn decode(line: &str) -> Result<HookEvent, DecodeError> {
    let event: HookEvent = serde_json::from_str(line.trim_end_matches(['\r', '\n']))?;
    event.validate()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn sample_event() -> HookEvent {
        HookEvent {
            session_id: "sess456".to_string(),
            timestamp: Utc.with_ymd_and_hms(2025, 3, 1, 12, 0, 0).unwrap(),
            event_type: EventType::new("PostToolUse"),
            tool_name: Some("Bash".to_string()),
            cwd: "/tmp/project".to_string(),
            raw_json: r#"{"session_id":"sess456","hook_event_name":"PostToolUse","tool_name":"Bash","note":"line1\nline2"}"#.to_string(),
        }
    }

    #[test]
    fn test_encode_decode_roundtrip() {
        let event = sample_event();
        let line = encode(&event).unwrap();
        assert!(!line.contains('\n'));
        assert_eq!(decode(&line).unwrap(), event);
    }

    #[test]
    fn test_roundtrip_keeps_subsecond_timestamp_and_null_tool() {
        let mut event = sample_event();
        event.timestamp = Utc::now();
        event.tool_name = None;
        let line = encode(&event).unwrap();
        assert!(line.contains(r#""toolName":null"#));
        assert_eq!(decode(&line).unwrap(), event);
    }

    #[test]
    fn test_record_uses_camel_case_fields() {
        let line = encode(&sample_event()).unwrap();
        for field in ["sessionId", "timestamp", "eventType", "toolName", "cwd", "rawJson"] {
            assert!(line.contains(&format!("\"{}\"", field)), "missing {}", field);
        }
    }

    #[test]
    fn test_decode_rejects_garbage() {
        assert!(matches!(decode("{not json"), Err(DecodeError::Json(_))));
        assert!(decode("").is_err());
    }

    #[test]
    fn test_decode_rejects_empty_session() {
        let line = r#"{"sessionId":"","timestamp":"2025-01-01T00:00:00Z","eventType":"Stop","toolName":null,"cwd":"","rawJson":"{}"}"#;
        assert!(matches!(decode(line), Err(DecodeError::EmptyField("sessionId"))));
    }

    #[test]
    fn test_decode_tolerates_extra_record_fields() {
        let line = r#"{"sessionId":"s1","timestamp":"2025-01-01T00:00:00Z","eventType":"Stop","toolName":null,"cwd":"/","rawJson":"{}","future":1}"#;
        let event = decode(line).unwrap();
        assert_eq!(event.session_id, "s1");
        assert!(event.event_type.is_terminal());
    }

    #[test]
    fn test_from_hook_input_preserves_unknown_fields() {
        let input = r#"{"session_id":"abc","hook_event_name":"PreToolUse","tool_name":"Edit","cwd":"/work","tool_input":{"file_path":"/a.rs"},"brand_new":true}"#;
        let event = HookEvent::from_hook_input(input, Utc::now()).unwrap();
        assert_eq!(event.session_id, "abc");
        assert_eq!(event.event_type.as_str(), "PreToolUse");
        assert_eq!(event.tool_name.as_deref(), Some("Edit"));
        assert_eq!(event.cwd, "/work");
        assert!(event.raw_json.contains("brand_new"));
        assert!(event.raw_json.contains("file_path"));
    }

    #[test]
    fn test_from_hook_input_optional_fields_absent() {
        let input = r#"{"session_id":"abc","hook_event_name":"SessionStart"}"#;
        let event = HookEvent::from_hook_input(input, Utc::now()).unwrap();
        assert_eq!(event.tool_name, None);
        assert_eq!(event.cwd, "");
    }

    #[test]
    fn test_from_hook_input_missing_required() {
        let no_session = r#"{"hook_event_name":"Stop"}"#;
        assert!(matches!(
            HookEvent::from_hook_input(no_session, Utc::now()),
            Err(DecodeError::MissingField("session_id"))
        ));
        let no_event = r#"{"session_id":"s"}"#;
        assert!(matches!(
            HookEvent::from_hook_input(no_event, Utc::now()),
            Err(DecodeError::MissingField("hook_event_name"))
        ));
        assert!(matches!(
            HookEvent::from_hook_input("[1,2]", Utc::now()),
            Err(DecodeError::NotAnObject)
        ));
    }

    #[test]
    fn test_unknown_event_type_is_kept() {
        let input = r#"{"session_id":"s","hook_event_name":"SomethingNew"}"#;
        let event = HookEvent::from_hook_input(input, Utc::now()).unwrap();
        assert_eq!(event.event_type.as_str(), "SomethingNew");
        assert!(!event.event_type.is_known());
        assert!(!event.event_type.is_terminal());
    }

    #[test]
    fn test_observed_output_normalizes_whitespace() {
        let mut event = sample_event();
        event.raw_json = r#"{"hook_output":"  Reminder:\n\n run   tests  "}"#.to_string();
        assert_eq!(event.observed_output().as_deref(), Some("Reminder: run tests"));

        event.raw_json = r#"{"output":"   "}"#.to_string();
        assert_eq!(event.observed_output(), None);

        event.raw_json = r#"{"tool_input":{}}"#.to_string();
        assert_eq!(event.observed_output(), None);
    }

    #[test]
    fn test_hook_command_lookup() {
        let mut event = sample_event();
        event.raw_json = r#"{"hook_command":"~/.hooks/lint.sh"}"#.to_string();
        assert_eq!(event.hook_command().as_deref(), Some("~/.hooks/lint.sh"));
        event.raw_json = "{}".to_string();
        assert_eq!(event.hook_command(), None);
    }
}
