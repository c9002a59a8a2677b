mod common;

use common::{hookwatch, run_hook};
use hookwatch_telemetry::EventStore;
use std::collections::HashMap;
use std::process::Stdio;

#[test]
fn test_concurrent_hook_processes_never_interleave() {
    let temp = tempfile::TempDir::new().unwrap();
    let store_path = temp.path().join("events.jsonl");
    let writers = 6;
    let per_writer = 15;

    std::thread::scope(|scope| {
        for w in 0..writers {
            let home = temp.path();
            let store_path = &store_path;
            scope.spawn(move || {
                for seq in 0..per_writer {
                    let payload = serde_json::json!({
                        "session_id": format!("writer-{w}"),
                        "hook_event_name": "PostToolUse",
                        "tool_name": "Bash",
                        "seq": seq,
                        "padding": "x".repeat(2048),
                    });
                    let output = run_hook(home, store_path, &payload.to_string());
                    assert!(output.status.success());
                    assert!(output.stdout.is_empty());
                }
            });
        }
    });

    let snapshot = EventStore::new(&store_path).read_all().unwrap();
    assert_eq!(snapshot.skipped, 0);
    assert_eq!(snapshot.events.len(), writers * per_writer);

    let mut last_seq: HashMap<String, i64> = HashMap::new();
    for event in &snapshot.events {
        let seq = event.raw_value().unwrap()["seq"].as_i64().unwrap();
        let previous = last_seq.insert(event.session_id.clone(), seq);
        assert_eq!(previous.map_or(0, |p| p + 1), seq);
    }
}

#[test]
fn test_invalid_payload_exits_cleanly_and_appends_nothing() {
    let temp = tempfile::TempDir::new().unwrap();
    let store_path = temp.path().join("events.jsonl");

    for payload in ["{not json", "", r#"{"session_id":"s1"}"#] {
        let output = run_hook(temp.path(), &store_path, payload);
        assert!(output.status.success());
        assert!(output.stdout.is_empty());
    }

    assert!(!store_path.exists());
    let diagnostics = std::fs::read_to_string(temp.path().join("hookwatch.log")).unwrap();
    assert!(diagnostics.contains("hook event not recorded"));
}

#[test]
fn test_invalid_config_exits_cleanly_and_appends_nothing() {
    let temp = tempfile::TempDir::new().unwrap();
    let claude_dir = temp.path().join(".claude");
    std::fs::create_dir_all(&claude_dir).unwrap();
    std::fs::write(claude_dir.join("hookwatch.json"), r#"{"dedupThreshold": 5}"#).unwrap();
    let store_path = temp.path().join("events.jsonl");

    let output = run_hook(
        temp.path(),
        &store_path,
        r#"{"session_id":"s1","hook_event_name":"Stop"}"#,
    );
    assert!(output.status.success());
    assert!(output.stdout.is_empty());
    assert!(!store_path.exists());
}

#[test]
fn test_store_from_config_file_and_cwd_fallback() {
    let temp = tempfile::TempDir::new().unwrap();
    let claude_dir = temp.path().join(".claude");
    std::fs::create_dir_all(&claude_dir).unwrap();
    let store_path = temp.path().join("data").join("events.jsonl");
    std::fs::write(
        claude_dir.join("hookwatch.json"),
        serde_json::json!({ "storePath": store_path }).to_string(),
    )
    .unwrap();
    let workdir = temp.path().join("project");
    std::fs::create_dir_all(&workdir).unwrap();

    let mut child = hookwatch(temp.path())
        .arg("hook")
        .current_dir(&workdir)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .spawn()
        .unwrap();
    {
        use std::io::Write;
        let mut stdin = child.stdin.take().unwrap();
        stdin
            .write_all(br#"{"session_id":"s1","hook_event_name":"SessionStart"}"#)
            .unwrap();
    }
    let output = child.wait_with_output().unwrap();
    assert!(output.status.success());
    assert!(output.stdout.is_empty());

    let events = EventStore::new(&store_path).read_all().unwrap().events;
    assert_eq!(events.len(), 1);
    assert_eq!(
        std::fs::canonicalize(&events[0].cwd).unwrap(),
        std::fs::canonicalize(&workdir).unwrap()
    );
}
