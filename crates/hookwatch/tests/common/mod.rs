use std::io::Write;
use std::path::Path;
use std::process::{Command, Output, Stdio};

/// The real executable, isolated from the user's home and environment
pub fn hookwatch(home: &Path) -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_hookwatch"));
    cmd.env("HOME", home)
        .env_remove("HOOKWATCH_STORE")
        .env_remove("RUST_LOG");
    cmd
}

/// Pipe one payload into `hookwatch --store <store> hook`.
pub fn run_hook(home: &Path, store: &Path, payload: &str) -> Output {
    let mut child = hookwatch(home)
        .arg("--store")
        .arg(store)
        .arg("hook")
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .unwrap();
    child
        .stdin
        .take()
        .unwrap()
        .write_all(payload.as_bytes())
        .unwrap();
    child.wait_with_output().unwrap()
}

pub fn lint_payload(session: &str, output: &str) -> String {
    serde_json::json!({
        "session_id": session,
        "hook_event_name": "PostToolUse",
        "tool_name": "Edit",
        "hook_command": "lint.sh",
        "hook_output": output,
    })
    .to_string()
}
