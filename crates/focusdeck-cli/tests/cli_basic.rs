//! Basic CLI E2E tests.
//!
//! Each test runs the built binary against its own temporary data directory.

use std::path::Path;
use std::process::Command;

use serde_json::Value;

/// Run a CLI command and return (stdout, stderr, exit code).
fn run_cli(data_dir: &Path, args: &[&str]) -> (String, String, i32) {
    let output = Command::new(env!("CARGO_BIN_EXE_focusdeck"))
        .env("FOCUSDECK_DATA_DIR", data_dir)
        .env("RUST_LOG", "warn")
        .args(args)
        .output()
        .expect("Failed to execute CLI command");

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    let code = output.status.code().unwrap_or(-1);

    (stdout, stderr, code)
}

fn run_ok(data_dir: &Path, args: &[&str]) -> String {
    let (stdout, stderr, code) = run_cli(data_dir, args);
    assert_eq!(code, 0, "{args:?} failed: {stderr}");
    stdout
}

/// Parse stdout holding one or more pretty-printed JSON documents.
fn json_docs(stdout: &str) -> Vec<Value> {
    serde_json::Deserializer::from_str(stdout)
        .into_iter::<Value>()
        .collect::<Result<_, _>>()
        .expect("stdout is not a JSON stream")
}

fn add_task(data_dir: &Path, text: &str) -> String {
    let stdout = run_ok(data_dir, &["task", "add", text]);
    let first = stdout.lines().next().unwrap();
    first.strip_prefix("Task created: ").unwrap().trim().to_string()
}

#[test]
fn timer_start_without_task_prints_notice() {
    let dir = tempfile::tempdir().unwrap();
    let (stdout, stderr, code) = run_cli(dir.path(), &["timer", "start"]);
    assert_eq!(code, 1);
    assert!(stdout.is_empty());
    assert!(stderr.contains("Please select a task before starting a Pomodoro!"));

    let status = json_docs(&run_ok(dir.path(), &["timer", "status"]));
    assert_eq!(status[0]["type"], "StateSnapshot");
    assert_eq!(status[0]["phase"], "idle");
    assert_eq!(status[0]["remaining_seconds"], 1500);
}

#[test]
fn select_start_pause_reset_cycle() {
    let dir = tempfile::tempdir().unwrap();
    let id = add_task(dir.path(), "Write report");

    let switched = json_docs(&run_ok(dir.path(), &["task", "select", &id]));
    assert_eq!(switched[0]["type"], "TaskSwitched");
    assert_eq!(switched[0]["to_task_id"], id.as_str());

    let started = json_docs(&run_ok(dir.path(), &["timer", "start"]));
    assert_eq!(started[0]["type"], "TimerStarted");
    assert_eq!(started[0]["task_text"], "Write report");

    let status = json_docs(&run_ok(dir.path(), &["timer", "status"]));
    assert_eq!(status[0]["phase"], "running");
    assert_eq!(status[0]["task_id"], id.as_str());
    assert!(status[0]["remaining_seconds"].as_u64().unwrap() <= 1500);

    let paused = json_docs(&run_ok(dir.path(), &["timer", "pause"]));
    assert_eq!(paused[0]["type"], "TimerPaused");

    let reset = json_docs(&run_ok(dir.path(), &["timer", "reset"]));
    assert_eq!(reset[0]["type"], "TimerReset");
    assert_eq!(reset[0]["remaining_seconds"], 1500);
}

#[test]
fn task_lifecycle() {
    let dir = tempfile::tempdir().unwrap();
    let id = add_task(dir.path(), "Review PR");

    run_ok(dir.path(), &["task", "done", &id]);
    let tasks = json_docs(&run_ok(dir.path(), &["task", "list"]));
    assert_eq!(tasks[0][0]["completed"], true);
    assert_eq!(tasks[0][0]["focus_time"], 0);

    run_ok(dir.path(), &["task", "undo", &id]);
    run_ok(dir.path(), &["task", "select", &id]);
    run_ok(dir.path(), &["task", "delete", &id]);
    let tasks = json_docs(&run_ok(dir.path(), &["task", "list"]));
    assert_eq!(tasks[0].as_array().unwrap().len(), 0);

    // The selection went with the task.
    let (_, stderr, code) = run_cli(dir.path(), &["timer", "start"]);
    assert_eq!(code, 1);
    assert!(stderr.contains("Please select a task"));
}

#[test]
fn blank_task_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let (_, stderr, code) = run_cli(dir.path(), &["task", "add", "   "]);
    assert_eq!(code, 1);
    assert!(stderr.contains("error:"));
}

#[test]
fn select_unknown_task_fails() {
    let dir = tempfile::tempdir().unwrap();
    let (_, stderr, code) = run_cli(dir.path(), &["task", "select", "nope"]);
    assert_eq!(code, 1);
    assert!(stderr.contains("nope"));
}

#[test]
fn notes_add_list_delete() {
    let dir = tempfile::tempdir().unwrap();
    let note = json_docs(&run_ok(dir.path(), &["note", "add", "# Standup\n- shipped sink"]));
    let id = note[0]["id"].as_i64().unwrap();

    let notes = json_docs(&run_ok(dir.path(), &["note", "list"]));
    assert_eq!(notes[0][0]["content"], "# Standup\n- shipped sink");

    let stdout = run_ok(dir.path(), &["note", "delete", &id.to_string()]);
    assert!(stdout.contains("Note deleted"));
    let notes = json_docs(&run_ok(dir.path(), &["note", "list"]));
    assert!(notes[0].as_array().unwrap().is_empty());
}

#[test]
fn config_get_set_reset() {
    let dir = tempfile::tempdir().unwrap();
    assert_eq!(
        run_ok(dir.path(), &["config", "get", "focus.flush_interval_seconds"]).trim(),
        "60"
    );

    run_ok(dir.path(), &["config", "set", "focus.flush_interval_seconds", "1"]);
    assert_eq!(
        run_ok(dir.path(), &["config", "get", "focus.flush_interval_seconds"]).trim(),
        "1"
    );

    let (_, _, code) = run_cli(dir.path(), &["config", "set", "focus.flush_interval_seconds", "30"]);
    assert_eq!(code, 1);
    let (_, _, code) = run_cli(dir.path(), &["config", "get", "no.such.key"]);
    assert_eq!(code, 1);

    run_ok(dir.path(), &["config", "reset"]);
    let list: Value = serde_json::from_str(&run_ok(dir.path(), &["config", "list"])).unwrap();
    assert_eq!(list["focus"]["flush_interval_seconds"], 60);
    assert_eq!(list["sink"]["kind"], "local");
}
