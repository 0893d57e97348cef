use serde_json::json;
use std::io::{BufRead, BufReader, Write};
use std::path::PathBuf;
use std::process::{Child, ChildStdin, ChildStdout, Command, Stdio};
use std::time::{SystemTime, UNIX_EPOCH};

fn fixture_path(rel: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join(rel)
}

fn temp_dir(prefix: &str) -> PathBuf {
    let p = std::env::temp_dir().join(format!(
        "{}-{}",
        prefix,
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("clock")
            .as_nanos()
    ));
    std::fs::create_dir_all(&p).expect("create temp dir");
    p
}

fn seeded_workspace(prefix: &str) -> PathBuf {
    let ws = temp_dir(prefix);
    std::fs::copy(fixture_path("fixtures/fakeData.json"), ws.join("fakeData.json"))
        .expect("copy fixture");
    ws
}

fn spawn_sidecar() -> (Child, ChildStdin, BufReader<ChildStdout>) {
    let exe = env!("CARGO_BIN_EXE_attendanced");
    let mut child = Command::new(exe)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .spawn()
        .expect("spawn attendanced");
    let stdin = child.stdin.take().expect("child stdin");
    let stdout = child.stdout.take().expect("child stdout");
    (child, stdin, BufReader::new(stdout))
}

fn request(
    stdin: &mut ChildStdin,
    reader: &mut BufReader<ChildStdout>,
    id: &str,
    method: &str,
    params: serde_json::Value,
) -> serde_json::Value {
    let payload = json!({
        "id": id,
        "method": method,
        "params": params,
    });
    writeln!(stdin, "{}", payload).expect("write request");
    stdin.flush().expect("flush request");

    let mut line = String::new();
    reader.read_line(&mut line).expect("read response line");
    assert!(!line.trim().is_empty(), "empty response for {}", method);
    let value: serde_json::Value = serde_json::from_str(line.trim()).expect("parse response json");
    assert_eq!(value.get("id").and_then(|v| v.as_str()), Some(id));
    value
}

fn request_ok(
    stdin: &mut ChildStdin,
    reader: &mut BufReader<ChildStdout>,
    id: &str,
    method: &str,
    params: serde_json::Value,
) -> serde_json::Value {
    let value = request(stdin, reader, id, method, params);
    assert!(
        value.get("ok").and_then(|v| v.as_bool()).unwrap_or(false),
        "{} failed: {}",
        method,
        value
            .get("error")
            .and_then(|e| e.get("message"))
            .and_then(|v| v.as_str())
            .unwrap_or("unknown error")
    );
    value.get("result").cloned().unwrap_or_else(|| json!({}))
}

fn request_err_code(
    stdin: &mut ChildStdin,
    reader: &mut BufReader<ChildStdout>,
    id: &str,
    method: &str,
    params: serde_json::Value,
) -> String {
    let value = request(stdin, reader, id, method, params);
    assert_eq!(value.get("ok").and_then(|v| v.as_bool()), Some(false), "{} should fail", method);
    value
        .get("error")
        .and_then(|e| e.get("code"))
        .and_then(|v| v.as_str())
        .unwrap_or("")
        .to_string()
}

#[test]
fn manual_session_credits_present_students_and_updates_stats() {
    let workspace = seeded_workspace("attendanced-session-coins");
    let (mut child, mut stdin, mut reader) = spawn_sidecar();

    let selected = request_ok(
        &mut stdin,
        &mut reader,
        "1",
        "workspace.select",
        json!({ "path": workspace.to_string_lossy() }),
    );
    assert_eq!(selected.get("restored").and_then(|v| v.as_bool()), Some(false));
    assert_eq!(
        selected.pointer("/counts/attendanceRecords").and_then(|v| v.as_u64()),
        Some(3)
    );

    let out = request_ok(
        &mut stdin,
        &mut reader,
        "2",
        "attendance.record",
        json!({
            "classId": "c1",
            "present": ["s1", "s2"],
            "absent": ["s3"],
            "method": "manual",
            "recorderId": "f1"
        }),
    );
    assert_eq!(out.get("coinsAwarded").and_then(|v| v.as_i64()), Some(10));
    assert_eq!(out.pointer("/record/method").and_then(|v| v.as_str()), Some("manual"));
    assert!(out
        .pointer("/record/id")
        .and_then(|v| v.as_str())
        .is_some_and(|id| id.starts_with("att-")));

    let s1 = request_ok(
        &mut stdin,
        &mut reader,
        "3",
        "coins.balance",
        json!({ "studentId": "s1" }),
    );
    assert_eq!(s1.get("balance").and_then(|v| v.as_i64()), Some(125));
    let s3 = request_ok(
        &mut stdin,
        &mut reader,
        "4",
        "coins.balance",
        json!({ "studentId": "s3" }),
    );
    assert_eq!(s3.get("balance").and_then(|v| v.as_i64()), Some(60));

    let stats = request_ok(
        &mut stdin,
        &mut reader,
        "5",
        "attendance.student",
        json!({ "studentId": "s1" }),
    );
    assert_eq!(
        stats.get("stats"),
        Some(&json!({
            "present": 3,
            "absent": 0,
            "late": 0,
            "attended": 3,
            "total": 3,
            "percentage": 100
        }))
    );

    // Karan: absent, late, absent.
    let stats = request_ok(
        &mut stdin,
        &mut reader,
        "6",
        "attendance.student",
        json!({ "studentId": "s3" }),
    );
    assert_eq!(
        stats.get("stats"),
        Some(&json!({
            "present": 0,
            "absent": 2,
            "late": 1,
            "attended": 1,
            "total": 3,
            "percentage": 33
        }))
    );

    let history = request_ok(
        &mut stdin,
        &mut reader,
        "7",
        "coins.history",
        json!({ "studentId": "s1" }),
    );
    let txs = history
        .get("transactions")
        .and_then(|v| v.as_array())
        .cloned()
        .unwrap_or_default();
    assert_eq!(txs[0].get("source").and_then(|v| v.as_str()), Some("attendance"));
    assert_eq!(txs[0].get("classId").and_then(|v| v.as_str()), Some("c1"));
    let sum: i64 = txs.iter().filter_map(|t| t.get("amount").and_then(|v| v.as_i64())).sum();
    assert_eq!(sum, 125);

    drop(stdin);
    let _ = child.wait();
    let _ = std::fs::remove_dir_all(workspace);
}

#[test]
fn invalid_sessions_are_rejected_without_side_effects() {
    let workspace = seeded_workspace("attendanced-session-invalid");
    let (mut child, mut stdin, mut reader) = spawn_sidecar();

    let code = request_err_code(
        &mut stdin,
        &mut reader,
        "0",
        "attendance.record",
        json!({ "classId": "c1", "present": [], "absent": [], "method": "manual" }),
    );
    assert_eq!(code, "no_workspace");

    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "1",
        "workspace.select",
        json!({ "path": workspace.to_string_lossy() }),
    );

    let code = request_err_code(
        &mut stdin,
        &mut reader,
        "2",
        "attendance.record",
        json!({
            "classId": "c1",
            "present": ["s1"],
            "absent": ["s1"],
            "method": "manual",
            "recorderId": "f1"
        }),
    );
    assert_eq!(code, "overlapping_sets");

    let code = request_err_code(
        &mut stdin,
        &mut reader,
        "3",
        "attendance.record",
        json!({
            "classId": "c1",
            "present": ["s1", "s4"],
            "absent": [],
            "method": "manual",
            "recorderId": "f1"
        }),
    );
    assert_eq!(code, "not_on_roster");

    let code = request_err_code(
        &mut stdin,
        &mut reader,
        "4",
        "attendance.record",
        json!({
            "classId": "c1",
            "present": ["s1"],
            "absent": [],
            "method": "telepathy",
            "recorderId": "f1"
        }),
    );
    assert_eq!(code, "bad_params");

    // No recorderId and nobody logged in.
    let code = request_err_code(
        &mut stdin,
        &mut reader,
        "5",
        "attendance.record",
        json!({ "classId": "c1", "present": ["s1"], "absent": [], "method": "manual" }),
    );
    assert_eq!(code, "bad_params");

    let history = request_ok(
        &mut stdin,
        &mut reader,
        "6",
        "attendance.classHistory",
        json!({ "classId": "c1" }),
    );
    assert_eq!(
        history.get("records").and_then(|v| v.as_array()).map(|a| a.len()),
        Some(2)
    );
    let s1 = request_ok(
        &mut stdin,
        &mut reader,
        "7",
        "coins.balance",
        json!({ "studentId": "s1" }),
    );
    assert_eq!(s1.get("balance").and_then(|v| v.as_i64()), Some(120));

    drop(stdin);
    let _ = child.wait();
    let _ = std::fs::remove_dir_all(workspace);
}

#[test]
fn session_user_is_the_default_recorder() {
    let workspace = seeded_workspace("attendanced-session-recorder");
    let (mut child, mut stdin, mut reader) = spawn_sidecar();
    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "1",
        "workspace.select",
        json!({ "path": workspace.to_string_lossy() }),
    );
    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "2",
        "session.login",
        json!({ "userId": "f1" }),
    );
    let out = request_ok(
        &mut stdin,
        &mut reader,
        "3",
        "attendance.record",
        json!({ "classId": "c1", "present": [], "absent": ["s1"], "late": ["s2"], "method": "ai" }),
    );
    assert_eq!(out.pointer("/record/savedBy").and_then(|v| v.as_str()), Some("f1"));
    assert_eq!(out.get("coinsAwarded").and_then(|v| v.as_i64()), Some(5));

    let rows = request_ok(
        &mut stdin,
        &mut reader,
        "4",
        "attendance.history",
        json!({ "studentId": "s2" }),
    );
    let rows = rows.get("rows").and_then(|v| v.as_array()).cloned().unwrap_or_default();
    assert_eq!(rows.len(), 3);
    assert_eq!(rows[0].get("status").and_then(|v| v.as_str()), Some("Late"));
    assert_eq!(rows[0].get("method").and_then(|v| v.as_str()), Some("ai"));

    drop(stdin);
    let _ = child.wait();
    let _ = std::fs::remove_dir_all(workspace);
}
