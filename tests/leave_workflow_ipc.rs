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

#[test]
fn student_submits_and_faculty_decides_once() {
    let workspace = seeded_workspace("attendanced-leave-workflow");
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
        json!({ "userId": "s1" }),
    );

    let submitted = request_ok(
        &mut stdin,
        &mut reader,
        "3",
        "leave.submit",
        json!({
            "classId": "c1",
            "reason": "Medical",
            "details": "Dental surgery",
            "startDate": "2024-02-05",
            "endDate": "2024-02-06"
        }),
    );
    let app = submitted.get("application").cloned().expect("application");
    let app_id = app.get("id").and_then(|v| v.as_str()).expect("id").to_string();
    assert!(app_id.starts_with("leave-"));
    assert_eq!(app.get("status").and_then(|v| v.as_str()), Some("pending"));
    assert_eq!(app.get("studentId").and_then(|v| v.as_str()), Some("s1"));
    assert_eq!(
        app.get("className").and_then(|v| v.as_str()),
        Some("Data Structures & Algorithms")
    );

    let faculty = request_ok(
        &mut stdin,
        &mut reader,
        "4",
        "leave.listForFaculty",
        json!({ "facultyId": "f1" }),
    );
    let pending = faculty.get("pending").and_then(|v| v.as_array()).cloned().unwrap_or_default();
    assert_eq!(pending.len(), 2);
    assert_eq!(pending[0].get("id").and_then(|v| v.as_str()), Some(app_id.as_str()));
    assert_eq!(pending[1].get("id").and_then(|v| v.as_str()), Some("leave-001"));
    // leave-002 belongs to a class f1 does not teach.
    assert_eq!(faculty.get("all").and_then(|v| v.as_array()).map(|a| a.len()), Some(2));

    let decided = request_ok(
        &mut stdin,
        &mut reader,
        "5",
        "leave.decide",
        json!({ "applicationId": app_id, "decision": "approved", "comment": "ok" }),
    );
    let app = decided.get("application").cloned().expect("application");
    assert_eq!(app.get("status").and_then(|v| v.as_str()), Some("approved"));
    assert_eq!(app.get("facultyComment").and_then(|v| v.as_str()), Some("ok"));
    assert!(app.get("approvedAt").and_then(|v| v.as_str()).is_some());
    assert!(app.get("rejectedAt").is_none());

    let again = request(
        &mut stdin,
        &mut reader,
        "6",
        "leave.decide",
        json!({ "applicationId": app_id, "decision": "rejected" }),
    );
    assert_eq!(
        again.pointer("/error/code").and_then(|v| v.as_str()),
        Some("already_decided")
    );
    assert_eq!(
        again.pointer("/error/details/status").and_then(|v| v.as_str()),
        Some("approved")
    );

    let missing = request(
        &mut stdin,
        &mut reader,
        "7",
        "leave.decide",
        json!({ "applicationId": "leave-nope", "decision": "approved" }),
    );
    assert_eq!(missing.pointer("/error/code").and_then(|v| v.as_str()), Some("not_found"));
    assert_eq!(
        missing.pointer("/error/details/kind").and_then(|v| v.as_str()),
        Some("leaveApplication")
    );

    let mine = request_ok(&mut stdin, &mut reader, "8", "leave.listForStudent", json!({}));
    let mine = mine.get("applications").and_then(|v| v.as_array()).cloned().unwrap_or_default();
    assert_eq!(mine.len(), 1);
    assert_eq!(mine[0].get("status").and_then(|v| v.as_str()), Some("approved"));
    assert_eq!(mine[0].get("facultyComment").and_then(|v| v.as_str()), Some("ok"));

    drop(stdin);
    let _ = child.wait();
    let _ = std::fs::remove_dir_all(workspace);
}

#[test]
fn submit_validates_dates_and_reason() {
    let workspace = seeded_workspace("attendanced-leave-validation");
    let (mut child, mut stdin, mut reader) = spawn_sidecar();
    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "1",
        "workspace.select",
        json!({ "path": workspace.to_string_lossy() }),
    );

    let inverted = request(
        &mut stdin,
        &mut reader,
        "2",
        "leave.submit",
        json!({
            "studentId": "s2",
            "classId": "c1",
            "reason": "Travel",
            "startDate": "2024-03-10",
            "endDate": "2024-03-01"
        }),
    );
    assert_eq!(inverted.pointer("/error/code").and_then(|v| v.as_str()), Some("bad_params"));

    let blank = request(
        &mut stdin,
        &mut reader,
        "3",
        "leave.submit",
        json!({
            "studentId": "s2",
            "classId": "c1",
            "reason": "   ",
            "startDate": "2024-03-01",
            "endDate": "2024-03-01"
        }),
    );
    assert_eq!(blank.pointer("/error/code").and_then(|v| v.as_str()), Some("bad_params"));

    let faculty = request(
        &mut stdin,
        &mut reader,
        "4",
        "leave.submit",
        json!({
            "studentId": "f1",
            "classId": "c1",
            "reason": "Conference",
            "startDate": "2024-03-01",
            "endDate": "2024-03-02"
        }),
    );
    assert_eq!(faculty.pointer("/error/code").and_then(|v| v.as_str()), Some("not_found"));

    let listing = request_ok(
        &mut stdin,
        &mut reader,
        "5",
        "leave.listForStudent",
        json!({ "studentId": "s2" }),
    );
    assert_eq!(
        listing.get("applications").and_then(|v| v.as_array()).map(|a| a.len()),
        Some(0)
    );

    drop(stdin);
    let _ = child.wait();
    let _ = std::fs::remove_dir_all(workspace);
}
