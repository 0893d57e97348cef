use crate::ipc::error::{respond, HandlerErr};
use crate::ipc::helpers::{get_required_str, get_str_array, id_or_session, require_workspace};
use crate::ipc::types::{AppState, Request};
use crate::ledger::{self, SessionInput};
use crate::model::Method;
use crate::sync;
use serde_json::json;

fn handle_attendance_record(
    state: &mut AppState,
    req: &Request,
) -> Result<serde_json::Value, HandlerErr> {
    let conn = require_workspace(&state.db)?;
    let class_id = get_required_str(&req.params, "classId")?;
    let present = get_str_array(&req.params, "present", true)?;
    let absent = get_str_array(&req.params, "absent", true)?;
    let late = get_str_array(&req.params, "late", false)?;
    let raw_method = get_required_str(&req.params, "method")?;
    let method = Method::parse(&raw_method).ok_or_else(|| {
        HandlerErr::bad_params(format!("method must be ai or manual, got {}", raw_method))
    })?;
    let recorder_id = id_or_session(conn, &req.params, "recorderId")?;

    let outcome = ledger::record_session(
        &mut state.store,
        SessionInput {
            class_id: &class_id,
            present: &present,
            absent: &absent,
            late: &late,
            method,
            recorder_id: &recorder_id,
        },
        state.settings.coins.attendance_award,
    )?;
    sync::persist(conn, &state.store);
    Ok(json!(outcome))
}

fn handle_attendance_student(
    state: &mut AppState,
    req: &Request,
) -> Result<serde_json::Value, HandlerErr> {
    let conn = require_workspace(&state.db)?;
    let student_id = id_or_session(conn, &req.params, "studentId")?;
    state.store.require_student(&student_id)?;
    let stats = ledger::compute_attendance(&state.store, &student_id);
    Ok(json!({ "studentId": student_id, "stats": stats }))
}

fn handle_attendance_history(
    state: &mut AppState,
    req: &Request,
) -> Result<serde_json::Value, HandlerErr> {
    let conn = require_workspace(&state.db)?;
    let student_id = id_or_session(conn, &req.params, "studentId")?;
    state.store.require_student(&student_id)?;
    Ok(json!({ "rows": ledger::student_history(&state.store, &student_id) }))
}

fn handle_attendance_class_history(
    state: &mut AppState,
    req: &Request,
) -> Result<serde_json::Value, HandlerErr> {
    require_workspace(&state.db)?;
    let class_id = get_required_str(&req.params, "classId")?;
    state.store.require_class(&class_id)?;
    Ok(json!({ "records": ledger::class_history(&state.store, &class_id) }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    let result = match req.method.as_str() {
        "attendance.record" => handle_attendance_record(state, req),
        "attendance.student" => handle_attendance_student(state, req),
        "attendance.history" => handle_attendance_history(state, req),
        "attendance.classHistory" => handle_attendance_class_history(state, req),
        _ => return None,
    };
    Some(respond(&req.id, result))
}
