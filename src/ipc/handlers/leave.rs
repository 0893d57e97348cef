use crate::ipc::error::{respond, HandlerErr};
use crate::ipc::helpers::{get_opt_str, get_required_str, id_or_session, require_workspace};
use crate::ipc::types::{AppState, Request};
use crate::leave::{self, LeaveRequest};
use crate::sync;
use serde_json::json;

fn handle_leave_submit(
    state: &mut AppState,
    req: &Request,
) -> Result<serde_json::Value, HandlerErr> {
    let conn = require_workspace(&state.db)?;
    let student_id = id_or_session(conn, &req.params, "studentId")?;
    let class_id = get_required_str(&req.params, "classId")?;
    let reason = get_required_str(&req.params, "reason")?;
    let details = get_opt_str(&req.params, "details").unwrap_or_default();
    let start_date = get_required_str(&req.params, "startDate")?;
    let end_date = get_required_str(&req.params, "endDate")?;

    let application = leave::submit(
        &mut state.store,
        LeaveRequest {
            student_id: &student_id,
            class_id: &class_id,
            reason: &reason,
            details: &details,
            start_date: &start_date,
            end_date: &end_date,
        },
    )?;
    sync::persist(conn, &state.store);
    Ok(json!({ "application": application }))
}

fn handle_leave_decide(
    state: &mut AppState,
    req: &Request,
) -> Result<serde_json::Value, HandlerErr> {
    let conn = require_workspace(&state.db)?;
    let application_id = get_required_str(&req.params, "applicationId")?;
    let decision = leave::parse_decision(&get_required_str(&req.params, "decision")?)?;
    let comment = get_opt_str(&req.params, "comment");
    let application = leave::decide(
        &mut state.store,
        &application_id,
        decision,
        comment.as_deref(),
    )?;
    sync::persist(conn, &state.store);
    Ok(json!({ "application": application }))
}

fn handle_leave_list_for_student(
    state: &mut AppState,
    req: &Request,
) -> Result<serde_json::Value, HandlerErr> {
    let conn = require_workspace(&state.db)?;
    let student_id = id_or_session(conn, &req.params, "studentId")?;
    state.store.require_student(&student_id)?;
    Ok(json!({ "applications": leave::for_student(&state.store, &student_id) }))
}

fn handle_leave_list_for_faculty(
    state: &mut AppState,
    req: &Request,
) -> Result<serde_json::Value, HandlerErr> {
    let conn = require_workspace(&state.db)?;
    let faculty_id = id_or_session(conn, &req.params, "facultyId")?;
    state.store.require_user(&faculty_id)?;
    Ok(json!(leave::for_faculty(&state.store, &faculty_id)))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    let result = match req.method.as_str() {
        "leave.submit" => handle_leave_submit(state, req),
        "leave.decide" => handle_leave_decide(state, req),
        "leave.listForStudent" => handle_leave_list_for_student(state, req),
        "leave.listForFaculty" => handle_leave_list_for_faculty(state, req),
        _ => return None,
    };
    Some(respond(&req.id, result))
}
