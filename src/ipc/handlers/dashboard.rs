use crate::dashboard;
use crate::ipc::error::{respond, HandlerErr};
use crate::ipc::helpers::{id_or_session, require_workspace};
use crate::ipc::types::{AppState, Request};
use serde_json::json;

fn handle_dashboard_faculty(
    state: &mut AppState,
    req: &Request,
) -> Result<serde_json::Value, HandlerErr> {
    let conn = require_workspace(&state.db)?;
    let faculty_id = id_or_session(conn, &req.params, "facultyId")?;
    let today = chrono::Utc::now().date_naive().to_string();
    Ok(json!(dashboard::faculty(&state.store, &faculty_id, &today)?))
}

fn handle_dashboard_student(
    state: &mut AppState,
    req: &Request,
) -> Result<serde_json::Value, HandlerErr> {
    let conn = require_workspace(&state.db)?;
    let student_id = id_or_session(conn, &req.params, "studentId")?;
    Ok(json!(dashboard::student(&state.store, &student_id)?))
}

fn handle_dashboard_parent(
    state: &mut AppState,
    req: &Request,
) -> Result<serde_json::Value, HandlerErr> {
    let conn = require_workspace(&state.db)?;
    let parent_id = id_or_session(conn, &req.params, "parentId")?;
    Ok(json!(dashboard::parent(&state.store, &parent_id)?))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    let result = match req.method.as_str() {
        "dashboard.faculty" => handle_dashboard_faculty(state, req),
        "dashboard.student" => handle_dashboard_student(state, req),
        "dashboard.parent" => handle_dashboard_parent(state, req),
        _ => return None,
    };
    Some(respond(&req.id, result))
}
