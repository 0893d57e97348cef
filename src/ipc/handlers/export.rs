use crate::export;
use crate::ipc::error::{respond, HandlerErr};
use crate::ipc::helpers::{get_opt_str, id_or_session, require_workspace};
use crate::ipc::types::{AppState, Request};
use serde_json::json;
use std::path::PathBuf;
use tracing::info;

fn write_if_requested(req: &Request, contents: &str) -> Result<Option<String>, HandlerErr> {
    let Some(out) = get_opt_str(&req.params, "outPath") else {
        return Ok(None);
    };
    let path = PathBuf::from(&out);
    export::write_out(&path, contents).map_err(|e| HandlerErr::infra("io_failed", e))?;
    info!(path = %path.display(), bytes = contents.len(), "export written");
    Ok(Some(out))
}

fn handle_export_attendance_csv(
    state: &mut AppState,
    req: &Request,
) -> Result<serde_json::Value, HandlerErr> {
    require_workspace(&state.db)?;
    let csv = export::attendance_csv(&state.store)
        .map_err(|e| HandlerErr::infra("export_failed", e))?;
    let out_path = write_if_requested(req, &csv)?;
    Ok(json!({ "csv": csv, "outPath": out_path }))
}

fn handle_export_student_data(
    state: &mut AppState,
    req: &Request,
) -> Result<serde_json::Value, HandlerErr> {
    let conn = require_workspace(&state.db)?;
    let student_id = id_or_session(conn, &req.params, "studentId")?;
    let dump = export::student_dump(&state.store, &student_id)?;
    let text = serde_json::to_string_pretty(&dump)
        .map_err(|e| HandlerErr::new("export_failed", e.to_string()))?;
    let out_path = write_if_requested(req, &text)?;
    Ok(json!({ "data": dump, "outPath": out_path }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    let result = match req.method.as_str() {
        "export.attendanceCsv" => handle_export_attendance_csv(state, req),
        "export.studentData" => handle_export_student_data(state, req),
        _ => return None,
    };
    Some(respond(&req.id, result))
}
