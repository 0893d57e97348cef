use crate::assistant;
use crate::ipc::error::{respond, HandlerErr};
use crate::ipc::helpers::{get_required_str, id_or_session, require_workspace};
use crate::ipc::types::{AppState, Request};
use serde_json::json;

fn handle_assistant_ask(
    state: &mut AppState,
    req: &Request,
) -> Result<serde_json::Value, HandlerErr> {
    let conn = require_workspace(&state.db)?;
    let student_id = id_or_session(conn, &req.params, "studentId")?;
    let message = get_required_str(&req.params, "message")?;
    let reply = assistant::answer(&mut rand::thread_rng(), &state.store, &student_id, &message)?;
    Ok(json!(reply))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    let result = match req.method.as_str() {
        "assistant.ask" => handle_assistant_ask(state, req),
        _ => return None,
    };
    Some(respond(&req.id, result))
}
