use crate::ipc::error::{respond, HandlerErr};
use crate::ipc::helpers::{get_required_str, get_required_u64, id_or_session, require_workspace};
use crate::ipc::types::{AppState, Request};
use crate::ledger::{self, SessionInput};
use crate::model::Method;
use crate::sync;
use serde_json::json;
use std::time::Duration;

fn handle_detect_start(
    state: &mut AppState,
    req: &Request,
) -> Result<serde_json::Value, HandlerErr> {
    require_workspace(&state.db)?;
    let class_id = get_required_str(&req.params, "classId")?;
    state.store.require_class(&class_id)?;
    let roster: Vec<String> = state
        .store
        .roster(&class_id)
        .into_iter()
        .map(|u| u.id.clone())
        .collect();
    let delay_ms = state.settings.detection.delay_ms;
    let generation = state.detector.start(
        &mut rand::thread_rng(),
        &class_id,
        &roster,
        state.settings.detection.hit_rate,
        Duration::from_millis(delay_ms),
    );
    Ok(json!({
        "generation": generation,
        "classId": class_id,
        "rosterSize": roster.len(),
        "delayMs": delay_ms,
    }))
}

fn handle_detect_poll(
    state: &mut AppState,
    req: &Request,
) -> Result<serde_json::Value, HandlerErr> {
    require_workspace(&state.db)?;
    let generation = get_required_u64(&req.params, "generation")?;
    let mut out = json!(state.detector.poll(generation));
    out["generation"] = json!(generation);
    Ok(out)
}

/// Saves the buffered outcome as an `ai` session. Stale or unfinished
/// generations are refused and leave the buffer in place.
fn handle_detect_commit(
    state: &mut AppState,
    req: &Request,
) -> Result<serde_json::Value, HandlerErr> {
    let conn = require_workspace(&state.db)?;
    let generation = get_required_u64(&req.params, "generation")?;
    let recorder_id = id_or_session(conn, &req.params, "recorderId")?;
    state.store.require_user(&recorder_id)?;

    let detection = state.detector.take(generation)?;
    let outcome = ledger::record_session(
        &mut state.store,
        SessionInput {
            class_id: &detection.class_id,
            present: &detection.present,
            absent: &detection.absent,
            late: &[],
            method: Method::Ai,
            recorder_id: &recorder_id,
        },
        state.settings.coins.attendance_award,
    )?;
    sync::persist(conn, &state.store);
    Ok(json!(outcome))
}

fn handle_detect_cancel(
    state: &mut AppState,
    _req: &Request,
) -> Result<serde_json::Value, HandlerErr> {
    require_workspace(&state.db)?;
    let cancelled = state.detector.cancel();
    Ok(json!({ "cancelled": cancelled, "latest": state.detector.latest() }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    let result = match req.method.as_str() {
        "detect.start" => handle_detect_start(state, req),
        "detect.poll" => handle_detect_poll(state, req),
        "detect.commit" => handle_detect_commit(state, req),
        "detect.cancel" => handle_detect_cancel(state, req),
        _ => return None,
    };
    Some(respond(&req.id, result))
}
