use crate::config::Settings;
use crate::db;
use crate::detect::Detector;
use crate::ipc::error::{respond, HandlerErr};
use crate::ipc::helpers::{get_opt_str, get_required_str, require_workspace};
use crate::ipc::types::{AppState, Request};
use crate::sync;
use serde_json::json;
use std::path::PathBuf;
use tracing::info;

fn handle_health(state: &mut AppState, _req: &Request) -> Result<serde_json::Value, HandlerErr> {
    Ok(json!({
        "version": env!("CARGO_PKG_VERSION"),
        "workspacePath": state.workspace.as_ref().map(|p| p.to_string_lossy().to_string())
    }))
}

fn handle_workspace_select(
    state: &mut AppState,
    req: &Request,
) -> Result<serde_json::Value, HandlerErr> {
    let path = PathBuf::from(get_required_str(&req.params, "path")?);
    let settings =
        Settings::load(&path).map_err(|e| HandlerErr::infra("config_invalid", e))?;
    let conn = db::open_db(&path).map_err(|e| HandlerErr::infra("db_open_failed", e))?;
    let fixture_path = get_opt_str(&req.params, "fixturePath")
        .map(PathBuf::from)
        .unwrap_or_else(|| settings.fixture_path(&path));

    let (store, restored) = sync::open_store(&conn, &fixture_path);
    let counts = store.counts();
    info!(
        workspace = %path.display(),
        fixture = %fixture_path.display(),
        restored,
        "workspace selected"
    );

    state.workspace = Some(path.clone());
    state.db = Some(conn);
    state.settings = settings;
    state.fixture_path = Some(fixture_path);
    state.store = store;
    state.detector = Detector::default();

    Ok(json!({
        "workspacePath": path.to_string_lossy(),
        "restored": restored,
        "counts": counts,
    }))
}

fn handle_workspace_reset(
    state: &mut AppState,
    _req: &Request,
) -> Result<serde_json::Value, HandlerErr> {
    let conn = require_workspace(&state.db)?;
    let Some(fixture_path) = state.fixture_path.as_ref() else {
        return Err(HandlerErr::new("no_workspace", "select a workspace first"));
    };
    let store =
        sync::reset(conn, fixture_path).map_err(|e| HandlerErr::infra("db_write_failed", e))?;
    state.store = store;
    state.detector.cancel();
    Ok(json!({ "counts": state.store.counts() }))
}

fn handle_prefs_get(state: &mut AppState, _req: &Request) -> Result<serde_json::Value, HandlerErr> {
    let conn = require_workspace(&state.db)?;
    Ok(json!({ "darkMode": sync::dark_mode(conn) }))
}

fn handle_prefs_set_dark_mode(
    state: &mut AppState,
    req: &Request,
) -> Result<serde_json::Value, HandlerErr> {
    let conn = require_workspace(&state.db)?;
    let Some(on) = req.params.get("darkMode").and_then(|v| v.as_bool()) else {
        return Err(HandlerErr::bad_params("missing darkMode"));
    };
    sync::set_dark_mode(conn, on).map_err(|e| HandlerErr::infra("db_write_failed", e))?;
    Ok(json!({ "darkMode": on }))
}

fn handle_prefs_toggle_dark_mode(
    state: &mut AppState,
    _req: &Request,
) -> Result<serde_json::Value, HandlerErr> {
    let conn = require_workspace(&state.db)?;
    let on = !sync::dark_mode(conn);
    sync::set_dark_mode(conn, on).map_err(|e| HandlerErr::infra("db_write_failed", e))?;
    Ok(json!({ "darkMode": on }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    let result = match req.method.as_str() {
        "health" => handle_health(state, req),
        "workspace.select" => handle_workspace_select(state, req),
        "workspace.reset" => handle_workspace_reset(state, req),
        "prefs.get" => handle_prefs_get(state, req),
        "prefs.setDarkMode" => handle_prefs_set_dark_mode(state, req),
        "prefs.toggleDarkMode" => handle_prefs_toggle_dark_mode(state, req),
        _ => return None,
    };
    Some(respond(&req.id, result))
}
