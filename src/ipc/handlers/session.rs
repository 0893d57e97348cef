use crate::ipc::error::{respond, HandlerErr};
use crate::ipc::helpers::{get_opt_str, get_required_str, id_or_session, require_workspace};
use crate::ipc::types::{AppState, Request};
use crate::model::Role;
use crate::store::ProfilePatch;
use crate::sync;
use serde_json::json;
use tracing::{info, warn};

fn handle_users_list(state: &mut AppState, req: &Request) -> Result<serde_json::Value, HandlerErr> {
    require_workspace(&state.db)?;
    let role = match get_opt_str(&req.params, "role") {
        Some(raw) => Some(
            Role::parse(&raw)
                .ok_or_else(|| HandlerErr::bad_params(format!("unknown role: {}", raw)))?,
        ),
        None => None,
    };
    let users: Vec<_> = state
        .store
        .users()
        .iter()
        .filter(|u| role.map_or(true, |r| u.role == r))
        .collect();
    Ok(json!({ "users": users }))
}

fn handle_session_login(
    state: &mut AppState,
    req: &Request,
) -> Result<serde_json::Value, HandlerErr> {
    let conn = require_workspace(&state.db)?;
    let user_id = get_required_str(&req.params, "userId")?;
    let user = state.store.require_user(&user_id)?;
    sync::save_session_user(conn, user).map_err(|e| HandlerErr::infra("db_write_failed", e))?;
    info!(user_id = %user.id, role = ?user.role, "logged in");
    Ok(json!({ "user": user }))
}

/// The stored session record is a snapshot; the live store copy wins when
/// the user still exists.
fn handle_session_current(
    state: &mut AppState,
    _req: &Request,
) -> Result<serde_json::Value, HandlerErr> {
    let conn = require_workspace(&state.db)?;
    let user = sync::load_session_user(conn).map(|saved| {
        state
            .store
            .user(&saved.id)
            .cloned()
            .unwrap_or(saved)
    });
    Ok(json!({ "user": user }))
}

fn handle_session_logout(
    state: &mut AppState,
    _req: &Request,
) -> Result<serde_json::Value, HandlerErr> {
    let conn = require_workspace(&state.db)?;
    sync::clear_session(conn).map_err(|e| HandlerErr::infra("db_write_failed", e))?;
    info!("logged out");
    Ok(json!({ "loggedOut": true }))
}

fn handle_profile_update(
    state: &mut AppState,
    req: &Request,
) -> Result<serde_json::Value, HandlerErr> {
    let conn = require_workspace(&state.db)?;
    let user_id = id_or_session(conn, &req.params, "userId")?;
    let field = |key: &str| {
        req.params
            .get(key)
            .and_then(|v| v.as_str())
            .map(|s| s.to_string())
    };
    let patch = ProfilePatch {
        name: field("name"),
        email: field("email"),
        phone: field("phone"),
    };
    let user = state.store.update_profile(&user_id, &patch)?.clone();
    sync::persist(conn, &state.store);

    let is_session_user = sync::load_session_user(conn).is_some_and(|s| s.id == user.id);
    if is_session_user {
        if let Err(e) = sync::save_session_user(conn, &user) {
            warn!(error = %e, "failed to refresh session record");
        }
    }
    info!(user_id = %user.id, "profile updated");
    Ok(json!({ "user": user }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    let result = match req.method.as_str() {
        "users.list" => handle_users_list(state, req),
        "session.login" => handle_session_login(state, req),
        "session.current" => handle_session_current(state, req),
        "session.logout" => handle_session_logout(state, req),
        "profile.update" => handle_profile_update(state, req),
        _ => return None,
    };
    Some(respond(&req.id, result))
}
