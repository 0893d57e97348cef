use crate::ipc::error::HandlerErr;
use crate::sync;
use rusqlite::Connection;

pub fn require_workspace(db: &Option<Connection>) -> Result<&Connection, HandlerErr> {
    db.as_ref()
        .ok_or_else(|| HandlerErr::new("no_workspace", "select a workspace first"))
}

pub fn get_required_str(params: &serde_json::Value, key: &str) -> Result<String, HandlerErr> {
    params
        .get(key)
        .and_then(|v| v.as_str())
        .map(|s| s.to_string())
        .ok_or_else(|| HandlerErr::bad_params(format!("missing {}", key)))
}

pub fn get_opt_str(params: &serde_json::Value, key: &str) -> Option<String> {
    params
        .get(key)
        .and_then(|v| v.as_str())
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

pub fn get_required_i64(params: &serde_json::Value, key: &str) -> Result<i64, HandlerErr> {
    params
        .get(key)
        .and_then(|v| v.as_i64())
        .ok_or_else(|| HandlerErr::bad_params(format!("missing or non-integer {}", key)))
}

pub fn get_required_u64(params: &serde_json::Value, key: &str) -> Result<u64, HandlerErr> {
    params
        .get(key)
        .and_then(|v| v.as_u64())
        .ok_or_else(|| HandlerErr::bad_params(format!("missing or non-integer {}", key)))
}

/// Reads an array of id strings. Absent keys yield an empty list unless
/// `required`.
pub fn get_str_array(
    params: &serde_json::Value,
    key: &str,
    required: bool,
) -> Result<Vec<String>, HandlerErr> {
    let Some(v) = params.get(key).filter(|v| !v.is_null()) else {
        if required {
            return Err(HandlerErr::bad_params(format!("missing {}", key)));
        }
        return Ok(Vec::new());
    };
    let Some(arr) = v.as_array() else {
        return Err(HandlerErr::bad_params(format!("{} must be an array", key)));
    };
    arr.iter()
        .map(|item| {
            item.as_str()
                .map(|s| s.to_string())
                .ok_or_else(|| HandlerErr::bad_params(format!("{} must contain only strings", key)))
        })
        .collect()
}

/// `params[key]` if given, otherwise the id of the logged-in user.
pub fn id_or_session(
    conn: &Connection,
    params: &serde_json::Value,
    key: &str,
) -> Result<String, HandlerErr> {
    if let Some(id) = get_opt_str(params, key) {
        return Ok(id);
    }
    sync::load_session_user(conn)
        .map(|u| u.id)
        .ok_or_else(|| HandlerErr::bad_params(format!("missing {} and nobody is logged in", key)))
}
