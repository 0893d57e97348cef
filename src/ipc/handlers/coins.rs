use crate::coins;
use crate::ipc::error::{respond, HandlerErr};
use crate::ipc::helpers::{
    get_opt_str, get_required_i64, get_required_str, id_or_session, require_workspace,
};
use crate::ipc::types::{AppState, Request};
use crate::model::SOURCE_BONUS;
use crate::sync;
use serde_json::json;

fn handle_coins_balance(
    state: &mut AppState,
    req: &Request,
) -> Result<serde_json::Value, HandlerErr> {
    let conn = require_workspace(&state.db)?;
    let student_id = id_or_session(conn, &req.params, "studentId")?;
    let balance = coins::balance(&state.store, &student_id)?;
    Ok(json!({ "studentId": student_id, "balance": balance }))
}

fn handle_coins_history(
    state: &mut AppState,
    req: &Request,
) -> Result<serde_json::Value, HandlerErr> {
    let conn = require_workspace(&state.db)?;
    let student_id = id_or_session(conn, &req.params, "studentId")?;
    state.store.require_student(&student_id)?;
    Ok(json!({
        "studentId": student_id,
        "transactions": coins::history(&state.store, &student_id),
    }))
}

fn handle_coins_award(
    state: &mut AppState,
    req: &Request,
) -> Result<serde_json::Value, HandlerErr> {
    let conn = require_workspace(&state.db)?;
    let student_id = get_required_str(&req.params, "studentId")?;
    let amount = get_required_i64(&req.params, "amount")?;
    let source = get_opt_str(&req.params, "source").unwrap_or_else(|| SOURCE_BONUS.to_string());
    let class_id = get_opt_str(&req.params, "classId");
    let balance = coins::award(
        &mut state.store,
        &student_id,
        amount,
        &source,
        class_id.as_deref(),
    )?;
    sync::persist(conn, &state.store);
    Ok(json!({ "studentId": student_id, "balance": balance }))
}

fn handle_coins_purchase(
    state: &mut AppState,
    req: &Request,
) -> Result<serde_json::Value, HandlerErr> {
    let conn = require_workspace(&state.db)?;
    let student_id = id_or_session(conn, &req.params, "studentId")?;
    let item_id = get_required_str(&req.params, "itemId")?;
    let purchase = coins::spend(&mut state.store, &student_id, &item_id)?;
    sync::persist(conn, &state.store);
    Ok(json!(purchase))
}

fn handle_store_items(
    state: &mut AppState,
    _req: &Request,
) -> Result<serde_json::Value, HandlerErr> {
    require_workspace(&state.db)?;
    Ok(json!({ "items": state.store.store_items() }))
}

fn handle_leaderboard_get(
    state: &mut AppState,
    req: &Request,
) -> Result<serde_json::Value, HandlerErr> {
    let conn = require_workspace(&state.db)?;
    let board = coins::leaderboard(&state.store);
    // Rank is informational; no session and no param simply yields null.
    let rank = id_or_session(conn, &req.params, "studentId")
        .ok()
        .and_then(|id| coins::rank_of(&board, &id));
    Ok(json!({ "entries": board, "rank": rank }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    let result = match req.method.as_str() {
        "coins.balance" => handle_coins_balance(state, req),
        "coins.history" => handle_coins_history(state, req),
        "coins.award" => handle_coins_award(state, req),
        "coins.purchase" => handle_coins_purchase(state, req),
        "store.items" => handle_store_items(state, req),
        "leaderboard.get" => handle_leaderboard_get(state, req),
        _ => return None,
    };
    Some(respond(&req.id, result))
}
