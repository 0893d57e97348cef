use crate::ipc::error::{respond, HandlerErr};
use crate::ipc::helpers::{get_opt_str, get_required_str, require_workspace};
use crate::ipc::types::{AppState, Request};
use crate::model::Class;
use serde::Serialize;
use serde_json::json;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ClassRow<'a> {
    #[serde(flatten)]
    class: &'a Class,
    roster_size: usize,
}

fn handle_classes_list(
    state: &mut AppState,
    req: &Request,
) -> Result<serde_json::Value, HandlerErr> {
    require_workspace(&state.db)?;
    let faculty_id = get_opt_str(&req.params, "facultyId");
    let store = &state.store;
    let rows: Vec<ClassRow> = store
        .classes()
        .iter()
        .filter(|c| faculty_id.as_deref().map_or(true, |f| c.faculty_id == f))
        .map(|class| ClassRow {
            class,
            roster_size: store.roster(&class.id).len(),
        })
        .collect();
    Ok(json!({ "classes": rows }))
}

fn handle_classes_roster(
    state: &mut AppState,
    req: &Request,
) -> Result<serde_json::Value, HandlerErr> {
    require_workspace(&state.db)?;
    let class_id = get_required_str(&req.params, "classId")?;
    let class = state.store.require_class(&class_id)?;
    let students = state.store.roster(&class_id);
    Ok(json!({ "class": class, "students": students }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    let result = match req.method.as_str() {
        "classes.list" => handle_classes_list(state, req),
        "classes.roster" => handle_classes_roster(state, req),
        _ => return None,
    };
    Some(respond(&req.id, result))
}
