use super::records;
use crate::ipc::error::HandlerErr;
use crate::ipc::helpers::{get_fields, with_store};
use crate::ipc::types::{AppState, Request};
use crate::model::Assignment;
use crate::query::project;
use crate::store::Store;
use serde_json::{json, Value};

fn assignments_list(store: &mut Store, params: &Value) -> Result<Value, HandlerErr> {
    let fields = get_fields(params)?;
    let assignments: Vec<Assignment> = store.get_all()?;
    Ok(json!({ "assignments": project(&assignments, fields.as_deref())? }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "assignments.list" => Some(with_store(state, req, assignments_list)),
        "assignments.get" => Some(with_store(state, req, records::get::<Assignment>)),
        "assignments.create" => Some(with_store(state, req, records::create::<Assignment>)),
        "assignments.update" => Some(with_store(state, req, records::update::<Assignment>)),
        "assignments.delete" => Some(with_store(state, req, records::delete::<Assignment>)),
        _ => None,
    }
}
