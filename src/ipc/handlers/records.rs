//! CRUD bodies shared by every record family. Payload keys follow the
//! entity kind: `students.create` reads `params.student` and answers with
//! `result.student`.

use crate::ipc::error::HandlerErr;
use crate::ipc::helpers::{get_object, get_required_i64};
use crate::store::{Record, Store};
use serde_json::{json, Value};

pub fn get<E: Record>(store: &mut Store, params: &Value) -> Result<Value, HandlerErr> {
    let id = get_required_i64(params, "id")?;
    let record: E = store.get_by_id(id)?;
    Ok(json!({ E::KIND: record }))
}

pub fn create<E: Record>(store: &mut Store, params: &Value) -> Result<Value, HandlerErr> {
    let draft: E::Draft = get_object(params, E::KIND)?;
    let record: E = store.create(draft)?;
    tracing::debug!(kind = E::KIND, id = record.id(), "created");
    Ok(json!({ "id": record.id(), E::KIND: record }))
}

pub fn update<E: Record>(store: &mut Store, params: &Value) -> Result<Value, HandlerErr> {
    let id = get_required_i64(params, "id")?;
    let patch: E::Patch = get_object(params, "patch")?;
    let record: E = store.update(id, patch)?;
    Ok(json!({ E::KIND: record }))
}

pub fn delete<E: Record>(store: &mut Store, params: &Value) -> Result<Value, HandlerErr> {
    let id = get_required_i64(params, "id")?;
    store.delete::<E>(id)?;
    tracing::debug!(kind = E::KIND, id, "deleted");
    Ok(json!({ "ok": true }))
}
