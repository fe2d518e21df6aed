use super::records;
use crate::ipc::error::HandlerErr;
use crate::ipc::helpers::{get_fields, get_optional_i64, get_optional_str, with_store};
use crate::ipc::types::{AppState, Request};
use crate::model::Student;
use crate::query::{project, StudentQuery};
use crate::store::Store;
use serde_json::{json, Value};

fn students_list(store: &mut Store, params: &Value) -> Result<Value, HandlerErr> {
    let query = StudentQuery {
        search: get_optional_str(params, "search").map(str::to_string),
        grade_level: get_optional_i64(params, "gradeLevel")?,
    };
    let fields = get_fields(params)?;
    let all: Vec<Student> = store.get_all()?;
    let total = all.len();
    let students = query.apply(all);
    Ok(json!({
        "students": project(&students, fields.as_deref())?,
        "total": total
    }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "students.list" => Some(with_store(state, req, students_list)),
        "students.get" => Some(with_store(state, req, records::get::<Student>)),
        "students.create" => Some(with_store(state, req, records::create::<Student>)),
        "students.update" => Some(with_store(state, req, records::update::<Student>)),
        "students.delete" => Some(with_store(state, req, records::delete::<Student>)),
        _ => None,
    }
}
