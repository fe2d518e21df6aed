use super::records;
use crate::calc;
use crate::ipc::error::{ok, HandlerErr};
use crate::ipc::helpers::{
    get_fields, get_optional_i64, get_optional_str, get_required_f64, get_required_i64,
    with_store,
};
use crate::ipc::types::{AppState, Request};
use crate::marking;
use crate::model::{Assignment, Grade, Student};
use crate::query::{project, search_grades};
use crate::store::Store;
use serde_json::{json, Value};

fn grades_list(store: &mut Store, params: &Value) -> Result<Value, HandlerErr> {
    let student_id = get_optional_i64(params, "studentId")?;
    let assignment_id = get_optional_i64(params, "assignmentId")?;
    let search = get_optional_str(params, "search").filter(|s| !s.trim().is_empty());
    let fields = get_fields(params)?;

    let mut grades: Vec<Grade> = match (student_id, assignment_id) {
        (Some(sid), _) => store.grades_by_student(sid)?,
        (None, Some(aid)) => store.grades_by_assignment(aid)?,
        (None, None) => store.get_all()?,
    };
    if let Some(aid) = assignment_id {
        grades.retain(|g| g.assignment_id == aid);
    }
    if let Some(term) = search {
        let students: Vec<Student> = store.get_all()?;
        let assignments: Vec<Assignment> = store.get_all()?;
        grades = search_grades(grades, &students, &assignments, term);
    }
    Ok(json!({ "grades": project(&grades, fields.as_deref())? }))
}

fn grades_set(store: &mut Store, params: &Value) -> Result<Value, HandlerErr> {
    let student_id = get_required_i64(params, "studentId")?;
    let assignment_id = get_required_i64(params, "assignmentId")?;
    let score = get_required_f64(params, "score")?;
    let marked = marking::set_grade(store, student_id, assignment_id, score)?;
    Ok(json!({
        "action": marked.action,
        "grade": marked.record
    }))
}

fn grades_student_average(store: &mut Store, params: &Value) -> Result<Value, HandlerErr> {
    let student_id = get_required_i64(params, "studentId")?;
    let grades = store.grades_by_student(student_id)?;
    Ok(json!({
        "studentId": student_id,
        "gradeCount": grades.len(),
        "average": calc::student_average(&grades, student_id)
    }))
}

fn grades_assignment_average(store: &mut Store, params: &Value) -> Result<Value, HandlerErr> {
    let assignment_id = get_required_i64(params, "assignmentId")?;
    let grades = store.grades_by_assignment(assignment_id)?;
    Ok(json!({
        "assignmentId": assignment_id,
        "gradeCount": grades.len(),
        "average": calc::assignment_average(&grades, assignment_id)
    }))
}

fn grades_sheet(store: &mut Store, _params: &Value) -> Result<Value, HandlerErr> {
    let students: Vec<Student> = store.get_all()?;
    let assignments: Vec<Assignment> = store.get_all()?;
    let grades: Vec<Grade> = store.get_all()?;
    Ok(json!({ "sheet": calc::grade_sheet(&students, &assignments, &grades) }))
}

/// Pure calculation; answers without an open store.
fn grades_band(params: &Value) -> Result<Value, HandlerErr> {
    let score = get_required_f64(params, "score")?;
    let total_points = match params.get("totalPoints") {
        None | Some(Value::Null) => 100.0,
        Some(_) => get_required_f64(params, "totalPoints")?,
    };
    Ok(json!({
        "percent": calc::score_percent(score, total_points),
        "band": calc::score_band(score, total_points)
    }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "grades.list" => Some(with_store(state, req, grades_list)),
        "grades.get" => Some(with_store(state, req, records::get::<Grade>)),
        "grades.create" => Some(with_store(state, req, records::create::<Grade>)),
        "grades.update" => Some(with_store(state, req, records::update::<Grade>)),
        "grades.delete" => Some(with_store(state, req, records::delete::<Grade>)),
        "grades.set" => Some(with_store(state, req, grades_set)),
        "grades.studentAverage" => Some(with_store(state, req, grades_student_average)),
        "grades.assignmentAverage" => Some(with_store(state, req, grades_assignment_average)),
        "grades.sheet" => Some(with_store(state, req, grades_sheet)),
        "grades.band" => Some(match grades_band(&req.params) {
            Ok(result) => ok(&req.id, result),
            Err(e) => e.response(&req.id),
        }),
        _ => None,
    }
}
