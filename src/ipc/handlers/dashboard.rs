use crate::calc;
use crate::ipc::error::HandlerErr;
use crate::ipc::helpers::{date_or_today, with_store};
use crate::ipc::types::{AppState, Request};
use crate::model::{Assignment, AttendanceRecord, Grade, Student};
use crate::store::Store;
use serde_json::{json, Value};

fn dashboard_stats(store: &mut Store, params: &Value) -> Result<Value, HandlerErr> {
    let today = date_or_today(params)?;
    let students: Vec<Student> = store.get_all()?;
    let assignments: Vec<Assignment> = store.get_all()?;
    let attendance: Vec<AttendanceRecord> = store.get_all()?;
    let grades: Vec<Grade> = store.get_all()?;
    let stats = calc::dashboard_stats(&students, &assignments, &attendance, &grades, today);
    Ok(json!({ "stats": stats }))
}

fn activity_today(store: &mut Store, params: &Value) -> Result<Value, HandlerErr> {
    let today = date_or_today(params)?;
    let attendance = store.attendance_by_date(today)?;
    let grades: Vec<Grade> = store.get_all()?;
    Ok(json!({ "activity": calc::todays_activity(&attendance, &grades, today) }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "dashboard.stats" => Some(with_store(state, req, dashboard_stats)),
        "activity.today" => Some(with_store(state, req, activity_today)),
        _ => None,
    }
}
