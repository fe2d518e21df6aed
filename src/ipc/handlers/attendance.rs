use super::records;
use crate::calc;
use crate::ipc::error::HandlerErr;
use crate::ipc::helpers::{
    date_or_today, get_fields, get_optional_date, get_optional_i64, get_required_i64,
    get_required_str, with_store,
};
use crate::ipc::types::{AppState, Request};
use crate::marking::{self, MarkAction};
use crate::model::{AttendanceRecord, AttendanceStatus, Student};
use crate::query::project;
use crate::store::Store;
use serde_json::{json, Value};

fn parse_status(params: &Value) -> Result<AttendanceStatus, HandlerErr> {
    get_required_str(params, "status")?
        .parse()
        .map_err(|e: crate::model::ParseEnumError| HandlerErr::bad_params(e.to_string()))
}

fn attendance_list(store: &mut Store, params: &Value) -> Result<Value, HandlerErr> {
    let student_id = get_optional_i64(params, "studentId")?;
    let date = get_optional_date(params, "date")?;
    let fields = get_fields(params)?;

    let records = match (student_id, date) {
        (Some(sid), Some(d)) => store
            .attendance_by_student(sid)?
            .into_iter()
            .filter(|r| r.date == d)
            .collect(),
        (Some(sid), None) => store.attendance_by_student(sid)?,
        (None, Some(d)) => store.attendance_by_date(d)?,
        (None, None) => store.get_all::<AttendanceRecord>()?,
    };
    Ok(json!({ "attendance": project(&records, fields.as_deref())? }))
}

fn attendance_mark(store: &mut Store, params: &Value) -> Result<Value, HandlerErr> {
    let student_id = get_required_i64(params, "studentId")?;
    let date = get_optional_date(params, "date")?
        .ok_or_else(|| HandlerErr::bad_params("missing date"))?;
    let status = parse_status(params)?;
    let marked = marking::mark_attendance(store, student_id, date, status)?;
    Ok(json!({
        "action": marked.action,
        "attendance": marked.record
    }))
}

fn attendance_mark_all_present(store: &mut Store, params: &Value) -> Result<Value, HandlerErr> {
    let date = date_or_today(params)?;
    let outcomes = marking::mark_all_present(store, date)?;
    let count = |action: MarkAction| outcomes.iter().filter(|o| o.action == action).count();
    let failed = count(MarkAction::Failed);
    if failed > 0 {
        tracing::warn!(%date, failed, "mark all present finished with failures");
    }
    Ok(json!({
        "date": date,
        "created": count(MarkAction::Created),
        "updated": count(MarkAction::Updated),
        "unchanged": count(MarkAction::Unchanged),
        "failed": failed,
        "outcomes": outcomes
    }))
}

fn attendance_day_summary(store: &mut Store, params: &Value) -> Result<Value, HandlerErr> {
    let date = date_or_today(params)?;
    let student_count = store.get_all::<Student>()?.len();
    let records = store.attendance_by_date(date)?;
    let summary = calc::day_summary(&records, student_count, date);
    Ok(json!({ "summary": summary }))
}

fn attendance_month(store: &mut Store, params: &Value) -> Result<Value, HandlerErr> {
    let year = i32::try_from(get_required_i64(params, "year")?)
        .map_err(|_| HandlerErr::bad_params("year out of range"))?;
    let month = u32::try_from(get_required_i64(params, "month")?)
        .map_err(|_| HandlerErr::bad_params("month must be 1-12"))?;
    let student_count = store.get_all::<Student>()?.len();
    let records = store.get_all::<AttendanceRecord>()?;
    let days = calc::month_calendar(&records, student_count, year, month)
        .ok_or_else(|| HandlerErr::bad_params("month must be 1-12"))?;
    Ok(json!({
        "year": year,
        "month": month,
        "students": student_count,
        "days": days
    }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "attendance.list" => Some(with_store(state, req, attendance_list)),
        "attendance.get" => Some(with_store(state, req, records::get::<AttendanceRecord>)),
        "attendance.create" => Some(with_store(state, req, records::create::<AttendanceRecord>)),
        "attendance.update" => Some(with_store(state, req, records::update::<AttendanceRecord>)),
        "attendance.delete" => Some(with_store(state, req, records::delete::<AttendanceRecord>)),
        "attendance.mark" => Some(with_store(state, req, attendance_mark)),
        "attendance.markAllPresent" => Some(with_store(state, req, attendance_mark_all_present)),
        "attendance.daySummary" => Some(with_store(state, req, attendance_day_summary)),
        "attendance.month" => Some(with_store(state, req, attendance_month)),
        _ => None,
    }
}
