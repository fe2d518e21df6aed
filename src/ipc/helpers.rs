use super::error::{err, ok, HandlerErr};
use super::types::{AppState, Request};
use crate::model::today;
use crate::store::Store;
use chrono::NaiveDate;
use serde::de::DeserializeOwned;
use serde_json::Value;

pub fn get_required_str<'a>(params: &'a Value, key: &str) -> Result<&'a str, HandlerErr> {
    params
        .get(key)
        .and_then(|v| v.as_str())
        .ok_or_else(|| HandlerErr::bad_params(format!("missing {}", key)))
}

pub fn get_optional_str<'a>(params: &'a Value, key: &str) -> Option<&'a str> {
    params.get(key).and_then(|v| v.as_str())
}

pub fn get_required_i64(params: &Value, key: &str) -> Result<i64, HandlerErr> {
    get_optional_i64(params, key)?.ok_or_else(|| HandlerErr::bad_params(format!("missing {}", key)))
}

/// Integer param; numeric strings are accepted since ids often arrive from form fields.
pub fn get_optional_i64(params: &Value, key: &str) -> Result<Option<i64>, HandlerErr> {
    match params.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Number(n)) => n
            .as_i64()
            .map(Some)
            .ok_or_else(|| HandlerErr::bad_params(format!("{} must be an integer", key))),
        Some(Value::String(s)) => s
            .trim()
            .parse::<i64>()
            .map(Some)
            .map_err(|_| HandlerErr::bad_params(format!("{} must be an integer", key))),
        Some(_) => Err(HandlerErr::bad_params(format!("{} must be an integer", key))),
    }
}

pub fn get_required_f64(params: &Value, key: &str) -> Result<f64, HandlerErr> {
    match params.get(key) {
        Some(Value::Number(n)) => n
            .as_f64()
            .ok_or_else(|| HandlerErr::bad_params(format!("{} must be a number", key))),
        Some(Value::String(s)) => s
            .trim()
            .parse::<f64>()
            .ok()
            .filter(|v| v.is_finite())
            .ok_or_else(|| HandlerErr::bad_params(format!("{} must be a number", key))),
        _ => Err(HandlerErr::bad_params(format!("missing {}", key))),
    }
}

pub fn get_optional_date(params: &Value, key: &str) -> Result<Option<NaiveDate>, HandlerErr> {
    let Some(raw) = get_optional_str(params, key) else {
        return Ok(None);
    };
    // Accept full timestamps too; only the calendar day matters.
    let day = raw.trim().get(..10).unwrap_or(raw);
    NaiveDate::parse_from_str(day, "%Y-%m-%d")
        .map(Some)
        .map_err(|_| HandlerErr::bad_params(format!("{} must be YYYY-MM-DD", key)))
}

pub fn date_or_today(params: &Value) -> Result<NaiveDate, HandlerErr> {
    Ok(get_optional_date(params, "date")?.unwrap_or_else(today))
}

/// Deserialize a required object param (a draft or a patch).
pub fn get_object<T: DeserializeOwned>(params: &Value, key: &str) -> Result<T, HandlerErr> {
    let Some(v) = params.get(key).filter(|v| v.is_object()) else {
        return Err(HandlerErr::bad_params(format!("missing {}", key)));
    };
    serde_json::from_value(v.clone())
        .map_err(|e| HandlerErr::bad_params(format!("invalid {}: {}", key, e)))
}

pub fn get_fields(params: &Value) -> Result<Option<Vec<String>>, HandlerErr> {
    match params.get("fields") {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Array(items)) => items
            .iter()
            .map(|v| {
                v.as_str()
                    .map(str::to_string)
                    .ok_or_else(|| HandlerErr::bad_params("fields must be strings"))
            })
            .collect::<Result<Vec<_>, _>>()
            .map(Some),
        Some(_) => Err(HandlerErr::bad_params("fields must be an array")),
    }
}

/// Run `f` against the open store and wrap its result in a response envelope.
pub fn with_store<F>(state: &mut AppState, req: &Request, f: F) -> Value
where
    F: FnOnce(&mut Store, &Value) -> Result<Value, HandlerErr>,
{
    let Some(store) = state.store.as_mut() else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };
    match f(store, &req.params) {
        Ok(result) => ok(&req.id, result),
        Err(error) => {
            tracing::warn!(
                method = %req.method,
                code = error.code,
                "{}",
                error.message
            );
            error.response(&req.id)
        }
    }
}
