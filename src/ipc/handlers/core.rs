use crate::config::BackendConfig;
use crate::ipc::error::{err, ok};
use crate::ipc::helpers::{get_optional_i64, get_optional_str};
use crate::ipc::types::{AppState, Request};
use serde_json::json;
use std::path::PathBuf;
use std::time::Duration;

fn handle_health(state: &mut AppState, req: &Request) -> serde_json::Value {
    ok(
        &req.id,
        json!({
            "version": env!("CARGO_PKG_VERSION"),
            "backend": state.store.as_ref().map(|s| s.backend()),
            "workspacePath": state.workspace.as_ref().map(|p| p.to_string_lossy().to_string())
        }),
    )
}

fn open_and_reply(state: &mut AppState, req: &Request, backend: BackendConfig) -> serde_json::Value {
    match state.open(&backend) {
        Ok(()) => ok(
            &req.id,
            json!({
                "backend": state.store.as_ref().map(|s| s.backend()),
                "workspacePath": state.workspace.as_ref().map(|p| p.to_string_lossy().to_string())
            }),
        ),
        Err(e) => {
            tracing::warn!(method = %req.method, error = %format!("{e:#}"), "store open failed");
            err(&req.id, "operation_failed", format!("{e:#}"), Some(json!({ "op": "open" })))
        }
    }
}

fn handle_workspace_select(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(path) = get_optional_str(&req.params, "path").map(PathBuf::from) else {
        return err(&req.id, "bad_params", "missing params.path", None);
    };
    open_and_reply(state, req, BackendConfig::Sqlite { workspace: path })
}

fn handle_workspace_mock(state: &mut AppState, req: &Request) -> serde_json::Value {
    let seed = req
        .params
        .get("seed")
        .and_then(|v| v.as_bool())
        .unwrap_or(true);
    open_and_reply(state, req, BackendConfig::Mock { seed })
}

fn handle_workspace_remote(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(base_url) = get_optional_str(&req.params, "baseUrl").map(str::to_string) else {
        return err(&req.id, "bad_params", "missing params.baseUrl", None);
    };
    let timeout = match get_optional_i64(&req.params, "timeoutSecs") {
        Ok(Some(secs)) if secs > 0 => Duration::from_secs(secs as u64),
        Ok(_) => state.remote_timeout,
        Err(e) => return e.response(&req.id),
    };
    let api_key = get_optional_str(&req.params, "apiKey").map(str::to_string);
    open_and_reply(
        state,
        req,
        BackendConfig::Remote {
            base_url,
            api_key,
            timeout,
        },
    )
}

fn handle_workspace_close(state: &mut AppState, req: &Request) -> serde_json::Value {
    state.close();
    ok(&req.id, json!({ "ok": true }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "health" => Some(handle_health(state, req)),
        "workspace.select" => Some(handle_workspace_select(state, req)),
        "workspace.mock" => Some(handle_workspace_mock(state, req)),
        "workspace.remote" => Some(handle_workspace_remote(state, req)),
        "workspace.close" => Some(handle_workspace_close(state, req)),
        _ => None,
    }
}
