#![allow(dead_code)]

use serde_json::json;
use std::io::{BufRead, BufReader, Write};
use std::process::{Child, ChildStdin, ChildStdout, Command, Stdio};

pub struct Sidecar {
    child: Child,
    stdin: Option<ChildStdin>,
    reader: BufReader<ChildStdout>,
}

/// Spawn the daemon with extra command-line flags (e.g. `["--mock"]`).
pub fn spawn_sidecar(args: &[&str]) -> Sidecar {
    spawn_sidecar_with_env(args, &[])
}

/// Like `spawn_sidecar`, with extra environment variables set on the child.
pub fn spawn_sidecar_with_env(args: &[&str], envs: &[(&str, &str)]) -> Sidecar {
    let exe = env!("CARGO_BIN_EXE_rollbookd");
    let mut command = Command::new(exe);
    for var in [
        "ROLLBOOK_CONFIG",
        "ROLLBOOK_WORKSPACE",
        "ROLLBOOK_MOCK",
        "ROLLBOOK_NO_SEED",
        "ROLLBOOK_REMOTE_URL",
        "ROLLBOOK_API_KEY",
        "HTTP_PROXY",
        "http_proxy",
        "ALL_PROXY",
        "all_proxy",
    ] {
        command.env_remove(var);
    }
    let mut child = command
        .args(args)
        .envs(envs.iter().copied())
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .spawn()
        .expect("spawn rollbookd");
    let stdin = child.stdin.take().expect("child stdin");
    let stdout = child.stdout.take().expect("child stdout");
    Sidecar {
        child,
        stdin: Some(stdin),
        reader: BufReader::new(stdout),
    }
}

impl Sidecar {
    pub fn send_raw(&mut self, line: &str) -> serde_json::Value {
        let stdin = self.stdin.as_mut().expect("sidecar stdin open");
        writeln!(stdin, "{}", line).expect("write request");
        stdin.flush().expect("flush request");

        let mut out = String::new();
        self.reader.read_line(&mut out).expect("read response line");
        assert!(!out.trim().is_empty(), "empty response for {}", line);
        serde_json::from_str(out.trim()).expect("parse response json")
    }

    pub fn request(&mut self, id: &str, method: &str, params: serde_json::Value) -> serde_json::Value {
        let payload = json!({
            "id": id,
            "method": method,
            "params": params,
        });
        let value = self.send_raw(&payload.to_string());
        assert_eq!(value.get("id").and_then(|v| v.as_str()), Some(id));
        value
    }

    pub fn request_ok(&mut self, id: &str, method: &str, params: serde_json::Value) -> serde_json::Value {
        let value = self.request(id, method, params);
        assert!(
            value.get("ok").and_then(|v| v.as_bool()).unwrap_or(false),
            "{} failed: {}",
            method,
            value
        );
        value.get("result").cloned().unwrap_or_else(|| json!({}))
    }

    /// Error code of a failed response; panics if the call succeeded.
    pub fn request_err(&mut self, id: &str, method: &str, params: serde_json::Value) -> String {
        let value = self.request(id, method, params);
        assert_eq!(
            value.get("ok").and_then(|v| v.as_bool()),
            Some(false),
            "{} unexpectedly succeeded: {}",
            method,
            value
        );
        value
            .get("error")
            .and_then(|e| e.get("code"))
            .and_then(|v| v.as_str())
            .unwrap_or("unknown")
            .to_string()
    }

    pub fn shutdown(mut self) {
        drop(self.stdin.take());
        let _ = self.child.wait();
    }
}

pub fn id_of(result: &serde_json::Value) -> i64 {
    result.get("id").and_then(|v| v.as_i64()).expect("id in result")
}
