mod test_support;

use serde_json::{json, Value};
use std::io::{BufRead, BufReader, Read, Write};
use std::net::{TcpListener, TcpStream};
use std::sync::{Arc, Mutex};
use std::thread;
use test_support::{id_of, spawn_sidecar};

#[derive(Default)]
struct RecordApi {
    students: Vec<Value>,
    auth_headers: Vec<String>,
}

impl RecordApi {
    fn handle(&mut self, method: &str, path: &str, body: &Value) -> (u16, Value) {
        match (method, path) {
            ("POST", "/tables/student/fetch") => {
                let offset = body["pagingInfo"]["offset"].as_u64().unwrap_or(0) as usize;
                let limit = body["pagingInfo"]["limit"].as_u64().unwrap_or(u64::MAX) as usize;
                let page: Vec<Value> = self.students.iter().skip(offset).take(limit).cloned().collect();
                (200, json!({ "success": true, "data": page }))
            }
            ("POST", "/tables/student/records") => {
                let mut results = Vec::new();
                for rec in body["records"].as_array().cloned().unwrap_or_default() {
                    let mut rec = rec;
                    rec["Id"] = json!(self.students.len() as i64 + 1);
                    self.students.push(rec.clone());
                    results.push(json!({ "success": true, "data": rec }));
                }
                (200, json!({ "success": true, "results": results }))
            }
            _ => (404, json!({ "success": false, "message": "unsupported" })),
        }
    }
}

fn serve_one(stream: TcpStream, api: &Arc<Mutex<RecordApi>>) -> std::io::Result<()> {
    let mut reader = BufReader::new(stream.try_clone()?);
    let mut request_line = String::new();
    reader.read_line(&mut request_line)?;
    let mut parts = request_line.split_whitespace();
    let method = parts.next().unwrap_or("").to_string();
    let path = parts.next().unwrap_or("").to_string();

    let mut content_length = 0usize;
    let mut auth = String::new();
    loop {
        let mut line = String::new();
        reader.read_line(&mut line)?;
        let line = line.trim_end();
        if line.is_empty() {
            break;
        }
        if let Some((k, v)) = line.split_once(':') {
            if k.eq_ignore_ascii_case("content-length") {
                content_length = v.trim().parse().unwrap_or(0);
            } else if k.eq_ignore_ascii_case("authorization") {
                auth = v.trim().to_string();
            }
        }
    }
    let mut body = vec![0u8; content_length];
    reader.read_exact(&mut body)?;
    let body: Value = serde_json::from_slice(&body).unwrap_or(Value::Null);

    let (status, payload) = {
        let mut api = api.lock().expect("record api lock");
        api.auth_headers.push(auth);
        api.handle(&method, &path, &body)
    };
    let payload = payload.to_string();
    let mut stream = stream;
    write!(
        stream,
        "HTTP/1.1 {} X\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
        status,
        payload.len(),
        payload
    )?;
    stream.flush()
}

fn spawn_record_api() -> (String, Arc<Mutex<RecordApi>>) {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
    let addr = listener.local_addr().expect("addr");
    let api = Arc::new(Mutex::new(RecordApi::default()));
    let shared = Arc::clone(&api);
    thread::spawn(move || {
        for stream in listener.incoming() {
            let Ok(stream) = stream else { break };
            let _ = serve_one(stream, &shared);
        }
    });
    (format!("http://{}", addr), api)
}

#[test]
fn remote_workspace_serves_records_over_ipc() {
    let (base, api) = spawn_record_api();
    let mut sc = spawn_sidecar(&[]);

    assert_eq!(sc.request_err("1", "workspace.remote", json!({})), "bad_params");
    assert_eq!(
        sc.request_err("2", "workspace.remote", json!({ "baseUrl": base, "timeoutSecs": "soon" })),
        "bad_params"
    );

    // A non-positive timeout falls back to the configured default.
    let opened = sc.request_ok(
        "3",
        "workspace.remote",
        json!({ "baseUrl": format!("{}/", base), "apiKey": "k1", "timeoutSecs": 0 }),
    );
    assert_eq!(opened["backend"], "remote");
    assert!(opened["workspacePath"].is_null());

    let created = sc.request_ok(
        "4",
        "students.create",
        json!({ "student": { "firstName": "Kai", "lastName": "Remote", "enrollmentDate": "2024-08-26" } }),
    );
    assert_eq!(id_of(&created), 1);

    let listed = sc.request_ok("5", "students.list", json!({}));
    assert_eq!(listed["total"], 1);
    assert_eq!(listed["students"][0]["firstName"], "Kai");
    assert_eq!(listed["students"][0]["id"], 1);

    let health = sc.request_ok("6", "health", json!({}));
    assert_eq!(health["backend"], "remote");
    sc.shutdown();

    let api = api.lock().expect("record api lock");
    assert!(!api.auth_headers.is_empty());
    assert!(api.auth_headers.iter().all(|h| h == "Bearer k1"));
}

#[test]
fn unreachable_remote_reports_operation_failed() {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
    let addr = listener.local_addr().expect("addr");
    drop(listener);

    let mut sc = spawn_sidecar(&[]);
    sc.request_ok(
        "1",
        "workspace.remote",
        json!({ "baseUrl": format!("http://{}", addr), "timeoutSecs": 2 }),
    );
    assert_eq!(sc.request_err("2", "students.list", json!({})), "operation_failed");
    sc.shutdown();
}
