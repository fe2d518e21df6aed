use crate::model::{Assignment, AttendanceRecord, Entity, Grade, RecordId, Student};
use crate::store::StoreError;
use reqwest::blocking::{Client, RequestBuilder, Response};
use reqwest::{Method, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::time::Duration;

/// Record-API table names and the field list sent with every fetch.
pub trait RemoteRecord: Entity {
    const TABLE: &'static str;
    const FIELDS: &'static [&'static str];
}

impl RemoteRecord for Student {
    const TABLE: &'static str = "student";
    const FIELDS: &'static [&'static str] = &[
        "Id",
        "firstName",
        "lastName",
        "gradeLevel",
        "email",
        "phone",
        "status",
        "enrollmentDate",
    ];
}

impl RemoteRecord for AttendanceRecord {
    const TABLE: &'static str = "attendance";
    const FIELDS: &'static [&'static str] = &["Id", "studentId", "date", "status", "notes"];
}

impl RemoteRecord for Assignment {
    const TABLE: &'static str = "assignment";
    const FIELDS: &'static [&'static str] =
        &["Id", "title", "category", "totalPoints", "dueDate"];
}

impl RemoteRecord for Grade {
    const TABLE: &'static str = "grade";
    const FIELDS: &'static [&'static str] =
        &["Id", "studentId", "assignmentId", "score", "submittedDate"];
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FetchRequest {
    pub fields: Vec<String>,
    #[serde(rename = "where", skip_serializing_if = "Vec::is_empty")]
    pub conditions: Vec<Condition>,
    pub order_by: Vec<OrderBy>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub paging_info: Option<PagingInfo>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Condition {
    pub field: String,
    pub operator: &'static str,
    pub values: Vec<Value>,
}

#[derive(Debug, Clone, Serialize)]
pub struct OrderBy {
    pub field: String,
    pub direction: &'static str,
}

#[derive(Debug, Clone, Serialize)]
pub struct PagingInfo {
    pub limit: u32,
    pub offset: u32,
}

#[derive(Debug, Deserialize)]
struct FetchResponse {
    success: bool,
    #[serde(default)]
    data: Vec<Value>,
    #[serde(default)]
    message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RecordResponse {
    success: bool,
    #[serde(default)]
    data: Option<Value>,
    #[serde(default)]
    message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct BatchResponse {
    success: bool,
    #[serde(default)]
    results: Vec<BatchResult>,
    #[serde(default)]
    message: Option<String>,
}

/// Outcome for one record of a batch create/update/delete.
#[derive(Debug, Clone, Deserialize)]
pub struct BatchResult {
    pub success: bool,
    #[serde(default)]
    pub data: Option<Value>,
    #[serde(default)]
    pub message: Option<String>,
}

fn to_wire<T: Serialize>(value: &T) -> Result<Value, StoreError> {
    let mut v = serde_json::to_value(value)?;
    if let Some(obj) = v.as_object_mut() {
        if let Some(id) = obj.remove("id") {
            obj.insert("Id".to_string(), id);
        }
    }
    Ok(v)
}

fn from_wire<E: DeserializeOwned>(mut v: Value) -> Result<E, StoreError> {
    if let Some(obj) = v.as_object_mut() {
        if let Some(id) = obj.remove("Id") {
            obj.insert("id".to_string(), id);
        }
    }
    Ok(serde_json::from_value(v)?)
}

fn rejected(op: &'static str, message: Option<String>) -> StoreError {
    StoreError::failed(op, message.unwrap_or_else(|| "rejected by record API".into()))
}

/// Rows requested per fetch page.
pub const DEFAULT_PAGE_SIZE: u32 = 200;

/// Backend that forwards every call to a remote record API.
pub struct RemoteStore {
    client: Client,
    base_url: String,
    api_key: Option<String>,
    page_size: u32,
}

impl RemoteStore {
    pub fn new(
        base_url: &str,
        api_key: Option<String>,
        timeout: Duration,
    ) -> Result<Self, StoreError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(RemoteStore {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.filter(|k| !k.is_empty()),
            page_size: DEFAULT_PAGE_SIZE,
        })
    }

    pub fn with_page_size(mut self, page_size: u32) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let url = format!("{}/tables/{}", self.base_url, path);
        let builder = self.client.request(method, url);
        match &self.api_key {
            Some(key) => builder.header("Authorization", format!("Bearer {}", key)),
            None => builder,
        }
    }

    fn send<T: DeserializeOwned>(
        &self,
        op: &'static str,
        builder: RequestBuilder,
    ) -> Result<T, StoreError> {
        let resp: Response = builder.send()?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().unwrap_or_default();
            return Err(StoreError::failed(op, format!("HTTP {}: {}", status, body)));
        }
        Ok(resp.json::<T>()?)
    }

    /// Fetch every matching row, one page at a time in `Id` order, until a
    /// page comes back shorter than the page size.
    pub fn fetch<E: RemoteRecord>(
        &self,
        conditions: Vec<Condition>,
    ) -> Result<Vec<E>, StoreError> {
        let mut body = FetchRequest {
            fields: E::FIELDS.iter().map(|f| f.to_string()).collect(),
            conditions,
            order_by: vec![OrderBy {
                field: "Id".into(),
                direction: "asc",
            }],
            paging_info: None,
        };
        let mut rows = Vec::new();
        let mut offset = 0;
        loop {
            body.paging_info = Some(PagingInfo {
                limit: self.page_size,
                offset,
            });
            let resp: FetchResponse = self.send(
                "fetch",
                self.request(Method::POST, &format!("{}/fetch", E::TABLE))
                    .json(&body),
            )?;
            if !resp.success {
                return Err(rejected("fetch", resp.message));
            }
            let count = resp.data.len();
            for row in resp.data {
                rows.push(from_wire(row)?);
            }
            if count < self.page_size as usize {
                break;
            }
            offset += self.page_size;
            tracing::debug!(table = E::TABLE, offset, "fetching next page");
        }
        Ok(rows)
    }

    pub fn get_all<E: RemoteRecord>(&self) -> Result<Vec<E>, StoreError> {
        self.fetch(Vec::new())
    }

    /// Server-side equality filter on one field.
    pub fn find_by<E: RemoteRecord>(
        &self,
        field: &str,
        value: Value,
    ) -> Result<Vec<E>, StoreError> {
        self.fetch(vec![Condition {
            field: field.to_string(),
            operator: "eq",
            values: vec![value],
        }])
    }

    pub fn get_by_id<E: RemoteRecord>(&self, id: RecordId) -> Result<E, StoreError> {
        let builder = self.request(Method::GET, &format!("{}/records/{}", E::TABLE, id));
        let resp = builder.send()?;
        if resp.status() == StatusCode::NOT_FOUND {
            return Err(StoreError::not_found(E::KIND, id));
        }
        if !resp.status().is_success() {
            return Err(StoreError::failed("get", format!("HTTP {}", resp.status())));
        }
        let body: RecordResponse = resp.json()?;
        if !body.success {
            return Err(rejected("get", body.message));
        }
        match body.data {
            Some(Value::Null) | None => Err(StoreError::not_found(E::KIND, id)),
            Some(data) => from_wire(data),
        }
    }

    fn batch(
        &self,
        op: &'static str,
        method: Method,
        table: &str,
        body: Value,
    ) -> Result<Vec<BatchResult>, StoreError> {
        let resp: BatchResponse = self.send(
            op,
            self.request(method, &format!("{}/records", table)).json(&body),
        )?;
        if !resp.success {
            return Err(rejected(op, resp.message));
        }
        Ok(resp.results)
    }

    fn single_result(op: &'static str, results: Vec<BatchResult>) -> Result<BatchResult, StoreError> {
        let Some(result) = results.into_iter().next() else {
            return Err(StoreError::failed(op, "record API returned no result"));
        };
        if !result.success {
            return Err(rejected(op, result.message));
        }
        Ok(result)
    }

    pub fn create<E: RemoteRecord>(&self, draft: E::Draft) -> Result<E, StoreError> {
        // Defaults (status, dates) are filled locally so the remote row matches
        // what the other backends would store.
        let filled = E::from_draft(0, draft);
        let mut wire = to_wire(&filled)?;
        if let Some(obj) = wire.as_object_mut() {
            obj.remove("Id");
        }
        let results = self.batch("create", Method::POST, E::TABLE, json!({ "records": [wire] }))?;
        let result = Self::single_result("create", results)?;
        match result.data {
            Some(data) => from_wire(data),
            None => Err(StoreError::failed("create", "record API returned no data")),
        }
    }

    pub fn update<E: RemoteRecord>(&self, id: RecordId, patch: E::Patch) -> Result<E, StoreError> {
        let mut record: E = self.get_by_id(id)?;
        record.apply(patch);
        let wire = to_wire(&record)?;
        let results = self.batch("update", Method::PATCH, E::TABLE, json!({ "records": [wire] }))?;
        let result = Self::single_result("update", results)?;
        match result.data {
            Some(data) if !data.is_null() => from_wire(data),
            _ => Ok(record),
        }
    }

    pub fn delete<E: RemoteRecord>(&self, id: RecordId) -> Result<(), StoreError> {
        let _: E = self.get_by_id(id)?;
        let results = self.batch("delete", Method::DELETE, E::TABLE, json!({ "recordIds": [id] }))?;
        Self::single_result("delete", results)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{AttendanceStatus, GradeDraft, StudentDraft, StudentPatch};
    use std::collections::BTreeMap;
    use std::io::{BufRead, BufReader, Read, Write};
    use std::net::{TcpListener, TcpStream};
    use std::sync::{Arc, Mutex};
    use std::thread;

    #[derive(Default)]
    struct FakeApi {
        tables: BTreeMap<String, Vec<Value>>,
        next_id: i64,
        requests: Vec<(String, String, Value)>,
        reject_writes: bool,
    }

    impl FakeApi {
        fn handle(&mut self, method: &str, path: &str, body: Value) -> (u16, Value) {
            self.requests
                .push((method.to_string(), path.to_string(), body.clone()));
            let parts: Vec<&str> = path.trim_start_matches('/').split('/').collect();
            let table = parts.get(1).copied().unwrap_or("").to_string();
            let rows = self.tables.entry(table).or_default();
            match (method, parts.as_slice()) {
                ("POST", ["tables", _, "fetch"]) => {
                    let mut data: Vec<Value> = rows.clone();
                    if let Some(conds) = body.get("where").and_then(|v| v.as_array()) {
                        for c in conds {
                            let field = c["field"].as_str().unwrap_or("");
                            let want = c["values"][0].clone();
                            data.retain(|r| r[field] == want);
                        }
                    }
                    let offset = body["pagingInfo"]["offset"].as_u64().unwrap_or(0) as usize;
                    let limit = body["pagingInfo"]["limit"]
                        .as_u64()
                        .map(|l| l as usize)
                        .unwrap_or(usize::MAX);
                    let page: Vec<Value> = data.into_iter().skip(offset).take(limit).collect();
                    (200, json!({ "success": true, "data": page }))
                }
                ("GET", ["tables", _, "records", id]) => {
                    let id: i64 = id.parse().unwrap_or(-1);
                    match rows.iter().find(|r| r["Id"] == json!(id)) {
                        Some(r) => (200, json!({ "success": true, "data": r })),
                        None => (404, json!({ "success": false, "message": "no such record" })),
                    }
                }
                (_, ["tables", _, "records"]) if self.reject_writes => (
                    200,
                    json!({ "success": true, "results": [
                        { "success": false, "message": "field validation failed" }
                    ] }),
                ),
                ("POST", ["tables", _, "records"]) => {
                    let mut results = Vec::new();
                    for rec in body["records"].as_array().cloned().unwrap_or_default() {
                        self.next_id += 1;
                        let mut rec = rec;
                        rec["Id"] = json!(self.next_id);
                        rows.push(rec.clone());
                        results.push(json!({ "success": true, "data": rec }));
                    }
                    (200, json!({ "success": true, "results": results }))
                }
                ("PATCH", ["tables", _, "records"]) => {
                    let mut results = Vec::new();
                    for rec in body["records"].as_array().cloned().unwrap_or_default() {
                        if let Some(slot) = rows.iter_mut().find(|r| r["Id"] == rec["Id"]) {
                            *slot = rec.clone();
                            results.push(json!({ "success": true, "data": rec }));
                        } else {
                            results.push(json!({ "success": false, "message": "missing" }));
                        }
                    }
                    (200, json!({ "success": true, "results": results }))
                }
                ("DELETE", ["tables", _, "records"]) => {
                    let mut results = Vec::new();
                    for id in body["recordIds"].as_array().cloned().unwrap_or_default() {
                        let before = rows.len();
                        rows.retain(|r| r["Id"] != id);
                        results.push(json!({ "success": rows.len() < before }));
                    }
                    (200, json!({ "success": true, "results": results }))
                }
                _ => (404, json!({ "success": false })),
            }
        }
    }

    fn serve_one(stream: TcpStream, api: &Arc<Mutex<FakeApi>>) -> std::io::Result<()> {
        let mut reader = BufReader::new(stream.try_clone()?);
        let mut request_line = String::new();
        reader.read_line(&mut request_line)?;
        let mut parts = request_line.split_whitespace();
        let method = parts.next().unwrap_or("").to_string();
        let path = parts.next().unwrap_or("").to_string();

        let mut content_length = 0usize;
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
                }
            }
        }
        let mut body = vec![0u8; content_length];
        reader.read_exact(&mut body)?;
        let body: Value = serde_json::from_slice(&body).unwrap_or(Value::Null);

        let (status, payload) = api.lock().expect("fake api lock").handle(&method, &path, body);
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

    fn spawn_fake_api(api: FakeApi) -> (String, Arc<Mutex<FakeApi>>) {
        let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
        let addr = listener.local_addr().expect("addr");
        let api = Arc::new(Mutex::new(api));
        let shared = Arc::clone(&api);
        thread::spawn(move || {
            for stream in listener.incoming() {
                let Ok(stream) = stream else { break };
                let _ = serve_one(stream, &shared);
            }
        });
        (format!("http://{}", addr), api)
    }

    fn store(base: &str) -> RemoteStore {
        RemoteStore::new(base, Some("secret".into()), Duration::from_secs(5)).expect("client")
    }

    fn student_draft(first: &str) -> StudentDraft {
        StudentDraft {
            first_name: first.into(),
            last_name: "Remote".into(),
            grade_level: 12,
            email: String::new(),
            phone: String::new(),
            status: None,
            enrollment_date: Some("2024-08-26".parse().expect("date")),
        }
    }

    #[test]
    fn create_get_update_delete_against_record_api() {
        let (base, api) = spawn_fake_api(FakeApi::default());
        let store = store(&base);

        let created: Student = store.create(student_draft("Kai")).expect("create");
        assert_eq!(created.id, 1);
        let fetched: Student = store.get_by_id(created.id).expect("get");
        assert_eq!(created, fetched);

        let updated: Student = store
            .update(
                created.id,
                StudentPatch {
                    grade_level: Some(11),
                    ..Default::default()
                },
            )
            .expect("update");
        assert_eq!(updated.grade_level, 11);
        assert_eq!(updated.first_name, "Kai");

        store.delete::<Student>(created.id).expect("delete");
        let err = store.get_by_id::<Student>(created.id).expect_err("gone");
        assert_eq!(err.code(), "not_found");

        let api = api.lock().expect("lock");
        let (_, path, body) = &api.requests[0];
        assert_eq!(path, "/tables/student/records");
        assert!(body["records"][0].get("Id").is_none());
    }

    #[test]
    fn fetch_sends_field_list_and_conditions() {
        let (base, api) = spawn_fake_api(FakeApi::default());
        let store = store(&base);
        for student_id in [1, 2, 1] {
            let _: Grade = store
                .create(GradeDraft {
                    student_id,
                    assignment_id: 3,
                    score: 80.0,
                    submitted_date: None,
                })
                .expect("grade");
        }
        let rows: Vec<Grade> = store.find_by("studentId", json!(1)).expect("find");
        assert_eq!(rows.len(), 2);

        let api = api.lock().expect("lock");
        let (method, path, body) = api.requests.last().expect("request");
        assert_eq!(method, "POST");
        assert_eq!(path, "/tables/grade/fetch");
        assert_eq!(body["fields"][0], json!("Id"));
        assert_eq!(body["where"][0]["field"], json!("studentId"));
    }

    #[test]
    fn fetch_walks_every_page() {
        let (base, api) = spawn_fake_api(FakeApi::default());
        let store = store(&base).with_page_size(2);
        for name in ["A", "B", "C", "D", "E"] {
            let _: Student = store.create(student_draft(name)).expect("create");
        }
        let first_fetch = api.lock().expect("lock").requests.len();

        let all: Vec<Student> = store.get_all().expect("all");
        let names: Vec<&str> = all.iter().map(|s| s.first_name.as_str()).collect();
        assert_eq!(names, ["A", "B", "C", "D", "E"]);

        let api = api.lock().expect("lock");
        let offsets: Vec<Value> = api.requests[first_fetch..]
            .iter()
            .map(|(_, _, body)| body["pagingInfo"]["offset"].clone())
            .collect();
        assert_eq!(offsets, [json!(0), json!(2), json!(4)]);
        assert_eq!(api.requests[first_fetch].2["pagingInfo"]["limit"], json!(2));
    }

    #[test]
    fn exact_multiple_of_page_size_ends_on_empty_page() {
        let (base, api) = spawn_fake_api(FakeApi::default());
        let store = store(&base).with_page_size(2);
        for name in ["A", "B", "C", "D"] {
            let _: Student = store.create(student_draft(name)).expect("create");
        }
        let before = api.lock().expect("lock").requests.len();
        let all: Vec<Student> = store.get_all().expect("all");
        assert_eq!(all.len(), 4);
        assert_eq!(api.lock().expect("lock").requests.len() - before, 3);
    }

    #[test]
    fn missing_records_are_not_found_for_update_and_delete() {
        let (base, _api) = spawn_fake_api(FakeApi::default());
        let store = store(&base);
        let err = store
            .update::<AttendanceRecord>(5, Default::default())
            .expect_err("update");
        assert_eq!(err.code(), "not_found");
        let err = store.delete::<AttendanceRecord>(5).expect_err("delete");
        assert_eq!(err.code(), "not_found");
    }

    #[test]
    fn failed_batch_result_is_operation_failed() {
        let (base, _api) = spawn_fake_api(FakeApi {
            reject_writes: true,
            ..Default::default()
        });
        let store = store(&base);
        let err = store
            .create::<AttendanceRecord>(crate::model::AttendanceDraft {
                student_id: 1,
                date: "2024-09-02".parse().expect("date"),
                status: AttendanceStatus::Present,
                notes: String::new(),
            })
            .expect_err("rejected");
        match err {
            StoreError::OperationFailed { op, message } => {
                assert_eq!(op, "create");
                assert!(message.contains("validation"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn unreachable_api_is_operation_failed() {
        let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
        let addr = listener.local_addr().expect("addr");
        drop(listener);
        let store = RemoteStore::new(&format!("http://{}", addr), None, Duration::from_secs(2))
            .expect("client");
        let err = store.get_all::<Student>().expect_err("offline");
        assert_eq!(err.code(), "operation_failed");
    }
}
