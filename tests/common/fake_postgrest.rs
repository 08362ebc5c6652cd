//! In-process stand-in for a PostgREST endpoint
//!
//! Understands the subset of PostgREST the points store speaks: `eq.` filters,
//! `limit`, `order=created_at.desc`, the `account:points(points)` embedding and
//! `Prefer: return=representation` on writes. Every request is recorded so
//! tests can assert on the wire format.

use axum::{
    extract::{Path, Query, State},
    http::{HeaderMap, Method, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde_json::{json, Map, Value};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tokio::net::TcpListener;

use super::constants::*;

#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub method: Method,
    pub table: String,
    pub query: HashMap<String, String>,
    pub apikey: Option<String>,
    pub authorization: Option<String>,
    pub prefer: Option<String>,
    pub body: Option<Value>,
}

#[derive(Default)]
struct FakeDb {
    accounts: Vec<Map<String, Value>>,
    history: Vec<Map<String, Value>>,
    next_id: u64,
    requests: Vec<RecordedRequest>,
    /// Points added to an account right before the next guarded update runs.
    concurrent_bumps: Vec<(String, u32)>,
    /// Tables whose inserts fail with a 500.
    failing_inserts: Vec<String>,
    /// Phone numbers that show up as existing only when inserted.
    racing_inserts: Vec<(String, u32)>,
}

type SharedDb = Arc<Mutex<FakeDb>>;

/// A fake PostgREST server listening on a random local port.
///
/// The server task is aborted on drop.
pub struct FakePostgrest {
    pub url: String,
    db: SharedDb,
    handle: tokio::task::JoinHandle<()>,
}

impl FakePostgrest {
    pub async fn spawn() -> Self {
        let db: SharedDb = Arc::new(Mutex::new(FakeDb {
            next_id: 1,
            ..Default::default()
        }));

        let app = Router::new()
            .route(
                "/rest/v1/{table}",
                get(handle_get).post(handle_post).patch(handle_patch),
            )
            .with_state(db.clone());

        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind fake PostgREST");
        let port = listener.local_addr().expect("No local address").port();

        let handle = tokio::spawn(async move {
            axum::serve(listener, app)
                .await
                .expect("Fake PostgREST failed");
        });

        Self {
            url: format!("http://127.0.0.1:{}", port),
            db,
            handle,
        }
    }

    /// Inserts an account row directly.
    pub fn seed_account(&self, phone_number: &str, points: u32) {
        let mut db = self.db.lock().unwrap();
        let row = db.account_row(phone_number, points);
        db.accounts.push(row);
    }

    pub fn points_of(&self, phone_number: &str) -> Option<u32> {
        let db = self.db.lock().unwrap();
        db.accounts
            .iter()
            .find(|row| row["phone_number"] == phone_number)
            .and_then(|row| row["points"].as_u64())
            .map(|points| points as u32)
    }

    pub fn history_len(&self) -> usize {
        self.db.lock().unwrap().history.len()
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.db.lock().unwrap().requests.clone()
    }

    /// Simulates another kiosk adding `points` between our read and our write.
    pub fn bump_before_next_update(&self, phone_number: &str, points: u32) {
        self.db
            .lock()
            .unwrap()
            .concurrent_bumps
            .push((phone_number.to_string(), points));
    }

    /// Simulates another kiosk creating the account between our read and our insert.
    pub fn create_before_next_insert(&self, phone_number: &str, points: u32) {
        self.db
            .lock()
            .unwrap()
            .racing_inserts
            .push((phone_number.to_string(), points));
    }

    pub fn fail_inserts_into(&self, table: &str) {
        self.db
            .lock()
            .unwrap()
            .failing_inserts
            .push(table.to_string());
    }
}

impl Drop for FakePostgrest {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

impl FakeDb {
    fn take_id(&mut self) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    fn account_row(&mut self, phone_number: &str, points: u32) -> Map<String, Value> {
        let now = chrono::Utc::now();
        let row = json!({
            "id": self.take_id(),
            "phone_number": phone_number,
            "points": points,
            "created_at": now,
            "updated_at": now,
        });
        match row {
            Value::Object(map) => map,
            _ => unreachable!(),
        }
    }

    fn record(
        &mut self,
        method: Method,
        table: &str,
        query: &HashMap<String, String>,
        headers: &HeaderMap,
        body: Option<Value>,
    ) {
        let header = |name: &str| {
            headers
                .get(name)
                .and_then(|v| v.to_str().ok())
                .map(String::from)
        };
        self.requests.push(RecordedRequest {
            method,
            table: table.to_string(),
            query: query.clone(),
            apikey: header("apikey"),
            authorization: header("authorization"),
            prefer: header("prefer"),
            body,
        });
    }
}

fn authorized(headers: &HeaderMap) -> bool {
    let bearer = format!("Bearer {}", STORE_KEY);
    headers.get("apikey").and_then(|v| v.to_str().ok()) == Some(STORE_KEY)
        && headers.get("authorization").and_then(|v| v.to_str().ok()) == Some(bearer.as_str())
}

fn postgrest_error(status: StatusCode, code: &str, message: &str, details: Value) -> Response {
    (
        status,
        Json(json!({
            "code": code,
            "details": details,
            "hint": null,
            "message": message,
        })),
    )
        .into_response()
}

fn unauthorized() -> Response {
    postgrest_error(
        StatusCode::UNAUTHORIZED,
        "PGRST301",
        "JWT could not be decoded",
        Value::Null,
    )
}

fn unknown_table(table: &str) -> Response {
    postgrest_error(
        StatusCode::NOT_FOUND,
        "42P01",
        &format!("relation \"public.{}\" does not exist", table),
        Value::Null,
    )
}

/// Splits `eq.value` filters out of the query string.
fn eq_filters(query: &HashMap<String, String>) -> Vec<(String, String)> {
    query
        .iter()
        .filter_map(|(key, value)| {
            value
                .strip_prefix("eq.")
                .map(|v| (key.clone(), v.to_string()))
        })
        .collect()
}

fn matches(row: &Map<String, Value>, filters: &[(String, String)]) -> bool {
    filters.iter().all(|(column, expected)| match row.get(column) {
        Some(Value::String(s)) => s == expected,
        Some(Value::Number(n)) => n.to_string() == *expected,
        _ => false,
    })
}

async fn handle_get(
    State(db): State<SharedDb>,
    Path(table): Path<String>,
    Query(query): Query<HashMap<String, String>>,
    headers: HeaderMap,
) -> Response {
    let mut db = db.lock().unwrap();
    db.record(Method::GET, &table, &query, &headers, None);
    if !authorized(&headers) {
        return unauthorized();
    }

    let filters = eq_filters(&query);
    match table.as_str() {
        POINTS_TABLE => {
            let limit = query
                .get("limit")
                .and_then(|l| l.parse::<usize>().ok())
                .unwrap_or(usize::MAX);
            let rows: Vec<Value> = db
                .accounts
                .iter()
                .filter(|row| matches(row, &filters))
                .take(limit)
                .cloned()
                .map(Value::Object)
                .collect();
            Json(rows).into_response()
        }
        HISTORY_TABLE => {
            let embed = query
                .get("select")
                .map(|s| s.contains(&format!("account:{}(points)", POINTS_TABLE)))
                .unwrap_or(false);
            let mut rows: Vec<Map<String, Value>> = db
                .history
                .iter()
                .filter(|row| matches(row, &filters))
                .cloned()
                .collect();
            if query.get("order").map(String::as_str) == Some("created_at.desc") {
                rows.sort_by(|a, b| {
                    let key = |row: &Map<String, Value>| {
                        (
                            row["created_at"].as_str().unwrap_or_default().to_string(),
                            row["id"].as_u64().unwrap_or_default(),
                        )
                    };
                    key(b).cmp(&key(a))
                });
            }
            if embed {
                for row in rows.iter_mut() {
                    let account = db
                        .accounts
                        .iter()
                        .find(|account| account["phone_number"] == row["phone_number"])
                        .map(|account| json!({ "points": account["points"] }))
                        .unwrap_or(Value::Null);
                    row.insert("account".to_string(), account);
                }
            }
            Json(rows.into_iter().map(Value::Object).collect::<Vec<_>>()).into_response()
        }
        other => unknown_table(other),
    }
}

async fn handle_post(
    State(db): State<SharedDb>,
    Path(table): Path<String>,
    Query(query): Query<HashMap<String, String>>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    let mut db = db.lock().unwrap();
    db.record(Method::POST, &table, &query, &headers, Some(body.clone()));
    if !authorized(&headers) {
        return unauthorized();
    }
    if db.failing_inserts.contains(&table) {
        return postgrest_error(
            StatusCode::INTERNAL_SERVER_ERROR,
            "XX000",
            "insert failed",
            Value::Null,
        );
    }

    let new_rows: Vec<Map<String, Value>> = match body {
        Value::Array(items) => items
            .into_iter()
            .filter_map(|item| match item {
                Value::Object(map) => Some(map),
                _ => None,
            })
            .collect(),
        Value::Object(map) => vec![map],
        _ => return StatusCode::BAD_REQUEST.into_response(),
    };

    let mut created = Vec::new();
    match table.as_str() {
        POINTS_TABLE => {
            let racing = std::mem::take(&mut db.racing_inserts);
            for (phone_number, points) in racing {
                let row = db.account_row(&phone_number, points);
                db.accounts.push(row);
            }
            for mut row in new_rows {
                let phone = row.get("phone_number").cloned().unwrap_or(Value::Null);
                if db.accounts.iter().any(|a| a["phone_number"] == phone) {
                    return postgrest_error(
                        StatusCode::CONFLICT,
                        "23505",
                        "duplicate key value violates unique constraint \"points_phone_number_key\"",
                        json!(format!("Key (phone_number)=({}) already exists.", phone)),
                    );
                }
                let id = db.take_id();
                row.insert("id".to_string(), json!(id));
                db.accounts.push(row.clone());
                created.push(Value::Object(row));
            }
        }
        HISTORY_TABLE => {
            for mut row in new_rows {
                let id = db.take_id();
                row.insert("id".to_string(), json!(id));
                db.history.push(row.clone());
                created.push(Value::Object(row));
            }
        }
        other => return unknown_table(other),
    }

    let representation = headers
        .get("prefer")
        .and_then(|v| v.to_str().ok())
        .map(|v| v.contains("return=representation"))
        .unwrap_or(false);
    if representation {
        (StatusCode::CREATED, Json(created)).into_response()
    } else {
        StatusCode::CREATED.into_response()
    }
}

async fn handle_patch(
    State(db): State<SharedDb>,
    Path(table): Path<String>,
    Query(query): Query<HashMap<String, String>>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    let mut db = db.lock().unwrap();
    db.record(Method::PATCH, &table, &query, &headers, Some(body.clone()));
    if !authorized(&headers) {
        return unauthorized();
    }
    if table != POINTS_TABLE {
        return unknown_table(&table);
    }

    let bumps = std::mem::take(&mut db.concurrent_bumps);
    for (phone_number, points) in bumps {
        if let Some(row) = db
            .accounts
            .iter_mut()
            .find(|row| row["phone_number"] == phone_number.as_str())
        {
            let current = row["points"].as_u64().unwrap_or_default();
            row.insert("points".to_string(), json!(current + points as u64));
        }
    }

    let Value::Object(changes) = body else {
        return StatusCode::BAD_REQUEST.into_response();
    };
    let filters = eq_filters(&query);
    let mut updated = Vec::new();
    for row in db.accounts.iter_mut() {
        if matches(row, &filters) {
            for (column, value) in changes.iter() {
                row.insert(column.clone(), value.clone());
            }
            updated.push(Value::Object(row.clone()));
        }
    }

    Json(updated).into_response()
}
