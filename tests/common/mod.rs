//! In-process stand-in for the chanting REST API.
#![allow(dead_code)]

use axum::{
    extract::{Path, Query, State},
    http::{header, HeaderMap, StatusCode},
    response::{AppendHeaders, IntoResponse, Response},
    routing::{delete, get, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;

pub const GOOD_ID_TOKEN: &str = "good-google-token";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthMode {
    Normal,
    /// Every protected route answers 401, refresh still succeeds.
    AlwaysUnauthorized,
    /// Every protected route answers 401 with the terminal error code.
    Revoked,
    /// Refresh answers 401.
    RefreshBroken,
}

#[derive(Debug, Clone)]
pub struct Entry {
    pub id: i64,
    pub date: String,
    pub rounds: u32,
}

struct BackendState {
    mode: AuthMode,
    session_token: u64,
    refresh_valid: bool,
    refresh_calls: u32,
    identity_calls: u32,
    identity_delay: Duration,
    user: Value,
    entries: Vec<Entry>,
    next_id: i64,
}

#[derive(Clone)]
pub struct MockBackend {
    pub base_url: String,
    state: Arc<Mutex<BackendState>>,
}

impl MockBackend {
    /// Serves on the current runtime.
    pub async fn start() -> Self {
        let state = Arc::new(Mutex::new(BackendState {
            mode: AuthMode::Normal,
            session_token: 1,
            refresh_valid: false,
            refresh_calls: 0,
            identity_calls: 0,
            identity_delay: Duration::ZERO,
            user: json!({
                "email": "a@b.com",
                "firstName": "Radha",
                "lastName": "Dasi",
                "phoneNumber": "9876543210",
                "countryCode": "+91",
                "roles": ["USER"],
                "status": "ACTIVE",
                "committedRounds": 16,
                "createdAt": "2024-01-01T08:00:00",
                "facilitatorName": "Guru"
            }),
            entries: vec![
                Entry { id: 1, date: "2023-12-30".into(), rounds: 12 },
                Entry { id: 2, date: "2023-12-31".into(), rounds: 16 },
            ],
            next_id: 3,
        }));

        let app = Router::new()
            .route("/auth/google", post(google))
            .route("/auth/refresh", post(refresh))
            .route("/auth/logout", post(logout))
            .route("/auth/logoutAll", post(logout))
            .route("/auth/user", post(signup))
            .route("/api/users/auth", get(identity))
            .route("/api/users", get(get_user).put(put_user))
            .route("/api/chanting", get(list).post(create).put(update))
            .route("/api/chanting/dashboard", get(dashboard))
            .route("/api/chanting/:id", delete(remove))
            .with_state(Arc::clone(&state));

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind mock backend");
        let addr = listener.local_addr().expect("mock backend address");
        tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });

        Self {
            base_url: format!("http://{addr}"),
            state,
        }
    }

    /// Serves on a runtime of its own, so it outlives any single test.
    pub fn start_detached() -> Self {
        let (tx, rx) = std::sync::mpsc::channel();
        std::thread::spawn(move || {
            let runtime = tokio::runtime::Builder::new_multi_thread()
                .enable_all()
                .build()
                .expect("mock backend runtime");
            runtime.block_on(async move {
                let backend = MockBackend::start().await;
                tx.send(backend).expect("hand over mock backend");
                std::future::pending::<()>().await;
            });
        });
        rx.recv().expect("mock backend started")
    }

    pub async fn set_mode(&self, mode: AuthMode) {
        self.state.lock().await.mode = mode;
    }

    /// Invalidates the current session cookie; the refresh cookie stays valid.
    pub async fn expire_session(&self) {
        self.state.lock().await.session_token += 1;
    }

    pub async fn set_identity_delay(&self, delay: Duration) {
        self.state.lock().await.identity_delay = delay;
    }

    pub async fn set_user_field(&self, field: &str, value: Value) {
        self.state.lock().await.user[field] = value;
    }

    pub async fn refresh_calls(&self) -> u32 {
        self.state.lock().await.refresh_calls
    }

    pub async fn identity_calls(&self) -> u32 {
        self.state.lock().await.identity_calls
    }

    pub async fn entries(&self) -> Vec<Entry> {
        self.state.lock().await.entries.clone()
    }

    pub async fn insert_entry(&self, date: &str, rounds: u32) -> i64 {
        let mut state = self.state.lock().await;
        let id = state.next_id;
        state.next_id += 1;
        state.entries.push(Entry { id, date: date.to_string(), rounds });
        id
    }
}

type Shared = Arc<Mutex<BackendState>>;

fn cookie(headers: &HeaderMap, name: &str) -> Option<String> {
    let raw = headers.get(header::COOKIE)?.to_str().ok()?;
    raw.split(';').find_map(|pair| {
        let (key, value) = pair.trim().split_once('=')?;
        (key == name).then(|| value.to_string())
    })
}

fn unauthorized(code: &str, message: &str) -> Response {
    (
        StatusCode::UNAUTHORIZED,
        Json(json!({ "errorCode": code, "errorMessage": message })),
    )
        .into_response()
}

fn authorize(state: &BackendState, headers: &HeaderMap) -> Result<(), Response> {
    match state.mode {
        AuthMode::Revoked => return Err(unauthorized("00001", "Logged out")),
        AuthMode::AlwaysUnauthorized => return Err(unauthorized("00002", "Session expired")),
        _ => {}
    }
    let expected = format!("s{}", state.session_token);
    if cookie(headers, "session").as_deref() == Some(expected.as_str()) {
        Ok(())
    } else {
        Err(unauthorized("00002", "Session expired"))
    }
}

fn entry_json(entry: &Entry) -> Value {
    json!({
        "chantingId": entry.id,
        "chantingDate": entry.date,
        "chantingRounds": entry.rounds
    })
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct GoogleBody {
    id_token: String,
}

async fn google(State(state): State<Shared>, Json(body): Json<GoogleBody>) -> Response {
    if body.id_token != GOOD_ID_TOKEN {
        return (
            StatusCode::FORBIDDEN,
            Json(json!({ "errorCode": "E403", "errorMessage": "Unknown Google account" })),
        )
            .into_response();
    }
    let mut state = state.lock().await;
    state.refresh_valid = true;
    let session = format!("session=s{}; Path=/; HttpOnly", state.session_token);
    (
        AppendHeaders([
            (header::SET_COOKIE, session),
            (header::SET_COOKIE, "refresh=r1; Path=/auth; HttpOnly".to_string()),
        ]),
        Json(json!({ "userDto": state.user })),
    )
        .into_response()
}

async fn refresh(State(state): State<Shared>, headers: HeaderMap) -> Response {
    let mut state = state.lock().await;
    state.refresh_calls += 1;
    let has_refresh = cookie(&headers, "refresh").as_deref() == Some("r1");
    if state.mode == AuthMode::RefreshBroken || !state.refresh_valid || !has_refresh {
        return unauthorized("00001", "Refresh token expired");
    }
    let session = format!("session=s{}; Path=/; HttpOnly", state.session_token);
    (AppendHeaders([(header::SET_COOKIE, session)]), Json(json!({}))).into_response()
}

async fn logout(State(state): State<Shared>) -> Response {
    let mut state = state.lock().await;
    state.refresh_valid = false;
    state.session_token += 1;
    (
        AppendHeaders([
            (header::SET_COOKIE, "session=; Max-Age=0; Path=/".to_string()),
            (header::SET_COOKIE, "refresh=; Max-Age=0; Path=/auth".to_string()),
        ]),
        StatusCode::OK,
    )
        .into_response()
}

async fn signup(Json(body): Json<Value>) -> Response {
    if body["email"] == "taken@b.com" {
        return (
            StatusCode::CONFLICT,
            Json(json!({ "errorCode": "E409", "errorMessage": "Email already registered" })),
        )
            .into_response();
    }
    let mut user = body;
    user["roles"] = json!(["USER"]);
    user["status"] = json!("INACTIVE");
    Json(user).into_response()
}

async fn identity(State(state): State<Shared>, headers: HeaderMap) -> Response {
    let delay = {
        let mut state = state.lock().await;
        state.identity_calls += 1;
        state.identity_delay
    };
    if !delay.is_zero() {
        tokio::time::sleep(delay).await;
    }
    let state = state.lock().await;
    if let Err(response) = authorize(&state, &headers) {
        return response;
    }
    Json(state.user.clone()).into_response()
}

async fn get_user(State(state): State<Shared>, headers: HeaderMap) -> Response {
    let state = state.lock().await;
    if let Err(response) = authorize(&state, &headers) {
        return response;
    }
    Json(state.user.clone()).into_response()
}

async fn put_user(
    State(state): State<Shared>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    let mut state = state.lock().await;
    if let Err(response) = authorize(&state, &headers) {
        return response;
    }
    let mut user = body;
    user["status"] = json!("ACTIVE");
    state.user = user.clone();
    Json(user).into_response()
}

#[derive(Deserialize)]
struct ListQuery {
    page: Option<usize>,
    size: Option<usize>,
    sort: Option<String>,
}

async fn list(
    State(state): State<Shared>,
    headers: HeaderMap,
    Query(query): Query<ListQuery>,
) -> Response {
    let state = state.lock().await;
    if let Err(response) = authorize(&state, &headers) {
        return response;
    }
    let mut entries = state.entries.clone();
    entries.sort_by(|a, b| a.date.cmp(&b.date));
    if query.sort.as_deref().is_some_and(|sort| sort.ends_with(",desc")) {
        entries.reverse();
    }
    let size = query.size.unwrap_or(10).max(1);
    let page = query.page.unwrap_or(0);
    let total_pages = entries.len().div_ceil(size);
    let content: Vec<Value> = entries
        .iter()
        .skip(page * size)
        .take(size)
        .map(entry_json)
        .collect();
    Json(json!({ "content": content, "totalPages": total_pages })).into_response()
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct EntryBody {
    chanting_id: Option<i64>,
    chanting_date: String,
    chanting_rounds: u32,
}

async fn create(
    State(state): State<Shared>,
    headers: HeaderMap,
    Json(body): Json<EntryBody>,
) -> Response {
    let mut state = state.lock().await;
    if let Err(response) = authorize(&state, &headers) {
        return response;
    }
    let id = state.next_id;
    state.next_id += 1;
    let entry = Entry {
        id,
        date: body.chanting_date,
        rounds: body.chanting_rounds,
    };
    let payload = entry_json(&entry);
    state.entries.push(entry);
    (StatusCode::CREATED, Json(payload)).into_response()
}

async fn update(
    State(state): State<Shared>,
    headers: HeaderMap,
    Json(body): Json<EntryBody>,
) -> Response {
    let mut state = state.lock().await;
    if let Err(response) = authorize(&state, &headers) {
        return response;
    }
    let Some(entry) = state
        .entries
        .iter_mut()
        .find(|entry| Some(entry.id) == body.chanting_id)
    else {
        return not_found();
    };
    entry.rounds = body.chanting_rounds;
    Json(entry_json(entry)).into_response()
}

async fn remove(State(state): State<Shared>, headers: HeaderMap, Path(id): Path<i64>) -> Response {
    let mut state = state.lock().await;
    if let Err(response) = authorize(&state, &headers) {
        return response;
    }
    let before = state.entries.len();
    state.entries.retain(|entry| entry.id != id);
    if state.entries.len() == before {
        return not_found();
    }
    StatusCode::NO_CONTENT.into_response()
}

fn not_found() -> Response {
    (
        StatusCode::NOT_FOUND,
        Json(json!({ "errorCode": "E404", "errorMessage": "Record not found" })),
    )
        .into_response()
}

async fn dashboard(
    State(state): State<Shared>,
    headers: HeaderMap,
    Query(query): Query<HashMap<String, String>>,
) -> Response {
    let state = state.lock().await;
    if let Err(response) = authorize(&state, &headers) {
        return response;
    }
    let from = query.get("fromDate").cloned().unwrap_or_default();
    let to = query.get("toDate").cloned().unwrap_or_else(|| "9999-12-31".to_string());
    let selected: Vec<&Entry> = state
        .entries
        .iter()
        .filter(|entry| entry.date >= from && entry.date <= to)
        .collect();
    let average = if selected.is_empty() {
        0.0
    } else {
        selected.iter().map(|entry| f64::from(entry.rounds)).sum::<f64>() / selected.len() as f64
    };
    Json(json!({
        "committedRounds": state.user["committedRounds"],
        "idealRounds": 16,
        "averageRounds": average,
        "currentStreak": selected.len(),
        "chantingDtoList": selected.iter().map(|entry| entry_json(entry)).collect::<Vec<_>>()
    }))
    .into_response()
}
