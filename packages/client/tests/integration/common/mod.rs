use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::Value;

use client::{ClientState, LocalStore};
use ::common::config::{ApiConfig, ChannelConfig, ClientConfig, HttpConfig};

/// Canned HTTP reply.
#[derive(Clone, Debug)]
pub struct Reply {
    pub status: u16,
    pub body: String,
}

impl Reply {
    pub fn json(status: u16, body: Value) -> Self {
        Self {
            status,
            body: body.to_string(),
        }
    }

    pub fn ok(body: Value) -> Self {
        Self::json(200, body)
    }

    pub fn empty() -> Self {
        Self {
            status: 200,
            body: String::new(),
        }
    }

    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        (status, [(header::CONTENT_TYPE, "application/json")], self.body).into_response()
    }
}

/// What a stream endpoint sends after the upgrade.
#[derive(Clone, Debug, Default)]
pub struct Script {
    pub frames: Vec<String>,
    /// Send a close frame after the last frame instead of waiting for the
    /// client to hang up.
    pub hang_up: bool,
}

impl Script {
    pub fn frames(frames: &[Value]) -> Self {
        Self {
            frames: frames.iter().map(Value::to_string).collect(),
            hang_up: false,
        }
    }

    pub fn raw(frames: &[&str]) -> Self {
        Self {
            frames: frames.iter().map(|f| f.to_string()).collect(),
            hang_up: false,
        }
    }

    pub fn then_hang_up(mut self) -> Self {
        self.hang_up = true;
        self
    }
}

/// Backend state shared by every route of the test server.
#[derive(Default)]
pub struct Backend {
    submissions: Mutex<HashMap<String, Vec<Reply>>>,
    problems: Mutex<HashMap<String, Reply>>,
    contests: Mutex<Option<Reply>>,
    registration: Mutex<Option<Reply>>,
    leaderboard: Mutex<Option<Reply>>,
    analysis: Mutex<Option<Reply>>,
    streams: Mutex<HashMap<String, Script>>,
    /// Request log: (route, bearer token, body).
    pub requests: Mutex<Vec<(String, Option<String>, Value)>>,
    /// Stream keys a client connected to, in order.
    pub connections: Mutex<Vec<String>>,
    /// Stream keys whose client sent a close frame.
    pub client_closes: Mutex<Vec<String>>,
}

impl Backend {
    /// Replies for successive fetches of one submission; the last repeats.
    pub fn submission(&self, id: &str, replies: Vec<Reply>) {
        self.submissions.lock().unwrap().insert(id.to_string(), replies);
    }

    pub fn problem(&self, id: &str, reply: Reply) {
        self.problems.lock().unwrap().insert(id.to_string(), reply);
    }

    pub fn contests(&self, reply: Reply) {
        *self.contests.lock().unwrap() = Some(reply);
    }

    pub fn registration(&self, reply: Reply) {
        *self.registration.lock().unwrap() = Some(reply);
    }

    pub fn leaderboard(&self, reply: Reply) {
        *self.leaderboard.lock().unwrap() = Some(reply);
    }

    pub fn analysis(&self, reply: Reply) {
        *self.analysis.lock().unwrap() = Some(reply);
    }

    /// Script for `ws/submission/{id}` or `ws/leaderboard/{key}`.
    pub fn stream(&self, key: &str, script: Script) {
        self.streams.lock().unwrap().insert(key.to_string(), script);
    }

    pub fn requests_to(&self, prefix: &str) -> Vec<(String, Option<String>, Value)> {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .filter(|(route, _, _)| route.starts_with(prefix))
            .cloned()
            .collect()
    }

    fn record(&self, route: String, headers: &HeaderMap, body: Value) {
        let bearer = headers
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.strip_prefix("Bearer "))
            .map(str::to_string);
        self.requests.lock().unwrap().push((route, bearer, body));
    }
}

type Shared = State<Arc<Backend>>;

fn has_bearer(headers: &HeaderMap) -> bool {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.starts_with("Bearer ") && v.len() > "Bearer ".len())
}

fn unauthorized() -> Response {
    Reply::json(401, serde_json::json!({"detail": "Invalid token"})).into_response()
}

async fn get_submission(State(backend): Shared, Path(id): Path<String>, headers: HeaderMap) -> Response {
    backend.record(format!("submission/{id}"), &headers, Value::Null);
    if !has_bearer(&headers) {
        return unauthorized();
    }
    let mut submissions = backend.submissions.lock().unwrap();
    let reply = match submissions.get_mut(&id) {
        Some(replies) if replies.len() > 1 => replies.remove(0),
        Some(replies) if !replies.is_empty() => replies[0].clone(),
        _ => Reply::json(404, serde_json::json!({"detail": "Submission not found"})),
    };
    reply.into_response()
}

async fn get_problem(State(backend): Shared, Path(id): Path<String>, headers: HeaderMap) -> Response {
    backend.record(format!("problem/{id}"), &headers, Value::Null);
    if !has_bearer(&headers) {
        return unauthorized();
    }
    let reply = backend.problems.lock().unwrap().get(&id).cloned();
    reply
        .unwrap_or_else(|| Reply::json(404, serde_json::json!({"message": "Problem not found"})))
        .into_response()
}

fn configured(slot: &Mutex<Option<Reply>>) -> Response {
    slot.lock()
        .unwrap()
        .clone()
        .unwrap_or_else(|| Reply::json(503, serde_json::json!({"message": "not configured"})))
        .into_response()
}

async fn list_contests(State(backend): Shared, headers: HeaderMap) -> Response {
    backend.record("contests".into(), &headers, Value::Null);
    configured(&backend.contests)
}

async fn register(State(backend): Shared, headers: HeaderMap, Json(body): Json<Value>) -> Response {
    backend.record("register".into(), &headers, body);
    if !has_bearer(&headers) {
        return unauthorized();
    }
    configured(&backend.registration)
}

async fn get_leaderboard(
    State(backend): Shared,
    Query(query): Query<HashMap<String, String>>,
    headers: HeaderMap,
) -> Response {
    let title = query.get("contest_title").cloned().unwrap_or_default();
    backend.record(format!("leaderboard?{title}"), &headers, Value::Null);
    configured(&backend.leaderboard)
}

async fn analyze(State(backend): Shared, headers: HeaderMap, Json(body): Json<Value>) -> Response {
    backend.record("analyze".into(), &headers, body);
    configured(&backend.analysis)
}

async fn submission_stream(
    State(backend): Shared,
    Path(id): Path<String>,
    ws: WebSocketUpgrade,
) -> Response {
    let key = format!("submission/{id}");
    open_stream(backend, key, ws)
}

async fn leaderboard_stream(
    State(backend): Shared,
    Path(title): Path<String>,
    ws: WebSocketUpgrade,
) -> Response {
    let key = format!("leaderboard/{title}");
    open_stream(backend, key, ws)
}

fn open_stream(backend: Arc<Backend>, key: String, ws: WebSocketUpgrade) -> Response {
    let Some(script) = backend.streams.lock().unwrap().get(&key).cloned() else {
        return StatusCode::NOT_FOUND.into_response();
    };
    backend.connections.lock().unwrap().push(key.clone());
    ws.on_upgrade(move |socket| play(socket, backend, key, script))
}

async fn play(mut socket: WebSocket, backend: Arc<Backend>, key: String, script: Script) {
    for frame in script.frames {
        if socket.send(Message::Text(frame.into())).await.is_err() {
            return;
        }
    }
    if script.hang_up {
        let _ = socket.send(Message::Close(None)).await;
        return;
    }
    while let Some(Ok(message)) = socket.recv().await {
        if let Message::Close(_) = message {
            backend.client_closes.lock().unwrap().push(key);
            return;
        }
    }
}

/// A running mock backend and a client configured against it.
pub struct TestApp {
    pub addr: SocketAddr,
    pub backend: Arc<Backend>,
    pub state: ClientState,
}

impl TestApp {
    pub async fn spawn() -> Self {
        Self::spawn_with_store(None).await
    }

    pub async fn spawn_with_store(store: Option<LocalStore>) -> Self {
        let backend = Arc::new(Backend::default());
        let app = Router::new()
            .route("/api/submission/{id}", get(get_submission))
            .route("/api/problems/{id}", get(get_problem))
            .route("/contests/", get(list_contests))
            .route("/register/", post(register))
            .route("/leaderboard/", get(get_leaderboard))
            .route("/analyze/", post(analyze))
            .route("/ws/submission/{id}/", get(submission_stream))
            .route("/ws/leaderboard/{title}/", get(leaderboard_stream))
            .with_state(Arc::clone(&backend));

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind to random port");
        let addr = listener.local_addr().unwrap();

        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        let config = client_config(addr);
        let state = ClientState::new(config, store).expect("Failed to build client state");

        Self {
            addr,
            backend,
            state,
        }
    }
}

pub fn client_config(addr: SocketAddr) -> ClientConfig {
    let http = format!("http://{addr}");
    let ws = format!("ws://{addr}");
    ClientConfig {
        api: ApiConfig {
            submission_url: http.clone(),
            submission_stream_url: Some(format!("{ws}/ws/submission/{{id}}/")),
            problems_url: http.clone(),
            contests_url: format!("{http}/contests/"),
            registration_url: format!("{http}/register/"),
            leaderboard_url: format!("{http}/leaderboard"),
            leaderboard_stream_url: format!("{ws}/ws/leaderboard"),
            complexity_url: format!("{http}/analyze/"),
        },
        http: HttpConfig {
            request_timeout_secs: 5,
            ..HttpConfig::default()
        },
        channel: ChannelConfig {
            connect_timeout_secs: 5,
            idle_timeout_secs: 5,
            event_buffer: 16,
            poll_interval_ms: 10,
            max_poll_attempts: 3,
        },
        ..ClientConfig::default()
    }
}
