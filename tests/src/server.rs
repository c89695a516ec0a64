//! Real HTTP peers for end-to-end tests of the reqwest transports.
//!
//! Both servers bind `127.0.0.1:0`, record every request, and answer with a
//! scripted status per endpoint (200 once the script is exhausted). The
//! server task is aborted when the value is dropped.

use axum::{
    Json, Router,
    body::Bytes,
    extract::State,
    http::{HeaderMap, Method, StatusCode, Uri},
    response::{IntoResponse, Response},
};
use courier_kernel::token::TOKEN_HEADER;
use serde_json::{Value, json};
use std::collections::{HashMap, VecDeque};
use std::net::SocketAddr;
use std::sync::{Arc, RwLock};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

/// One request as seen by a mock server.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedRequest {
    pub method: String,
    pub path: String,
    /// Raw `Token` header, if present.
    pub token: Option<String>,
    /// Body parsed as JSON; `Value::Null` when empty or not JSON.
    pub body: Value,
}

#[derive(Default)]
struct Shared {
    requests: RwLock<Vec<RecordedRequest>>,
    /// Scripted statuses keyed by the first path segment.
    statuses: RwLock<HashMap<String, VecDeque<u16>>>,
    /// Bodies answered on 2xx, keyed by the first path segment.
    bodies: RwLock<HashMap<String, Value>>,
}

impl Shared {
    fn next_status(&self, segment: &str) -> u16 {
        self.statuses
            .write()
            .ok()
            .and_then(|mut s| s.get_mut(segment).and_then(VecDeque::pop_front))
            .unwrap_or(200)
    }

    fn body_for(&self, segment: &str) -> Value {
        self.bodies
            .read()
            .ok()
            .and_then(|b| b.get(segment).cloned())
            .unwrap_or_else(|| json!({}))
    }
}

async fn record(
    State(shared): State<Arc<Shared>>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let path = uri.path().to_string();
    let segment = path
        .trim_start_matches('/')
        .split('/')
        .next()
        .unwrap_or_default()
        .to_string();

    if let Ok(mut requests) = shared.requests.write() {
        requests.push(RecordedRequest {
            method: method.to_string(),
            path,
            token: headers
                .get(TOKEN_HEADER)
                .and_then(|v| v.to_str().ok())
                .map(str::to_string),
            body: serde_json::from_slice(&body).unwrap_or(Value::Null),
        });
    }

    let status = StatusCode::from_u16(shared.next_status(&segment)).unwrap_or(StatusCode::OK);
    if status.is_success() {
        (status, Json(shared.body_for(&segment))).into_response()
    } else {
        (status, Json(json!({ "message": "scripted failure" }))).into_response()
    }
}

struct MockHttpServer {
    addr: SocketAddr,
    shared: Arc<Shared>,
    task: JoinHandle<()>,
}

impl MockHttpServer {
    async fn start() -> std::io::Result<Self> {
        let shared = Arc::new(Shared::default());
        let app = Router::new().fallback(record).with_state(shared.clone());
        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;
        let task = tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });
        Ok(Self { addr, shared, task })
    }

    fn script(&self, segment: &str, statuses: impl IntoIterator<Item = u16>) {
        if let Ok(mut s) = self.shared.statuses.write() {
            s.entry(segment.to_string()).or_default().extend(statuses);
        }
    }

    fn set_body(&self, segment: &str, body: Value) {
        if let Ok(mut b) = self.shared.bodies.write() {
            b.insert(segment.to_string(), body);
        }
    }

    fn requests(&self) -> Vec<RecordedRequest> {
        self.shared.requests.read().map(|r| r.clone()).unwrap_or_default()
    }
}

impl Drop for MockHttpServer {
    fn drop(&mut self) {
        self.task.abort();
    }
}

/// A service-discovery registry answering `register`, `get_services` and
/// `heartbeat/{name}`.
pub struct MockRegistryServer {
    inner: MockHttpServer,
}

impl MockRegistryServer {
    /// Start with `directory` as the `get_services` answer.
    pub async fn start(directory: Value) -> std::io::Result<Self> {
        let inner = MockHttpServer::start().await?;
        inner.set_body("get_services", directory);
        Ok(Self { inner })
    }

    pub fn host(&self) -> String {
        self.inner.addr.ip().to_string()
    }

    pub fn port(&self) -> u16 {
        self.inner.addr.port()
    }

    pub fn base_url(&self) -> String {
        format!("http://{}", self.inner.addr)
    }

    /// Statuses for the next `register` calls, in order.
    pub fn script_register(&self, statuses: impl IntoIterator<Item = u16>) {
        self.inner.script("register", statuses);
    }

    pub fn script_get_services(&self, statuses: impl IntoIterator<Item = u16>) {
        self.inner.script("get_services", statuses);
    }

    pub fn script_heartbeat(&self, statuses: impl IntoIterator<Item = u16>) {
        self.inner.script("heartbeat", statuses);
    }

    pub fn set_directory(&self, directory: Value) {
        self.inner.set_body("get_services", directory);
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.inner.requests()
    }

    /// Recorded requests whose path starts with `/{segment}`.
    pub fn requests_to(&self, segment: &str) -> Vec<RecordedRequest> {
        let prefix = format!("/{segment}");
        self.requests()
            .into_iter()
            .filter(|r| r.path.starts_with(&prefix))
            .collect()
    }
}

/// A dialog service accepting `/user` and `/message`.
pub struct MockDialogServer {
    inner: MockHttpServer,
}

impl MockDialogServer {
    pub async fn start() -> std::io::Result<Self> {
        Ok(Self {
            inner: MockHttpServer::start().await?,
        })
    }

    pub fn host(&self) -> String {
        self.inner.addr.ip().to_string()
    }

    pub fn port(&self) -> u16 {
        self.inner.addr.port()
    }

    /// Statuses for the next calls to `/{segment}`, e.g. `"message"`.
    pub fn script(&self, segment: &str, statuses: impl IntoIterator<Item = u16>) {
        self.inner.script(segment, statuses);
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.inner.requests()
    }
}
