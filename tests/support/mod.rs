//! Purpose: In-process fake Graphery backend for integration tests.
//! Exports: `FakeBackend`, `CSRF_TOKEN`, `TestResult`.
//! Role: Serve `/csrf`, `/graphql`, and `/run` on loopback with call counters.
//! Invariants: Binds 127.0.0.1 on an ephemeral port; shut down and joined on drop.
//! Invariants: `/csrf` sets a `csrftoken` cookie; `/graphql` rejects requests
//! missing either that cookie or the issued `X-CSRFToken` header (403).
#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;

use axum::extract::State;
use axum::http::{HeaderMap, StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{Value, json};
use tokio::sync::oneshot;

pub type TestResult<T> = Result<T, Box<dyn std::error::Error>>;

pub const CSRF_TOKEN: &str = "test-csrf-token";
pub const CSRF_COOKIE: &str = "csrftoken=test-csrf-token";

#[derive(Default)]
struct Counters {
    csrf: AtomicUsize,
    graphql: AtomicUsize,
    run: AtomicUsize,
    last_run: Mutex<Option<Value>>,
    last_graphql_cookie: Mutex<Option<String>>,
}

pub struct FakeBackend {
    addr: SocketAddr,
    counters: Arc<Counters>,
    shutdown: Option<oneshot::Sender<()>>,
    thread: Option<JoinHandle<()>>,
}

impl FakeBackend {
    pub fn start() -> TestResult<Self> {
        let listener = std::net::TcpListener::bind("127.0.0.1:0")?;
        listener.set_nonblocking(true)?;
        let addr = listener.local_addr()?;

        let counters = Arc::new(Counters::default());
        let app = Router::new()
            .route("/csrf", get(csrf))
            .route("/graphql", post(graphql))
            .route("/run", post(run))
            .with_state(Arc::clone(&counters));

        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()?;
        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
        let thread = std::thread::spawn(move || {
            runtime.block_on(async move {
                let Ok(listener) = tokio::net::TcpListener::from_std(listener) else {
                    return;
                };
                let _ = axum::serve(listener, app)
                    .with_graceful_shutdown(async {
                        let _ = shutdown_rx.await;
                    })
                    .await;
            });
        });

        Ok(Self {
            addr,
            counters,
            shutdown: Some(shutdown_tx),
            thread: Some(thread),
        })
    }

    pub fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub fn port(&self) -> u16 {
        self.addr.port()
    }

    pub fn csrf_calls(&self) -> usize {
        self.counters.csrf.load(Ordering::SeqCst)
    }

    pub fn graphql_calls(&self) -> usize {
        self.counters.graphql.load(Ordering::SeqCst)
    }

    pub fn run_calls(&self) -> usize {
        self.counters.run.load(Ordering::SeqCst)
    }

    pub fn last_run_body(&self) -> Option<Value> {
        self.counters
            .last_run
            .lock()
            .unwrap_or_else(|poison| poison.into_inner())
            .clone()
    }
}

impl FakeBackend {
    pub fn last_graphql_cookie(&self) -> Option<String> {
        self.counters
            .last_graphql_cookie
            .lock()
            .unwrap_or_else(|poison| poison.into_inner())
            .clone()
    }
}

impl Drop for FakeBackend {
    fn drop(&mut self) {
        if let Some(shutdown) = self.shutdown.take() {
            let _ = shutdown.send(());
        }
        if let Some(thread) = self.thread.take() {
            let _ = thread.join();
        }
    }
}

pub fn result_json_set() -> Value {
    json!([
        {"json": "[{\"line\":1,\"variables\":{\"v\":1}}]", "graph": {"id": "g1"}, "code": {"id": "c1"}},
        {"json": "[]", "graph": {"id": "g1"}, "code": {"id": "c2"}},
        {"json": null, "graph": {"id": "g2"}, "code": {"id": "c1"}},
    ])
}

async fn csrf(State(counters): State<Arc<Counters>>) -> Response {
    counters.csrf.fetch_add(1, Ordering::SeqCst);
    (
        [(header::SET_COOKIE, format!("{CSRF_COOKIE}; Path=/"))],
        Json(json!({ "csrfToken": CSRF_TOKEN })),
    )
        .into_response()
}

async fn graphql(
    State(counters): State<Arc<Counters>>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    counters.graphql.fetch_add(1, Ordering::SeqCst);
    let token = headers
        .get("x-csrftoken")
        .and_then(|value| value.to_str().ok());
    let cookie = headers
        .get(header::COOKIE)
        .and_then(|value| value.to_str().ok())
        .map(str::to_string);
    *counters
        .last_graphql_cookie
        .lock()
        .unwrap_or_else(|poison| poison.into_inner()) = cookie.clone();
    let has_cookie = cookie.is_some_and(|cookie| {
        cookie
            .split(';')
            .any(|pair| pair.trim() == CSRF_COOKIE)
    });
    if token != Some(CSRF_TOKEN) || !has_cookie {
        return (
            StatusCode::FORBIDDEN,
            Json(json!({"errors": [{"message": "CSRF verification failed"}]})),
        )
            .into_response();
    }

    let query = body
        .get("query")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();
    if query.contains("explode") {
        return (StatusCode::INTERNAL_SERVER_ERROR, "server exploded").into_response();
    }
    if query.contains("unknownField") {
        return Json(json!({
            "data": null,
            "errors": [{
                "message": "Cannot query field \"unknownField\" on type \"Query\".",
                "locations": [{"line": 1, "column": 3}]
            }]
        }))
        .into_response();
    }

    let variables = body.get("variables").cloned().unwrap_or(Value::Null);
    Json(json!({
        "data": {
            "echo": {"query": query, "variables": variables},
            "resultJsonSet": result_json_set(),
        }
    }))
    .into_response()
}

async fn run(State(counters): State<Arc<Counters>>, Json(body): Json<Value>) -> Json<Value> {
    counters.run.fetch_add(1, Ordering::SeqCst);
    *counters
        .last_run
        .lock()
        .unwrap_or_else(|poison| poison.into_inner()) = Some(body.clone());
    Json(json!({
        "info": [{"line": 1, "variables": {"graph": "ok"}}],
        "codeBytes": body.get("code").and_then(Value::as_str).map(str::len),
    }))
}
