//! Shared utilities for integration tests: mock backend, mock upstream, and
//! a proxy instance on ephemeral ports.

#![allow(dead_code)]

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

use axum::{
    extract::State,
    http::HeaderMap,
    routing::post,
    Json, Router,
};
use serde_json::{json, Value};
use tokio::net::TcpListener;

use signed_proxy::config::{ConfigSource, ServerConfig};
use signed_proxy::http::HttpServer;
use signed_proxy::lifecycle::Shutdown;
use signed_proxy::signature::{unix_now, Signer};

pub const TOKEN: &str = "integration-secret";

/// Serve `router` on 127.0.0.1 with an ephemeral port.
pub async fn spawn_router(router: Router) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    addr
}

/// One call the mock backend received.
#[derive(Debug, Clone)]
pub struct LinkCall {
    pub authorization: Option<String>,
    pub content_type: Option<String>,
    pub path: String,
}

#[derive(Clone)]
struct BackendState {
    links: Arc<HashMap<String, Value>>,
    calls: Arc<Mutex<Vec<LinkCall>>>,
}

/// Mock file-storage backend answering `POST /api/fs/link`.
pub struct MockBackend {
    pub addr: SocketAddr,
    calls: Arc<Mutex<Vec<LinkCall>>>,
}

impl MockBackend {
    pub fn address(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub fn calls(&self) -> Vec<LinkCall> {
        self.calls.lock().unwrap().clone()
    }
}

/// `links` maps a decoded path to the full JSON reply for it. Unknown paths
/// get `{"code":404,"message":"object not found","data":null}`.
pub async fn start_backend(links: Vec<(&str, Value)>) -> MockBackend {
    let calls = Arc::new(Mutex::new(Vec::new()));
    let state = BackendState {
        links: Arc::new(links.into_iter().map(|(k, v)| (k.to_string(), v)).collect()),
        calls: calls.clone(),
    };

    async fn link(
        State(state): State<BackendState>,
        headers: HeaderMap,
        Json(body): Json<Value>,
    ) -> Json<Value> {
        let path = body["path"].as_str().unwrap_or_default().to_string();
        state.calls.lock().unwrap().push(LinkCall {
            authorization: header(&headers, "authorization"),
            content_type: header(&headers, "content-type"),
            path: path.clone(),
        });
        let reply = state.links.get(&path).cloned().unwrap_or_else(|| {
            json!({"code": 404, "message": "object not found", "data": null})
        });
        Json(reply)
    }

    let router = Router::new()
        .route("/api/fs/link", post(link))
        .with_state(state);
    let addr = spawn_router(router).await;
    MockBackend { addr, calls }
}

/// Backend reply pointing at `url`.
pub fn link_to(url: String) -> Value {
    json!({"code": 200, "message": "success", "data": {"url": url}})
}

pub fn header(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
}

/// A running proxy instance.
pub struct TestProxy {
    pub addr: SocketAddr,
    shutdown: Shutdown,
}

impl TestProxy {
    pub fn url(&self, path_and_query: &str) -> String {
        format!("http://{}{}", self.addr, path_and_query)
    }
}

impl Drop for TestProxy {
    fn drop(&mut self) {
        self.shutdown.trigger();
    }
}

pub async fn bind_proxy() -> (TcpListener, SocketAddr) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    (listener, addr)
}

/// Start the proxy on an already-bound listener with fixed backend keys.
pub async fn serve_proxy(listener: TcpListener, vars: &[(&str, String)]) -> TestProxy {
    serve_proxy_with_config(listener, ServerConfig::default(), vars).await
}

/// Like [`serve_proxy`], with custom server settings (deadlines, cache TTLs).
pub async fn serve_proxy_with_config(
    listener: TcpListener,
    config: ServerConfig,
    vars: &[(&str, String)],
) -> TestProxy {
    let addr = listener.local_addr().unwrap();
    let vars: HashMap<String, String> = vars
        .iter()
        .map(|(k, v)| (k.to_string(), v.clone()))
        .collect();

    let server = HttpServer::new(config, ConfigSource::Fixed(vars)).unwrap();
    let shutdown = Shutdown::new();
    let rx = shutdown.subscribe();
    tokio::spawn(async move {
        server.run(listener, rx).await.unwrap();
    });

    TestProxy { addr, shutdown }
}

/// Proxy wired to `backend` with signing enabled.
pub async fn start_proxy(backend: &MockBackend) -> TestProxy {
    let (listener, _) = bind_proxy().await;
    serve_proxy(
        listener,
        &[("ADDRESS", backend.address()), ("TOKEN", TOKEN.to_string())],
    )
    .await
}

/// `?sign=...` for `path`, valid for an hour.
pub fn signed_query(path: &str) -> String {
    signed_query_with_expiry(path, unix_now() + 3600)
}

pub fn signed_query_with_expiry(path: &str, expiry: u64) -> String {
    let token = Signer::new(TOKEN).sign(path, expiry);
    let query = url::form_urlencoded::Serializer::new(String::new())
        .append_pair("sign", &token)
        .finish();
    format!("?{query}")
}

/// HTTP client that reports redirects instead of following them.
pub fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .redirect(reqwest::redirect::Policy::none())
        .no_proxy()
        .build()
        .unwrap()
}
