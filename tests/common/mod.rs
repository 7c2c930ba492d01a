//! Shared utilities for integration and load testing.

#![allow(dead_code)]

use arc_swap::ArcSwap;
use axum::{
    body::Bytes,
    extract::State,
    http::{Method, StatusCode, Uri},
    response::{IntoResponse, Response},
    Router,
};
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::net::TcpListener;

use service_client::config::{AppConfig, DynamicConfig, SharedDynamicConfig};
use service_client::http::HttpServer;
use service_client::lifecycle::startup::build_state;
use service_client::lifecycle::Shutdown;

/// One request as seen by the mock downstream.
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub method: Method,
    pub path: String,
    pub body: String,
    /// 0-based arrival order.
    pub hit: usize,
}

type Responder = dyn Fn(&RecordedRequest) -> (u16, String) + Send + Sync;

#[derive(Clone)]
struct MockState {
    responder: Arc<Responder>,
    latency: Duration,
    hits: Arc<AtomicUsize>,
    in_flight: Arc<AtomicUsize>,
    peak: Arc<AtomicUsize>,
    requests: Arc<Mutex<Vec<RecordedRequest>>>,
}

/// Handle to a running mock downstream.
pub struct MockDownstream {
    pub addr: SocketAddr,
    state: MockState,
}

impl MockDownstream {
    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub fn hits(&self) -> usize {
        self.state.hits.load(Ordering::SeqCst)
    }

    pub fn peak_concurrency(&self) -> usize {
        self.state.peak.load(Ordering::SeqCst)
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.state.requests.lock().unwrap().clone()
    }
}

async fn respond(State(state): State<MockState>, method: Method, uri: Uri, body: Bytes) -> Response {
    let hit = state.hits.fetch_add(1, Ordering::SeqCst);
    let now = state.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
    state.peak.fetch_max(now, Ordering::SeqCst);

    let request = RecordedRequest {
        method,
        path: uri.path().to_string(),
        body: String::from_utf8_lossy(&body).into_owned(),
        hit,
    };
    state.requests.lock().unwrap().push(request.clone());

    if !state.latency.is_zero() {
        tokio::time::sleep(state.latency).await;
    }
    let (status, body) = (state.responder)(&request);
    state.in_flight.fetch_sub(1, Ordering::SeqCst);

    let status = StatusCode::from_u16(status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    (status, [("content-type", "application/json")], body).into_response()
}

/// Start a programmable mock downstream on an ephemeral port.
pub async fn start_programmable_downstream<F>(latency: Duration, f: F) -> MockDownstream
where
    F: Fn(&RecordedRequest) -> (u16, String) + Send + Sync + 'static,
{
    let state = MockState {
        responder: Arc::new(f),
        latency,
        hits: Arc::new(AtomicUsize::new(0)),
        in_flight: Arc::new(AtomicUsize::new(0)),
        peak: Arc::new(AtomicUsize::new(0)),
        requests: Arc::new(Mutex::new(Vec::new())),
    };

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let app = Router::new().fallback(respond).with_state(state.clone());

    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });

    MockDownstream { addr, state }
}

/// Envelope the downstream returns for one service.
pub fn service_body(id: &str) -> String {
    serde_json::json!({ "data": { "id": id, "resources": [] } }).to_string()
}

/// Last path segment, i.e. the service id of a retrieve call.
pub fn service_id_of(request: &RecordedRequest) -> String {
    request.path.rsplit('/').next().unwrap_or_default().to_string()
}

/// Config pointing at `downstream` with short retry waits.
pub fn test_config(downstream: &str) -> AppConfig {
    let mut config = AppConfig::default();
    config.server.bind_address = "127.0.0.1:0".to_string();
    config.service_api_client.host = downstream.to_string();
    config.service_api_client.retries.min_wait_ms = 10;
    config.service_api_client.retries.max_wait_ms = 50;
    config
}

/// A gateway running in the background.
pub struct TestGateway {
    pub addr: SocketAddr,
    pub shutdown: Shutdown,
    pub dynamic: SharedDynamicConfig,
}

impl TestGateway {
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }
}

pub async fn start_gateway(config: AppConfig, dynamic: DynamicConfig) -> TestGateway {
    let shutdown = Shutdown::new();
    let shared: SharedDynamicConfig = Arc::new(ArcSwap::from_pointee(dynamic));
    let state = build_state(&config, shared.clone(), shutdown.token()).unwrap();

    let listener = TcpListener::bind(&config.server.bind_address).await.unwrap();
    let addr = listener.local_addr().unwrap();
    let server = HttpServer::new(&config, state);
    let server_shutdown = shutdown.subscribe();

    tokio::spawn(async move {
        let _ = server.run(listener, server_shutdown).await;
    });

    TestGateway {
        addr,
        shutdown,
        dynamic: shared,
    }
}
