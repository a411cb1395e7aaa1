//! In-process HTTP server standing in for the file server, the signed
//! storage endpoint and an S3-compatible bucket.

#![allow(dead_code)]

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::Router;
use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, Method, StatusCode, Uri, header};
use axum::response::{IntoResponse, Response};

use pa_core::{BackoffSchedule, RetrySettings, Settings};

#[derive(Default)]
pub struct ServerState {
    /// Signing requests answered with 503 before succeeding
    pub sign_failures: AtomicUsize,
    pub sign_calls: AtomicUsize,
    /// Content uploads answered with 500 before succeeding
    pub content_failures: AtomicUsize,
    pub content_calls: AtomicUsize,
    /// Answer signing requests with 200 and no location header
    pub omit_location: AtomicBool,
    /// Object PUTs answered with an S3 error before succeeding
    pub object_failures: AtomicUsize,
    pub object_calls: AtomicUsize,
    pub auth_headers: Mutex<Vec<String>>,
    pub content_types: Mutex<Vec<String>>,
    pub content_lengths: Mutex<Vec<String>>,
    pub stored: Mutex<HashMap<String, Vec<u8>>>,
}

pub struct TestServer {
    pub addr: SocketAddr,
    pub state: Arc<ServerState>,
}

impl TestServer {
    pub async fn start() -> Self {
        let state = Arc::new(ServerState::default());
        let app = Router::new().fallback(handle).with_state(state.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self { addr, state }
    }

    /// Base URL of the signing endpoint
    pub fn sign_base(&self) -> String {
        format!("http://{}/sign/", self.addr)
    }

    pub fn endpoint(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub fn stored(&self, key: &str) -> Option<Vec<u8>> {
        self.state.stored.lock().unwrap().get(key).cloned()
    }
}

async fn handle(
    State(state): State<Arc<ServerState>>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    if method != Method::PUT {
        return StatusCode::METHOD_NOT_ALLOWED.into_response();
    }

    let path = uri.path().to_string();
    if let Some(rest) = path.strip_prefix("/sign/") {
        state.sign_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(auth) = headers.get("Authentication").and_then(|v| v.to_str().ok()) {
            state.auth_headers.lock().unwrap().push(auth.to_string());
        }
        if take_failure(&state.sign_failures) {
            return (
                StatusCode::SERVICE_UNAVAILABLE,
                [("X-Correlation-ID", "corr-1")],
                "try later",
            )
                .into_response();
        }
        if state.omit_location.load(Ordering::SeqCst) {
            return StatusCode::OK.into_response();
        }
        let host = headers
            .get(header::HOST)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_string();
        let location = format!("http://{host}/store/{rest}?signature=abc");
        return (
            StatusCode::TEMPORARY_REDIRECT,
            [(header::LOCATION, location)],
        )
            .into_response();
    }

    if let Some(rest) = path.strip_prefix("/store/") {
        state.content_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(ct) = headers.get(header::CONTENT_TYPE).and_then(|v| v.to_str().ok()) {
            state.content_types.lock().unwrap().push(ct.to_string());
        }
        if let Some(len) = headers.get(header::CONTENT_LENGTH).and_then(|v| v.to_str().ok()) {
            state.content_lengths.lock().unwrap().push(len.to_string());
        }
        if take_failure(&state.content_failures) {
            return (StatusCode::INTERNAL_SERVER_ERROR, "disk full").into_response();
        }
        state
            .stored
            .lock()
            .unwrap()
            .insert(rest.to_string(), body.to_vec());
        return StatusCode::OK.into_response();
    }

    // Anything else is treated as a path-style S3 PutObject: /bucket/key
    state.object_calls.fetch_add(1, Ordering::SeqCst);
    if let Some(ct) = headers.get(header::CONTENT_TYPE).and_then(|v| v.to_str().ok()) {
        state.content_types.lock().unwrap().push(ct.to_string());
    }
    if take_failure(&state.object_failures) {
        return (
            StatusCode::INTERNAL_SERVER_ERROR,
            [(header::CONTENT_TYPE, "application/xml")],
            "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\
             <Error><Code>InternalError</Code><Message>We encountered an internal error</Message></Error>",
        )
            .into_response();
    }
    state
        .stored
        .lock()
        .unwrap()
        .insert(path.trim_start_matches('/').to_string(), body.to_vec());
    (StatusCode::OK, [(header::ETAG, "\"d41d8cd98f00b204e9800998ecf8427e\"")]).into_response()
}

fn take_failure(counter: &AtomicUsize) -> bool {
    counter
        .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
        .is_ok()
}

/// Settings with millisecond schedules of the default lengths
pub fn fast_settings() -> Settings {
    let ms = |n: usize| BackoffSchedule::new(vec![Duration::from_millis(1); n]);
    Settings {
        request_timeout_secs: Some(10),
        retry: RetrySettings {
            signed_url: ms(4),
            content: ms(3),
            object_store: ms(3),
        },
        ..Default::default()
    }
}
