//! In-process mock provider server
//!
//! Serves all four wire endpoints from one axum router so a single mock can
//! stand in for OpenAI, xAI, Anthropic, and Google (AI Studio or Vertex).
//! Responses are scripted as a sequence of turns; the last turn repeats for
//! every further request.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};

use axum::extract::{Query, State};
use axum::http::{HeaderMap, StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::{Json, Router, routing};
use tokio_util::sync::CancellationToken;

/// One scripted response
#[derive(Debug, Clone)]
pub enum MockTurn {
    /// JSON body with status 200
    Json(serde_json::Value),
    /// SSE body with status 200 and `text/event-stream`
    Sse(String),
    /// Raw body with status 200 and `application/json` (for malformed-JSON
    /// scenarios)
    Raw(String),
}

struct MockState {
    /// Every request received, failures included
    requests: AtomicU32,
    /// Successful turns served
    served: AtomicU32,
    /// Requests to fail before serving turns
    fail_remaining: AtomicU32,
    fail_status: u16,
    retry_after: Option<u64>,
    turns: Vec<MockTurn>,
    last_body: Mutex<Option<serde_json::Value>>,
    last_headers: Mutex<Option<HeaderMap>>,
    last_query: Mutex<Option<HashMap<String, String>>>,
}

/// Mock provider server handle
pub struct MockProvider {
    addr: SocketAddr,
    shutdown: CancellationToken,
    state: Arc<MockState>,
}

/// Builder for a scripted mock provider
#[derive(Default)]
pub struct MockProviderBuilder {
    fail_count: u32,
    fail_status: u16,
    retry_after: Option<u64>,
    turns: Vec<MockTurn>,
}

impl MockProviderBuilder {
    /// Fail the first `count` requests with `status`, optionally carrying a
    /// `Retry-After` header
    #[must_use]
    pub fn failures(mut self, count: u32, status: u16, retry_after: Option<u64>) -> Self {
        self.fail_count = count;
        self.fail_status = status;
        self.retry_after = retry_after;
        self
    }

    /// Append a scripted turn
    #[must_use]
    pub fn turn(mut self, turn: MockTurn) -> Self {
        self.turns.push(turn);
        self
    }

    /// Start the server on an ephemeral port
    pub async fn start(self) -> anyhow::Result<MockProvider> {
        let state = Arc::new(MockState {
            requests: AtomicU32::new(0),
            served: AtomicU32::new(0),
            fail_remaining: AtomicU32::new(self.fail_count),
            fail_status: if self.fail_status == 0 { 500 } else { self.fail_status },
            retry_after: self.retry_after,
            turns: self.turns,
            last_body: Mutex::new(None),
            last_headers: Mutex::new(None),
            last_query: Mutex::new(None),
        });

        let app = Router::new()
            .route("/v1/chat/completions", routing::post(handle_turn))
            .route("/v1/messages", routing::post(handle_turn))
            .route("/v1beta/models/{model_action}", routing::post(handle_turn))
            .route(
                "/v1/projects/{project}/locations/{location}/publishers/google/models/{model_action}",
                routing::post(handle_turn),
            )
            .with_state(Arc::clone(&state));

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;
        let shutdown = CancellationToken::new();
        let shutdown_clone = shutdown.clone();

        tokio::spawn(async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(async move {
                    shutdown_clone.cancelled().await;
                })
                .await
                .ok();
        });

        Ok(MockProvider { addr, shutdown, state })
    }
}

impl MockProvider {
    /// Builder for a scripted server
    pub fn builder() -> MockProviderBuilder {
        MockProviderBuilder::default()
    }

    /// Start with scripted turns and no induced failures
    pub async fn start(turns: Vec<MockTurn>) -> anyhow::Result<Self> {
        let mut builder = Self::builder();
        for turn in turns {
            builder = builder.turn(turn);
        }
        builder.start().await
    }

    /// Base URL for OpenAI-style and Anthropic providers
    pub fn v1_base_url(&self) -> String {
        format!("http://{}/v1", self.addr)
    }

    /// Base URL for Google AI Studio mode
    pub fn google_base_url(&self) -> String {
        format!("http://{}/v1beta", self.addr)
    }

    /// Base URL override for Google Vertex mode
    pub fn vertex_base_url(&self) -> String {
        format!("http://{}/v1", self.addr)
    }

    /// Every request received, induced failures included
    pub fn request_count(&self) -> u32 {
        self.state.requests.load(Ordering::SeqCst)
    }

    /// Last request body received
    pub fn last_body(&self) -> Option<serde_json::Value> {
        self.state.last_body.lock().unwrap().clone()
    }

    /// A header from the last request
    pub fn last_header(&self, name: &str) -> Option<String> {
        let headers = self.state.last_headers.lock().unwrap();
        headers
            .as_ref()
            .and_then(|h| h.get(name))
            .and_then(|v| v.to_str().ok())
            .map(ToOwned::to_owned)
    }

    /// A query parameter from the last request
    pub fn last_query_param(&self, name: &str) -> Option<String> {
        let query = self.state.last_query.lock().unwrap();
        query.as_ref().and_then(|q| q.get(name)).cloned()
    }
}

impl Drop for MockProvider {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}

async fn handle_turn(
    State(state): State<Arc<MockState>>,
    Query(query): Query<HashMap<String, String>>,
    headers: HeaderMap,
    Json(body): Json<serde_json::Value>,
) -> Response {
    state.requests.fetch_add(1, Ordering::SeqCst);
    *state.last_body.lock().unwrap() = Some(body);
    *state.last_headers.lock().unwrap() = Some(headers);
    *state.last_query.lock().unwrap() = Some(query);

    if state.fail_remaining.load(Ordering::SeqCst) > 0 {
        state.fail_remaining.fetch_sub(1, Ordering::SeqCst);

        let mut response_headers = HeaderMap::new();
        if let Some(secs) = state.retry_after
            && let Ok(value) = secs.to_string().parse()
        {
            response_headers.insert(header::RETRY_AFTER, value);
        }
        let status = StatusCode::from_u16(state.fail_status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        let body = serde_json::json!({ "error": { "message": "induced failure" } });
        return (status, response_headers, Json(body)).into_response();
    }

    let index = state.served.fetch_add(1, Ordering::SeqCst) as usize;
    let turn = state.turns.get(index).or_else(|| state.turns.last());

    match turn {
        Some(MockTurn::Json(value)) => Json(value.clone()).into_response(),
        Some(MockTurn::Sse(body)) => (
            [(header::CONTENT_TYPE, "text/event-stream")],
            body.clone(),
        )
            .into_response(),
        Some(MockTurn::Raw(body)) => ([(header::CONTENT_TYPE, "application/json")], body.clone()).into_response(),
        None => StatusCode::NOT_IMPLEMENTED.into_response(),
    }
}
