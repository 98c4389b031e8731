use std::{
    net::SocketAddr,
    sync::{Arc, Mutex},
};

use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::post,
};
use serde_json::{Value, json};
use tokio::net::TcpListener;

#[derive(Clone, Debug)]
enum Mode {
    Reply(String),
    QuotaExhausted,
    RateLimited,
    Unavailable,
}

/// An OpenAI-style chat completions endpoint with a fixed behavior.
#[derive(Clone)]
pub struct CompletionMock {
    mode: Mode,
    requests: Arc<Mutex<Vec<Value>>>,
}

impl Default for CompletionMock {
    fn default() -> Self {
        Self::replying("Check-in starts at 15:00.")
    }
}

impl CompletionMock {
    pub fn replying(text: impl Into<String>) -> Self {
        Self::with_mode(Mode::Reply(text.into()))
    }

    /// Answers 429 with an `insufficient_quota` error.
    pub fn quota_exhausted() -> Self {
        Self::with_mode(Mode::QuotaExhausted)
    }

    /// Answers 429 with a plain rate limit error.
    pub fn rate_limited() -> Self {
        Self::with_mode(Mode::RateLimited)
    }

    pub fn unavailable() -> Self {
        Self::with_mode(Mode::Unavailable)
    }

    fn with_mode(mode: Mode) -> Self {
        Self {
            mode,
            requests: Arc::default(),
        }
    }

    /// Request bodies received so far.
    pub fn requests(&self) -> Vec<Value> {
        self.requests.lock().unwrap().clone()
    }

    pub(crate) async fn spawn(&self) -> SocketAddr {
        let app = Router::new()
            .route("/v1/chat/completions", post(chat_completions))
            .with_state(self.clone());

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let address = listener.local_addr().unwrap();

        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        address
    }
}

async fn chat_completions(State(mock): State<CompletionMock>, Json(body): Json<Value>) -> Response {
    mock.requests.lock().unwrap().push(body);

    match mock.mode {
        Mode::Reply(text) => Json(json!({
            "id": "chatcmpl-test",
            "object": "chat.completion",
            "choices": [{
                "index": 0,
                "message": { "role": "assistant", "content": text },
                "finish_reason": "stop"
            }]
        }))
        .into_response(),
        Mode::QuotaExhausted => (
            StatusCode::TOO_MANY_REQUESTS,
            Json(json!({
                "error": {
                    "message": "You exceeded your current quota.",
                    "type": "insufficient_quota",
                    "code": "insufficient_quota"
                }
            })),
        )
            .into_response(),
        Mode::RateLimited => (
            StatusCode::TOO_MANY_REQUESTS,
            Json(json!({
                "error": {
                    "message": "Rate limit reached for requests.",
                    "type": "requests",
                    "code": "rate_limit_exceeded"
                }
            })),
        )
            .into_response(),
        Mode::Unavailable => (StatusCode::SERVICE_UNAVAILABLE, "upstream down").into_response(),
    }
}
