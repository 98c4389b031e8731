//! The public chat endpoint of Warden and the admission pipeline guarding it.
//!
//! A request to `POST /chat` passes the [`AdmissionPipeline`] before the expensive completion
//! service is called. Each rejection maps to a stable code and a localized text, and every
//! response carries the client's rate limit state.

#![deny(missing_docs)]

mod error;
pub mod injection;
mod language;
mod messages;
pub mod normalize;
mod pipeline;
pub mod upstream;

use std::{fmt, sync::Arc};

use axum::{
    Router,
    body::Bytes,
    extract::{DefaultBodyLimit, Extension, State, rejection::BytesRejection},
    http::{HeaderMap, header::USER_AGENT},
    response::{IntoResponse, Response},
    routing::post,
};

pub use error::Rejection;
pub use language::Language;
pub use messages::{ChatReply, ChatRequest, ChatTurn, Role};
pub use pipeline::{
    AdmissionDecision, AdmissionPipeline, AdmissionStage, ClientContext, RATE_LIMIT_LIMIT, RATE_LIMIT_REMAINING,
    RATE_LIMIT_RESET,
};
pub use upstream::{Completion, OpenAiCompletion, UpstreamError};

/// Stable per-client key, set as a request extension by the server before the chat handler runs.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ClientIdentity(String);

impl ClientIdentity {
    /// Wrap a resolved key.
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    /// The key.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ClientIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Creates an axum router serving the pipeline at `path`.
///
/// Bodies are read up to the pipeline's `max_body_bytes`.
pub fn router(pipeline: Arc<AdmissionPipeline>, path: &str) -> Router {
    let body_limit = DefaultBodyLimit::max(pipeline.max_body_bytes());

    Router::new()
        .route(path, post(chat))
        .layer(body_limit)
        .with_state(pipeline)
}

/// Handle a chat request.
///
/// The body is taken as raw bytes so that the rate limit is checked before the body shape. A body
/// that cannot be read, too large or cut off, is still answered by the pipeline.
async fn chat(
    State(pipeline): State<Arc<AdmissionPipeline>>,
    identity: Option<Extension<ClientIdentity>>,
    headers: HeaderMap,
    body: Result<Bytes, BytesRejection>,
) -> Response {
    let Some(Extension(identity)) = identity else {
        log::error!("Chat request reached the handler without a client identity");
        return Rejection::Internal("missing client identity".to_string()).into_response();
    };

    let user_agent = headers
        .get(USER_AGENT)
        .and_then(|value| value.to_str().ok())
        .map(str::to_string);

    let client = ClientContext { identity, user_agent };

    match body {
        Ok(body) => pipeline.admit(&client, &body).await.into_response(),
        Err(rejection) => {
            log::debug!("Could not read chat request body from '{}': {rejection}", client.identity);

            pipeline
                .admit_unreadable(&client, rejection.body_text())
                .await
                .into_response()
        }
    }
}
