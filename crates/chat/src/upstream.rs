//! The completion service called once a request is admitted.

mod openai;

pub use openai::OpenAiCompletion;

use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;

/// Failures of the completion service, by what the visitor can do about them.
///
/// The carried text is for the logs only and never reaches the client.
#[derive(Debug, Error)]
pub enum UpstreamError {
    /// The service throttles us; retrying later helps.
    #[error("completion service rate limited the request: {0}")]
    RateLimited(String),

    /// Billing or quota is exhausted; only an operator can fix it.
    #[error("completion service quota exhausted: {0}")]
    QuotaExhausted(String),

    /// The service could not be reached or failed on its side.
    #[error("completion service unavailable: {0}")]
    Unavailable(String),

    /// Anything else, including replies we cannot understand.
    #[error("completion service call failed: {0}")]
    Internal(String),
}

/// Author of a [`CompletionMessage`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CompletionRole {
    /// Operator instructions.
    System,
    /// The visitor.
    User,
    /// The assistant.
    Assistant,
}

/// One message of the payload sent to the completion service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CompletionMessage {
    /// Who wrote the message.
    pub role: CompletionRole,
    /// The text.
    pub content: String,
}

impl CompletionMessage {
    /// A message of `role` with `content`.
    pub fn new(role: CompletionRole, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }
}

/// A completion service.
#[async_trait]
pub trait Completion: Send + Sync {
    /// Complete the conversation in `messages` and return the assistant's answer.
    async fn complete(&self, messages: Vec<CompletionMessage>) -> Result<String, UpstreamError>;
}
