use async_trait::async_trait;
use config::UpstreamConfig;
use reqwest::{Client, StatusCode, header::AUTHORIZATION};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};

use super::{Completion, CompletionMessage, UpstreamError};

/// OpenAI-compatible `chat/completions` client.
pub struct OpenAiCompletion {
    client: Client,
    url: String,
    api_key: SecretString,
    model: String,
    max_tokens: u32,
}

impl OpenAiCompletion {
    /// Create a client from the upstream configuration.
    pub fn new(config: &UpstreamConfig) -> Result<Self, UpstreamError> {
        let api_key = config
            .api_key
            .clone()
            .ok_or_else(|| UpstreamError::Internal("no completion service credential configured".to_string()))?;

        let client = Client::builder().timeout(config.timeout).build().map_err(|e| {
            log::error!("Failed to create HTTP client for the completion service: {e}");
            UpstreamError::Internal(e.to_string())
        })?;

        let url = format!("{}/chat/completions", config.base_url.as_str().trim_end_matches('/'));

        Ok(Self {
            client,
            url,
            api_key,
            model: config.model.clone(),
            max_tokens: config.max_tokens,
        })
    }
}

#[derive(Debug, Serialize)]
struct CompletionBody<'a> {
    model: &'a str,
    messages: Vec<CompletionMessage>,
    max_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct CompletionReply {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ReplyMessage,
}

#[derive(Debug, Deserialize)]
struct ReplyMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorReply {
    error: ErrorDetails,
}

#[derive(Debug, Deserialize)]
struct ErrorDetails {
    #[serde(default)]
    code: Option<String>,
    #[serde(default, rename = "type")]
    kind: Option<String>,
}

impl ErrorDetails {
    fn is_quota(&self) -> bool {
        [&self.code, &self.kind]
            .into_iter()
            .flatten()
            .any(|value| value == "insufficient_quota")
    }
}

/// Sort a failed reply into what the visitor can do about it.
fn classify(status: StatusCode, body: &str) -> UpstreamError {
    let quota = serde_json::from_str::<ErrorReply>(body).is_ok_and(|reply| reply.error.is_quota());
    let detail = format!("{status}: {body}");

    match status.as_u16() {
        402 | 403 => UpstreamError::QuotaExhausted(detail),
        _ if quota => UpstreamError::QuotaExhausted(detail),
        429 => UpstreamError::RateLimited(detail),
        500..=599 => UpstreamError::Unavailable(detail),
        _ => UpstreamError::Internal(detail),
    }
}

#[async_trait]
impl Completion for OpenAiCompletion {
    async fn complete(&self, messages: Vec<CompletionMessage>) -> Result<String, UpstreamError> {
        let body = CompletionBody {
            model: &self.model,
            messages,
            max_tokens: self.max_tokens,
        };

        log::debug!("Calling completion service with {} messages", body.messages.len());

        let response = self
            .client
            .post(&self.url)
            .header(AUTHORIZATION, format!("Bearer {}", self.api_key.expose_secret()))
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                log::error!("Failed to reach the completion service: {e}");
                UpstreamError::Unavailable(e.to_string())
            })?;

        let status = response.status();

        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_else(|_| "Unknown error".to_string());
            log::error!("Completion service error ({status}): {error_text}");

            return Err(classify(status, &error_text));
        }

        let response_text = response.text().await.map_err(|e| {
            log::error!("Failed to read completion service response body: {e}");
            UpstreamError::Unavailable(e.to_string())
        })?;

        let reply: CompletionReply = serde_json::from_str(&response_text).map_err(|e| {
            log::error!("Failed to parse completion service response: {e}");
            log::error!("Raw response that failed to parse: {response_text}");
            UpstreamError::Internal(e.to_string())
        })?;

        reply
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .map(|content| content.trim().to_string())
            .filter(|content| !content.is_empty())
            .ok_or_else(|| {
                log::error!("Completion service returned no answer: {response_text}");
                UpstreamError::Internal("empty completion".to_string())
            })
    }
}
