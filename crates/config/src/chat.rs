//! Chat endpoint and completion upstream configuration.

use std::{borrow::Cow, time::Duration};

use duration_str::deserialize_duration;
use secrecy::SecretString;
use serde::Deserialize;
use url::Url;

const DEFAULT_UPSTREAM_URL: &str = "https://api.openai.com/v1";

/// Configuration of the public chat endpoint.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ChatConfig {
    /// Route of the chat endpoint.
    pub path: Cow<'static, str>,
    /// Maximum characters kept of the message and of each history item.
    pub max_message_length: usize,
    /// Maximum history items accepted; older items are dropped first.
    pub max_history_items: usize,
    /// Largest request body read, in bytes. Larger bodies are refused as invalid requests.
    pub max_body_bytes: usize,
    /// Trailing history turns forwarded upstream.
    pub forwarded_history: usize,
    /// Accumulated injection score at which a message is refused.
    pub injection_threshold: u32,
    /// Replaces the built-in system prompt when set.
    pub system_prompt: Option<String>,
    /// The completion service called after admission.
    pub upstream: UpstreamConfig,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            path: Cow::Borrowed("/chat"),
            max_message_length: 2000,
            max_history_items: 20,
            max_body_bytes: 256 * 1024,
            forwarded_history: 8,
            injection_threshold: 3,
            system_prompt: None,
            upstream: UpstreamConfig::default(),
        }
    }
}

/// OpenAI-compatible completion service.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct UpstreamConfig {
    /// Bearer credential. Required.
    pub api_key: Option<SecretString>,
    /// Base URL; `/chat/completions` is appended.
    pub base_url: Url,
    /// Model identifier sent with every request.
    pub model: String,
    /// Output budget per completion.
    pub max_tokens: u32,
    /// Deadline for one completion call.
    #[serde(deserialize_with = "deserialize_duration")]
    pub timeout: Duration,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: default_upstream_url(),
            model: "gpt-4o-mini".to_string(),
            max_tokens: 500,
            timeout: Duration::from_secs(30),
        }
    }
}

#[allow(clippy::expect_used)]
fn default_upstream_url() -> Url {
    Url::parse(DEFAULT_UPSTREAM_URL).expect("default upstream URL is valid")
}
