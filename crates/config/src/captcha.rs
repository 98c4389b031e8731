//! Human verification (CAPTCHA) configuration.

use std::{path::PathBuf, time::Duration};

use duration_str::deserialize_duration;
use secrecy::SecretString;
use serde::Deserialize;
use url::Url;

const DEFAULT_VERIFY_URL: &str = "https://challenges.cloudflare.com/turnstile/v0/siteverify";

/// Settings for the external verification service and its audit trail.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CaptchaConfig {
    /// Server-held secret sent with every verification. Required.
    pub secret: Option<SecretString>,
    /// The verification endpoint, receiving form-encoded `secret` and `response`.
    pub verify_url: Url,
    /// Deadline for one verification call.
    #[serde(deserialize_with = "deserialize_duration")]
    pub timeout: Duration,
    /// Form name written into every audit record of the chat endpoint.
    pub form_type: String,
    /// Where verification attempts are recorded.
    pub audit: AuditStorageConfig,
    /// Spam-rate alerting over the audit trail.
    pub alerting: SpamAlertConfig,
}

impl Default for CaptchaConfig {
    fn default() -> Self {
        Self {
            secret: None,
            verify_url: default_verify_url(),
            timeout: Duration::from_secs(10),
            form_type: "chat".to_string(),
            audit: AuditStorageConfig::default(),
            alerting: SpamAlertConfig::default(),
        }
    }
}

#[allow(clippy::expect_used)]
fn default_verify_url() -> Url {
    Url::parse(DEFAULT_VERIFY_URL).expect("default verification URL is valid")
}

/// Records kept by the in-memory audit store unless configured otherwise.
pub const DEFAULT_MEMORY_AUDIT_CAPACITY: usize = 10_000;

fn default_memory_audit_capacity() -> usize {
    DEFAULT_MEMORY_AUDIT_CAPACITY
}

/// Audit store backend.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum AuditStorageConfig {
    /// Keep the most recent records in process memory (default).
    Memory {
        /// Maximum records kept; the oldest are dropped first.
        #[serde(default = "default_memory_audit_capacity")]
        capacity: usize,
    },
    /// Append JSON lines to a file.
    File {
        /// Path of the JSON-lines file; created when missing.
        path: PathBuf,
    },
}

impl Default for AuditStorageConfig {
    fn default() -> Self {
        Self::Memory {
            capacity: DEFAULT_MEMORY_AUDIT_CAPACITY,
        }
    }
}

/// Spam-rate alerting over recent verification attempts.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SpamAlertConfig {
    /// Whether the background monitor runs.
    pub enabled: bool,
    /// How far back each evaluation looks.
    #[serde(deserialize_with = "deserialize_duration")]
    pub window: Duration,
    /// How often the monitor evaluates.
    #[serde(deserialize_with = "deserialize_duration")]
    pub check_interval: Duration,
    /// Failure share (0, 1] at which a form type is reported.
    pub failure_ratio: f64,
    /// Attempts needed in the window before a form type is judged at all.
    pub min_attempts: usize,
}

impl Default for SpamAlertConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            window: Duration::from_secs(15 * 60),
            check_interval: Duration::from_secs(60),
            failure_ratio: 0.5,
            min_attempts: 20,
        }
    }
}
