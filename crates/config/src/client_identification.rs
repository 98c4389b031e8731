//! Client identification configuration.

use serde::Deserialize;

/// Where the per-request client key comes from.
///
/// Forwarded headers are tried in order; the first one holding a valid IP address wins. Without
/// one, the key is a hash of the user agent and the API key header.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ClientIdentificationConfig {
    /// Trusted headers carrying the client address, highest priority first.
    pub forwarded_headers: Vec<String>,
    /// Header holding the public API key mixed into the fallback hash.
    pub api_key_header: String,
}

impl Default for ClientIdentificationConfig {
    fn default() -> Self {
        Self {
            forwarded_headers: vec![
                "cf-connecting-ip".to_string(),
                "x-real-ip".to_string(),
                "x-forwarded-for".to_string(),
            ],
            api_key_header: "apikey".to_string(),
        }
    }
}
