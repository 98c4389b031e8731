//! Rate limiting configuration structures.

use std::time::Duration;

use duration_str::deserialize_duration;
use serde::Deserialize;

/// Fixed-window rate limit applied per client identity.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RateLimitConfig {
    /// Maximum number of admitted requests per window.
    pub limit: u32,
    /// Length of one window.
    #[serde(deserialize_with = "deserialize_duration")]
    pub interval: Duration,
    /// How often expired windows are removed from memory.
    #[serde(deserialize_with = "deserialize_duration")]
    pub sweep_interval: Duration,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            limit: 10,
            interval: Duration::from_secs(60),
            sweep_interval: Duration::from_secs(60),
        }
    }
}
