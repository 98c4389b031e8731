//! Warden configuration structures to map the warden.toml configuration.

#![deny(missing_docs)]

mod captcha;
mod chat;
mod client_identification;
mod cors;
mod loader;
mod rate_limit;
mod server;

use std::path::Path;

pub use captcha::{AuditStorageConfig, CaptchaConfig, DEFAULT_MEMORY_AUDIT_CAPACITY, SpamAlertConfig};
pub use chat::{ChatConfig, UpstreamConfig};
pub use client_identification::ClientIdentificationConfig;
pub use cors::*;
pub use rate_limit::RateLimitConfig;
pub use server::{HealthConfig, ServerConfig, TlsServerConfig};
use serde::Deserialize;

/// Main configuration structure for the Warden application.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// HTTP server configuration settings.
    #[serde(default)]
    pub server: ServerConfig,
    /// Human verification settings.
    #[serde(default)]
    pub captcha: CaptchaConfig,
    /// Chat endpoint and completion upstream settings.
    #[serde(default)]
    pub chat: ChatConfig,
}

impl Config {
    /// Load configuration from a file path.
    pub fn load<P: AsRef<Path>>(path: P) -> anyhow::Result<Config> {
        loader::load(path)
    }

    /// Validates that every required secret is present and every limit is usable.
    pub fn validate(&self) -> anyhow::Result<()> {
        loader::validate(self)
    }
}

#[cfg(test)]
mod tests {
    use indoc::indoc;
    use insta::assert_debug_snapshot;

    use crate::Config;

    #[test]
    fn defaults() {
        let config: Config = toml::from_str("").unwrap();

        assert_debug_snapshot!(&config.server, @r#"
        ServerConfig {
            listen_address: None,
            tls: None,
            health: HealthConfig {
                enabled: true,
                listen: None,
                path: "/health",
            },
            cors: None,
            client_identification: ClientIdentificationConfig {
                forwarded_headers: [
                    "cf-connecting-ip",
                    "x-real-ip",
                    "x-forwarded-for",
                ],
                api_key_header: "apikey",
            },
            rate_limits: RateLimitConfig {
                limit: 10,
                interval: 60s,
                sweep_interval: 60s,
            },
        }
        "#);

        assert!(config.captcha.secret.is_none());
        assert!(config.chat.upstream.api_key.is_none());
    }

    #[test]
    fn server_values() {
        let config = indoc! {r#"
            [server]
            listen_address = "127.0.0.1:8080"

            [server.health]
            path = "/healthz"

            [server.rate_limits]
            limit = 5
            interval = "30s"
            sweep_interval = "5m"

            [server.client_identification]
            forwarded_headers = ["x-real-ip"]
            api_key_header = "x-api-key"
        "#};

        let config: Config = toml::from_str(config).unwrap();

        assert_debug_snapshot!(&config.server, @r#"
        ServerConfig {
            listen_address: Some(
                127.0.0.1:8080,
            ),
            tls: None,
            health: HealthConfig {
                enabled: true,
                listen: None,
                path: "/healthz",
            },
            cors: None,
            client_identification: ClientIdentificationConfig {
                forwarded_headers: [
                    "x-real-ip",
                ],
                api_key_header: "x-api-key",
            },
            rate_limits: RateLimitConfig {
                limit: 5,
                interval: 30s,
                sweep_interval: 300s,
            },
        }
        "#);
    }

    #[test]
    fn unknown_fields_are_rejected() {
        let config = indoc! {r#"
            [server.rate_limits]
            limit = 5
            per_ip = 3
        "#};

        let result: Result<Config, _> = toml::from_str(config);
        assert!(result.is_err());
    }
}
