use std::{fmt::Write, path::Path, str::FromStr};

use anyhow::{Context, bail};
use indoc::indoc;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use serde_dynamic_string::DynamicString;
use toml::Value;

use crate::{AuditStorageConfig, Config};

pub fn load<P: AsRef<Path>>(path: P) -> anyhow::Result<Config> {
    let path = path.as_ref();

    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read configuration file {}", path.display()))?;

    load_from_str(&content)
}

pub(crate) fn load_from_str(content: &str) -> anyhow::Result<Config> {
    let mut raw_config: Value = toml::from_str(content)?;
    expand_dynamic_strings(&mut Vec::new(), &mut raw_config)?;

    let config = Config::deserialize(raw_config)?;
    validate(&config)?;

    Ok(config)
}

pub(crate) fn validate(config: &Config) -> anyhow::Result<()> {
    if is_blank(config.captcha.secret.as_ref()) {
        bail!(indoc! {r#"
            No CAPTCHA secret configured. Without it every verification would fail.

            Example configuration:

              [captcha]
              secret = "{{ env.CAPTCHA_SECRET }}"
        "#});
    }

    if is_blank(config.chat.upstream.api_key.as_ref()) {
        bail!(indoc! {r#"
            No completion upstream credential configured.

            Example configuration:

              [chat.upstream]
              api_key = "{{ env.OPENAI_API_KEY }}"
        "#});
    }

    let rate_limits = &config.server.rate_limits;

    if rate_limits.limit == 0 {
        bail!("server.rate_limits.limit must be greater than zero");
    }

    if rate_limits.interval.is_zero() {
        bail!("server.rate_limits.interval must be greater than zero");
    }

    if rate_limits.sweep_interval.is_zero() {
        bail!("server.rate_limits.sweep_interval must be greater than zero");
    }

    let chat = &config.chat;

    if chat.max_message_length == 0 {
        bail!("chat.max_message_length must be greater than zero");
    }

    if chat.max_body_bytes == 0 {
        bail!("chat.max_body_bytes must be greater than zero");
    }

    if chat.forwarded_history > chat.max_history_items {
        bail!(
            "chat.forwarded_history ({}) cannot exceed chat.max_history_items ({})",
            chat.forwarded_history,
            chat.max_history_items
        );
    }

    if let AuditStorageConfig::Memory { capacity: 0 } = config.captcha.audit {
        bail!("captcha.audit.capacity must be greater than zero");
    }

    let alerting = &config.captcha.alerting;

    if alerting.enabled {
        if !(alerting.failure_ratio > 0.0 && alerting.failure_ratio <= 1.0) {
            bail!(
                "captcha.alerting.failure_ratio must be within (0, 1], got {}",
                alerting.failure_ratio
            );
        }

        if alerting.check_interval.is_zero() || alerting.window.is_zero() {
            bail!("captcha.alerting.window and captcha.alerting.check_interval must be greater than zero");
        }
    }

    Ok(())
}

fn is_blank(secret: Option<&SecretString>) -> bool {
    secret.is_none_or(|secret| secret.expose_secret().trim().is_empty())
}

fn expand_dynamic_strings<'a>(path: &mut Vec<Result<&'a str, usize>>, value: &'a mut Value) -> anyhow::Result<()> {
    match value {
        Value::String(s) => match DynamicString::<String>::from_str(s) {
            Ok(out) => *s = out.into_inner(),
            Err(err) => {
                let mut p = String::new();

                for segment in path {
                    match segment {
                        Ok(s) => {
                            p.push_str(s);
                            p.push('.');
                        }
                        Err(i) => write!(p, "[{i}]")?,
                    }
                }

                if p.ends_with('.') {
                    p.pop();
                }

                bail!("Failed to expand dynamic string at path '{p}': {err}");
            }
        },
        Value::Array(values) => {
            for (i, value) in values.iter_mut().enumerate() {
                path.push(Err(i));
                expand_dynamic_strings(path, value)?;
                path.pop();
            }
        }
        Value::Table(map) => {
            for (key, value) in map {
                path.push(Ok(key.as_str()));
                expand_dynamic_strings(path, value)?;
                path.pop();
            }
        }
        Value::Integer(_) | Value::Float(_) | Value::Boolean(_) | Value::Datetime(_) => (),
    }

    Ok(())
}
