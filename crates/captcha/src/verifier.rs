use std::{net::IpAddr, sync::Arc};

use config::CaptchaConfig;
use jiff::Timestamp;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use url::Url;

use crate::{AuditLog, CaptchaLogRecord, CaptchaVerdict, VerificationContext};

/// Reasons a verification could not be completed. All of them fail the verification.
#[derive(Debug, thiserror::Error)]
enum VerificationError {
    #[error("no CAPTCHA secret is configured")]
    MissingSecret,

    #[error("no token was provided")]
    MissingToken,

    #[error("request to the verification service failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("verification service answered with status {0}")]
    Status(u16),

    #[error("verification service reply could not be parsed: {0}")]
    InvalidReply(#[from] serde_json::Error),
}

impl VerificationError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::MissingSecret => "missing-input-secret",
            Self::MissingToken => "missing-input-response",
            Self::Transport(e) if e.is_timeout() => "timeout",
            Self::Transport(_) => "transport-error",
            Self::Status(_) => "bad-status",
            Self::InvalidReply(_) => "invalid-reply",
        }
    }
}

/// Checks client tokens against the external verification service.
pub struct CaptchaVerifier {
    client: Client,
    verify_url: Url,
    secret: Option<SecretString>,
    audit: Arc<dyn AuditLog>,
}

impl CaptchaVerifier {
    /// Create a verifier writing its attempts to `audit`.
    ///
    /// A missing secret is accepted here, but then every verification fails.
    pub fn new(config: &CaptchaConfig, audit: Arc<dyn AuditLog>) -> Result<Self, reqwest::Error> {
        let client = Client::builder().timeout(config.timeout).build()?;

        if config.secret.is_none() {
            log::error!("No CAPTCHA secret configured, every verification will fail");
        }

        Ok(Self {
            client,
            verify_url: config.verify_url.clone(),
            secret: config.secret.clone(),
            audit,
        })
    }

    /// Whether `token` proves a human on the form in `context`.
    pub async fn verify(&self, token: &str, context: &VerificationContext) -> bool {
        self.verify_detailed(token, context).await.success
    }

    /// Verify `token` and return the full verdict.
    ///
    /// Exactly one audit record is written before returning. A failing audit write is logged and
    /// does not change the verdict.
    pub async fn verify_detailed(&self, token: &str, context: &VerificationContext) -> CaptchaVerdict {
        let verdict = match self.request_verdict(token, context).await {
            Ok(verdict) => verdict,
            Err(e) => {
                log::warn!("CAPTCHA verification for '{}' failed closed: {e}", context.client_identity);
                CaptchaVerdict::failed(e.error_code())
            }
        };

        if verdict.success {
            log::debug!("CAPTCHA verified for '{}' on form '{}'", context.client_identity, context.form_type);
        } else {
            log::debug!(
                "CAPTCHA rejected for '{}' on form '{}': {:?}",
                context.client_identity,
                context.form_type,
                verdict.error_codes
            );
        }

        let record = CaptchaLogRecord::new(context, &verdict, Timestamp::now());

        if let Err(e) = self.audit.append(record).await {
            log::error!("Failed to write CAPTCHA audit record: {e}");
        }

        verdict
    }

    async fn request_verdict(
        &self,
        token: &str,
        context: &VerificationContext,
    ) -> Result<CaptchaVerdict, VerificationError> {
        let secret = self.secret.as_ref().ok_or(VerificationError::MissingSecret)?;

        if token.trim().is_empty() {
            return Err(VerificationError::MissingToken);
        }

        let mut form = vec![("secret", secret.expose_secret()), ("response", token)];

        if context.client_identity.parse::<IpAddr>().is_ok() {
            form.push(("remoteip", context.client_identity.as_str()));
        }

        let response = self.client.post(self.verify_url.clone()).form(&form).send().await?;
        let status = response.status();

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            log::error!("CAPTCHA verification service error ({status}): {body}");

            return Err(VerificationError::Status(status.as_u16()));
        }

        let body = response.text().await?;

        serde_json::from_str(&body).map_err(|e| {
            log::error!("Raw verification reply that failed to parse: {body}");
            VerificationError::from(e)
        })
    }
}
