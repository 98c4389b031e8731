use axum::{
    Json,
    http::{HeaderValue, StatusCode, header::RETRY_AFTER},
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;

use crate::{Language, UpstreamError};

/// Why a chat request was not answered.
///
/// Every variant turns into a stable machine-readable code and a localized, user-safe text.
/// Details carried by the variants are only ever logged.
#[derive(Debug, Error)]
pub enum Rejection {
    /// The client used up its request window.
    #[error("client rate limit exceeded, retry in {retry_after}s")]
    RateLimited {
        /// Seconds until the window resets.
        retry_after: u64,
    },

    /// The body is missing or malformed.
    #[error("malformed request body: {0}")]
    InvalidRequest(String),

    /// The message scored as a prompt injection attempt.
    #[error("message looks like a prompt injection attempt (score {score})")]
    SuspectedInjection {
        /// The accumulated pattern score.
        score: u32,
    },

    /// No CAPTCHA token was sent.
    #[error("no CAPTCHA token provided")]
    CaptchaRequired,

    /// The CAPTCHA token did not verify.
    #[error("CAPTCHA verification failed")]
    CaptchaInvalid,

    /// Nothing is left of the message after normalization.
    #[error("message is empty")]
    InvalidMessage,

    /// The completion service failed.
    #[error(transparent)]
    Upstream(#[from] UpstreamError),

    /// Something failed on our side.
    #[error("internal error: {0}")]
    Internal(String),
}

impl Rejection {
    /// HTTP status of the response.
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::RateLimited { .. } | Self::Upstream(UpstreamError::RateLimited(_)) => StatusCode::TOO_MANY_REQUESTS,
            Self::InvalidRequest(_) | Self::SuspectedInjection { .. } | Self::CaptchaRequired | Self::InvalidMessage => {
                StatusCode::BAD_REQUEST
            }
            Self::CaptchaInvalid => StatusCode::FORBIDDEN,
            Self::Upstream(UpstreamError::QuotaExhausted(_)) => StatusCode::PAYMENT_REQUIRED,
            Self::Upstream(UpstreamError::Unavailable(_) | UpstreamError::Internal(_)) | Self::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Machine-readable code, sent as `error`.
    pub fn code(&self) -> &'static str {
        match self {
            Self::RateLimited { .. } => "rate_limited",
            Self::InvalidRequest(_) => "invalid_request",
            Self::SuspectedInjection { .. } => "suspected_injection",
            Self::CaptchaRequired => "captcha_required",
            Self::CaptchaInvalid => "captcha_invalid",
            Self::InvalidMessage => "invalid_message",
            Self::Upstream(UpstreamError::RateLimited(_)) => "upstream_rate_limited",
            Self::Upstream(UpstreamError::QuotaExhausted(_)) => "upstream_quota_exhausted",
            Self::Upstream(UpstreamError::Unavailable(_)) => "upstream_unavailable",
            Self::Upstream(UpstreamError::Internal(_)) | Self::Internal(_) => "internal_error",
        }
    }

    /// Seconds the client should wait before retrying, when known.
    pub fn retry_after(&self) -> Option<u64> {
        match self {
            Self::RateLimited { retry_after } => Some(*retry_after),
            _ => None,
        }
    }

    /// User-facing text, sent as `response`.
    pub fn message(&self, language: Language) -> &'static str {
        use Language::*;

        match (self.code(), language) {
            ("rate_limited", En) => "You are sending messages too quickly. Please wait a moment and try again.",
            ("rate_limited", Ro) => "Trimiți mesaje prea repede. Te rugăm să aștepți puțin și să încerci din nou.",
            ("invalid_request", En) => "We could not read your request. Please try again.",
            ("invalid_request", Ro) => "Nu am putut citi cererea ta. Te rugăm să încerci din nou.",
            ("suspected_injection", En) => "We could not process this message. Please rephrase it and try again.",
            ("suspected_injection", Ro) => "Nu am putut procesa acest mesaj. Te rugăm să îl reformulezi și să încerci din nou.",
            ("captcha_required", En) => "Please complete the verification before sending your message.",
            ("captcha_required", Ro) => "Te rugăm să finalizezi verificarea înainte de a trimite mesajul.",
            ("captcha_invalid", En) => "The verification failed. Please complete it again.",
            ("captcha_invalid", Ro) => "Verificarea a eșuat. Te rugăm să o reiei.",
            ("invalid_message", En) => "Please write a message.",
            ("invalid_message", Ro) => "Te rugăm să scrii un mesaj.",
            ("upstream_rate_limited", En) => {
                "The assistant is receiving too many questions right now. Please try again in a few minutes."
            }
            ("upstream_rate_limited", Ro) => {
                "Asistentul primește prea multe întrebări în acest moment. Te rugăm să încerci din nou în câteva minute."
            }
            ("upstream_quota_exhausted", En) => {
                "The assistant is temporarily unavailable. Please contact us directly by phone or email."
            }
            ("upstream_quota_exhausted", Ro) => {
                "Asistentul nu este disponibil momentan. Te rugăm să ne contactezi direct telefonic sau prin email."
            }
            ("upstream_unavailable", En) => "The assistant could not be reached. Please try again later.",
            ("upstream_unavailable", Ro) => "Asistentul nu a putut fi contactat. Te rugăm să încerci mai târziu.",
            (_, En) => "Something went wrong. Please try again later.",
            (_, Ro) => "A apărut o eroare. Te rugăm să încerci mai târziu.",
        }
    }

    /// Turn the rejection into a response with texts in `language`.
    pub fn into_localized_response(self, language: Language) -> Response {
        let status = self.status_code();

        if status.is_server_error() {
            log::error!("Chat request failed ({}): {self}", status.as_u16());
        } else {
            log::debug!("Chat request rejected ({}): {self}", status.as_u16());
        }

        let body = RejectionBody {
            error: self.code(),
            response: self.message(language),
            retry_after: self.retry_after(),
        };

        let mut response = (status, Json(body)).into_response();

        if let Some(seconds) = self.retry_after() {
            response.headers_mut().insert(RETRY_AFTER, HeaderValue::from(seconds));
        }

        response
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct RejectionBody {
    error: &'static str,
    response: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    retry_after: Option<u64>,
}

impl IntoResponse for Rejection {
    fn into_response(self) -> Response {
        self.into_localized_response(Language::default())
    }
}
