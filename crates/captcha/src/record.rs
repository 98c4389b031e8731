use jiff::Timestamp;
use serde::{Deserialize, Serialize};

/// Who is being verified, and on which form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerificationContext {
    /// The form the token was submitted with.
    pub form_type: String,
    /// The client identity resolved for the request.
    pub client_identity: String,
    /// The client's user agent, if sent.
    pub user_agent: Option<String>,
}

/// Result of one verification attempt.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct CaptchaVerdict {
    /// Whether the service accepted the token.
    pub success: bool,
    /// Reasons reported by the service, or by us when the service could not answer.
    #[serde(default, rename = "error-codes")]
    pub error_codes: Vec<String>,
    /// Risk score, for services that report one.
    #[serde(default)]
    pub score: Option<f64>,
    /// Hostname the challenge was solved on.
    #[serde(default)]
    pub hostname: Option<String>,
}

impl CaptchaVerdict {
    /// A failed verdict that never reached a conclusion from the service.
    pub fn failed(error_code: impl Into<String>) -> Self {
        Self {
            success: false,
            error_codes: vec![error_code.into()],
            score: None,
            hostname: None,
        }
    }
}

/// One line of the verification audit trail.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CaptchaLogRecord {
    /// The form the token was submitted with.
    pub form_type: String,
    /// Client identity, usually the forwarded address.
    pub ip_address: String,
    /// The client's user agent, if sent.
    pub user_agent: Option<String>,
    /// Whether verification succeeded.
    pub success: bool,
    /// Reported error codes.
    pub error_codes: Vec<String>,
    /// Reported risk score.
    pub score: Option<f64>,
    /// Reported hostname.
    pub hostname: Option<String>,
    /// When the attempt finished.
    pub timestamp: Timestamp,
}

impl CaptchaLogRecord {
    pub(crate) fn new(context: &VerificationContext, verdict: &CaptchaVerdict, timestamp: Timestamp) -> Self {
        Self {
            form_type: context.form_type.clone(),
            ip_address: context.client_identity.clone(),
            user_agent: context.user_agent.clone(),
            success: verdict.success,
            error_codes: verdict.error_codes.clone(),
            score: verdict.score,
            hostname: verdict.hostname.clone(),
            timestamp,
        }
    }
}
