//! Human verification for Warden's public forms.
//!
//! [`CaptchaVerifier`] asks an external verification service whether a client token is valid and
//! writes one [`CaptchaLogRecord`] per attempt to an [`AuditLog`], whatever the outcome. Any
//! failure to reach or understand the service counts as a failed verification.
//!
//! [`SpamMonitor`] reads the audit trail back and warns when a form's failure rate spikes.

#![deny(missing_docs)]

mod audit;
mod monitor;
mod record;
mod verifier;

pub use audit::{AuditError, AuditLog, FileAuditLog, MemoryAuditLog};
pub use monitor::{SpamAlert, SpamMonitor};
pub use record::{CaptchaLogRecord, CaptchaVerdict, VerificationContext};
pub use verifier::CaptchaVerifier;

use std::sync::Arc;

use config::AuditStorageConfig;

/// Create the audit log selected in the configuration.
pub async fn audit_log(config: &AuditStorageConfig) -> Result<Arc<dyn AuditLog>, AuditError> {
    match config {
        AuditStorageConfig::Memory { capacity } => {
            log::debug!("Recording up to {capacity} CAPTCHA verifications in memory");
            Ok(Arc::new(MemoryAuditLog::with_capacity(*capacity)))
        }
        AuditStorageConfig::File { path } => {
            log::debug!("Recording CAPTCHA verifications to {}", path.display());
            Ok(Arc::new(FileAuditLog::open(path).await?))
        }
    }
}
