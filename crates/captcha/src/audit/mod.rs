//! Append-only storage of verification attempts.

mod file;
mod memory;

pub use file::FileAuditLog;
pub use memory::MemoryAuditLog;

use async_trait::async_trait;
use jiff::Timestamp;

use crate::CaptchaLogRecord;

/// Errors of the audit stores.
#[derive(Debug, thiserror::Error)]
pub enum AuditError {
    /// Reading or writing the backing file failed.
    #[error("Audit log I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A record could not be encoded.
    #[error("Audit record serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// An append-only audit trail of verification attempts.
///
/// Records are never changed or removed through this interface.
#[async_trait]
pub trait AuditLog: Send + Sync {
    /// Persist one record.
    async fn append(&self, record: CaptchaLogRecord) -> Result<(), AuditError>;

    /// Every record with a timestamp at or after `since`, oldest first.
    async fn records_since(&self, since: Timestamp) -> Result<Vec<CaptchaLogRecord>, AuditError>;
}
