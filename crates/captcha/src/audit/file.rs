use std::path::{Path, PathBuf};

use async_trait::async_trait;
use jiff::Timestamp;
use tokio::{
    fs::{File, OpenOptions},
    io::AsyncWriteExt,
    sync::Mutex,
};

use super::{AuditError, AuditLog};
use crate::CaptchaLogRecord;

/// Audit records appended to a JSON-lines file.
pub struct FileAuditLog {
    path: PathBuf,
    file: Mutex<File>,
}

impl FileAuditLog {
    /// Open the file for appending, creating it when missing.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self, AuditError> {
        let path = path.as_ref().to_path_buf();
        let file = OpenOptions::new().create(true).append(true).open(&path).await?;

        Ok(Self {
            path,
            file: Mutex::new(file),
        })
    }
}

#[async_trait]
impl AuditLog for FileAuditLog {
    async fn append(&self, record: CaptchaLogRecord) -> Result<(), AuditError> {
        let mut line = serde_json::to_vec(&record)?;
        line.push(b'\n');

        // One writer at a time keeps lines whole.
        let mut file = self.file.lock().await;
        file.write_all(&line).await?;
        file.flush().await?;

        Ok(())
    }

    async fn records_since(&self, since: Timestamp) -> Result<Vec<CaptchaLogRecord>, AuditError> {
        let content = tokio::fs::read_to_string(&self.path).await?;
        let mut records = Vec::new();

        for (number, line) in content.lines().enumerate() {
            if line.trim().is_empty() {
                continue;
            }

            match serde_json::from_str::<CaptchaLogRecord>(line) {
                Ok(record) if record.timestamp >= since => records.push(record),
                Ok(_) => (),
                Err(e) => {
                    log::warn!("Skipping malformed audit line {} in {}: {e}", number + 1, self.path.display());
                }
            }
        }

        Ok(records)
    }
}
