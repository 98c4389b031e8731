use std::collections::VecDeque;

use async_trait::async_trait;
use config::DEFAULT_MEMORY_AUDIT_CAPACITY;
use jiff::Timestamp;
use tokio::sync::Mutex;

use super::{AuditError, AuditLog};
use crate::CaptchaLogRecord;

/// The most recent audit records, kept in process memory.
///
/// Once `capacity` records are stored, every append drops the oldest one.
#[derive(Debug)]
pub struct MemoryAuditLog {
    records: Mutex<VecDeque<CaptchaLogRecord>>,
    capacity: usize,
}

impl Default for MemoryAuditLog {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_MEMORY_AUDIT_CAPACITY)
    }
}

impl MemoryAuditLog {
    /// Create an empty log with the default capacity.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty log keeping at most `capacity` records (at least one).
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);

        Self {
            records: Mutex::new(VecDeque::with_capacity(capacity.min(1024))),
            capacity,
        }
    }

    /// Maximum number of records kept.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// A copy of every record, oldest first.
    pub async fn records(&self) -> Vec<CaptchaLogRecord> {
        self.records.lock().await.iter().cloned().collect()
    }

    /// Number of records.
    pub async fn len(&self) -> usize {
        self.records.lock().await.len()
    }

    /// Whether nothing was recorded yet.
    pub async fn is_empty(&self) -> bool {
        self.records.lock().await.is_empty()
    }
}

#[async_trait]
impl AuditLog for MemoryAuditLog {
    async fn append(&self, record: CaptchaLogRecord) -> Result<(), AuditError> {
        let mut records = self.records.lock().await;

        if records.len() == self.capacity {
            records.pop_front();
        }

        records.push_back(record);

        Ok(())
    }

    async fn records_since(&self, since: Timestamp) -> Result<Vec<CaptchaLogRecord>, AuditError> {
        let records = self.records.lock().await;

        Ok(records
            .iter()
            .filter(|record| record.timestamp >= since)
            .cloned()
            .collect())
    }
}
