use std::{collections::BTreeMap, sync::Arc};

use config::SpamAlertConfig;
use jiff::{SignedDuration, Timestamp};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::{AuditError, AuditLog};

/// A form whose verification failure rate crossed the threshold.
#[derive(Debug, Clone, PartialEq)]
pub struct SpamAlert {
    /// The affected form.
    pub form_type: String,
    /// Attempts in the window.
    pub attempts: usize,
    /// Failed attempts in the window.
    pub failures: usize,
    /// `failures / attempts`.
    pub failure_ratio: f64,
}

/// Watches the audit trail for spikes of failed verifications.
pub struct SpamMonitor {
    audit: Arc<dyn AuditLog>,
    config: SpamAlertConfig,
    running: Option<(CancellationToken, JoinHandle<()>)>,
}

impl SpamMonitor {
    /// Create a stopped monitor.
    pub fn new(audit: Arc<dyn AuditLog>, config: SpamAlertConfig) -> Self {
        Self {
            audit,
            config,
            running: None,
        }
    }

    /// Evaluate the window ending at `now` and return the forms over the threshold.
    pub async fn evaluate(&self, now: Timestamp) -> Result<Vec<SpamAlert>, AuditError> {
        evaluate(self.audit.as_ref(), &self.config, now).await
    }

    /// Whether the background task is running.
    pub fn is_running(&self) -> bool {
        self.running.is_some()
    }

    /// Start evaluating every `check_interval`, logging a warning per alert.
    pub fn start(&mut self) {
        if self.running.is_some() {
            return;
        }

        let token = CancellationToken::new();
        let cancelled = token.clone();
        let audit = self.audit.clone();
        let config = self.config.clone();

        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(config.check_interval);

            loop {
                tokio::select! {
                    _ = cancelled.cancelled() => break,
                    _ = ticker.tick() => {
                        match evaluate(audit.as_ref(), &config, Timestamp::now()).await {
                            Ok(alerts) => {
                                for alert in alerts {
                                    log::warn!(
                                        "High CAPTCHA failure rate on form '{}': {} of {} attempts failed ({:.0}%) in the last {:?}",
                                        alert.form_type,
                                        alert.failures,
                                        alert.attempts,
                                        alert.failure_ratio * 100.0,
                                        config.window
                                    );
                                }
                            }
                            Err(e) => log::error!("Failed to read CAPTCHA audit log for spam monitoring: {e}"),
                        }
                    }
                }
            }
        });

        log::debug!("CAPTCHA spam monitor started, checking every {:?}", self.config.check_interval);
        self.running = Some((token, handle));
    }

    /// Stop the background task and wait for it to finish.
    pub async fn stop(&mut self) {
        let Some((token, handle)) = self.running.take() else {
            return;
        };

        token.cancel();

        if let Err(e) = handle.await {
            log::error!("CAPTCHA spam monitor task failed: {e}");
        }
    }
}

impl Drop for SpamMonitor {
    fn drop(&mut self) {
        if let Some((token, _)) = &self.running {
            token.cancel();
        }
    }
}

async fn evaluate(
    audit: &dyn AuditLog,
    config: &SpamAlertConfig,
    now: Timestamp,
) -> Result<Vec<SpamAlert>, AuditError> {
    let since = SignedDuration::try_from(config.window)
        .ok()
        .and_then(|window| now.checked_sub(window).ok())
        .unwrap_or(Timestamp::MIN);

    let mut per_form: BTreeMap<String, (usize, usize)> = BTreeMap::new();

    for record in audit.records_since(since).await? {
        if record.timestamp > now {
            continue;
        }

        let (attempts, failures) = per_form.entry(record.form_type).or_default();
        *attempts += 1;
        *failures += usize::from(!record.success);
    }

    let alerts = per_form
        .into_iter()
        .filter(|(_, (attempts, _))| *attempts >= config.min_attempts.max(1))
        .map(|(form_type, (attempts, failures))| SpamAlert {
            form_type,
            attempts,
            failures,
            failure_ratio: failures as f64 / attempts as f64,
        })
        .filter(|alert| alert.failure_ratio >= config.failure_ratio)
        .collect();

    Ok(alerts)
}
