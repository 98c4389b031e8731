//! Background removal of expired windows.

use std::{sync::Arc, time::Duration};

use tokio::{task::JoinHandle, time::MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use crate::{clock::Clock, storage::WindowStore};

/// Periodically deletes windows that are over.
///
/// The sweep runs on its own timer, independent of request traffic. Expired keys are collected
/// first and removed one by one, so no lock is held across the whole map and a window renewed in
/// between survives.
pub struct Sweeper<S, C> {
    storage: Arc<S>,
    clock: Arc<C>,
    interval: Duration,
    running: Option<(CancellationToken, JoinHandle<()>)>,
}

impl<S: WindowStore, C: Clock> Sweeper<S, C> {
    /// Create a stopped sweeper.
    pub fn new(storage: Arc<S>, clock: Arc<C>, interval: Duration) -> Self {
        Self {
            storage,
            clock,
            interval,
            running: None,
        }
    }

    /// Remove every window that is over now. Returns how many were removed.
    pub fn sweep(&self) -> usize {
        sweep_once(self.storage.as_ref(), self.clock.as_ref())
    }

    /// Whether the background task is running.
    pub fn is_running(&self) -> bool {
        self.running.is_some()
    }

    /// Start sweeping in the background. Does nothing when already running.
    ///
    /// Must be called from within a tokio runtime.
    pub fn start(&mut self) {
        if self.running.is_some() {
            return;
        }

        let token = CancellationToken::new();
        let storage = self.storage.clone();
        let clock = self.clock.clone();
        let period = self.interval;
        let cancelled = token.clone();

        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    _ = cancelled.cancelled() => break,
                    _ = ticker.tick() => {
                        sweep_once(storage.as_ref(), clock.as_ref());
                    }
                }
            }

            log::debug!("Rate limit sweeper stopped");
        });

        log::debug!("Rate limit sweeper started, sweeping every {period:?}");
        self.running = Some((token, handle));
    }

    /// Stop the background task and wait for it to finish.
    pub async fn stop(&mut self) {
        let Some((token, handle)) = self.running.take() else {
            return;
        };

        token.cancel();

        if let Err(e) = handle.await {
            log::error!("Rate limit sweeper task failed: {e}");
        }
    }
}

impl<S, C> Drop for Sweeper<S, C> {
    fn drop(&mut self) {
        if let Some((token, _)) = &self.running {
            token.cancel();
        }
    }
}

fn sweep_once<S: WindowStore, C: Clock>(storage: &S, clock: &C) -> usize {
    let now = clock.now();
    let expired = storage.expired_keys(now);

    let removed = expired
        .iter()
        .filter(|key| storage.delete_expired(key, now))
        .count();

    if removed > 0 {
        log::debug!("Removed {removed} expired rate limit windows, {} remain", storage.len());
    }

    removed
}
