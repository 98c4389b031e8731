//! The fixed-window limiter.

use std::{
    sync::Arc,
    time::{Duration, Instant},
};

use config::RateLimitConfig;

use crate::{
    clock::{Clock, SystemClock},
    storage::{InMemoryStorage, WindowEntry, WindowStore},
    sweeper::Sweeper,
};

/// Outcome of one rate limit check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitDecision {
    /// Whether the request may proceed.
    pub allowed: bool,
    /// The configured maximum per window.
    pub limit: u32,
    /// Requests still admitted in the current window.
    pub remaining: u32,
    /// When the current window closes.
    pub reset_at: Instant,
    /// When the decision was taken.
    pub checked_at: Instant,
}

impl RateLimitDecision {
    /// Time left until the window closes.
    pub fn reset_after(&self) -> Duration {
        self.reset_at.saturating_duration_since(self.checked_at)
    }

    /// Whole seconds until the window closes, rounded up.
    pub fn reset_after_secs(&self) -> u64 {
        let reset_after = self.reset_after();
        reset_after.as_secs() + u64::from(reset_after.subsec_nanos() > 0)
    }

    /// Whole seconds a rejected client should wait, rounded up and never zero.
    pub fn retry_after_secs(&self) -> u64 {
        self.reset_after_secs().max(1)
    }
}

/// Counts requests per client identity in fixed, non-overlapping windows.
pub struct FixedWindowLimiter<S = InMemoryStorage, C = SystemClock> {
    storage: Arc<S>,
    clock: Arc<C>,
    limit: u32,
    interval: Duration,
}

impl FixedWindowLimiter {
    /// Create a limiter with in-memory storage and the system clock.
    pub fn new(config: &RateLimitConfig) -> Self {
        Self::with_parts(
            Arc::new(InMemoryStorage::new()),
            Arc::new(SystemClock),
            config.limit,
            config.interval,
        )
    }
}

impl<S: WindowStore, C: Clock> FixedWindowLimiter<S, C> {
    /// Create a limiter over the given storage and clock.
    pub fn with_parts(storage: Arc<S>, clock: Arc<C>, limit: u32, interval: Duration) -> Self {
        Self {
            storage,
            clock,
            limit,
            interval,
        }
    }

    /// The maximum admitted requests per window.
    pub fn limit(&self) -> u32 {
        self.limit
    }

    /// The window length.
    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// The storage holding the windows.
    pub fn storage(&self) -> &Arc<S> {
        &self.storage
    }

    /// A sweeper removing this limiter's expired windows every `interval`.
    pub fn sweeper(&self, interval: Duration) -> Sweeper<S, C> {
        Sweeper::new(self.storage.clone(), self.clock.clone(), interval)
    }

    /// Check and count one request of `identity`.
    ///
    /// A rejected request neither increments the count nor moves the window.
    pub fn check(&self, identity: &str) -> RateLimitDecision {
        let now = self.clock.now();
        let limit = self.limit;
        let interval = self.interval;

        let decision = self.storage.update(identity, |current| match current {
            Some(entry) if !entry.is_expired(now) && entry.count >= limit => {
                let decision = RateLimitDecision {
                    allowed: false,
                    limit,
                    remaining: 0,
                    reset_at: entry.reset_at,
                    checked_at: now,
                };

                (entry, decision)
            }
            Some(entry) if !entry.is_expired(now) => {
                let entry = WindowEntry {
                    count: entry.count + 1,
                    ..entry
                };

                let decision = RateLimitDecision {
                    allowed: true,
                    limit,
                    remaining: limit - entry.count,
                    reset_at: entry.reset_at,
                    checked_at: now,
                };

                (entry, decision)
            }
            // No window yet, or the old one is over: start a fresh one.
            _ => {
                let entry = WindowEntry {
                    count: u32::from(limit > 0),
                    reset_at: now + interval,
                };

                let decision = RateLimitDecision {
                    allowed: limit > 0,
                    limit,
                    remaining: limit.saturating_sub(entry.count),
                    reset_at: entry.reset_at,
                    checked_at: now,
                };

                (entry, decision)
            }
        });

        if decision.allowed {
            log::debug!(
                "Request allowed for key '{identity}' - {} of {limit} remaining",
                decision.remaining
            );
        } else {
            log::debug!(
                "Request blocked for key '{identity}' - rate limit exceeded, window resets in {:?}",
                decision.reset_after()
            );
        }

        decision
    }
}
