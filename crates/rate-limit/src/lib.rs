//! Per-client fixed-window rate limiting for Warden.
//!
//! Every client identity gets one counting window. The first request opens the window, later
//! requests inside it increment the count until the limit is reached, and rejected requests
//! leave the window untouched. Expired windows are replaced on the next request and removed in
//! the background by a [`Sweeper`].
//!
//! A fixed window lets a client burst up to twice the limit around a window boundary. That is the
//! price for O(1) memory and time per client.

#![deny(missing_docs)]

mod clock;
mod limiter;
mod storage;
mod sweeper;

pub use clock::{Clock, ManualClock, SystemClock};
pub use limiter::{FixedWindowLimiter, RateLimitDecision};
pub use storage::{InMemoryStorage, WindowEntry, WindowStore};
pub use sweeper::Sweeper;
