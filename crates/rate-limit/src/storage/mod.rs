//! Storage backends for rate limit windows.

use std::time::Instant;

pub mod memory;

pub use memory::InMemoryStorage;

/// The counting window of one client.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowEntry {
    /// Requests admitted in this window.
    pub count: u32,
    /// When the window closes.
    pub reset_at: Instant,
}

impl WindowEntry {
    /// Whether the window is over at `now`.
    pub fn is_expired(&self, now: Instant) -> bool {
        now >= self.reset_at
    }
}

/// Keyed window storage shared by every request.
pub trait WindowStore: Send + Sync + 'static {
    /// Read the window of a key.
    fn get(&self, key: &str) -> Option<WindowEntry>;

    /// Replace the window of a key.
    fn set(&self, key: &str, entry: WindowEntry);

    /// Remove the window of a key, returning it.
    fn delete(&self, key: &str) -> Option<WindowEntry>;

    /// Read-modify-write the window of a key.
    ///
    /// No other update of the same key may interleave between reading the current entry and
    /// storing the one returned by `f`.
    fn update<R>(&self, key: &str, f: impl FnOnce(Option<WindowEntry>) -> (WindowEntry, R)) -> R;

    /// Keys whose window is over at `now`, as seen at the time of the call.
    fn expired_keys(&self, now: Instant) -> Vec<String>;

    /// Remove the window of a key if it is still over at `now`.
    fn delete_expired(&self, key: &str, now: Instant) -> bool;

    /// Number of stored windows.
    fn len(&self) -> usize;

    /// Whether no window is stored.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
