//! In-memory window storage.

use std::time::Instant;

use dashmap::{DashMap, mapref::entry::Entry};

use super::{WindowEntry, WindowStore};

/// Windows kept in a sharded concurrent map.
///
/// Updates of one key lock only the shard holding it, so requests of different clients rarely
/// contend and requests of the same client are serialized.
#[derive(Debug, Default)]
pub struct InMemoryStorage {
    entries: DashMap<String, WindowEntry>,
}

impl InMemoryStorage {
    /// Create an empty storage.
    pub fn new() -> Self {
        Self::default()
    }
}

impl WindowStore for InMemoryStorage {
    fn get(&self, key: &str) -> Option<WindowEntry> {
        self.entries.get(key).map(|entry| *entry)
    }

    fn set(&self, key: &str, entry: WindowEntry) {
        self.entries.insert(key.to_string(), entry);
    }

    fn delete(&self, key: &str) -> Option<WindowEntry> {
        self.entries.remove(key).map(|(_, entry)| entry)
    }

    fn update<R>(&self, key: &str, f: impl FnOnce(Option<WindowEntry>) -> (WindowEntry, R)) -> R {
        // Fast path without allocating the key for clients we already know.
        if let Some(mut current) = self.entries.get_mut(key) {
            let (next, result) = f(Some(*current));
            *current = next;

            return result;
        }

        match self.entries.entry(key.to_string()) {
            Entry::Occupied(mut occupied) => {
                let (next, result) = f(Some(*occupied.get()));
                occupied.insert(next);

                result
            }
            Entry::Vacant(vacant) => {
                let (next, result) = f(None);
                vacant.insert(next);

                result
            }
        }
    }

    fn expired_keys(&self, now: Instant) -> Vec<String> {
        self.entries
            .iter()
            .filter(|entry| entry.value().is_expired(now))
            .map(|entry| entry.key().clone())
            .collect()
    }

    fn delete_expired(&self, key: &str, now: Instant) -> bool {
        self.entries.remove_if(key, |_, entry| entry.is_expired(now)).is_some()
    }

    fn len(&self) -> usize {
        self.entries.len()
    }
}
