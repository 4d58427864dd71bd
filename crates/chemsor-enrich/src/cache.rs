//! Per-run cache of definitive lookup answers.

use std::collections::HashMap;
use std::hash::Hash;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, PoisonError};

/// Maps a lookup key to its definitive answer (`None` = no match).
///
/// Failures are never stored, so an unresolved key is asked again on the
/// next run of the resolver.
#[derive(Debug)]
pub struct LookupCache<K> {
    entries: Mutex<HashMap<K, Option<String>>>,
    hits: AtomicUsize,
}

impl<K: Eq + Hash> Default for LookupCache<K> {
    fn default() -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            hits: AtomicUsize::new(0),
        }
    }
}

impl<K: Eq + Hash> LookupCache<K> {
    pub fn get(&self, key: &K) -> Option<Option<String>> {
        let entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        let cached = entries.get(key).cloned();
        if cached.is_some() {
            self.hits.fetch_add(1, Ordering::Relaxed);
        }
        cached
    }

    pub fn insert(&self, key: K, answer: Option<String>) {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key, answer);
    }

    pub fn len(&self) -> usize {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn hits(&self) -> usize {
        self.hits.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn absent_answers_are_cached() {
        let cache = LookupCache::default();
        assert_eq!(cache.get(&"50-00-0".to_string()), None);
        cache.insert("50-00-0".to_string(), None);
        assert_eq!(cache.get(&"50-00-0".to_string()), Some(None));
        assert_eq!(cache.hits(), 1);
        assert_eq!(cache.len(), 1);
    }
}
