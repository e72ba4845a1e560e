use parking_lot::Mutex;
use std::{borrow::Borrow, collections::HashMap, hash::Hash};

///
/// TtlCache
///
/// Minimal TTL map: entries carry an absolute expiry in clock milliseconds
/// and are dropped lazily on access. Single-key operations are atomic under
/// one interior mutex.
///

pub struct TtlCache<K, V> {
    ttl_ms: u64,
    entries: Mutex<HashMap<K, Entry<V>>>,
}

struct Entry<V> {
    value: V,
    expires_at_ms: u64,
}

impl<K: Eq + Hash, V: Clone> TtlCache<K, V> {
    #[must_use]
    pub fn new(ttl_ms: u64) -> Self {
        Self {
            ttl_ms,
            entries: Mutex::new(HashMap::new()),
        }
    }

    pub fn get<Q>(&self, key: &Q, now_ms: u64) -> Option<V>
    where
        K: Borrow<Q>,
        Q: Eq + Hash + ?Sized,
    {
        let mut entries = self.entries.lock();
        match entries.get(key) {
            Some(entry) if entry.expires_at_ms > now_ms => Some(entry.value.clone()),
            Some(_) => {
                entries.remove(key);
                None
            }
            None => None,
        }
    }

    pub fn insert(&self, key: K, value: V, now_ms: u64) {
        let expires_at_ms = now_ms.saturating_add(self.ttl_ms);
        self.entries.lock().insert(
            key,
            Entry {
                value,
                expires_at_ms,
            },
        );
    }

    pub fn remove<Q>(&self, key: &Q)
    where
        K: Borrow<Q>,
        Q: Eq + Hash + ?Sized,
    {
        self.entries.lock().remove(key);
    }

    pub fn clear(&self) {
        self.entries.lock().clear();
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

///
/// TESTS
///

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn get_drops_expired_entries() {
        let cache = TtlCache::<u32, &str>::new(10);
        cache.insert(1, "a", 100);
        assert_eq!(cache.get(&1, 105), Some("a"));
        assert_eq!(cache.get(&1, 110), None, "expiry is exclusive");
        assert!(cache.is_empty(), "expired entry is removed on access");
    }

    #[test]
    fn insert_replaces_and_extends() {
        let cache = TtlCache::<u32, &str>::new(10);
        cache.insert(1, "a", 100);
        cache.insert(1, "b", 108);
        assert_eq!(cache.get(&1, 115), Some("b"));
    }
}
