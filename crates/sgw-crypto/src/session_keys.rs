//! Ephemeral key cache keyed by envelope nonce.
//!
//! Each nonce id maps to exactly one keypair for the lifetime of the cache.
//! Creation happens under the owning shard's write lock, so callers racing on
//! the same unseen nonce all observe the same `Arc<KeyPair>`.

use std::sync::Arc;

use dashmap::DashMap;

use crate::keys::KeyPair;

/// Nonce id -> ephemeral keypair. Never persisted.
#[derive(Debug, Default)]
pub struct SessionKeyCache {
    keys: DashMap<String, Arc<KeyPair>>,
}

impl SessionKeyCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the keypair for `nonce_id`, generating it on first use.
    ///
    /// Generation runs while the entry is locked; a second caller for the
    /// same id blocks until the first insert completes and then reads it.
    pub fn get_or_create(&self, nonce_id: &str) -> Arc<KeyPair> {
        if let Some(existing) = self.keys.get(nonce_id) {
            return Arc::clone(existing.value());
        }
        let entry = self
            .keys
            .entry(nonce_id.to_owned())
            .or_insert_with(|| Arc::new(KeyPair::generate()));
        Arc::clone(entry.value())
    }

    /// Look up without creating.
    pub fn get(&self, nonce_id: &str) -> Option<Arc<KeyPair>> {
        self.keys.get(nonce_id).map(|e| Arc::clone(e.value()))
    }

    pub fn contains(&self, nonce_id: &str) -> bool {
        self.keys.contains_key(nonce_id)
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn test_same_nonce_same_keypair() {
        let cache = SessionKeyCache::new();
        let a = cache.get_or_create("AAAAAAAAAAAAAAAA");
        let b = cache.get_or_create("AAAAAAAAAAAAAAAA");

        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(*a.secret_bytes(), *b.secret_bytes());
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_distinct_nonces_distinct_keypairs() {
        let cache = SessionKeyCache::new();
        let a = cache.get_or_create("nonce-a");
        let b = cache.get_or_create("nonce-b");

        assert_ne!(a.public_key(), b.public_key());
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn test_get_does_not_create() {
        let cache = SessionKeyCache::new();
        assert!(cache.get("missing").is_none());
        assert!(cache.is_empty());

        let created = cache.get_or_create("present");
        assert!(cache.contains("present"));
        assert!(Arc::ptr_eq(&created, &cache.get("present").unwrap()));
    }

    #[test]
    fn test_concurrent_creation_yields_single_instance() {
        let cache = Arc::new(SessionKeyCache::new());
        let handles: Vec<_> = (0..16)
            .map(|_| {
                let cache = Arc::clone(&cache);
                thread::spawn(move || cache.get_or_create("raced-nonce"))
            })
            .collect();

        let keys: Vec<Arc<KeyPair>> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        for k in &keys[1..] {
            assert!(Arc::ptr_eq(&keys[0], k));
        }
        assert_eq!(cache.len(), 1);
    }
}
