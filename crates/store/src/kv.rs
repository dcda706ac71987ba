//! Key-value store abstraction.
//!
//! The host framework hands this module a durable key-value handle already
//! scoped to the module's prefix. Everything here layers on that handle;
//! there is no ambient global state.

use std::collections::BTreeMap;

/// A durable key-value store.
///
/// Operations are infallible: the host's store is deterministic and any
/// I/O fault below it is fatal to the hosting process, not a condition
/// this protocol can react to.
pub trait KvStore {
    /// Get the value at a key.
    fn get(&self, key: &[u8]) -> Option<Vec<u8>>;

    /// Set the value at a key.
    fn set(&mut self, key: &[u8], value: &[u8]);

    /// Delete a key.
    fn delete(&mut self, key: &[u8]);

    /// Whether a key exists.
    fn contains(&self, key: &[u8]) -> bool {
        self.get(key).is_some()
    }
}

/// In-memory store over a `BTreeMap`, for tests and simulation.
#[derive(Debug, Default, Clone)]
pub struct MemStore {
    entries: BTreeMap<Vec<u8>, Vec<u8>>,
}

impl MemStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the store is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl KvStore for MemStore {
    fn get(&self, key: &[u8]) -> Option<Vec<u8>> {
        self.entries.get(key).cloned()
    }

    fn set(&mut self, key: &[u8], value: &[u8]) {
        self.entries.insert(key.to_vec(), value.to_vec());
    }

    fn delete(&mut self, key: &[u8]) {
        self.entries.remove(key);
    }
}

/// A store view that prefixes every key, giving a caller its own namespace
/// within a shared handle with no cross-prefix collisions.
#[derive(Debug, Clone)]
pub struct PrefixStore<S> {
    inner: S,
    prefix: Vec<u8>,
}

impl<S: KvStore> PrefixStore<S> {
    /// Wrap a store, scoping all keys under `prefix`.
    pub fn new(inner: S, prefix: impl Into<Vec<u8>>) -> Self {
        Self {
            inner,
            prefix: prefix.into(),
        }
    }

    fn scoped(&self, key: &[u8]) -> Vec<u8> {
        let mut scoped = Vec::with_capacity(self.prefix.len() + key.len());
        scoped.extend_from_slice(&self.prefix);
        scoped.extend_from_slice(key);
        scoped
    }
}

impl<S: KvStore> KvStore for PrefixStore<S> {
    fn get(&self, key: &[u8]) -> Option<Vec<u8>> {
        self.inner.get(&self.scoped(key))
    }

    fn set(&mut self, key: &[u8], value: &[u8]) {
        let scoped = self.scoped(key);
        self.inner.set(&scoped, value);
    }

    fn delete(&mut self, key: &[u8]) {
        let scoped = self.scoped(key);
        self.inner.delete(&scoped);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mem_store_roundtrip() {
        let mut store = MemStore::new();
        assert!(store.get(b"k").is_none());

        store.set(b"k", b"v");
        assert_eq!(store.get(b"k"), Some(b"v".to_vec()));
        assert!(store.contains(b"k"));

        store.delete(b"k");
        assert!(!store.contains(b"k"));
    }

    #[test]
    fn test_prefix_store_isolation() {
        let mut a = PrefixStore::new(MemStore::new(), b"a/".to_vec());
        a.set(b"k", b"1");

        let b = PrefixStore::new(MemStore::new(), b"b/".to_vec());
        assert!(b.get(b"k").is_none());

        // The underlying key carries the prefix.
        assert_eq!(a.get(b"k"), Some(b"1".to_vec()));
    }
}
