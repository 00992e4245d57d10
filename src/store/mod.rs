//! Concurrent key-value store shared by the crawl engine
//!
//! One type backs several independent stores (allowed domains, forbidden
//! paths, visited URLs, request headers, cookies). Each use site owns its
//! own named instance and documents what membership means there.

use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};

/// A string-keyed map behind a read-write lock.
///
/// Critical sections are short and never span an `.await`, so a blocking
/// lock is used rather than an async one.
#[derive(Debug)]
pub struct ConcurrentStore<V = ()> {
    inner: RwLock<HashMap<String, V>>,
}

impl<V> Default for ConcurrentStore<V> {
    fn default() -> Self {
        Self {
            inner: RwLock::new(HashMap::new()),
        }
    }
}

impl<V: Clone> ConcurrentStore<V> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a value, replacing any previous one under the same key
    pub fn store(&self, key: impl Into<String>, value: V) {
        self.inner
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key.into(), value);
    }

    /// Load a copy of the value stored under `key`
    pub fn load(&self, key: &str) -> Option<V> {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .cloned()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(key)
    }

    pub fn remove(&self, key: &str) -> Option<V> {
        self.inner
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(key)
    }

    pub fn len(&self) -> usize {
        self.inner.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Copy the current contents out of the lock
    pub fn snapshot(&self) -> HashMap<String, V> {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// True if any stored key occurs as a substring of `text`.
    ///
    /// This is the "reverse" containment check: the stored keys are the
    /// needles, `text` is the haystack.
    pub fn any_key_within(&self, text: &str) -> bool {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .any(|key| text.contains(key.as_str()))
    }
}

impl ConcurrentStore<()> {
    /// Store a key with no associated value (set semantics)
    pub fn store_key(&self, key: impl Into<String>) {
        self.store(key, ());
    }
}

impl<K: Into<String>> FromIterator<K> for ConcurrentStore<()> {
    fn from_iter<I: IntoIterator<Item = K>>(iter: I) -> Self {
        let store = Self::new();
        for key in iter {
            store.store_key(key);
        }
        store
    }
}
