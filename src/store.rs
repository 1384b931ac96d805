//! The shared in-memory index.

use parking_lot::RwLock;
use prost::bytes::Bytes;
use std::collections::hash_map::Entry;
use std::collections::HashMap;

/// An insert-only map from string keys to opaque values.
///
/// A single reader-writer lock guards the whole index: any number of [`get`](Self::get)s may run
/// at once, while each [`put`](Self::put) excludes every other operation for the duration of its
/// lookup and insertion. Entries are never modified or removed once written.
///
/// When several `put`s race for the same absent key, whichever acquires the write lock first
/// wins. That order is decided by the scheduler and is not otherwise observable.
#[must_use]
#[derive(Debug, Default)]
pub struct Store {
    entries: RwLock<HashMap<String, Bytes>>,
}

impl Store {
    /// Create an empty store.
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    /// Obtain the value stored for `key`, if any.
    ///
    /// The returned [`Bytes`] shares the stored buffer; no value bytes are copied.
    #[cfg_attr(feature = "tracing", tracing::instrument(level = "trace", skip(self)))]
    pub fn get(&self, key: &str) -> Option<Bytes> {
        self.entries.read().get(key).cloned()
    }

    /// Store `value` under `key` if the key has no value yet.
    ///
    /// Returns `true` if the entry was created by this call. If the key already exists, nothing is
    /// modified and `false` is returned: the first value written for a key is kept forever.
    #[cfg_attr(
        feature = "tracing",
        tracing::instrument(level = "trace", skip(self, value), fields(len = value.len()))
    )]
    pub fn put(&self, key: String, value: Bytes) -> bool {
        match self.entries.write().entry(key) {
            Entry::Occupied(_) => false,
            Entry::Vacant(entry) => {
                let _value = entry.insert(value);
                true
            }
        }
    }

    /// The number of keys with a stored value.
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    /// Whether nothing has been stored yet.
    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}
