//! Per-key writer locks.

use std::collections::HashSet;
use std::hash::Hash;

use parking_lot::{Condvar, Mutex};

/// Serializes writers of the same key while letting other keys proceed.
///
/// Not reentrant: a thread holding the lock for a key must not ask for it
/// again.
pub(crate) struct KeyLocks<K> {
    busy: Mutex<HashSet<K>>,
    released: Condvar,
}

impl<K: Eq + Hash + Clone> KeyLocks<K> {
    pub(crate) fn new() -> Self {
        Self {
            busy: Mutex::new(HashSet::new()),
            released: Condvar::new(),
        }
    }

    /// Blocks until `key` is free and claims it.
    pub(crate) fn lock(&self, key: &K) -> KeyGuard<'_, K> {
        let mut busy = self.busy.lock();
        while busy.contains(key) {
            self.released.wait(&mut busy);
        }
        busy.insert(key.clone());

        KeyGuard {
            locks: self,
            key: key.clone(),
        }
    }

    /// Number of keys currently held.
    #[cfg(test)]
    pub(crate) fn held(&self) -> usize {
        self.busy.lock().len()
    }
}

/// Releases its key on drop.
pub(crate) struct KeyGuard<'a, K: Eq + Hash + Clone> {
    locks: &'a KeyLocks<K>,
    key: K,
}

impl<K: Eq + Hash + Clone> Drop for KeyGuard<'_, K> {
    fn drop(&mut self) {
        self.locks.busy.lock().remove(&self.key);
        self.locks.released.notify_all();
    }
}
