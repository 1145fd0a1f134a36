//! Generic keyed in-memory table.

use std::collections::HashMap;
use std::hash::Hash;
use std::sync::{RwLock, RwLockWriteGuard};

/// In-memory key/value table for entities without row-level locking needs.
///
/// Not optimized for performance; reads clone. Entities that need per-row
/// serialization (stock levels, transfers) have their own structures in
/// `ledger` and `backend`.
#[derive(Debug)]
pub struct Table<K, V> {
    inner: RwLock<HashMap<K, V>>,
}

// Not derived: the derive would demand Default from K and V.
impl<K, V> Default for Table<K, V> {
    fn default() -> Self {
        Self {
            inner: RwLock::new(HashMap::new()),
        }
    }
}

impl<K, V> Table<K, V>
where
    K: Clone + Eq + Hash,
    V: Clone,
{
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(HashMap::new()),
        }
    }

    pub fn get(&self, key: &K) -> Option<V> {
        let map = self.inner.read().ok()?;
        map.get(key).cloned()
    }

    pub fn insert(&self, key: K, value: V) {
        if let Ok(mut map) = self.inner.write() {
            map.insert(key, value);
        }
    }

    pub fn remove(&self, key: &K) -> Option<V> {
        let mut map = self.inner.write().ok()?;
        map.remove(key)
    }

    pub fn list(&self) -> Vec<V> {
        let map = match self.inner.read() {
            Ok(m) => m,
            Err(_) => return vec![],
        };
        map.values().cloned().collect()
    }

    pub fn any<F>(&self, mut predicate: F) -> bool
    where
        F: FnMut(&V) -> bool,
    {
        match self.inner.read() {
            Ok(map) => map.values().any(|v| predicate(v)),
            Err(_) => false,
        }
    }

    pub fn retain<F>(&self, predicate: F)
    where
        F: FnMut(&K, &mut V) -> bool,
    {
        if let Ok(mut map) = self.inner.write() {
            map.retain(predicate);
        }
    }

    pub fn len(&self) -> usize {
        self.inner.read().map(|m| m.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Exclusive hold over the whole table.
    ///
    /// Multi-step writes that depend on a table-wide invariant (sku, code or
    /// order-number uniqueness) must run their check and their insert under
    /// one hold; checking through `any` and inserting through `insert` leaves
    /// a window where a concurrent writer commits the same key.
    pub fn locked(&self) -> TableGuard<'_, K, V> {
        let inner = match self.inner.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        TableGuard { inner }
    }
}

/// Write access to a [`Table`] held across a whole check-then-insert sequence.
pub struct TableGuard<'a, K, V> {
    inner: RwLockWriteGuard<'a, HashMap<K, V>>,
}

impl<K, V> TableGuard<'_, K, V>
where
    K: Clone + Eq + Hash,
    V: Clone,
{
    pub fn get(&self, key: &K) -> Option<V> {
        self.inner.get(key).cloned()
    }

    pub fn insert(&mut self, key: K, value: V) {
        self.inner.insert(key, value);
    }

    pub fn any<F>(&self, mut predicate: F) -> bool
    where
        F: FnMut(&V) -> bool,
    {
        self.inner.values().any(|v| predicate(v))
    }
}
