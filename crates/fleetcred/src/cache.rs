//! Read-through cache for repository-backed list queries.
//!
//! Callers key entries by the query parameters that shaped the load and must
//! invalidate explicitly after any mutation that would change the result.
//! There is no TTL: staleness is only ever resolved by invalidation.

use std::collections::HashMap;
use std::hash::Hash;
use std::sync::Mutex;

pub struct QueryCache<K, V> {
    entries: Mutex<HashMap<K, V>>,
}

impl<K, V> Default for QueryCache<K, V> {
    fn default() -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
        }
    }
}

impl<K, V> QueryCache<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the cached value for `key`, running `loader` and storing the
    /// result on a miss. Loader errors are propagated and nothing is cached.
    pub fn get_or_load<E>(
        &self,
        key: K,
        loader: impl FnOnce() -> Result<V, E>,
    ) -> Result<V, E> {
        {
            let guard = self.entries.lock().expect("cache mutex poisoned");
            if let Some(value) = guard.get(&key) {
                return Ok(value.clone());
            }
        }

        let value = loader()?;
        let mut guard = self.entries.lock().expect("cache mutex poisoned");
        guard.insert(key, value.clone());
        Ok(value)
    }

    pub fn invalidate(&self, key: &K) {
        let mut guard = self.entries.lock().expect("cache mutex poisoned");
        guard.remove(key);
    }

    /// Drop every entry whose key matches `predicate`. Used to invalidate a
    /// whole scope (e.g., every query for one driver) after a mutation.
    pub fn invalidate_where(&self, predicate: impl Fn(&K) -> bool) {
        let mut guard = self.entries.lock().expect("cache mutex poisoned");
        guard.retain(|key, _| !predicate(key));
    }

    pub fn clear(&self) {
        let mut guard = self.entries.lock().expect("cache mutex poisoned");
        guard.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.lock().expect("cache mutex poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
