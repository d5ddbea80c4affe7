use std::borrow::Borrow;
use std::collections::HashMap;
use std::hash::Hash;

use parking_lot::Mutex;

/// Hash map in which every operation runs under a single mutex.
///
/// Besides the usual map operations it offers compound operations that
/// cannot be assembled safely from the primitives by a caller
/// ([`put_if_absent`](ConcurrentMap::put_if_absent),
/// [`remove_if_equals`](ConcurrentMap::remove_if_equals) and friends), and
/// [`with_lock`](ConcurrentMap::with_lock) for anything else that must be
/// atomic.
///
/// # Consistency
///
/// Size and containment queries always reflect the most recently completed
/// mutation; no caller can observe a half-applied `put`. Iteration goes
/// through [`keys`](ConcurrentMap::keys), [`values`](ConcurrentMap::values)
/// and [`entries`](ConcurrentMap::entries), which copy the contents under the
/// lock and return the snapshot, so the lock is never held while the caller
/// iterates.
///
/// # Throughput
///
/// A single lock serializes all access, including readers, so throughput
/// does not grow with the number of threads. Resizes happen under the same
/// lock and are never observed half-done.
///
/// # Example
///
/// ```rust
/// use concurrency_core::collections::ConcurrentMap;
///
/// let sessions = ConcurrentMap::new();
/// assert_eq!(sessions.put_if_absent("alice", 1), None);
/// assert_eq!(sessions.put_if_absent("alice", 2), Some(1));
///
/// assert!(!sessions.remove_if_equals(&"alice", &2));
/// assert!(sessions.remove_if_equals(&"alice", &1));
/// assert!(sessions.is_empty());
/// ```
#[derive(Debug)]
pub struct ConcurrentMap<K, V> {
    inner: Mutex<HashMap<K, V>>,
}

impl<K, V> Default for ConcurrentMap<K, V> {
    fn default() -> Self {
        ConcurrentMap {
            inner: Mutex::new(HashMap::new()),
        }
    }
}

impl<K, V> ConcurrentMap<K, V>
where
    K: Eq + Hash,
{
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        ConcurrentMap {
            inner: Mutex::new(HashMap::with_capacity(capacity)),
        }
    }

    /// Inserts `value` under `key`, returning the value it replaced.
    pub fn put(&self, key: K, value: V) -> Option<V> {
        self.inner.lock().insert(key, value)
    }

    /// Returns a clone of the value stored under `key`.
    pub fn get<Q>(&self, key: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
        V: Clone,
    {
        self.inner.lock().get(key).cloned()
    }

    pub fn remove<Q>(&self, key: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.inner.lock().remove(key)
    }

    pub fn contains_key<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.inner.lock().contains_key(key)
    }

    /// Linear scan over all values.
    pub fn contains_value(&self, value: &V) -> bool
    where
        V: PartialEq,
    {
        self.inner.lock().values().any(|v| v == value)
    }

    pub fn len(&self) -> usize {
        self.inner.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().is_empty()
    }

    pub fn clear(&self) {
        self.inner.lock().clear();
    }

    /// Inserts `value` only if `key` is absent.
    ///
    /// The check and the insertion happen in one critical section.
    ///
    /// # Returns
    ///
    /// * `None` - The key was absent and `value` was inserted
    /// * `Some(existing)` - A clone of the value already present; the map is unchanged
    pub fn put_if_absent(&self, key: K, value: V) -> Option<V>
    where
        V: Clone,
    {
        let mut map = self.inner.lock();
        match map.get(&key) {
            Some(existing) => Some(existing.clone()),
            None => {
                map.insert(key, value);
                None
            }
        }
    }

    /// Removes the entry for `key` only if it currently maps to `expected`.
    pub fn remove_if_equals<Q>(&self, key: &Q, expected: &V) -> bool
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
        V: PartialEq,
    {
        let mut map = self.inner.lock();
        if map.get(key) == Some(expected) {
            map.remove(key);
            true
        } else {
            false
        }
    }

    /// Replaces the value for `key` only if the key is present.
    ///
    /// Returns the previous value, or `None` (and inserts nothing) when absent.
    pub fn replace<Q>(&self, key: &Q, value: V) -> Option<V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.inner
            .lock()
            .get_mut(key)
            .map(|slot| std::mem::replace(slot, value))
    }

    /// Replaces the value for `key` with `new` only if it currently equals `expected`.
    pub fn replace_if_equals<Q>(&self, key: &Q, expected: &V, new: V) -> bool
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
        V: PartialEq,
    {
        match self.inner.lock().get_mut(key) {
            Some(slot) if *slot == *expected => {
                *slot = new;
                true
            }
            _ => false,
        }
    }

    /// Returns the value for `key`, inserting the result of `f` first if absent.
    ///
    /// `f` runs while the lock is held and at most once; it must not touch this map.
    pub fn compute_if_absent<F>(&self, key: K, f: F) -> V
    where
        F: FnOnce() -> V,
        V: Clone,
    {
        self.inner.lock().entry(key).or_insert_with(f).clone()
    }

    /// Inserts `value`, or combines it with the existing value using `f`.
    ///
    /// Returns a clone of the value stored after the merge.
    pub fn merge<F>(&self, key: K, value: V, f: F) -> V
    where
        F: FnOnce(&V, V) -> V,
        V: Clone,
    {
        let mut map = self.inner.lock();
        let merged = match map.get(&key) {
            Some(existing) => f(existing, value),
            None => value,
        };
        map.insert(key, merged.clone());
        merged
    }

    /// Runs `f` with exclusive access to the underlying map.
    ///
    /// Use this for compound check-then-act sequences that the named
    /// operations do not cover. The lock is released when `f` returns or
    /// unwinds.
    ///
    /// # Example
    ///
    /// ```rust
    /// use concurrency_core::collections::ConcurrentMap;
    ///
    /// let stock = ConcurrentMap::new();
    /// stock.put("apples", 3u32);
    ///
    /// let sold = stock.with_lock(|map| match map.get_mut("apples") {
    ///     Some(count) if *count >= 2 => {
    ///         *count -= 2;
    ///         true
    ///     }
    ///     _ => false,
    /// });
    /// assert!(sold);
    /// assert_eq!(stock.get("apples"), Some(1));
    /// ```
    pub fn with_lock<R, F>(&self, f: F) -> R
    where
        F: FnOnce(&mut HashMap<K, V>) -> R,
    {
        let mut map = self.inner.lock();
        f(&mut map)
    }

    /// Snapshot of all keys.
    pub fn keys(&self) -> Vec<K>
    where
        K: Clone,
    {
        self.inner.lock().keys().cloned().collect()
    }

    /// Snapshot of all values.
    pub fn values(&self) -> Vec<V>
    where
        V: Clone,
    {
        self.inner.lock().values().cloned().collect()
    }

    /// Snapshot of all entries.
    pub fn entries(&self) -> Vec<(K, V)>
    where
        K: Clone,
        V: Clone,
    {
        self.inner
            .lock()
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }
}

impl<K, V> FromIterator<(K, V)> for ConcurrentMap<K, V>
where
    K: Eq + Hash,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        ConcurrentMap {
            inner: Mutex::new(iter.into_iter().collect()),
        }
    }
}
