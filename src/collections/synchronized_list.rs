use parking_lot::Mutex;

/// A `Vec` whose every operation runs under one mutex.
///
/// Individual calls are atomic, but sequences of calls are not: `len()`
/// followed by `get(len - 1)` can race with a concurrent `remove`. Callers
/// build such check-then-act sequences inside [`with_lock`](SynchronizedList::with_lock),
/// which holds the lock for the whole closure and releases it on every exit
/// path.
///
/// # Example
///
/// ```rust
/// use concurrency_core::collections::SynchronizedList;
///
/// let list = SynchronizedList::new();
/// list.push("a");
/// list.push("b");
///
/// // Pop the last element only if the list still has more than one
/// let popped = list.with_lock(|items| if items.len() > 1 { items.pop() } else { None });
/// assert_eq!(popped, Some("b"));
/// assert_eq!(list.snapshot(), vec!["a"]);
/// ```
#[derive(Debug)]
pub struct SynchronizedList<T> {
    items: Mutex<Vec<T>>,
}

impl<T> Default for SynchronizedList<T> {
    fn default() -> Self {
        SynchronizedList {
            items: Mutex::new(Vec::new()),
        }
    }
}

impl<T> SynchronizedList<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, item: T) {
        self.items.lock().push(item);
    }

    /// Returns a clone of the element at `index`.
    pub fn get(&self, index: usize) -> Option<T>
    where
        T: Clone,
    {
        self.items.lock().get(index).cloned()
    }

    /// Removes and returns the element at `index`, shifting later elements left.
    pub fn remove(&self, index: usize) -> Option<T> {
        let mut items = self.items.lock();
        if index < items.len() {
            Some(items.remove(index))
        } else {
            None
        }
    }

    pub fn contains(&self, item: &T) -> bool
    where
        T: PartialEq,
    {
        self.items.lock().contains(item)
    }

    pub fn len(&self) -> usize {
        self.items.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.lock().is_empty()
    }

    pub fn clear(&self) {
        self.items.lock().clear();
    }

    /// Copy of the current contents, taken under the lock.
    pub fn snapshot(&self) -> Vec<T>
    where
        T: Clone,
    {
        self.items.lock().clone()
    }

    /// Runs `f` with exclusive access to the underlying `Vec`.
    pub fn with_lock<R, F>(&self, f: F) -> R
    where
        F: FnOnce(&mut Vec<T>) -> R,
    {
        let mut items = self.items.lock();
        f(&mut items)
    }
}

impl<T> From<Vec<T>> for SynchronizedList<T> {
    fn from(items: Vec<T>) -> Self {
        SynchronizedList {
            items: Mutex::new(items),
        }
    }
}
