use std::collections::VecDeque;
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex, MutexGuard};

use crate::cancel::{CancelToken, CANCEL_POLL_INTERVAL};
use crate::error::{PutError, TakeError};

/// Thread-safe FIFO queue with a fixed capacity.
///
/// Producers block in [`put`](BoundedQueue::put) while the queue is full and
/// consumers block in [`take`](BoundedQueue::take) while it is empty, which
/// gives natural backpressure between the two sides. Non-blocking
/// ([`offer`](BoundedQueue::offer), [`poll`](BoundedQueue::poll)), timed and
/// cancellable variants are provided for callers that must not wait
/// indefinitely.
///
/// # Algorithm
///
/// - One mutex guards the buffer and the `closed` flag
/// - Two condition variables separate waiting producers (`not_full`) from
///   waiting consumers (`not_empty`)
/// - Every wait re-checks its predicate in a loop after waking, so spurious
///   wakeups and competing waiters are harmless
/// - Every state change broadcasts to all waiters of the opposite kind
///
/// # Closing
///
/// [`close`](BoundedQueue::close) rejects all further insertions (the item is
/// handed back in the error) and wakes every waiter. Consumers keep receiving
/// the items that were already queued and observe [`TakeError::Closed`] once
/// the queue is drained.
///
/// # Example
///
/// ```rust
/// use concurrency_core::collections::BoundedQueue;
///
/// let queue = BoundedQueue::new(2);
/// assert!(queue.offer(1).is_ok());
/// assert!(queue.offer(2).is_ok());
///
/// // Full: offer hands the item back instead of blocking
/// assert_eq!(queue.offer(3), Err(3));
///
/// assert_eq!(queue.take(), Ok(1));
/// assert_eq!(queue.poll(), Some(2));
/// assert_eq!(queue.poll(), None);
/// ```
pub struct BoundedQueue<T> {
    /// Maximum number of items held at once
    capacity: usize,
    /// Buffer and lifecycle flag, guarded together
    state: Mutex<BoundedQueueState<T>>,
    /// Signalled when an item is removed or the queue is closed
    not_full: Condvar,
    /// Signalled when an item is inserted or the queue is closed
    not_empty: Condvar,
}

struct BoundedQueueState<T> {
    items: VecDeque<T>,
    closed: bool,
}

/// Outcome of a single bounded wait on a condition variable.
enum Wait {
    Woken,
    Cancelled,
    TimedOut,
}

impl<T> BoundedQueue<T> {
    /// Creates an empty queue holding at most `capacity` items.
    ///
    /// # Panics
    ///
    /// Panics if `capacity` is zero.
    pub fn new(capacity: usize) -> Self {
        assert!(capacity > 0, "capacity must be greater than 0");

        BoundedQueue {
            capacity,
            state: Mutex::new(BoundedQueueState {
                items: VecDeque::with_capacity(capacity),
                closed: false,
            }),
            not_full: Condvar::new(),
            not_empty: Condvar::new(),
        }
    }

    /// Inserts `item` at the tail, blocking while the queue is full.
    ///
    /// # Returns
    ///
    /// * `Ok(())` - The item was appended and waiting consumers were woken
    /// * `Err(PutError::Closed(item))` - The queue is, or became, closed while waiting
    pub fn put(&self, item: T) -> Result<(), PutError<T>> {
        self.put_until(item, None, None)
    }

    /// Like [`put`](BoundedQueue::put), but gives up when `cancel` fires.
    ///
    /// A cancelled insertion returns `Err(PutError::Cancelled(item))` and
    /// leaves the queue untouched.
    pub fn put_cancellable(&self, item: T, cancel: &CancelToken) -> Result<(), PutError<T>> {
        self.put_until(item, None, Some(cancel))
    }

    /// Like [`put`](BoundedQueue::put), but waits at most `timeout` for space.
    ///
    /// Returns `Err(PutError::TimedOut(item))` if the queue stayed full.
    pub fn offer_timeout(&self, item: T, timeout: Duration) -> Result<(), PutError<T>> {
        self.put_until(item, Some(deadline_after(timeout)), None)
    }

    /// Inserts `item` only if there is room right now. Never blocks.
    ///
    /// # Returns
    ///
    /// * `Ok(())` - The item was appended and waiting consumers were woken
    /// * `Err(item)` - The queue is full or closed; the item is handed back unchanged
    pub fn offer(&self, item: T) -> Result<(), T> {
        let mut state = self.state.lock();
        if state.closed || state.items.len() >= self.capacity {
            return Err(item);
        }
        state.items.push_back(item);
        drop(state);
        self.not_empty.notify_all();
        Ok(())
    }

    /// Removes and returns the oldest item, blocking while the queue is empty.
    ///
    /// # Returns
    ///
    /// * `Ok(item)` - The oldest item; waiting producers were woken
    /// * `Err(TakeError::Closed)` - The queue is closed and has no items left
    pub fn take(&self) -> Result<T, TakeError> {
        match self.take_until(None, None) {
            Ok(Some(item)) => Ok(item),
            Ok(None) => unreachable!("untimed take cannot time out"),
            Err(e) => Err(e),
        }
    }

    /// Like [`take`](BoundedQueue::take), but gives up when `cancel` fires.
    ///
    /// A cancelled removal returns `Err(TakeError::Cancelled)` and removes nothing.
    pub fn take_cancellable(&self, cancel: &CancelToken) -> Result<T, TakeError> {
        match self.take_until(None, Some(cancel)) {
            Ok(Some(item)) => Ok(item),
            Ok(None) => unreachable!("untimed take cannot time out"),
            Err(e) => Err(e),
        }
    }

    /// Like [`take`](BoundedQueue::take), but waits at most `timeout`.
    ///
    /// Returns `Ok(None)` if no item arrived in time.
    pub fn poll_timeout(&self, timeout: Duration) -> Result<Option<T>, TakeError> {
        self.take_until(Some(deadline_after(timeout)), None)
    }

    /// Removes and returns the oldest item if one is available right now. Never blocks.
    ///
    /// # Returns
    ///
    /// * `Some(item)` - The oldest item; waiting producers were woken
    /// * `None` - The queue is empty (closed or not)
    pub fn poll(&self) -> Option<T> {
        let mut state = self.state.lock();
        let item = state.items.pop_front();
        drop(state);
        if item.is_some() {
            self.not_full.notify_all();
        }
        item
    }

    /// Closes the queue and wakes every waiting producer and consumer.
    ///
    /// Returns `true` if this call closed the queue, `false` if it was already closed.
    pub fn close(&self) -> bool {
        let mut state = self.state.lock();
        if state.closed {
            return false;
        }
        state.closed = true;
        drop(state);
        tracing::debug!(capacity = self.capacity, "bounded queue closed");
        self.not_full.notify_all();
        self.not_empty.notify_all();
        true
    }

    pub fn is_closed(&self) -> bool {
        self.state.lock().closed
    }

    /// Number of items currently queued.
    pub fn len(&self) -> usize {
        self.state.lock().items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.state.lock().items.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.state.lock().items.len() >= self.capacity
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of items that can be inserted before producers start blocking.
    pub fn remaining_capacity(&self) -> usize {
        self.capacity - self.state.lock().items.len()
    }

    fn put_until(
        &self,
        item: T,
        deadline: Option<Instant>,
        cancel: Option<&CancelToken>,
    ) -> Result<(), PutError<T>> {
        let mut state = self.state.lock();
        loop {
            if state.closed {
                return Err(PutError::Closed(item));
            }
            if cancel.map_or(false, CancelToken::is_cancelled) {
                return Err(PutError::Cancelled(item));
            }
            if state.items.len() < self.capacity {
                break;
            }
            match wait_on(&self.not_full, &mut state, deadline, cancel) {
                Wait::Woken => {}
                Wait::Cancelled => return Err(PutError::Cancelled(item)),
                Wait::TimedOut => return Err(PutError::TimedOut(item)),
            }
        }

        state.items.push_back(item);
        drop(state);
        self.not_empty.notify_all();
        Ok(())
    }

    fn take_until(
        &self,
        deadline: Option<Instant>,
        cancel: Option<&CancelToken>,
    ) -> Result<Option<T>, TakeError> {
        let mut state = self.state.lock();
        loop {
            if cancel.map_or(false, CancelToken::is_cancelled) {
                return Err(TakeError::Cancelled);
            }
            if let Some(item) = state.items.pop_front() {
                drop(state);
                self.not_full.notify_all();
                return Ok(Some(item));
            }
            // Remaining items are drained before a closed queue reports it.
            if state.closed {
                return Err(TakeError::Closed);
            }
            match wait_on(&self.not_empty, &mut state, deadline, cancel) {
                Wait::Woken => {}
                Wait::Cancelled => return Err(TakeError::Cancelled),
                Wait::TimedOut => return Ok(None),
            }
        }
    }
}

impl<T> std::fmt::Debug for BoundedQueue<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.lock();
        f.debug_struct("BoundedQueue")
            .field("capacity", &self.capacity)
            .field("len", &state.items.len())
            .field("closed", &state.closed)
            .finish()
    }
}

#[inline]
fn deadline_after(timeout: Duration) -> Instant {
    // Saturate absurd timeouts instead of overflowing `Instant`.
    Instant::now()
        .checked_add(timeout)
        .unwrap_or_else(|| Instant::now() + Duration::from_secs(60 * 60 * 24 * 365))
}

/// Waits once on `cvar`, bounded by `deadline` and sliced by the cancel poll interval.
///
/// The caller re-checks its own predicate after `Wait::Woken`.
fn wait_on<S>(
    cvar: &Condvar,
    guard: &mut MutexGuard<'_, S>,
    deadline: Option<Instant>,
    cancel: Option<&CancelToken>,
) -> Wait {
    let now = Instant::now();
    if let Some(deadline) = deadline {
        if now >= deadline {
            return Wait::TimedOut;
        }
    }

    match (deadline, cancel) {
        (None, None) => cvar.wait(guard),
        (deadline, cancel) => {
            let mut until = deadline.unwrap_or(now + CANCEL_POLL_INTERVAL);
            if cancel.is_some() {
                until = until.min(now + CANCEL_POLL_INTERVAL);
            }
            let _ = cvar.wait_until(guard, until);
        }
    }

    if cancel.map_or(false, CancelToken::is_cancelled) {
        return Wait::Cancelled;
    }
    Wait::Woken
}
