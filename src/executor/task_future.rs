use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};

use crate::cancel::{CancelToken, CANCEL_POLL_INTERVAL};
use crate::error::{Cancelled, TaskError};

/// Single-assignment, thread-safe slot for the result of an asynchronous task.
///
/// A future starts pending and is resolved exactly once, either with a value
/// ([`complete`](TaskFuture::complete)) or an error
/// ([`complete_with_error`](TaskFuture::complete_with_error)). Both outcomes
/// are terminal. Handles are cheap to clone and every clone observes the same
/// slot, so any number of threads may wait on one result.
///
/// # Repeated completion
///
/// The first completion wins. Later calls to either completion method leave
/// the stored outcome untouched, log a warning, and return `false` so the
/// caller can tell that nothing happened.
///
/// # Example
///
/// ```rust
/// use concurrency_core::executor::TaskFuture;
/// use std::thread;
/// use std::time::Duration;
///
/// let future = TaskFuture::new();
/// let producer = future.clone();
///
/// // Nothing yet: a timed wait reports "still pending" rather than an error
/// assert!(future.get_timeout(Duration::from_millis(5)).is_none());
///
/// thread::spawn(move || {
///     producer.complete(42);
/// });
///
/// assert_eq!(future.get().unwrap(), 42);
/// assert!(future.is_done());
/// ```
pub struct TaskFuture<T> {
    inner: Arc<FutureInner<T>>,
}

struct FutureInner<T> {
    state: Mutex<FutureState<T>>,
    /// Notified once, when the state leaves `Pending`
    resolved: Condvar,
}

enum FutureState<T> {
    Pending,
    Resolved(T),
    Failed(TaskError),
}

impl<T> FutureState<T> {
    fn outcome(&self) -> Option<Result<T, TaskError>>
    where
        T: Clone,
    {
        match self {
            FutureState::Pending => None,
            FutureState::Resolved(value) => Some(Ok(value.clone())),
            FutureState::Failed(error) => Some(Err(error.clone())),
        }
    }

    fn name(&self) -> &'static str {
        match self {
            FutureState::Pending => "Pending",
            FutureState::Resolved(_) => "Resolved",
            FutureState::Failed(_) => "Failed",
        }
    }
}

impl<T> Clone for TaskFuture<T> {
    fn clone(&self) -> Self {
        TaskFuture {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T> Default for TaskFuture<T> {
    fn default() -> Self {
        TaskFuture {
            inner: Arc::new(FutureInner {
                state: Mutex::new(FutureState::Pending),
                resolved: Condvar::new(),
            }),
        }
    }
}

impl<T> TaskFuture<T> {
    /// Creates a pending future.
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolves the future with `value` and wakes every waiter.
    ///
    /// Returns `false` without changing anything if the future was already resolved.
    pub fn complete(&self, value: T) -> bool {
        self.resolve(FutureState::Resolved(value))
    }

    /// Resolves the future with `error` and wakes every waiter.
    ///
    /// Returns `false` without changing anything if the future was already resolved.
    pub fn complete_with_error(&self, error: TaskError) -> bool {
        self.resolve(FutureState::Failed(error))
    }

    /// Whether the future has been resolved. Never blocks on the result.
    pub fn is_done(&self) -> bool {
        !matches!(*self.inner.state.lock(), FutureState::Pending)
    }

    /// Blocks until the future is resolved.
    ///
    /// # Returns
    ///
    /// * `Ok(value)` - A clone of the value passed to `complete`
    /// * `Err(TaskError)` - The error the task failed with
    pub fn get(&self) -> Result<T, TaskError>
    where
        T: Clone,
    {
        let mut state = self.inner.state.lock();
        loop {
            if let Some(outcome) = state.outcome() {
                return outcome;
            }
            self.inner.resolved.wait(&mut state);
        }
    }

    /// Blocks for at most `timeout` waiting for the future to resolve.
    ///
    /// Returns `None` if it is still pending when the timeout elapses. A timed
    /// out wait does not alter the future; it can be waited on again.
    pub fn get_timeout(&self, timeout: Duration) -> Option<Result<T, TaskError>>
    where
        T: Clone,
    {
        let deadline = Instant::now().checked_add(timeout);
        let mut state = self.inner.state.lock();
        loop {
            if let Some(outcome) = state.outcome() {
                return Some(outcome);
            }
            match deadline {
                Some(deadline) => {
                    if self.inner.resolved.wait_until(&mut state, deadline).timed_out() {
                        return state.outcome();
                    }
                }
                // Timeout too large to represent: wait without a bound.
                None => self.inner.resolved.wait(&mut state),
            }
        }
    }

    /// Blocks until the future resolves or `cancel` fires.
    ///
    /// A cancelled wait returns `Err(Cancelled)` and leaves the future pending.
    pub fn get_cancellable(&self, cancel: &CancelToken) -> Result<Result<T, TaskError>, Cancelled>
    where
        T: Clone,
    {
        let mut state = self.inner.state.lock();
        loop {
            if let Some(outcome) = state.outcome() {
                return Ok(outcome);
            }
            if cancel.is_cancelled() {
                return Err(Cancelled);
            }
            self.inner.resolved.wait_for(&mut state, CANCEL_POLL_INTERVAL);
        }
    }

    /// Returns the outcome if the future is resolved, without blocking.
    pub fn try_get(&self) -> Option<Result<T, TaskError>>
    where
        T: Clone,
    {
        self.inner.state.lock().outcome()
    }

    fn resolve(&self, next: FutureState<T>) -> bool {
        let mut state = self.inner.state.lock();
        if !matches!(*state, FutureState::Pending) {
            tracing::warn!(
                current = state.name(),
                rejected = next.name(),
                "ignoring repeated completion of an already resolved future"
            );
            return false;
        }
        *state = next;
        drop(state);
        self.inner.resolved.notify_all();
        true
    }
}

impl<T> fmt::Debug for TaskFuture<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskFuture")
            .field("state", &self.inner.state.lock().name())
            .finish()
    }
}
