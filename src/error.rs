//! error.rs
//! Error types for queue, future and pool operations.

use core::fmt;
use std::error::Error as StdError;
use std::sync::Arc;

/// Error returned by blocking insertions into a [`BoundedQueue`](crate::collections::BoundedQueue).
///
/// Every variant hands the rejected item back, so a failed insertion never
/// loses or duplicates it.
#[derive(PartialEq, Eq, Clone, Copy)]
pub enum PutError<T> {
    /// The queue was closed before the item could be inserted.
    Closed(T),
    /// The caller's [`CancelToken`](crate::CancelToken) fired while waiting for space.
    Cancelled(T),
    /// No space became available before the deadline.
    TimedOut(T),
}

impl<T> PutError<T> {
    /// Returns the item that could not be inserted.
    pub fn into_inner(self) -> T {
        match self {
            PutError::Closed(item) | PutError::Cancelled(item) | PutError::TimedOut(item) => item,
        }
    }

    pub fn is_closed(&self) -> bool {
        matches!(self, PutError::Closed(_))
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, PutError::Cancelled(_))
    }

    pub fn is_timed_out(&self) -> bool {
        matches!(self, PutError::TimedOut(_))
    }
}

// Items are not printed, so `T` carries no `Debug` bound.
impl<T> fmt::Debug for PutError<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        use PutError::*;
        match self {
            Closed(_) => f.write_str("Closed(..)"),
            Cancelled(_) => f.write_str("Cancelled(..)"),
            TimedOut(_) => f.write_str("TimedOut(..)"),
        }
    }
}

impl<T> fmt::Display for PutError<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        use PutError::*;
        match self {
            Closed(_) => write!(f, "Queue is closed; the item was not inserted."),
            Cancelled(_) => write!(f, "Insertion was cancelled while waiting for space."),
            TimedOut(_) => write!(f, "Timed out waiting for space in the queue."),
        }
    }
}

impl<T> StdError for PutError<T> {}

/// Error returned by blocking removals from a [`BoundedQueue`](crate::collections::BoundedQueue).
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum TakeError {
    /// The queue is closed and every remaining item has been taken.
    #[error("Queue is closed and drained.")]
    Closed,
    /// The caller's [`CancelToken`](crate::CancelToken) fired while waiting for an item.
    #[error("Removal was cancelled while waiting for an item.")]
    Cancelled,
}

/// A wait on a [`TaskFuture`](crate::executor::TaskFuture) was abandoned because its token fired.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("Wait was cancelled before the future resolved.")]
pub struct Cancelled;

/// Failure of a task submitted to a [`WorkerPool`](crate::executor::WorkerPool).
///
/// Cloneable so that every waiter on the same future receives the error.
#[derive(Debug, Clone, thiserror::Error)]
pub enum TaskError {
    /// The task returned an error.
    #[error("Task failed: {0}")]
    Failed(Arc<dyn StdError + Send + Sync>),
    /// The task panicked; carries the panic message when it was a string.
    #[error("Task panicked: {0}")]
    Panicked(String),
}

impl TaskError {
    /// Wraps any error value as [`TaskError::Failed`].
    pub fn failed<E>(error: E) -> Self
    where
        E: Into<Box<dyn StdError + Send + Sync>>,
    {
        TaskError::Failed(Arc::from(error.into()))
    }

    pub fn is_panic(&self) -> bool {
        matches!(self, TaskError::Panicked(_))
    }
}

/// Error returned by [`WorkerPool`](crate::executor::WorkerPool) operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PoolError {
    /// The pool has been shut down and accepts no further work.
    #[error("Worker pool is shut down; submission rejected.")]
    Shutdown,
    /// Some workers were still running when the shutdown timeout elapsed.
    #[error("Shutdown timed out with {remaining} worker(s) still running.")]
    ShutdownTimeout { remaining: usize },
    /// A worker thread could not be spawned.
    #[error("Failed to spawn worker thread: {0}")]
    Spawn(String),
}
