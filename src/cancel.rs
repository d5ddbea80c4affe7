//! Cooperative cancellation for blocking calls.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Longest a cancellable wait sleeps before re-checking its token.
pub const CANCEL_POLL_INTERVAL: Duration = Duration::from_millis(10);

/// A shared, one-way cancellation flag.
///
/// Clones observe the same flag. Once [`cancel`](CancelToken::cancel) has been
/// called the token stays cancelled; a blocking call handed the token returns
/// a cancellation error within [`CANCEL_POLL_INTERVAL`] and leaves the shared
/// structure it was waiting on unchanged.
///
/// # Example
///
/// ```rust
/// use concurrency_core::CancelToken;
/// use concurrency_core::collections::BoundedQueue;
/// use concurrency_core::TakeError;
///
/// let queue: BoundedQueue<u32> = BoundedQueue::new(1);
/// let token = CancelToken::new();
/// token.cancel();
///
/// assert_eq!(queue.take_cancellable(&token), Err(TakeError::Cancelled));
/// ```
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    cancelled: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fires the token. Returns `true` if this call was the one that fired it.
    pub fn cancel(&self) -> bool {
        !self.cancelled.swap(true, Ordering::AcqRel)
    }

    #[inline]
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }
}
