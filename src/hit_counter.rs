//! Common contract for sliding window hit counters.
//!
//! Both counter implementations expose the same operations, so callers can
//! pick the locking strategy at construction time and hold a
//! `Box<dyn HitCounter>` or `Arc<dyn HitCounter>` afterwards.

pub use crate::types::{Count, Tick};
use crate::types::unix_seconds;

/// A counter reporting how many hits fell inside a trailing window of seconds.
///
/// For a window of `N` seconds, a query at second `t` counts every hit
/// recorded at a second `s` with `t - N < s <= t`. Hits outside that range
/// contribute nothing.
///
/// Implementations may cap the count kept per second: the lock-free counter
/// saturates at `u32::MAX` hits within a single second and drops hits past
/// that, while the lock-based counter counts up to `u64::MAX`.
pub trait HitCounter: Send + Sync {
    /// Records one hit at second `ts`.
    fn hit(&self, ts: Tick);

    /// Returns the number of hits recorded within the window ending at `ts`.
    ///
    /// # Arguments
    /// * `ts` – Query time in seconds; the window is `(ts - N, ts]`
    fn get_hits(&self, ts: Tick) -> Count;

    /// Length of the trailing window, in seconds.
    fn window_seconds(&self) -> usize;

    /// Records one hit at the current Unix time.
    fn hit_now(&self) {
        self.hit(unix_seconds());
    }

    /// Returns the hits within the window ending at the current Unix time.
    fn get_hits_now(&self) -> Count {
        self.get_hits(unix_seconds())
    }
}
