use parking_lot::RwLock;

use crate::hit_counter::HitCounter;
use crate::types::{Count, Tick};

/// Sliding window hit counter guarded by a reader/writer lock.
///
/// Time is divided into one-second buckets arranged in a ring of
/// `window_seconds` slots. Hits at second `ts` land in slot
/// `ts mod window_seconds`; each slot remembers which second it currently
/// counts, so a slot left over from an earlier lap of the ring is recognised
/// as stale and skipped.
///
/// # Algorithm Behavior
///
/// - `hit` takes the write lock; if the slot already counts `ts` it is
///   incremented, otherwise it is reset to `(ts, 1)`
/// - `get_hits` takes the read lock and sums the slots whose second lies in
///   `(ts - window_seconds, ts]`
/// - Stale slots are never cleared eagerly; they are overwritten by the next
///   hit that maps to them (lazy invalidation)
/// - A hit older than the second its slot already holds is dropped: it lies
///   at least a full window behind that slot and can no longer be counted
///
/// Readers share the lock with each other and exclude only writers, which
/// suits read-heavy reporting workloads.
///
/// # Example
///
/// ```rust
/// use concurrency_core::counters::SlidingWindowCounter;
///
/// // Count hits over the last 300 seconds
/// let counter = SlidingWindowCounter::new(300);
///
/// counter.hit(1);
/// counter.hit(2);
/// counter.hit(3);
/// assert_eq!(counter.get_hits(4), 3);
///
/// counter.hit(300);
/// assert_eq!(counter.get_hits(300), 4);
///
/// // At second 301 the window is (1, 301]: the hit at second 1 has expired
/// assert_eq!(counter.get_hits(301), 3);
/// ```
#[derive(Debug)]
pub struct SlidingWindowCounter {
    /// Number of one-second slots in the ring
    window_seconds: usize,
    /// Ring of slots, shared by readers and exclusive for writers
    buckets: RwLock<Vec<Bucket>>,
}

/// One slot of the ring: the second it counts and the hits seen in that second.
#[derive(Debug, Clone, Copy, Default)]
struct Bucket {
    second: Tick,
    count: Count,
}

impl SlidingWindowCounter {
    /// Creates a counter over a trailing window of `window_seconds` seconds.
    ///
    /// # Panics
    ///
    /// Panics if `window_seconds` is zero.
    pub fn new(window_seconds: usize) -> Self {
        assert!(window_seconds > 0, "window_seconds must be greater than 0");

        SlidingWindowCounter {
            window_seconds,
            buckets: RwLock::new(vec![Bucket::default(); window_seconds]),
        }
    }

    #[inline]
    fn window(&self) -> Tick {
        self.window_seconds as Tick
    }

    #[inline]
    fn index_of(&self, ts: Tick) -> usize {
        ts.rem_euclid(self.window()) as usize
    }

    /// Records one hit at second `ts`.
    pub fn hit(&self, ts: Tick) {
        let index = self.index_of(ts);
        let mut buckets = self.buckets.write();
        let bucket = &mut buckets[index];

        if bucket.count > 0 && bucket.second == ts {
            bucket.count = bucket.count.saturating_add(1);
        } else if bucket.count == 0 || bucket.second < ts {
            *bucket = Bucket { second: ts, count: 1 };
        }
    }

    /// Returns the number of hits within `(ts - window_seconds, ts]`.
    pub fn get_hits(&self, ts: Tick) -> Count {
        let oldest = ts.saturating_sub(self.window());
        self.buckets
            .read()
            .iter()
            .filter(|bucket| bucket.count > 0 && bucket.second > oldest && bucket.second <= ts)
            .map(|bucket| bucket.count)
            .sum()
    }

    #[inline]
    pub fn window_seconds(&self) -> usize {
        self.window_seconds
    }

    /// Forgets every recorded hit.
    pub fn reset(&self) {
        self.buckets
            .write()
            .iter_mut()
            .for_each(|bucket| *bucket = Bucket::default());
    }
}

impl HitCounter for SlidingWindowCounter {
    #[inline(always)]
    fn hit(&self, ts: Tick) {
        self.hit(ts)
    }

    #[inline(always)]
    fn get_hits(&self, ts: Tick) -> Count {
        self.get_hits(ts)
    }

    #[inline(always)]
    fn window_seconds(&self) -> usize {
        self.window_seconds
    }
}

/// Configuration structure for creating either sliding window counter.
#[derive(Debug, Clone)]
pub struct SlidingWindowCounterConfig {
    /// Length of the trailing window, in seconds.
    pub window_seconds: usize,
}

impl SlidingWindowCounterConfig {
    /// Creates a new configuration instance.
    pub fn new(window_seconds: usize) -> Self {
        Self { window_seconds }
    }
}

impl From<SlidingWindowCounterConfig> for SlidingWindowCounter {
    /// Converts a `SlidingWindowCounterConfig` into a `SlidingWindowCounter`.
    ///
    /// # Panics
    /// Panics if `window_seconds` is zero.
    ///
    /// # Example
    ///
    /// ```
    /// use concurrency_core::counters::{SlidingWindowCounter, SlidingWindowCounterConfig};
    ///
    /// let counter: SlidingWindowCounter = SlidingWindowCounterConfig { window_seconds: 60 }.into();
    /// assert_eq!(counter.window_seconds(), 60);
    /// ```
    #[inline(always)]
    fn from(config: SlidingWindowCounterConfig) -> Self {
        SlidingWindowCounter::new(config.window_seconds)
    }
}
