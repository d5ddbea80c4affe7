use std::sync::atomic::{AtomicU64, Ordering};

use crossbeam_utils::{Backoff, CachePadded};

use crate::counters::SlidingWindowCounterConfig;
use crate::hit_counter::HitCounter;
use crate::types::{Count, Tick};

/// Sliding window hit counter built on compare-and-swap instead of locks.
///
/// Same contract and bucket layout as
/// [`SlidingWindowCounter`](crate::counters::SlidingWindowCounter): a ring of
/// `window_seconds` one-second slots, slot `ts mod window_seconds` counting
/// the hits of second `ts`.
///
/// # Slot encoding
///
/// Each slot is a single `AtomicU64` holding both halves of its state:
///
/// ```text
///  63                32 31                 0
/// +--------------------+--------------------+
/// |  lap (low 32 bits) |     hit count      |
/// +--------------------+--------------------+
/// ```
///
/// The lap is `ts div window_seconds`; together with the slot index it
/// identifies the second exactly. Claiming a slot for a new second and
/// incrementing it are therefore one atomic step each, and concurrent writers
/// to the same second never lose an update.
///
/// Laps are compared on their low 32 bits, so two seconds alias only when they
/// are a multiple of `window_seconds * 2^32` seconds apart (over 136 years even
/// for a one-second window). A count saturates at `u32::MAX` hits per second.
///
/// # Algorithm Behavior
///
/// - `hit` loads the slot, computes the successor state (increment if the
///   slot holds `ts`, claim as `(ts, 1)` if it holds an older second, give up
///   if it holds a newer one) and installs it with a CAS; on a lost race it
///   backs off and retries from the freshly observed value
/// - `get_hits` never blocks: it loads each slot once and sums those inside
///   the window, so under concurrent writes it may miss hits that land while
///   it is scanning
///
/// # Example
///
/// ```rust
/// use concurrency_core::counters::LockFreeSlidingWindowCounter;
/// use std::sync::Arc;
/// use std::thread;
///
/// let counter = Arc::new(LockFreeSlidingWindowCounter::new(60));
///
/// let handles: Vec<_> = (0..4)
///     .map(|_| {
///         let counter = Arc::clone(&counter);
///         thread::spawn(move || {
///             for _ in 0..1000 {
///                 counter.hit(42);
///             }
///         })
///     })
///     .collect();
/// for handle in handles {
///     handle.join().unwrap();
/// }
///
/// assert_eq!(counter.get_hits(42), 4000);
/// assert_eq!(counter.get_hits(42 + 60), 0);
/// ```
#[derive(Debug)]
pub struct LockFreeSlidingWindowCounter {
    /// Number of one-second slots in the ring
    window_seconds: usize,
    /// Packed `(lap, count)` slots, each on its own cache line
    buckets: Box<[CachePadded<AtomicU64>]>,
}

const COUNT_BITS: u32 = 32;
const COUNT_MASK: u64 = (1 << COUNT_BITS) - 1;

#[inline]
fn pack(lap: u32, count: u32) -> u64 {
    ((lap as u64) << COUNT_BITS) | count as u64
}

#[inline]
fn unpack(word: u64) -> (u32, u32) {
    ((word >> COUNT_BITS) as u32, (word & COUNT_MASK) as u32)
}

/// Whether lap `a` precedes lap `b`, modulo 2^32.
#[inline]
fn precedes(a: u32, b: u32) -> bool {
    (b.wrapping_sub(a) as i32) > 0
}

impl LockFreeSlidingWindowCounter {
    /// Creates a counter over a trailing window of `window_seconds` seconds.
    ///
    /// # Panics
    ///
    /// Panics if `window_seconds` is zero.
    pub fn new(window_seconds: usize) -> Self {
        assert!(window_seconds > 0, "window_seconds must be greater than 0");

        LockFreeSlidingWindowCounter {
            window_seconds,
            buckets: (0..window_seconds)
                .map(|_| CachePadded::new(AtomicU64::new(0)))
                .collect(),
        }
    }

    #[inline]
    fn window(&self) -> Tick {
        self.window_seconds as Tick
    }

    /// Slot index and truncated lap of second `ts`.
    #[inline]
    fn locate(&self, ts: Tick) -> (usize, u32) {
        (
            ts.rem_euclid(self.window()) as usize,
            ts.div_euclid(self.window()) as u32,
        )
    }

    /// Records one hit at second `ts`.
    pub fn hit(&self, ts: Tick) {
        let (index, lap) = self.locate(ts);
        let slot = &self.buckets[index];
        let backoff = Backoff::new();

        let mut current = slot.load(Ordering::Acquire);
        loop {
            let (held, count) = unpack(current);
            let next = if count > 0 && held == lap {
                pack(lap, count.saturating_add(1))
            } else if count == 0 || precedes(held, lap) {
                pack(lap, 1)
            } else {
                // The slot already counts a later lap of the ring.
                return;
            };

            match slot.compare_exchange_weak(current, next, Ordering::AcqRel, Ordering::Acquire) {
                Ok(_) => return,
                Err(observed) => {
                    current = observed;
                    backoff.spin();
                }
            }
        }
    }

    /// Returns the number of hits within `(ts - window_seconds, ts]`.
    pub fn get_hits(&self, ts: Tick) -> Count {
        let (now_index, now_lap) = self.locate(ts);
        self.buckets
            .iter()
            .enumerate()
            .map(|(index, slot)| {
                // Slots past `now_index` hold the in-window second from the previous lap.
                let expected = if index <= now_index {
                    now_lap
                } else {
                    now_lap.wrapping_sub(1)
                };
                match unpack(slot.load(Ordering::Acquire)) {
                    (lap, count) if count > 0 && lap == expected => count as Count,
                    _ => 0,
                }
            })
            .sum()
    }

    #[inline]
    pub fn window_seconds(&self) -> usize {
        self.window_seconds
    }

    /// Forgets every recorded hit.
    ///
    /// Not atomic as a whole: hits recorded concurrently may survive the reset.
    pub fn reset(&self) {
        for slot in self.buckets.iter() {
            slot.store(0, Ordering::Release);
        }
    }
}

impl HitCounter for LockFreeSlidingWindowCounter {
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

impl From<SlidingWindowCounterConfig> for LockFreeSlidingWindowCounter {
    /// Converts a `SlidingWindowCounterConfig` into a `LockFreeSlidingWindowCounter`.
    ///
    /// # Panics
    /// Panics if `window_seconds` is zero.
    #[inline(always)]
    fn from(config: SlidingWindowCounterConfig) -> Self {
        LockFreeSlidingWindowCounter::new(config.window_seconds)
    }
}
