//! Sliding window hit counters.
//!
//! Both counters report how many hits fell inside a trailing window of
//! seconds, using a ring of one-second buckets with lazy invalidation. They
//! differ only in how concurrent access is coordinated.
//!
//! - **[`SlidingWindowCounter`]** - Reader/writer lock; readers run in parallel,
//!   writers are exclusive
//! - **[`LockFreeSlidingWindowCounter`]** - One compare-and-swap per hit; reads
//!   never block but may trail concurrent writes
//!
//! # Choosing a Counter
//!
//! | Counter | Writes | Reads | Consistency |
//! |---------|--------|-------|-------------|
//! | Lock-based | Serialized | Shared lock | Exact snapshot |
//! | Lock-free | CAS retry | Wait-free scan | Per-bucket snapshot |
//!
//! Both implement [`HitCounter`](crate::HitCounter).

pub mod sliding_window_counter;
pub use sliding_window_counter::SlidingWindowCounter;
pub use sliding_window_counter::SlidingWindowCounterConfig;

pub mod lock_free_sliding_window_counter;
pub use lock_free_sliding_window_counter::LockFreeSlidingWindowCounter;
