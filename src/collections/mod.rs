//! Thread-safe containers.
//!
//! Each container owns its synchronization; no caller-visible lock is needed
//! for single operations.
//!
//! - **[`BoundedQueue`]** - Blocking FIFO with fixed capacity and backpressure
//! - **[`ConcurrentMap`]** - Single-lock hash map with atomic compound operations
//! - **[`SynchronizedList`]** - Single-lock vector with scoped lock access
//!
//! Compound operations that the containers do not provide are written
//! against the `with_lock` method of [`ConcurrentMap`] and [`SynchronizedList`].

pub mod bounded_queue;
pub use bounded_queue::BoundedQueue;

pub mod concurrent_map;
pub use concurrent_map::ConcurrentMap;

pub mod synchronized_list;
pub use synchronized_list::SynchronizedList;
