//! Thread-safe building blocks for concurrent Rust services.
//!
//! This library provides a small set of concurrency primitives with precisely
//! defined behaviour under contention: a blocking bounded queue, a
//! fixed-size worker pool with result futures and graceful shutdown, a
//! fully-synchronized map with atomic compound operations, and a sliding
//! window hit counter in a lock-based and a lock-free form.
//!
//! # Quick Start
//!
//! ```rust
//! use concurrency_core::executor::WorkerPool;
//! use std::time::Duration;
//!
//! // Four workers sharing a queue of at most 32 pending jobs
//! let pool = WorkerPool::new(4, 32);
//!
//! let answer = pool.submit_fn(|| 6 * 7).unwrap();
//! assert_eq!(answer.get().unwrap(), 42);
//!
//! pool.shutdown(Duration::from_secs(1)).unwrap();
//! ```
//!
//! # Available Components
//!
//! ## [Bounded Queue](collections::BoundedQueue)
//! FIFO with fixed capacity; producers block while full, consumers while empty:
//! ```rust
//! # use concurrency_core::collections::BoundedQueue;
//! let queue = BoundedQueue::new(100);
//! queue.put("job").unwrap();
//! assert_eq!(queue.take(), Ok("job"));
//! ```
//!
//! ## [Worker Pool](executor::WorkerPool) and [Task Future](executor::TaskFuture)
//! Fixed worker threads, backpressure on submission, drain-then-stop shutdown:
//! ```rust
//! # use concurrency_core::executor::WorkerPool;
//! let pool = WorkerPool::new(2, 8);
//! pool.execute(|| println!("fire and forget")).unwrap();
//! ```
//!
//! ## [Concurrent Map](collections::ConcurrentMap)
//! Single-lock map with `put_if_absent`, `remove_if_equals` and snapshot iteration:
//! ```rust
//! # use concurrency_core::collections::ConcurrentMap;
//! let map = ConcurrentMap::new();
//! assert_eq!(map.put_if_absent("k", 1), None);
//! ```
//!
//! ## [Sliding Window Counter](counters::SlidingWindowCounter)
//! Hits over a trailing window of seconds, behind a reader/writer lock:
//! ```rust
//! # use concurrency_core::counters::SlidingWindowCounter;
//! let counter = SlidingWindowCounter::new(300); // last five minutes
//! counter.hit(10);
//! assert_eq!(counter.get_hits(10), 1);
//! ```
//!
//! ## [Lock-Free Sliding Window Counter](counters::LockFreeSlidingWindowCounter)
//! Same contract, implemented with compare-and-swap:
//! ```rust
//! # use concurrency_core::counters::LockFreeSlidingWindowCounter;
//! let counter = LockFreeSlidingWindowCounter::new(300);
//! counter.hit(10);
//! assert_eq!(counter.get_hits(10 + 300), 0);
//! ```
//!
//! # Core Concepts
//!
//! ## Blocking and Cancellation
//! Blocking calls wait on condition variables and always re-check their
//! condition after waking. Cancellable variants take a [`CancelToken`]; a
//! cancelled call returns an error and leaves the shared structure exactly as
//! it was (no partial insert or remove).
//!
//! ## Error Handling
//! - Expected non-blocking outcomes (queue full, queue empty, future still
//!   pending) are plain `Result<(), T>` / `Option` values
//! - Blocking queue operations fail with [`PutError`] (which hands the item
//!   back) or [`TakeError`]
//! - Task failures are captured as [`TaskError`] in the task's future
//! - Pool lifecycle problems are reported as [`PoolError`]
//!
//! ## Logging
//! The library emits [`tracing`] events (pool lifecycle at `debug`, failing
//! fire-and-forget tasks at `error`) and never installs a subscriber.
//!
//! ## Time Representation
//! Hit counters take caller-supplied timestamps in whole seconds ([`Tick`]),
//! which keeps them deterministic under test. [`HitCounter::hit_now`] uses the
//! system clock.

pub mod cancel;
pub mod collections;
pub mod counters;
pub mod error;
pub mod executor;
pub mod hit_counter;
pub mod types;

pub use cancel::CancelToken;
pub use error::{Cancelled, PoolError, PutError, TakeError, TaskError};
pub use hit_counter::HitCounter;
pub use types::{Count, Tick};
