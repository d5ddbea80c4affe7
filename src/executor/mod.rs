//! Task execution on a fixed set of worker threads.
//!
//! - **[`WorkerPool`]** - Fixed worker threads consuming one bounded job queue,
//!   with backpressure on submission and drain-then-stop shutdown
//! - **[`TaskFuture`]** - Single-assignment result slot returned by
//!   [`WorkerPool::submit`], usable on its own as a one-shot rendezvous
//!
//! Tasks may complete in any order; only the queue between submitters and
//! workers is FIFO.

pub mod task_future;
pub use task_future::TaskFuture;

pub mod worker_pool;
pub use worker_pool::WorkerPool;
pub use worker_pool::WorkerPoolConfig;
