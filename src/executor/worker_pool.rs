use std::any::Any;
use std::convert::Infallible;
use std::error::Error as StdError;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};

use crate::collections::BoundedQueue;
use crate::error::{PoolError, TaskError};
use crate::executor::TaskFuture;

/// A unit of work waiting in the pool's queue.
struct Job {
    task: Box<dyn FnOnce() -> Result<(), TaskError> + Send + 'static>,
    /// Submitted via `execute`: nobody holds a future, so failures are logged
    detached: bool,
}

/// Fixed-size pool of worker threads fed from one [`BoundedQueue`].
///
/// # Lifecycle
///
/// - **Running**: workers start immediately and loop taking jobs from the
///   queue; submissions block while the queue is full (backpressure)
/// - **Draining**: after [`shutdown`](WorkerPool::shutdown) new submissions
///   fail with [`PoolError::Shutdown`], but every job already queued still runs
/// - **Terminated**: the queue is empty and every worker has exited
///
/// # Failure isolation
///
/// Each job runs under `catch_unwind`. A panicking or failing job never
/// takes down its worker: the failure is stored in the job's
/// [`TaskFuture`] (for [`submit`](WorkerPool::submit)) or logged at error
/// level and counted in [`failed_tasks`](WorkerPool::failed_tasks) (for
/// [`execute`](WorkerPool::execute)).
///
/// # Example
///
/// ```rust
/// use concurrency_core::executor::WorkerPool;
/// use std::time::Duration;
///
/// let pool = WorkerPool::new(4, 16);
///
/// let square = pool.submit_fn(|| 7 * 7).unwrap();
/// let parse = pool.submit(|| "12".parse::<u32>()).unwrap();
///
/// assert_eq!(square.get().unwrap(), 49);
/// assert_eq!(parse.get().unwrap(), 12);
///
/// pool.shutdown(Duration::from_secs(5)).unwrap();
/// assert!(pool.execute(|| ()).is_err());
/// ```
pub struct WorkerPool {
    shared: Arc<PoolShared>,
    workers: Mutex<Vec<Worker>>,
    worker_count: usize,
}

/// State reachable from both the pool handle and its worker threads.
struct PoolShared {
    queue: BoundedQueue<Job>,
    shutdown: AtomicBool,
    live_workers: AtomicUsize,
    active: AtomicUsize,
    completed: AtomicU64,
    failed: AtomicU64,
}

struct Worker {
    name: String,
    exit: Arc<ExitLatch>,
    /// Taken once the thread has been joined, so a handle is never joined twice
    thread: Option<JoinHandle<()>>,
}

/// One-shot flag set when a worker thread leaves its loop.
#[derive(Default)]
struct ExitLatch {
    exited: Mutex<bool>,
    cvar: Condvar,
}

impl ExitLatch {
    fn signal(&self) {
        *self.exited.lock() = true;
        self.cvar.notify_all();
    }

    /// Waits up to `timeout` for the latch; returns whether it was set.
    fn wait_for(&self, timeout: Duration) -> bool {
        let mut exited = self.exited.lock();
        let deadline = match Instant::now().checked_add(timeout) {
            Some(deadline) => deadline,
            None => {
                while !*exited {
                    self.cvar.wait(&mut exited);
                }
                return true;
            }
        };
        while !*exited {
            if self.cvar.wait_until(&mut exited, deadline).timed_out() {
                return *exited;
            }
        }
        true
    }
}

/// Marks a worker as gone however its thread ends.
struct ExitGuard {
    shared: Arc<PoolShared>,
    latch: Arc<ExitLatch>,
}

impl Drop for ExitGuard {
    fn drop(&mut self) {
        self.shared.live_workers.fetch_sub(1, Ordering::AcqRel);
        self.latch.signal();
    }
}

impl WorkerPool {
    /// Creates a pool of `worker_count` threads sharing a queue of `queue_capacity` jobs.
    ///
    /// # Panics
    ///
    /// Panics if either argument is zero, or if a worker thread cannot be spawned.
    pub fn new(worker_count: usize, queue_capacity: usize) -> Self {
        WorkerPoolConfig::new(worker_count, queue_capacity).into()
    }

    /// Creates a pool from `config`, reporting thread spawn failures as errors.
    ///
    /// # Panics
    ///
    /// Panics if `worker_count` or `queue_capacity` is zero.
    pub fn try_new(config: WorkerPoolConfig) -> Result<Self, PoolError> {
        assert!(config.worker_count > 0, "worker_count must be greater than 0");
        assert!(config.queue_capacity > 0, "queue_capacity must be greater than 0");

        let shared = Arc::new(PoolShared {
            queue: BoundedQueue::new(config.queue_capacity),
            shutdown: AtomicBool::new(false),
            live_workers: AtomicUsize::new(0),
            active: AtomicUsize::new(0),
            completed: AtomicU64::new(0),
            failed: AtomicU64::new(0),
        });

        let mut workers = Vec::with_capacity(config.worker_count);
        for index in 0..config.worker_count {
            let name = format!("{}-{}", config.thread_name_prefix, index);
            let exit = Arc::new(ExitLatch::default());
            let guard = ExitGuard {
                shared: Arc::clone(&shared),
                latch: Arc::clone(&exit),
            };
            shared.live_workers.fetch_add(1, Ordering::AcqRel);

            let thread_name = name.clone();
            let spawned = thread::Builder::new()
                .name(name.clone())
                .spawn(move || run_worker(guard, thread_name));

            match spawned {
                Ok(handle) => workers.push(Worker {
                    name,
                    exit,
                    thread: Some(handle),
                }),
                Err(e) => {
                    // The closure (and its guard) was dropped, undoing the live count.
                    shared.shutdown.store(true, Ordering::Release);
                    shared.queue.close();
                    return Err(PoolError::Spawn(e.to_string()));
                }
            }
        }

        tracing::debug!(
            workers = config.worker_count,
            queue_capacity = config.queue_capacity,
            "worker pool started"
        );

        Ok(WorkerPool {
            shared,
            workers: Mutex::new(workers),
            worker_count: config.worker_count,
        })
    }

    /// Queues a fire-and-forget task, blocking while the queue is full.
    ///
    /// If the task panics, the panic is logged and counted in
    /// [`failed_tasks`](WorkerPool::failed_tasks); the worker carries on.
    ///
    /// # Returns
    ///
    /// * `Ok(())` - The task was queued
    /// * `Err(PoolError::Shutdown)` - The pool was shut down before the task could be queued
    pub fn execute<F>(&self, f: F) -> Result<(), PoolError>
    where
        F: FnOnce() + Send + 'static,
    {
        self.enqueue(Job {
            task: Box::new(move || {
                f();
                Ok(())
            }),
            detached: true,
        })
    }

    /// Queues a fallible task and returns a future for its result.
    ///
    /// The future resolves with the task's `Ok` value, or fails with
    /// [`TaskError::Failed`] for an `Err` and [`TaskError::Panicked`] for a
    /// panic. Blocks while the queue is full.
    ///
    /// # Returns
    ///
    /// * `Ok(future)` - The task was queued; the future is pending
    /// * `Err(PoolError::Shutdown)` - The pool was shut down before the task could be queued
    pub fn submit<F, T, E>(&self, f: F) -> Result<TaskFuture<T>, PoolError>
    where
        F: FnOnce() -> Result<T, E> + Send + 'static,
        T: Send + 'static,
        E: Into<Box<dyn StdError + Send + Sync>> + 'static,
    {
        let future = TaskFuture::new();
        let completer = future.clone();

        self.enqueue(Job {
            task: Box::new(move || {
                let outcome = match panic::catch_unwind(AssertUnwindSafe(f)) {
                    Ok(Ok(value)) => Ok(value),
                    Ok(Err(e)) => Err(TaskError::failed(e)),
                    Err(payload) => Err(TaskError::Panicked(panic_message(&*payload))),
                };
                match outcome {
                    Ok(value) => {
                        completer.complete(value);
                        Ok(())
                    }
                    Err(error) => {
                        completer.complete_with_error(error.clone());
                        Err(error)
                    }
                }
            }),
            detached: false,
        })?;

        Ok(future)
    }

    /// Queues an infallible task and returns a future for its result.
    pub fn submit_fn<F, T>(&self, f: F) -> Result<TaskFuture<T>, PoolError>
    where
        F: FnOnce() -> T + Send + 'static,
        T: Send + 'static,
    {
        self.submit(move || Ok::<T, Infallible>(f()))
    }

    /// Stops accepting work, drains the queue, and waits for the workers to exit.
    ///
    /// Jobs already queued are executed, not discarded. Each worker is given
    /// up to `timeout` to finish; workers that exit in time are joined.
    ///
    /// Calling this again is safe: it re-waits only for workers that have not
    /// been joined yet and never joins a thread twice.
    ///
    /// # Returns
    ///
    /// * `Ok(())` - Every worker has exited and been joined
    /// * `Err(PoolError::ShutdownTimeout { remaining })` - `remaining` workers were still busy
    pub fn shutdown(&self, timeout: Duration) -> Result<(), PoolError> {
        if !self.shared.shutdown.swap(true, Ordering::AcqRel) {
            tracing::debug!(
                pending = self.shared.queue.len(),
                "worker pool shutting down"
            );
        }
        self.shared.queue.close();

        let mut workers = self.workers.lock();
        let mut remaining = 0;
        for worker in workers.iter_mut() {
            if worker.thread.is_none() {
                continue;
            }
            if !worker.exit.wait_for(timeout) {
                remaining += 1;
                continue;
            }
            if let Some(handle) = worker.thread.take() {
                if handle.join().is_err() {
                    tracing::warn!(worker = %worker.name, "worker thread terminated by panic");
                }
            }
        }

        if remaining > 0 {
            tracing::warn!(remaining, ?timeout, "worker pool shutdown timed out");
            return Err(PoolError::ShutdownTimeout { remaining });
        }
        Ok(())
    }

    pub fn is_shutdown(&self) -> bool {
        self.shared.shutdown.load(Ordering::Acquire)
    }

    /// Whether the pool is shut down and every worker thread has exited.
    pub fn is_terminated(&self) -> bool {
        self.is_shutdown() && self.shared.live_workers.load(Ordering::Acquire) == 0
    }

    /// Number of queued jobs not yet picked up by a worker.
    pub fn pending_count(&self) -> usize {
        self.shared.queue.len()
    }

    #[inline]
    pub fn worker_count(&self) -> usize {
        self.worker_count
    }

    /// Number of jobs currently running.
    pub fn active_count(&self) -> usize {
        self.shared.active.load(Ordering::Acquire)
    }

    /// Number of jobs that finished successfully.
    pub fn completed_tasks(&self) -> u64 {
        self.shared.completed.load(Ordering::Acquire)
    }

    /// Number of jobs that panicked or returned an error.
    pub fn failed_tasks(&self) -> u64 {
        self.shared.failed.load(Ordering::Acquire)
    }

    fn enqueue(&self, job: Job) -> Result<(), PoolError> {
        if self.is_shutdown() {
            return Err(PoolError::Shutdown);
        }
        // A put blocked on a full queue is released by `close` during shutdown.
        self.shared.queue.put(job).map_err(|_| PoolError::Shutdown)
    }
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        if !self.shared.shutdown.swap(true, Ordering::AcqRel) {
            tracing::debug!(
                pending = self.shared.queue.len(),
                "worker pool dropped without shutdown; workers drain the queue and exit"
            );
        }
        self.shared.queue.close();
    }
}

impl std::fmt::Debug for WorkerPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkerPool")
            .field("worker_count", &self.worker_count)
            .field("pending", &self.pending_count())
            .field("active", &self.active_count())
            .field("shutdown", &self.is_shutdown())
            .finish()
    }
}

fn run_worker(guard: ExitGuard, name: String) {
    let shared = Arc::clone(&guard.shared);
    tracing::debug!(worker = %name, "worker started");

    while let Ok(Job { task, detached }) = shared.queue.take() {
        shared.active.fetch_add(1, Ordering::AcqRel);
        let result = panic::catch_unwind(AssertUnwindSafe(task))
            .unwrap_or_else(|payload| Err(TaskError::Panicked(panic_message(&*payload))));
        shared.active.fetch_sub(1, Ordering::AcqRel);

        match result {
            Ok(()) => {
                shared.completed.fetch_add(1, Ordering::AcqRel);
                tracing::trace!(worker = %name, "job completed");
            }
            Err(error) => {
                shared.failed.fetch_add(1, Ordering::AcqRel);
                if detached {
                    tracing::error!(worker = %name, %error, "detached task failed");
                } else {
                    tracing::debug!(worker = %name, %error, "task failed; error stored in its future");
                }
            }
        }
    }

    tracing::debug!(worker = %name, "worker exiting");
    drop(guard);
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&'static str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

/// Configuration structure for creating a [`WorkerPool`].
#[derive(Debug, Clone)]
pub struct WorkerPoolConfig {
    /// Number of worker threads; fixed for the pool's lifetime.
    pub worker_count: usize,
    /// Maximum number of queued, not yet running jobs.
    pub queue_capacity: usize,
    /// Worker threads are named `"{thread_name_prefix}-{index}"`.
    pub thread_name_prefix: String,
}

impl WorkerPoolConfig {
    /// Creates a configuration with the default thread name prefix.
    pub fn new(worker_count: usize, queue_capacity: usize) -> Self {
        Self {
            worker_count,
            queue_capacity,
            ..Self::default()
        }
    }

    pub fn thread_name_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.thread_name_prefix = prefix.into();
        self
    }
}

impl Default for WorkerPoolConfig {
    fn default() -> Self {
        Self {
            worker_count: thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(4),
            queue_capacity: 64,
            thread_name_prefix: "worker".to_string(),
        }
    }
}

impl From<WorkerPoolConfig> for WorkerPool {
    /// Converts a `WorkerPoolConfig` into a running `WorkerPool`.
    ///
    /// # Panics
    /// Panics if a size is zero or a worker thread cannot be spawned.
    ///
    /// # Example
    ///
    /// ```
    /// use concurrency_core::executor::{WorkerPool, WorkerPoolConfig};
    ///
    /// let pool: WorkerPool = WorkerPoolConfig::new(2, 8)
    ///     .thread_name_prefix("ingest")
    ///     .into();
    /// assert_eq!(pool.worker_count(), 2);
    /// ```
    fn from(config: WorkerPoolConfig) -> Self {
        match WorkerPool::try_new(config) {
            Ok(pool) => pool,
            Err(e) => panic!("{}", e),
        }
    }
}
