use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{mpsc, Arc, Barrier};
use std::thread;
use std::time::{Duration, Instant};

use concurrency_core::executor::{WorkerPool, WorkerPoolConfig};
use concurrency_core::{PoolError, TaskError};

const LONG: Duration = Duration::from_secs(10);

/// Routes the pool's log output through the test harness.
fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter("concurrency_core=debug")
        .with_test_writer()
        .try_init();
}

#[test]
fn test_worker_pool_basics() {
    init_tracing();
    let pool = WorkerPool::new(3, 5);

    assert_eq!(pool.worker_count(), 3);
    assert!(!pool.is_shutdown());
    assert!(!pool.is_terminated());

    let future = pool.submit_fn(|| "hello".len()).unwrap();
    assert_eq!(future.get().unwrap(), 5);

    pool.shutdown(LONG).unwrap();
    assert!(pool.is_shutdown());
    assert!(pool.is_terminated());
}

#[test]
fn test_graceful_shutdown_runs_every_queued_task_exactly_once() {
    init_tracing();
    let pool = WorkerPool::new(4, 10);
    let runs: Arc<Vec<AtomicUsize>> = Arc::new((0..100).map(|_| AtomicUsize::new(0)).collect());

    // 100 tasks through a queue of 10: submission blocks until workers catch up
    for id in 0..100 {
        let runs = Arc::clone(&runs);
        pool.execute(move || {
            thread::sleep(Duration::from_millis(1));
            runs[id].fetch_add(1, Ordering::SeqCst);
        })
        .unwrap();
        assert!(pool.pending_count() <= 10);
    }

    assert_eq!(pool.shutdown(LONG), Ok(()));

    for (id, count) in runs.iter().enumerate() {
        assert_eq!(count.load(Ordering::SeqCst), 1, "task {} ran the wrong number of times", id);
    }
    assert_eq!(pool.completed_tasks(), 100);
    assert_eq!(pool.pending_count(), 0);

    // A closed pool rejects work instead of blocking or dropping it silently
    assert_eq!(pool.execute(|| ()), Err(PoolError::Shutdown));
    assert!(matches!(pool.submit_fn(|| 1), Err(PoolError::Shutdown)));
}

#[test]
fn test_shutdown_drains_queue_before_stopping() {
    let pool = WorkerPool::new(1, 20);
    let (release_tx, release_rx) = mpsc::channel::<()>();
    let executed = Arc::new(AtomicUsize::new(0));

    // Hold the only worker so that the rest pile up in the queue
    pool.execute(move || {
        let _ = release_rx.recv();
    })
    .unwrap();
    for _ in 0..15 {
        let executed = Arc::clone(&executed);
        pool.execute(move || {
            executed.fetch_add(1, Ordering::SeqCst);
        })
        .unwrap();
    }

    let releaser = thread::spawn(move || {
        thread::sleep(Duration::from_millis(30));
        release_tx.send(()).unwrap();
    });

    pool.shutdown(LONG).unwrap();
    releaser.join().unwrap();

    assert_eq!(executed.load(Ordering::SeqCst), 15);
}

#[test]
fn test_panicking_task_does_not_stop_later_tasks() {
    init_tracing();
    let pool = WorkerPool::new(1, 4);

    pool.execute(|| panic!("task blew up")).unwrap();
    let after = pool.submit_fn(|| 2 + 2).unwrap();

    // Same single worker survived the panic and ran the next task
    assert_eq!(after.get().unwrap(), 4);
    assert_eq!(pool.failed_tasks(), 1);

    pool.shutdown(LONG).unwrap();
    assert_eq!(pool.completed_tasks(), 1);
}

#[test]
fn test_many_panics_keep_all_workers_alive() {
    let pool = WorkerPool::new(2, 8);

    for _ in 0..10 {
        pool.execute(|| panic!("again")).unwrap();
    }
    let futures: Vec<_> = (0..10).map(|i| pool.submit_fn(move || i * 10).unwrap()).collect();

    let sum: i32 = futures.iter().map(|f| f.get().unwrap()).sum();
    assert_eq!(sum, 450);

    pool.shutdown(LONG).unwrap();
    assert_eq!(pool.failed_tasks(), 10);
    assert_eq!(pool.completed_tasks(), 10);
}

#[test]
fn test_submit_error_is_stored_in_future() {
    let pool = WorkerPool::new(2, 4);

    let parsed = pool.submit(|| "not a number".parse::<i32>()).unwrap();
    match parsed.get() {
        Err(TaskError::Failed(e)) => assert!(e.to_string().contains("invalid digit")),
        other => panic!("expected parse failure, got {:?}", other),
    }

    let custom = pool.submit(|| -> Result<u8, String> { Err("quota exceeded".into()) }).unwrap();
    match custom.get() {
        Err(TaskError::Failed(e)) => assert_eq!(e.to_string(), "quota exceeded"),
        other => panic!("expected failure, got {:?}", other),
    }

    pool.shutdown(LONG).unwrap();
    assert_eq!(pool.failed_tasks(), 2);
}

#[test]
fn test_submit_panic_is_stored_in_future() {
    let pool = WorkerPool::new(1, 4);

    let exploded = pool
        .submit(|| -> Result<u8, String> { panic!("kaboom") })
        .unwrap();
    match exploded.get() {
        Err(error @ TaskError::Panicked(_)) => {
            assert!(error.is_panic());
            assert_eq!(error.to_string(), "Task panicked: kaboom");
        }
        other => panic!("expected panic, got {:?}", other),
    }

    let formatted = pool.submit_fn(|| -> u8 { panic!("code {}", 7) }).unwrap();
    assert!(matches!(formatted.get(), Err(TaskError::Panicked(message)) if message == "code 7"));

    pool.shutdown(LONG).unwrap();
}

#[test]
fn test_shutdown_is_idempotent() {
    let pool = WorkerPool::new(2, 2);
    pool.submit_fn(|| ()).unwrap().get().unwrap();

    assert_eq!(pool.shutdown(LONG), Ok(()));
    assert_eq!(pool.shutdown(LONG), Ok(()));
    assert_eq!(pool.shutdown(Duration::ZERO), Ok(()));
    assert!(pool.is_terminated());
}

#[test]
fn test_concurrent_shutdown_calls_do_not_deadlock() {
    let pool = Arc::new(WorkerPool::new(3, 3));
    for _ in 0..6 {
        pool.execute(|| thread::sleep(Duration::from_millis(5))).unwrap();
    }

    let barrier = Arc::new(Barrier::new(4));
    let callers: Vec<_> = (0..4)
        .map(|_| {
            let pool = Arc::clone(&pool);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                pool.shutdown(LONG)
            })
        })
        .collect();

    for caller in callers {
        assert_eq!(caller.join().unwrap(), Ok(()));
    }
    assert_eq!(pool.completed_tasks(), 6);
}

#[test]
fn test_shutdown_timeout_reports_stuck_workers_and_can_be_retried() {
    init_tracing();
    let pool = WorkerPool::new(2, 4);
    let (release_tx, release_rx) = mpsc::channel::<()>();
    let (started_tx, started_rx) = mpsc::channel::<()>();

    pool.execute(move || {
        started_tx.send(()).unwrap();
        let _ = release_rx.recv();
    })
    .unwrap();
    started_rx.recv().unwrap();

    // One worker is idle and exits; the other is stuck in its task
    assert_eq!(
        pool.shutdown(Duration::from_millis(30)),
        Err(PoolError::ShutdownTimeout { remaining: 1 })
    );
    assert!(pool.is_shutdown());
    assert!(!pool.is_terminated());

    release_tx.send(()).unwrap();
    assert_eq!(pool.shutdown(LONG), Ok(()));
    assert!(pool.is_terminated());
}

#[test]
fn test_shutdown_releases_blocked_submitter() {
    let pool = Arc::new(WorkerPool::new(1, 1));
    let (release_tx, release_rx) = mpsc::channel::<()>();
    let (started_tx, started_rx) = mpsc::channel::<()>();

    pool.execute(move || {
        started_tx.send(()).unwrap();
        let _ = release_rx.recv();
    })
    .unwrap();
    started_rx.recv().unwrap();
    // Fills the queue
    pool.execute(|| ()).unwrap();

    let blocked = {
        let pool = Arc::clone(&pool);
        thread::spawn(move || pool.execute(|| ()))
    };
    thread::sleep(Duration::from_millis(30));

    let _ = pool.shutdown(Duration::from_millis(10));
    assert_eq!(blocked.join().unwrap(), Err(PoolError::Shutdown));

    release_tx.send(()).unwrap();
    assert_eq!(pool.shutdown(LONG), Ok(()));
    // The stuck task and the queued one both ran; the rejected one did not
    assert_eq!(pool.completed_tasks(), 2);
}

#[test]
fn test_submissions_from_many_threads() {
    let pool = Arc::new(WorkerPool::new(4, 8));

    let submitters: Vec<_> = (0..8u64)
        .map(|t| {
            let pool = Arc::clone(&pool);
            thread::spawn(move || {
                let futures: Vec<_> = (0..50u64)
                    .map(|i| pool.submit_fn(move || t * 1000 + i).unwrap())
                    .collect();
                futures.into_iter().map(|f| f.get().unwrap()).sum::<u64>()
            })
        })
        .collect();

    let total: u64 = submitters.into_iter().map(|h| h.join().unwrap()).sum();
    let expected: u64 = (0..8u64)
        .flat_map(|t| (0..50u64).map(move |i| t * 1000 + i))
        .sum();
    assert_eq!(total, expected);

    pool.shutdown(LONG).unwrap();
    assert_eq!(pool.completed_tasks(), 400);
}

#[test]
fn test_worker_threads_are_named_from_config() {
    let pool: WorkerPool = WorkerPoolConfig::new(2, 4)
        .thread_name_prefix("ingest")
        .into();

    let name = pool
        .submit_fn(|| thread::current().name().map(String::from))
        .unwrap()
        .get()
        .unwrap()
        .unwrap();
    assert!(name.starts_with("ingest-"), "unexpected thread name {}", name);

    pool.shutdown(LONG).unwrap();
}

#[test]
fn test_try_new_with_default_config() {
    let config = WorkerPoolConfig::default();
    assert!(config.worker_count >= 1);
    assert_eq!(config.queue_capacity, 64);

    let pool = WorkerPool::try_new(config.clone()).unwrap();
    assert_eq!(pool.worker_count(), config.worker_count);
    pool.shutdown(LONG).unwrap();
}

#[test]
fn test_dropped_pool_still_drains_queued_work() {
    let executed = Arc::new(AtomicUsize::new(0));
    {
        let pool = WorkerPool::new(1, 16);
        for _ in 0..10 {
            let executed = Arc::clone(&executed);
            pool.execute(move || {
                thread::sleep(Duration::from_millis(1));
                executed.fetch_add(1, Ordering::SeqCst);
            })
            .unwrap();
        }
    }

    let deadline = Instant::now() + LONG;
    while executed.load(Ordering::SeqCst) < 10 && Instant::now() < deadline {
        thread::sleep(Duration::from_millis(5));
    }
    assert_eq!(executed.load(Ordering::SeqCst), 10);
}

#[test]
#[should_panic(expected = "worker_count must be greater than 0")]
fn test_zero_workers_panics() {
    let _pool = WorkerPool::new(0, 1);
}

#[test]
#[should_panic(expected = "queue_capacity must be greater than 0")]
fn test_zero_queue_capacity_panics() {
    let _pool = WorkerPool::new(1, 0);
}
