use std::sync::Arc;
use std::thread;
use std::time::Duration;

use concurrency_core::executor::TaskFuture;
use concurrency_core::{CancelToken, Cancelled, TaskError};

#[test]
fn test_task_future_starts_pending() {
    let future: TaskFuture<u32> = TaskFuture::new();

    assert!(!future.is_done());
    assert!(future.try_get().is_none());
}

#[test]
fn test_task_future_complete_then_get() {
    let future = TaskFuture::new();

    assert!(future.complete(String::from("done")));
    assert!(future.is_done());

    // Reads are repeatable
    assert_eq!(future.get().unwrap(), "done");
    assert_eq!(future.get().unwrap(), "done");
    assert_eq!(future.try_get().unwrap().unwrap(), "done");
}

#[test]
fn test_task_future_error_is_reraised() {
    let future: TaskFuture<u32> = TaskFuture::new();

    assert!(future.complete_with_error(TaskError::failed("disk full")));

    match future.get() {
        Err(TaskError::Failed(e)) => assert_eq!(e.to_string(), "disk full"),
        other => panic!("expected failure, got {:?}", other),
    }
    // Every read sees the same error
    assert!(matches!(future.get(), Err(TaskError::Failed(_))));
}

#[test]
fn test_task_future_first_completion_wins() {
    let future = TaskFuture::new();

    assert!(future.complete(1));

    // Later completions are rejected rather than silently accepted
    assert!(!future.complete(2));
    assert!(!future.complete_with_error(TaskError::Panicked("late".into())));

    assert_eq!(future.get().unwrap(), 1);
}

#[test]
fn test_task_future_error_then_value_is_rejected() {
    let future = TaskFuture::new();

    assert!(future.complete_with_error(TaskError::Panicked("boom".into())));
    assert!(!future.complete(5));

    match future.get() {
        Err(TaskError::Panicked(message)) => assert_eq!(message, "boom"),
        other => panic!("expected panic error, got {:?}", other),
    }
}

#[test]
fn test_task_future_wakes_all_waiters() {
    let future: TaskFuture<u64> = TaskFuture::new();

    let waiters: Vec<_> = (0..8)
        .map(|_| {
            let future = future.clone();
            thread::spawn(move || future.get())
        })
        .collect();

    thread::sleep(Duration::from_millis(30));
    assert!(future.complete(99));

    for waiter in waiters {
        assert_eq!(waiter.join().unwrap().unwrap(), 99);
    }
}

#[test]
fn test_task_future_racing_completers_resolve_once() {
    let future = TaskFuture::new();

    let completers: Vec<_> = (0..8)
        .map(|i| {
            let future = future.clone();
            thread::spawn(move || future.complete(i))
        })
        .collect();

    let winners = completers
        .into_iter()
        .map(|handle| handle.join().unwrap())
        .filter(|won| *won)
        .count();

    assert_eq!(winners, 1);
    let value = future.get().unwrap();
    assert!((0..8).contains(&value));
    assert_eq!(future.get().unwrap(), value);
}

#[test]
fn test_task_future_timeout_is_distinct_and_non_mutating() {
    let future: TaskFuture<&str> = TaskFuture::new();

    // Still pending: None, not an error
    assert!(future.get_timeout(Duration::from_millis(20)).is_none());
    assert!(!future.is_done());

    // The future can still be completed after a timed-out wait
    assert!(future.complete("late"));
    match future.get_timeout(Duration::from_millis(20)) {
        Some(Ok(value)) => assert_eq!(value, "late"),
        other => panic!("expected resolved value, got {:?}", other),
    }
}

#[test]
fn test_task_future_timeout_returns_failure() {
    let future: TaskFuture<u8> = TaskFuture::new();
    future.complete_with_error(TaskError::failed("nope"));

    match future.get_timeout(Duration::from_millis(5)) {
        Some(Err(TaskError::Failed(_))) => {}
        other => panic!("expected stored failure, got {:?}", other),
    }
}

#[test]
fn test_task_future_timed_wait_sees_late_completion() {
    let future = TaskFuture::new();
    let producer = {
        let future = future.clone();
        thread::spawn(move || {
            thread::sleep(Duration::from_millis(20));
            future.complete(7u8);
        })
    };

    let outcome = future.get_timeout(Duration::from_secs(5));
    assert_eq!(outcome.map(|r| r.unwrap()), Some(7));
    producer.join().unwrap();
}

#[test]
fn test_task_future_cancellable_get() {
    let future: TaskFuture<u32> = TaskFuture::new();
    let token = CancelToken::new();

    let waiter = {
        let future = future.clone();
        let token = token.clone();
        thread::spawn(move || future.get_cancellable(&token))
    };

    thread::sleep(Duration::from_millis(30));
    token.cancel();

    assert!(matches!(waiter.join().unwrap(), Err(Cancelled)));
    // Cancelling the wait leaves the future pending
    assert!(!future.is_done());

    future.complete(3);
    assert_eq!(future.get_cancellable(&CancelToken::new()).unwrap().unwrap(), 3);
}

#[test]
fn test_task_future_shared_across_threads() {
    let future: Arc<TaskFuture<Vec<u8>>> = Arc::new(TaskFuture::new());
    let producer = {
        let future = Arc::clone(&future);
        thread::spawn(move || future.complete(vec![1, 2, 3]))
    };

    assert_eq!(future.get().unwrap(), vec![1, 2, 3]);
    assert!(producer.join().unwrap());
    assert_eq!(format!("{:?}", future), "TaskFuture { state: \"Resolved\" }");
}
