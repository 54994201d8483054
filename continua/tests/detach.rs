mod common;

use common::ThreadPool;
use continua::adapter::resume_on;
use continua::{Launcher, Task, ambient, detach, detach_with};

use std::panic::catch_unwind;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::mpsc;
use std::task::Poll;
use std::time::Duration;

#[test]
fn handler_called_once_with_value() {
    common::init_tracing();

    let calls = Arc::new(AtomicUsize::new(0));
    let seen = calls.clone();

    let handle = detach_with(Task::new(async { 6 * 7 }), move |outcome| {
        assert_eq!(outcome.ok(), Some(42));
        seen.fetch_add(1, Ordering::SeqCst);
    });

    assert!(handle.is_finished());
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[test]
fn handler_receives_failure() {
    let (tx, rx) = mpsc::channel();

    Task::new(async { panic!("handled") }).detach_with(move |outcome: continua::Outcome<()>| {
        let _ = tx.send(outcome.map_err(|f| f.message().to_owned()));
    });

    assert_eq!(rx.try_recv(), Ok(Err("handled".to_owned())));
    assert!(rx.try_recv().is_err());
}

#[test]
fn detached_failure_without_handler_is_reraised() {
    let caught = catch_unwind(|| {
        detach(Task::<()>::new(async { panic!("nobody listens") }));
    });

    assert!(caught.is_err());
}

#[test]
fn detached_chain_finishes_on_executor() {
    common::init_tracing();

    let pool = ThreadPool::new(2);
    let executor = pool.clone();
    let (tx, rx) = mpsc::channel();

    let handle = detach_with(
        Task::new(async move {
            resume_on(&executor).await;
            common::on_pool_thread()
        }),
        move |outcome| {
            let _ = tx.send(outcome.ok());
        },
    );

    assert_eq!(rx.recv_timeout(Duration::from_secs(5)), Ok(Some(true)));
    assert!(rx.recv_timeout(Duration::from_millis(50)).is_err());

    while !handle.is_finished() {
        std::thread::yield_now();
    }
}

#[test]
fn launcher_injects_ambient_into_detached_chain() {
    let (tx, rx) = mpsc::channel();

    Launcher::new().ambient(String::from("ctx")).detach_with(
        Task::new(async { ambient::get::<String>().map(|s| s.len()) }),
        move |outcome| {
            let _ = tx.send(outcome.ok().flatten());
        },
    );

    assert_eq!(rx.try_recv(), Ok(Some(3)));
}

#[test]
fn task_dropped_while_suspended_reports_failure() {
    // Pending without keeping the waker: nothing can ever resume the task.
    let outcome = Launcher::new().try_sync_await(Task::new(async {
        std::future::poll_fn(|_| Poll::<()>::Pending).await;
    }));

    let failure = outcome.expect_err("task can never complete");
    assert_eq!(failure.message(), "task dropped before completing");
}

#[test]
fn detached_handle_reports_id() {
    let task = Task::new(async {});
    let id = task.id();

    assert_eq!(detach(task).id(), id);
}
