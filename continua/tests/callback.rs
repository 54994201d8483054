mod common;

use common::ThreadPool;
use continua::adapter::{Completion, callback, from_fn, resume_on, run_on};
use continua::{Launcher, Task, ambient, sync_await};

use std::thread;
use std::time::Duration;

#[test]
fn inline_completion_resumes_immediately() {
    let value = sync_await(Task::new(async { callback(|done| done.complete(5)).await }));

    assert_eq!(value, 5);
}

#[test]
fn deferred_completion_from_another_thread() {
    common::init_tracing();

    let value = sync_await(Task::new(async {
        callback(|done: Completion<u32>| {
            thread::spawn(move || {
                thread::sleep(Duration::from_millis(10));
                done.complete(9);
            });
        })
        .await
    }));

    assert_eq!(value, 9);
}

#[test]
fn racing_completions_resume_exactly_once() {
    for i in 0..500_u32 {
        let value = sync_await(Task::new(async move {
            callback(move |done| {
                thread::spawn(move || done.complete(i));
            })
            .await
        }));

        assert_eq!(value, i);
    }
}

#[test]
fn back_to_back_inline_completions_keep_stack_flat() {
    let handle = thread::Builder::new()
        .stack_size(256 * 1024)
        .spawn(|| {
            sync_await(Task::new(async {
                let mut sum = 0_u64;

                for i in 0..100_000_u64 {
                    sum += callback(|done| done.complete(i)).await;
                }

                sum
            }))
        })
        .expect("spawn");

    assert_eq!(handle.join().expect("no stack overflow"), 4_999_950_000);
}

#[test]
fn dropped_completion_fails_the_task() {
    let outcome = Launcher::new().try_sync_await(Task::new(async {
        callback(|done: Completion<u8>| drop(done)).await
    }));

    let failure = outcome.expect_err("abandoned completion");
    assert_eq!(failure.message(), "completion dropped without being invoked");
}

#[test]
fn dropped_completion_on_other_thread_fails_the_task() {
    let outcome = Launcher::new().try_sync_await(Task::new(async {
        callback(|done: Completion<u8>| {
            thread::spawn(move || drop(done));
        })
        .await
    }));

    assert!(outcome.is_err());
}

#[test]
fn run_on_returns_value_and_resumes_on_executor() {
    let pool = ThreadPool::new(2);

    let (value, on_pool) = sync_await(Task::new(async move {
        let value = run_on(&pool, || 21 * 2).await;
        (value, common::on_pool_thread())
    }));

    assert_eq!(value, 42);
    assert!(on_pool);
}

#[test]
fn run_on_panic_surfaces_in_task() {
    let pool = ThreadPool::new(1);

    let outcome = Launcher::new().try_sync_await(Task::new(async move {
        run_on(&pool, || -> u8 { panic!("pool job failed") }).await
    }));

    assert_eq!(outcome.expect_err("job panicked").message(), "pool job failed");
}

#[test]
fn resume_on_moves_continuation() {
    let pool = ThreadPool::new(1);

    let moved = sync_await(Task::new(async move {
        let before = common::on_pool_thread();
        resume_on(&pool).await;
        (before, common::on_pool_thread())
    }));

    assert_eq!(moved, (false, true));
}

#[test]
fn inline_executor_runs_without_suspending() {
    let inline = from_fn(|job| job());

    let value = sync_await(Task::new(async move { run_on(&inline, || "inline").await }));

    assert_eq!(value, "inline");
}

#[test]
fn ambient_survives_thread_hops() {
    let pool = ThreadPool::new(2);

    let seen = Launcher::new().ambient(7_u32).sync_await(Task::new(async move {
        let mut seen = Vec::new();

        for _ in 0..3 {
            resume_on(&pool).await;
            seen.push(ambient::get::<u32>().map(|v| *v));
        }

        seen
    }));

    assert_eq!(seen, vec![Some(7); 3]);
}
