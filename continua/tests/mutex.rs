mod common;

use common::ThreadPool;
use continua::adapter::resume_on;
use continua::sync::Mutex;
use continua::{Task, detach, detach_with, sync_await};

use std::future::Future;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::pin::pin;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::mpsc;
use std::task::{Context, Waker};
use std::time::Duration;

#[test]
fn uncontended_lock_completes_immediately() {
    let mutex = Arc::new(Mutex::new(1));

    let value = sync_await(Task::new({
        let mutex = mutex.clone();
        async move {
            let mut guard = mutex.lock().await;
            *guard += 1;
            *guard
        }
    }));

    assert_eq!(value, 2);
    assert!(!mutex.is_locked());
}

#[test]
fn waiters_are_granted_in_arrival_order() {
    common::init_tracing();

    let mutex = Arc::new(Mutex::new(Vec::new()));
    let guard = mutex.try_lock().expect("free mutex");

    for id in 0..5 {
        let mutex = mutex.clone();
        detach(Task::new(async move {
            mutex.lock().await.push(id);
        }));
    }

    assert!(mutex.is_locked());
    drop(guard);

    let order = sync_await(Task::new({
        let mutex = mutex.clone();
        async move { mutex.lock().await.clone() }
    }));

    assert_eq!(order, vec![0, 1, 2, 3, 4]);
    assert!(!mutex.is_locked());
}

#[test]
fn only_one_contender_proceeds() {
    let mutex = Arc::new(Mutex::new(()));
    let entered = Arc::new(AtomicUsize::new(0));

    let guard = mutex.try_lock().expect("free mutex");

    for _ in 0..4 {
        let (mutex, entered) = (mutex.clone(), entered.clone());
        detach(Task::new(async move {
            let _guard = mutex.lock().await;
            entered.fetch_add(1, Ordering::SeqCst);
        }));
    }

    assert_eq!(entered.load(Ordering::SeqCst), 0);

    guard.unlock();

    assert_eq!(entered.load(Ordering::SeqCst), 4);
    assert!(!mutex.is_locked());
}

#[test]
fn lock_on_resumes_waiter_on_executor() {
    let pool = ThreadPool::new(1);
    let mutex = Arc::new(Mutex::new(0));
    let (tx, rx) = mpsc::channel();

    let guard = mutex.try_lock().expect("free mutex");

    detach_with(
        Task::new({
            let mutex = mutex.clone();
            async move {
                let _guard = mutex.lock_on(pool).await;
                common::on_pool_thread()
            }
        }),
        move |outcome| {
            let _ = tx.send(outcome.ok());
        },
    );

    drop(guard);

    assert_eq!(rx.recv_timeout(Duration::from_secs(5)), Ok(Some(true)));
}

#[test]
fn no_two_tasks_hold_the_lock_across_threads() {
    common::init_tracing();

    const TASKS: usize = 64;
    const ROUNDS: usize = 50;

    let pool = ThreadPool::new(4);
    let mutex = Arc::new(Mutex::new(0_usize));
    let holders = Arc::new(AtomicUsize::new(0));
    let (tx, rx) = mpsc::channel();

    for _ in 0..TASKS {
        let (pool, mutex, holders, tx) = (pool.clone(), mutex.clone(), holders.clone(), tx.clone());

        detach_with(
            Task::new(async move {
                for _ in 0..ROUNDS {
                    resume_on(&pool).await;

                    let mut guard = mutex.lock().await;
                    assert_eq!(holders.fetch_add(1, Ordering::SeqCst), 0);

                    let value = *guard;
                    std::thread::yield_now();
                    *guard = value + 1;

                    holders.fetch_sub(1, Ordering::SeqCst);
                }
            }),
            move |outcome| {
                let _ = tx.send(outcome.is_ok());
            },
        );
    }

    for _ in 0..TASKS {
        assert_eq!(rx.recv_timeout(Duration::from_secs(30)), Ok(true));
    }

    assert_eq!(*mutex.try_lock().expect("all tasks done"), TASKS * ROUNDS);
}

#[test]
fn guard_is_released_when_task_fails() {
    let mutex = Arc::new(Mutex::new(0));

    let task = Task::<()>::new({
        let mutex = mutex.clone();
        async move {
            let _guard = mutex.lock().await;
            panic!("holding the lock");
        }
    });

    let caught = catch_unwind(AssertUnwindSafe(|| sync_await(task)));

    assert!(caught.is_err());
    assert!(!mutex.is_locked());
}

#[test]
fn cancelled_waiter_leaves_the_queue() {
    let mutex = Mutex::new(());
    let mut cx = Context::from_waker(Waker::noop());

    let guard = mutex.try_lock().expect("free mutex");

    {
        let mut lock = pin!(mutex.lock());
        assert!(lock.as_mut().poll(&mut cx).is_pending());
    }

    drop(guard);
    assert!(!mutex.is_locked());
}

#[test]
fn granted_waiter_dropped_passes_the_lock_on() {
    let mutex = Mutex::new(());
    let mut cx = Context::from_waker(Waker::noop());

    let guard = mutex.try_lock().expect("free mutex");

    let mut second = Box::pin(mutex.lock());
    let mut third = Box::pin(mutex.lock());
    assert!(second.as_mut().poll(&mut cx).is_pending());
    assert!(third.as_mut().poll(&mut cx).is_pending());

    drop(guard);
    assert!(mutex.is_locked());

    drop(second);
    assert!(mutex.is_locked());

    let guard = match third.as_mut().poll(&mut cx) {
        std::task::Poll::Ready(guard) => guard,
        std::task::Poll::Pending => panic!("lock should have been handed over"),
    };

    drop(guard);
    drop(third);
    assert!(!mutex.is_locked());
}
