#![allow(dead_code)]

use continua::adapter::{Executor, Job};

use std::collections::VecDeque;
use std::future::Future;
use std::pin::pin;
use std::sync::{Arc, Once};
use std::task::{Context, Poll, Wake, Waker};
use std::thread::{self, JoinHandle, Thread};

use parking_lot::{Condvar, Mutex};
use tracing_subscriber::EnvFilter;

static INIT_TRACING: Once = Once::new();

/// Installs a test-writer subscriber once per test binary.
///
/// The filter comes from `RUST_LOG` and defaults to `warn`.
pub fn init_tracing() {
    INIT_TRACING.call_once(|| {
        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .with_thread_names(true)
            .try_init();
    });
}

/// Fixed-size pool of worker threads, used as an external executor.
pub struct ThreadPool {
    shared: Arc<Shared>,
    workers: Vec<JoinHandle<()>>,
}

struct Shared {
    state: Mutex<PoolState>,
    available: Condvar,
}

struct PoolState {
    jobs: VecDeque<Job>,
    shutdown: bool,
}

/// Name given to every pool thread.
pub const WORKER_NAME: &str = "pool-worker";

impl ThreadPool {
    pub fn new(threads: usize) -> Arc<Self> {
        let shared = Arc::new(Shared {
            state: Mutex::new(PoolState {
                jobs: VecDeque::new(),
                shutdown: false,
            }),
            available: Condvar::new(),
        });

        let workers = (0..threads)
            .map(|_| {
                let shared = shared.clone();

                thread::Builder::new()
                    .name(WORKER_NAME.into())
                    .spawn(move || worker_loop(&shared))
                    .expect("failed to spawn pool worker")
            })
            .collect();

        Arc::new(Self { shared, workers })
    }
}

fn worker_loop(shared: &Shared) {
    loop {
        let job = {
            let mut state = shared.state.lock();

            loop {
                if let Some(job) = state.jobs.pop_front() {
                    break job;
                }

                if state.shutdown {
                    return;
                }

                shared.available.wait(&mut state);
            }
        };

        job();
    }
}

impl Executor for ThreadPool {
    fn post(&self, job: Job) {
        self.shared.state.lock().jobs.push_back(job);
        self.shared.available.notify_one();
    }
}

impl Drop for ThreadPool {
    fn drop(&mut self) {
        self.shared.state.lock().shutdown = true;
        self.shared.available.notify_all();

        let current = thread::current().id();

        for worker in self.workers.drain(..) {
            if worker.thread().id() != current {
                let _ = worker.join();
            }
        }
    }
}

/// Returns `true` when called from a pool worker.
pub fn on_pool_thread() -> bool {
    thread::current().name() == Some(WORKER_NAME)
}

struct ThreadWaker(Thread);

impl Wake for ThreadWaker {
    fn wake(self: Arc<Self>) {
        self.0.unpark();
    }

    fn wake_by_ref(self: &Arc<Self>) {
        self.0.unpark();
    }
}

/// Minimal foreign executor: polls `future` on the current thread, parking
/// between wakeups.
pub fn block_on<F: Future>(future: F) -> F::Output {
    let mut future = pin!(future);
    let waker = Waker::from(Arc::new(ThreadWaker(thread::current())));
    let mut cx = Context::from_waker(&waker);

    loop {
        match future.as_mut().poll(&mut cx) {
            Poll::Ready(output) => return output,
            Poll::Pending => thread::park(),
        }
    }
}
