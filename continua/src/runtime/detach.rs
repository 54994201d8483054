//! Drivers that start a chain of tasks.
//!
//! A chain only runs once something starts its root task. Two drivers are
//! provided:
//! - [`detach`] / [`detach_with`] start the root and return immediately;
//!   the chain then runs wherever its wakeups are delivered.
//! - [`sync_await`] starts the root and blocks the calling thread until it
//!   finishes. It is meant for the outermost entry point only (`main`, a
//!   test, a thread boundary), never for code running inside a task.
//!
//! Both can inject an ambient context through [`Launcher`](crate::Launcher).

use crate::error::{Failure, Outcome};
use crate::runtime::ambient::Ambient;
use crate::runtime::builder::Launcher;
use crate::runtime::task::cell::{Continuation, Handler};
use crate::runtime::task::{Task, TaskId};

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc;

/// Handle to a detached chain.
///
/// The chain runs to completion whether or not this handle is kept.
#[derive(Debug, Clone)]
pub struct Detached {
    id: TaskId,
    finished: Arc<AtomicBool>,
}

impl Detached {
    /// Returns the identifier of the root task.
    pub fn id(&self) -> TaskId {
        self.id
    }

    /// Returns `true` once the root task has completed and its handler,
    /// if any, has returned.
    pub fn is_finished(&self) -> bool {
        self.finished.load(Ordering::Acquire)
    }
}

/// Starts `task` as a fire-and-forget chain.
///
/// The task begins running immediately on the calling thread and continues
/// wherever its wakeups are delivered. A failure it raises is re-raised on
/// the thread driving it when it completes.
pub fn detach<T: Send + 'static>(task: Task<T>) -> Detached {
    Launcher::new().detach(task)
}

/// Starts `task` and calls `handler` exactly once with its outcome.
///
/// # Examples
///
/// ```rust,ignore
/// continua::detach_with(Task::new(async { 6 * 7 }), |outcome| {
///     assert_eq!(outcome.ok(), Some(42));
/// });
/// ```
pub fn detach_with<T, H>(task: Task<T>, handler: H) -> Detached
where
    T: Send + 'static,
    H: FnOnce(Outcome<T>) + Send + 'static,
{
    Launcher::new().detach_with(task, handler)
}

/// Runs `task` to completion, blocking the current thread.
///
/// Returns the task's value, or re-raises its failure on the calling
/// thread.
///
/// # Panics
///
/// Re-raises the task's failure. Also panics if the task is dropped before
/// completing, which happens when every handle able to resume it is gone.
pub fn sync_await<T: Send + 'static>(task: Task<T>) -> T {
    Launcher::new().sync_await(task)
}

/// Starts `task` as the root of a chain.
pub(crate) fn launch<T: Send + 'static>(
    task: Task<T>,
    ambient: Option<Ambient>,
    handler: Option<Handler<T>>,
) -> Detached {
    let core = task.into_core();
    let id = core.id();

    if let Some(ambient) = ambient {
        core.set_ambient(ambient);
    }

    let finished = Arc::new(AtomicBool::new(false));
    let detached = Detached {
        id,
        finished: finished.clone(),
    };

    tracing::debug!(task.id = %id, handled = handler.is_some(), "launching task chain");

    // Without a handler the failure goes back through the trampoline's
    // unhandled-failure path instead of being dropped.
    let continuation = Continuation::Handler(Box::new(move |outcome: Outcome<T>| {
        let unhandled = match handler {
            Some(handler) => {
                handler(outcome);
                None
            }
            None => outcome.err(),
        };

        finished.store(true, Ordering::Release);

        if let Some(failure) = unhandled {
            crate::runtime::trampoline::raise_unhandled(id, failure);
        }
    }));

    core.start_root(continuation);

    detached
}

/// Starts `task` and blocks until its outcome is available.
pub(crate) fn block_on<T: Send + 'static>(task: Task<T>, ambient: Option<Ambient>) -> Outcome<T> {
    let (transmitter, receiver) = mpsc::channel();

    let detached = launch(
        task,
        ambient,
        Some(Box::new(move |outcome: Outcome<T>| {
            let _ = transmitter.send(outcome);
        })),
    );

    if !detached.is_finished() {
        tracing::debug!(task.id = %detached.id(), "blocking until task completes");
    }

    receiver
        .recv()
        .unwrap_or_else(|_| Err(Failure::new("task dropped before completing")))
}
