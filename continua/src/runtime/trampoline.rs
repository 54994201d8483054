//! Per-thread trampoline.
//!
//! Resuming a task never polls it from inside the code that resumed it.
//! Instead the task is pushed onto the run queue of the trampoline active
//! on the current thread, and the trampoline loop polls it once the
//! current poll has returned. A completed child therefore hands control to
//! its parent as a tail hand-off, and the native stack stays flat no matter
//! how deep the await chain is.
//!
//! A thread with no active trampoline opens one on the first wake it
//! receives, so an external executor that resumes a task simply runs the
//! chain on its own thread until the chain suspends again.

use crate::error::Failure;
use crate::runtime::task::TaskId;

use std::cell::RefCell;
use std::collections::VecDeque;
use std::sync::Arc;

/// A unit of work the trampoline can poll.
///
/// Abstracts the output type of a task so that a single queue can hold
/// `Arc<dyn Runnable>` for every kind of task.
pub(crate) trait Runnable: Send + Sync {
    /// Polls the task once.
    fn run(self: Arc<Self>);
}

/// State of one trampoline loop.
struct Trampoline {
    /// Tasks woken while this loop is active, in wake order.
    queue: VecDeque<Arc<dyn Runnable>>,

    /// Failures that no continuation will ever read. The first one is
    /// re-raised once the queue has drained.
    unhandled: Vec<(TaskId, Failure)>,
}

impl Trampoline {
    fn new() -> Self {
        Self {
            queue: VecDeque::new(),
            unhandled: Vec::new(),
        }
    }
}

thread_local! {
    /// The innermost trampoline running on this thread, if any.
    static ACTIVE: RefCell<Option<Trampoline>> = const { RefCell::new(None) };
}

/// Queues `task` on the active trampoline, or runs a new trampoline for it
/// when none is active on this thread.
pub(crate) fn schedule(task: Arc<dyn Runnable>) {
    let idle = ACTIVE.with(|cell| match cell.borrow_mut().as_mut() {
        Some(trampoline) => {
            trampoline.queue.push_back(task);
            None
        }
        None => Some(task),
    });

    if let Some(task) = idle {
        drive(task);
    }
}

/// Runs `task` on a fresh trampoline until its queue is empty.
///
/// Any trampoline already active on this thread is set aside for the
/// duration and restored afterwards. Once the queue drains, the first
/// unhandled failure collected during the run is re-raised.
pub(crate) fn drive(task: Arc<dyn Runnable>) {
    let previous = ACTIVE.with(|cell| cell.replace(Some(Trampoline::new())));
    let nested = previous.is_some();
    let guard = Restore {
        previous: Some(previous),
    };

    tracing::trace!(nested, "trampoline opened");

    task.run();

    while let Some(next) = ACTIVE.with(|cell| {
        cell.borrow_mut()
            .as_mut()
            .and_then(|trampoline| trampoline.queue.pop_front())
    }) {
        next.run();
    }

    let finished = guard.finish();

    tracing::trace!(nested, "trampoline closed");

    let mut unhandled = finished.unhandled.into_iter();

    if let Some((id, failure)) = unhandled.next() {
        for (other, dropped) in unhandled {
            tracing::error!(task.id = %other, failure = %dropped, "unhandled task failure discarded");
        }

        tracing::error!(task.id = %id, %failure, "re-raising unhandled task failure");
        failure.resume();
    }
}

/// Surfaces a failure that no continuation will read.
///
/// Inside a trampoline the failure is deferred until the loop drains, so
/// the tasks still queued get to run. Outside one it is re-raised at once.
pub(crate) fn raise_unhandled(id: TaskId, failure: Failure) {
    let deferred = ACTIVE.with(|cell| match cell.borrow_mut().as_mut() {
        Some(trampoline) => {
            trampoline.unhandled.push((id, failure));
            None
        }
        None => Some(failure),
    });

    if let Some(failure) = deferred {
        tracing::error!(task.id = %id, %failure, "re-raising unhandled task failure");
        failure.resume();
    }
}

/// Puts the enclosing trampoline back in place, even when unwinding.
struct Restore {
    previous: Option<Option<Trampoline>>,
}

impl Restore {
    /// Restores the enclosing trampoline and returns the one that just ran.
    fn finish(mut self) -> Trampoline {
        let previous = self.previous.take().flatten();

        ACTIVE
            .with(|cell| cell.replace(previous))
            .unwrap_or_else(Trampoline::new)
    }
}

impl Drop for Restore {
    fn drop(&mut self) {
        let Some(previous) = self.previous.take() else {
            return;
        };

        let abandoned = ACTIVE.with(|cell| cell.replace(previous));

        // Only reachable while unwinding out of the loop. Hand queued tasks
        // to the enclosing trampoline so they are not lost.
        if let Some(abandoned) = abandoned {
            if abandoned.queue.is_empty() {
                return;
            }

            let moved = ACTIVE.with(|cell| match cell.borrow_mut().as_mut() {
                Some(outer) => {
                    outer.queue.extend(abandoned.queue.iter().cloned());
                    true
                }
                None => false,
            });

            if !moved {
                tracing::error!(
                    queued = abandoned.queue.len(),
                    "trampoline unwound with tasks still queued"
                );
            }
        }
    }
}
