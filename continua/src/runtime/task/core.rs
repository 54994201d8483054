use super::cell::{Continuation, ResultCell};
use super::state::{COMPLETED, IDLE, NOTIFIED, QUEUED, RUNNING};
use crate::diagnostics;
use crate::error::{Failure, Outcome};
use crate::runtime::ambient::Ambient;
use crate::runtime::context::enter_context;
use crate::runtime::task::waker::make_waker;
use crate::runtime::trampoline::{self, Runnable};

use parking_lot::Mutex;
use std::cell::UnsafeCell;
use std::fmt;
use std::mem;
use std::panic::{self, AssertUnwindSafe};
use std::pin::Pin;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, OnceLock};
use std::task::{Context, Poll, Waker};

/// Process-unique identifier of a task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TaskId(u64);

impl TaskId {
    fn next() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(1);
        Self(NEXT.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Outcome and continuation, guarded together so that completion and
/// registration of an awaiter can never miss each other.
struct Slot<T> {
    result: ResultCell<T>,
    continuation: Continuation<T>,
}

/// The shared body of a task.
///
/// `TaskCore` owns the future, the result cell, the continuation slot and
/// the ambient context. It is reference-counted: the owning
/// [`Task`](super::Task) handle, the awaiting [`TaskFuture`](super::TaskFuture)
/// and every waker created for it hold one reference each.
pub(crate) struct TaskCore<T> {
    id: TaskId,

    /// The task body.
    ///
    /// Only touched while the task is `RUNNING`, which grants exclusive
    /// access. Cleared as soon as the body finishes so captured resources
    /// are released before the continuation runs.
    future: UnsafeCell<Option<Pin<Box<dyn Future<Output = T> + Send>>>>,

    /// Lifecycle state (IDLE, QUEUED, RUNNING, NOTIFIED, COMPLETED).
    state: AtomicUsize,

    slot: Mutex<Slot<T>>,

    /// Write-once ambient context, set by a driver or inherited from the
    /// awaiting task.
    ambient: OnceLock<Ambient>,
}

// Safety: the future cell is only accessed by the thread that won the
// transition to RUNNING; every other field is synchronized.
unsafe impl<T: Send> Sync for TaskCore<T> {}

impl<T: Send + 'static> TaskCore<T> {
    /// Creates a suspended task that will run `future` once started.
    pub(crate) fn new<F>(future: F) -> Self
    where
        F: Future<Output = T> + Send + 'static,
    {
        let id = TaskId::next();
        diagnostics::track(id);
        tracing::trace!(task.id = %id, "task created");

        Self {
            id,
            future: UnsafeCell::new(Some(Box::pin(future))),
            state: AtomicUsize::new(IDLE),
            slot: Mutex::new(Slot {
                result: ResultCell::Empty,
                continuation: Continuation::Detached,
            }),
            ambient: OnceLock::new(),
        }
    }

    pub(crate) fn id(&self) -> TaskId {
        self.id
    }

    /// Attaches the ambient context of this task.
    ///
    /// # Panics
    ///
    /// Panics if the task already has one.
    pub(crate) fn set_ambient(&self, ambient: Ambient) {
        if self.ambient.set(ambient).is_err() {
            panic!("ambient context already set for task {}", self.id);
        }
    }

    /// Adopts the awaiting task's ambient context unless this task has its own.
    pub(crate) fn inherit_ambient(&self, ambient: Option<Ambient>) {
        if let Some(ambient) = ambient {
            let _ = self.ambient.set(ambient);
        }
    }

    /// Registers the continuation and moves the task from IDLE to QUEUED.
    ///
    /// The caller is responsible for handing the task to a trampoline
    /// afterwards (see [`start`](Self::start) and [`start_root`](Self::start_root)).
    fn arm(&self, continuation: Continuation<T>) {
        self.slot.lock().continuation = continuation;

        let armed = self
            .state
            .compare_exchange(IDLE, QUEUED, Ordering::AcqRel, Ordering::Acquire)
            .is_ok();

        assert!(armed, "task {} started twice", self.id);
    }

    /// Starts the task on the trampoline active on this thread, or on a new
    /// one if none is running.
    pub(crate) fn start(self: Arc<Self>, continuation: Continuation<T>) {
        self.arm(continuation);
        trampoline::schedule(self);
    }

    /// Starts the task as the root of a chain, on a fresh trampoline nested
    /// inside whatever is running on this thread.
    pub(crate) fn start_root(self: Arc<Self>, continuation: Continuation<T>) {
        self.arm(continuation);
        trampoline::drive(self);
    }

    /// Polls the task body once.
    ///
    /// Transitions to `RUNNING`, polls the future with the task's ambient
    /// context installed, and then:
    /// - `Poll::Pending`: returns to `IDLE`, or re-queues if woken meanwhile.
    /// - `Poll::Ready` or a panic: stores the outcome and resumes the continuation.
    pub(crate) fn run(self: Arc<Self>) {
        let current = self.state.load(Ordering::Acquire);

        if current != QUEUED && current != NOTIFIED {
            return;
        }

        if self
            .state
            .compare_exchange(current, RUNNING, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return;
        }

        let waker = make_waker(self.clone());
        let mut cx = Context::from_waker(&waker);

        // Safety: the RUNNING state guarantees no other thread touches the future.
        let future = unsafe { &mut *self.future.get() };

        let Some(body) = future.as_mut() else {
            return;
        };

        let polled = enter_context(self.ambient.get().cloned(), || {
            panic::catch_unwind(AssertUnwindSafe(|| body.as_mut().poll(&mut cx)))
        });

        match polled {
            Ok(Poll::Pending) => {
                if self
                    .state
                    .compare_exchange(RUNNING, IDLE, Ordering::AcqRel, Ordering::Acquire)
                    .is_err()
                {
                    // Woken while running: go around once more.
                    self.state.store(QUEUED, Ordering::Release);
                    trampoline::schedule(self.clone());
                }
            }
            Ok(Poll::Ready(value)) => {
                *future = None;
                self.complete(Ok(value));
            }
            Err(payload) => {
                *future = None;
                self.complete(Err(Failure::from_panic(payload)));
            }
        }
    }

    /// Stores the outcome and hands control to the continuation.
    ///
    /// A waker continuation is woken, which queues the awaiting task on the
    /// current trampoline instead of polling it from here.
    fn complete(&self, outcome: Outcome<T>) {
        tracing::trace!(task.id = %self.id, failed = outcome.is_err(), "task completed");

        let (continuation, unread) = {
            let mut slot = self.slot.lock();

            slot.result.set(outcome);
            self.state.store(COMPLETED, Ordering::Release);

            let continuation = mem::replace(&mut slot.continuation, Continuation::Detached);
            let unread = match continuation {
                Continuation::Waker(_) => None,
                _ => slot.result.take(),
            };

            (continuation, unread)
        };

        match continuation {
            Continuation::Waker(waker) => waker.wake(),
            Continuation::Handler(handler) => {
                let Some(outcome) = unread else {
                    return;
                };

                if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(|| handler(outcome))) {
                    trampoline::raise_unhandled(self.id, Failure::from_panic(payload));
                }
            }
            Continuation::Detached => {
                if let Some(Err(failure)) = unread {
                    trampoline::raise_unhandled(self.id, failure);
                }
            }
        }
    }

    /// Reads the outcome if the task has completed, or registers `waker` to
    /// be woken when it does.
    ///
    /// # Panics
    ///
    /// Panics if the outcome was already read.
    pub(crate) fn poll_outcome(&self, waker: &Waker) -> Poll<Outcome<T>> {
        let mut slot = self.slot.lock();

        if self.state.load(Ordering::Acquire) == COMPLETED {
            return match slot.result.take() {
                Some(outcome) => Poll::Ready(outcome),
                None => panic!("result of task {} already taken", self.id),
            };
        }

        match &mut slot.continuation {
            Continuation::Waker(current) if current.will_wake(waker) => {}
            continuation => *continuation = Continuation::Waker(waker.clone()),
        }

        Poll::Pending
    }

    /// Gives up on the outcome of a started task.
    ///
    /// If the task already finished with a failure that nobody read, the
    /// failure is re-raised now; otherwise the task keeps running detached
    /// and re-raises on completion.
    pub(crate) fn abandon(&self) {
        let unread = {
            let mut slot = self.slot.lock();

            if self.state.load(Ordering::Acquire) == COMPLETED {
                slot.result.take()
            } else {
                slot.continuation = Continuation::Detached;
                None
            }
        };

        if let Some(Err(failure)) = unread {
            trampoline::raise_unhandled(self.id, failure);
        }
    }

    /// Signals the task to be resumed.
    ///
    /// If the task is `IDLE`, it moves to `QUEUED` and is handed to the
    /// trampoline. If the task is `RUNNING`, it moves to `NOTIFIED` so it is
    /// polled again right after the current poll.
    pub(crate) fn wake(self: Arc<Self>) {
        loop {
            let state = self.state.load(Ordering::Acquire);

            match state {
                IDLE => {
                    if self
                        .state
                        .compare_exchange(IDLE, QUEUED, Ordering::AcqRel, Ordering::Acquire)
                        .is_ok()
                    {
                        trampoline::schedule(self);
                        return;
                    }
                }
                RUNNING => {
                    if self
                        .state
                        .compare_exchange(RUNNING, NOTIFIED, Ordering::AcqRel, Ordering::Acquire)
                        .is_ok()
                    {
                        return;
                    }
                }
                // Already queued, notified, or finished: nothing to do.
                _ => return,
            }
        }
    }
}

impl<T> Drop for TaskCore<T> {
    fn drop(&mut self) {
        diagnostics::untrack(self.id);
    }
}

impl<T: Send + 'static> Runnable for TaskCore<T> {
    fn run(self: Arc<Self>) {
        TaskCore::run(self)
    }
}
