use super::cell::Continuation;
use super::core::{TaskCore, TaskId};
use crate::error::Outcome;
use crate::runtime::ambient::Ambient;
use crate::runtime::context::current_ambient;
use crate::runtime::detach::{self, Detached};

use std::any::Any;
use std::fmt;
use std::future::IntoFuture;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

/// A lazy, single-owner asynchronous computation.
///
/// A `Task` does nothing until it is started, either by awaiting it from
/// another task (or any future), or by handing it to a driver such as
/// [`detach`](crate::detach) or [`sync_await`](crate::sync_await).
///
/// Awaiting consumes the handle, so a task can be awaited only once. When
/// it completes, the awaiting task is resumed through the trampoline of the
/// completing thread rather than by a nested call, so await chains of any
/// depth run in constant stack space.
///
/// Dropping a `Task` that was never started starts it: the body runs to
/// completion on its own, and a failure it raises is re-raised on the thread
/// that drives it.
///
/// # Examples
///
/// ```rust,ignore
/// fn add(a: u32, b: u32) -> Task<u32> {
///     Task::new(async move { a + b })
/// }
///
/// let sum = continua::sync_await(Task::new(async {
///     add(1, 2).await + add(3, 4).await
/// }));
/// assert_eq!(sum, 10);
/// ```
pub struct Task<T: Send + 'static> {
    /// `None` only once ownership of the core has been handed on.
    core: Option<Arc<TaskCore<T>>>,
}

impl<T: Send + 'static> Task<T> {
    /// Creates a suspended task from a future.
    pub fn new<F>(future: F) -> Self
    where
        F: Future<Output = T> + Send + 'static,
    {
        Self {
            core: Some(Arc::new(TaskCore::new(future))),
        }
    }

    /// Attaches an ambient context to this task.
    ///
    /// The value becomes visible through [`ambient::get`](crate::ambient::get)
    /// in this task and every task it awaits.
    ///
    /// # Panics
    ///
    /// Panics if the task already carries an ambient context.
    pub fn with_ambient<C>(self, value: C) -> Self
    where
        C: Any + Send + Sync,
    {
        self.with_shared_ambient(Arc::new(value))
    }

    /// Attaches an already shared ambient context to this task.
    ///
    /// # Panics
    ///
    /// Panics if the task already carries an ambient context.
    pub fn with_shared_ambient(self, ambient: Ambient) -> Self {
        self.core().set_ambient(ambient);
        self
    }

    /// Returns the identifier of this task.
    pub fn id(&self) -> TaskId {
        self.core().id()
    }

    /// Starts the task as a fire-and-forget chain.
    ///
    /// Shorthand for [`detach`](crate::detach).
    pub fn detach(self) -> Detached {
        detach::detach(self)
    }

    /// Starts the task and reports its outcome to `handler`.
    ///
    /// Shorthand for [`detach_with`](crate::detach_with).
    pub fn detach_with<H>(self, handler: H) -> Detached
    where
        H: FnOnce(Outcome<T>) + Send + 'static,
    {
        detach::detach_with(self, handler)
    }

    /// Awaits the task without re-raising its failure.
    ///
    /// The returned future resolves to the task's [`Outcome`], letting the
    /// awaiting task handle a failure instead of propagating it.
    pub fn catch(self) -> Catch<T> {
        Catch {
            inner: Await::new(self.into_core()),
        }
    }

    fn core(&self) -> &Arc<TaskCore<T>> {
        match &self.core {
            Some(core) => core,
            None => unreachable!("task handle without a core"),
        }
    }

    /// Releases ownership of the core without starting it.
    pub(crate) fn into_core(mut self) -> Arc<TaskCore<T>> {
        match self.core.take() {
            Some(core) => core,
            None => unreachable!("task handle without a core"),
        }
    }
}

impl<T: Send + 'static> Drop for Task<T> {
    fn drop(&mut self) {
        if let Some(core) = self.core.take() {
            core.start(Continuation::Detached);
        }
    }
}

impl<T: Send + 'static> IntoFuture for Task<T> {
    type Output = T;
    type IntoFuture = TaskFuture<T>;

    fn into_future(self) -> Self::IntoFuture {
        TaskFuture {
            inner: Await::new(self.into_core()),
        }
    }
}

impl<T: Send + 'static> fmt::Debug for Task<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Task").field("id", &self.id()).finish()
    }
}

/// Progress of an await on a child task.
enum Stage {
    /// Not polled yet; the child has not started.
    Unstarted,
    /// The child runs with this await registered as its continuation.
    Awaiting,
    /// The outcome has been read.
    Done,
}

/// Shared machinery of [`TaskFuture`] and [`Catch`].
struct Await<T: Send + 'static> {
    core: Arc<TaskCore<T>>,
    stage: Stage,
}

impl<T: Send + 'static> Await<T> {
    fn new(core: Arc<TaskCore<T>>) -> Self {
        Self {
            core,
            stage: Stage::Unstarted,
        }
    }

    fn poll_outcome(&mut self, cx: &mut Context<'_>) -> Poll<Outcome<T>> {
        match self.stage {
            Stage::Unstarted => {
                self.core.inherit_ambient(current_ambient());
                self.core
                    .clone()
                    .start(Continuation::Waker(cx.waker().clone()));
                self.stage = Stage::Awaiting;
            }
            Stage::Awaiting => {}
            Stage::Done => panic!("task {} awaited after completion", self.core.id()),
        }

        // Inside a trampoline the child is only queued, so this is Pending.
        // Outside one it may already have run to completion.
        let polled = self.core.poll_outcome(cx.waker());

        if polled.is_ready() {
            self.stage = Stage::Done;
        }

        polled
    }
}

impl<T: Send + 'static> Drop for Await<T> {
    fn drop(&mut self) {
        match self.stage {
            Stage::Unstarted => self.core.clone().start(Continuation::Detached),
            Stage::Awaiting => self.core.abandon(),
            Stage::Done => {}
        }
    }
}

/// Future returned by awaiting a [`Task`].
///
/// Resolves to the task's value, or re-raises its failure in the awaiting
/// context.
pub struct TaskFuture<T: Send + 'static> {
    inner: Await<T>,
}

impl<T: Send + 'static> Future for TaskFuture<T> {
    type Output = T;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<T> {
        match self.get_mut().inner.poll_outcome(cx) {
            Poll::Ready(Ok(value)) => Poll::Ready(value),
            Poll::Ready(Err(failure)) => failure.resume(),
            Poll::Pending => Poll::Pending,
        }
    }
}

/// Future returned by [`Task::catch`].
pub struct Catch<T: Send + 'static> {
    inner: Await<T>,
}

impl<T: Send + 'static> Future for Catch<T> {
    type Output = Outcome<T>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Outcome<T>> {
        self.get_mut().inner.poll_outcome(cx)
    }
}
