use crate::error::Outcome;
use crate::runtime::ambient::Ambient;
use crate::runtime::detach::{self, Detached};
use crate::runtime::task::Task;

use std::any::Any;
use std::sync::Arc;

/// Builder for configuring how a chain of tasks is started.
///
/// `Launcher` carries the options a root task is started with. It currently
/// supports injecting an ambient context, which every task of the chain can
/// then read through [`ambient::get`](crate::ambient::get).
///
/// # Examples
///
/// ```rust,ignore
/// let answer = Launcher::new()
///     .ambient(Settings::default())
///     .sync_await(Task::new(async { 42 }));
/// ```
#[derive(Clone, Default)]
pub struct Launcher {
    /// Ambient context attached to the root task.
    ambient: Option<Ambient>,
}

impl Launcher {
    /// Creates a new `Launcher` with no ambient context.
    pub fn new() -> Self {
        Self { ambient: None }
    }

    /// Attaches `context` to the root task as its ambient context.
    ///
    /// # Panics
    ///
    /// Starting a task that already carries an ambient context panics.
    pub fn ambient<C>(self, context: C) -> Self
    where
        C: Any + Send + Sync,
    {
        self.shared_ambient(Arc::new(context))
    }

    /// Attaches an already shared ambient context to the root task.
    pub fn shared_ambient(mut self, ambient: Ambient) -> Self {
        self.ambient = Some(ambient);
        self
    }

    /// Starts `task` as a fire-and-forget chain.
    ///
    /// See [`crate::detach`].
    pub fn detach<T: Send + 'static>(self, task: Task<T>) -> Detached {
        detach::launch(task, self.ambient, None)
    }

    /// Starts `task` and calls `handler` exactly once with its outcome.
    ///
    /// See [`crate::detach_with`].
    pub fn detach_with<T, H>(self, task: Task<T>, handler: H) -> Detached
    where
        T: Send + 'static,
        H: FnOnce(Outcome<T>) + Send + 'static,
    {
        detach::launch(task, self.ambient, Some(Box::new(handler)))
    }

    /// Runs `task` to completion on the current thread and returns its
    /// value.
    ///
    /// # Panics
    ///
    /// Re-raises the task's failure on the calling thread.
    pub fn sync_await<T: Send + 'static>(self, task: Task<T>) -> T {
        match detach::block_on(task, self.ambient) {
            Ok(value) => value,
            Err(failure) => failure.resume(),
        }
    }

    /// Runs `task` to completion on the current thread and returns its
    /// outcome, without re-raising a failure.
    pub fn try_sync_await<T: Send + 'static>(self, task: Task<T>) -> Outcome<T> {
        detach::block_on(task, self.ambient)
    }
}

impl std::fmt::Debug for Launcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Launcher")
            .field("ambient", &self.ambient.is_some())
            .finish()
    }
}
