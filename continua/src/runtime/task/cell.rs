use crate::error::{Failure, Outcome};

use std::fmt;
use std::mem;
use std::task::Waker;

/// Completion handler attached by a driver.
pub(crate) type Handler<T> = Box<dyn FnOnce(Outcome<T>) + Send + 'static>;

/// Write-once storage for what a task produced.
pub(crate) enum ResultCell<T> {
    /// The task has not finished, or its outcome was already read.
    Empty,
    Value(T),
    Failure(Failure),
}

impl<T> ResultCell<T> {
    /// Stores the outcome of the task.
    ///
    /// # Panics
    ///
    /// Panics if the cell already holds an outcome.
    pub(crate) fn set(&mut self, outcome: Outcome<T>) {
        assert!(
            matches!(self, Self::Empty),
            "task result cell written twice"
        );

        *self = match outcome {
            Ok(value) => Self::Value(value),
            Err(failure) => Self::Failure(failure),
        };
    }

    /// Moves the outcome out, leaving the cell empty.
    pub(crate) fn take(&mut self) -> Option<Outcome<T>> {
        match mem::replace(self, Self::Empty) {
            Self::Empty => None,
            Self::Value(value) => Some(Ok(value)),
            Self::Failure(failure) => Some(Err(failure)),
        }
    }
}

/// Whoever must be resumed once the task completes.
pub(crate) enum Continuation<T> {
    /// Nobody is waiting. A failure stored with no continuation is re-raised.
    Detached,

    /// An awaiting future, usually another task.
    Waker(Waker),

    /// A driver's completion handler.
    Handler(Handler<T>),
}

impl<T> fmt::Debug for Continuation<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Detached => f.write_str("Detached"),
            Self::Waker(_) => f.write_str("Waker"),
            Self::Handler(_) => f.write_str("Handler"),
        }
    }
}
