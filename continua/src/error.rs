//! Error types surfaced by the runtime.
//!
//! A task never returns an error type of its own: it produces a `T`. Faults
//! raised while a task runs are captured as a [`Failure`] and travel through
//! the same channel as values, one level per await.

use std::any::Any;
use std::fmt;
use std::panic;

use thiserror::Error;

/// The result of a finished task: its value, or the failure it raised.
pub type Outcome<T> = Result<T, Failure>;

/// A fault captured from a task body or from an external operation.
///
/// The original panic payload is preserved so that [`Failure::resume`]
/// re-raises exactly what the task body raised.
#[derive(Error)]
#[error("task failed: {message}")]
pub struct Failure {
    message: String,
    payload: Box<dyn Any + Send + 'static>,
}

impl Failure {
    /// Creates a failure carrying `message` as its payload.
    pub fn new(message: impl Into<String>) -> Self {
        let message = message.into();

        Self {
            payload: Box::new(message.clone()),
            message,
        }
    }

    /// Wraps a payload obtained from [`std::panic::catch_unwind`].
    pub(crate) fn from_panic(payload: Box<dyn Any + Send + 'static>) -> Self {
        let message = if let Some(s) = payload.downcast_ref::<&'static str>() {
            (*s).to_owned()
        } else if let Some(s) = payload.downcast_ref::<String>() {
            s.clone()
        } else {
            String::from("opaque panic payload")
        };

        Self { message, payload }
    }

    /// Returns the human-readable message extracted from the payload.
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Attempts to view the payload as a concrete type.
    pub fn downcast_ref<E: Any>(&self) -> Option<&E> {
        self.payload.downcast_ref::<E>()
    }

    /// Consumes the failure and returns the raw payload.
    pub fn into_payload(self) -> Box<dyn Any + Send + 'static> {
        self.payload
    }

    /// Re-raises the failure on the current thread.
    pub fn resume(self) -> ! {
        panic::resume_unwind(self.payload)
    }
}

impl fmt::Debug for Failure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Failure")
            .field("message", &self.message)
            .finish_non_exhaustive()
    }
}

/// Error returned by [`Channel::try_push`](crate::sync::Channel::try_push).
#[derive(Error, Debug, PartialEq, Eq)]
pub enum TryPushError<T> {
    /// The channel is at capacity; the rejected value is handed back.
    #[error("channel is at capacity")]
    Full(T),
}

impl<T> TryPushError<T> {
    /// Returns the value that could not be pushed.
    pub fn into_inner(self) -> T {
        match self {
            Self::Full(value) => value,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn message_from_str_payload() {
        let failure = Failure::from_panic(Box::new("boom"));
        assert_eq!(failure.message(), "boom");
        assert_eq!(failure.to_string(), "task failed: boom");
    }

    #[test]
    fn message_from_string_payload() {
        let failure = Failure::from_panic(Box::new(String::from("formatted 7")));
        assert_eq!(failure.message(), "formatted 7");
        assert_eq!(failure.downcast_ref::<String>().map(String::as_str), Some("formatted 7"));
    }

    #[test]
    fn opaque_payload_keeps_original_value() {
        let failure = Failure::from_panic(Box::new(42_u32));
        assert_eq!(failure.message(), "opaque panic payload");
        assert_eq!(failure.downcast_ref::<u32>(), Some(&42));
    }

    #[test]
    fn resume_reraises_payload() {
        let failure = Failure::new("again");
        let caught = panic::catch_unwind(panic::AssertUnwindSafe(|| failure.resume()));
        let payload = caught.expect_err("resume must unwind");
        assert_eq!(payload.downcast_ref::<String>().map(String::as_str), Some("again"));
    }
}
