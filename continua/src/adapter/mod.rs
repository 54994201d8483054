//! Bridges between tasks and the outside world.
//!
//! The runtime never spawns threads nor polls I/O. Everything that makes a
//! task wait comes from outside through one of these adapters:
//! - [`callback`] suspends until a callback-based API calls its
//!   [`Completion`],
//! - [`run_on`] runs a closure on an [`Executor`] and resumes with its
//!   result,
//! - [`resume_on`] moves the rest of a task onto an [`Executor`].

mod callback;
mod executor;

pub use callback::{Callback, Completion, callback};
pub use executor::{Executor, FnExecutor, Job, from_fn, resume_on, run_on};
