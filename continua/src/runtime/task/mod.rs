//! Task primitives.
//!
//! This module defines the lazy [`Task`] handle and the machinery behind
//! it:
//! - the task state machine and its shared core,
//! - the write-once result cell and the continuation slot,
//! - the custom waker that routes resumption through the trampoline,
//! - the futures produced by awaiting a task.
//!
//! Most users only touch [`Task::new`], `.await`, and the drivers in
//! [`crate::detach`] / [`crate::sync_await`].

pub(crate) mod cell;
pub(crate) mod core;
pub(crate) mod handle;
pub(crate) mod state;
pub(crate) mod waker;

pub use core::TaskId;
pub use handle::{Catch, Task, TaskFuture};
