//! Synchronization primitives for Continua.
//!
//! This module provides async-aware synchronization tools built on the
//! task protocol. They suspend tasks instead of blocking threads:
//! - [`Mutex`], an asynchronous mutual exclusion primitive,
//! - [`Channel`], a bounded FIFO queue between producers and consumers.
//!
//! ## Design notes
//!
//! - The primitives never spawn threads nor schedule anything. A suspended
//!   task is resumed by the task that releases it, on that task's thread
//!   (or on an executor, see [`Mutex::lock_on`]).
//! - Waiters are served in arrival order.
//! - Both are safe to share between threads and tasks using `Arc`.

mod channel;
mod mutex;

pub use channel::{Channel, Pop, Push};
pub use mutex::{LockFuture, Mutex, MutexGuard};
