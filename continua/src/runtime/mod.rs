//! Core runtime components.
//!
//! This module contains the machinery that runs task chains:
//! - lazy tasks and their completion protocol,
//! - the per-thread trampoline that keeps the stack flat,
//! - the drivers that start a chain,
//! - the chain-scoped ambient context.
//!
//! There is no scheduler and no thread pool. A chain runs on whichever
//! thread resumes it.

pub(crate) mod builder;
pub(crate) mod context;
pub(crate) mod detach;
pub(crate) mod trampoline;

pub mod ambient;
pub mod task;
