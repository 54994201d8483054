//! # Continua
//!
//! **Continua** is a minimal task runtime for Rust: lazy, single-owner
//! tasks that resume whoever awaits them, and nothing else.
//!
//! Unlike general-purpose runtimes like Tokio or async-std, Continua ships
//! no scheduler, no thread pool, and no reactor. A task runs on whichever
//! thread resumes it: the thread that starts the chain, a thread pool that
//! finishes a job, or the callback of some foreign event loop. Continua only
//! defines how tasks hand control to each other, which makes it a thin glue
//! layer for driving callback-based or executor-based APIs with straight-line
//! `async` code.
//!
//! It offers:
//!
//! - **Lazy tasks** ([`Task`]) whose await chains run in constant stack space,
//!   however deep they get
//! - **Drivers** that start a chain: [`detach`], [`detach_with`], and
//!   [`sync_await`], configurable through [`Launcher`]
//! - **Chain-scoped ambient context** readable anywhere via [`ambient::get`]
//! - **Adapters** for callback-based APIs and executors in [`adapter`]
//! - **Async [`Mutex`](sync::Mutex) and bounded [`Channel`](sync::Channel)**
//!   with FIFO fairness
//! - **Entry-point macros** `#[continua::main]` and `#[continua::test]`
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use continua::Task;
//!
//! fn fib(n: u64) -> Task<u64> {
//!     Task::new(async move {
//!         if n < 2 {
//!             return n;
//!         }
//!
//!         fib(n - 1).await + fib(n - 2).await
//!     })
//! }
//!
//! #[continua::main]
//! async fn main() {
//!     println!("fib(20) = {}", fib(20).await);
//! }
//! ```
//!
//! ## Failures
//!
//! A panic inside a task is captured and re-raised where the task is
//! awaited, one level at a time, up to [`sync_await`] or the handler given
//! to [`detach_with`]. Use [`Task::catch`] to handle it instead.
//!
//! ## Modules
//!
//! - [`adapter`]: callback and executor bridges
//! - [`ambient`]: chain-scoped ambient context
//! - [`diagnostics`]: live-task registry for leak hunting
//! - [`error`]: failure types
//! - [`sync`]: mutex and channel
//! - [`task`]: the task handle and its futures

mod runtime;
mod utils;

pub mod adapter;
pub mod diagnostics;
pub mod error;
pub mod sync;

pub use error::{Failure, Outcome, TryPushError};
pub use runtime::ambient;
pub use runtime::builder::Launcher;
pub use runtime::detach::{Detached, detach, detach_with, sync_await};
pub use runtime::task;
pub use runtime::task::{Catch, Task, TaskFuture, TaskId};

pub use continua_macros::{main, test};
