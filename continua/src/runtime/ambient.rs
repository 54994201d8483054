//! Chain-scoped ambient context.
//!
//! An ambient context is a single opaque value attached to the root task
//! of a chain, typically a handle that deeply nested code needs (an
//! executor, a connection, a worker pool) but that would be tedious to
//! thread through every call. Every task inherits the context of the task
//! that awaits it, unless it carries one of its own.
//!
//! ```rust,ignore
//! use continua::{Launcher, Task, ambient};
//!
//! let name = Launcher::new()
//!     .ambient(String::from("hello"))
//!     .sync_await(Task::new(async {
//!         ambient::get::<String>().map(|s| s.to_uppercase())
//!     }));
//!
//! assert_eq!(name.as_deref(), Some("HELLO"));
//! ```

use crate::runtime::context::current_ambient;

use std::any::Any;
use std::sync::Arc;

/// Type-erased, shared ambient context.
pub type Ambient = Arc<dyn Any + Send + Sync>;

/// Returns the ambient context of the current task, if it has one.
///
/// Outside of a task this always returns `None`.
pub fn current() -> Option<Ambient> {
    current_ambient()
}

/// Returns the ambient context of the current task as a `C`.
///
/// Returns `None` if the task has no ambient context or if it holds a
/// value of another type.
pub fn get<C>() -> Option<Arc<C>>
where
    C: Any + Send + Sync,
{
    current()?.downcast::<C>().ok()
}
