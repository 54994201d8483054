use crate::runtime::ambient::Ambient;

use std::cell::RefCell;

thread_local! {
    /// Ambient context of the task currently being polled on this thread.
    ///
    /// Installed by the task core around every poll so that deeply nested
    /// code can read it without explicit parameter passing.
    pub(crate) static CURRENT_AMBIENT: RefCell<Option<Ambient>> =
        const { RefCell::new(None) };
}

/// Runs `f` with `ambient` installed as the current ambient context.
///
/// The previous context is restored afterwards, which keeps nested
/// trampolines (a root started from inside another task) isolated from
/// the task that started them.
pub(crate) fn enter_context<R>(ambient: Option<Ambient>, f: impl FnOnce() -> R) -> R {
    CURRENT_AMBIENT.with(|cell| {
        let previous = cell.replace(ambient);

        let out = f();

        cell.replace(previous);

        out
    })
}

/// Returns the ambient context of the task being polled, if any.
pub(crate) fn current_ambient() -> Option<Ambient> {
    CURRENT_AMBIENT.with(|cell| cell.borrow().clone())
}
