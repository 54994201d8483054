/// Task is idle and not scheduled.
///
/// Either it has not been started yet, or it is suspended waiting for
/// whatever it registered its waker with.
pub(crate) const IDLE: usize = 0;

/// Task is queued on a trampoline.
///
/// It has been started or woken and waits to be polled.
pub(crate) const QUEUED: usize = 1;

/// Task is currently being polled.
///
/// At most one thread may observe this state at a time.
pub(crate) const RUNNING: usize = 2;

/// Task has completed.
///
/// The body returned or panicked and will not be polled again.
pub(crate) const COMPLETED: usize = 3;

/// Task has been woken while running.
///
/// It must be re-queued once the current poll returns.
pub(crate) const NOTIFIED: usize = 4;
