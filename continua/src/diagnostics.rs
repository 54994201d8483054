//! Live-task registry for leak hunting.
//!
//! When enabled, every task created afterwards is recorded until its core is
//! freed. A task that stays in [`live_tasks`] after its chain should have
//! finished was leaked: typically suspended on a waker that nobody will
//! ever call.
//!
//! The registry is off by default and costs one relaxed atomic load per
//! task when disabled.

use crate::runtime::task::TaskId;

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::Mutex;

static ENABLED: AtomicBool = AtomicBool::new(false);
static LIVE: Mutex<Option<HashSet<TaskId>>> = Mutex::new(None);

/// Starts recording tasks created from now on.
pub fn enable() {
    let mut live = LIVE.lock();

    if live.is_none() {
        *live = Some(HashSet::new());
    }

    ENABLED.store(true, Ordering::Release);
}

/// Stops recording and forgets every recorded task.
pub fn disable() {
    ENABLED.store(false, Ordering::Release);
    *LIVE.lock() = None;
}

/// Returns `true` if the registry is recording.
pub fn is_enabled() -> bool {
    ENABLED.load(Ordering::Acquire)
}

/// Returns the recorded tasks that are still alive, oldest first.
pub fn live_tasks() -> Vec<TaskId> {
    let mut tasks: Vec<_> = LIVE
        .lock()
        .as_ref()
        .map(|live| live.iter().copied().collect())
        .unwrap_or_default();

    tasks.sort();
    tasks
}

pub(crate) fn track(id: TaskId) {
    if !ENABLED.load(Ordering::Relaxed) {
        return;
    }

    if let Some(live) = LIVE.lock().as_mut() {
        live.insert(id);
    }
}

pub(crate) fn untrack(id: TaskId) {
    if !ENABLED.load(Ordering::Relaxed) {
        return;
    }

    if let Some(live) = LIVE.lock().as_mut() {
        live.remove(&id);
    }
}
