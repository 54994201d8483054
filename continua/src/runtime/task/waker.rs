use crate::runtime::task::core::TaskCore;

use std::marker::PhantomData;
use std::mem;
use std::sync::Arc;
use std::task::{RawWaker, RawWakerVTable, Waker};

/// Holder of the `RawWakerVTable` for a task producing `T`.
struct VTable<T>(PhantomData<T>);

impl<T: Send + 'static> VTable<T> {
    /// # Safety
    ///
    /// All functions in the vtable must uphold the invariants required
    /// by [`RawWaker`], in particular:
    /// - reference counts must be correctly managed,
    /// - the task must remain valid for the lifetime of the waker.
    const VTABLE: RawWakerVTable = RawWakerVTable::new(
        clone_raw::<T>,
        wake_raw::<T>,
        wake_by_ref_raw::<T>,
        drop_raw::<T>,
    );
}

fn vtable<T: Send + 'static>() -> &'static RawWakerVTable {
    &VTable::<T>::VTABLE
}

/// Creates a [`Waker`] that resumes the given task.
///
/// Waking it queues the task on the trampoline of the waking thread,
/// which is how a completed child hands control back to its parent
/// without nesting a call.
///
/// The pointer stored inside the `RawWaker` originates from
/// `Arc::into_raw` and follows `Arc` reference counting.
pub(crate) fn make_waker<T: Send + 'static>(task: Arc<TaskCore<T>>) -> Waker {
    unsafe {
        Waker::from_raw(RawWaker::new(
            Arc::into_raw(task) as *const (),
            vtable::<T>(),
        ))
    }
}

fn clone_raw<T: Send + 'static>(ptr: *const ()) -> RawWaker {
    let arc = unsafe { Arc::<TaskCore<T>>::from_raw(ptr as *const TaskCore<T>) };
    let cloned = arc.clone();
    mem::forget(arc);

    RawWaker::new(Arc::into_raw(cloned) as *const (), vtable::<T>())
}

fn wake_raw<T: Send + 'static>(ptr: *const ()) {
    let arc = unsafe { Arc::<TaskCore<T>>::from_raw(ptr as *const TaskCore<T>) };
    arc.wake();
}

fn wake_by_ref_raw<T: Send + 'static>(ptr: *const ()) {
    let arc = unsafe { Arc::<TaskCore<T>>::from_raw(ptr as *const TaskCore<T>) };
    arc.clone().wake();
    mem::forget(arc);
}

fn drop_raw<T: Send + 'static>(ptr: *const ()) {
    drop(unsafe { Arc::<TaskCore<T>>::from_raw(ptr as *const TaskCore<T>) });
}
