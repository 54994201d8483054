use crate::adapter::callback::{Completion, callback};
use crate::error::{Failure, Outcome};

use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;

/// A unit of work posted to an [`Executor`].
pub type Job = Box<dyn FnOnce() + Send + 'static>;

/// Something that can run jobs: a thread pool, an event loop, a strand.
///
/// The runtime never runs jobs itself. It only hands them to an executor
/// supplied by the caller.
pub trait Executor: Send + Sync {
    /// Schedules `job` to run. It may run inline or on another thread.
    fn post(&self, job: Job);
}

impl<E: Executor + ?Sized> Executor for Arc<E> {
    fn post(&self, job: Job) {
        (**self).post(job);
    }
}

impl<E: Executor + ?Sized> Executor for Box<E> {
    fn post(&self, job: Job) {
        (**self).post(job);
    }
}

impl<E: Executor + ?Sized> Executor for &E {
    fn post(&self, job: Job) {
        (**self).post(job);
    }
}

/// Builds an [`Executor`] out of a closure.
///
/// # Examples
///
/// ```rust,ignore
/// let inline = from_fn(|job| job());
/// ```
pub fn from_fn<F>(f: F) -> FnExecutor<F>
where
    F: Fn(Job) + Send + Sync,
{
    FnExecutor(f)
}

/// Executor returned by [`from_fn`].
#[derive(Clone)]
pub struct FnExecutor<F>(F);

impl<F> Executor for FnExecutor<F>
where
    F: Fn(Job) + Send + Sync,
{
    fn post(&self, job: Job) {
        (self.0)(job);
    }
}

/// Runs `f` on `executor` and resumes with its result.
///
/// The awaiting task continues on the thread that ran `f`. A panic in `f`
/// is re-raised in the awaiting task.
pub async fn run_on<E, F, R>(executor: &E, f: F) -> R
where
    E: Executor + ?Sized,
    F: FnOnce() -> R + Send + 'static,
    R: Send + 'static,
{
    let outcome = callback(|completion: Completion<Outcome<R>>| {
        executor.post(Box::new(move || {
            let outcome = catch_unwind(AssertUnwindSafe(f)).map_err(Failure::from_panic);
            completion.complete(outcome);
        }));
    })
    .await;

    match outcome {
        Ok(value) => value,
        Err(failure) => failure.resume(),
    }
}

/// Moves the rest of the current task onto `executor`.
///
/// Completes as soon as `executor` runs the posted job, so the code after
/// the `.await` runs on the executor's thread.
pub async fn resume_on<E>(executor: &E)
where
    E: Executor + ?Sized,
{
    callback(|completion: Completion<()>| {
        executor.post(Box::new(move || completion.complete(())));
    })
    .await
}
