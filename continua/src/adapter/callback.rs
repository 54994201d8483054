use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::task::{Context, Poll, Waker};

use parking_lot::Mutex;

/// Suspends the current task until an external API delivers a value.
///
/// On first poll, `register` receives a one-shot [`Completion`] to hand
/// to the external API. The API may call [`Completion::complete`] before
/// `register` returns or later from any thread. Whichever of the two sides
/// finishes second resumes the task, so it is resumed exactly once and
/// never from inside `register`.
///
/// # Panics
///
/// The awaiting task fails if the `Completion` is dropped without being
/// invoked.
///
/// # Examples
///
/// ```rust,ignore
/// let len = callback(|done| {
///     legacy_read(path, move |bytes| done.complete(bytes.len()));
/// })
/// .await;
/// ```
pub fn callback<T, F>(register: F) -> Callback<T, F>
where
    T: Send + 'static,
    F: FnOnce(Completion<T>),
{
    Callback {
        register: Some(register),
        shared: None,
    }
}

/// Future returned by [`callback`].
#[must_use = "futures do nothing unless awaited"]
pub struct Callback<T, F> {
    register: Option<F>,
    shared: Option<Arc<Shared<T>>>,
}

// The registrar is only ever moved out by value, never pinned.
impl<T, F> Unpin for Callback<T, F> {}

/// One-shot handle used to resume a task suspended in [`callback`].
pub struct Completion<T> {
    shared: Option<Arc<Shared<T>>>,
}

struct Shared<T> {
    /// Set by whichever side finishes first. The side that finds it
    /// already set performs the resumption.
    resumed: AtomicBool,
    inner: Mutex<Inner<T>>,
}

struct Inner<T> {
    value: Option<T>,
    waker: Option<Waker>,
    abandoned: bool,
}

impl<T> Shared<T> {
    fn take(&self) -> Poll<T> {
        let mut inner = self.inner.lock();

        if let Some(value) = inner.value.take() {
            return Poll::Ready(value);
        }

        if inner.abandoned {
            panic!("completion dropped without being invoked");
        }

        Poll::Pending
    }
}

impl<T, F> Future for Callback<T, F>
where
    T: Send + 'static,
    F: FnOnce(Completion<T>),
{
    type Output = T;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<T> {
        let this = self.get_mut();

        if let Some(shared) = &this.shared {
            let mut inner = shared.inner.lock();

            if inner.value.is_none() && !inner.abandoned {
                inner.waker = Some(cx.waker().clone());
                return Poll::Pending;
            }

            drop(inner);

            return shared.take();
        }

        let Some(register) = this.register.take() else {
            panic!("`Callback` polled after completion");
        };

        let shared = Arc::new(Shared {
            resumed: AtomicBool::new(false),
            inner: Mutex::new(Inner {
                value: None,
                waker: Some(cx.waker().clone()),
                abandoned: false,
            }),
        });

        this.shared = Some(shared.clone());

        register(Completion {
            shared: Some(shared.clone()),
        });

        if shared.resumed.swap(true, Ordering::AcqRel) {
            // Completed inline: resume within this poll, no wake needed.
            return shared.take();
        }

        Poll::Pending
    }
}

impl<T: Send + 'static> Completion<T> {
    /// Delivers `value` to the suspended task.
    pub fn complete(mut self, value: T) {
        if let Some(shared) = self.shared.take() {
            shared.inner.lock().value = Some(value);
            resolve(&shared);
        }
    }
}

impl<T> Drop for Completion<T> {
    fn drop(&mut self) {
        let Some(shared) = self.shared.take() else {
            return;
        };

        tracing::warn!("completion dropped without being invoked");

        shared.inner.lock().abandoned = true;
        resolve(&shared);
    }
}

fn resolve<T>(shared: &Shared<T>) {
    if !shared.resumed.swap(true, Ordering::AcqRel) {
        return;
    }

    let waker = shared.inner.lock().waker.take();

    if let Some(waker) = waker {
        waker.wake();
    }
}

impl<T> std::fmt::Debug for Completion<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Completion")
            .field("pending", &self.shared.is_some())
            .finish()
    }
}
