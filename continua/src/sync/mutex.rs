use crate::adapter::Executor;
use crate::utils::Slab;

use std::cell::UnsafeCell;
use std::collections::VecDeque;
use std::future::Future;
use std::marker::PhantomData;
use std::ops::{Deref, DerefMut};
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll, Waker};

use parking_lot::Mutex as StateLock;

/// An asynchronous mutex.
///
/// `Mutex<T>` provides mutual exclusion for async tasks. Unlike a standard
/// `std::sync::Mutex`, this mutex does not block threads when waiting;
/// tasks that cannot acquire the lock are suspended and resumed when the
/// lock is handed to them.
///
/// Waiters are served strictly in arrival order. On unlock, ownership is
/// passed directly to the longest waiter, so the mutex is never observed
/// free while someone is queued.
pub struct Mutex<T> {
    /// Held flag and wait queue.
    ///
    /// Kept under one lock so that a hand-off never leaves a window in
    /// which the mutex looks free.
    state: StateLock<State>,

    /// The underlying data protected by the mutex.
    data: UnsafeCell<T>,
}

struct State {
    held: bool,
    /// Waiter keys in arrival order.
    queue: VecDeque<usize>,
    waiters: Slab<Waiter>,
}

struct Waiter {
    waker: Option<Waker>,
    /// Where to resume the waiter once it is granted the lock.
    executor: Option<Arc<dyn Executor>>,
    granted: bool,
}

// Safety: access to `data` is serialized by the held flag.
unsafe impl<T: Send> Send for Mutex<T> {}
// Safety: see above.
unsafe impl<T: Send> Sync for Mutex<T> {}

impl<T> Mutex<T> {
    /// Creates a new, unlocked mutex wrapping the given value.
    pub fn new(value: T) -> Mutex<T> {
        Self {
            state: StateLock::new(State {
                held: false,
                queue: VecDeque::new(),
                waiters: Slab::new(0),
            }),
            data: UnsafeCell::new(value),
        }
    }

    /// Returns a future that resolves to a guard once the mutex is
    /// acquired.
    ///
    /// This does **not block the thread**. A contended caller is resumed
    /// by whoever unlocks the mutex, on that thread.
    ///
    /// # Example
    /// ```rust,ignore
    /// let mut guard = mutex.lock().await;
    /// *guard += 1;
    /// ```
    pub fn lock(&self) -> LockFuture<'_, T> {
        LockFuture {
            mutex: self,
            executor: None,
            key: None,
        }
    }

    /// Like [`lock`](Self::lock), but a contended caller is resumed on
    /// `executor` instead of on the unlocking thread.
    pub fn lock_on<E>(&self, executor: E) -> LockFuture<'_, T>
    where
        E: Executor + 'static,
    {
        LockFuture {
            mutex: self,
            executor: Some(Arc::new(executor)),
            key: None,
        }
    }

    /// Acquires the mutex if it is free, without waiting.
    pub fn try_lock(&self) -> Option<MutexGuard<'_, T>> {
        let mut state = self.state.lock();

        if state.held {
            return None;
        }

        state.held = true;

        Some(MutexGuard::new(self))
    }

    /// Returns `true` if the mutex is currently held.
    pub fn is_locked(&self) -> bool {
        self.state.lock().held
    }

    /// Returns a mutable reference to the protected value.
    ///
    /// No locking is needed since `&mut self` proves exclusive access.
    pub fn get_mut(&mut self) -> &mut T {
        self.data.get_mut()
    }

    /// Consumes the mutex and returns the protected value.
    pub fn into_inner(self) -> T {
        self.data.into_inner()
    }

    /// Releases the mutex, handing it to the longest waiter if any.
    fn release(&self) {
        let mut state = self.state.lock();

        assert!(state.held, "unlock of a mutex that is not held");

        let Some(key) = state.queue.pop_front() else {
            state.held = false;
            return;
        };

        let Some(waiter) = state.waiters.get_mut(key) else {
            unreachable!("queued mutex waiter {key} is missing");
        };

        waiter.granted = true;

        let waker = waiter.waker.take();
        let executor = waiter.executor.take();

        drop(state);

        tracing::trace!(waiter = key, "mutex handed off");

        match (waker, executor) {
            (Some(waker), Some(executor)) => executor.post(Box::new(move || waker.wake())),
            (Some(waker), None) => waker.wake(),
            (None, _) => {}
        }
    }
}

impl<T: Default> Default for Mutex<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}

impl<T> std::fmt::Debug for Mutex<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.lock();

        f.debug_struct("Mutex")
            .field("held", &state.held)
            .field("waiters", &state.queue.len())
            .finish()
    }
}

/// Future returned by [`Mutex::lock`] and [`Mutex::lock_on`].
///
/// Dropping it while queued removes it from the wait queue. Dropping it
/// after it was granted the lock passes the lock on.
#[must_use = "futures do nothing unless awaited"]
pub struct LockFuture<'a, T> {
    mutex: &'a Mutex<T>,
    executor: Option<Arc<dyn Executor>>,
    /// Slab key while queued.
    key: Option<usize>,
}

impl<'a, T> Future for LockFuture<'a, T> {
    type Output = MutexGuard<'a, T>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = self.get_mut();
        let mutex = this.mutex;
        let mut state = mutex.state.lock();

        let Some(key) = this.key else {
            if !state.held {
                state.held = true;
                return Poll::Ready(MutexGuard::new(mutex));
            }

            let key = state.waiters.insert(Waiter {
                waker: Some(cx.waker().clone()),
                executor: this.executor.take(),
                granted: false,
            });

            state.queue.push_back(key);
            this.key = Some(key);

            return Poll::Pending;
        };

        let Some(waiter) = state.waiters.get_mut(key) else {
            unreachable!("mutex waiter {key} is missing");
        };

        if waiter.granted {
            state.waiters.remove(key);
            this.key = None;

            return Poll::Ready(MutexGuard::new(mutex));
        }

        waiter.waker = Some(cx.waker().clone());

        Poll::Pending
    }
}

impl<T> Drop for LockFuture<'_, T> {
    fn drop(&mut self) {
        let Some(key) = self.key.take() else {
            return;
        };

        let mut state = self.mutex.state.lock();
        let waiter = state.waiters.remove(key);

        if waiter.granted {
            drop(state);
            self.mutex.release();
        } else {
            state.queue.retain(|queued| *queued != key);
        }
    }
}

/// Guard returned by [`Mutex::lock`].
///
/// Releases the mutex when dropped, including while unwinding.
#[must_use = "if unused the Mutex will immediately unlock"]
pub struct MutexGuard<'a, T> {
    mutex: &'a Mutex<T>,
    /// Opts out of the auto traits; see the impls below.
    _marker: PhantomData<*const ()>,
}

// Safety: the guard grants `&mut T`, so moving it to another thread moves
// access to `T` there.
unsafe impl<T: Send> Send for MutexGuard<'_, T> {}
// Safety: a shared guard hands out `&T` on every thread that holds it.
unsafe impl<T: Send + Sync> Sync for MutexGuard<'_, T> {}

impl<'a, T> MutexGuard<'a, T> {
    fn new(mutex: &'a Mutex<T>) -> Self {
        Self {
            mutex,
            _marker: PhantomData,
        }
    }

    /// Releases the mutex now instead of at the end of the scope.
    pub fn unlock(self) {
        drop(self);
    }
}

impl<T> Drop for MutexGuard<'_, T> {
    fn drop(&mut self) {
        self.mutex.release();
    }
}

impl<T> Deref for MutexGuard<'_, T> {
    type Target = T;

    fn deref(&self) -> &Self::Target {
        unsafe { &*self.mutex.data.get() }
    }
}

impl<T> DerefMut for MutexGuard<'_, T> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        unsafe { &mut *self.mutex.data.get() }
    }
}

impl<T: std::fmt::Debug> std::fmt::Debug for MutexGuard<'_, T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        std::fmt::Debug::fmt(&**self, f)
    }
}
