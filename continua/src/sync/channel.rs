use crate::error::TryPushError;
use crate::utils::Slab;

use std::collections::VecDeque;
use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll, Waker};

use parking_lot::Mutex;

/// A bounded FIFO channel between tasks.
///
/// `push` suspends while the channel is full and `pop` suspends while it
/// is empty. Suspended producers and consumers are served in arrival order:
/// a value pushed while consumers wait goes straight to the longest
/// waiting one, and a pop from a full channel admits the longest waiting
/// producer's value into the freed slot.
///
/// The channel is shared by reference (usually behind an `Arc`). It is
/// `Send + Sync` whenever `T: Send`.
///
/// # Examples
///
/// ```rust,ignore
/// let channel = Arc::new(Channel::new(1));
///
/// let producer = channel.clone();
/// continua::detach(Task::new(async move {
///     for i in 0..3 {
///         producer.push(i).await;
///     }
/// }));
///
/// assert_eq!(channel.pop().await, 0);
/// ```
pub struct Channel<T> {
    capacity: usize,
    state: Mutex<State<T>>,
}

struct State<T> {
    buffer: VecDeque<T>,

    /// Keys of suspended consumers, oldest first.
    consumers: VecDeque<usize>,
    consumer_slots: Slab<Consumer<T>>,

    /// Keys of suspended producers, oldest first.
    producers: VecDeque<usize>,
    producer_slots: Slab<Producer<T>>,
}

struct Consumer<T> {
    waker: Option<Waker>,
    /// Value handed over directly by a producer.
    delivered: Option<T>,
}

struct Producer<T> {
    waker: Option<Waker>,
    /// Value still waiting for a free slot. `None` once admitted.
    pending: Option<T>,
    /// Set for a value evicted from a full buffer rather than pushed by a
    /// waiting `Push`. Its slot is freed on admission.
    evicted: bool,
}

fn wake(waker: Option<Waker>) {
    if let Some(waker) = waker {
        waker.wake();
    }
}

impl<T> State<T> {
    /// Hands `value` to the longest waiting consumer, or gives it back.
    fn deliver(&mut self, value: T) -> Result<Option<Waker>, T> {
        let Some(key) = self.consumers.pop_front() else {
            return Err(value);
        };

        let Some(consumer) = self.consumer_slots.get_mut(key) else {
            unreachable!("queued consumer {key} is missing");
        };

        consumer.delivered = Some(value);

        Ok(consumer.waker.take())
    }

    /// Moves the longest waiting producer's value into the buffer.
    fn admit(&mut self) -> Option<Waker> {
        let key = self.producers.pop_front()?;

        let Some(producer) = self.producer_slots.get_mut(key) else {
            unreachable!("queued producer {key} is missing");
        };

        let value = producer.pending.take();
        let waker = producer.waker.take();

        if producer.evicted {
            self.producer_slots.remove(key);
        }

        if let Some(value) = value {
            self.buffer.push_back(value);
        }

        waker
    }
}

impl<T> Channel<T> {
    /// Creates a channel holding at most `capacity` values.
    ///
    /// # Panics
    ///
    /// Panics if `capacity == 0`.
    pub fn new(capacity: usize) -> Self {
        assert!(capacity > 0, "channel capacity must be > 0");

        Self {
            capacity,
            state: Mutex::new(State {
                buffer: VecDeque::with_capacity(capacity),
                consumers: VecDeque::new(),
                consumer_slots: Slab::new(0),
                producers: VecDeque::new(),
                producer_slots: Slab::new(0),
            }),
        }
    }

    /// Sends `value`, waiting while the channel is full.
    pub fn push(&self, value: T) -> Push<'_, T> {
        Push {
            channel: self,
            value: Some(value),
            key: None,
        }
    }

    /// Receives the oldest value, waiting while the channel is empty.
    pub fn pop(&self) -> Pop<'_, T> {
        Pop {
            channel: self,
            key: None,
        }
    }

    /// Sends `value` if there is room, without waiting.
    pub fn try_push(&self, value: T) -> Result<(), TryPushError<T>> {
        let mut state = self.state.lock();

        match state.deliver(value) {
            Ok(waker) => {
                drop(state);
                wake(waker);
                Ok(())
            }
            Err(value) if state.buffer.len() < self.capacity => {
                state.buffer.push_back(value);
                Ok(())
            }
            Err(value) => Err(TryPushError::Full(value)),
        }
    }

    /// Receives the oldest value if there is one, without waiting.
    pub fn try_pop(&self) -> Option<T> {
        let mut state = self.state.lock();

        let value = state.buffer.pop_front()?;
        let waker = state.admit();

        drop(state);
        wake(waker);

        Some(value)
    }

    /// Number of values currently buffered.
    pub fn len(&self) -> usize {
        self.state.lock().buffer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Maximum number of buffered values.
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl<T> std::fmt::Debug for Channel<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.lock();

        f.debug_struct("Channel")
            .field("capacity", &self.capacity)
            .field("len", &state.buffer.len())
            .field("producers", &state.producers.len())
            .field("consumers", &state.consumers.len())
            .finish()
    }
}

/// Future returned by [`Channel::push`].
///
/// Dropping it before its value was admitted withdraws the value.
#[must_use = "futures do nothing unless awaited"]
pub struct Push<'a, T> {
    channel: &'a Channel<T>,
    value: Option<T>,
    key: Option<usize>,
}

impl<T> Unpin for Push<'_, T> {}

impl<T> Future for Push<'_, T> {
    type Output = ();

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<()> {
        let this = self.get_mut();
        let channel = this.channel;
        let mut state = channel.state.lock();

        if let Some(key) = this.key {
            let Some(producer) = state.producer_slots.get_mut(key) else {
                unreachable!("producer {key} is missing");
            };

            if producer.pending.is_some() {
                producer.waker = Some(cx.waker().clone());
                return Poll::Pending;
            }

            state.producer_slots.remove(key);
            this.key = None;

            return Poll::Ready(());
        }

        let Some(value) = this.value.take() else {
            panic!("`Push` polled after completion");
        };

        match state.deliver(value) {
            Ok(waker) => {
                drop(state);
                wake(waker);
                Poll::Ready(())
            }
            Err(value) if state.buffer.len() < channel.capacity => {
                state.buffer.push_back(value);
                Poll::Ready(())
            }
            Err(value) => {
                let key = state.producer_slots.insert(Producer {
                    waker: Some(cx.waker().clone()),
                    pending: Some(value),
                    evicted: false,
                });

                state.producers.push_back(key);
                this.key = Some(key);

                Poll::Pending
            }
        }
    }
}

impl<T> Drop for Push<'_, T> {
    fn drop(&mut self) {
        let Some(key) = self.key.take() else {
            return;
        };

        let mut state = self.channel.state.lock();
        let producer = state.producer_slots.remove(key);

        if producer.pending.is_some() {
            state.producers.retain(|queued| *queued != key);
        }
    }
}

/// Future returned by [`Channel::pop`].
///
/// Dropping it after a value was handed to it puts the value back at the
/// front of the channel. If the channel filled up meanwhile, its newest
/// value is moved ahead of the suspended producers to stay within capacity.
#[must_use = "futures do nothing unless awaited"]
pub struct Pop<'a, T> {
    channel: &'a Channel<T>,
    key: Option<usize>,
}

impl<T> Future for Pop<'_, T> {
    type Output = T;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<T> {
        let this = self.get_mut();
        let mut state = this.channel.state.lock();

        if let Some(key) = this.key {
            let Some(consumer) = state.consumer_slots.get_mut(key) else {
                unreachable!("consumer {key} is missing");
            };

            if consumer.delivered.is_none() {
                consumer.waker = Some(cx.waker().clone());
                return Poll::Pending;
            }

            let consumer = state.consumer_slots.remove(key);
            this.key = None;

            return match consumer.delivered {
                Some(value) => Poll::Ready(value),
                None => unreachable!("consumer {key} lost its value"),
            };
        }

        if let Some(value) = state.buffer.pop_front() {
            let waker = state.admit();

            drop(state);
            wake(waker);

            return Poll::Ready(value);
        }

        let key = state.consumer_slots.insert(Consumer {
            waker: Some(cx.waker().clone()),
            delivered: None,
        });

        state.consumers.push_back(key);
        this.key = Some(key);

        Poll::Pending
    }
}

impl<T> Drop for Pop<'_, T> {
    fn drop(&mut self) {
        let Some(key) = self.key.take() else {
            return;
        };

        let mut state = self.channel.state.lock();
        let consumer = state.consumer_slots.remove(key);

        let Some(value) = consumer.delivered else {
            state.consumers.retain(|queued| *queued != key);
            return;
        };

        let waker = match state.deliver(value) {
            Ok(waker) => waker,
            Err(value) => {
                state.buffer.push_front(value);

                // The returned value is the oldest, so the newest buffered
                // one waits ahead of every suspended producer instead.
                if state.buffer.len() > self.channel.capacity {
                    if let Some(newest) = state.buffer.pop_back() {
                        let key = state.producer_slots.insert(Producer {
                            waker: None,
                            pending: Some(newest),
                            evicted: true,
                        });

                        state.producers.push_front(key);
                    }
                }

                None
            }
        };

        drop(state);
        wake(waker);
    }
}
