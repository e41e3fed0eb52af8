//! Push-based producers: the observer handed to `subscribe`, and the drain
//! that turns its callbacks back into a pull-based stream.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::Notify;
use tracing::debug;

use super::EventStream;
use super::producer::Subscribable;

/// Release capability of a subscription handle.
pub trait Subscription: Send {
    fn unsubscribe(&mut self);
}

impl<F> Subscription for F
where
    F: FnMut() + Send,
{
    fn unsubscribe(&mut self) {
        self()
    }
}

/// Queue and terminal flags shared between an [`Observer`] and its drain.
struct State<E> {
    queue: VecDeque<E>,
    /// `complete` was called.
    done: bool,
    /// Every observer handle is gone.
    abandoned: bool,
    error: Option<anyhow::Error>,
}

struct Shared<E> {
    state: Mutex<State<E>>,
    notify: Notify,
}

enum Step<E> {
    Item(E),
    Failed(anyhow::Error),
    Finished,
    Wait,
}

impl<E> Shared<E> {
    fn new() -> Self {
        Self {
            state: Mutex::new(State {
                queue: VecDeque::new(),
                done: false,
                abandoned: false,
                error: None,
            }),
            notify: Notify::new(),
        }
    }

    fn lock(&self) -> MutexGuard<'_, State<E>> {
        // Poisoning is ignored: every update leaves the state consistent.
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn update(&self, f: impl FnOnce(&mut State<E>)) {
        f(&mut self.lock());
        self.notify.notify_one();
    }

    /// Decide what the drain does next.
    ///
    /// A completed sequence with nothing queued is finished, even if an
    /// error was recorded. Otherwise a recorded error wins over any items
    /// still queued.
    fn next_step(&self) -> Step<E> {
        let mut state = self.lock();
        if state.done && state.queue.is_empty() {
            return Step::Finished;
        }
        if let Some(err) = state.error.take() {
            return Step::Failed(err);
        }
        if let Some(item) = state.queue.pop_front() {
            return Step::Item(item);
        }
        if state.abandoned {
            Step::Finished
        } else {
            Step::Wait
        }
    }
}

struct ObserverInner<E> {
    shared: Arc<Shared<E>>,
}

impl<E> Drop for ObserverInner<E> {
    fn drop(&mut self) {
        // Every observer handle is gone, so nothing can complete the
        // sequence any more.
        self.shared.update(|state| state.abandoned = true);
    }
}

/// The `next` / `error` / `complete` callbacks given to a
/// [`Subscribable`] producer.
///
/// Cheap to clone and safe to call from any thread. Dropping every clone
/// without calling [`Observer::complete`] ends the sequence as if it had
/// been called.
pub struct Observer<E> {
    inner: Arc<ObserverInner<E>>,
}

impl<E> Clone for Observer<E> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<E> Observer<E> {
    fn new(shared: Arc<Shared<E>>) -> Self {
        Self {
            inner: Arc::new(ObserverInner { shared }),
        }
    }

    /// Queue a value behind everything delivered so far.
    pub fn next(&self, value: E) {
        self.inner
            .shared
            .update(|state| state.queue.push_back(value));
    }

    /// Record a terminal error. Only the first error is kept.
    pub fn error(&self, err: impl Into<anyhow::Error>) {
        let err = err.into();
        self.inner.shared.update(|state| {
            if state.error.is_none() {
                state.error = Some(err);
            }
        });
    }

    pub fn complete(&self) {
        self.inner.shared.update(|state| state.done = true);
    }
}

/// Releases the subscription handle when dropped.
struct SubscriptionGuard(Option<Box<dyn Subscription>>);

impl Drop for SubscriptionGuard {
    fn drop(&mut self) {
        if let Some(mut subscription) = self.0.take() {
            debug!("releasing push-based subscription");
            subscription.unsubscribe();
        }
    }
}

/// Subscribe to `source` and yield what it pushes, in arrival order.
///
/// Subscription happens on first poll. The handle returned by `subscribe`
/// is released when the stream ends, fails, or is dropped early.
pub(super) fn drain<E>(source: Box<dyn Subscribable<E>>) -> EventStream<E>
where
    E: Send + 'static,
{
    Box::pin(async_stream::stream! {
        let shared = Arc::new(Shared::new());
        let _guard = SubscriptionGuard(source.subscribe(Observer::new(Arc::clone(&shared))));

        loop {
            match shared.next_step() {
                Step::Item(item) => {
                    yield Ok(item);
                }
                Step::Failed(err) => {
                    yield Err(err);
                    break;
                }
                Step::Finished => break,
                Step::Wait => shared.notify.notified().await,
            }
        }
    })
}
