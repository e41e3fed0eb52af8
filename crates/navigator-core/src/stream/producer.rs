//! Producer shapes accepted by [`super::normalize`].

use std::fmt;

use anyhow::Result;
use futures::Stream;
use futures::future::{BoxFuture, Future, FutureExt};
use futures::stream::{BoxStream, StreamExt};

use super::observer::{Observer, Subscription};

/// A value with a zero-argument `events()` accessor that hands back the
/// producer it wraps (e.g. a running task's stream handle).
pub trait EventSource<E>: Send {
    fn events(self: Box<Self>) -> Producer<E>;
}

/// A push-based producer: delivers values by calling back into an
/// [`Observer`] instead of being pulled.
///
/// The returned handle, if any, is released exactly once when the
/// normalized stream finishes, fails, or is dropped.
pub trait Subscribable<E>: Send {
    fn subscribe(self: Box<Self>, observer: Observer<E>) -> Option<Box<dyn Subscription>>;
}

/// Capability probes for a value whose shape is only known at runtime.
///
/// [`super::classify`] calls the probes in precedence order and uses the
/// first one that returns `Some`. A value that answers none of them is
/// turned into a single event via [`Capabilities::into_scalar`].
pub trait Capabilities<E>: Send {
    fn events(&mut self) -> Option<Producer<E>> {
        None
    }

    fn settle(&mut self) -> Option<BoxFuture<'static, Result<Producer<E>>>> {
        None
    }

    fn stream(&mut self) -> Option<BoxStream<'static, Result<E>>> {
        None
    }

    fn iter(&mut self) -> Option<Box<dyn Iterator<Item = Result<E>> + Send>> {
        None
    }

    fn subscribable(&mut self) -> Option<Box<dyn Subscribable<E>>> {
        None
    }

    fn into_scalar(self: Box<Self>) -> E;
}

/// A task result in one of the supported shapes.
///
/// Variants are listed in detection precedence order. [`Producer::Opaque`]
/// is the escape hatch for values that have to be probed at runtime.
pub enum Producer<E> {
    /// Nothing to yield.
    Empty,
    /// A handle exposing `events()`.
    Accessor(Box<dyn EventSource<E>>),
    /// Settles later into another producer.
    Pending(BoxFuture<'static, Result<Producer<E>>>),
    /// Pull-based asynchronous sequence.
    Stream(BoxStream<'static, Result<E>>),
    /// Pull-based synchronous sequence.
    Iter(Box<dyn Iterator<Item = Result<E>> + Send>),
    /// Push-based sequence.
    Subscribe(Box<dyn Subscribable<E>>),
    /// A single event.
    Scalar(E),
    /// Shape unknown until classified.
    Opaque(Box<dyn Capabilities<E>>),
}

/// Discriminant of [`Producer`], for logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProducerKind {
    Empty,
    Accessor,
    Pending,
    Stream,
    Iter,
    Subscribe,
    Scalar,
    Opaque,
}

impl fmt::Display for ProducerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ProducerKind::Empty => "empty",
            ProducerKind::Accessor => "accessor",
            ProducerKind::Pending => "pending",
            ProducerKind::Stream => "stream",
            ProducerKind::Iter => "iter",
            ProducerKind::Subscribe => "subscribe",
            ProducerKind::Scalar => "scalar",
            ProducerKind::Opaque => "opaque",
        };
        f.write_str(s)
    }
}

impl<E> Producer<E> {
    pub fn kind(&self) -> ProducerKind {
        match self {
            Producer::Empty => ProducerKind::Empty,
            Producer::Accessor(_) => ProducerKind::Accessor,
            Producer::Pending(_) => ProducerKind::Pending,
            Producer::Stream(_) => ProducerKind::Stream,
            Producer::Iter(_) => ProducerKind::Iter,
            Producer::Subscribe(_) => ProducerKind::Subscribe,
            Producer::Scalar(_) => ProducerKind::Scalar,
            Producer::Opaque(_) => ProducerKind::Opaque,
        }
    }

    pub fn scalar(event: E) -> Self {
        Producer::Scalar(event)
    }

    pub fn accessor(source: impl EventSource<E> + 'static) -> Self {
        Producer::Accessor(Box::new(source))
    }

    pub fn pending<F>(future: F) -> Self
    where
        F: Future<Output = Result<Producer<E>>> + Send + 'static,
    {
        Producer::Pending(future.boxed())
    }

    pub fn stream<S>(stream: S) -> Self
    where
        S: Stream<Item = Result<E>> + Send + 'static,
    {
        Producer::Stream(stream.boxed())
    }

    /// Wrap an infallible iterator.
    pub fn iter<I>(items: I) -> Self
    where
        I: IntoIterator<Item = E>,
        I::IntoIter: Send + 'static,
        E: 'static,
    {
        Producer::Iter(Box::new(items.into_iter().map(Ok)))
    }

    /// Wrap an iterator that may fail part-way through.
    pub fn try_iter<I>(items: I) -> Self
    where
        I: IntoIterator<Item = Result<E>>,
        I::IntoIter: Send + 'static,
    {
        Producer::Iter(Box::new(items.into_iter()))
    }

    pub fn subscribe(source: impl Subscribable<E> + 'static) -> Self {
        Producer::Subscribe(Box::new(source))
    }

    pub fn opaque(value: impl Capabilities<E> + 'static) -> Self {
        Producer::Opaque(Box::new(value))
    }
}

impl<E> From<Option<Producer<E>>> for Producer<E> {
    fn from(value: Option<Producer<E>>) -> Self {
        value.unwrap_or(Producer::Empty)
    }
}

impl<E> fmt::Debug for Producer<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Producer").field(&self.kind()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn none_converts_to_empty() {
        let producer: Producer<u32> = Option::<Producer<u32>>::None.into();
        assert_eq!(producer.kind(), ProducerKind::Empty);
    }

    #[test]
    fn some_converts_to_inner() {
        let producer: Producer<u32> = Some(Producer::scalar(3)).into();
        assert_eq!(producer.kind(), ProducerKind::Scalar);
    }

    #[test]
    fn constructors_report_their_kind() {
        assert_eq!(Producer::iter(vec![1u32]).kind(), ProducerKind::Iter);
        assert_eq!(
            Producer::stream(futures::stream::iter(vec![Ok(1u32)])).kind(),
            ProducerKind::Stream
        );
        assert_eq!(
            Producer::pending(async { Ok::<_, anyhow::Error>(Producer::<u32>::Empty) }).kind(),
            ProducerKind::Pending
        );
    }

    #[test]
    fn debug_shows_kind() {
        let producer = Producer::scalar("x");
        assert_eq!(format!("{producer:?}"), "Producer(Scalar)");
        assert_eq!(ProducerKind::Subscribe.to_string(), "subscribe");
    }
}
