//! Stream normalization for task results.
//!
//! An agent runtime hands back its task result in whatever shape suits it:
//! a stream handle with an `events()` accessor, a future of one, a pull
//! stream, an iterator, a push-based subscription, or a single value.
//! [`normalize`] turns any of these into one lazy [`EventStream`] so the
//! consumer can be a single `while let Some(..)` loop.
//!
//! # Shape precedence
//!
//! ```text
//! Empty      -> nothing
//! Accessor   -> normalize(source.events())
//! Pending    -> normalize(future.await?)
//! Stream     -> forward items
//! Iter       -> forward items
//! Subscribe  -> queue callbacks, drain in order, release handle on exit
//! Scalar     -> yield once
//! Opaque     -> normalize(classify(value))
//! ```
//!
//! Errors are passed through untouched and end the stream. Nothing is
//! retried.

mod observer;
mod producer;

use std::pin::Pin;

use anyhow::Result;
use futures::{Stream, StreamExt};
use tracing::debug;

pub use observer::{Observer, Subscription};
pub use producer::{Capabilities, EventSource, Producer, ProducerKind, Subscribable};

/// The normalized, lazily evaluated event sequence.
pub type EventStream<E> = Pin<Box<dyn Stream<Item = Result<E>> + Send>>;

/// Turn a producer of any supported shape into a single event stream.
///
/// Nothing is awaited, pulled or subscribed until the returned stream is
/// first polled. Every call builds a fresh stream; dropping it early
/// releases whatever the producer was holding.
pub fn normalize<E>(producer: Producer<E>) -> EventStream<E>
where
    E: Send + 'static,
{
    match producer {
        Producer::Empty => Box::pin(futures::stream::empty()),
        Producer::Accessor(source) => Box::pin(async_stream::stream! {
            debug!("reading events through accessor");
            let mut inner = normalize(source.events());
            while let Some(item) = inner.next().await {
                yield item;
            }
        }),
        Producer::Pending(future) => Box::pin(async_stream::stream! {
            match future.await {
                Ok(resolved) => {
                    debug!(kind = %resolved.kind(), "pending producer settled");
                    let mut inner = normalize(resolved);
                    while let Some(item) = inner.next().await {
                        yield item;
                    }
                }
                Err(err) => {
                    yield Err(err);
                }
            }
        }),
        Producer::Stream(stream) => forward(stream),
        Producer::Iter(iter) => forward(futures::stream::iter(iter)),
        Producer::Subscribe(source) => observer::drain(source),
        Producer::Scalar(event) => {
            Box::pin(futures::stream::once(futures::future::ready(Ok(event))))
        }
        Producer::Opaque(value) => Box::pin(async_stream::stream! {
            let mut inner = normalize(classify(value));
            while let Some(item) = inner.next().await {
                yield item;
            }
        }),
    }
}

/// Probe a runtime-shaped value and return the producer it stands for.
///
/// Probes run in precedence order and the first hit wins, so a value that
/// is both iterable and subscribable is treated as iterable. An `events()`
/// accessor is invoked here and its result returned as-is.
pub fn classify<E>(mut value: Box<dyn Capabilities<E>>) -> Producer<E> {
    let producer = if let Some(derived) = value.events() {
        derived
    } else if let Some(future) = value.settle() {
        Producer::Pending(future)
    } else if let Some(stream) = value.stream() {
        Producer::Stream(stream)
    } else if let Some(iter) = value.iter() {
        Producer::Iter(iter)
    } else if let Some(source) = value.subscribable() {
        Producer::Subscribe(source)
    } else {
        Producer::Scalar(value.into_scalar())
    };
    debug!(kind = %producer.kind(), "classified opaque producer");
    producer
}

/// Forward a pull-based sequence, stopping after the first error.
fn forward<E, S>(mut inner: S) -> EventStream<E>
where
    E: Send + 'static,
    S: Stream<Item = Result<E>> + Send + Unpin + 'static,
{
    Box::pin(async_stream::stream! {
        while let Some(item) = inner.next().await {
            let failed = item.is_err();
            yield item;
            if failed {
                break;
            }
        }
    })
}
