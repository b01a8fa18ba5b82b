//! IntoStream operator
//!
//! Converts a [`Publisher`] into a `futures::Stream` so emissions can be
//! consumed with `async`/`await`.
//!
//! ```rust
//! use futures::StreamExt;
//! use rxstream::prelude::*;
//!
//! # async fn example() {
//! let mut stream = just(1).into_stream();
//!
//! if let Some(Ok(value)) = stream.next().await {
//!   println!("Received: {}", value);
//! }
//! # }
//! ```

use std::{
  collections::VecDeque,
  pin::Pin,
  task::{Context, Poll, Waker},
};

use futures::Stream;

use crate::{
  error::StreamError,
  publisher::Publisher,
  rc::MutArc,
  subscriber::Subscriber,
  subscription::{Subscription, SubscriptionGuard},
};

/// State shared between the subscriber side and the stream consumer.
struct IntoStreamState<Item> {
  queue: VecDeque<Result<Item, StreamError>>,
  waker: Option<Waker>,
  is_closed: bool,
}

impl<Item> IntoStreamState<Item> {
  fn push(&mut self, item: Option<Result<Item, StreamError>>) {
    match item {
      Some(item) => self.queue.push_back(item),
      None => self.is_closed = true,
    }
    if let Some(waker) = self.waker.take() {
      waker.wake();
    }
  }
}

/// A `Stream` of the items a publisher emits, created by
/// [`into_stream`](crate::publisher::PublisherExt::into_stream).
///
/// - `Ok(item)` for every `on_next`.
/// - `Err(err)` for `on_error`, after which the stream ends.
/// - `None` once the publisher has completed.
///
/// Dropping the stream cancels the subscription.
pub struct IntoStream<Item> {
  state: MutArc<IntoStreamState<Item>>,
  _guard: SubscriptionGuard,
}

impl<Item: Send + 'static> IntoStream<Item> {
  pub(crate) fn new<P>(publisher: &P) -> Self
  where
    P: Publisher<Item = Item> + ?Sized,
  {
    let state =
      MutArc::own(IntoStreamState { queue: VecDeque::new(), waker: None, is_closed: false });
    let handle = Subscription::new();
    publisher
      .subscribe(Box::new(IntoStreamSubscriber { state: state.clone(), handle: handle.clone() }));
    IntoStream { state, _guard: handle.cancel_on_drop() }
  }
}

impl<Item> Stream for IntoStream<Item> {
  type Item = Result<Item, StreamError>;

  fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
    let mut state = self.state.rc_deref_mut();

    if let Some(item) = state.queue.pop_front() {
      return Poll::Ready(Some(item));
    }

    if state.is_closed {
      return Poll::Ready(None);
    }

    state.waker = Some(cx.waker().clone());
    Poll::Pending
  }
}

struct IntoStreamSubscriber<Item> {
  state: MutArc<IntoStreamState<Item>>,
  handle: Subscription,
}

impl<Item: Send + 'static> Subscriber<Item> for IntoStreamSubscriber<Item> {
  fn on_subscribe(&mut self, subscription: Subscription) { self.handle.add(subscription) }

  fn on_next(&mut self, item: Item) { self.state.rc_deref_mut().push(Some(Ok(item))) }

  fn on_error(&mut self, err: StreamError) {
    let mut state = self.state.rc_deref_mut();
    state.push(Some(Err(err)));
    state.push(None);
  }

  fn on_complete(&mut self) { self.state.rc_deref_mut().push(None) }
}
