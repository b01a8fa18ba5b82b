//! Publisher trait, the operator extension trait and the subscribe helpers
//!
//! A [`Publisher`] is an immutable description of a stream. Every call to
//! [`Publisher::subscribe`] starts (or, for shared publishers, attaches to) one
//! execution. Operators wrap a source publisher in a new one; nothing runs until
//! a subscriber arrives.

use std::{sync::Arc, time::Duration};

use crate::{
  error::{BlockError, BoxError, StreamError},
  ops::{
    block::block_for_result,
    exactly_once::ExactlyOnce,
    filter::FilterOp,
    filter_map::FilterMapOp,
    first::FirstOp,
    flat_map::FlatMapOp,
    into_stream::IntoStream,
    lifecycle::{DoOnSubscribeOp, DoOnUnsubscribeOp},
    map::{MapOp, TryMapOp},
    observe_on::ObserveOnOp,
    on_error_return::OnErrorReturnOp,
    share::{Shared, Tagged},
    subscribe_on::SubscribeOnOp,
    take_until::TakeUntilOp,
    tap::{DoOnCompleteOp, DoOnErrorOp, DoOnNextOp},
  },
  scheduler::Scheduler,
  subscriber::{BoxedSubscriber, Subscriber},
  subscription::Subscription,
};

mod callback;
mod concat;
mod defer;
mod from_iter;
mod just;
mod merge;

pub use callback::*;
pub use concat::*;
pub use defer::*;
pub use from_iter::*;
pub use just::*;
pub use merge::*;

// ============================================================================
// Publisher Trait
// ============================================================================

/// Producer side of the protocol.
///
/// Implementations deliver `on_subscribe` to the subscriber before anything
/// else, then any number of `on_next`, then at most one terminal signal.
pub trait Publisher: Send + Sync {
  type Item: Send + 'static;

  fn subscribe(&self, subscriber: BoxedSubscriber<Self::Item>);
}

/// A type-erased, cheaply cloneable publisher.
pub type BoxedPublisher<Item> = Arc<dyn Publisher<Item = Item>>;

impl<P: Publisher + ?Sized> Publisher for Arc<P> {
  type Item = P::Item;
  #[inline]
  fn subscribe(&self, subscriber: BoxedSubscriber<Self::Item>) { (**self).subscribe(subscriber) }
}

impl<P: Publisher + ?Sized> Publisher for Box<P> {
  type Item = P::Item;
  #[inline]
  fn subscribe(&self, subscriber: BoxedSubscriber<Self::Item>) { (**self).subscribe(subscriber) }
}

// ============================================================================
// Operators
// ============================================================================

/// Every operator and subscribe helper, available on any [`Publisher`].
pub trait PublisherExt: Publisher + Sized {
  /// Transforms every item. A panic in `f` is delivered as a
  /// [`StreamError::Transform`] and cancels the source.
  fn map<B, F>(self, f: F) -> MapOp<Self, F>
  where
    F: Fn(Self::Item) -> B + Send + Sync + 'static,
    B: Send + 'static,
  {
    MapOp::new(self, f)
  }

  /// Like [`map`](PublisherExt::map), for transforms that can fail.
  fn try_map<B, E, F>(self, f: F) -> TryMapOp<Self, F>
  where
    F: Fn(Self::Item) -> Result<B, E> + Send + Sync + 'static,
    E: Into<BoxError>,
    B: Send + 'static,
  {
    TryMapOp::new(self, f)
  }

  /// Drops every item `predicate` rejects.
  fn filter<F>(self, predicate: F) -> FilterOp<Self, F>
  where
    F: Fn(&Self::Item) -> bool + Send + Sync + 'static,
  {
    FilterOp::new(self, predicate)
  }

  fn filter_map<B, F>(self, f: F) -> FilterMapOp<Self, F>
  where
    F: Fn(Self::Item) -> Option<B> + Send + Sync + 'static,
    B: Send + 'static,
  {
    FilterMapOp::new(self, f)
  }

  /// Unwraps `Some` items and drops `None`s.
  fn filter_nulls<T>(self) -> FilterMapOp<Self, fn(Option<T>) -> Option<T>>
  where
    Self: Publisher<Item = Option<T>>,
    T: Send + 'static,
  {
    FilterMapOp::new(self, std::convert::identity as fn(Option<T>) -> Option<T>)
  }

  /// Maps every item to a publisher and merges all of them. Completes once the
  /// source and every inner publisher have completed.
  fn flat_map<P, F>(self, f: F) -> FlatMapOp<Self, F>
  where
    F: Fn(Self::Item) -> P + Send + Sync + 'static,
    P: Publisher + 'static,
  {
    FlatMapOp::new(self, f)
  }

  /// Emits the items of `self`, then those of `other`.
  fn concat_with<P>(self, other: P) -> Concat<Self::Item>
  where
    Self: 'static,
    P: Publisher<Item = Self::Item> + 'static,
  {
    concat(vec![self.box_it(), other.box_it()])
  }

  /// Emits the items of `self` and `other` as they arrive.
  fn merge_with<P>(self, other: P) -> Merge<Self::Item>
  where
    Self: 'static,
    P: Publisher<Item = Self::Item> + 'static,
  {
    merge(vec![self.box_it(), other.box_it()])
  }

  /// Multicasts one upstream subscription to every subscriber. The source is
  /// subscribed when the first subscriber arrives and cancelled when the last
  /// one leaves.
  fn share(self) -> Shared<Self>
  where
    Self: 'static,
    Self::Item: Clone,
  {
    Shared::share(self)
  }

  /// As [`share`](PublisherExt::share), also replaying the last `count` items
  /// to every new subscriber.
  fn share_and_replay(self, count: usize) -> Shared<Self>
  where
    Self: 'static,
    Self::Item: Clone,
  {
    Shared::share_and_replay(self, count)
  }

  /// As [`share_and_replay`](PublisherExt::share_and_replay) without a bound
  /// on the buffer.
  fn share_and_replay_all(self) -> Shared<Self>
  where
    Self: 'static,
    Self::Item: Clone,
  {
    Shared::share_and_replay_all(self)
  }

  /// Subscribes to the source immediately and keeps buffering the last
  /// `count` items whether or not anyone is subscribed.
  fn share_hot_and_replay(self, count: usize) -> Shared<Self>
  where
    Self: 'static,
    Self::Item: Clone,
  {
    Shared::share_hot_and_replay(self, count)
  }

  /// Keeps the latest item of every tag in `tags` and replays them, in the
  /// order given, to every new subscriber.
  fn share_and_replay_types_on_resubscribe(
    self,
    tags: Vec<<Self::Item as Tagged>::Tag>,
  ) -> Shared<Self>
  where
    Self: 'static,
    Self::Item: Tagged + Clone,
  {
    Shared::share_and_replay_types_on_resubscribe(self, tags)
  }

  /// Mirrors the source until `stopper` emits.
  fn take_until<P>(self, stopper: P) -> TakeUntilOp<Self, P>
  where
    P: Publisher,
  {
    TakeUntilOp::new(self, stopper)
  }

  /// Runs `f` whenever a subscriber attaches.
  fn do_on_subscribe<F>(self, f: F) -> DoOnSubscribeOp<Self, F>
  where
    F: Fn() + Send + Sync + 'static,
  {
    DoOnSubscribeOp::new(self, f)
  }

  /// Runs `f` once per subscription, when it is cancelled or completes.
  fn do_on_unsubscribe<F>(self, f: F) -> DoOnUnsubscribeOp<Self, F>
  where
    F: Fn() + Send + Sync + 'static,
  {
    DoOnUnsubscribeOp::new(self, f)
  }

  fn do_on_next<F>(self, f: F) -> DoOnNextOp<Self, F>
  where
    F: Fn(&Self::Item) + Send + Sync + 'static,
  {
    DoOnNextOp::new(self, f)
  }

  fn do_on_error<F>(self, f: F) -> DoOnErrorOp<Self, F>
  where
    F: Fn(&StreamError) + Send + Sync + 'static,
  {
    DoOnErrorOp::new(self, f)
  }

  fn do_on_complete<F>(self, f: F) -> DoOnCompleteOp<Self, F>
  where
    F: Fn() + Send + Sync + 'static,
  {
    DoOnCompleteOp::new(self, f)
  }

  /// Emits the first item, completes and cancels the source.
  fn first(self) -> FirstOp<Self> { FirstOp::new(self) }

  /// Subscribes to the source right away and buffers until exactly one
  /// subscriber picks the items up.
  fn exactly_once(self) -> ExactlyOnce<Self::Item>
  where
    Self: 'static,
  {
    ExactlyOnce::new(self)
  }

  /// Replaces an error with a final item followed by completion.
  fn on_error_return<F>(self, f: F) -> OnErrorReturnOp<Self, F>
  where
    F: Fn(StreamError) -> Self::Item + Send + Sync + 'static,
  {
    OnErrorReturnOp::new(self, f)
  }

  /// Delivers every signal through `scheduler`, in order.
  fn observe_on<Sd>(self, scheduler: Sd) -> ObserveOnOp<Self, Sd>
  where
    Sd: Scheduler + 'static,
  {
    ObserveOnOp::new(self, scheduler)
  }

  /// Performs the subscription to the source on `scheduler`.
  fn subscribe_on<Sd>(self, scheduler: Sd) -> SubscribeOnOp<Self, Sd>
  where
    Sd: Scheduler + 'static,
  {
    SubscribeOnOp::new(self, scheduler)
  }

  /// Type-erases the publisher.
  fn box_it(self) -> BoxedPublisher<Self::Item>
  where
    Self: 'static,
  {
    Arc::new(self)
  }

  /// Blocks the calling thread until the publisher completes and returns every
  /// item it emitted. Meant for tests.
  fn block_for_result(&self, timeout: Duration) -> Result<Vec<Self::Item>, BlockError> {
    block_for_result(self, timeout)
  }

  /// Adapts the publisher into a `futures::Stream`. Dropping the stream
  /// cancels the subscription.
  fn into_stream(self) -> IntoStream<Self::Item> { IntoStream::new(&self) }

  /// Subscribes with a custom subscriber and returns a handle that cancels the
  /// subscription.
  fn subscribe_with<S>(&self, subscriber: S) -> Subscription
  where
    S: Subscriber<Self::Item> + 'static,
  {
    let handle = Subscription::new();
    self.subscribe(Box::new(HandleSubscriber { handle: handle.clone(), inner: subscriber }));
    handle
  }

  /// Subscribes with a next handler only.
  ///
  /// # Panics
  ///
  /// An error reaching this subscriber has nowhere to go: it is logged and
  /// then raised as a panic on the thread that delivered it.
  fn subscribe_next<N>(&self, next: N) -> Subscription
  where
    N: FnMut(Self::Item) + Send + 'static,
  {
    self.subscribe_all(next, undeliverable, || {})
  }

  fn subscribe_err<N, E>(&self, next: N, error: E) -> Subscription
  where
    N: FnMut(Self::Item) + Send + 'static,
    E: FnMut(StreamError) + Send + 'static,
  {
    self.subscribe_all(next, error, || {})
  }

  fn subscribe_all<N, E, C>(&self, next: N, error: E, complete: C) -> Subscription
  where
    N: FnMut(Self::Item) + Send + 'static,
    E: FnMut(StreamError) + Send + 'static,
    C: FnMut() + Send + 'static,
  {
    self.subscribe_with(FnSubscriber { next, error, complete })
  }
}

impl<P: Publisher> PublisherExt for P {}

pub(crate) fn undeliverable(err: StreamError) {
  tracing::error!(error = %err, label = err.as_label(), "undeliverable error");
  panic!("undeliverable (unhandled) error: {err}");
}

// ============================================================================
// Subscribe helpers
// ============================================================================

/// Forwards to `inner` and ties the upstream subscription to `handle`.
struct HandleSubscriber<S> {
  handle: Subscription,
  inner: S,
}

impl<Item, S: Subscriber<Item>> Subscriber<Item> for HandleSubscriber<S> {
  fn on_subscribe(&mut self, subscription: Subscription) {
    self.handle.add(subscription.clone());
    self.inner.on_subscribe(subscription);
  }

  fn on_next(&mut self, item: Item) {
    if !self.handle.is_cancelled() {
      self.inner.on_next(item)
    }
  }

  fn on_error(&mut self, err: StreamError) {
    if !self.handle.is_cancelled() {
      self.inner.on_error(err)
    }
  }

  fn on_complete(&mut self) {
    if !self.handle.is_cancelled() {
      self.inner.on_complete()
    }
  }
}

struct FnSubscriber<N, E, C> {
  next: N,
  error: E,
  complete: C,
}

impl<Item, N, E, C> Subscriber<Item> for FnSubscriber<N, E, C>
where
  N: FnMut(Item) + Send,
  E: FnMut(StreamError) + Send,
  C: FnMut() + Send,
{
  fn on_subscribe(&mut self, _: Subscription) {}

  fn on_next(&mut self, item: Item) { (self.next)(item) }

  fn on_error(&mut self, err: StreamError) { (self.error)(err) }

  fn on_complete(&mut self) { (self.complete)() }
}
