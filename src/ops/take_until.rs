//! TakeUntil operator
//!
//! Mirrors the source until a second publisher (the stopper) emits. Typical use
//! is binding a stream to a lifetime: any publisher that fires when the owner
//! goes away can be the stopper.
//!
//! - stopper emits an item: source and stopper are cancelled, the downstream
//!   receives nothing further.
//! - stopper completes or fails: the downstream completes or fails and the
//!   source is cancelled.
//! - source terminates: the stopper is cancelled.

use std::sync::Arc;

use crate::{
  error::StreamError,
  publisher::Publisher,
  subscriber::{BoxedSubscriber, SerializedSubscriber, Signal, Subscriber},
  subscription::Subscription,
};

/// Created by [`take_until`](crate::publisher::PublisherExt::take_until).
pub struct TakeUntilOp<S, N> {
  source: S,
  stopper: Arc<N>,
}

impl<S, N> TakeUntilOp<S, N> {
  pub(crate) fn new(source: S, stopper: N) -> Self {
    TakeUntilOp { source, stopper: Arc::new(stopper) }
  }
}

impl<S: Clone, N> Clone for TakeUntilOp<S, N> {
  fn clone(&self) -> Self {
    TakeUntilOp { source: self.source.clone(), stopper: self.stopper.clone() }
  }
}

impl<S, N> Publisher for TakeUntilOp<S, N>
where
  S: Publisher,
  N: Publisher + 'static,
{
  type Item = S::Item;

  fn subscribe(&self, subscriber: BoxedSubscriber<S::Item>) {
    let downstream = SerializedSubscriber::new(subscriber);
    let composite = Subscription::new();
    let stopper = Subscription::new();
    composite.add(stopper.clone());
    downstream.emit(Signal::Subscribe(composite.clone()));
    self.source.subscribe(Box::new(TakeUntilSource {
      downstream,
      composite,
      stopper,
      notifier: Some(self.stopper.clone()),
    }))
  }
}

struct TakeUntilSource<Item, N> {
  downstream: SerializedSubscriber<Item>,
  composite: Subscription,
  /// Cancels just the stopper.
  stopper: Subscription,
  notifier: Option<Arc<N>>,
}

impl<Item, N> TakeUntilSource<Item, N> {
  fn is_stopped(&self) -> bool { self.composite.is_cancelled() }
}

impl<Item, N> Subscriber<Item> for TakeUntilSource<Item, N>
where
  Item: Send + 'static,
  N: Publisher + 'static,
{
  fn on_subscribe(&mut self, subscription: Subscription) {
    self.composite.add(subscription.clone());
    if let Some(notifier) = self.notifier.take() {
      notifier.subscribe(Box::new(StopperSubscriber {
        downstream: self.downstream.clone(),
        composite: self.composite.clone(),
        stopper: self.stopper.clone(),
        source: subscription,
      }));
    }
  }

  fn on_next(&mut self, item: Item) {
    if !self.is_stopped() {
      self.downstream.emit(Signal::Next(item));
    }
  }

  fn on_error(&mut self, err: StreamError) {
    if !self.is_stopped() {
      self.downstream.emit(Signal::Error(err));
      self.stopper.cancel();
    }
  }

  fn on_complete(&mut self) {
    if !self.is_stopped() {
      self.downstream.emit(Signal::Complete);
      self.stopper.cancel();
    }
  }
}

struct StopperSubscriber<Item> {
  downstream: SerializedSubscriber<Item>,
  composite: Subscription,
  stopper: Subscription,
  source: Subscription,
}

impl<Item, StopItem> Subscriber<StopItem> for StopperSubscriber<Item>
where
  Item: Send + 'static,
{
  fn on_subscribe(&mut self, subscription: Subscription) { self.stopper.add(subscription) }

  fn on_next(&mut self, _: StopItem) {
    if !self.stopper.is_cancelled() {
      self.composite.cancel();
    }
  }

  fn on_error(&mut self, err: StreamError) {
    if !self.stopper.is_cancelled() && !self.composite.is_cancelled() {
      self.downstream.emit(Signal::Error(err));
      self.source.cancel();
      self.stopper.cancel();
    }
  }

  fn on_complete(&mut self) {
    if !self.stopper.is_cancelled() && !self.composite.is_cancelled() {
      self.downstream.emit(Signal::Complete);
      self.source.cancel();
      self.stopper.cancel();
    }
  }
}
