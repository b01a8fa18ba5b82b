//! FlatMap operator
//!
//! Each upstream item is mapped to an inner publisher which is subscribed
//! immediately; inner items are merged into the downstream as they arrive.
//!
//! Completion accounting: one `outstanding` counter covers the upstream plus
//! every open inner publisher. It starts at 1 for the upstream, is incremented
//! before each inner subscribe and decremented on each completion, and the
//! downstream completes exactly when it reaches zero.

use std::{marker::PhantomData, sync::Arc};

use crate::{
  error::{catch_transform, StreamError},
  publisher::Publisher,
  rc::MutArc,
  subscriber::{BoxedSubscriber, SerializedSubscriber, Signal, Subscriber},
  subscription::Subscription,
};

/// Created by [`flat_map`](crate::publisher::PublisherExt::flat_map).
pub struct FlatMapOp<S, F> {
  source: S,
  func: Arc<F>,
}

impl<S, F> FlatMapOp<S, F> {
  pub(crate) fn new(source: S, func: F) -> Self { FlatMapOp { source, func: Arc::new(func) } }
}

impl<S: Clone, F> Clone for FlatMapOp<S, F> {
  fn clone(&self) -> Self { FlatMapOp { source: self.source.clone(), func: self.func.clone() } }
}

impl<S, F, P> Publisher for FlatMapOp<S, F>
where
  S: Publisher,
  F: Fn(S::Item) -> P + Send + Sync + 'static,
  P: Publisher + 'static,
{
  type Item = P::Item;

  fn subscribe(&self, subscriber: BoxedSubscriber<P::Item>) {
    let shared = Arc::new(FlatMapShared {
      downstream: SerializedSubscriber::new(subscriber),
      composite: Subscription::new(),
      counter: MutArc::own(Counter { outstanding: 1, done: false }),
    });
    shared.downstream.emit(Signal::Subscribe(shared.composite.clone()));
    self.source.subscribe(Box::new(FlatMapOuter::<P::Item, F, P> {
      shared,
      func: self.func.clone(),
      _p: PhantomData,
    }))
  }
}

struct FlatMapShared<Item> {
  downstream: SerializedSubscriber<Item>,
  composite: Subscription,
  counter: MutArc<Counter>,
}

struct Counter {
  outstanding: usize,
  done: bool,
}

impl<Item: Send + 'static> FlatMapShared<Item> {
  fn is_stopped(&self) -> bool { self.counter.rc_deref_mut().done || self.composite.is_cancelled() }

  fn fail(&self, err: StreamError) {
    {
      let mut counter = self.counter.rc_deref_mut();
      if counter.done {
        return;
      }
      counter.done = true;
    }
    self.downstream.emit(Signal::Error(err));
    self.composite.cancel();
  }

  fn complete_one(&self) {
    let finished = {
      let mut counter = self.counter.rc_deref_mut();
      if counter.done {
        return;
      }
      counter.outstanding -= 1;
      counter.done = counter.outstanding == 0;
      counter.done
    };
    if finished {
      self.downstream.emit(Signal::Complete);
    }
  }
}

struct FlatMapOuter<Item, F, P> {
  shared: Arc<FlatMapShared<Item>>,
  func: Arc<F>,
  _p: PhantomData<fn() -> P>,
}

impl<A, P, F> Subscriber<A> for FlatMapOuter<P::Item, F, P>
where
  F: Fn(A) -> P + Send + Sync,
  P: Publisher,
{
  fn on_subscribe(&mut self, subscription: Subscription) { self.shared.composite.add(subscription) }

  fn on_next(&mut self, item: A) {
    if self.shared.is_stopped() {
      return;
    }
    match catch_transform("flat_map", || (self.func)(item)) {
      Ok(inner) => {
        self.shared.counter.rc_deref_mut().outstanding += 1;
        inner.subscribe(Box::new(FlatMapInner { shared: self.shared.clone(), upstream: None }));
      }
      Err(err) => self.shared.fail(err),
    }
  }

  fn on_error(&mut self, err: StreamError) { self.shared.fail(err) }

  fn on_complete(&mut self) { self.shared.complete_one() }
}

struct FlatMapInner<Item> {
  shared: Arc<FlatMapShared<Item>>,
  upstream: Option<Subscription>,
}

impl<Item: Send + 'static> Subscriber<Item> for FlatMapInner<Item> {
  fn on_subscribe(&mut self, subscription: Subscription) {
    self.shared.composite.add(subscription.clone());
    self.upstream = Some(subscription);
  }

  fn on_next(&mut self, item: Item) {
    if !self.shared.is_stopped() {
      self.shared.downstream.emit(Signal::Next(item));
    }
  }

  fn on_error(&mut self, err: StreamError) { self.shared.fail(err) }

  fn on_complete(&mut self) {
    // Finished inners are pruned from the composite on its next `add`.
    if let Some(upstream) = self.upstream.take() {
      upstream.cancel();
    }
    self.shared.complete_one();
  }
}
