//! Lifecycle hooks: DoOnSubscribe and DoOnUnsubscribe

use std::sync::{
  atomic::{AtomicBool, Ordering},
  Arc,
};

use crate::{
  error::StreamError,
  publisher::Publisher,
  subscriber::{BoxedSubscriber, Subscriber},
  subscription::Subscription,
};

// ==================== DoOnSubscribe ====================

/// Runs a callback when the source hands over its subscription.
pub struct DoOnSubscribeOp<S, F> {
  source: S,
  callback: Arc<F>,
}

impl<S, F> DoOnSubscribeOp<S, F> {
  pub(crate) fn new(source: S, callback: F) -> Self {
    DoOnSubscribeOp { source, callback: Arc::new(callback) }
  }
}

impl<S: Clone, F> Clone for DoOnSubscribeOp<S, F> {
  fn clone(&self) -> Self {
    DoOnSubscribeOp { source: self.source.clone(), callback: self.callback.clone() }
  }
}

impl<S, F> Publisher for DoOnSubscribeOp<S, F>
where
  S: Publisher,
  F: Fn() + Send + Sync + 'static,
{
  type Item = S::Item;

  fn subscribe(&self, subscriber: BoxedSubscriber<S::Item>) {
    self.source.subscribe(Box::new(DoOnSubscribeSubscriber {
      downstream: subscriber,
      callback: self.callback.clone(),
    }))
  }
}

struct DoOnSubscribeSubscriber<Item, F> {
  downstream: BoxedSubscriber<Item>,
  callback: Arc<F>,
}

impl<Item, F> Subscriber<Item> for DoOnSubscribeSubscriber<Item, F>
where
  Item: Send + 'static,
  F: Fn() + Send + Sync,
{
  fn on_subscribe(&mut self, subscription: Subscription) {
    (self.callback)();
    self.downstream.on_subscribe(subscription);
  }

  fn on_next(&mut self, item: Item) { self.downstream.on_next(item) }

  fn on_error(&mut self, err: StreamError) { self.downstream.on_error(err) }

  fn on_complete(&mut self) { self.downstream.on_complete() }
}

// ==================== DoOnUnsubscribe ====================

/// Runs a callback once per subscription, when the subscription is cancelled
/// or the source completes, whichever happens first.
pub struct DoOnUnsubscribeOp<S, F> {
  source: S,
  callback: Arc<F>,
}

impl<S, F> DoOnUnsubscribeOp<S, F> {
  pub(crate) fn new(source: S, callback: F) -> Self {
    DoOnUnsubscribeOp { source, callback: Arc::new(callback) }
  }
}

impl<S: Clone, F> Clone for DoOnUnsubscribeOp<S, F> {
  fn clone(&self) -> Self {
    DoOnUnsubscribeOp { source: self.source.clone(), callback: self.callback.clone() }
  }
}

impl<S, F> Publisher for DoOnUnsubscribeOp<S, F>
where
  S: Publisher,
  F: Fn() + Send + Sync + 'static,
{
  type Item = S::Item;

  fn subscribe(&self, subscriber: BoxedSubscriber<S::Item>) {
    self.source.subscribe(Box::new(DoOnUnsubscribeSubscriber {
      downstream: subscriber,
      hook: OnceHook { fired: Arc::new(AtomicBool::new(false)), callback: self.callback.clone() },
    }))
  }
}

struct OnceHook<F> {
  fired: Arc<AtomicBool>,
  callback: Arc<F>,
}

impl<F: Fn()> OnceHook<F> {
  fn fire(&self) {
    if !self.fired.swap(true, Ordering::AcqRel) {
      (self.callback)();
    }
  }
}

impl<F> Clone for OnceHook<F> {
  fn clone(&self) -> Self {
    OnceHook { fired: self.fired.clone(), callback: self.callback.clone() }
  }
}

struct DoOnUnsubscribeSubscriber<Item, F> {
  downstream: BoxedSubscriber<Item>,
  hook: OnceHook<F>,
}

impl<Item, F> Subscriber<Item> for DoOnUnsubscribeSubscriber<Item, F>
where
  Item: Send + 'static,
  F: Fn() + Send + Sync + 'static,
{
  fn on_subscribe(&mut self, subscription: Subscription) {
    let wrapped = Subscription::new();
    let hook = self.hook.clone();
    wrapped.add_teardown(move || hook.fire());
    wrapped.add(subscription);
    self.downstream.on_subscribe(wrapped);
  }

  fn on_next(&mut self, item: Item) { self.downstream.on_next(item) }

  fn on_error(&mut self, err: StreamError) { self.downstream.on_error(err) }

  fn on_complete(&mut self) {
    self.hook.fire();
    self.downstream.on_complete();
  }
}

#[cfg(test)]
mod test {
  use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc,
  };

  use crate::prelude::*;

  fn counter() -> (Arc<AtomicUsize>, impl Fn() + Send + Sync + 'static) {
    let count = Arc::new(AtomicUsize::new(0));
    let c_count = count.clone();
    (count, move || {
      c_count.fetch_add(1, Ordering::SeqCst);
    })
  }

  #[test]
  fn do_on_subscribe_runs_per_subscriber() {
    let (count, hook) = counter();
    let source = just(1).do_on_subscribe(hook);
    source.subscribe_next(|_| {});
    source.subscribe_next(|_| {});
    assert_eq!(count.load(Ordering::SeqCst), 2);
  }

  #[test]
  fn do_on_unsubscribe_fires_on_cancel() {
    let (count, hook) = counter();
    let subject = PublishSubject::<i32>::new();
    let test = TestSubscriber::new();
    subject.clone().do_on_unsubscribe(hook).subscribe(Box::new(test.clone()));
    assert_eq!(count.load(Ordering::SeqCst), 0);
    test.cancel();
    test.cancel();
    assert_eq!(count.load(Ordering::SeqCst), 1);
    assert!(!subject.has_subscriber());
  }

  #[test]
  fn do_on_unsubscribe_fires_once_on_complete_then_cancel() {
    let (count, hook) = counter();
    let test = TestSubscriber::new();
    just(1).do_on_unsubscribe(hook).subscribe(Box::new(test.clone()));
    assert_eq!(count.load(Ordering::SeqCst), 1);
    test.cancel();
    assert_eq!(count.load(Ordering::SeqCst), 1);
    assert!(test.is_completed());
  }
}
