//! Side-effect operators: DoOnNext, DoOnError and DoOnComplete
//!
//! Each runs its callback before forwarding the signal unchanged.

use std::sync::Arc;

use crate::{
  error::StreamError,
  publisher::Publisher,
  subscriber::{BoxedSubscriber, Subscriber},
  subscription::Subscription,
};

macro_rules! tap_op {
  ($(#[$meta:meta])* $op:ident, $subscriber:ident) => {
    $(#[$meta])*
    pub struct $op<S, F> {
      source: S,
      callback: Arc<F>,
    }

    impl<S, F> $op<S, F> {
      pub(crate) fn new(source: S, callback: F) -> Self {
        $op { source, callback: Arc::new(callback) }
      }
    }

    impl<S: Clone, F> Clone for $op<S, F> {
      fn clone(&self) -> Self {
        $op { source: self.source.clone(), callback: self.callback.clone() }
      }
    }

    impl<S, F> Publisher for $op<S, F>
    where
      S: Publisher,
      F: Send + Sync + 'static,
      $subscriber<S::Item, F>: Subscriber<S::Item> + 'static,
    {
      type Item = S::Item;

      fn subscribe(&self, subscriber: BoxedSubscriber<S::Item>) {
        let callback = self.callback.clone();
        self.source.subscribe(Box::new($subscriber { downstream: subscriber, callback }))
      }
    }

    pub struct $subscriber<Item, F> {
      downstream: BoxedSubscriber<Item>,
      callback: Arc<F>,
    }
  };
}

tap_op!(
  /// Created by [`do_on_next`](crate::publisher::PublisherExt::do_on_next).
  DoOnNextOp,
  DoOnNextSubscriber
);
tap_op!(
  /// Created by [`do_on_error`](crate::publisher::PublisherExt::do_on_error).
  DoOnErrorOp,
  DoOnErrorSubscriber
);
tap_op!(
  /// Created by [`do_on_complete`](crate::publisher::PublisherExt::do_on_complete).
  DoOnCompleteOp,
  DoOnCompleteSubscriber
);

impl<Item, F> Subscriber<Item> for DoOnNextSubscriber<Item, F>
where
  Item: Send + 'static,
  F: Fn(&Item) + Send + Sync,
{
  fn on_subscribe(&mut self, subscription: Subscription) {
    self.downstream.on_subscribe(subscription)
  }

  fn on_next(&mut self, item: Item) {
    (self.callback)(&item);
    self.downstream.on_next(item);
  }

  fn on_error(&mut self, err: StreamError) { self.downstream.on_error(err) }

  fn on_complete(&mut self) { self.downstream.on_complete() }
}

impl<Item, F> Subscriber<Item> for DoOnErrorSubscriber<Item, F>
where
  Item: Send + 'static,
  F: Fn(&StreamError) + Send + Sync,
{
  fn on_subscribe(&mut self, subscription: Subscription) {
    self.downstream.on_subscribe(subscription)
  }

  fn on_next(&mut self, item: Item) { self.downstream.on_next(item) }

  fn on_error(&mut self, err: StreamError) {
    (self.callback)(&err);
    self.downstream.on_error(err);
  }

  fn on_complete(&mut self) { self.downstream.on_complete() }
}

impl<Item, F> Subscriber<Item> for DoOnCompleteSubscriber<Item, F>
where
  Item: Send + 'static,
  F: Fn() + Send + Sync,
{
  fn on_subscribe(&mut self, subscription: Subscription) {
    self.downstream.on_subscribe(subscription)
  }

  fn on_next(&mut self, item: Item) { self.downstream.on_next(item) }

  fn on_error(&mut self, err: StreamError) { self.downstream.on_error(err) }

  fn on_complete(&mut self) {
    (self.callback)();
    self.downstream.on_complete();
  }
}

#[cfg(test)]
mod test {
  use std::sync::{Arc, Mutex};

  use crate::prelude::*;

  #[test]
  fn do_on_next_sees_items_before_downstream() {
    let seen = Arc::new(Mutex::new(vec![]));
    let c_seen = seen.clone();
    let test = TestSubscriber::new();
    from_iter(vec![1, 2])
      .do_on_next(move |v| c_seen.lock().unwrap().push(*v))
      .subscribe(Box::new(test.clone()));
    assert_eq!(*seen.lock().unwrap(), vec![1, 2]);
    assert_eq!(test.items(), vec![1, 2]);
  }

  #[test]
  fn do_on_error_sees_the_error() {
    let seen = Arc::new(Mutex::new(None));
    let c_seen = seen.clone();
    let test = TestSubscriber::<i32>::new();
    throw(StreamError::msg("lost"))
      .do_on_error(move |e| *c_seen.lock().unwrap() = Some(e.to_string()))
      .subscribe(Box::new(test.clone()));
    assert_eq!(seen.lock().unwrap().as_deref(), Some("lost"));
    assert_eq!(test.errors().len(), 1);
  }

  #[test]
  fn do_on_complete_runs_once() {
    let count = Arc::new(Mutex::new(0));
    let c_count = count.clone();
    let test = TestSubscriber::new();
    from_iter(vec![1, 2, 3])
      .do_on_complete(move || *c_count.lock().unwrap() += 1)
      .subscribe(Box::new(test.clone()));
    assert_eq!(*count.lock().unwrap(), 1);
    assert!(test.is_completed());
  }
}
