use std::sync::Arc;

use crate::{
  error::{catch_transform, StreamError},
  publisher::Publisher,
  subscriber::{BoxedSubscriber, Subscriber},
  subscription::Subscription,
};

/// Created by [`filter`](crate::publisher::PublisherExt::filter).
pub struct FilterOp<S, F> {
  source: S,
  predicate: Arc<F>,
}

impl<S, F> FilterOp<S, F> {
  pub(crate) fn new(source: S, predicate: F) -> Self {
    FilterOp { source, predicate: Arc::new(predicate) }
  }
}

impl<S: Clone, F> Clone for FilterOp<S, F> {
  fn clone(&self) -> Self {
    FilterOp { source: self.source.clone(), predicate: self.predicate.clone() }
  }
}

impl<S, F> Publisher for FilterOp<S, F>
where
  S: Publisher,
  F: Fn(&S::Item) -> bool + Send + Sync + 'static,
{
  type Item = S::Item;

  fn subscribe(&self, subscriber: BoxedSubscriber<S::Item>) {
    self.source.subscribe(Box::new(FilterSubscriber {
      downstream: subscriber,
      predicate: self.predicate.clone(),
      upstream: None,
      done: false,
    }))
  }
}

pub struct FilterSubscriber<Item, F> {
  downstream: BoxedSubscriber<Item>,
  predicate: Arc<F>,
  upstream: Option<Subscription>,
  done: bool,
}

impl<Item, F> Subscriber<Item> for FilterSubscriber<Item, F>
where
  Item: Send + 'static,
  F: Fn(&Item) -> bool + Send + Sync,
{
  fn on_subscribe(&mut self, subscription: Subscription) {
    self.upstream = Some(subscription.clone());
    self.downstream.on_subscribe(subscription);
  }

  fn on_next(&mut self, item: Item) {
    if self.done {
      return;
    }
    match catch_transform("filter", || (self.predicate)(&item)) {
      Ok(true) => self.downstream.on_next(item),
      Ok(false) => {}
      Err(err) => {
        self.done = true;
        self.downstream.on_error(err);
        if let Some(upstream) = self.upstream.take() {
          upstream.cancel();
        }
      }
    }
  }

  fn on_error(&mut self, err: StreamError) {
    if !self.done {
      self.done = true;
      self.downstream.on_error(err);
    }
  }

  fn on_complete(&mut self) {
    if !self.done {
      self.done = true;
      self.downstream.on_complete();
    }
  }
}

#[cfg(test)]
mod test {
  use crate::prelude::*;

  #[test]
  fn keeps_matching_items() {
    let test = TestSubscriber::new();
    from_iter(0..10).filter(|v| v % 2 == 0).subscribe(Box::new(test.clone()));
    assert_eq!(test.items(), vec![0, 2, 4, 6, 8]);
    assert!(test.is_completed());
  }

  #[test]
  fn predicate_panic_becomes_error() {
    let test = TestSubscriber::new();
    from_iter(0..10)
      .filter(|v| if *v == 2 { panic!("cannot judge") } else { true })
      .subscribe(Box::new(test.clone()));
    assert_eq!(test.items(), vec![0, 1]);
    assert!(matches!(test.errors()[0], StreamError::Transform { operator: "filter", .. }));
  }
}
