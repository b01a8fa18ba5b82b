use std::sync::Arc;

use crate::{
  error::{catch_transform, StreamError},
  publisher::Publisher,
  subscriber::{BoxedSubscriber, Subscriber},
  subscription::Subscription,
};

/// Created by [`filter_map`](crate::publisher::PublisherExt::filter_map) and
/// [`filter_nulls`](crate::publisher::PublisherExt::filter_nulls).
pub struct FilterMapOp<S, F> {
  source: S,
  func: Arc<F>,
}

impl<S, F> FilterMapOp<S, F> {
  pub(crate) fn new(source: S, func: F) -> Self { FilterMapOp { source, func: Arc::new(func) } }
}

impl<S: Clone, F> Clone for FilterMapOp<S, F> {
  fn clone(&self) -> Self { FilterMapOp { source: self.source.clone(), func: self.func.clone() } }
}

impl<S, F, B> Publisher for FilterMapOp<S, F>
where
  S: Publisher,
  F: Fn(S::Item) -> Option<B> + Send + Sync + 'static,
  B: Send + 'static,
{
  type Item = B;

  fn subscribe(&self, subscriber: BoxedSubscriber<B>) {
    self.source.subscribe(Box::new(FilterMapSubscriber {
      downstream: subscriber,
      func: self.func.clone(),
      upstream: None,
      done: false,
    }))
  }
}

pub struct FilterMapSubscriber<B, F> {
  downstream: BoxedSubscriber<B>,
  func: Arc<F>,
  upstream: Option<Subscription>,
  done: bool,
}

impl<A, B, F> Subscriber<A> for FilterMapSubscriber<B, F>
where
  B: Send + 'static,
  F: Fn(A) -> Option<B> + Send + Sync,
{
  fn on_subscribe(&mut self, subscription: Subscription) {
    self.upstream = Some(subscription.clone());
    self.downstream.on_subscribe(subscription);
  }

  fn on_next(&mut self, item: A) {
    if self.done {
      return;
    }
    match catch_transform("filter_map", || (self.func)(item)) {
      Ok(Some(mapped)) => self.downstream.on_next(mapped),
      Ok(None) => {}
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
  fn parses_what_it_can() {
    let test = TestSubscriber::new();
    from_iter(vec!["1", "two", "3"])
      .filter_map(|s| s.parse::<i32>().ok())
      .subscribe(Box::new(test.clone()));
    assert_eq!(test.items(), vec![1, 3]);
    assert!(test.is_completed());
  }

  #[test]
  fn filter_nulls_unwraps_present_values() {
    let test = TestSubscriber::new();
    from_iter(vec![Some(1), None, Some(3), None])
      .filter_nulls()
      .subscribe(Box::new(test.clone()));
    assert_eq!(test.events(), vec![
      Event::Subscribe,
      Event::Next(1),
      Event::Next(3),
      Event::Complete
    ]);
  }
}
