use std::sync::Arc;

use crate::{
  error::{catch_transform, StreamError},
  publisher::Publisher,
  subscriber::{BoxedSubscriber, Subscriber},
  subscription::Subscription,
};

/// Created by [`on_error_return`](crate::publisher::PublisherExt::on_error_return).
pub struct OnErrorReturnOp<S, F> {
  source: S,
  func: Arc<F>,
}

impl<S, F> OnErrorReturnOp<S, F> {
  pub(crate) fn new(source: S, func: F) -> Self { OnErrorReturnOp { source, func: Arc::new(func) } }
}

impl<S: Clone, F> Clone for OnErrorReturnOp<S, F> {
  fn clone(&self) -> Self {
    OnErrorReturnOp { source: self.source.clone(), func: self.func.clone() }
  }
}

impl<S, F> Publisher for OnErrorReturnOp<S, F>
where
  S: Publisher,
  F: Fn(StreamError) -> S::Item + Send + Sync + 'static,
{
  type Item = S::Item;

  fn subscribe(&self, subscriber: BoxedSubscriber<S::Item>) {
    let func = self.func.clone();
    self.source.subscribe(Box::new(OnErrorReturnSubscriber { downstream: subscriber, func }))
  }
}

pub struct OnErrorReturnSubscriber<Item, F> {
  downstream: BoxedSubscriber<Item>,
  func: Arc<F>,
}

impl<Item, F> Subscriber<Item> for OnErrorReturnSubscriber<Item, F>
where
  Item: Send + 'static,
  F: Fn(StreamError) -> Item + Send + Sync,
{
  fn on_subscribe(&mut self, subscription: Subscription) {
    self.downstream.on_subscribe(subscription)
  }

  fn on_next(&mut self, item: Item) { self.downstream.on_next(item) }

  fn on_error(&mut self, err: StreamError) {
    tracing::debug!(error = %err, label = err.as_label(), "replacing error with a fallback item");
    let func = &self.func;
    match catch_transform("on_error_return", || func(err)) {
      Ok(item) => {
        self.downstream.on_next(item);
        self.downstream.on_complete();
      }
      Err(err) => self.downstream.on_error(err),
    }
  }

  fn on_complete(&mut self) { self.downstream.on_complete() }
}
