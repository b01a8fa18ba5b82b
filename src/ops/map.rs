use std::sync::Arc;

use crate::{
  error::{catch_transform, BoxError, StreamError},
  publisher::Publisher,
  subscriber::{BoxedSubscriber, Subscriber},
  subscription::Subscription,
};

/// Created by [`map`](crate::publisher::PublisherExt::map).
pub struct MapOp<S, F> {
  source: S,
  func: Arc<F>,
}

impl<S, F> MapOp<S, F> {
  pub(crate) fn new(source: S, func: F) -> Self { MapOp { source, func: Arc::new(func) } }
}

impl<S: Clone, F> Clone for MapOp<S, F> {
  fn clone(&self) -> Self { MapOp { source: self.source.clone(), func: self.func.clone() } }
}

impl<S, F, B> Publisher for MapOp<S, F>
where
  S: Publisher,
  F: Fn(S::Item) -> B + Send + Sync + 'static,
  B: Send + 'static,
{
  type Item = B;

  fn subscribe(&self, subscriber: BoxedSubscriber<B>) {
    self.source.subscribe(Box::new(MapSubscriber::new(
      subscriber,
      self.func.clone(),
      |f: &F, item: S::Item| catch_transform("map", || f(item)),
    )))
  }
}

/// Created by [`try_map`](crate::publisher::PublisherExt::try_map).
pub struct TryMapOp<S, F> {
  source: S,
  func: Arc<F>,
}

impl<S, F> TryMapOp<S, F> {
  pub(crate) fn new(source: S, func: F) -> Self { TryMapOp { source, func: Arc::new(func) } }
}

impl<S: Clone, F> Clone for TryMapOp<S, F> {
  fn clone(&self) -> Self { TryMapOp { source: self.source.clone(), func: self.func.clone() } }
}

impl<S, F, B, E> Publisher for TryMapOp<S, F>
where
  S: Publisher,
  F: Fn(S::Item) -> Result<B, E> + Send + Sync + 'static,
  E: Into<BoxError>,
  B: Send + 'static,
{
  type Item = B;

  fn subscribe(&self, subscriber: BoxedSubscriber<B>) {
    self.source.subscribe(Box::new(MapSubscriber::new(
      subscriber,
      self.func.clone(),
      |f: &F, item: S::Item| {
        catch_transform("try_map", || f(item))?.map_err(|e| StreamError::transform("try_map", e))
      },
    )))
  }
}

/// Applies a fallible transform to each item. The first failure is delivered
/// downstream as an error and cancels the source.
pub struct MapSubscriber<A, B, F> {
  downstream: BoxedSubscriber<B>,
  func: Arc<F>,
  apply: fn(&F, A) -> Result<B, StreamError>,
  upstream: Option<Subscription>,
  done: bool,
}

impl<A, B, F> MapSubscriber<A, B, F> {
  fn new(
    downstream: BoxedSubscriber<B>,
    func: Arc<F>,
    apply: fn(&F, A) -> Result<B, StreamError>,
  ) -> Self {
    MapSubscriber { downstream, func, apply, upstream: None, done: false }
  }
}

impl<A, B, F> Subscriber<A> for MapSubscriber<A, B, F>
where
  B: Send + 'static,
  F: Send + Sync,
{
  fn on_subscribe(&mut self, subscription: Subscription) {
    self.upstream = Some(subscription.clone());
    self.downstream.on_subscribe(subscription);
  }

  fn on_next(&mut self, item: A) {
    if self.done {
      return;
    }
    match (self.apply)(&self.func, item) {
      Ok(mapped) => self.downstream.on_next(mapped),
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
