use std::sync::Arc;

use crate::{
  error::{catch_transform, StreamError},
  scheduler::SchedulerRef,
  single::{deliver, BoxedSingleSubscriber, Single, SingleSubscriber},
  subscription::Subscription,
};

/// Created by [`SingleExt::map`](crate::single::SingleExt::map).
pub struct SingleMap<S, F> {
  source: S,
  processing: SchedulerRef,
  func: Arc<F>,
}

impl<S, F> SingleMap<S, F> {
  pub(crate) fn new(source: S, processing: SchedulerRef, func: F) -> Self {
    SingleMap { source, processing, func: Arc::new(func) }
  }
}

impl<S: Clone, F> Clone for SingleMap<S, F> {
  fn clone(&self) -> Self {
    SingleMap {
      source: self.source.clone(),
      processing: self.processing.clone(),
      func: self.func.clone(),
    }
  }
}

impl<S, F, B> Single for SingleMap<S, F>
where
  S: Single,
  F: Fn(S::Item) -> B + Send + Sync + 'static,
  B: Send + 'static,
{
  type Item = B;

  fn subscribe(
    &self,
    subscriber: BoxedSingleSubscriber<B>,
    scheduler: SchedulerRef,
  ) -> Subscription {
    let subscription = Subscription::new();
    let upstream = self.source.subscribe(
      Box::new(MapSingleSubscriber {
        downstream: subscriber,
        func: self.func.clone(),
        scheduler,
        subscription: subscription.clone(),
      }),
      self.processing.clone(),
    );
    subscription.add(upstream);
    subscription
  }
}

/// Runs on the processing scheduler and hands the result over to the
/// downstream's scheduler.
struct MapSingleSubscriber<B, F> {
  downstream: BoxedSingleSubscriber<B>,
  func: Arc<F>,
  scheduler: SchedulerRef,
  subscription: Subscription,
}

impl<A, B, F> SingleSubscriber<A> for MapSingleSubscriber<B, F>
where
  B: Send + 'static,
  F: Fn(A) -> B + Send + Sync,
{
  fn on_success(self: Box<Self>, value: A) {
    let func = &self.func;
    let outcome = catch_transform("map", || func(value));
    deliver(self.downstream, outcome, &*self.scheduler, self.subscription)
  }

  fn on_error(self: Box<Self>, err: StreamError) {
    deliver(self.downstream, Err(err), &*self.scheduler, self.subscription)
  }
}
