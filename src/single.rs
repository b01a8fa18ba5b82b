//! Single-value results
//!
//! A [`Single`] produces exactly one value or one error. Unlike a stream it is
//! always subscribed together with a [`Scheduler`], and the result is always
//! delivered through that scheduler.
//!
//! Typical sources are [`Scheduler::schedule_operation`], which runs a
//! computation and reports its outcome through a hot [`SinglePublisher`], and
//! [`just`].

use std::sync::Arc;

use crate::{
  error::StreamError,
  publisher::undeliverable,
  scheduler::{Scheduler, SchedulerRef},
  subscription::Subscription,
};

mod future;
mod just;
mod map;
mod single_publisher;

pub use future::SingleFuture;
pub use just::{just, Just};
pub use map::SingleMap;
pub use single_publisher::SinglePublisher;

/// Receives the outcome of a [`Single`]. Exactly one of the two methods is
/// called, at most once.
pub trait SingleSubscriber<T>: Send {
  fn on_success(self: Box<Self>, value: T);

  fn on_error(self: Box<Self>, err: StreamError);
}

pub type BoxedSingleSubscriber<T> = Box<dyn SingleSubscriber<T>>;

/// A computation with one result.
pub trait Single: Send + Sync {
  type Item: Send + 'static;

  /// Attaches `subscriber`; its callback runs on `scheduler`. Cancelling the
  /// returned subscription before delivery suppresses the callback.
  fn subscribe(&self, subscriber: BoxedSingleSubscriber<Self::Item>, scheduler: SchedulerRef)
    -> Subscription;
}

impl<S: Single + ?Sized> Single for Arc<S> {
  type Item = S::Item;

  fn subscribe(
    &self,
    subscriber: BoxedSingleSubscriber<Self::Item>,
    scheduler: SchedulerRef,
  ) -> Subscription {
    (**self).subscribe(subscriber, scheduler)
  }
}

pub trait SingleExt: Single + Sized {
  /// Transforms the value on `processing`, then delivers it on the
  /// subscriber's scheduler. A panic in `f` becomes a
  /// [`StreamError::Transform`].
  fn map<B, F, Sd>(self, processing: Sd, f: F) -> SingleMap<Self, F>
  where
    F: Fn(Self::Item) -> B + Send + Sync + 'static,
    B: Send + 'static,
    Sd: Scheduler + 'static,
  {
    SingleMap::new(self, Arc::new(processing), f)
  }

  fn subscribe_fn<N, E, Sd>(&self, success: N, error: E, scheduler: Sd) -> Subscription
  where
    N: FnOnce(Self::Item) + Send + 'static,
    E: FnOnce(StreamError) + Send + 'static,
    Sd: Scheduler + 'static,
  {
    self.subscribe(Box::new(FnSingleSubscriber { success, error }), Arc::new(scheduler))
  }

  /// Subscribes with a success callback only.
  ///
  /// # Panics
  ///
  /// An error is logged and then raised as a panic on the scheduler that
  /// delivers it.
  fn call<N, Sd>(&self, callback: N, scheduler: Sd) -> Subscription
  where
    N: FnOnce(Self::Item) + Send + 'static,
    Sd: Scheduler + 'static,
  {
    self.subscribe_fn(callback, undeliverable, scheduler)
  }

  /// Awaits the outcome. Dropping the future cancels the subscription.
  fn into_future(&self) -> SingleFuture<Self::Item> { SingleFuture::new(self) }
}

impl<S: Single> SingleExt for S {}

struct FnSingleSubscriber<N, E> {
  success: N,
  error: E,
}

impl<T, N, E> SingleSubscriber<T> for FnSingleSubscriber<N, E>
where
  N: FnOnce(T) + Send,
  E: FnOnce(StreamError) + Send,
{
  fn on_success(self: Box<Self>, value: T) { (self.success)(value) }

  fn on_error(self: Box<Self>, err: StreamError) { (self.error)(err) }
}

/// Schedules delivery of `outcome` to `subscriber`, unless `subscription` is
/// cancelled by the time the task runs.
pub(crate) fn deliver<T: Send + 'static>(
  subscriber: BoxedSingleSubscriber<T>,
  outcome: Result<T, StreamError>,
  scheduler: &dyn Scheduler,
  subscription: Subscription,
) {
  scheduler.schedule_side_effect(Box::new(move || {
    if subscription.is_cancelled() {
      return;
    }
    match outcome {
      Ok(value) => subscriber.on_success(value),
      Err(err) => subscriber.on_error(err),
    }
  }));
}
