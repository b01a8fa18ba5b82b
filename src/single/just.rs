use crate::{
  scheduler::SchedulerRef,
  single::{deliver, BoxedSingleSubscriber, Single},
  subscription::Subscription,
};

/// A single that succeeds with `value` for every subscriber.
pub fn just<T: Clone + Send + Sync + 'static>(value: T) -> Just<T> { Just(value) }

#[derive(Clone)]
pub struct Just<T>(T);

impl<T: Clone + Send + Sync + 'static> Single for Just<T> {
  type Item = T;

  fn subscribe(
    &self,
    subscriber: BoxedSingleSubscriber<T>,
    scheduler: SchedulerRef,
  ) -> Subscription {
    let subscription = Subscription::new();
    deliver(subscriber, Ok(self.0.clone()), &*scheduler, subscription.clone());
    subscription
  }
}
