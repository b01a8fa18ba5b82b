use crate::{publisher::Publisher, subscriber::BoxedSubscriber, subscription::Subscription};

/// Emits every element of `iter`, then completes. The iterable is cloned for
/// each subscriber; emission stops early once the subscription is cancelled.
///
/// ```
/// use rxstream::prelude::*;
///
/// from_iter(vec![0, 1, 2, 3]).subscribe_next(|v| println!("{v},"));
/// ```
pub fn from_iter<I>(iter: I) -> FromIter<I>
where
  I: IntoIterator + Clone + Send + Sync,
  I::Item: Send + 'static,
{
  FromIter(iter)
}

#[derive(Clone)]
pub struct FromIter<I>(I);

impl<I> Publisher for FromIter<I>
where
  I: IntoIterator + Clone + Send + Sync,
  I::Item: Send + 'static,
{
  type Item = I::Item;

  fn subscribe(&self, mut subscriber: BoxedSubscriber<Self::Item>) {
    let subscription = Subscription::new();
    subscriber.on_subscribe(subscription.clone());
    for item in self.0.clone() {
      if subscription.is_cancelled() {
        return;
      }
      subscriber.on_next(item);
    }
    if !subscription.is_cancelled() {
      subscriber.on_complete();
    }
  }
}
