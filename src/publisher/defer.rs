use crate::{
  error::catch_transform, publisher::Publisher, subscriber::BoxedSubscriber,
  subscription::Subscription,
};

/// Calls `factory` on every subscribe and subscribes to the publisher it
/// returns. A panic in `factory` is delivered as an error.
pub fn defer<P, F>(factory: F) -> Defer<F>
where
  F: Fn() -> P + Send + Sync,
  P: Publisher,
{
  Defer(factory)
}

#[derive(Clone)]
pub struct Defer<F>(F);

impl<P, F> Publisher for Defer<F>
where
  F: Fn() -> P + Send + Sync,
  P: Publisher,
{
  type Item = P::Item;

  fn subscribe(&self, mut subscriber: BoxedSubscriber<Self::Item>) {
    match catch_transform("defer", &self.0) {
      Ok(publisher) => publisher.subscribe(subscriber),
      Err(err) => {
        subscriber.on_subscribe(Subscription::new());
        subscriber.on_error(err);
      }
    }
  }
}
