use crate::{
  error::StreamError,
  publisher::Publisher,
  subscriber::{BoxedSubscriber, Subscriber},
  subscription::Subscription,
};

/// Created by [`first`](crate::publisher::PublisherExt::first).
#[derive(Clone)]
pub struct FirstOp<S> {
  source: S,
}

impl<S> FirstOp<S> {
  pub(crate) fn new(source: S) -> Self { FirstOp { source } }
}

impl<S: Publisher> Publisher for FirstOp<S> {
  type Item = S::Item;

  fn subscribe(&self, subscriber: BoxedSubscriber<S::Item>) {
    self
      .source
      .subscribe(Box::new(FirstSubscriber { downstream: subscriber, upstream: None, done: false }))
  }
}

pub struct FirstSubscriber<Item> {
  downstream: BoxedSubscriber<Item>,
  upstream: Option<Subscription>,
  done: bool,
}

impl<Item: Send + 'static> Subscriber<Item> for FirstSubscriber<Item> {
  fn on_subscribe(&mut self, subscription: Subscription) {
    self.upstream = Some(subscription.clone());
    self.downstream.on_subscribe(subscription);
  }

  fn on_next(&mut self, item: Item) {
    if self.done {
      return;
    }
    self.done = true;
    self.downstream.on_next(item);
    self.downstream.on_complete();
    if let Some(upstream) = self.upstream.take() {
      upstream.cancel();
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
  fn first_item_then_complete() {
    let test = TestSubscriber::new();
    from_iter(vec![1, 2, 3]).first().subscribe(Box::new(test.clone()));
    assert_eq!(test.events(), vec![Event::Subscribe, Event::Next(1), Event::Complete]);
  }

  #[test]
  fn cancels_the_source() {
    let subject = PublishSubject::new();
    let test = TestSubscriber::new();
    subject.clone().first().subscribe(Box::new(test.clone()));
    assert!(subject.has_subscriber());
    subject.next("a");
    assert!(!subject.has_subscriber());
    assert_eq!(test.items(), vec!["a"]);
    assert!(test.is_completed());
  }

  #[test]
  fn empty_source_just_completes() {
    let test = TestSubscriber::<i32>::new();
    empty().first().subscribe(Box::new(test.clone()));
    assert_eq!(test.events(), vec![Event::Subscribe, Event::Complete]);
  }
}
