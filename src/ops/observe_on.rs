//! ObserveOn operator
//!
//! Every signal is queued into a [`SerializedSubscriber`] and a drain task is
//! handed to the scheduler. Whichever task runs first delivers everything
//! queued so far, so order is kept even on a multi-threaded scheduler.

use std::sync::Arc;

use crate::{
  error::StreamError,
  publisher::Publisher,
  scheduler::Scheduler,
  subscriber::{BoxedSubscriber, SerializedSubscriber, Signal, Subscriber},
  subscription::Subscription,
};

/// Created by [`observe_on`](crate::publisher::PublisherExt::observe_on).
pub struct ObserveOnOp<S, Sd> {
  source: S,
  scheduler: Arc<Sd>,
}

impl<S, Sd> ObserveOnOp<S, Sd> {
  pub(crate) fn new(source: S, scheduler: Sd) -> Self {
    ObserveOnOp { source, scheduler: Arc::new(scheduler) }
  }
}

impl<S: Clone, Sd> Clone for ObserveOnOp<S, Sd> {
  fn clone(&self) -> Self {
    ObserveOnOp { source: self.source.clone(), scheduler: self.scheduler.clone() }
  }
}

impl<S, Sd> Publisher for ObserveOnOp<S, Sd>
where
  S: Publisher,
  Sd: Scheduler + 'static,
{
  type Item = S::Item;

  fn subscribe(&self, subscriber: BoxedSubscriber<S::Item>) {
    self.source.subscribe(Box::new(ObserveOnSubscriber {
      downstream: SerializedSubscriber::new(subscriber),
      scheduler: self.scheduler.clone(),
      upstream: None,
    }))
  }
}

pub struct ObserveOnSubscriber<Item, Sd> {
  downstream: SerializedSubscriber<Item>,
  scheduler: Arc<Sd>,
  upstream: Option<Subscription>,
}

impl<Item, Sd> ObserveOnSubscriber<Item, Sd>
where
  Item: Send + 'static,
  Sd: Scheduler,
{
  fn schedule(&self, signal: Signal<Item>) {
    if self.upstream.as_ref().map_or(false, Subscription::is_cancelled) {
      return;
    }
    if self.downstream.enqueue(signal) {
      let downstream = self.downstream.clone();
      self.scheduler.schedule_side_effect(Box::new(move || downstream.drain()));
    }
  }
}

impl<Item, Sd> Subscriber<Item> for ObserveOnSubscriber<Item, Sd>
where
  Item: Send + 'static,
  Sd: Scheduler,
{
  fn on_subscribe(&mut self, subscription: Subscription) {
    self.upstream = Some(subscription.clone());
    self.schedule(Signal::Subscribe(subscription));
  }

  fn on_next(&mut self, item: Item) { self.schedule(Signal::Next(item)) }

  fn on_error(&mut self, err: StreamError) { self.schedule(Signal::Error(err)) }

  fn on_complete(&mut self) { self.schedule(Signal::Complete) }
}

#[cfg(test)]
mod test {
  use std::{
    sync::{Arc, Mutex},
    thread,
    time::Duration,
  };

  use crate::prelude::*;

  #[test]
  fn nothing_is_delivered_until_the_scheduler_runs() {
    let queue = QueueScheduler::new();
    let test = TestSubscriber::new();
    from_iter(vec![1, 2]).observe_on(queue.clone()).subscribe(Box::new(test.clone()));
    assert!(test.events().is_empty());
    queue.run_pending();
    assert_eq!(test.events(), vec![
      Event::Subscribe,
      Event::Next(1),
      Event::Next(2),
      Event::Complete
    ]);
  }

  #[test]
  fn delivers_on_the_scheduler_thread() {
    let threads = Arc::new(Mutex::new(vec![]));
    let c_threads = threads.clone();
    let caller = thread::current().id();
    let items = from_iter(0..10)
      .observe_on(NewThreadScheduler)
      .do_on_next(move |_| c_threads.lock().unwrap().push(thread::current().id()))
      .block_for_result(Duration::from_secs(5))
      .unwrap();
    assert_eq!(items, (0..10).collect::<Vec<_>>());
    assert!(threads.lock().unwrap().iter().all(|id| *id != caller));
  }

  #[test]
  fn cancelled_subscription_stops_scheduling() {
    let queue = QueueScheduler::new();
    let subject = PublishSubject::new();
    let test = TestSubscriber::new();
    subject.clone().observe_on(queue.clone()).subscribe(Box::new(test.clone()));
    queue.run_pending();
    test.cancel();
    subject.next(1);
    assert_eq!(queue.pending(), 0);
    assert!(test.items().is_empty());
  }
}
