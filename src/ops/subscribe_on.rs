use std::sync::Arc;

use crate::{publisher::Publisher, scheduler::Scheduler, subscriber::BoxedSubscriber};

/// Created by [`subscribe_on`](crate::publisher::PublisherExt::subscribe_on).
///
/// Only the call to the source's `subscribe` moves to the scheduler; the
/// source decides on which thread it then emits.
pub struct SubscribeOnOp<S, Sd> {
  source: Arc<S>,
  scheduler: Arc<Sd>,
}

impl<S, Sd> SubscribeOnOp<S, Sd> {
  pub(crate) fn new(source: S, scheduler: Sd) -> Self {
    SubscribeOnOp { source: Arc::new(source), scheduler: Arc::new(scheduler) }
  }
}

impl<S, Sd> Clone for SubscribeOnOp<S, Sd> {
  fn clone(&self) -> Self {
    SubscribeOnOp { source: self.source.clone(), scheduler: self.scheduler.clone() }
  }
}

impl<S, Sd> Publisher for SubscribeOnOp<S, Sd>
where
  S: Publisher + 'static,
  Sd: Scheduler + 'static,
{
  type Item = S::Item;

  fn subscribe(&self, subscriber: BoxedSubscriber<S::Item>) {
    let source = self.source.clone();
    self.scheduler.schedule_side_effect(Box::new(move || source.subscribe(subscriber)));
  }
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
  fn subscribe_is_deferred_to_the_scheduler() {
    let queue = QueueScheduler::new();
    let test = TestSubscriber::new();
    just(1).subscribe_on(queue.clone()).subscribe(Box::new(test.clone()));
    assert!(!test.is_subscribed());
    queue.run_pending();
    assert_eq!(test.events(), vec![Event::Subscribe, Event::Next(1), Event::Complete]);
  }

  #[test]
  fn source_runs_on_another_thread() {
    let caller = thread::current().id();
    let seen = Arc::new(Mutex::new(None));
    let c_seen = seen.clone();
    let items = defer(move || {
      *c_seen.lock().unwrap() = Some(thread::current().id());
      from_iter(vec!["a", "b"])
    })
    .subscribe_on(NewThreadScheduler)
    .block_for_result(Duration::from_secs(5))
    .unwrap();
    assert_eq!(items, vec!["a", "b"]);
    assert_ne!(seen.lock().unwrap().unwrap(), caller);
  }

  #[test]
  fn handle_cancelled_before_subscribe_cancels_source() {
    let queue = QueueScheduler::new();
    let subject = PublishSubject::<i32>::new();
    let handle = subject.clone().subscribe_on(queue.clone()).subscribe_next(|_| {});
    handle.cancel();
    queue.run_pending();
    assert!(!subject.has_subscriber());
  }
}
