use std::sync::{
  atomic::{AtomicUsize, Ordering},
  Arc,
};

use crate::{
  error::StreamError,
  publisher::{BoxedPublisher, Publisher},
  subscriber::{BoxedSubscriber, SerializedSubscriber, Signal, Subscriber},
  subscription::Subscription,
};

/// Subscribes to every source at once and forwards items as they arrive.
///
/// Completes after every source has completed. The first error is forwarded
/// immediately and cancels the remaining sources.
pub fn merge<Item: Send + 'static>(sources: Vec<BoxedPublisher<Item>>) -> Merge<Item> {
  Merge { sources: sources.into() }
}

pub struct Merge<Item> {
  sources: Arc<[BoxedPublisher<Item>]>,
}

impl<Item> Clone for Merge<Item> {
  fn clone(&self) -> Self { Merge { sources: self.sources.clone() } }
}

impl<Item: Send + 'static> Publisher for Merge<Item> {
  type Item = Item;

  fn subscribe(&self, subscriber: BoxedSubscriber<Item>) {
    let downstream = SerializedSubscriber::new(subscriber);
    let composite = Subscription::new();
    downstream.emit(Signal::Subscribe(composite.clone()));
    if self.sources.is_empty() {
      downstream.emit(Signal::Complete);
      return;
    }
    let remaining = Arc::new(AtomicUsize::new(self.sources.len()));
    for source in self.sources.iter() {
      if composite.is_cancelled() {
        break;
      }
      source.subscribe(Box::new(MergeInner {
        downstream: downstream.clone(),
        composite: composite.clone(),
        remaining: remaining.clone(),
        upstream: None,
        done: false,
      }));
    }
  }
}

struct MergeInner<Item> {
  downstream: SerializedSubscriber<Item>,
  composite: Subscription,
  remaining: Arc<AtomicUsize>,
  upstream: Option<Subscription>,
  done: bool,
}

impl<Item> MergeInner<Item> {
  fn is_stopped(&self) -> bool { self.done || self.composite.is_cancelled() }
}

impl<Item: Send + 'static> Subscriber<Item> for MergeInner<Item> {
  fn on_subscribe(&mut self, subscription: Subscription) {
    // Cancels `subscription` on arrival if the merge is already cancelled.
    self.composite.add(subscription.clone());
    self.upstream = Some(subscription);
  }

  fn on_next(&mut self, item: Item) {
    if !self.is_stopped() {
      self.downstream.emit(Signal::Next(item));
    }
  }

  fn on_error(&mut self, err: StreamError) {
    if !self.is_stopped() {
      self.done = true;
      self.downstream.emit(Signal::Error(err));
      self.composite.cancel();
    }
  }

  fn on_complete(&mut self) {
    if !self.is_stopped() {
      self.done = true;
      if let Some(upstream) = self.upstream.take() {
        upstream.cancel();
      }
      if self.remaining.fetch_sub(1, Ordering::AcqRel) == 1 {
        self.downstream.emit(Signal::Complete);
      }
    }
  }
}

#[cfg(test)]
mod test {
  use crate::prelude::*;

  #[test]
  fn both_items_then_one_complete() {
    let test = TestSubscriber::new();
    merge(vec![just(1).box_it(), just(2).box_it()]).subscribe(Box::new(test.clone()));
    assert_eq!(
      test.events(),
      vec![Event::Subscribe, Event::Next(1), Event::Next(2), Event::Complete]
    );
  }

  #[test]
  fn completes_after_last_source() {
    let a = PublishSubject::new();
    let b = PublishSubject::new();
    let test = TestSubscriber::new();
    a.clone().merge_with(b.clone()).subscribe(Box::new(test.clone()));
    b.next(1);
    a.next(2);
    a.complete();
    assert!(!test.is_completed());
    b.next(3);
    b.complete();
    assert_eq!(test.items(), vec![1, 2, 3]);
    assert_eq!(test.terminal_count(), 1);
  }

  #[test]
  fn cancel_stops_every_source() {
    let a = PublishSubject::new();
    let b = PublishSubject::new();
    let test = TestSubscriber::new();
    a.clone().merge_with(b.clone()).subscribe(Box::new(test.clone()));
    a.next(1);
    test.cancel();
    a.next(2);
    b.next(3);
    assert_eq!(test.items(), vec![1]);
    assert!(!a.has_subscriber());
    assert!(!b.has_subscriber());
  }

  #[test]
  fn first_error_wins_and_cancels_the_rest() {
    let a = PublishSubject::<i32>::new();
    let b = PublishSubject::new();
    let test = TestSubscriber::new();
    a.clone().merge_with(b.clone()).subscribe(Box::new(test.clone()));
    a.error(StreamError::msg("first"));
    assert!(!b.has_subscriber());
    b.error(StreamError::msg("second"));
    assert_eq!(test.events(), vec![Event::Subscribe, Event::Error("first".into())]);
  }

  #[test]
  fn empty_merge_completes() {
    let test = TestSubscriber::<i32>::new();
    merge(vec![]).subscribe(Box::new(test.clone()));
    assert_eq!(test.events(), vec![Event::Subscribe, Event::Complete]);
  }

  #[test]
  fn concurrent_sources() {
    let sources: Vec<_> = (0..4)
      .map(|t| from_iter((0..250).map(move |i| t * 1000 + i).collect::<Vec<_>>()))
      .map(|s| s.subscribe_on(NewThreadScheduler).box_it())
      .collect();
    let items = merge(sources).block_for_result(std::time::Duration::from_secs(5)).unwrap();
    assert_eq!(items.len(), 1000);
  }
}
