//! PublishSubject: a hot, single-subscriber subject
//!
//! Signals pushed into the subject are forwarded to the attached subscriber,
//! or dropped if there is none. Only one subscriber may be attached at a time;
//! use [`share`](crate::publisher::PublisherExt::share) to fan out.

use crate::{
  error::StreamError,
  publisher::Publisher,
  rc::{MutArc, WeakMutArc},
  subscriber::{BoxedSubscriber, SerializedSubscriber, Signal, Subscriber},
  subscription::Subscription,
};

/// Clones share one subject.
pub struct PublishSubject<Item>(MutArc<SubjectState<Item>>);

struct SubjectState<Item> {
  subscriber: Option<(u64, SerializedSubscriber<Item>)>,
  next_id: u64,
}

impl<Item> Clone for PublishSubject<Item> {
  fn clone(&self) -> Self { PublishSubject(self.0.clone()) }
}

impl<Item> Default for PublishSubject<Item> {
  fn default() -> Self {
    PublishSubject(MutArc::own(SubjectState { subscriber: None, next_id: 0 }))
  }
}

impl<Item: Send + 'static> PublishSubject<Item> {
  pub fn new() -> Self { Self::default() }

  pub fn next(&self, item: Item) { self.emit(Signal::Next(item)) }

  /// Fails the attached subscriber and detaches it.
  pub fn error(&self, err: StreamError) { self.emit(Signal::Error(err)) }

  /// Completes the attached subscriber and detaches it.
  pub fn complete(&self) { self.emit(Signal::Complete) }

  pub fn has_subscriber(&self) -> bool { self.0.rc_deref_mut().subscriber.is_some() }

  fn emit(&self, signal: Signal<Item>) {
    let subscriber = {
      let mut state = self.0.rc_deref_mut();
      if signal.is_terminal() {
        state.subscriber.take().map(|(_, s)| s)
      } else {
        state.subscriber.as_ref().map(|(_, s)| s.clone())
      }
    };
    if let Some(subscriber) = subscriber {
      subscriber.emit(signal);
    }
  }
}

impl<Item: Send + 'static> Publisher for PublishSubject<Item> {
  type Item = Item;

  fn subscribe(&self, subscriber: BoxedSubscriber<Item>) {
    let downstream = SerializedSubscriber::new(subscriber);
    let id = {
      let mut state = self.0.rc_deref_mut();
      if state.subscriber.is_some() {
        None
      } else {
        let id = state.next_id;
        state.next_id += 1;
        state.subscriber = Some((id, downstream.clone()));
        Some(id)
      }
    };

    let Some(id) = id else {
      tracing::warn!("PublishSubject subscribed to while a subscriber is attached");
      downstream.emit(Signal::Subscribe(Subscription::closed()));
      let err = StreamError::AlreadySubscribed { publisher: "PublishSubject" };
      downstream.emit(Signal::Error(err));
      return;
    };

    let registration = Subscription::new();
    let weak = self.0.downgrade();
    registration.add_teardown(move || detach(&weak, id));
    downstream.bind(registration.clone());
    downstream.emit(Signal::Subscribe(registration));
  }
}

fn detach<Item>(weak: &WeakMutArc<SubjectState<Item>>, id: u64) {
  let Some(state) = weak.upgrade() else { return };
  let mut state = state.rc_deref_mut();
  if matches!(state.subscriber, Some((sid, _)) if sid == id) {
    state.subscriber = None;
  }
}

/// Lets a subject be subscribed to another publisher. The upstream
/// subscription is not retained: the subject stays open to direct pushes.
impl<Item: Send + 'static> Subscriber<Item> for PublishSubject<Item> {
  fn on_subscribe(&mut self, _: Subscription) {}

  fn on_next(&mut self, item: Item) { self.next(item) }

  fn on_error(&mut self, err: StreamError) { self.error(err) }

  fn on_complete(&mut self) { self.complete() }
}

#[cfg(test)]
mod test {
  use crate::prelude::*;

  #[test]
  fn forwards_to_attached_subscriber() {
    let subject = PublishSubject::new();
    subject.next(0);
    let test = TestSubscriber::new();
    subject.subscribe(Box::new(test.clone()));
    subject.next(1);
    subject.next(2);
    subject.complete();
    subject.next(3);
    assert_eq!(test.events(), vec![
      Event::Subscribe,
      Event::Next(1),
      Event::Next(2),
      Event::Complete
    ]);
    assert!(!subject.has_subscriber());
  }

  #[test]
  fn second_subscriber_fails_first_keeps_receiving() {
    let subject = PublishSubject::new();
    let first = TestSubscriber::new();
    let second = TestSubscriber::new();
    subject.subscribe(Box::new(first.clone()));
    subject.subscribe(Box::new(second.clone()));
    subject.next("x");

    assert_eq!(first.items(), vec!["x"]);
    assert_eq!(second.events(), vec![
      Event::Subscribe,
      Event::Error("PublishSubject already subscribed; consider using share()".into())
    ]);
    assert!(second.subscription().unwrap().is_cancelled());
  }

  #[test]
  fn cancel_detaches_and_allows_resubscribe() {
    let subject = PublishSubject::new();
    let first = TestSubscriber::new();
    subject.subscribe(Box::new(first.clone()));
    first.cancel();
    assert!(!subject.has_subscriber());

    let second = TestSubscriber::new();
    subject.subscribe(Box::new(second.clone()));
    subject.next(1);
    assert!(first.items().is_empty());
    assert_eq!(second.items(), vec![1]);
  }

  #[test]
  fn cancel_from_inside_on_subscribe() {
    struct CancelOnSubscribe;

    impl Subscriber<i32> for CancelOnSubscribe {
      fn on_subscribe(&mut self, subscription: Subscription) { subscription.cancel() }
      fn on_next(&mut self, _: i32) { panic!("cancelled subscriber received an item") }
      fn on_error(&mut self, _: StreamError) {}
      fn on_complete(&mut self) {}
    }

    let subject = PublishSubject::new();
    subject.subscribe(Box::new(CancelOnSubscribe));
    assert!(!subject.has_subscriber());
    subject.next(1);
  }

  #[test]
  fn error_detaches() {
    let subject = PublishSubject::<i32>::new();
    let test = TestSubscriber::new();
    subject.subscribe(Box::new(test.clone()));
    subject.error(StreamError::msg("gone"));
    assert_eq!(test.errors().len(), 1);
    assert!(!subject.has_subscriber());
  }

  #[test]
  fn acts_as_a_subscriber() {
    let subject = PublishSubject::new();
    let test = TestSubscriber::new();
    subject.subscribe(Box::new(test.clone()));
    from_iter(vec![1, 2]).subscribe(Box::new(subject.clone()));
    assert_eq!(test.items(), vec![1, 2]);
    assert!(test.is_completed());
  }

  fn assert_subject<S: Subject<i32>>(_: &S) {}

  #[test]
  fn is_a_subject() { assert_subject(&PublishSubject::<i32>::new()); }
}
