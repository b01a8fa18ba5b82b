//! A recording subscriber for tests.

use crate::{error::StreamError, rc::MutArc, subscriber::Subscriber, subscription::Subscription};

/// A recorded protocol call. Errors are kept as their display text so events
/// can be compared with `assert_eq!`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event<Item> {
  Subscribe,
  Next(Item),
  Error(String),
  Complete,
}

/// Records every signal it receives. Clones share the same record, so one
/// clone can be handed to a publisher and another kept for assertions.
pub struct TestSubscriber<Item> {
  state: MutArc<Record<Item>>,
}

struct Record<Item> {
  events: Vec<Event<Item>>,
  errors: Vec<StreamError>,
  subscription: Option<Subscription>,
  cancel_after: Option<usize>,
}

impl<Item> Clone for TestSubscriber<Item> {
  fn clone(&self) -> Self { Self { state: self.state.clone() } }
}

impl<Item> Default for TestSubscriber<Item> {
  fn default() -> Self {
    Self {
      state: MutArc::own(Record {
        events: vec![],
        errors: vec![],
        subscription: None,
        cancel_after: None,
      }),
    }
  }
}

impl<Item: Clone> TestSubscriber<Item> {
  pub fn new() -> Self { Self::default() }

  /// A subscriber that cancels itself once it has received `items` items.
  /// With `0` it cancels from inside `on_subscribe`.
  pub fn cancel_after(items: usize) -> Self {
    let test = Self::default();
    test.state.rc_deref_mut().cancel_after = Some(items);
    test
  }

  pub fn events(&self) -> Vec<Event<Item>> { self.state.rc_deref_mut().events.clone() }

  pub fn items(&self) -> Vec<Item> {
    let state = self.state.rc_deref_mut();
    state
      .events
      .iter()
      .filter_map(|e| match e {
        Event::Next(item) => Some(item.clone()),
        _ => None,
      })
      .collect()
  }

  pub fn is_completed(&self) -> bool {
    self.state.rc_deref_mut().events.iter().any(|e| matches!(e, Event::Complete))
  }

  pub fn is_subscribed(&self) -> bool { self.state.rc_deref_mut().subscription.is_some() }

  pub fn errors(&self) -> Vec<StreamError> { self.state.rc_deref_mut().errors.clone() }

  /// Number of terminal signals seen; a well behaved publisher never exceeds one.
  pub fn terminal_count(&self) -> usize {
    let state = self.state.rc_deref_mut();
    state.events.iter().filter(|e| matches!(e, Event::Complete | Event::Error(_))).count()
  }

  pub fn subscription(&self) -> Option<Subscription> {
    self.state.rc_deref_mut().subscription.clone()
  }

  /// Cancels the subscription received in `on_subscribe`, if any.
  pub fn cancel(&self) {
    let subscription = self.subscription();
    if let Some(subscription) = subscription {
      subscription.cancel();
    }
  }
}

impl<Item: Send> Subscriber<Item> for TestSubscriber<Item> {
  fn on_subscribe(&mut self, subscription: Subscription) {
    let cancel = {
      let mut state = self.state.rc_deref_mut();
      state.events.push(Event::Subscribe);
      state.subscription = Some(subscription.clone());
      state.cancel_after == Some(0)
    };
    if cancel {
      subscription.cancel();
    }
  }

  fn on_next(&mut self, item: Item) {
    let cancel = {
      let mut state = self.state.rc_deref_mut();
      state.events.push(Event::Next(item));
      let received = state.events.iter().filter(|e| matches!(e, Event::Next(_))).count();
      if state.cancel_after == Some(received) { state.subscription.clone() } else { None }
    };
    if let Some(subscription) = cancel {
      subscription.cancel();
    }
  }

  fn on_error(&mut self, err: StreamError) {
    let mut state = self.state.rc_deref_mut();
    state.events.push(Event::Error(err.to_string()));
    state.errors.push(err);
  }

  fn on_complete(&mut self) { self.state.rc_deref_mut().events.push(Event::Complete); }
}
