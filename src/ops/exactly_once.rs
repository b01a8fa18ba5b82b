//! ExactlyOnce operator
//!
//! Subscribes to the source as soon as it is created and holds every item
//! until a subscriber takes it. Each item is delivered to one subscriber only;
//! while a subscriber is attached, a second one is refused. Cancelling the
//! attached subscriber makes the publisher queue again for the next one.

use std::collections::VecDeque;

use crate::{
  error::StreamError,
  ops::multicast::Terminal,
  publisher::Publisher,
  rc::{MutArc, WeakMutArc},
  subscriber::{BoxedSubscriber, SerializedSubscriber, Signal, Subscriber},
  subscription::Subscription,
};

/// Created by [`exactly_once`](crate::publisher::PublisherExt::exactly_once).
pub struct ExactlyOnce<Item>(MutArc<OnceState<Item>>);

struct OnceState<Item> {
  subscriber: Option<Attached<Item>>,
  next_id: u64,
  pending: VecDeque<Item>,
  terminal: Option<Terminal>,
  upstream: Option<Subscription>,
}

/// The current subscriber. Until `live` is set, items from the source keep
/// going to `pending` so the backlog is handed over in order.
struct Attached<Item> {
  id: u64,
  downstream: SerializedSubscriber<Item>,
  live: bool,
}

impl<Item> Clone for ExactlyOnce<Item> {
  fn clone(&self) -> Self { ExactlyOnce(self.0.clone()) }
}

impl<Item: Send + 'static> ExactlyOnce<Item> {
  pub(crate) fn new<P>(source: P) -> Self
  where
    P: Publisher<Item = Item>,
  {
    let state = MutArc::own(OnceState {
      subscriber: None,
      next_id: 0,
      pending: VecDeque::new(),
      terminal: None,
      upstream: None,
    });
    source.subscribe(Box::new(ExactlyOnceUpstream(state.clone())));
    ExactlyOnce(state)
  }

  /// Items received while nobody was subscribed.
  pub fn pending(&self) -> usize { self.0.rc_deref_mut().pending.len() }

  /// Cancels the subscription to the source. Items already queued are still
  /// delivered.
  pub fn disconnect(&self) {
    let upstream = self.0.rc_deref_mut().upstream.take();
    if let Some(upstream) = upstream {
      upstream.cancel();
    }
  }

  /// Moves queued items to subscriber `id` one at a time, so whatever is left
  /// when it cancels stays queued for the next subscriber. Ends by marking the
  /// subscriber live, or by delivering the retained terminal.
  fn hand_over(
    &self,
    id: u64,
    registration: &Subscription,
    downstream: &SerializedSubscriber<Item>,
  ) {
    loop {
      if registration.is_cancelled() {
        return;
      }
      {
        let mut state = self.0.rc_deref_mut();
        if !matches!(&state.subscriber, Some(a) if a.id == id) {
          return;
        }
        if let Some(item) = state.pending.pop_front() {
          downstream.enqueue(Signal::Next(item));
        } else if let Some(terminal) = state.terminal.as_ref() {
          downstream.enqueue(terminal.signal());
          state.subscriber = None;
        } else {
          if let Some(attached) = state.subscriber.as_mut() {
            attached.live = true;
          }
          return;
        }
      }
      downstream.drain();
    }
  }
}

impl<Item: Send + 'static> Publisher for ExactlyOnce<Item> {
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
        state.subscriber = Some(Attached { id, downstream: downstream.clone(), live: false });
        Some(id)
      }
    };

    let Some(id) = id else {
      tracing::warn!("exactly_once publisher subscribed to while a subscriber is attached");
      downstream.emit(Signal::Subscribe(Subscription::closed()));
      downstream.emit(Signal::Error(StreamError::AlreadySubscribed { publisher: "exactly_once" }));
      return;
    };

    let registration = Subscription::new();
    let weak = self.0.downgrade();
    registration.add_teardown(move || detach(&weak, id));
    downstream.bind(registration.clone());
    downstream.emit(Signal::Subscribe(registration.clone()));
    self.hand_over(id, &registration, &downstream);
  }
}

fn detach<Item>(weak: &WeakMutArc<OnceState<Item>>, id: u64) {
  let Some(state) = weak.upgrade() else { return };
  let mut state = state.rc_deref_mut();
  if matches!(&state.subscriber, Some(a) if a.id == id) {
    state.subscriber = None;
  }
}

struct ExactlyOnceUpstream<Item>(MutArc<OnceState<Item>>);

impl<Item: Send + 'static> ExactlyOnceUpstream<Item> {
  fn finish(&self, terminal: Terminal) {
    let subscriber = {
      let mut state = self.0.rc_deref_mut();
      state.upstream = None;
      let subscriber = match state.subscriber.take() {
        Some(attached) if attached.live => {
          attached.downstream.enqueue(terminal.signal());
          Some(attached.downstream)
        }
        // Still receiving the backlog; it picks the terminal up when done.
        other => {
          state.subscriber = other;
          None
        }
      };
      state.terminal = Some(terminal);
      subscriber
    };
    if let Some(subscriber) = subscriber {
      subscriber.drain();
    }
  }
}

impl<Item: Send + 'static> Subscriber<Item> for ExactlyOnceUpstream<Item> {
  fn on_subscribe(&mut self, subscription: Subscription) {
    self.0.rc_deref_mut().upstream = Some(subscription)
  }

  fn on_next(&mut self, item: Item) {
    let subscriber = {
      let mut state = self.0.rc_deref_mut();
      match state.subscriber.as_ref() {
        Some(attached) if attached.live => {
          attached.downstream.enqueue(Signal::Next(item));
          Some(attached.downstream.clone())
        }
        _ => {
          state.pending.push_back(item);
          None
        }
      }
    };
    if let Some(subscriber) = subscriber {
      subscriber.drain();
    }
  }

  fn on_error(&mut self, err: StreamError) { self.finish(Terminal::Error(err)) }

  fn on_complete(&mut self) { self.finish(Terminal::Complete) }
}
