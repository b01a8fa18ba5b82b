//! Subscriber trait and the serializing wrapper
//!
//! A [`Subscriber`] is the consumer side of the protocol. It receives exactly
//! one `on_subscribe`, then zero or more `on_next`, then at most one terminal
//! signal (`on_error` or `on_complete`).

use std::collections::VecDeque;

use crate::{error::StreamError, rc::MutArc, subscription::Subscription};

// ============================================================================
// Subscriber Trait
// ============================================================================

/// Consumer of a [`Publisher`](crate::publisher::Publisher).
pub trait Subscriber<Item>: Send {
  /// Always the first call. The subscription cancels the flow feeding this
  /// subscriber.
  fn on_subscribe(&mut self, subscription: Subscription);

  fn on_next(&mut self, item: Item);

  /// Terminal. Nothing is delivered after it.
  fn on_error(&mut self, err: StreamError);

  /// Terminal. Nothing is delivered after it.
  fn on_complete(&mut self);
}

pub type BoxedSubscriber<Item> = Box<dyn Subscriber<Item>>;

impl<Item, S> Subscriber<Item> for Box<S>
where
  S: Subscriber<Item> + ?Sized,
{
  #[inline]
  fn on_subscribe(&mut self, subscription: Subscription) { (**self).on_subscribe(subscription) }
  #[inline]
  fn on_next(&mut self, item: Item) { (**self).on_next(item) }
  #[inline]
  fn on_error(&mut self, err: StreamError) { (**self).on_error(err) }
  #[inline]
  fn on_complete(&mut self) { (**self).on_complete() }
}

// ============================================================================
// Signal
// ============================================================================

/// One protocol call, reified so it can be queued.
pub(crate) enum Signal<Item> {
  Subscribe(Subscription),
  Next(Item),
  Error(StreamError),
  Complete,
}

impl<Item> Signal<Item> {
  #[inline]
  pub(crate) fn is_terminal(&self) -> bool { matches!(self, Signal::Error(_) | Signal::Complete) }

  pub(crate) fn deliver(self, subscriber: &mut dyn Subscriber<Item>) {
    match self {
      Signal::Subscribe(s) => subscriber.on_subscribe(s),
      Signal::Next(item) => subscriber.on_next(item),
      Signal::Error(err) => subscriber.on_error(err),
      Signal::Complete => subscriber.on_complete(),
    }
  }
}

// ============================================================================
// SerializedSubscriber
// ============================================================================

/// Serializes signals arriving from any number of threads or upstream paths.
///
/// Signals are queued and delivered by whichever caller wins the `emitting`
/// flag (the "emitter loop"). A signal produced while the downstream is being
/// called, even re-entrantly from inside that call, is queued and delivered
/// after the current one returns. Nothing is queued after a terminal signal and
/// the downstream is released once the terminal has been delivered.
///
/// Once the subscription given to [`bind`](SerializedSubscriber::bind) is
/// cancelled, queued signals other than `Subscribe` are discarded. If the
/// downstream panics, the subscriber is terminated and later signals are
/// dropped.
pub struct SerializedSubscriber<Item>(MutArc<SerializedState<Item>>);

struct SerializedState<Item> {
  downstream: Option<BoxedSubscriber<Item>>,
  queue: VecDeque<Signal<Item>>,
  cancellation: Option<Subscription>,
  emitting: bool,
  terminated: bool,
}

impl<Item> Clone for SerializedSubscriber<Item> {
  fn clone(&self) -> Self { Self(self.0.clone()) }
}

impl<Item: 'static> SerializedSubscriber<Item> {
  pub fn new(downstream: BoxedSubscriber<Item>) -> Self {
    SerializedSubscriber(MutArc::own(SerializedState {
      downstream: Some(downstream),
      queue: VecDeque::new(),
      cancellation: None,
      emitting: false,
      terminated: false,
    }))
  }

  /// Stops delivery as soon as `subscription` is cancelled.
  pub(crate) fn bind(&self, subscription: Subscription) {
    self.0.rc_deref_mut().cancellation = Some(subscription);
  }

  /// Queues a signal without delivering it. Returns `false` if a terminal
  /// signal was already queued, in which case `signal` is dropped.
  pub(crate) fn enqueue(&self, signal: Signal<Item>) -> bool {
    let mut state = self.0.rc_deref_mut();
    if state.terminated {
      return false;
    }
    state.terminated = signal.is_terminal();
    state.queue.push_back(signal);
    true
  }

  /// Delivers queued signals unless another caller is already doing so.
  pub(crate) fn drain(&self) {
    let (mut downstream, cancellation) = {
      let mut state = self.0.rc_deref_mut();
      if state.emitting {
        return;
      }
      match state.downstream.take() {
        Some(downstream) => {
          state.emitting = true;
          (downstream, state.cancellation.clone())
        }
        None => return,
      }
    };
    let mut guard = EmitGuard(Some(&self.0));
    loop {
      let signal = {
        let mut state = self.0.rc_deref_mut();
        match state.queue.pop_front() {
          Some(signal) => signal,
          None => {
            state.emitting = false;
            state.downstream = Some(downstream);
            guard.disarm();
            return;
          }
        }
      };
      let terminal = signal.is_terminal();
      let cancelled = !matches!(signal, Signal::Subscribe(_))
        && cancellation.as_ref().map_or(false, Subscription::is_cancelled);
      if !cancelled {
        signal.deliver(&mut *downstream);
      }
      if terminal {
        {
          let mut state = self.0.rc_deref_mut();
          state.queue.clear();
          state.emitting = false;
        }
        guard.disarm();
        drop(downstream);
        return;
      }
    }
  }

  /// Whether a terminal signal has been accepted.
  pub fn is_terminated(&self) -> bool { self.0.rc_deref_mut().terminated }

  /// Queues `signal` and delivers it unless another caller is emitting.
  pub(crate) fn emit(&self, signal: Signal<Item>) {
    if self.enqueue(signal) {
      self.drain();
    }
  }
}

/// Terminates the subscriber if the downstream unwinds out of `drain`.
struct EmitGuard<'a, Item>(Option<&'a MutArc<SerializedState<Item>>>);

impl<Item> EmitGuard<'_, Item> {
  fn disarm(&mut self) { self.0 = None; }
}

impl<Item> Drop for EmitGuard<'_, Item> {
  fn drop(&mut self) {
    if let Some(state) = self.0.take() {
      tracing::warn!("downstream panicked; discarding further signals");
      let mut state = state.rc_deref_mut();
      state.queue.clear();
      state.emitting = false;
      state.terminated = true;
    }
  }
}

impl<Item: Send + 'static> Subscriber<Item> for SerializedSubscriber<Item> {
  fn on_subscribe(&mut self, subscription: Subscription) {
    self.emit(Signal::Subscribe(subscription))
  }

  fn on_next(&mut self, item: Item) { self.emit(Signal::Next(item)) }

  fn on_error(&mut self, err: StreamError) { self.emit(Signal::Error(err)) }

  fn on_complete(&mut self) { self.emit(Signal::Complete) }
}

#[cfg(test)]
mod test {
  use std::sync::{Arc, Mutex};

  use super::*;
  use crate::test_subscriber::{Event, TestSubscriber};

  #[test]
  fn delivers_in_order_and_stops_after_terminal() {
    let test = TestSubscriber::new();
    let mut serialized = SerializedSubscriber::new(Box::new(test.clone()));
    serialized.on_subscribe(Subscription::new());
    serialized.on_next(1);
    serialized.on_complete();
    serialized.on_next(2);
    serialized.on_error(StreamError::msg("late"));
    assert_eq!(test.events(), vec![Event::Subscribe, Event::Next(1), Event::Complete]);
    assert!(serialized.is_terminated());
  }

  #[test]
  fn cancelled_binding_discards_queued_items() {
    let test = TestSubscriber::new();
    let serialized = SerializedSubscriber::new(Box::new(test.clone()));
    let registration = Subscription::new();
    serialized.bind(registration.clone());
    serialized.enqueue(Signal::Subscribe(registration.clone()));
    serialized.enqueue(Signal::Next(1));
    serialized.enqueue(Signal::Complete);
    registration.cancel();
    serialized.drain();
    assert_eq!(test.events(), vec![Event::Subscribe]);
  }

  struct PanicsOnNext;

  impl Subscriber<i32> for PanicsOnNext {
    fn on_subscribe(&mut self, _: Subscription) {}
    fn on_next(&mut self, _: i32) { panic!("downstream failure") }
    fn on_error(&mut self, _: StreamError) {}
    fn on_complete(&mut self) {}
  }

  #[test]
  fn panicking_downstream_terminates_the_subscriber() {
    let serialized = SerializedSubscriber::new(Box::new(PanicsOnNext));
    serialized.clone().on_subscribe(Subscription::new());
    let mut c_serialized = serialized.clone();
    let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(move || {
      c_serialized.on_next(1)
    }));
    assert!(result.is_err());
    for i in 2..100 {
      serialized.clone().on_next(i);
    }
    assert!(serialized.is_terminated());
    let state = serialized.0.rc_deref_mut();
    assert!(state.queue.is_empty());
    assert!(!state.emitting);
  }

  struct Reentrant {
    me: Arc<Mutex<Option<SerializedSubscriber<i32>>>>,
    seen: Arc<Mutex<Vec<i32>>>,
  }

  impl Subscriber<i32> for Reentrant {
    fn on_subscribe(&mut self, _: Subscription) {}
    fn on_next(&mut self, item: i32) {
      self.seen.lock().unwrap().push(item);
      if item == 1 {
        let me = self.me.lock().unwrap().clone();
        if let Some(mut me) = me {
          me.on_next(3);
        }
        assert_eq!(*self.seen.lock().unwrap(), vec![1]);
      }
    }
    fn on_error(&mut self, _: StreamError) {}
    fn on_complete(&mut self) { self.me.lock().unwrap().take(); }
  }

  #[test]
  fn reentrant_signals_are_queued() {
    let seen = Arc::new(Mutex::new(vec![]));
    let me = Arc::new(Mutex::new(None));
    let mut serialized =
      SerializedSubscriber::new(Box::new(Reentrant { me: me.clone(), seen: seen.clone() }));
    *me.lock().unwrap() = Some(serialized.clone());

    serialized.on_subscribe(Subscription::new());
    serialized.on_next(1);
    serialized.on_next(2);
    serialized.on_complete();
    assert_eq!(*seen.lock().unwrap(), vec![1, 3, 2]);
  }

  #[test]
  fn concurrent_producers_never_interleave() {
    let test = TestSubscriber::new();
    let serialized = SerializedSubscriber::new(Box::new(test.clone()));
    serialized.clone().on_subscribe(Subscription::new());
    let handles: Vec<_> = (0..4)
      .map(|t| {
        let mut s = serialized.clone();
        std::thread::spawn(move || {
          for i in 0..100 {
            s.on_next(t * 1000 + i);
          }
        })
      })
      .collect();
    for h in handles {
      h.join().unwrap();
    }
    serialized.clone().on_complete();
    let items = test.items();
    assert_eq!(items.len(), 400);
    for t in 0..4 {
      let per_thread: Vec<_> = items.iter().filter(|i| **i / 1000 == t).collect();
      assert!(per_thread.windows(2).all(|w| w[0] < w[1]));
    }
    assert!(test.is_completed());
  }
}
