//! Multicast core shared by every `share*` operator
//!
//! One upstream subscription feeds a registry of downstream subscribers.
//!
//! - Every downstream is wrapped in a [`SerializedSubscriber`]. Signals are
//!   queued into it while the registry lock is held, which fixes the per
//!   subscriber order (replay first, then live items in emission order), and
//!   delivered after the lock is released.
//! - Each connection to the source carries an `epoch`. Disconnecting bumps the
//!   epoch so late signals from a cancelled connection are ignored.

use std::collections::VecDeque;

use crate::{
  error::StreamError,
  publisher::Publisher,
  rc::{MutArc, WeakMutArc},
  subscriber::{SerializedSubscriber, Signal, Subscriber},
  subscription::Subscription,
};

/// When the source is subscribed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Mode {
  /// On the first subscriber; cancelled when the last one leaves.
  Lazy,
  /// On construction; never cancelled by subscribers leaving.
  Eager,
}

pub(crate) struct Multicast<S: Publisher> {
  source: S,
  state: MutArc<MulticastState<S::Item>>,
}

struct MulticastState<Item> {
  mode: Mode,
  subscribers: Vec<(u64, SerializedSubscriber<Item>)>,
  next_id: u64,
  epoch: u64,
  connection: Connection,
  replay: ReplayBuffer<Item>,
  terminal: Option<Terminal>,
}

enum Connection {
  Idle,
  Connecting,
  Connected(Subscription),
}

/// A retained terminal signal.
#[derive(Clone)]
pub(crate) enum Terminal {
  Complete,
  Error(StreamError),
}

impl Terminal {
  pub(crate) fn signal<Item>(&self) -> Signal<Item> {
    match self {
      Terminal::Complete => Signal::Complete,
      Terminal::Error(err) => Signal::Error(err.clone()),
    }
  }
}

// ============================================================================
// Replay buffer
// ============================================================================

pub(crate) type SlotOf<Item> = Box<dyn Fn(&Item) -> Option<usize> + Send + Sync>;

/// Items replayed to a subscriber when it attaches.
pub(crate) enum ReplayBuffer<Item> {
  Disabled,
  /// The last `capacity` items, or every item when `capacity` is `None`.
  Last { capacity: Option<usize>, items: VecDeque<Item> },
  /// The latest item per slot; `slot_of` maps an item to its slot.
  LatestBySlot { slots: Vec<Option<Item>>, slot_of: SlotOf<Item> },
}

impl<Item: Clone> ReplayBuffer<Item> {
  pub(crate) fn last(capacity: Option<usize>) -> Self {
    match capacity {
      Some(0) => ReplayBuffer::Disabled,
      _ => ReplayBuffer::Last { capacity, items: VecDeque::new() },
    }
  }

  pub(crate) fn latest_by_slot(slots: usize, slot_of: SlotOf<Item>) -> Self {
    ReplayBuffer::LatestBySlot { slots: vec![None; slots], slot_of }
  }

  fn push(&mut self, item: &Item) {
    match self {
      ReplayBuffer::Disabled => {}
      ReplayBuffer::Last { capacity, items } => {
        if let Some(capacity) = *capacity {
          while items.len() >= capacity {
            items.pop_front();
          }
        }
        items.push_back(item.clone());
      }
      ReplayBuffer::LatestBySlot { slots, slot_of } => {
        if let Some(slot) = slot_of(item).and_then(|idx| slots.get_mut(idx)) {
          *slot = Some(item.clone());
        }
      }
    }
  }

  fn items(&self) -> Vec<Item> {
    match self {
      ReplayBuffer::Disabled => vec![],
      ReplayBuffer::Last { items, .. } => items.iter().cloned().collect(),
      ReplayBuffer::LatestBySlot { slots, .. } => slots.iter().flatten().cloned().collect(),
    }
  }

  fn clear(&mut self) {
    match self {
      ReplayBuffer::Disabled => {}
      ReplayBuffer::Last { items, .. } => items.clear(),
      ReplayBuffer::LatestBySlot { slots, .. } => slots.iter_mut().for_each(|s| *s = None),
    }
  }
}

// ============================================================================
// Multicast
// ============================================================================

impl<S> Multicast<S>
where
  S: Publisher,
  S::Item: Clone,
{
  pub(crate) fn new(source: S, mode: Mode, replay: ReplayBuffer<S::Item>) -> Self {
    let multicast = Multicast {
      source,
      state: MutArc::own(MulticastState {
        mode,
        subscribers: vec![],
        next_id: 0,
        epoch: 0,
        connection: Connection::Idle,
        replay,
        terminal: None,
      }),
    };
    if mode == Mode::Eager {
      multicast.state.rc_deref_mut().connection = Connection::Connecting;
      multicast.connect(0);
    }
    multicast
  }

  pub(crate) fn subscriber_count(&self) -> usize { self.state.rc_deref_mut().subscribers.len() }

  pub(crate) fn is_connected(&self) -> bool {
    !matches!(self.state.rc_deref_mut().connection, Connection::Idle)
  }

  pub(crate) fn subscribe(&self, downstream: SerializedSubscriber<S::Item>) {
    let registration = Subscription::new();
    downstream.bind(registration.clone());
    let (id, connect_epoch) = {
      let mut state = self.state.rc_deref_mut();
      downstream.enqueue(Signal::Subscribe(registration.clone()));
      for item in state.replay.items() {
        downstream.enqueue(Signal::Next(item));
      }
      if let Some(terminal) = state.terminal.as_ref() {
        downstream.enqueue(terminal.signal());
        (None, None)
      } else {
        let id = state.next_id;
        state.next_id += 1;
        state.subscribers.push((id, downstream.clone()));
        let connect = state.mode == Mode::Lazy && matches!(state.connection, Connection::Idle);
        if connect {
          state.connection = Connection::Connecting;
        }
        (Some(id), connect.then_some(state.epoch))
      }
    };

    if let Some(id) = id {
      let weak = self.state.downgrade();
      registration.add_teardown(move || unregister(&weak, id));
    }
    downstream.drain();
    if let Some(epoch) = connect_epoch {
      self.connect(epoch);
    }
  }

  fn connect(&self, epoch: u64) {
    {
      let state = self.state.rc_deref_mut();
      // Everyone may have left while the first subscriber was being drained.
      if state.epoch != epoch || !matches!(state.connection, Connection::Connecting) {
        return;
      }
      tracing::trace!(epoch, mode = ?state.mode, "multicast connecting to source");
    }
    self.source.subscribe(Box::new(MulticastUpstream { state: self.state.clone(), epoch }));
  }
}

/// Removes subscriber `id`. A lazy multicast left without subscribers cancels
/// its source subscription.
fn unregister<Item>(weak: &WeakMutArc<MulticastState<Item>>, id: u64) {
  let Some(state) = weak.upgrade() else { return };
  let upstream = {
    let mut state = state.rc_deref_mut();
    state.subscribers.retain(|(sid, _)| *sid != id);
    if state.mode != Mode::Lazy
      || !state.subscribers.is_empty()
      || matches!(state.connection, Connection::Idle)
    {
      return;
    }
    state.epoch += 1;
    match std::mem::replace(&mut state.connection, Connection::Idle) {
      Connection::Connected(upstream) => Some(upstream),
      _ => None,
    }
  };
  tracing::debug!("last subscriber left; disconnecting multicast source");
  if let Some(upstream) = upstream {
    upstream.cancel();
  }
}

struct MulticastUpstream<Item> {
  state: MutArc<MulticastState<Item>>,
  epoch: u64,
}

impl<Item: Clone + Send + 'static> MulticastUpstream<Item> {
  /// Fans `terminal` out and resets the registry. A lazy multicast clears its
  /// buffer and may connect again; an eager one keeps the buffer and replays
  /// the terminal to later subscribers.
  fn finish(&self, terminal: Terminal) {
    let subscribers = {
      let mut state = self.state.rc_deref_mut();
      if state.epoch != self.epoch {
        return;
      }
      let subscribers = std::mem::take(&mut state.subscribers);
      for (_, subscriber) in &subscribers {
        subscriber.enqueue(terminal.signal());
      }
      state.connection = Connection::Idle;
      state.epoch += 1;
      match state.mode {
        Mode::Eager => state.terminal = Some(terminal),
        Mode::Lazy => state.replay.clear(),
      }
      tracing::trace!(subscribers = subscribers.len(), "multicast source terminated");
      subscribers
    };
    for (_, subscriber) in subscribers {
      subscriber.drain();
    }
  }
}

impl<Item: Clone + Send + 'static> Subscriber<Item> for MulticastUpstream<Item> {
  fn on_subscribe(&mut self, subscription: Subscription) {
    let stale = {
      let mut state = self.state.rc_deref_mut();
      if state.epoch == self.epoch && matches!(state.connection, Connection::Connecting) {
        state.connection = Connection::Connected(subscription.clone());
        false
      } else {
        true
      }
    };
    if stale {
      subscription.cancel();
    }
  }

  fn on_next(&mut self, item: Item) {
    let subscribers = {
      let mut state = self.state.rc_deref_mut();
      if state.epoch != self.epoch {
        return;
      }
      state.replay.push(&item);
      let subscribers: Vec<_> = state.subscribers.iter().map(|(_, s)| s.clone()).collect();
      // clone for all but the last
      if let Some((last, rest)) = subscribers.split_last() {
        for subscriber in rest {
          subscriber.enqueue(Signal::Next(item.clone()));
        }
        last.enqueue(Signal::Next(item));
      }
      subscribers
    };
    for subscriber in subscribers {
      subscriber.drain();
    }
  }

  fn on_error(&mut self, err: StreamError) { self.finish(Terminal::Error(err)) }

  fn on_complete(&mut self) { self.finish(Terminal::Complete) }
}
