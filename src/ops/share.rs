//! Share operators
//!
//! | Operator | Connects | Replays |
//! |----------|----------|---------|
//! | `share` | first subscriber, ref counted | nothing |
//! | `share_and_replay(n)` | first subscriber, ref counted | last `n` items |
//! | `share_and_replay_all` | first subscriber, ref counted | every item |
//! | `share_hot_and_replay(n)` | on construction | last `n` items and the terminal |
//! | `share_and_replay_types_on_resubscribe` | first subscriber, ref counted | latest per tag |

use std::sync::Arc;

use crate::{
  ops::multicast::{Mode, Multicast, ReplayBuffer},
  publisher::Publisher,
  subscriber::{BoxedSubscriber, SerializedSubscriber},
};

/// Items that belong to one of a closed set of kinds.
///
/// Used by [`share_and_replay_types_on_resubscribe`][replay_types] to keep the
/// latest item of each kind.
///
/// [replay_types]: crate::publisher::PublisherExt::share_and_replay_types_on_resubscribe
pub trait Tagged {
  type Tag: Copy + Eq + Send + Sync + 'static;

  fn tag(&self) -> Self::Tag;
}

/// A multicasting publisher created by one of the `share*` operators. Clones
/// attach to the same upstream execution.
pub struct Shared<S: Publisher>(Arc<Multicast<S>>);

impl<S: Publisher> Clone for Shared<S> {
  fn clone(&self) -> Self { Shared(self.0.clone()) }
}

impl<S> Shared<S>
where
  S: Publisher + 'static,
  S::Item: Clone,
{
  pub(crate) fn share(source: S) -> Self {
    Self::new(source, Mode::Lazy, ReplayBuffer::Disabled)
  }

  pub(crate) fn share_and_replay(source: S, count: usize) -> Self {
    Self::new(source, Mode::Lazy, ReplayBuffer::last(Some(count)))
  }

  pub(crate) fn share_and_replay_all(source: S) -> Self {
    Self::new(source, Mode::Lazy, ReplayBuffer::last(None))
  }

  pub(crate) fn share_hot_and_replay(source: S, count: usize) -> Self {
    Self::new(source, Mode::Eager, ReplayBuffer::last(Some(count)))
  }

  pub(crate) fn share_and_replay_types_on_resubscribe(
    source: S,
    tags: Vec<<S::Item as Tagged>::Tag>,
  ) -> Self
  where
    S::Item: Tagged,
  {
    let slots = tags.len();
    let slot_of = move |item: &S::Item| {
      let tag = item.tag();
      tags.iter().position(|t| *t == tag)
    };
    Self::new(source, Mode::Lazy, ReplayBuffer::latest_by_slot(slots, Box::new(slot_of)))
  }

  fn new(source: S, mode: Mode, replay: ReplayBuffer<S::Item>) -> Self {
    Shared(Arc::new(Multicast::new(source, mode, replay)))
  }

  /// Number of currently attached subscribers.
  pub fn subscriber_count(&self) -> usize { self.0.subscriber_count() }

  /// Whether the source is currently subscribed.
  pub fn is_connected(&self) -> bool { self.0.is_connected() }
}

impl<S> Publisher for Shared<S>
where
  S: Publisher + 'static,
  S::Item: Clone,
{
  type Item = S::Item;

  fn subscribe(&self, subscriber: BoxedSubscriber<S::Item>) {
    self.0.subscribe(SerializedSubscriber::new(subscriber))
  }
}
