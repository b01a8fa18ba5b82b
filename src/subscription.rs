use std::fmt::{Debug, Formatter};

use smallvec::SmallVec;

use crate::rc::MutArc;

/// Cancellation handle handed to a subscriber through `on_subscribe`.
///
/// A subscription owns child subscriptions and teardown callbacks; cancelling
/// it runs every one of them exactly once. Clones share the same state.
#[derive(Clone, Default)]
pub struct Subscription(MutArc<Inner>);

#[derive(Default)]
struct Inner {
  closed: bool,
  teardown: SmallVec<[Teardown; 1]>,
}

enum Teardown {
  Callback(Box<dyn FnOnce() + Send>),
  Child(Subscription),
}

impl Teardown {
  fn run(self) {
    match self {
      Teardown::Callback(f) => f(),
      Teardown::Child(child) => child.cancel(),
    }
  }

  fn is_closed(&self) -> bool {
    match self {
      Teardown::Callback(_) => false,
      Teardown::Child(child) => child.is_cancelled(),
    }
  }
}

impl Subscription {
  pub fn new() -> Self { Self::default() }

  /// A subscription that runs `f` when cancelled.
  pub fn from_fn(f: impl FnOnce() + Send + 'static) -> Self {
    let subscription = Self::new();
    subscription.add_teardown(f);
    subscription
  }

  /// An already cancelled subscription.
  pub fn closed() -> Self {
    let subscription = Self::new();
    subscription.cancel();
    subscription
  }

  /// Ties `child` to this subscription. If this one is already cancelled the
  /// child is cancelled immediately.
  pub fn add(&self, child: Subscription) {
    if self.0.ptr_eq(&child.0) {
      return;
    }
    self.push(Teardown::Child(child));
  }

  pub fn add_teardown(&self, f: impl FnOnce() + Send + 'static) {
    self.push(Teardown::Callback(Box::new(f)));
  }

  fn push(&self, teardown: Teardown) {
    let mut inner = self.0.rc_deref_mut();
    if inner.closed {
      drop(inner);
      teardown.run();
    } else {
      inner.teardown.retain(|t| !t.is_closed());
      inner.teardown.push(teardown);
    }
  }

  /// Cancels this subscription and everything it owns. Idempotent.
  pub fn cancel(&self) {
    let teardown = {
      let mut inner = self.0.rc_deref_mut();
      if inner.closed {
        return;
      }
      inner.closed = true;
      std::mem::take(&mut inner.teardown)
    };
    for t in teardown {
      t.run();
    }
  }

  #[inline]
  pub fn is_cancelled(&self) -> bool { self.0.rc_deref_mut().closed }

  /// Activates "RAII" behavior for this subscription: it is cancelled as soon
  /// as the returned guard goes out of scope.
  ///
  /// **Attention:** if the guard is not bound to a variable it is dropped, and
  /// the subscription cancelled, immediately.
  pub fn cancel_on_drop(self) -> SubscriptionGuard { SubscriptionGuard(self) }

  #[cfg(test)]
  pub(crate) fn teardown_size(&self) -> usize { self.0.rc_deref_mut().teardown.len() }
}

impl Debug for Subscription {
  fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
    let inner = self.0.rc_deref_mut();
    f.debug_struct("Subscription")
      .field("closed", &inner.closed)
      .field("teardown_count", &inner.teardown.len())
      .finish()
  }
}

/// An RAII implementation of a "scoped subscribed" of a subscription.
/// When this structure is dropped (falls out of scope), the subscription is
/// cancelled.
///
/// If you want to drop it immediately, wrap it in its own scope.
#[derive(Debug)]
#[must_use]
pub struct SubscriptionGuard(pub(crate) Subscription);

impl SubscriptionGuard {
  pub fn new(subscription: Subscription) -> Self { SubscriptionGuard(subscription) }

  pub fn subscription(&self) -> &Subscription { &self.0 }
}

impl Drop for SubscriptionGuard {
  #[inline]
  fn drop(&mut self) { self.0.cancel() }
}
