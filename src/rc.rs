//! Shared mutable cells used for subscription-time state.
//!
//! Every piece of state that more than one callback can touch (registries,
//! replay buffers, counters) lives behind a [`MutArc`]. Locks are never held
//! while calling into user code, so a panic in a callback cannot poison a cell;
//! poisoning is nevertheless recovered from instead of propagated.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

#[derive(Default)]
pub struct MutArc<T>(Arc<Mutex<T>>);

pub struct WeakMutArc<T>(Weak<Mutex<T>>);

impl<T> MutArc<T> {
  pub fn own(t: T) -> Self { Self(Arc::new(Mutex::new(t))) }

  #[inline]
  pub fn rc_deref_mut(&self) -> MutexGuard<'_, T> {
    self.0.lock().unwrap_or_else(PoisonError::into_inner)
  }

  #[inline]
  pub fn ptr_eq(&self, other: &Self) -> bool { Arc::ptr_eq(&self.0, &other.0) }

  pub fn downgrade(&self) -> WeakMutArc<T> { WeakMutArc(Arc::downgrade(&self.0)) }
}

impl<T> WeakMutArc<T> {
  pub fn upgrade(&self) -> Option<MutArc<T>> { self.0.upgrade().map(MutArc) }
}

impl<T> From<T> for MutArc<T> {
  #[inline]
  fn from(t: T) -> Self { Self::own(t) }
}

impl<T> Clone for MutArc<T> {
  #[inline]
  fn clone(&self) -> Self { Self(self.0.clone()) }
}

impl<T> Clone for WeakMutArc<T> {
  #[inline]
  fn clone(&self) -> Self { Self(self.0.clone()) }
}

#[cfg(test)]
mod test {
  use super::*;

  #[test]
  fn clones_share_state() {
    let a = MutArc::own(1);
    let b = a.clone();
    *b.rc_deref_mut() += 1;
    assert_eq!(*a.rc_deref_mut(), 2);
    assert!(a.ptr_eq(&b));
  }

  #[test]
  fn weak_does_not_keep_alive() {
    let a = MutArc::own(vec![1]);
    let weak = a.downgrade();
    assert!(weak.upgrade().is_some());
    drop(a);
    assert!(weak.upgrade().is_none());
  }

  #[test]
  fn recovers_from_poison() {
    let a = MutArc::own(0);
    let b = a.clone();
    let _ = std::thread::spawn(move || {
      let _guard = b.rc_deref_mut();
      panic!("poison the lock");
    })
    .join();
    *a.rc_deref_mut() = 7;
    assert_eq!(*a.rc_deref_mut(), 7);
  }
}
