use crate::{
  error::StreamError,
  rc::{MutArc, WeakMutArc},
  scheduler::SchedulerRef,
  single::{deliver, BoxedSingleSubscriber, Single},
  subscription::Subscription,
};

/// A hot single that is completed from the outside.
///
/// The first call to [`success`](SinglePublisher::success) or
/// [`error`](SinglePublisher::error) settles it; later calls are ignored. The
/// outcome is retained, so subscribers that attach afterwards still receive
/// it. Clones share the same outcome.
pub struct SinglePublisher<T>(MutArc<SingleState<T>>);

struct SingleState<T> {
  outcome: Option<Result<T, StreamError>>,
  waiting: Vec<Waiting<T>>,
  next_id: u64,
}

struct Waiting<T> {
  id: u64,
  subscriber: BoxedSingleSubscriber<T>,
  scheduler: SchedulerRef,
  subscription: Subscription,
}

impl<T> Clone for SinglePublisher<T> {
  fn clone(&self) -> Self { SinglePublisher(self.0.clone()) }
}

impl<T: Clone + Send + 'static> Default for SinglePublisher<T> {
  fn default() -> Self {
    SinglePublisher(MutArc::own(SingleState { outcome: None, waiting: vec![], next_id: 0 }))
  }
}

impl<T: Clone + Send + 'static> SinglePublisher<T> {
  pub fn new() -> Self { Self::default() }

  pub fn success(&self, value: T) { self.settle(Ok(value)) }

  pub fn error(&self, err: StreamError) { self.settle(Err(err)) }

  /// Whether an outcome has been set.
  pub fn is_settled(&self) -> bool { self.0.rc_deref_mut().outcome.is_some() }

  fn settle(&self, outcome: Result<T, StreamError>) {
    let waiting = {
      let mut state = self.0.rc_deref_mut();
      if state.outcome.is_some() {
        tracing::trace!("single already settled; ignoring outcome");
        return;
      }
      state.outcome = Some(outcome.clone());
      std::mem::take(&mut state.waiting)
    };
    for w in waiting {
      deliver(w.subscriber, outcome.clone(), &*w.scheduler, w.subscription);
    }
  }
}

impl<T: Clone + Send + 'static> Single for SinglePublisher<T> {
  type Item = T;

  fn subscribe(
    &self,
    subscriber: BoxedSingleSubscriber<T>,
    scheduler: SchedulerRef,
  ) -> Subscription {
    let subscription = Subscription::new();
    let mut state = self.0.rc_deref_mut();
    match state.outcome.clone() {
      Some(outcome) => {
        drop(state);
        deliver(subscriber, outcome, &*scheduler, subscription.clone());
      }
      None => {
        let id = state.next_id;
        state.next_id += 1;
        let waiting = Waiting { id, subscriber, scheduler, subscription: subscription.clone() };
        state.waiting.push(waiting);
        drop(state);
        let weak = self.0.downgrade();
        subscription.add_teardown(move || remove(&weak, id));
      }
    }
    subscription
  }
}

fn remove<T>(weak: &WeakMutArc<SingleState<T>>, id: u64) {
  if let Some(state) = weak.upgrade() {
    state.rc_deref_mut().waiting.retain(|w| w.id != id);
  }
}
