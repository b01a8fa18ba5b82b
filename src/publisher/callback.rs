//! Bridge from callback-style asynchronous APIs
//!
//! A function that accepts a one-shot completion callback and returns a
//! [`CancellableTask`] handle becomes a cold [`Publisher`]: each subscribe
//! starts one task, the callback result is emitted followed by completion, and
//! cancelling the subscription cancels the task.

use std::{marker::PhantomData, sync::Arc};

use futures::future::AbortHandle;

use crate::{
  error::{BoxError, StreamError},
  publisher::Publisher,
  subscriber::{BoxedSubscriber, SerializedSubscriber, Signal},
  subscription::Subscription,
};

/// Handle to an operation started by a callback-style API.
pub trait CancellableTask: Send + Sync + 'static {
  fn cancel(&self);

  /// Starts the operation. Called once, after the subscription is wired up.
  fn resume(&self) {}
}

impl CancellableTask for AbortHandle {
  fn cancel(&self) { self.abort() }
}

/// One-shot completion callback handed to a callback-style API.
pub type Callback<T> = Box<dyn FnOnce(T) + Send>;

/// Turns `Fn(Callback<T>) -> impl CancellableTask` into a publisher of `T`.
pub trait AsPublisher<T>: Sized {
  fn as_publisher(self) -> FromCallback<Self, T>;
}

impl<T, H, F> AsPublisher<T> for F
where
  F: Fn(Callback<T>) -> H + Send + Sync,
  H: CancellableTask,
  T: Send + 'static,
{
  fn as_publisher(self) -> FromCallback<Self, T> { from_callback(self) }
}

pub fn from_callback<T, H, F>(start: F) -> FromCallback<F, T>
where
  F: Fn(Callback<T>) -> H + Send + Sync,
  H: CancellableTask,
  T: Send + 'static,
{
  FromCallback { start, _p: PhantomData }
}

/// As [`from_callback`], for APIs reporting a `Result`; `Err` is delivered
/// through `on_error`.
pub fn from_result_callback<T, E, H, F>(start: F) -> FromResultCallback<F, T, E>
where
  F: Fn(Callback<Result<T, E>>) -> H + Send + Sync,
  H: CancellableTask,
  T: Send + 'static,
  E: Into<BoxError> + Send + 'static,
{
  FromResultCallback { start, _p: PhantomData }
}

pub struct FromCallback<F, T> {
  start: F,
  _p: PhantomData<fn() -> T>,
}

pub struct FromResultCallback<F, T, E> {
  start: F,
  _p: PhantomData<fn() -> (T, E)>,
}

impl<T, H, F> Publisher for FromCallback<F, T>
where
  F: Fn(Callback<T>) -> H + Send + Sync,
  H: CancellableTask,
  T: Send + 'static,
{
  type Item = T;

  fn subscribe(&self, subscriber: BoxedSubscriber<T>) {
    bridge(subscriber, &self.start, |downstream, item| {
      downstream.emit(Signal::Next(item));
      downstream.emit(Signal::Complete);
    })
  }
}

impl<T, E, H, F> Publisher for FromResultCallback<F, T, E>
where
  F: Fn(Callback<Result<T, E>>) -> H + Send + Sync,
  H: CancellableTask,
  T: Send + 'static,
  E: Into<BoxError> + Send + 'static,
{
  type Item = T;

  fn subscribe(&self, subscriber: BoxedSubscriber<T>) {
    bridge(subscriber, &self.start, |downstream, result| match result {
      Ok(item) => {
        downstream.emit(Signal::Next(item));
        downstream.emit(Signal::Complete);
      }
      Err(err) => {
        downstream.emit(Signal::Error(StreamError::new(err)));
      }
    })
  }
}

fn bridge<T, R, H>(
  subscriber: BoxedSubscriber<T>,
  start: impl FnOnce(Callback<R>) -> H,
  deliver: fn(&SerializedSubscriber<T>, R),
) where
  T: Send + 'static,
  R: Send + 'static,
  H: CancellableTask,
{
  let downstream = SerializedSubscriber::new(subscriber);
  let subscription = Subscription::new();
  downstream.emit(Signal::Subscribe(subscription.clone()));
  if subscription.is_cancelled() {
    return;
  }

  let c_downstream = downstream.clone();
  let c_subscription = subscription.clone();
  let task = Arc::new(start(Box::new(move |result: R| {
    if !c_subscription.is_cancelled() {
      deliver(&c_downstream, result);
    }
  })));

  let c_task = task.clone();
  subscription.add_teardown(move || c_task.cancel());
  task.resume();
}

#[cfg(test)]
mod test {
  use std::sync::{Arc, Mutex};

  use futures::{
    executor::block_on,
    future::{self, AbortHandle, Abortable},
  };

  use crate::prelude::*;

  #[derive(Clone, Default)]
  struct FakeTask {
    log: Arc<Mutex<Vec<&'static str>>>,
  }

  impl CancellableTask for FakeTask {
    fn cancel(&self) { self.log.lock().unwrap().push("cancel") }
    fn resume(&self) { self.log.lock().unwrap().push("resume") }
  }

  type Pending<T> = Arc<Mutex<Option<Callback<T>>>>;

  fn fake_api<T: Send + 'static>(
    task: FakeTask,
    pending: Pending<T>,
  ) -> impl Fn(Callback<T>) -> FakeTask + Send + Sync {
    move |callback| {
      task.log.lock().unwrap().push("start");
      *pending.lock().unwrap() = Some(callback);
      task.clone()
    }
  }

  #[test]
  fn emits_result_then_completes() {
    let task = FakeTask::default();
    let pending: Pending<i32> = Arc::new(Mutex::new(None));
    let test = TestSubscriber::new();
    fake_api(task.clone(), pending.clone()).as_publisher().subscribe(Box::new(test.clone()));

    assert_eq!(*task.log.lock().unwrap(), vec!["start", "resume"]);
    assert_eq!(test.events(), vec![Event::Subscribe]);

    let callback = pending.lock().unwrap().take().unwrap();
    callback(7);
    assert_eq!(test.events(), vec![Event::Subscribe, Event::Next(7), Event::Complete]);
  }

  #[test]
  fn cancel_cancels_task_and_suppresses_callback() {
    let task = FakeTask::default();
    let pending: Pending<i32> = Arc::new(Mutex::new(None));
    let test = TestSubscriber::new();
    from_callback(fake_api(task.clone(), pending.clone())).subscribe(Box::new(test.clone()));

    test.cancel();
    assert_eq!(*task.log.lock().unwrap(), vec!["start", "resume", "cancel"]);
    let callback = pending.lock().unwrap().take().unwrap();
    callback(7);
    assert_eq!(test.events(), vec![Event::Subscribe]);
  }

  #[test]
  fn result_errors_reach_on_error() {
    let task = FakeTask::default();
    let pending: Pending<Result<i32, String>> = Arc::new(Mutex::new(None));
    let test = TestSubscriber::new();
    from_result_callback(fake_api(task, pending.clone())).subscribe(Box::new(test.clone()));

    let callback = pending.lock().unwrap().take().unwrap();
    callback(Err("timeout".to_owned()));
    assert_eq!(test.events(), vec![Event::Subscribe, Event::Error("timeout".into())]);
  }

  #[test]
  fn abort_handle_is_a_task() {
    let (handle, registration) = AbortHandle::new_pair();
    let work = Abortable::new(future::pending::<()>(), registration);
    let handle = Mutex::new(Some(handle));
    let publisher = from_callback(move |_: Callback<()>| handle.lock().unwrap().take().unwrap());
    let subscription = publisher.subscribe_next(|_| {});
    subscription.cancel();
    assert!(block_on(work).is_err());
  }
}
