use std::{
  future::Future,
  pin::Pin,
  sync::Arc,
  task::{Context, Poll},
};

use futures::channel::oneshot;
use pin_project_lite::pin_project;

use crate::{
  error::StreamError,
  scheduler::ImmediateScheduler,
  single::{Single, SingleSubscriber},
  subscription::SubscriptionGuard,
};

pin_project! {
  /// Created by [`SingleExt::into_future`](crate::single::SingleExt::into_future).
  ///
  /// Resolves to [`StreamError::Disconnected`] if the single is dropped
  /// without producing an outcome.
  pub struct SingleFuture<T> {
    #[pin]
    receiver: oneshot::Receiver<Result<T, StreamError>>,
    guard: SubscriptionGuard,
  }
}

impl<T: Send + 'static> SingleFuture<T> {
  pub(crate) fn new<S: Single<Item = T> + ?Sized>(single: &S) -> Self {
    let (sender, receiver) = oneshot::channel();
    let subscription =
      single.subscribe(Box::new(OneshotSubscriber(sender)), Arc::new(ImmediateScheduler));
    SingleFuture { receiver, guard: subscription.cancel_on_drop() }
  }
}

impl<T> Future for SingleFuture<T> {
  type Output = Result<T, StreamError>;

  fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
    self.project().receiver.poll(cx).map(|r| r.unwrap_or_else(|_| Err(StreamError::Disconnected)))
  }
}

struct OneshotSubscriber<T>(oneshot::Sender<Result<T, StreamError>>);

impl<T: Send> SingleSubscriber<T> for OneshotSubscriber<T> {
  fn on_success(self: Box<Self>, value: T) { let _ = self.0.send(Ok(value)); }

  fn on_error(self: Box<Self>, err: StreamError) { let _ = self.0.send(Err(err)); }
}
