//! Blocking collection of a publisher's items, for tests and simple tools.

use std::{
  sync::mpsc::{self, RecvTimeoutError},
  time::{Duration, Instant},
};

use crate::{
  error::{BlockError, StreamError},
  publisher::Publisher,
  subscriber::Subscriber,
  subscription::Subscription,
};

enum Received<Item> {
  Next(Item),
  Error(StreamError),
  Complete,
}

/// Subscribes to `publisher` and blocks until it completes, returning every
/// item. Fails with [`BlockError::Timeout`] if `timeout` passes first, in which
/// case the subscription is cancelled, and with [`BlockError::Stream`] if the
/// publisher fails.
///
/// Deadlocks if the publisher needs the calling thread to make progress, for
/// example when it emits through a [`QueueScheduler`](crate::scheduler::QueueScheduler)
/// drained by the same thread.
pub fn block_for_result<P>(publisher: &P, timeout: Duration) -> Result<Vec<P::Item>, BlockError>
where
  P: Publisher + ?Sized,
{
  let (sender, receiver) = mpsc::channel();
  let handle = Subscription::new();
  publisher.subscribe(Box::new(BlockingSubscriber { sender, handle: handle.clone() }));

  let deadline = Instant::now() + timeout;
  let mut items = vec![];
  loop {
    let wait = deadline.saturating_duration_since(Instant::now());
    match receiver.recv_timeout(wait) {
      Ok(Received::Next(item)) => items.push(item),
      Ok(Received::Complete) => return Ok(items),
      Ok(Received::Error(source)) => {
        return Err(BlockError::Stream { received: items.len(), source });
      }
      Err(RecvTimeoutError::Timeout) => {
        handle.cancel();
        tracing::debug!(received = items.len(), ?timeout, "timed out blocking for publisher");
        return Err(BlockError::Timeout { received: items.len() });
      }
      Err(RecvTimeoutError::Disconnected) => {
        return Err(BlockError::Stream { received: items.len(), source: StreamError::Disconnected });
      }
    }
  }
}

struct BlockingSubscriber<Item> {
  sender: mpsc::Sender<Received<Item>>,
  handle: Subscription,
}

impl<Item: Send> Subscriber<Item> for BlockingSubscriber<Item> {
  fn on_subscribe(&mut self, subscription: Subscription) { self.handle.add(subscription) }

  fn on_next(&mut self, item: Item) { let _ = self.sender.send(Received::Next(item)); }

  fn on_error(&mut self, err: StreamError) { let _ = self.sender.send(Received::Error(err)); }

  fn on_complete(&mut self) { let _ = self.sender.send(Received::Complete); }
}

#[cfg(test)]
mod test {
  use std::time::Duration;

  use crate::prelude::*;

  const WAIT: Duration = Duration::from_secs(5);

  #[test]
  fn collects_until_complete() {
    assert_eq!(from_iter(vec![1, 2, 3]).block_for_result(WAIT).unwrap(), vec![1, 2, 3]);
  }

  #[test]
  fn reports_stream_error() {
    let err = just(1)
      .concat_with(throw(StreamError::msg("bad")))
      .block_for_result(WAIT)
      .unwrap_err();
    assert!(matches!(err, BlockError::Stream { received: 1, .. }));
    assert_eq!(err.as_label(), "block_stream");
  }

  #[test]
  fn times_out_and_cancels() {
    let subject = PublishSubject::<i32>::new();
    let err = subject.clone().block_for_result(Duration::from_millis(20)).unwrap_err();
    assert!(matches!(err, BlockError::Timeout { received: 0 }));
    assert!(!subject.has_subscriber());
  }

  struct Forgetful;

  impl Publisher for Forgetful {
    type Item = i32;

    fn subscribe(&self, mut subscriber: BoxedSubscriber<i32>) {
      subscriber.on_subscribe(Subscription::new());
    }
  }

  #[test]
  fn subscriber_dropped_without_terminal() {
    let err = Forgetful.block_for_result(WAIT).unwrap_err();
    assert!(matches!(err, BlockError::Stream { source: StreamError::Disconnected, .. }));
  }
}
