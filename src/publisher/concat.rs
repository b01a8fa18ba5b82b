use std::sync::Arc;

use crate::{
  error::StreamError,
  publisher::{BoxedPublisher, Publisher},
  rc::MutArc,
  subscriber::{BoxedSubscriber, SerializedSubscriber, Signal, Subscriber},
  subscription::Subscription,
};

/// Subscribes to `sources` one after another: source `i + 1` is subscribed
/// only once source `i` has completed. An error ends the whole sequence.
pub fn concat<Item: Send + 'static>(sources: Vec<BoxedPublisher<Item>>) -> Concat<Item> {
  Concat { sources: sources.into() }
}

pub struct Concat<Item> {
  sources: Arc<[BoxedPublisher<Item>]>,
}

impl<Item> Clone for Concat<Item> {
  fn clone(&self) -> Self { Concat { sources: self.sources.clone() } }
}

impl<Item: Send + 'static> Publisher for Concat<Item> {
  type Item = Item;

  fn subscribe(&self, subscriber: BoxedSubscriber<Item>) {
    let run = Arc::new(ConcatRun {
      sources: self.sources.clone(),
      downstream: SerializedSubscriber::new(subscriber),
      composite: Subscription::new(),
      progress: MutArc::own(Progress { index: 0, wip: 0 }),
    });
    run.downstream.emit(Signal::Subscribe(run.composite.clone()));
    run.drain();
  }
}

struct ConcatRun<Item> {
  sources: Arc<[BoxedPublisher<Item>]>,
  downstream: SerializedSubscriber<Item>,
  composite: Subscription,
  progress: MutArc<Progress>,
}

struct Progress {
  index: usize,
  wip: usize,
}

impl<Item: Send + 'static> ConcatRun<Item> {
  /// Subscribes to the next source. A source that completes while it is being
  /// subscribed only bumps `wip`; the loop below picks the next one up, so the
  /// stack depth stays constant however many sources complete synchronously.
  fn drain(self: &Arc<Self>) {
    {
      let mut progress = self.progress.rc_deref_mut();
      progress.wip += 1;
      if progress.wip != 1 {
        return;
      }
    }
    loop {
      if self.composite.is_cancelled() {
        return;
      }
      let index = {
        let mut progress = self.progress.rc_deref_mut();
        let index = progress.index;
        progress.index += 1;
        index
      };
      match self.sources.get(index) {
        Some(source) => source.subscribe(Box::new(ConcatInner {
          run: self.clone(),
          upstream: None,
          done: false,
        })),
        None => {
          self.downstream.emit(Signal::Complete);
          return;
        }
      }
      let mut progress = self.progress.rc_deref_mut();
      progress.wip -= 1;
      if progress.wip == 0 {
        return;
      }
    }
  }
}

struct ConcatInner<Item> {
  run: Arc<ConcatRun<Item>>,
  upstream: Option<Subscription>,
  done: bool,
}

impl<Item> ConcatInner<Item> {
  fn is_stopped(&self) -> bool { self.done || self.run.composite.is_cancelled() }
}

impl<Item: Send + 'static> Subscriber<Item> for ConcatInner<Item> {
  fn on_subscribe(&mut self, subscription: Subscription) {
    self.run.composite.add(subscription.clone());
    self.upstream = Some(subscription);
  }

  fn on_next(&mut self, item: Item) {
    if !self.is_stopped() {
      self.run.downstream.emit(Signal::Next(item));
    }
  }

  fn on_error(&mut self, err: StreamError) {
    if !self.is_stopped() {
      self.done = true;
      self.run.downstream.emit(Signal::Error(err));
      self.run.composite.cancel();
    }
  }

  fn on_complete(&mut self) {
    if !self.is_stopped() {
      self.done = true;
      if let Some(upstream) = self.upstream.take() {
        upstream.cancel();
      }
      self.run.drain();
    }
  }
}
