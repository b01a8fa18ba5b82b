use std::marker::PhantomData;

use crate::{
  error::StreamError, publisher::Publisher, subscriber::BoxedSubscriber,
  subscription::Subscription,
};

/// Emits `item` once, then completes. Every subscriber gets its own clone.
///
/// ```
/// use rxstream::prelude::*;
///
/// just(42).subscribe_next(|v| println!("{v}"));
/// ```
pub fn just<Item>(item: Item) -> Just<Item>
where
  Item: Clone + Send + Sync + 'static,
{
  Just(item)
}

#[derive(Clone)]
pub struct Just<Item>(Item);

impl<Item> Publisher for Just<Item>
where
  Item: Clone + Send + Sync + 'static,
{
  type Item = Item;

  fn subscribe(&self, mut subscriber: BoxedSubscriber<Item>) {
    let subscription = Subscription::new();
    subscriber.on_subscribe(subscription.clone());
    if subscription.is_cancelled() {
      return;
    }
    subscriber.on_next(self.0.clone());
    if !subscription.is_cancelled() {
      subscriber.on_complete();
    }
  }
}

/// Completes immediately without emitting.
pub fn empty<Item>() -> Empty<Item> { Empty(PhantomData) }

pub struct Empty<Item>(PhantomData<fn() -> Item>);

impl<Item> Clone for Empty<Item> {
  fn clone(&self) -> Self { Empty(PhantomData) }
}

impl<Item: Send + 'static> Publisher for Empty<Item> {
  type Item = Item;

  fn subscribe(&self, mut subscriber: BoxedSubscriber<Item>) {
    let subscription = Subscription::new();
    subscriber.on_subscribe(subscription.clone());
    if !subscription.is_cancelled() {
      subscriber.on_complete();
    }
  }
}

/// Fails immediately with `err`.
pub fn throw<Item>(err: StreamError) -> Throw<Item> { Throw { err, _p: PhantomData } }

pub struct Throw<Item> {
  err: StreamError,
  _p: PhantomData<fn() -> Item>,
}

impl<Item> Clone for Throw<Item> {
  fn clone(&self) -> Self { Throw { err: self.err.clone(), _p: PhantomData } }
}

impl<Item: Send + 'static> Publisher for Throw<Item> {
  type Item = Item;

  fn subscribe(&self, mut subscriber: BoxedSubscriber<Item>) {
    let subscription = Subscription::new();
    subscriber.on_subscribe(subscription.clone());
    if !subscription.is_cancelled() {
      subscriber.on_error(self.err.clone());
    }
  }
}
