//! Processors and subjects
//!
//! A [`Processor`] is a subscriber that is also a publisher; a [`Subject`] is a
//! processor whose output items are its input items. Both are blanket
//! implemented, so any type implementing the two halves qualifies.

use crate::{publisher::Publisher, subscriber::Subscriber};

mod publish_subject;

pub use publish_subject::PublishSubject;

pub trait Processor<In>: Subscriber<In> + Publisher {}

impl<In, T> Processor<In> for T where T: Subscriber<In> + Publisher {}

pub trait Subject<Item>: Processor<Item> + Publisher<Item = Item> {}

impl<Item, T> Subject<Item> for T where T: Processor<Item> + Publisher<Item = Item> {}
