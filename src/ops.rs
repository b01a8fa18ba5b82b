//! Operators
//!
//! Every operator is a struct holding its source plus a subscriber struct that
//! forwards the protocol calls. They are reached through
//! [`PublisherExt`](crate::publisher::PublisherExt).

pub mod block;
pub mod exactly_once;
pub mod filter;
pub mod filter_map;
pub mod first;
pub mod flat_map;
pub mod into_stream;
pub mod lifecycle;
pub mod map;
pub mod multicast;
pub mod observe_on;
pub mod on_error_return;
pub mod share;
pub mod subscribe_on;
pub mod take_until;
pub mod tap;
