//! # rxstream: push-based reactive streams
//!
//! A small runtime of publishers, subscribers and operators, with multicast
//! sharing, replay buffers and a single-value sibling for one-shot results.
//!
//! ## Quick Start
//!
//! ```rust
//! use rxstream::prelude::*;
//!
//! from_iter(0..10)
//!   .filter(|v| v % 2 == 0)
//!   .map(|v| v * 2)
//!   .subscribe_next(|v| println!("Value: {}", v));
//! ```
//!
//! ## Key Concepts
//!
//! | Type | Description |
//! |------|-------------|
//! | [`Publisher`] | Describes a stream; each `subscribe` starts or joins an execution |
//! | [`Subscriber`] | Receives `on_subscribe`, `on_next`, then `on_error` or `on_complete` |
//! | [`Subscription`] | Handle to cancel an active subscription |
//! | [`PublisherExt`] | Every operator (`map`, `flat_map`, `share`, `take_until`, ...) |
//! | [`PublishSubject`] | A hot source fed from imperative code |
//! | [`Single`] | Exactly one value or one error, delivered through a [`Scheduler`] |
//!
//! ## Feature Flags
//!
//! - **`futures-scheduler`** (default): `ThreadPoolScheduler` on a `futures`
//!   thread pool
//! - **`tokio-scheduler`**: `TokioScheduler` on a tokio runtime handle
//!
//! [`Publisher`]: publisher::Publisher
//! [`PublisherExt`]: publisher::PublisherExt
//! [`Subscriber`]: subscriber::Subscriber
//! [`Subscription`]: subscription::Subscription
//! [`PublishSubject`]: subject::PublishSubject
//! [`Single`]: single::Single
//! [`Scheduler`]: scheduler::Scheduler

pub mod error;
pub mod ops;
pub mod prelude;
pub mod publisher;
pub mod rc;
pub mod scheduler;
pub mod single;
pub mod subject;
pub mod subscriber;
pub mod subscription;
pub mod test_subscriber;

// Re-export the prelude module
pub use prelude::*;

