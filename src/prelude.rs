//! Prelude module for convenient imports
//!
//! This module re-exports commonly used types and traits for easy access.

// Publisher trait, operators and factories
pub use crate::publisher::*;
// Scheduler
#[cfg(feature = "futures-scheduler")]
pub use crate::scheduler::ThreadPoolScheduler;
#[cfg(feature = "tokio-scheduler")]
pub use crate::scheduler::TokioScheduler;
pub use crate::scheduler::{
  ImmediateScheduler, NewThreadScheduler, QueueScheduler, Scheduler, SchedulerRef, Task,
};
// Single; `single::just` stays qualified to keep it apart from the stream `just`
pub use crate::single::{
  self, BoxedSingleSubscriber, Single, SingleExt, SingleFuture, SinglePublisher, SingleSubscriber,
};
pub use crate::{
  error::{BlockError, BoxError, StreamError},
  ops::{
    exactly_once::ExactlyOnce,
    into_stream::IntoStream,
    share::{Shared, Tagged},
  },
  subject::{Processor, PublishSubject, Subject},
  subscriber::{BoxedSubscriber, SerializedSubscriber, Subscriber},
  subscription::{Subscription, SubscriptionGuard},
  test_subscriber::{Event, TestSubscriber},
};
