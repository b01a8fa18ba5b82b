//! Schedulers decide where a unit of work runs.
//!
//! | Scheduler | Runs a task |
//! |-----------|-------------|
//! | [`ImmediateScheduler`] | inline, on the calling thread |
//! | [`QueueScheduler`] | when [`QueueScheduler::run_pending`] is called |
//! | [`NewThreadScheduler`] | on a freshly spawned thread |
//! | [`ThreadPoolScheduler`] | on a `futures` thread pool (feature `futures-scheduler`) |
//! | [`TokioScheduler`] | on tokio's blocking pool (feature `tokio-scheduler`) |

use std::{collections::VecDeque, sync::Arc, thread};

use crate::{
  error::{catch_transform, BoxError, StreamError},
  rc::MutArc,
  single::SinglePublisher,
};

#[cfg(feature = "futures-scheduler")]
mod thread_pool_scheduler;
#[cfg(feature = "futures-scheduler")]
pub use thread_pool_scheduler::ThreadPoolScheduler;

#[cfg(feature = "tokio-scheduler")]
mod tokio_scheduler;
#[cfg(feature = "tokio-scheduler")]
pub use tokio_scheduler::TokioScheduler;

/// A unit of work handed to a scheduler.
pub type Task = Box<dyn FnOnce() + Send>;

pub type SchedulerRef = Arc<dyn Scheduler>;

/// An execution context.
pub trait Scheduler: Send + Sync {
  /// Runs `task` for its side effects.
  fn schedule_side_effect(&self, task: Task);

  /// Runs `operation` on this scheduler and reports its result through a hot
  /// [`SinglePublisher`]. The operation starts right away, whether or not
  /// anyone subscribes. A panic is reported as a
  /// [`StreamError::Transform`].
  fn schedule_operation<T, F>(&self, operation: F) -> SinglePublisher<T>
  where
    Self: Sized,
    T: Clone + Send + 'static,
    F: FnOnce() -> T + Send + 'static,
  {
    let publisher = SinglePublisher::new();
    let c_publisher = publisher.clone();
    self.schedule_side_effect(Box::new(move || {
      match catch_transform("schedule_operation", operation) {
        Ok(value) => c_publisher.success(value),
        Err(err) => c_publisher.error(err),
      }
    }));
    publisher
  }

  /// As [`schedule_operation`](Scheduler::schedule_operation) for operations
  /// that can fail.
  fn schedule_try_operation<T, E, F>(&self, operation: F) -> SinglePublisher<T>
  where
    Self: Sized,
    T: Clone + Send + 'static,
    E: Into<BoxError>,
    F: FnOnce() -> Result<T, E> + Send + 'static,
  {
    let publisher = SinglePublisher::new();
    let c_publisher = publisher.clone();
    self.schedule_side_effect(Box::new(move || {
      match catch_transform("schedule_try_operation", operation) {
        Ok(Ok(value)) => c_publisher.success(value),
        Ok(Err(err)) => c_publisher.error(StreamError::new(err)),
        Err(err) => c_publisher.error(err),
      }
    }));
    publisher
  }
}

impl<S: Scheduler + ?Sized> Scheduler for Arc<S> {
  #[inline]
  fn schedule_side_effect(&self, task: Task) { (**self).schedule_side_effect(task) }
}

// ============================================================================
// ImmediateScheduler
// ============================================================================

/// Runs every task on the calling thread before returning.
#[derive(Debug, Clone, Copy, Default)]
pub struct ImmediateScheduler;

impl Scheduler for ImmediateScheduler {
  fn schedule_side_effect(&self, task: Task) { task() }
}

// ============================================================================
// QueueScheduler
// ============================================================================

/// Collects tasks and runs them when asked, on the thread that asks. Clones
/// share one queue. Handy for tests that need to control interleaving.
#[derive(Clone, Default)]
pub struct QueueScheduler(MutArc<VecDeque<Task>>);

impl QueueScheduler {
  pub fn new() -> Self { Self::default() }

  /// Number of tasks waiting to run.
  pub fn pending(&self) -> usize { self.0.rc_deref_mut().len() }

  /// Runs queued tasks, including ones scheduled while running, until the
  /// queue is empty. Returns how many ran.
  pub fn run_pending(&self) -> usize {
    let mut ran = 0;
    loop {
      let task = self.0.rc_deref_mut().pop_front();
      let Some(task) = task else { return ran };
      task();
      ran += 1;
    }
  }
}

impl Scheduler for QueueScheduler {
  fn schedule_side_effect(&self, task: Task) { self.0.rc_deref_mut().push_back(task) }
}

// ============================================================================
// NewThreadScheduler
// ============================================================================

/// Spawns a thread for every task.
#[derive(Debug, Clone, Copy, Default)]
pub struct NewThreadScheduler;

impl Scheduler for NewThreadScheduler {
  fn schedule_side_effect(&self, task: Task) {
    thread::spawn(task);
  }
}
