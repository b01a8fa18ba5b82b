use futures::executor::ThreadPool;
use once_cell::sync::Lazy;

use crate::scheduler::{Scheduler, Task};

static DEFAULT_POOL: Lazy<Option<ThreadPool>> = Lazy::new(|| match ThreadPool::new() {
  Ok(pool) => Some(pool),
  Err(err) => {
    tracing::error!(
      error = %err,
      "failed to start the default thread pool; falling back to new threads"
    );
    None
  }
});

/// Runs tasks on a `futures` thread pool.
///
/// `ThreadPoolScheduler::default()` shares one lazily started, process-wide
/// pool.
#[derive(Clone)]
pub struct ThreadPoolScheduler(Option<ThreadPool>);

impl ThreadPoolScheduler {
  pub fn new(pool: ThreadPool) -> Self { ThreadPoolScheduler(Some(pool)) }
}

impl Default for ThreadPoolScheduler {
  fn default() -> Self { ThreadPoolScheduler(DEFAULT_POOL.clone()) }
}

impl Scheduler for ThreadPoolScheduler {
  fn schedule_side_effect(&self, task: Task) {
    match &self.0 {
      Some(pool) => pool.spawn_ok(async move { task() }),
      None => {
        std::thread::spawn(task);
      }
    }
  }
}
