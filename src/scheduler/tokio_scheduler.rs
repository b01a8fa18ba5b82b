use tokio::runtime::{Handle, TryCurrentError};

use crate::scheduler::{Scheduler, Task};

/// Runs tasks on the blocking pool of a tokio runtime, so a task may block
/// without stalling the runtime's workers.
#[derive(Clone)]
pub struct TokioScheduler(Handle);

impl TokioScheduler {
  pub fn new(handle: Handle) -> Self { TokioScheduler(handle) }

  /// Uses the runtime the caller is running in.
  pub fn try_current() -> Result<Self, TryCurrentError> { Handle::try_current().map(Self) }
}

impl Scheduler for TokioScheduler {
  fn schedule_side_effect(&self, task: Task) {
    self.0.spawn_blocking(task);
  }
}
