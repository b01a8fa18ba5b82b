//! Error types carried on the stream error channel.
//!
//! - [`StreamError`]: delivered through `on_error`. It is cheap to clone so a
//!   multicast wrapper can fan one error out to every subscriber.
//! - [`BlockError`]: returned by the blocking test helper
//!   [`block_for_result`](crate::publisher::PublisherExt::block_for_result).

use std::{
  any::Any,
  error::Error as StdError,
  panic::{self, AssertUnwindSafe},
  sync::Arc,
};

use thiserror::Error;

/// Any error a user function or producer may hand to the runtime.
pub type BoxError = Box<dyn StdError + Send + Sync + 'static>;

/// Shared, type-erased cause.
pub type SharedError = Arc<dyn StdError + Send + Sync + 'static>;

/// Errors delivered to [`Subscriber::on_error`](crate::subscriber::Subscriber::on_error).
#[non_exhaustive]
#[derive(Error, Debug, Clone)]
pub enum StreamError {
  /// Raised by the producing side of a stream.
  #[error(transparent)]
  Source(SharedError),

  /// A user supplied function passed to an operator failed or panicked.
  #[error("transform failed in {operator}(): {cause}")]
  Transform {
    /// Name of the operator whose function failed.
    operator: &'static str,
    #[source]
    cause: SharedError,
  },

  /// A single-subscriber publisher was subscribed to while already in use.
  #[error("{publisher} already subscribed; consider using share()")]
  AlreadySubscribed {
    /// Name of the publisher that refused the subscriber.
    publisher: &'static str,
  },

  /// A single-value source was dropped without ever producing a result.
  #[error("source dropped without delivering a result")]
  Disconnected,
}

/// Payload of a panic caught inside a user function.
#[derive(Error, Debug)]
#[error("panicked: {0}")]
pub struct PanicError(pub String);

impl StreamError {
  /// Wrap a producer error.
  pub fn new<E: Into<BoxError>>(err: E) -> Self { StreamError::Source(Arc::from(err.into())) }

  /// Producer error made from a plain message.
  pub fn msg(message: impl Into<String>) -> Self { Self::new(message.into()) }

  pub fn transform<E: Into<BoxError>>(operator: &'static str, cause: E) -> Self {
    StreamError::Transform { operator, cause: Arc::from(cause.into()) }
  }

  pub(crate) fn from_panic(operator: &'static str, payload: Box<dyn Any + Send>) -> Self {
    let message = if let Some(s) = payload.downcast_ref::<&'static str>() {
      (*s).to_owned()
    } else if let Some(s) = payload.downcast_ref::<String>() {
      s.clone()
    } else {
      "non-string panic payload".to_owned()
    };
    Self::transform(operator, PanicError(message))
  }

  pub fn is_transform(&self) -> bool { matches!(self, StreamError::Transform { .. }) }

  /// Returns a short stable label (snake_case) for use in logs.
  pub fn as_label(&self) -> &'static str {
    match self {
      StreamError::Source(_) => "stream_source",
      StreamError::Transform { .. } => "stream_transform",
      StreamError::AlreadySubscribed { .. } => "stream_already_subscribed",
      StreamError::Disconnected => "stream_disconnected",
    }
  }
}

/// Errors returned while blocking on a publisher.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum BlockError {
  #[error("timed out while blocking for publisher; items received: {received}")]
  Timeout { received: usize },

  #[error("error while blocking on publisher; items received: {received}")]
  Stream {
    received: usize,
    #[source]
    source: StreamError,
  },
}

impl BlockError {
  pub fn as_label(&self) -> &'static str {
    match self {
      BlockError::Timeout { .. } => "block_timeout",
      BlockError::Stream { .. } => "block_stream",
    }
  }
}

/// Run a user function, turning a panic into a [`StreamError::Transform`].
pub(crate) fn catch_transform<R>(
  operator: &'static str,
  f: impl FnOnce() -> R,
) -> Result<R, StreamError> {
  panic::catch_unwind(AssertUnwindSafe(f)).map_err(|payload| {
    let err = StreamError::from_panic(operator, payload);
    tracing::debug!(operator, error = %err, "user function panicked");
    err
  })
}
