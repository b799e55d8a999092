use std::any::Any;
use std::fmt;
use std::future::Future;
use std::sync::Arc;

use futures::future::BoxFuture;
use futures::FutureExt;
use tokio_util::sync::CancellationToken;

/// The unit of work the pool executes.
///
/// A task receives the pool's shared cancellation token and runs to completion.
/// It produces no value; anything the caller needs back travels through state
/// the task captured.
pub type Task = Box<dyn FnOnce(CancellationToken) -> BoxFuture<'static, ()> + Send + 'static>;

/// Callback invoked with every panic recovered from a task.
pub type PanicHandler = Arc<dyn Fn(TaskPanic) + Send + Sync + 'static>;

pub(crate) fn boxed<F, Fut>(task: F) -> Task
where
  F: FnOnce(CancellationToken) -> Fut + Send + 'static,
  Fut: Future<Output = ()> + Send + 'static,
{
  Box::new(move |ctx| task(ctx).boxed())
}

/// A panic recovered from a task, as handed to the configured [`PanicHandler`].
pub struct TaskPanic {
  payload: Box<dyn Any + Send + 'static>,
}

impl TaskPanic {
  pub(crate) fn new(payload: Box<dyn Any + Send + 'static>) -> Self {
    Self { payload }
  }

  /// The panic message, if the payload was a `&str` or `String`.
  pub fn message(&self) -> Option<&str> {
    if let Some(s) = self.payload.downcast_ref::<&'static str>() {
      Some(s)
    } else {
      self.payload.downcast_ref::<String>().map(String::as_str)
    }
  }

  /// Consumes the report and returns the raw payload passed to `panic!`.
  pub fn into_payload(self) -> Box<dyn Any + Send + 'static> {
    self.payload
  }
}

impl fmt::Debug for TaskPanic {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("TaskPanic").field("message", &self.message()).finish()
  }
}

impl fmt::Display for TaskPanic {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self.message() {
      Some(msg) => write!(f, "task panicked: {}", msg),
      None => f.write_str("task panicked with a non-string payload"),
    }
  }
}
