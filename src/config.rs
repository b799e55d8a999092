use crate::task::{PanicHandler, TaskPanic};

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use tokio::runtime::Handle as TokioHandle;
use tokio_util::sync::CancellationToken;

pub(crate) const DEFAULT_POOL_NAME: &str = "task_pool";
pub(crate) const DEFAULT_CONCURRENCY: usize = 10;
pub(crate) const DEFAULT_IDLE_TIMEOUT: Duration = Duration::from_secs(1);

/// Construction-time settings for a [`Pool`](crate::Pool).
///
/// ```
/// use std::time::Duration;
/// use task_pool::PoolConfig;
///
/// let config = PoolConfig::default()
///   .with_name("ingest")
///   .with_concurrency(4)
///   .with_idle_timeout(Duration::from_millis(250));
/// ```
#[derive(Clone)]
pub struct PoolConfig {
  pub(crate) name: String,
  pub(crate) concurrency: usize,
  pub(crate) idle_timeout: Duration,
  pub(crate) context: Option<CancellationToken>,
  pub(crate) panic_handler: Option<PanicHandler>,
  pub(crate) runtime: Option<TokioHandle>,
}

impl Default for PoolConfig {
  fn default() -> Self {
    Self {
      name: DEFAULT_POOL_NAME.to_string(),
      concurrency: DEFAULT_CONCURRENCY,
      idle_timeout: DEFAULT_IDLE_TIMEOUT,
      context: None,
      panic_handler: None,
      runtime: None,
    }
  }
}

impl fmt::Debug for PoolConfig {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("PoolConfig")
      .field("name", &self.name)
      .field("concurrency", &self.concurrency)
      .field("idle_timeout", &self.idle_timeout)
      .field("has_context", &self.context.is_some())
      .field("has_panic_handler", &self.panic_handler.is_some())
      .field("has_runtime", &self.runtime.is_some())
      .finish()
  }
}

impl PoolConfig {
  /// Name attached as `pool_name` to every log record the pool emits.
  pub fn with_name(mut self, name: impl Into<String>) -> Self {
    self.name = name.into();
    self
  }

  /// Maximum number of workers alive at once. The pool raises zero to one.
  pub fn with_concurrency(mut self, concurrency: usize) -> Self {
    self.concurrency = concurrency;
    self
  }

  /// How long an idle worker waits for new work before it exits.
  pub fn with_idle_timeout(mut self, idle_timeout: Duration) -> Self {
    self.idle_timeout = idle_timeout;
    self
  }

  /// Parent token for the pool's shared context. Cancelling the parent
  /// cancels the context every task receives.
  pub fn with_context(mut self, context: CancellationToken) -> Self {
    self.context = Some(context);
    self
  }

  /// Callback for panics recovered from tasks.
  pub fn with_panic_handler(mut self, handler: impl Fn(TaskPanic) + Send + Sync + 'static) -> Self {
    self.panic_handler = Some(Arc::new(handler));
    self
  }

  /// Runtime the workers are spawned on. Defaults to the runtime of the
  /// caller of [`Pool::execute`](crate::Pool::execute).
  pub fn with_runtime(mut self, runtime: TokioHandle) -> Self {
    self.runtime = Some(runtime);
    self
  }
}
