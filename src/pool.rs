use crate::config::PoolConfig;
use crate::error::PoolError;
use crate::handoff::Handoff;
use crate::task::{self, PanicHandler, Task, TaskPanic};

use std::fmt;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering as AtomicOrdering};
use std::sync::Arc;
use std::time::Duration;

use futures::FutureExt;
use tokio::runtime::Handle as TokioHandle;
use tokio::sync::{OwnedSemaphorePermit, Semaphore, TryAcquireError};
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{debug, error, info, info_span, warn, Instrument};

/// Defines how the pool should behave upon shutdown.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShutdownMode {
  /// Lets running tasks finish; idle workers exit as soon as they notice the
  /// pool is closed.
  Graceful,
  /// Additionally cancels the shared context so cooperative tasks stop early.
  Immediate,
}

/// A bounded pool of workers that run submitted tasks.
///
/// At most `concurrency` workers are alive at any time. A submitted task is
/// either handed directly to a worker that is waiting for work, or it becomes
/// the first job of a freshly spawned worker. Workers that see no work for
/// `idle_timeout` exit and give their slot back.
///
/// ```no_run
/// use task_pool::{Pool, PoolConfig, ShutdownMode};
///
/// # async fn demo() -> Result<(), task_pool::PoolError> {
/// let pool = Pool::new(PoolConfig::default().with_concurrency(4));
/// pool
///   .execute(|_ctx| async { println!("first") })
///   .await?
///   .execute(|ctx| async move {
///     ctx.cancelled().await;
///   })
///   .await?;
/// pool.close(ShutdownMode::Immediate).await;
/// # Ok(())
/// # }
/// ```
pub struct Pool {
  shared: Arc<PoolShared>,
}

struct PoolShared {
  name: String,
  capacity: usize,
  idle_timeout: Duration,
  tokens: Arc<Semaphore>,
  handoff: Handoff,
  context: CancellationToken,
  panic_handler: Option<PanicHandler>,
  runtime: Option<TokioHandle>,
  workers: TaskTracker,
  live_workers: AtomicUsize,
  next_worker_id: AtomicU64,
}

/// Keeps the live-worker count accurate however the worker future ends.
struct LiveWorker<'a> {
  live_workers: &'a AtomicUsize,
}

impl Drop for LiveWorker<'_> {
  fn drop(&mut self) {
    self.live_workers.fetch_sub(1, AtomicOrdering::AcqRel);
  }
}

impl Pool {
  /// Builds a pool. No worker is started until the first [`Pool::execute`].
  pub fn new(config: PoolConfig) -> Self {
    let context = config
      .context
      .map(|parent| parent.child_token())
      .unwrap_or_default();

    if config.concurrency == 0 {
      warn!(pool_name = %config.name, "Concurrency of 0 requested; using 1.");
    }
    let capacity = config.concurrency.max(1);

    Self {
      shared: Arc::new(PoolShared {
        name: config.name,
        capacity,
        idle_timeout: config.idle_timeout,
        tokens: Arc::new(Semaphore::new(capacity)),
        handoff: Handoff::new(),
        context,
        panic_handler: config.panic_handler,
        runtime: config.runtime,
        workers: TaskTracker::new(),
        live_workers: AtomicUsize::new(0),
        next_worker_id: AtomicU64::new(0),
      }),
    }
  }

  /// Submits a task.
  ///
  /// The task goes to an idle worker if one is waiting, otherwise to a new
  /// worker if the pool is below capacity. When neither is possible the call
  /// waits until a worker frees up or a slot opens, whichever happens first.
  /// Returns the pool so submissions can be chained.
  ///
  /// # Errors
  /// Returns `PoolError::Closed` if the pool is closed before the task was
  /// accepted, and `PoolError::NoRuntime` if no runtime was configured and the
  /// caller is not inside one. A rejected task is dropped without running.
  pub async fn execute<F, Fut>(&self, task: F) -> Result<&Self, PoolError>
  where
    F: FnOnce(CancellationToken) -> Fut + Send + 'static,
    Fut: Future<Output = ()> + Send + 'static,
  {
    self.shared.submit(task::boxed(task)).await?;
    Ok(self)
  }

  /// Shuts the pool down and waits until every worker has exited.
  ///
  /// Only the first call does anything; later calls return immediately.
  /// With [`ShutdownMode::Immediate`] the shared context is cancelled first.
  /// Tasks are never aborted, so a task that ignores cancellation keeps this
  /// call waiting.
  pub async fn close(&self, mode: ShutdownMode) {
    let shared = &self.shared;
    if !shared.begin_shutdown() {
      debug!(pool_name = %shared.name, "Close: pool already closed, nothing to do.");
      return;
    }

    info!(
      pool_name = %shared.name,
      ?mode,
      live_workers = shared.live_workers.load(AtomicOrdering::Acquire),
      "Closing pool."
    );
    if mode == ShutdownMode::Immediate {
      info!(pool_name = %shared.name, "Immediate close: cancelling shared context.");
      shared.context.cancel();
    }

    shared.workers.wait().await;
    info!(pool_name = %shared.name, "Pool closed, all workers exited.");
  }

  pub fn name(&self) -> &str {
    &self.shared.name
  }

  /// Maximum number of workers alive at once.
  pub fn capacity(&self) -> usize {
    self.shared.capacity
  }

  /// Number of workers currently alive, busy or idle.
  pub fn active_workers(&self) -> usize {
    self.shared.live_workers.load(AtomicOrdering::Acquire)
  }

  /// Number of workers currently parked waiting for a handoff.
  pub fn idle_workers(&self) -> usize {
    self.shared.handoff.idle_count()
  }

  pub fn is_closed(&self) -> bool {
    self.shared.handoff.is_closed()
  }

  /// The context every task receives.
  pub fn context(&self) -> CancellationToken {
    self.shared.context.clone()
  }
}

impl PoolShared {
  /// Marks the pool closed and shuts both admission paths.
  ///
  /// Returns `true` only for the caller that performed the transition.
  fn begin_shutdown(&self) -> bool {
    if !self.handoff.close(|| self.tokens.close()) {
      return false;
    }
    self.workers.close();
    true
  }

  fn rejected(&self) -> PoolError {
    warn!(pool_name = %self.name, "Execute: attempted to submit a task to a closed pool.");
    PoolError::Closed
  }

  async fn submit(self: &Arc<Self>, mut task: Task) -> Result<(), PoolError> {
    if self.handoff.is_closed() {
      return Err(self.rejected());
    }

    // `tokio::spawn` panics outside a runtime; find one before taking a permit.
    let Some(runtime) = self.runtime.clone().or_else(|| TokioHandle::try_current().ok()) else {
      warn!(pool_name = %self.name, "Execute: no Tokio runtime available to run workers.");
      return Err(PoolError::NoRuntime);
    };

    // Holds `close` at its wait until this submission has spawned or failed.
    let _in_flight = self.workers.token();

    loop {
      task = match self.handoff.try_deliver(task) {
        Ok(()) => return Ok(()),
        Err(task) => task,
      };

      match self.tokens.clone().try_acquire_owned() {
        Ok(permit) => {
          self.spawn_worker(task, permit, &runtime);
          return Ok(());
        }
        Err(TryAcquireError::Closed) => return Err(self.rejected()),
        Err(TryAcquireError::NoPermits) => {}
      }

      tokio::select! {
        // A worker went idle; retry the handoff.
        _ = self.handoff.worker_idle() => {}
        acquired = self.tokens.clone().acquire_owned() => {
          match acquired {
            Ok(permit) => {
              self.spawn_worker(task, permit, &runtime);
              return Ok(());
            }
            Err(_) => return Err(self.rejected()),
          }
        }
      }
    }
  }

  fn spawn_worker(self: &Arc<Self>, first: Task, permit: OwnedSemaphorePermit, runtime: &TokioHandle) {
    let worker_id = self.next_worker_id.fetch_add(1, AtomicOrdering::Relaxed);

    let shared = self.clone();
    let worker = async move { shared.run_worker(worker_id, first, permit).await }
      .instrument(info_span!("pool_worker", pool_name = %self.name, worker_id));

    self.workers.spawn_on(worker, runtime);
    debug!(pool_name = %self.name, worker_id, "Spawned worker.");
  }

  async fn run_worker(self: Arc<Self>, worker_id: u64, first: Task, permit: OwnedSemaphorePermit) {
    // Dropped in reverse order: the count goes down before the token is released.
    let _permit = permit;
    self.live_workers.fetch_add(1, AtomicOrdering::AcqRel);
    let _live = LiveWorker {
      live_workers: &self.live_workers,
    };

    let mut task = first;
    loop {
      self.run_task(worker_id, task).await;
      match self.wait_for_work(worker_id).await {
        Some(next) => task = next,
        None => break,
      }
    }
    debug!(pool_name = %self.name, worker_id, "Worker exiting, releasing its admission token.");
  }

  async fn wait_for_work(&self, worker_id: u64) -> Option<Task> {
    let mut slot = self.handoff.register_idle(worker_id)?;

    tokio::select! {
      // Err means the handoff was closed.
      delivered = &mut slot => delivered.ok(),
      _ = tokio::time::sleep(self.idle_timeout) => {
        self.handoff.withdraw(worker_id);
        slot.close();
        // A submitter may have popped the slot just before the timer fired.
        let late = slot.try_recv().ok();
        if late.is_none() {
          debug!(pool_name = %self.name, worker_id, "Idle timeout elapsed.");
        }
        late
      }
    }
  }

  async fn run_task(&self, worker_id: u64, task: Task) {
    let ctx = self.context.clone();
    let outcome = AssertUnwindSafe(async move { task(ctx).await }).catch_unwind().await;
    if let Err(payload) = outcome {
      self.report_panic(worker_id, TaskPanic::new(payload));
    }
  }

  fn report_panic(&self, worker_id: u64, report: TaskPanic) {
    error!(pool_name = %self.name, worker_id, "Task panicked during execution: {}", report);
    let Some(handler) = &self.panic_handler else {
      return;
    };
    if std::panic::catch_unwind(AssertUnwindSafe(|| handler(report))).is_err() {
      error!(pool_name = %self.name, worker_id, "Panic handler itself panicked.");
    }
  }
}

impl fmt::Debug for Pool {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("Pool")
      .field("name", &self.shared.name)
      .field("capacity", &self.shared.capacity)
      .field("idle_timeout", &self.shared.idle_timeout)
      .field("active_workers", &self.active_workers())
      .field("closed", &self.is_closed())
      .finish_non_exhaustive()
  }
}

impl Drop for Pool {
  fn drop(&mut self) {
    // No waiting here: running tasks finish on their own, idle workers see the
    // closed handoff and exit.
    if self.shared.begin_shutdown() {
      info!(
        pool_name = %self.shared.name,
        "Pool dropped without close. Signalled workers to stop."
      );
    }
  }
}
