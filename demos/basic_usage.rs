use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use task_pool::{Pool, PoolConfig, ShutdownMode};
use tracing::info;

#[tokio::main]
async fn main() {
  tracing_subscriber::fmt()
    .with_max_level(tracing::Level::DEBUG)
    .with_target(false)
    .init();
  info!("--- Basic Usage Example ---");

  let pool = Pool::new(
    PoolConfig::default()
      .with_name("basic_pool")
      .with_concurrency(3)
      .with_idle_timeout(Duration::from_millis(200)),
  );
  let done = Arc::new(AtomicUsize::new(0));

  for i in 0..10 {
    let done = done.clone();
    let submitted = pool
      .execute(move |_ctx| async move {
        info!("Task {} running", i);
        tokio::time::sleep(Duration::from_millis(100)).await;
        done.fetch_add(1, Ordering::SeqCst);
      })
      .await;
    if let Err(e) = submitted {
      tracing::error!("Failed to submit task {}: {}", i, e);
    }
  }
  info!("All tasks submitted. Live workers: {}", pool.active_workers());

  tokio::time::sleep(Duration::from_millis(600)).await;
  info!(
    "After a quiet period. Live workers: {}, completed: {}",
    pool.active_workers(),
    done.load(Ordering::SeqCst)
  );

  pool.close(ShutdownMode::Graceful).await;
  info!("--- Basic Usage Example End ---");
}
