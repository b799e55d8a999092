use std::time::Duration;

use task_pool::{Pool, PoolConfig, ShutdownMode};
use tracing::{info, warn};

#[tokio::main]
async fn main() {
  tracing_subscriber::fmt()
    .with_max_level(tracing::Level::DEBUG)
    .with_target(false)
    .init();
  info!("--- Task Panic Example ---");

  // Route recovered panics into the application's own logging.
  let pool = Pool::new(
    PoolConfig::default()
      .with_name("panic_pool")
      .with_concurrency(1)
      .with_panic_handler(|report| warn!("Panic handler received: {}", report)),
  );

  let submitted = pool
    .execute(|_ctx| async {
      info!("Panicking Task: Starting...");
      tokio::time::sleep(Duration::from_millis(100)).await;
      info!("Panicking Task: About to panic!");
      panic!("This task is designed to panic!");
    })
    .await;
  if let Err(e) = submitted {
    tracing::error!("Failed to submit panicking task: {}", e);
  }

  let submitted = pool
    .execute(|_ctx| async {
      info!("Follow-up Task: the same worker is still serving work.");
    })
    .await;
  if let Err(e) = submitted {
    tracing::error!("Failed to submit follow-up task: {}", e);
  }

  pool.close(ShutdownMode::Graceful).await;
  info!("--- Task Panic Example End ---");
}
