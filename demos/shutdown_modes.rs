use std::time::Duration;

use task_pool::{Pool, PoolConfig, ShutdownMode};
use tokio_util::sync::CancellationToken;
use tracing::info;

async fn work(id: usize, ctx: CancellationToken) {
  info!("Task {} starting (will run for 2s unless cancelled)", id);
  tokio::select! {
    _ = tokio::time::sleep(Duration::from_secs(2)) => info!("Task {} finished", id),
    _ = ctx.cancelled() => info!("Task {} observed cancellation, stopping early", id),
  }
}

async fn run(mode: ShutdownMode) {
  let pool = Pool::new(
    PoolConfig::default()
      .with_name(format!("{:?}_pool", mode).to_lowercase())
      .with_concurrency(2),
  );
  for i in 0..2 {
    if let Err(e) = pool.execute(move |ctx| work(i, ctx)).await {
      tracing::error!("Failed to submit task {}: {}", i, e);
    }
  }
  tokio::time::sleep(Duration::from_millis(100)).await;

  let started = tokio::time::Instant::now();
  info!("Calling close({:?})...", mode);
  pool.close(mode).await;
  info!("close({:?}) returned after {:?}", mode, started.elapsed());

  match pool.execute(|_ctx| async {}).await {
    Ok(_) => tracing::error!("LATE SUBMISSION SUCCEEDED (UNEXPECTED!)"),
    Err(e) => info!("Late submission correctly failed: {}", e),
  }
}

#[tokio::main]
async fn main() {
  tracing_subscriber::fmt()
    .with_max_level(tracing::Level::INFO)
    .with_target(false)
    .init();
  info!("--- Shutdown Modes Example ---");
  run(ShutdownMode::Graceful).await;
  run(ShutdownMode::Immediate).await;
  info!("--- Shutdown Modes Example End ---");
}
