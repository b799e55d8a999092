//! A Tokio-based bounded worker pool.
//!
//! Submitted tasks run on at most `concurrency` workers. A task is handed
//! straight to an idle worker when one is waiting, otherwise it starts a new
//! worker while capacity remains, otherwise the submitter waits. Idle workers
//! retire after a timeout. Task panics are caught at the worker boundary and
//! reported to an optional handler. Shutdown is graceful or immediate, the
//! latter cancelling the [`CancellationToken`](tokio_util::sync::CancellationToken)
//! every task receives.

mod config;
mod error;
mod handoff;
mod pool;
mod task;

pub use config::PoolConfig;
pub use error::PoolError;
pub use pool::{Pool, ShutdownMode};
pub use task::{PanicHandler, Task, TaskPanic};
