use thiserror::Error;

/// Errors that can occur within the `task_pool` pool.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PoolError {
  #[error("Pool is closed or shutting down, cannot accept new tasks")]
  Closed,

  #[error("No Tokio runtime configured or current, cannot start a worker")]
  NoRuntime,
}
