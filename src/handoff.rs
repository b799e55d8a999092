use crate::task::Task;

use parking_lot::Mutex;
use tokio::sync::{oneshot, Notify};

/// The receiving end a waiting worker holds while it is registered as idle.
pub(crate) type IdleSlot = oneshot::Receiver<Task>;

struct IdleEntry {
  worker_id: u64,
  tx: oneshot::Sender<Task>,
}

struct HandoffState {
  closed: bool,
  idle: Vec<IdleEntry>,
}

/// Rendezvous point between submitters and idle workers.
///
/// Nothing is ever buffered here: a task changes hands only when a worker is
/// parked on its slot. Each idle worker registers a one-shot slot; a submitter
/// pops the most recently registered slot and sends the task straight into it.
/// The `closed` flag lives under the same lock as the idle list, so once
/// [`Handoff::close`] returns no further delivery can succeed.
pub(crate) struct Handoff {
  state: Mutex<HandoffState>,
  worker_idle: Notify,
}

impl Handoff {
  pub(crate) fn new() -> Self {
    Self {
      state: Mutex::new(HandoffState {
        closed: false,
        idle: Vec::new(),
      }),
      worker_idle: Notify::new(),
    }
  }

  /// Parks `worker_id` as idle and returns the slot it should wait on.
  ///
  /// Returns `None` once the handoff is closed; the worker must exit.
  pub(crate) fn register_idle(&self, worker_id: u64) -> Option<IdleSlot> {
    let (tx, rx) = oneshot::channel();
    {
      let mut state = self.state.lock();
      if state.closed {
        return None;
      }
      state.idle.push(IdleEntry { worker_id, tx });
    }
    self.worker_idle.notify_one();
    Some(rx)
  }

  /// Hands `task` to an idle worker, most recently idled first.
  ///
  /// Gives the task back if no worker took it.
  pub(crate) fn try_deliver(&self, mut task: Task) -> Result<(), Task> {
    let mut state = self.state.lock();
    if state.closed {
      return Err(task);
    }
    while let Some(entry) = state.idle.pop() {
      match entry.tx.send(task) {
        Ok(()) => return Ok(()),
        // Slot already closed by its worker.
        Err(returned) => task = returned,
      }
    }
    Err(task)
  }

  /// Removes the slot of a worker that stopped waiting.
  ///
  /// The caller must still close its receiver and drain it: a submitter may
  /// have popped the slot before this call.
  pub(crate) fn withdraw(&self, worker_id: u64) {
    self.state.lock().idle.retain(|entry| entry.worker_id != worker_id);
  }

  /// Resolves once a worker has registered as idle since the last wakeup.
  pub(crate) async fn worker_idle(&self) {
    self.worker_idle.notified().await;
  }

  /// Closes the handoff, dropping every idle slot so parked workers wake up.
  ///
  /// `on_close` runs under the lock before the flag flips, so anything it shuts
  /// is already shut when [`Handoff::is_closed`] first reports `true`.
  /// Returns `true` only for the call that performed the close.
  pub(crate) fn close(&self, on_close: impl FnOnce()) -> bool {
    let dropped = {
      let mut state = self.state.lock();
      if state.closed {
        return false;
      }
      on_close();
      state.closed = true;
      std::mem::take(&mut state.idle)
    };
    drop(dropped);
    self.worker_idle.notify_waiters();
    true
  }

  pub(crate) fn is_closed(&self) -> bool {
    self.state.lock().closed
  }

  pub(crate) fn idle_count(&self) -> usize {
    self.state.lock().idle.len()
  }
}
