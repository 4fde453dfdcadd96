//! Cancellable background task handle.
//!
//! The replay worker and the clear scheduler each run on their own Tokio
//! task with their own [`CancellationToken`]. A [`TaskHandle`] pairs the
//! token with the join handle so the owner can either signal and move on
//! ([`cancel`](TaskHandle::cancel)) or signal and wait
//! ([`join`](TaskHandle::join)).

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error};

/// Handle to a spawned, cooperatively cancellable task.
#[derive(Debug)]
pub struct TaskHandle {
    name: &'static str,
    cancel: CancellationToken,
    join: JoinHandle<()>,
}

impl TaskHandle {
    /// Wrap an already spawned task and the token it observes.
    pub const fn new(name: &'static str, cancel: CancellationToken, join: JoinHandle<()>) -> Self {
        Self { name, cancel, join }
    }

    /// Task name, used in logs.
    pub const fn name(&self) -> &'static str {
        self.name
    }

    /// Signal the task to stop. Returns immediately; idempotent.
    pub fn cancel(&self) {
        if !self.cancel.is_cancelled() {
            debug!(task = self.name, "cancelling task");
            self.cancel.cancel();
        }
    }

    /// Whether cancellation has been signalled.
    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Whether the task has exited.
    pub fn is_finished(&self) -> bool {
        self.join.is_finished()
    }

    /// Wait for the task to exit. A panic inside the task is logged.
    pub async fn join(self) {
        if let Err(e) = self.join.await {
            error!(task = self.name, error = %e, "task terminated abnormally");
        }
    }
}
