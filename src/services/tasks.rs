use std::future::Future;

use tokio::task::JoinSet;
use tracing::{debug, warn};

use crate::error::{log_failure, AppResult, Severity};

/// Fire-and-forget side effects (mark-read, typing pings, reactions) owned by
/// one conversation view.
///
/// Failures are logged and dropped. Dropping the queue, or calling
/// [`BackgroundTasks::abort_all`], cancels whatever is still in flight.
#[derive(Default)]
pub struct BackgroundTasks {
    set: JoinSet<()>,
}

impl BackgroundTasks {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn spawn<F>(&mut self, action: &'static str, task: F)
    where
        F: Future<Output = AppResult<()>> + Send + 'static,
    {
        self.reap();
        self.set.spawn(async move {
            if let Err(err) = task.await {
                log_failure(action, Severity::Logged, &err);
            }
        });
    }

    /// Number of tasks not yet joined (running or finished but unreaped).
    pub fn len(&self) -> usize {
        self.set.len()
    }

    pub fn is_empty(&self) -> bool {
        self.set.is_empty()
    }

    pub fn abort_all(&mut self) {
        if !self.set.is_empty() {
            debug!(pending = self.set.len(), "aborting background tasks");
        }
        self.set.abort_all();
    }

    /// Waits for every queued task to finish.
    pub async fn drain(&mut self) {
        while let Some(result) = self.set.join_next().await {
            if let Err(err) = result {
                if err.is_panic() {
                    warn!(error = %err, "background task panicked");
                }
            }
        }
    }

    /// Drops the results of tasks that already finished.
    fn reap(&mut self) {
        while let Some(result) = self.set.try_join_next() {
            if let Err(err) = result {
                if err.is_panic() {
                    warn!(error = %err, "background task panicked");
                }
            }
        }
    }
}
