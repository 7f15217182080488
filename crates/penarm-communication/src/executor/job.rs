//! Job handles, cancellation and executor settings.

use penarm_core::{Error, JobId, JobProgressStream, JobStatus, Result};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;

/// Cooperative cancellation flag, checked between commands
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    /// A fresh, uncancelled token.
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::Release);
    }

    /// True once cancellation was requested.
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

/// Executor settings
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ExecutorConfig {
    /// Per-attempt acknowledgment timeout.
    pub command_timeout: Duration,
    /// Resends after a timeout before the job fails.
    pub max_retries: u32,
    /// First retry delay; doubles on each further retry.
    pub retry_backoff: Duration,
    /// Minimum spacing of progress events; `None` publishes every ack.
    pub progress_interval: Option<Duration>,
    /// Finished jobs kept for inspection.
    pub max_history: usize,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            command_timeout: Duration::from_secs(5),
            max_retries: 3,
            retry_backoff: Duration::from_millis(200),
            progress_interval: None,
            max_history: 32,
        }
    }
}

impl ExecutorConfig {
    /// Delay before retry number `retry` (1-based).
    pub fn backoff(&self, retry: u32) -> Duration {
        self.retry_backoff
            .saturating_mul(2u32.saturating_pow(retry.saturating_sub(1)))
    }
}

/// Handle to a submitted job
pub struct JobHandle {
    pub(crate) id: JobId,
    pub(crate) cancel: CancelToken,
    pub(crate) task: JoinHandle<JobStatus>,
    pub(crate) progress: Option<JobProgressStream>,
}

impl JobHandle {
    /// The job id.
    pub fn id(&self) -> JobId {
        self.id
    }

    /// Request cancellation; the job stops before its next command.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// The job's cancellation token.
    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    /// Progress stream subscribed before the job started.
    ///
    /// Returns `None` after the first call.
    pub fn take_progress(&mut self) -> Option<JobProgressStream> {
        self.progress.take()
    }

    /// Wait for the terminal status.
    pub async fn wait(self) -> Result<JobStatus> {
        self.task
            .await
            .map_err(|e| Error::other(format!("Job task failed: {}", e)))
    }
}

impl std::fmt::Debug for JobHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JobHandle")
            .field("id", &self.id)
            .field("cancelled", &self.cancel.is_cancelled())
            .finish()
    }
}
