//! Motion executor
//!
//! Streams a [`MotionProgram`] to the arm one acknowledged line at a time.
//!
//! A job owns the arm channel from submission until its safe-return has
//! run. While it runs, further submissions and manual commands fail
//! immediately. Every job ends with exactly one terminal progress event.

mod job;

pub use job::{CancelToken, ExecutorConfig, JobHandle};

use crate::communication::{ArmChannel, ChannelGuard, MotionTransport};
use crate::firmware::marlin::{drain_replies, send_command};
use crate::protocol;
use chrono::Utc;
use parking_lot::{Mutex, RwLock};
use penarm_core::{
    ConcurrencyError, DrawingJob, EventBus, HardwareError, JobId, JobStatus, MotionCommand,
    MotionProgram, Point3, ProgressEvent, Result, ValidationError,
};
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::Instant;

#[derive(Default)]
struct JobTable {
    jobs: HashMap<JobId, DrawingJob>,
    finished: VecDeque<JobId>,
}

/// Runs drawing jobs on an arm channel
#[derive(Clone)]
pub struct MotionExecutor {
    channel: ArmChannel,
    bus: Arc<EventBus>,
    config: ExecutorConfig,
    table: Arc<RwLock<JobTable>>,
    active: Arc<Mutex<Option<JobId>>>,
}

impl MotionExecutor {
    /// Create an executor for a channel, publishing progress on `bus`.
    pub fn new(channel: ArmChannel, bus: Arc<EventBus>, config: ExecutorConfig) -> Self {
        Self {
            channel,
            bus,
            config,
            table: Arc::new(RwLock::new(JobTable::default())),
            active: Arc::new(Mutex::new(None)),
        }
    }

    /// Executor settings.
    pub fn config(&self) -> &ExecutorConfig {
        &self.config
    }

    /// Submit a program; the arm parks at `resting` afterwards.
    pub fn submit(&self, program: MotionProgram, resting: Point3) -> Result<JobHandle> {
        self.submit_with(program, resting, CancelToken::new())
    }

    /// Submit with a caller-provided cancellation token.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn submit_with(
        &self,
        program: MotionProgram,
        resting: Point3,
        cancel: CancelToken,
    ) -> Result<JobHandle> {
        program.validate()?;
        if !resting.is_finite() {
            return Err(ValidationError::MissingCalibration {
                field: "resting".to_string(),
            }
            .into());
        }
        if !self.channel.is_connected() {
            return Err(HardwareError::NotConnected.into());
        }

        let guard = self.channel.try_acquire().map_err(|busy| {
            match *self.active.lock() {
                Some(id) => ConcurrencyError::JobAlreadyRunning {
                    job_id: id.to_string(),
                },
                None => busy,
            }
        })?;

        let job = DrawingJob::new(Arc::new(program));
        let id = job.id;
        let program = job.program.clone();
        self.table.write().jobs.insert(id, job);
        *self.active.lock() = Some(id);

        let progress = self.bus.progress_stream(id);
        tracing::info!("{} accepted: {} commands", id, program.len());

        let runner = self.clone();
        let token = cancel.clone();
        let task = tokio::spawn(async move { runner.run_job(guard, id, program, resting, token).await });

        Ok(JobHandle {
            id,
            cancel,
            task,
            progress: Some(progress),
        })
    }

    /// Snapshot of a job.
    pub fn job(&self, id: JobId) -> Option<DrawingJob> {
        self.table.read().jobs.get(&id).cloned()
    }

    /// All known jobs, oldest first.
    pub fn jobs(&self) -> Vec<DrawingJob> {
        let mut jobs: Vec<DrawingJob> = self.table.read().jobs.values().cloned().collect();
        jobs.sort_by_key(|job| job.created_at);
        jobs
    }

    /// The running job, if any.
    pub fn active_job(&self) -> Option<JobId> {
        *self.active.lock()
    }

    /// True while a job runs.
    pub fn is_busy(&self) -> bool {
        self.active_job().is_some()
    }

    async fn run_job(
        self,
        mut guard: ChannelGuard,
        id: JobId,
        program: Arc<MotionProgram>,
        resting: Point3,
        cancel: CancelToken,
    ) -> JobStatus {
        let total = program.len();
        self.update(id, |job| {
            job.status = JobStatus::Running;
            job.started_at = Some(Utc::now());
        });
        self.publish(id, 0, total, "started".to_string(), JobStatus::Running);

        let mut completed = 0;
        let mut last_publish = Instant::now();
        let mut status = JobStatus::Completed;
        for command in &program.commands {
            if cancel.is_cancelled() {
                tracing::info!("{} cancelled after {}/{} commands", id, completed, total);
                status = JobStatus::Cancelled;
                break;
            }
            let line = protocol::encode_command(command, &program.profile);
            if let Err(e) = self.send_with_retry(&mut **guard, &line).await {
                tracing::error!("{} failed at command {}: {}", id, completed, e);
                if matches!(e, HardwareError::Disconnected { .. }) {
                    self.channel.mark_disconnected();
                }
                status = JobStatus::Failed(e);
                break;
            }
            completed += 1;
            self.update(id, |job| job.completed = completed);

            let due = match self.config.progress_interval {
                None => true,
                Some(interval) => last_publish.elapsed() >= interval,
            };
            if due && completed < total {
                last_publish = Instant::now();
                self.publish(
                    id,
                    completed,
                    total,
                    command.name().to_string(),
                    JobStatus::Running,
                );
            }
        }

        self.safe_return(&mut **guard, &program, resting).await;
        drop(guard);

        self.update(id, |job| {
            job.status = status.clone();
            job.finished_at = Some(Utc::now());
        });
        self.finish(id);
        let message = match &status {
            JobStatus::Completed => "done".to_string(),
            other => other.to_string(),
        };
        tracing::info!("{} finished: {}", id, status);
        self.publish(id, completed, total, message, status.clone());
        status
    }

    async fn send_with_retry(
        &self,
        transport: &mut dyn MotionTransport,
        line: &str,
    ) -> std::result::Result<(), HardwareError> {
        let mut attempt: u32 = 0;
        loop {
            attempt += 1;
            match send_command(transport, line, self.config.command_timeout).await {
                Ok(_) => return Ok(()),
                Err(HardwareError::Timeout { .. }) if attempt <= self.config.max_retries => {
                    let delay = self.config.backoff(attempt);
                    tracing::warn!(
                        "No ack for '{}' (attempt {}), retrying in {:?}",
                        line,
                        attempt,
                        delay
                    );
                    tokio::time::sleep(delay).await;
                    if drain_replies(transport, line).await? {
                        tracing::info!("Late ack for '{}', not resending", line);
                        return Ok(());
                    }
                }
                Err(HardwareError::Timeout {
                    command,
                    timeout_ms,
                    ..
                }) => {
                    return Err(HardwareError::Timeout {
                        command,
                        timeout_ms,
                        attempts: attempt,
                    })
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// Lift the pen and park, one attempt each.
    async fn safe_return(
        &self,
        transport: &mut dyn MotionTransport,
        program: &MotionProgram,
        resting: Point3,
    ) {
        let profile = &program.profile;
        let lines = [
            protocol::encode_command(&MotionCommand::PenUp, profile),
            protocol::move_to(resting, profile.pen_up_feedrate),
        ];
        for line in &lines {
            if let Err(e) = send_command(transport, line, self.config.command_timeout).await {
                tracing::warn!("Safe-return step '{}' failed: {}", line, e);
            }
        }
    }

    fn update(&self, id: JobId, f: impl FnOnce(&mut DrawingJob)) {
        if let Some(job) = self.table.write().jobs.get_mut(&id) {
            f(job);
        }
    }

    fn finish(&self, id: JobId) {
        {
            let mut active = self.active.lock();
            if *active == Some(id) {
                *active = None;
            }
        }
        let mut table = self.table.write();
        table.finished.push_back(id);
        while table.finished.len() > self.config.max_history {
            if let Some(old) = table.finished.pop_front() {
                table.jobs.remove(&old);
            }
        }
    }

    fn publish(&self, job_id: JobId, completed: usize, total: usize, message: String, status: JobStatus) {
        self.bus.publish_progress(ProgressEvent {
            job_id,
            completed,
            total,
            message,
            status,
        });
    }
}

impl std::fmt::Debug for MotionExecutor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MotionExecutor")
            .field("channel", &self.channel)
            .field("active", &self.active_job())
            .finish()
    }
}
