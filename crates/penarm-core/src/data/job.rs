//! Drawing job records.

use crate::data::motion::MotionProgram;
use crate::error::HardwareError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

/// Unique identifier of a drawing job
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct JobId(Uuid);

impl JobId {
    /// Create a new unique job ID
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// The underlying UUID
    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for JobId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for JobId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Job({})", &self.0.to_string()[..8])
    }
}

/// Lifecycle status of a drawing job
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum JobStatus {
    /// Accepted, not started
    Pending,
    /// Streaming commands to the arm
    Running,
    /// All commands acknowledged
    Completed,
    /// Aborted by a hardware failure
    Failed(HardwareError),
    /// Stopped on operator request
    Cancelled,
}

impl JobStatus {
    /// True for Completed, Failed and Cancelled
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed(_) | Self::Cancelled)
    }
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Pending => write!(f, "pending"),
            Self::Running => write!(f, "running"),
            Self::Completed => write!(f, "completed"),
            Self::Failed(reason) => write!(f, "failed: {}", reason),
            Self::Cancelled => write!(f, "cancelled"),
        }
    }
}

/// A drawing job and its progress
#[derive(Debug, Clone)]
pub struct DrawingJob {
    /// Job identifier
    pub id: JobId,
    /// The program being executed
    pub program: Arc<MotionProgram>,
    /// Current status
    pub status: JobStatus,
    /// Acknowledged commands
    pub completed: usize,
    /// Total commands
    pub total: usize,
    /// When the job was accepted
    pub created_at: DateTime<Utc>,
    /// When streaming began
    pub started_at: Option<DateTime<Utc>>,
    /// When the job reached a terminal status
    pub finished_at: Option<DateTime<Utc>>,
}

impl DrawingJob {
    /// Create a pending job for a program
    pub fn new(program: Arc<MotionProgram>) -> Self {
        let total = program.len();
        Self {
            id: JobId::new(),
            program,
            status: JobStatus::Pending,
            completed: 0,
            total,
            created_at: Utc::now(),
            started_at: None,
            finished_at: None,
        }
    }

    /// Completed fraction in `0.0..=1.0`
    pub fn fraction(&self) -> f64 {
        if self.total == 0 {
            1.0
        } else {
            self.completed as f64 / self.total as f64
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::motion::MotionProfile;

    #[test]
    fn test_new_job_is_pending() {
        let program = Arc::new(MotionProgram::new(
            Vec::new(),
            MotionProfile {
                z_up: 10.0,
                z_draw: 0.0,
                pen_up_feedrate: 3000.0,
                pen_down_feedrate: 1500.0,
            },
        ));
        let job = DrawingJob::new(program);
        assert_eq!(job.status, JobStatus::Pending);
        assert_eq!(job.total, 0);
        assert!((job.fraction() - 1.0).abs() < f64::EPSILON);
        assert!(job.id.to_string().starts_with("Job("));
    }

    #[test]
    fn test_terminal_states() {
        assert!(!JobStatus::Running.is_terminal());
        assert!(JobStatus::Cancelled.is_terminal());
        assert!(JobStatus::Failed(HardwareError::NotConnected).is_terminal());
    }
}
