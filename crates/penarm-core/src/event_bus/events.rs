//! Event type definitions for the event bus.
//!
//! Events are cloneable and serializable so they can be logged or forwarded.

use serde::{Deserialize, Serialize};

use crate::data::{JobId, JobStatus};

/// Root event enum for all application events
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum AppEvent {
    /// Drawing job progress
    Job(ProgressEvent),
    /// Calibration state changes
    Calibration(CalibrationEvent),
    /// Arm connection events
    Connection(ConnectionEvent),
}

impl AppEvent {
    /// Get the category of this event
    pub fn category(&self) -> EventCategory {
        match self {
            AppEvent::Job(_) => EventCategory::Job,
            AppEvent::Calibration(_) => EventCategory::Calibration,
            AppEvent::Connection(_) => EventCategory::Connection,
        }
    }

    /// Job the event belongs to, if any
    pub fn job_id(&self) -> Option<JobId> {
        match self {
            AppEvent::Job(progress) => Some(progress.job_id),
            _ => None,
        }
    }

    /// Get a short description of this event for logging
    pub fn description(&self) -> String {
        match self {
            AppEvent::Job(e) => format!(
                "{} {}/{} ({}): {}",
                e.job_id, e.completed, e.total, e.status, e.message
            ),
            AppEvent::Calibration(e) => e.description(),
            AppEvent::Connection(e) => e.description(),
        }
    }
}

/// Event category for filtering
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventCategory {
    /// Job progress events.
    Job,
    /// Calibration events.
    Calibration,
    /// Connection events.
    Connection,
}

impl std::fmt::Display for EventCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EventCategory::Job => write!(f, "Job"),
            EventCategory::Calibration => write!(f, "Calibration"),
            EventCategory::Connection => write!(f, "Connection"),
        }
    }
}

/// Progress of a drawing job
///
/// Exactly one event per job carries a terminal status.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgressEvent {
    /// The job this update belongs to
    pub job_id: JobId,
    /// Acknowledged commands
    pub completed: usize,
    /// Total commands in the job
    pub total: usize,
    /// Human readable status line
    pub message: String,
    /// Job status at the time of the update
    pub status: JobStatus,
}

impl ProgressEvent {
    /// True for the last event of a job
    pub fn is_final(&self) -> bool {
        self.status.is_terminal()
    }
}

/// Calibration events
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum CalibrationEvent {
    /// The calibration state machine moved
    StateChanged {
        /// Previous state name.
        from: String,
        /// New state name.
        to: String,
    },
    /// A reference position was captured
    PointCaptured {
        /// Which point was captured.
        label: String,
        /// Captured X.
        x: f64,
        /// Captured Y.
        y: f64,
        /// Captured Z.
        z: f64,
    },
}

impl CalibrationEvent {
    /// Get a short description
    pub fn description(&self) -> String {
        match self {
            CalibrationEvent::StateChanged { from, to } => {
                format!("Calibration {} -> {}", from, to)
            }
            CalibrationEvent::PointCaptured { label, x, y, z } => {
                format!("Captured {} at ({:.2}, {:.2}, {:.2})", label, x, y, z)
            }
        }
    }
}

/// Connection events
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum ConnectionEvent {
    /// Arm link established
    Connected {
        /// Port name.
        port: String,
    },
    /// Arm link closed
    Disconnected {
        /// Port name.
        port: String,
    },
}

impl ConnectionEvent {
    /// Get a short description
    pub fn description(&self) -> String {
        match self {
            ConnectionEvent::Connected { port } => format!("Connected to {}", port),
            ConnectionEvent::Disconnected { port } => format!("Disconnected from {}", port),
        }
    }
}
