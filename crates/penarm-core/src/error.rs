//! Error handling for PenArm
//!
//! Provides the error taxonomy shared by every layer of the plotting pipeline:
//! - Validation errors (configuration, calibration state, command sequences)
//! - Geometry errors (degenerate or empty stroke input)
//! - Capacity errors (command budget cannot be met)
//! - Hardware errors (serial timeouts, disconnects, bad acknowledgments)
//! - Concurrency errors (busy arm channel, overlapping calibration sessions)
//!
//! All error types use `thiserror` for ergonomic error handling.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Validation error type
///
/// Raised before any hardware interaction when configuration, calibration
/// data or a command sequence is unusable.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    /// The calibration frame is required but not available yet
    #[error("Calibration required: arm is in state {state}")]
    NotCalibrated {
        /// The calibration state at the time of the request.
        state: String,
    },

    /// A configuration value is out of range or otherwise unusable
    #[error("Invalid setting '{key}': {reason}")]
    InvalidConfig {
        /// The configuration key.
        key: String,
        /// Why the value was rejected.
        reason: String,
    },

    /// The two calibration corners do not span a usable rectangle
    #[error("Calibration corners span a degenerate rectangle ({dx:.3} x {dy:.3} mm)")]
    DegenerateRectangle {
        /// Width of the captured rectangle.
        dx: f64,
        /// Height of the captured rectangle.
        dy: f64,
    },

    /// The drawing height is not below the travel height
    #[error("Pen heights invalid: z_draw {z_draw:.3} must be below z_up {z_up:.3}")]
    InvalidPenHeights {
        /// Height at which the pen touches the surface.
        z_draw: f64,
        /// Height at which the pen travels.
        z_up: f64,
    },

    /// A calibration field is missing
    #[error("Calibration data incomplete: missing {field}")]
    MissingCalibration {
        /// The missing field name.
        field: String,
    },

    /// An operator action is not allowed in the current calibration state
    #[error("Cannot {action} while calibration is in state {state}")]
    InvalidTransition {
        /// The current calibration state.
        state: String,
        /// The requested action.
        action: String,
    },

    /// A motion command sequence breaks the pen state rules
    #[error("Invalid command sequence at index {index}: {reason}")]
    InvalidSequence {
        /// Index of the offending command.
        index: usize,
        /// The rule that was broken.
        reason: String,
    },
}

/// Geometry error type
///
/// Represents unusable stroke or artwork input.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum GeometryError {
    /// A stroke needs at least two points
    #[error("Stroke has {count} point(s), at least 2 are required")]
    TooFewPoints {
        /// The number of points supplied.
        count: usize,
    },

    /// A coordinate is NaN or infinite
    #[error("Non-finite coordinate at point {index}")]
    NonFinite {
        /// Index of the offending point.
        index: usize,
    },

    /// Nothing left to draw
    #[error("Artwork contains no drawable strokes")]
    EmptyArtwork,

    /// A point lies outside the box it must stay in
    #[error("Stroke {stroke} leaves its bounds at ({x:.3}, {y:.3})")]
    OutOfBounds {
        /// Index of the offending stroke.
        stroke: usize,
        /// X of the first point outside.
        x: f64,
        /// Y of the first point outside.
        y: f64,
    },

    /// The declared artwork bounding box is unusable
    #[error("Invalid artwork bounds {width} x {height}")]
    InvalidBounds {
        /// Declared width.
        width: f64,
        /// Declared height.
        height: f64,
    },
}

/// Capacity error type
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CapacityError {
    /// No simplification level brings the program within the command budget
    #[error("Command budget unattainable: at least {required} commands needed, budget is {budget}")]
    BudgetUnattainable {
        /// Smallest command count that could be reached.
        required: usize,
        /// The configured budget.
        budget: usize,
    },
}

/// Hardware error type
///
/// Carried by failed jobs, so it is cloneable and serializable.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum HardwareError {
    /// No acknowledgment arrived in time, including retries
    #[error("Command '{command}' not acknowledged within {timeout_ms}ms after {attempts} attempt(s)")]
    Timeout {
        /// The command line that timed out.
        command: String,
        /// Per-attempt timeout in milliseconds.
        timeout_ms: u64,
        /// Number of attempts made.
        attempts: u32,
    },

    /// The serial link failed
    #[error("Arm disconnected: {reason}")]
    Disconnected {
        /// The underlying failure.
        reason: String,
    },

    /// A reply line could not be understood
    #[error("Malformed acknowledgment: {line:?}")]
    MalformedAck {
        /// The raw reply line.
        line: String,
    },

    /// The firmware reported an error for a command
    #[error("Command '{command}' rejected: {reply}")]
    Rejected {
        /// The rejected command line.
        command: String,
        /// The firmware reply.
        reply: String,
    },

    /// No arm is connected
    #[error("Arm not connected")]
    NotConnected,

    /// The serial port could not be opened
    #[error("Failed to open port {port}: {reason}")]
    PortOpen {
        /// The port name.
        port: String,
        /// The underlying failure.
        reason: String,
    },
}

/// Concurrency error type
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConcurrencyError {
    /// A drawing job already owns the arm
    #[error("Arm is busy with job {job_id}")]
    JobAlreadyRunning {
        /// The running job.
        job_id: String,
    },

    /// The arm channel is held by another operation
    #[error("Arm channel is busy")]
    ChannelBusy,

    /// Another calibration session is open
    #[error("A calibration session is already active")]
    CalibrationSessionActive,
}

/// Main error type for PenArm
///
/// A unified error type that can represent any error from all layers.
/// This is the primary error type used in public APIs.
#[derive(Error, Debug)]
pub enum Error {
    /// Validation error
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// Geometry error
    #[error(transparent)]
    Geometry(#[from] GeometryError),

    /// Capacity error
    #[error(transparent)]
    Capacity(#[from] CapacityError),

    /// Hardware error
    #[error(transparent)]
    Hardware(#[from] HardwareError),

    /// Concurrency error
    #[error(transparent)]
    Concurrency(#[from] ConcurrencyError),

    /// Standard I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Generic error
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Create an error from a string message
    pub fn other(msg: impl Into<String>) -> Self {
        Error::Other(msg.into())
    }

    /// Check if this is a hardware timeout
    pub fn is_timeout(&self) -> bool {
        matches!(self, Error::Hardware(HardwareError::Timeout { .. }))
    }

    /// Check if this error was raised before touching hardware
    pub fn is_pre_hardware(&self) -> bool {
        matches!(
            self,
            Error::Validation(_) | Error::Geometry(_) | Error::Capacity(_)
        )
    }

    /// Check if this is a busy/overlap error
    pub fn is_busy(&self) -> bool {
        matches!(self, Error::Concurrency(_))
    }
}

/// Result type using Error
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = ValidationError::InvalidConfig {
            key: "join_threshold".to_string(),
            reason: "must be >= 0".to_string(),
        };
        assert_eq!(err.to_string(), "Invalid setting 'join_threshold': must be >= 0");

        let err = CapacityError::BudgetUnattainable {
            required: 21,
            budget: 10,
        };
        assert!(err.to_string().contains("at least 21"));
    }

    #[test]
    fn test_error_classification() {
        let err: Error = HardwareError::Timeout {
            command: "G28".to_string(),
            timeout_ms: 100,
            attempts: 3,
        }
        .into();
        assert!(err.is_timeout());
        assert!(!err.is_pre_hardware());

        let err: Error = GeometryError::EmptyArtwork.into();
        assert!(err.is_pre_hardware());

        let err: Error = ConcurrencyError::ChannelBusy.into();
        assert!(err.is_busy());
    }

    #[test]
    fn test_hardware_error_serializes() {
        let err = HardwareError::Rejected {
            command: "G1 X1".to_string(),
            reply: "Error:Unknown command".to_string(),
        };
        let json = serde_json::to_string(&err).expect("serialize");
        let back: HardwareError = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(back, err);
    }
}
