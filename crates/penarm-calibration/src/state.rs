//! Calibration state machine states.

use serde::{Deserialize, Serialize};

/// Where the operator is in the calibration procedure
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum CalibrationState {
    /// No arm link.
    #[default]
    Disconnected,
    /// Link open, arm not homed.
    Connected,
    /// Homing completed.
    Homed,
    /// First drawing corner captured.
    Corner1Set,
    /// Opposite corner captured.
    Corner2Set,
    /// Resting position captured.
    RestingSet,
    /// Frame complete and usable for mapping.
    Calibrated,
}

impl CalibrationState {
    /// True once the arm has been homed on the current link.
    pub fn is_homed(self) -> bool {
        !matches!(
            self,
            CalibrationState::Disconnected | CalibrationState::Connected
        )
    }

    /// Label of the point captured next, if this state accepts a capture.
    pub fn next_capture(self) -> Option<&'static str> {
        match self {
            CalibrationState::Homed => Some("corner1"),
            CalibrationState::Corner1Set => Some("corner2"),
            CalibrationState::Corner2Set => Some("resting"),
            _ => None,
        }
    }
}

impl std::fmt::Display for CalibrationState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            CalibrationState::Disconnected => "Disconnected",
            CalibrationState::Connected => "Connected",
            CalibrationState::Homed => "Homed",
            CalibrationState::Corner1Set => "Corner1Set",
            CalibrationState::Corner2Set => "Corner2Set",
            CalibrationState::RestingSet => "RestingSet",
            CalibrationState::Calibrated => "Calibrated",
        };
        write!(f, "{}", name)
    }
}

/// Motor handling within a single capture
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum CapturePhase {
    /// Motors energized, nothing pending.
    #[default]
    Idle,
    /// Motors released; the operator is positioning the arm.
    MotorsUnlocked,
    /// Motors locked at the new position, ready to capture.
    MotorsLocked,
}
