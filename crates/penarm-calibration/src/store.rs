//! Calibration persistence.
//!
//! The frame is stored as JSON with every field optional, so a partially
//! written or hand-edited file loads but cannot be restored.

use crate::frame::CalibrationFrame;
use parking_lot::Mutex;
use penarm_core::{Point3, Result, ValidationError};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Calibration data as found on disk
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct PersistedCalibration {
    /// First corner.
    pub corner1: Option<Point3>,
    /// Opposite corner.
    pub corner2: Option<Point3>,
    /// Resting position.
    pub resting: Option<Point3>,
    /// Pen-down height.
    pub z_draw: Option<f64>,
    /// Pen-up height.
    pub z_up: Option<f64>,
}

impl PersistedCalibration {
    /// Full record of a frame.
    pub fn from_frame(frame: &CalibrationFrame) -> Self {
        Self {
            corner1: Some(frame.corner1),
            corner2: Some(frame.corner2),
            resting: Some(frame.resting),
            z_draw: Some(frame.z_draw),
            z_up: Some(frame.z_up),
        }
    }

    /// True when every field is present.
    pub fn is_complete(&self) -> bool {
        self.corner1.is_some()
            && self.corner2.is_some()
            && self.resting.is_some()
            && self.z_draw.is_some()
            && self.z_up.is_some()
    }

    /// Convert to a validated frame.
    pub fn to_frame(&self) -> std::result::Result<CalibrationFrame, ValidationError> {
        fn require<T: Copy>(value: Option<T>, field: &str) -> std::result::Result<T, ValidationError> {
            value.ok_or_else(|| ValidationError::MissingCalibration {
                field: field.to_string(),
            })
        }
        let frame = CalibrationFrame {
            corner1: require(self.corner1, "corner1")?,
            corner2: require(self.corner2, "corner2")?,
            resting: require(self.resting, "resting")?,
            z_draw: require(self.z_draw, "z_draw")?,
            z_up: require(self.z_up, "z_up")?,
        };
        frame.validate()?;
        Ok(frame)
    }
}

enum Backend {
    File(PathBuf),
    Memory(Mutex<Option<PersistedCalibration>>),
}

/// Where calibration data lives
pub struct CalibrationStore {
    backend: Backend,
}

impl CalibrationStore {
    /// Store backed by a JSON file.
    pub fn file(path: impl Into<PathBuf>) -> Self {
        Self {
            backend: Backend::File(path.into()),
        }
    }

    /// Store kept in memory, optionally pre-seeded.
    pub fn in_memory(initial: Option<PersistedCalibration>) -> Self {
        Self {
            backend: Backend::Memory(Mutex::new(initial)),
        }
    }

    /// Backing file, if any.
    pub fn path(&self) -> Option<&Path> {
        match &self.backend {
            Backend::File(path) => Some(path),
            Backend::Memory(_) => None,
        }
    }

    /// Load stored data; a missing file is `Ok(None)`.
    pub fn load(&self) -> Result<Option<PersistedCalibration>> {
        match &self.backend {
            Backend::File(path) => {
                if !path.exists() {
                    return Ok(None);
                }
                let content = std::fs::read_to_string(path)?;
                Ok(Some(serde_json::from_str(&content)?))
            }
            Backend::Memory(slot) => Ok(*slot.lock()),
        }
    }

    /// Persist a frame.
    pub fn save(&self, frame: &CalibrationFrame) -> Result<()> {
        let record = PersistedCalibration::from_frame(frame);
        match &self.backend {
            Backend::File(path) => {
                if let Some(parent) = path.parent() {
                    std::fs::create_dir_all(parent)?;
                }
                std::fs::write(path, serde_json::to_string_pretty(&record)?)?;
                tracing::info!("Calibration saved to {}", path.display());
            }
            Backend::Memory(slot) => *slot.lock() = Some(record),
        }
        Ok(())
    }

    /// Remove stored data.
    pub fn clear(&self) -> Result<()> {
        match &self.backend {
            Backend::File(path) => {
                if path.exists() {
                    std::fs::remove_file(path)?;
                }
            }
            Backend::Memory(slot) => *slot.lock() = None,
        }
        Ok(())
    }
}

impl std::fmt::Debug for CalibrationStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.backend {
            Backend::File(path) => write!(f, "CalibrationStore({})", path.display()),
            Backend::Memory(_) => write!(f, "CalibrationStore(memory)"),
        }
    }
}
