//! # PenArm Calibration
//!
//! Operator-driven calibration of the drawing rectangle and the mapping of
//! artwork coordinates into it.
//!
//! - **State machine**: Disconnected → Connected → Homed → Corner1Set →
//!   Corner2Set → RestingSet → Calibrated, one explicit action per step
//! - **Sessions**: only one operator session may change calibration at a time
//! - **Mapping**: uniform, centred, optionally rotated fit of artwork space
//! - **Persistence**: the finished frame is stored as JSON

pub mod frame;
pub mod mapper;
pub mod session;
pub mod state;
pub mod store;

pub use frame::{CalibrationFrame, DrawingArea, DEFAULT_RESTING, MIN_EXTENT};
pub use mapper::ArtworkMapping;
pub use session::{CalibrationManager, CalibrationSession};
pub use state::{CalibrationState, CapturePhase};
pub use store::{CalibrationStore, PersistedCalibration};
