//! # PenArm Core
//!
//! Core types, traits, and utilities for PenArm.
//! Provides the geometry and motion data models, the error taxonomy,
//! the progress event bus and the manual arm control trait.

pub mod arm;
pub mod data;
pub mod error;
pub mod event_bus;

pub use arm::ArmControl;

pub use data::{
    Artwork, BoundingBox, DrawingJob, JobId, JobStatus, MotionCommand, MotionProfile,
    MotionProgram, NamedStroke, Point, Point3, Stroke,
};

pub use error::{
    CapacityError, ConcurrencyError, Error, GeometryError, HardwareError, Result, ValidationError,
};

pub use event_bus::{
    AppEvent, CalibrationEvent, ConnectionEvent, EventBus, EventBusConfig, EventCategory,
    EventFilter, JobProgressStream, ProgressEvent, SubscriptionId,
};
