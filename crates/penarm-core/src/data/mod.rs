//! Data models for artwork, geometry, motion programs and jobs.

pub mod artwork;
pub mod geometry;
pub mod job;
pub mod motion;

pub use artwork::{Artwork, NamedStroke};
pub use geometry::{BoundingBox, Point, Point3, Stroke};
pub use job::{DrawingJob, JobId, JobStatus};
pub use motion::{MotionCommand, MotionProfile, MotionProgram};
