//! Manual arm control interface
//!
//! Operator-driven actions used while calibrating. Implementations must
//! refuse to act while a drawing job owns the arm.

use crate::data::Point3;
use crate::error::Result;
use async_trait::async_trait;

/// Direct control of the arm outside of job execution
#[async_trait]
pub trait ArmControl: Send + Sync {
    /// Name of the link (usually the serial port)
    fn name(&self) -> String;

    /// True while the link is usable
    fn is_connected(&self) -> bool;

    /// Run the homing cycle
    async fn home(&self) -> Result<()>;

    /// Release the motors so the arm can be moved by hand
    async fn unlock_motors(&self) -> Result<()>;

    /// Energize the motors so the arm holds its position
    async fn lock_motors(&self) -> Result<()>;

    /// Read the current tip position
    async fn current_position(&self) -> Result<Point3>;

    /// Move to a position at the given feedrate (mm/min)
    async fn move_to(&self, target: Point3, feedrate: f64) -> Result<()>;
}
