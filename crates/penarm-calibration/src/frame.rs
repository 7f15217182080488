//! Calibration frame: the physical drawing rectangle and pen heights.

use penarm_core::{Point, Point3, Stroke, ValidationError};
use serde::{Deserialize, Serialize};

/// Smallest corner separation (mm) on each axis for a usable rectangle.
pub const MIN_EXTENT: f64 = 1e-6;

/// Resting position used when the operator does not capture one.
pub const DEFAULT_RESTING: Point3 = Point3::new(200.0, 0.0, 50.0);

/// Operator-captured reference points and derived pen heights
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CalibrationFrame {
    /// First corner of the drawing rectangle; its Z is the drawing height.
    pub corner1: Point3,
    /// Opposite corner.
    pub corner2: Point3,
    /// Where the arm parks between and after jobs.
    pub resting: Point3,
    /// Pen-down height.
    pub z_draw: f64,
    /// Pen-up height.
    pub z_up: f64,
}

impl CalibrationFrame {
    /// Build a frame from captured points; the pen lifts `pen_lift` mm above
    /// the first corner's height.
    pub fn new(
        corner1: Point3,
        corner2: Point3,
        resting: Point3,
        pen_lift: f64,
    ) -> Result<Self, ValidationError> {
        let frame = Self {
            corner1,
            corner2,
            resting,
            z_draw: corner1.z,
            z_up: corner1.z + pen_lift,
        };
        frame.validate()?;
        Ok(frame)
    }

    /// Check the rectangle and the pen heights.
    pub fn validate(&self) -> Result<(), ValidationError> {
        check_rectangle(self.corner1, self.corner2)?;
        if !(self.z_draw.is_finite() && self.z_up.is_finite()) || self.z_draw >= self.z_up {
            return Err(ValidationError::InvalidPenHeights {
                z_draw: self.z_draw,
                z_up: self.z_up,
            });
        }
        if !self.resting.is_finite() {
            return Err(ValidationError::MissingCalibration {
                field: "resting".to_string(),
            });
        }
        Ok(())
    }

    /// The axis-aligned drawing rectangle.
    pub fn drawing_area(&self) -> DrawingArea {
        DrawingArea {
            min: Point::new(
                self.corner1.x.min(self.corner2.x),
                self.corner1.y.min(self.corner2.y),
            ),
            max: Point::new(
                self.corner1.x.max(self.corner2.x),
                self.corner1.y.max(self.corner2.y),
            ),
            z_draw: self.z_draw,
        }
    }

    /// Calibration check pattern: the rectangle through all four corners,
    /// then both diagonals.
    pub fn test_pattern(&self) -> Vec<Stroke> {
        let c1 = self.corner1.xy();
        let c2 = self.corner2.xy();
        let c3 = Point::new(c2.x, c1.y);
        let c4 = Point::new(c1.x, c2.y);
        [vec![c1, c3, c2, c4, c1], vec![c1, c2], vec![c3, c4]]
            .into_iter()
            .filter_map(|points| Stroke::new(points).ok())
            .collect()
    }
}

/// Reject corners that do not span a rectangle.
pub fn check_rectangle(corner1: Point3, corner2: Point3) -> Result<(), ValidationError> {
    let dx = (corner2.x - corner1.x).abs();
    let dy = (corner2.y - corner1.y).abs();
    if !(dx.is_finite() && dy.is_finite()) || dx <= MIN_EXTENT || dy <= MIN_EXTENT {
        return Err(ValidationError::DegenerateRectangle { dx, dy });
    }
    Ok(())
}

/// The physical drawing rectangle
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DrawingArea {
    /// Lower-left corner.
    pub min: Point,
    /// Upper-right corner.
    pub max: Point,
    /// Pen-down height.
    pub z_draw: f64,
}

impl DrawingArea {
    /// Width in mm.
    pub fn width(&self) -> f64 {
        self.max.x - self.min.x
    }

    /// Height in mm.
    pub fn height(&self) -> f64 {
        self.max.y - self.min.y
    }

    /// Center of the rectangle.
    pub fn center(&self) -> Point {
        Point::new(
            (self.min.x + self.max.x) / 2.0,
            (self.min.y + self.max.y) / 2.0,
        )
    }

    /// True when `p` lies inside the rectangle, allowing `MIN_EXTENT` of
    /// rounding on each border.
    pub fn contains(&self, p: Point) -> bool {
        p.x >= self.min.x - MIN_EXTENT
            && p.x <= self.max.x + MIN_EXTENT
            && p.y >= self.min.y - MIN_EXTENT
            && p.y <= self.max.y + MIN_EXTENT
    }
}
