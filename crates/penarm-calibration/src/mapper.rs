//! Artwork to machine coordinate mapping.
//!
//! The artwork box is scaled uniformly into the calibrated rectangle and
//! centred. When turning the artwork a quarter turn gives a strictly larger
//! scale, it is rotated first.

use crate::frame::{CalibrationFrame, DrawingArea};
use penarm_core::{BoundingBox, GeometryError, Point, Point3, Stroke};

/// Affine map from artwork space onto the drawing rectangle
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ArtworkMapping {
    source: BoundingBox,
    area: DrawingArea,
    scale: f64,
    rotated: bool,
    offset: Point,
}

impl ArtworkMapping {
    /// Fit `source` into the frame's drawing rectangle.
    pub fn new(frame: &CalibrationFrame, source: BoundingBox) -> Self {
        let area = frame.drawing_area();
        let (rw, rh) = (area.width(), area.height());
        let (w, h) = (source.width(), source.height());

        let plain = (rw / w).min(rh / h);
        let turned = (rw / h).min(rh / w);
        let rotated = turned > plain;
        let (scale, bw, bh) = if rotated { (turned, h, w) } else { (plain, w, h) };

        let offset = Point::new((rw - scale * bw) / 2.0, (rh - scale * bh) / 2.0);
        tracing::debug!(
            "Mapping {:.1}x{:.1} artwork at scale {:.4}{}",
            w,
            h,
            scale,
            if rotated { " (rotated)" } else { "" }
        );
        Self {
            source,
            area,
            scale,
            rotated,
            offset,
        }
    }

    /// Uniform scale factor, mm per artwork unit.
    pub fn scale(&self) -> f64 {
        self.scale
    }

    /// True when the artwork is turned a quarter.
    pub fn is_rotated(&self) -> bool {
        self.rotated
    }

    /// Target rectangle.
    pub fn area(&self) -> &DrawingArea {
        &self.area
    }

    /// Map an artwork point onto the drawing rectangle.
    pub fn map_xy(&self, p: Point) -> Point {
        let lx = p.x - self.source.min.x;
        let ly = p.y - self.source.min.y;
        let (qx, qy) = if self.rotated {
            (self.source.height() - ly, lx)
        } else {
            (lx, ly)
        };
        Point::new(
            self.area.min.x + self.offset.x + self.scale * qx,
            self.area.min.y + self.offset.y + self.scale * qy,
        )
    }

    /// Map an artwork point to a pen-down machine position.
    pub fn map(&self, p: Point) -> Point3 {
        let q = self.map_xy(p);
        Point3::new(q.x, q.y, self.area.z_draw)
    }

    /// Recover the artwork point from a mapped position.
    pub fn inverse(&self, q: Point) -> Point {
        let qx = (q.x - self.area.min.x - self.offset.x) / self.scale;
        let qy = (q.y - self.area.min.y - self.offset.y) / self.scale;
        let (lx, ly) = if self.rotated {
            (qy, self.source.height() - qx)
        } else {
            (qx, qy)
        };
        Point::new(self.source.min.x + lx, self.source.min.y + ly)
    }

    /// Map every point of a stroke.
    pub fn map_stroke(&self, stroke: &Stroke) -> Result<Stroke, GeometryError> {
        Stroke::new(stroke.points().iter().map(|&p| self.map_xy(p)).collect())
    }

    /// Map a batch of strokes, keeping their order.
    pub fn map_strokes(&self, strokes: &[Stroke]) -> Result<Vec<Stroke>, GeometryError> {
        strokes.iter().map(|s| self.map_stroke(s)).collect()
    }
}
