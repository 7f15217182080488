//! Traced artwork as delivered by the vectorizer.
//!
//! The on-disk format is JSON:
//!
//! ```json
//! { "width": 200.0, "height": 100.0,
//!   "strokes": [ { "name": "outline", "closed": true, "points": [[0, 0], [10, 0], [10, 10]] } ] }
//! ```

use crate::data::geometry::{BoundingBox, Point, Stroke};
use crate::error::{Error, GeometryError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// A named polyline of the artwork, open or closed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NamedStroke {
    /// Label given by the vectorizer.
    #[serde(default)]
    pub name: String,
    /// Raw points in artwork units.
    pub points: Vec<Point>,
    /// Closed strokes return to their first point.
    #[serde(default)]
    pub closed: bool,
}

/// A collection of strokes inside a declared bounding box.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Artwork {
    /// Declared width of the drawing area.
    pub width: f64,
    /// Declared height of the drawing area.
    pub height: f64,
    /// Raw strokes.
    pub strokes: Vec<NamedStroke>,
}

impl Artwork {
    /// Create an artwork from its parts.
    pub fn new(width: f64, height: f64, strokes: Vec<NamedStroke>) -> Self {
        Self {
            width,
            height,
            strokes,
        }
    }

    /// Load an artwork JSON file.
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let artwork: Self = serde_json::from_str(&content)?;
        artwork.bounds()?;
        Ok(artwork)
    }

    /// Parse artwork JSON from a string.
    pub fn from_json(content: &str) -> Result<Self> {
        let artwork: Self = serde_json::from_str(content)?;
        artwork.bounds()?;
        Ok(artwork)
    }

    /// The declared bounding box `(0,0)-(width,height)`.
    pub fn bounds(&self) -> std::result::Result<BoundingBox, GeometryError> {
        BoundingBox::from_size(self.width, self.height)
    }

    /// Total number of raw points.
    pub fn point_count(&self) -> usize {
        self.strokes.iter().map(|s| s.points.len()).sum()
    }

    /// Convert to validated strokes, closing closed ones.
    ///
    /// Single-point strokes carry nothing drawable and are skipped with a
    /// debug log. Non-finite coordinates and points outside the declared
    /// `width` x `height` box are rejected.
    pub fn to_strokes(&self) -> Result<Vec<Stroke>> {
        let bounds = self.bounds()?;
        let mut out = Vec::with_capacity(self.strokes.len());
        for (index, named) in self.strokes.iter().enumerate() {
            let mut points = named.points.clone();
            if named.closed && points.len() > 1 && points.first() != points.last() {
                points.push(points[0]);
            }
            if points.len() < 2 {
                tracing::debug!("Skipping stroke '{}' with {} point(s)", named.name, points.len());
                continue;
            }
            let stroke = Stroke::new(points).map_err(Error::from)?;
            if let Some(p) = stroke.points().iter().find(|p| !bounds.contains(**p)) {
                return Err(GeometryError::OutOfBounds {
                    stroke: index,
                    x: p.x,
                    y: p.y,
                }
                .into());
            }
            out.push(stroke);
        }
        Ok(out)
    }
}
