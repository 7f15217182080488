//! Zigzag fill for small closed shapes.
//!
//! Eyes, nostrils and similar tiny closed contours read better filled than
//! outlined. The fill is a boustrophedon of horizontal scanlines clipped to
//! the contour and appended to the outline, so the pen stays down.

use penarm_core::{Point, Stroke};

/// Narrowest accepted row spacing in mm. Keeps the row count proportional
/// to the shape height.
pub const MIN_FILL_SPACING: f64 = 0.05;

/// True when `stroke` is closed, has at least four points and encloses a
/// non-zero area no larger than `max_area`.
pub fn is_fillable(stroke: &Stroke, max_area: f64) -> bool {
    if stroke.len() < 4 || !stroke.is_closed() {
        return false;
    }
    let area = stroke.signed_area().abs();
    area > 0.0 && area <= max_area
}

/// Outline followed by its zigzag fill, or the stroke unchanged when it is
/// not fillable or `spacing` is below [`MIN_FILL_SPACING`].
pub fn fill_stroke(stroke: &Stroke, spacing: f64, max_area: f64) -> Stroke {
    if spacing.is_nan() || spacing < MIN_FILL_SPACING || !is_fillable(stroke, max_area) {
        return stroke.clone();
    }
    let fill = scanline_fill(stroke.points(), spacing);
    if fill.is_empty() {
        return stroke.clone();
    }
    let mut points = stroke.points().to_vec();
    points.extend(fill);
    Stroke::new(points).unwrap_or_else(|_| stroke.clone())
}

/// Scanline intersections of a closed polygon, alternating direction per row.
fn scanline_fill(polygon: &[Point], spacing: f64) -> Vec<Point> {
    let Some(bounds) = penarm_core::BoundingBox::enclosing(polygon.iter().copied()) else {
        return Vec::new();
    };

    let mut fill = Vec::new();
    let mut row = 0usize;
    let mut y = bounds.min.y + spacing / 2.0;
    while y < bounds.max.y {
        let mut xs: Vec<f64> = polygon
            .windows(2)
            .filter_map(|edge| crossing(edge[0], edge[1], y))
            .collect();
        xs.sort_by(f64::total_cmp);

        let mut segments: Vec<(Point, Point)> = xs
            .chunks_exact(2)
            .map(|pair| (Point::new(pair[0], y), Point::new(pair[1], y)))
            .collect();
        if row % 2 == 1 {
            segments.reverse();
            for segment in &mut segments {
                *segment = (segment.1, segment.0);
            }
        }
        for (a, b) in segments {
            fill.push(a);
            fill.push(b);
        }

        row += 1;
        y += spacing;
    }
    fill
}

/// X where the edge `a-b` crosses the horizontal line at `y`, half-open so
/// shared vertices are counted once.
fn crossing(a: Point, b: Point, y: f64) -> Option<f64> {
    if (a.y <= y && b.y > y) || (b.y <= y && a.y > y) {
        Some(a.x + (y - a.y) * (b.x - a.x) / (b.y - a.y))
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn square(size: f64) -> Stroke {
        Stroke::new(vec![
            Point::new(0.0, 0.0),
            Point::new(size, 0.0),
            Point::new(size, size),
            Point::new(0.0, size),
            Point::new(0.0, 0.0),
        ])
        .unwrap()
    }

    #[test]
    fn test_small_square_is_filled() {
        let filled = fill_stroke(&square(10.0), 2.0, 500.0);
        // 5 outline points plus 5 rows of 2 points.
        assert_eq!(filled.len(), 15);
        assert_eq!(filled.points()[5], Point::new(0.0, 1.0));
        assert_eq!(filled.points()[6], Point::new(10.0, 1.0));
        // Second row runs right to left.
        assert_eq!(filled.points()[7], Point::new(10.0, 3.0));
    }

    #[test]
    fn test_spacing_below_minimum_leaves_outline() {
        let shape = square(10.0);
        assert_eq!(fill_stroke(&shape, 1e-9, 500.0), shape);
        assert_eq!(fill_stroke(&shape, f64::NAN, 500.0), shape);
        let finest = fill_stroke(&shape, MIN_FILL_SPACING, 500.0);
        assert_eq!(finest.len(), 5 + 2 * 200);
    }

    #[test]
    fn test_large_or_open_shapes_untouched() {
        let big = square(100.0);
        assert_eq!(fill_stroke(&big, 2.0, 500.0), big);

        let open = Stroke::new(vec![
            Point::new(0.0, 0.0),
            Point::new(1.0, 0.0),
            Point::new(1.0, 1.0),
            Point::new(0.0, 1.0),
        ])
        .unwrap();
        assert!(!is_fillable(&open, 500.0));
    }

    #[test]
    fn test_concave_shape_yields_paired_segments() {
        // U shape: middle scanlines cross the outline four times.
        let u = Stroke::new(vec![
            Point::new(0.0, 0.0),
            Point::new(9.0, 0.0),
            Point::new(9.0, 9.0),
            Point::new(6.0, 9.0),
            Point::new(6.0, 3.0),
            Point::new(3.0, 3.0),
            Point::new(3.0, 9.0),
            Point::new(0.0, 9.0),
            Point::new(0.0, 0.0),
        ])
        .unwrap();
        let fill = scanline_fill(u.points(), 2.0);
        assert_eq!(fill.len() % 2, 0);
        assert!(fill.iter().all(|p| p.y > 0.0 && p.y < 9.0));
        let upper_row: Vec<&Point> = fill.iter().filter(|p| (p.y - 5.0).abs() < 1e-9).collect();
        assert_eq!(upper_row.len(), 4);
    }
}
