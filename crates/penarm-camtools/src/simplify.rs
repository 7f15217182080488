//! Stroke simplification using the Ramer-Douglas-Peucker algorithm.
//!
//! Used by the generator to bring a program within its command budget.

use penarm_core::{Point, Stroke};

/// Simplify a stroke, dropping points within `tolerance` of the chord
/// between their kept neighbours.
///
/// Both endpoints are always kept. A tolerance of 0.0 removes only exactly
/// collinear points; `f64::INFINITY` reduces every stroke to its endpoints.
#[must_use = "returns the simplified stroke"]
pub fn simplify_stroke(stroke: &Stroke, tolerance: f64) -> Stroke {
    let points = stroke.points();
    if points.len() < 3 {
        return stroke.clone();
    }

    let mut kept = vec![false; points.len()];
    kept[0] = true;
    kept[points.len() - 1] = true;

    rdp_recurse(points, 0, points.len() - 1, tolerance, &mut kept);

    let simplified: Vec<Point> = points
        .iter()
        .zip(&kept)
        .filter(|&(_, k)| *k)
        .map(|(&p, _)| p)
        .collect();

    Stroke::new(simplified).unwrap_or_else(|_| stroke.clone())
}

/// Simplify every stroke independently.
#[must_use = "returns the simplified strokes"]
pub fn simplify_strokes(strokes: &[Stroke], tolerance: f64) -> Vec<Stroke> {
    strokes.iter().map(|s| simplify_stroke(s, tolerance)).collect()
}

fn rdp_recurse(points: &[Point], start: usize, end: usize, tolerance: f64, kept: &mut [bool]) {
    if end <= start + 1 {
        return;
    }

    let mut max_dist = 0.0;
    let mut max_idx = start;

    for i in (start + 1)..end {
        let d = perpendicular_distance(points[i], points[start], points[end]);
        if d > max_dist {
            max_dist = d;
            max_idx = i;
        }
    }

    if max_dist > tolerance {
        kept[max_idx] = true;
        rdp_recurse(points, start, max_idx, tolerance, kept);
        rdp_recurse(points, max_idx, end, tolerance, kept);
    }
}

/// Distance from `p` to the line through `a` and `b`, or to `a` when they
/// coincide (closed strokes).
fn perpendicular_distance(p: Point, a: Point, b: Point) -> f64 {
    let dx = b.x - a.x;
    let dy = b.y - a.y;
    let length_sq = dx.mul_add(dx, dy * dy);

    if length_sq == 0.0 {
        return p.distance(a);
    }

    let cross = dx.mul_add(a.y - p.y, -(dy * (a.x - p.x)));
    cross.abs() / length_sq.sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stroke(coords: &[(f64, f64)]) -> Stroke {
        Stroke::new(coords.iter().map(|&(x, y)| Point::new(x, y)).collect()).unwrap()
    }

    #[test]
    fn test_collinear_points_collapse() {
        let s = stroke(&[(0.0, 0.0), (1.0, 1.0), (2.0, 2.0), (3.0, 3.0)]);
        let simplified = simplify_stroke(&s, 0.0);
        assert_eq!(simplified.len(), 2);
        assert_eq!(simplified.start(), Point::new(0.0, 0.0));
        assert_eq!(simplified.end(), Point::new(3.0, 3.0));
    }

    #[test]
    fn test_peaks_above_tolerance_kept() {
        let s = stroke(&[(0.0, 0.0), (2.0, 5.0), (4.0, 0.0), (6.0, 5.0), (8.0, 0.0)]);
        assert_eq!(simplify_stroke(&s, 1.0).len(), 5);
        assert_eq!(simplify_stroke(&s, 10.0).len(), 2);
    }

    #[test]
    fn test_closed_stroke_keeps_far_point() {
        let s = stroke(&[(0.0, 0.0), (10.0, 0.0), (10.0, 10.0), (0.0, 10.0), (0.0, 0.0)]);
        let simplified = simplify_stroke(&s, 1.0);
        assert!(simplified.is_closed());
        assert!(simplified.len() >= 3);
    }

    #[test]
    fn test_infinite_tolerance_keeps_endpoints() {
        let s = stroke(&[(0.0, 0.0), (1.0, 9.0), (2.0, -9.0), (3.0, 0.0)]);
        assert_eq!(simplify_stroke(&s, f64::INFINITY).len(), 2);
    }
}
