//! Stroke ordering to reduce pen-up travel.
//!
//! Greedy nearest-neighbour over stroke endpoints: start with the longest
//! stroke, then repeatedly draw the unvisited stroke whose nearer endpoint
//! is closest to where the pen currently is, oriented so that endpoint
//! comes first. Not optimal, but deterministic: ties go to the lowest
//! input index, then to the forward orientation.

use penarm_core::{Point, Stroke};

/// Reorder and orient strokes.
///
/// With a `start` position the first stroke is oriented to begin at its
/// endpoint nearer to `start`; without one it keeps its direction.
/// Every input stroke appears exactly once in the output.
#[must_use = "returns the reordered strokes"]
pub fn order_strokes(strokes: &[Stroke], start: Option<Point>) -> Vec<Stroke> {
    if strokes.is_empty() {
        return Vec::new();
    }

    let n = strokes.len();
    let mut visited = vec![false; n];
    let mut ordered = Vec::with_capacity(n);

    let first = longest_stroke(strokes);
    visited[first] = true;
    let first_stroke = match start {
        Some(origin)
            if origin.distance_squared(strokes[first].end())
                < origin.distance_squared(strokes[first].start()) =>
        {
            strokes[first].reversed()
        }
        _ => strokes[first].clone(),
    };
    let mut pen = first_stroke.end();
    ordered.push(first_stroke);

    for _ in 1..n {
        let mut best: Option<(f64, usize, bool)> = None;
        for (j, candidate) in strokes.iter().enumerate() {
            if visited[j] {
                continue;
            }
            let forward = pen.distance_squared(candidate.start());
            let backward = pen.distance_squared(candidate.end());
            let (d, reversed) = if forward <= backward {
                (forward, false)
            } else {
                (backward, true)
            };
            if best.is_none_or(|(best_d, _, _)| d < best_d) {
                best = Some((d, j, reversed));
            }
        }

        let Some((_, j, reversed)) = best else {
            break;
        };
        visited[j] = true;
        let next = if reversed {
            strokes[j].reversed()
        } else {
            strokes[j].clone()
        };
        pen = next.end();
        ordered.push(next);
    }

    tracing::debug!(
        "Ordered {} strokes, pen-up travel {:.1}",
        ordered.len(),
        travel_distance(&ordered, start)
    );
    ordered
}

/// Total pen-up travel when drawing `strokes` in order, optionally starting
/// from `start`.
#[must_use]
pub fn travel_distance(strokes: &[Stroke], start: Option<Point>) -> f64 {
    let mut pen = start;
    let mut total = 0.0;
    for stroke in strokes {
        if let Some(p) = pen {
            total += p.distance(stroke.start());
        }
        pen = Some(stroke.end());
    }
    total
}

/// Index of the stroke with the greatest path length, earliest on ties.
fn longest_stroke(strokes: &[Stroke]) -> usize {
    let mut best = 0;
    let mut best_len = strokes[0].length();
    for (i, stroke) in strokes.iter().enumerate().skip(1) {
        let len = stroke.length();
        if len > best_len {
            best = i;
            best_len = len;
        }
    }
    best
}
