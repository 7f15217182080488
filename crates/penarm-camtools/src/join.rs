//! Stroke joining and smoothing.
//!
//! Traced artwork arrives as many short fragments. Joining grows chains by
//! repeatedly attaching the fragment whose endpoint lies nearest the free
//! end of the current chain, as long as that endpoint is within the join
//! threshold. Afterwards every chain is smoothed with a Gaussian weighted
//! moving average that leaves both endpoints untouched.
//!
//! Exact distance ties go to the fragment with the lowest input index,
//! then to the forward orientation.

use penarm_core::{Point, Stroke, ValidationError};
use rstar::primitives::GeomWithData;
use rstar::RTree;
use serde::{Deserialize, Serialize};

/// Above this many fragments the endpoint search uses an R-tree.
pub const SPATIAL_INDEX_THRESHOLD: usize = 2_000;

/// Joining parameters
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct JoinConfig {
    /// Largest endpoint gap that still joins two fragments.
    pub join_threshold: f64,
    /// Gaussian spread of the smoothing pass; 0 disables smoothing.
    pub smoothing_sigma: f64,
}

impl Default for JoinConfig {
    fn default() -> Self {
        Self {
            join_threshold: 10.0,
            smoothing_sigma: 1.0,
        }
    }
}

impl JoinConfig {
    /// Reject negative or non-finite parameters.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if !self.join_threshold.is_finite() || self.join_threshold < 0.0 {
            return Err(ValidationError::InvalidConfig {
                key: "join_threshold".to_string(),
                reason: format!("must be a finite value >= 0, got {}", self.join_threshold),
            });
        }
        if !self.smoothing_sigma.is_finite() || self.smoothing_sigma < 0.0 {
            return Err(ValidationError::InvalidConfig {
                key: "smoothing_sigma".to_string(),
                reason: format!("must be a finite value >= 0, got {}", self.smoothing_sigma),
            });
        }
        Ok(())
    }
}

/// Join fragments into maximal chains, then smooth each chain.
///
/// Only idempotent when `smoothing_sigma` is 0. With smoothing on, joining
/// the output again yields the same chains with the same endpoints, but
/// every interior point is smoothed a second time. Use [`chain_strokes`]
/// when a re-joinable result is needed.
pub fn join_strokes(strokes: &[Stroke], config: &JoinConfig) -> Result<Vec<Stroke>, ValidationError> {
    config.validate()?;
    let chains = chain_strokes(strokes, config.join_threshold);
    tracing::debug!(
        "Joined {} fragments into {} strokes (threshold {})",
        strokes.len(),
        chains.len(),
        config.join_threshold
    );
    Ok(chains
        .iter()
        .map(|chain| smooth_stroke(chain, config.smoothing_sigma))
        .collect())
}

/// Greedy tail-extension joining without smoothing.
///
/// Zero-length fragments are dropped first. Points are concatenated as-is,
/// so the output never has more points than the input.
pub fn chain_strokes(strokes: &[Stroke], join_threshold: f64) -> Vec<Stroke> {
    let fragments: Vec<&Stroke> = strokes.iter().filter(|s| !s.is_zero_length()).collect();
    if fragments.len() < strokes.len() {
        tracing::debug!(
            "Dropped {} zero-length fragments",
            strokes.len() - fragments.len()
        );
    }

    let mut index: Box<dyn EndpointIndex> = if fragments.len() > SPATIAL_INDEX_THRESHOLD {
        Box::new(SpatialEndpointIndex::new(&fragments))
    } else {
        Box::new(LinearEndpointIndex::new(&fragments))
    };

    let mut consumed = vec![false; fragments.len()];
    let mut chains = Vec::new();

    for seed in 0..fragments.len() {
        if consumed[seed] {
            continue;
        }
        consumed[seed] = true;
        index.remove(seed);

        let mut chain = fragments[seed].clone();
        while let Some(hit) = index.nearest(chain.end(), join_threshold) {
            consumed[hit.stroke] = true;
            index.remove(hit.stroke);
            let next = fragments[hit.stroke];
            chain = if hit.reversed {
                chain.concat(&next.reversed())
            } else {
                chain.concat(next)
            };
        }
        chains.push(chain);
    }

    chains
}

/// Gaussian smoothing of the interior points of a stroke.
///
/// Kernel radius is `ceil(3 * sigma)`, samples past either end are clamped
/// to the end point. Strokes with fewer than three points and `sigma == 0`
/// return the input unchanged.
pub fn smooth_stroke(stroke: &Stroke, sigma: f64) -> Stroke {
    if sigma <= 0.0 || stroke.len() < 3 {
        return stroke.clone();
    }

    let kernel = gaussian_kernel(sigma);
    let radius = (kernel.len() / 2) as isize;
    let points = stroke.points();
    let last = points.len() - 1;

    let mut smoothed = Vec::with_capacity(points.len());
    smoothed.push(points[0]);
    for i in 1..last {
        let mut x = 0.0;
        let mut y = 0.0;
        for (k, weight) in kernel.iter().enumerate() {
            let j = (i as isize + k as isize - radius).clamp(0, last as isize) as usize;
            x = weight.mul_add(points[j].x, x);
            y = weight.mul_add(points[j].y, y);
        }
        smoothed.push(Point::new(x, y));
    }
    smoothed.push(points[last]);

    Stroke::new(smoothed).unwrap_or_else(|_| stroke.clone())
}

/// Normalized Gaussian weights for offsets `-r..=r`.
fn gaussian_kernel(sigma: f64) -> Vec<f64> {
    let radius = (3.0 * sigma).ceil().max(1.0) as i64;
    let two_sigma_sq = 2.0 * sigma * sigma;
    let raw: Vec<f64> = (-radius..=radius)
        .map(|offset| (-((offset * offset) as f64) / two_sigma_sq).exp())
        .collect();
    let total: f64 = raw.iter().sum();
    raw.into_iter().map(|w| w / total).collect()
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct EndpointHit {
    stroke: usize,
    /// The fragment's end is the near endpoint, so it is appended reversed.
    reversed: bool,
}

/// Nearest-endpoint lookup over the unconsumed fragments.
trait EndpointIndex {
    fn remove(&mut self, stroke: usize);
    fn nearest(&self, from: Point, max_distance: f64) -> Option<EndpointHit>;
}

/// All-pairs scan. Iterating in input order with a strict comparison gives
/// the tie-break for free.
struct LinearEndpointIndex {
    endpoints: Vec<(Point, Point)>,
    alive: Vec<bool>,
}

impl LinearEndpointIndex {
    fn new(fragments: &[&Stroke]) -> Self {
        Self {
            endpoints: fragments.iter().map(|s| (s.start(), s.end())).collect(),
            alive: vec![true; fragments.len()],
        }
    }
}

impl EndpointIndex for LinearEndpointIndex {
    fn remove(&mut self, stroke: usize) {
        self.alive[stroke] = false;
    }

    fn nearest(&self, from: Point, max_distance: f64) -> Option<EndpointHit> {
        let limit = max_distance * max_distance;
        let mut best: Option<(f64, EndpointHit)> = None;
        for (stroke, &(start, end)) in self.endpoints.iter().enumerate() {
            if !self.alive[stroke] {
                continue;
            }
            for (point, reversed) in [(start, false), (end, true)] {
                let d = from.distance_squared(point);
                if d <= limit && best.is_none_or(|(best_d, _)| d < best_d) {
                    best = Some((d, EndpointHit { stroke, reversed }));
                }
            }
        }
        best.map(|(_, hit)| hit)
    }
}

type IndexedEndpoint = GeomWithData<[f64; 2], (usize, bool)>;

/// R-tree over fragment endpoints for large inputs.
struct SpatialEndpointIndex {
    tree: RTree<IndexedEndpoint>,
    endpoints: Vec<(Point, Point)>,
}

impl SpatialEndpointIndex {
    fn new(fragments: &[&Stroke]) -> Self {
        let endpoints: Vec<(Point, Point)> =
            fragments.iter().map(|s| (s.start(), s.end())).collect();
        let items = endpoints
            .iter()
            .enumerate()
            .flat_map(|(i, &(start, end))| {
                [
                    GeomWithData::new([start.x, start.y], (i, false)),
                    GeomWithData::new([end.x, end.y], (i, true)),
                ]
            })
            .collect();
        Self {
            tree: RTree::bulk_load(items),
            endpoints,
        }
    }
}

impl EndpointIndex for SpatialEndpointIndex {
    fn remove(&mut self, stroke: usize) {
        let (start, end) = self.endpoints[stroke];
        self.tree
            .remove(&GeomWithData::new([start.x, start.y], (stroke, false)));
        self.tree
            .remove(&GeomWithData::new([end.x, end.y], (stroke, true)));
    }

    fn nearest(&self, from: Point, max_distance: f64) -> Option<EndpointHit> {
        let limit = max_distance * max_distance;
        let mut best: Option<(f64, EndpointHit)> = None;
        // Candidates come in non-decreasing distance; gather the whole tie
        // group of the closest distance and keep the lowest (index, orientation).
        for (item, d) in self.tree.nearest_neighbor_iter_with_distance_2(&[from.x, from.y]) {
            if d > limit || best.is_some_and(|(best_d, _)| d > best_d) {
                break;
            }
            let (stroke, reversed) = item.data;
            let hit = EndpointHit { stroke, reversed };
            if best.is_none_or(|(_, b)| (stroke, reversed) < (b.stroke, b.reversed)) {
                best = Some((d, hit));
            }
        }
        best.map(|(_, hit)| hit)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stroke(coords: &[(f64, f64)]) -> Stroke {
        Stroke::new(coords.iter().map(|&(x, y)| Point::new(x, y)).collect()).unwrap()
    }

    fn no_smoothing(threshold: f64) -> JoinConfig {
        JoinConfig {
            join_threshold: threshold,
            smoothing_sigma: 0.0,
        }
    }

    #[test]
    fn test_joins_collinear_fragments() {
        let input = vec![
            stroke(&[(0.0, 0.0), (10.0, 0.0)]),
            stroke(&[(10.5, 0.0), (20.0, 0.0)]),
        ];
        let joined = join_strokes(&input, &no_smoothing(1.0)).unwrap();
        assert_eq!(joined.len(), 1);
        assert_eq!(
            joined[0].points(),
            &[
                Point::new(0.0, 0.0),
                Point::new(10.0, 0.0),
                Point::new(10.5, 0.0),
                Point::new(20.0, 0.0)
            ]
        );
    }

    #[test]
    fn test_reverses_fragment_when_far_end_is_near() {
        let input = vec![
            stroke(&[(0.0, 0.0), (10.0, 0.0)]),
            stroke(&[(20.0, 0.0), (10.2, 0.0)]),
        ];
        let joined = chain_strokes(&input, 1.0);
        assert_eq!(joined.len(), 1);
        assert_eq!(joined[0].end(), Point::new(20.0, 0.0));
    }

    #[test]
    fn test_gap_above_threshold_keeps_strokes_apart() {
        let input = vec![
            stroke(&[(0.0, 0.0), (10.0, 0.0)]),
            stroke(&[(12.0, 0.0), (20.0, 0.0)]),
        ];
        assert_eq!(chain_strokes(&input, 1.0).len(), 2);
        // Threshold is inclusive.
        assert_eq!(chain_strokes(&input, 2.0).len(), 1);
    }

    #[test]
    fn test_tie_prefers_earliest_fragment() {
        let input = vec![
            stroke(&[(0.0, 0.0), (10.0, 0.0)]),
            stroke(&[(11.0, 0.0), (11.0, 5.0)]),
            stroke(&[(9.0, 0.0), (9.0, -5.0)]),
        ];
        let joined = chain_strokes(&input, 2.0);
        assert_eq!(joined[0].points()[2], Point::new(11.0, 0.0));
    }

    #[test]
    fn test_tie_prefers_forward_orientation() {
        // A loop fragment: both endpoints are equally near.
        let input = vec![
            stroke(&[(0.0, 0.0), (10.0, 0.0)]),
            stroke(&[(10.0, 1.0), (12.0, 3.0), (10.0, 1.0)]),
        ];
        let joined = chain_strokes(&input, 2.0);
        assert_eq!(joined[0].points()[3], Point::new(12.0, 3.0));
        assert_eq!(joined[0].len(), 5);
    }

    #[test]
    fn test_zero_length_fragments_dropped() {
        let input = vec![
            stroke(&[(5.0, 5.0), (5.0, 5.0)]),
            stroke(&[(0.0, 0.0), (1.0, 0.0)]),
        ];
        let joined = chain_strokes(&input, 100.0);
        assert_eq!(joined.len(), 1);
        assert_eq!(joined[0].len(), 2);
    }

    #[test]
    fn test_smoothing_preserves_endpoints_and_count() {
        let s = stroke(&[(0.0, 0.0), (1.0, 5.0), (2.0, -5.0), (3.0, 5.0), (4.0, 0.0)]);
        let smoothed = smooth_stroke(&s, 1.0);
        assert_eq!(smoothed.len(), s.len());
        assert_eq!(smoothed.start(), s.start());
        assert_eq!(smoothed.end(), s.end());
        // Zigzag amplitude is damped.
        assert!(smoothed.points()[2].y.abs() < 5.0);
    }

    #[test]
    fn test_rejoin_is_stable_only_without_smoothing() {
        let input = vec![
            stroke(&[(0.0, 0.0), (1.0, 5.0), (2.0, -5.0)]),
            stroke(&[(2.0, -5.0), (3.0, 5.0), (4.0, 0.0)]),
        ];

        let plain = no_smoothing(1.0);
        let once = join_strokes(&input, &plain).unwrap();
        assert_eq!(join_strokes(&once, &plain).unwrap(), once);

        let smoothed = JoinConfig::default();
        let once = join_strokes(&input, &smoothed).unwrap();
        let twice = join_strokes(&once, &smoothed).unwrap();
        assert_eq!(once.len(), twice.len());
        assert_eq!(once[0].start(), twice[0].start());
        assert_eq!(once[0].end(), twice[0].end());
        assert_ne!(once, twice);
    }

    #[test]
    fn test_zero_sigma_is_identity() {
        let s = stroke(&[(0.0, 0.0), (1.0, 5.0), (2.0, 0.0)]);
        assert_eq!(smooth_stroke(&s, 0.0), s);
    }

    #[test]
    fn test_negative_parameters_rejected() {
        let config = JoinConfig {
            join_threshold: -1.0,
            smoothing_sigma: 0.0,
        };
        assert!(matches!(
            join_strokes(&[], &config),
            Err(ValidationError::InvalidConfig { .. })
        ));
        let config = JoinConfig {
            join_threshold: 1.0,
            smoothing_sigma: f64::NAN,
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_kernel_is_normalized() {
        let kernel = gaussian_kernel(1.5);
        assert_eq!(kernel.len(), 11);
        assert!((kernel.iter().sum::<f64>() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_spatial_index_matches_linear_scan() {
        // A grid of short dashes with ties everywhere.
        let fragments: Vec<Stroke> = (0..60)
            .map(|i| {
                let x = f64::from(i % 10) * 3.0;
                let y = f64::from(i / 10) * 3.0;
                stroke(&[(x, y), (x + 2.0, y)])
            })
            .collect();
        let refs: Vec<&Stroke> = fragments.iter().collect();
        let mut linear = LinearEndpointIndex::new(&refs);
        let mut spatial = SpatialEndpointIndex::new(&refs);
        for removed in [0usize, 7, 33] {
            linear.remove(removed);
            spatial.remove(removed);
        }
        for query in [
            Point::new(2.0, 0.0),
            Point::new(4.5, 3.0),
            Point::new(5.5, 3.0),
            Point::new(14.0, 9.5),
            Point::new(100.0, 100.0),
        ] {
            assert_eq!(linear.nearest(query, 2.0), spatial.nearest(query, 2.0));
        }
    }
}
