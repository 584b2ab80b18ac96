// Copyright 2025 Lars Brubaker
// License: SGI Free Software License B (MIT-compatible)

use tracing::trace;

use super::{BoundaryParametricPoint, ParametricPoint};
use crate::error::{TriangulationError, TriangulationResult};
use crate::geom::Real;

/// Flattens per-segment point lists into one polygon.
///
/// The first point of every segment repeats the previous segment's last
/// point and is skipped. The segment index is added to each parameter so
/// that `t` increases around the whole polygon; `what` names the polygon in
/// errors.
pub fn initialize_polygon(
    segments: &[Vec<ParametricPoint>],
    what: &str,
    max_points: Option<usize>,
) -> TriangulationResult<Vec<BoundaryParametricPoint>> {
    let count: usize = segments.iter().map(|s| s.len().saturating_sub(1)).sum();
    if count == 0 {
        return Err(TriangulationError::empty_polygon(format!("{what} polygon has no points")));
    }
    if let Some(limit) = max_points {
        if count > limit {
            return Err(TriangulationError::BudgetExceeded { count, limit });
        }
    }

    let mut polygon = Vec::with_capacity(count);
    for (i, segment) in segments.iter().enumerate() {
        for p in segment.iter().skip(1) {
            if !(p.x.is_finite() && p.y.is_finite() && p.t.is_finite()) {
                return Err(TriangulationError::evaluation(format!(
                    "{what} polygon has a non-finite point in segment {i}"
                )));
            }
            let t = p.t + i as Real;
            if let Some(prev) = polygon.last().map(|q: &BoundaryParametricPoint| q.t) {
                if t < prev {
                    return Err(TriangulationError::NonMonotonicParametricTime {
                        index: polygon.len(),
                        previous: prev,
                        current: t,
                    });
                }
            }
            polygon.push(BoundaryParametricPoint {
                x: p.x,
                y: p.y,
                t,
                is_inner: false,
            });
        }
    }
    trace!(what, points = polygon.len(), "polygon initialized");
    Ok(polygon)
}
