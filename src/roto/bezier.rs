// Copyright 2025 Lars Brubaker
// License: SGI Free Software License B (MIT-compatible)
//
// Bezier shapes and their discretization.
//
// A shape is a closed chain of cubic segments. Evaluation returns one point
// list per segment, each running from parametric time 0 to 1 and sharing
// its first point with the previous segment's last one.

use serde::{Deserialize, Serialize};

use super::{ParametricPoint, RenderScale, ViewIdx};
use crate::error::{TriangulationError, TriangulationResult};
use crate::geom::Real;
use crate::settings::{DeCasteljauAlgorithm, TriangulationSettings};

const MAX_RECURSION_DEPTH: u32 = 32;

/// Source of the two polygons a roto shape is triangulated from.
pub trait RotoShape {
    /// The shape outline, one point list per segment.
    fn evaluate_at_time(
        &self,
        time: Real,
        view: ViewIdx,
        scale: RenderScale,
        settings: &TriangulationSettings,
    ) -> TriangulationResult<Vec<Vec<ParametricPoint>>>;

    /// The feather outline, with the same segment count as the shape.
    fn evaluate_feather_points_at_time(
        &self,
        time: Real,
        view: ViewIdx,
        scale: RenderScale,
        settings: &TriangulationSettings,
    ) -> TriangulationResult<Vec<Vec<ParametricPoint>>>;

    fn is_clockwise_oriented(&self, time: Real, view: ViewIdx) -> bool;
}

/// A control point with absolute tangent positions.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ControlPoint {
    pub x: Real,
    pub y: Real,
    pub left: [Real; 2],
    pub right: [Real; 2],
}

impl ControlPoint {
    /// A corner: both tangents sit on the point.
    pub fn new(x: Real, y: Real) -> Self {
        Self {
            x,
            y,
            left: [x, y],
            right: [x, y],
        }
    }

    pub fn with_tangents(x: Real, y: Real, left: [Real; 2], right: [Real; 2]) -> Self {
        Self { x, y, left, right }
    }
}

type CubicSegment = [[Real; 2]; 4];

/// A closed, non-animated cubic Bezier with an optional distinct feather.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct CubicBezierShape {
    points: Vec<ControlPoint>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    feather: Vec<ControlPoint>,
    #[serde(default)]
    feather_distance: Real,
}

impl CubicBezierShape {
    pub fn new(points: Vec<ControlPoint>) -> Self {
        Self {
            points,
            feather: Vec::new(),
            feather_distance: 0.0,
        }
    }

    /// Polygon through the given corners.
    pub fn polygon(corners: &[[Real; 2]]) -> Self {
        Self::new(corners.iter().map(|c| ControlPoint::new(c[0], c[1])).collect())
    }

    pub fn with_feather_points(mut self, feather: Vec<ControlPoint>) -> Self {
        self.feather = feather;
        self
    }

    /// Pushes the feather outwards by `distance` (inwards when negative).
    pub fn with_feather_distance(mut self, distance: Real) -> Self {
        self.feather_distance = distance;
        self
    }

    pub fn points(&self) -> &[ControlPoint] {
        &self.points
    }

    pub fn feather_points(&self) -> &[ControlPoint] {
        if self.feather.is_empty() {
            &self.points
        } else {
            &self.feather
        }
    }

    /// Positive for counter-clockwise control polygons.
    pub fn signed_area(&self) -> Real {
        let n = self.points.len();
        if n < 3 {
            return 0.0;
        }
        let p0 = self.points[0];
        let mut area = 0.0;
        for w in self.points[1..].windows(2) {
            let (a, b) = (w[0], w[1]);
            area += (a.x - p0.x) * (b.y - p0.y) - (b.x - p0.x) * (a.y - p0.y);
        }
        area * 0.5
    }
}

fn segments(points: &[ControlPoint], scale: RenderScale) -> Vec<CubicSegment> {
    let n = points.len();
    if n < 2 {
        return Vec::new();
    }
    let s = |p: [Real; 2]| [p[0] * scale.x, p[1] * scale.y];
    (0..n)
        .map(|i| {
            let a = points[i];
            let b = points[(i + 1) % n];
            [s([a.x, a.y]), s(a.right), s(b.left), s([b.x, b.y])]
        })
        .collect()
}

fn bezier_point(seg: &CubicSegment, t: Real) -> [Real; 2] {
    let u = 1.0 - t;
    let b0 = u * u * u;
    let b1 = 3.0 * u * u * t;
    let b2 = 3.0 * u * t * t;
    let b3 = t * t * t;
    [
        b0 * seg[0][0] + b1 * seg[1][0] + b2 * seg[2][0] + b3 * seg[3][0],
        b0 * seg[0][1] + b1 * seg[1][1] + b2 * seg[2][1] + b3 * seg[3][1],
    ]
}

fn dist(a: [Real; 2], b: [Real; 2]) -> Real {
    ((b[0] - a[0]).powi(2) + (b[1] - a[1]).powi(2)).sqrt()
}

fn split(seg: &CubicSegment) -> (CubicSegment, CubicSegment) {
    let mid = |a: [Real; 2], b: [Real; 2]| [(a[0] + b[0]) * 0.5, (a[1] + b[1]) * 0.5];
    let p01 = mid(seg[0], seg[1]);
    let p12 = mid(seg[1], seg[2]);
    let p23 = mid(seg[2], seg[3]);
    let p012 = mid(p01, p12);
    let p123 = mid(p12, p23);
    let p = mid(p012, p123);
    ([seg[0], p01, p012, p], [p, p123, p23, seg[3]])
}

/// Largest distance of the inner control points from the chord.
fn flatness(seg: &CubicSegment) -> Real {
    let (a, d) = (seg[0], seg[3]);
    let len = dist(a, d);
    let off = |p: [Real; 2]| {
        if len == 0.0 {
            dist(a, p)
        } else {
            ((d[0] - a[0]) * (a[1] - p[1]) - (a[0] - p[0]) * (d[1] - a[1])).abs() / len
        }
    };
    off(seg[1]).max(off(seg[2]))
}

/// Points an outline may still take. The shared first point of each
/// segment is not counted, as in `initialize_polygon`.
struct PointBudget {
    limit: usize,
    used: usize,
}

impl PointBudget {
    fn take(&mut self, count: usize) -> TriangulationResult<()> {
        let total = self.used.saturating_add(count);
        if total > self.limit {
            return Err(TriangulationError::BudgetExceeded {
                count: total,
                limit: self.limit,
            });
        }
        self.used = total;
        Ok(())
    }
}

fn subdivide(
    seg: &CubicSegment,
    t0: Real,
    t1: Real,
    depth: u32,
    tolerance: Real,
    budget: &mut PointBudget,
    out: &mut Vec<ParametricPoint>,
) -> TriangulationResult<()> {
    if depth >= MAX_RECURSION_DEPTH || flatness(seg) <= tolerance {
        budget.take(1)?;
        out.push(ParametricPoint::new(seg[3][0], seg[3][1], t1));
        return Ok(());
    }
    let tm = (t0 + t1) * 0.5;
    let (left, right) = split(seg);
    subdivide(&left, t0, tm, depth + 1, tolerance, budget, out)?;
    subdivide(&right, tm, t1, depth + 1, tolerance, budget, out)
}

/// Sample count of one segment for the iterative algorithm.
fn iterative_count(seg: &CubicSegment, settings: &TriangulationSettings) -> TriangulationResult<usize> {
    let n = match settings.points_per_segment {
        Some(n) => n,
        None => {
            let length = dist(seg[0], seg[1]) + dist(seg[1], seg[2]) + dist(seg[2], seg[3]);
            let n = length * 0.25;
            if !n.is_finite() {
                return Err(TriangulationError::evaluation(format!(
                    "segment length {length} is not finite"
                )));
            }
            // Saturates for lengths beyond usize; the budget rejects those.
            n as usize
        }
    };
    Ok(n.max(2))
}

fn sample(seg: &CubicSegment, n: usize) -> Vec<ParametricPoint> {
    (0..n)
        .map(|i| {
            let t = i as Real / (n - 1) as Real;
            let p = bezier_point(seg, t);
            ParametricPoint::new(p[0], p[1], t)
        })
        .collect()
}

/// Discretizes every segment. Point counts are checked against the
/// polygon budget before anything is allocated.
fn evaluate(
    points: &[ControlPoint],
    scale: RenderScale,
    settings: &TriangulationSettings,
) -> TriangulationResult<Vec<Vec<ParametricPoint>>> {
    let segments = segments(points, scale);
    if segments.iter().flatten().flatten().any(|c| !c.is_finite()) {
        return Err(TriangulationError::evaluation("non-finite control point"));
    }
    let mut budget = PointBudget {
        limit: settings.polygon_point_limit(),
        used: 0,
    };
    match settings.algorithm {
        DeCasteljauAlgorithm::Iterative => {
            let counts = segments
                .iter()
                .map(|seg| iterative_count(seg, settings))
                .collect::<TriangulationResult<Vec<usize>>>()?;
            budget.take(counts.iter().fold(0usize, |sum, n| sum.saturating_add(n - 1)))?;
            Ok(segments.iter().zip(counts).map(|(seg, n)| sample(seg, n)).collect())
        }
        DeCasteljauAlgorithm::Recursive => {
            let tolerance = 0.5 / settings.error_scale;
            segments
                .iter()
                .map(|seg| -> TriangulationResult<Vec<ParametricPoint>> {
                    let mut out = vec![ParametricPoint::new(seg[0][0], seg[0][1], 0.0)];
                    subdivide(seg, 0.0, 1.0, 0, tolerance, &mut budget, &mut out)?;
                    Ok(out)
                })
                .collect()
        }
    }
}

/// Moves every point along the polygon normal, outwards for the given
/// orientation. Per-axis distances let anisotropic render scales through.
pub fn offset_along_normals(polygon: &mut [Vec<ParametricPoint>], dist_x: Real, dist_y: Real, clockwise: bool) {
    let slots: Vec<(usize, usize)> = polygon
        .iter()
        .enumerate()
        .flat_map(|(i, seg)| (1..seg.len()).map(move |j| (i, j)))
        .collect();
    let m = slots.len();
    if m < 3 || (dist_x == 0.0 && dist_y == 0.0) {
        return;
    }
    let coords: Vec<[Real; 2]> = slots.iter().map(|&(i, j)| [polygon[i][j].x, polygon[i][j].y]).collect();
    let sign = if clockwise { 1.0 } else { -1.0 };

    for (k, &(i, j)) in slots.iter().enumerate() {
        let prev = coords[(k + m - 1) % m];
        let next = coords[(k + 1) % m];
        let dx = next[0] - prev[0];
        let dy = next[1] - prev[1];
        let norm = (dx * dx + dy * dy).sqrt();
        if norm == 0.0 {
            continue;
        }
        let p = &mut polygon[i][j];
        p.x += sign * (-dy / norm) * dist_x;
        p.y += sign * (dx / norm) * dist_y;
    }

    let n = polygon.len();
    for i in 0..n {
        let prev = (i + n - 1) % n;
        if let Some(&last) = polygon[prev].last() {
            if let Some(first) = polygon[i].first_mut() {
                first.x = last.x;
                first.y = last.y;
            }
        }
    }
}

impl RotoShape for CubicBezierShape {
    fn evaluate_at_time(
        &self,
        _time: Real,
        _view: ViewIdx,
        scale: RenderScale,
        settings: &TriangulationSettings,
    ) -> TriangulationResult<Vec<Vec<ParametricPoint>>> {
        evaluate(&self.points, scale, settings)
    }

    fn evaluate_feather_points_at_time(
        &self,
        time: Real,
        view: ViewIdx,
        scale: RenderScale,
        settings: &TriangulationSettings,
    ) -> TriangulationResult<Vec<Vec<ParametricPoint>>> {
        let mut polygon = evaluate(self.feather_points(), scale, settings)?;
        let clockwise = self.is_clockwise_oriented(time, view);
        offset_along_normals(
            &mut polygon,
            self.feather_distance * scale.x,
            self.feather_distance * scale.y,
            clockwise,
        );
        Ok(polygon)
    }

    fn is_clockwise_oriented(&self, _time: Real, _view: ViewIdx) -> bool {
        self.signed_area() < 0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::DEFAULT_MAX_POLYGON_POINTS;

    const SQUARE: [[Real; 2]; 4] = [[0.0, 0.0], [10.0, 0.0], [10.0, 10.0], [0.0, 10.0]];

    fn fixed(n: usize) -> TriangulationSettings {
        TriangulationSettings {
            points_per_segment: Some(n),
            ..TriangulationSettings::default()
        }
    }

    #[test]
    fn iterative_segments_share_endpoints() {
        let shape = CubicBezierShape::polygon(&SQUARE);
        let segs = shape
            .evaluate_at_time(0.0, ViewIdx(0), RenderScale::default(), &fixed(5))
            .unwrap();
        assert_eq!(segs.len(), 4);
        for (i, seg) in segs.iter().enumerate() {
            assert_eq!(seg.len(), 5);
            assert_eq!(seg[0].t, 0.0);
            assert_eq!(seg[4].t, 1.0);
            let next = &segs[(i + 1) % 4];
            assert!((seg[4].x - next[0].x).abs() < 1e-12);
            assert!((seg[4].y - next[0].y).abs() < 1e-12);
        }
    }

    #[test]
    fn render_scale_scales_coordinates() {
        let shape = CubicBezierShape::polygon(&SQUARE);
        let scale = RenderScale { x: 0.5, y: 0.25 };
        let segs = shape.evaluate_at_time(0.0, ViewIdx(0), scale, &fixed(2)).unwrap();
        assert_eq!((segs[1][0].x, segs[1][0].y), (5.0, 0.0));
        assert_eq!((segs[2][0].x, segs[2][0].y), (5.0, 2.5));
    }

    #[test]
    fn recursive_algorithm_refines_curves_only() {
        let settings = TriangulationSettings {
            algorithm: DeCasteljauAlgorithm::Recursive,
            ..TriangulationSettings::default()
        };
        let square = CubicBezierShape::polygon(&SQUARE);
        let segs = square
            .evaluate_at_time(0.0, ViewIdx(0), RenderScale::default(), &settings)
            .unwrap();
        assert!(segs.iter().all(|s| s.len() == 2));

        let round = CubicBezierShape::new(vec![
            ControlPoint::with_tangents(0.0, 0.0, [-5.0, 5.0], [5.0, -5.0]),
            ControlPoint::with_tangents(20.0, 0.0, [15.0, -5.0], [25.0, 5.0]),
        ]);
        let segs = round
            .evaluate_at_time(0.0, ViewIdx(0), RenderScale::default(), &settings)
            .unwrap();
        assert!(segs[0].len() > 4);
        assert!(segs[0].windows(2).all(|w| w[0].t < w[1].t));
    }

    #[test]
    fn orientation_follows_signed_area() {
        let ccw = CubicBezierShape::polygon(&SQUARE);
        assert!(!ccw.is_clockwise_oriented(0.0, ViewIdx(0)));
        let mut rev = SQUARE;
        rev.reverse();
        assert!(CubicBezierShape::polygon(&rev).is_clockwise_oriented(0.0, ViewIdx(0)));
    }

    #[test]
    fn feather_moves_outwards_for_both_orientations() {
        let mut rev = SQUARE;
        rev.reverse();
        for corners in [SQUARE, rev] {
            let shape = CubicBezierShape::polygon(&corners).with_feather_distance(2.0);
            let feather = shape
                .evaluate_feather_points_at_time(0.0, ViewIdx(0), RenderScale::default(), &fixed(3))
                .unwrap();
            // Edge midpoints are pushed straight out of the square.
            for seg in &feather {
                let mid = seg[1];
                let outside = mid.x < 0.0 || mid.x > 10.0 || mid.y < 0.0 || mid.y > 10.0;
                assert!(outside, "{mid:?} is not outside the square");
            }
        }
    }

    #[test]
    fn huge_segments_hit_the_point_budget_before_sampling() {
        let side = 1e18;
        let shape = CubicBezierShape::polygon(&[[0.0, 0.0], [side, 0.0], [side, side], [0.0, side]]);
        let settings = TriangulationSettings {
            max_polygon_points: Some(1000),
            ..TriangulationSettings::default()
        };
        let err = shape
            .evaluate_at_time(0.0, ViewIdx(0), RenderScale::default(), &settings)
            .unwrap_err();
        assert!(matches!(err, TriangulationError::BudgetExceeded { limit: 1000, .. }), "{err:?}");

        // Without an explicit budget the default cap applies.
        let err = shape
            .evaluate_at_time(0.0, ViewIdx(0), RenderScale::default(), &TriangulationSettings::default())
            .unwrap_err();
        assert!(
            matches!(err, TriangulationError::BudgetExceeded { limit, .. } if limit == DEFAULT_MAX_POLYGON_POINTS),
            "{err:?}"
        );
    }

    #[test]
    fn recursive_subdivision_stops_at_the_point_budget() {
        let r = 1e12;
        let k = 0.552_284_749_8 * r;
        let circle = CubicBezierShape::new(vec![
            ControlPoint::with_tangents(r, 0.0, [r, -k], [r, k]),
            ControlPoint::with_tangents(0.0, r, [k, r], [-k, r]),
            ControlPoint::with_tangents(-r, 0.0, [-r, k], [-r, -k]),
            ControlPoint::with_tangents(0.0, -r, [-k, -r], [k, -r]),
        ]);
        let settings = TriangulationSettings {
            algorithm: DeCasteljauAlgorithm::Recursive,
            max_polygon_points: Some(1000),
            ..TriangulationSettings::default()
        };
        let err = circle
            .evaluate_at_time(0.0, ViewIdx(0), RenderScale::default(), &settings)
            .unwrap_err();
        assert_eq!(err, TriangulationError::BudgetExceeded { count: 1001, limit: 1000 });
    }

    #[test]
    fn overflowing_segment_length_fails_evaluation() {
        let shape = CubicBezierShape::polygon(&[[-1e308, 0.0], [1e308, 0.0], [0.0, 1e308]]);
        let err = shape
            .evaluate_at_time(0.0, ViewIdx(0), RenderScale::default(), &TriangulationSettings::default())
            .unwrap_err();
        assert!(matches!(err, TriangulationError::Evaluation(_)), "{err:?}");
    }

    #[test]
    fn non_finite_points_fail_evaluation() {
        let shape = CubicBezierShape::polygon(&[[0.0, 0.0], [Real::NAN, 1.0], [1.0, 1.0]]);
        let err = shape
            .evaluate_at_time(0.0, ViewIdx(0), RenderScale::default(), &fixed(2))
            .unwrap_err();
        assert!(matches!(err, TriangulationError::Evaluation(_)));
    }
}
