// Copyright 2025 Lars Brubaker
// License: SGI Free Software License B (MIT-compatible)
//
// Winding normalization.
//
// A hand drawn outline may cross itself. Tessellating it boundary-only with
// the Positive rule leaves the outline(s) of the positively wound area, in
// which every point has winding number one. Crossings become new points
// carrying the parameter of both edges they lie on.

use std::collections::BTreeSet;

use tracing::{debug, warn};

use super::{BoundaryParametricPoint, BoundingBox, ContourBezierVertex};
use crate::error::{TriangulationError, TriangulationResult};
use crate::geom::Real;
use crate::tess::{PrimitiveKind, TessellationSink, Tessellator, WindingRule};

/// Outline of a polygon with winding number one.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct NormalizedPolygon {
    /// Points on the outline, sorted by `t`.
    pub vertices: Vec<ContourBezierVertex>,
    /// Closed loops of indices into `vertices`.
    pub contours: Vec<Vec<usize>>,
}

/// Tokens below `polygon.len()` are polygon points, the rest index
/// `generated`.
struct OutlineSink<'a> {
    polygon: &'a [BoundaryParametricPoint],
    span: Real,
    generated: Vec<ContourBezierVertex>,
    contours: Vec<Vec<usize>>,
}

impl OutlineSink<'_> {
    fn param(&self, token: usize) -> Real {
        match self.polygon.get(token) {
            Some(p) => p.t,
            None => self
                .generated
                .get(token - self.polygon.len())
                .map_or(0.0, |v| v.point.t),
        }
    }

    /// Weighted parameter of one edge or of a group of coincident points.
    /// The closing edge runs from the last point (t = span, same as 0) to
    /// the first one, so a pair straddling that edge is unwrapped first.
    /// The pair is recognized by its tokens, or by a gap of more than half
    /// the span once earlier crossings have split the edge.
    fn weighted(&self, sources: &[(usize, Real)]) -> Real {
        let mut ts: Vec<Real> = sources.iter().map(|&(tok, _)| self.param(tok)).collect();
        let last = self.polygon.len().saturating_sub(1);
        if let ([(ta, _), (tb, _)], [a, b]) = (sources, ts.as_mut_slice()) {
            let closing = last > 0 && ((*ta, *tb) == (last, 0) || (*ta, *tb) == (0, last));
            if closing || (*a - *b).abs() > self.span * 0.5 {
                if *a > *b {
                    *a -= self.span;
                } else {
                    *b -= self.span;
                }
            }
        }
        let total: Real = sources.iter().map(|s| s.1).sum();
        if total > 0.0 {
            sources.iter().zip(&ts).map(|(s, t)| s.1 * t).sum::<Real>() / total
        } else {
            ts.iter().sum::<Real>() / ts.len().max(1) as Real
        }
    }
}

impl TessellationSink<usize> for OutlineSink<'_> {
    fn begin_primitive(&mut self, _kind: PrimitiveKind) {
        self.contours.push(Vec::new());
    }

    fn end_primitive(&mut self) {}

    fn vertex(&mut self, token: usize) {
        if let Some(contour) = self.contours.last_mut() {
            contour.push(token);
        }
    }

    fn combine(&mut self, coords: [Real; 2], sources: &[(usize, Real)]) -> usize {
        let (t, t2) = if sources.len() == 4 {
            (self.weighted(&sources[..2]), Some(self.weighted(&sources[2..])))
        } else {
            (self.weighted(sources), None)
        };
        self.generated.push(ContourBezierVertex {
            point: BoundaryParametricPoint {
                x: coords[0],
                y: coords[1],
                t,
                is_inner: false,
            },
            t2,
            is_intersection_point: t2.is_some(),
            original: None,
        });
        self.polygon.len() + self.generated.len() - 1
    }
}

/// Reduces `polygon` to the outline of its positively wound area.
pub fn ensure_polygon_winding_number_equals_one(
    polygon: &[BoundaryParametricPoint],
    clockwise: bool,
    bbox: &BoundingBox,
    max_vertices: Option<usize>,
) -> TriangulationResult<NormalizedPolygon> {
    let mut tess = Tessellator::new();
    tess.set_winding_rule(WindingRule::Positive);
    tess.set_boundary_only(true);
    tess.set_normal(if clockwise { -1.0 } else { 1.0 });
    tess.set_max_vertices(max_vertices);
    tess.add_contour(polygon.iter().enumerate().map(|(i, p)| ([p.x, p.y], i)))?;

    let mut sink = OutlineSink {
        polygon,
        span: polygon.last().map_or(0.0, |p| p.t),
        generated: Vec::new(),
        contours: Vec::new(),
    };
    tess.tessellate(&mut sink)?;

    let eps = bbox.tolerance();
    for v in &sink.generated {
        if !bbox.contains(v.point.x, v.point.y, eps) {
            return Err(TriangulationError::GeneratedPointOutOfBounds {
                x: v.point.x,
                y: v.point.y,
            });
        }
    }

    let loops: Vec<&Vec<usize>> = sink.contours.iter().filter(|c| c.len() >= 3).collect();

    // Only points on an outline survive; renumber them in parameter order.
    let used: BTreeSet<usize> = loops.iter().flat_map(|c| c.iter()).copied().collect();
    let mut order: Vec<usize> = used.into_iter().collect();
    order.sort_by(|&a, &b| sink.param(a).total_cmp(&sink.param(b)).then(a.cmp(&b)));

    let n = polygon.len();
    let mut new_index = vec![usize::MAX; n + sink.generated.len()];
    let mut vertices = Vec::with_capacity(order.len());
    for (i, &tok) in order.iter().enumerate() {
        new_index[tok] = i;
        let vertex = match polygon.get(tok) {
            Some(p) => ContourBezierVertex {
                point: BoundaryParametricPoint { is_inner: false, ..*p },
                t2: None,
                is_intersection_point: false,
                original: Some(tok),
            },
            None => sink.generated[tok - n],
        };
        vertices.push(vertex);
    }

    let contours: Vec<Vec<usize>> = loops
        .iter()
        .map(|c| c.iter().map(|&tok| new_index[tok]).collect())
        .collect();

    let dropped = sink.contours.len() - contours.len();
    if dropped > 0 {
        warn!(dropped, "degenerate outline contours dropped");
    }
    if contours.is_empty() {
        warn!(points = n, "polygon has no positively wound area");
    }
    debug!(
        points = n,
        generated = sink.generated.len(),
        kept = vertices.len(),
        contours = contours.len(),
        "winding normalized"
    );
    Ok(NormalizedPolygon { vertices, contours })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn polygon(points: &[(Real, Real)]) -> Vec<BoundaryParametricPoint> {
        points
            .iter()
            .enumerate()
            .map(|(i, &(x, y))| BoundaryParametricPoint {
                x,
                y,
                t: (i + 1) as Real,
                is_inner: false,
            })
            .collect()
    }

    fn bbox_of(poly: &[BoundaryParametricPoint]) -> BoundingBox {
        let mut b = BoundingBox::EMPTY;
        for p in poly {
            b.add(p.x, p.y);
        }
        b
    }

    fn is_rotation_of_identity(contour: &[usize], n: usize) -> bool {
        contour.len() == n && (0..n).all(|k| contour[(k + 1) % n] == (contour[k] + 1) % n)
    }

    fn assert_unchanged(poly: &[BoundaryParametricPoint], clockwise: bool) {
        let out = ensure_polygon_winding_number_equals_one(poly, clockwise, &bbox_of(poly), None).unwrap();
        assert_eq!(out.vertices.len(), poly.len());
        for (i, v) in out.vertices.iter().enumerate() {
            assert_eq!(v.original, Some(i));
            assert_eq!(v.point, poly[i]);
        }
        assert_eq!(out.contours.len(), 1);
        assert!(is_rotation_of_identity(&out.contours[0], poly.len()), "{:?}", out.contours);
    }

    #[test]
    fn simple_convex_polygon_is_unchanged() {
        assert_unchanged(&polygon(&[(0.0, 0.0), (4.0, 0.0), (4.0, 4.0), (0.0, 4.0)]), false);
    }

    #[test]
    fn simple_concave_polygon_is_unchanged() {
        let l_shape = polygon(&[(0.0, 0.0), (4.0, 0.0), (4.0, 1.0), (1.0, 1.0), (1.0, 4.0), (0.0, 4.0)]);
        assert_unchanged(&l_shape, false);
    }

    #[test]
    fn clockwise_polygon_with_clockwise_normal_is_unchanged() {
        let l_shape = polygon(&[(0.0, 4.0), (1.0, 4.0), (1.0, 1.0), (4.0, 1.0), (4.0, 0.0), (0.0, 0.0)]);
        assert_unchanged(&l_shape, true);
    }

    #[test]
    fn bow_tie_keeps_the_positive_lobe() {
        let poly = polygon(&[(0.0, 0.0), (2.0, 2.0), (2.0, 0.0), (0.0, 2.0)]);
        let out = ensure_polygon_winding_number_equals_one(&poly, false, &bbox_of(&poly), None).unwrap();

        assert_eq!(out.contours.len(), 1);
        assert_eq!(out.contours[0].len(), 3);
        assert_eq!(out.vertices.len(), 3);
        assert!(out.vertices.windows(2).all(|w| w[0].point.t <= w[1].point.t));

        let originals: Vec<_> = out.vertices.iter().filter_map(|v| v.original).collect();
        assert_eq!(originals, vec![0, 3]);

        let crossing = out.vertices.iter().find(|v| v.is_intersection_point).unwrap();
        assert!((crossing.point.x - 1.0).abs() < 1e-12 && (crossing.point.y - 1.0).abs() < 1e-12);
        let mut ts = [crossing.point.t, crossing.t2.unwrap()];
        ts.sort_by(|a, b| a.total_cmp(b));
        assert!((ts[0] - 1.5).abs() < 1e-9 && (ts[1] - 3.5).abs() < 1e-9, "{ts:?}");
    }

    fn crossing_params(poly: &[BoundaryParametricPoint]) -> [Real; 2] {
        let out = ensure_polygon_winding_number_equals_one(poly, false, &bbox_of(poly), None).unwrap();
        let crossing = out.vertices.iter().find(|v| v.is_intersection_point).unwrap();
        assert!((crossing.point.x - 1.0).abs() < 1e-12 && (crossing.point.y - 1.0).abs() < 1e-12);
        let mut ts = [crossing.point.t, crossing.t2.unwrap()];
        ts.sort_by(|a, b| a.total_cmp(b));
        ts
    }

    #[test]
    fn crossing_on_the_closing_edge_precedes_the_first_point() {
        // The edge from (2, 2) back to (0, 0) crosses (2, 0)-(0, 2).
        let poly = polygon(&[(0.0, 0.0), (2.0, 0.0), (0.0, 2.0), (2.0, 2.0)]);
        let ts = crossing_params(&poly);
        assert!(ts[0] < poly[0].t, "{ts:?}");
        assert!((ts[0] - 0.5).abs() < 1e-9 && (ts[1] - 2.5).abs() < 1e-9, "{ts:?}");
    }

    #[test]
    fn closing_edge_is_unwrapped_even_when_its_gap_is_small() {
        let mut poly = polygon(&[(0.0, 0.0), (2.0, 0.0), (0.0, 2.0), (2.0, 2.0)]);
        for (p, t) in poly.iter_mut().zip([2.5, 3.0, 3.5, 4.0]) {
            p.t = t;
        }
        // The closing pair (4.0, 2.5) is less than half the span apart.
        let ts = crossing_params(&poly);
        assert!(ts[0] < poly[0].t, "{ts:?}");
        assert!((ts[0] - 1.25).abs() < 1e-9 && (ts[1] - 3.25).abs() < 1e-9, "{ts:?}");
    }

    #[test]
    fn negatively_wound_polygon_vanishes() {
        let poly = polygon(&[(0.0, 0.0), (0.0, 4.0), (4.0, 4.0), (4.0, 0.0)]);
        let out = ensure_polygon_winding_number_equals_one(&poly, false, &bbox_of(&poly), None).unwrap();
        assert!(out.contours.is_empty());
        assert!(out.vertices.is_empty());
    }
}
