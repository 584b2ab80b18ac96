// Copyright 2025 Lars Brubaker
// License: SGI Free Software License B (MIT-compatible)

use std::collections::BTreeSet;

use tracing::debug;

use super::{
    BoundaryParametricPoint, BoundingBox, NormalizedPolygon, Point, VertexIndex, VertexOrigin,
};
use crate::error::{TriangulationError, TriangulationResult};
use crate::geom::Real;
use crate::tess::{PrimitiveKind, TessellationSink, Tessellator, WindingRule};

/// Triangulated overlap of the shape and the feather.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct InternalPolygon {
    pub vertices: Vec<Point>,
    pub fans: Vec<Vec<usize>>,
    pub triangles: Vec<Vec<usize>>,
    pub strips: Vec<Vec<usize>>,
}

struct OverlapSink<'a> {
    shape: &'a mut NormalizedPolygon,
    feather: &'a mut NormalizedPolygon,
    bezier_polygon: &'a mut [BoundaryParametricPoint],
    feather_polygon: &'a mut [BoundaryParametricPoint],
    bbox: &'a BoundingBox,
    generated: Vec<Point>,
    out_of_bounds: Option<Point>,
    seen: BTreeSet<VertexIndex>,
    primitives: Vec<(PrimitiveKind, Vec<VertexIndex>)>,
}

impl OverlapSink<'_> {
    fn position(&self, index: VertexIndex) -> Point {
        let normalized = |p: &NormalizedPolygon| -> Option<Point> {
            p.vertices
                .get(index.point_index)
                .map(|v| Point { x: v.point.x, y: v.point.y })
        };
        let found = match index.origin {
            VertexOrigin::InternalShape => normalized(&*self.shape),
            VertexOrigin::Feather => normalized(&*self.feather),
            VertexOrigin::Generated => self.generated.get(index.point_index).copied(),
        };
        found.unwrap_or_default()
    }

    fn mark_inner(&mut self, index: VertexIndex) {
        let (normalized, originals) = match index.origin {
            VertexOrigin::InternalShape => (&mut *self.shape, &mut *self.bezier_polygon),
            VertexOrigin::Feather => (&mut *self.feather, &mut *self.feather_polygon),
            VertexOrigin::Generated => return,
        };
        if let Some(v) = normalized.vertices.get_mut(index.point_index) {
            v.point.is_inner = true;
            if let Some(p) = v.original.and_then(|i| originals.get_mut(i)) {
                p.is_inner = true;
            }
        }
    }
}

impl TessellationSink<VertexIndex> for OverlapSink<'_> {
    fn begin_primitive(&mut self, kind: PrimitiveKind) {
        self.primitives.push((kind, Vec::new()));
    }

    fn end_primitive(&mut self) {}

    fn vertex(&mut self, index: VertexIndex) {
        if self.seen.insert(index) {
            self.mark_inner(index);
        }
        if let Some((_, prim)) = self.primitives.last_mut() {
            prim.push(index);
        }
    }

    fn combine(&mut self, coords: [Real; 2], _sources: &[(VertexIndex, Real)]) -> VertexIndex {
        let p = Point { x: coords[0], y: coords[1] };
        if self.out_of_bounds.is_none() && !self.bbox.contains(p.x, p.y, self.bbox.tolerance()) {
            self.out_of_bounds = Some(p);
        }
        self.generated.push(p);
        VertexIndex::new(VertexOrigin::Generated, self.generated.len() - 1)
    }
}

/// Triangulates the area covered by both normalized polygons.
///
/// Every point of the result is flagged `is_inner`, both on the normalized
/// polygon and on the polygon point it came from. Output indices are
/// positions in the ordered set of emitted vertices.
pub fn compute_internal_polygon(
    mut shape: NormalizedPolygon,
    mut feather: NormalizedPolygon,
    bezier_polygon: &mut [BoundaryParametricPoint],
    feather_polygon: &mut [BoundaryParametricPoint],
    clockwise: bool,
    bbox: &BoundingBox,
    max_vertices: Option<usize>,
) -> TriangulationResult<InternalPolygon> {
    let mut tess = Tessellator::new();
    tess.set_winding_rule(WindingRule::AbsGeqTwo);
    tess.set_normal(if clockwise { -1.0 } else { 1.0 });
    tess.set_max_vertices(max_vertices);
    for (origin, polygon) in [(VertexOrigin::InternalShape, &shape), (VertexOrigin::Feather, &feather)] {
        for contour in &polygon.contours {
            let points = contour.iter().filter_map(|&i| {
                let v = polygon.vertices.get(i)?;
                Some(([v.point.x, v.point.y], VertexIndex::new(origin, i)))
            });
            tess.add_contour(points)?;
        }
    }

    let mut sink = OverlapSink {
        shape: &mut shape,
        feather: &mut feather,
        bezier_polygon,
        feather_polygon,
        bbox,
        generated: Vec::new(),
        out_of_bounds: None,
        seen: BTreeSet::new(),
        primitives: Vec::new(),
    };
    tess.tessellate(&mut sink)?;
    if let Some(p) = sink.out_of_bounds {
        return Err(TriangulationError::GeneratedPointOutOfBounds { x: p.x, y: p.y });
    }

    let order: Vec<VertexIndex> = sink.seen.iter().copied().collect();
    let vertices: Vec<Point> = order.iter().map(|&i| sink.position(i)).collect();
    let mut out = InternalPolygon {
        vertices,
        ..InternalPolygon::default()
    };
    for (kind, prim) in &sink.primitives {
        // Every emitted vertex is in the set, so the search always hits.
        let indices: Vec<usize> = prim
            .iter()
            .filter_map(|i| order.binary_search(i).ok())
            .collect();
        match kind {
            PrimitiveKind::TriangleFan => out.fans.push(indices),
            PrimitiveKind::TriangleStrip => out.strips.push(indices),
            PrimitiveKind::Triangles => out.triangles.push(indices),
            PrimitiveKind::LineLoop => {
                return Err(TriangulationError::contour_inconsistency(
                    "unexpected line loop in interior triangulation",
                ))
            }
        }
    }

    debug!(
        vertices = out.vertices.len(),
        generated = sink.generated.len(),
        fans = out.fans.len(),
        triangles = out.triangles.len(),
        strips = out.strips.len(),
        "internal polygon computed"
    );
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::roto::ensure_polygon_winding_number_equals_one;

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

    fn triangle_area(out: &InternalPolygon) -> Real {
        let area = |a: usize, b: usize, c: usize| {
            let (p, q, r) = (out.vertices[a], out.vertices[b], out.vertices[c]);
            ((q.x - p.x) * (r.y - p.y) - (r.x - p.x) * (q.y - p.y)).abs() / 2.0
        };
        let mut total = 0.0;
        for t in &out.triangles {
            for tri in t.chunks_exact(3) {
                total += area(tri[0], tri[1], tri[2]);
            }
        }
        for f in &out.fans {
            for k in 1..f.len().saturating_sub(1) {
                total += area(f[0], f[k], f[k + 1]);
            }
        }
        for s in &out.strips {
            for w in s.windows(3) {
                total += area(w[0], w[1], w[2]);
            }
        }
        total
    }

    fn run(
        shape: &mut [BoundaryParametricPoint],
        feather: &mut [BoundaryParametricPoint],
    ) -> InternalPolygon {
        let mut bbox = BoundingBox::EMPTY;
        for p in shape.iter().chain(feather.iter()) {
            bbox.add(p.x, p.y);
        }
        let ns = ensure_polygon_winding_number_equals_one(shape, false, &bbox, None).unwrap();
        let nf = ensure_polygon_winding_number_equals_one(feather, false, &bbox, None).unwrap();
        compute_internal_polygon(ns, nf, shape, feather, false, &bbox, None).unwrap()
    }

    #[test]
    fn shape_inside_feather_is_fully_inner() {
        let mut shape = polygon(&[(1.0, 1.0), (3.0, 1.0), (3.0, 3.0), (1.0, 3.0)]);
        let mut feather = polygon(&[(0.0, 0.0), (4.0, 0.0), (4.0, 4.0), (0.0, 4.0)]);
        let out = run(&mut shape, &mut feather);

        assert!(shape.iter().all(|p| p.is_inner));
        assert!(feather.iter().all(|p| !p.is_inner));
        assert_eq!(out.vertices.len(), 4);
        assert!((triangle_area(&out) - 4.0).abs() < 1e-9);
    }

    #[test]
    fn overlapping_squares_generate_crossings() {
        let mut shape = polygon(&[(0.0, 0.0), (2.0, 0.0), (2.0, 2.0), (0.0, 2.0)]);
        let mut feather = polygon(&[(1.0, 1.0), (3.0, 1.0), (3.0, 3.0), (1.0, 3.0)]);
        let out = run(&mut shape, &mut feather);

        // (2,2) from the shape, (1,1) from the feather and two crossings.
        assert_eq!(out.vertices.len(), 4);
        assert!((triangle_area(&out) - 1.0).abs() < 1e-9);
        assert_eq!(shape.iter().filter(|p| p.is_inner).count(), 1);
        assert_eq!(feather.iter().filter(|p| p.is_inner).count(), 1);
        for list in out.fans.iter().chain(&out.triangles).chain(&out.strips) {
            assert!(list.iter().all(|&i| i < out.vertices.len()));
        }
    }

    #[test]
    fn disjoint_polygons_have_no_interior() {
        let mut shape = polygon(&[(0.0, 0.0), (1.0, 0.0), (1.0, 1.0), (0.0, 1.0)]);
        let mut feather = polygon(&[(5.0, 5.0), (6.0, 5.0), (6.0, 6.0), (5.0, 6.0)]);
        let out = run(&mut shape, &mut feather);
        assert!(out.vertices.is_empty());
        assert!(shape.iter().chain(feather.iter()).all(|p| !p.is_inner));
    }
}
