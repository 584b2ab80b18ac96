// Copyright 2025 Lars Brubaker
// License: SGI Free Software License B (MIT-compatible)

use std::collections::BTreeMap;

use tracing::{debug, warn};

use super::{BoundaryParametricPoint, FeatherVertex, VertexOrigin};
use crate::error::{TriangulationError, TriangulationResult};
use crate::geom::Real;

/// One side of the feather strip, walked as `[last, 0, 1, .., last]`.
struct Side<'a> {
    points: &'a [BoundaryParametricPoint],
    origin: VertexOrigin,
    cursor: usize,
}

impl<'a> Side<'a> {
    fn new(points: &'a [BoundaryParametricPoint], origin: VertexOrigin) -> Self {
        Self {
            points,
            origin,
            cursor: 0,
        }
    }

    fn index_at(&self, cursor: usize) -> usize {
        let n = self.points.len();
        (cursor + n - 1) % n
    }

    fn current(&self) -> usize {
        self.index_at(self.cursor)
    }

    fn finished(&self) -> bool {
        self.cursor >= self.points.len()
    }

    fn next_t(&self) -> Real {
        self.points[self.index_at(self.cursor + 1)].t
    }

    fn inner_count(&self) -> usize {
        self.points.iter().filter(|p| p.is_inner).count()
    }
}

#[derive(Default)]
struct StripBuilder {
    vertices: Vec<FeatherVertex>,
    lookup: BTreeMap<(VertexOrigin, usize), usize>,
    strip: Vec<usize>,
}

impl StripBuilder {
    fn push(&mut self, side: &Side<'_>, index: usize) {
        let p = side.points[index];
        let vertices = &mut self.vertices;
        let slot = *self.lookup.entry((side.origin, index)).or_insert_with(|| {
            vertices.push(FeatherVertex {
                x: p.x,
                y: p.y,
                is_inner: p.is_inner,
            });
            vertices.len() - 1
        });
        self.strip.push(slot);
    }
}

/// Stitches the shape and feather polygons into one closed triangle strip.
///
/// Both polygons are walked together in `t` order, starting from their last
/// points so the strip closes on itself. Every step emits an outer and an
/// inner vertex. The inner side is the polygon with more `is_inner` points;
/// where neither current point is inner, the inner side falls back to its
/// last inner point so no fully transparent triangles are produced.
pub fn compute_feather_triangles(
    shape: &[BoundaryParametricPoint],
    feather: &[BoundaryParametricPoint],
) -> TriangulationResult<(Vec<FeatherVertex>, Vec<usize>)> {
    if shape.is_empty() || feather.is_empty() {
        return Err(TriangulationError::empty_polygon("feather strip needs two non-empty polygons"));
    }

    let mut shape_side = Side::new(shape, VertexOrigin::InternalShape);
    let mut feather_side = Side::new(feather, VertexOrigin::Feather);
    let inner_is_shape = shape_side.inner_count() >= feather_side.inner_count();

    let inner_points = if inner_is_shape { shape } else { feather };
    let mut last_inner = inner_points.iter().rposition(|p| p.is_inner);
    let mut substituted = 0usize;

    let mut builder = StripBuilder::default();
    loop {
        let (inner, outer) = if inner_is_shape {
            (&shape_side, &feather_side)
        } else {
            (&feather_side, &shape_side)
        };
        let inner_index = inner.current();
        let outer_index = outer.current();
        let mut emitted_inner = inner_index;
        if inner.points[inner_index].is_inner {
            last_inner = Some(inner_index);
        } else if !outer.points[outer_index].is_inner {
            if let Some(k) = last_inner {
                emitted_inner = k;
                substituted += 1;
            }
        }
        builder.push(outer, outer_index);
        builder.push(inner, emitted_inner);

        let advance_shape = match (shape_side.finished(), feather_side.finished()) {
            (true, true) => break,
            (true, false) => false,
            (false, true) => true,
            (false, false) => shape_side.next_t() <= feather_side.next_t(),
        };
        if advance_shape {
            shape_side.cursor += 1;
        } else {
            feather_side.cursor += 1;
        }
    }

    if substituted > 0 {
        warn!(substituted, "feather strip used the last inner point where no inner point was current");
    }
    debug!(
        vertices = builder.vertices.len(),
        strip = builder.strip.len(),
        inner_is_shape,
        "feather triangles computed"
    );
    Ok((builder.vertices, builder.strip))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ring(points: &[(Real, Real)], inner: bool) -> Vec<BoundaryParametricPoint> {
        points
            .iter()
            .enumerate()
            .map(|(i, &(x, y))| BoundaryParametricPoint {
                x,
                y,
                t: (i + 1) as Real,
                is_inner: inner,
            })
            .collect()
    }

    #[test]
    fn square_ring_makes_a_closed_strip() {
        let shape = ring(&[(1.0, 1.0), (3.0, 1.0), (3.0, 3.0), (1.0, 3.0)], true);
        let feather = ring(&[(0.0, 0.0), (4.0, 0.0), (4.0, 4.0), (0.0, 4.0)], false);
        let (vertices, strip) = compute_feather_triangles(&shape, &feather).unwrap();

        assert_eq!(vertices.len(), 8);
        assert_eq!(vertices.iter().filter(|v| v.is_inner).count(), 4);
        assert_eq!(strip.len() % 2, 0);
        // Starts and ends on the (feather last, shape last) pair.
        assert_eq!(strip[..2], strip[strip.len() - 2..]);
        for pair in strip.chunks_exact(2) {
            assert!(!vertices[pair[0]].is_inner);
            assert!(vertices[pair[1]].is_inner);
        }
    }

    #[test]
    fn walk_follows_parameter_order() {
        let shape = ring(&[(1.0, 1.0), (3.0, 1.0)], true);
        let mut feather = ring(&[(0.0, 0.0), (2.0, 0.0), (4.0, 0.0)], false);
        feather[0].t = 0.5;
        feather[1].t = 1.5;
        feather[2].t = 2.0;
        let (vertices, strip) = compute_feather_triangles(&shape, &feather).unwrap();

        let xs: Vec<(Real, Real)> = strip
            .chunks_exact(2)
            .map(|p| (vertices[p[0]].x, vertices[p[1]].x))
            .collect();
        assert_eq!(
            xs,
            vec![(4.0, 3.0), (0.0, 3.0), (0.0, 1.0), (2.0, 1.0), (2.0, 3.0), (4.0, 3.0)]
        );
    }

    #[test]
    fn non_inner_spans_reuse_the_last_inner_point() {
        let mut shape = ring(&[(1.0, 1.0), (3.0, 1.0), (3.0, 3.0), (1.0, 3.0)], true);
        shape[2].is_inner = false;
        let feather = ring(&[(0.0, 0.0), (4.0, 0.0), (4.0, 4.0), (0.0, 4.0)], false);
        let (vertices, strip) = compute_feather_triangles(&shape, &feather).unwrap();

        assert_eq!(vertices.len(), 7);
        assert!(strip.chunks_exact(2).all(|p| vertices[p[1]].is_inner));
    }

    #[test]
    fn coincident_polygons_without_inner_points_still_produce_a_strip() {
        let square = ring(&[(0.0, 0.0), (1.0, 0.0), (1.0, 1.0), (0.0, 1.0)], false);
        let (vertices, strip) = compute_feather_triangles(&square, &square).unwrap();
        assert_eq!(vertices.len(), 8);
        assert_eq!(strip.len(), 2 * (1 + 2 * square.len()));
        assert!(strip.iter().all(|&i| i < vertices.len()));
    }

    #[test]
    fn empty_polygons_are_rejected() {
        let square = ring(&[(0.0, 0.0), (1.0, 0.0), (1.0, 1.0)], false);
        assert!(matches!(
            compute_feather_triangles(&[], &square),
            Err(TriangulationError::EmptyPolygon(_))
        ));
    }
}
