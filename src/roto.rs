// Copyright 2025 Lars Brubaker
// License: SGI Free Software License B (MIT-compatible)
//
// Roto shape triangulation.
//
// A shape and its feather are discretized into two polygons. Each polygon
// is first reduced to its outline (winding number one), then the two
// outlines are intersected to find the fully opaque interior, and finally
// the original polygons are stitched together into the feather strip that
// fades from the interior to the feather edge.

pub mod bezier;
mod feather;
mod intersection;
mod polygon;
mod winding;

use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use crate::error::{TriangulationError, TriangulationResult};
use crate::geom::Real;
use crate::settings::TriangulationSettings;

pub use bezier::{ControlPoint, CubicBezierShape, RotoShape};
pub use feather::compute_feather_triangles;
pub use intersection::{compute_internal_polygon, InternalPolygon};
pub use polygon::initialize_polygon;
pub use winding::{ensure_polygon_winding_number_equals_one, NormalizedPolygon};

// ─────────────────────────────── Input types ─────────────────────────────────

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ViewIdx(pub u32);

#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RenderScale {
    pub x: Real,
    pub y: Real,
}

impl Default for RenderScale {
    fn default() -> Self {
        Self { x: 1.0, y: 1.0 }
    }
}

/// A discretized curve point with its Bezier parameter.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ParametricPoint {
    pub x: Real,
    pub y: Real,
    pub t: Real,
}

impl ParametricPoint {
    pub fn new(x: Real, y: Real, t: Real) -> Self {
        Self { x, y, t }
    }
}

/// A polygon point. `t` is the segment index plus the Bezier parameter, so
/// it grows monotonically around the polygon.
#[derive(Copy, Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct BoundaryParametricPoint {
    pub x: Real,
    pub y: Real,
    pub t: Real,
    /// Lies on the boundary of the opaque interior.
    pub is_inner: bool,
}

/// A point of a winding-normalized polygon.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ContourBezierVertex {
    pub point: BoundaryParametricPoint,
    /// Parameter on the second edge through a crossing.
    pub t2: Option<Real>,
    pub is_intersection_point: bool,
    /// Index of the polygon point this vertex is, if it is not generated.
    pub original: Option<usize>,
}

/// Which point list a `VertexIndex` refers to.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum VertexOrigin {
    Feather,
    InternalShape,
    Generated,
}

/// Ordered by origin, then point index.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct VertexIndex {
    pub origin: VertexOrigin,
    pub point_index: usize,
}

impl VertexIndex {
    pub fn new(origin: VertexOrigin, point_index: usize) -> Self {
        Self { origin, point_index }
    }
}

// ─────────────────────────────── Output types ────────────────────────────────

#[derive(Copy, Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: Real,
    pub y: Real,
}

#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FeatherVertex {
    pub x: Real,
    pub y: Real,
    /// Drawn with the inner colour when set, the outer one otherwise.
    pub is_inner: bool,
}

#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x1: Real,
    pub y1: Real,
    pub x2: Real,
    pub y2: Real,
}

impl Default for BoundingBox {
    fn default() -> Self {
        Self::EMPTY
    }
}

impl BoundingBox {
    pub const EMPTY: Self = Self {
        x1: Real::INFINITY,
        y1: Real::INFINITY,
        x2: Real::NEG_INFINITY,
        y2: Real::NEG_INFINITY,
    };

    pub fn is_empty(&self) -> bool {
        self.x1 > self.x2 || self.y1 > self.y2
    }

    pub fn add(&mut self, x: Real, y: Real) {
        self.x1 = self.x1.min(x);
        self.y1 = self.y1.min(y);
        self.x2 = self.x2.max(x);
        self.y2 = self.y2.max(y);
    }

    pub fn union(&self, other: &Self) -> Self {
        Self {
            x1: self.x1.min(other.x1),
            y1: self.y1.min(other.y1),
            x2: self.x2.max(other.x2),
            y2: self.y2.max(other.y2),
        }
    }

    /// Containment with an absolute tolerance.
    pub fn contains(&self, x: Real, y: Real, eps: Real) -> bool {
        x >= self.x1 - eps && x <= self.x2 + eps && y >= self.y1 - eps && y <= self.y2 + eps
    }

    /// Tolerance for points generated from inputs within this box.
    pub fn tolerance(&self) -> Real {
        if self.is_empty() {
            return 0.0;
        }
        let extent = (self.x2 - self.x1).abs().max((self.y2 - self.y1).abs());
        let magnitude = [self.x1, self.y1, self.x2, self.y2]
            .iter()
            .fold(0.0, |m: Real, v| m.max(v.abs()));
        1e-9 * (1.0 + extent + magnitude)
    }
}

/// Renderable mesh of one roto shape.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct PolygonData {
    pub internal_shape_vertices: Vec<Point>,
    pub internal_shape_triangle_fans: Vec<Vec<usize>>,
    pub internal_shape_triangles: Vec<Vec<usize>>,
    pub internal_shape_triangle_strips: Vec<Vec<usize>>,
    pub feather_vertices: Vec<FeatherVertex>,
    /// One triangle strip over `feather_vertices`.
    pub feather_triangles: Vec<usize>,
    pub bezier_bbox: BoundingBox,
}

// ─────────────────────────────── Entry point ─────────────────────────────────

/// Triangulates `shape` at the given time, view and render scale.
#[instrument(level = "debug", skip(shape, settings), fields(view = view.0))]
pub fn tesselate<S>(
    shape: &S,
    time: Real,
    view: ViewIdx,
    scale: RenderScale,
    settings: &TriangulationSettings,
) -> TriangulationResult<PolygonData>
where
    S: RotoShape + ?Sized,
{
    settings.validate()?;
    let clockwise = shape.is_clockwise_oriented(time, view);

    let feather_segments = shape.evaluate_feather_points_at_time(time, view, scale, settings)?;
    let shape_segments = shape.evaluate_at_time(time, view, scale, settings)?;
    if feather_segments.len() != shape_segments.len() {
        return Err(TriangulationError::SegmentCountMismatch {
            shape: shape_segments.len(),
            feather: feather_segments.len(),
        });
    }

    let mut bezier_polygon = initialize_polygon(&shape_segments, "shape", settings.max_polygon_points)?;
    let mut feather_polygon = initialize_polygon(&feather_segments, "feather", settings.max_polygon_points)?;

    let mut bbox = BoundingBox::EMPTY;
    for p in bezier_polygon.iter().chain(feather_polygon.iter()) {
        bbox.add(p.x, p.y);
    }

    let max_vertices = settings.max_tessellation_vertices;
    let normalized_shape = ensure_polygon_winding_number_equals_one(&bezier_polygon, clockwise, &bbox, max_vertices)?;
    let normalized_feather =
        ensure_polygon_winding_number_equals_one(&feather_polygon, clockwise, &bbox, max_vertices)?;

    let internal = compute_internal_polygon(
        normalized_shape,
        normalized_feather,
        &mut bezier_polygon,
        &mut feather_polygon,
        clockwise,
        &bbox,
        max_vertices,
    )?;

    let (feather_vertices, feather_triangles) = compute_feather_triangles(&bezier_polygon, &feather_polygon)?;

    let data = PolygonData {
        internal_shape_vertices: internal.vertices,
        internal_shape_triangle_fans: internal.fans,
        internal_shape_triangles: internal.triangles,
        internal_shape_triangle_strips: internal.strips,
        feather_vertices,
        feather_triangles,
        bezier_bbox: bbox,
    };
    debug!(
        clockwise,
        shape_points = bezier_polygon.len(),
        feather_points = feather_polygon.len(),
        internal_vertices = data.internal_shape_vertices.len(),
        feather_vertices = data.feather_vertices.len(),
        "roto shape triangulated"
    );
    Ok(data)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vertex_indices_order_by_origin_first() {
        let a = VertexIndex::new(VertexOrigin::Feather, 10);
        let b = VertexIndex::new(VertexOrigin::InternalShape, 0);
        let c = VertexIndex::new(VertexOrigin::Generated, 0);
        let d = VertexIndex::new(VertexOrigin::InternalShape, 3);
        let mut v = vec![c, d, b, a];
        v.sort();
        assert_eq!(v, vec![a, b, d, c]);
        assert_ne!(b, d);
    }

    #[test]
    fn bounding_box_union_and_containment() {
        let mut a = BoundingBox::EMPTY;
        assert!(a.is_empty());
        a.add(0.0, 0.0);
        a.add(2.0, 1.0);
        let mut b = BoundingBox::EMPTY;
        b.add(-1.0, 3.0);
        let u = a.union(&b);
        assert_eq!((u.x1, u.y1, u.x2, u.y2), (-1.0, 0.0, 2.0, 3.0));
        assert!(u.contains(2.0, 3.0, 0.0));
        assert!(!u.contains(2.1, 3.0, 0.0));
        assert!(u.contains(2.0 + 1e-12, 3.0, u.tolerance()));
    }

    #[test]
    fn mismatched_segment_counts_are_rejected() {
        struct Lopsided;
        impl RotoShape for Lopsided {
            fn evaluate_at_time(
                &self,
                _: Real,
                _: ViewIdx,
                _: RenderScale,
                _: &TriangulationSettings,
            ) -> TriangulationResult<Vec<Vec<ParametricPoint>>> {
                Ok(vec![vec![ParametricPoint::new(0.0, 0.0, 0.0)]; 3])
            }

            fn evaluate_feather_points_at_time(
                &self,
                _: Real,
                _: ViewIdx,
                _: RenderScale,
                _: &TriangulationSettings,
            ) -> TriangulationResult<Vec<Vec<ParametricPoint>>> {
                Ok(vec![vec![ParametricPoint::new(0.0, 0.0, 0.0)]; 2])
            }

            fn is_clockwise_oriented(&self, _: Real, _: ViewIdx) -> bool {
                false
            }
        }

        let err = tesselate(
            &Lopsided,
            0.0,
            ViewIdx(0),
            RenderScale::default(),
            &TriangulationSettings::default(),
        )
        .unwrap_err();
        assert_eq!(err, TriangulationError::SegmentCountMismatch { shape: 3, feather: 2 });
    }
}
