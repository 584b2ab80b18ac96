// Copyright 2025 Lars Brubaker
// Shared test utilities for roto-tess tests.

#![allow(dead_code)]

use roto_tess::{PolygonData, PrimitiveKind, Real, TessellationSink, Tessellator, WindingRule};

/// Installs a test-friendly tracing subscriber once per test binary.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_max_level(tracing::Level::DEBUG)
        .try_init();
}

/// Sink whose payload is the vertex position itself.
#[derive(Default)]
pub struct Collector {
    pub primitives: Vec<(PrimitiveKind, Vec<[Real; 2]>)>,
    pub combines: usize,
}

impl TessellationSink<[Real; 2]> for Collector {
    fn begin_primitive(&mut self, kind: PrimitiveKind) {
        self.primitives.push((kind, Vec::new()));
    }

    fn end_primitive(&mut self) {}

    fn vertex(&mut self, data: [Real; 2]) {
        if let Some((_, v)) = self.primitives.last_mut() {
            v.push(data);
        }
    }

    fn combine(&mut self, coords: [Real; 2], _sources: &[([Real; 2], Real)]) -> [Real; 2] {
        self.combines += 1;
        coords
    }
}

/// Signed area of a triangle given 3 vertices (2D).
pub fn triangle_area(a: [Real; 2], b: [Real; 2], c: [Real; 2]) -> Real {
    0.5 * ((b[0] - a[0]) * (c[1] - a[1]) - (c[0] - a[0]) * (b[1] - a[1]))
}

/// Splits a primitive into its triangles.
pub fn triangles_of<T: Copy>(kind: PrimitiveKind, v: &[T]) -> Vec<[T; 3]> {
    match kind {
        PrimitiveKind::Triangles => v.chunks_exact(3).map(|t| [t[0], t[1], t[2]]).collect(),
        PrimitiveKind::TriangleFan => (1..v.len().saturating_sub(1)).map(|k| [v[0], v[k], v[k + 1]]).collect(),
        PrimitiveKind::TriangleStrip => v.windows(3).map(|w| [w[0], w[1], w[2]]).collect(),
        PrimitiveKind::LineLoop => Vec::new(),
    }
}

/// Total absolute area covered by the collected primitives.
pub fn total_area(sink: &Collector) -> Real {
    sink.primitives
        .iter()
        .flat_map(|(kind, v)| triangles_of(*kind, v))
        .map(|[a, b, c]| triangle_area(a, b, c).abs())
        .sum()
}

/// Tessellate contours with the given winding rule.
pub fn tessellate_contours(contours: &[Vec<[Real; 2]>], rule: WindingRule) -> Collector {
    let mut tess = Tessellator::new();
    tess.set_winding_rule(rule);
    for contour in contours {
        tess.add_contour(contour.iter().map(|&p| (p, p)))
            .expect("valid contour");
    }
    let mut sink = Collector::default();
    tess.tessellate(&mut sink)
        .unwrap_or_else(|e| panic!("tessellation failed for {rule:?}: {e}"));
    sink
}

/// Opaque area of a triangulated roto shape.
pub fn internal_area(data: &PolygonData) -> Real {
    let p = |i: usize| [data.internal_shape_vertices[i].x, data.internal_shape_vertices[i].y];
    let lists = [
        (PrimitiveKind::TriangleFan, &data.internal_shape_triangle_fans),
        (PrimitiveKind::Triangles, &data.internal_shape_triangles),
        (PrimitiveKind::TriangleStrip, &data.internal_shape_triangle_strips),
    ];
    lists
        .iter()
        .flat_map(|(kind, prims)| prims.iter().flat_map(move |v| triangles_of(*kind, v)))
        .map(|[a, b, c]| triangle_area(p(a), p(b), p(c)).abs())
        .sum()
}

/// Verify that every index of the output is in range.
pub fn verify_valid_output(data: &PolygonData) {
    let n = data.internal_shape_vertices.len();
    for list in data
        .internal_shape_triangle_fans
        .iter()
        .chain(&data.internal_shape_triangles)
        .chain(&data.internal_shape_triangle_strips)
    {
        for &i in list {
            assert!(i < n, "internal index {i} out of range (vertex count {n})");
        }
    }
    let m = data.feather_vertices.len();
    for &i in &data.feather_triangles {
        assert!(i < m, "feather index {i} out of range (vertex count {m})");
    }
    for v in &data.internal_shape_vertices {
        assert!(v.x.is_finite() && v.y.is_finite(), "non-finite vertex {v:?}");
    }
}

pub fn assert_approx(actual: Real, expected: Real, tolerance: Real, label: &str) {
    assert!(
        (actual - expected).abs() < tolerance,
        "{}: expected ~{}, got {} (diff={})",
        label,
        expected,
        actual,
        (actual - expected).abs()
    );
}
