// Copyright 2025 Lars Brubaker
// Kernel tests after the libtess2 suite (libtess2_test.cc), on the sink API.

mod helpers;

use helpers::{triangles_of, Collector};
use roto_tess::tess::MAX_COORD;
use roto_tess::{Orientation, Real, TessError, Tessellator, WindingRule};

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn contour(flat: &[Real]) -> Vec<([Real; 2], [Real; 2])> {
    flat.chunks_exact(2).map(|c| ([c[0], c[1]], [c[0], c[1]])).collect()
}

/// Adds a polygon with a hole (outer CCW, inner CW).
///
/// Expected tessellation: 8 triangles.
///
/// ```text
/// +aaaaaaaaaaaaaa+
/// a xx | xx | xx a
/// a----+bbbb+----a
/// a xx b oo b xx a
/// a----+bbbb+----a
/// a xx | xx | xx a
/// +aaaaaaaaaaaaaa+
/// ```
fn add_polygon_with_hole(tess: &mut Tessellator<[Real; 2]>) {
    tess.add_contour(contour(&[0.0, 0.0, 3.0, 0.0, 3.0, 3.0, 0.0, 3.0])).unwrap();
    tess.add_contour(contour(&[1.0, 1.0, 1.0, 2.0, 2.0, 2.0, 2.0, 1.0])).unwrap();
}

fn tessellate_positive(tess: &mut Tessellator<[Real; 2]>) -> Result<Collector, TessError> {
    tess.set_winding_rule(WindingRule::Positive);
    let mut sink = Collector::default();
    tess.tessellate(&mut sink).map(|()| sink)
}

fn triangle_count(sink: &Collector) -> usize {
    sink.primitives.iter().map(|(kind, v)| triangles_of(*kind, v).len()).sum()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

/// Polygon with hole → 8 triangles
#[test]
fn polygon_with_hole() {
    let mut tess = Tessellator::new();
    add_polygon_with_hole(&mut tess);
    let sink = tessellate_positive(&mut tess).expect("tessellation should succeed");
    assert_eq!(triangle_count(&sink), 8, "polygon with hole should produce 8 triangles");
    helpers::assert_approx(helpers::total_area(&sink), 8.0, 1e-12, "area");
}

/// Reusing a tessellator gives the same result; contours are consumed.
#[test]
fn tessellator_is_reusable() {
    let mut tess = Tessellator::new();
    add_polygon_with_hole(&mut tess);
    let first = tessellate_positive(&mut tess).unwrap();
    assert_eq!(tess.vertex_count(), 0);
    add_polygon_with_hole(&mut tess);
    let second = tessellate_positive(&mut tess).unwrap();
    assert_eq!(first.primitives, second.primitives);
}

/// Empty contour → success, 0 primitives
#[test]
fn empty_polyline() {
    let mut tess = Tessellator::new();
    tess.add_contour(contour(&[])).unwrap();
    let sink = tessellate_positive(&mut tess).expect("empty contour should succeed");
    assert!(sink.primitives.is_empty());
}

/// 2-vertex degenerate → success, 0 primitives
#[test]
fn single_line() {
    let mut tess = Tessellator::new();
    tess.add_contour(contour(&[0.0, 0.0, 0.0, 1.0])).unwrap();
    let sink = tessellate_positive(&mut tess).expect("single line should succeed");
    assert_eq!(triangle_count(&sink), 0);
}

/// 3 vertices → 1 triangle
#[test]
fn single_triangle() {
    let mut tess = Tessellator::new();
    tess.add_contour(contour(&[0.0, 0.0, 1.0, 0.0, 0.0, 1.0])).unwrap();
    let sink = tessellate_positive(&mut tess).expect("single triangle should succeed");
    assert_eq!(triangle_count(&sink), 1);
}

/// 4 vertices → 2 triangles
#[test]
fn unit_quad() {
    let mut tess = Tessellator::new();
    tess.add_contour(contour(&[0.0, 0.0, 1.0, 0.0, 1.0, 1.0, 0.0, 1.0])).unwrap();
    let sink = tessellate_positive(&mut tess).expect("unit quad should succeed");
    assert_eq!(triangle_count(&sink), 2);
}

/// A clockwise quad vanishes under Positive unless the normal says otherwise.
#[test]
fn clockwise_quad_follows_the_normal() {
    let cw = [0.0, 0.0, 0.0, 1.0, 1.0, 1.0, 1.0, 0.0];

    let mut tess = Tessellator::new();
    tess.set_orientation(Orientation::CounterClockwise);
    tess.add_contour(contour(&cw)).unwrap();
    assert_eq!(triangle_count(&tessellate_positive(&mut tess).unwrap()), 0);

    tess.set_orientation(Orientation::Clockwise);
    tess.add_contour(contour(&cw)).unwrap();
    assert_eq!(triangle_count(&tessellate_positive(&mut tess).unwrap()), 2);
}

/// Out of range and non-finite coordinates are rejected when added
#[test]
fn invalid_input_coordinates() {
    let mut tess: Tessellator<[Real; 2]> = Tessellator::new();
    let err = tess.add_vertex(2.0 * MAX_COORD, 0.0, [0.0, 0.0]).unwrap_err();
    assert!(matches!(err, TessError::CoordinateOutOfRange { .. }), "{err:?}");

    let err = tess
        .add_contour(contour(&[Real::NAN, 0.0, 1.0, 1.0, 0.0, 1.0]))
        .unwrap_err();
    assert!(matches!(err, TessError::CoordinateOutOfRange { .. }), "{err:?}");
}

/// All vertices at origin → success, 0 primitives
#[test]
fn singularity_quad() {
    let mut tess = Tessellator::new();
    tess.add_contour(contour(&[0.0; 8])).unwrap();
    let sink = tessellate_positive(&mut tess).expect("singularity quad should succeed");
    assert_eq!(triangle_count(&sink), 0);
}

/// Near-giant triangle with an extra sliver → must not panic
#[test]
fn degenerate_quad() {
    let mut tess = Tessellator::new();
    tess.add_contour(contour(&[
        0.0, 3.40282347e+38,
        0.64113313, -1.0,
        -0.0, -0.0,
        -3.40282347e+38, 1.0,
    ]))
    .unwrap();
    let _ = tessellate_positive(&mut tess);
}

/// Extremely wide and tall triangles → must not panic
#[test]
fn overflowing_triangles() {
    for flat in [
        [-2e38, 0.0, 0.0, 0.0, 2e38, -1.0],
        [0.0, 0.0, 0.0, 2e38, -1.0, -2e38],
        [-2e37, 0.0, 0.0, 5.0, 1e37, -5.0],
    ] {
        let mut tess = Tessellator::new();
        tess.add_contour(contour(&flat)).unwrap();
        let _ = tessellate_positive(&mut tess);
    }
}

/// Complex mixed contour → must not panic
#[test]
fn avoids_crash_while_finding_intersection() {
    let mut tess = Tessellator::new();
    tess.add_contour(contour(&[
        -1.0, 0.0,
        0.868218958, 0.0,
        0.902460039, 0.0649746507,
        -0.0, 0.854620099,
        -1.0, 0.784999669,
        0.0, 0.0,
        -1.0, 1.0,
        1.0, 1.0,
        0.0, -1.0,
        3.40282347e+38, 3.40282347e+38,
        -1.0, -1.0,
        -0.0, 0.442898333,
        0.33078745, -0.0,
        -0.0, 1.0,
        -1.0, 0.0,
        1.0, -0.0,
        0.0, 0.186138511,
        0.212649569, 0.886535764,
        1.0, 0.34795785,
        0.0, 0.788870096,
        0.853441715, -1.0,
        -1.0, 1.0,
        1.0, -0.994903505,
        1.0, 0.105880626,
        3.40282347e+38, 3.40282347e+38,
        -1.0, 3.40282347e+38,
        -0.0, 0.34419331,
        1.0, 1.0,
    ]))
    .unwrap();
    let _ = tessellate_positive(&mut tess);
}

/// Another complex mixed contour → must not panic
#[test]
fn avoids_crash_in_add_right_edges() {
    let mut tess = Tessellator::new();
    tess.add_contour(contour(&[
        -0.5, 1.0,
        3.40282347e+38, 0.0,
        0.349171013, 1.0,
        1.0, 0.0,
        1.0, -0.0,
        0.594775498, -0.0,
        0.0, -0.0,
        -0.0, 1.0,
        0.0, 1.0,
        2.20929384, 1.0,
        1.0, 1.0,
        -0.0, -0.0,
        3.40282347e+38, -0.0,
        -1.0, 0.0,
        1.70141173e+38, 0.391036272,
        3.40282347e+38, 0.371295959,
        3.40282347e+38, -0.0,
        0.0, 0.234747186,
        -1.0, 1.0,
        -1.0, -0.0,
        3.40282347e+38, 1.0,
        -0.0, -0.0,
        3.40282347e+38, 1.0,
        0.434241712, 0.0,
        1.0, 0.211511821,
        3.40282347e+38, 1.0,
    ]))
    .unwrap();
    let _ = tessellate_positive(&mut tess);
}
