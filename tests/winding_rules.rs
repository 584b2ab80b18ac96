// Copyright 2025 Lars Brubaker
// Winding rule correctness tests with area verification.

mod helpers;

use helpers::{assert_approx, tessellate_contours, total_area};
use roto_tess::{Real, WindingRule};

fn square(x0: Real, y0: Real, size: Real, ccw: bool) -> Vec<[Real; 2]> {
    let mut v = vec![[x0, y0], [x0 + size, y0], [x0 + size, y0 + size], [x0, y0 + size]];
    if !ccw {
        v.reverse();
    }
    v
}

/// Three nested squares for winding rule testing:
/// - Outer: 6x6, CCW (area=36)
/// - Middle: 4x4, CW (area=16)
/// - Inner: 2x2, CCW (area=4)
///
/// Winding numbers from outside to inside: 0, 1, 0, 1
fn nested_squares() -> Vec<Vec<[Real; 2]>> {
    vec![
        square(-3.0, -3.0, 6.0, true),
        square(-2.0, -2.0, 4.0, false),
        square(-1.0, -1.0, 2.0, true),
    ]
}

/// Two CCW squares overlapping in a 1x1 cell.
fn overlapping_squares() -> Vec<Vec<[Real; 2]>> {
    vec![square(0.0, 0.0, 2.0, true), square(1.0, 1.0, 2.0, true)]
}

#[test]
fn winding_odd_nested_squares() {
    let sink = tessellate_contours(&nested_squares(), WindingRule::Odd);
    assert_approx(total_area(&sink), 24.0, 1e-9, "odd");
}

#[test]
fn winding_nonzero_nested_squares() {
    let sink = tessellate_contours(&nested_squares(), WindingRule::NonZero);
    assert_approx(total_area(&sink), 24.0, 1e-9, "nonzero");
}

#[test]
fn winding_positive_nested_squares() {
    let sink = tessellate_contours(&nested_squares(), WindingRule::Positive);
    assert_approx(total_area(&sink), 24.0, 1e-9, "positive");
}

#[test]
fn winding_negative_nested_squares_is_empty() {
    let sink = tessellate_contours(&nested_squares(), WindingRule::Negative);
    assert_approx(total_area(&sink), 0.0, 1e-9, "negative");
}

#[test]
fn winding_abs_geq_two_nested_squares_is_empty() {
    let sink = tessellate_contours(&nested_squares(), WindingRule::AbsGeqTwo);
    assert!(sink.primitives.is_empty(), "{:?}", sink.primitives);
}

#[test]
fn winding_rules_on_overlapping_squares() {
    helpers::init_tracing();
    let cases = [
        (WindingRule::Odd, 6.0),
        (WindingRule::NonZero, 7.0),
        (WindingRule::Positive, 7.0),
        (WindingRule::Negative, 0.0),
        (WindingRule::AbsGeqTwo, 1.0),
    ];
    for (rule, expected) in cases {
        let sink = tessellate_contours(&overlapping_squares(), rule);
        assert_approx(total_area(&sink), expected, 1e-9, &format!("{rule:?}"));
    }
}

#[test]
fn overlapping_squares_combine_two_crossings() {
    let sink = tessellate_contours(&overlapping_squares(), WindingRule::AbsGeqTwo);
    assert_eq!(sink.combines, 2);
    let corners: Vec<[Real; 2]> = sink.primitives.iter().flat_map(|(_, v)| v.iter().copied()).collect();
    for expected in [[1.0, 1.0], [2.0, 2.0], [2.0, 1.0], [1.0, 2.0]] {
        assert!(corners.contains(&expected), "missing {expected:?} in {corners:?}");
    }
}
