// Copyright 2025 Lars Brubaker
// License: SGI Free Software License B (MIT-compatible)
//
// Sweep-plane geometry predicates.
//
// Every predicate works on projected (s, t) positions. The sweep runs in the
// direction of increasing s, ties broken by t, and all orientation tests are
// written so that the answer for three nearly collinear points is consistent
// no matter which pair is compared first.

use serde::{Deserialize, Serialize};

pub type Real = f64;

/// A projected position on the sweep plane.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Pos {
    pub s: Real,
    pub t: Real,
}

impl Pos {
    #[inline]
    pub fn new(s: Real, t: Real) -> Self {
        // `+ 0.0` folds -0.0 into 0.0 so total ordering agrees with `==`.
        Pos { s: s + 0.0, t: t + 0.0 }
    }
}

/// Lexicographic order, s first: u <= v.
#[inline]
pub fn vert_leq(u: Pos, v: Pos) -> bool {
    u.s < v.s || (u.s == v.s && u.t <= v.t)
}

#[inline]
pub fn vert_eq(u: Pos, v: Pos) -> bool {
    u.s == v.s && u.t == v.t
}

/// Lexicographic order with s and t transposed.
#[inline]
pub fn trans_leq(u: Pos, v: Pos) -> bool {
    u.t < v.t || (u.t == v.t && u.s <= v.s)
}

/// Given `u <= v <= w`, evaluates the t-coordinate of the edge uw at the
/// s-coordinate of v and returns `v.t - uw(v.s)`: the signed distance from
/// uw to v. Returns zero for a vertical uw.
pub fn edge_eval(u: Pos, v: Pos, w: Pos) -> Real {
    let gap_l = v.s - u.s;
    let gap_r = w.s - v.s;
    if gap_l + gap_r > 0.0 {
        if gap_l < gap_r {
            (v.t - u.t) + (u.t - w.t) * (gap_l / (gap_l + gap_r))
        } else {
            (v.t - w.t) + (w.t - u.t) * (gap_r / (gap_l + gap_r))
        }
    } else {
        0.0
    }
}

/// Same sign as `edge_eval`. Routed through the division form: the
/// multiplied form loses the sign for near-zero s gaps.
#[inline]
pub fn edge_sign(u: Pos, v: Pos, w: Pos) -> Real {
    edge_eval(u, v, w)
}

/// `edge_eval` with s and t transposed.
pub fn trans_eval(u: Pos, v: Pos, w: Pos) -> Real {
    let gap_l = v.t - u.t;
    let gap_r = w.t - v.t;
    if gap_l + gap_r > 0.0 {
        if gap_l < gap_r {
            (v.s - u.s) + (u.s - w.s) * (gap_l / (gap_l + gap_r))
        } else {
            (v.s - w.s) + (w.s - u.s) * (gap_r / (gap_l + gap_r))
        }
    } else {
        0.0
    }
}

/// `edge_sign` with s and t transposed.
pub fn trans_sign(u: Pos, v: Pos, w: Pos) -> Real {
    let gap_l = v.t - u.t;
    let gap_r = w.t - v.t;
    if gap_l + gap_r > 0.0 {
        (v.s - w.s) * gap_l + (v.s - u.s) * gap_r
    } else {
        0.0
    }
}

/// True if (u, v, w) turn counter-clockwise (or are collinear).
#[inline]
pub fn vert_ccw(u: Pos, v: Pos, w: Pos) -> bool {
    u.s * (v.t - w.t) + v.s * (w.t - u.t) + w.s * (u.t - v.t) >= 0.0
}

#[inline]
pub fn vert_l1_dist(u: Pos, v: Pos) -> Real {
    (u.s - v.s).abs() + (u.t - v.t).abs()
}

/// Returns `(b*x + a*y) / (a + b)` with negative weights clamped to zero, or
/// the midpoint when both weights are zero. The result always lies in
/// `[min(x, y), max(x, y)]`.
#[inline]
pub fn real_interpolate(a: Real, x: Real, b: Real, y: Real) -> Real {
    let a = a.max(0.0);
    let b = b.max(0.0);
    if a <= b {
        if b == 0.0 {
            x / 2.0 + y / 2.0
        } else {
            x + (y - x) * (a / (a + b))
        }
    } else {
        y + (x - y) * (b / (a + b))
    }
}

/// Intersection of edges (o1, d1) and (o2, d2).
///
/// The s-coordinate is computed in vertex order and the t-coordinate in
/// transposed order, so the result always lies inside the bounding box of
/// both edges even when they only touch marginally.
pub fn edge_intersect(o1: Pos, d1: Pos, o2: Pos, d2: Pos) -> Pos {
    let s = {
        let (mut a, mut b, mut c, mut d) = (o1, d1, o2, d2);
        if !vert_leq(a, b) {
            std::mem::swap(&mut a, &mut b);
        }
        if !vert_leq(c, d) {
            std::mem::swap(&mut c, &mut d);
        }
        if !vert_leq(a, c) {
            std::mem::swap(&mut a, &mut c);
            std::mem::swap(&mut b, &mut d);
        }

        if !vert_leq(c, b) {
            // No overlap in s: best effort.
            c.s / 2.0 + b.s / 2.0
        } else if vert_leq(b, d) {
            let (z1, z2) = same_side(edge_eval(a, c, b), edge_eval(c, b, d));
            real_interpolate(z1, c.s, z2, b.s)
        } else {
            let (z1, z2) = same_side(edge_sign(a, c, b), -edge_sign(a, d, b));
            real_interpolate(z1, c.s, z2, d.s)
        }
    };

    let t = {
        let (mut a, mut b, mut c, mut d) = (o1, d1, o2, d2);
        if !trans_leq(a, b) {
            std::mem::swap(&mut a, &mut b);
        }
        if !trans_leq(c, d) {
            std::mem::swap(&mut c, &mut d);
        }
        if !trans_leq(a, c) {
            std::mem::swap(&mut a, &mut c);
            std::mem::swap(&mut b, &mut d);
        }

        if !trans_leq(c, b) {
            c.t / 2.0 + b.t / 2.0
        } else if trans_leq(b, d) {
            let (z1, z2) = same_side(trans_eval(a, c, b), trans_eval(c, b, d));
            real_interpolate(z1, c.t, z2, b.t)
        } else {
            let (z1, z2) = same_side(trans_sign(a, c, b), -trans_sign(a, d, b));
            real_interpolate(z1, c.t, z2, d.t)
        }
    };

    Pos::new(s, t)
}

#[inline]
fn same_side(z1: Real, z2: Real) -> (Real, Real) {
    if z1 + z2 < 0.0 {
        (-z1, -z2)
    } else {
        (z1, z2)
    }
}
