// Copyright 2025 Lars Brubaker
// License: SGI Free Software License B (MIT-compatible)
//
// Curve segment formulas.
//
// A segment between two keys is a cubic Hermite polynomial in the
// normalized time x = (t - t_cur) / dt. The tangents are the keys'
// derivatives scaled by dt. Virtual keys (type None) and Constant keys
// flatten the segment.

use crate::geom::Real;
use crate::keyframe::{KeyFrame, KeyframeType};

/// The piece of curve between two bracketing keys.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Segment {
    pub t_cur: Real,
    pub v_cur: Real,
    pub d_cur_right: Real,
    pub d_next_left: Real,
    pub t_next: Real,
    pub v_next: Real,
    pub cur_type: KeyframeType,
    pub next_type: KeyframeType,
}

#[derive(Copy, Clone, Debug, PartialEq)]
enum Shape {
    Flat(Real),
    Step { before: Real, after: Real },
    Cubic([Real; 4]),
}

impl Segment {
    pub fn new(cur: &KeyFrame, next: &KeyFrame) -> Self {
        Self {
            t_cur: cur.time,
            v_cur: cur.value,
            d_cur_right: cur.right_derivative,
            d_next_left: next.left_derivative,
            t_next: next.time,
            v_next: next.value,
            cur_type: cur.interpolation,
            next_type: next.interpolation,
        }
    }

    fn dt(&self) -> Real {
        self.t_next - self.t_cur
    }

    fn shape(&self) -> Shape {
        if self.cur_type == KeyframeType::None {
            return Shape::Flat(self.v_next);
        }
        if self.next_type == KeyframeType::None || self.dt() <= 0.0 {
            return Shape::Flat(self.v_cur);
        }
        if self.cur_type == KeyframeType::Constant {
            return Shape::Step {
                before: self.v_cur,
                after: self.v_next,
            };
        }
        Shape::Cubic(hermite_to_cubic(
            self.v_cur,
            self.d_cur_right * self.dt(),
            self.d_next_left * self.dt(),
            self.v_next,
        ))
    }

    pub fn value_at(&self, t: Real) -> Real {
        match self.shape() {
            Shape::Flat(v) => v,
            Shape::Step { before, after } => {
                if t < self.t_next {
                    before
                } else {
                    after
                }
            }
            Shape::Cubic(c) => cubic_at(&c, (t - self.t_cur) / self.dt()),
        }
    }

    pub fn derivative_at(&self, t: Real) -> Real {
        match self.shape() {
            Shape::Flat(_) | Shape::Step { .. } => 0.0,
            Shape::Cubic(c) => {
                let x = (t - self.t_cur) / self.dt();
                (c[1] + x * (2.0 * c[2] + x * 3.0 * c[3])) / self.dt()
            }
        }
    }

    /// Integral of the segment polynomial over `[t1, t2]`.
    pub fn integrate(&self, t1: Real, t2: Real) -> Real {
        match self.shape() {
            Shape::Flat(v) => v * (t2 - t1),
            Shape::Step { before, after } => {
                let split = self.t_next.clamp(t1.min(t2), t1.max(t2));
                let sign = if t2 >= t1 { 1.0 } else { -1.0 };
                sign * (before * (split - t1.min(t2)) + after * (t1.max(t2) - split))
            }
            Shape::Cubic(c) => {
                let dt = self.dt();
                let x1 = (t1 - self.t_cur) / dt;
                let x2 = (t2 - self.t_cur) / dt;
                dt * (cubic_antiderivative(&c, x2) - cubic_antiderivative(&c, x1))
            }
        }
    }

    /// Integral of the segment with its values clamped to `[y_min, y_max]`.
    pub fn integrate_clamped(&self, t1: Real, t2: Real, y_min: Real, y_max: Real) -> Real {
        let clamp = |v: Real| v.max(y_min).min(y_max);
        let (lo, hi, sign) = if t1 > t2 { (t2, t1, -1.0) } else { (t1, t2, 1.0) };
        let sum = match self.shape() {
            Shape::Flat(v) => clamp(v) * (hi - lo),
            Shape::Step { before, after } => {
                let split = self.t_next.clamp(lo, hi);
                clamp(before) * (split - lo) + clamp(after) * (hi - split)
            }
            Shape::Cubic(c) => {
                let dt = self.dt();
                let (x1, x2) = ((lo - self.t_cur) / dt, (hi - self.t_cur) / dt);
                // Between consecutive crossings of a bound the curve is either
                // inside the range or clamped to one bound.
                let mut cuts = vec![x1, x2];
                for level in [y_min, y_max] {
                    if level.is_finite() {
                        cuts.extend(level_crossings(&c, level, x1, x2));
                    }
                }
                cuts.sort_by(|a, b| a.total_cmp(b));
                let sum: Real = cuts
                    .windows(2)
                    .map(|w| {
                        let (a, b) = (w[0], w[1]);
                        let mid = cubic_at(&c, (a + b) * 0.5);
                        if mid > y_max {
                            y_max * (b - a)
                        } else if mid < y_min {
                            y_min * (b - a)
                        } else {
                            cubic_antiderivative(&c, b) - cubic_antiderivative(&c, a)
                        }
                    })
                    .sum();
                dt * sum
            }
        };
        sign * sum
    }
}

fn cubic_at(c: &[Real; 4], x: Real) -> Real {
    c[0] + x * (c[1] + x * (c[2] + x * c[3]))
}

fn cubic_antiderivative(c: &[Real; 4], x: Real) -> Real {
    x * (c[0] + x * (c[1] / 2.0 + x * (c[2] / 3.0 + x * c[3] / 4.0)))
}

/// Points in `(x1, x2)` where the cubic crosses `level`. The interval is cut
/// at the critical points so each piece is monotone, then each sign change
/// is bisected.
fn level_crossings(c: &[Real; 4], level: Real, x1: Real, x2: Real) -> Vec<Real> {
    // Roots of c1 + 2 c2 x + 3 c3 x^2.
    let (a, b, k) = (3.0 * c[3], 2.0 * c[2], c[1]);
    let mut knots = vec![x1];
    if a == 0.0 {
        if b != 0.0 {
            knots.push(-k / b);
        }
    } else {
        let disc = b * b - 4.0 * a * k;
        if disc >= 0.0 {
            let root = disc.sqrt();
            knots.push((-b - root) / (2.0 * a));
            knots.push((-b + root) / (2.0 * a));
        }
    }
    knots.push(x2);
    knots.retain(|x| *x >= x1 && *x <= x2);
    knots.sort_by(|p, q| p.total_cmp(q));

    let f = |x: Real| cubic_at(c, x) - level;
    let mut crossings = Vec::new();
    for w in knots.windows(2) {
        let (mut lo, mut hi) = (w[0], w[1]);
        let (f_lo, f_hi) = (f(lo), f(hi));
        if f_lo == 0.0 || f_hi == 0.0 || f_lo.signum() == f_hi.signum() {
            continue;
        }
        for _ in 0..200 {
            let mid = (lo + hi) * 0.5;
            if mid <= lo || mid >= hi {
                break;
            }
            if f(mid).signum() == f_lo.signum() {
                lo = mid;
            } else {
                hi = mid;
            }
        }
        crossings.push((lo + hi) * 0.5);
    }
    crossings
}

/// Coefficients of `c0 + c1 x + c2 x^2 + c3 x^3` matching the Hermite data.
fn hermite_to_cubic(p0: Real, p0_right: Real, p3_left: Real, p3: Real) -> [Real; 4] {
    [
        p0,
        p0_right,
        3.0 * (p3 - p0) - 2.0 * p0_right - p3_left,
        -2.0 * (p3 - p0) + p0_right + p3_left,
    ]
}

/// A neighbouring key as seen by `auto_compute_derivatives`.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Neighbor {
    pub time: Real,
    pub value: Real,
    /// Derivative on the side facing the current key.
    pub derivative: Real,
    pub interpolation: KeyframeType,
}

impl Neighbor {
    pub fn before(key: &KeyFrame) -> Self {
        Self {
            time: key.time,
            value: key.value,
            derivative: key.right_derivative,
            interpolation: key.interpolation,
        }
    }

    pub fn after(key: &KeyFrame) -> Self {
        Self {
            time: key.time,
            value: key.value,
            derivative: key.left_derivative,
            interpolation: key.interpolation,
        }
    }

    fn usable(n: Option<Self>) -> Option<Self> {
        n.filter(|n| n.interpolation != KeyframeType::None)
    }
}

/// Left and right derivatives of a key derived from its interpolation type
/// and its neighbours. Returns `None` for keys whose derivatives are kept
/// as they are (Free, Broken, None).
pub fn auto_compute_derivatives(
    prev: Option<Neighbor>,
    cur_type: KeyframeType,
    t_cur: Real,
    v_cur: Real,
    next: Option<Neighbor>,
) -> Option<(Real, Real)> {
    let prev = Neighbor::usable(prev).filter(|p| p.time < t_cur);
    let next = Neighbor::usable(next).filter(|n| n.time > t_cur);

    let slope_in = prev.map(|p| (v_cur - p.value) / (t_cur - p.time));
    let slope_out = next.map(|n| (n.value - v_cur) / (n.time - t_cur));

    let d = match cur_type {
        KeyframeType::None | KeyframeType::Free | KeyframeType::Broken => return None,
        KeyframeType::Constant | KeyframeType::Horizontal => return Some((0.0, 0.0)),
        KeyframeType::Linear => {
            let left = slope_in.or(slope_out).unwrap_or(0.0);
            let right = slope_out.or(slope_in).unwrap_or(0.0);
            return Some((left, right));
        }
        KeyframeType::CatmullRom => catmull_rom(prev, t_cur, v_cur, next),
        KeyframeType::Smooth => match (slope_in, slope_out) {
            // Flat at local extrema so the curve does not overshoot.
            (Some(a), Some(b)) if a * b <= 0.0 => 0.0,
            _ => catmull_rom(prev, t_cur, v_cur, next),
        },
        KeyframeType::Cubic => match (prev, next) {
            (Some(p), Some(n)) => {
                let h0 = t_cur - p.time;
                let h1 = n.time - t_cur;
                let rhs = 6.0 * (v_cur - p.value) / (h0 * h0) - 2.0 * p.derivative / h0
                    + 6.0 * (n.value - v_cur) / (h1 * h1)
                    - 2.0 * n.derivative / h1;
                rhs / (4.0 / h0 + 4.0 / h1)
            }
            // Natural end: zero second derivative at the key.
            (Some(p), None) => (3.0 * (v_cur - p.value) / (t_cur - p.time) - p.derivative) / 2.0,
            (None, Some(n)) => (3.0 * (n.value - v_cur) / (n.time - t_cur) - n.derivative) / 2.0,
            (None, None) => 0.0,
        },
    };
    Some((d, d))
}

fn catmull_rom(prev: Option<Neighbor>, t_cur: Real, v_cur: Real, next: Option<Neighbor>) -> Real {
    match (prev, next) {
        (Some(p), Some(n)) => (n.value - p.value) / (n.time - p.time),
        (Some(p), None) => (v_cur - p.value) / (t_cur - p.time),
        (None, Some(n)) => (n.value - v_cur) / (n.time - t_cur),
        (None, None) => 0.0,
    }
}
