// Copyright 2025 Lars Brubaker
// License: SGI Free Software License B (MIT-compatible)
//
// Animation curve: a keyframe set with its period, value type, range and
// interpolator.

use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use crate::error::{InterpolationError, InterpolationResult};
use crate::geom::Real;
use crate::interpolation::{auto_compute_derivatives, Neighbor, Segment};
use crate::interpolator::{bracket, ensure_iterator_in_period, inter_params, KeyFrameInterpolator};
use crate::keyframe::{KeyFrame, KeyFrameSet, KeyframeType, Period};

/// Type of the values a curve animates.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum CurveKind {
    #[default]
    Double,
    /// Values rounded to the nearest integer.
    Int,
    /// Values thresholded at 0.5.
    Bool,
    /// Values are indices into string keys; rounded like Int.
    String,
}

#[derive(Clone, Debug)]
pub struct Curve {
    keys: KeyFrameSet,
    period: Option<Period>,
    kind: CurveKind,
    y_range: (Real, Real),
    interpolator: KeyFrameInterpolator,
}

impl Default for Curve {
    fn default() -> Self {
        Self::new(CurveKind::Double)
    }
}

impl Curve {
    pub fn new(kind: CurveKind) -> Self {
        Self {
            keys: KeyFrameSet::new(),
            period: None,
            kind,
            y_range: (Real::NEG_INFINITY, Real::INFINITY),
            interpolator: KeyFrameInterpolator::Numeric,
        }
    }

    pub fn kind(&self) -> CurveKind {
        self.kind
    }

    pub fn keyframes(&self) -> &KeyFrameSet {
        &self.keys
    }

    pub fn is_animated(&self) -> bool {
        !self.keys.is_empty()
    }

    pub fn period(&self) -> Option<Period> {
        self.period
    }

    pub fn set_period(&mut self, period: Option<Period>) {
        self.period = period;
        self.refresh_derivatives();
    }

    pub fn y_range(&self) -> (Real, Real) {
        self.y_range
    }

    pub fn set_y_range(&mut self, min: Real, max: Real) {
        self.y_range = (min, max);
    }

    pub fn set_interpolator(&mut self, interpolator: KeyFrameInterpolator) {
        self.interpolator = interpolator;
    }

    fn has_y_range(&self) -> bool {
        self.y_range.0 != Real::NEG_INFINITY || self.y_range.1 != Real::INFINITY
    }

    fn clamp_to_range(&self, v: Real) -> Real {
        if v > self.y_range.1 {
            self.y_range.1
        } else if v < self.y_range.0 {
            self.y_range.0
        } else {
            v
        }
    }

    /// Inserts or replaces the key at `key.time`, then recomputes automatic
    /// derivatives. Returns the key index.
    pub fn set_keyframe(&mut self, key: KeyFrame) -> InterpolationResult<usize> {
        let idx = self.keys.insert(key)?;
        self.refresh_derivatives();
        Ok(idx)
    }

    pub fn remove_keyframe_at(&mut self, time: Real) -> Option<KeyFrame> {
        let removed = self.keys.remove_at_time(time)?;
        self.refresh_derivatives();
        Some(removed)
    }

    /// Recomputes the derivatives of every key not edited by the user.
    pub fn refresh_derivatives(&mut self) {
        for idx in 0..self.keys.len() {
            self.refresh_derivatives_at(idx);
        }
    }

    fn refresh_derivatives_at(&mut self, idx: usize) {
        let n = self.keys.len();
        let Some(cur) = self.keys.get(idx) else {
            return;
        };
        let wraps = self.period.filter(|_| n > 1);
        // Ends of a non-periodic curve next to an automatic key act linear.
        let end_type = |k: &KeyFrame, at_end: bool| {
            if wraps.is_none() && at_end && !k.interpolation.is_user_edited() {
                KeyframeType::Linear
            } else {
                k.interpolation
            }
        };

        let prev = if idx == 0 {
            match (wraps, self.keys.last()) {
                (Some(p), Some(last)) => Some(Neighbor {
                    time: last.time - p.length(),
                    ..Neighbor::before(last)
                }),
                _ => None,
            }
        } else {
            self.keys.get(idx - 1).map(|k| Neighbor {
                interpolation: end_type(k, idx - 1 == 0),
                ..Neighbor::before(k)
            })
        };

        let next = if idx + 1 == n {
            match (wraps, self.keys.first()) {
                (Some(p), Some(first)) => Some(Neighbor {
                    time: first.time + p.length(),
                    ..Neighbor::after(first)
                }),
                _ => None,
            }
        } else {
            self.keys.get(idx + 1).map(|k| Neighbor {
                interpolation: end_type(k, idx + 2 == n),
                ..Neighbor::after(k)
            })
        };

        let derivatives = auto_compute_derivatives(prev, cur.interpolation, cur.time, cur.value, next);
        if let (Some((left, right)), Some(key)) = (derivatives, self.keys.get_mut(idx)) {
            key.left_derivative = left;
            key.right_derivative = right;
        }
    }

    /// The key at `t` with its value clamped to the y range if `clamp` is
    /// set and rounded for integer-like curves. An empty curve is zero.
    #[instrument(level = "trace", skip(self))]
    pub fn value_at(&self, t: Real, clamp: bool) -> InterpolationResult<KeyFrame> {
        if self.keys.is_empty() {
            return Ok(KeyFrame::new(t, 0.0));
        }
        let mut key = self
            .interpolator
            .interpolate(t, self.keys.upper_bound(t), &self.keys, self.period)?;

        let mut v = key.value;
        if clamp {
            v = self.clamp_to_range(v);
        }
        v = match self.kind {
            CurveKind::Int | CurveKind::String => (v + 0.5).floor(),
            CurveKind::Bool => {
                if v >= 0.5 {
                    1.0
                } else {
                    0.0
                }
            }
            CurveKind::Double => v,
        };
        key.value = v;
        Ok(key)
    }

    pub fn derivative_at(&self, t: Real) -> InterpolationResult<Real> {
        let (t, cur, next) = inter_params(&self.keys, self.period, t, self.keys.upper_bound(t))?;
        let segment = Segment::new(&cur, &next);
        if self.has_y_range() {
            let v = segment.value_at(t);
            if v != self.clamp_to_range(v) {
                return Ok(0.0);
            }
        }
        Ok(segment.derivative_at(t))
    }

    /// Integral of the curve from `t1` to `t2`, negated when `t1 > t2`.
    /// A y range clamps the integrand as `value_at(t, true)` does.
    pub fn integrate(&self, t1: Real, t2: Real) -> InterpolationResult<Real> {
        let Some(first) = self.keys.first() else {
            return Err(InterpolationError::EmptyKeyFrames);
        };
        for t in [t1, t2] {
            if !t.is_finite() {
                return Err(InterpolationError::NonFiniteTime(t));
            }
        }
        let (lo, hi, sign) = if t1 > t2 { (t2, t1, -1.0) } else { (t1, t2, 1.0) };

        let sum = match self.period {
            None => self.integrate_native(lo, hi)?,
            Some(p) => {
                let len = p.length();
                let native_end = first.time + len;
                let whole = ((hi - lo) / len).floor();
                let rest = (hi - lo) - whole * len;
                let mut sum = 0.0;
                if whole > 0.0 {
                    sum += whole * self.integrate_native(first.time, native_end)?;
                }
                let (start, _) = ensure_iterator_in_period(p, &self.keys, lo)?;
                if start + rest <= native_end {
                    sum += self.integrate_native(start, start + rest)?;
                } else {
                    sum += self.integrate_native(start, native_end)?;
                    sum += self.integrate_native(first.time, first.time + (start + rest - native_end))?;
                }
                sum
            }
        };
        debug!(t1, t2, sum = sign * sum, "curve integrated");
        Ok(sign * sum)
    }

    /// Walks the segments covering `[a, b]`. Periodic curves expect the span
    /// inside the native period.
    fn integrate_native(&self, a: Real, b: Real) -> InterpolationResult<Real> {
        let mut sum = 0.0;
        let mut t = a;
        while t < b {
            let upper = self.keys.upper_bound(t);
            let (cur, next) = bracket(&self.keys, self.period, upper)?;
            let boundary = if upper == self.keys.len() && self.period.is_none() {
                Real::INFINITY
            } else {
                next.time
            };
            let seg_end = boundary.min(b);
            if seg_end <= t {
                break;
            }
            let segment = Segment::new(&cur, &next);
            sum += if self.has_y_range() {
                segment.integrate_clamped(t, seg_end, self.y_range.0, self.y_range.1)
            } else {
                segment.integrate(t, seg_end)
            };
            t = seg_end;
        }
        Ok(sum)
    }
}
