// Copyright 2025 Lars Brubaker
// License: SGI Free Software License B (MIT-compatible)
//
// Keyframe interpolation.
//
// `inter_params` finds the two keys bracketing a time, wrapping the time
// into the curve's native period first when the curve is periodic. Past
// the ends of a non-periodic curve one of the pair is a virtual key of type
// None, which makes the segment flat. The interpolator then either blends
// the pair numerically or hands string payloads to a host callback.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{instrument, trace};

use crate::error::{InterpolationError, InterpolationResult};
use crate::geom::Real;
use crate::interpolation::Segment;
use crate::keyframe::{KeyFrame, KeyFrameSet, KeyframeType, Period, CUSTOM_VALUE_PROPERTY};

pub const PROP_TIME: &str = "OfxPropTime";
pub const PROP_CUSTOM_VALUE: &str = CUSTOM_VALUE_PROPERTY;
pub const PROP_INTERPOLATION_TIME: &str = "OfxParamPropInterpolationTime";
pub const PROP_INTERPOLATION_AMOUNT: &str = "OfxParamPropInterpolationAmount";

// ─────────────────────────────── Bracketing ──────────────────────────────────

/// Wraps `t` into `[first key, first key + period)` and returns it with the
/// matching upper bound.
pub fn ensure_iterator_in_period(
    period: Period,
    keyframes: &KeyFrameSet,
    t: Real,
) -> InterpolationResult<(Real, usize)> {
    let first = keyframes.first().ok_or(InterpolationError::EmptyKeyFrames)?;
    if !t.is_finite() {
        return Err(InterpolationError::NonFiniteTime(t));
    }
    let len = period.length();
    let min_time = first.time;
    let mut wrapped = (t - min_time) % len + min_time;
    if wrapped < min_time {
        wrapped += len;
    }
    Ok((wrapped, keyframes.upper_bound(wrapped)))
}

fn check_upper_bound(keyframes: &KeyFrameSet, t: Real, upper: usize) -> InterpolationResult<()> {
    let above_ok = upper == keyframes.len() || keyframes.get(upper).is_some_and(|k| t < k.time);
    let below_ok = upper == 0 || keyframes.get(upper - 1).is_some_and(|k| k.time <= t);
    if above_ok && below_ok {
        Ok(())
    } else {
        Err(InterpolationError::InconsistentUpperBound { index: upper, time: t })
    }
}

/// Resolves the keys bracketing `t`. `upper` must be the index of the first
/// key with time greater than `t`; periodic curves recompute it after
/// wrapping. Returns the (possibly wrapped) time with the pair.
pub fn inter_params(
    keyframes: &KeyFrameSet,
    period: Option<Period>,
    t: Real,
    upper: usize,
) -> InterpolationResult<(Real, KeyFrame, KeyFrame)> {
    if keyframes.is_empty() {
        return Err(InterpolationError::EmptyKeyFrames);
    }
    if !t.is_finite() {
        return Err(InterpolationError::NonFiniteTime(t));
    }

    let (t, upper) = match period {
        Some(p) => ensure_iterator_in_period(p, keyframes, t)?,
        None => {
            check_upper_bound(keyframes, t, upper)?;
            (t, upper)
        }
    };
    let (k_cur, k_next) = bracket(keyframes, period, upper)?;
    Ok((t, k_cur, k_next))
}

/// The pair around upper bound `upper`, without wrapping.
pub(crate) fn bracket(
    keyframes: &KeyFrameSet,
    period: Option<Period>,
    upper: usize,
) -> InterpolationResult<(KeyFrame, KeyFrame)> {
    let (first, last) = match (keyframes.first(), keyframes.last()) {
        (Some(f), Some(l)) => (f, l),
        _ => return Err(InterpolationError::EmptyKeyFrames),
    };

    if upper == 0 {
        let k_next = first.clone();
        let k_cur = match period {
            Some(p) => {
                let mut k = last.clone();
                k.time -= p.length();
                k
            }
            None => {
                let mut k = k_next.clone();
                k.time -= 1.0;
                k.right_derivative = 0.0;
                k.interpolation = KeyframeType::None;
                k
            }
        };
        return Ok((k_cur, k_next));
    }

    if upper >= keyframes.len() {
        let k_cur = last.clone();
        let k_next = match period {
            Some(p) => {
                let mut k = first.clone();
                k.time += p.length();
                k
            }
            None => {
                let mut k = k_cur.clone();
                k.time += 1.0;
                k.left_derivative = 0.0;
                k.interpolation = KeyframeType::None;
                k
            }
        };
        return Ok((k_cur, k_next));
    }

    Ok((keyframes[upper - 1].clone(), keyframes[upper].clone()))
}

// ─────────────────────────────── Custom values ───────────────────────────────

/// Opaque handle of the parameter set a custom callback works for.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ParamSetHandle(pub u64);

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum PropertyValue {
    Double(Real),
    Int(i64),
    String(String),
}

/// Named, multi-dimensional properties exchanged with a custom callback.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct PropertySet {
    props: BTreeMap<String, Vec<PropertyValue>>,
}

impl PropertySet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, name: &str, index: usize, value: PropertyValue) {
        let values = self.props.entry(name.to_string()).or_default();
        if values.len() <= index {
            values.resize(index + 1, PropertyValue::Int(0));
        }
        values[index] = value;
    }

    pub fn set_double(&mut self, name: &str, index: usize, value: Real) {
        self.set(name, index, PropertyValue::Double(value));
    }

    pub fn set_string(&mut self, name: &str, index: usize, value: impl Into<String>) {
        self.set(name, index, PropertyValue::String(value.into()));
    }

    pub fn get(&self, name: &str, index: usize) -> Option<&PropertyValue> {
        self.props.get(name).and_then(|v| v.get(index))
    }

    pub fn get_double(&self, name: &str, index: usize) -> Option<Real> {
        match self.get(name, index)? {
            PropertyValue::Double(v) => Some(*v),
            PropertyValue::Int(v) => Some(*v as Real),
            PropertyValue::String(_) => None,
        }
    }

    pub fn get_string(&self, name: &str, index: usize) -> Option<&str> {
        match self.get(name, index)? {
            PropertyValue::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn dimension(&self, name: &str) -> usize {
        self.props.get(name).map_or(0, Vec::len)
    }
}

/// Host function blending two string payloads.
pub type CustomInterpolationFn =
    dyn Fn(&ParamSetHandle, &PropertySet, &mut PropertySet) -> Result<(), String> + Send + Sync;

#[derive(Clone)]
pub struct CustomStringInterpolator {
    handle: ParamSetHandle,
    callback: Arc<CustomInterpolationFn>,
}

impl fmt::Debug for CustomStringInterpolator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CustomStringInterpolator")
            .field("handle", &self.handle)
            .finish_non_exhaustive()
    }
}

impl CustomStringInterpolator {
    pub fn new<F>(handle: ParamSetHandle, callback: F) -> Self
    where
        F: Fn(&ParamSetHandle, &PropertySet, &mut PropertySet) -> Result<(), String> + Send + Sync + 'static,
    {
        Self {
            handle,
            callback: Arc::new(callback),
        }
    }

    fn interpolate(
        &self,
        t: Real,
        upper: usize,
        keyframes: &KeyFrameSet,
        period: Option<Period>,
    ) -> InterpolationResult<KeyFrame> {
        if keyframes.is_empty() {
            return Err(InterpolationError::EmptyKeyFrames);
        }
        let (t, upper) = match period {
            Some(p) => ensure_iterator_in_period(p, keyframes, t)?,
            None => {
                if !t.is_finite() {
                    return Err(InterpolationError::NonFiniteTime(t));
                }
                check_upper_bound(keyframes, t, upper)?;
                (t, upper)
            }
        };

        if let Some(idx) = keyframes.find(t) {
            return Ok(keyframes[idx].clone());
        }
        if upper == 0 {
            return Ok(keyframes[0].clone());
        }
        if upper == keyframes.len() {
            return Ok(keyframes[upper - 1].clone());
        }

        let lo = &keyframes[upper - 1];
        let hi = &keyframes[upper];
        let amount = (t - lo.time) / (hi.time - lo.time);

        let mut ins = PropertySet::new();
        ins.set_double(PROP_TIME, 0, t);
        ins.set_string(PROP_CUSTOM_VALUE, 0, lo.custom_value().unwrap_or_default());
        ins.set_string(PROP_CUSTOM_VALUE, 1, hi.custom_value().unwrap_or_default());
        ins.set_double(PROP_INTERPOLATION_TIME, 0, lo.time);
        ins.set_double(PROP_INTERPOLATION_TIME, 1, hi.time);
        ins.set_double(PROP_INTERPOLATION_AMOUNT, 0, amount);

        let mut outs = PropertySet::new();
        (self.callback)(&self.handle, &ins, &mut outs).map_err(InterpolationError::custom_callback)?;
        let value = outs
            .get_string(PROP_CUSTOM_VALUE, 0)
            .ok_or_else(|| InterpolationError::MissingCustomValue(PROP_CUSTOM_VALUE.to_string()))?;
        trace!(t, amount, "custom value interpolated");
        Ok(KeyFrame::with_custom_value(t, value))
    }
}

// ─────────────────────────────── Interpolator ────────────────────────────────

#[derive(Clone, Debug, Default)]
pub enum KeyFrameInterpolator {
    #[default]
    Numeric,
    CustomString(CustomStringInterpolator),
}

impl KeyFrameInterpolator {
    pub fn custom_string<F>(handle: ParamSetHandle, callback: F) -> Self
    where
        F: Fn(&ParamSetHandle, &PropertySet, &mut PropertySet) -> Result<(), String> + Send + Sync + 'static,
    {
        KeyFrameInterpolator::CustomString(CustomStringInterpolator::new(handle, callback))
    }

    /// The key at time `t`. `upper` is the index of the first key with time
    /// greater than `t`.
    ///
    /// Numeric curves return a copy of the lower bracketing key with the
    /// blended value; derivatives and interpolation type are not recomputed.
    #[instrument(level = "trace", skip(self, keyframes))]
    pub fn interpolate(
        &self,
        t: Real,
        upper: usize,
        keyframes: &KeyFrameSet,
        period: Option<Period>,
    ) -> InterpolationResult<KeyFrame> {
        match self {
            KeyFrameInterpolator::Numeric => {
                let (wrapped, k_cur, k_next) = inter_params(keyframes, period, t, upper)?;
                let value = Segment::new(&k_cur, &k_next).value_at(wrapped);
                let mut key = k_cur;
                key.time = t;
                key.value = value;
                Ok(key)
            }
            KeyFrameInterpolator::CustomString(custom) => custom.interpolate(t, upper, keyframes, period),
        }
    }
}
