// Copyright 2025 Lars Brubaker
// License: SGI Free Software License B (MIT-compatible)
//
// Keyframes and ordered keyframe sets.

use std::collections::BTreeMap;
use std::ops::Index;

use serde::{Deserialize, Serialize};

use crate::error::{InterpolationError, InterpolationResult};
use crate::geom::Real;

/// Property holding the string payload of a custom-valued key.
pub const CUSTOM_VALUE_PROPERTY: &str = "OfxParamPropCustomValue";

/// How the curve behaves on the segments entering and leaving a key.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum KeyframeType {
    /// Virtual key past the ends of a non-periodic curve.
    None,
    Constant,
    Linear,
    #[default]
    Smooth,
    CatmullRom,
    Cubic,
    Horizontal,
    /// Tangents set by the user, kept joined.
    Free,
    /// Tangents set by the user, left and right independent.
    Broken,
}

impl KeyframeType {
    /// True for keys whose derivatives are never recomputed.
    pub fn is_user_edited(self) -> bool {
        matches!(self, KeyframeType::Free | KeyframeType::Broken)
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct KeyFrame {
    pub time: Real,
    pub value: Real,
    #[serde(default)]
    pub left_derivative: Real,
    #[serde(default)]
    pub right_derivative: Real,
    #[serde(default)]
    pub interpolation: KeyframeType,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub properties: BTreeMap<String, String>,
}

impl KeyFrame {
    pub fn new(time: Real, value: Real) -> Self {
        Self {
            time,
            value,
            left_derivative: 0.0,
            right_derivative: 0.0,
            interpolation: KeyframeType::default(),
            properties: BTreeMap::new(),
        }
    }

    /// A key carrying a string payload.
    pub fn with_custom_value(time: Real, value: impl Into<String>) -> Self {
        let mut key = Self::new(time, 0.0);
        key.set_custom_value(value);
        key
    }

    pub fn with_interpolation(mut self, interpolation: KeyframeType) -> Self {
        self.interpolation = interpolation;
        self
    }

    pub fn with_derivatives(mut self, left: Real, right: Real) -> Self {
        self.left_derivative = left;
        self.right_derivative = right;
        self
    }

    pub fn custom_value(&self) -> Option<&str> {
        self.properties.get(CUSTOM_VALUE_PROPERTY).map(String::as_str)
    }

    pub fn set_custom_value(&mut self, value: impl Into<String>) {
        self.properties
            .insert(CUSTOM_VALUE_PROPERTY.to_string(), value.into());
    }
}

/// Keys ordered by time, at most one per time.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<KeyFrame>", into = "Vec<KeyFrame>")]
pub struct KeyFrameSet {
    keys: Vec<KeyFrame>,
}

impl KeyFrameSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_keys<I>(keys: I) -> InterpolationResult<Self>
    where
        I: IntoIterator<Item = KeyFrame>,
    {
        let mut set = Self::new();
        for key in keys {
            set.insert(key)?;
        }
        Ok(set)
    }

    /// Inserts `key`, replacing any key at the same time. Returns its index.
    pub fn insert(&mut self, key: KeyFrame) -> InterpolationResult<usize> {
        if !key.time.is_finite() {
            return Err(InterpolationError::NonFiniteTime(key.time));
        }
        let idx = self.lower_bound(key.time);
        if self.keys.get(idx).is_some_and(|k| k.time == key.time) {
            self.keys[idx] = key;
        } else {
            self.keys.insert(idx, key);
        }
        Ok(idx)
    }

    pub fn remove_at_time(&mut self, time: Real) -> Option<KeyFrame> {
        let idx = self.find(time)?;
        Some(self.keys.remove(idx))
    }

    pub fn remove(&mut self, idx: usize) -> Option<KeyFrame> {
        (idx < self.keys.len()).then(|| self.keys.remove(idx))
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    pub fn first(&self) -> Option<&KeyFrame> {
        self.keys.first()
    }

    pub fn last(&self) -> Option<&KeyFrame> {
        self.keys.last()
    }

    pub fn get(&self, idx: usize) -> Option<&KeyFrame> {
        self.keys.get(idx)
    }

    pub(crate) fn get_mut(&mut self, idx: usize) -> Option<&mut KeyFrame> {
        self.keys.get_mut(idx)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, KeyFrame> {
        self.keys.iter()
    }

    /// Index of the first key with time strictly greater than `t`.
    pub fn upper_bound(&self, t: Real) -> usize {
        self.keys.partition_point(|k| k.time <= t)
    }

    /// Index of the first key with time not less than `t`.
    pub fn lower_bound(&self, t: Real) -> usize {
        self.keys.partition_point(|k| k.time < t)
    }

    /// Index of the key at exactly `t`.
    pub fn find(&self, t: Real) -> Option<usize> {
        let idx = self.lower_bound(t);
        self.keys.get(idx).filter(|k| k.time == t).map(|_| idx)
    }
}

impl Index<usize> for KeyFrameSet {
    type Output = KeyFrame;

    fn index(&self, idx: usize) -> &KeyFrame {
        &self.keys[idx]
    }
}

impl<'a> IntoIterator for &'a KeyFrameSet {
    type Item = &'a KeyFrame;
    type IntoIter = std::slice::Iter<'a, KeyFrame>;

    fn into_iter(self) -> Self::IntoIter {
        self.keys.iter()
    }
}

impl TryFrom<Vec<KeyFrame>> for KeyFrameSet {
    type Error = InterpolationError;

    fn try_from(keys: Vec<KeyFrame>) -> Result<Self, Self::Error> {
        Self::from_keys(keys)
    }
}

impl From<KeyFrameSet> for Vec<KeyFrame> {
    fn from(set: KeyFrameSet) -> Self {
        set.keys
    }
}

/// Domain `[x_min, x_max)` of a periodic curve.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "(Real, Real)", into = "(Real, Real)")]
pub struct Period {
    x_min: Real,
    x_max: Real,
}

impl Period {
    pub fn new(x_min: Real, x_max: Real) -> InterpolationResult<Self> {
        // Also rejects NaN bounds.
        if !(x_min < x_max) || !(x_max - x_min).is_finite() {
            return Err(InterpolationError::InvalidPeriod { x_min, x_max });
        }
        Ok(Self { x_min, x_max })
    }

    pub fn x_min(&self) -> Real {
        self.x_min
    }

    pub fn x_max(&self) -> Real {
        self.x_max
    }

    pub fn length(&self) -> Real {
        self.x_max - self.x_min
    }
}

impl TryFrom<(Real, Real)> for Period {
    type Error = InterpolationError;

    fn try_from((x_min, x_max): (Real, Real)) -> Result<Self, Self::Error> {
        Self::new(x_min, x_max)
    }
}

impl From<Period> for (Real, Real) {
    fn from(p: Period) -> Self {
        (p.x_min, p.x_max)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set(times: &[Real]) -> KeyFrameSet {
        KeyFrameSet::from_keys(times.iter().map(|&t| KeyFrame::new(t, t * 2.0))).unwrap()
    }

    #[test]
    fn keys_are_sorted_and_unique() {
        let mut keys = set(&[5.0, 1.0, 3.0]);
        let times: Vec<_> = keys.iter().map(|k| k.time).collect();
        assert_eq!(times, vec![1.0, 3.0, 5.0]);

        let idx = keys.insert(KeyFrame::new(3.0, 42.0)).unwrap();
        assert_eq!(idx, 1);
        assert_eq!(keys.len(), 3);
        assert_eq!(keys[1].value, 42.0);
    }

    #[test]
    fn bounds_and_lookup() {
        let keys = set(&[0.0, 10.0, 20.0]);
        assert_eq!(keys.upper_bound(-1.0), 0);
        assert_eq!(keys.upper_bound(0.0), 1);
        assert_eq!(keys.upper_bound(15.0), 2);
        assert_eq!(keys.upper_bound(20.0), 3);
        assert_eq!(keys.lower_bound(10.0), 1);
        assert_eq!(keys.find(10.0), Some(1));
        assert_eq!(keys.find(10.5), None);
    }

    #[test]
    fn non_finite_times_are_rejected() {
        let mut keys = KeyFrameSet::new();
        assert_eq!(
            keys.insert(KeyFrame::new(Real::NAN, 0.0)).map_err(|e| e.to_string()).unwrap_err(),
            "time is not finite: NaN"
        );
        assert!(keys.is_empty());
    }

    #[test]
    fn period_must_be_strictly_increasing() {
        assert!(Period::new(0.0, 10.0).is_ok());
        assert_eq!(
            Period::new(3.0, 3.0),
            Err(InterpolationError::InvalidPeriod { x_min: 3.0, x_max: 3.0 })
        );
        assert!(Period::new(Real::NAN, 1.0).is_err());
        assert_eq!(Period::new(-2.0, 6.0).unwrap().length(), 8.0);
    }

    #[test]
    fn custom_value_lives_in_properties() {
        let mut key = KeyFrame::with_custom_value(2.0, "hello");
        assert_eq!(key.custom_value(), Some("hello"));
        key.set_custom_value("world");
        assert_eq!(key.properties.len(), 1);
        assert_eq!(key.custom_value(), Some("world"));
    }

    #[test]
    fn keyframe_set_json_rejects_bad_time_and_sorts() {
        let keys: KeyFrameSet =
            serde_json::from_str(r#"[{"time": 4.0, "value": 1.0}, {"time": 2.0, "value": 0.5}]"#).unwrap();
        assert_eq!(keys[0].time, 2.0);
        assert_eq!(keys[0].interpolation, KeyframeType::Smooth);

        let period: Result<Period, _> = serde_json::from_str("[5.0, 1.0]");
        assert!(period.is_err());
    }
}
