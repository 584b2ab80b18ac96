// Copyright 2025 Lars Brubaker
// License: SGI Free Software License B (MIT-compatible)

use crate::geom::Real;

pub type TessResult<T> = Result<T, TessError>;
pub type TriangulationResult<T> = Result<T, TriangulationError>;
pub type InterpolationResult<T> = Result<T, InterpolationError>;

/// Errors reported by the tessellation kernel.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum TessError {
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("coordinate {value} is outside [-{limit}, {limit}]")]
    CoordinateOutOfRange { value: Real, limit: Real },

    #[error("vertex budget exceeded: {count} vertices, limit {limit}")]
    BudgetExceeded { count: usize, limit: usize },

    #[error("mesh topology error: {0}")]
    Topology(String),
}

impl TessError {
    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }

    pub fn topology(msg: impl Into<String>) -> Self {
        Self::Topology(msg.into())
    }
}

/// Errors reported while turning a roto shape into a mesh.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum TriangulationError {
    #[error("empty polygon: {0}")]
    EmptyPolygon(String),

    #[error("segment count mismatch: shape has {shape} segments, feather has {feather}")]
    SegmentCountMismatch { shape: usize, feather: usize },

    #[error(transparent)]
    Tessellation(#[from] TessError),

    #[error("contour inconsistency: {0}")]
    ContourInconsistency(String),

    #[error("generated point ({x}, {y}) lies outside the input bounding box")]
    GeneratedPointOutOfBounds { x: Real, y: Real },

    #[error("parametric time is not monotonic at index {index}: {previous} > {current}")]
    NonMonotonicParametricTime {
        index: usize,
        previous: Real,
        current: Real,
    },

    #[error("polygon budget exceeded: {count} points, limit {limit}")]
    BudgetExceeded { count: usize, limit: usize },

    #[error("evaluation error: {0}")]
    Evaluation(String),

    #[error("invalid settings: {0}")]
    InvalidSettings(String),
}

impl TriangulationError {
    pub fn empty_polygon(msg: impl Into<String>) -> Self {
        Self::EmptyPolygon(msg.into())
    }

    pub fn contour_inconsistency(msg: impl Into<String>) -> Self {
        Self::ContourInconsistency(msg.into())
    }

    pub fn evaluation(msg: impl Into<String>) -> Self {
        Self::Evaluation(msg.into())
    }

    pub fn invalid_settings(msg: impl Into<String>) -> Self {
        Self::InvalidSettings(msg.into())
    }
}

/// Errors reported by keyframe interpolation.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum InterpolationError {
    #[error("keyframe set is empty")]
    EmptyKeyFrames,

    #[error("invalid period [{x_min}, {x_max}): x_min must be strictly less than x_max")]
    InvalidPeriod { x_min: Real, x_max: Real },

    #[error("upper bound {index} is inconsistent with time {time}")]
    InconsistentUpperBound { index: usize, time: Real },

    #[error("time is not finite: {0}")]
    NonFiniteTime(Real),

    #[error("custom interpolation callback failed: {0}")]
    CustomCallback(String),

    #[error("custom interpolation callback returned no value for {0}")]
    MissingCustomValue(String),
}

impl InterpolationError {
    pub fn custom_callback(msg: impl Into<String>) -> Self {
        Self::CustomCallback(msg.into())
    }
}
