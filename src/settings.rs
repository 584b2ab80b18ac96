// Copyright 2025 Lars Brubaker
// License: SGI Free Software License B (MIT-compatible)
//
// Triangulation options.

use serde::{Deserialize, Serialize};

use crate::error::{TriangulationError, TriangulationResult};
use crate::geom::Real;

/// Point cap for one discretized outline when `max_polygon_points` is unset.
pub const DEFAULT_MAX_POLYGON_POINTS: usize = 1 << 24;

/// How Bezier segments are discretized.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeCasteljauAlgorithm {
    /// Evenly spaced parameter steps.
    #[default]
    Iterative,
    /// Adaptive subdivision until segments are flat enough.
    Recursive,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TriangulationSettings {
    pub algorithm: DeCasteljauAlgorithm,
    /// Points per Bezier segment for the iterative algorithm. `None` derives
    /// it from the segment length.
    pub points_per_segment: Option<usize>,
    /// Larger values make the recursive algorithm subdivide further.
    pub error_scale: Real,
    /// Upper bound on the discretized points of either polygon.
    /// `None` falls back to [`DEFAULT_MAX_POLYGON_POINTS`].
    pub max_polygon_points: Option<usize>,
    /// Upper bound on the vertices of a single tessellation, crossings included.
    pub max_tessellation_vertices: Option<usize>,
}

impl Default for TriangulationSettings {
    fn default() -> Self {
        Self {
            algorithm: DeCasteljauAlgorithm::Iterative,
            points_per_segment: None,
            error_scale: 1.0,
            max_polygon_points: None,
            max_tessellation_vertices: None,
        }
    }
}

impl TriangulationSettings {
    pub fn from_json(json: &str) -> TriangulationResult<Self> {
        let settings: Self =
            serde_json::from_str(json).map_err(|e| TriangulationError::invalid_settings(e.to_string()))?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn to_json(&self) -> TriangulationResult<String> {
        serde_json::to_string_pretty(self).map_err(|e| TriangulationError::invalid_settings(e.to_string()))
    }

    pub fn polygon_point_limit(&self) -> usize {
        self.max_polygon_points.unwrap_or(DEFAULT_MAX_POLYGON_POINTS)
    }

    pub fn validate(&self) -> TriangulationResult<()> {
        if !(self.error_scale > 0.0 && self.error_scale.is_finite()) {
            return Err(TriangulationError::invalid_settings(format!(
                "error_scale must be positive, got {}",
                self.error_scale
            )));
        }
        if self.points_per_segment.is_some_and(|n| n < 2) {
            return Err(TriangulationError::invalid_settings(
                "points_per_segment must be at least 2",
            ));
        }
        Ok(())
    }
}
