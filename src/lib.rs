// roto-tess: roto shape triangulation and keyframe interpolation
// Copyright 2025 Lars Brubaker
// License: SGI Free Software License B (MIT-compatible)

pub mod curve;
pub mod dict;
pub mod error;
pub mod geom;
pub mod interpolation;
pub mod interpolator;
pub mod keyframe;
pub mod mesh;
pub mod priorityq;
pub mod render;
pub mod roto;
pub mod settings;
pub mod sweep;
pub mod tess;

pub use curve::{Curve, CurveKind};
pub use error::{
    InterpolationError, InterpolationResult, TessError, TessResult, TriangulationError, TriangulationResult,
};
pub use geom::Real;
pub use interpolator::{
    CustomInterpolationFn, CustomStringInterpolator, KeyFrameInterpolator, ParamSetHandle, PropertySet, PropertyValue,
};
pub use keyframe::{KeyFrame, KeyFrameSet, KeyframeType, Period};
pub use roto::{
    tesselate, BoundingBox, ControlPoint, CubicBezierShape, FeatherVertex, PolygonData, RenderScale, RotoShape, ViewIdx,
};
pub use settings::{DeCasteljauAlgorithm, TriangulationSettings};
pub use tess::{Orientation, PrimitiveKind, TessellationSink, Tessellator, WindingRule};
