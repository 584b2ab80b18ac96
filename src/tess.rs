// Copyright 2025 Lars Brubaker
// License: SGI Free Software License B (MIT-compatible)
//
// Public tessellator API.
//
// Contours are collected with begin_contour / add_vertex / end_contour and
// consumed by `tessellate`, which reports its output to a TessellationSink:
// combined vertices first (one `combine` call per coincident pair or edge
// crossing, in creation order), then every primitive bracketed by
// begin_primitive / end_primitive.

use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use crate::error::{TessError, TessResult};
use crate::geom::{Pos, Real};
use crate::mesh::{sym, Mesh, INVALID};
use crate::render::{render_boundary, render_cache, render_mesh, Primitive, MAX_CACHED_VERTICES};
use crate::sweep::{Sweep, VertexRecord};

pub use crate::render::PrimitiveKind;

/// Largest accepted coordinate magnitude.
pub const MAX_COORD: Real = 1e150;

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum WindingRule {
    #[default]
    Odd,
    NonZero,
    Positive,
    Negative,
    AbsGeqTwo,
}

impl WindingRule {
    #[inline]
    pub fn is_inside(self, n: i32) -> bool {
        match self {
            WindingRule::Odd => n & 1 != 0,
            WindingRule::NonZero => n != 0,
            WindingRule::Positive => n > 0,
            WindingRule::Negative => n < 0,
            WindingRule::AbsGeqTwo => n >= 2 || n <= -2,
        }
    }
}

/// Which way the plane normal points. Winding numbers count
/// counter-clockwise turns around the normal.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Orientation {
    /// Picked so that the total signed area of the input is non-negative.
    #[default]
    Auto,
    /// Normal (0, 0, 1).
    CounterClockwise,
    /// Normal (0, 0, -1).
    Clockwise,
}

impl Orientation {
    pub fn from_normal_z(z: Real) -> Self {
        if z > 0.0 {
            Orientation::CounterClockwise
        } else if z < 0.0 {
            Orientation::Clockwise
        } else {
            Orientation::Auto
        }
    }

    pub fn normal_z(self) -> Real {
        match self {
            Orientation::Auto => 0.0,
            Orientation::CounterClockwise => 1.0,
            Orientation::Clockwise => -1.0,
        }
    }
}

/// Receives the output of a tessellation.
pub trait TessellationSink<D> {
    fn begin_primitive(&mut self, kind: PrimitiveKind);

    fn end_primitive(&mut self);

    fn vertex(&mut self, data: D);

    /// Creates the payload of a vertex the tessellator introduced. Two
    /// sources with weight 0.5 each mean coincident input vertices; four
    /// sources mean a crossing, the first two weighting the upper edge and
    /// the last two the lower one.
    fn combine(&mut self, coords: [Real; 2], sources: &[(D, Real)]) -> D;

    fn error(&mut self, _err: &TessError) {}
}

#[derive(Clone, Debug)]
struct InputVertex<D> {
    coords: [Real; 2],
    data: D,
}

pub struct Tessellator<D> {
    contours: Vec<Vec<InputVertex<D>>>,
    contour_open: bool,
    winding_rule: WindingRule,
    boundary_only: bool,
    orientation: Orientation,
    max_vertices: Option<usize>,
}

impl<D: Clone> Default for Tessellator<D> {
    fn default() -> Self {
        Self::new()
    }
}

impl<D: Clone> Tessellator<D> {
    pub fn new() -> Self {
        Tessellator {
            contours: Vec::new(),
            contour_open: false,
            winding_rule: WindingRule::Odd,
            boundary_only: false,
            orientation: Orientation::Auto,
            max_vertices: None,
        }
    }

    pub fn winding_rule(&self) -> WindingRule {
        self.winding_rule
    }

    pub fn set_winding_rule(&mut self, rule: WindingRule) {
        self.winding_rule = rule;
    }

    /// Output closed boundary loops instead of triangles.
    pub fn set_boundary_only(&mut self, boundary_only: bool) {
        self.boundary_only = boundary_only;
    }

    pub fn set_orientation(&mut self, orientation: Orientation) {
        self.orientation = orientation;
    }

    /// Sets the plane normal (0, 0, z). A zero `z` picks it automatically.
    pub fn set_normal(&mut self, z: Real) {
        self.orientation = Orientation::from_normal_z(z);
    }

    /// Caps the number of vertices, input and generated together.
    pub fn set_max_vertices(&mut self, max: Option<usize>) {
        self.max_vertices = max;
    }

    pub fn begin_contour(&mut self) {
        self.contours.push(Vec::new());
        self.contour_open = true;
    }

    pub fn add_vertex(&mut self, x: Real, y: Real, data: D) -> TessResult<()> {
        for c in [x, y] {
            if !c.is_finite() || c.abs() > MAX_COORD {
                return Err(TessError::CoordinateOutOfRange {
                    value: c,
                    limit: MAX_COORD,
                });
            }
        }
        if !self.contour_open {
            self.begin_contour();
        }
        if let Some(contour) = self.contours.last_mut() {
            contour.push(InputVertex {
                coords: [x, y],
                data,
            });
        }
        Ok(())
    }

    pub fn end_contour(&mut self) {
        self.contour_open = false;
    }

    /// Adds a closed contour in one call.
    pub fn add_contour<I>(&mut self, vertices: I) -> TessResult<()>
    where
        I: IntoIterator<Item = ([Real; 2], D)>,
    {
        self.begin_contour();
        for ([x, y], data) in vertices {
            if let Err(err) = self.add_vertex(x, y, data) {
                self.end_contour();
                return Err(err);
            }
        }
        self.end_contour();
        Ok(())
    }

    /// Number of vertices added since the last tessellation.
    pub fn vertex_count(&self) -> usize {
        self.contours.iter().map(Vec::len).sum()
    }

    /// Tessellates every contour added so far and reports the result to
    /// `sink`. The contours are consumed; options are kept.
    #[instrument(level = "debug", skip_all, fields(rule = ?self.winding_rule, boundary_only = self.boundary_only))]
    pub fn tessellate<S>(&mut self, sink: &mut S) -> TessResult<()>
    where
        S: TessellationSink<D> + ?Sized,
    {
        self.contour_open = false;
        let contours: Vec<_> = std::mem::take(&mut self.contours)
            .into_iter()
            .filter(|c| !c.is_empty())
            .collect();
        let total: usize = contours.iter().map(Vec::len).sum();

        if let Some(limit) = self.max_vertices {
            if total > limit {
                let err = TessError::BudgetExceeded {
                    count: total,
                    limit,
                };
                sink.error(&err);
                return Err(err);
            }
        }

        let normal_z = self.orientation.normal_z();
        if contours.len() == 1 && total <= MAX_CACHED_VERTICES {
            let coords: Vec<[Real; 2]> = contours[0].iter().map(|v| v.coords).collect();
            if let Some(prims) = render_cache(&coords, normal_z, self.winding_rule, self.boundary_only) {
                let data: Vec<D> = contours[0].iter().map(|v| v.data.clone()).collect();
                debug!(vertices = total, primitives = prims.len(), "single contour rendered directly");
                emit(sink, &prims, &data);
                return Ok(());
            }
        }

        let flip = match self.orientation {
            Orientation::CounterClockwise => false,
            Orientation::Clockwise => true,
            Orientation::Auto => signed_area(&contours) < 0.0,
        };

        let mut mesh = Mesh::new();
        let mut records = Vec::with_capacity(total);
        let mut data = Vec::with_capacity(total);
        for contour in &contours {
            let mut e = INVALID;
            for v in contour {
                if e == INVALID {
                    e = mesh.make_edge();
                    mesh.splice(e, sym(e));
                } else {
                    mesh.split_edge(e);
                    e = mesh.lnext(e);
                }
                let org = mesh.org(e);
                let t = if flip { -v.coords[1] } else { v.coords[1] };
                let vert = &mut mesh.verts[org as usize];
                vert.pos = Pos::new(v.coords[0], t);
                vert.payload = records.len() as u32;
                records.push(VertexRecord::client(v.coords));
                data.push(v.data.clone());

                mesh.edges[e as usize].winding = 1;
                mesh.edges[sym(e) as usize].winding = -1;
            }
        }

        let sweep = Sweep::new(&mut mesh, &mut records, self.winding_rule, self.max_vertices);
        if let Err(err) = sweep.compute_interior() {
            sink.error(&err);
            return Err(err);
        }

        let n_inputs = data.len();
        for record in &records[n_inputs..] {
            let sources: Vec<(D, Real)> = record
                .sources
                .iter()
                .filter_map(|&(id, w)| data.get(id as usize).map(|d| (d.clone(), w)))
                .collect();
            let combined = sink.combine(record.coords, &sources);
            data.push(combined);
        }

        let prims = if self.boundary_only {
            mesh.set_winding_number(1, true);
            render_boundary(&mesh)
        } else {
            mesh.tessellate_interior();
            render_mesh(&mut mesh)
        };

        debug!(
            contours = contours.len(),
            vertices = total,
            combined = records.len() - n_inputs,
            primitives = prims.len(),
            "tessellation finished"
        );
        emit(sink, &prims, &data);
        Ok(())
    }
}

fn emit<D, S>(sink: &mut S, prims: &[Primitive], data: &[D])
where
    D: Clone,
    S: TessellationSink<D> + ?Sized,
{
    for prim in prims {
        if prim.vertices.is_empty() {
            continue;
        }
        sink.begin_primitive(prim.kind);
        for &id in &prim.vertices {
            if let Some(d) = data.get(id as usize) {
                sink.vertex(d.clone());
            }
        }
        sink.end_primitive();
    }
}

/// Sum of the signed areas of all contours, positive when counter-clockwise.
fn signed_area<D>(contours: &[Vec<InputVertex<D>>]) -> Real {
    let mut area = 0.0;
    for contour in contours {
        let n = contour.len();
        for i in 0..n {
            let a = contour[i].coords;
            let b = contour[(i + 1) % n].coords;
            area += a[0] * b[1] - b[0] * a[1];
        }
    }
    area * 0.5
}
