// Copyright 2025 Lars Brubaker
// License: SGI Free Software License B (MIT-compatible)
//
// Primitive output.
//
// After the sweep every inside face is a triangle (or, in boundary mode, a
// closed contour). Triangles are grouped greedily: starting from each
// unrendered face the renderer measures the largest fan and the largest
// strip through three of its edges and emits the bigger one. Triangles that
// join no group are collected and emitted last as one triangle list.
//
// Single small contours skip the sweep entirely when they form a
// consistently oriented fan.

use serde::{Deserialize, Serialize};

use crate::geom::Real;
use crate::mesh::{sym, EdgeIdx, FaceIdx, Mesh, F_HEAD, INVALID};
use crate::tess::WindingRule;

/// Largest single contour eligible for direct fan output.
pub const MAX_CACHED_VERTICES: usize = 100;

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PrimitiveKind {
    Triangles,
    TriangleFan,
    TriangleStrip,
    LineLoop,
}

/// A primitive over vertex payload ids.
#[derive(Clone, Debug, PartialEq)]
pub struct Primitive {
    pub kind: PrimitiveKind,
    pub vertices: Vec<u32>,
}

impl Primitive {
    fn new(kind: PrimitiveKind) -> Self {
        Self {
            kind,
            vertices: Vec::new(),
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq)]
enum GroupKind {
    Triangle,
    Fan,
    Strip,
}

#[derive(Copy, Clone, Debug)]
struct FaceCount {
    size: i64,
    e_start: EdgeIdx,
    kind: GroupKind,
}

#[inline]
fn marked(mesh: &Mesh, f: FaceIdx) -> bool {
    let face = &mesh.faces[f as usize];
    !face.inside || face.marked
}

#[inline]
fn add_to_trail(mesh: &mut Mesh, f: FaceIdx, trail: &mut FaceIdx) {
    let face = &mut mesh.faces[f as usize];
    face.trail = *trail;
    face.marked = true;
    *trail = f;
}

fn free_trail(mesh: &mut Mesh, mut trail: FaceIdx) {
    while trail != INVALID {
        let face = &mut mesh.faces[trail as usize];
        face.marked = false;
        trail = face.trail;
    }
}

#[inline]
fn payload(mesh: &Mesh, e: EdgeIdx) -> u32 {
    mesh.verts[mesh.org(e) as usize].payload
}

/// Lnext->Sym
#[inline]
fn dprev(mesh: &Mesh, e: EdgeIdx) -> EdgeIdx {
    sym(mesh.lnext(e))
}

/// Emits every inside face of a triangulated mesh as fans, strips and a
/// trailing triangle list.
pub fn render_mesh(mesh: &mut Mesh) -> Vec<Primitive> {
    let mut out = Vec::new();
    let mut lonely = INVALID;

    for f in mesh.face_ids() {
        mesh.faces[f as usize].marked = false;
    }

    let mut f = mesh.faces[F_HEAD as usize].next;
    while f != F_HEAD {
        if mesh.faces[f as usize].inside && !mesh.faces[f as usize].marked {
            render_maximum_face_group(mesh, f, &mut lonely, &mut out);
        }
        f = mesh.faces[f as usize].next;
    }

    if lonely != INVALID {
        out.push(render_lonely_triangles(mesh, lonely));
    }
    out
}

/// Emits one line loop per inside face.
pub fn render_boundary(mesh: &Mesh) -> Vec<Primitive> {
    let mut out = Vec::new();
    let mut f = mesh.faces[F_HEAD as usize].next;
    while f != F_HEAD {
        if mesh.faces[f as usize].inside {
            let mut prim = Primitive::new(PrimitiveKind::LineLoop);
            let start = mesh.faces[f as usize].an_edge;
            let mut e = start;
            loop {
                prim.vertices.push(payload(mesh, e));
                e = mesh.lnext(e);
                if e == start {
                    break;
                }
            }
            out.push(prim);
        }
        f = mesh.faces[f as usize].next;
    }
    out
}

fn render_maximum_face_group(
    mesh: &mut Mesh,
    f_orig: FaceIdx,
    lonely: &mut FaceIdx,
    out: &mut Vec<Primitive>,
) {
    let e = mesh.faces[f_orig as usize].an_edge;
    let mut max = FaceCount {
        size: 1,
        e_start: e,
        kind: GroupKind::Triangle,
    };

    let candidates = [e, mesh.lnext(e), mesh.lprev(e)];
    for &c in &candidates {
        let fan = maximum_fan(mesh, c);
        if fan.size > max.size {
            max = fan;
        }
    }
    for &c in &candidates {
        let strip = maximum_strip(mesh, c);
        if strip.size > max.size {
            max = strip;
        }
    }

    match max.kind {
        GroupKind::Triangle => {
            let f = mesh.lface(max.e_start);
            add_to_trail(mesh, f, lonely);
        }
        GroupKind::Fan => out.push(render_fan(mesh, max.e_start)),
        GroupKind::Strip => out.push(render_strip(mesh, max.e_start)),
    }
}

fn maximum_fan(mesh: &mut Mesh, e_orig: EdgeIdx) -> FaceCount {
    let mut size = 0;
    let mut trail = INVALID;

    let mut e = e_orig;
    while !marked(mesh, mesh.lface(e)) {
        let f = mesh.lface(e);
        add_to_trail(mesh, f, &mut trail);
        size += 1;
        e = mesh.onext(e);
    }
    let mut e = e_orig;
    while !marked(mesh, mesh.rface(e)) {
        let f = mesh.rface(e);
        add_to_trail(mesh, f, &mut trail);
        size += 1;
        e = mesh.oprev(e);
    }
    free_trail(mesh, trail);

    FaceCount {
        size,
        e_start: e,
        kind: GroupKind::Fan,
    }
}

fn maximum_strip(mesh: &mut Mesh, e_orig: EdgeIdx) -> FaceCount {
    let mut tail_size: i64 = 0;
    let mut head_size: i64 = 0;
    let mut trail = INVALID;

    let mut e = e_orig;
    while !marked(mesh, mesh.lface(e)) {
        let f = mesh.lface(e);
        add_to_trail(mesh, f, &mut trail);
        tail_size += 1;
        e = dprev(mesh, e);
        if marked(mesh, mesh.lface(e)) {
            break;
        }
        let f = mesh.lface(e);
        add_to_trail(mesh, f, &mut trail);
        tail_size += 1;
        e = mesh.onext(e);
    }
    let e_tail = e;

    let mut e = e_orig;
    while !marked(mesh, mesh.rface(e)) {
        let f = mesh.rface(e);
        add_to_trail(mesh, f, &mut trail);
        head_size += 1;
        e = mesh.oprev(e);
        if marked(mesh, mesh.rface(e)) {
            break;
        }
        let f = mesh.rface(e);
        add_to_trail(mesh, f, &mut trail);
        head_size += 1;
        e = mesh.dnext(e);
    }
    let e_head = e;

    let mut size = tail_size + head_size;
    let e_start = if tail_size % 2 == 0 {
        sym(e_tail)
    } else if head_size % 2 == 0 {
        e_head
    } else {
        // Both sides odd: drop one triangle from the tail.
        size -= 1;
        mesh.onext(e_head)
    };
    free_trail(mesh, trail);

    FaceCount {
        size,
        e_start,
        kind: GroupKind::Strip,
    }
}

fn render_fan(mesh: &mut Mesh, mut e: EdgeIdx) -> Primitive {
    let mut prim = Primitive::new(PrimitiveKind::TriangleFan);
    prim.vertices.push(payload(mesh, e));
    prim.vertices.push(payload(mesh, sym(e)));

    while !marked(mesh, mesh.lface(e)) {
        let f = mesh.lface(e);
        mesh.faces[f as usize].marked = true;
        e = mesh.onext(e);
        prim.vertices.push(payload(mesh, sym(e)));
    }
    prim
}

fn render_strip(mesh: &mut Mesh, mut e: EdgeIdx) -> Primitive {
    let mut prim = Primitive::new(PrimitiveKind::TriangleStrip);
    prim.vertices.push(payload(mesh, e));
    prim.vertices.push(payload(mesh, sym(e)));

    while !marked(mesh, mesh.lface(e)) {
        let f = mesh.lface(e);
        mesh.faces[f as usize].marked = true;
        e = dprev(mesh, e);
        prim.vertices.push(payload(mesh, e));
        if marked(mesh, mesh.lface(e)) {
            break;
        }

        let f = mesh.lface(e);
        mesh.faces[f as usize].marked = true;
        e = mesh.onext(e);
        prim.vertices.push(payload(mesh, sym(e)));
    }
    prim
}

fn render_lonely_triangles(mesh: &Mesh, mut f: FaceIdx) -> Primitive {
    let mut prim = Primitive::new(PrimitiveKind::Triangles);
    while f != INVALID {
        let start = mesh.faces[f as usize].an_edge;
        let mut e = start;
        loop {
            prim.vertices.push(payload(mesh, e));
            e = mesh.lnext(e);
            if e == start {
                break;
            }
        }
        f = mesh.faces[f as usize].trail;
    }
    prim
}

/// Orientation of the fan around the first vertex: 1 or -1 when every
/// non-degenerate triangle agrees with `normal_z`, 0 when all are
/// degenerate, None when they disagree.
fn fan_sign(coords: &[[Real; 2]], normal_z: Real) -> Option<i32> {
    let v0 = coords[0];
    let mut sign = 0;
    let mut xc = coords[1][0] - v0[0];
    let mut yc = coords[1][1] - v0[1];
    for c in &coords[2..] {
        let (xp, yp) = (xc, yc);
        xc = c[0] - v0[0];
        yc = c[1] - v0[1];
        let dot = (xp * yc - yp * xc) * normal_z;
        if dot > 0.0 {
            if sign < 0 {
                return None;
            }
            sign = 1;
        } else if dot < 0.0 {
            if sign > 0 {
                return None;
            }
            sign = -1;
        }
    }
    Some(sign)
}

/// Normal accumulated over the fan so that every triangle adds to it.
fn fan_normal(coords: &[[Real; 2]]) -> Real {
    let v0 = coords[0];
    let mut norm = 0.0;
    let mut xc = coords[1][0] - v0[0];
    let mut yc = coords[1][1] - v0[1];
    for c in &coords[2..] {
        let (xp, yp) = (xc, yc);
        xc = c[0] - v0[0];
        yc = c[1] - v0[1];
        let n = xp * yc - yp * xc;
        if n * norm >= 0.0 {
            norm += n;
        } else {
            norm -= n;
        }
    }
    norm
}

/// Direct output for a single contour that is a convex-enough fan.
/// Returns None when the sweep is needed.
pub fn render_cache(
    coords: &[[Real; 2]],
    normal_z: Real,
    rule: WindingRule,
    boundary_only: bool,
) -> Option<Vec<Primitive>> {
    let n = coords.len();
    if n < 3 {
        return Some(Vec::new());
    }

    let normal_z = if normal_z == 0.0 {
        fan_normal(coords)
    } else {
        normal_z
    };

    let sign = fan_sign(coords, normal_z)?;
    if sign == 0 {
        return Some(Vec::new());
    }

    match rule {
        WindingRule::Odd | WindingRule::NonZero => {}
        WindingRule::Positive if sign < 0 => return Some(Vec::new()),
        WindingRule::Negative if sign > 0 => return Some(Vec::new()),
        WindingRule::Positive | WindingRule::Negative => {}
        WindingRule::AbsGeqTwo => return Some(Vec::new()),
    }

    let kind = if boundary_only {
        PrimitiveKind::LineLoop
    } else if n > 3 {
        PrimitiveKind::TriangleFan
    } else {
        PrimitiveKind::Triangles
    };
    let mut prim = Primitive::new(kind);
    prim.vertices.push(0);
    if sign > 0 {
        prim.vertices.extend(1..n as u32);
    } else {
        prim.vertices.extend((1..n as u32).rev());
    }
    Some(vec![prim])
}

#[cfg(test)]
mod tests {
    use super::*;

    const SQUARE: [[Real; 2]; 4] = [[0.0, 0.0], [1.0, 0.0], [1.0, 1.0], [0.0, 1.0]];

    #[test]
    fn convex_ccw_contour_is_a_fan() {
        let prims = render_cache(&SQUARE, 1.0, WindingRule::Odd, false).unwrap();
        assert_eq!(prims.len(), 1);
        assert_eq!(prims[0].kind, PrimitiveKind::TriangleFan);
        assert_eq!(prims[0].vertices, vec![0, 1, 2, 3]);
    }

    #[test]
    fn clockwise_fan_is_reversed_after_the_pivot() {
        let prims = render_cache(&SQUARE, -1.0, WindingRule::NonZero, false).unwrap();
        assert_eq!(prims[0].vertices, vec![0, 3, 2, 1]);
    }

    #[test]
    fn triangle_uses_a_triangle_list() {
        let prims = render_cache(&SQUARE[..3], 1.0, WindingRule::Odd, false).unwrap();
        assert_eq!(prims[0].kind, PrimitiveKind::Triangles);
    }

    #[test]
    fn winding_rule_filters_cached_output() {
        assert!(render_cache(&SQUARE, -1.0, WindingRule::Positive, false)
            .unwrap()
            .is_empty());
        assert!(render_cache(&SQUARE, 1.0, WindingRule::Negative, false)
            .unwrap()
            .is_empty());
        assert!(render_cache(&SQUARE, 1.0, WindingRule::AbsGeqTwo, false)
            .unwrap()
            .is_empty());
    }

    #[test]
    fn boundary_mode_emits_a_line_loop() {
        let prims = render_cache(&SQUARE, 1.0, WindingRule::Positive, true).unwrap();
        assert_eq!(prims[0].kind, PrimitiveKind::LineLoop);
    }

    #[test]
    fn concave_contour_needs_the_sweep() {
        let arrow = [[0.0, 0.0], [2.0, 1.0], [0.0, 2.0], [1.0, 1.0]];
        assert!(render_cache(&arrow, 1.0, WindingRule::Odd, false).is_none());
    }

    #[test]
    fn collinear_contour_has_no_output() {
        let line = [[0.0, 0.0], [1.0, 0.0], [2.0, 0.0]];
        assert!(render_cache(&line, 1.0, WindingRule::Odd, false)
            .unwrap()
            .is_empty());
    }
}
