// Copyright 2025 Lars Brubaker
// License: SGI Free Software License B (MIT-compatible)
//
// Half-edge mesh used by the sweep.
//
// The structure follows the Guibas/Stolfi quad-edge idea restricted to the
// plane. Pointers are u32 indices into Vec arenas; deleted elements are
// unlinked from their list and never reused.
//
//   - INVALID (u32::MAX) plays the role of a null link.
//   - Half-edges are allocated in pairs: sym(e) == e ^ 1.
//   - verts[0], faces[0] and edges[0..2] are list heads, never real elements.
//   - The global edge list only links even edges; the "prev" link of an
//     even edge is stored in the `next` field of its odd twin.

use crate::geom::{edge_sign, vert_leq, Pos};

pub const INVALID: u32 = u32::MAX;

pub type VertIdx = u32;
pub type FaceIdx = u32;
pub type EdgeIdx = u32;

pub const V_HEAD: VertIdx = 0;
pub const F_HEAD: FaceIdx = 0;
pub const E_HEAD: EdgeIdx = 0;
pub const E_HEAD_SYM: EdgeIdx = 1;

#[inline(always)]
pub fn sym(e: EdgeIdx) -> EdgeIdx {
    e ^ 1
}

#[derive(Clone, Debug)]
pub struct Vertex {
    pub next: VertIdx,
    pub prev: VertIdx,
    /// A half-edge with this vertex as origin.
    pub an_edge: EdgeIdx,
    pub pos: Pos,
    /// Index of the client payload carried by this vertex.
    pub payload: u32,
    /// Key under which the vertex sits in the event queue, if queued.
    pub queued: Option<Pos>,
}

impl Default for Vertex {
    fn default() -> Self {
        Self {
            next: INVALID,
            prev: INVALID,
            an_edge: INVALID,
            pos: Pos::default(),
            payload: INVALID,
            queued: None,
        }
    }
}

#[derive(Clone, Debug)]
pub struct Face {
    pub next: FaceIdx,
    pub prev: FaceIdx,
    pub an_edge: EdgeIdx,
    /// Stack link used while the renderer grows a fan or strip.
    pub trail: FaceIdx,
    pub marked: bool,
    pub inside: bool,
}

impl Default for Face {
    fn default() -> Self {
        Self {
            next: INVALID,
            prev: INVALID,
            an_edge: INVALID,
            trail: INVALID,
            marked: false,
            inside: false,
        }
    }
}

#[derive(Clone, Debug)]
pub struct HalfEdge {
    pub next: EdgeIdx,
    /// Next edge CCW around the origin.
    pub onext: EdgeIdx,
    /// Next edge CCW around the left face.
    pub lnext: EdgeIdx,
    pub org: VertIdx,
    pub lface: FaceIdx,
    /// Region of the edge dictionary whose upper edge this is.
    pub active_region: u32,
    /// Change in winding number when crossing from the right face to the left.
    pub winding: i32,
}

impl Default for HalfEdge {
    fn default() -> Self {
        Self {
            next: INVALID,
            onext: INVALID,
            lnext: INVALID,
            org: INVALID,
            lface: INVALID,
            active_region: INVALID,
            winding: 0,
        }
    }
}

pub struct Mesh {
    pub verts: Vec<Vertex>,
    pub faces: Vec<Face>,
    pub edges: Vec<HalfEdge>,
}

impl Default for Mesh {
    fn default() -> Self {
        Self::new()
    }
}

impl Mesh {
    pub fn new() -> Self {
        let v_head = Vertex {
            next: V_HEAD,
            prev: V_HEAD,
            ..Vertex::default()
        };
        let f_head = Face {
            next: F_HEAD,
            prev: F_HEAD,
            ..Face::default()
        };
        let e_head = HalfEdge {
            next: E_HEAD,
            ..HalfEdge::default()
        };
        let e_head_sym = HalfEdge {
            next: E_HEAD_SYM,
            ..HalfEdge::default()
        };
        Mesh {
            verts: vec![v_head],
            faces: vec![f_head],
            edges: vec![e_head, e_head_sym],
        }
    }

    // ───────────────────────────── Navigation ─────────────────────────────

    #[inline]
    pub fn org(&self, e: EdgeIdx) -> VertIdx {
        self.edges[e as usize].org
    }

    #[inline]
    pub fn dst(&self, e: EdgeIdx) -> VertIdx {
        self.edges[sym(e) as usize].org
    }

    #[inline]
    pub fn onext(&self, e: EdgeIdx) -> EdgeIdx {
        self.edges[e as usize].onext
    }

    #[inline]
    pub fn lnext(&self, e: EdgeIdx) -> EdgeIdx {
        self.edges[e as usize].lnext
    }

    #[inline]
    pub fn lface(&self, e: EdgeIdx) -> FaceIdx {
        self.edges[e as usize].lface
    }

    #[inline]
    pub fn rface(&self, e: EdgeIdx) -> FaceIdx {
        self.edges[sym(e) as usize].lface
    }

    /// Sym->Lnext
    #[inline]
    pub fn oprev(&self, e: EdgeIdx) -> EdgeIdx {
        self.edges[sym(e) as usize].lnext
    }

    /// Onext->Sym
    #[inline]
    pub fn lprev(&self, e: EdgeIdx) -> EdgeIdx {
        sym(self.edges[e as usize].onext)
    }

    /// Sym->Onext
    #[inline]
    pub fn rprev(&self, e: EdgeIdx) -> EdgeIdx {
        self.edges[sym(e) as usize].onext
    }

    /// Rprev->Sym
    #[inline]
    pub fn dnext(&self, e: EdgeIdx) -> EdgeIdx {
        sym(self.edges[sym(e) as usize].onext)
    }

    #[inline]
    pub fn pos(&self, v: VertIdx) -> Pos {
        self.verts[v as usize].pos
    }

    #[inline]
    pub fn org_pos(&self, e: EdgeIdx) -> Pos {
        self.pos(self.org(e))
    }

    #[inline]
    pub fn dst_pos(&self, e: EdgeIdx) -> Pos {
        self.pos(self.dst(e))
    }

    #[inline]
    pub fn edge_goes_left(&self, e: EdgeIdx) -> bool {
        vert_leq(self.dst_pos(e), self.org_pos(e))
    }

    #[inline]
    pub fn edge_goes_right(&self, e: EdgeIdx) -> bool {
        vert_leq(self.org_pos(e), self.dst_pos(e))
    }

    /// Adds the winding of `src` (and its twin) to `dst`.
    pub fn add_winding(&mut self, dst: EdgeIdx, src: EdgeIdx) {
        let w = self.edges[src as usize].winding;
        let ws = self.edges[sym(src) as usize].winding;
        self.edges[dst as usize].winding += w;
        self.edges[sym(dst) as usize].winding += ws;
    }

    /// Iterates the live (even) edges of the global edge list.
    pub fn edge_ids(&self) -> Vec<EdgeIdx> {
        let mut out = Vec::new();
        let mut e = self.edges[E_HEAD as usize].next;
        while e != E_HEAD {
            out.push(e);
            e = self.edges[e as usize].next;
        }
        out
    }

    /// Iterates the live vertices of the global vertex list.
    pub fn vertex_ids(&self) -> Vec<VertIdx> {
        let mut out = Vec::new();
        let mut v = self.verts[V_HEAD as usize].next;
        while v != V_HEAD {
            out.push(v);
            v = self.verts[v as usize].next;
        }
        out
    }

    /// Iterates the live faces of the global face list.
    pub fn face_ids(&self) -> Vec<FaceIdx> {
        let mut out = Vec::new();
        let mut f = self.faces[F_HEAD as usize].next;
        while f != F_HEAD {
            out.push(f);
            f = self.faces[f as usize].next;
        }
        out
    }

    // ───────────────────────── Allocation helpers ─────────────────────────

    /// New edge pair inserted before `e_next` in the global edge list.
    fn make_edge_pair(&mut self, e_next: EdgeIdx) -> EdgeIdx {
        let e_next = e_next & !1;
        let e_new = self.edges.len() as EdgeIdx;
        let e_sym = sym(e_new);

        let e_prev = self.edges[sym(e_next) as usize].next;
        self.edges.push(HalfEdge {
            next: e_next,
            onext: e_new,
            lnext: e_sym,
            ..HalfEdge::default()
        });
        self.edges.push(HalfEdge {
            next: e_prev,
            onext: e_sym,
            lnext: e_new,
            ..HalfEdge::default()
        });
        self.edges[sym(e_prev) as usize].next = e_new;
        self.edges[sym(e_next) as usize].next = e_sym;
        e_new
    }

    /// New vertex inserted before `v_next`; every edge around `e_orig`'s
    /// origin ring is re-pointed to it.
    fn make_vertex(&mut self, e_orig: EdgeIdx, v_next: VertIdx) -> VertIdx {
        let v_new = self.verts.len() as VertIdx;
        let v_prev = self.verts[v_next as usize].prev;
        self.verts.push(Vertex {
            next: v_next,
            prev: v_prev,
            an_edge: e_orig,
            ..Vertex::default()
        });
        self.verts[v_prev as usize].next = v_new;
        self.verts[v_next as usize].prev = v_new;

        let mut e = e_orig;
        loop {
            self.edges[e as usize].org = v_new;
            e = self.edges[e as usize].onext;
            if e == e_orig {
                break;
            }
        }
        v_new
    }

    /// New face inserted before `f_next`. It inherits `inside` from `f_next`,
    /// which is what a face split in two wants.
    fn make_face(&mut self, e_orig: EdgeIdx, f_next: FaceIdx) -> FaceIdx {
        let f_new = self.faces.len() as FaceIdx;
        let f_prev = self.faces[f_next as usize].prev;
        let inside = self.faces[f_next as usize].inside;
        self.faces.push(Face {
            next: f_next,
            prev: f_prev,
            an_edge: e_orig,
            inside,
            ..Face::default()
        });
        self.faces[f_prev as usize].next = f_new;
        self.faces[f_next as usize].prev = f_new;

        let mut e = e_orig;
        loop {
            self.edges[e as usize].lface = f_new;
            e = self.edges[e as usize].lnext;
            if e == e_orig {
                break;
            }
        }
        f_new
    }

    fn kill_vertex(&mut self, v_del: VertIdx, new_org: VertIdx) {
        let e_start = self.verts[v_del as usize].an_edge;
        let mut e = e_start;
        loop {
            self.edges[e as usize].org = new_org;
            e = self.edges[e as usize].onext;
            if e == e_start {
                break;
            }
        }
        let prev = self.verts[v_del as usize].prev;
        let next = self.verts[v_del as usize].next;
        self.verts[next as usize].prev = prev;
        self.verts[prev as usize].next = next;
        let v = &mut self.verts[v_del as usize];
        v.next = INVALID;
        v.prev = INVALID;
        v.an_edge = INVALID;
    }

    fn kill_face(&mut self, f_del: FaceIdx, new_lface: FaceIdx) {
        let e_start = self.faces[f_del as usize].an_edge;
        let mut e = e_start;
        loop {
            self.edges[e as usize].lface = new_lface;
            e = self.edges[e as usize].lnext;
            if e == e_start {
                break;
            }
        }
        let prev = self.faces[f_del as usize].prev;
        let next = self.faces[f_del as usize].next;
        self.faces[next as usize].prev = prev;
        self.faces[prev as usize].next = next;
        let f = &mut self.faces[f_del as usize];
        f.next = INVALID;
        f.prev = INVALID;
        f.an_edge = INVALID;
    }

    fn kill_edge(&mut self, e_del: EdgeIdx) {
        let e_del = e_del & !1;
        let e_next = self.edges[e_del as usize].next;
        let e_prev = self.edges[sym(e_del) as usize].next;
        self.edges[sym(e_next) as usize].next = e_prev;
        self.edges[sym(e_prev) as usize].next = e_next;
        self.edges[e_del as usize].next = INVALID;
        self.edges[sym(e_del) as usize].next = INVALID;
    }

    /// Exchanges a->Onext and b->Onext, fixing the Lnext links.
    fn splice_rings(&mut self, a: EdgeIdx, b: EdgeIdx) {
        let a_onext = self.edges[a as usize].onext;
        let b_onext = self.edges[b as usize].onext;
        self.edges[sym(a_onext) as usize].lnext = b;
        self.edges[sym(b_onext) as usize].lnext = a;
        self.edges[a as usize].onext = b_onext;
        self.edges[b as usize].onext = a_onext;
    }

    // ───────────────────────── Public operations ──────────────────────────

    /// One edge, two vertices and a single loop.
    pub fn make_edge(&mut self) -> EdgeIdx {
        let e = self.make_edge_pair(E_HEAD);
        self.make_vertex(e, V_HEAD);
        self.make_vertex(sym(e), V_HEAD);
        self.make_face(e, F_HEAD);
        e
    }

    /// The basic connectivity operation. Exchanges eOrg->Onext and
    /// eDst->Onext. Two distinct origins are merged (eDst's origin dies) or
    /// one origin is split in two; likewise for the left faces.
    pub fn splice(&mut self, e_org: EdgeIdx, e_dst: EdgeIdx) {
        if e_org == e_dst {
            return;
        }
        let mut joining_vertices = false;
        let mut joining_loops = false;

        if self.org(e_dst) != self.org(e_org) {
            joining_vertices = true;
            self.kill_vertex(self.org(e_dst), self.org(e_org));
        }
        if self.lface(e_dst) != self.lface(e_org) {
            joining_loops = true;
            self.kill_face(self.lface(e_dst), self.lface(e_org));
        }

        self.splice_rings(e_dst, e_org);

        if !joining_vertices {
            let org = self.org(e_org);
            self.make_vertex(e_dst, org);
            self.verts[org as usize].an_edge = e_org;
        }
        if !joining_loops {
            let lface = self.lface(e_org);
            self.make_face(e_dst, lface);
            self.faces[lface as usize].an_edge = e_org;
        }
    }

    /// Removes edge `e_del`, merging or splitting faces and dropping
    /// vertices left without edges.
    pub fn delete_edge(&mut self, e_del: EdgeIdx) {
        let e_del_sym = sym(e_del);
        let mut joining_loops = false;

        if self.lface(e_del) != self.rface(e_del) {
            joining_loops = true;
            self.kill_face(self.lface(e_del), self.rface(e_del));
        }

        if self.onext(e_del) == e_del {
            self.kill_vertex(self.org(e_del), INVALID);
        } else {
            let rface = self.rface(e_del);
            self.faces[rface as usize].an_edge = self.oprev(e_del);
            let org = self.org(e_del);
            self.verts[org as usize].an_edge = self.onext(e_del);

            self.splice_rings(e_del, self.oprev(e_del));
            if !joining_loops {
                let lface = self.lface(e_del);
                self.make_face(e_del, lface);
            }
        }

        if self.onext(e_del_sym) == e_del_sym {
            self.kill_vertex(self.org(e_del_sym), INVALID);
            self.kill_face(self.lface(e_del_sym), INVALID);
        } else {
            let lface = self.lface(e_del);
            self.faces[lface as usize].an_edge = self.oprev(e_del_sym);
            let org = self.org(e_del_sym);
            self.verts[org as usize].an_edge = self.onext(e_del_sym);
            self.splice_rings(e_del_sym, self.oprev(e_del_sym));
        }

        self.kill_edge(e_del);
    }

    /// New edge eNew = eOrg->Lnext whose destination is a new vertex.
    pub fn add_edge_vertex(&mut self, e_org: EdgeIdx) -> EdgeIdx {
        let e_new = self.make_edge_pair(e_org);
        let e_new_sym = sym(e_new);

        self.splice_rings(e_new, self.lnext(e_org));
        let org = self.dst(e_org);
        self.edges[e_new as usize].org = org;
        self.make_vertex(e_new_sym, org);

        let lface = self.lface(e_org);
        self.edges[e_new as usize].lface = lface;
        self.edges[e_new_sym as usize].lface = lface;
        e_new
    }

    /// Splits eOrg in two at a new vertex; returns the second half, which
    /// is eOrg->Lnext afterwards. The new vertex has no position yet.
    pub fn split_edge(&mut self, e_org: EdgeIdx) -> EdgeIdx {
        let e_new = sym(self.add_edge_vertex(e_org));
        let e_org_sym = sym(e_org);

        self.splice_rings(e_org_sym, self.oprev(e_org_sym));
        self.splice_rings(e_org_sym, e_new);

        let mid = self.org(e_new);
        self.edges[e_org_sym as usize].org = mid;
        let far = self.dst(e_new);
        self.verts[far as usize].an_edge = sym(e_new);
        let rface = self.rface(e_org);
        self.edges[sym(e_new) as usize].lface = rface;
        self.edges[e_new as usize].winding = self.edges[e_org as usize].winding;
        self.edges[sym(e_new) as usize].winding = self.edges[e_org_sym as usize].winding;
        e_new
    }

    /// New edge from eOrg->Dst to eDst->Org. When both share a left face
    /// the face is split and the new loop is eNew->Lface.
    pub fn connect(&mut self, e_org: EdgeIdx, e_dst: EdgeIdx) -> EdgeIdx {
        let e_new = self.make_edge_pair(e_org);
        let e_new_sym = sym(e_new);
        let mut joining_loops = false;

        if self.lface(e_dst) != self.lface(e_org) {
            joining_loops = true;
            self.kill_face(self.lface(e_dst), self.lface(e_org));
        }

        self.splice_rings(e_new, self.lnext(e_org));
        self.splice_rings(e_new_sym, e_dst);

        self.edges[e_new as usize].org = self.dst(e_org);
        self.edges[e_new_sym as usize].org = self.org(e_dst);
        let lface = self.lface(e_org);
        self.edges[e_new as usize].lface = lface;
        self.edges[e_new_sym as usize].lface = lface;
        self.faces[lface as usize].an_edge = e_new_sym;

        if !joining_loops {
            self.make_face(e_new, lface);
        }
        e_new
    }

    // ──────────────────────── Post-sweep passes ───────────────────────────

    /// Boundary extraction: edges between an inside and an outside face get
    /// winding `±value`; the rest get 0 or, with `keep_only_boundary`, are
    /// deleted so that inside faces merge into one loop per contour.
    pub fn set_winding_number(&mut self, value: i32, keep_only_boundary: bool) {
        let mut e = self.edges[E_HEAD as usize].next;
        while e != E_HEAD {
            let e_next = self.edges[e as usize].next;
            let l_inside = self.face_inside(self.lface(e));
            let r_inside = self.face_inside(self.rface(e));
            if l_inside != r_inside {
                self.edges[e as usize].winding = if l_inside { value } else { -value };
            } else if !keep_only_boundary {
                self.edges[e as usize].winding = 0;
            } else {
                self.delete_edge(e);
            }
            e = e_next;
        }
    }

    #[inline]
    fn face_inside(&self, f: FaceIdx) -> bool {
        f != INVALID && self.faces[f as usize].inside
    }

    /// Triangulates one x-monotone face by walking its upper and lower
    /// chains from right to left and cutting off every convex corner.
    pub fn tessellate_mono_region(&mut self, face: FaceIdx) {
        let mut up = self.faces[face as usize].an_edge;
        debug_assert!(self.lnext(up) != up && self.lnext(self.lnext(up)) != up);

        while vert_leq(self.dst_pos(up), self.org_pos(up)) {
            up = self.lprev(up);
        }
        while vert_leq(self.org_pos(up), self.dst_pos(up)) {
            up = self.lnext(up);
        }
        let mut lo = self.lprev(up);

        while self.lnext(up) != lo {
            if vert_leq(self.dst_pos(up), self.org_pos(lo)) {
                // up->Dst is on the left: fan from lo->Org.
                while self.lnext(lo) != up
                    && (self.edge_goes_left(self.lnext(lo))
                        || edge_sign(
                            self.org_pos(lo),
                            self.dst_pos(lo),
                            self.dst_pos(self.lnext(lo)),
                        ) <= 0.0)
                {
                    let e = self.connect(self.lnext(lo), lo);
                    lo = sym(e);
                }
                lo = self.lprev(lo);
            } else {
                // lo->Org is on the left: fan from up->Dst.
                while self.lnext(lo) != up
                    && (self.edge_goes_right(self.lprev(up))
                        || edge_sign(
                            self.dst_pos(up),
                            self.org_pos(up),
                            self.org_pos(self.lprev(up)),
                        ) >= 0.0)
                {
                    let e = self.connect(up, self.lprev(up));
                    up = sym(e);
                }
                up = self.lnext(up);
            }
        }

        // lo->Org == up->Dst is now the leftmost vertex: finish with a fan.
        debug_assert!(self.lnext(lo) != up);
        while self.lnext(self.lnext(lo)) != up {
            let e = self.connect(self.lnext(lo), lo);
            lo = sym(e);
        }
    }

    /// Triangulates every inside face. Faces created along the way are
    /// inserted before the current one and so are not revisited.
    pub fn tessellate_interior(&mut self) {
        let mut f = self.faces[F_HEAD as usize].next;
        while f != F_HEAD {
            let next = self.faces[f as usize].next;
            if self.faces[f as usize].inside {
                self.tessellate_mono_region(f);
            }
            f = next;
        }
    }

    /// Number of edges around the left face of `e`.
    pub fn loop_len(&self, e: EdgeIdx) -> usize {
        let mut n = 0;
        let mut cur = e;
        loop {
            n += 1;
            cur = self.lnext(cur);
            if cur == e {
                break;
            }
        }
        n
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn make_edge_builds_a_two_sided_loop() {
        let mut m = Mesh::new();
        let e = m.make_edge();
        assert_eq!(m.onext(e), e);
        assert_eq!(m.lnext(e), sym(e));
        assert_ne!(m.org(e), m.dst(e));
        assert_eq!(m.lface(e), m.rface(e));
        assert_eq!(m.vertex_ids().len(), 2);
        assert_eq!(m.face_ids().len(), 1);
        assert_eq!(m.edge_ids(), vec![e]);
    }

    #[test]
    fn sym_is_an_involution() {
        for e in [2u32, 3, 10, 11] {
            assert_eq!(sym(sym(e)), e);
            assert_ne!(sym(e), e);
        }
    }

    /// Builds a closed loop the same way contour input does.
    fn triangle(m: &mut Mesh) -> EdgeIdx {
        let mut e = INVALID;
        for p in [(0.0, 0.0), (1.0, 0.0), (0.0, 1.0)] {
            if e == INVALID {
                e = m.make_edge();
                m.splice(e, sym(e));
            } else {
                m.split_edge(e);
                e = m.lnext(e);
            }
            let v = m.org(e);
            m.verts[v as usize].pos = Pos::new(p.0, p.1);
        }
        e
    }

    #[test]
    fn contour_loop_has_two_faces_and_three_edges() {
        let mut m = Mesh::new();
        let e = triangle(&mut m);
        assert_eq!(m.vertex_ids().len(), 3);
        assert_eq!(m.edge_ids().len(), 3);
        assert_eq!(m.face_ids().len(), 2);
        assert_eq!(m.loop_len(e), 3);
        assert_ne!(m.lface(e), m.rface(e));
    }

    #[test]
    fn connect_splits_a_face() {
        let mut m = Mesh::new();
        let e = triangle(&mut m);
        let faces_before = m.face_ids().len();
        let e2 = m.connect(e, m.lprev(e));
        assert_eq!(m.face_ids().len(), faces_before + 1);
        m.delete_edge(e2);
        assert_eq!(m.face_ids().len(), faces_before);
        assert_eq!(m.loop_len(e), 3);
    }

    #[test]
    fn vertex_list_stays_circular() {
        let mut m = Mesh::new();
        triangle(&mut m);
        let ids = m.vertex_ids();
        let last = *ids.last().unwrap_or(&V_HEAD);
        assert_eq!(m.verts[last as usize].next, V_HEAD);
        assert_eq!(m.verts[V_HEAD as usize].prev, last);
    }
}
