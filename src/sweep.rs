// Copyright 2025 Lars Brubaker
// License: SGI Free Software License B (MIT-compatible)
//
// Sweep-line computation of the polygon interior.
//
// The sweep line moves in the direction of increasing s. Every edge that
// crosses it sits in the edge dictionary, ordered bottom to top, and each
// dictionary entry owns the active region directly below its edge. Regions
// carry a winding number; when a region closes at an event vertex, its face
// is marked inside or outside according to the winding rule.
//
// Coincident vertices and edge crossings create new vertex records. A
// record keeps the (record, weight) pairs it was combined from so that the
// caller can resolve it into client data once the sweep is over.

use tracing::trace;

use crate::dict::{Dict, NodeIdx};
use crate::error::{TessError, TessResult};
use crate::geom::{edge_eval, edge_intersect, edge_sign, vert_eq, vert_l1_dist, vert_leq, Pos, Real};
use crate::mesh::{sym, EdgeIdx, Mesh, VertIdx, E_HEAD, F_HEAD, INVALID};
use crate::priorityq::EventQueue;
use crate::tess::WindingRule;

pub type RegionIdx = u32;

/// The area between two adjacent edges crossing the sweep line.
#[derive(Clone, Debug)]
pub struct ActiveRegion {
    /// Upper edge, directed right to left.
    pub e_up: EdgeIdx,
    pub node_up: NodeIdx,
    pub winding_number: i32,
    pub inside: bool,
    /// Fake edge at t = ±infinity.
    pub sentinel: bool,
    /// Upper or lower edge changed; ordering and intersections need a check.
    pub dirty: bool,
    /// Temporary edge added for a vertex without right-going edges.
    pub fix_upper_edge: bool,
}

impl ActiveRegion {
    fn new(e_up: EdgeIdx) -> Self {
        Self {
            e_up,
            node_up: INVALID,
            winding_number: 0,
            inside: false,
            sentinel: false,
            dirty: false,
            fix_upper_edge: false,
        }
    }
}

/// Where the payload of a mesh vertex comes from.
#[derive(Clone, Debug, PartialEq)]
pub struct VertexRecord {
    pub coords: [Real; 2],
    /// Empty for client vertices, (record, weight) pairs for combined ones.
    pub sources: Vec<(u32, Real)>,
}

impl VertexRecord {
    pub fn client(coords: [Real; 2]) -> Self {
        Self {
            coords,
            sources: Vec::new(),
        }
    }

    pub fn is_combined(&self) -> bool {
        !self.sources.is_empty()
    }
}

/// Edge order at the current event: e1 <= e2.
///
/// Both edges are directed right to left. When an edge ends at the event the
/// comparison is against the event itself, otherwise both edges are
/// evaluated at the sweep position of the event.
fn edge_leq(mesh: &Mesh, event: VertIdx, e1: EdgeIdx, e2: EdgeIdx) -> bool {
    let ev = mesh.pos(event);
    let e1_org = mesh.org_pos(e1);
    let e2_org = mesh.org_pos(e2);

    if mesh.dst(e1) == event {
        if mesh.dst(e2) == event {
            if vert_leq(e1_org, e2_org) {
                return edge_sign(mesh.dst_pos(e2), e1_org, e2_org) <= 0.0;
            }
            return edge_sign(mesh.dst_pos(e1), e2_org, e1_org) >= 0.0;
        }
        return edge_sign(mesh.dst_pos(e2), ev, e2_org) <= 0.0;
    }
    if mesh.dst(e2) == event {
        return edge_sign(mesh.dst_pos(e1), ev, e1_org) >= 0.0;
    }
    let t1 = edge_eval(mesh.dst_pos(e1), ev, e1_org);
    let t2 = edge_eval(mesh.dst_pos(e2), ev, e2_org);
    t1 >= t2
}

/// Weights of `org` and `dst` for a point `isect` on the edge between them.
/// Together they sum to one half.
fn vertex_weights(isect: Pos, org: Pos, dst: Pos) -> (Real, Real) {
    let t1 = vert_l1_dist(org, isect);
    let t2 = vert_l1_dist(dst, isect);
    if t1 + t2 == 0.0 {
        return (0.25, 0.25);
    }
    (0.5 * t2 / (t1 + t2), 0.5 * t1 / (t1 + t2))
}

pub struct Sweep<'a> {
    mesh: &'a mut Mesh,
    records: &'a mut Vec<VertexRecord>,
    rule: WindingRule,
    max_records: Option<usize>,
    dict: Dict,
    regions: Vec<ActiveRegion>,
    pq: EventQueue,
    event: VertIdx,
    over_budget: bool,
}

impl<'a> Sweep<'a> {
    pub fn new(
        mesh: &'a mut Mesh,
        records: &'a mut Vec<VertexRecord>,
        rule: WindingRule,
        max_records: Option<usize>,
    ) -> Self {
        Sweep {
            mesh,
            records,
            rule,
            max_records,
            dict: Dict::new(),
            regions: Vec::new(),
            pq: EventQueue::new(),
            event: INVALID,
            over_budget: false,
        }
    }

    /// Computes the planar arrangement of all contours and marks every face
    /// inside or outside. Afterwards each inside face is x-monotone.
    pub fn compute_interior(mut self) -> TessResult<()> {
        self.remove_degenerate_edges();

        let verts = self.mesh.vertex_ids();
        if verts.is_empty() {
            return Ok(());
        }
        let mut bmin = self.mesh.pos(verts[0]);
        let mut bmax = bmin;
        for &v in &verts {
            let p = self.mesh.pos(v);
            bmin.s = bmin.s.min(p.s);
            bmin.t = bmin.t.min(p.t);
            bmax.s = bmax.s.max(p.s);
            bmax.t = bmax.t.max(p.t);
            self.queue(v);
        }
        self.init_edge_dict(bmin, bmax);

        while let Some(v) = self.pq.extract_min() {
            self.mesh.verts[v as usize].queued = None;
            // Coincident vertices are merged before the event is processed.
            while let Some(next) = self.pq.minimum() {
                if !vert_eq(self.mesh.pos(next), self.mesh.pos(v)) {
                    break;
                }
                self.pq.extract_min();
                self.mesh.verts[next as usize].queued = None;
                let e1 = self.mesh.verts[v as usize].an_edge;
                let e2 = self.mesh.verts[next as usize].an_edge;
                self.splice_merge_vertices(e1, e2);
            }
            self.sweep_event(v);

            if self.over_budget {
                let limit = self.max_records.unwrap_or(0);
                return Err(TessError::BudgetExceeded {
                    count: self.records.len(),
                    limit,
                });
            }
        }

        self.done_edge_dict();
        self.remove_degenerate_faces();
        Ok(())
    }

    // ─────────────────────────── Regions ──────────────────────────────────

    #[inline]
    fn e_up(&self, r: RegionIdx) -> EdgeIdx {
        self.regions[r as usize].e_up
    }

    #[inline]
    fn region_below(&self, r: RegionIdx) -> RegionIdx {
        let node = self.dict.pred(self.regions[r as usize].node_up);
        self.dict.key(node)
    }

    #[inline]
    fn region_above(&self, r: RegionIdx) -> RegionIdx {
        let node = self.dict.succ(self.regions[r as usize].node_up);
        self.dict.key(node)
    }

    #[inline]
    fn is_dirty(&self, r: RegionIdx) -> bool {
        r != INVALID && self.regions[r as usize].dirty
    }

    #[inline]
    fn is_fixable(&self, r: RegionIdx) -> bool {
        self.regions[r as usize].fix_upper_edge
    }

    fn add_region_below(&mut self, reg_above: RegionIdx, e_new_up: EdgeIdx) -> RegionIdx {
        let idx = self.regions.len() as RegionIdx;
        self.regions.push(ActiveRegion::new(e_new_up));
        let start = self.regions[reg_above as usize].node_up;

        let mesh = &*self.mesh;
        let regions = &self.regions;
        let event = self.event;
        let node = self.dict.insert_before(start, idx, |k| {
            edge_leq(mesh, event, regions[k as usize].e_up, e_new_up)
        });

        self.regions[idx as usize].node_up = node;
        self.mesh.edges[e_new_up as usize].active_region = idx;
        idx
    }

    fn delete_region(&mut self, r: RegionIdx) {
        let e = self.e_up(r);
        self.mesh.edges[e as usize].active_region = INVALID;
        self.dict.delete(self.regions[r as usize].node_up);
    }

    fn compute_winding(&mut self, r: RegionIdx) {
        let above = self.region_above(r);
        let w = self.regions[above as usize].winding_number
            + self.mesh.edges[self.e_up(r) as usize].winding;
        let reg = &mut self.regions[r as usize];
        reg.winding_number = w;
        reg.inside = self.rule.is_inside(w);
    }

    /// Replaces a temporary upper edge with a real one.
    fn fix_upper_edge(&mut self, r: RegionIdx, new_edge: EdgeIdx) {
        let old = self.e_up(r);
        self.mesh.delete_edge(old);
        let reg = &mut self.regions[r as usize];
        reg.fix_upper_edge = false;
        reg.e_up = new_edge;
        self.mesh.edges[new_edge as usize].active_region = r;
    }

    /// Topmost region whose upper edge leaves the same origin as `r`'s. A
    /// temporary edge found above it is first replaced by a real one.
    fn top_left_region(&mut self, r: RegionIdx) -> RegionIdx {
        let org = self.mesh.org(self.e_up(r));
        let mut reg = r;
        loop {
            reg = self.region_above(reg);
            if self.mesh.org(self.e_up(reg)) != org {
                break;
            }
        }

        if self.is_fixable(reg) {
            let below = self.region_below(reg);
            let a = sym(self.e_up(below));
            let b = self.mesh.lnext(self.e_up(reg));
            let e = self.mesh.connect(a, b);
            self.fix_upper_edge(reg, e);
            reg = self.region_above(reg);
        }
        reg
    }

    fn top_right_region(&self, r: RegionIdx) -> RegionIdx {
        let dst = self.mesh.dst(self.e_up(r));
        let mut reg = r;
        loop {
            reg = self.region_above(reg);
            if self.mesh.dst(self.e_up(reg)) != dst {
                return reg;
            }
        }
    }

    /// Closes a region: its face takes the region's inside flag.
    fn finish_region(&mut self, r: RegionIdx) {
        let e = self.e_up(r);
        let f = self.mesh.lface(e);
        let face = &mut self.mesh.faces[f as usize];
        face.inside = self.regions[r as usize].inside;
        face.an_edge = e;
        self.delete_region(r);
    }

    /// Finishes the regions from `reg_first` down to (not including)
    /// `reg_last`, all of which close at the event. With `reg_last` INVALID
    /// it goes as far down as possible. Returns the lowest left-going edge.
    fn finish_left_regions(&mut self, reg_first: RegionIdx, reg_last: RegionIdx) -> EdgeIdx {
        let mut reg_prev = reg_first;
        let mut e_prev = self.e_up(reg_first);

        while reg_prev != reg_last {
            self.regions[reg_prev as usize].fix_upper_edge = false;
            let reg = self.region_below(reg_prev);
            let mut e = self.e_up(reg);

            if self.mesh.org(e) != self.mesh.org(e_prev) {
                if !self.is_fixable(reg) {
                    self.finish_region(reg_prev);
                    break;
                }
                // The temporary edge of `reg` is replaced by one ending at
                // the event.
                let a = self.mesh.lprev(e_prev);
                e = self.mesh.connect(a, sym(e));
                self.fix_upper_edge(reg, e);
            }

            if self.mesh.onext(e_prev) != e {
                let a = self.mesh.oprev(e);
                self.mesh.splice(a, e);
                self.mesh.splice(e_prev, e);
            }
            self.finish_region(reg_prev);
            e_prev = self.e_up(reg);
            reg_prev = reg;
        }
        e_prev
    }

    /// Adds the right-going edges `e_first..e_last` (an Onext range) below
    /// `reg_up` and computes the winding of the new regions. `e_top_left`
    /// is the edge just above them, or INVALID to take it from the
    /// dictionary.
    fn add_right_edges(
        &mut self,
        reg_up: RegionIdx,
        e_first: EdgeIdx,
        e_last: EdgeIdx,
        e_top_left: EdgeIdx,
        clean_up: bool,
    ) {
        let mut e = e_first;
        loop {
            self.add_region_below(reg_up, sym(e));
            e = self.mesh.onext(e);
            if e == e_last {
                break;
            }
        }

        let e_top_left = if e_top_left == INVALID {
            let below = self.region_below(reg_up);
            self.mesh.rprev(self.e_up(below))
        } else {
            e_top_left
        };

        let mut reg_prev = reg_up;
        let mut e_prev = e_top_left;
        let mut first_time = true;
        loop {
            let reg = self.region_below(reg_prev);
            let e = sym(self.e_up(reg));
            if self.mesh.org(e) != self.mesh.org(e_prev) {
                break;
            }

            if self.mesh.onext(e) != e_prev {
                // Unlink e from its ring and relink it just below e_prev.
                let a = self.mesh.oprev(e);
                self.mesh.splice(a, e);
                let b = self.mesh.oprev(e_prev);
                self.mesh.splice(b, e);
            }

            let w = self.regions[reg_prev as usize].winding_number
                - self.mesh.edges[e as usize].winding;
            let inside = self.rule.is_inside(w);
            let r = &mut self.regions[reg as usize];
            r.winding_number = w;
            r.inside = inside;

            self.regions[reg_prev as usize].dirty = true;
            if !first_time && self.check_for_right_splice(reg_prev) {
                self.mesh.add_winding(e, e_prev);
                self.delete_region(reg_prev);
                self.mesh.delete_edge(e_prev);
            }
            first_time = false;
            reg_prev = reg;
            e_prev = e;
        }
        self.regions[reg_prev as usize].dirty = true;

        if clean_up {
            self.walk_dirty_regions(reg_prev);
        }
    }

    // ─────────────────────────── Vertex records ───────────────────────────

    fn push_record(&mut self, coords: [Real; 2], sources: Vec<(u32, Real)>) -> u32 {
        let id = self.records.len() as u32;
        self.records.push(VertexRecord { coords, sources });
        if let Some(max) = self.max_records {
            if self.records.len() > max {
                self.over_budget = true;
            }
        }
        id
    }

    fn record_coords(&self, id: u32) -> [Real; 2] {
        self.records
            .get(id as usize)
            .map(|r| r.coords)
            .unwrap_or([0.0, 0.0])
    }

    /// Merges the origin of `e2` into the origin of `e1`.
    fn splice_merge_vertices(&mut self, e1: EdgeIdx, e2: EdgeIdx) {
        let v1 = self.mesh.org(e1);
        let p1 = self.mesh.verts[v1 as usize].payload;
        let p2 = self.mesh.verts[self.mesh.org(e2) as usize].payload;

        let sources: Vec<(u32, Real)> = [(p1, 0.5), (p2, 0.5)]
            .into_iter()
            .filter(|&(p, _)| p != INVALID)
            .collect();
        if !sources.is_empty() {
            let coords = self.record_coords(sources[0].0);
            let id = self.push_record(coords, sources);
            self.mesh.verts[v1 as usize].payload = id;
        }
        self.mesh.splice(e1, e2);
    }

    /// Payload of the crossing vertex `isect` of edges (org_up, dst_up) and
    /// (org_lo, dst_lo), weighted by distance along each edge.
    fn intersect_record(
        &mut self,
        isect: VertIdx,
        org_up: VertIdx,
        dst_up: VertIdx,
        org_lo: VertIdx,
        dst_lo: VertIdx,
    ) {
        let p = self.mesh.pos(isect);
        let (w0, w1) = vertex_weights(p, self.mesh.pos(org_up), self.mesh.pos(dst_up));
        let (w2, w3) = vertex_weights(p, self.mesh.pos(org_lo), self.mesh.pos(dst_lo));

        let mut coords = [0.0; 2];
        let mut sources = Vec::with_capacity(4);
        for (v, w) in [(org_up, w0), (dst_up, w1), (org_lo, w2), (dst_lo, w3)] {
            let payload = self.mesh.verts[v as usize].payload;
            if payload == INVALID {
                continue;
            }
            let c = self.record_coords(payload);
            coords[0] += w * c[0];
            coords[1] += w * c[1];
            sources.push((payload, w));
        }
        let id = self.push_record(coords, sources);
        self.mesh.verts[isect as usize].payload = id;
    }

    fn queue(&mut self, v: VertIdx) {
        let key = self.pq.insert(v, self.mesh.pos(v));
        self.mesh.verts[v as usize].queued = Some(key);
    }

    // ─────────────────────────── Splicing ─────────────────────────────────

    /// Checks the order of the origins of the edges above and below
    /// `reg_up` and splices one into the other when they are out of order.
    fn check_for_right_splice(&mut self, reg_up: RegionIdx) -> bool {
        let reg_lo = self.region_below(reg_up);
        let e_up = self.e_up(reg_up);
        let e_lo = self.e_up(reg_lo);
        let org_up = self.mesh.org(e_up);
        let org_lo = self.mesh.org(e_lo);
        let up = self.mesh.pos(org_up);
        let lo = self.mesh.pos(org_lo);

        if vert_leq(up, lo) {
            if edge_sign(self.mesh.dst_pos(e_lo), up, lo) > 0.0 {
                return false;
            }
            if !vert_eq(up, lo) {
                // Splice e_up's origin into e_lo.
                self.mesh.split_edge(sym(e_lo));
                let b = self.mesh.oprev(e_lo);
                self.mesh.splice(e_up, b);
                self.regions[reg_up as usize].dirty = true;
                self.regions[reg_lo as usize].dirty = true;
            } else if org_up != org_lo {
                if let Some(key) = self.mesh.verts[org_up as usize].queued.take() {
                    self.pq.delete(org_up, key);
                }
                let a = self.mesh.oprev(e_lo);
                self.splice_merge_vertices(a, e_up);
            }
        } else {
            if edge_sign(self.mesh.dst_pos(e_up), lo, up) < 0.0 {
                return false;
            }
            // Splice e_lo's origin into e_up.
            let above = self.region_above(reg_up);
            self.regions[above as usize].dirty = true;
            self.regions[reg_up as usize].dirty = true;
            self.mesh.split_edge(sym(e_up));
            let a = self.mesh.oprev(e_lo);
            self.mesh.splice(a, e_up);
        }
        true
    }

    /// Same as `check_for_right_splice` for the destinations.
    fn check_for_left_splice(&mut self, reg_up: RegionIdx) -> bool {
        let reg_lo = self.region_below(reg_up);
        let e_up = self.e_up(reg_up);
        let e_lo = self.e_up(reg_lo);
        let up_dst = self.mesh.dst_pos(e_up);
        let lo_dst = self.mesh.dst_pos(e_lo);

        if vert_leq(up_dst, lo_dst) {
            if edge_sign(up_dst, lo_dst, self.mesh.org_pos(e_up)) < 0.0 {
                return false;
            }
            // e_lo's destination is above e_up: splice it into e_up.
            let above = self.region_above(reg_up);
            self.regions[above as usize].dirty = true;
            self.regions[reg_up as usize].dirty = true;
            let e = self.mesh.split_edge(e_up);
            self.mesh.splice(sym(e_lo), e);
            let f = self.mesh.lface(e);
            self.mesh.faces[f as usize].inside = self.regions[reg_up as usize].inside;
        } else {
            if edge_sign(lo_dst, up_dst, self.mesh.org_pos(e_lo)) > 0.0 {
                return false;
            }
            // e_up's destination is below e_lo: splice it into e_lo.
            self.regions[reg_up as usize].dirty = true;
            self.regions[reg_lo as usize].dirty = true;
            let e = self.mesh.split_edge(e_lo);
            let a = self.mesh.lnext(e_up);
            self.mesh.splice(a, sym(e_lo));
            let f = self.mesh.rface(e);
            self.mesh.faces[f as usize].inside = self.regions[reg_up as usize].inside;
        }
        true
    }

    /// Checks the edges above and below `reg_up` for a crossing and, if
    /// there is one, splits both at the crossing point. Returns true when
    /// the dirty regions were already walked by a nested call.
    fn check_for_intersect(&mut self, reg_up: RegionIdx) -> bool {
        let mut reg_up = reg_up;
        let mut reg_lo = self.region_below(reg_up);
        let e_up = self.e_up(reg_up);
        let e_lo = self.e_up(reg_lo);
        let org_up = self.mesh.org(e_up);
        let org_lo = self.mesh.org(e_lo);
        let dst_up = self.mesh.dst(e_up);
        let dst_lo = self.mesh.dst(e_lo);

        if org_up == org_lo {
            return false;
        }

        let p_org_up = self.mesh.pos(org_up);
        let p_org_lo = self.mesh.pos(org_lo);
        let p_dst_up = self.mesh.pos(dst_up);
        let p_dst_lo = self.mesh.pos(dst_lo);
        let ev = self.mesh.pos(self.event);

        let t_min_up = p_org_up.t.min(p_dst_up.t);
        let t_max_lo = p_org_lo.t.max(p_dst_lo.t);
        if t_min_up > t_max_lo {
            return false;
        }

        if vert_leq(p_org_up, p_org_lo) {
            if edge_sign(p_dst_lo, p_org_up, p_org_lo) > 0.0 {
                return false;
            }
        } else if edge_sign(p_dst_up, p_org_lo, p_org_up) < 0.0 {
            return false;
        }

        let mut isect = edge_intersect(p_dst_up, p_org_up, p_dst_lo, p_org_lo);
        if vert_leq(isect, ev) {
            isect = ev;
        }
        let org_min = if vert_leq(p_org_up, p_org_lo) {
            p_org_up
        } else {
            p_org_lo
        };
        if vert_leq(org_min, isect) {
            isect = org_min;
        }

        if vert_eq(isect, p_org_up) || vert_eq(isect, p_org_lo) {
            // The crossing is at one of the right endpoints.
            self.check_for_right_splice(reg_up);
            return false;
        }

        let up_wrong_side = !vert_eq(p_dst_up, ev) && edge_sign(p_dst_up, ev, isect) >= 0.0;
        let lo_wrong_side = !vert_eq(p_dst_lo, ev) && edge_sign(p_dst_lo, ev, isect) <= 0.0;
        if up_wrong_side || lo_wrong_side {
            // Rare: the computed crossing lies on the wrong side of the
            // event, so the event itself is used as the crossing point.
            if dst_lo == self.event {
                self.mesh.split_edge(sym(e_up));
                self.mesh.splice(sym(e_lo), e_up);
                reg_up = self.top_left_region(reg_up);
                let below = self.region_below(reg_up);
                let e = self.e_up(below);
                self.finish_left_regions(below, reg_lo);
                let first = self.mesh.oprev(e);
                self.add_right_edges(reg_up, first, e, e, true);
                return true;
            }
            if dst_up == self.event {
                self.mesh.split_edge(sym(e_lo));
                let a = self.mesh.lnext(e_up);
                let b = self.mesh.oprev(e_lo);
                self.mesh.splice(a, b);
                reg_lo = reg_up;
                reg_up = self.top_right_region(reg_up);
                let below = self.region_below(reg_up);
                let e = self.mesh.rprev(self.e_up(below));
                self.regions[reg_lo as usize].e_up = self.mesh.oprev(e_lo);
                let e_lo_new = self.finish_left_regions(reg_lo, INVALID);
                let first = self.mesh.onext(e_lo_new);
                let last = self.mesh.rprev(e_up);
                self.add_right_edges(reg_up, first, last, e, true);
                return true;
            }
            let event_payload = self.mesh.verts[self.event as usize].payload;
            if up_wrong_side {
                let above = self.region_above(reg_up);
                self.regions[above as usize].dirty = true;
                self.regions[reg_up as usize].dirty = true;
                self.mesh.split_edge(sym(e_up));
                let v = self.mesh.org(e_up);
                self.mesh.verts[v as usize].pos = ev;
                self.mesh.verts[v as usize].payload = event_payload;
            }
            if lo_wrong_side {
                self.regions[reg_up as usize].dirty = true;
                self.regions[reg_lo as usize].dirty = true;
                self.mesh.split_edge(sym(e_lo));
                let v = self.mesh.org(e_lo);
                self.mesh.verts[v as usize].pos = ev;
                self.mesh.verts[v as usize].payload = event_payload;
            }
            // The rest is left to connect_right_vertex.
            return false;
        }

        // General case: split both edges and join them at a new vertex.
        self.mesh.split_edge(sym(e_up));
        self.mesh.split_edge(sym(e_lo));
        let a = self.mesh.oprev(e_lo);
        self.mesh.splice(a, e_up);
        let v = self.mesh.org(e_up);
        self.mesh.verts[v as usize].pos = isect;
        self.queue(v);
        self.intersect_record(v, org_up, dst_up, org_lo, dst_lo);
        trace!(s = isect.s, t = isect.t, "edge crossing");

        let above = self.region_above(reg_up);
        self.regions[above as usize].dirty = true;
        self.regions[reg_up as usize].dirty = true;
        self.regions[reg_lo as usize].dirty = true;
        false
    }

    /// Restores the dictionary invariants for every dirty region, walking
    /// from the bottom up: edge order at both ends, crossings, and
    /// two-edge loops.
    fn walk_dirty_regions(&mut self, reg_up: RegionIdx) {
        let mut reg_up = reg_up;
        let mut reg_lo = self.region_below(reg_up);

        loop {
            while self.is_dirty(reg_lo) {
                reg_up = reg_lo;
                reg_lo = self.region_below(reg_lo);
            }
            if !self.is_dirty(reg_up) {
                reg_lo = reg_up;
                reg_up = self.region_above(reg_up);
                if !self.is_dirty(reg_up) {
                    return;
                }
            }
            self.regions[reg_up as usize].dirty = false;
            let mut e_up = self.e_up(reg_up);
            let mut e_lo = self.e_up(reg_lo);

            if self.mesh.dst(e_up) != self.mesh.dst(e_lo) && self.check_for_left_splice(reg_up) {
                // A temporary edge is no longer needed once the vertex has
                // a real right-going edge.
                if self.is_fixable(reg_lo) {
                    self.delete_region(reg_lo);
                    self.mesh.delete_edge(e_lo);
                    reg_lo = self.region_below(reg_up);
                    e_lo = self.e_up(reg_lo);
                } else if self.is_fixable(reg_up) {
                    self.delete_region(reg_up);
                    self.mesh.delete_edge(e_up);
                    reg_up = self.region_above(reg_lo);
                    e_up = self.e_up(reg_up);
                }
            }

            if self.mesh.org(e_up) != self.mesh.org(e_lo) {
                let dst_up = self.mesh.dst(e_up);
                let dst_lo = self.mesh.dst(e_lo);
                if dst_up != dst_lo
                    && !self.is_fixable(reg_up)
                    && !self.is_fixable(reg_lo)
                    && (dst_up == self.event || dst_lo == self.event)
                {
                    if self.check_for_intersect(reg_up) {
                        return;
                    }
                } else {
                    self.check_for_right_splice(reg_up);
                }
            }

            if self.mesh.org(e_up) == self.mesh.org(e_lo) && self.mesh.dst(e_up) == self.mesh.dst(e_lo) {
                // Two-edge loop.
                self.mesh.add_winding(e_lo, e_up);
                self.delete_region(reg_up);
                self.mesh.delete_edge(e_up);
                reg_up = self.region_above(reg_lo);
            }
        }
    }

    // ─────────────────────────── Events ───────────────────────────────────

    /// The event has left-going edges but no right-going ones. A temporary
    /// edge to the closer of the two enclosing origins keeps the face
    /// monotone until a real edge replaces it.
    fn connect_right_vertex(&mut self, reg_up: RegionIdx, e_bottom_left: EdgeIdx) {
        let mut reg_up = reg_up;
        let mut e_bottom_left = e_bottom_left;
        let mut e_top_left = self.mesh.onext(e_bottom_left);
        let reg_lo = self.region_below(reg_up);
        let e_up = self.e_up(reg_up);
        let e_lo = self.e_up(reg_lo);
        let mut degenerate = false;

        if self.mesh.dst(e_up) != self.mesh.dst(e_lo) {
            self.check_for_intersect(reg_up);
        }

        let ev = self.mesh.pos(self.event);
        if vert_eq(self.mesh.org_pos(e_up), ev) {
            let a = self.mesh.oprev(e_top_left);
            self.mesh.splice(a, e_up);
            reg_up = self.top_left_region(reg_up);
            let below = self.region_below(reg_up);
            e_top_left = self.e_up(below);
            self.finish_left_regions(below, reg_lo);
            degenerate = true;
        }
        if vert_eq(self.mesh.org_pos(e_lo), ev) {
            let b = self.mesh.oprev(e_lo);
            self.mesh.splice(e_bottom_left, b);
            e_bottom_left = self.finish_left_regions(reg_lo, INVALID);
            degenerate = true;
        }
        if degenerate {
            let first = self.mesh.onext(e_bottom_left);
            self.add_right_edges(reg_up, first, e_top_left, e_top_left, true);
            return;
        }

        let target = if vert_leq(self.mesh.org_pos(e_lo), self.mesh.org_pos(e_up)) {
            self.mesh.oprev(e_lo)
        } else {
            e_up
        };
        let a = self.mesh.lprev(e_bottom_left);
        let e_new = self.mesh.connect(a, target);

        // No clean-up yet: e_new must survive until it is marked temporary.
        let next = self.mesh.onext(e_new);
        self.add_right_edges(reg_up, e_new, next, next, false);
        let r = self.mesh.edges[sym(e_new) as usize].active_region;
        if r != INVALID {
            self.regions[r as usize].fix_upper_edge = true;
        }
        self.walk_dirty_regions(reg_up);
    }

    /// The event lies on the upper edge of `reg_up` (or on one of its
    /// endpoints).
    fn connect_left_degenerate(&mut self, reg_up: RegionIdx, v: VertIdx) {
        let e = self.e_up(reg_up);
        let v_edge = self.mesh.verts[v as usize].an_edge;

        if vert_eq(self.mesh.org_pos(e), self.mesh.pos(v)) {
            // e's origin is still queued: merge and wait for it.
            self.splice_merge_vertices(e, v_edge);
            return;
        }

        if !vert_eq(self.mesh.dst_pos(e), self.mesh.pos(v)) {
            // Splice the event into the edge passing through it.
            self.mesh.split_edge(sym(e));
            if self.is_fixable(reg_up) {
                let extra = self.mesh.onext(e);
                self.mesh.delete_edge(extra);
                self.regions[reg_up as usize].fix_upper_edge = false;
            }
            self.mesh.splice(v_edge, e);
            self.sweep_event(v);
            return;
        }

        // The event coincides with e's destination, which was already
        // processed: splice in the extra right-going edges.
        let reg_up = self.top_right_region(reg_up);
        let reg = self.region_below(reg_up);
        let mut e_top_right = sym(self.e_up(reg));
        let e_last = self.mesh.onext(e_top_right);
        let mut e_top_left = e_last;
        if self.is_fixable(reg) {
            self.delete_region(reg);
            self.mesh.delete_edge(e_top_right);
            e_top_right = self.mesh.oprev(e_top_left);
        }
        self.mesh.splice(v_edge, e_top_right);
        if !self.mesh.edge_goes_left(e_top_left) {
            e_top_left = INVALID;
        }
        let first = self.mesh.onext(e_top_right);
        self.add_right_edges(reg_up, first, e_last, e_top_left, true);
    }

    /// The event has only right-going edges.
    fn connect_left_vertex(&mut self, v: VertIdx) {
        let e_tmp = sym(self.mesh.verts[v as usize].an_edge);

        let mesh = &*self.mesh;
        let regions = &self.regions;
        let event = self.event;
        let node = self
            .dict
            .search(|k| edge_leq(mesh, event, e_tmp, regions[k as usize].e_up));

        let reg_up = self.dict.key(node);
        if reg_up == INVALID {
            return;
        }
        let reg_lo = self.region_below(reg_up);
        if reg_lo == INVALID {
            return;
        }
        let e_up = self.e_up(reg_up);
        let e_lo = self.e_up(reg_lo);

        if edge_sign(self.mesh.dst_pos(e_up), self.mesh.pos(v), self.mesh.org_pos(e_up)) == 0.0 {
            self.connect_left_degenerate(reg_up, v);
            return;
        }

        // Connect to whichever enclosing edge ends closer.
        let reg = if vert_leq(self.mesh.dst_pos(e_lo), self.mesh.dst_pos(e_up)) {
            reg_up
        } else {
            reg_lo
        };

        if self.regions[reg_up as usize].inside || self.is_fixable(reg) {
            let v_edge = self.mesh.verts[v as usize].an_edge;
            let e_new = if reg == reg_up {
                let b = self.mesh.lnext(e_up);
                self.mesh.connect(sym(v_edge), b)
            } else {
                let a = self.mesh.dnext(e_lo);
                sym(self.mesh.connect(a, v_edge))
            };
            if self.is_fixable(reg) {
                self.fix_upper_edge(reg, e_new);
            } else {
                let r = self.add_region_below(reg_up, e_new);
                self.compute_winding(r);
            }
            self.sweep_event(v);
        } else {
            // The event is outside the polygon: nothing to connect.
            let v_edge = self.mesh.verts[v as usize].an_edge;
            self.add_right_edges(reg_up, v_edge, v_edge, INVALID, true);
        }
    }

    fn sweep_event(&mut self, v: VertIdx) {
        self.event = v;
        let p = self.mesh.pos(v);
        trace!(vertex = v, s = p.s, t = p.t, "sweep event");

        // Look for an edge of v already in the dictionary.
        let start = self.mesh.verts[v as usize].an_edge;
        let mut e = start;
        while self.mesh.edges[e as usize].active_region == INVALID {
            e = self.mesh.onext(e);
            if e == start {
                self.connect_left_vertex(v);
                return;
            }
        }

        // Close every region whose upper and lower edges end at v, then
        // insert the right-going edges.
        let active = self.mesh.edges[e as usize].active_region;
        let reg_up = self.top_left_region(active);
        let reg = self.region_below(reg_up);
        let e_top_left = self.e_up(reg);
        let e_bottom_left = self.finish_left_regions(reg, INVALID);

        if self.mesh.onext(e_bottom_left) == e_top_left {
            self.connect_right_vertex(reg_up, e_bottom_left);
        } else {
            let first = self.mesh.onext(e_bottom_left);
            self.add_right_edges(reg_up, first, e_top_left, e_top_left, true);
        }
    }

    // ─────────────────────────── Setup and teardown ───────────────────────

    fn add_sentinel(&mut self, smin: Real, smax: Real, t: Real) {
        let e = self.mesh.make_edge();
        let org = self.mesh.org(e);
        let dst = self.mesh.dst(e);
        self.mesh.verts[org as usize].pos = Pos::new(smax, t);
        self.mesh.verts[dst as usize].pos = Pos::new(smin, t);
        self.event = dst;

        let idx = self.regions.len() as RegionIdx;
        let mut reg = ActiveRegion::new(e);
        reg.sentinel = true;
        self.regions.push(reg);

        let mesh = &*self.mesh;
        let regions = &self.regions;
        let event = self.event;
        let node = self
            .dict
            .insert(idx, |k| edge_leq(mesh, event, regions[k as usize].e_up, e));
        self.regions[idx as usize].node_up = node;
        self.mesh.edges[e as usize].active_region = idx;
    }

    fn init_edge_dict(&mut self, bmin: Pos, bmax: Pos) {
        let w = (bmax.s - bmin.s) + 0.01;
        let h = (bmax.t - bmin.t) + 0.01;
        let smin = bmin.s - w;
        let smax = bmax.s + w;
        self.add_sentinel(smin, smax, bmin.t - h);
        self.add_sentinel(smin, smax, bmax.t + h);
    }

    fn done_edge_dict(&mut self) {
        loop {
            let r = self.dict.key(self.dict.min());
            if r == INVALID {
                break;
            }
            self.delete_region(r);
        }
    }

    /// Removes zero-length edges and contours with fewer than three edges.
    fn remove_degenerate_edges(&mut self) {
        let mut e = self.mesh.edges[E_HEAD as usize].next;
        while e != E_HEAD {
            let mut e_next = self.mesh.edges[e as usize].next;
            let mut e_lnext = self.mesh.lnext(e);

            if vert_eq(self.mesh.org_pos(e), self.mesh.dst_pos(e))
                && self.mesh.lnext(e_lnext) != e
            {
                self.splice_merge_vertices(e_lnext, e);
                self.mesh.delete_edge(e);
                e = e_lnext;
                e_lnext = self.mesh.lnext(e);
            }
            if self.mesh.lnext(e_lnext) == e {
                if e_lnext != e {
                    if e_lnext == e_next || e_lnext == sym(e_next) {
                        e_next = self.mesh.edges[e_next as usize].next;
                    }
                    self.mesh.delete_edge(e_lnext);
                }
                if e == e_next || e == sym(e_next) {
                    e_next = self.mesh.edges[e_next as usize].next;
                }
                self.mesh.delete_edge(e);
            }
            e = e_next;
        }
    }

    /// Deletes faces bounded by only two edges, moving their winding onto
    /// the neighbouring edge.
    fn remove_degenerate_faces(&mut self) {
        let mut f = self.mesh.faces[F_HEAD as usize].next;
        while f != F_HEAD {
            let f_next = self.mesh.faces[f as usize].next;
            let e = self.mesh.faces[f as usize].an_edge;
            if self.mesh.lnext(self.mesh.lnext(e)) == e {
                let onext = self.mesh.onext(e);
                self.mesh.add_winding(onext, e);
                self.mesh.delete_edge(e);
            }
            f = f_next;
        }
    }
}
