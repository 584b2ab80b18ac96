// Copyright 2025 Lars Brubaker
// License: SGI Free Software License B (MIT-compatible)
//
// Vertex event queue.
//
// Events are ordered by `vert_leq` (s, then t) with the vertex index as a
// final tie breaker, so coincident vertices come out back to back and the
// sweep can merge them before processing. The key a vertex was queued with
// is remembered by the caller, which makes deletion independent of any
// later change to the vertex position.

use std::cmp::Ordering;
use std::collections::BTreeSet;

use crate::geom::Pos;
use crate::mesh::VertIdx;

#[derive(Clone, Copy, Debug)]
struct EventKey {
    pos: Pos,
    vert: VertIdx,
}

impl PartialEq for EventKey {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for EventKey {}

impl PartialOrd for EventKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for EventKey {
    fn cmp(&self, other: &Self) -> Ordering {
        self.pos
            .s
            .total_cmp(&other.pos.s)
            .then_with(|| self.pos.t.total_cmp(&other.pos.t))
            .then_with(|| self.vert.cmp(&other.vert))
    }
}

#[derive(Default)]
pub struct EventQueue {
    set: BTreeSet<EventKey>,
}

impl EventQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues `vert` at `pos`. Returns the key to hand back to `delete`.
    pub fn insert(&mut self, vert: VertIdx, pos: Pos) -> Pos {
        self.set.insert(EventKey { pos, vert });
        pos
    }

    pub fn minimum(&self) -> Option<VertIdx> {
        self.set.first().map(|k| k.vert)
    }

    pub fn extract_min(&mut self) -> Option<VertIdx> {
        self.set.pop_first().map(|k| k.vert)
    }

    pub fn delete(&mut self, vert: VertIdx, key: Pos) {
        self.set.remove(&EventKey { pos: key, vert });
    }

    pub fn len(&self) -> usize {
        self.set.len()
    }

    pub fn is_empty(&self) -> bool {
        self.set.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_in_sweep_order() {
        let mut q = EventQueue::new();
        q.insert(1, Pos::new(2.0, 0.0));
        q.insert(2, Pos::new(0.0, 5.0));
        q.insert(3, Pos::new(0.0, -1.0));
        q.insert(4, Pos::new(1.0, 0.0));
        let order: Vec<_> = std::iter::from_fn(|| q.extract_min()).collect();
        assert_eq!(order, vec![3, 2, 4, 1]);
        assert!(q.is_empty());
    }

    #[test]
    fn coincident_events_are_adjacent() {
        let mut q = EventQueue::new();
        q.insert(7, Pos::new(1.0, 1.0));
        q.insert(3, Pos::new(1.0, 1.0));
        q.insert(5, Pos::new(1.0, 2.0));
        assert_eq!(q.extract_min(), Some(3));
        assert_eq!(q.minimum(), Some(7));
    }

    #[test]
    fn delete_uses_the_queued_key() {
        let mut q = EventQueue::new();
        let k = q.insert(9, Pos::new(0.5, 0.5));
        q.insert(1, Pos::new(0.7, 0.5));
        q.delete(9, k);
        assert_eq!(q.len(), 1);
        assert_eq!(q.minimum(), Some(1));
    }
}
