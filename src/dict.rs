// Copyright 2025 Lars Brubaker
// License: SGI Free Software License B (MIT-compatible)
//
// Edge dictionary: a sorted, circular, doubly-linked list of active region
// indices. The sweep keeps it ordered from the lowest edge crossing the
// sweep line to the highest. Insertion walks from a caller-supplied
// neighbour, which is nearly always adjacent to the right position.
//
// Comparisons are supplied per call as closures over a single key, so the
// dictionary never needs to borrow the sweep state it orders.

use crate::mesh::INVALID;

pub type NodeIdx = u32;

/// Index of the head node. Its key is INVALID and it closes the circle.
pub const DICT_HEAD: NodeIdx = 0;

#[derive(Clone, Debug)]
pub struct DictNode {
    pub key: u32,
    pub next: NodeIdx,
    pub prev: NodeIdx,
}

pub struct Dict {
    nodes: Vec<DictNode>,
}

impl Default for Dict {
    fn default() -> Self {
        Self::new()
    }
}

impl Dict {
    pub fn new() -> Self {
        Dict {
            nodes: vec![DictNode {
                key: INVALID,
                next: DICT_HEAD,
                prev: DICT_HEAD,
            }],
        }
    }

    /// Inserts `key` just after the first node, walking backwards from
    /// `node`, whose key satisfies `leq(node_key)` (i.e. node_key <= key).
    pub fn insert_before<F>(&mut self, mut node: NodeIdx, key: u32, leq: F) -> NodeIdx
    where
        F: Fn(u32) -> bool,
    {
        loop {
            node = self.nodes[node as usize].prev;
            let node_key = self.nodes[node as usize].key;
            if node_key == INVALID || leq(node_key) {
                break;
            }
        }

        let new_idx = self.nodes.len() as NodeIdx;
        let next = self.nodes[node as usize].next;
        self.nodes.push(DictNode {
            key,
            next,
            prev: node,
        });
        self.nodes[node as usize].next = new_idx;
        self.nodes[next as usize].prev = new_idx;
        new_idx
    }

    /// Inserts `key` in sorted position, searching from the top.
    pub fn insert<F>(&mut self, key: u32, leq: F) -> NodeIdx
    where
        F: Fn(u32) -> bool,
    {
        self.insert_before(DICT_HEAD, key, leq)
    }

    pub fn delete(&mut self, node: NodeIdx) {
        let DictNode { next, prev, .. } = self.nodes[node as usize].clone();
        self.nodes[next as usize].prev = prev;
        self.nodes[prev as usize].next = next;
        let n = &mut self.nodes[node as usize];
        n.key = INVALID;
        n.next = INVALID;
        n.prev = INVALID;
    }

    /// First node, from the bottom, whose key satisfies `geq(node_key)`
    /// (i.e. key <= node_key). Returns DICT_HEAD when none does.
    pub fn search<F>(&self, geq: F) -> NodeIdx
    where
        F: Fn(u32) -> bool,
    {
        let mut node = DICT_HEAD;
        loop {
            node = self.nodes[node as usize].next;
            let node_key = self.nodes[node as usize].key;
            if node_key == INVALID || geq(node_key) {
                return node;
            }
        }
    }

    #[inline]
    pub fn key(&self, node: NodeIdx) -> u32 {
        self.nodes[node as usize].key
    }

    #[inline]
    pub fn min(&self) -> NodeIdx {
        self.nodes[DICT_HEAD as usize].next
    }

    #[inline]
    pub fn succ(&self, node: NodeIdx) -> NodeIdx {
        self.nodes[node as usize].next
    }

    #[inline]
    pub fn pred(&self, node: NodeIdx) -> NodeIdx {
        self.nodes[node as usize].prev
    }

    pub fn is_empty(&self) -> bool {
        self.min() == DICT_HEAD
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn keys(d: &Dict) -> Vec<u32> {
        let mut out = Vec::new();
        let mut n = d.min();
        while n != DICT_HEAD {
            out.push(d.key(n));
            n = d.succ(n);
        }
        out
    }

    #[test]
    fn empty_dict() {
        let d = Dict::new();
        assert!(d.is_empty());
        assert_eq!(d.min(), DICT_HEAD);
    }

    #[test]
    fn insert_keeps_ascending_order() {
        let mut d = Dict::new();
        for k in [3u32, 1, 2] {
            d.insert(k, |n| n <= k);
        }
        assert_eq!(keys(&d), vec![1, 2, 3]);
    }

    #[test]
    fn insert_before_walks_from_a_neighbour() {
        let mut d = Dict::new();
        d.insert(10, |n| n <= 10);
        let n30 = d.insert(30, |n| n <= 30);
        d.insert_before(n30, 20, |n| n <= 20);
        assert_eq!(keys(&d), vec![10, 20, 30]);
    }

    #[test]
    fn delete_unlinks() {
        let mut d = Dict::new();
        d.insert(1, |n| n <= 1);
        let n2 = d.insert(2, |n| n <= 2);
        d.insert(3, |n| n <= 3);
        d.delete(n2);
        assert_eq!(keys(&d), vec![1, 3]);
    }

    #[test]
    fn search_finds_first_geq() {
        let mut d = Dict::new();
        for k in [1u32, 3, 5] {
            d.insert(k, |n| n <= k);
        }
        assert_eq!(d.key(d.search(|n| 2 <= n)), 3);
        assert_eq!(d.key(d.search(|n| 3 <= n)), 3);
        assert_eq!(d.search(|n| 6 <= n), DICT_HEAD);
    }
}
