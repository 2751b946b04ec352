//! Distance Tree
//! =============
//!
//! Shortest gaps towards a target node, computed backwards over the
//! bidirected graph. The tree is keyed by `(node, side the node is entered on
//! when walking towards the target)`; the stored value is the shortest gap
//! between leaving that node and entering the target. The target itself is
//! stored at minus its own length so that the recurrence
//! `next = current + edge length + node length` holds for every step.

use ahash::AHashMap;
use std::cmp::Reverse;
use std::collections::BinaryHeap;
use tracing::trace;

use crate::core::graph::{BidirectedGraph, NodeId};
use crate::core::scaffold::Anchor;

#[derive(Debug, Clone)]
pub struct DistanceTree {
    root: Anchor,
    ceiling: i64,
    distances: AHashMap<Anchor, i64>,
}

impl DistanceTree {
    /// Expands from `target`, entered on side `arrive`, until gaps exceed
    /// `max_distance + slack`.
    pub fn build(
        graph: &BidirectedGraph,
        target: NodeId,
        arrive: bool,
        max_distance: i64,
        slack: i64,
    ) -> Self {
        let ceiling = max_distance.saturating_add(slack);
        let root = Anchor::new(target, arrive);
        let start = -graph.node_len(target);

        let mut distances: AHashMap<Anchor, i64> = AHashMap::new();
        let mut frontier: BinaryHeap<Reverse<(i64, Anchor)>> = BinaryHeap::new();
        distances.insert(root, start);
        frontier.push(Reverse((start, root)));

        while let Some(Reverse((distance, key))) = frontier.pop() {
            if distances.get(&key).is_some_and(|&best| distance > best) {
                continue;
            }
            let through = distance + graph.node_len(key.node);
            for &edge_id in graph.edges_at(key.node, key.side) {
                let edge = graph.edge(edge_id);
                let Some((next, attached)) = edge.traverse(key.node, key.side) else {
                    continue;
                };
                let next_distance = through + edge.length;
                if next_distance > ceiling {
                    continue;
                }
                let next_key = Anchor::new(next, !attached);
                if distances
                    .get(&next_key)
                    .map_or(true, |&known| next_distance < known)
                {
                    distances.insert(next_key, next_distance);
                    frontier.push(Reverse((next_distance, next_key)));
                }
            }
        }

        trace!(
            "distance tree from {} covers {} keys within {}",
            root,
            distances.len(),
            ceiling
        );
        Self {
            root,
            ceiling,
            distances,
        }
    }

    pub fn root(&self) -> Anchor {
        self.root
    }

    pub fn ceiling(&self) -> i64 {
        self.ceiling
    }

    /// Shortest gap from leaving `node` (entered on `entry_side`) to the target
    pub fn distance(&self, node: NodeId, entry_side: bool) -> Option<i64> {
        self.distances.get(&Anchor::new(node, entry_side)).copied()
    }

    pub fn contains(&self, node: NodeId, entry_side: bool) -> bool {
        self.distances.contains_key(&Anchor::new(node, entry_side))
    }

    pub fn len(&self) -> usize {
        self.distances.len()
    }

    pub fn is_empty(&self) -> bool {
        self.distances.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (Anchor, i64)> + '_ {
        self.distances.iter().map(|(k, v)| (*k, *v))
    }
}
