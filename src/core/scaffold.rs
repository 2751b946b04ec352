//! Scaffold Vectors
//! ================
//!
//! A [`ScaffoldVector`] `(m, d)` from node A to node B states that position `y`
//! on B's forward strand sits at position `m + d * y` on A's forward strand.
//! Vectors compose like affine maps, which is what allows two sightings of the
//! same node from different reads to be compared in a common frame.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::core::graph::NodeId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ScaffoldVector {
    magnitude: i64,
    direction: i8,
}

impl Default for ScaffoldVector {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl ScaffoldVector {
    pub const IDENTITY: ScaffoldVector = ScaffoldVector {
        magnitude: 0,
        direction: 1,
    };

    pub fn new(magnitude: i64, same_strand: bool) -> Self {
        Self {
            magnitude,
            direction: if same_strand { 1 } else { -1 },
        }
    }

    pub fn magnitude(&self) -> i64 {
        self.magnitude
    }

    pub fn direction(&self) -> i64 {
        self.direction as i64
    }

    pub fn same_strand(&self) -> bool {
        self.direction > 0
    }

    pub fn is_identity(&self) -> bool {
        *self == Self::IDENTITY
    }

    /// `v(A→B).then(v(B→C)) == v(A→C)`
    pub fn then(self, next: ScaffoldVector) -> ScaffoldVector {
        ScaffoldVector {
            magnitude: self.magnitude + self.direction() * next.magnitude,
            direction: self.direction * next.direction,
        }
    }

    /// `v(A→B).reverse() == v(B→A)`
    pub fn reverse(self) -> ScaffoldVector {
        ScaffoldVector {
            magnitude: -self.direction() * self.magnitude,
            direction: self.direction,
        }
    }

    /// Interval occupied by B (of length `len_b`) in A's frame
    pub fn span(&self, len_b: i64) -> (i64, i64) {
        let far = self.magnitude + self.direction() * len_b;
        (self.magnitude.min(far), self.magnitude.max(far))
    }

    /// Gap between A (of length `len_a`) and B. Negative values are overlaps.
    pub fn distance(&self, len_a: i64, len_b: i64) -> i64 {
        let (lo, hi) = self.span(len_b);
        (lo - len_a).max(-hi)
    }
}

impl fmt::Display for ScaffoldVector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}{}",
            if self.same_strand() { '+' } else { '-' },
            self.magnitude
        )
    }
}

/// A node side a bridge is pinned to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Anchor {
    pub node: NodeId,
    pub side: bool,
}

impl Anchor {
    pub fn new(node: NodeId, side: bool) -> Self {
        Self { node, side }
    }
}

impl fmt::Display for Anchor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.node, if self.side { 'o' } else { 'i' })
    }
}

/// A node sighted at a scaffold vector relative to a bridge root, with the
/// support accumulated from every read that agreed on it.
#[derive(Debug, Clone, PartialEq)]
pub struct NodeVecState {
    pub node: NodeId,
    pub vector: ScaffoldVector,
    pub length: i64,
    pub support: u32,
}

impl NodeVecState {
    pub fn new(node: NodeId, vector: ScaffoldVector, length: i64, support: u32) -> Self {
        Self {
            node,
            vector,
            length,
            support,
        }
    }

    /// Position where a read crossing the bridge root-first enters this node.
    /// `forward` is the strand the root is read on.
    pub fn entry_offset(&self, forward: bool) -> i64 {
        let (lo, hi) = self.vector.span(self.length);
        if forward {
            lo
        } else {
            -hi
        }
    }

    /// Side this node is entered on when the root is read on `forward`
    pub fn arrival_side(&self, forward: bool) -> bool {
        forward != self.vector.same_strand()
    }

    pub fn passes_qc(&self, good_support: u32) -> bool {
        self.support >= good_support
    }

    /// Vector of `other` seen from this node
    pub fn vector_to(&self, other: &NodeVecState) -> ScaffoldVector {
        self.vector.reverse().then(other.vector)
    }

    /// Gap between this node and `other`
    pub fn distance_to(&self, other: &NodeVecState) -> i64 {
        self.vector_to(other).distance(self.length, other.length)
    }

    /// Folds another sighting of the same node into this one when both place
    /// it on the same strand within `tolerance` bases.
    pub fn absorb(&mut self, other: &NodeVecState, tolerance: i64) -> bool {
        if self.node != other.node || self.vector.direction != other.vector.direction {
            return false;
        }
        if (self.vector.magnitude - other.vector.magnitude).abs() > tolerance {
            return false;
        }
        let total = self.support as i64 + other.support as i64;
        if total > 0 && !self.vector.is_identity() {
            self.vector.magnitude = (self.vector.magnitude * self.support as i64
                + other.vector.magnitude * other.support as i64)
                / total;
        }
        self.support = self.support.saturating_add(other.support);
        true
    }
}
