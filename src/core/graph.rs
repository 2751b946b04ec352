//! Bidirected Graph Model
//! ======================
//!
//! Arena-backed bidirected assembly graph. Every edge endpoint is attached to one
//! side of a node: `true` is the out side (the 3' end of the forward strand),
//! `false` the in side. A walk that arrives at a node on one side leaves it from
//! the other one.
//!
//! Nodes and edges are addressed by dense integer handles. Removed edges stay in
//! the arena as tombstones so that paths recorded before a reduction remain
//! resolvable.

use ahash::AHashMap;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

use crate::core::path::BridgePath;

/// Dense node handle
pub type NodeId = u32;

/// Dense edge handle, stable across removals
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EdgeId(pub u32);

impl EdgeId {
    #[inline]
    fn index(self) -> usize {
        self.0 as usize
    }
}

/// Structural precondition failures. None of them leave the graph modified.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GraphError {
    #[error("Unknown node: {name}")]
    UnknownNode { name: String },

    #[error("Node {name} already exists")]
    DuplicateNode { name: String },

    #[error("Edge {key} already exists")]
    DuplicateEdge { key: EdgeKey },

    #[error("Edge {key} does not continue the walk at node {node}")]
    Discontinuous { key: EdgeKey, node: NodeId },

    #[error("Bridge orientation is undetermined: {anchors} anchor(s) known, two required")]
    UndeterminedBridge { anchors: usize },

    #[error("Summary edge {key} collides with an existing edge")]
    SummaryCollision { key: EdgeKey },
}

/// Canonical, orientation-aware edge identifier.
///
/// The same physical edge always yields the same key regardless of which
/// endpoint is named first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EdgeKey {
    pub node0: NodeId,
    pub dir0: bool,
    pub node1: NodeId,
    pub dir1: bool,
}

impl EdgeKey {
    pub fn new(a: NodeId, b: NodeId, dir_a: bool, dir_b: bool) -> Self {
        if a == b {
            // a loop joining both sides of a node reads the same from either end
            if dir_a != dir_b {
                return Self {
                    node0: a,
                    dir0: true,
                    node1: a,
                    dir1: false,
                };
            }
            return Self {
                node0: a,
                dir0: dir_a,
                node1: a,
                dir1: dir_b,
            };
        }
        if a < b {
            Self {
                node0: a,
                dir0: dir_a,
                node1: b,
                dir1: dir_b,
            }
        } else {
            Self {
                node0: b,
                dir0: dir_b,
                node1: a,
                dir1: dir_a,
            }
        }
    }

    pub fn is_loop(&self) -> bool {
        self.node0 == self.node1
    }

    pub fn touches(&self, node: NodeId) -> bool {
        self.node0 == node || self.node1 == node
    }
}

impl fmt::Display for EdgeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}{},{}{}",
            self.node0,
            if self.dir0 { '+' } else { '-' },
            self.node1,
            if self.dir1 { '-' } else { '+' }
        )
    }
}

/// Order-independent edge identifier for the edge joining side `dir_a` of `a`
/// to side `dir_b` of `b`.
pub fn create_edge_id(a: NodeId, b: NodeId, dir_a: bool, dir_b: bool) -> EdgeKey {
    EdgeKey::new(a, b, dir_a, dir_b)
}

#[derive(Debug, Clone)]
pub struct Node {
    pub id: NodeId,
    pub name: String,
    pub length: i64,
    pub coverage: f64,
    pub sequence: Vec<u8>,
    out_edges: Vec<EdgeId>,
    in_edges: Vec<EdgeId>,
}

impl Node {
    pub fn degree(&self) -> usize {
        self.out_edges.len() + self.in_edges.len()
    }

    pub fn edges_on(&self, side: bool) -> &[EdgeId] {
        if side {
            &self.out_edges
        } else {
            &self.in_edges
        }
    }

    fn edges_on_mut(&mut self, side: bool) -> &mut Vec<EdgeId> {
        if side {
            &mut self.out_edges
        } else {
            &mut self.in_edges
        }
    }
}

/// What an edge stands for
#[derive(Debug, Clone)]
pub enum EdgeKind {
    /// Adjacency present in the input graph
    Overlap,
    /// Gap spanned only by long-read evidence; no sequence is known
    Synthetic,
    /// Summary of a resolved path
    Reduced(Box<BridgePath>),
}

#[derive(Debug, Clone)]
pub struct Edge {
    pub id: EdgeId,
    pub key: EdgeKey,
    /// Signed gap between the two endpoints; negative values are overlaps
    pub length: i64,
    pub kind: EdgeKind,
    active: bool,
}

impl Edge {
    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn side_at(&self, node: NodeId) -> Option<bool> {
        if node == self.key.node0 {
            Some(self.key.dir0)
        } else if node == self.key.node1 {
            Some(self.key.dir1)
        } else {
            None
        }
    }

    /// Follows the edge from side `side` of `from`, returning the node reached
    /// and the side it is entered on.
    pub fn traverse(&self, from: NodeId, side: bool) -> Option<(NodeId, bool)> {
        let k = &self.key;
        if from == k.node0 && side == k.dir0 {
            Some((k.node1, k.dir1))
        } else if from == k.node1 && side == k.dir1 {
            Some((k.node0, k.dir0))
        } else {
            None
        }
    }

    pub fn represented_path(&self) -> Option<&BridgePath> {
        match &self.kind {
            EdgeKind::Reduced(path) => Some(path),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct BidirectedGraph {
    nodes: Vec<Node>,
    edges: Vec<Edge>,
    edge_index: AHashMap<EdgeKey, EdgeId>,
    names: AHashMap<String, NodeId>,
    kmer_size: i64,
}

impl BidirectedGraph {
    pub fn new(kmer_size: i64) -> Self {
        Self {
            kmer_size,
            ..Default::default()
        }
    }

    pub fn kmer_size(&self) -> i64 {
        self.kmer_size
    }

    pub fn add_node(
        &mut self,
        name: impl Into<String>,
        length: i64,
        coverage: f64,
    ) -> Result<NodeId, GraphError> {
        let name = name.into();
        if self.names.contains_key(&name) {
            return Err(GraphError::DuplicateNode { name });
        }
        let id = self.nodes.len() as NodeId;
        self.names.insert(name.clone(), id);
        self.nodes.push(Node {
            id,
            name,
            length,
            coverage,
            sequence: Vec::new(),
            out_edges: Vec::new(),
            in_edges: Vec::new(),
        });
        Ok(id)
    }

    pub fn set_sequence(&mut self, node: NodeId, sequence: Vec<u8>) {
        if let Some(n) = self.nodes.get_mut(node as usize) {
            n.sequence = sequence;
        }
    }

    /// Node by handle. Handles are only issued by this graph.
    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id as usize]
    }

    pub fn get_node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id as usize)
    }

    pub fn node_id(&self, name: &str) -> Option<NodeId> {
        self.names.get(name).copied()
    }

    pub fn node_len(&self, id: NodeId) -> i64 {
        self.node(id).length
    }

    pub fn degree(&self, id: NodeId) -> usize {
        self.node(id).degree()
    }

    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.nodes.iter()
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Number of live edges
    pub fn edge_count(&self) -> usize {
        self.edge_index.len()
    }

    pub fn edge(&self, id: EdgeId) -> &Edge {
        &self.edges[id.index()]
    }

    pub fn active_edges(&self) -> impl Iterator<Item = &Edge> {
        self.edges.iter().filter(|e| e.active)
    }

    pub fn edges_at(&self, node: NodeId, side: bool) -> &[EdgeId] {
        self.node(node).edges_on(side)
    }

    pub fn find_edge(&self, a: NodeId, b: NodeId, dir_a: bool, dir_b: bool) -> Option<EdgeId> {
        self.edge_by_key(&EdgeKey::new(a, b, dir_a, dir_b))
    }

    pub fn edge_by_key(&self, key: &EdgeKey) -> Option<EdgeId> {
        self.edge_index.get(key).copied()
    }

    pub fn add_edge(
        &mut self,
        a: NodeId,
        b: NodeId,
        dir_a: bool,
        dir_b: bool,
        length: i64,
    ) -> Result<EdgeId, GraphError> {
        self.add_edge_with_kind(a, b, dir_a, dir_b, length, EdgeKind::Overlap)
    }

    pub fn add_edge_with_kind(
        &mut self,
        a: NodeId,
        b: NodeId,
        dir_a: bool,
        dir_b: bool,
        length: i64,
        kind: EdgeKind,
    ) -> Result<EdgeId, GraphError> {
        for n in [a, b] {
            if self.get_node(n).is_none() {
                return Err(GraphError::UnknownNode {
                    name: n.to_string(),
                });
            }
        }
        let key = EdgeKey::new(a, b, dir_a, dir_b);
        if self.edge_index.contains_key(&key) {
            return Err(GraphError::DuplicateEdge { key });
        }

        let id = EdgeId(self.edges.len() as u32);
        self.edges.push(Edge {
            id,
            key,
            length,
            kind,
            active: true,
        });
        self.edge_index.insert(key, id);

        self.nodes[key.node0 as usize].edges_on_mut(key.dir0).push(id);
        if !(key.is_loop() && key.dir0 == key.dir1) {
            self.nodes[key.node1 as usize].edges_on_mut(key.dir1).push(id);
        }
        Ok(id)
    }

    /// Detaches an edge from the topology. The edge record stays readable.
    pub fn remove_edge(&mut self, id: EdgeId) -> bool {
        let Some(edge) = self.edges.get_mut(id.index()) else {
            return false;
        };
        if !edge.active {
            return false;
        }
        edge.active = false;
        let key = edge.key;
        self.edge_index.remove(&key);
        for (node, side) in [(key.node0, key.dir0), (key.node1, key.dir1)] {
            self.nodes[node as usize]
                .edges_on_mut(side)
                .retain(|&e| e != id);
        }
        true
    }
}
