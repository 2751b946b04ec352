pub mod alignment;
pub mod graph;
pub mod path;
pub mod scaffold;

// Re-export the graph model used throughout the resolver
pub use alignment::{AlignedRead, Alignment};
pub use graph::{
    create_edge_id, BidirectedGraph, Edge, EdgeId, EdgeKey, EdgeKind, GraphError, Node, NodeId,
};
pub use path::{BridgePath, PathStep};
pub use scaffold::{Anchor, NodeVecState, ScaffoldVector};
