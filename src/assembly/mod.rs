//! Path resolution engine
//!
//! **Search**: `distance_tree.rs` bounds `path_search.rs`
//! **Evidence**: `bridge.rs` accumulates reads, `bridge_map.rs` indexes bridges by anchor
//! **Resolution**: `resolver.rs` drives reads through bridges and `reduction.rs` collapses the results

pub mod bridge;
pub mod bridge_map;
pub mod distance_tree;
pub mod path_search;
pub mod reduction;
pub mod resolver;

pub use bridge::{Bridge, BridgeContext, BridgeSegment, BridgeSteps, BridgeSummary, MergeOutcome};
pub use bridge_map::{BridgeId, BridgeMap};
pub use distance_tree::DistanceTree;
pub use path_search::{enumerate_paths, find_paths, SearchRequest};
pub use reduction::{chop_path_at_anchors, reduce_unique_path};
pub use resolver::{BridgeResolver, ResolverStats};
