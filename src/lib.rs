//! # Bridge Forge - Long-read repeat resolution
//!
//! Resolves repeats in a metagenome assembly graph using long-read alignments.
//! Reads that join two unique nodes of the same population become bridges;
//! once the evidence of a bridge narrows down to a single walk, that walk is
//! collapsed into a summary edge of the graph.

pub mod assembly;
pub mod binning;
pub mod core;
pub mod io;
pub mod pipeline;
pub mod utils;

// Re-export commonly used types at crate level
pub use crate::assembly::{Bridge, BridgeMap, BridgeResolver, ResolverStats};
pub use crate::binning::{BinId, PopulationClassifier, StaticBinner};
pub use crate::core::{
    Alignment, Anchor, BidirectedGraph, BridgePath, EdgeKind, GraphError, NodeId, ScaffoldVector,
};
pub use crate::pipeline::{StreamingResolver, StreamingStats};
pub use crate::utils::configuration::{ConfigurationManager, PipelineError, ResolverConfiguration};

/// Result type used throughout the crate
pub type Result<T> = anyhow::Result<T>;

/// Error type used throughout the crate
pub type Error = anyhow::Error;
