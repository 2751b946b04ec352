//! Path Reduction
//! ==============
//!
//! Replaces a confirmed walk between two unique nodes by a single summary
//! edge, consuming the traversals the walk used up in the [`BinLedger`].

use tracing::{debug, info, warn};

use crate::binning::{BinLedger, PopulationClassifier};
use crate::core::graph::{BidirectedGraph, EdgeKind, GraphError};
use crate::core::path::BridgePath;

/// Collapses `path` into a summary edge.
///
/// Nothing is modified unless the walk is still intact, at least two of its
/// edges have no traversal left, and the summary edge does not collide with
/// an edge the reduction keeps.
pub fn reduce_unique_path(
    graph: &mut BidirectedGraph,
    ledger: &mut BinLedger,
    classifier: &dyn PopulationClassifier,
    path: &BridgePath,
) -> Result<bool, GraphError> {
    if path.edge_count() < 2 {
        return Ok(false);
    }
    if path.edges().any(|e| !graph.edge(e).is_active()) {
        debug!("path {} runs over removed edges", path.id());
        return Ok(false);
    }
    let (Some(key), Some(leave), Some(arrive)) =
        (path.ending_key(), path.first_side(), path.last_side())
    else {
        return Ok(false);
    };

    let plan = ledger.plan_walk(graph, classifier, path);
    if plan.redundant.len() < 2 {
        debug!(
            "path {} frees {} edge(s), nothing to reduce",
            path.id(),
            plan.redundant.len()
        );
        return Ok(false);
    }
    if let Some(existing) = graph.edge_by_key(&key) {
        if !plan.redundant.contains(&existing) {
            return Err(GraphError::SummaryCollision { key });
        }
    }

    let bin = plan.bin;
    for &edge in &plan.redundant {
        graph.remove_edge(edge);
    }
    ledger.commit(plan);
    let summary = graph.add_edge_with_kind(
        path.root(),
        path.tip(),
        leave,
        arrive,
        path.gap_length(),
        EdgeKind::Reduced(Box::new(path.clone())),
    )?;
    if let Some(bin) = bin {
        ledger.record(summary, bin, 1);
    }
    info!(
        "reduced {} to edge {} ({} bp)",
        path.id(),
        key,
        path.gap_length()
    );
    Ok(true)
}

/// Cuts `path` at every unique node compatible with its population.
/// Stretches that do not run between two such nodes are dropped.
pub fn chop_path_at_anchors(
    classifier: &dyn PopulationClassifier,
    path: &BridgePath,
) -> Vec<BridgePath> {
    let bin = path
        .bin()
        .or_else(|| path.nodes().find_map(|n| classifier.unique_bin(n)));
    let Some(bin) = bin else {
        return Vec::new();
    };

    let cuts: Vec<usize> = path
        .nodes()
        .enumerate()
        .filter(|(_, node)| {
            classifier
                .unique_bin(*node)
                .is_some_and(|own| classifier.bins_compatible(bin, own))
        })
        .map(|(i, _)| i)
        .collect();
    if cuts.len() < 2 {
        warn!("path {} has fewer than two anchors", path.id());
        return Vec::new();
    }

    cuts.windows(2)
        .filter_map(|w| path.sub_path(w[0], w[1]))
        .map(|mut piece| {
            piece.set_bin(Some(bin));
            piece
        })
        .collect()
}
