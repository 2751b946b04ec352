//! Bridge Resolver
//! ===============
//!
//! Owns the graph, the bridge map and the population ledger, and turns the
//! alignments of one read at a time into resolved paths. Reads are cut into
//! blocks at unique nodes of their least abundant population; each block
//! either feeds the bridge already pinned to its ends or starts a new one.

use ahash::{AHashMap, AHashSet};
use serde::Serialize;
use std::cmp::Reverse;
use tracing::{debug, info, warn};

use crate::assembly::bridge::{Bridge, BridgeContext, MergeOutcome};
use crate::assembly::bridge_map::{BridgeId, BridgeMap};
use crate::assembly::reduction::{chop_path_at_anchors, reduce_unique_path};
use crate::binning::{BinId, BinLedger, PopulationClassifier};
use crate::core::alignment::{AlignedRead, Alignment};
use crate::core::graph::BidirectedGraph;
use crate::core::path::BridgePath;
use crate::utils::configuration::ResolverConfiguration;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ResolverStats {
    pub reads: usize,
    pub reads_used: usize,
    pub unknown_alignments: usize,
    pub bridges_created: usize,
    pub paths_emitted: usize,
    pub reductions: usize,
    pub collisions: usize,
}

pub struct BridgeResolver {
    graph: BidirectedGraph,
    classifier: Box<dyn PopulationClassifier>,
    bridges: BridgeMap,
    ledger: BinLedger,
    config: ResolverConfiguration,
    stats: ResolverStats,
}

impl BridgeResolver {
    pub fn new(
        graph: BidirectedGraph,
        classifier: Box<dyn PopulationClassifier>,
        config: ResolverConfiguration,
    ) -> Self {
        Self {
            graph,
            classifier,
            bridges: BridgeMap::new(),
            ledger: BinLedger::new(),
            config,
            stats: ResolverStats::default(),
        }
    }

    pub fn graph(&self) -> &BidirectedGraph {
        &self.graph
    }

    pub fn into_graph(self) -> BidirectedGraph {
        self.graph
    }

    pub fn bridges(&self) -> &BridgeMap {
        &self.bridges
    }

    pub fn classifier(&self) -> &dyn PopulationClassifier {
        self.classifier.as_ref()
    }

    pub fn config(&self) -> &ResolverConfiguration {
        &self.config
    }

    pub fn stats(&self) -> &ResolverStats {
        &self.stats
    }

    /// Feeds one read to the bridges and returns the paths it confirmed.
    pub fn process_read(&mut self, read_name: &str, alignments: &[Alignment]) -> Vec<BridgePath> {
        self.stats.reads += 1;
        let known: Vec<Alignment> = alignments
            .iter()
            .filter(|a| {
                let known = self.graph.get_node(a.node).is_some();
                if !known {
                    warn!("read {}: alignment to unknown node {} skipped", read_name, a.node);
                }
                known
            })
            .cloned()
            .collect();
        self.stats.unknown_alignments += alignments.len() - known.len();
        let steps = select_alignments(&known);
        if steps.len() < 2 {
            return Vec::new();
        }

        let classifier = self.classifier.as_ref();
        let coverage = |bin: BinId| classifier.bin_coverage(bin).unwrap_or(f64::INFINITY);
        let Some(least) = steps
            .iter()
            .filter_map(|a| classifier.unique_bin(a.node))
            .min_by(|a, b| coverage(*a).total_cmp(&coverage(*b)).then(a.cmp(b)))
        else {
            return Vec::new();
        };

        let mut blocks = Vec::new();
        let mut bin_lengths: AHashMap<BinId, i64> = AHashMap::new();
        let mut current = AlignedRead::new(read_name);
        for alignment in steps {
            let unique = classifier.unique_bin(alignment.node);
            if let Some(bin) = unique {
                *bin_lengths.entry(bin).or_default() += self.graph.node_len(alignment.node);
            }
            current.push(alignment.clone());
            let cut = unique.is_some_and(|bin| classifier.bins_compatible(bin, least));
            if cut && current.len() > 1 {
                let next = AlignedRead::from_alignments(read_name, vec![alignment]);
                blocks.push(std::mem::replace(&mut current, next));
            }
        }
        if current.len() > 1 {
            blocks.push(current);
        }
        let bin = bin_lengths
            .into_iter()
            .max_by_key(|&(bin, length)| (length, Reverse(bin)))
            .map_or(least, |(bin, _)| bin);
        debug!(
            "read {} gives {} block(s) in bin {}",
            read_name,
            blocks.len(),
            bin
        );
        if !blocks.is_empty() {
            self.stats.reads_used += 1;
        }

        let mut seen = AHashSet::new();
        let mut found = Vec::new();
        for block in &blocks {
            for path in self.process_block(block, bin) {
                if seen.insert(path.id()) {
                    found.push(path);
                }
            }
        }
        self.stats.paths_emitted += found.len();
        found
    }

    fn process_block(&mut self, block: &AlignedRead, bin: BinId) -> Vec<BridgePath> {
        let Self {
            graph,
            classifier,
            bridges,
            config,
            stats,
            ..
        } = self;
        let mut ctx = BridgeContext {
            graph,
            classifier: classifier.as_ref(),
            config,
        };

        let (id, rescan) = match bridges.find_for_read(ctx.classifier, block) {
            Some(id) => {
                let Some(bridge) = bridges.get_mut(id) else {
                    return Vec::new();
                };
                if bridge.completion_level() == 4 {
                    return Vec::new();
                }
                let before = [bridge.start_anchor(), bridge.end_anchor()];
                let outcome = bridge.merge_read(&mut ctx, block, true);
                let id = bridges.reindex(&mut ctx, id, before);
                (id, outcome != MergeOutcome::Unchanged)
            }
            None => {
                let bridge = Bridge::from_read(&ctx, block, Some(bin));
                if bridge.anchor_count() == 0 {
                    return Vec::new();
                }
                stats.bridges_created += 1;
                let id = bridges.insert(bridge);
                let id = bridges.update(&mut ctx, id);
                let before = match bridges.get_mut(id) {
                    Some(bridge) if bridge.completion_level() < 3 => {
                        let before = [bridge.start_anchor(), bridge.end_anchor()];
                        bridge.connect(&mut ctx, false);
                        Some(before)
                    }
                    _ => None,
                };
                let id = match before {
                    Some(before) => bridges.reindex(&mut ctx, id, before),
                    None => id,
                };
                (id, true)
            }
        };

        let Some(bridge) = bridges.get(id) else {
            return Vec::new();
        };
        match bridge.completion_level() {
            4 if !bridges.is_retired(id) => {
                let paths = bridge
                    .anchored_path()
                    .map(|path| chop_path_at_anchors(ctx.classifier, &path))
                    .unwrap_or_default();
                bridges.retire(id);
                paths
            }
            3 if rescan => bridge.scan_for_new_unique_paths(ctx.classifier),
            _ => Vec::new(),
        }
    }

    /// Collapses a confirmed path into a summary edge.
    pub fn reduce(&mut self, path: &BridgePath) -> bool {
        match reduce_unique_path(
            &mut self.graph,
            &mut self.ledger,
            self.classifier.as_ref(),
            path,
        ) {
            Ok(reduced) => {
                if reduced {
                    self.stats.reductions += 1;
                }
                reduced
            }
            Err(e) => {
                warn!("reduction of {} skipped: {}", path.id(), e);
                self.stats.collisions += 1;
                false
            }
        }
    }

    /// Processes a read and reduces whatever it confirmed. Returns the paths
    /// that were collapsed.
    pub fn process_and_reduce(
        &mut self,
        read_name: &str,
        alignments: &[Alignment],
    ) -> Vec<BridgePath> {
        self.process_read(read_name, alignments)
            .into_iter()
            .filter(|path| self.reduce(path))
            .collect()
    }

    pub fn unresolved_bridges(&self) -> Vec<&Bridge> {
        self.bridges
            .unresolved()
            .into_iter()
            .filter_map(|id| self.bridges.get(id))
            .collect()
    }

    /// Last pass once the reads are exhausted: every unresolved bridge is
    /// connected on a best-effort basis and whatever it yields is reduced.
    pub fn finalize_all(&mut self) -> Vec<BridgePath> {
        let pending = self.bridges.unresolved();
        info!("finalizing {} unresolved bridge(s)", pending.len());

        let mut reduced = Vec::new();
        for id in pending {
            let paths = self.force_bridge(id);
            for path in paths {
                if self.reduce(&path) {
                    reduced.push(path);
                }
            }
            self.bridges.retire(id);
        }
        info!("✅ finalization reduced {} path(s)", reduced.len());
        reduced
    }

    fn force_bridge(&mut self, id: BridgeId) -> Vec<BridgePath> {
        let Self {
            graph,
            classifier,
            bridges,
            config,
            ..
        } = self;
        let mut ctx = BridgeContext {
            graph,
            classifier: classifier.as_ref(),
            config,
        };
        let Some(bridge) = bridges.get_mut(id) else {
            return Vec::new();
        };

        let path = if bridge.completion_level() >= 3 {
            bridge.anchored_path()
        } else {
            bridge.scan_for_an_end(ctx.classifier, ctx.config.bridge.good_support, true);
            if bridge.connect(&mut ctx, true) {
                bridge.stepped_path()
            } else {
                None
            }
        };
        path.map(|p| chop_path_at_anchors(ctx.classifier, &p))
            .unwrap_or_default()
    }
}

/// Keeps useful alignments in read order, one per overlapping group: the
/// group's best mapping quality wins.
fn select_alignments(alignments: &[Alignment]) -> Vec<Alignment> {
    let mut useful: Vec<&Alignment> = alignments.iter().filter(|a| a.useful).collect();
    useful.sort_by_key(|a| (a.read_start, a.read_end));

    let mut groups: Vec<(i64, Alignment)> = Vec::new();
    for alignment in useful {
        match groups.last_mut() {
            Some((group_end, best)) if alignment.read_start < *group_end => {
                *group_end = (*group_end).max(alignment.read_end);
                if alignment.quality > best.quality {
                    *best = alignment.clone();
                }
            }
            _ => groups.push((alignment.read_end, alignment.clone())),
        }
    }
    groups.into_iter().map(|(_, best)| best).collect()
}

#[cfg(test)]
mod resolver_tests {
    use super::*;
    use crate::binning::StaticBinner;
    use crate::core::graph::NodeId;

    #[test]
    fn test_overlapping_alignments_keep_best_quality() {
        let weak = Alignment::new("r", 1, 0, 500, true, 10);
        let strong = Alignment::new("r", 2, 50, 520, true, 50);
        let next = Alignment::new("r", 3, 600, 900, true, 30);
        let mut useless = Alignment::new("r", 4, 900, 1000, true, 60);
        useless.useful = false;

        let picked = select_alignments(&[next.clone(), weak, strong, useless]);
        let nodes: Vec<NodeId> = picked.iter().map(|a| a.node).collect();
        assert_eq!(nodes, vec![2, 3]);
    }

    #[test]
    fn test_read_without_unique_node_is_ignored() {
        let mut g = BidirectedGraph::new(0);
        let x = g.add_node("x", 500, 10.0).unwrap();
        let y = g.add_node("y", 500, 10.0).unwrap();
        g.add_edge(x, y, true, false, 0).unwrap();
        let mut resolver = BridgeResolver::new(
            g,
            Box::new(StaticBinner::new(0.25)),
            ResolverConfiguration::default(),
        );
        let read = [
            Alignment::new("r", x, 0, 500, true, 60),
            Alignment::new("r", y, 500, 1000, true, 60),
        ];
        assert!(resolver.process_read("r", &read).is_empty());
        assert!(resolver.bridges().is_empty());
        assert_eq!(resolver.stats().reads, 1);
        assert_eq!(resolver.stats().reads_used, 0);
    }

    fn two_unique_ends() -> (BridgeResolver, NodeId, NodeId) {
        let mut g = BidirectedGraph::new(0);
        let a = g.add_node("a", 500, 10.0).unwrap();
        let b = g.add_node("b", 600, 10.0).unwrap();
        g.add_edge(a, b, true, false, 100).unwrap();
        let binner = StaticBinner::from_assignments(&g, [(a, 1), (b, 1)], 0.25);
        let resolver = BridgeResolver::new(g, Box::new(binner), ResolverConfiguration::default());
        (resolver, a, b)
    }

    #[test]
    fn test_unknown_node_is_skipped_and_the_rest_is_used() {
        let (mut resolver, a, b) = two_unique_ends();
        let read = [
            Alignment::new("r", a, 0, 500, true, 60),
            Alignment::new("r", 99, 500, 550, true, 60),
            Alignment::new("r", b, 600, 1200, true, 60),
        ];
        let found = resolver.process_read("r", &read);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].nodes().collect::<Vec<_>>(), vec![a, b]);
        assert_eq!(resolver.stats().unknown_alignments, 1);
        assert_eq!(resolver.stats().reads_used, 1);
    }

    #[test]
    fn test_read_of_unknown_nodes_is_ignored() {
        let (mut resolver, _, _) = two_unique_ends();
        let read = [
            Alignment::new("r", 98, 0, 500, true, 60),
            Alignment::new("r", 99, 600, 900, true, 60),
        ];
        assert!(resolver.process_read("r", &read).is_empty());
        assert!(resolver.bridges().is_empty());
        assert_eq!(resolver.stats().reads, 1);
        assert_eq!(resolver.stats().reads_used, 0);
        assert_eq!(resolver.stats().unknown_alignments, 2);
    }
}
