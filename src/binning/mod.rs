//! Population Bins
//! ===============
//!
//! The resolver treats population binning as an oracle: it asks whether a node
//! belongs to a unique population and whether two populations are close
//! enough to be the same genome. [`StaticBinner`] answers from a fixed table.
//! [`BinLedger`] keeps the per-edge traversal counts consumed by reductions.

use ahash::AHashMap;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::core::graph::{BidirectedGraph, EdgeId, Node, NodeId};
use crate::core::path::BridgePath;

pub type BinId = u32;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PopulationBin {
    pub id: BinId,
    /// Estimated sequencing depth of the population
    pub coverage: f64,
}

pub trait PopulationClassifier: Send + Sync {
    /// Bin of `node` if it is known to occur once, in a single population
    fn unique_bin(&self, node: NodeId) -> Option<BinId>;

    fn bins_compatible(&self, a: BinId, b: BinId) -> bool;

    fn bin_coverage(&self, bin: BinId) -> Option<f64>;

    /// Whether a walk assigned to `bin` may pass through `node`
    fn bin_may_contain(&self, bin: Option<BinId>, node: NodeId) -> bool {
        match (bin, self.unique_bin(node)) {
            (Some(bin), Some(own)) => self.bins_compatible(bin, own),
            _ => true,
        }
    }

    /// Expected number of times walks cross `node`
    fn estimated_copies(&self, _node: &Node) -> u32 {
        1
    }
}

/// Classifier backed by an explicit node to bin table
#[derive(Debug, Clone, Default)]
pub struct StaticBinner {
    bins: AHashMap<BinId, PopulationBin>,
    assignments: AHashMap<NodeId, BinId>,
    coverage_tolerance: f64,
}

impl StaticBinner {
    pub fn new(coverage_tolerance: f64) -> Self {
        Self {
            coverage_tolerance,
            ..Default::default()
        }
    }

    pub fn add_bin(&mut self, id: BinId, coverage: f64) {
        self.bins.insert(id, PopulationBin { id, coverage });
    }

    pub fn assign(&mut self, node: NodeId, bin: BinId) {
        self.assignments.insert(node, bin);
    }

    /// Builds bins from node assignments, estimating each bin's coverage as
    /// the length-weighted mean coverage of its nodes.
    pub fn from_assignments(
        graph: &BidirectedGraph,
        assignments: impl IntoIterator<Item = (NodeId, BinId)>,
        coverage_tolerance: f64,
    ) -> Self {
        let mut binner = Self::new(coverage_tolerance);
        let mut totals: AHashMap<BinId, (f64, f64)> = AHashMap::new();
        for (node, bin) in assignments {
            let n = graph.node(node);
            let entry = totals.entry(bin).or_insert((0.0, 0.0));
            entry.0 += n.coverage * n.length as f64;
            entry.1 += n.length as f64;
            binner.assign(node, bin);
        }
        for (bin, (weighted, length)) in totals {
            let coverage = if length > 0.0 { weighted / length } else { 0.0 };
            debug!("bin {} estimated at {:.2}x", bin, coverage);
            binner.add_bin(bin, coverage);
        }
        binner
    }

    pub fn bins(&self) -> impl Iterator<Item = &PopulationBin> {
        self.bins.values()
    }

    pub fn assigned_count(&self) -> usize {
        self.assignments.len()
    }

    fn lowest_coverage(&self) -> Option<f64> {
        self.bins
            .values()
            .map(|b| b.coverage)
            .filter(|&c| c > 0.0)
            .min_by(|a, b| a.total_cmp(b))
    }
}

impl PopulationClassifier for StaticBinner {
    fn unique_bin(&self, node: NodeId) -> Option<BinId> {
        self.assignments.get(&node).copied()
    }

    fn bins_compatible(&self, a: BinId, b: BinId) -> bool {
        if a == b {
            return true;
        }
        match (self.bins.get(&a), self.bins.get(&b)) {
            (Some(x), Some(y)) => {
                let larger = x.coverage.max(y.coverage);
                larger > 0.0 && (x.coverage - y.coverage).abs() <= self.coverage_tolerance * larger
            }
            _ => false,
        }
    }

    fn bin_coverage(&self, bin: BinId) -> Option<f64> {
        self.bins.get(&bin).map(|b| b.coverage)
    }

    fn estimated_copies(&self, node: &Node) -> u32 {
        if self.assignments.contains_key(&node.id) {
            return 1;
        }
        match self.lowest_coverage() {
            Some(unit) => ((node.coverage / unit).round() as u32).max(1),
            None => 1,
        }
    }
}

/// Edges a reduction would consume, and the counts to record if it goes ahead
#[derive(Debug, Clone, Default)]
pub struct LedgerPlan {
    pub bin: Option<BinId>,
    pub redundant: Vec<EdgeId>,
    updates: Vec<(EdgeId, u32)>,
}

/// Remaining traversals per edge and population
#[derive(Debug, Clone, Default)]
pub struct BinLedger {
    edge_counts: AHashMap<EdgeId, AHashMap<BinId, u32>>,
}

impl BinLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, edge: EdgeId, bin: BinId, count: u32) {
        self.edge_counts.entry(edge).or_default().insert(bin, count);
    }

    pub fn remaining(&self, edge: EdgeId, bin: BinId) -> Option<u32> {
        self.edge_counts.get(&edge)?.get(&bin).copied()
    }

    /// Walks `path` consuming one traversal of `path.bin()` per edge and
    /// reports the edges left with no traversal in any population. Nothing is
    /// recorded until the plan is committed.
    pub fn plan_walk(
        &self,
        graph: &BidirectedGraph,
        classifier: &dyn PopulationClassifier,
        path: &BridgePath,
    ) -> LedgerPlan {
        let Some(bin) = path.bin() else {
            return LedgerPlan::default();
        };

        let mut pending: AHashMap<EdgeId, u32> = AHashMap::new();
        let mut plan = LedgerPlan {
            bin: Some(bin),
            ..Default::default()
        };
        for edge in path.edges() {
            let current = match pending.get(&edge) {
                Some(&count) => count,
                None => self
                    .remaining(edge, bin)
                    .unwrap_or_else(|| self.initial_count(graph, classifier, edge)),
            };
            let left = current.saturating_sub(1);
            pending.insert(edge, left);

            let elsewhere: u32 = self
                .edge_counts
                .get(&edge)
                .map(|m| m.iter().filter(|(b, _)| **b != bin).map(|(_, c)| *c).sum())
                .unwrap_or(0);
            if left + elsewhere == 0 && !plan.redundant.contains(&edge) {
                plan.redundant.push(edge);
            }
        }
        plan.updates = pending.into_iter().collect();
        plan
    }

    pub fn commit(&mut self, plan: LedgerPlan) {
        let Some(bin) = plan.bin else {
            return;
        };
        for (edge, count) in plan.updates {
            self.record(edge, bin, count);
        }
    }

    fn initial_count(
        &self,
        graph: &BidirectedGraph,
        classifier: &dyn PopulationClassifier,
        edge: EdgeId,
    ) -> u32 {
        let key = graph.edge(edge).key;
        let a = classifier.estimated_copies(graph.node(key.node0));
        let b = classifier.estimated_copies(graph.node(key.node1));
        a.min(b)
    }
}
