//! Bridge Map
//! ==========
//!
//! Arena of bridges indexed by the anchors they are pinned to. An anchor is a
//! unique node together with the side the bridge leaves or enters it on, so at
//! most one bridge can own it: two bridges meeting at the same anchor describe
//! the same stretch of genome and are merged.

use ahash::AHashMap;
use tracing::debug;

use crate::assembly::bridge::{Bridge, BridgeContext, MergeOutcome};
use crate::binning::PopulationClassifier;
use crate::core::alignment::AlignedRead;
use crate::core::scaffold::Anchor;

/// Stable handle of a bridge in the map
pub type BridgeId = usize;

#[derive(Debug, Default)]
pub struct BridgeMap {
    bridges: Vec<Option<Bridge>>,
    retired: Vec<bool>,
    index: AHashMap<Anchor, BridgeId>,
}

impl BridgeMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores a bridge without indexing it; see [`BridgeMap::update`].
    pub fn insert(&mut self, bridge: Bridge) -> BridgeId {
        self.bridges.push(Some(bridge));
        self.retired.push(false);
        self.bridges.len() - 1
    }

    pub fn get(&self, id: BridgeId) -> Option<&Bridge> {
        self.bridges.get(id).and_then(Option::as_ref)
    }

    pub fn get_mut(&mut self, id: BridgeId) -> Option<&mut Bridge> {
        self.bridges.get_mut(id).and_then(Option::as_mut)
    }

    pub fn lookup(&self, anchor: Anchor) -> Option<BridgeId> {
        self.index.get(&anchor).copied()
    }

    /// Live bridges
    pub fn len(&self) -> usize {
        self.bridges.iter().flatten().count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn iter(&self) -> impl Iterator<Item = (BridgeId, &Bridge)> + '_ {
        self.bridges
            .iter()
            .enumerate()
            .filter_map(|(id, b)| b.as_ref().map(|b| (id, b)))
    }

    pub fn retire(&mut self, id: BridgeId) {
        if let Some(flag) = self.retired.get_mut(id) {
            *flag = true;
        }
    }

    pub fn is_retired(&self, id: BridgeId) -> bool {
        self.retired.get(id).copied().unwrap_or(false)
    }

    /// Live bridges that have not reached a single path yet
    pub fn unresolved(&self) -> Vec<BridgeId> {
        self.iter()
            .filter(|(id, b)| !self.is_retired(*id) && b.completion_level() < 4)
            .map(|(id, _)| id)
            .collect()
    }

    /// Bridge already pinned to either end of `read`, tried from the first
    /// alignment.
    pub fn find_for_read(
        &self,
        classifier: &dyn PopulationClassifier,
        read: &AlignedRead,
    ) -> Option<BridgeId> {
        let candidates = [
            read.first()
                .filter(|a| classifier.unique_bin(a.node).is_some())
                .and(read.first_anchor()),
            read.last()
                .filter(|a| classifier.unique_bin(a.node).is_some())
                .and(read.last_anchor()),
        ];
        candidates
            .into_iter()
            .flatten()
            .find_map(|anchor| self.lookup(anchor))
    }

    /// Re-indexes bridge `id` after its anchors changed, merging in any
    /// bridge already holding one of them. Returns the id that now owns the
    /// bridge's anchors.
    pub fn update(&mut self, ctx: &mut BridgeContext<'_>, id: BridgeId) -> BridgeId {
        let Some(bridge) = self.get(id) else {
            return id;
        };
        let anchors = [bridge.start_anchor(), bridge.end_anchor()];
        if bridge.anchor_count() == 2 {
            for anchor in anchors.into_iter().flatten() {
                if let Some(other) = self.lookup(anchor).filter(|&other| other != id) {
                    self.merge(ctx, id, other);
                }
            }
        }

        let Some(bridge) = self.get(id) else {
            return id;
        };
        for anchor in [bridge.start_anchor(), bridge.end_anchor()]
            .into_iter()
            .flatten()
        {
            self.index.insert(anchor, id);
        }
        id
    }

    /// Re-indexes bridge `id` if its anchors differ from `before`. Anchors it
    /// gave up are released first so later reads no longer land on it.
    pub fn reindex(
        &mut self,
        ctx: &mut BridgeContext<'_>,
        id: BridgeId,
        before: [Option<Anchor>; 2],
    ) -> BridgeId {
        let after = self
            .get(id)
            .map_or([None, None], |b| [b.start_anchor(), b.end_anchor()]);
        if after == before {
            return id;
        }
        for anchor in before.into_iter().flatten() {
            if !after.contains(&Some(anchor)) && self.lookup(anchor) == Some(id) {
                self.index.remove(&anchor);
            }
        }
        self.update(ctx, id)
    }

    /// Absorbs bridge `from` into bridge `into` when they share an anchor.
    /// Bridges with no anchor in common are left as they are.
    pub fn merge(
        &mut self,
        ctx: &mut BridgeContext<'_>,
        into: BridgeId,
        from: BridgeId,
    ) -> MergeOutcome {
        if into == from {
            return MergeOutcome::Unchanged;
        }
        let shared = match (self.get(into), self.get(from)) {
            (Some(target), Some(other)) => target.shares_anchor_with(other),
            _ => false,
        };
        if !shared {
            return MergeOutcome::Unchanged;
        }
        let Some(other) = self.bridges.get_mut(from).and_then(Option::take) else {
            return MergeOutcome::Unchanged;
        };
        let Some(target) = self.get_mut(into) else {
            return MergeOutcome::Unchanged;
        };

        let before = [target.start_anchor(), target.end_anchor()];
        let outcome = target.merge_bridge(ctx, other, true);
        let after = [target.start_anchor(), target.end_anchor()];
        debug!("bridge {} absorbed into {}: {:?}", from, into, outcome);
        for owner in self.index.values_mut() {
            if *owner == from {
                *owner = into;
            }
        }
        for anchor in before.into_iter().flatten() {
            if !after.contains(&Some(anchor)) && self.lookup(anchor) == Some(into) {
                self.index.remove(&anchor);
            }
        }
        outcome
    }
}

#[cfg(test)]
mod bridge_map_tests {
    use super::*;
    use crate::binning::StaticBinner;
    use crate::core::alignment::Alignment;
    use crate::core::graph::BidirectedGraph;
    use crate::utils::configuration::ResolverConfiguration;

    fn two_chains() -> (BidirectedGraph, StaticBinner) {
        // a -> x -> b and c -> y -> d, all unique but x and y
        let mut g = BidirectedGraph::new(0);
        for (name, len) in [("a", 500), ("x", 100), ("b", 600), ("c", 500), ("y", 100), ("d", 600)] {
            g.add_node(name, len, 10.0).unwrap();
        }
        g.add_edge(0, 1, true, false, 0).unwrap();
        g.add_edge(1, 2, true, false, 0).unwrap();
        g.add_edge(3, 4, true, false, 0).unwrap();
        g.add_edge(4, 5, true, false, 0).unwrap();
        let binner = StaticBinner::from_assignments(&g, [(0, 1), (2, 1), (3, 1), (5, 1)], 0.25);
        (g, binner)
    }

    fn read(name: &str, from: u32, to: u32, end_quality: u8) -> AlignedRead {
        AlignedRead::from_alignments(
            name,
            vec![
                Alignment::new(name, from, 0, 500, true, 60),
                Alignment::new(name, to, 600, 1200, true, end_quality),
            ],
        )
    }

    #[test]
    fn test_bridges_without_common_anchor_stay_apart() {
        let (mut g, binner) = two_chains();
        let config = ResolverConfiguration::default();
        let mut ctx = BridgeContext {
            graph: &mut g,
            classifier: &binner,
            config: &config,
        };
        let mut map = BridgeMap::new();
        let first = map.insert(Bridge::from_read(&ctx, &read("r1", 0, 2, 60), Some(1)));
        let second = map.insert(Bridge::from_read(&ctx, &read("r2", 3, 5, 60), Some(1)));
        map.update(&mut ctx, first);
        map.update(&mut ctx, second);

        assert_eq!(map.merge(&mut ctx, first, second), MergeOutcome::Unchanged);
        assert_eq!(map.len(), 2);
        assert_eq!(map.lookup(Anchor::new(0, true)), Some(first));
        assert_eq!(map.lookup(Anchor::new(3, true)), Some(second));
        assert_eq!(map.lookup(Anchor::new(5, false)), Some(second));
    }

    #[test]
    fn test_update_merges_bridges_sharing_an_anchor() {
        let (mut g, binner) = two_chains();
        let config = ResolverConfiguration::default();
        let mut ctx = BridgeContext {
            graph: &mut g,
            classifier: &binner,
            config: &config,
        };
        let mut map = BridgeMap::new();
        // weak end: only the root anchor is known
        let weak = map.insert(Bridge::from_read(&ctx, &read("r1", 0, 2, 20), Some(1)));
        map.update(&mut ctx, weak);
        assert_eq!(map.lookup(Anchor::new(0, true)), Some(weak));
        assert!(map.lookup(Anchor::new(2, false)).is_none());

        let strong = map.insert(Bridge::from_read(&ctx, &read("r2", 0, 2, 60), Some(1)));
        let owner = map.update(&mut ctx, strong);
        assert_eq!(owner, strong);
        assert_eq!(map.len(), 1);
        assert_eq!(map.lookup(Anchor::new(0, true)), Some(strong));
        assert_eq!(map.lookup(Anchor::new(2, false)), Some(strong));
        let merged = map.get(strong).unwrap();
        assert_eq!(merged.completion_level(), 4);
        assert!(map.unresolved().is_empty());
    }

    #[test]
    fn test_find_for_read_from_either_end() {
        let (mut g, binner) = two_chains();
        let config = ResolverConfiguration::default();
        let mut ctx = BridgeContext {
            graph: &mut g,
            classifier: &binner,
            config: &config,
        };
        let mut map = BridgeMap::new();
        let id = map.insert(Bridge::from_read(&ctx, &read("r1", 0, 2, 60), Some(1)));
        map.update(&mut ctx, id);

        let forward = read("r2", 0, 2, 60);
        assert_eq!(map.find_for_read(&binner, &forward), Some(id));

        let mut backward = AlignedRead::from_alignments(
            "r3",
            forward
                .alignments()
                .iter()
                .map(|a| a.clone().with_read_length(1200))
                .collect(),
        );
        backward.reverse();
        assert_eq!(map.find_for_read(&binner, &backward), Some(id));

        let unrelated = read("r4", 3, 5, 60);
        assert_eq!(map.find_for_read(&binner, &unrelated), None);
    }

    #[test]
    fn test_reindex_releases_a_dropped_end_anchor() {
        let (mut g, binner) = two_chains();
        let config = ResolverConfiguration::default();
        let mut ctx = BridgeContext {
            graph: &mut g,
            classifier: &binner,
            config: &config,
        };
        // b seen on the wrong strand: no walk from a enters it that way
        let odd = AlignedRead::from_alignments(
            "odd",
            vec![
                Alignment::new("odd", 0, 0, 500, true, 60),
                Alignment::new("odd", 2, 600, 1200, false, 60),
            ],
        );
        let mut map = BridgeMap::new();
        let id = map.insert(Bridge::from_read(&ctx, &odd, Some(1)));
        map.update(&mut ctx, id);
        let bridge = map.get(id).unwrap();
        let before = [bridge.start_anchor(), bridge.end_anchor()];
        let dropped = bridge.end_anchor().unwrap();
        assert_eq!(map.lookup(dropped), Some(id));

        assert!(!map.get_mut(id).unwrap().connect(&mut ctx, false));
        assert_eq!(map.reindex(&mut ctx, id, before), id);
        assert!(map.lookup(dropped).is_none());
        assert_eq!(map.lookup(Anchor::new(0, true)), Some(id));
        assert_eq!(map.get(id).unwrap().completion_level(), 1);
    }
}
