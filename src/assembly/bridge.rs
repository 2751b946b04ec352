//! Bridges
//! =======
//!
//! A bridge gathers long-read evidence hanging off a unique node (the root)
//! and tries to reach the next unique node of the same population. Every read
//! places the nodes it crosses at a [`ScaffoldVector`] from the root; those
//! sightings accumulate in [`BridgeSteps`]. Once both ends are anchored the
//! steps are connected through the graph one [`BridgeSegment`] at a time, and
//! later reads vote among the candidate paths of each segment.
//!
//! Completion levels:
//!
//! | level | meaning                                              |
//! |-------|------------------------------------------------------|
//! | 0     | no anchor                                            |
//! | 1     | root anchored only                                   |
//! | 2     | both ends anchored, not connected                    |
//! | 3     | every segment has candidate paths                    |
//! | 4     | every segment is down to a single path               |

use serde::Serialize;
use tracing::{debug, trace};

use crate::assembly::distance_tree::DistanceTree;
use crate::assembly::path_search::{find_paths, SearchRequest};
use crate::assembly::reduction::chop_path_at_anchors;
use crate::binning::{BinId, PopulationClassifier};
use crate::core::alignment::AlignedRead;
use crate::core::graph::{BidirectedGraph, GraphError, NodeId};
use crate::core::path::BridgePath;
use crate::core::scaffold::{Anchor, NodeVecState, ScaffoldVector};
use crate::utils::configuration::{ResolverConfiguration, SearchConfig};

/// What a bridge needs from the outside world while it grows
pub struct BridgeContext<'a> {
    pub graph: &'a mut BidirectedGraph,
    pub classifier: &'a dyn PopulationClassifier,
    pub config: &'a ResolverConfiguration,
}

/// Effect of merging evidence into a bridge. Variants are ordered by how much
/// the caller has to propagate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum MergeOutcome {
    Unchanged,
    SegmentResolved,
    AnchorAdded,
}

/// Candidate paths between two consecutive qualifying steps
#[derive(Debug, Clone)]
pub struct BridgeSegment {
    start: NodeVecState,
    end: NodeVecState,
    /// Side the walk leaves `start` from
    leave: bool,
    /// Side the walk enters `end` on
    arrive: bool,
    paths: Vec<BridgePath>,
    best_vote: i32,
}

impl BridgeSegment {
    fn connect(
        ctx: &mut BridgeContext<'_>,
        start: &NodeVecState,
        end: &NodeVecState,
        forward: bool,
        bin: Option<BinId>,
        force: bool,
    ) -> Self {
        let good_quality = u32::from(ctx.config.alignment.good_quality);
        let request = SearchRequest {
            from: start.node,
            leave: !start.arrival_side(forward),
            to: end.node,
            arrive: end.arrival_side(forward),
            distance: start.distance_to(end),
            confident: force || start.support.min(end.support) >= good_quality,
        };
        let mut paths =
            find_paths(ctx.graph, ctx.classifier, &request, &ctx.config.search).unwrap_or_default();
        for path in &mut paths {
            path.set_bin(bin);
        }
        trace!(
            "segment {}..{} at {}: {} candidate(s)",
            start.node,
            end.node,
            request.distance,
            paths.len()
        );
        Self {
            start: start.clone(),
            end: end.clone(),
            leave: request.leave,
            arrive: request.arrive,
            paths,
            best_vote: 0,
        }
    }

    pub fn start(&self) -> &NodeVecState {
        &self.start
    }

    pub fn end(&self) -> &NodeVecState {
        &self.end
    }

    pub fn leave(&self) -> bool {
        self.leave
    }

    pub fn arrive(&self) -> bool {
        self.arrive
    }

    pub fn paths(&self) -> &[BridgePath] {
        &self.paths
    }

    pub fn path_count(&self) -> usize {
        self.paths.len()
    }

    pub fn is_connected(&self) -> bool {
        !self.paths.is_empty()
    }

    pub fn is_unique(&self) -> bool {
        self.paths.len() == 1
    }

    /// Highest vote first, then smallest deviation, then path id
    pub fn best_path(&self) -> Option<&BridgePath> {
        self.paths.iter().min_by(|a, b| {
            b.vote()
                .cmp(&a.vote())
                .then(a.deviation().cmp(&b.deviation()))
                .then_with(|| a.id().cmp(&b.id()))
        })
    }

    /// Lets a sighting vote on the candidates if it lies within this segment.
    ///
    /// Returns -1 when `state` is outside the segment, otherwise the number of
    /// candidates that agree with it. Candidates falling more than
    /// `max_vote_diff` behind the best are dropped, unless every candidate
    /// disagreed.
    fn locate_and_vote(
        &mut self,
        state: &NodeVecState,
        forward: bool,
        config: &ResolverConfiguration,
    ) -> i32 {
        if !self.is_connected() {
            return -1;
        }
        let position = state.entry_offset(forward);
        let origin = self.start.entry_offset(forward);
        let bound = self.end.entry_offset(forward);
        if position < origin.min(bound) || position > origin.max(bound) {
            return -1;
        }
        // the start itself measures nothing
        if state.node == self.start.node
            && (position - origin).abs() <= config.search.allowance(0)
        {
            return 0;
        }

        let to_state = self.start.vector_to(state);
        let distance = to_state.distance(self.start.length, state.length);
        let margin = config.bridge.max_vote_diff;
        let mut agreeing = 0usize;
        let mut outvoted = Vec::new();
        for (i, path) in self.paths.iter_mut().enumerate() {
            let consistent = path
                .check_distance_consistency(
                    self.start.node,
                    state.node,
                    to_state.same_strand(),
                    distance,
                    &config.search,
                )
                .is_some();
            if consistent {
                path.upvote();
                self.best_vote = self.best_vote.max(path.vote());
                agreeing += 1;
            } else {
                path.downvote();
                if path.vote() < self.best_vote - margin {
                    outvoted.push(i);
                }
            }
        }
        if agreeing > 0 && agreeing < self.paths.len() && !outvoted.is_empty() {
            debug!(
                "node {} outvotes {} of {} candidates between {} and {}",
                state.node,
                outvoted.len(),
                self.paths.len(),
                self.start.node,
                self.end.node
            );
            let mut index = 0;
            self.paths.retain(|_| {
                let keep = !outvoted.contains(&index);
                index += 1;
                keep
            });
        }
        agreeing as i32
    }

    /// The same segment in the frame of the bridge's far end. `pivot` is the
    /// far end's vector in the current frame.
    fn reversed(&self, pivot: ScaffoldVector) -> Self {
        let back = pivot.reverse();
        let rebase = |s: &NodeVecState| NodeVecState {
            vector: back.then(s.vector),
            ..s.clone()
        };
        Self {
            start: rebase(&self.end),
            end: rebase(&self.start),
            leave: self.arrive,
            arrive: self.leave,
            paths: self.paths.iter().map(BridgePath::reversed).collect(),
            best_vote: self.best_vote,
        }
    }
}

#[derive(Debug, Clone)]
struct Step {
    tag: u32,
    state: NodeVecState,
}

/// Every node sighted on the bridge, ordered by where a read crossing the
/// bridge from its root enters it.
#[derive(Debug, Clone, Default)]
pub struct BridgeSteps {
    steps: Vec<Step>,
    next_tag: u32,
    start: Option<u32>,
    end: Option<u32>,
    /// Strand the root is read on
    forward: bool,
}

impl BridgeSteps {
    fn new(forward: bool) -> Self {
        Self {
            forward,
            ..Default::default()
        }
    }

    pub fn forward(&self) -> bool {
        self.forward
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn states(&self) -> impl DoubleEndedIterator<Item = &NodeVecState> + '_ {
        self.steps.iter().map(|s| &s.state)
    }

    pub fn start(&self) -> Option<&NodeVecState> {
        self.start.and_then(|tag| self.get(tag))
    }

    pub fn end(&self) -> Option<&NodeVecState> {
        self.end.and_then(|tag| self.get(tag))
    }

    fn get(&self, tag: u32) -> Option<&NodeVecState> {
        self.steps.iter().find(|s| s.tag == tag).map(|s| &s.state)
    }

    /// Both ends are known and well supported
    fn connectable(&self, good_support: u32) -> bool {
        match (self.start(), self.end()) {
            (Some(start), Some(end)) => {
                start.passes_qc(good_support) && end.passes_qc(good_support)
            }
            _ => false,
        }
    }

    /// Records a sighting, folding it into an existing one when they agree.
    /// Returns the tag of the step now holding it.
    fn add_node(
        &mut self,
        state: NodeVecState,
        classifier: &dyn PopulationClassifier,
        search: &SearchConfig,
    ) -> u32 {
        let tolerance = search.allowance(state.vector.magnitude());
        let unique = classifier.unique_bin(state.node).is_some();

        if let Some(i) = self
            .steps
            .iter_mut()
            .position(|s| s.state.absorb(&state, tolerance))
        {
            let (tag, support, identity) = {
                let step = &self.steps[i];
                (step.tag, step.state.support, step.state.vector.is_identity())
            };
            if unique && !identity {
                let promote = match self.end() {
                    None => true,
                    Some(end) => self.end != Some(tag) && end.support < support,
                };
                if promote {
                    self.end = Some(tag);
                }
            }
            self.sort();
            return tag;
        }

        let tag = self.next_tag;
        self.next_tag += 1;
        let identity = state.vector.is_identity();
        self.steps.push(Step { tag, state });
        if unique {
            if identity {
                self.start = Some(tag);
            } else if self.end.is_none() {
                self.end = Some(tag);
            }
        }
        self.sort();
        tag
    }

    fn remove(&mut self, tag: u32) {
        self.steps.retain(|s| s.tag != tag);
        if self.start == Some(tag) {
            self.start = None;
        }
        if self.end == Some(tag) {
            self.end = None;
        }
    }

    fn sort(&mut self) {
        let forward = self.forward;
        self.steps
            .sort_by_key(|s| (s.state.entry_offset(forward), s.state.node));
    }

    /// Re-expresses every sighting from the node at `pivot`, which becomes
    /// the new root.
    fn reverse(&mut self, pivot: ScaffoldVector) {
        let back = pivot.reverse();
        for step in &mut self.steps {
            step.state.vector = back.then(step.state.vector);
        }
        self.forward = self.forward != pivot.same_strand();
        std::mem::swap(&mut self.start, &mut self.end);
        self.sort();
    }
}

/// Compact view of a bridge for reports
#[derive(Debug, Clone, Serialize)]
pub struct BridgeSummary {
    pub start: Option<String>,
    pub end: Option<String>,
    pub bin: Option<BinId>,
    pub level: u8,
    pub steps: usize,
    pub candidates: Vec<usize>,
}

#[derive(Debug, Clone)]
pub struct Bridge {
    bin: Option<BinId>,
    start_anchor: Option<Anchor>,
    end_anchor: Option<Anchor>,
    segments: Vec<BridgeSegment>,
    steps: BridgeSteps,
}

impl Bridge {
    fn empty(bin: Option<BinId>, forward: bool) -> Self {
        Self {
            bin,
            start_anchor: None,
            end_anchor: None,
            segments: Vec::new(),
            steps: BridgeSteps::new(forward),
        }
    }

    /// Starts a bridge from one read stretch. The stretch is read from its
    /// first unique node; without one the bridge carries no anchor.
    pub fn from_read(ctx: &BridgeContext<'_>, read: &AlignedRead, bin: Option<BinId>) -> Self {
        let classifier = ctx.classifier;
        let (Some(first), Some(last)) = (read.first(), read.last()) else {
            return Self::empty(bin, true);
        };
        let mut read = read.clone();
        if classifier.unique_bin(first.node).is_none() {
            if classifier.unique_bin(last.node).is_none() {
                return Self::empty(bin, first.forward);
            }
            read.reverse();
        }

        let alignments = read.alignments();
        let root = &alignments[0];
        let mut bridge = Self::empty(bin, root.forward);
        let mut last_unique = None;
        for alignment in alignments {
            let state = NodeVecState::new(
                alignment.node,
                AlignedRead::vector(root, alignment),
                ctx.graph.node_len(alignment.node),
                u32::from(alignment.quality),
            );
            let identity = state.vector.is_identity();
            let tag = bridge
                .steps
                .add_node(state, classifier, &ctx.config.search);
            if !identity && classifier.unique_bin(alignment.node).is_some() {
                last_unique = Some(tag);
            }
        }
        if last_unique.is_some() {
            bridge.steps.end = last_unique;
        }

        bridge.start_anchor = Some(Anchor::new(root.node, root.forward));
        let good_support = ctx.config.bridge.good_support;
        if let Some(end) = bridge.steps.end().filter(|e| e.passes_qc(good_support)) {
            bridge.end_anchor = Some(Anchor::new(end.node, end.arrival_side(root.forward)));
        }
        bridge
    }

    pub fn bin(&self) -> Option<BinId> {
        self.bin
    }

    pub fn start_anchor(&self) -> Option<Anchor> {
        self.start_anchor
    }

    pub fn end_anchor(&self) -> Option<Anchor> {
        self.end_anchor
    }

    pub fn anchor_count(&self) -> usize {
        usize::from(self.start_anchor.is_some()) + usize::from(self.end_anchor.is_some())
    }

    pub fn segments(&self) -> &[BridgeSegment] {
        &self.segments
    }

    pub fn steps(&self) -> &BridgeSteps {
        &self.steps
    }

    pub fn completion_level(&self) -> u8 {
        let anchors = self.anchor_count() as u8;
        if anchors < 2 || self.segments.is_empty() {
            return anchors;
        }
        let reaches_end =
            self.segments.last().map(|s| s.end.node) == self.end_anchor.map(|a| a.node);
        if !reaches_end || !self.segments.iter().all(BridgeSegment::is_connected) {
            return anchors;
        }
        if self.segments.iter().all(BridgeSegment::is_unique) {
            4
        } else {
            3
        }
    }

    /// Whether `other` is pinned to one of this bridge's anchors
    pub fn shares_anchor_with(&self, other: &Bridge) -> bool {
        self.orientation_plan(other.start_anchor, other.end_anchor)
            .is_some()
    }

    /// Which of this bridge and the evidence have to be reversed so that the
    /// evidence starts at this bridge's root. `None` when they share no anchor.
    fn orientation_plan(
        &self,
        first: Option<Anchor>,
        last: Option<Anchor>,
    ) -> Option<(bool, bool)> {
        let root = self.start_anchor?;
        if first == Some(root) {
            return Some((false, false));
        }
        if last == Some(root) {
            return Some((false, true));
        }
        let end = self.end_anchor?;
        if first == Some(end) {
            Some((true, false))
        } else if last == Some(end) {
            Some((true, true))
        } else {
            None
        }
    }

    /// Re-roots the bridge at its far anchor.
    pub fn reverse(&mut self) -> Result<(), GraphError> {
        let (Some(start), Some(end)) = (self.start_anchor, self.end_anchor) else {
            return Err(GraphError::UndeterminedBridge {
                anchors: self.anchor_count(),
            });
        };
        let pivot = self
            .steps
            .end()
            .or_else(|| self.segments.last().map(|s| &s.end))
            .map(|s| s.vector)
            .ok_or(GraphError::UndeterminedBridge {
                anchors: self.anchor_count(),
            })?;

        self.segments = self
            .segments
            .iter()
            .rev()
            .map(|s| s.reversed(pivot))
            .collect();
        self.steps.reverse(pivot);
        self.start_anchor = Some(end);
        self.end_anchor = Some(start);
        Ok(())
    }

    /// Folds one read stretch into the bridge.
    pub fn merge_read(
        &mut self,
        ctx: &mut BridgeContext<'_>,
        read: &AlignedRead,
        connect: bool,
    ) -> MergeOutcome {
        if read.len() < 2 || self.completion_level() == 4 {
            return MergeOutcome::Unchanged;
        }
        let Some((flip_bridge, flip_read)) =
            self.orientation_plan(read.first_anchor(), read.last_anchor())
        else {
            debug!("read {} shares no anchor with the bridge", read.name);
            return MergeOutcome::Unchanged;
        };
        if flip_bridge && self.reverse().is_err() {
            return MergeOutcome::Unchanged;
        }
        let mut read = read.clone();
        if flip_read {
            read.reverse();
        }

        let alignments = read.alignments();
        let root = &alignments[0];
        let states: Vec<NodeVecState> = alignments
            .iter()
            .map(|a| {
                NodeVecState::new(
                    a.node,
                    AlignedRead::vector(root, a),
                    ctx.graph.node_len(a.node),
                    u32::from(a.quality),
                )
            })
            .collect();

        let anchors = self.anchor_count();
        let resolved = self.absorb_states(ctx, states, connect);
        self.outcome(anchors, resolved)
    }

    /// Folds another bridge's sightings into this one. The other bridge's
    /// segments and votes are not carried over.
    pub fn merge_bridge(
        &mut self,
        ctx: &mut BridgeContext<'_>,
        mut other: Bridge,
        connect: bool,
    ) -> MergeOutcome {
        if other.completion_level() == 0 || self.completion_level() == 4 {
            return MergeOutcome::Unchanged;
        }
        let Some((flip_bridge, flip_other)) =
            self.orientation_plan(other.start_anchor, other.end_anchor)
        else {
            return MergeOutcome::Unchanged;
        };
        if (flip_bridge && self.anchor_count() < 2) || (flip_other && other.anchor_count() < 2) {
            return MergeOutcome::Unchanged;
        }
        if flip_other && other.reverse().is_err() {
            return MergeOutcome::Unchanged;
        }
        if flip_bridge && self.reverse().is_err() {
            return MergeOutcome::Unchanged;
        }

        let states: Vec<NodeVecState> = other.steps.states().cloned().collect();
        let anchors = self.anchor_count();
        let resolved = self.absorb_states(ctx, states, connect);
        self.outcome(anchors, resolved)
    }

    fn outcome(&self, anchors_before: usize, resolved: bool) -> MergeOutcome {
        if self.anchor_count() > anchors_before {
            MergeOutcome::AnchorAdded
        } else if resolved {
            MergeOutcome::SegmentResolved
        } else {
            MergeOutcome::Unchanged
        }
    }

    fn absorb_states(
        &mut self,
        ctx: &mut BridgeContext<'_>,
        states: Vec<NodeVecState>,
        connect: bool,
    ) -> bool {
        let mut resolved = false;
        let mut last_segment = 0;
        for state in states {
            resolved |= self.vote(&state, &mut last_segment, ctx.config);
            if self.completion_level() < 3 {
                self.steps
                    .add_node(state, ctx.classifier, &ctx.config.search);
            }
        }
        if connect && self.completion_level() < 3 {
            self.connect(ctx, false);
        }
        resolved
    }

    /// Offers a sighting to the segments from `last_segment` on. Returns
    /// whether a segment went down to a single candidate.
    fn vote(
        &mut self,
        state: &NodeVecState,
        last_segment: &mut usize,
        config: &ResolverConfiguration,
    ) -> bool {
        let forward = self.steps.forward;
        let mut resolved = false;
        let mut previous = -1;
        for i in *last_segment..self.segments.len() {
            let segment = &mut self.segments[i];
            let before = segment.path_count();
            let located = segment.locate_and_vote(state, forward, config);
            if before > 1 && segment.is_unique() {
                resolved = true;
            }
            if located < previous {
                break;
            }
            previous = located;
            *last_segment = i;
        }
        resolved
    }

    /// Connects the steps from the last reached point up to the end step.
    ///
    /// Without `force`, an end that the graph cannot reach within the measured
    /// distance is dropped from the steps, together with the end anchor it
    /// set, and nothing is connected. The caller re-indexes the bridge.
    pub fn connect(&mut self, ctx: &mut BridgeContext<'_>, force: bool) -> bool {
        let good_support = ctx.config.bridge.good_support;
        let (Some(start_tag), Some(end_tag)) = (self.steps.start, self.steps.end) else {
            return false;
        };
        if !force && !self.steps.connectable(good_support) {
            return false;
        }
        let forward = self.steps.forward;
        let tip = match self.segments.last() {
            Some(segment) => segment.end.clone(),
            None => match self.steps.get(start_tag) {
                Some(start) => start.clone(),
                None => return false,
            },
        };
        let Some(end) = self.steps.get(end_tag).cloned() else {
            return false;
        };

        let distance = tip.distance_to(&end);
        let tree = DistanceTree::build(
            ctx.graph,
            end.node,
            end.arrival_side(forward),
            distance,
            ctx.config.search.allowance(distance),
        );
        if !tree.contains(tip.node, tip.arrival_side(forward)) && !force {
            debug!(
                "node {} cannot be reached from {} within {}, dropping it",
                end.node, tip.node, distance
            );
            self.steps.remove(end_tag);
            if self.end_anchor.is_some_and(|a| a.node == end.node) {
                self.end_anchor = None;
            }
            return false;
        }

        let tip_offset = tip.entry_offset(forward);
        let ahead: Vec<(u32, NodeVecState)> = self
            .steps
            .steps
            .iter()
            .filter(|s| s.state.entry_offset(forward) > tip_offset)
            .map(|s| (s.tag, s.state.clone()))
            .collect();

        let mut previous = tip;
        let mut deferred: Vec<NodeVecState> = Vec::new();
        let mut connected = false;
        for (tag, current) in ahead {
            let is_end = tag == end_tag;
            let reachable = is_end || tree.contains(current.node, current.arrival_side(forward));
            if !reachable || !ctx.classifier.bin_may_contain(self.bin, current.node) {
                continue;
            }
            if !is_end && !current.passes_qc(good_support) {
                deferred.push(current);
                continue;
            }

            let mut segment =
                BridgeSegment::connect(ctx, &previous, &current, forward, self.bin, force);
            if !segment.is_connected() {
                debug!(
                    "no path between {} and {}",
                    previous.node, current.node
                );
                break;
            }
            if segment.path_count() > 1 {
                for state in &deferred {
                    segment.locate_and_vote(state, forward, ctx.config);
                }
            }
            deferred.clear();
            self.segments.push(segment);
            previous = current;
            if is_end {
                connected = true;
                break;
            }
        }

        if !connected {
            self.segments.clear();
            return false;
        }
        if ctx.classifier.unique_bin(end.node).is_some() {
            self.end_anchor = Some(Anchor::new(end.node, end.arrival_side(forward)));
        }
        true
    }

    /// Moves the end step to the furthest unique node of the bridge's
    /// population, ignoring support when `force` is set.
    pub fn scan_for_an_end(
        &mut self,
        classifier: &dyn PopulationClassifier,
        good_support: u32,
        force: bool,
    ) -> bool {
        for step in self.steps.steps.iter().rev() {
            if !force && !step.state.passes_qc(good_support) {
                continue;
            }
            if Some(step.tag) == self.steps.start || Some(step.tag) == self.steps.end {
                return false;
            }
            let Some(bin) = classifier.unique_bin(step.state.node) else {
                continue;
            };
            if self.bin.map_or(true, |own| classifier.bins_compatible(own, bin)) {
                self.steps.end = Some(step.tag);
                return true;
            }
        }
        false
    }

    /// Joins the best candidate of every segment between `from` and `to`.
    pub fn best_path(&self, from: NodeId, to: NodeId) -> Option<BridgePath> {
        let mut joined: Option<BridgePath> = None;
        for segment in self.segments.iter().skip_while(|s| s.start.node != from) {
            let best = segment.best_path()?;
            joined = Some(match joined {
                None => best.clone(),
                Some(path) => path.join(best)?,
            });
            if segment.end.node == to {
                let mut path = joined?;
                path.set_bin(self.bin);
                return Some(path);
            }
        }
        None
    }

    /// Best path between the two anchors
    pub fn anchored_path(&self) -> Option<BridgePath> {
        let (start, end) = (self.start_anchor?, self.end_anchor?);
        self.best_path(start.node, end.node)
    }

    /// Best path between the start and end steps
    pub fn stepped_path(&self) -> Option<BridgePath> {
        let (start, end) = (self.steps.start()?, self.steps.end()?);
        self.best_path(start.node, end.node)
    }

    /// Unambiguous stretches between unique nodes of the bridge's population
    /// that the segments already agree on.
    pub fn scan_for_new_unique_paths(
        &self,
        classifier: &dyn PopulationClassifier,
    ) -> Vec<BridgePath> {
        let compatible = |node: NodeId| {
            classifier
                .unique_bin(node)
                .is_some_and(|b| self.bin.map_or(true, |own| classifier.bins_compatible(own, b)))
        };
        let mut found = Vec::new();
        let mut current: Option<BridgePath> = None;
        for segment in &self.segments {
            let Some(path) = segment.paths.first().filter(|_| segment.is_unique()) else {
                if let Some(done) = current.take() {
                    found.extend(chop_path_at_anchors(classifier, &done));
                }
                continue;
            };
            let mut path = path.clone();
            path.set_bin(self.bin);
            if compatible(segment.start.node) {
                if let Some(done) = current.take() {
                    found.extend(chop_path_at_anchors(classifier, &done));
                }
                current = Some(path);
            } else if let Some(acc) = current.take() {
                current = acc.join(&path);
            }
        }
        if let Some(done) = current {
            found.extend(chop_path_at_anchors(classifier, &done));
        }
        found
    }

    pub fn summary(&self) -> BridgeSummary {
        BridgeSummary {
            start: self.start_anchor.map(|a| a.to_string()),
            end: self.end_anchor.map(|a| a.to_string()),
            bin: self.bin,
            level: self.completion_level(),
            steps: self.steps.len(),
            candidates: self.segments.iter().map(BridgeSegment::path_count).collect(),
        }
    }
}
