//! Oriented Paths
//! ==============
//!
//! A [`BridgePath`] is a walk through the bidirected graph starting at a root
//! node. Each step records the edge taken, the side it was left from, the node
//! reached and the side it was entered on, together with the lengths needed to
//! keep the running total without going back to the graph.

use std::borrow::Cow;
use std::fmt;

use crate::binning::BinId;
use crate::core::graph::{BidirectedGraph, EdgeId, EdgeKey, GraphError, NodeId};
use crate::utils::configuration::SearchConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PathStep {
    pub edge: EdgeId,
    /// Side of the previous node the edge leaves from
    pub leave: bool,
    pub node: NodeId,
    /// Side of `node` the edge enters on
    pub arrive: bool,
    pub edge_length: i64,
    pub node_length: i64,
}

impl PathStep {
    /// Whether `node` is read on its forward strand
    pub fn forward(&self) -> bool {
        !self.arrive
    }
}

#[derive(Debug, Clone)]
pub struct BridgePath {
    root: NodeId,
    root_length: i64,
    steps: Vec<PathStep>,
    length: i64,
    deviation: i64,
    vote: i32,
    bin: Option<BinId>,
}

impl BridgePath {
    pub fn new(graph: &BidirectedGraph, root: NodeId) -> Self {
        let root_length = graph.node_len(root);
        Self {
            root,
            root_length,
            steps: Vec::new(),
            length: root_length,
            deviation: 0,
            vote: 0,
            bin: None,
        }
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn tip(&self) -> NodeId {
        self.steps.last().map_or(self.root, |s| s.node)
    }

    pub fn steps(&self) -> &[PathStep] {
        &self.steps
    }

    pub fn edges(&self) -> impl Iterator<Item = EdgeId> + '_ {
        self.steps.iter().map(|s| s.edge)
    }

    pub fn nodes(&self) -> impl Iterator<Item = NodeId> + '_ {
        std::iter::once(self.root).chain(self.steps.iter().map(|s| s.node))
    }

    pub fn edge_count(&self) -> usize {
        self.steps.len()
    }

    pub fn node_count(&self) -> usize {
        self.steps.len() + 1
    }

    pub fn is_trivial(&self) -> bool {
        self.steps.is_empty()
    }

    /// Total length including both end nodes
    pub fn length(&self) -> i64 {
        self.length
    }

    /// Length between the two end nodes
    pub fn gap_length(&self) -> i64 {
        let tip_length = self.steps.last().map_or(0, |s| s.node_length);
        self.length - self.root_length - tip_length
    }

    pub fn deviation(&self) -> i64 {
        self.deviation
    }

    pub fn set_deviation(&mut self, deviation: i64) {
        self.deviation = deviation;
    }

    pub fn vote(&self) -> i32 {
        self.vote
    }

    pub fn upvote(&mut self) {
        self.vote += 1;
    }

    pub fn downvote(&mut self) {
        self.vote -= 1;
    }

    pub fn bin(&self) -> Option<BinId> {
        self.bin
    }

    pub fn set_bin(&mut self, bin: Option<BinId>) {
        self.bin = bin;
    }

    /// Side the walk leaves the root from
    pub fn first_side(&self) -> Option<bool> {
        self.steps.first().map(|s| s.leave)
    }

    /// Side the walk enters its tip on
    pub fn last_side(&self) -> Option<bool> {
        self.steps.last().map(|s| s.arrive)
    }

    /// Key of the edge that would summarize this path
    pub fn ending_key(&self) -> Option<EdgeKey> {
        Some(EdgeKey::new(
            self.root,
            self.tip(),
            self.first_side()?,
            self.last_side()?,
        ))
    }

    /// Extends the walk with `edge`, leaving the tip on the side opposite the
    /// one it was entered on.
    pub fn push(&mut self, graph: &BidirectedGraph, edge: EdgeId) -> Result<(), GraphError> {
        let leave = match self.steps.last() {
            Some(last) => !last.arrive,
            None => graph
                .edge(edge)
                .side_at(self.root)
                .ok_or(GraphError::Discontinuous {
                    key: graph.edge(edge).key,
                    node: self.root,
                })?,
        };
        self.push_from(graph, edge, leave)
    }

    /// Extends the walk with `edge` taken from side `leave` of the tip.
    pub fn push_from(
        &mut self,
        graph: &BidirectedGraph,
        edge: EdgeId,
        leave: bool,
    ) -> Result<(), GraphError> {
        let tip = self.tip();
        let e = graph.edge(edge);
        let (node, arrive) = e.traverse(tip, leave).ok_or(GraphError::Discontinuous {
            key: e.key,
            node: tip,
        })?;
        let step = PathStep {
            edge,
            leave,
            node,
            arrive,
            edge_length: e.length,
            node_length: graph.node_len(node),
        };
        self.length += step.edge_length + step.node_length;
        self.steps.push(step);
        Ok(())
    }

    pub fn pop(&mut self) -> Option<PathStep> {
        let step = self.steps.pop()?;
        self.length -= step.edge_length + step.node_length;
        Some(step)
    }

    /// The same walk read from the tip back to the root.
    pub fn reversed(&self) -> BridgePath {
        let mut steps = Vec::with_capacity(self.steps.len());
        for (i, step) in self.steps.iter().enumerate().rev() {
            let (prev, prev_length) = if i == 0 {
                (self.root, self.root_length)
            } else {
                (self.steps[i - 1].node, self.steps[i - 1].node_length)
            };
            steps.push(PathStep {
                edge: step.edge,
                leave: step.arrive,
                node: prev,
                arrive: step.leave,
                edge_length: step.edge_length,
                node_length: prev_length,
            });
        }
        BridgePath {
            root: self.tip(),
            root_length: self.steps.last().map_or(self.root_length, |s| s.node_length),
            steps,
            length: self.length,
            deviation: self.deviation,
            vote: self.vote,
            bin: self.bin,
        }
    }

    /// Concatenates `other` onto the tip of this path.
    ///
    /// Returns `None` when the paths do not meet at the same node, or when
    /// `other` would leave the junction node on the side this path entered it.
    pub fn join(&self, other: &BridgePath) -> Option<BridgePath> {
        if other.is_trivial() {
            return (other.root == self.tip()).then(|| self.clone());
        }
        if self.is_trivial() && self.root == other.root {
            return Some(other.clone());
        }
        if other.root != self.tip() {
            return None;
        }
        if let (Some(arrive), Some(leave)) = (self.last_side(), other.first_side()) {
            if arrive == leave {
                return None;
            }
        }

        let mut joined = self.clone();
        joined.steps.extend_from_slice(&other.steps);
        joined.length += other.length - other.root_length;
        joined.deviation += other.deviation;
        Some(joined)
    }

    /// Checks whether this path places `to` at `distance` bases from `from`,
    /// on the same relative strand when `same_strand` is set. Returns the
    /// smallest deviation among the placements that agree.
    pub fn check_distance_consistency(
        &self,
        from: NodeId,
        to: NodeId,
        same_strand: bool,
        distance: i64,
        search: &SearchConfig,
    ) -> Option<i64> {
        let walk = if from == self.root {
            Cow::Borrowed(self)
        } else if from == self.tip() {
            Cow::Owned(self.reversed())
        } else {
            return None;
        };
        let from_forward = walk.first_side()?;
        let allowance = search.allowance(distance);

        let mut covered = 0i64;
        let mut best: Option<i64> = None;
        for step in walk.steps() {
            covered += step.edge_length;
            if step.node == to {
                let deviation = (covered - distance).abs();
                if deviation < allowance && (from_forward == step.forward()) == same_strand {
                    best = Some(best.map_or(deviation, |b| b.min(deviation)));
                }
            }
            covered += step.node_length;
        }
        best
    }

    /// The stretch of this walk between its `from`-th and `to`-th nodes
    pub fn sub_path(&self, from: usize, to: usize) -> Option<BridgePath> {
        if from > to || to > self.steps.len() {
            return None;
        }
        let (root, root_length) = match from {
            0 => (self.root, self.root_length),
            i => (self.steps[i - 1].node, self.steps[i - 1].node_length),
        };
        let steps = self.steps[from..to].to_vec();
        let length = root_length
            + steps
                .iter()
                .map(|s| s.edge_length + s.node_length)
                .sum::<i64>();
        Some(BridgePath {
            root,
            root_length,
            steps,
            length,
            deviation: 0,
            vote: self.vote,
            bin: self.bin,
        })
    }

    /// Replaces every summary edge by the walk it stands for.
    pub fn primitive(&self, graph: &BidirectedGraph) -> BridgePath {
        let mut flat = BridgePath {
            steps: Vec::with_capacity(self.steps.len()),
            length: self.root_length,
            ..self.clone()
        };
        for step in &self.steps {
            let expanded = graph
                .edge(step.edge)
                .represented_path()
                .map(|inner| inner.primitive(graph))
                .and_then(|inner| orient_between(inner, flat.tip(), step.leave));
            match expanded {
                Some(inner) => {
                    flat.length += inner.length - inner.root_length;
                    flat.steps.extend_from_slice(&inner.steps);
                }
                None => {
                    flat.length += step.edge_length + step.node_length;
                    flat.steps.push(*step);
                }
            }
        }
        flat
    }

    /// Nucleotide sequence spelled by the walk. Overlaps are trimmed and gaps
    /// are filled with `N`.
    pub fn spell(&self, graph: &BidirectedGraph) -> Vec<u8> {
        let flat = self.primitive(graph);
        let root_forward = flat.first_side().unwrap_or(true);
        let mut sequence = oriented(&graph.node(flat.root).sequence, root_forward);
        for step in &flat.steps {
            let next = oriented(&graph.node(step.node).sequence, step.forward());
            if step.edge_length < 0 {
                let skip = (-step.edge_length as usize).min(next.len());
                sequence.extend_from_slice(&next[skip..]);
            } else {
                sequence.extend(std::iter::repeat(b'N').take(step.edge_length as usize));
                sequence.extend_from_slice(&next);
            }
        }
        sequence
    }

    /// Compact rendering by node handle, e.g. `3+,7-,2+`
    pub fn id(&self) -> String {
        self.to_string()
    }

    /// Rendering by node name
    pub fn label(&self, graph: &BidirectedGraph) -> String {
        self.render(|n| graph.node(n).name.clone())
    }

    fn render(&self, name: impl Fn(NodeId) -> String) -> String {
        let mut out = format!(
            "{}{}",
            name(self.root),
            strand_char(self.first_side().unwrap_or(true))
        );
        for step in &self.steps {
            out.push(',');
            out.push_str(&name(step.node));
            out.push(strand_char(step.forward()));
        }
        out
    }
}

impl fmt::Display for BridgePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render(|n| n.to_string()))
    }
}

fn strand_char(forward: bool) -> char {
    if forward {
        '+'
    } else {
        '-'
    }
}

fn orient_between(path: BridgePath, from: NodeId, leave: bool) -> Option<BridgePath> {
    if path.root == from && path.first_side() == Some(leave) {
        return Some(path);
    }
    let reversed = path.reversed();
    (reversed.root == from && reversed.first_side() == Some(leave)).then_some(reversed)
}

fn oriented(sequence: &[u8], forward: bool) -> Vec<u8> {
    if forward {
        sequence.to_vec()
    } else {
        reverse_complement(sequence)
    }
}

pub fn reverse_complement(sequence: &[u8]) -> Vec<u8> {
    sequence
        .iter()
        .rev()
        .map(|&b| match b {
            b'A' => b'T',
            b'T' => b'A',
            b'C' => b'G',
            b'G' => b'C',
            b'a' => b't',
            b't' => b'a',
            b'c' => b'g',
            b'g' => b'c',
            other => other,
        })
        .collect()
}

#[cfg(test)]
mod path_tests {
    use super::*;

    /// a+ -> b+ -> c- with a 10 base overlap between a and b
    fn chain() -> (BidirectedGraph, [NodeId; 3], [EdgeId; 2]) {
        let mut g = BidirectedGraph::new(10);
        let a = g.add_node("a", 50, 1.0).unwrap();
        let b = g.add_node("b", 30, 1.0).unwrap();
        let c = g.add_node("c", 40, 1.0).unwrap();
        let ab = g.add_edge(a, b, true, false, -10).unwrap();
        let bc = g.add_edge(b, c, true, true, 5).unwrap();
        (g, [a, b, c], [ab, bc])
    }

    #[test]
    fn test_push_tracks_length_and_sides() {
        let (g, [a, b, c], [ab, bc]) = chain();
        let mut p = BridgePath::new(&g, a);
        p.push(&g, ab).unwrap();
        p.push(&g, bc).unwrap();
        assert_eq!(p.length(), 50 - 10 + 30 + 5 + 40);
        assert_eq!(p.gap_length(), -10 + 30 + 5);
        assert_eq!(p.nodes().collect::<Vec<_>>(), vec![a, b, c]);
        assert_eq!(p.to_string(), format!("{a}+,{b}+,{c}-"));
        assert_eq!(p.first_side(), Some(true));
        assert_eq!(p.last_side(), Some(true));
    }

    #[test]
    fn test_push_rejects_discontinuous_edge() {
        let (g, [a, _, _], [_, bc]) = chain();
        let mut p = BridgePath::new(&g, a);
        assert!(p.push(&g, bc).is_err());
        assert!(p.is_trivial());
    }

    #[test]
    fn test_reverse_flips_orientation() {
        let (g, [a, b, c], [ab, bc]) = chain();
        let mut p = BridgePath::new(&g, a);
        p.push(&g, ab).unwrap();
        p.push(&g, bc).unwrap();
        p.set_deviation(7);

        let r = p.reversed();
        assert_eq!(r.root(), c);
        assert_eq!(r.to_string(), format!("{c}+,{b}-,{a}-"));
        assert_eq!(r.length(), p.length());
        assert_eq!(r.deviation(), 7);

        let rr = r.reversed();
        assert_eq!(rr.to_string(), p.to_string());
        assert_eq!(rr.length(), p.length());
        assert_eq!(rr.steps(), p.steps());
    }

    #[test]
    fn test_join_at_shared_node() {
        let (g, [a, b, _], [ab, bc]) = chain();
        let mut left = BridgePath::new(&g, a);
        left.push(&g, ab).unwrap();
        let mut right = BridgePath::new(&g, b);
        right.push(&g, bc).unwrap();

        let joined = left.join(&right).unwrap();
        assert_eq!(joined.length(), left.length() + right.length() - 30);
        assert_eq!(joined.edge_count(), 2);
    }

    #[test]
    fn test_join_rejects_turning_back() {
        let (g, [a, b, _], [ab, _]) = chain();
        let mut left = BridgePath::new(&g, a);
        left.push(&g, ab).unwrap();
        // leaves b through the side it was entered on
        let mut back = BridgePath::new(&g, b);
        back.push_from(&g, ab, false).unwrap();
        assert!(left.join(&back).is_none());
    }

    #[test]
    fn test_join_with_trivial_paths() {
        let (g, [a, b, c], [ab, _]) = chain();
        let mut left = BridgePath::new(&g, a);
        left.push(&g, ab).unwrap();
        assert!(left.join(&BridgePath::new(&g, b)).is_some());
        assert!(left.join(&BridgePath::new(&g, c)).is_none());
        let joined = BridgePath::new(&g, a).join(&left).unwrap();
        assert_eq!(joined.to_string(), left.to_string());
    }

    #[test]
    fn test_distance_consistency() {
        let (g, [a, b, c], [ab, bc]) = chain();
        let search = SearchConfig {
            absolute_tolerance: 5,
            relative_tolerance: 0.0,
            ..SearchConfig::default()
        };
        let mut p = BridgePath::new(&g, a);
        p.push(&g, ab).unwrap();
        p.push(&g, bc).unwrap();

        // a+ then c- : opposite strands, gap -10 + 30 + 5
        assert_eq!(p.check_distance_consistency(a, c, false, 26, &search), Some(1));
        assert_eq!(p.check_distance_consistency(a, c, true, 25, &search), None);
        assert_eq!(p.check_distance_consistency(a, c, false, 60, &search), None);
        // measured from the other end
        assert_eq!(p.check_distance_consistency(c, b, false, 5, &search), Some(0));
        assert_eq!(p.check_distance_consistency(b, c, false, 5, &search), None);
    }

    #[test]
    fn test_sub_path() {
        let (g, [a, b, c], [ab, bc]) = chain();
        let mut p = BridgePath::new(&g, a);
        p.push(&g, ab).unwrap();
        p.push(&g, bc).unwrap();

        let tail = p.sub_path(1, 2).unwrap();
        assert_eq!(tail.root(), b);
        assert_eq!(tail.tip(), c);
        assert_eq!(tail.length(), 30 + 5 + 40);
        assert_eq!(p.sub_path(0, 2).unwrap().length(), p.length());
        assert!(p.sub_path(1, 3).is_none());
    }

    #[test]
    fn test_spell_trims_overlap_and_fills_gaps() {
        let mut g = BidirectedGraph::new(2);
        let a = g.add_node("a", 4, 1.0).unwrap();
        let b = g.add_node("b", 4, 1.0).unwrap();
        let c = g.add_node("c", 2, 1.0).unwrap();
        g.set_sequence(a, b"ACGT".to_vec());
        g.set_sequence(b, b"GTTA".to_vec());
        g.set_sequence(c, b"CC".to_vec());
        let ab = g.add_edge(a, b, true, false, -2).unwrap();
        let bc = g.add_edge(b, c, true, true, 3).unwrap();

        let mut p = BridgePath::new(&g, a);
        p.push(&g, ab).unwrap();
        p.push(&g, bc).unwrap();
        assert_eq!(p.spell(&g), b"ACGTTANNNGG".to_vec());
        assert_eq!(p.reversed().spell(&g), reverse_complement(b"ACGTTANNNGG"));
    }
}
