//! Long-read alignments against graph nodes and the scaffold vectors derived
//! from them.

use serde::{Deserialize, Serialize};

use crate::core::graph::{BidirectedGraph, NodeId};
use crate::core::scaffold::{Anchor, ScaffoldVector};
use crate::utils::configuration::AlignmentConfig;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Alignment {
    pub read_name: String,
    pub node: NodeId,
    /// Mapping quality
    pub quality: u8,
    /// Read maps to the node's forward strand
    pub forward: bool,
    pub read_start: i64,
    pub read_end: i64,
    pub read_length: i64,
    pub ref_start: i64,
    pub ref_end: i64,
    pub useful: bool,
}

impl Alignment {
    /// Alignment of `read[read_start..read_end]` against the whole of `node`.
    pub fn new(
        read_name: impl Into<String>,
        node: NodeId,
        read_start: i64,
        read_end: i64,
        forward: bool,
        quality: u8,
    ) -> Self {
        Self {
            read_name: read_name.into(),
            node,
            quality,
            forward,
            read_start,
            read_end,
            read_length: read_end,
            ref_start: 0,
            ref_end: read_end - read_start,
            useful: true,
        }
    }

    pub fn with_reference(mut self, ref_start: i64, ref_end: i64) -> Self {
        self.ref_start = ref_start;
        self.ref_end = ref_end;
        self
    }

    pub fn with_read_length(mut self, read_length: i64) -> Self {
        self.read_length = read_length;
        self
    }

    /// Recomputes `useful` from the filtering thresholds
    pub fn assess(&mut self, graph: &BidirectedGraph, config: &AlignmentConfig) {
        let node_length = graph.node_len(self.node).max(1);
        let spanned = self.ref_end - self.ref_start;
        self.useful = self.quality >= config.min_quality
            && (spanned as f64 >= config.min_spanning_fraction * node_length as f64
                || spanned >= config.min_spanning_bases);
    }

    /// Read coordinate of position 0 of the node
    pub fn node_origin(&self) -> i64 {
        if self.forward {
            self.read_start - self.ref_start
        } else {
            self.read_end + self.ref_start
        }
    }

    fn strand_sign(&self) -> i64 {
        if self.forward {
            1
        } else {
            -1
        }
    }

    /// Whether this alignment's read range overlaps another's
    pub fn overlaps(&self, other: &Alignment) -> bool {
        self.read_start < other.read_end && other.read_start < self.read_end
    }

    /// The same alignment seen from the reverse complement of the read
    pub fn flipped(&self) -> Alignment {
        Alignment {
            forward: !self.forward,
            read_start: self.read_length - self.read_end,
            read_end: self.read_length - self.read_start,
            ..self.clone()
        }
    }
}

/// A stretch of one read's alignments in read order
#[derive(Debug, Clone, PartialEq, Default)]
pub struct AlignedRead {
    pub name: String,
    alignments: Vec<Alignment>,
}

impl AlignedRead {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            alignments: Vec::new(),
        }
    }

    pub fn from_alignments(name: impl Into<String>, alignments: Vec<Alignment>) -> Self {
        Self {
            name: name.into(),
            alignments,
        }
    }

    pub fn push(&mut self, alignment: Alignment) {
        self.alignments.push(alignment);
    }

    pub fn alignments(&self) -> &[Alignment] {
        &self.alignments
    }

    pub fn len(&self) -> usize {
        self.alignments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.alignments.is_empty()
    }

    pub fn first(&self) -> Option<&Alignment> {
        self.alignments.first()
    }

    pub fn last(&self) -> Option<&Alignment> {
        self.alignments.last()
    }

    /// Side of the first node the read leaves it from
    pub fn first_anchor(&self) -> Option<Anchor> {
        self.first().map(|a| Anchor::new(a.node, a.forward))
    }

    /// Side of the last node the read enters it on
    pub fn last_anchor(&self) -> Option<Anchor> {
        self.last().map(|a| Anchor::new(a.node, !a.forward))
    }

    /// Reads the alignments from the other end of the read
    pub fn reverse(&mut self) {
        self.alignments.reverse();
        for alignment in &mut self.alignments {
            *alignment = alignment.flipped();
        }
    }

    /// Scaffold vector placing `to` in the frame of `from`
    pub fn vector(from: &Alignment, to: &Alignment) -> ScaffoldVector {
        let sign = from.strand_sign();
        ScaffoldVector::new(
            sign * (to.node_origin() - from.node_origin()),
            from.forward == to.forward,
        )
    }
}

#[cfg(test)]
mod alignment_tests {
    use super::*;

    #[test]
    fn test_vector_between_forward_alignments() {
        // A occupies read 0..500, B starts 300 bases later
        let a = Alignment::new("r", 0, 0, 500, true, 60);
        let b = Alignment::new("r", 1, 800, 1400, true, 60);
        let v = AlignedRead::vector(&a, &b);
        assert_eq!(v, ScaffoldVector::new(800, true));
        assert_eq!(v.distance(500, 600), 300);
    }

    #[test]
    fn test_vector_with_reverse_strand() {
        // A is read on its reverse strand, B forward
        let a = Alignment::new("r", 0, 0, 500, false, 60);
        let b = Alignment::new("r", 1, 800, 1400, true, 60);
        let v = AlignedRead::vector(&a, &b);
        assert!(!v.same_strand());
        assert_eq!(v.distance(500, 600), 300);
        assert_eq!(v.reverse().distance(600, 500), 300);
    }

    #[test]
    fn test_partial_reference_span() {
        let a = Alignment::new("r", 0, 100, 500, true, 60).with_reference(100, 500);
        assert_eq!(a.node_origin(), 0);
        let b = Alignment::new("r", 1, 0, 400, false, 60).with_reference(50, 450);
        assert_eq!(b.node_origin(), 450);
    }

    #[test]
    fn test_reverse_keeps_relative_geometry() {
        let a = Alignment::new("r", 0, 0, 500, true, 60).with_read_length(1400);
        let b = Alignment::new("r", 1, 800, 1400, true, 60).with_read_length(1400);
        let mut read = AlignedRead::from_alignments("r", vec![a, b]);
        let before = AlignedRead::vector(&read.alignments()[0], &read.alignments()[1]);

        read.reverse();
        assert_eq!(read.first().unwrap().node, 1);
        assert!(!read.first().unwrap().forward);
        assert_eq!(read.first().unwrap().read_start, 0);
        let after = AlignedRead::vector(&read.alignments()[0], &read.alignments()[1]);
        assert_eq!(after, before.reverse());
    }

    #[test]
    fn test_anchors_follow_strand() {
        let read = AlignedRead::from_alignments(
            "r",
            vec![
                Alignment::new("r", 0, 0, 500, true, 60),
                Alignment::new("r", 1, 800, 1400, false, 60),
            ],
        );
        assert_eq!(read.first_anchor(), Some(Anchor::new(0, true)));
        assert_eq!(read.last_anchor(), Some(Anchor::new(1, true)));
    }

    #[test]
    fn test_assess_usefulness() {
        let mut g = BidirectedGraph::new(127);
        let n = g.add_node("n", 5000, 1.0).unwrap();
        let config = AlignmentConfig::default();

        let mut short = Alignment::new("r", n, 0, 200, true, 60);
        short.assess(&g, &config);
        assert!(!short.useful);

        let mut long = Alignment::new("r", n, 0, 400, true, 60);
        long.assess(&g, &config);
        assert!(long.useful);

        let mut unmapped = Alignment::new("r", n, 0, 4000, true, 0);
        unmapped.assess(&g, &config);
        assert!(!unmapped.useful);
    }
}
