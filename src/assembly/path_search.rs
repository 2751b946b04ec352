//! Bounded Path Search
//! ===================
//!
//! Enumerates walks between two oriented nodes whose gap matches a distance
//! measured on long reads. The walk is grown by iterative deepening; every
//! extension is checked against a [`DistanceTree`] rooted at the destination,
//! so only continuations that can still land within tolerance are explored.

use tracing::debug;

use crate::assembly::distance_tree::DistanceTree;
use crate::binning::PopulationClassifier;
use crate::core::graph::{BidirectedGraph, EdgeId, EdgeKind, NodeId};
use crate::core::path::BridgePath;
use crate::utils::configuration::SearchConfig;

/// Two oriented endpoints and the gap measured between them
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SearchRequest {
    pub from: NodeId,
    /// Side the walk leaves `from` through
    pub leave: bool,
    pub to: NodeId,
    /// Side the walk enters `to` on
    pub arrive: bool,
    pub distance: i64,
    /// Both ends are confidently placed by the reads
    pub confident: bool,
}

/// Candidate walks for `request`, best first.
///
/// Returns `None` when the distance is above the search ceiling, or when no
/// walk fits and the gap cannot be bridged by a read-only edge.
pub fn find_paths(
    graph: &mut BidirectedGraph,
    classifier: &dyn PopulationClassifier,
    request: &SearchRequest,
    search: &SearchConfig,
) -> Option<Vec<BridgePath>> {
    if request.distance > search.distance_limit {
        debug!(
            "distance {} between {} and {} is above the limit {}",
            request.distance, request.from, request.to, search.distance_limit
        );
        return None;
    }

    let hits = enumerate_paths(graph, request, search);
    if !hits.is_empty() {
        return Some(rank_candidates(hits, request.distance, search));
    }
    synthetic_bridge(graph, classifier, request)
}

/// All walks within tolerance, unranked
pub fn enumerate_paths(
    graph: &BidirectedGraph,
    request: &SearchRequest,
    search: &SearchConfig,
) -> Vec<BridgePath> {
    let allowance = search.allowance(request.distance);
    let tree = DistanceTree::build(
        graph,
        request.to,
        request.arrive,
        request.distance,
        allowance,
    );
    let mut hits = Vec::new();
    if !tree.contains(request.from, !request.leave) {
        debug!(
            "{} is out of reach of {} within {}",
            request.from, request.to, request.distance
        );
        return hits;
    }

    for depth in 1..=search.max_depth {
        let truncated = search_to_depth(graph, &tree, request, depth, allowance, search, &mut hits);
        if hits.len() > search.hit_limit {
            debug!("search stopped after {} candidates", hits.len());
            break;
        }
        if !truncated {
            break;
        }
    }
    hits
}

struct Frame {
    edges: Vec<EdgeId>,
    next: usize,
    leave: bool,
    /// Gap still to cover from the tip to the destination
    remaining: i64,
}

/// Depth-limited pass. Hits are only recorded at exactly `depth` edges so that
/// successive passes never report the same walk twice. Returns whether some
/// admissible branch was cut by the depth limit.
fn search_to_depth(
    graph: &BidirectedGraph,
    tree: &DistanceTree,
    request: &SearchRequest,
    depth: usize,
    allowance: i64,
    search: &SearchConfig,
    hits: &mut Vec<BridgePath>,
) -> bool {
    let mut path = BridgePath::new(graph, request.from);
    let mut stack = vec![Frame {
        edges: graph.edges_at(request.from, request.leave).to_vec(),
        next: 0,
        leave: request.leave,
        remaining: request.distance,
    }];
    let mut truncated = false;

    while let Some(frame) = stack.last_mut() {
        if frame.next == frame.edges.len() {
            stack.pop();
            path.pop();
            continue;
        }
        let edge_id = frame.edges[frame.next];
        frame.next += 1;
        let (leave, remaining) = (frame.leave, frame.remaining);

        let edge = graph.edge(edge_id);
        let Some((node, arrive)) = edge.traverse(path.tip(), leave) else {
            continue;
        };
        let gap = remaining - edge.length;
        let reached = path.edge_count() + 1;

        if reached == depth
            && node == request.to
            && arrive == request.arrive
            && gap.abs() < allowance
        {
            let mut hit = path.clone();
            if hit.push_from(graph, edge_id, leave).is_ok() {
                hit.set_deviation(gap.abs());
                hits.push(hit);
                if hits.len() > search.hit_limit {
                    return true;
                }
            }
        }

        let beyond = gap - graph.node_len(node);
        let admissible = tree
            .distance(node, arrive)
            .is_some_and(|d| d <= beyond + allowance);
        if !admissible {
            continue;
        }
        if reached >= depth {
            truncated = true;
            continue;
        }
        if path.push_from(graph, edge_id, leave).is_err() {
            continue;
        }
        stack.push(Frame {
            edges: graph.edges_at(node, !arrive).to_vec(),
            next: 0,
            leave: !arrive,
            remaining: beyond,
        });
    }
    truncated
}

/// Best deviation first; candidates trailing the best by more than a
/// distance-proportional margin are dropped.
fn rank_candidates(
    mut hits: Vec<BridgePath>,
    distance: i64,
    search: &SearchConfig,
) -> Vec<BridgePath> {
    hits.sort_by_cached_key(|p| (p.deviation(), p.id()));
    let best = hits.first().map_or(0, |p| p.deviation());
    let margin = ((distance + search.kmer_size).abs() as f64 * search.relative_tolerance) as i64;
    hits.into_iter()
        .take(search.keep_best)
        .take_while(|p| p.deviation() <= best + margin)
        .collect()
}

/// A gap between two confidently placed dead ends is bridged by an edge
/// carrying no sequence.
fn synthetic_bridge(
    graph: &mut BidirectedGraph,
    classifier: &dyn PopulationClassifier,
    request: &SearchRequest,
) -> Option<Vec<BridgePath>> {
    let eligible = request.confident
        && classifier.unique_bin(request.from).is_some()
        && classifier.unique_bin(request.to).is_some()
        && graph.degree(request.from) == 1
        && graph.degree(request.to) == 1;
    if !eligible {
        return None;
    }

    let existing = graph.find_edge(request.from, request.to, request.leave, request.arrive);
    let edge = match existing {
        Some(edge) => edge,
        None => graph
            .add_edge_with_kind(
                request.from,
                request.to,
                request.leave,
                request.arrive,
                request.distance,
                EdgeKind::Synthetic,
            )
            .ok()?,
    };
    debug!(
        "bridging {} and {} with a {} base read-only gap",
        request.from, request.to, request.distance
    );
    let mut path = BridgePath::new(graph, request.from);
    path.push_from(graph, edge, request.leave).ok()?;
    Some(vec![path])
}

#[cfg(test)]
mod path_search_tests {
    use super::*;
    use crate::binning::StaticBinner;

    /// a -> x -> b and a -> y -> b, x and y of equal length
    fn bubble() -> (BidirectedGraph, [NodeId; 4]) {
        let mut g = BidirectedGraph::new(0);
        let a = g.add_node("a", 500, 10.0).unwrap();
        let x = g.add_node("x", 100, 20.0).unwrap();
        let y = g.add_node("y", 100, 20.0).unwrap();
        let b = g.add_node("b", 600, 10.0).unwrap();
        g.add_edge(a, x, true, false, 0).unwrap();
        g.add_edge(x, b, true, false, 0).unwrap();
        g.add_edge(a, y, true, false, 0).unwrap();
        g.add_edge(y, b, true, false, 0).unwrap();
        (g, [a, x, y, b])
    }

    fn request(from: NodeId, to: NodeId, distance: i64) -> SearchRequest {
        SearchRequest {
            from,
            leave: true,
            to,
            arrive: false,
            distance,
            confident: false,
        }
    }

    #[test]
    fn test_finds_both_branches() {
        let (mut g, [a, _, _, b]) = bubble();
        let binner = StaticBinner::new(0.25);
        let paths = find_paths(&mut g, &binner, &request(a, b, 100), &SearchConfig::default())
            .unwrap();
        assert_eq!(paths.len(), 2);
        for p in &paths {
            assert_eq!(p.deviation(), 0);
            assert_eq!(p.gap_length(), 100);
            assert_eq!(p.tip(), b);
        }
        assert!(paths[0].id() < paths[1].id());
    }

    #[test]
    fn test_orientation_must_match() {
        let (mut g, [a, _, _, b]) = bubble();
        let binner = StaticBinner::new(0.25);
        let mut wrong = request(a, b, 100);
        wrong.arrive = true;
        assert!(find_paths(&mut g, &binner, &wrong, &SearchConfig::default()).is_none());
    }

    #[test]
    fn test_distance_limit_short_circuits() {
        let (mut g, [a, _, _, b]) = bubble();
        let binner = StaticBinner::new(0.25);
        let search = SearchConfig::default();
        let far = request(a, b, search.distance_limit + 1);
        assert!(find_paths(&mut g, &binner, &far, &search).is_none());
    }

    #[test]
    fn test_out_of_tolerance_distance_finds_nothing() {
        let (mut g, [a, _, _, b]) = bubble();
        let binner = StaticBinner::new(0.25);
        let search = SearchConfig {
            absolute_tolerance: 50,
            relative_tolerance: 0.1,
            ..SearchConfig::default()
        };
        assert!(find_paths(&mut g, &binner, &request(a, b, 400), &search).is_none());
        assert_eq!(g.edge_count(), 4);
    }

    #[test]
    fn test_synthetic_edge_for_confident_dead_ends() {
        let mut g = BidirectedGraph::new(127);
        let a = g.add_node("a", 5000, 10.0).unwrap();
        let a2 = g.add_node("a2", 300, 10.0).unwrap();
        let b = g.add_node("b", 5000, 10.0).unwrap();
        let b2 = g.add_node("b2", 300, 10.0).unwrap();
        g.add_edge(a2, a, true, false, -127).unwrap();
        g.add_edge(b, b2, true, false, -127).unwrap();
        let mut binner = StaticBinner::new(0.25);
        binner.add_bin(1, 10.0);
        binner.assign(a, 1);
        binner.assign(b, 1);

        let mut req = request(a, b, 800);
        assert!(find_paths(&mut g, &binner, &req, &SearchConfig::default()).is_none());

        req.confident = true;
        let paths = find_paths(&mut g, &binner, &req, &SearchConfig::default()).unwrap();
        assert_eq!(paths.len(), 1);
        assert_eq!(paths[0].edge_count(), 1);
        assert_eq!(paths[0].gap_length(), 800);
        let edge = g.find_edge(a, b, true, false).unwrap();
        assert!(matches!(g.edge(edge).kind, EdgeKind::Synthetic));

        // the new edge is found by the search from now on
        let again = find_paths(&mut g, &binner, &req, &SearchConfig::default()).unwrap();
        assert_eq!(again[0].edges().next(), Some(edge));
    }

    #[test]
    fn test_loop_is_walked_within_budget() {
        // a -> r -> b, with r looping back onto its own in side
        let mut g = BidirectedGraph::new(0);
        let a = g.add_node("a", 1000, 10.0).unwrap();
        let r = g.add_node("r", 300, 30.0).unwrap();
        let b = g.add_node("b", 1000, 10.0).unwrap();
        g.add_edge(a, r, true, false, 0).unwrap();
        g.add_edge(r, b, true, false, 0).unwrap();
        g.add_edge(r, r, true, false, 0).unwrap();
        let search = SearchConfig {
            absolute_tolerance: 100,
            relative_tolerance: 0.0,
            ..SearchConfig::default()
        };
        let binner = StaticBinner::new(0.25);

        let once = find_paths(&mut g, &binner, &request(a, b, 300), &search).unwrap();
        assert_eq!(once[0].edge_count(), 2);
        let twice = find_paths(&mut g, &binner, &request(a, b, 600), &search).unwrap();
        assert_eq!(twice[0].edge_count(), 3);
        assert_eq!(twice[0].deviation(), 0);
    }
}
