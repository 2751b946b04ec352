//! Distance tree against an exhaustive relaxation
//! Non-negative edge lengths, random graphs, fixed seeds

use ahash::AHashMap;
use bridge_forge::assembly::DistanceTree;
use bridge_forge::core::graph::{BidirectedGraph, NodeId};
use bridge_forge::core::scaffold::Anchor;

fn random_graph(rng: &mut fastrand::Rng, nodes: usize, edges: usize) -> BidirectedGraph {
    let mut g = BidirectedGraph::new(0);
    for i in 0..nodes {
        g.add_node(format!("n{i}"), rng.i64(1..500), 10.0).unwrap();
    }
    for _ in 0..edges {
        let a = rng.u32(0..nodes as u32);
        let b = rng.u32(0..nodes as u32);
        if a != b {
            let _ = g.add_edge(a, b, rng.bool(), rng.bool(), rng.i64(0..300));
        }
    }
    g
}

/// Same recurrence as the tree, relaxed until nothing changes
fn brute_force(
    g: &BidirectedGraph,
    target: NodeId,
    arrive: bool,
    ceiling: i64,
) -> AHashMap<Anchor, i64> {
    let mut best: AHashMap<Anchor, i64> = AHashMap::new();
    best.insert(Anchor::new(target, arrive), -g.node_len(target));
    loop {
        let mut changed = false;
        let known: Vec<(Anchor, i64)> = best.iter().map(|(k, v)| (*k, *v)).collect();
        for (key, distance) in known {
            for &edge_id in g.edges_at(key.node, key.side) {
                let edge = g.edge(edge_id);
                let Some((next, attached)) = edge.traverse(key.node, key.side) else {
                    continue;
                };
                let candidate = distance + g.node_len(key.node) + edge.length;
                if candidate > ceiling {
                    continue;
                }
                let next_key = Anchor::new(next, !attached);
                if best.get(&next_key).map_or(true, |&d| candidate < d) {
                    best.insert(next_key, candidate);
                    changed = true;
                }
            }
        }
        if !changed {
            return best;
        }
    }
}

#[cfg(test)]
pub mod distance_tree_properties {
    use super::*;

    #[test]
    fn property_tree_matches_exhaustive_relaxation() {
        let mut rng = fastrand::Rng::with_seed(29);
        for _ in 0..100 {
            let g = random_graph(&mut rng, 14, 35);
            let target = rng.u32(0..14);
            let arrive = rng.bool();
            let max_distance = rng.i64(0..1500);
            let slack = rng.i64(0..300);

            let tree = DistanceTree::build(&g, target, arrive, max_distance, slack);
            let expected = brute_force(&g, target, arrive, max_distance + slack);

            assert_eq!(tree.len(), expected.len());
            for (key, distance) in &expected {
                assert_eq!(tree.distance(key.node, key.side), Some(*distance));
            }
            assert_eq!(tree.distance(target, arrive), Some(-g.node_len(target)));
        }
    }

    #[test]
    fn property_tree_respects_its_ceiling() {
        let mut rng = fastrand::Rng::with_seed(31);
        for _ in 0..100 {
            let g = random_graph(&mut rng, 12, 30);
            let target = rng.u32(0..12);
            let tree = DistanceTree::build(&g, target, false, rng.i64(0..800), 50);
            assert_eq!(tree.root(), Anchor::new(target, false));
            for (_, distance) in tree.iter() {
                assert!(distance <= tree.ceiling());
            }
        }
    }
}
