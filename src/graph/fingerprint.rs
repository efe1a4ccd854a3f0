use petgraph::graph::UnGraph;
use petgraph::visit::EdgeRef;
use std::hash::{DefaultHasher, Hash, Hasher};

/// Number of colour refinement rounds. Enough to separate the small neighbourhoods that rules
/// typically consist of; collisions are resolved by an exact isomorphism test anyway.
const REFINEMENT_ROUNDS: usize = 3;

fn hash_of<T: Hash>(value: &T) -> u64 {
    let mut hasher = DefaultHasher::new();
    value.hash(&mut hasher);
    hasher.finish()
}

/// Isomorphism-invariant hash of a labeled graph (Weisfeiler-Lehman colour refinement).
///
/// Isomorphic graphs always share a fingerprint. The converse does not hold.
pub fn fingerprint<N: Hash, E: Hash>(graph: &UnGraph<N, E>) -> u64 {
    let mut colors: Vec<u64> = graph.node_weights().map(hash_of).collect();
    for _ in 0..REFINEMENT_ROUNDS {
        colors = graph
            .node_indices()
            .map(|vertex| {
                let mut neighbourhood: Vec<(u64, u64)> = graph
                    .edges(vertex)
                    .map(|edge| {
                        let other = if edge.source() == vertex {
                            edge.target()
                        } else {
                            edge.source()
                        };
                        (hash_of(edge.weight()), colors[other.index()])
                    })
                    .collect();
                neighbourhood.sort_unstable();
                hash_of(&(colors[vertex.index()], neighbourhood))
            })
            .collect();
    }
    colors.sort_unstable();
    hash_of(&(graph.node_count(), graph.edge_count(), colors))
}
