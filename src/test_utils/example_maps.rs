//! Small iterated maps shared by the tests of all pipeline stages.
//!
//! Vertices are chemical-looking (`C`, `O`, `N`) and every edge is a single bond (`-`) unless
//! stated otherwise.

use crate::graph::LabeledGraph;
use crate::store::{IteratedMap, Transition};
use crate::test_utils::mk_graph;
use petgraph::graph::NodeIndex;

/// `C-C`.
pub fn ethane() -> LabeledGraph {
    mk_graph("C-C", &["C", "C"], &[(0, 1, "-")])
}

/// `C-C-O`, oxygen on vertex `1`.
pub fn ethanol() -> LabeledGraph {
    mk_graph("C-C-O", &["C", "C", "O"], &[(0, 1, "-"), (1, 2, "-")])
}

/// `O-C-C-O`.
pub fn ethylene_glycol() -> LabeledGraph {
    mk_graph(
        "O-C-C-O",
        &["C", "C", "O", "O"],
        &[(0, 1, "-"), (1, 2, "-"), (0, 3, "-")],
    )
}

/// A saturated chain of `carbons` carbons with explicit hydrogens, where the carbons listed in
/// `hydroxyls` carry an `O-H` group in place of one hydrogen.
///
/// Carbons are vertices `0..carbons`, followed by the substituents of every carbon in order.
pub fn alkane(carbons: usize, hydroxyls: &[usize]) -> LabeledGraph {
    let mut graph = LabeledGraph::new(format!("C{carbons} {hydroxyls:?}"));
    let chain: Vec<NodeIndex> = (0..carbons).map(|_| graph.add_vertex("C")).collect();
    for pair in chain.windows(2) {
        graph.add_edge(pair[0], pair[1], "-");
    }
    for (position, &carbon) in chain.iter().enumerate() {
        let mut hydrogens = 4 - usize::from(position > 0) - usize::from(position + 1 < carbons);
        if hydroxyls.contains(&position) {
            let oxygen = graph.add_vertex("O");
            graph.add_edge(carbon, oxygen, "-");
            let hydrogen = graph.add_vertex("H");
            graph.add_edge(oxygen, hydrogen, "-");
            hydrogens -= 1;
        }
        for _ in 0..hydrogens {
            let hydrogen = graph.add_vertex("H");
            graph.add_edge(carbon, hydrogen, "-");
        }
    }
    graph
}

/// `G0 -> G1 -> G2`, both steps attach one oxygen to a carbon without one.
///
/// Vertex correspondences are not given and have to be inferred.
pub fn oxidation_chain() -> IteratedMap {
    IteratedMap::new(
        vec![ethane(), ethanol(), ethylene_glycol()],
        vec![
            Transition::new("t1", "oxidation", 0, 1),
            Transition::new("t2", "oxidation", 1, 2),
        ],
    )
    .unwrap()
}

/// Two transitions on unrelated graphs: attaching an oxygen to carbon, and turning an `N-N`
/// single bond into a double bond. Neither rule matches the other transition's source.
pub fn distinct_rules() -> IteratedMap {
    IteratedMap::new(
        vec![
            ethane(),
            ethanol(),
            mk_graph("N-N", &["N", "N"], &[(0, 1, "-")]),
            mk_graph("N=N", &["N", "N"], &[(0, 1, "=")]),
        ],
        vec![
            Transition::new("oxidation", "oxidation", 0, 1).with_vertex_map(&[(0, 0), (1, 1)]),
            Transition::new("double-bond", "double-bond", 2, 3)
                .with_vertex_map(&[(0, 0), (1, 1)]),
        ],
    )
    .unwrap()
}

/// An oxidation step plus an `N-N -> N-N` step that changes nothing.
pub fn with_noop() -> IteratedMap {
    IteratedMap::new(
        vec![
            ethane(),
            ethanol(),
            mk_graph("N-N", &["N", "N"], &[(0, 1, "-")]),
            mk_graph("N-N copy", &["N", "N"], &[(0, 1, "-")]),
        ],
        vec![
            Transition::new("oxidation", "oxidation", 0, 1),
            Transition::new("noop", "noop", 2, 3),
        ],
    )
    .unwrap()
}

/// Two transitions out of `C-C`: one attaches an oxygen, the other a nitrogen.
///
/// Each rule also applies to the other transition with distortion `4`.
pub fn competing_substituents() -> IteratedMap {
    IteratedMap::new(
        vec![
            ethane(),
            ethanol(),
            mk_graph("C-C-N", &["C", "C", "N"], &[(0, 1, "-"), (1, 2, "-")]),
        ],
        vec![
            Transition::new("oxidation", "oxidation", 0, 1),
            Transition::new("amination", "amination", 0, 2),
        ],
    )
    .unwrap()
}
