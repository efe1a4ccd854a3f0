pub mod example_maps;

use crate::graph::{GraphDescription, LabeledGraph};
use crate::store::{GRAPHS_FOLDER, IteratedMap, TRANSITIONS_FOLDER, TransitionFile};
use petgraph::graph::NodeIndex;
use std::fs;
use std::path::PathBuf;

/// Initialize env_logger for tests. Safe to call multiple times.
pub fn init_logger() {
    let _ = env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Trace)
        .is_test(true)
        .try_init();
}

/// Build a graph from vertex labels and `(a, b, label)` edges over vertex positions.
///
/// # Example
///
/// `mk_graph("ethanol-ish", &["C", "C", "O"], &[(0, 1, "-"), (1, 2, "-")])`
pub fn mk_graph(name: &str, vertices: &[&str], edges: &[(usize, usize, &str)]) -> LabeledGraph {
    let mut graph = LabeledGraph::new(name);
    for label in vertices {
        graph.add_vertex(*label);
    }
    for &(a, b, label) in edges {
        assert!(
            a < vertices.len() && b < vertices.len(),
            "Edge {a} -- {b} out of range for {} vertices",
            vertices.len()
        );
        graph.add_edge(NodeIndex::new(a), NodeIndex::new(b), label);
    }
    graph
}

/// Write `map` into a fresh input directory under the system temp folder.
pub fn write_map(map: &IteratedMap, name: &str) -> PathBuf {
    let dir = scratch_dir(name);
    fs::create_dir_all(dir.join(GRAPHS_FOLDER)).unwrap();
    fs::create_dir_all(dir.join(TRANSITIONS_FOLDER)).unwrap();
    for (i, graph) in map.graphs().iter().enumerate() {
        let json = serde_json::to_string(&GraphDescription::from(graph)).unwrap();
        fs::write(dir.join(GRAPHS_FOLDER).join(format!("{i:03}.json")), json).unwrap();
    }
    for (i, transition) in map.transitions().iter().enumerate() {
        let file = TransitionFile {
            name: Some(transition.name.clone()),
            source: transition.source,
            target: transition.target,
            label: transition.label.clone(),
            vertex_map: transition
                .vertex_map
                .as_ref()
                .map(|pairs| pairs.iter().map(|(a, b)| (a.index(), b.index())).collect()),
        };
        let json = serde_json::to_string(&file).unwrap();
        fs::write(dir.join(TRANSITIONS_FOLDER).join(format!("{i:03}.json")), json).unwrap();
    }
    dir
}

/// A fresh, empty directory under the system temp folder.
pub fn scratch_dir(name: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("gtri-{}-{}", name, std::process::id()));
    let _ = fs::remove_dir_all(&dir);
    fs::create_dir_all(&dir).unwrap();
    dir
}
