//! Labeled undirected simple graphs and the matching primitives built on top of them.
//!
//! Graphs are thin wrappers around [`petgraph::graph::UnGraph`] with `String` labels on both
//! vertices and edges. Vertex indices are dense (`0..vertex_count`) and are used as vertex ids
//! in every serialized form.

use petgraph::graph::{NodeIndex, UnGraph};
use petgraph::visit::EdgeRef;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

mod fingerprint;
mod matching;


pub use fingerprint::fingerprint;
pub use matching::{embeddings, isomorphism, label_matches};

/// A label that matches any label when it appears on the left side of a rule.
pub const WILDCARD: &str = "*";

#[derive(Clone, Debug, Default)]
pub struct LabeledGraph {
    name: String,
    graph: UnGraph<String, String>,
}

impl LabeledGraph {
    pub fn new(name: impl Into<String>) -> LabeledGraph {
        LabeledGraph {
            name: name.into(),
            graph: UnGraph::default(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn inner(&self) -> &UnGraph<String, String> {
        &self.graph
    }

    pub fn add_vertex(&mut self, label: impl Into<String>) -> NodeIndex {
        self.graph.add_node(label.into())
    }

    /// Add or relabel the edge `a -- b`. Graphs stay simple.
    pub fn add_edge(&mut self, a: NodeIndex, b: NodeIndex, label: impl Into<String>) {
        self.graph.update_edge(a, b, label.into());
    }

    pub fn vertex_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    pub fn vertices(&self) -> impl Iterator<Item = NodeIndex> + '_ {
        self.graph.node_indices()
    }

    pub fn label(&self, vertex: NodeIndex) -> &str {
        &self.graph[vertex]
    }

    pub fn edge_label(&self, a: NodeIndex, b: NodeIndex) -> Option<&str> {
        self.graph
            .find_edge(a, b)
            .map(|edge| self.graph[edge].as_str())
    }

    /// All edges as `(a, b, label)` triples, each listed once.
    pub fn edges(&self) -> impl Iterator<Item = (NodeIndex, NodeIndex, &str)> + '_ {
        self.graph
            .edge_references()
            .map(|edge| (edge.source(), edge.target(), edge.weight().as_str()))
    }

    pub fn neighbors(&self, vertex: NodeIndex) -> impl Iterator<Item = NodeIndex> + '_ {
        self.graph.neighbors(vertex)
    }

    pub fn degree(&self, vertex: NodeIndex) -> usize {
        self.graph.neighbors(vertex).count()
    }

    /// Number of vertices per label.
    pub fn vertex_histogram(&self) -> HashMap<&str, usize> {
        let mut histogram = HashMap::new();
        for label in self.graph.node_weights() {
            *histogram.entry(label.as_str()).or_insert(0) += 1;
        }
        histogram
    }

    /// Labeled isomorphism test.
    pub fn is_isomorphic(&self, other: &LabeledGraph) -> bool {
        isomorphism(&self.graph, &other.graph, |a, b| a == b, |a, b| a == b).is_some()
    }

    pub fn fingerprint(&self) -> u64 {
        fingerprint(&self.graph)
    }
}

/// Serialized form of a [`LabeledGraph`], shared by input files and reports.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphDescription {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub vertices: Vec<VertexDescription>,
    pub edges: Vec<EdgeDescription>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct VertexDescription {
    pub id: usize,
    pub label: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EdgeDescription {
    pub source: usize,
    pub target: usize,
    pub label: String,
}

impl From<&LabeledGraph> for GraphDescription {
    fn from(value: &LabeledGraph) -> Self {
        GraphDescription {
            name: Some(value.name.clone()),
            vertices: value
                .vertices()
                .map(|v| VertexDescription {
                    id: v.index(),
                    label: value.label(v).to_string(),
                })
                .collect(),
            edges: value
                .edges()
                .map(|(a, b, label)| EdgeDescription {
                    source: a.index(),
                    target: b.index(),
                    label: label.to_string(),
                })
                .collect(),
        }
    }
}

impl GraphDescription {
    /// Build a validated graph. Vertex ids can be arbitrary, the returned map translates them
    /// to the dense vertex indices of the graph.
    pub fn build(
        &self,
        default_name: &str,
    ) -> Result<(LabeledGraph, BTreeMap<usize, NodeIndex>), String> {
        let name = self.name.clone().unwrap_or_else(|| default_name.to_string());
        let mut graph = LabeledGraph::new(name);
        let mut ids = BTreeMap::new();
        for vertex in &self.vertices {
            if ids.contains_key(&vertex.id) {
                return Err(format!("duplicate vertex id {}", vertex.id));
            }
            ids.insert(vertex.id, graph.add_vertex(vertex.label.clone()));
        }
        for edge in &self.edges {
            let (Some(&a), Some(&b)) = (ids.get(&edge.source), ids.get(&edge.target)) else {
                return Err(format!(
                    "edge {} -- {} references an unknown vertex",
                    edge.source, edge.target
                ));
            };
            if a == b {
                return Err(format!("self loop on vertex {}", edge.source));
            }
            if graph.edge_label(a, b).is_some() {
                return Err(format!(
                    "parallel edge {} -- {}",
                    edge.source, edge.target
                ));
            }
            graph.add_edge(a, b, edge.label.clone());
        }
        Ok((graph, ids))
    }
}
