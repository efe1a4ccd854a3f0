use crate::generator::Level;
use crate::generator::correspondence::Delta;
use crate::graph::{LabeledGraph, WILDCARD};
use crate::rule::{Embedding, Rule, RuleLabel};
use petgraph::graph::{NodeIndex, UnGraph};
use petgraph::visit::EdgeRef;
use std::collections::BTreeSet;

/// The union of a transition's source and target graph under a [`Delta`], with every element
/// labeled by its source label (left) and target label (right).
///
/// Vertex `i < source_count` is source vertex `i`; the remaining vertices are created ones.
/// Every rule of a transition is a subgraph of this graph.
pub struct TransitionGraph {
    graph: UnGraph<RuleLabel, RuleLabel>,
    source_count: usize,
}

impl TransitionGraph {
    pub fn new(source: &LabeledGraph, target: &LabeledGraph, delta: &Delta) -> TransitionGraph {
        let mut graph = UnGraph::default();
        let mut of_target: Vec<Option<NodeIndex>> = vec![None; target.vertex_count()];
        for vertex in source.vertices() {
            let image = delta.image(vertex);
            let right = image.map(|t| target.label(t));
            let added = graph.add_node(RuleLabel::new(Some(source.label(vertex)), right));
            if let Some(t) = image {
                of_target[t.index()] = Some(added);
            }
        }
        for vertex in target.vertices() {
            if of_target[vertex.index()].is_none() {
                let added = graph.add_node(RuleLabel::new(None, Some(target.label(vertex))));
                of_target[vertex.index()] = Some(added);
            }
        }

        for (a, b, label) in source.edges() {
            let right = match (delta.image(a), delta.image(b)) {
                (Some(ta), Some(tb)) => target.edge_label(ta, tb),
                _ => None,
            };
            graph.add_edge(a, b, RuleLabel::new(Some(label), right));
        }
        for (a, b, label) in target.edges() {
            let (Some(ra), Some(rb)) = (of_target[a.index()], of_target[b.index()]) else {
                continue;
            };
            if graph.find_edge(ra, rb).is_none() {
                graph.add_edge(ra, rb, RuleLabel::new(None, Some(label)));
            }
        }

        TransitionGraph {
            graph,
            source_count: source.vertex_count(),
        }
    }

    /// Vertices that change, or are endpoints of a changing edge.
    pub fn touched(&self) -> BTreeSet<NodeIndex> {
        let mut touched: BTreeSet<NodeIndex> = self
            .graph
            .node_indices()
            .filter(|v| !self.graph[*v].is_context())
            .collect();
        for edge in self.graph.edge_references() {
            if !edge.weight().is_context() {
                touched.insert(edge.source());
                touched.insert(edge.target());
            }
        }
        touched
    }

    /// Extend `vertices` by all source vertices within `radius` source edges.
    pub fn neighbourhood(&self, vertices: &BTreeSet<NodeIndex>, radius: usize) -> BTreeSet<NodeIndex> {
        let mut result = vertices.clone();
        let mut frontier: Vec<NodeIndex> = vertices.iter().copied().collect();
        for _ in 0..radius {
            let mut next = Vec::new();
            for vertex in frontier {
                for edge in self.graph.edges(vertex) {
                    if edge.weight().left.is_none() {
                        continue;
                    }
                    let other = if edge.source() == vertex {
                        edge.target()
                    } else {
                        edge.source()
                    };
                    if result.insert(other) {
                        next.push(other);
                    }
                }
            }
            frontier = next;
        }
        result
    }

    /// The rule induced by `vertices` at the given generalization level, together with the
    /// embedding of its left side into the transition's source graph.
    pub fn rule(&self, vertices: &BTreeSet<NodeIndex>, level: Level) -> (Rule, Embedding) {
        let mut graph = UnGraph::default();
        let mut new_index: Vec<Option<NodeIndex>> = vec![None; self.graph.node_count()];
        let mut origin = Vec::with_capacity(vertices.len());
        for &vertex in vertices {
            let label = generalize(&self.graph[vertex], level);
            new_index[vertex.index()] = Some(graph.add_node(label));
            origin.push(vertex);
        }
        for edge in self.graph.edge_references() {
            if let (Some(a), Some(b)) = (
                new_index[edge.source().index()],
                new_index[edge.target().index()],
            ) {
                graph.add_edge(a, b, generalize(edge.weight(), level));
            }
        }

        let rule = Rule::new(graph);
        let anchor = rule
            .left_vertices()
            .iter()
            .map(|v| {
                let vertex = origin[v.index()];
                debug_assert!(vertex.index() < self.source_count);
                vertex
            })
            .collect();
        (rule, Embedding::new(anchor))
    }
}

/// At the abstract level, left labels become wildcards: preserved elements keep whatever label
/// they are matched to, changed elements accept any label.
fn generalize(label: &RuleLabel, level: Level) -> RuleLabel {
    if level != Level::Abstract || label.left.is_none() {
        return label.clone();
    }
    if label.is_context() {
        RuleLabel::context(WILDCARD)
    } else {
        RuleLabel {
            left: Some(WILDCARD.to_string()),
            right: label.right.clone(),
        }
    }
}
