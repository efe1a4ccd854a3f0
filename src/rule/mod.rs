//! Graph transformation rules.
//!
//! A [`Rule`] is stored as a single combined graph in which every vertex and edge carries a
//! [`RuleLabel`] with an optional left and right label:
//!
//!  - `left == right`: the element is context and is preserved.
//!  - `left` only: the element is deleted.
//!  - `right` only: the element is created.
//!  - both, but different: the element is relabeled.
//!
//! A left label [`WILDCARD`] matches any host label. A right label [`WILDCARD`] keeps the label
//! of the matched host element.
//!
//! Rules are matched node-induced: a host edge between two matched vertices must be present
//! in the left side, and vice versa. Deleting a vertex requires that all its host edges are
//! deleted by the same rule (the dangling condition).

use crate::error::RuleFormatError;
use crate::graph::{
    self, EdgeDescription, GraphDescription, LabeledGraph, VertexDescription, WILDCARD,
};
use petgraph::graph::{NodeIndex, UnGraph};
use petgraph::visit::EdgeRef;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, HashSet};

#[cfg(test)]
mod tests;

/// Left and right label of a rule element.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RuleLabel {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub left: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub right: Option<String>,
}

impl RuleLabel {
    pub fn new(left: Option<&str>, right: Option<&str>) -> RuleLabel {
        RuleLabel {
            left: left.map(str::to_string),
            right: right.map(str::to_string),
        }
    }

    pub fn context(label: &str) -> RuleLabel {
        RuleLabel::new(Some(label), Some(label))
    }

    /// Preserved without change.
    pub fn is_context(&self) -> bool {
        self.left.is_some() && self.left == self.right
    }
}

/// Images of the left-side vertices of a rule in a host graph, in left-side order.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Embedding(Vec<usize>);

impl Embedding {
    pub fn new(images: Vec<NodeIndex>) -> Embedding {
        Embedding(images.into_iter().map(|v| v.index()).collect())
    }

    pub fn image(&self, position: usize) -> NodeIndex {
        NodeIndex::new(self.0[position])
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(into = "RuleDescription", try_from = "RuleDescription")]
pub struct Rule {
    graph: UnGraph<RuleLabel, RuleLabel>,
    /// The left side as a plain pattern graph.
    left: UnGraph<String, String>,
    /// Rule vertex of every left-side vertex.
    left_vertices: Vec<NodeIndex>,
    /// Inverse of `left_vertices`.
    left_position: Vec<Option<usize>>,
    /// How many host vertices of each concrete label the left side needs.
    left_labels: Vec<(String, usize)>,
    /// Symmetry class of every left-side vertex: permuting images within a class does not
    /// change the product of an application.
    left_symmetry: Vec<usize>,
    fingerprint: u64,
}

impl Rule {
    /// Build a rule from its combined graph.
    ///
    /// The graph must be well-formed (see [`Rule::validate`]), which is what the rule
    /// generator always produces.
    pub fn new(graph: UnGraph<RuleLabel, RuleLabel>) -> Rule {
        let mut left = UnGraph::default();
        let mut left_vertices = Vec::new();
        let mut left_position = vec![None; graph.node_count()];
        let mut label_counts: BTreeMap<String, usize> = BTreeMap::new();
        for vertex in graph.node_indices() {
            if let Some(label) = &graph[vertex].left {
                left_position[vertex.index()] = Some(left_vertices.len());
                left_vertices.push(vertex);
                left.add_node(label.clone());
                if label != WILDCARD {
                    *label_counts.entry(label.clone()).or_insert(0) += 1;
                }
            }
        }
        for edge in graph.edge_references() {
            let Some(label) = &edge.weight().left else {
                continue;
            };
            if let (Some(a), Some(b)) = (
                left_position[edge.source().index()],
                left_position[edge.target().index()],
            ) {
                left.add_edge(NodeIndex::new(a), NodeIndex::new(b), label.clone());
            }
        }
        let fingerprint = graph::fingerprint(&graph);
        let left_symmetry = symmetry_classes(&graph, &left_vertices);
        Rule {
            graph,
            left,
            left_vertices,
            left_position,
            left_labels: label_counts.into_iter().collect(),
            left_symmetry,
            fingerprint,
        }
    }

    /// Check that every element exists on at least one side, that edges only connect vertices
    /// present on the same side, and that created elements carry concrete labels.
    pub fn validate(graph: &UnGraph<RuleLabel, RuleLabel>) -> Result<(), RuleFormatError> {
        for vertex in graph.node_indices() {
            let label = &graph[vertex];
            match (&label.left, &label.right) {
                (None, None) => {
                    return Err(RuleFormatError(format!(
                        "vertex {} has neither a left nor a right label",
                        vertex.index()
                    )));
                }
                (None, Some(right)) if right == WILDCARD => {
                    return Err(RuleFormatError(format!(
                        "created vertex {} has a wildcard label",
                        vertex.index()
                    )));
                }
                _ => (),
            }
        }
        for edge in graph.edge_references() {
            let label = edge.weight();
            let (a, b) = (&graph[edge.source()], &graph[edge.target()]);
            let describe = || format!("edge {} -- {}", edge.source().index(), edge.target().index());
            match (&label.left, &label.right) {
                (None, None) => {
                    return Err(RuleFormatError(format!(
                        "{} has neither a left nor a right label",
                        describe()
                    )));
                }
                (None, Some(right)) if right == WILDCARD => {
                    return Err(RuleFormatError(format!(
                        "created {} has a wildcard label",
                        describe()
                    )));
                }
                _ => (),
            }
            if label.left.is_some() && (a.left.is_none() || b.left.is_none()) {
                return Err(RuleFormatError(format!(
                    "{} is on the left side, but one of its endpoints is not",
                    describe()
                )));
            }
            if label.right.is_some() && (a.right.is_none() || b.right.is_none()) {
                return Err(RuleFormatError(format!(
                    "{} is on the right side, but one of its endpoints is not",
                    describe()
                )));
            }
        }
        Ok(())
    }

    pub fn graph(&self) -> &UnGraph<RuleLabel, RuleLabel> {
        &self.graph
    }

    pub fn left(&self) -> &UnGraph<String, String> {
        &self.left
    }

    pub fn left_vertices(&self) -> &[NodeIndex] {
        &self.left_vertices
    }

    pub fn vertex_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    pub fn fingerprint(&self) -> u64 {
        self.fingerprint
    }

    /// An isomorphism to `other`, as the image of every vertex of this rule.
    pub fn isomorphism_to(&self, other: &Rule) -> Option<Vec<NodeIndex>> {
        if self.fingerprint != other.fingerprint {
            return None;
        }
        graph::isomorphism(&self.graph, &other.graph, |a, b| a == b, |a, b| a == b)
    }

    /// Re-express an embedding of `other` as an embedding of this rule, where `mapping` is an
    /// isomorphism from this rule to `other` (see [`Rule::isomorphism_to`]).
    pub fn translate_embedding(
        &self,
        other: &Rule,
        mapping: &[NodeIndex],
        embedding: &Embedding,
    ) -> Option<Embedding> {
        let images = self
            .left_vertices
            .iter()
            .map(|vertex| {
                let position = other.left_position[mapping[vertex.index()].index()]?;
                Some(embedding.image(position))
            })
            .collect::<Option<Vec<_>>>()?;
        Some(Embedding::new(images))
    }

    /// Cheap necessary condition for the existence of an embedding into `host`.
    pub fn may_match(&self, host: &LabeledGraph, histogram: &HashMap<&str, usize>) -> bool {
        self.left.node_count() <= host.vertex_count()
            && self.left.edge_count() <= host.edge_count()
            && self
                .left_labels
                .iter()
                .all(|(label, count)| histogram.get(label.as_str()).copied().unwrap_or(0) >= *count)
    }

    /// Host vertices matched onto vertices deleted by the rule have no host edges beyond the
    /// ones the rule deletes with them.
    pub fn satisfies_dangling_condition(&self, host: &LabeledGraph, images: &[NodeIndex]) -> bool {
        self.left_vertices
            .iter()
            .enumerate()
            .all(|(position, &vertex)| {
                self.graph[vertex].right.is_some()
                    || host.degree(images[position])
                        == self.left.neighbors(NodeIndex::new(position)).count()
            })
    }

    /// Up to `limit` applicable embeddings into `host`. Embeddings that differ only by a
    /// symmetry of the rule apply it the same way and are reported once.
    pub fn embeddings(&self, host: &LabeledGraph, limit: usize) -> Vec<Embedding> {
        let mut seen = HashSet::new();
        graph::embeddings(&self.left, host.inner(), limit, |images| {
            self.satisfies_dangling_condition(host, images)
                && seen.insert(self.symmetry_key(images))
        })
        .into_iter()
        .map(Embedding::new)
        .collect()
    }

    /// Images of the left side with the order inside every symmetry class forgotten.
    fn symmetry_key(&self, images: &[NodeIndex]) -> Vec<(usize, NodeIndex)> {
        let mut key: Vec<(usize, NodeIndex)> = self
            .left_symmetry
            .iter()
            .copied()
            .zip(images.iter().copied())
            .collect();
        key.sort();
        key
    }

    /// Rewrite `host` at the given embedding. The embedding must be applicable.
    pub fn apply(&self, host: &LabeledGraph, embedding: &Embedding) -> LabeledGraph {
        let mut matched: Vec<Option<NodeIndex>> = vec![None; host.vertex_count()];
        for (position, &vertex) in self.left_vertices.iter().enumerate() {
            matched[embedding.image(position).index()] = Some(vertex);
        }

        let mut product = LabeledGraph::new(host.name());
        let mut image: Vec<Option<NodeIndex>> = vec![None; host.vertex_count()];
        for vertex in host.vertices() {
            let label = match matched[vertex.index()] {
                None => Some(host.label(vertex)),
                Some(rule_vertex) => self.graph[rule_vertex]
                    .right
                    .as_deref()
                    .map(|right| keep_wildcard(right, host.label(vertex))),
            };
            if let Some(label) = label {
                image[vertex.index()] = Some(product.add_vertex(label));
            }
        }
        let mut created: Vec<Option<NodeIndex>> = vec![None; self.graph.node_count()];
        for vertex in self.graph.node_indices() {
            let label = &self.graph[vertex];
            if let (None, Some(right)) = (&label.left, &label.right) {
                created[vertex.index()] = Some(product.add_vertex(right.clone()));
            }
        }

        for (a, b, host_label) in host.edges() {
            let (Some(image_a), Some(image_b)) = (image[a.index()], image[b.index()]) else {
                continue;
            };
            let label = match (matched[a.index()], matched[b.index()]) {
                (Some(rule_a), Some(rule_b)) => match self.graph.find_edge(rule_a, rule_b) {
                    Some(edge) => self.graph[edge]
                        .right
                        .as_deref()
                        .map(|right| keep_wildcard(right, host_label)),
                    None => Some(host_label),
                },
                _ => Some(host_label),
            };
            if let Some(label) = label {
                product.add_edge(image_a, image_b, label);
            }
        }

        let endpoint = |vertex: NodeIndex| {
            created[vertex.index()].or_else(|| {
                let position = self.left_position[vertex.index()]?;
                image[embedding.image(position).index()]
            })
        };
        let mut new_edges = Vec::new();
        for edge in self.graph.edge_references() {
            let label = edge.weight();
            let (None, Some(right)) = (&label.left, &label.right) else {
                continue;
            };
            if let (Some(a), Some(b)) = (endpoint(edge.source()), endpoint(edge.target())) {
                new_edges.push((a, b, right.clone()));
            }
        }
        for (a, b, label) in new_edges {
            product.add_edge(a, b, label);
        }
        product
    }

    /// Split the rule into its left, context and right parts for reporting.
    ///
    /// Edges of the left and right part may reference context vertices.
    pub fn sides(&self) -> RuleSides {
        let mut sides = RuleSides::default();
        for vertex in self.graph.node_indices() {
            let label = &self.graph[vertex];
            let push = |side: &mut GraphDescription, label: &String| {
                side.vertices.push(VertexDescription {
                    id: vertex.index(),
                    label: label.clone(),
                })
            };
            if label.is_context() {
                if let Some(left) = &label.left {
                    push(&mut sides.context, left);
                }
                continue;
            }
            if let Some(left) = &label.left {
                push(&mut sides.left, left);
            }
            if let Some(right) = &label.right {
                push(&mut sides.right, right);
            }
        }
        for edge in self.graph.edge_references() {
            let label = edge.weight();
            let push = |side: &mut GraphDescription, label: &String| {
                side.edges.push(EdgeDescription {
                    source: edge.source().index(),
                    target: edge.target().index(),
                    label: label.clone(),
                })
            };
            if label.is_context() {
                if let Some(left) = &label.left {
                    push(&mut sides.context, left);
                }
                continue;
            }
            if let Some(left) = &label.left {
                push(&mut sides.left, left);
            }
            if let Some(right) = &label.right {
                push(&mut sides.right, right);
            }
        }
        sides
    }
}

/// Left-side vertices that only carry context (with context edges only) form one class:
/// their images keep their labels and edges whatever the permutation. Other vertices share a
/// class with their twins, i.e. vertices with the same label and the same labeled neighbours,
/// which the rule cannot tell apart.
fn symmetry_classes(graph: &UnGraph<RuleLabel, RuleLabel>, left_vertices: &[NodeIndex]) -> Vec<usize> {
    let mut classes: HashMap<Option<(&RuleLabel, Vec<(NodeIndex, &RuleLabel)>)>, usize> =
        HashMap::new();
    left_vertices
        .iter()
        .map(|&vertex| {
            let passive = graph[vertex].is_context()
                && graph.edges(vertex).all(|edge| edge.weight().is_context());
            let key = (!passive).then(|| {
                let mut neighbours: Vec<(NodeIndex, &RuleLabel)> = graph
                    .edges(vertex)
                    .map(|edge| {
                        let other = if edge.source() == vertex {
                            edge.target()
                        } else {
                            edge.source()
                        };
                        (other, edge.weight())
                    })
                    .collect();
                neighbours.sort_by_key(|(other, _)| *other);
                (&graph[vertex], neighbours)
            });
            let next = classes.len();
            *classes.entry(key).or_insert(next)
        })
        .collect()
}

fn keep_wildcard<'a>(right: &'a str, host: &'a str) -> &'a str {
    if right == WILDCARD { host } else { right }
}

/// Left, context and right part of a rule.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleSides {
    pub left: GraphDescription,
    pub context: GraphDescription,
    pub right: GraphDescription,
}

/// Serialized form of a [`Rule`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleDescription {
    pub vertices: Vec<RuleVertexDescription>,
    pub edges: Vec<RuleEdgeDescription>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleVertexDescription {
    pub id: usize,
    #[serde(flatten)]
    pub label: RuleLabel,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleEdgeDescription {
    pub source: usize,
    pub target: usize,
    #[serde(flatten)]
    pub label: RuleLabel,
}

impl From<Rule> for RuleDescription {
    fn from(value: Rule) -> Self {
        let graph = &value.graph;
        RuleDescription {
            vertices: graph
                .node_indices()
                .map(|v| RuleVertexDescription {
                    id: v.index(),
                    label: graph[v].clone(),
                })
                .collect(),
            edges: graph
                .edge_references()
                .map(|edge| RuleEdgeDescription {
                    source: edge.source().index(),
                    target: edge.target().index(),
                    label: edge.weight().clone(),
                })
                .collect(),
        }
    }
}

impl TryFrom<RuleDescription> for Rule {
    type Error = RuleFormatError;

    fn try_from(value: RuleDescription) -> Result<Self, Self::Error> {
        let mut graph = UnGraph::default();
        let mut ids = BTreeMap::new();
        for vertex in value.vertices {
            if ids.insert(vertex.id, graph.add_node(vertex.label)).is_some() {
                return Err(RuleFormatError(format!("duplicate vertex id {}", vertex.id)));
            }
        }
        for edge in value.edges {
            let (Some(&a), Some(&b)) = (ids.get(&edge.source), ids.get(&edge.target)) else {
                return Err(RuleFormatError(format!(
                    "edge {} -- {} references an unknown vertex",
                    edge.source, edge.target
                )));
            };
            if a == b || graph.find_edge(a, b).is_some() {
                return Err(RuleFormatError(format!(
                    "edge {} -- {} is a loop or a parallel edge",
                    edge.source, edge.target
                )));
            }
            graph.add_edge(a, b, edge.label);
        }
        Rule::validate(&graph)?;
        Ok(Rule::new(graph))
    }
}
