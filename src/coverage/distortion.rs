use crate::graph::LabeledGraph;
use std::collections::HashMap;

#[derive(PartialEq, Eq, Hash)]
enum Signature<'a> {
    Vertex(&'a str),
    /// Smaller endpoint label, edge label, larger endpoint label.
    Edge(&'a str, &'a str, &'a str),
}

fn signatures(graph: &LabeledGraph) -> impl Iterator<Item = Signature<'_>> {
    let vertices = graph.vertices().map(|v| Signature::Vertex(graph.label(v)));
    let edges = graph.edges().map(|(a, b, label)| {
        let (a, b) = (graph.label(a), graph.label(b));
        if a <= b {
            Signature::Edge(a, label, b)
        } else {
            Signature::Edge(b, label, a)
        }
    });
    vertices.chain(edges)
}

/// L1 distance between the vertex label and edge signature histograms of two graphs.
///
/// Zero for isomorphic graphs; every single vertex or edge edit changes it by at most `2`.
pub fn histogram_distance(a: &LabeledGraph, b: &LabeledGraph) -> usize {
    let mut counts: HashMap<Signature, isize> = HashMap::new();
    for signature in signatures(a) {
        *counts.entry(signature).or_insert(0) += 1;
    }
    for signature in signatures(b) {
        *counts.entry(signature).or_insert(0) -= 1;
    }
    counts.values().map(|c| c.unsigned_abs()).sum()
}

/// Mismatch between a predicted product and the observed target graph.
///
/// `0` exactly when the graphs are isomorphic, otherwise the [`histogram_distance`], but at
/// least `1` (graphs with equal histograms can still differ in structure). Symmetric, and a
/// metric on isomorphism classes.
pub fn distortion(product: &LabeledGraph, target: &LabeledGraph) -> f64 {
    let distance = histogram_distance(product, target);
    if distance > 0 {
        distance as f64
    } else if product.is_isomorphic(target) {
        0.0
    } else {
        1.0
    }
}
