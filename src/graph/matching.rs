use crate::graph::WILDCARD;
use petgraph::algo::subgraph_isomorphisms_iter;
use petgraph::graph::{NodeIndex, UnGraph};

/// True if a left-side `pattern` label accepts the `host` label.
pub fn label_matches(pattern: &str, host: &str) -> bool {
    pattern == WILDCARD || pattern == host
}

/// Find an isomorphism from `a` to `b`, returned as the image of every vertex of `a`.
pub fn isomorphism<N, E, FN, FE>(
    a: &UnGraph<N, E>,
    b: &UnGraph<N, E>,
    mut node_match: FN,
    mut edge_match: FE,
) -> Option<Vec<NodeIndex>>
where
    FN: FnMut(&N, &N) -> bool,
    FE: FnMut(&E, &E) -> bool,
{
    if a.node_count() != b.node_count() || a.edge_count() != b.edge_count() {
        return None;
    }
    if a.node_count() == 0 {
        return Some(Vec::new());
    }
    // With equal vertex counts, an induced subgraph match is a full isomorphism.
    let mut matches = subgraph_isomorphisms_iter(&a, &b, &mut node_match, &mut edge_match)?;
    matches
        .next()
        .map(|mapping| mapping.into_iter().map(NodeIndex::new).collect())
}

/// Enumerate node-induced embeddings of `pattern` into `host`, honouring wildcard labels on the
/// pattern side. Only embeddings passing `accept` are counted towards `limit`.
///
/// Every embedding is the image of every pattern vertex, in pattern index order.
pub fn embeddings<F>(
    pattern: &UnGraph<String, String>,
    host: &UnGraph<String, String>,
    limit: usize,
    mut accept: F,
) -> Vec<Vec<NodeIndex>>
where
    F: FnMut(&[NodeIndex]) -> bool,
{
    if limit == 0
        || pattern.node_count() > host.node_count()
        || pattern.edge_count() > host.edge_count()
    {
        return Vec::new();
    }
    if pattern.node_count() == 0 {
        return if accept(&[]) { vec![Vec::new()] } else { Vec::new() };
    }

    let mut node_match = |p: &String, h: &String| label_matches(p, h);
    let mut edge_match = |p: &String, h: &String| label_matches(p, h);
    let Some(matches) = subgraph_isomorphisms_iter(&pattern, &host, &mut node_match, &mut edge_match)
    else {
        return Vec::new();
    };
    matches
        .map(|mapping| mapping.into_iter().map(NodeIndex::new).collect::<Vec<_>>())
        .filter(|embedding| accept(embedding.as_slice()))
        .take(limit)
        .collect()
}
