//! Vertex correspondences between the source and target graph of a transition.
//!
//! A correspondence determines the structural delta of a transition: unmapped source vertices
//! are deleted, unmapped target vertices are created, and mapped elements whose labels differ
//! are relabeled. When no correspondence is given, the cheapest ones (by number of edit
//! operations) are found by a depth-first branch and bound search.
//!
//! The search bounds the remaining cost by the label balance of the unassigned vertices and of
//! the not yet charged edges. Interchangeable vertices (same label, same neighbours, like the
//! hydrogens of one carbon) are only tried in one order: a source vertex takes an image above
//! the image of its previous twin, and only the first unused vertex of every target twin class
//! is tried. Children are visited cheapest first, so the first leaf is a greedy assignment.

use crate::config::GeneratorConfig;
use crate::error::UngeneralizableTransitionError;
use crate::graph::LabeledGraph;
use log::{debug, trace};
use petgraph::graph::NodeIndex;
use std::collections::{HashMap, HashSet, VecDeque};

/// A partial injective map from source vertices to target vertices.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Delta {
    image: Vec<Option<NodeIndex>>,
}

impl Delta {
    /// Correspondence given by explicit `(source, target)` pairs.
    pub fn from_pairs(source: &LabeledGraph, pairs: &[(NodeIndex, NodeIndex)]) -> Delta {
        let mut image = vec![None; source.vertex_count()];
        for &(s, t) in pairs {
            image[s.index()] = Some(t);
        }
        Delta { image }
    }

    /// Target vertex a source vertex survives as. `None` if it is deleted.
    pub fn image(&self, vertex: NodeIndex) -> Option<NodeIndex> {
        self.image[vertex.index()]
    }

    /// Number of vertex and edge insertions, deletions and relabelings.
    pub fn cost(&self, source: &LabeledGraph, target: &LabeledGraph) -> usize {
        let mut preimage = vec![None; target.vertex_count()];
        let mut cost = 0;
        for vertex in source.vertices() {
            match self.image(vertex) {
                None => cost += 1,
                Some(t) => {
                    preimage[t.index()] = Some(vertex);
                    if source.label(vertex) != target.label(t) {
                        cost += 1;
                    }
                }
            }
        }
        cost += preimage.iter().filter(|p| p.is_none()).count();
        for (a, b, label) in source.edges() {
            let image = match (self.image(a), self.image(b)) {
                (Some(ta), Some(tb)) => target.edge_label(ta, tb),
                _ => None,
            };
            if image != Some(label) {
                cost += 1;
            }
        }
        for (a, b, _) in target.edges() {
            let covered = match (preimage[a.index()], preimage[b.index()]) {
                (Some(sa), Some(sb)) => source.edge_label(sa, sb).is_some(),
                _ => false,
            };
            if !covered {
                cost += 1;
            }
        }
        cost
    }
}

/// All cheapest correspondences (at most `config.max_deltas`), up to swapping interchangeable
/// vertices.
///
/// If the search budget runs out before the cheapest cost is proven, the transition is
/// reported as [`UngeneralizableTransitionError::SearchExhausted`] even when some
/// correspondences were found, since they may not be minimal.
pub fn infer_deltas(
    source: &LabeledGraph,
    target: &LabeledGraph,
    config: &GeneratorConfig,
) -> Result<Vec<Delta>, UngeneralizableTransitionError> {
    let mut search = CorrespondenceSearch::new(source, target, config);
    search.explore(0, 0);
    if search.exhausted || search.found.is_empty() {
        debug!(
            "Correspondence search for `{}` -> `{}` exhausted its budget; best cost so far: {:?}.",
            source.name(),
            target.name(),
            (!search.found.is_empty()).then_some(search.best)
        );
        return Err(UngeneralizableTransitionError::SearchExhausted(search.budget));
    }
    if search.best == 0 {
        return Err(UngeneralizableTransitionError::EmptyDelta);
    }
    trace!(
        "Found {} correspondence(s) of cost {} after {} search nodes.",
        search.found.len(),
        search.best,
        search.visited
    );
    Ok(search
        .found
        .into_iter()
        .map(|image| Delta { image })
        .collect())
}

struct CorrespondenceSearch<'a> {
    source: &'a LabeledGraph,
    target: &'a LabeledGraph,
    /// Source vertices in the order they are assigned.
    order: Vec<NodeIndex>,
    /// The twin of every source vertex assigned right before it, if any.
    previous_twin: Vec<Option<NodeIndex>>,
    target_class: Vec<usize>,
    source_labels: Vec<usize>,
    target_labels: Vec<usize>,
    edge_labels: HashMap<&'a str, usize>,
    image: Vec<Option<NodeIndex>>,
    preimage: Vec<Option<NodeIndex>>,
    assigned: Vec<bool>,
    /// Per label: unassigned source vertices minus unused target vertices.
    balance: Vec<isize>,
    /// Sum of absolute values of `balance`.
    imbalance: usize,
    /// Unassigned source vertices minus unused target vertices.
    surplus: isize,
    /// Per label: uncharged source edges minus uncharged target edges.
    edge_balance: Vec<isize>,
    edge_imbalance: usize,
    edge_surplus: isize,
    best: usize,
    found: Vec<Vec<Option<NodeIndex>>>,
    max_results: usize,
    budget: usize,
    visited: usize,
    exhausted: bool,
}

impl<'a> CorrespondenceSearch<'a> {
    fn new(
        source: &'a LabeledGraph,
        target: &'a LabeledGraph,
        config: &GeneratorConfig,
    ) -> CorrespondenceSearch<'a> {
        let mut labels: HashMap<&str, usize> = HashMap::new();
        let mut intern = |label: &'a str| {
            let next = labels.len();
            *labels.entry(label).or_insert(next)
        };
        let source_labels: Vec<usize> = source.vertices().map(|v| intern(source.label(v))).collect();
        let target_labels: Vec<usize> = target.vertices().map(|v| intern(target.label(v))).collect();

        let mut balance = vec![0isize; labels.len()];
        for &label in &source_labels {
            balance[label] += 1;
        }
        for &label in &target_labels {
            balance[label] -= 1;
        }

        let mut edge_labels: HashMap<&'a str, usize> = HashMap::new();
        let mut edge_balance = Vec::new();
        for (graph, sign) in [(source, 1), (target, -1)] {
            for (_, _, label) in graph.edges() {
                let next = edge_labels.len();
                let id = *edge_labels.entry(label).or_insert(next);
                if id == edge_balance.len() {
                    edge_balance.push(0);
                }
                edge_balance[id] += sign;
            }
        }

        let order = search_order(source);
        let source_class = twin_classes(source);
        let mut last_of_class = HashMap::new();
        let mut previous_twin = vec![None; source.vertex_count()];
        for &vertex in &order {
            previous_twin[vertex.index()] =
                last_of_class.insert(source_class[vertex.index()], vertex);
        }

        CorrespondenceSearch {
            source,
            target,
            order,
            previous_twin,
            target_class: twin_classes(target),
            imbalance: total(&balance),
            surplus: source.vertex_count() as isize - target.vertex_count() as isize,
            edge_imbalance: total(&edge_balance),
            edge_surplus: source.edge_count() as isize - target.edge_count() as isize,
            source_labels,
            target_labels,
            edge_labels,
            image: vec![None; source.vertex_count()],
            preimage: vec![None; target.vertex_count()],
            assigned: vec![false; source.vertex_count()],
            balance,
            edge_balance,
            best: usize::MAX,
            found: Vec::new(),
            max_results: config.max_deltas.max(1),
            budget: config.max_search_nodes,
            visited: 0,
            exhausted: false,
        }
    }

    /// Lower bound on the cost of assigning the rest of the source vertices.
    ///
    /// Remaining vertices pair up at best label by label and the rest are inserted, deleted or
    /// relabeled; uncharged edges likewise.
    fn remaining_bound(&self) -> usize {
        let vertices = (self.imbalance + self.surplus.unsigned_abs()) / 2;
        let edges = (self.edge_imbalance + self.edge_surplus.unsigned_abs()) / 2;
        vertices + edges
    }

    fn explore(&mut self, depth: usize, cost: usize) {
        let bound = cost + self.remaining_bound();
        let saturated = self.found.len() >= self.max_results;
        if bound > self.best || (saturated && bound >= self.best) {
            return;
        }
        if self.visited >= self.budget {
            self.exhausted = true;
            return;
        }
        self.visited += 1;

        if depth == self.order.len() {
            let total = cost + self.unused_target_cost();
            if total < self.best {
                self.best = total;
                self.found.clear();
            }
            if total == self.best && self.found.len() < self.max_results {
                self.found.push(self.image.clone());
            }
            return;
        }

        let vertex = self.order[depth];
        for (step, option) in self.options(vertex) {
            self.assign(vertex, option);
            self.explore(depth + 1, cost + step);
            self.unassign(vertex, option);
        }
    }

    /// Images worth trying for `vertex` with their cost, cheapest first.
    fn options(&self, vertex: NodeIndex) -> Vec<(usize, Option<NodeIndex>)> {
        let mut options = Vec::new();
        let twin_image = self.previous_twin[vertex.index()].map(|twin| self.image[twin.index()]);
        // A twin deleted before forces the deletion of this one.
        if twin_image != Some(None) {
            let floor = twin_image.flatten();
            let mut classes = HashSet::new();
            for t in self.target.vertices() {
                if self.preimage[t.index()].is_some() || !classes.insert(self.target_class[t.index()]) {
                    continue;
                }
                if floor.is_some_and(|floor| t < floor) {
                    continue;
                }
                options.push((self.assignment_cost(vertex, Some(t)), Some(t)));
            }
        }
        options.push((self.assignment_cost(vertex, None), None));
        options.sort_by_key(|&(cost, t)| (cost, t.map_or(usize::MAX, |t| t.index())));
        options
    }

    /// Cost of the vertex itself plus of all edges towards already assigned vertices.
    fn assignment_cost(&self, vertex: NodeIndex, image: Option<NodeIndex>) -> usize {
        let mut cost = match image {
            None => 1,
            Some(t) => usize::from(self.source_labels[vertex.index()] != self.target_labels[t.index()]),
        };
        for neighbour in self.source.neighbors(vertex) {
            if !self.assigned[neighbour.index()] {
                continue;
            }
            let expected = self.source.edge_label(vertex, neighbour);
            let actual = match (image, self.image[neighbour.index()]) {
                (Some(a), Some(b)) => self.target.edge_label(a, b),
                _ => None,
            };
            if expected != actual {
                cost += 1;
            }
        }
        if let Some(t) = image {
            for neighbour in self.target.neighbors(t) {
                if let Some(origin) = self.preimage[neighbour.index()] {
                    if self.source.edge_label(vertex, origin).is_none() {
                        cost += 1;
                    }
                }
            }
        }
        cost
    }

    /// Unused target vertices are created, together with all their edges.
    fn unused_target_cost(&self) -> usize {
        let unused = |v: NodeIndex| self.preimage[v.index()].is_none();
        let vertices = self.target.vertices().filter(|v| unused(*v)).count();
        let edges = self
            .target
            .edges()
            .filter(|(a, b, _)| unused(*a) || unused(*b))
            .count();
        vertices + edges
    }

    fn assign(&mut self, vertex: NodeIndex, image: Option<NodeIndex>) {
        self.charge_edges(vertex, image, -1);
        self.assigned[vertex.index()] = true;
        self.image[vertex.index()] = image;
        shift(&mut self.balance, &mut self.imbalance, self.source_labels[vertex.index()], -1);
        self.surplus -= 1;
        if let Some(t) = image {
            self.preimage[t.index()] = Some(vertex);
            shift(&mut self.balance, &mut self.imbalance, self.target_labels[t.index()], 1);
            self.surplus += 1;
        }
    }

    fn unassign(&mut self, vertex: NodeIndex, image: Option<NodeIndex>) {
        self.assigned[vertex.index()] = false;
        self.image[vertex.index()] = None;
        shift(&mut self.balance, &mut self.imbalance, self.source_labels[vertex.index()], 1);
        self.surplus += 1;
        if let Some(t) = image {
            self.preimage[t.index()] = None;
            shift(&mut self.balance, &mut self.imbalance, self.target_labels[t.index()], -1);
            self.surplus -= 1;
        }
        self.charge_edges(vertex, image, 1);
    }

    /// Move the edges between `vertex` (and its image) and the assigned part out of (`-1`) or
    /// back into (`1`) the uncharged edge balance. Must run while `vertex` is unassigned.
    fn charge_edges(&mut self, vertex: NodeIndex, image: Option<NodeIndex>, delta: isize) {
        for neighbour in self.source.neighbors(vertex) {
            if !self.assigned[neighbour.index()] {
                continue;
            }
            if let Some(&label) = self
                .source
                .edge_label(vertex, neighbour)
                .and_then(|label| self.edge_labels.get(label))
            {
                shift(&mut self.edge_balance, &mut self.edge_imbalance, label, delta);
                self.edge_surplus += delta;
            }
        }
        let Some(t) = image else {
            return;
        };
        for neighbour in self.target.neighbors(t) {
            if self.preimage[neighbour.index()].is_none() {
                continue;
            }
            if let Some(&label) = self
                .target
                .edge_label(t, neighbour)
                .and_then(|label| self.edge_labels.get(label))
            {
                shift(&mut self.edge_balance, &mut self.edge_imbalance, label, -delta);
                self.edge_surplus -= delta;
            }
        }
    }
}

fn total(balance: &[isize]) -> usize {
    balance.iter().map(|b| b.unsigned_abs()).sum()
}

fn shift(balance: &mut [isize], imbalance: &mut usize, label: usize, delta: isize) {
    let before = balance[label].unsigned_abs();
    balance[label] += delta;
    let after = balance[label].unsigned_abs();
    *imbalance = *imbalance + after - before;
}

/// Vertices with the same label and the same labeled neighbours share a class. Swapping two
/// vertices of one class is an automorphism.
fn twin_classes(graph: &LabeledGraph) -> Vec<usize> {
    let mut classes: HashMap<(&str, Vec<(NodeIndex, &str)>), usize> = HashMap::new();
    graph
        .vertices()
        .map(|vertex| {
            let mut neighbours: Vec<(NodeIndex, &str)> = graph
                .neighbors(vertex)
                .filter_map(|n| graph.edge_label(vertex, n).map(|label| (n, label)))
                .collect();
            neighbours.sort();
            let next = classes.len();
            *classes.entry((graph.label(vertex), neighbours)).or_insert(next)
        })
        .collect()
}

/// Breadth-first order starting from high degree vertices, so that edge costs are charged
/// as early as possible.
fn search_order(graph: &LabeledGraph) -> Vec<NodeIndex> {
    let mut roots: Vec<NodeIndex> = graph.vertices().collect();
    roots.sort_by_key(|v| (std::cmp::Reverse(graph.degree(*v)), v.index()));

    let mut visited = vec![false; graph.vertex_count()];
    let mut order = Vec::with_capacity(graph.vertex_count());
    for root in roots {
        if visited[root.index()] {
            continue;
        }
        visited[root.index()] = true;
        let mut queue = VecDeque::from([root]);
        while let Some(vertex) = queue.pop_front() {
            order.push(vertex);
            let mut neighbours: Vec<NodeIndex> = graph
                .neighbors(vertex)
                .filter(|n| !visited[n.index()])
                .collect();
            neighbours.sort();
            for neighbour in neighbours {
                visited[neighbour.index()] = true;
                queue.push_back(neighbour);
            }
        }
    }
    order
}
