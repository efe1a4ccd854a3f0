//! Coverage matrix builder.
//!
//! For every (transition, candidate rule) pair, the builder applies the rule to the source
//! graph of the transition at every embedding and keeps the smallest distortion between the
//! product and the observed target. Pairs without an embedding are absent from the matrix.
//!
//! The builder also collects the *spurious products* of every rule: distinct graphs the rule
//! produces from an input graph that are not observed successors of that graph. Products are
//! identified by their host graph and isomorphism class, and are shared between rules.

use crate::config::CoverageConfig;
use crate::generator::CandidateRule;
use crate::graph::LabeledGraph;
use crate::rule::{Embedding, Rule};
use crate::store::IteratedMap;
use log::{debug, info, trace};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

mod distortion;


pub use distortion::{distortion, histogram_distance};

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct CoverageEntry {
    pub transition: usize,
    pub rule: usize,
    pub distortion: f64,
}

/// Sparse (transition, rule) -> distortion mapping.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct CoverageMatrix {
    transitions: usize,
    rules: usize,
    /// Sorted by transition, then rule.
    entries: Vec<CoverageEntry>,
    /// Per rule, the sorted ids of its spurious products.
    spurious: Vec<Vec<usize>>,
}

impl CoverageMatrix {
    pub fn new(
        transitions: usize,
        rules: usize,
        mut entries: Vec<CoverageEntry>,
        mut spurious: Vec<Vec<usize>>,
    ) -> CoverageMatrix {
        entries.sort_by_key(|e| (e.transition, e.rule));
        for products in &mut spurious {
            products.sort_unstable();
            products.dedup();
        }
        CoverageMatrix {
            transitions,
            rules,
            entries,
            spurious,
        }
    }

    pub fn transition_count(&self) -> usize {
        self.transitions
    }

    pub fn rule_count(&self) -> usize {
        self.rules
    }

    pub fn entries(&self) -> &[CoverageEntry] {
        &self.entries
    }

    /// Entries of all rules that apply to `transition`, ordered by rule.
    pub fn covering(&self, transition: usize) -> &[CoverageEntry] {
        let start = self.entries.partition_point(|e| e.transition < transition);
        let end = self.entries.partition_point(|e| e.transition <= transition);
        &self.entries[start..end]
    }

    pub fn distortion(&self, transition: usize, rule: usize) -> Option<f64> {
        self.covering(transition)
            .binary_search_by_key(&rule, |e| e.rule)
            .ok()
            .map(|i| self.covering(transition)[i].distortion)
    }

    pub fn covered_by(&self, rule: usize) -> impl Iterator<Item = &CoverageEntry> + '_ {
        self.entries.iter().filter(move |e| e.rule == rule)
    }

    /// Largest finite distortion of any rule on `transition`.
    pub fn max_distortion(&self, transition: usize) -> Option<f64> {
        self.covering(transition)
            .iter()
            .map(|e| e.distortion)
            .reduce(f64::max)
    }

    /// Number of distinct spurious products of `rule`.
    pub fn spurious_applications(&self, rule: usize) -> usize {
        self.spurious_products(rule).len()
    }

    /// Ids of the spurious products of `rule`.
    pub fn spurious_products(&self, rule: usize) -> &[usize] {
        self.spurious.get(rule).map(Vec::as_slice).unwrap_or_default()
    }

    /// Spurious product ids are `0..spurious_product_count()`.
    pub fn spurious_product_count(&self) -> usize {
        self.spurious
            .iter()
            .flatten()
            .max()
            .map_or(0, |last| last + 1)
    }
}

/// Compute the coverage matrix of `candidates` over all transitions of `map`.
///
/// Rules are processed in parallel, each worker owning one column of the matrix.
pub fn build_coverage(
    map: &IteratedMap,
    candidates: &[CandidateRule],
    config: &CoverageConfig,
) -> CoverageMatrix {
    let histograms: Vec<HashMap<&str, usize>> =
        map.graphs().iter().map(|g| g.vertex_histogram()).collect();
    let mut successors: Vec<Vec<usize>> = vec![Vec::new(); map.graphs().len()];
    for transition in map.transitions() {
        if !successors[transition.source].contains(&transition.target) {
            successors[transition.source].push(transition.target);
        }
    }

    let columns: Vec<(Vec<CoverageEntry>, Vec<(usize, LabeledGraph)>)> = candidates
        .par_iter()
        .enumerate()
        .map(|(index, candidate)| {
            let mut column = Column {
                map,
                histograms: &histograms,
                rule: &candidate.rule,
                limit: config.max_embeddings,
                embeddings: HashMap::new(),
            };
            let entries = column.entries(index, candidate);
            let spurious = column.spurious_products(&successors);
            debug!(
                "Rule `{}` applies to {} transitions ({} spurious products).",
                candidate.name,
                entries.len(),
                spurious.len()
            );
            (entries, spurious)
        })
        .collect();

    let mut entries = Vec::new();
    let mut spurious = Vec::with_capacity(columns.len());
    let mut products = ProductRegistry::default();
    for (column, found) in columns {
        entries.extend(column);
        spurious.push(
            found
                .into_iter()
                .map(|(graph, product)| products.id(graph, product))
                .collect(),
        );
    }
    let matrix = CoverageMatrix::new(map.transitions().len(), candidates.len(), entries, spurious);
    let uncoverable = (0..matrix.transitions)
        .filter(|&t| matrix.covering(t).is_empty())
        .count();
    info!(
        "Coverage matrix: {} entries over {} transitions and {} rules; {} transitions have no applicable rule; {} spurious products.",
        matrix.entries.len(),
        matrix.transitions,
        matrix.rules,
        uncoverable,
        products.count
    );
    matrix
}

/// Work of one rule, with embeddings memoized per host graph.
struct Column<'a> {
    map: &'a IteratedMap,
    histograms: &'a [HashMap<&'a str, usize>],
    rule: &'a Rule,
    limit: usize,
    embeddings: HashMap<usize, Vec<Embedding>>,
}

impl Column<'_> {
    fn embeddings(&mut self, graph: usize) -> &[Embedding] {
        let (map, histograms, rule, limit) = (self.map, self.histograms, self.rule, self.limit);
        self.embeddings.entry(graph).or_insert_with(|| {
            let host = map.graph(graph);
            if rule.may_match(host, &histograms[graph]) {
                rule.embeddings(host, limit)
            } else {
                Vec::new()
            }
        })
    }

    fn best_distortion(&mut self, source: usize, target: &LabeledGraph) -> Option<f64> {
        let (map, rule) = (self.map, self.rule);
        let host = map.graph(source);
        let mut best: Option<f64> = None;
        for embedding in self.embeddings(source) {
            let value = distortion(&rule.apply(host, embedding), target);
            best = Some(best.map_or(value, |b: f64| b.min(value)));
            if value == 0.0 {
                break;
            }
        }
        best
    }

    fn entries(&mut self, index: usize, candidate: &CandidateRule) -> Vec<CoverageEntry> {
        let (map, rule) = (self.map, self.rule);
        let mut entries = Vec::new();
        for (transition, step) in map.transitions().iter().enumerate() {
            let (source, target) = (map.source_of(step), map.target_of(step));
            let anchored = candidate
                .anchors
                .get(&transition)
                .map(|anchor| distortion(&rule.apply(source, anchor), target));
            debug_assert!(
                anchored.is_none_or(|d| d == 0.0),
                "Rule `{}` does not reproduce its own transition `{}`",
                candidate.name,
                step.name
            );
            let best = match anchored {
                Some(value) if value == 0.0 => Some(value),
                _ => {
                    let matched = self.best_distortion(step.source, target);
                    match (anchored, matched) {
                        (Some(a), Some(m)) => Some(a.min(m)),
                        (a, m) => a.or(m),
                    }
                }
            };
            if let Some(distortion) = best {
                trace!(
                    "Rule `{}` covers `{}` with distortion {}.",
                    candidate.name, step.name, distortion
                );
                entries.push(CoverageEntry {
                    transition,
                    rule: index,
                    distortion,
                });
            }
        }
        entries
    }

    /// Distinct products of applications to any input graph that are not the target of an
    /// observed transition out of that graph, with the graph they were produced from.
    fn spurious_products(&mut self, successors: &[Vec<usize>]) -> Vec<(usize, LabeledGraph)> {
        let (map, rule) = (self.map, self.rule);
        let mut products = Vec::new();
        for (graph, targets) in successors.iter().enumerate() {
            let host = map.graph(graph);
            let mut seen: HashMap<u64, Vec<LabeledGraph>> = HashMap::new();
            for embedding in self.embeddings(graph) {
                let product = rule.apply(host, embedding);
                let observed = targets
                    .iter()
                    .any(|&target| distortion(&product, map.graph(target)) == 0.0);
                if observed {
                    continue;
                }
                let bucket = seen.entry(product.fingerprint()).or_default();
                if !bucket.iter().any(|known| known.is_isomorphic(&product)) {
                    bucket.push(product.clone());
                    products.push((graph, product));
                }
            }
        }
        products
    }
}

/// Ids of spurious products, keyed by host graph and isomorphism class.
#[derive(Default)]
struct ProductRegistry {
    buckets: HashMap<(usize, u64), Vec<(LabeledGraph, usize)>>,
    count: usize,
}

impl ProductRegistry {
    fn id(&mut self, graph: usize, product: LabeledGraph) -> usize {
        let bucket = self
            .buckets
            .entry((graph, product.fingerprint()))
            .or_default();
        if let Some((_, id)) = bucket.iter().find(|(known, _)| known.is_isomorphic(&product)) {
            return *id;
        }
        let id = self.count;
        self.count += 1;
        bucket.push((product, id));
        id
    }
}
