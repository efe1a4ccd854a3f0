use crate::generator::Level;
use crate::rule::{Embedding, Rule};
use log::trace;
use petgraph::graph::NodeIndex;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap};

/// A rule derived from one or more transitions.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CandidateRule {
    pub name: String,
    pub level: Level,
    pub rule: Rule,
    /// Indices of the transitions this rule was derived from.
    pub provenance: BTreeSet<usize>,
    /// Where the left side sits in the source graph of every provenance transition.
    pub anchors: BTreeMap<usize, Embedding>,
}

impl CandidateRule {
    pub fn new(name: String, level: Level, rule: Rule, transition: usize, anchor: Embedding) -> Self {
        CandidateRule {
            name,
            level,
            rule,
            provenance: BTreeSet::from([transition]),
            anchors: BTreeMap::from([(transition, anchor)]),
        }
    }

    /// Derived from a single transition only.
    pub fn is_trivial(&self) -> bool {
        self.provenance.len() == 1
    }

    /// Merge the provenance of an isomorphic duplicate. `mapping` is an isomorphism from this
    /// rule to `other.rule`.
    fn absorb(&mut self, other: CandidateRule, mapping: &[NodeIndex]) {
        self.provenance.extend(other.provenance.iter().copied());
        for (transition, anchor) in &other.anchors {
            if self.anchors.contains_key(transition) {
                continue;
            }
            if let Some(anchor) = self.rule.translate_embedding(&other.rule, mapping, anchor) {
                self.anchors.insert(*transition, anchor);
            }
        }
    }
}

/// Candidate rules deduplicated up to rule graph isomorphism.
///
/// Rules are bucketed by fingerprint; only rules in the same bucket are compared exactly.
#[derive(Clone, Debug, Default)]
pub struct CandidateSet {
    candidates: Vec<CandidateRule>,
    buckets: HashMap<u64, Vec<usize>>,
}

impl CandidateSet {
    pub fn new() -> CandidateSet {
        CandidateSet::default()
    }

    /// Insert a candidate, merging it into an isomorphic one if present. Returns the index of
    /// the candidate that represents it.
    pub fn insert(&mut self, candidate: CandidateRule) -> usize {
        let bucket = self.buckets.entry(candidate.rule.fingerprint()).or_default();
        for &index in bucket.iter() {
            let existing = &mut self.candidates[index];
            if let Some(mapping) = existing.rule.isomorphism_to(&candidate.rule) {
                trace!("Candidate `{}` duplicates `{}`.", candidate.name, existing.name);
                existing.absorb(candidate, &mapping);
                return index;
            }
        }
        let index = self.candidates.len();
        bucket.push(index);
        self.candidates.push(candidate);
        index
    }

    pub fn len(&self) -> usize {
        self.candidates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.candidates.is_empty()
    }

    pub fn into_vec(self) -> Vec<CandidateRule> {
        self.candidates
    }
}

impl Extend<CandidateRule> for CandidateSet {
    fn extend<T: IntoIterator<Item = CandidateRule>>(&mut self, iter: T) {
        for candidate in iter {
            self.insert(candidate);
        }
    }
}
