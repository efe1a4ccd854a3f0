//! Graph & transition store: the labeled iterated map an inference run explains.
//!
//! On disk, an iterated map is a directory with two subfolders:
//!
//!  - `graphs/*.json`: one [`GraphDescription`] per file. Files are sorted by name and the
//!    sort position is the graph index.
//!  - `rules/*.json`: one [`TransitionFile`] per file, referencing graphs by index.
//!
//! An optional `templates.json` maps transition labels to the vertex/edge count changes
//! every transition with that label must exhibit.

use crate::config::Template;
use crate::error::LoadError;
use crate::graph::{GraphDescription, LabeledGraph};
use log::{debug, info, warn};
use petgraph::graph::NodeIndex;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::path::{Path, PathBuf};

#[cfg(test)]
mod tests;

pub const GRAPHS_FOLDER: &str = "graphs";
pub const TRANSITIONS_FOLDER: &str = "rules";
pub const TEMPLATES_FILE: &str = "templates.json";

/// An observed step between two graphs of the map.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Transition {
    pub name: String,
    pub label: String,
    pub source: usize,
    pub target: usize,
    /// Known correspondence of source vertices to target vertices. Unmapped source vertices
    /// are deleted, unmapped target vertices are created.
    pub vertex_map: Option<Vec<(NodeIndex, NodeIndex)>>,
}

impl Transition {
    pub fn new(name: &str, label: &str, source: usize, target: usize) -> Transition {
        Transition {
            name: name.to_string(),
            label: label.to_string(),
            source,
            target,
            vertex_map: None,
        }
    }

    pub fn with_vertex_map(mut self, pairs: &[(usize, usize)]) -> Transition {
        self.vertex_map = Some(
            pairs
                .iter()
                .map(|&(s, t)| (NodeIndex::new(s), NodeIndex::new(t)))
                .collect(),
        );
        self
    }
}

/// On-disk form of a [`Transition`]. Vertex map entries use the vertex ids of the graph files.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransitionFile {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub source: usize,
    pub target: usize,
    pub label: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vertex_map: Option<Vec<(usize, usize)>>,
}

#[derive(Clone, Debug, Default)]
pub struct IteratedMap {
    graphs: Vec<LabeledGraph>,
    transitions: Vec<Transition>,
    templates: BTreeMap<String, Template>,
}

impl IteratedMap {
    /// Validate transitions against `graphs` and drop duplicate transitions. Distinct
    /// transitions must have distinct names.
    pub fn new(
        graphs: Vec<LabeledGraph>,
        transitions: Vec<Transition>,
    ) -> Result<IteratedMap, LoadError> {
        if graphs.is_empty() {
            return Err(LoadError::NoGraphs);
        }
        let mut seen = HashSet::new();
        let mut names = HashSet::new();
        let mut unique = Vec::with_capacity(transitions.len());
        for transition in transitions {
            for index in [transition.source, transition.target] {
                if index >= graphs.len() {
                    return Err(LoadError::GraphOutOfRange {
                        transition: transition.name.clone(),
                        index,
                        available: graphs.len(),
                    });
                }
            }
            if let Some(pairs) = &transition.vertex_map {
                check_vertex_map(
                    &transition.name,
                    pairs,
                    &graphs[transition.source],
                    &graphs[transition.target],
                )?;
            }
            let key = (
                transition.source,
                transition.target,
                transition.label.clone(),
                transition.vertex_map.clone(),
            );
            if !seen.insert(key) {
                warn!("Transition `{}` duplicates an earlier transition.", transition.name);
            } else if !names.insert(transition.name.clone()) {
                return Err(LoadError::DuplicateTransitionName(transition.name));
            } else {
                unique.push(transition);
            }
        }
        Ok(IteratedMap {
            graphs,
            transitions: unique,
            templates: BTreeMap::new(),
        })
    }

    pub fn with_templates(mut self, templates: BTreeMap<String, Template>) -> IteratedMap {
        self.templates = templates;
        self
    }

    /// Load an iterated map from an input directory (see module docs for the layout).
    pub fn load(path: &Path) -> Result<IteratedMap, LoadError> {
        if !path.is_dir() {
            return Err(LoadError::MissingDirectory(path.to_path_buf()));
        }

        let mut graphs = Vec::new();
        let mut vertex_ids = Vec::new();
        for file in json_files(path, GRAPHS_FOLDER)? {
            let description: GraphDescription = read_json(&file, |reason| {
                LoadError::MalformedGraph {
                    path: file.clone(),
                    reason,
                }
            })?;
            let (graph, ids) = description
                .build(&file_stem(&file))
                .map_err(|reason| LoadError::MalformedGraph {
                    path: file.clone(),
                    reason,
                })?;
            debug!(
                "Loaded graph `{}` ({} vertices, {} edges) from {}.",
                graph.name(),
                graph.vertex_count(),
                graph.edge_count(),
                file.display()
            );
            graphs.push(graph);
            vertex_ids.push(ids);
        }

        let mut transitions = Vec::new();
        for file in json_files(path, TRANSITIONS_FOLDER)? {
            let description: TransitionFile = read_json(&file, |reason| {
                LoadError::MalformedTransition {
                    path: file.clone(),
                    reason,
                }
            })?;
            let name = description.name.clone().unwrap_or_else(|| file_stem(&file));
            transitions.push(description.resolve(name, &vertex_ids)?);
        }

        let templates_path = path.join(TEMPLATES_FILE);
        let templates = if templates_path.is_file() {
            read_json(&templates_path, |reason| LoadError::MalformedTemplates {
                path: templates_path.clone(),
                reason,
            })?
        } else {
            BTreeMap::new()
        };

        let map = IteratedMap::new(graphs, transitions)?.with_templates(templates);
        map.log_summary();
        Ok(map)
    }

    pub fn graphs(&self) -> &[LabeledGraph] {
        &self.graphs
    }

    pub fn graph(&self, index: usize) -> &LabeledGraph {
        &self.graphs[index]
    }

    pub fn transitions(&self) -> &[Transition] {
        &self.transitions
    }

    pub fn templates(&self) -> &BTreeMap<String, Template> {
        &self.templates
    }

    pub fn source_of(&self, transition: &Transition) -> &LabeledGraph {
        &self.graphs[transition.source]
    }

    pub fn target_of(&self, transition: &Transition) -> &LabeledGraph {
        &self.graphs[transition.target]
    }

    pub fn log_summary(&self) {
        let labels: BTreeSet<&str> = self.transitions.iter().map(|t| t.label.as_str()).collect();
        info!(
            "Iterated map: {} graphs; {} transitions; {} transition labels; {} templates.",
            self.graphs.len(),
            self.transitions.len(),
            labels.len(),
            self.templates.len()
        );
    }
}

impl TransitionFile {
    fn resolve(
        self,
        name: String,
        vertex_ids: &[BTreeMap<usize, NodeIndex>],
    ) -> Result<Transition, LoadError> {
        let graph_ids = |index: usize| {
            vertex_ids.get(index).ok_or(LoadError::GraphOutOfRange {
                transition: name.clone(),
                index,
                available: vertex_ids.len(),
            })
        };
        let vertex_map = match &self.vertex_map {
            None => None,
            Some(pairs) => {
                let (source_ids, target_ids) = (graph_ids(self.source)?, graph_ids(self.target)?);
                let mut resolved = Vec::with_capacity(pairs.len());
                for &(s, t) in pairs {
                    let (Some(&s), Some(&t)) = (source_ids.get(&s), target_ids.get(&t)) else {
                        return Err(LoadError::InvalidVertexMap {
                            transition: name,
                            reason: format!("unknown vertex in pair ({s}, {t})"),
                        });
                    };
                    resolved.push((s, t));
                }
                Some(resolved)
            }
        };
        Ok(Transition {
            name,
            label: self.label,
            source: self.source,
            target: self.target,
            vertex_map,
        })
    }
}

fn check_vertex_map(
    transition: &str,
    pairs: &[(NodeIndex, NodeIndex)],
    source: &LabeledGraph,
    target: &LabeledGraph,
) -> Result<(), LoadError> {
    let invalid = |reason: String| LoadError::InvalidVertexMap {
        transition: transition.to_string(),
        reason,
    };
    let mut sources = HashSet::new();
    let mut targets = HashSet::new();
    for &(s, t) in pairs {
        if s.index() >= source.vertex_count() || t.index() >= target.vertex_count() {
            return Err(invalid(format!(
                "pair ({}, {}) is out of range",
                s.index(),
                t.index()
            )));
        }
        if !sources.insert(s) || !targets.insert(t) {
            return Err(invalid(format!(
                "pair ({}, {}) breaks injectivity",
                s.index(),
                t.index()
            )));
        }
    }
    Ok(())
}

/// Sorted `.json` files of a required subfolder.
fn json_files(root: &Path, folder: &'static str) -> Result<Vec<PathBuf>, LoadError> {
    let directory = root.join(folder);
    if !directory.is_dir() {
        return Err(LoadError::MissingSubfolder(folder));
    }
    let unreadable = |source| LoadError::Unreadable {
        path: directory.clone(),
        source,
    };
    let mut files = Vec::new();
    for entry in std::fs::read_dir(&directory).map_err(unreadable)? {
        let path = entry.map_err(unreadable)?.path();
        if path.is_file() && path.extension().is_some_and(|ext| ext == "json") {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

/// Read and parse a JSON file, reporting parse failures through `malformed`.
fn read_json<T, F>(path: &Path, malformed: F) -> Result<T, LoadError>
where
    T: DeserializeOwned,
    F: FnOnce(String) -> LoadError,
{
    let text = std::fs::read_to_string(path).map_err(|source| LoadError::Unreadable {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&text).map_err(|e| malformed(e.to_string()))
}

fn file_stem(path: &Path) -> String {
    path.file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_default()
}
