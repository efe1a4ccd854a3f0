use crate::error::LoadError;
use crate::store::{IteratedMap, Transition};
use crate::test_utils::example_maps::{ethane, ethanol};
use crate::test_utils::{init_logger, scratch_dir};
use petgraph::graph::NodeIndex;
use std::fs;
use std::path::{Path, PathBuf};

/// A fresh input directory with empty `graphs` and `rules` subfolders.
fn input_dir(name: &str) -> PathBuf {
    let dir = scratch_dir(&format!("store-{name}"));
    fs::create_dir_all(dir.join("graphs")).unwrap();
    fs::create_dir_all(dir.join("rules")).unwrap();
    dir
}

fn write(dir: &Path, file: &str, content: &str) {
    fs::write(dir.join(file), content).unwrap();
}

const ETHANE: &str = r#"{"vertices": [{"id": 10, "label": "C"}, {"id": 20, "label": "C"}],
    "edges": [{"source": 10, "target": 20, "label": "-"}]}"#;

const ETHANOL: &str = r#"{"name": "ethanol",
    "vertices": [{"id": 1, "label": "C"}, {"id": 2, "label": "C"}, {"id": 3, "label": "O"}],
    "edges": [{"source": 1, "target": 2, "label": "-"}, {"source": 2, "target": 3, "label": "-"}]}"#;

#[test]
fn load_orders_graphs_by_file_name_and_resolves_ids() {
    init_logger();
    let dir = input_dir("ordering");
    write(&dir, "graphs/b_ethanol.json", ETHANOL);
    write(&dir, "graphs/a_ethane.json", ETHANE);
    write(
        &dir,
        "rules/step.json",
        r#"{"source": 0, "target": 1, "label": "oxidation", "vertex_map": [[10, 1], [20, 2]]}"#,
    );
    write(&dir, "rules/notes.txt", "ignored");
    write(
        &dir,
        "templates.json",
        r#"{"oxidation": {"vertex_delta": 1, "edge_delta": 1}}"#,
    );

    let map = IteratedMap::load(&dir).unwrap();
    assert_eq!(map.graphs().len(), 2);
    assert_eq!(map.graph(0).name(), "a_ethane", "File stem is the default name");
    assert_eq!(map.graph(1).name(), "ethanol");
    assert_eq!(map.transitions().len(), 1);

    let transition = &map.transitions()[0];
    assert_eq!(transition.name, "step");
    assert_eq!(
        transition.vertex_map,
        Some(vec![
            (NodeIndex::new(0), NodeIndex::new(0)),
            (NodeIndex::new(1), NodeIndex::new(1))
        ])
    );
    assert_eq!(map.templates()["oxidation"].vertex_delta, 1);
}

#[test]
fn load_requires_both_subfolders() {
    let dir = input_dir("subfolders");
    fs::remove_dir_all(dir.join("rules")).unwrap();
    write(&dir, "graphs/a.json", ETHANE);

    let error = IteratedMap::load(&dir).unwrap_err();
    assert!(matches!(error, LoadError::MissingSubfolder("rules")), "{error}");
    assert!(matches!(
        IteratedMap::load(&dir.join("missing")),
        Err(LoadError::MissingDirectory(_))
    ));
}

#[test]
fn load_reports_malformed_files() {
    let dir = input_dir("malformed");
    write(&dir, "graphs/a.json", r#"{"vertices": [}"#);
    assert!(matches!(
        IteratedMap::load(&dir),
        Err(LoadError::MalformedGraph { .. })
    ));

    write(&dir, "graphs/a.json", ETHANE);
    write(&dir, "rules/t.json", r#"{"source": 0}"#);
    assert!(matches!(
        IteratedMap::load(&dir),
        Err(LoadError::MalformedTransition { .. })
    ));
}

#[test]
fn load_rejects_out_of_range_graphs() {
    let dir = input_dir("range");
    write(&dir, "graphs/a.json", ETHANE);
    write(&dir, "rules/t.json", r#"{"source": 0, "target": 3, "label": "x"}"#);

    match IteratedMap::load(&dir) {
        Err(LoadError::GraphOutOfRange {
            index, available, ..
        }) => {
            assert_eq!(index, 3);
            assert_eq!(available, 1);
        }
        other => panic!("Unexpected result: {other:?}"),
    }
}

#[test]
fn load_rejects_unknown_vertex_ids() {
    let dir = input_dir("vertex-ids");
    write(&dir, "graphs/a.json", ETHANE);
    write(&dir, "graphs/b.json", ETHANOL);
    write(
        &dir,
        "rules/t.json",
        r#"{"source": 0, "target": 1, "label": "x", "vertex_map": [[10, 99]]}"#,
    );
    assert!(matches!(
        IteratedMap::load(&dir),
        Err(LoadError::InvalidVertexMap { .. })
    ));
}

#[test]
fn empty_input_is_an_error() {
    let dir = input_dir("empty");
    assert!(matches!(IteratedMap::load(&dir), Err(LoadError::NoGraphs)));
}

#[test]
fn duplicate_transitions_are_merged() {
    let map = IteratedMap::new(
        vec![ethane(), ethanol()],
        vec![
            Transition::new("first", "oxidation", 0, 1),
            Transition::new("second", "oxidation", 0, 1),
            Transition::new("other label", "hydroxylation", 0, 1),
        ],
    )
    .unwrap();
    let names: Vec<_> = map.transitions().iter().map(|t| t.name.as_str()).collect();
    assert_eq!(names, vec!["first", "other label"]);
}

#[test]
fn vertex_maps_must_be_injective() {
    let result = IteratedMap::new(
        vec![ethane(), ethanol()],
        vec![Transition::new("t", "oxidation", 0, 1).with_vertex_map(&[(0, 1), (1, 1)])],
    );
    assert!(matches!(result, Err(LoadError::InvalidVertexMap { .. })));
}

#[test]
fn transition_names_must_be_unique() {
    let result = IteratedMap::new(
        vec![ethane(), ethanol()],
        vec![
            Transition::new("step", "oxidation", 0, 1),
            Transition::new("step", "reduction", 1, 0),
        ],
    );
    assert!(matches!(result, Err(LoadError::DuplicateTransitionName(name)) if name == "step"));

    let dir = input_dir("names");
    write(&dir, "graphs/a.json", ETHANE);
    write(&dir, "graphs/b.json", ETHANOL);
    write(&dir, "rules/1.json", r#"{"name": "step", "source": 0, "target": 1, "label": "oxidation"}"#);
    write(&dir, "rules/2.json", r#"{"name": "step", "source": 1, "target": 0, "label": "reduction"}"#);
    assert!(matches!(
        IteratedMap::load(&dir),
        Err(LoadError::DuplicateTransitionName(_))
    ));
}
