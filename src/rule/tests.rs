use crate::rule::{Embedding, Rule, RuleDescription, RuleLabel};
use crate::test_utils::example_maps::{ethane, ethanol};
use crate::test_utils::{init_logger, mk_graph};
use petgraph::graph::{NodeIndex, UnGraph};

type Side<'a> = Option<&'a str>;

/// Build a rule from `(left, right)` vertex labels and `(a, b, left, right)` edges.
fn mk_rule(vertices: &[(Side, Side)], edges: &[(usize, usize, Side, Side)]) -> Rule {
    let mut graph = UnGraph::default();
    for &(left, right) in vertices {
        graph.add_node(RuleLabel::new(left, right));
    }
    for &(a, b, left, right) in edges {
        graph.add_edge(NodeIndex::new(a), NodeIndex::new(b), RuleLabel::new(left, right));
    }
    Rule::validate(&graph).expect("Test rule must be well-formed");
    Rule::new(graph)
}

/// `C` gains an `O` neighbour.
fn attach_oxygen() -> Rule {
    mk_rule(
        &[(Some("C"), Some("C")), (None, Some("O"))],
        &[(0, 1, None, Some("-"))],
    )
}

#[test]
fn creation_rule_applies_at_every_carbon() {
    init_logger();
    let rule = attach_oxygen();
    let host = ethane();

    let embeddings = rule.embeddings(&host, 16);
    assert_eq!(embeddings.len(), 2, "Both carbons of C-C can be oxidized");
    for embedding in &embeddings {
        let product = rule.apply(&host, embedding);
        assert!(product.is_isomorphic(&ethanol()));
        assert_eq!(product.name(), host.name());
    }
}

#[test]
fn relabeling_an_edge() {
    let rule = mk_rule(
        &[(Some("N"), Some("N")), (Some("N"), Some("N"))],
        &[(0, 1, Some("-"), Some("="))],
    );
    let host = mk_graph("N-N", &["N", "N", "H"], &[(0, 1, "-"), (1, 2, "-")]);
    let expected = mk_graph("N=N", &["N", "N", "H"], &[(0, 1, "="), (1, 2, "-")]);

    let embeddings = rule.embeddings(&host, 16);
    assert_eq!(embeddings.len(), 2, "The N-N pattern is symmetric");
    assert!(rule.apply(&host, &embeddings[0]).is_isomorphic(&expected));
}

#[test]
fn deletion_requires_dangling_edges_to_be_deleted_too() {
    let host = ethanol();

    let bare = mk_rule(&[(Some("O"), None)], &[]);
    assert!(
        bare.embeddings(&host, 16).is_empty(),
        "The O vertex has an edge the rule does not delete"
    );

    let with_edge = mk_rule(
        &[(Some("C"), Some("C")), (Some("O"), None)],
        &[(0, 1, Some("-"), None)],
    );
    let embeddings = with_edge.embeddings(&host, 16);
    assert_eq!(embeddings.len(), 1);
    assert!(with_edge.apply(&host, &embeddings[0]).is_isomorphic(&ethane()));
}

#[test]
fn wildcards_keep_host_labels() {
    let rule = mk_rule(
        &[(Some("*"), Some("*")), (None, Some("O"))],
        &[(0, 1, None, Some("-"))],
    );
    let host = mk_graph("N", &["N"], &[]);

    let embeddings = rule.embeddings(&host, 16);
    assert_eq!(embeddings.len(), 1);
    let product = rule.apply(&host, &embeddings[0]);
    assert!(product.is_isomorphic(&mk_graph("N-O", &["N", "O"], &[(0, 1, "-")])));
}

#[test]
fn may_match_checks_sizes_and_concrete_labels() {
    let rule = mk_rule(
        &[(Some("N"), Some("N")), (Some("N"), Some("N"))],
        &[(0, 1, Some("-"), Some("="))],
    );
    let carbon = ethane();
    let nitrogen = mk_graph("N-N", &["N", "N"], &[(0, 1, "-")]);
    let lonely = mk_graph("N", &["N", "C"], &[(0, 1, "-")]);

    assert!(!rule.may_match(&carbon, &carbon.vertex_histogram()));
    assert!(rule.may_match(&nitrogen, &nitrogen.vertex_histogram()));
    assert!(!rule.may_match(&lonely, &lonely.vertex_histogram()));
}

#[test]
fn sides_split_context_from_changes() {
    let sides = attach_oxygen().sides();

    assert!(sides.left.vertices.is_empty() && sides.left.edges.is_empty());
    assert_eq!(sides.context.vertices.len(), 1);
    assert_eq!(sides.context.vertices[0].label, "C");
    assert_eq!(sides.right.vertices.len(), 1);
    assert_eq!(sides.right.vertices[0].label, "O");
    assert_eq!(sides.right.edges.len(), 1, "The new bond references the context carbon");
}

#[test]
fn isomorphic_rules_translate_embeddings() {
    let a = attach_oxygen();
    let b = mk_rule(
        &[(None, Some("O")), (Some("C"), Some("C"))],
        &[(1, 0, None, Some("-"))],
    );
    assert_eq!(a.fingerprint(), b.fingerprint());

    let mapping = a.isomorphism_to(&b).expect("Rules are isomorphic");
    let anchor = Embedding::new(vec![NodeIndex::new(1)]);
    let translated = a.translate_embedding(&b, &mapping, &anchor).unwrap();
    assert_eq!(translated, anchor);

    let other = mk_rule(&[(Some("C"), Some("N"))], &[]);
    assert!(a.isomorphism_to(&other).is_none());
}

#[test]
fn malformed_descriptions_are_rejected() {
    let created_wildcard = RuleDescription::from(mk_rule(&[(Some("C"), Some("*"))], &[]));
    let mut broken = created_wildcard.clone();
    broken.vertices[0].label = RuleLabel::new(None, Some("*"));
    assert!(Rule::try_from(created_wildcard).is_ok());
    assert!(Rule::try_from(broken).is_err());

    let mut dangling = RuleDescription::from(attach_oxygen());
    dangling.edges[0].label = RuleLabel::new(Some("-"), Some("-"));
    assert!(
        Rule::try_from(dangling).is_err(),
        "A left edge cannot touch a created vertex"
    );
}

#[test]
fn serialized_rules_survive_a_round_trip() {
    let rule = attach_oxygen();
    let json = serde_json::to_string(&rule).unwrap();
    let decoded: Rule = serde_json::from_str(&json).unwrap();
    assert!(rule.isomorphism_to(&decoded).is_some());
    assert_eq!(decoded.embeddings(&ethane(), 16).len(), 2);
}

#[test]
fn interchangeable_vertices_are_embedded_once() {
    // `X` loses its three hydrogens.
    let rule = mk_rule(
        &[
            (Some("X"), Some("X")),
            (Some("H"), None),
            (Some("H"), None),
            (Some("H"), None),
        ],
        &[
            (0, 1, Some("-"), None),
            (0, 2, Some("-"), None),
            (0, 3, Some("-"), None),
        ],
    );
    let host = mk_graph(
        "two hubs",
        &["X", "Y", "H", "H", "H", "X", "H", "H", "H"],
        &[
            (0, 1, "-"),
            (0, 2, "-"),
            (0, 3, "-"),
            (0, 4, "-"),
            (5, 6, "-"),
            (5, 7, "-"),
            (5, 8, "-"),
        ],
    );
    let embeddings = rule.embeddings(&host, 2);
    let mut hubs: Vec<usize> = embeddings.iter().map(|e| e.image(0).index()).collect();
    hubs.sort();
    assert_eq!(hubs, vec![0, 5]);
    assert_eq!(rule.embeddings(&host, 100).len(), 2);
}
