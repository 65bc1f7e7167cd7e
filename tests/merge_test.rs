use std::collections::BTreeMap;

use cyql::{execute, ParseOptions, Value};
use cyql::Graph;

#[test]
fn merge_is_idempotent_on_empty_store() {
    let mut graph = Graph::new();
    let params = BTreeMap::new();
    for _ in 0..2 {
        let outcome = execute(
            "MERGE (n:Person {name: 'A'})",
            &mut graph,
            &params,
            ParseOptions::relaxed(),
        );
        assert!(outcome.runtime_errors.is_empty());
    }
    assert_eq!(graph.nodes().count(), 1);
}

#[test]
fn merge_on_create_and_on_match_scope_to_the_matching_run() {
    let mut graph = Graph::new();
    let params = BTreeMap::new();
    let query = "MERGE (n:Person {name: 'A'}) \
                 ON CREATE SET n.created = true \
                 ON MATCH SET n.matched = true \
                 RETURN n.created AS created, n.matched AS matched";

    let first = execute(query, &mut graph, &params, ParseOptions::relaxed());
    assert!(first.runtime_errors.is_empty());
    assert_eq!(first.rows[0].get("created"), Some(&Value::Bool(true)));
    assert_eq!(first.rows[0].get("matched"), Some(&Value::Null));

    let second = execute(query, &mut graph, &params, ParseOptions::relaxed());
    assert!(second.runtime_errors.is_empty());
    assert_eq!(second.rows[0].get("created"), Some(&Value::Bool(true)));
    assert_eq!(second.rows[0].get("matched"), Some(&Value::Bool(true)));
    assert_eq!(graph.nodes().count(), 1);
}

#[test]
fn merge_rejects_variable_length_relationship() {
    let mut graph = Graph::new();
    let outcome = execute(
        "MERGE (a)-[:R*2]->(b)",
        &mut graph,
        &BTreeMap::new(),
        ParseOptions::relaxed(),
    );
    assert_eq!(outcome.runtime_errors.len(), 1);
    assert!(outcome.runtime_errors[0].contains("Variable-length"), "{}", outcome.runtime_errors[0]);
}

#[test]
fn on_suffix_without_preceding_merge_is_an_error() {
    let mut graph = Graph::new();
    graph.create_node(vec![], BTreeMap::new());
    let outcome = execute(
        "MATCH (n) ON CREATE SET n.x = 1",
        &mut graph,
        &BTreeMap::new(),
        ParseOptions::relaxed(),
    );
    assert_eq!(outcome.runtime_errors.len(), 1);
    assert!(
        outcome.runtime_errors[0].contains("must directly follow MERGE"),
        "{}",
        outcome.runtime_errors[0]
    );
}
