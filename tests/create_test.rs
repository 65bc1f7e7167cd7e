use std::collections::BTreeMap;

use cyql::{execute, ParseOptions};
use cyql::Graph;

#[test]
fn create_single_node_with_properties() {
    let mut graph = Graph::new();
    let outcome = execute(
        "CREATE (n:Person {name: 'Alice', age: 34}) RETURN n.name AS name, n.age AS age",
        &mut graph,
        &BTreeMap::new(),
        ParseOptions::relaxed(),
    );
    assert!(outcome.runtime_errors.is_empty());
    assert_eq!(outcome.rows.len(), 1);
    assert_eq!(graph.nodes().count(), 1);
    let node = graph.nodes().next().unwrap();
    assert_eq!(node.labels, vec!["Person".to_string()]);
}

#[test]
fn create_relationship_between_two_new_nodes() {
    let mut graph = Graph::new();
    let outcome = execute(
        "CREATE (a:N {id: 1})-[r:R {weight: 2.5}]->(b:N {id: 2}) RETURN type(r) AS t",
        &mut graph,
        &BTreeMap::new(),
        ParseOptions::relaxed(),
    );
    assert!(outcome.runtime_errors.is_empty());
    assert_eq!(graph.nodes().count(), 2);
    assert_eq!(graph.relationship_count(), 1);
    let rel = graph.relationships().next().unwrap();
    assert_eq!(rel.rel_type, "R");
}

#[test]
fn create_rejects_variable_length_relationship() {
    let mut graph = Graph::new();
    let outcome = execute(
        "CREATE (a)-[:R*1..2]->(b)",
        &mut graph,
        &BTreeMap::new(),
        ParseOptions::relaxed(),
    );
    assert_eq!(outcome.runtime_errors.len(), 1);
    assert!(outcome.runtime_errors[0].contains("variable-length"), "{}", outcome.runtime_errors[0]);
}

#[test]
fn create_reuses_already_bound_variable_for_relationship_endpoint() {
    let mut graph = Graph::new();
    let outcome = execute(
        "CREATE (a:N) CREATE (a)-[:R]->(b:N) RETURN a, b",
        &mut graph,
        &BTreeMap::new(),
        ParseOptions::relaxed(),
    );
    assert!(outcome.runtime_errors.is_empty());
    // only two nodes total: the first CREATE's `a` is reused, not recreated.
    assert_eq!(graph.nodes().count(), 2);
}
