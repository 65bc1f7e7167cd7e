use std::collections::BTreeMap;

use cyql::{execute, ParseOptions};
use cyql::Graph;

#[test]
fn delete_removes_an_isolated_node() {
    let mut graph = Graph::new();
    graph.create_node(vec!["N".to_string()], BTreeMap::new());
    let outcome = execute(
        "MATCH (n:N) DELETE n",
        &mut graph,
        &BTreeMap::new(),
        ParseOptions::relaxed(),
    );
    assert!(outcome.runtime_errors.is_empty());
    assert_eq!(graph.nodes().count(), 0);
}

#[test]
fn delete_without_detach_fails_when_relationships_remain() {
    let mut graph = Graph::new();
    let a = graph.create_node(vec![], BTreeMap::new()).id;
    let b = graph.create_node(vec![], BTreeMap::new()).id;
    graph.create_relationship(a, b, "R".to_string(), BTreeMap::new()).unwrap();

    let outcome = execute(
        "MATCH (n) WHERE id(n) = 1 DELETE n",
        &mut graph,
        &BTreeMap::new(),
        ParseOptions::relaxed(),
    );
    assert_eq!(outcome.runtime_errors.len(), 1);
    assert!(outcome.runtime_errors[0].contains("still has relationships"), "{}", outcome.runtime_errors[0]);
    assert_eq!(graph.nodes().count(), 2);
}

#[test]
fn detach_delete_removes_node_and_incident_relationships() {
    let mut graph = Graph::new();
    let a = graph.create_node(vec![], BTreeMap::new()).id;
    let b = graph.create_node(vec![], BTreeMap::new()).id;
    graph.create_relationship(a, b, "R".to_string(), BTreeMap::new()).unwrap();

    let outcome = execute(
        "MATCH (n) WHERE id(n) = 1 DETACH DELETE n",
        &mut graph,
        &BTreeMap::new(),
        ParseOptions::relaxed(),
    );
    assert!(outcome.runtime_errors.is_empty());
    assert_eq!(graph.nodes().count(), 1);
    assert_eq!(graph.relationship_count(), 0);
}

#[test]
fn delete_relationship_leaves_endpoints_intact() {
    let mut graph = Graph::new();
    let a = graph.create_node(vec![], BTreeMap::new()).id;
    let b = graph.create_node(vec![], BTreeMap::new()).id;
    graph.create_relationship(a, b, "R".to_string(), BTreeMap::new()).unwrap();

    let outcome = execute(
        "MATCH (a)-[r:R]->(b) DELETE r",
        &mut graph,
        &BTreeMap::new(),
        ParseOptions::relaxed(),
    );
    assert!(outcome.runtime_errors.is_empty());
    assert_eq!(graph.relationship_count(), 0);
    assert_eq!(graph.nodes().count(), 2);
}
