use std::collections::BTreeMap;

use cyql::{execute, ParseOptions};
use cyql::Graph;

#[test]
fn repeated_node_variable_within_one_chain_requires_matching_endpoints() {
    let mut graph = Graph::new();
    let a = graph.create_node(vec![], BTreeMap::new()).id;
    let b = graph.create_node(vec![], BTreeMap::new()).id;
    graph.create_relationship(a, b, "R".to_string(), BTreeMap::new()).unwrap();

    let outcome = execute(
        "MATCH (n)-[:R]->(n) RETURN n",
        &mut graph,
        &BTreeMap::new(),
        ParseOptions::relaxed(),
    );
    assert!(outcome.runtime_errors.is_empty());
    assert!(outcome.rows.is_empty(), "a non-self-loop edge must not satisfy (n)-->(n)");
}

#[test]
fn repeated_node_variable_matches_a_true_self_loop() {
    let mut graph = Graph::new();
    let a = graph.create_node(vec![], BTreeMap::new()).id;
    graph.create_relationship(a, a, "R".to_string(), BTreeMap::new()).unwrap();

    let outcome = execute(
        "MATCH (n)-[:R]->(n) RETURN n",
        &mut graph,
        &BTreeMap::new(),
        ParseOptions::relaxed(),
    );
    assert!(outcome.runtime_errors.is_empty());
    assert_eq!(outcome.rows.len(), 1);
}
