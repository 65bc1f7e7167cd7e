use std::collections::BTreeMap;

use cyql::{execute, ParseOptions, Value};
use cyql::Graph;

fn seed_people(graph: &mut Graph) {
    let mut alice = BTreeMap::new();
    alice.insert("name".to_string(), Value::String("Alice".to_string()));
    alice.insert("age".to_string(), Value::Int(34));
    graph.create_node(vec!["Person".to_string()], alice);

    let mut bob = BTreeMap::new();
    bob.insert("name".to_string(), Value::String("Bob".to_string()));
    bob.insert("age".to_string(), Value::Int(27));
    graph.create_node(vec!["Person".to_string()], bob);
}

#[test]
fn where_filters_by_numeric_comparison() {
    let mut graph = Graph::new();
    seed_people(&mut graph);
    let outcome = execute(
        "MATCH (n:Person) WHERE n.age >= 30 RETURN n.name AS name",
        &mut graph,
        &BTreeMap::new(),
        ParseOptions::relaxed(),
    );
    assert!(outcome.runtime_errors.is_empty());
    assert_eq!(outcome.rows.len(), 1);
    assert_eq!(outcome.rows[0].get("name"), Some(&Value::String("Alice".to_string())));
}

#[test]
fn where_drops_rows_when_predicate_is_null() {
    let mut graph = Graph::new();
    graph.create_node(vec!["Person".to_string()], BTreeMap::new());
    let outcome = execute(
        "MATCH (n:Person) WHERE n.missing > 1 RETURN n",
        &mut graph,
        &BTreeMap::new(),
        ParseOptions::relaxed(),
    );
    assert!(outcome.runtime_errors.is_empty());
    assert!(outcome.rows.is_empty());
}

#[test]
fn where_rejects_non_boolean_expression() {
    let mut graph = Graph::new();
    graph.create_node(vec![], BTreeMap::new());
    let outcome = execute(
        "MATCH (n) WHERE n.age RETURN n",
        &mut graph,
        &BTreeMap::new(),
        ParseOptions::relaxed(),
    );
    assert_eq!(outcome.runtime_errors.len(), 1);
}

#[test]
fn optional_match_binds_null_when_nothing_matches() {
    let mut graph = Graph::new();
    graph.create_node(vec!["Person".to_string()], BTreeMap::new());
    let outcome = execute(
        "MATCH (n:Person) OPTIONAL MATCH (n)-[r:KNOWS]->(m) RETURN r, m",
        &mut graph,
        &BTreeMap::new(),
        ParseOptions::relaxed(),
    );
    assert!(outcome.runtime_errors.is_empty());
    assert_eq!(outcome.rows.len(), 1);
    assert_eq!(outcome.rows[0].get("r"), Some(&Value::Null));
    assert_eq!(outcome.rows[0].get("m"), Some(&Value::Null));
}

#[test]
fn string_predicate_starts_with_is_null_propagating() {
    let mut graph = Graph::new();
    let mut props = BTreeMap::new();
    props.insert("name".to_string(), Value::String("Alice".to_string()));
    graph.create_node(vec!["Person".to_string()], props);
    graph.create_node(vec!["Person".to_string()], BTreeMap::new());

    let outcome = execute(
        "MATCH (n:Person) WHERE n.name STARTS WITH 'Al' RETURN n.name AS name",
        &mut graph,
        &BTreeMap::new(),
        ParseOptions::relaxed(),
    );
    assert!(outcome.runtime_errors.is_empty());
    assert_eq!(outcome.rows.len(), 1);
}
