use std::collections::BTreeMap;

use cyql::{execute, ParseOptions, Value};
use cyql::Graph;

fn seed_ages(graph: &mut Graph, ages: &[i64]) {
    for age in ages {
        let mut props = BTreeMap::new();
        props.insert("age".to_string(), Value::Int(*age));
        graph.create_node(vec!["Person".to_string()], props);
    }
}

#[test]
fn order_by_desc_sorts_descending() {
    let mut graph = Graph::new();
    seed_ages(&mut graph, &[34, 27, 41]);
    let outcome = execute(
        "MATCH (n:Person) RETURN n.age AS age ORDER BY age DESC",
        &mut graph,
        &BTreeMap::new(),
        ParseOptions::relaxed(),
    );
    assert!(outcome.runtime_errors.is_empty());
    let ages: Vec<i64> = outcome
        .rows
        .iter()
        .map(|r| match r.get("age") {
            Some(Value::Int(i)) => *i,
            other => panic!("unexpected: {other:?}"),
        })
        .collect();
    assert_eq!(ages, vec![41, 34, 27]);
}

#[test]
fn skip_and_limit_compose_with_order_by() {
    let mut graph = Graph::new();
    seed_ages(&mut graph, &[10, 20, 30, 40, 50]);
    let outcome = execute(
        "MATCH (n:Person) RETURN n.age AS age ORDER BY age SKIP 1 LIMIT 2",
        &mut graph,
        &BTreeMap::new(),
        ParseOptions::relaxed(),
    );
    assert!(outcome.runtime_errors.is_empty());
    let ages: Vec<i64> = outcome
        .rows
        .iter()
        .map(|r| match r.get("age") {
            Some(Value::Int(i)) => *i,
            other => panic!("unexpected: {other:?}"),
        })
        .collect();
    assert_eq!(ages, vec![20, 30]);
}

#[test]
fn negative_limit_is_an_error() {
    let mut graph = Graph::new();
    seed_ages(&mut graph, &[1]);
    let outcome = execute(
        "MATCH (n:Person) RETURN n LIMIT -1",
        &mut graph,
        &BTreeMap::new(),
        ParseOptions::relaxed(),
    );
    assert_eq!(outcome.runtime_errors.len(), 1);
    assert!(outcome.runtime_errors[0].contains("cannot be negative"), "{}", outcome.runtime_errors[0]);
}

#[test]
fn nulls_sort_last_in_order_by() {
    let mut graph = Graph::new();
    graph.create_node(vec!["Person".to_string()], BTreeMap::new());
    seed_ages(&mut graph, &[5]);
    let outcome = execute(
        "MATCH (n:Person) RETURN n.age AS age ORDER BY age",
        &mut graph,
        &BTreeMap::new(),
        ParseOptions::relaxed(),
    );
    assert!(outcome.runtime_errors.is_empty());
    assert_eq!(outcome.rows[0].get("age"), Some(&Value::Int(5)));
    assert_eq!(outcome.rows[1].get("age"), Some(&Value::Null));
}
