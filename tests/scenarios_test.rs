//! End-to-end scenarios taken from the behavioural examples.

use std::collections::BTreeMap;

use cyql::{execute, ParseOptions, Value};
use cyql::Graph;

#[test]
fn unwind_list_literal_produces_one_row_per_element() {
    let mut graph = Graph::new();
    let outcome = execute(
        "UNWIND [1,2,3] AS n RETURN n",
        &mut graph,
        &BTreeMap::new(),
        ParseOptions::relaxed(),
    );
    assert!(outcome.runtime_errors.is_empty());
    assert_eq!(outcome.columns, vec!["n".to_string()]);
    let ns: Vec<&Value> = outcome.rows.iter().map(|r| r.get("n").unwrap()).collect();
    assert_eq!(ns, vec![&Value::Int(1), &Value::Int(2), &Value::Int(3)]);
}

#[test]
fn filters_people_older_than_thirty() {
    let mut graph = Graph::new();
    let mut alice = BTreeMap::new();
    alice.insert("name".to_string(), Value::String("Alice".to_string()));
    alice.insert("age".to_string(), Value::Int(34));
    graph.create_node(vec!["Person".to_string()], alice);

    let mut bob = BTreeMap::new();
    bob.insert("name".to_string(), Value::String("Bob".to_string()));
    bob.insert("age".to_string(), Value::Int(27));
    graph.create_node(vec!["Person".to_string()], bob);

    let outcome = execute(
        "MATCH (p:Person) WHERE p.age > 30 RETURN p.name AS name",
        &mut graph,
        &BTreeMap::new(),
        ParseOptions::relaxed(),
    );
    assert!(outcome.runtime_errors.is_empty());
    assert_eq!(outcome.rows.len(), 1);
    assert_eq!(outcome.rows[0].get("name"), Some(&Value::String("Alice".to_string())));
}

#[test]
fn union_dedups_but_union_all_keeps_duplicates() {
    let mut graph = Graph::new();
    let deduped = execute(
        "RETURN 1 AS n UNION RETURN 1 AS n",
        &mut graph,
        &BTreeMap::new(),
        ParseOptions::relaxed(),
    );
    assert!(deduped.runtime_errors.is_empty());
    assert_eq!(deduped.rows.len(), 1);

    let mut graph2 = Graph::new();
    let all = execute(
        "RETURN 1 AS n UNION ALL RETURN 1 AS n",
        &mut graph2,
        &BTreeMap::new(),
        ParseOptions::relaxed(),
    );
    assert!(all.runtime_errors.is_empty());
    assert_eq!(all.rows.len(), 2);
}

#[test]
fn merge_on_create_then_on_match_differ_across_two_runs() {
    let mut graph = Graph::new();
    let query = "MERGE (n:Person {name:'A'}) ON CREATE SET n.created=true ON MATCH SET n.matched=true RETURN n.created AS created, n.matched AS matched";

    let first = execute(query, &mut graph, &BTreeMap::new(), ParseOptions::relaxed());
    assert!(first.runtime_errors.is_empty());
    assert_eq!(first.rows.len(), 1);
    assert_eq!(first.rows[0].get("created"), Some(&Value::Bool(true)));
    assert_eq!(first.rows[0].get("matched"), Some(&Value::Null));

    let second = execute(query, &mut graph, &BTreeMap::new(), ParseOptions::relaxed());
    assert!(second.runtime_errors.is_empty());
    assert_eq!(second.rows.len(), 1);
    assert_eq!(second.rows[0].get("created"), Some(&Value::Bool(true)));
    assert_eq!(second.rows[0].get("matched"), Some(&Value::Bool(true)));
}

#[test]
fn variable_length_path_reports_length_and_relationship_count() {
    let mut graph = Graph::new();
    let a = graph.create_node(vec!["N".to_string()], BTreeMap::new()).id;
    let b = graph.create_node(vec!["N".to_string()], BTreeMap::new()).id;
    let c = graph.create_node(vec!["N".to_string()], BTreeMap::new()).id;
    graph.create_relationship(a, b, "R".to_string(), BTreeMap::new()).unwrap();
    graph.create_relationship(b, c, "R".to_string(), BTreeMap::new()).unwrap();

    let outcome = execute(
        &format!("MATCH p=(n)-[r:R*1..3]->(m) WHERE id(n) = {a} AND id(m) = {c} RETURN length(p) AS l, size(r) AS s"),
        &mut graph,
        &BTreeMap::new(),
        ParseOptions::relaxed(),
    );
    assert!(outcome.runtime_errors.is_empty());
    assert_eq!(outcome.rows.len(), 1);
    assert_eq!(outcome.rows[0].get("l"), Some(&Value::Int(2)));
    assert_eq!(outcome.rows[0].get("s"), Some(&Value::Int(2)));
}

#[test]
fn conversion_and_control_functions() {
    let mut graph = Graph::new();
    let outcome = execute(
        "RETURN toInteger('5') AS i, toFloat('2.5') AS f, size([1,2,3]) AS s, coalesce(null,'x') AS c",
        &mut graph,
        &BTreeMap::new(),
        ParseOptions::relaxed(),
    );
    assert!(outcome.runtime_errors.is_empty());
    assert_eq!(outcome.rows.len(), 1);
    let row = &outcome.rows[0];
    assert_eq!(row.get("i"), Some(&Value::Int(5)));
    assert_eq!(row.get("f"), Some(&Value::Float(2.5)));
    assert_eq!(row.get("s"), Some(&Value::Int(3)));
    assert_eq!(row.get("c"), Some(&Value::String("x".to_string())));
}
