use std::collections::BTreeMap;

use cyql::{execute, ParseOptions, Value};
use cyql::Graph;

fn seed_scores(graph: &mut Graph) {
    for (team, score) in [("red", 3), ("red", 5), ("blue", 2)] {
        let mut props = BTreeMap::new();
        props.insert("team".to_string(), Value::String(team.to_string()));
        props.insert("score".to_string(), Value::Int(score));
        graph.create_node(vec!["Match".to_string()], props);
    }
}

#[test]
fn count_star_counts_all_input_rows() {
    let mut graph = Graph::new();
    seed_scores(&mut graph);
    let outcome = execute(
        "MATCH (m:Match) RETURN count(*) AS c",
        &mut graph,
        &BTreeMap::new(),
        ParseOptions::relaxed(),
    );
    assert!(outcome.runtime_errors.is_empty());
    assert_eq!(outcome.rows[0].get("c"), Some(&Value::Int(3)));
}

#[test]
fn grouped_aggregation_computes_sum_per_group() {
    let mut graph = Graph::new();
    seed_scores(&mut graph);
    let outcome = execute(
        "MATCH (m:Match) RETURN m.team AS team, sum(m.score) AS total ORDER BY team",
        &mut graph,
        &BTreeMap::new(),
        ParseOptions::relaxed(),
    );
    assert!(outcome.runtime_errors.is_empty());
    assert_eq!(outcome.rows.len(), 2);
    assert_eq!(outcome.rows[0].get("team"), Some(&Value::String("blue".to_string())));
    assert_eq!(outcome.rows[0].get("total"), Some(&Value::Int(2)));
    assert_eq!(outcome.rows[1].get("team"), Some(&Value::String("red".to_string())));
    assert_eq!(outcome.rows[1].get("total"), Some(&Value::Int(8)));
}

#[test]
fn collect_distinct_dedups_structurally_equal_values() {
    let mut graph = Graph::new();
    let mut props = BTreeMap::new();
    props.insert("x".to_string(), Value::Int(1));
    graph.create_node(vec!["N".to_string()], props.clone());
    graph.create_node(vec!["N".to_string()], props);
    let outcome = execute(
        "MATCH (n:N) RETURN collect(DISTINCT n.x) AS xs",
        &mut graph,
        &BTreeMap::new(),
        ParseOptions::relaxed(),
    );
    assert!(outcome.runtime_errors.is_empty());
    assert_eq!(outcome.rows[0].get("xs"), Some(&Value::List(vec![Value::Int(1)])));
}

#[test]
fn wildcard_projection_with_aggregate_is_rejected() {
    let mut graph = Graph::new();
    seed_scores(&mut graph);
    let outcome = execute(
        "MATCH (m:Match) RETURN *, count(*)",
        &mut graph,
        &BTreeMap::new(),
        ParseOptions::relaxed(),
    );
    assert_eq!(outcome.runtime_errors.len(), 1);
    assert!(
        outcome.runtime_errors[0].contains("Wildcard projection with aggregation"),
        "{}",
        outcome.runtime_errors[0]
    );
}
