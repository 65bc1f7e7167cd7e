use std::collections::BTreeMap;

use cyql::{execute, ParseOptions, Value};
use cyql::Graph;

#[test]
fn union_deduplicates_identical_rows() {
    let mut graph = Graph::new();
    let outcome = execute(
        "RETURN 1 AS n UNION RETURN 1 AS n",
        &mut graph,
        &BTreeMap::new(),
        ParseOptions::relaxed(),
    );
    assert!(outcome.runtime_errors.is_empty());
    assert_eq!(outcome.rows.len(), 1);
    assert_eq!(outcome.rows[0].get("n"), Some(&Value::Int(1)));
}

#[test]
fn union_all_keeps_duplicates() {
    let mut graph = Graph::new();
    let outcome = execute(
        "RETURN 1 AS n UNION ALL RETURN 1 AS n",
        &mut graph,
        &BTreeMap::new(),
        ParseOptions::relaxed(),
    );
    assert!(outcome.runtime_errors.is_empty());
    assert_eq!(outcome.rows.len(), 2);
}

#[test]
fn union_with_mismatched_columns_is_an_error() {
    let mut graph = Graph::new();
    let outcome = execute(
        "RETURN 1 AS n UNION RETURN 1 AS m",
        &mut graph,
        &BTreeMap::new(),
        ParseOptions::relaxed(),
    );
    assert_eq!(outcome.runtime_errors.len(), 1);
    assert!(
        outcome.runtime_errors[0].contains("must project the same columns"),
        "{}",
        outcome.runtime_errors[0]
    );
}

#[test]
fn union_with_empty_query_part_fails_to_parse() {
    let mut graph = Graph::new();
    let outcome = execute(
        "RETURN 1 AS n UNION",
        &mut graph,
        &BTreeMap::new(),
        ParseOptions::relaxed(),
    );
    assert!(outcome.parse_result.document.is_none());
    assert!(
        outcome
            .parse_result
            .diagnostics
            .iter()
            .any(|d| d.message.contains("cannot have an empty query part")),
        "{:?}",
        outcome.parse_result.diagnostics
    );
}
