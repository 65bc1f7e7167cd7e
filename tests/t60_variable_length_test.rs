use std::collections::BTreeMap;

use cyql::{execute, ParseOptions, Value};
use cyql::Graph;

fn seed_chain(graph: &mut Graph) {
    let mut make = |id: i64| {
        let mut props = BTreeMap::new();
        props.insert("id".to_string(), Value::Int(id));
        graph.create_node(vec!["N".to_string()], props).id
    };
    let a = make(1);
    let b = make(2);
    let c = make(3);
    graph.create_relationship(a, b, "R".to_string(), BTreeMap::new()).unwrap();
    graph.create_relationship(b, c, "R".to_string(), BTreeMap::new()).unwrap();
}

#[test]
fn variable_length_path_binds_length_and_relationship_count() {
    let mut graph = Graph::new();
    seed_chain(&mut graph);
    let outcome = execute(
        "MATCH p=(:N {id: 1})-[r:R*2]->(:N {id: 3}) RETURN length(p) AS l, size(r) AS s",
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
fn variable_length_never_reuses_a_relationship_within_one_match() {
    let mut graph = Graph::new();
    // a self-loop-free triangle would let a naive walker revisit an edge;
    // relationship-uniqueness must forbid that within a single path.
    let a = graph.create_node(vec![], BTreeMap::new()).id;
    let b = graph.create_node(vec![], BTreeMap::new()).id;
    graph.create_relationship(a, b, "R".to_string(), BTreeMap::new()).unwrap();
    graph.create_relationship(b, a, "R".to_string(), BTreeMap::new()).unwrap();

    let outcome = execute(
        "MATCH p=(n)-[r:R*1..4]->(n) RETURN size(r) AS s",
        &mut graph,
        &BTreeMap::new(),
        ParseOptions::relaxed(),
    );
    assert!(outcome.runtime_errors.is_empty());
    for row in &outcome.rows {
        match row.get("s") {
            Some(Value::Int(s)) => assert_eq!(*s % 2, 0, "path back to the start must use an even number of distinct hops"),
            other => panic!("unexpected: {other:?}"),
        }
    }
}

#[test]
fn zero_min_hops_matches_the_start_node_itself() {
    let mut graph = Graph::new();
    let a = graph.create_node(vec!["N".to_string()], BTreeMap::new()).id;
    let b = graph.create_node(vec!["N".to_string()], BTreeMap::new()).id;
    graph.create_relationship(a, b, "R".to_string(), BTreeMap::new()).unwrap();

    let outcome = execute(
        "MATCH (n:N)-[:R*0..1]->(m) RETURN count(*) AS c",
        &mut graph,
        &BTreeMap::new(),
        ParseOptions::relaxed(),
    );
    assert!(outcome.runtime_errors.is_empty());
    // n=a reaches itself (0 hops) and b (1 hop); n=b reaches only itself.
    assert_eq!(outcome.rows[0].get("c"), Some(&Value::Int(3)));
}
