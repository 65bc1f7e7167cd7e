//! Clause pipeline (spec §4.4): executes a statement's clause sequence as a
//! stream of rows, routing each clause kind to its handler and splitting on
//! UNION/UNION ALL. Each handler consumes the current row list and yields a
//! new one, mirroring the row-stream model described in the Design Notes
//! rather than a lazy plan-iterator tree.

use std::collections::{BTreeMap, BTreeSet, HashSet};

use crate::ast::{ClauseKind, ClauseNode, OnSuffixKind, OrderKey, Query, RemoveItem, SetItem, UnionKind, YieldItem};
use crate::comparator::order_cmp;
use crate::error::{Error, Result, StoreError};
use crate::expr::eval::evaluate;
use crate::expr::{Expr, SpannedExpr};
use crate::pattern::{self, NodePattern, PatternChain, RelDirection, RelPattern};
use crate::projection;
use crate::row::Row;
use crate::store::Graph;
use crate::value::{value_key, NodeValue, PathValue, Value};

pub struct ExecOutcome {
    pub rows: Vec<Row>,
    pub columns: Vec<String>,
}

/// Runs a full query (all UNION/UNION ALL parts) against `graph`, starting
/// each part from `seed_rows` (a single empty row for a top-level statement,
/// or the current row for an EXISTS subquery).
pub fn execute_query(graph: &mut Graph, query: &Query, seed_rows: Vec<Row>, params: &BTreeMap<String, Value>) -> Result<ExecOutcome> {
    let mut part_results = Vec::with_capacity(query.parts.len());
    for part in &query.parts {
        let (rows, columns) = run_clauses(graph, &part.clauses, seed_rows.clone(), params, true)?;
        part_results.push((rows, columns));
    }
    let Some(first) = part_results.first() else {
        return Ok(ExecOutcome { rows: Vec::new(), columns: Vec::new() });
    };
    let _ = first;
    combine_union(part_results, &query.unions)
}

/// Runs `query` read-only against `graph`, seeded with the outer row's
/// bindings, and reports whether it produced any output row (spec §4.5
/// "Nested EXISTS { ... }").
pub fn run_subquery_has_rows(graph: &Graph, query: &Query, row: &Row, params: &BTreeMap<String, Value>) -> Result<bool> {
    let mut part_results = Vec::with_capacity(query.parts.len());
    for part in &query.parts {
        let (rows, columns) = run_clauses_readonly(graph, &part.clauses, vec![row.clone()], params)?;
        part_results.push((rows, columns));
    }
    if part_results.is_empty() {
        return Ok(false);
    }
    let outcome = combine_union(part_results, &query.unions)?;
    Ok(!outcome.rows.is_empty())
}

fn combine_union(mut parts: Vec<(Vec<Row>, Vec<String>)>, unions: &[UnionKind]) -> Result<ExecOutcome> {
    let (mut rows, columns) = parts.remove(0);
    for (kind, (next_rows, next_columns)) in unions.iter().zip(parts.into_iter()) {
        if next_columns != columns {
            return Err(Error::other("UNION query parts must project the same columns in the same order"));
        }
        rows.extend(next_rows);
        if matches!(kind, UnionKind::Union) {
            rows = dedup_rows(rows, &columns);
        }
    }
    Ok(ExecOutcome { rows, columns })
}

fn dedup_rows(rows: Vec<Row>, columns: &[String]) -> Vec<Row> {
    let mut seen = HashSet::new();
    let mut out = Vec::with_capacity(rows.len());
    for row in rows {
        let key: Vec<String> = columns
            .iter()
            .map(|c| value_key(row.get(c).unwrap_or(&Value::Null)).0)
            .collect();
        if seen.insert(key) {
            out.push(row);
        }
    }
    out
}

/// The full read/write clause interpreter used by top-level statement
/// execution.
fn run_clauses(
    graph: &mut Graph,
    clauses: &[ClauseNode],
    rows: Vec<Row>,
    params: &BTreeMap<String, Value>,
    allow_writes: bool,
) -> Result<(Vec<Row>, Vec<String>)> {
    let mut rows = rows;
    let mut columns: Vec<String> = Vec::new();
    let mut has_projection = false;

    for (i, clause) in clauses.iter().enumerate() {
        if let ClauseKind::Set { on_suffix: Some(_), .. } = &clause.kind {
            let prev_is_merge = i > 0 && matches!(clauses[i - 1].kind, ClauseKind::Merge { .. });
            if !prev_is_merge {
                return Err(Error::other("ON CREATE/ON MATCH SET must directly follow MERGE"));
            }
        }

        let is_merge = matches!(clause.kind, ClauseKind::Merge { .. });

        rows = match &clause.kind {
            ClauseKind::Match { optional, patterns } => exec_match(graph, patterns, *optional, rows, params)?,
            ClauseKind::Where { expr } => exec_where(graph, expr, rows, params)?,
            ClauseKind::With { items, distinct } | ClauseKind::Return { items, distinct } => {
                let outcome = projection::project(items, *distinct, rows, graph, params)?;
                columns = outcome.columns;
                has_projection = true;
                outcome.rows
            }
            ClauseKind::OrderBy { keys } => exec_order_by(graph, keys, rows, params)?,
            ClauseKind::Skip { expr } => exec_skip(graph, expr, rows, params)?,
            ClauseKind::Limit { expr } => exec_limit(graph, expr, rows, params)?,
            ClauseKind::Unwind { expr, variable } => exec_unwind(graph, expr, variable, rows, params)?,
            ClauseKind::Create { patterns } => {
                require_writes(allow_writes)?;
                exec_create(graph, patterns, rows, params)?
            }
            ClauseKind::Merge { pattern } => {
                require_writes(allow_writes)?;
                exec_merge(graph, pattern, rows, params)?
            }
            ClauseKind::Set { items, on_suffix } => {
                require_writes(allow_writes)?;
                exec_set(graph, items, *on_suffix, rows, params)?
            }
            ClauseKind::Remove { items } => {
                require_writes(allow_writes)?;
                exec_remove(graph, items, rows, params)?
            }
            ClauseKind::Delete { detach, targets } => {
                require_writes(allow_writes)?;
                exec_delete(graph, *detach, targets, rows, params)?
            }
            ClauseKind::Call { name, args, yield_items, yield_star } => {
                exec_call(graph, name, args, yield_items, *yield_star, rows, params)?
            }
            ClauseKind::Unknown => rows,
        };

        if !is_merge {
            clear_merge_flags(&mut rows);
        }
    }

    if !has_projection {
        return Ok((Vec::new(), Vec::new()));
    }
    Ok((rows, columns))
}

/// A restricted variant used for EXISTS subqueries: every read clause is
/// supported, but write clauses are rejected rather than mutating the store
/// out from under the outer evaluator's `&Graph` borrow.
fn run_clauses_readonly(
    graph: &Graph,
    clauses: &[ClauseNode],
    rows: Vec<Row>,
    params: &BTreeMap<String, Value>,
) -> Result<(Vec<Row>, Vec<String>)> {
    let mut rows = rows;
    let mut columns: Vec<String> = Vec::new();
    let mut has_projection = false;

    for clause in clauses {
        rows = match &clause.kind {
            ClauseKind::Match { optional, patterns } => exec_match(graph, patterns, *optional, rows, params)?,
            ClauseKind::Where { expr } => exec_where(graph, expr, rows, params)?,
            ClauseKind::With { items, distinct } | ClauseKind::Return { items, distinct } => {
                let outcome = projection::project(items, *distinct, rows, graph, params)?;
                columns = outcome.columns;
                has_projection = true;
                outcome.rows
            }
            ClauseKind::OrderBy { keys } => exec_order_by(graph, keys, rows, params)?,
            ClauseKind::Skip { expr } => exec_skip(graph, expr, rows, params)?,
            ClauseKind::Limit { expr } => exec_limit(graph, expr, rows, params)?,
            ClauseKind::Unwind { expr, variable } => exec_unwind(graph, expr, variable, rows, params)?,
            ClauseKind::Call { name, args, yield_items, yield_star } => {
                exec_call(graph, name, args, yield_items, *yield_star, rows, params)?
            }
            ClauseKind::Create { .. }
            | ClauseKind::Merge { .. }
            | ClauseKind::Set { .. }
            | ClauseKind::Remove { .. }
            | ClauseKind::Delete { .. } => {
                return Err(Error::other("subqueries do not support write clauses"));
            }
            ClauseKind::Unknown => rows,
        };
        clear_merge_flags(&mut rows);
    }

    if !has_projection {
        return Ok((Vec::new(), Vec::new()));
    }
    Ok((rows, columns))
}

fn require_writes(allow_writes: bool) -> Result<()> {
    if allow_writes {
        Ok(())
    } else {
        Err(Error::other("subqueries do not support write clauses"))
    }
}

fn clear_merge_flags(rows: &mut [Row]) {
    for row in rows {
        row.meta.clear_merge_flag();
    }
}

// ---------------------------------------------------------------- MATCH ---

fn exec_match(
    graph: &Graph,
    patterns: &[PatternChain],
    optional: bool,
    rows: Vec<Row>,
    params: &BTreeMap<String, Value>,
) -> Result<Vec<Row>> {
    let mut current = rows;
    for chain in patterns {
        let mut next = Vec::new();
        for row in &current {
            let results = pattern::match_pattern(chain, graph, row, params)?;
            if results.is_empty() {
                if optional {
                    next.push(bind_optional_nulls(chain, row));
                }
                continue;
            }
            for m in results {
                let mut new_row = row.clone();
                for (name, value) in m.bindings {
                    new_row.set(name, value);
                }
                if let (Some(path_var), Some(path)) = (&chain.path_variable, m.path) {
                    new_row.set(path_var.clone(), Value::Path(path));
                }
                next.push(new_row);
            }
        }
        current = next;
    }
    Ok(current)
}

fn bind_optional_nulls(chain: &PatternChain, row: &Row) -> Row {
    let mut new_row = row.clone();
    for node in chain.node_patterns() {
        if let Some(var) = &node.variable {
            if !new_row.contains(var) {
                new_row.set(var.clone(), Value::Null);
            }
        }
    }
    for rel in chain.rel_patterns() {
        if let Some(var) = &rel.variable {
            if !new_row.contains(var) {
                new_row.set(var.clone(), Value::Null);
            }
        }
    }
    if let Some(path_var) = &chain.path_variable {
        if !new_row.contains(path_var) {
            new_row.set(path_var.clone(), Value::Null);
        }
    }
    new_row
}

// ---------------------------------------------------------------- WHERE ---

fn exec_where(graph: &Graph, expr: &SpannedExpr, rows: Vec<Row>, params: &BTreeMap<String, Value>) -> Result<Vec<Row>> {
    let mut out = Vec::with_capacity(rows.len());
    for row in rows {
        match evaluate(&expr.expr, &row, graph, params)? {
            Value::Bool(true) => out.push(row),
            Value::Bool(false) | Value::Null => {}
            _ => return Err(Error::other("WHERE clause expression must evaluate to a boolean or null")),
        }
    }
    Ok(out)
}

// ------------------------------------------------------------ ORDER BY ---

fn exec_order_by(graph: &Graph, keys: &[OrderKey], rows: Vec<Row>, params: &BTreeMap<String, Value>) -> Result<Vec<Row>> {
    let mut keyed: Vec<(Vec<Value>, Row)> = Vec::with_capacity(rows.len());
    for row in rows {
        let mut values = Vec::with_capacity(keys.len());
        for key in keys {
            values.push(resolve_order_key_value(key, &row, graph, params)?);
        }
        keyed.push((values, row));
    }
    keyed.sort_by(|a, b| {
        for (i, key) in keys.iter().enumerate() {
            let cmp = order_cmp(&a.0[i], &b.0[i]);
            let cmp = if key.descending { cmp.reverse() } else { cmp };
            if cmp != std::cmp::Ordering::Equal {
                return cmp;
            }
        }
        std::cmp::Ordering::Equal
    });
    Ok(keyed.into_iter().map(|(_, row)| row).collect())
}

/// Spec §4.4: "looked up first in the row as alias, then in the hidden
/// expression cache, else re-evaluated."
fn resolve_order_key_value(key: &OrderKey, row: &Row, graph: &Graph, params: &BTreeMap<String, Value>) -> Result<Value> {
    if let Expr::Variable(name) = &key.expr.expr {
        if let Some(value) = row.get(name) {
            return Ok(value.clone());
        }
    }
    if let Some(value) = row.meta.expr_cache.get(&key.expr.text) {
        return Ok(value.clone());
    }
    evaluate(&key.expr.expr, row, graph, params)
}

// ---------------------------------------------------------- SKIP/LIMIT ---

fn eval_nonneg_int(expr: &SpannedExpr, graph: &Graph, params: &BTreeMap<String, Value>) -> Result<usize> {
    let value = evaluate(&expr.expr, &Row::empty(), graph, params)?;
    match value {
        Value::Int(i) if i >= 0 => Ok(i as usize),
        Value::Int(_) => Err(Error::other("LIMIT/SKIP value cannot be negative")),
        _ => Err(Error::other("LIMIT/SKIP value must be an integer")),
    }
}

fn exec_skip(graph: &Graph, expr: &SpannedExpr, rows: Vec<Row>, params: &BTreeMap<String, Value>) -> Result<Vec<Row>> {
    let n = eval_nonneg_int(expr, graph, params)?;
    Ok(rows.into_iter().skip(n).collect())
}

fn exec_limit(graph: &Graph, expr: &SpannedExpr, rows: Vec<Row>, params: &BTreeMap<String, Value>) -> Result<Vec<Row>> {
    let n = eval_nonneg_int(expr, graph, params)?;
    Ok(rows.into_iter().take(n).collect())
}

// -------------------------------------------------------------- UNWIND ---

fn exec_unwind(
    graph: &Graph,
    expr: &SpannedExpr,
    variable: &str,
    rows: Vec<Row>,
    params: &BTreeMap<String, Value>,
) -> Result<Vec<Row>> {
    let mut out = Vec::new();
    for row in rows {
        match evaluate(&expr.expr, &row, graph, params)? {
            Value::Null => {}
            Value::List(items) => {
                for item in items {
                    out.push(row.with(variable.to_string(), item));
                }
            }
            _ => return Err(Error::other("UNWIND expression must evaluate to a list")),
        }
    }
    Ok(out)
}

// ----------------------------------------------------- CREATE / MERGE ---

fn validate_props(props: BTreeMap<String, Value>) -> Result<BTreeMap<String, Value>> {
    for value in props.values() {
        if !value.is_valid_property_value() {
            return Err(Error::Store(StoreError::UnsupportedPropertyValue));
        }
    }
    Ok(props)
}

/// Reuses a bound node variable, or creates a new node from the pattern.
/// The `bool` is whether a node was newly created.
fn resolve_or_create_node(
    graph: &mut Graph,
    pattern: &NodePattern,
    row: &Row,
    params: &BTreeMap<String, Value>,
) -> Result<(NodeValue, bool)> {
    if let Some(var) = &pattern.variable {
        if let Some(existing) = row.get(var) {
            return match existing {
                Value::Node(n) => Ok((n.clone(), false)),
                _ => Err(Error::other(format!(
                    "Variable \"{var}\" is not bound to a node/relationship in CREATE/MERGE"
                ))),
            };
        }
    }
    let props = validate_props(pattern::eval_property_map(&pattern.properties, row, graph, params)?)?;
    Ok((graph.create_node(pattern.labels.clone(), props), true))
}

/// Builds one comma-separated sub-pattern of a CREATE or the create branch
/// of a MERGE (spec §4.4). Returns whether anything was newly created.
fn build_chain(
    graph: &mut Graph,
    chain: &PatternChain,
    row: &mut Row,
    params: &BTreeMap<String, Value>,
    is_merge: bool,
) -> Result<bool> {
    let node_patterns: Vec<&NodePattern> = chain.node_patterns().collect();
    let rel_patterns: Vec<&RelPattern> = chain.rel_patterns().collect();
    if node_patterns.is_empty() {
        return Err(Error::other("MERGE pattern cannot be empty"));
    }
    if is_merge && rel_patterns.len() > 1 {
        return Err(Error::other("MERGE supports at most one relationship segment"));
    }

    let mut created_any = false;
    let mut node_values = Vec::with_capacity(node_patterns.len());
    for pattern in &node_patterns {
        let (value, created) = resolve_or_create_node(graph, pattern, row, params)?;
        created_any |= created;
        node_values.push(value);
    }

    let mut rel_values = Vec::with_capacity(rel_patterns.len());
    for (i, pattern) in rel_patterns.iter().enumerate() {
        if pattern.variable_length.is_some() {
            return Err(Error::other(if is_merge {
                "Variable-length relationships are not supported in MERGE"
            } else {
                "CREATE does not support variable-length relationships"
            }));
        }
        if pattern.types.len() != 1 {
            return Err(Error::other("relationship pattern requires exactly one type"));
        }
        let (start, end) = match pattern.direction {
            RelDirection::RightToLeft => (node_values[i + 1].id, node_values[i].id),
            RelDirection::LeftToRight | RelDirection::Undirected => (node_values[i].id, node_values[i + 1].id),
        };
        let props = validate_props(pattern::eval_property_map(&pattern.properties, row, graph, params)?)?;
        let rel = graph.create_relationship(start, end, pattern.types[0].clone(), props)?;
        created_any = true;
        rel_values.push(rel);
    }

    if let Some(path_var) = &chain.path_variable {
        row.set(
            path_var.clone(),
            Value::Path(PathValue {
                nodes: node_values.clone(),
                relationships: rel_values.clone(),
            }),
        );
    }
    for (pattern, value) in node_patterns.iter().zip(node_values.into_iter()) {
        if let Some(var) = &pattern.variable {
            row.set(var.clone(), Value::Node(value));
        }
    }
    for (pattern, value) in rel_patterns.iter().zip(rel_values.into_iter()) {
        if let Some(var) = &pattern.variable {
            row.set(var.clone(), Value::Relationship(value));
        }
    }
    Ok(created_any)
}

fn exec_create(graph: &mut Graph, patterns: &[PatternChain], rows: Vec<Row>, params: &BTreeMap<String, Value>) -> Result<Vec<Row>> {
    let mut out = Vec::with_capacity(rows.len());
    for mut row in rows {
        for chain in patterns {
            build_chain(graph, chain, &mut row, params, false)?;
        }
        out.push(row);
    }
    Ok(out)
}

fn exec_merge(graph: &mut Graph, chain: &PatternChain, rows: Vec<Row>, params: &BTreeMap<String, Value>) -> Result<Vec<Row>> {
    let mut out = Vec::with_capacity(rows.len());
    for mut row in rows {
        let found = pattern::match_pattern(chain, graph, &row, params)?.into_iter().next();
        match found {
            Some(result) => {
                for (name, value) in result.bindings {
                    row.set(name, value);
                }
                if let (Some(path_var), Some(path)) = (&chain.path_variable, result.path) {
                    row.set(path_var.clone(), Value::Path(path));
                }
                row.meta.last_merge_created = Some(false);
            }
            None => {
                let created = build_chain(graph, chain, &mut row, params, true)?;
                row.meta.last_merge_created = Some(created);
            }
        }
        out.push(row);
    }
    Ok(out)
}

// ------------------------------------------------------------- SET/REMOVE ---

fn exec_set(
    graph: &mut Graph,
    items: &[SetItem],
    on_suffix: Option<OnSuffixKind>,
    rows: Vec<Row>,
    params: &BTreeMap<String, Value>,
) -> Result<Vec<Row>> {
    let mut out = Vec::with_capacity(rows.len());
    for mut row in rows {
        let apply = match on_suffix {
            None => true,
            Some(OnSuffixKind::Create) => row.meta.last_merge_created == Some(true),
            Some(OnSuffixKind::Match) => row.meta.last_merge_created == Some(false),
        };
        if apply {
            for item in items {
                apply_set_item(graph, item, &mut row, params)?;
            }
        }
        out.push(row);
    }
    Ok(out)
}

fn apply_set_item(graph: &mut Graph, item: &SetItem, row: &mut Row, params: &BTreeMap<String, Value>) -> Result<()> {
    match item {
        SetItem::SetProperty { target, property, value } => {
            let target_value = evaluate(&target.expr, row, graph, params)?;
            match target_value {
                Value::Null => Ok(()),
                Value::Node(n) => {
                    let value = evaluate(&value.expr, row, graph, params)?;
                    if !value.is_valid_property_value() {
                        return Err(Error::Store(StoreError::UnsupportedPropertyValue));
                    }
                    let value = if value.is_null() { None } else { Some(value) };
                    graph.set_node_property(n.id, property, value)?;
                    Ok(())
                }
                Value::Relationship(r) => {
                    let value = evaluate(&value.expr, row, graph, params)?;
                    if !value.is_valid_property_value() {
                        return Err(Error::Store(StoreError::UnsupportedPropertyValue));
                    }
                    let value = if value.is_null() { None } else { Some(value) };
                    graph.set_relationship_property(r.id, property, value)?;
                    Ok(())
                }
                _ => Err(Error::other("SET target must be a node or relationship")),
            }
        }
        SetItem::SetLabels { variable, labels } => match row.get(variable).cloned() {
            Some(Value::Node(n)) => {
                for label in labels {
                    graph.add_label(n.id, label)?;
                }
                Ok(())
            }
            Some(Value::Null) | None => Ok(()),
            _ => Err(Error::other("SET target must be a node or relationship")),
        },
        SetItem::MergeMap { variable, value } => apply_map_set(graph, row, variable, value, params, false),
        SetItem::ReplaceMap { variable, value } => apply_map_set(graph, row, variable, value, params, true),
    }
}

fn apply_map_set(
    graph: &mut Graph,
    row: &mut Row,
    variable: &str,
    value_expr: &SpannedExpr,
    params: &BTreeMap<String, Value>,
    replace: bool,
) -> Result<()> {
    let target = row.get(variable).cloned();
    let source = evaluate(&value_expr.expr, row, graph, params)?;
    let props = validate_props(match source {
        Value::Map(m) => m,
        Value::Node(n) => n.properties,
        Value::Relationship(r) => r.properties,
        Value::Null => BTreeMap::new(),
        _ => return Err(Error::other("SET += / = expects a map, node, or relationship value")),
    })?;
    match target {
        Some(Value::Node(n)) => {
            if replace {
                for key in node_property_keys(graph, n.id) {
                    graph.set_node_property(n.id, &key, None)?;
                }
            }
            for (key, value) in props {
                graph.set_node_property(n.id, &key, Some(value))?;
            }
            Ok(())
        }
        Some(Value::Relationship(r)) => {
            if replace {
                for key in rel_property_keys(graph, r.id) {
                    graph.set_relationship_property(r.id, &key, None)?;
                }
            }
            for (key, value) in props {
                graph.set_relationship_property(r.id, &key, Some(value))?;
            }
            Ok(())
        }
        Some(Value::Null) | None => Ok(()),
        _ => Err(Error::other("SET target must be a node or relationship")),
    }
}

fn node_property_keys(graph: &Graph, id: u64) -> Vec<String> {
    graph.node(id).map(|n| n.properties.into_keys().collect()).unwrap_or_default()
}

fn rel_property_keys(graph: &Graph, id: u64) -> Vec<String> {
    graph.relationship(id).map(|r| r.properties.into_keys().collect()).unwrap_or_default()
}

fn exec_remove(graph: &mut Graph, items: &[RemoveItem], rows: Vec<Row>, params: &BTreeMap<String, Value>) -> Result<Vec<Row>> {
    let mut out = Vec::with_capacity(rows.len());
    for row in rows {
        for item in items {
            match item {
                RemoveItem::Property { target, property } => match evaluate(&target.expr, &row, graph, params)? {
                    Value::Node(n) => {
                        graph.set_node_property(n.id, property, None)?;
                    }
                    Value::Relationship(r) => {
                        graph.set_relationship_property(r.id, property, None)?;
                    }
                    Value::Null => {}
                    _ => return Err(Error::other("SET target must be a node or relationship")),
                },
                RemoveItem::Labels { variable, labels } => match row.get(variable).cloned() {
                    Some(Value::Node(n)) => {
                        for label in labels {
                            graph.remove_label(n.id, label)?;
                        }
                    }
                    Some(Value::Null) | None => {}
                    _ => return Err(Error::other("SET target must be a node or relationship")),
                },
            }
        }
        out.push(row);
    }
    Ok(out)
}

// --------------------------------------------------------------- DELETE ---

fn exec_delete(
    graph: &mut Graph,
    detach: bool,
    targets: &[SpannedExpr],
    rows: Vec<Row>,
    params: &BTreeMap<String, Value>,
) -> Result<Vec<Row>> {
    let mut node_ids = BTreeSet::new();
    let mut rel_ids = BTreeSet::new();
    for row in &rows {
        for target in targets {
            let value = evaluate(&target.expr, row, graph, params)?;
            collect_delete_target(&value, &mut node_ids, &mut rel_ids)?;
        }
    }
    for id in &rel_ids {
        graph.delete_relationship(*id);
    }
    for id in &node_ids {
        graph.delete_node(*id, detach)?;
    }
    Ok(rows)
}

fn collect_delete_target(value: &Value, node_ids: &mut BTreeSet<u64>, rel_ids: &mut BTreeSet<u64>) -> Result<()> {
    match value {
        Value::Node(n) => {
            node_ids.insert(n.id);
            Ok(())
        }
        Value::Relationship(r) => {
            rel_ids.insert(r.id);
            Ok(())
        }
        Value::Path(p) => {
            for n in &p.nodes {
                node_ids.insert(n.id);
            }
            for r in &p.relationships {
                rel_ids.insert(r.id);
            }
            Ok(())
        }
        Value::List(items) => {
            for item in items {
                collect_delete_target(item, node_ids, rel_ids)?;
            }
            Ok(())
        }
        Value::Null => Ok(()),
        _ => Err(Error::other("DELETE target must resolve to a node, relationship, path, or list thereof")),
    }
}

// ----------------------------------------------------------------- CALL ---

fn exec_call(
    graph: &Graph,
    name: &str,
    args: &[SpannedExpr],
    yield_items: &Option<Vec<YieldItem>>,
    yield_star: bool,
    rows: Vec<Row>,
    _params: &BTreeMap<String, Value>,
) -> Result<Vec<Row>> {
    let (column, values): (&str, Vec<Value>) = match name {
        "db.labels" => {
            if !args.is_empty() {
                return Err(Error::other("db.labels() does not accept args"));
            }
            ("label", graph.labels().into_iter().map(Value::String).collect())
        }
        "db.relationshipTypes" => {
            if !args.is_empty() {
                return Err(Error::other("db.relationshipTypes() does not accept args"));
            }
            ("relationshipType", graph.relationship_types().into_iter().map(Value::String).collect())
        }
        "db.propertyKeys" => {
            if !args.is_empty() {
                return Err(Error::other("db.propertyKeys() does not accept args"));
            }
            ("propertyKey", graph.property_keys().into_iter().map(Value::String).collect())
        }
        _ => return Err(Error::other("Unsupported CALL procedure")),
    };

    if yield_star {
        if rows.iter().any(|r| !r.is_empty()) {
            return Err(Error::other("YIELD * is only supported for standalone CALL"));
        }
        return Ok(values
            .into_iter()
            .map(|v| Row::project(vec![(column.to_string(), v)]))
            .collect());
    }

    let Some(items) = yield_items.as_ref() else {
        return Ok(rows);
    };
    for item in items {
        if item.name != column {
            return Err(Error::other(format!("{name}() does not yield \"{}\"", item.name)));
        }
    }
    let base_rows = if rows.is_empty() { vec![Row::empty()] } else { rows };
    let mut out = Vec::with_capacity(base_rows.len() * values.len().max(1));
    for row in &base_rows {
        for value in &values {
            let mut new_row = row.clone();
            for item in items {
                let alias = item.alias.clone().unwrap_or_else(|| item.name.clone());
                new_row.set(alias, value.clone());
            }
            out.push(new_row);
        }
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::build_query;
    use crate::segment::segment;

    fn run(text: &str, graph: &mut Graph, params: &BTreeMap<String, Value>) -> ExecOutcome {
        let segmented = segment(text);
        assert!(segmented.diagnostics.iter().all(|d| !d.is_error()));
        let query = build_query(&segmented.statements[0]).unwrap();
        execute_query(graph, &query, vec![Row::empty()], params).unwrap()
    }

    #[test]
    fn unwind_returns_one_row_per_element() {
        let mut graph = Graph::new();
        let params = BTreeMap::new();
        let outcome = run("UNWIND [1,2,3] AS n RETURN n", &mut graph, &params);
        assert_eq!(outcome.columns, vec!["n".to_string()]);
        assert_eq!(outcome.rows.len(), 3);
        assert_eq!(outcome.rows[1].get("n"), Some(&Value::Int(2)));
    }

    #[test]
    fn match_filters_by_where() {
        let mut graph = Graph::new();
        let mut alice_props = BTreeMap::new();
        alice_props.insert("name".to_string(), Value::String("Alice".to_string()));
        alice_props.insert("age".to_string(), Value::Int(34));
        graph.create_node(vec!["Person".to_string()], alice_props);
        let mut bob_props = BTreeMap::new();
        bob_props.insert("name".to_string(), Value::String("Bob".to_string()));
        bob_props.insert("age".to_string(), Value::Int(27));
        graph.create_node(vec!["Person".to_string()], bob_props);

        let params = BTreeMap::new();
        let outcome = run(
            "MATCH (n:Person) WHERE n.age >= 30 RETURN n.name AS name",
            &mut graph,
            &params,
        );
        assert_eq!(outcome.rows.len(), 1);
        assert_eq!(outcome.rows[0].get("name"), Some(&Value::String("Alice".to_string())));
    }

    #[test]
    fn union_all_concatenates_and_union_dedups() {
        let mut graph = Graph::new();
        let params = BTreeMap::new();
        let all = run("RETURN 1 AS n UNION ALL RETURN 1 AS n", &mut graph, &params);
        assert_eq!(all.rows.len(), 2);
        let deduped = run("RETURN 1 AS n UNION RETURN 1 AS n", &mut graph, &params);
        assert_eq!(deduped.rows.len(), 1);
    }

    #[test]
    fn merge_on_create_and_on_match_scope_correctly() {
        let mut graph = Graph::new();
        let params = BTreeMap::new();
        let query_text = "MERGE (n:Person {name:'A'}) ON CREATE SET n.created=true ON MATCH SET n.matched=true RETURN n.created AS created, n.matched AS matched";
        let first = run(query_text, &mut graph, &params);
        assert_eq!(first.rows[0].get("created"), Some(&Value::Bool(true)));
        assert_eq!(first.rows[0].get("matched"), Some(&Value::Null));
        let second = run(query_text, &mut graph, &params);
        assert_eq!(second.rows[0].get("created"), Some(&Value::Bool(true)));
        assert_eq!(second.rows[0].get("matched"), Some(&Value::Bool(true)));
    }

    #[test]
    fn detach_delete_removes_node_and_incident_relationships() {
        let mut graph = Graph::new();
        let params = BTreeMap::new();
        graph.create_node(vec!["N".to_string()], BTreeMap::new());
        graph.create_node(vec!["N".to_string()], BTreeMap::new());
        graph.create_relationship(1, 2, "R".to_string(), BTreeMap::new()).unwrap();
        run("MATCH (n:N {}) WHERE false RETURN n", &mut graph, &params);
        let _ = run("MATCH (n) DETACH DELETE n", &mut graph, &params);
        assert!(graph.nodes().next().is_none());
        assert!(graph.relationships().next().is_none());
    }

    #[test]
    fn skip_and_limit_apply_to_row_stream() {
        let mut graph = Graph::new();
        let params = BTreeMap::new();
        let outcome = run("UNWIND [1,2,3,4,5] AS n RETURN n SKIP 1 LIMIT 2", &mut graph, &params);
        let values: Vec<_> = outcome.rows.iter().map(|r| r.get("n").cloned().unwrap()).collect();
        assert_eq!(values, vec![Value::Int(2), Value::Int(3)]);
    }
}
