//! WITH/RETURN projection (spec §4.6): wildcard expansion, implicit
//! aliasing, aggregate detection and grouping, and DISTINCT dedup.

use std::collections::BTreeMap;
use std::collections::HashMap;

use crate::ast::ProjectionItem;
use crate::error::{Error, Result};
use crate::expr::eval;
use crate::expr::functions::is_aggregate_name;
use crate::expr::Expr;
use crate::row::Row;
use crate::store::Graph;
use crate::value::{value_key, Value};

pub struct ProjectionOutcome {
    pub rows: Vec<Row>,
    pub columns: Vec<String>,
}

/// Projects `input_rows` through `items`, per spec §4.6. Handles the three
/// shapes uniformly: plain projection, DISTINCT dedup, and (when any item
/// contains an aggregate call) grouped aggregation.
pub fn project(
    items: &[ProjectionItem],
    distinct: bool,
    input_rows: Vec<Row>,
    graph: &Graph,
    params: &BTreeMap<String, Value>,
) -> Result<ProjectionOutcome> {
    let has_star = items.iter().any(|i| i.is_star);
    let has_aggregate = items.iter().any(|i| contains_aggregate(&i.expr.expr));
    if has_star && has_aggregate {
        return Err(Error::other("Wildcard projection with aggregation is not supported"));
    }

    if has_aggregate {
        return project_grouped(items, distinct, input_rows, graph, params);
    }

    let mut out_rows = Vec::with_capacity(input_rows.len());
    let mut columns: Option<Vec<String>> = None;
    let mut seen = if distinct { Some(HashMap::<String, ()>::new()) } else { None };

    for row in &input_rows {
        let mut pairs = Vec::new();
        let mut cache = HashMap::new();
        for item in items {
            if item.is_star {
                for name in row.names() {
                    pairs.push((name.to_string(), row.get(name).cloned().unwrap_or(Value::Null)));
                }
                continue;
            }
            let value = eval::evaluate(&item.expr.expr, row, graph, params)?;
            cache.insert(item.expr.text.clone(), value.clone());
            pairs.push((item.alias.clone(), value));
        }
        if columns.is_none() {
            columns = Some(pairs.iter().map(|(k, _)| k.clone()).collect());
        }
        if let Some(seen) = &mut seen {
            let key = dedup_key(&pairs);
            if seen.insert(key, ()).is_some() {
                continue;
            }
        }
        let mut out_row = Row::project(pairs);
        out_row.meta.expr_cache = cache;
        out_rows.push(out_row);
    }

    let columns = columns.unwrap_or_else(|| items.iter().filter(|i| !i.is_star).map(|i| i.alias.clone()).collect());
    Ok(ProjectionOutcome { rows: out_rows, columns })
}

fn dedup_key(pairs: &[(String, Value)]) -> String {
    pairs.iter().map(|(_, v)| value_key(v).0).collect::<Vec<_>>().join("\u{1}")
}

/// True if `expr` contains an aggregate function call anywhere in its tree
/// (nested aggregates, e.g. `count(n) + 1`, are supported; nesting one
/// aggregate inside another is not valid Cypher and is not special-cased).
fn contains_aggregate(expr: &Expr) -> bool {
    match expr {
        Expr::Null | Expr::Bool(_) | Expr::Int(_) | Expr::Float(_) | Expr::String(_) | Expr::Parameter(_) | Expr::Variable(_) => false,
        Expr::Property { target, .. } => contains_aggregate(target),
        Expr::Index { target, index } => contains_aggregate(target) || contains_aggregate(index),
        Expr::Slice { target, lo, hi } => {
            contains_aggregate(target)
                || lo.as_deref().is_some_and(contains_aggregate)
                || hi.as_deref().is_some_and(contains_aggregate)
        }
        Expr::Not(inner) | Expr::Negate(inner) => contains_aggregate(inner),
        Expr::Logic { left, right, .. } | Expr::Arith { left, right, .. } | Expr::StringPredicate { left, right, .. } => {
            contains_aggregate(left) || contains_aggregate(right)
        }
        Expr::Comparison(pairs, last) => pairs.iter().any(|(e, _)| contains_aggregate(e)) || contains_aggregate(last),
        Expr::IsNull { operand, .. } => contains_aggregate(operand),
        Expr::In { item, list } => contains_aggregate(item) || contains_aggregate(list),
        Expr::LabelCheck { target, .. } => contains_aggregate(target),
        Expr::PatternPredicate(_) => false,
        Expr::List(items) => items.iter().any(contains_aggregate),
        Expr::ListComprehension { list, where_expr, map_expr, .. } => {
            contains_aggregate(list) || where_expr.as_deref().is_some_and(contains_aggregate) || map_expr.as_deref().is_some_and(contains_aggregate)
        }
        Expr::PatternComprehension { where_expr, map_expr, .. } => where_expr.as_deref().is_some_and(contains_aggregate) || contains_aggregate(map_expr),
        Expr::Map(entries) => entries.iter().any(|(_, v)| contains_aggregate(v)),
        Expr::Case { operand, whens, else_expr } => {
            operand.as_deref().is_some_and(contains_aggregate)
                || whens.iter().any(|(w, t)| contains_aggregate(w) || contains_aggregate(t))
                || else_expr.as_deref().is_some_and(contains_aggregate)
        }
        Expr::ExistsSubquery(_) => false,
        Expr::FunctionCall { name, args, .. } => is_aggregate_name(name) || args.iter().any(contains_aggregate),
        Expr::Quantifier { list, predicate, .. } => contains_aggregate(list) || contains_aggregate(predicate),
    }
}

fn project_grouped(
    items: &[ProjectionItem],
    distinct: bool,
    input_rows: Vec<Row>,
    graph: &Graph,
    params: &BTreeMap<String, Value>,
) -> Result<ProjectionOutcome> {
    // Grouping key = every item that does NOT itself contain an aggregate,
    // evaluated per row (spec §4.6: "an implicit GROUP BY over the
    // non-aggregate projection expressions").
    let key_items: Vec<&ProjectionItem> = items.iter().filter(|i| !contains_aggregate(&i.expr.expr)).collect();

    struct Group {
        key_values: Vec<Value>,
        rows: Vec<Row>,
    }

    let mut order: Vec<String> = Vec::new();
    let mut groups: HashMap<String, Group> = HashMap::new();

    if input_rows.is_empty() {
        if key_items.is_empty() {
            groups.insert(String::new(), Group { key_values: Vec::new(), rows: Vec::new() });
            order.push(String::new());
        }
    } else {
        for row in input_rows {
            let key_values = key_items
                .iter()
                .map(|i| eval::evaluate(&i.expr.expr, &row, graph, params))
                .collect::<Result<Vec<_>>>()?;
            let key = key_values.iter().map(|v| value_key(v).0).collect::<Vec<_>>().join("\u{1}");
            groups
                .entry(key.clone())
                .or_insert_with(|| {
                    order.push(key.clone());
                    Group { key_values: key_values.clone(), rows: Vec::new() }
                })
                .rows
                .push(row);
        }
    }

    let mut out_rows = Vec::with_capacity(order.len());
    let mut columns = None;
    let mut seen = if distinct { Some(HashMap::<String, ()>::new()) } else { None };

    for key in &order {
        let group = &groups[key];
        let mut pairs = Vec::new();
        let mut cache = HashMap::new();
        let mut key_idx = 0;
        for item in items {
            let value = if contains_aggregate(&item.expr.expr) {
                eval_with_aggregates(&item.expr.expr, &group.rows, graph, params)?
            } else {
                let v = group.key_values[key_idx].clone();
                key_idx += 1;
                v
            };
            cache.insert(item.expr.text.clone(), value.clone());
            pairs.push((item.alias.clone(), value));
        }
        if columns.is_none() {
            columns = Some(pairs.iter().map(|(k, _)| k.clone()).collect());
        }
        if let Some(seen) = &mut seen {
            let dedup = dedup_key(&pairs);
            if seen.insert(dedup, ()).is_some() {
                continue;
            }
        }
        let mut out_row = Row::project(pairs);
        out_row.meta.expr_cache = cache;
        out_rows.push(out_row);
    }

    let columns = columns.unwrap_or_else(|| items.iter().map(|i| i.alias.clone()).collect());
    Ok(ProjectionOutcome { rows: out_rows, columns })
}

/// Evaluates `expr` over a group of rows, resolving every aggregate call it
/// contains against the whole group and every other subexpression against
/// the group's first row (the implicit grouping key is assumed constant
/// across the group, matching valid Cypher usage).
fn eval_with_aggregates(expr: &Expr, rows: &[Row], graph: &Graph, params: &BTreeMap<String, Value>) -> Result<Value> {
    if let Expr::FunctionCall { name, args, distinct } = expr {
        if is_aggregate_name(name) {
            return eval_aggregate(name, args, *distinct, rows, graph, params);
        }
    }
    if !contains_aggregate(expr) {
        let representative = rows.first().cloned().unwrap_or_default();
        return eval::evaluate(expr, &representative, graph, params);
    }
    // Recurse structurally, substituting resolved aggregate values.
    match expr {
        Expr::Not(inner) => {
            let v = eval_with_aggregates(inner, rows, graph, params)?;
            eval::apply_not(&v)
        }
        Expr::Negate(inner) => {
            let v = eval_with_aggregates(inner, rows, graph, params)?;
            eval::apply_negate(&v)
        }
        Expr::Arith { op, left, right } => {
            let l = eval_with_aggregates(left, rows, graph, params)?;
            let r = eval_with_aggregates(right, rows, graph, params)?;
            eval::apply_arith(*op, &l, &r)
        }
        Expr::List(items) => {
            let values = items
                .iter()
                .map(|e| eval_with_aggregates(e, rows, graph, params))
                .collect::<Result<Vec<_>>>()?;
            Ok(Value::List(values))
        }
        Expr::FunctionCall { name, args, distinct } => {
            let values = args
                .iter()
                .map(|a| eval_with_aggregates(a, rows, graph, params))
                .collect::<Result<Vec<_>>>()?;
            let _ = distinct;
            crate::expr::functions::call(name, values, graph)
        }
        _ => {
            let representative = rows.first().cloned().unwrap_or_default();
            eval::evaluate(expr, &representative, graph, params)
        }
    }
}

fn eval_aggregate(
    name: &str,
    args: &[Expr],
    distinct: bool,
    rows: &[Row],
    graph: &Graph,
    params: &BTreeMap<String, Value>,
) -> Result<Value> {
    let lower = name.to_lowercase();
    if args.is_empty() {
        return Err(Error::other(format!("{name} expects 1 argument(s)")));
    }
    if lower == "count" && args.len() == 1 && is_count_star(&args[0]) {
        return Ok(Value::Int(rows.len() as i64));
    }
    let mut values = Vec::with_capacity(rows.len());
    for row in rows {
        let v = eval_with_aggregates(&args[0], std::slice::from_ref(row), graph, params)?;
        values.push(v);
    }
    if distinct {
        let mut seen = std::collections::HashSet::new();
        values.retain(|v| seen.insert(value_key(v).0));
    }
    match lower.as_str() {
        "count" => Ok(Value::Int(values.iter().filter(|v| !v.is_null()).count() as i64)),
        "collect" => Ok(Value::List(values.into_iter().filter(|v| !v.is_null()).collect())),
        "sum" => aggregate_sum(&values),
        "avg" => aggregate_avg(&values),
        "min" => aggregate_extreme(&values, true),
        "max" => aggregate_extreme(&values, false),
        "percentiledisc" => aggregate_percentile(&values, percentile_arg(args, rows, graph, params)?, false),
        "percentilecont" => aggregate_percentile(&values, percentile_arg(args, rows, graph, params)?, true),
        _ => Err(Error::other(format!("Unsupported aggregate function: {name}"))),
    }
}

fn is_count_star(expr: &Expr) -> bool {
    matches!(expr, Expr::FunctionCall { name, .. } if name == "*")
}

fn percentile_arg(args: &[Expr], rows: &[Row], graph: &Graph, params: &BTreeMap<String, Value>) -> Result<f64> {
    let Some(second) = args.get(1) else {
        return Err(Error::other("percentile functions expect a percentile argument"));
    };
    let representative = rows.first().cloned().unwrap_or_default();
    let value = eval::evaluate(second, &representative, graph, params)?;
    value.as_f64().ok_or_else(|| Error::other("percentile argument must be numeric"))
}

fn aggregate_sum(values: &[Value]) -> Result<Value> {
    let mut int_total = 0i64;
    let mut float_total = 0.0f64;
    let mut is_float = false;
    for v in values {
        match v {
            Value::Null => continue,
            Value::Int(i) => int_total += i,
            Value::Float(f) => {
                is_float = true;
                float_total += f;
            }
            _ => return Err(Error::other("sum() expects numeric values")),
        }
    }
    if is_float {
        Ok(Value::Float(float_total + int_total as f64))
    } else {
        Ok(Value::Int(int_total))
    }
}

fn aggregate_avg(values: &[Value]) -> Result<Value> {
    let mut total = 0.0f64;
    let mut count = 0usize;
    for v in values {
        match v {
            Value::Null => continue,
            Value::Int(i) => {
                total += *i as f64;
                count += 1;
            }
            Value::Float(f) => {
                total += f;
                count += 1;
            }
            _ => return Err(Error::other("avg() expects numeric values")),
        }
    }
    if count == 0 {
        Ok(Value::Null)
    } else {
        Ok(Value::Float(total / count as f64))
    }
}

fn aggregate_extreme(values: &[Value], want_min: bool) -> Result<Value> {
    let mut best: Option<&Value> = None;
    for v in values {
        if v.is_null() {
            continue;
        }
        best = match best {
            None => Some(v),
            Some(current) => {
                let ord = crate::comparator::order_cmp(v, current);
                let replace = if want_min { ord.is_lt() } else { ord.is_gt() };
                if replace {
                    Some(v)
                } else {
                    Some(current)
                }
            }
        };
    }
    Ok(best.cloned().unwrap_or(Value::Null))
}

fn aggregate_percentile(values: &[Value], percentile: f64, continuous: bool) -> Result<Value> {
    let mut nums: Vec<f64> = values.iter().filter_map(Value::as_f64).collect();
    if nums.is_empty() {
        return Ok(Value::Null);
    }
    nums.sort_by(|a, b| a.partial_cmp(b).unwrap());
    let n = nums.len();
    if !(0.0..=1.0).contains(&percentile) {
        return Err(Error::other("percentile argument must be between 0.0 and 1.0"));
    }
    if continuous {
        let rank = percentile * (n as f64 - 1.0);
        let lo = rank.floor() as usize;
        let hi = rank.ceil() as usize;
        if lo == hi {
            Ok(Value::Float(nums[lo]))
        } else {
            let frac = rank - lo as f64;
            Ok(Value::Float(nums[lo] + (nums[hi] - nums[lo]) * frac))
        }
    } else {
        let idx = ((percentile * n as f64).ceil() as usize).saturating_sub(1).min(n - 1);
        Ok(Value::Float(nums[idx]))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::ProjectionItem;
    use crate::expr::parse::parse_spanned;

    fn item(text: &str, alias: &str) -> ProjectionItem {
        ProjectionItem { expr: parse_spanned(text, 0).unwrap(), alias: alias.to_string(), is_star: false }
    }

    #[test]
    fn plain_projection_renames_columns() {
        let graph = Graph::new();
        let params = BTreeMap::new();
        let mut row = Row::empty();
        row.set("n", Value::Int(1));
        let items = vec![item("n", "value")];
        let outcome = project(&items, false, vec![row], &graph, &params).unwrap();
        assert_eq!(outcome.columns, vec!["value".to_string()]);
        assert_eq!(outcome.rows[0].get("value"), Some(&Value::Int(1)));
    }

    #[test]
    fn distinct_dedups_identical_rows() {
        let graph = Graph::new();
        let params = BTreeMap::new();
        let mut a = Row::empty();
        a.set("n", Value::Int(1));
        let mut b = Row::empty();
        b.set("n", Value::Int(1));
        let items = vec![item("n", "n")];
        let outcome = project(&items, true, vec![a, b], &graph, &params).unwrap();
        assert_eq!(outcome.rows.len(), 1);
    }

    #[test]
    fn count_aggregates_over_all_rows() {
        let graph = Graph::new();
        let params = BTreeMap::new();
        let mut rows = Vec::new();
        for i in 0..3 {
            let mut row = Row::empty();
            row.set("n", Value::Int(i));
            rows.push(row);
        }
        let items = vec![item("count(n)", "c")];
        let outcome = project(&items, false, rows, &graph, &params).unwrap();
        assert_eq!(outcome.rows.len(), 1);
        assert_eq!(outcome.rows[0].get("c"), Some(&Value::Int(3)));
    }

    #[test]
    fn count_with_empty_input_and_no_grouping_key_yields_zero() {
        let graph = Graph::new();
        let params = BTreeMap::new();
        let items = vec![item("count(n)", "c")];
        let outcome = project(&items, false, Vec::new(), &graph, &params).unwrap();
        assert_eq!(outcome.rows.len(), 1);
        assert_eq!(outcome.rows[0].get("c"), Some(&Value::Int(0)));
    }
}
