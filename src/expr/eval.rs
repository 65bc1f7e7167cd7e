//! Expression evaluator (spec §4.7): walks the typed `Expr` tree built by
//! `parse.rs`, implementing three-valued logic, arithmetic widening, the
//! comparator-backed operators, and function-call dispatch.

use std::collections::BTreeMap;

use crate::comparator::{order_cmp, partial_cmp_for_operator};
use crate::error::{Error, Result};
use crate::row::Row;
use crate::store::Graph;
use crate::value::Value;

use super::{ArithOp, CompareOp, Expr, LogicOp, Param, QuantifierKind, StringPredOp};

pub fn evaluate(expr: &Expr, row: &Row, graph: &Graph, params: &BTreeMap<String, Value>) -> Result<Value> {
    match expr {
        Expr::Null => Ok(Value::Null),
        Expr::Bool(b) => Ok(Value::Bool(*b)),
        Expr::Int(i) => Ok(Value::Int(*i)),
        Expr::Float(f) => Ok(Value::Float(*f)),
        Expr::String(s) => Ok(Value::String(s.clone())),
        Expr::Parameter(p) => eval_parameter(p, params),
        Expr::Variable(name) => Ok(row.get(name).cloned().unwrap_or(Value::Null)),
        Expr::Property { target, name } => {
            let target = evaluate(target, row, graph, params)?;
            Ok(eval_property(&target, name))
        }
        Expr::Index { target, index } => {
            let target = evaluate(target, row, graph, params)?;
            let index = evaluate(index, row, graph, params)?;
            eval_index(&target, &index)
        }
        Expr::Slice { target, lo, hi } => {
            let target = evaluate(target, row, graph, params)?;
            let lo = lo.as_ref().map(|e| evaluate(e, row, graph, params)).transpose()?;
            let hi = hi.as_ref().map(|e| evaluate(e, row, graph, params)).transpose()?;
            eval_slice(&target, lo.as_ref(), hi.as_ref())
        }
        Expr::Not(inner) => {
            let v = evaluate(inner, row, graph, params)?;
            Ok(bool_to_value(not3(value_to_bool3(&v)?)))
        }
        Expr::Negate(inner) => {
            let v = evaluate(inner, row, graph, params)?;
            eval_negate(&v)
        }
        Expr::Logic { op, left, right } => eval_logic(*op, left, right, row, graph, params),
        Expr::Arith { op, left, right } => {
            let l = evaluate(left, row, graph, params)?;
            let r = evaluate(right, row, graph, params)?;
            eval_arith(*op, &l, &r)
        }
        Expr::Comparison(pairs, last) => eval_comparison(pairs, last, row, graph, params),
        Expr::StringPredicate { op, left, right } => {
            let l = evaluate(left, row, graph, params)?;
            let r = evaluate(right, row, graph, params)?;
            Ok(eval_string_predicate(*op, &l, &r))
        }
        Expr::IsNull { operand, negated } => {
            let v = evaluate(operand, row, graph, params)?;
            Ok(Value::Bool(v.is_null() != *negated))
        }
        Expr::In { item, list } => {
            let item = evaluate(item, row, graph, params)?;
            let list = evaluate(list, row, graph, params)?;
            eval_in(&item, &list)
        }
        Expr::LabelCheck { target, labels } => {
            let target = evaluate(target, row, graph, params)?;
            Ok(eval_label_check(&target, labels))
        }
        Expr::PatternPredicate(chain) => {
            let matches = crate::pattern::match_pattern(chain, graph, row, params)?;
            Ok(Value::Bool(!matches.is_empty()))
        }
        Expr::List(items) => {
            let values = items
                .iter()
                .map(|e| evaluate(e, row, graph, params))
                .collect::<Result<Vec<_>>>()?;
            Ok(Value::List(values))
        }
        Expr::ListComprehension { variable, list, where_expr, map_expr } => {
            eval_list_comprehension(variable, list, where_expr.as_deref(), map_expr.as_deref(), row, graph, params)
        }
        Expr::PatternComprehension { pattern, where_expr, map_expr } => {
            eval_pattern_comprehension(pattern, where_expr.as_deref(), map_expr, row, graph, params)
        }
        Expr::Map(entries) => {
            let mut out = BTreeMap::new();
            for (k, v) in entries {
                out.insert(k.clone(), evaluate(v, row, graph, params)?);
            }
            Ok(Value::Map(out))
        }
        Expr::Case { operand, whens, else_expr } => eval_case(operand.as_deref(), whens, else_expr.as_deref(), row, graph, params),
        Expr::ExistsSubquery(query) => {
            let has_rows = crate::executor::run_subquery_has_rows(graph, query, row, params)?;
            Ok(Value::Bool(has_rows))
        }
        Expr::FunctionCall { name, args, distinct } => eval_function_call(name, args, *distinct, row, graph, params),
        Expr::Quantifier { kind, variable, list, predicate } => eval_quantifier(*kind, variable, list, predicate, row, graph, params),
    }
}

fn eval_parameter(param: &Param, params: &BTreeMap<String, Value>) -> Result<Value> {
    let key = match param {
        Param::Name(name) => name.clone(),
        Param::Index(i) => i.to_string(),
    };
    params
        .get(&key)
        .cloned()
        .ok_or_else(|| Error::other(format!("Missing parameter: {key}")))
}

fn eval_property(target: &Value, name: &str) -> Value {
    match target {
        Value::Null => Value::Null,
        Value::Node(n) => n.properties.get(name).cloned().unwrap_or(Value::Null),
        Value::Relationship(r) => r.properties.get(name).cloned().unwrap_or(Value::Null),
        Value::Map(m) => m.get(name).cloned().unwrap_or(Value::Null),
        Value::Temporal(t) => temporal_component(t, name),
        _ => Value::Null,
    }
}

fn temporal_component(t: &crate::temporal::TemporalValue, name: &str) -> Value {
    use crate::temporal::TemporalValue::*;
    let i = |v: i64| Value::Int(v);
    match (t, name) {
        (Date(d), "year") => i(d.year as i64),
        (Date(d), "month") => i(d.month as i64),
        (Date(d), "day") => i(d.day as i64),
        (Date(d), "quarter") => i(d.quarter() as i64),
        (Date(d), "ordinalDay") => i(d.ordinal_day() as i64),
        (Date(d), "weekDay") => i(d.week_day() as i64),
        (Date(d), "dayOfQuarter") => i(d.day_of_quarter() as i64),
        (Date(d), "week") => i(d.week() as i64),
        (Date(d), "weekYear") => i(d.week_year() as i64),
        (LocalTime(t), "hour") | (Time(crate::temporal::TimeValue { time: t, .. }), "hour") => i(t.hour as i64),
        (LocalTime(t), "minute") | (Time(crate::temporal::TimeValue { time: t, .. }), "minute") => i(t.minute as i64),
        (LocalTime(t), "second") | (Time(crate::temporal::TimeValue { time: t, .. }), "second") => i(t.second as i64),
        (LocalTime(t), "nanosecond") | (Time(crate::temporal::TimeValue { time: t, .. }), "nanosecond") => i(t.nanosecond as i64),
        (LocalTime(t), "millisecond") | (Time(crate::temporal::TimeValue { time: t, .. }), "millisecond") => i(t.millisecond() as i64),
        (LocalTime(t), "microsecond") | (Time(crate::temporal::TimeValue { time: t, .. }), "microsecond") => i(t.microsecond() as i64),
        (Time(tv), "offsetMinutes") => i(tv.offset_minutes as i64),
        (LocalDateTime(dt), "year") => i(dt.date.year as i64),
        (LocalDateTime(dt), "month") => i(dt.date.month as i64),
        (LocalDateTime(dt), "day") => i(dt.date.day as i64),
        (LocalDateTime(dt), "hour") => i(dt.time.hour as i64),
        (LocalDateTime(dt), "minute") => i(dt.time.minute as i64),
        (LocalDateTime(dt), "second") => i(dt.time.second as i64),
        (LocalDateTime(dt), "nanosecond") => i(dt.time.nanosecond as i64),
        (DateTime(dt), "year") => i(dt.local.date.year as i64),
        (DateTime(dt), "month") => i(dt.local.date.month as i64),
        (DateTime(dt), "day") => i(dt.local.date.day as i64),
        (DateTime(dt), "hour") => i(dt.local.time.hour as i64),
        (DateTime(dt), "minute") => i(dt.local.time.minute as i64),
        (DateTime(dt), "second") => i(dt.local.time.second as i64),
        (DateTime(dt), "offsetMinutes") => i(dt.offset_minutes as i64),
        (DateTime(dt), "epochSeconds") => i(dt.epoch_seconds()),
        (DateTime(dt), "epochMillis") => i(dt.epoch_millis()),
        (Duration(d), "years") => i(d.years()),
        (Duration(d), "quarters") => i(d.quarters()),
        (Duration(d), "months") => i(d.months),
        (Duration(d), "weeks") => i(d.weeks()),
        (Duration(d), "days") => i(d.days),
        (Duration(d), "hours") => i(d.hours()),
        (Duration(d), "minutes") => i(d.minutes()),
        (Duration(d), "seconds") => i(d.seconds),
        (Duration(d), "nanoseconds") => i(d.nanoseconds as i64),
        _ => Value::Null,
    }
}

fn eval_index(target: &Value, index: &Value) -> Result<Value> {
    match (target, index) {
        (Value::Null, _) | (_, Value::Null) => Ok(Value::Null),
        (Value::List(items), Value::Int(i)) => {
            let len = items.len() as i64;
            let idx = if *i < 0 { i + len } else { *i };
            if idx < 0 || idx >= len {
                Ok(Value::Null)
            } else {
                Ok(items[idx as usize].clone())
            }
        }
        (Value::Map(m), Value::String(k)) => Ok(m.get(k).cloned().unwrap_or(Value::Null)),
        _ => Err(Error::other("Invalid index operation")),
    }
}

fn eval_slice(target: &Value, lo: Option<&Value>, hi: Option<&Value>) -> Result<Value> {
    let Value::List(items) = target else {
        if target.is_null() {
            return Ok(Value::Null);
        }
        return Err(Error::other("Slice target must be a list"));
    };
    let len = items.len() as i64;
    let resolve = |v: Option<&Value>, default: i64| -> i64 {
        match v {
            Some(Value::Int(i)) => {
                let idx = if *i < 0 { i + len } else { *i };
                idx.clamp(0, len)
            }
            _ => default,
        }
    };
    let lo = resolve(lo, 0);
    let hi = resolve(hi, len);
    if lo >= hi {
        return Ok(Value::List(Vec::new()));
    }
    Ok(Value::List(items[lo as usize..hi as usize].to_vec()))
}

fn eval_negate(v: &Value) -> Result<Value> {
    match v {
        Value::Null => Ok(Value::Null),
        Value::Int(i) => Ok(Value::Int(-i)),
        Value::Float(f) => Ok(Value::Float(-f)),
        _ => Err(Error::other("Unary minus expects a numeric operand")),
    }
}

fn value_to_bool3(v: &Value) -> Result<Option<bool>> {
    match v {
        Value::Null => Ok(None),
        Value::Bool(b) => Ok(Some(*b)),
        _ => Err(Error::other("Expression must evaluate to a boolean or null")),
    }
}

fn bool_to_value(b: Option<bool>) -> Value {
    match b {
        Some(b) => Value::Bool(b),
        None => Value::Null,
    }
}

fn not3(b: Option<bool>) -> Option<bool> {
    b.map(|x| !x)
}

fn and3(a: Option<bool>, b: Option<bool>) -> Option<bool> {
    match (a, b) {
        (Some(false), _) | (_, Some(false)) => Some(false),
        (Some(true), Some(true)) => Some(true),
        _ => None,
    }
}

fn or3(a: Option<bool>, b: Option<bool>) -> Option<bool> {
    match (a, b) {
        (Some(true), _) | (_, Some(true)) => Some(true),
        (Some(false), Some(false)) => Some(false),
        _ => None,
    }
}

fn xor3(a: Option<bool>, b: Option<bool>) -> Option<bool> {
    match (a, b) {
        (Some(a), Some(b)) => Some(a ^ b),
        _ => None,
    }
}

fn eval_logic(op: LogicOp, left: &Expr, right: &Expr, row: &Row, graph: &Graph, params: &BTreeMap<String, Value>) -> Result<Value> {
    let l = value_to_bool3(&evaluate(left, row, graph, params)?)?;
    let r = value_to_bool3(&evaluate(right, row, graph, params)?)?;
    let result = match op {
        LogicOp::And => and3(l, r),
        LogicOp::Or => or3(l, r),
        LogicOp::Xor => xor3(l, r),
    };
    Ok(bool_to_value(result))
}

/// Arithmetic widening (spec §4.7): `int op int` stays int when the result
/// fits, otherwise widens to float; division always produces float; `+`
/// also concatenates strings and lists.
fn eval_arith(op: ArithOp, l: &Value, r: &Value) -> Result<Value> {
    if l.is_null() || r.is_null() {
        return Ok(Value::Null);
    }
    if op == ArithOp::Add {
        match (l, r) {
            (Value::String(_), Value::String(_) | Value::Int(_) | Value::Float(_))
            | (Value::Int(_) | Value::Float(_), Value::String(_)) => {
                return Ok(Value::String(format!("{l}{r}")));
            }
            _ => {}
        }
        if let (Value::List(a), Value::List(b)) = (l, r) {
            let mut out = a.clone();
            out.extend(b.clone());
            return Ok(Value::List(out));
        }
        if let Value::List(a) = l {
            let mut out = a.clone();
            out.push(r.clone());
            return Ok(Value::List(out));
        }
        if let Value::List(b) = r {
            let mut out = vec![l.clone()];
            out.extend(b.clone());
            return Ok(Value::List(out));
        }
    }
    if !l.is_numeric() || !r.is_numeric() {
        return Err(Error::other("Operator + expects numeric, list, or string operands"));
    }
    match (l, r) {
        (Value::Int(a), Value::Int(b)) => eval_int_arith(op, *a, *b),
        _ => {
            let a = l.as_f64().unwrap();
            let b = r.as_f64().unwrap();
            eval_float_arith(op, a, b)
        }
    }
}

fn eval_int_arith(op: ArithOp, a: i64, b: i64) -> Result<Value> {
    match op {
        ArithOp::Add => match a.checked_add(b) {
            Some(v) => Ok(Value::Int(v)),
            None => eval_float_arith(op, a as f64, b as f64),
        },
        ArithOp::Subtract => match a.checked_sub(b) {
            Some(v) => Ok(Value::Int(v)),
            None => eval_float_arith(op, a as f64, b as f64),
        },
        ArithOp::Multiply => match a.checked_mul(b) {
            Some(v) => Ok(Value::Int(v)),
            None => eval_float_arith(op, a as f64, b as f64),
        },
        ArithOp::Divide => {
            if b == 0 {
                return Err(Error::other("Division by zero"));
            }
            Ok(Value::Float(a as f64 / b as f64))
        }
        ArithOp::Modulo => {
            if b == 0 {
                return Err(Error::other("Modulo by zero"));
            }
            Ok(Value::Int(a % b))
        }
        ArithOp::Power => {
            if b >= 0 && b <= u32::MAX as i64 {
                match a.checked_pow(b as u32) {
                    Some(v) => Ok(Value::Int(v)),
                    None => Ok(Value::Float((a as f64).powf(b as f64))),
                }
            } else {
                Ok(Value::Float((a as f64).powf(b as f64)))
            }
        }
    }
}

fn eval_float_arith(op: ArithOp, a: f64, b: f64) -> Result<Value> {
    match op {
        ArithOp::Add => Ok(Value::Float(a + b)),
        ArithOp::Subtract => Ok(Value::Float(a - b)),
        ArithOp::Multiply => Ok(Value::Float(a * b)),
        ArithOp::Divide => Ok(Value::Float(a / b)),
        ArithOp::Modulo => Ok(Value::Float(a % b)),
        ArithOp::Power => Ok(Value::Float(a.powf(b))),
    }
}

fn eval_comparison(
    pairs: &[(Expr, CompareOp)],
    last: &Expr,
    row: &Row,
    graph: &Graph,
    params: &BTreeMap<String, Value>,
) -> Result<Value> {
    let mut operands = Vec::with_capacity(pairs.len() + 1);
    for (e, _) in pairs {
        operands.push(evaluate(e, row, graph, params)?);
    }
    operands.push(evaluate(last, row, graph, params)?);

    let mut result: Option<bool> = Some(true);
    for (i, (_, op)) in pairs.iter().enumerate() {
        let pair_result = compare_pair(*op, &operands[i], &operands[i + 1]);
        result = and3(result, pair_result);
    }
    Ok(bool_to_value(result))
}

fn compare_pair(op: CompareOp, a: &Value, b: &Value) -> Option<bool> {
    if op == CompareOp::Eq || op == CompareOp::Ne {
        if a.is_null() || b.is_null() {
            return None;
        }
        let eq = a == b;
        return Some(if op == CompareOp::Eq { eq } else { !eq });
    }
    let ord = partial_cmp_for_operator(a, b)?;
    Some(match op {
        CompareOp::Lt => ord.is_lt(),
        CompareOp::Le => ord.is_le(),
        CompareOp::Gt => ord.is_gt(),
        CompareOp::Ge => ord.is_ge(),
        CompareOp::Eq | CompareOp::Ne => unreachable!(),
    })
}

fn eval_string_predicate(op: StringPredOp, l: &Value, r: &Value) -> Value {
    let (Value::String(a), Value::String(b)) = (l, r) else {
        return Value::Null;
    };
    let result = match op {
        StringPredOp::StartsWith => a.starts_with(b.as_str()),
        StringPredOp::EndsWith => a.ends_with(b.as_str()),
        StringPredOp::Contains => a.contains(b.as_str()),
    };
    Value::Bool(result)
}

fn eval_in(item: &Value, list: &Value) -> Result<Value> {
    if item.is_null() {
        return Ok(Value::Null);
    }
    let Value::List(items) = list else {
        if list.is_null() {
            return Ok(Value::Null);
        }
        return Err(Error::other("IN expects a list operand"));
    };
    let mut saw_null = false;
    for candidate in items {
        if candidate.is_null() {
            saw_null = true;
            continue;
        }
        if candidate == item {
            return Ok(Value::Bool(true));
        }
    }
    Ok(if saw_null { Value::Null } else { Value::Bool(false) })
}

fn eval_label_check(target: &Value, labels: &[String]) -> Value {
    match target {
        Value::Null => Value::Null,
        Value::Node(n) => Value::Bool(labels.iter().all(|l| n.labels.contains(l))),
        Value::Relationship(r) => Value::Bool(labels.len() == 1 && labels[0] == r.rel_type),
        _ => Value::Null,
    }
}

fn eval_list_comprehension(
    variable: &str,
    list: &Expr,
    where_expr: Option<&Expr>,
    map_expr: Option<&Expr>,
    row: &Row,
    graph: &Graph,
    params: &BTreeMap<String, Value>,
) -> Result<Value> {
    let list = evaluate(list, row, graph, params)?;
    let Value::List(items) = list else {
        if list.is_null() {
            return Ok(Value::Null);
        }
        return Err(Error::other("List comprehension expects a list"));
    };
    let mut out = Vec::new();
    for item in items {
        let scoped = row.with(variable, item.clone());
        if let Some(pred) = where_expr {
            let keep = evaluate(pred, &scoped, graph, params)?;
            if value_to_bool3(&keep)? != Some(true) {
                continue;
            }
        }
        match map_expr {
            Some(m) => out.push(evaluate(m, &scoped, graph, params)?),
            None => out.push(item),
        }
    }
    Ok(Value::List(out))
}

fn eval_pattern_comprehension(
    pattern: &crate::pattern::PatternChain,
    where_expr: Option<&Expr>,
    map_expr: &Expr,
    row: &Row,
    graph: &Graph,
    params: &BTreeMap<String, Value>,
) -> Result<Value> {
    let matches = crate::pattern::match_pattern(pattern, graph, row, params)?;
    let mut out = Vec::new();
    for m in matches {
        let mut scoped = row.clone();
        for (name, value) in &m.bindings {
            scoped.set(name.clone(), value.clone());
        }
        if let Some(pred) = where_expr {
            let keep = evaluate(pred, &scoped, graph, params)?;
            if value_to_bool3(&keep)? != Some(true) {
                continue;
            }
        }
        out.push(evaluate(map_expr, &scoped, graph, params)?);
    }
    Ok(Value::List(out))
}

fn eval_case(
    operand: Option<&Expr>,
    whens: &[(Expr, Expr)],
    else_expr: Option<&Expr>,
    row: &Row,
    graph: &Graph,
    params: &BTreeMap<String, Value>,
) -> Result<Value> {
    let subject = operand.map(|e| evaluate(e, row, graph, params)).transpose()?;
    for (when, then) in whens {
        let when_value = evaluate(when, row, graph, params)?;
        let matched = match &subject {
            Some(subject) => subject == &when_value,
            None => value_to_bool3(&when_value)? == Some(true),
        };
        if matched {
            return evaluate(then, row, graph, params);
        }
    }
    match else_expr {
        Some(e) => evaluate(e, row, graph, params),
        None => Ok(Value::Null),
    }
}

fn eval_quantifier(
    kind: QuantifierKind,
    variable: &str,
    list: &Expr,
    predicate: &Expr,
    row: &Row,
    graph: &Graph,
    params: &BTreeMap<String, Value>,
) -> Result<Value> {
    let list = evaluate(list, row, graph, params)?;
    let Value::List(items) = list else {
        if list.is_null() {
            return Ok(Value::Null);
        }
        return Err(Error::other("Quantifier expression expects a list"));
    };
    let mut true_count = 0usize;
    let mut saw_null = false;
    for item in &items {
        let scoped = row.with(variable, item.clone());
        let v = value_to_bool3(&evaluate(predicate, &scoped, graph, params)?)?;
        match v {
            Some(true) => true_count += 1,
            Some(false) => {}
            None => saw_null = true,
        }
    }
    let n = items.len();
    let result = match kind {
        QuantifierKind::Any => true_count > 0,
        QuantifierKind::All => true_count == n && !saw_null,
        QuantifierKind::None => true_count == 0 && !saw_null,
        QuantifierKind::Single => true_count == 1,
    };
    Ok(Value::Bool(result))
}

fn eval_function_call(
    name: &str,
    args: &[Expr],
    distinct: bool,
    row: &Row,
    graph: &Graph,
    params: &BTreeMap<String, Value>,
) -> Result<Value> {
    let _ = distinct;
    if crate::expr::functions::is_aggregate_name(name) {
        return Err(Error::other(format!(
            "aggregate function \"{name}\" may only appear in a WITH/RETURN projection"
        )));
    }
    let values = args
        .iter()
        .map(|a| evaluate(a, row, graph, params))
        .collect::<Result<Vec<_>>>()?;
    crate::expr::functions::call(name, values, graph)
}

pub fn order_value(a: &Value, b: &Value) -> std::cmp::Ordering {
    order_cmp(a, b)
}

/// Exposes the arithmetic/unary-operator rules to `projection.rs`, which
/// resolves aggregate calls into plain values and then needs to apply the
/// surrounding arithmetic without re-entering a full expression tree.
pub(crate) fn apply_arith(op: ArithOp, l: &Value, r: &Value) -> Result<Value> {
    eval_arith(op, l, r)
}

pub(crate) fn apply_not(v: &Value) -> Result<Value> {
    Ok(bool_to_value(not3(value_to_bool3(v)?)))
}

pub(crate) fn apply_negate(v: &Value) -> Result<Value> {
    eval_negate(v)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expr::parse::parse_expression;

    fn eval_str(text: &str) -> Value {
        let expr = parse_expression(text).unwrap();
        let row = Row::empty();
        let graph = Graph::new();
        let params = BTreeMap::new();
        evaluate(&expr, &row, &graph, &params).unwrap()
    }

    #[test]
    fn three_valued_and() {
        assert_eq!(eval_str("null AND false"), Value::Bool(false));
        assert_eq!(eval_str("null OR true"), Value::Bool(true));
    }

    #[test]
    fn arithmetic_widens_on_overflow() {
        assert_eq!(eval_str("1 + 2"), Value::Int(3));
        assert_eq!(eval_str("5 / 2"), Value::Float(2.5));
    }

    #[test]
    fn string_concatenation() {
        assert_eq!(eval_str("'a' + 'b'"), Value::String("ab".to_string()));
    }

    #[test]
    fn in_short_circuits_to_null() {
        assert_eq!(eval_str("1 IN [2, null]"), Value::Null);
        assert_eq!(eval_str("1 IN [1, null]"), Value::Bool(true));
    }

    #[test]
    fn comparison_is_null_propagating() {
        assert_eq!(eval_str("null < 1"), Value::Null);
    }

    #[test]
    fn list_comprehension_filters_and_maps() {
        assert_eq!(eval_str("[x IN [1,2,3,4] WHERE x % 2 = 0 | x * 10]"), Value::List(vec![Value::Int(20), Value::Int(40)]));
    }
}
