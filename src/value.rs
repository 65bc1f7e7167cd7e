//! The dynamically-typed value flowing through the row stream (spec §3).

use std::collections::BTreeMap;
use std::fmt;

use crate::temporal::TemporalValue;

#[derive(Debug, Clone, serde::Serialize)]
pub struct NodeValue {
    pub id: u64,
    pub labels: Vec<String>,
    pub properties: BTreeMap<String, Value>,
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct RelationshipValue {
    pub id: u64,
    pub start: u64,
    pub end: u64,
    pub rel_type: String,
    pub properties: BTreeMap<String, Value>,
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct PathValue {
    pub nodes: Vec<NodeValue>,
    pub relationships: Vec<RelationshipValue>,
}

impl PathValue {
    pub fn length(&self) -> usize {
        self.relationships.len()
    }
}

/// The universal value type (spec §3). Equality follows the spec's rules
/// rather than a derived field-by-field comparison: nodes/relationships
/// compare by id only, paths by their id sequence.
#[derive(Debug, Clone, serde::Serialize)]
#[serde(tag = "kind", content = "value")]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
    List(Vec<Value>),
    Map(BTreeMap<String, Value>),
    Node(NodeValue),
    Relationship(RelationshipValue),
    Path(PathValue),
    Temporal(TemporalValue),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "boolean",
            Value::Int(_) => "integer",
            Value::Float(_) => "float",
            Value::String(_) => "string",
            Value::List(_) => "list",
            Value::Map(_) => "map",
            Value::Node(_) => "node",
            Value::Relationship(_) => "relationship",
            Value::Path(_) => "path",
            Value::Temporal(t) => t.kind_name(),
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Int(i) => Some(*i as f64),
            Value::Float(f) => Some(*f),
            _ => None,
        }
    }

    pub fn is_numeric(&self) -> bool {
        matches!(self, Value::Int(_) | Value::Float(_))
    }

    /// Rejects values that cannot be stored as a node/relationship property
    /// (spec §3: "property values cannot be a node, relationship, or path").
    pub fn is_valid_property_value(&self) -> bool {
        match self {
            Value::Node(_) | Value::Relationship(_) | Value::Path(_) => false,
            Value::List(items) => items.iter().all(Value::is_valid_property_value),
            Value::Map(entries) => entries.values().all(Value::is_valid_property_value),
            _ => true,
        }
    }
}

/// Structural equality per spec §3/§4.7 "Equality": nodes/relationships by
/// id, paths by id sequence, lists/maps structurally, everything else by
/// value. This is NOT the three-valued `=` operator (that lives in
/// `expr::eval` and must special-case `Null`); this impl treats `Null ==
/// Null` as `true` so it can back hashing/grouping/DISTINCT keys.
impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Float(a), Value::Float(b)) => a == b,
            (Value::Int(a), Value::Float(b)) | (Value::Float(b), Value::Int(a)) => *a as f64 == *b,
            (Value::String(a), Value::String(b)) => a == b,
            (Value::List(a), Value::List(b)) => a == b,
            (Value::Map(a), Value::Map(b)) => a == b,
            (Value::Node(a), Value::Node(b)) => a.id == b.id,
            (Value::Relationship(a), Value::Relationship(b)) => a.id == b.id,
            (Value::Path(a), Value::Path(b)) => {
                a.nodes.iter().map(|n| n.id).eq(b.nodes.iter().map(|n| n.id))
                    && a.relationships.iter().map(|r| r.id).eq(b.relationships.iter().map(|r| r.id))
            }
            (Value::Temporal(a), Value::Temporal(b)) => a == b,
            _ => false,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "null"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Int(i) => write!(f, "{i}"),
            Value::Float(v) => write!(f, "{v}"),
            Value::String(s) => write!(f, "{s}"),
            Value::List(items) => {
                write!(f, "[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{item}")?;
                }
                write!(f, "]")
            }
            Value::Map(entries) => {
                write!(f, "{{")?;
                for (i, (k, v)) in entries.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{k}: {v}")?;
                }
                write!(f, "}}")
            }
            Value::Node(n) => write!(f, "(id={})", n.id),
            Value::Relationship(r) => write!(f, "[id={}]", r.id),
            Value::Path(p) => write!(f, "<path len={}>", p.length()),
            Value::Temporal(t) => write!(f, "{t}"),
        }
    }
}

/// Canonical ordering / grouping key (spec §4.8): a fully-ordered,
/// hashable-by-construction projection of a [`Value`] used for DISTINCT,
/// UNION dedup, and GROUP BY keys. Built as a string so unlike types
/// collapse onto the comparator's "fall back to string form" rule.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct ValueKey(pub String);

pub fn value_key(value: &Value) -> ValueKey {
    ValueKey(canonical_key_string(value))
}

fn canonical_key_string(value: &Value) -> String {
    match value {
        Value::Null => "\u{0}null".to_string(),
        Value::Bool(b) => format!("\u{0}bool:{b}"),
        Value::Int(i) => format!("\u{0}num:{}", *i as f64),
        Value::Float(v) => format!("\u{0}num:{v}"),
        Value::String(s) => format!("\u{0}str:{s}"),
        Value::List(items) => {
            let parts: Vec<String> = items.iter().map(canonical_key_string).collect();
            format!("\u{0}list:[{}]", parts.join(","))
        }
        Value::Map(entries) => {
            let parts: Vec<String> = entries
                .iter()
                .map(|(k, v)| format!("{k}={}", canonical_key_string(v)))
                .collect();
            format!("\u{0}map:{{{}}}", parts.join(","))
        }
        Value::Node(n) => format!("\u{0}node:{}", n.id),
        Value::Relationship(r) => format!("\u{0}rel:{}", r.id),
        Value::Path(p) => {
            let nodes: Vec<String> = p.nodes.iter().map(|n| n.id.to_string()).collect();
            let rels: Vec<String> = p.relationships.iter().map(|r| r.id.to_string()).collect();
            format!("\u{0}path:{}/{}", nodes.join("-"), rels.join("-"))
        }
        Value::Temporal(t) => format!("\u{0}temporal:{}", t.canonical_key()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn int_and_float_equal_when_numerically_equal() {
        assert_eq!(Value::Int(2), Value::Float(2.0));
    }

    #[test]
    fn nodes_equal_by_id_only() {
        let mut props_a = BTreeMap::new();
        props_a.insert("x".to_string(), Value::Int(1));
        let a = Value::Node(NodeValue {
            id: 1,
            labels: vec!["A".to_string()],
            properties: props_a,
        });
        let b = Value::Node(NodeValue {
            id: 1,
            labels: vec!["B".to_string()],
            properties: BTreeMap::new(),
        });
        assert_eq!(a, b);
    }

    #[test]
    fn property_validity_rejects_nested_node() {
        let node = Value::Node(NodeValue {
            id: 1,
            labels: vec![],
            properties: BTreeMap::new(),
        });
        assert!(!Value::List(vec![node]).is_valid_property_value());
        assert!(Value::List(vec![Value::Int(1), Value::Null]).is_valid_property_value());
    }
}
