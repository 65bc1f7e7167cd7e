//! The row stream flowing through the clause pipeline (spec §4.4).
//!
//! Per the Design Notes (§9), hidden per-row state is kept OUT of the
//! visible bindings map as a separate `RowMeta`, rather than carried as
//! sentinel-prefixed keys in the same map.

use std::collections::HashMap;

use crate::value::Value;

#[derive(Debug, Clone, Default)]
pub struct RowMeta {
    /// Set by MERGE, consulted by an immediately-following SET that carries
    /// an `ON CREATE`/`ON MATCH` suffix. Cleared by any other clause.
    pub last_merge_created: Option<bool>,
    /// Projection-expression cache: source expression text -> evaluated
    /// value, so ORDER BY on the same expression avoids re-evaluation.
    pub expr_cache: HashMap<String, Value>,
}

impl RowMeta {
    pub fn clear_merge_flag(&mut self) {
        self.last_merge_created = None;
    }
}

#[derive(Debug, Clone, Default)]
pub struct Row {
    bindings: Vec<(String, Value)>,
    pub meta: RowMeta,
}

impl Row {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.bindings.iter().find(|(k, _)| k == name).map(|(_, v)| v)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.bindings.iter().any(|(k, _)| k == name)
    }

    /// Binds `name` to `value`, replacing any existing binding of the same
    /// name (used for variable rebinding checks and projection aliases).
    pub fn set(&mut self, name: impl Into<String>, value: Value) {
        let name = name.into();
        if let Some(slot) = self.bindings.iter_mut().find(|(k, _)| *k == name) {
            slot.1 = value;
        } else {
            self.bindings.push((name, value));
        }
    }

    pub fn with(&self, name: impl Into<String>, value: Value) -> Row {
        let mut clone = self.clone();
        clone.set(name, value);
        clone
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.bindings.iter().map(|(k, _)| k.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.bindings.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    /// Builds a fresh row retaining only the given column names, in the
    /// given order, used at WITH/RETURN's projection boundary.
    pub fn project(pairs: Vec<(String, Value)>) -> Row {
        Row {
            bindings: pairs,
            meta: RowMeta::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_replaces_existing_binding() {
        let mut row = Row::empty();
        row.set("n", Value::Int(1));
        row.set("n", Value::Int(2));
        assert_eq!(row.len(), 1);
        assert_eq!(row.get("n"), Some(&Value::Int(2)));
    }

    #[test]
    fn with_clones_and_adds() {
        let row = Row::empty().with("n", Value::Int(1));
        let row2 = row.with("m", Value::Int(2));
        assert!(row.get("m").is_none());
        assert_eq!(row2.get("n"), Some(&Value::Int(1)));
        assert_eq!(row2.get("m"), Some(&Value::Int(2)));
    }
}
