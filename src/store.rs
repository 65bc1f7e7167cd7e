//! The embedded in-memory property graph (spec §4.1).
//!
//! Nodes and relationships are held in dense `Vec<Option<_>>` tables
//! indexed by id so iteration follows insertion order deterministically
//! (spec §4.1 "Ordering invariants"), rather than a `HashMap`'s arbitrary
//! bucket order.

use std::collections::BTreeMap;

use crate::error::StoreError;
use crate::value::{NodeValue, RelationshipValue, Value};

#[derive(Debug, Clone)]
struct NodeRecord {
    id: u64,
    labels: Vec<String>,
    properties: BTreeMap<String, Value>,
}

#[derive(Debug, Clone)]
struct RelRecord {
    id: u64,
    start: u64,
    end: u64,
    rel_type: String,
    properties: BTreeMap<String, Value>,
}

#[derive(Debug, Default)]
pub struct Graph {
    nodes: Vec<Option<NodeRecord>>,
    rels: Vec<Option<RelRecord>>,
    /// `adjacency[id]` lists relationship ids incident to node `id`, in the
    /// order they were created.
    adjacency: Vec<Vec<u64>>,
}

impl Graph {
    pub fn new() -> Self {
        Self::default()
    }

    fn node_index(id: u64) -> usize {
        (id - 1) as usize
    }

    pub fn create_node(&mut self, labels: Vec<String>, properties: BTreeMap<String, Value>) -> NodeValue {
        let id = self.nodes.len() as u64 + 1;
        self.nodes.push(Some(NodeRecord {
            id,
            labels: labels.clone(),
            properties: properties.clone(),
        }));
        self.adjacency.push(Vec::new());
        NodeValue { id, labels, properties }
    }

    pub fn create_relationship(
        &mut self,
        start: u64,
        end: u64,
        rel_type: String,
        properties: BTreeMap<String, Value>,
    ) -> Result<RelationshipValue, StoreError> {
        if self.node(start).is_none() || self.node(end).is_none() {
            return Err(StoreError::UnknownEndpoint);
        }
        let id = self.rels.len() as u64 + 1;
        self.rels.push(Some(RelRecord {
            id,
            start,
            end,
            rel_type: rel_type.clone(),
            properties: properties.clone(),
        }));
        self.adjacency[Self::node_index(start)].push(id);
        if end != start {
            self.adjacency[Self::node_index(end)].push(id);
        }
        Ok(RelationshipValue {
            id,
            start,
            end,
            rel_type,
            properties,
        })
    }

    pub fn set_node_property(&mut self, id: u64, key: &str, value: Option<Value>) -> Result<(), StoreError> {
        let record = self
            .nodes
            .get_mut(Self::node_index(id))
            .and_then(|slot| slot.as_mut())
            .ok_or(StoreError::UnknownEntity)?;
        match value {
            Some(v) => {
                record.properties.insert(key.to_string(), v);
            }
            None => {
                record.properties.remove(key);
            }
        }
        Ok(())
    }

    pub fn set_relationship_property(&mut self, id: u64, key: &str, value: Option<Value>) -> Result<(), StoreError> {
        let record = self
            .rels
            .get_mut((id - 1) as usize)
            .and_then(|slot| slot.as_mut())
            .ok_or(StoreError::UnknownEntity)?;
        match value {
            Some(v) => {
                record.properties.insert(key.to_string(), v);
            }
            None => {
                record.properties.remove(key);
            }
        }
        Ok(())
    }

    pub fn add_label(&mut self, id: u64, label: &str) -> Result<(), StoreError> {
        let record = self
            .nodes
            .get_mut(Self::node_index(id))
            .and_then(|slot| slot.as_mut())
            .ok_or(StoreError::UnknownEntity)?;
        if !record.labels.iter().any(|l| l == label) {
            record.labels.push(label.to_string());
        }
        Ok(())
    }

    pub fn remove_label(&mut self, id: u64, label: &str) -> Result<(), StoreError> {
        let record = self
            .nodes
            .get_mut(Self::node_index(id))
            .and_then(|slot| slot.as_mut())
            .ok_or(StoreError::UnknownEntity)?;
        record.labels.retain(|l| l != label);
        Ok(())
    }

    pub fn delete_relationship(&mut self, id: u64) -> bool {
        let idx = (id - 1) as usize;
        let Some(slot) = self.rels.get_mut(idx) else {
            return false;
        };
        let Some(record) = slot.take() else {
            return false;
        };
        self.adjacency[Self::node_index(record.start)].retain(|r| *r != id);
        if record.end != record.start {
            self.adjacency[Self::node_index(record.end)].retain(|r| *r != id);
        }
        true
    }

    pub fn delete_node(&mut self, id: u64, detach: bool) -> Result<bool, StoreError> {
        let idx = Self::node_index(id);
        if self.nodes.get(idx).map(Option::is_some).unwrap_or(false) {
            let incident = self.adjacency[idx].clone();
            if !incident.is_empty() {
                if !detach {
                    return Err(StoreError::StillConnected(id));
                }
                for rel_id in incident {
                    self.delete_relationship(rel_id);
                }
            }
            self.nodes[idx] = None;
            Ok(true)
        } else {
            Ok(false)
        }
    }

    pub fn node(&self, id: u64) -> Option<NodeValue> {
        self.nodes
            .get(Self::node_index(id))?
            .as_ref()
            .map(|r| NodeValue {
                id: r.id,
                labels: r.labels.clone(),
                properties: r.properties.clone(),
            })
    }

    pub fn relationship(&self, id: u64) -> Option<RelationshipValue> {
        self.rels.get((id - 1) as usize)?.as_ref().map(|r| RelationshipValue {
            id: r.id,
            start: r.start,
            end: r.end,
            rel_type: r.rel_type.clone(),
            properties: r.properties.clone(),
        })
    }

    /// All live nodes in ascending id (insertion) order.
    pub fn nodes(&self) -> impl Iterator<Item = NodeValue> + '_ {
        self.nodes.iter().filter_map(|slot| {
            slot.as_ref().map(|r| NodeValue {
                id: r.id,
                labels: r.labels.clone(),
                properties: r.properties.clone(),
            })
        })
    }

    /// All live relationships in ascending id (insertion) order.
    pub fn relationships(&self) -> impl Iterator<Item = RelationshipValue> + '_ {
        self.rels.iter().filter_map(|slot| {
            slot.as_ref().map(|r| RelationshipValue {
                id: r.id,
                start: r.start,
                end: r.end,
                rel_type: r.rel_type.clone(),
                properties: r.properties.clone(),
            })
        })
    }

    /// Relationships incident to `id`, ascending relationship-id order.
    pub fn incident(&self, id: u64) -> Vec<RelationshipValue> {
        let Some(ids) = self.adjacency.get(Self::node_index(id)) else {
            return Vec::new();
        };
        let mut ids = ids.clone();
        ids.sort_unstable();
        ids.into_iter().filter_map(|rid| self.relationship(rid)).collect()
    }

    pub fn relationship_count(&self) -> usize {
        self.rels.iter().filter(|r| r.is_some()).count()
    }

    pub fn labels(&self) -> Vec<String> {
        let mut seen = Vec::new();
        for node in self.nodes() {
            for label in node.labels {
                if !seen.contains(&label) {
                    seen.push(label);
                }
            }
        }
        seen
    }

    pub fn relationship_types(&self) -> Vec<String> {
        let mut seen = Vec::new();
        for rel in self.relationships() {
            if !seen.contains(&rel.rel_type) {
                seen.push(rel.rel_type);
            }
        }
        seen
    }

    pub fn property_keys(&self) -> Vec<String> {
        let mut seen = Vec::new();
        for node in self.nodes() {
            for key in node.properties.keys() {
                if !seen.contains(key) {
                    seen.push(key.clone());
                }
            }
        }
        for rel in self.relationships() {
            for key in rel.properties.keys() {
                if !seen.contains(key) {
                    seen.push(key.clone());
                }
            }
        }
        seen
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_relationship_requires_existing_endpoints() {
        let mut g = Graph::new();
        let n = g.create_node(vec![], BTreeMap::new());
        let err = g.create_relationship(n.id, 999, "R".to_string(), BTreeMap::new()).unwrap_err();
        assert_eq!(err, StoreError::UnknownEndpoint);
    }

    #[test]
    fn delete_node_without_detach_fails_when_connected() {
        let mut g = Graph::new();
        let a = g.create_node(vec![], BTreeMap::new());
        let b = g.create_node(vec![], BTreeMap::new());
        g.create_relationship(a.id, b.id, "R".to_string(), BTreeMap::new()).unwrap();
        assert_eq!(g.delete_node(a.id, false).unwrap_err(), StoreError::StillConnected(a.id));
        assert!(g.delete_node(a.id, true).unwrap());
        assert!(g.node(a.id).is_none());
        assert!(g.relationships().next().is_none());
    }

    #[test]
    fn iteration_follows_insertion_order() {
        let mut g = Graph::new();
        let ids: Vec<u64> = (0..5).map(|_| g.create_node(vec![], BTreeMap::new()).id).collect();
        let observed: Vec<u64> = g.nodes().map(|n| n.id).collect();
        assert_eq!(ids, observed);
    }

    #[test]
    fn null_property_value_removes_key() {
        let mut g = Graph::new();
        let mut props = BTreeMap::new();
        props.insert("x".to_string(), Value::Int(1));
        let n = g.create_node(vec![], props);
        g.set_node_property(n.id, "x", None).unwrap();
        assert!(g.node(n.id).unwrap().properties.is_empty());
    }
}
