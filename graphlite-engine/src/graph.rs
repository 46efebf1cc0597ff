// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! In-memory graph model
//!
//! A [`GraphStore`] holds nodes and relationships keyed by id. Every change a
//! statement makes is expressed as a [`Mutation`] so that a transaction can keep
//! an ordered log and replay it on top of committed state.

use crate::value::Value;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

pub type NodeId = u64;
pub type RelationshipId = u64;

/// Graph node with labels and properties
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub id: NodeId,
    pub labels: Vec<String>,
    pub properties: BTreeMap<String, Value>,
}

impl Node {
    pub fn new(id: NodeId) -> Self {
        Self {
            id,
            labels: Vec::new(),
            properties: BTreeMap::new(),
        }
    }

    pub fn has_label(&self, label: &str) -> bool {
        self.labels.iter().any(|l| l == label)
    }

    pub fn property(&self, key: &str) -> Option<&Value> {
        self.properties.get(key)
    }
}

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}", self.id)?;
        for label in &self.labels {
            write!(f, ":{}", label)?;
        }
        if !self.properties.is_empty() {
            write!(f, " {}", Value::Map(self.properties.clone()))?;
        }
        write!(f, ")")
    }
}

/// Directed, typed relationship between two nodes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Relationship {
    pub id: RelationshipId,
    pub rel_type: String,
    pub start: NodeId,
    pub end: NodeId,
    pub properties: BTreeMap<String, Value>,
}

impl Relationship {
    pub fn property(&self, key: &str) -> Option<&Value> {
        self.properties.get(key)
    }
}

impl fmt::Display for Relationship {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}:{}", self.id, self.rel_type)?;
        if !self.properties.is_empty() {
            write!(f, " {}", Value::Map(self.properties.clone()))?;
        }
        write!(f, "]")
    }
}

/// Alternating sequence of nodes and relationships
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Path {
    pub nodes: Vec<Node>,
    pub relationships: Vec<Relationship>,
}

impl Path {
    pub fn len(&self) -> usize {
        self.relationships.len()
    }

    pub fn is_empty(&self) -> bool {
        self.relationships.is_empty()
    }
}

impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, node) in self.nodes.iter().enumerate() {
            if i > 0 {
                if let Some(rel) = self.relationships.get(i - 1) {
                    write!(f, "-{}-", rel)?;
                }
            }
            write!(f, "{}", node)?;
        }
        Ok(())
    }
}

/// A single change to the graph
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Mutation {
    CreateNode(Node),
    DeleteNode(NodeId),
    CreateRelationship(Relationship),
    DeleteRelationship(RelationshipId),
    SetNodeProperty {
        id: NodeId,
        key: String,
        value: Option<Value>,
    },
    SetRelationshipProperty {
        id: RelationshipId,
        key: String,
        value: Option<Value>,
    },
    AddLabel {
        id: NodeId,
        label: String,
    },
    RemoveLabel {
        id: NodeId,
        label: String,
    },
}

impl Mutation {
    /// Node touched by this mutation, if any
    pub fn node_id(&self) -> Option<NodeId> {
        match self {
            Mutation::CreateNode(node) => Some(node.id),
            Mutation::DeleteNode(id)
            | Mutation::SetNodeProperty { id, .. }
            | Mutation::AddLabel { id, .. }
            | Mutation::RemoveLabel { id, .. } => Some(*id),
            _ => None,
        }
    }

    /// Relationship touched by this mutation, if any
    pub fn relationship_id(&self) -> Option<RelationshipId> {
        match self {
            Mutation::CreateRelationship(rel) => Some(rel.id),
            Mutation::DeleteRelationship(id) | Mutation::SetRelationshipProperty { id, .. } => {
                Some(*id)
            }
            _ => None,
        }
    }
}

/// Node and relationship tables
#[derive(Debug, Clone, Default)]
pub struct GraphStore {
    nodes: BTreeMap<NodeId, Node>,
    relationships: BTreeMap<RelationshipId, Relationship>,
}

impl GraphStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(&id)
    }

    pub fn relationship(&self, id: RelationshipId) -> Option<&Relationship> {
        self.relationships.get(&id)
    }

    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.nodes.values()
    }

    pub fn relationships(&self) -> impl Iterator<Item = &Relationship> {
        self.relationships.values()
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn relationship_count(&self) -> usize {
        self.relationships.len()
    }

    /// Relationships attached to a node in either direction
    pub fn relationships_of(&self, id: NodeId) -> impl Iterator<Item = &Relationship> {
        self.relationships
            .values()
            .filter(move |r| r.start == id || r.end == id)
    }

    pub fn max_node_id(&self) -> Option<NodeId> {
        self.nodes.keys().next_back().copied()
    }

    pub fn max_relationship_id(&self) -> Option<RelationshipId> {
        self.relationships.keys().next_back().copied()
    }

    /// Apply a mutation. Mutations targeting entities that no longer exist are
    /// ignored, so property writes are last-writer-wins. Commits go through
    /// [`GraphStore::replay`], which also rejects structural conflicts.
    pub fn apply(&mut self, mutation: &Mutation) {
        match mutation {
            Mutation::CreateNode(node) => {
                self.nodes.insert(node.id, node.clone());
            }
            Mutation::DeleteNode(id) => {
                self.nodes.remove(id);
            }
            Mutation::CreateRelationship(rel) => {
                if self.nodes.contains_key(&rel.start) && self.nodes.contains_key(&rel.end) {
                    self.relationships.insert(rel.id, rel.clone());
                }
            }
            Mutation::DeleteRelationship(id) => {
                self.relationships.remove(id);
            }
            Mutation::SetNodeProperty { id, key, value } => {
                if let Some(node) = self.nodes.get_mut(id) {
                    match value {
                        Some(v) => node.properties.insert(key.clone(), v.clone()),
                        None => node.properties.remove(key),
                    };
                }
            }
            Mutation::SetRelationshipProperty { id, key, value } => {
                if let Some(rel) = self.relationships.get_mut(id) {
                    match value {
                        Some(v) => rel.properties.insert(key.clone(), v.clone()),
                        None => rel.properties.remove(key),
                    };
                }
            }
            Mutation::AddLabel { id, label } => {
                if let Some(node) = self.nodes.get_mut(id) {
                    if !node.has_label(label) {
                        node.labels.push(label.clone());
                    }
                }
            }
            Mutation::RemoveLabel { id, label } => {
                if let Some(node) = self.nodes.get_mut(id) {
                    node.labels.retain(|l| l != label);
                }
            }
        }
    }

    pub fn apply_all<'a>(&mut self, mutations: impl IntoIterator<Item = &'a Mutation>) {
        for mutation in mutations {
            self.apply(mutation);
        }
    }

    /// Replay a transaction's log at commit time
    ///
    /// Fails when commits made since the log was written broke its structure:
    /// a new relationship whose endpoint is gone, or a deleted node that has
    /// gained relationships the log does not delete. The store is left
    /// partially applied on error; replay into a copy.
    pub fn replay(&mut self, mutations: &[Mutation]) -> Result<(), String> {
        for mutation in mutations {
            if let Mutation::CreateRelationship(rel) = mutation {
                if !self.nodes.contains_key(&rel.start) || !self.nodes.contains_key(&rel.end) {
                    return Err(format!(
                        "relationship {} refers to a node deleted by another transaction",
                        rel.id
                    ));
                }
            }
            self.apply(mutation);
        }
        for mutation in mutations {
            if let Mutation::DeleteNode(id) = mutation {
                if self.relationships_of(*id).next().is_some() {
                    return Err(format!(
                        "node {} gained relationships in another transaction and cannot be deleted",
                        id
                    ));
                }
            }
        }
        Ok(())
    }

    /// Insert a loaded node directly, bypassing the mutation log
    pub(crate) fn load_node(&mut self, node: Node) {
        self.nodes.insert(node.id, node);
    }

    /// Insert a loaded relationship directly, bypassing the mutation log
    pub(crate) fn load_relationship(&mut self, rel: Relationship) {
        self.relationships.insert(rel.id, rel);
    }
}

/// Hands out node and relationship ids shared by every transaction of a database
#[derive(Debug, Default)]
pub struct IdAllocator {
    next_node: AtomicU64,
    next_relationship: AtomicU64,
}

impl IdAllocator {
    /// Continue numbering after the highest ids present in `graph`
    pub fn starting_after(graph: &GraphStore) -> Self {
        Self {
            next_node: AtomicU64::new(graph.max_node_id().map_or(0, |id| id + 1)),
            next_relationship: AtomicU64::new(graph.max_relationship_id().map_or(0, |id| id + 1)),
        }
    }

    pub fn next_node_id(&self) -> NodeId {
        self.next_node.fetch_add(1, Ordering::SeqCst)
    }

    pub fn next_relationship_id(&self) -> RelationshipId {
        self.next_relationship.fetch_add(1, Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn person(id: NodeId) -> Node {
        let mut node = Node::new(id);
        node.labels.push("Person".to_string());
        node
    }

    #[test]
    fn test_apply_create_and_delete() {
        let mut store = GraphStore::new();
        store.apply(&Mutation::CreateNode(person(1)));
        store.apply(&Mutation::CreateNode(person(2)));
        store.apply(&Mutation::CreateRelationship(Relationship {
            id: 1,
            rel_type: "KNOWS".to_string(),
            start: 1,
            end: 2,
            properties: BTreeMap::new(),
        }));
        assert_eq!(store.node_count(), 2);
        assert_eq!(store.relationships_of(2).count(), 1);

        store.apply(&Mutation::DeleteRelationship(1));
        store.apply(&Mutation::DeleteNode(1));
        assert_eq!(store.node_count(), 1);
        assert_eq!(store.relationship_count(), 0);
    }

    #[test]
    fn test_mutations_on_missing_entities_are_ignored() {
        let mut store = GraphStore::new();
        store.apply(&Mutation::SetNodeProperty {
            id: 42,
            key: "name".to_string(),
            value: Some(Value::from("ghost")),
        });
        store.apply(&Mutation::CreateRelationship(Relationship {
            id: 1,
            rel_type: "KNOWS".to_string(),
            start: 1,
            end: 2,
            properties: BTreeMap::new(),
        }));
        assert_eq!(store.node_count(), 0);
        assert_eq!(store.relationship_count(), 0);
    }

    #[test]
    fn test_labels_are_not_duplicated() {
        let mut store = GraphStore::new();
        store.apply(&Mutation::CreateNode(person(1)));
        store.apply(&Mutation::AddLabel {
            id: 1,
            label: "Person".to_string(),
        });
        assert_eq!(store.node(1).map(|n| n.labels.len()), Some(1));
    }

    #[test]
    fn test_id_allocator_continues_after_loaded_ids() {
        let mut store = GraphStore::new();
        store.load_node(person(7));
        let ids = IdAllocator::starting_after(&store);
        assert_eq!(ids.next_node_id(), 8);
        assert_eq!(ids.next_node_id(), 9);
        assert_eq!(ids.next_relationship_id(), 0);
    }

    fn knows(id: RelationshipId, start: NodeId, end: NodeId) -> Relationship {
        Relationship {
            id,
            rel_type: "KNOWS".to_string(),
            start,
            end,
            properties: BTreeMap::new(),
        }
    }

    #[test]
    fn test_replay_checks_structure_after_the_whole_log() {
        let mut store = GraphStore::new();
        store.apply(&Mutation::CreateNode(person(1)));
        store.apply(&Mutation::CreateNode(person(2)));
        store.apply(&Mutation::CreateRelationship(knows(1, 1, 2)));

        // Node deleted before its relationship in the same log
        let mut detached = store.clone();
        detached
            .replay(&[Mutation::DeleteNode(2), Mutation::DeleteRelationship(1)])
            .unwrap();
        assert_eq!(detached.node_count(), 1);
        assert_eq!(detached.relationship_count(), 0);

        assert!(store.clone().replay(&[Mutation::DeleteNode(2)]).is_err());
        assert!(store
            .clone()
            .replay(&[Mutation::CreateRelationship(knows(2, 1, 3))])
            .is_err());
    }
}
