//! Derived lookup indices over the store's primary node and relationship lists.
//!
//! Nothing here is persisted. [`StoreIndex::rebuild`] recomputes every index
//! from the primary lists on load; incremental updates keep it in step during
//! ingestion.

use std::collections::{BTreeMap, HashMap};

use crate::model::{KnowledgeNode, NodeId, Relationship};

/// Name, type, source, and back-reference indices.
#[derive(Debug, Clone, Default)]
pub struct StoreIndex {
    /// Canonical name → node id. A bijection over live nodes.
    name_to_id: HashMap<String, NodeId>,
    /// Node type → node ids, in insertion order.
    by_type: HashMap<String, Vec<NodeId>>,
    /// Source identifier → node ids, in insertion order.
    by_source: HashMap<String, Vec<NodeId>>,
    /// Canonical name → positions of relationships where it is the subject.
    outgoing: HashMap<String, Vec<usize>>,
    /// Canonical name → positions of relationships where it is the object.
    incoming: HashMap<String, Vec<usize>>,
}

impl StoreIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Recompute every index from the primary lists.
    pub fn rebuild(nodes: &BTreeMap<NodeId, KnowledgeNode>, relationships: &[Relationship]) -> Self {
        let mut index = Self::new();
        for node in nodes.values() {
            index.insert_node(node);
        }
        for (pos, rel) in relationships.iter().enumerate() {
            index.insert_relationship(pos, rel);
        }
        index
    }

    /// Index a newly created node.
    pub fn insert_node(&mut self, node: &KnowledgeNode) {
        self.name_to_id.insert(node.canonical_name.clone(), node.id);
        self.by_type
            .entry(node.node_type.clone())
            .or_default()
            .push(node.id);
        for source in &node.sources {
            self.add_node_source(node.id, source);
        }
    }

    /// Move a node from one type bucket to another.
    pub fn retag_node(&mut self, id: NodeId, old_type: &str, new_type: &str) {
        if let Some(ids) = self.by_type.get_mut(old_type) {
            ids.retain(|i| *i != id);
            if ids.is_empty() {
                self.by_type.remove(old_type);
            }
        }
        self.by_type.entry(new_type.to_string()).or_default().push(id);
    }

    /// Record that a node gained a source.
    pub fn add_node_source(&mut self, id: NodeId, source: &str) {
        let ids = self.by_source.entry(source.to_string()).or_default();
        if !ids.contains(&id) {
            ids.push(id);
        }
    }

    /// Index the relationship stored at `pos` in the primary list.
    pub fn insert_relationship(&mut self, pos: usize, rel: &Relationship) {
        self.outgoing.entry(rel.subject.clone()).or_default().push(pos);
        self.incoming.entry(rel.object.clone()).or_default().push(pos);
    }

    pub fn id_of(&self, canonical_name: &str) -> Option<NodeId> {
        self.name_to_id.get(canonical_name).copied()
    }

    pub fn ids_of_type(&self, node_type: &str) -> &[NodeId] {
        self.by_type.get(node_type).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn ids_from_source(&self, source: &str) -> &[NodeId] {
        self.by_source.get(source).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Positions of relationships where `name` is the subject.
    pub fn outgoing(&self, name: &str) -> &[usize] {
        self.outgoing.get(name).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Positions of relationships where `name` is the object.
    pub fn incoming(&self, name: &str) -> &[usize] {
        self.incoming.get(name).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Per-type node counts.
    pub fn type_counts(&self) -> BTreeMap<String, usize> {
        self.by_type
            .iter()
            .map(|(t, ids)| (t.clone(), ids.len()))
            .collect()
    }

    /// Number of named nodes.
    pub fn len(&self) -> usize {
        self.name_to_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.name_to_id.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn node(id: u64, name: &str, t: &str, sources: &[&str]) -> KnowledgeNode {
        let mut n = KnowledgeNode::new(NodeId::new(id).unwrap(), name, t);
        for s in sources {
            n.add_source(s);
        }
        n
    }

    #[test]
    fn rebuild_indexes_everything() {
        let mut nodes = BTreeMap::new();
        for n in [
            node(1, "Python", "language", &["doc1"]),
            node(2, "Django", "framework", &["doc1", "doc2"]),
        ] {
            nodes.insert(n.id, n);
        }
        let rels = vec![Relationship::new("Python", "powers", "Django", 0.9)];
        let index = StoreIndex::rebuild(&nodes, &rels);

        assert_eq!(index.len(), 2);
        assert_eq!(index.id_of("Django"), NodeId::new(2));
        assert_eq!(index.ids_of_type("language"), &[NodeId::new(1).unwrap()]);
        assert_eq!(index.ids_from_source("doc1").len(), 2);
        assert_eq!(index.ids_from_source("doc2"), &[NodeId::new(2).unwrap()]);
        assert_eq!(index.outgoing("Python"), &[0]);
        assert_eq!(index.incoming("Django"), &[0]);
        assert!(index.outgoing("Django").is_empty());
    }

    #[test]
    fn retag_moves_between_type_buckets() {
        let mut index = StoreIndex::new();
        let n = node(1, "Rust", "entity", &[]);
        index.insert_node(&n);
        index.retag_node(n.id, "entity", "language");
        assert!(index.ids_of_type("entity").is_empty());
        assert_eq!(index.ids_of_type("language"), &[n.id]);
        assert!(!index.type_counts().contains_key("entity"));
    }

    #[test]
    fn source_index_has_no_duplicates() {
        let mut index = StoreIndex::new();
        let id = NodeId::new(3).unwrap();
        index.add_node_source(id, "doc1");
        index.add_node_source(id, "doc1");
        assert_eq!(index.ids_from_source("doc1"), &[id]);
    }
}
