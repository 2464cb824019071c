//! Persisted form of the knowledge store.
//!
//! Stored as JSON under [`STORE_SNAPSHOT_KEY`]: node metadata is an open
//! `serde_json::Value` bag, which bincode cannot round-trip.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::error::StoreError;
use crate::model::{KnowledgeNode, Relationship};
use crate::store::StoreResult;

/// Durable key holding the JSON-encoded [`StoreSnapshot`].
pub const STORE_SNAPSHOT_KEY: &[u8] = b"store:snapshot";

/// Primary data of a store. Indices are derived and never persisted.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StoreSnapshot {
    /// Nodes in id order.
    pub nodes: Vec<KnowledgeNode>,
    /// Relationships in insertion order.
    pub relationships: Vec<Relationship>,
    #[serde(default)]
    pub processed_sources: BTreeSet<String>,
    /// Next id the allocator will hand out.
    pub next_id: u64,
}

impl StoreSnapshot {
    pub fn to_bytes(&self) -> StoreResult<Vec<u8>> {
        serde_json::to_vec(self).map_err(|e| StoreError::Serialization {
            message: format!("failed to serialize store snapshot: {e}"),
        })
    }

    /// Decode a snapshot. Undecodable bytes are corruption, not an empty store.
    pub fn from_bytes(bytes: &[u8]) -> StoreResult<Self> {
        serde_json::from_slice(bytes).map_err(|e| StoreError::CorruptSnapshot {
            message: format!("snapshot is not valid JSON: {e}"),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::NodeId;

    #[test]
    fn json_keeps_open_metadata() {
        let mut node = KnowledgeNode::new(NodeId::new(1).unwrap(), "Python", "language");
        node.metadata
            .insert("aliases".into(), serde_json::json!(["py", "cpython"]));
        node.metadata.insert("pagerank".into(), serde_json::json!(0.25));
        let snapshot = StoreSnapshot {
            nodes: vec![node],
            relationships: vec![Relationship::new("Python", "is-a", "Language", 0.9).with_source("doc1")],
            processed_sources: BTreeSet::from(["doc1".to_string()]),
            next_id: 2,
        };
        let decoded = StoreSnapshot::from_bytes(&snapshot.to_bytes().unwrap()).unwrap();
        assert_eq!(decoded, snapshot);
    }

    #[test]
    fn garbage_is_corruption() {
        let err = StoreSnapshot::from_bytes(b"\x00\x01not json").unwrap_err();
        assert!(matches!(err, StoreError::CorruptSnapshot { .. }));
    }
}
