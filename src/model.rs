//! Core data model: canonical nodes, typed relationships, and the candidate
//! records produced by an upstream extractor.
//!
//! Relationships reference their endpoints by canonical name rather than by
//! [`NodeId`], so the graph is stored arena-style: nodes live in a map keyed
//! by id and edges are plain values, with no ownership cycles.

use std::collections::{BTreeMap, BTreeSet};
use std::num::NonZeroU64;

use serde::{Deserialize, Serialize};

/// Node type given to nodes created implicitly by a relationship endpoint.
pub const PLACEHOLDER_TYPE: &str = "entity";

/// Node type given to concept candidates without a category.
pub const DEFAULT_CONCEPT_TYPE: &str = "concept";

/// Source recorded on relationships produced by the inference engine.
pub const INFERRED_SOURCE: &str = "inferred";

/// Stable, niche-optimized identifier for a knowledge node.
///
/// Uses `NonZeroU64` so that `Option<NodeId>` is the same size as `NodeId`.
/// Ids are assigned once and never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[repr(transparent)]
pub struct NodeId(NonZeroU64);

impl NodeId {
    /// Create a `NodeId` from a raw `u64`.
    ///
    /// Returns `None` if `raw` is zero.
    pub fn new(raw: u64) -> Option<Self> {
        NonZeroU64::new(raw).map(NodeId)
    }

    /// Get the underlying `u64` value.
    pub fn get(self) -> u64 {
        self.0.get()
    }
}

impl std::fmt::Display for NodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "node:{}", self.0)
    }
}

/// Monotonic node id allocator.
///
/// Produces increasing ids starting from 1. The next value is part of the
/// persisted store snapshot so ids survive restarts without reuse.
#[derive(Debug, Clone)]
pub struct NodeIdAllocator {
    next: u64,
}

impl NodeIdAllocator {
    /// Create an allocator that starts from id 1.
    pub fn new() -> Self {
        Self { next: 1 }
    }

    /// Create an allocator that resumes from a given id (clamped to >= 1).
    pub fn starting_from(next: u64) -> Self {
        Self { next: next.max(1) }
    }

    /// Allocate the next id.
    pub fn allocate(&mut self) -> NodeId {
        let raw = self.next;
        self.next = self.next.saturating_add(1);
        // `next` starts at 1 and only grows, so it is never zero.
        NodeId::new(raw).unwrap_or(NodeId(NonZeroU64::MIN))
    }

    /// The id the next call to [`allocate`](Self::allocate) will return.
    pub fn peek_next(&self) -> u64 {
        self.next
    }
}

impl Default for NodeIdAllocator {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// Nodes and relationships
// ---------------------------------------------------------------------------

/// A canonical entity or concept.
///
/// Back-references (edges where this node is subject or object) are not
/// stored here; the store keeps them in a derived index rebuilt on load.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KnowledgeNode {
    pub id: NodeId,
    /// Unique within the store.
    pub canonical_name: String,
    /// Open tag (`concept`, `entity`, `pattern`, ...).
    #[serde(rename = "type")]
    pub node_type: String,
    #[serde(default)]
    pub definition: String,
    /// Append-only set of contributing source identifiers.
    #[serde(default)]
    pub sources: BTreeSet<String>,
    /// Open key/value bag, merged on update.
    #[serde(default)]
    pub metadata: BTreeMap<String, serde_json::Value>,
}

impl KnowledgeNode {
    /// Create a node with no definition, sources, or metadata.
    pub fn new(id: NodeId, canonical_name: impl Into<String>, node_type: impl Into<String>) -> Self {
        Self {
            id,
            canonical_name: canonical_name.into(),
            node_type: node_type.into(),
            definition: String::new(),
            sources: BTreeSet::new(),
            metadata: BTreeMap::new(),
        }
    }

    /// Merge metadata: new keys are added, existing keys are overwritten.
    ///
    /// Returns `true` if any value changed.
    pub fn merge_metadata(&mut self, incoming: &BTreeMap<String, serde_json::Value>) -> bool {
        let mut changed = false;
        for (key, value) in incoming {
            if self.metadata.get(key) != Some(value) {
                self.metadata.insert(key.clone(), value.clone());
                changed = true;
            }
        }
        changed
    }

    /// Add a source identifier. Returns `true` if it was new.
    pub fn add_source(&mut self, source: &str) -> bool {
        if source.is_empty() || self.sources.contains(source) {
            return false;
        }
        self.sources.insert(source.to_string());
        true
    }

    /// Read a numeric metadata value, if present.
    pub fn metric(&self, key: &str) -> Option<f64> {
        self.metadata.get(key).and_then(serde_json::Value::as_f64)
    }
}

/// A directed, typed edge between two canonical names.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Relationship {
    pub subject: String,
    pub predicate: String,
    pub object: String,
    /// Confidence in [0.0, 1.0].
    pub confidence: f32,
    #[serde(default)]
    pub source: Option<String>,
    /// Rule names and iteration tags, present only on derived relationships.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inferred_by: Option<Vec<String>>,
}

impl Relationship {
    /// Create an extracted (non-derived) relationship.
    pub fn new(
        subject: impl Into<String>,
        predicate: impl Into<String>,
        object: impl Into<String>,
        confidence: f32,
    ) -> Self {
        Self {
            subject: subject.into(),
            predicate: predicate.into(),
            object: object.into(),
            confidence: confidence.clamp(0.0, 1.0),
            source: None,
            inferred_by: None,
        }
    }

    /// Set the contributing source.
    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }

    /// Mark this relationship as derived, recording its lineage.
    pub fn with_lineage(mut self, lineage: Vec<String>) -> Self {
        self.inferred_by = Some(lineage);
        self
    }

    /// Whether this relationship was produced by inference.
    pub fn is_inferred(&self) -> bool {
        self.inferred_by.is_some()
    }

    /// The dedup signature of this relationship.
    pub fn signature(&self) -> Signature {
        Signature::new(&self.subject, &self.predicate, &self.object)
    }
}

/// Exact `(subject, predicate, object)` triple used for dedup.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Signature {
    pub subject: String,
    pub predicate: String,
    pub object: String,
}

impl Signature {
    pub fn new(subject: &str, predicate: &str, object: &str) -> Self {
        Self {
            subject: subject.to_string(),
            predicate: predicate.to_string(),
            object: object.to_string(),
        }
    }
}

// ---------------------------------------------------------------------------
// Extraction candidates
// ---------------------------------------------------------------------------

/// A concept proposed by the extractor for one document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConceptCandidate {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub importance: Option<f32>,
}

impl ConceptCandidate {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: String::new(),
            category: String::new(),
            importance: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = category.into();
        self
    }

    pub fn with_importance(mut self, importance: f32) -> Self {
        self.importance = Some(importance);
        self
    }

    /// Reject records without a usable name.
    pub fn validate(&self) -> Result<(), CandidateDefect> {
        if self.name.trim().is_empty() {
            return Err(CandidateDefect::MissingName);
        }
        Ok(())
    }
}

/// A relationship proposed by the extractor for one document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RelationshipCandidate {
    pub subject: String,
    pub predicate: String,
    pub object: String,
    #[serde(default = "default_candidate_confidence")]
    pub confidence: f32,
}

fn default_candidate_confidence() -> f32 {
    1.0
}

impl RelationshipCandidate {
    pub fn new(
        subject: impl Into<String>,
        predicate: impl Into<String>,
        object: impl Into<String>,
        confidence: f32,
    ) -> Self {
        Self {
            subject: subject.into(),
            predicate: predicate.into(),
            object: object.into(),
            confidence,
        }
    }

    /// Reject records with a missing endpoint/predicate or a non-finite confidence.
    pub fn validate(&self) -> Result<(), CandidateDefect> {
        if self.subject.trim().is_empty() {
            return Err(CandidateDefect::MissingSubject);
        }
        if self.predicate.trim().is_empty() {
            return Err(CandidateDefect::MissingPredicate);
        }
        if self.object.trim().is_empty() {
            return Err(CandidateDefect::MissingObject);
        }
        if !self.confidence.is_finite() {
            return Err(CandidateDefect::InvalidConfidence);
        }
        Ok(())
    }
}

impl From<&Relationship> for RelationshipCandidate {
    fn from(r: &Relationship) -> Self {
        Self::new(&r.subject, &r.predicate, &r.object, r.confidence)
    }
}

/// Why a candidate record was skipped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CandidateDefect {
    MissingName,
    MissingSubject,
    MissingPredicate,
    MissingObject,
    InvalidConfidence,
}

impl std::fmt::Display for CandidateDefect {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MissingName => write!(f, "missing name"),
            Self::MissingSubject => write!(f, "missing subject"),
            Self::MissingPredicate => write!(f, "missing predicate"),
            Self::MissingObject => write!(f, "missing object"),
            Self::InvalidConfidence => write!(f, "confidence is not a finite number"),
        }
    }
}

/// One document's extraction output.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExtractionBatch {
    pub source: String,
    #[serde(default)]
    pub concepts: Vec<ConceptCandidate>,
    #[serde(default)]
    pub relationships: Vec<RelationshipCandidate>,
}

/// A JSON document holding one batch or an array of batches.
#[derive(Deserialize)]
#[serde(untagged)]
enum BatchDocument {
    Many(Vec<ExtractionBatch>),
    One(ExtractionBatch),
}

impl ExtractionBatch {
    /// Parse a JSON document holding one batch or an array of batches.
    pub fn parse_json(text: &str) -> serde_json::Result<Vec<ExtractionBatch>> {
        Ok(match serde_json::from_str(text)? {
            BatchDocument::Many(batches) => batches,
            BatchDocument::One(batch) => vec![batch],
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn allocator_is_monotonic_from_one() {
        let mut alloc = NodeIdAllocator::new();
        assert_eq!(alloc.allocate().get(), 1);
        assert_eq!(alloc.allocate().get(), 2);
        assert_eq!(alloc.peek_next(), 3);
    }

    #[test]
    fn allocator_resumes() {
        let mut alloc = NodeIdAllocator::starting_from(42);
        assert_eq!(alloc.allocate().get(), 42);
        assert_eq!(NodeIdAllocator::starting_from(0).peek_next(), 1);
    }

    #[test]
    fn metadata_merge_overwrites_and_adds() {
        let mut node = KnowledgeNode::new(NodeId::new(1).unwrap(), "Rust", "concept");
        node.metadata.insert("importance".into(), serde_json::json!(0.3));
        node.metadata.insert("lang".into(), serde_json::json!("en"));

        let mut incoming = BTreeMap::new();
        incoming.insert("importance".into(), serde_json::json!(0.9));
        incoming.insert("category".into(), serde_json::json!("language"));
        assert!(node.merge_metadata(&incoming));

        assert_eq!(node.metric("importance"), Some(0.9));
        assert_eq!(node.metadata["lang"], serde_json::json!("en"));
        assert_eq!(node.metadata["category"], serde_json::json!("language"));
        assert!(!node.merge_metadata(&incoming));
    }

    #[test]
    fn sources_are_a_set() {
        let mut node = KnowledgeNode::new(NodeId::new(1).unwrap(), "Rust", "concept");
        assert!(node.add_source("doc1"));
        assert!(!node.add_source("doc1"));
        assert!(!node.add_source(""));
        assert_eq!(node.sources.len(), 1);
    }

    #[test]
    fn relationship_candidate_validation() {
        assert!(RelationshipCandidate::new("A", "uses", "B", 0.5).validate().is_ok());
        assert_eq!(
            RelationshipCandidate::new(" ", "uses", "B", 0.5).validate(),
            Err(CandidateDefect::MissingSubject)
        );
        assert_eq!(
            RelationshipCandidate::new("A", "", "B", 0.5).validate(),
            Err(CandidateDefect::MissingPredicate)
        );
        assert_eq!(
            RelationshipCandidate::new("A", "uses", "", 0.5).validate(),
            Err(CandidateDefect::MissingObject)
        );
        assert_eq!(
            RelationshipCandidate::new("A", "uses", "B", f32::NAN).validate(),
            Err(CandidateDefect::InvalidConfidence)
        );
    }

    #[test]
    fn relationship_confidence_is_clamped() {
        assert_eq!(Relationship::new("A", "p", "B", 1.7).confidence, 1.0);
        assert_eq!(Relationship::new("A", "p", "B", -0.2).confidence, 0.0);
    }

    #[test]
    fn node_type_serializes_as_type() {
        let node = KnowledgeNode::new(NodeId::new(7).unwrap(), "Django", "framework");
        let json = serde_json::to_value(&node).unwrap();
        assert_eq!(json["type"], "framework");
        assert_eq!(json["id"], 7);
    }

    #[test]
    fn extraction_batch_defaults() {
        let batch: ExtractionBatch = serde_json::from_str(
            r#"{"source":"doc1","relationships":[{"subject":"A","predicate":"uses","object":"B"}]}"#,
        )
        .unwrap();
        assert!(batch.concepts.is_empty());
        assert_eq!(batch.relationships[0].confidence, 1.0);
    }

    #[test]
    fn batch_documents_accept_one_or_many() {
        let one = ExtractionBatch::parse_json(r#"{"source":"a","concepts":[{"name":"Rust"}]}"#).unwrap();
        assert_eq!(one.len(), 1);
        assert_eq!(one[0].concepts[0].name, "Rust");

        let many = ExtractionBatch::parse_json(r#"[{"source":"a"},{"source":"b"}]"#).unwrap();
        assert_eq!(many.len(), 2);
        assert_eq!(many[1].source, "b");

        assert!(ExtractionBatch::parse_json(r#"{"concepts":[]}"#).is_err());
    }
}
