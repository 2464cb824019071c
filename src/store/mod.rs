//! The knowledge store: canonical nodes and deduplicated relationships.
//!
//! Every name that enters the store goes through the [`EntityResolver`]
//! first, so nodes are keyed by canonical name and relationships are
//! deduplicated on their resolved `(subject, predicate, object)` signature.
//!
//! Primary data lives in an id-keyed node map and an append-only relationship
//! list. Relationships reference their endpoints by canonical name, never by
//! pointer. Lookup indices ([`index::StoreIndex`]) are derived from the
//! primary data and rebuilt on every load.
//!
//! With a data directory, every mutating call persists the whole store and
//! the resolver state in one redb transaction (see [`durable::DurableStore`]).

pub mod durable;
pub mod index;
pub mod snapshot;

use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::path::PathBuf;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::analytics::CentralityMetrics;
use crate::error::StoreError;
use crate::infer::InferenceEngine;
use crate::model::{
    ConceptCandidate, DEFAULT_CONCEPT_TYPE, ExtractionBatch, KnowledgeNode, NodeId,
    NodeIdAllocator, PLACEHOLDER_TYPE, Relationship, RelationshipCandidate, Signature,
};
use crate::resolve::{DEFAULT_FUZZY_THRESHOLD, EntityResolver, RESOLVER_STATE_KEY};

use self::durable::DurableStore;
use self::index::StoreIndex;
use self::snapshot::{STORE_SNAPSHOT_KEY, StoreSnapshot};

/// Result type for store operations.
pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Configuration for opening a [`KnowledgeStore`].
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// Data directory for persistence. `None` for memory-only mode.
    pub data_dir: Option<PathBuf>,
    /// Minimum fuzzy score (0–100) the resolver accepts.
    pub fuzzy_threshold: u8,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            data_dir: None,
            fuzzy_threshold: DEFAULT_FUZZY_THRESHOLD,
        }
    }
}

// ---------------------------------------------------------------------------
// Reports
// ---------------------------------------------------------------------------

/// Result of ingesting one document's extraction output.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractionOutcome {
    /// Nodes created, including placeholder endpoint nodes.
    pub nodes_added: usize,
    /// Existing nodes that gained a source, metadata, definition, or type.
    pub nodes_updated: usize,
    pub relationships_added: usize,
    pub total_nodes: usize,
    pub total_relationships: usize,
    /// Candidate records skipped as malformed.
    pub rejected: usize,
}

/// Result of [`KnowledgeStore::run_inference`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InferenceReport {
    /// Relationships the engine derived.
    pub derived: usize,
    /// Derived relationships that were new to the store after resolution.
    pub added: usize,
    pub iterations: usize,
    pub reached_fixpoint: bool,
    pub rule_stats: BTreeMap<String, usize>,
    /// The relationships actually added, in insertion order.
    pub relationships: Vec<Relationship>,
}

/// Aggregate counts over the store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoreStatistics {
    pub total_nodes: usize,
    pub total_relationships: usize,
    pub inferred_relationships: usize,
    /// Processed source identifiers.
    pub total_sources: usize,
    pub node_types: BTreeMap<String, usize>,
    pub avg_relationships_per_node: f64,
}

/// What happened to a node during a concept merge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Upsert {
    Created,
    Updated,
    Unchanged,
}

/// What happened during one relationship insertion.
#[derive(Debug, Clone, Copy, Default)]
struct Insertion {
    added: bool,
    nodes_created: usize,
}

// ---------------------------------------------------------------------------
// Store
// ---------------------------------------------------------------------------

/// Canonical-node knowledge store with resolver-backed deduplication.
pub struct KnowledgeStore {
    nodes: BTreeMap<NodeId, KnowledgeNode>,
    relationships: Vec<Relationship>,
    signatures: HashSet<Signature>,
    processed_sources: BTreeSet<String>,
    allocator: NodeIdAllocator,
    index: StoreIndex,
    resolver: EntityResolver,
    durable: Option<Arc<DurableStore>>,
}

impl KnowledgeStore {
    /// Open a store, loading persisted state from `data_dir` when set.
    ///
    /// A snapshot that cannot be decoded or violates the store's invariants
    /// is an error: the data is left untouched on disk.
    pub fn open(config: &StoreConfig) -> StoreResult<Self> {
        let Some(data_dir) = &config.data_dir else {
            return Ok(Self::memory_only(config.fuzzy_threshold));
        };

        let durable = Arc::new(DurableStore::open(data_dir)?);
        if durable.is_empty()? {
            tracing::info!(data_dir = %data_dir.display(), "initializing new knowledge store");
        }
        let snapshot = match durable.get(STORE_SNAPSHOT_KEY)? {
            Some(bytes) => StoreSnapshot::from_bytes(&bytes)?,
            None => StoreSnapshot::default(),
        };
        let resolver = EntityResolver::load(Arc::clone(&durable), config.fuzzy_threshold);

        let mut store = Self::from_snapshot(snapshot, resolver)?;
        store.durable = Some(durable);

        tracing::info!(
            data_dir = %data_dir.display(),
            nodes = store.nodes.len(),
            relationships = store.relationships.len(),
            sources = store.processed_sources.len(),
            "opened knowledge store"
        );
        Ok(store)
    }

    /// Create an empty store with no persistence.
    pub fn memory_only(fuzzy_threshold: u8) -> Self {
        Self {
            nodes: BTreeMap::new(),
            relationships: Vec::new(),
            signatures: HashSet::new(),
            processed_sources: BTreeSet::new(),
            allocator: NodeIdAllocator::new(),
            index: StoreIndex::new(),
            resolver: EntityResolver::new(fuzzy_threshold),
            durable: None,
        }
    }

    /// Rebuild a store from its primary data, validating invariants.
    ///
    /// The returned store has no durable backend.
    pub fn from_snapshot(snapshot: StoreSnapshot, mut resolver: EntityResolver) -> StoreResult<Self> {
        let mut nodes = BTreeMap::new();
        let mut names: HashSet<String> = HashSet::new();
        for node in snapshot.nodes {
            if !names.insert(node.canonical_name.clone()) {
                return Err(corrupt(format!(
                    "duplicate canonical name {:?}",
                    node.canonical_name
                )));
            }
            if nodes.contains_key(&node.id) {
                return Err(corrupt(format!("duplicate node id {}", node.id)));
            }
            nodes.insert(node.id, node);
        }

        let mut signatures = HashSet::with_capacity(snapshot.relationships.len());
        for rel in &snapshot.relationships {
            for endpoint in [&rel.subject, &rel.object] {
                if !names.contains(endpoint) {
                    return Err(corrupt(format!(
                        "relationship endpoint {endpoint:?} has no node"
                    )));
                }
            }
            if !signatures.insert(rel.signature()) {
                return Err(corrupt(format!(
                    "duplicate relationship {} -{}-> {}",
                    rel.subject, rel.predicate, rel.object
                )));
            }
        }

        let max_id = nodes.keys().next_back().map_or(0, |id| id.get());
        let next_id = if snapshot.next_id <= max_id {
            tracing::warn!(
                persisted = snapshot.next_id,
                max_id,
                "persisted id counter is behind existing nodes, advancing it"
            );
            max_id + 1
        } else {
            snapshot.next_id
        };

        // Node names must resolve exactly. A degraded resolver starts empty
        // and needs all of them back.
        let missing: Vec<String> = names
            .into_iter()
            .filter(|name| !resolver.is_canonical(name))
            .collect();
        if !missing.is_empty() {
            tracing::debug!(count = missing.len(), "seeding resolver from node names");
            for name in missing {
                resolver.register_canonical(name);
            }
        }

        let index = StoreIndex::rebuild(&nodes, &snapshot.relationships);
        Ok(Self {
            nodes,
            relationships: snapshot.relationships,
            signatures,
            processed_sources: snapshot.processed_sources,
            allocator: NodeIdAllocator::starting_from(next_id),
            index,
            resolver,
            durable: None,
        })
    }

    // -----------------------------------------------------------------------
    // Ingestion
    // -----------------------------------------------------------------------

    /// Merge one document's extraction output into the store.
    ///
    /// Concepts are merged first, then relationships. Malformed records are
    /// skipped and counted in [`ExtractionOutcome::rejected`]. The source is
    /// marked processed only when a node or relationship was added.
    pub fn add_extraction(
        &mut self,
        concepts: &[ConceptCandidate],
        relationships: &[RelationshipCandidate],
        source: &str,
    ) -> StoreResult<ExtractionOutcome> {
        let source = source.trim();
        let mut outcome = ExtractionOutcome::default();
        let mut changed = false;

        for concept in concepts {
            if let Err(defect) = concept.validate() {
                tracing::warn!(source, %defect, "skipping concept candidate");
                outcome.rejected += 1;
                continue;
            }
            match self.merge_concept(concept, source) {
                Upsert::Created => outcome.nodes_added += 1,
                Upsert::Updated => outcome.nodes_updated += 1,
                Upsert::Unchanged => continue,
            }
            changed = true;
        }

        for candidate in relationships {
            if let Err(defect) = candidate.validate() {
                tracing::warn!(source, %defect, "skipping relationship candidate");
                outcome.rejected += 1;
                continue;
            }
            let subject = self.resolve_name(&candidate.subject);
            let object = self.resolve_name(&candidate.object);
            let mut rel = Relationship::new(
                subject,
                candidate.predicate.trim(),
                object,
                candidate.confidence,
            );
            if !source.is_empty() {
                rel = rel.with_source(source);
            }
            let insertion = self.insert_relationship(rel);
            outcome.nodes_added += insertion.nodes_created;
            if insertion.added {
                outcome.relationships_added += 1;
                changed = true;
            }
        }

        if outcome.nodes_added + outcome.relationships_added > 0 && !source.is_empty() {
            self.processed_sources.insert(source.to_string());
        }
        if changed {
            self.persist()?;
        }

        outcome.total_nodes = self.nodes.len();
        outcome.total_relationships = self.relationships.len();
        tracing::info!(
            source,
            nodes_added = outcome.nodes_added,
            nodes_updated = outcome.nodes_updated,
            relationships_added = outcome.relationships_added,
            rejected = outcome.rejected,
            total_nodes = outcome.total_nodes,
            total_relationships = outcome.total_relationships,
            "ingested extraction"
        );
        Ok(outcome)
    }

    /// Ingest an [`ExtractionBatch`].
    pub fn ingest_batch(&mut self, batch: &ExtractionBatch) -> StoreResult<ExtractionOutcome> {
        self.add_extraction(&batch.concepts, &batch.relationships, &batch.source)
    }

    /// Feed relationships (typically derived ones) through resolution and
    /// dedup. Returns how many were added.
    ///
    /// Source and lineage are kept as given. No source is marked processed.
    pub fn merge_relationships(&mut self, relationships: &[Relationship]) -> StoreResult<usize> {
        let mut added = 0usize;
        let mut changed = false;
        for rel in relationships {
            if let Err(defect) = RelationshipCandidate::from(rel).validate() {
                tracing::warn!(%defect, "skipping relationship during merge");
                continue;
            }
            let resolved = Relationship {
                subject: self.resolve_name(&rel.subject),
                predicate: rel.predicate.trim().to_string(),
                object: self.resolve_name(&rel.object),
                ..rel.clone()
            };
            let insertion = self.insert_relationship(resolved);
            if insertion.added {
                added += 1;
            }
            changed |= insertion.added || insertion.nodes_created > 0;
        }
        if changed {
            self.persist()?;
        }
        Ok(added)
    }

    /// Run the engine over the current relationships and merge the result.
    pub fn run_inference(
        &mut self,
        engine: &mut InferenceEngine,
        max_iterations: usize,
    ) -> StoreResult<InferenceReport> {
        let outcome = engine.run(&self.relationships, max_iterations);
        let before = self.relationships.len();
        let added = self.merge_relationships(&outcome.derived)?;

        let report = InferenceReport {
            derived: outcome.derived.len(),
            added,
            iterations: outcome.iterations,
            reached_fixpoint: outcome.reached_fixpoint,
            rule_stats: outcome.rule_stats,
            relationships: self.relationships[before..].to_vec(),
        };
        tracing::info!(
            derived = report.derived,
            added = report.added,
            iterations = report.iterations,
            fixpoint = report.reached_fixpoint,
            "inference merged into store"
        );
        Ok(report)
    }

    /// Write centrality scores into node metadata (`pagerank`,
    /// `degree_centrality`). Returns how many nodes changed.
    pub fn attach_centrality(&mut self, metrics: &CentralityMetrics) -> StoreResult<usize> {
        let mut updated = 0usize;
        for (name, scores) in metrics.iter() {
            let Some(id) = self.index.id_of(name) else {
                continue;
            };
            let Some(node) = self.nodes.get_mut(&id) else {
                continue;
            };
            if node.merge_metadata(&scores.to_metadata()) {
                updated += 1;
            }
        }
        if updated > 0 {
            self.persist()?;
        }
        tracing::debug!(updated, "attached centrality metrics");
        Ok(updated)
    }

    fn resolve_name(&mut self, raw: &str) -> String {
        self.resolver.resolve(raw.trim()).canonical
    }

    fn merge_concept(&mut self, concept: &ConceptCandidate, source: &str) -> Upsert {
        let canonical = self.resolve_name(&concept.name);
        let category = concept.category.trim();
        let description = concept.description.trim();

        let mut metadata = BTreeMap::new();
        if let Some(importance) = concept.importance.filter(|i| i.is_finite()) {
            metadata.insert(
                "importance".to_string(),
                serde_json::Value::from(f64::from(importance)),
            );
        }

        if let Some(id) = self.index.id_of(&canonical) {
            let Some(node) = self.nodes.get_mut(&id) else {
                return Upsert::Unchanged;
            };
            let mut changed = node.merge_metadata(&metadata);
            if node.add_source(source) {
                self.index.add_node_source(id, source);
                changed = true;
            }
            if node.definition.is_empty() && !description.is_empty() {
                node.definition = description.to_string();
                changed = true;
            }
            // Placeholders created from relationship endpoints take the first
            // real category they are given.
            if node.node_type == PLACEHOLDER_TYPE && !category.is_empty() && category != PLACEHOLDER_TYPE {
                let old = std::mem::replace(&mut node.node_type, category.to_string());
                self.index.retag_node(id, &old, category);
                changed = true;
            }
            return if changed {
                Upsert::Updated
            } else {
                Upsert::Unchanged
            };
        }

        let node_type = if category.is_empty() {
            DEFAULT_CONCEPT_TYPE
        } else {
            category
        };
        let mut node = KnowledgeNode::new(self.allocator.allocate(), canonical, node_type);
        node.definition = description.to_string();
        node.metadata = metadata;
        node.add_source(source);
        self.insert_node(node);
        Upsert::Created
    }

    /// Insert an already-resolved relationship unless its signature exists.
    fn insert_relationship(&mut self, rel: Relationship) -> Insertion {
        let signature = rel.signature();
        if self.signatures.contains(&signature) {
            return Insertion::default();
        }

        let mut nodes_created = 0;
        for name in [&rel.subject, &rel.object] {
            if self.ensure_node(name) {
                nodes_created += 1;
            }
        }
        if !rel.is_inferred() {
            if let Some(source) = rel.source.as_deref() {
                self.add_node_source(&rel.subject, source);
                self.add_node_source(&rel.object, source);
            }
        }

        self.index.insert_relationship(self.relationships.len(), &rel);
        self.signatures.insert(signature);
        self.relationships.push(rel);
        Insertion {
            added: true,
            nodes_created,
        }
    }

    /// Create a placeholder node for `name` if none exists.
    fn ensure_node(&mut self, name: &str) -> bool {
        if self.index.id_of(name).is_some() {
            return false;
        }
        let node = KnowledgeNode::new(self.allocator.allocate(), name, PLACEHOLDER_TYPE);
        self.insert_node(node);
        true
    }

    /// Every node name is a canonical resolver entity, including names
    /// reached through abbreviation expansion.
    fn insert_node(&mut self, node: KnowledgeNode) {
        self.resolver.register_canonical(node.canonical_name.clone());
        self.index.insert_node(&node);
        self.nodes.insert(node.id, node);
    }

    fn add_node_source(&mut self, name: &str, source: &str) {
        let Some(id) = self.index.id_of(name) else {
            return;
        };
        if let Some(node) = self.nodes.get_mut(&id) {
            if node.add_source(source) {
                self.index.add_node_source(id, source);
            }
        }
    }

    // -----------------------------------------------------------------------
    // Queries
    // -----------------------------------------------------------------------

    /// Look up a node, resolving the name first.
    ///
    /// Resolution here never changes resolver state.
    pub fn get_node_by_name(&self, name: &str) -> Option<&KnowledgeNode> {
        let canonical = self.peek_canonical(name)?;
        self.index.id_of(&canonical).and_then(|id| self.nodes.get(&id))
    }

    pub fn get_node(&self, id: NodeId) -> Option<&KnowledgeNode> {
        self.nodes.get(&id)
    }

    /// Nodes with the given type tag, in insertion order.
    pub fn get_nodes_by_type(&self, node_type: &str) -> Vec<&KnowledgeNode> {
        self.index
            .ids_of_type(node_type)
            .iter()
            .filter_map(|id| self.nodes.get(id))
            .collect()
    }

    /// Nodes that list `source` among their sources.
    pub fn get_nodes_by_source(&self, source: &str) -> Vec<&KnowledgeNode> {
        self.index
            .ids_from_source(source)
            .iter()
            .filter_map(|id| self.nodes.get(id))
            .collect()
    }

    /// Relationships where the node is subject or object, in insertion order.
    pub fn get_relationships_for_node(&self, name: &str) -> Vec<&Relationship> {
        let Some(canonical) = self.peek_canonical(name) else {
            return Vec::new();
        };
        let positions: BTreeSet<usize> = self
            .index
            .outgoing(&canonical)
            .iter()
            .chain(self.index.incoming(&canonical))
            .copied()
            .collect();
        positions
            .into_iter()
            .filter_map(|pos| self.relationships.get(pos))
            .collect()
    }

    pub fn is_source_processed(&self, source: &str) -> bool {
        self.processed_sources.contains(source.trim())
    }

    pub fn get_statistics(&self) -> StoreStatistics {
        let total_nodes = self.nodes.len();
        let total_relationships = self.relationships.len();
        let avg_relationships_per_node = if total_nodes == 0 {
            0.0
        } else {
            total_relationships as f64 / total_nodes as f64
        };
        StoreStatistics {
            total_nodes,
            total_relationships,
            inferred_relationships: self.relationships.iter().filter(|r| r.is_inferred()).count(),
            total_sources: self.processed_sources.len(),
            node_types: self.index.type_counts(),
            avg_relationships_per_node,
        }
    }

    /// All nodes in id order.
    pub fn nodes(&self) -> impl Iterator<Item = &KnowledgeNode> {
        self.nodes.values()
    }

    /// All relationships in insertion order.
    pub fn relationships(&self) -> &[Relationship] {
        &self.relationships
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn relationship_count(&self) -> usize {
        self.relationships.len()
    }

    pub fn processed_sources(&self) -> &BTreeSet<String> {
        &self.processed_sources
    }

    pub fn resolver(&self) -> &EntityResolver {
        &self.resolver
    }

    pub fn resolver_mut(&mut self) -> &mut EntityResolver {
        &mut self.resolver
    }

    /// Whether mutations are written to disk.
    pub fn is_persistent(&self) -> bool {
        self.durable.is_some()
    }

    fn peek_canonical(&self, name: &str) -> Option<String> {
        let name = name.trim();
        if name.is_empty() {
            return None;
        }
        Some(self.resolver.peek(name).canonical)
    }

    // -----------------------------------------------------------------------
    // Persistence
    // -----------------------------------------------------------------------

    /// Copy the primary data into its persisted shape.
    pub fn snapshot(&self) -> StoreSnapshot {
        StoreSnapshot {
            nodes: self.nodes.values().cloned().collect(),
            relationships: self.relationships.clone(),
            processed_sources: self.processed_sources.clone(),
            next_id: self.allocator.peek_next(),
        }
    }

    /// Write the store and the resolver state in one transaction.
    ///
    /// A no-op for memory-only stores.
    pub fn persist(&self) -> StoreResult<()> {
        let Some(durable) = &self.durable else {
            return Ok(());
        };
        let store_bytes = self.snapshot().to_bytes()?;
        let resolver_bytes = self.resolver.encode_state()?;
        durable.put_many(&[
            (STORE_SNAPSHOT_KEY, store_bytes.as_slice()),
            (RESOLVER_STATE_KEY, resolver_bytes.as_slice()),
        ])?;
        tracing::debug!(
            store_bytes = store_bytes.len(),
            resolver_bytes = resolver_bytes.len(),
            "persisted knowledge store"
        );
        Ok(())
    }
}

impl Default for KnowledgeStore {
    fn default() -> Self {
        Self::memory_only(DEFAULT_FUZZY_THRESHOLD)
    }
}

impl std::fmt::Debug for KnowledgeStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KnowledgeStore")
            .field("nodes", &self.nodes.len())
            .field("relationships", &self.relationships.len())
            .field("processed_sources", &self.processed_sources.len())
            .field("persistent", &self.durable.is_some())
            .finish()
    }
}

fn corrupt(message: String) -> StoreError {
    StoreError::CorruptSnapshot { message }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analytics::NodeCentrality;

    fn concept(name: &str, category: &str) -> ConceptCandidate {
        ConceptCandidate::new(name).with_category(category)
    }

    fn rel(s: &str, p: &str, o: &str, c: f32) -> RelationshipCandidate {
        RelationshipCandidate::new(s, p, o, c)
    }

    #[test]
    fn concepts_become_typed_nodes() {
        let mut store = KnowledgeStore::default();
        let outcome = store
            .add_extraction(
                &[
                    concept("Python", "language").with_description("A programming language"),
                    ConceptCandidate::new("Recursion"),
                ],
                &[],
                "doc1",
            )
            .unwrap();
        assert_eq!(outcome.nodes_added, 2);
        assert_eq!(outcome.total_nodes, 2);

        let python = store.get_node_by_name("Python").unwrap();
        assert_eq!(python.node_type, "language");
        assert_eq!(python.definition, "A programming language");
        assert!(python.sources.contains("doc1"));
        assert_eq!(store.get_node_by_name("Recursion").unwrap().node_type, "concept");
    }

    #[test]
    fn concept_merge_unions_sources_and_overwrites_metadata() {
        let mut store = KnowledgeStore::default();
        store
            .add_extraction(&[concept("Rust", "language").with_importance(0.5)], &[], "a")
            .unwrap();
        let outcome = store
            .add_extraction(&[concept("Rust", "language").with_importance(0.75)], &[], "b")
            .unwrap();
        assert_eq!(outcome.nodes_added, 0);
        assert_eq!(outcome.nodes_updated, 1);

        let node = store.get_node_by_name("Rust").unwrap();
        assert_eq!(node.sources.len(), 2);
        assert_eq!(node.metric("importance"), Some(0.75));
        assert_eq!(store.get_nodes_by_source("b").len(), 1);
    }

    #[test]
    fn relationship_endpoints_become_placeholders() {
        let mut store = KnowledgeStore::default();
        let outcome = store
            .add_extraction(&[], &[rel("Tokio", "depends-on", "Mio", 0.8)], "doc")
            .unwrap();
        assert_eq!(outcome.nodes_added, 2);
        assert_eq!(outcome.relationships_added, 1);
        assert_eq!(store.get_nodes_by_type(PLACEHOLDER_TYPE).len(), 2);
        assert!(store.get_node_by_name("Mio").unwrap().sources.contains("doc"));
    }

    #[test]
    fn placeholder_takes_later_category() {
        let mut store = KnowledgeStore::default();
        store
            .add_extraction(&[], &[rel("Serde", "used-by", "Tokio", 0.8)], "doc")
            .unwrap();
        store
            .add_extraction(&[concept("Serde", "library")], &[], "doc2")
            .unwrap();
        assert_eq!(store.get_node_by_name("Serde").unwrap().node_type, "library");
        assert_eq!(store.get_nodes_by_type(PLACEHOLDER_TYPE).len(), 1);
        assert_eq!(store.get_nodes_by_type("library").len(), 1);
    }

    #[test]
    fn duplicate_relationship_is_skipped() {
        let mut store = KnowledgeStore::default();
        let r = [rel("Python", "powers", "Django", 0.9)];
        assert_eq!(store.add_extraction(&[], &r, "doc1").unwrap().relationships_added, 1);
        let second = store.add_extraction(&[], &r, "doc1").unwrap();
        assert_eq!(second.relationships_added, 0);
        assert_eq!(second.total_relationships, 1);
    }

    #[test]
    fn dedup_uses_resolved_names() {
        let mut store = KnowledgeStore::default();
        store
            .add_extraction(&[], &[rel("OpenAI", "created", "ChatGPT", 0.9)], "a")
            .unwrap();
        let outcome = store
            .add_extraction(&[], &[rel("openai", "created", "chat gpt", 0.7)], "b")
            .unwrap();
        assert_eq!(outcome.relationships_added, 0);
        assert_eq!(store.relationship_count(), 1);
    }

    #[test]
    fn malformed_candidates_are_rejected_individually() {
        let mut store = KnowledgeStore::default();
        let outcome = store
            .add_extraction(
                &[ConceptCandidate::new("  ")],
                &[
                    rel("A", "", "B", 0.5),
                    rel("A", "likes", "B", f32::NAN),
                    rel("A", "likes", "B", 0.5),
                ],
                "doc",
            )
            .unwrap();
        assert_eq!(outcome.rejected, 3);
        assert_eq!(outcome.relationships_added, 1);
    }

    #[test]
    fn source_marked_only_when_something_added() {
        let mut store = KnowledgeStore::default();
        store.add_extraction(&[], &[], "empty").unwrap();
        assert!(!store.is_source_processed("empty"));

        store
            .add_extraction(&[], &[rel("A", "likes", "B", 0.5)], "doc")
            .unwrap();
        assert!(store.is_source_processed("doc"));

        // Only duplicates: nothing added.
        store
            .add_extraction(&[], &[rel("A", "likes", "B", 0.5)], "dup")
            .unwrap();
        assert!(!store.is_source_processed("dup"));
    }

    #[test]
    fn relationships_for_node_is_union_of_both_sides() {
        let mut store = KnowledgeStore::default();
        store
            .add_extraction(
                &[],
                &[
                    rel("A", "uses", "B", 0.5),
                    rel("B", "uses", "C", 0.5),
                    rel("D", "likes", "E", 0.5),
                    rel("B", "mirrors", "B", 0.5),
                ],
                "doc",
            )
            .unwrap();
        let edges = store.get_relationships_for_node("B");
        assert_eq!(edges.len(), 3);
        assert!(store.get_relationships_for_node("Z").is_empty());
        assert!(store.get_relationships_for_node("").is_empty());
    }

    #[test]
    fn queries_do_not_grow_the_vocabulary() {
        let mut store = KnowledgeStore::default();
        store.add_extraction(&[concept("Rust", "language")], &[], "doc").unwrap();
        let before = store.resolver().state().clone();
        assert!(store.get_node_by_name("Haskell").is_none());
        assert!(store.get_node_by_name("rust").is_some());
        assert_eq!(store.resolver().state(), &before);
    }

    #[test]
    fn statistics() {
        let mut store = KnowledgeStore::default();
        assert_eq!(store.get_statistics().avg_relationships_per_node, 0.0);
        store
            .add_extraction(
                &[concept("A", "letter")],
                &[rel("A", "precedes", "B", 1.0), rel("B", "precedes", "C", 1.0)],
                "alphabet",
            )
            .unwrap();
        let stats = store.get_statistics();
        assert_eq!(stats.total_nodes, 3);
        assert_eq!(stats.total_relationships, 2);
        assert_eq!(stats.total_sources, 1);
        assert_eq!(stats.node_types.get("letter"), Some(&1));
        assert_eq!(stats.node_types.get(PLACEHOLDER_TYPE), Some(&2));
        assert!((stats.avg_relationships_per_node - 2.0 / 3.0).abs() < 1e-9);

        let value = serde_json::to_value(&stats).unwrap();
        assert_eq!(value["total_relationships"], 2);
    }

    #[test]
    fn run_inference_merges_derived() {
        let mut store = KnowledgeStore::default();
        store
            .add_extraction(&[], &[rel("Alice", "parent-of", "Bob", 0.7)], "doc")
            .unwrap();
        let mut engine = InferenceEngine::default();
        let report = store.run_inference(&mut engine, 3).unwrap();
        assert_eq!(report.added, 1);
        assert_eq!(report.relationships[0].predicate, "child-of");
        assert_eq!(store.get_statistics().inferred_relationships, 1);
        // Inferred edges do not spread the "inferred" marker into node sources.
        assert!(store.get_nodes_by_source("inferred").is_empty());

        let again = store.run_inference(&mut engine, 3).unwrap();
        assert_eq!(again.added, 0);
    }

    #[test]
    fn merge_relationships_dedups_against_existing() {
        let mut store = KnowledgeStore::default();
        store
            .add_extraction(&[], &[rel("X", "similar-to", "Y", 0.5)], "doc")
            .unwrap();
        let added = store
            .merge_relationships(&[
                Relationship::new("X", "similar-to", "Y", 0.5),
                Relationship::new("Y", "similar-to", "X", 0.5),
            ])
            .unwrap();
        assert_eq!(added, 1);
        assert!(!store.is_source_processed("inferred"));
    }

    #[test]
    fn attach_centrality_writes_metadata() {
        let mut store = KnowledgeStore::default();
        store
            .add_extraction(&[], &[rel("Hub", "links", "Spoke", 1.0)], "doc")
            .unwrap();
        let mut metrics = CentralityMetrics::default();
        metrics.insert(
            "Hub",
            NodeCentrality {
                pagerank: 0.4,
                degree_centrality: 1.0,
            },
        );
        metrics.insert(
            "Missing",
            NodeCentrality {
                pagerank: 0.1,
                degree_centrality: 0.0,
            },
        );
        assert_eq!(store.attach_centrality(&metrics).unwrap(), 1);
        let hub = store.get_node_by_name("Hub").unwrap();
        assert_eq!(hub.metric("pagerank"), Some(0.4));
        assert_eq!(hub.metric("degree_centrality"), Some(1.0));
    }

    #[test]
    fn snapshot_round_trips_through_from_snapshot() {
        let mut store = KnowledgeStore::default();
        store
            .add_extraction(
                &[concept("Python", "language")],
                &[rel("Python", "powers", "Django", 0.9)],
                "doc1",
            )
            .unwrap();
        let snapshot = store.snapshot();
        let resolver = EntityResolver::from_state(store.resolver().state().clone(), 80);
        let restored = KnowledgeStore::from_snapshot(snapshot.clone(), resolver).unwrap();
        assert_eq!(restored.snapshot(), snapshot);
        assert_eq!(restored.get_relationships_for_node("Django").len(), 1);
        assert!(restored.is_source_processed("doc1"));
    }

    #[test]
    fn snapshot_with_duplicate_names_is_corrupt() {
        let a = KnowledgeNode::new(NodeId::new(1).unwrap(), "A", "entity");
        let b = KnowledgeNode::new(NodeId::new(2).unwrap(), "A", "entity");
        let snapshot = StoreSnapshot {
            nodes: vec![a, b],
            next_id: 3,
            ..Default::default()
        };
        let err = KnowledgeStore::from_snapshot(snapshot, EntityResolver::default()).unwrap_err();
        assert!(matches!(err, StoreError::CorruptSnapshot { .. }));
    }

    #[test]
    fn snapshot_with_dangling_endpoint_is_corrupt() {
        let snapshot = StoreSnapshot {
            nodes: vec![KnowledgeNode::new(NodeId::new(1).unwrap(), "A", "entity")],
            relationships: vec![Relationship::new("A", "likes", "Ghost", 0.5)],
            next_id: 2,
            ..Default::default()
        };
        let err = KnowledgeStore::from_snapshot(snapshot, EntityResolver::default()).unwrap_err();
        assert!(matches!(err, StoreError::CorruptSnapshot { .. }));
    }

    #[test]
    fn lagging_id_counter_is_advanced() {
        let snapshot = StoreSnapshot {
            nodes: vec![KnowledgeNode::new(NodeId::new(5).unwrap(), "A", "entity")],
            next_id: 2,
            ..Default::default()
        };
        let mut store = KnowledgeStore::from_snapshot(snapshot, EntityResolver::default()).unwrap();
        assert!(store.resolver().is_canonical("A"));
        store
            .add_extraction(&[ConceptCandidate::new("B")], &[], "doc")
            .unwrap();
        assert_eq!(store.get_node_by_name("B").unwrap().id.get(), 6);
    }

    #[test]
    fn abbreviation_expansions_own_their_node() {
        let mut store = KnowledgeStore::default();
        store
            .add_extraction(&[], &[rel("API", "uses", "HTTP", 0.9)], "d1")
            .unwrap();
        assert!(store.resolver().is_canonical("Application Programming Interface"));

        // The plural lands on the expanded node instead of creating a second one.
        let outcome = store
            .add_extraction(
                &[ConceptCandidate::new("Application Programming Interfaces")],
                &[],
                "d2",
            )
            .unwrap();
        assert_eq!(outcome.nodes_added, 0);
        assert_eq!(store.node_count(), 2);

        let api = store
            .get_node_by_name("Application Programming Interface")
            .unwrap();
        assert_eq!(api.canonical_name, "Application Programming Interface");
        assert!(api.sources.contains("d2"));

        let mut engine = InferenceEngine::default();
        let report = store.run_inference(&mut engine, 3).unwrap();
        assert_eq!(report.added, 1);
        let used_by = &report.relationships[0];
        assert_eq!(used_by.subject, "Hypertext Transfer Protocol");
        assert_eq!(used_by.predicate, "used-by");
        assert_eq!(used_by.object, "Application Programming Interface");
        assert_eq!(store.node_count(), 2);
    }

    #[test]
    fn snapshot_names_are_registered_with_a_partial_resolver() {
        let snapshot = StoreSnapshot {
            nodes: vec![
                KnowledgeNode::new(NodeId::new(1).unwrap(), "Known", "entity"),
                KnowledgeNode::new(NodeId::new(2).unwrap(), "Application Programming Interface", "entity"),
            ],
            next_id: 3,
            ..Default::default()
        };
        let mut resolver = EntityResolver::default();
        resolver.register_canonical("Known");
        let store = KnowledgeStore::from_snapshot(snapshot, resolver).unwrap();
        assert!(store.resolver().is_canonical("Application Programming Interface"));
    }
}
