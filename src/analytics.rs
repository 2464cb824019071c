//! Graph centrality over the store's relationship graph.
//!
//! Nodes are canonical names, edges are relationships (parallel edges kept).
//! Scores are written back into node metadata by
//! [`KnowledgeStore::attach_centrality`], where the tension detector reads
//! them for scoring.

use std::collections::{BTreeMap, HashMap};

use petgraph::algo::page_rank;
use petgraph::graph::{DiGraph, NodeIndex};
use serde::{Deserialize, Serialize};

use crate::store::KnowledgeStore;

/// Node metadata key for the PageRank score.
pub const PAGERANK_KEY: &str = "pagerank";
/// Node metadata key for normalized degree centrality.
pub const DEGREE_CENTRALITY_KEY: &str = "degree_centrality";

/// Default PageRank damping factor.
pub const DEFAULT_DAMPING: f64 = 0.85;
/// Default number of PageRank iterations.
pub const DEFAULT_ITERATIONS: usize = 50;

/// Centrality computation settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalyticsConfig {
    /// PageRank damping factor in `[0, 1]` (default: 0.85).
    #[serde(default = "default_damping")]
    pub damping: f64,
    /// PageRank iterations (default: 50).
    #[serde(default = "default_iterations")]
    pub iterations: usize,
}

fn default_damping() -> f64 {
    DEFAULT_DAMPING
}

fn default_iterations() -> usize {
    DEFAULT_ITERATIONS
}

impl Default for AnalyticsConfig {
    fn default() -> Self {
        Self {
            damping: DEFAULT_DAMPING,
            iterations: DEFAULT_ITERATIONS,
        }
    }
}

/// Centrality scores for a single node.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NodeCentrality {
    pub pagerank: f64,
    /// Total degree divided by `n - 1`.
    pub degree_centrality: f64,
}

impl NodeCentrality {
    /// The metadata entries this score contributes to a node.
    pub fn to_metadata(&self) -> BTreeMap<String, serde_json::Value> {
        BTreeMap::from([
            (PAGERANK_KEY.to_string(), serde_json::Value::from(self.pagerank)),
            (
                DEGREE_CENTRALITY_KEY.to_string(),
                serde_json::Value::from(self.degree_centrality),
            ),
        ])
    }
}

/// Centrality scores keyed by canonical name.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CentralityMetrics {
    scores: BTreeMap<String, NodeCentrality>,
}

impl CentralityMetrics {
    pub fn insert(&mut self, name: impl Into<String>, scores: NodeCentrality) {
        self.scores.insert(name.into(), scores);
    }

    pub fn get(&self, name: &str) -> Option<&NodeCentrality> {
        self.scores.get(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &NodeCentrality)> {
        self.scores.iter()
    }

    pub fn len(&self) -> usize {
        self.scores.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scores.is_empty()
    }

    /// The `n` highest-PageRank nodes, score desc.
    pub fn top_by_pagerank(&self, n: usize) -> Vec<(&str, &NodeCentrality)> {
        let mut ranked: Vec<(&str, &NodeCentrality)> =
            self.scores.iter().map(|(k, v)| (k.as_str(), v)).collect();
        ranked.sort_by(|a, b| {
            b.1.pagerank
                .partial_cmp(&a.1.pagerank)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        ranked.truncate(n);
        ranked
    }
}

/// Build the relationship graph of a store.
fn build_graph(store: &KnowledgeStore) -> (DiGraph<String, ()>, HashMap<String, NodeIndex>) {
    let mut graph = DiGraph::new();
    let mut indices: HashMap<String, NodeIndex> = HashMap::new();
    for node in store.nodes() {
        let idx = graph.add_node(node.canonical_name.clone());
        indices.insert(node.canonical_name.clone(), idx);
    }
    for rel in store.relationships() {
        if let (Some(&s), Some(&o)) = (indices.get(&rel.subject), indices.get(&rel.object)) {
            graph.add_edge(s, o, ());
        }
    }
    (graph, indices)
}

/// Compute PageRank and normalized degree centrality for every node.
///
/// `damping` is clamped to `[0, 1]`. An empty store yields empty metrics.
pub fn compute_centrality(store: &KnowledgeStore, damping: f64, iterations: usize) -> CentralityMetrics {
    let (graph, indices) = build_graph(store);
    let mut metrics = CentralityMetrics::default();
    if graph.node_count() == 0 {
        return metrics;
    }

    let damping = if damping.is_finite() {
        damping.clamp(0.0, 1.0)
    } else {
        DEFAULT_DAMPING
    };
    let ranks = page_rank(&graph, damping, iterations);

    let denominator = (graph.node_count() - 1) as f64;
    for (name, idx) in &indices {
        let in_degree = graph.edges_directed(*idx, petgraph::Direction::Incoming).count();
        let out_degree = graph.edges_directed(*idx, petgraph::Direction::Outgoing).count();
        let degree_centrality = if denominator > 0.0 {
            (in_degree + out_degree) as f64 / denominator
        } else {
            0.0
        };
        metrics.insert(
            name.clone(),
            NodeCentrality {
                pagerank: ranks[idx.index()],
                degree_centrality,
            },
        );
    }

    tracing::debug!(
        nodes = graph.node_count(),
        edges = graph.edge_count(),
        iterations,
        "computed centrality"
    );
    metrics
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::RelationshipCandidate;

    fn star_store() -> KnowledgeStore {
        // Hub points at four spokes.
        let mut store = KnowledgeStore::default();
        let rels: Vec<RelationshipCandidate> = ["North", "South", "East", "West"]
            .iter()
            .map(|spoke| RelationshipCandidate::new("Hub", "links", *spoke, 1.0))
            .collect();
        store.add_extraction(&[], &rels, "map").unwrap();
        store
    }

    #[test]
    fn degree_centrality_hub_highest() {
        let metrics = compute_centrality(&star_store(), DEFAULT_DAMPING, 20);
        assert_eq!(metrics.len(), 5);
        assert_eq!(metrics.get("Hub").unwrap().degree_centrality, 1.0);
        assert_eq!(metrics.get("North").unwrap().degree_centrality, 0.25);
    }

    #[test]
    fn pagerank_favors_pointed_to_nodes() {
        let metrics = compute_centrality(&star_store(), DEFAULT_DAMPING, 20);
        let hub = metrics.get("Hub").unwrap().pagerank;
        let spoke = metrics.get("West").unwrap().pagerank;
        assert!(hub > 0.0);
        assert!(spoke > hub);
        assert_eq!(metrics.top_by_pagerank(1).len(), 1);
    }

    #[test]
    fn empty_store_has_no_metrics() {
        let metrics = compute_centrality(&KnowledgeStore::default(), DEFAULT_DAMPING, 20);
        assert!(metrics.is_empty());
    }

    #[test]
    fn single_node_has_zero_degree_centrality() {
        let mut store = KnowledgeStore::default();
        store
            .add_extraction(&[crate::model::ConceptCandidate::new("Alone")], &[], "doc")
            .unwrap();
        let metrics = compute_centrality(&store, 2.0, 10);
        assert_eq!(metrics.get("Alone").unwrap().degree_centrality, 0.0);
    }

    #[test]
    fn metadata_keys() {
        let meta = NodeCentrality {
            pagerank: 0.5,
            degree_centrality: 0.25,
        }
        .to_metadata();
        assert_eq!(meta[PAGERANK_KEY], serde_json::json!(0.5));
        assert_eq!(meta[DEGREE_CENTRALITY_KEY], serde_json::json!(0.25));
    }
}
