//! Tension detection: contradictions between asserted relationships.
//!
//! Two strategies run over the store's relationship list:
//!
//! - **Opposing predicates**: the same `(subject, object)` pair is linked by
//!   two registered antonyms (`enables` / `prevents`).
//! - **Conflicting statements**: the same `(subject, predicate)` has
//!   different objects asserted by different sources.
//!
//! Every tension gets a productivity score. Centrality metadata on the
//! involved nodes raises it; missing metrics contribute nothing. The report
//! is sorted by score and the top entries carry node context and an
//! explanation. Detection never mutates the store.

pub mod antonyms;

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::analytics::{DEGREE_CENTRALITY_KEY, PAGERANK_KEY};
use crate::model::Relationship;
use crate::store::KnowledgeStore;

use self::antonyms::are_antonyms;

/// Default number of top tensions enriched with node context.
pub const DEFAULT_ENRICH_TOP: usize = 10;

const BASE_SCORE: f64 = 0.5;
const PER_CLAIM_SCORE: f64 = 0.2;

/// Tension detector settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TensionConfig {
    /// How many top-scored tensions get node context (default: 10).
    #[serde(default = "default_enrich_top")]
    pub enrich_top: usize,
}

fn default_enrich_top() -> usize {
    DEFAULT_ENRICH_TOP
}

impl Default for TensionConfig {
    fn default() -> Self {
        Self {
            enrich_top: DEFAULT_ENRICH_TOP,
        }
    }
}

// ---------------------------------------------------------------------------
// Report types
// ---------------------------------------------------------------------------

/// One side of an opposing-predicates tension.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OpposingSide {
    pub predicate: String,
    pub confidence: f32,
    pub source: Option<String>,
}

/// One claim in a conflicting-statements tension.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Claim {
    pub object: String,
    pub source: Option<String>,
    pub confidence: f32,
}

/// What kind of contradiction was found.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TensionKind {
    OpposingPredicates {
        subject: String,
        object: String,
        side_a: OpposingSide,
        side_b: OpposingSide,
    },
    ConflictingStatements {
        subject: String,
        predicate: String,
        claims: Vec<Claim>,
    },
}

impl TensionKind {
    /// Canonical names of every node involved, subject first.
    pub fn involved_nodes(&self) -> Vec<&str> {
        match self {
            Self::OpposingPredicates {
                subject, object, ..
            } => vec![subject.as_str(), object.as_str()],
            Self::ConflictingStatements {
                subject, claims, ..
            } => {
                let mut names = vec![subject.as_str()];
                let mut seen = BTreeSet::new();
                for claim in claims {
                    if seen.insert(claim.object.as_str()) {
                        names.push(claim.object.as_str());
                    }
                }
                names
            }
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::OpposingPredicates { .. } => "opposing_predicates",
            Self::ConflictingStatements { .. } => "conflicting_statements",
        }
    }
}

/// Context about one node involved in a tension.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeContext {
    pub name: String,
    #[serde(rename = "type")]
    pub node_type: String,
    pub definition: String,
    pub importance: Option<f64>,
}

/// Enrichment attached to top-ranked tensions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TensionContext {
    pub nodes: Vec<NodeContext>,
    /// Why resolving this tension is likely to be informative.
    pub explanation: String,
}

/// A detected tension.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tension {
    #[serde(flatten)]
    pub kind: TensionKind,
    /// The question the tension boils down to.
    pub crux: String,
    /// Heuristic importance in [0.5, 1.0].
    pub productivity_score: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<TensionContext>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TensionStatistics {
    pub opposing_predicates: usize,
    pub conflicting_statements: usize,
    /// Mean productivity score, 0 when no tensions were found.
    pub average_productivity: f64,
}

/// Full tension report.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TensionReport {
    pub tensions_found: usize,
    /// Sorted by productivity score, highest first.
    pub productive_tensions: Vec<Tension>,
    pub statistics: TensionStatistics,
}

// ---------------------------------------------------------------------------
// Detector
// ---------------------------------------------------------------------------

/// Read-only tension detector over a store.
pub struct TensionDetector<'a> {
    store: &'a KnowledgeStore,
    config: TensionConfig,
}

impl<'a> TensionDetector<'a> {
    pub fn new(store: &'a KnowledgeStore) -> Self {
        Self::with_config(store, TensionConfig::default())
    }

    pub fn with_config(store: &'a KnowledgeStore, config: TensionConfig) -> Self {
        Self { store, config }
    }

    /// Run both strategies, score, rank, and enrich.
    pub fn get_all_tensions(&self) -> TensionReport {
        let mut tensions = self.detect_opposing_predicates();
        tensions.extend(self.detect_conflicting_statements());

        tensions.sort_by(|a, b| {
            b.productivity_score
                .partial_cmp(&a.productivity_score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        for tension in tensions.iter_mut().take(self.config.enrich_top) {
            tension.context = Some(self.enrich(&tension.kind));
        }

        let statistics = TensionStatistics {
            opposing_predicates: tensions
                .iter()
                .filter(|t| matches!(t.kind, TensionKind::OpposingPredicates { .. }))
                .count(),
            conflicting_statements: tensions
                .iter()
                .filter(|t| matches!(t.kind, TensionKind::ConflictingStatements { .. }))
                .count(),
            average_productivity: if tensions.is_empty() {
                0.0
            } else {
                tensions.iter().map(|t| t.productivity_score).sum::<f64>() / tensions.len() as f64
            },
        };

        tracing::info!(
            tensions = tensions.len(),
            opposing = statistics.opposing_predicates,
            conflicting = statistics.conflicting_statements,
            "tension detection complete"
        );
        TensionReport {
            tensions_found: tensions.len(),
            productive_tensions: tensions,
            statistics,
        }
    }

    /// Antonym predicates over the same `(subject, object)` pair. Unsorted
    /// and unenriched.
    pub fn detect_opposing_predicates(&self) -> Vec<Tension> {
        let mut groups: BTreeMap<(&str, &str), Vec<&Relationship>> = BTreeMap::new();
        for rel in self.store.relationships() {
            groups
                .entry((rel.subject.as_str(), rel.object.as_str()))
                .or_default()
                .push(rel);
        }

        let mut tensions = Vec::new();
        for ((subject, object), rels) in groups {
            for (i, a) in rels.iter().enumerate() {
                for b in &rels[i + 1..] {
                    if !are_antonyms(&a.predicate, &b.predicate) {
                        continue;
                    }
                    let score = BASE_SCORE
                        + self.centrality(subject)
                        + self.centrality(object)
                        + f64::from(a.confidence.min(b.confidence));
                    tensions.push(Tension {
                        crux: format!(
                            "Whether {subject} {} or {} {object}",
                            a.predicate, b.predicate
                        ),
                        kind: TensionKind::OpposingPredicates {
                            subject: subject.to_string(),
                            object: object.to_string(),
                            side_a: side(a),
                            side_b: side(b),
                        },
                        productivity_score: score.min(1.0),
                        context: None,
                    });
                }
            }
        }
        tensions
    }

    /// Different objects for the same `(subject, predicate)` from different
    /// sources. Derived relationships are not claims and are ignored.
    pub fn detect_conflicting_statements(&self) -> Vec<Tension> {
        let mut groups: BTreeMap<(&str, &str), Vec<&Relationship>> = BTreeMap::new();
        for rel in self.store.relationships().iter().filter(|r| !r.is_inferred()) {
            groups
                .entry((rel.subject.as_str(), rel.predicate.as_str()))
                .or_default()
                .push(rel);
        }

        let mut tensions = Vec::new();
        for ((subject, predicate), rels) in groups {
            if rels.len() < 2 || !has_cross_source_conflict(&rels) {
                continue;
            }
            let claims: Vec<Claim> = rels
                .iter()
                .map(|r| Claim {
                    object: r.object.clone(),
                    source: r.source.clone(),
                    confidence: r.confidence,
                })
                .collect();
            let kind = TensionKind::ConflictingStatements {
                subject: subject.to_string(),
                predicate: predicate.to_string(),
                claims,
            };
            let centrality: f64 = kind
                .involved_nodes()
                .into_iter()
                .map(|name| self.centrality(name))
                .sum();
            let score = BASE_SCORE + centrality + PER_CLAIM_SCORE * rels.len() as f64;
            tensions.push(Tension {
                crux: format!("What {subject} actually {predicate}"),
                kind,
                productivity_score: score.min(1.0),
                context: None,
            });
        }
        tensions
    }

    /// `pagerank × 2 + degree_centrality`, 0 for unknown nodes or metrics.
    fn centrality(&self, name: &str) -> f64 {
        self.store.get_node_by_name(name).map_or(0.0, |node| {
            node.metric(PAGERANK_KEY).unwrap_or(0.0) * 2.0
                + node.metric(DEGREE_CENTRALITY_KEY).unwrap_or(0.0)
        })
    }

    fn enrich(&self, kind: &TensionKind) -> TensionContext {
        let nodes = kind
            .involved_nodes()
            .into_iter()
            .filter_map(|name| self.store.get_node_by_name(name))
            .map(|node| NodeContext {
                name: node.canonical_name.clone(),
                node_type: node.node_type.clone(),
                definition: node.definition.clone(),
                importance: node.metric("importance"),
            })
            .collect();
        TensionContext {
            nodes,
            explanation: explain(kind),
        }
    }
}

fn side(rel: &Relationship) -> OpposingSide {
    OpposingSide {
        predicate: rel.predicate.clone(),
        confidence: rel.confidence,
        source: rel.source.clone(),
    }
}

/// Some pair in the group differs in both object and (known) source.
fn has_cross_source_conflict(rels: &[&Relationship]) -> bool {
    rels.iter().enumerate().any(|(i, a)| {
        rels[i + 1..].iter().any(|b| {
            a.object != b.object
                && matches!((&a.source, &b.source), (Some(sa), Some(sb)) if sa != sb)
        })
    })
}

fn explain(kind: &TensionKind) -> String {
    match kind {
        TensionKind::OpposingPredicates {
            subject,
            object,
            side_a,
            side_b,
        } => format!(
            "Sources disagree on the direction of the effect: {subject} is said to {} \
             {object} but also to {} it. Finding the conditions under which each holds \
             is likely to sharpen the model of both entities.",
            side_a.predicate, side_b.predicate
        ),
        TensionKind::ConflictingStatements {
            subject,
            predicate,
            claims,
        } => {
            let objects: Vec<&str> = kind.involved_nodes().into_iter().skip(1).collect();
            format!(
                "{} claims from different sources disagree about what {subject} {predicate}: {}. \
                 Reconciling them may expose context-dependent truths or an error in one source.",
                claims.len(),
                objects.join(", ")
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analytics::{CentralityMetrics, NodeCentrality};
    use crate::model::{ConceptCandidate, RelationshipCandidate};

    fn ingest(store: &mut KnowledgeStore, s: &str, p: &str, o: &str, c: f32, source: &str) {
        store
            .add_extraction(&[], &[RelationshipCandidate::new(s, p, o, c)], source)
            .unwrap();
    }

    #[test]
    fn empty_store_yields_empty_report() {
        let store = KnowledgeStore::default();
        let report = TensionDetector::new(&store).get_all_tensions();
        assert_eq!(report.tensions_found, 0);
        assert!(report.productive_tensions.is_empty());
        assert_eq!(report.statistics.average_productivity, 0.0);
    }

    #[test]
    fn opposing_predicates_detected_and_capped() {
        let mut store = KnowledgeStore::default();
        ingest(&mut store, "Caffeine", "enables", "Focus", 0.8, "S1");
        ingest(&mut store, "Caffeine", "prevents", "Focus", 0.6, "S2");

        let report = TensionDetector::new(&store).get_all_tensions();
        assert_eq!(report.tensions_found, 1);
        let tension = &report.productive_tensions[0];
        assert_eq!(tension.productivity_score, 1.0);
        assert_eq!(tension.crux, "Whether Caffeine enables or prevents Focus");
        match &tension.kind {
            TensionKind::OpposingPredicates { side_a, side_b, .. } => {
                assert_eq!(side_a.source.as_deref(), Some("S1"));
                assert_eq!(side_b.confidence, 0.6);
            }
            other => panic!("unexpected kind {other:?}"),
        }
        assert_eq!(report.statistics.opposing_predicates, 1);
    }

    #[test]
    fn opposing_score_without_metrics() {
        let mut store = KnowledgeStore::default();
        ingest(&mut store, "Tariffs", "increases", "Prices", 0.3, "S1");
        ingest(&mut store, "Tariffs", "decreases", "Prices", 0.2, "S2");
        let tensions = TensionDetector::new(&store).detect_opposing_predicates();
        assert_eq!(tensions.len(), 1);
        assert!((tensions[0].productivity_score - 0.7).abs() < 1e-6);
    }

    #[test]
    fn conflicting_statements_need_distinct_sources() {
        let mut store = KnowledgeStore::default();
        ingest(&mut store, "Smoking", "causes", "Cancer", 0.9, "S1");
        ingest(&mut store, "Smoking", "causes", "Relaxation", 0.4, "S2");
        let report = TensionDetector::new(&store).get_all_tensions();
        assert_eq!(report.statistics.conflicting_statements, 1);
        let tension = &report.productive_tensions[0];
        assert_eq!(tension.crux, "What Smoking actually causes");
        // 0.5 + 0.2 × 2
        assert!((tension.productivity_score - 0.9).abs() < 1e-9);

        let mut same_source = KnowledgeStore::default();
        ingest(&mut same_source, "Smoking", "causes", "Cancer", 0.9, "S1");
        ingest(&mut same_source, "Smoking", "causes", "Relaxation", 0.4, "S1");
        assert!(TensionDetector::new(&same_source)
            .detect_conflicting_statements()
            .is_empty());
    }

    #[test]
    fn centrality_raises_score() {
        let mut store = KnowledgeStore::default();
        ingest(&mut store, "Rain", "increases", "Yield", 0.1, "S1");
        ingest(&mut store, "Rain", "decreases", "Yield", 0.1, "S2");
        let mut metrics = CentralityMetrics::default();
        metrics.insert(
            "Rain",
            NodeCentrality {
                pagerank: 0.05,
                degree_centrality: 0.1,
            },
        );
        store.attach_centrality(&metrics).unwrap();
        let tensions = TensionDetector::new(&store).detect_opposing_predicates();
        // 0.5 + (0.05 × 2 + 0.1) + 0.1
        assert!((tensions[0].productivity_score - 0.8).abs() < 1e-6);
    }

    #[test]
    fn only_top_entries_are_enriched() {
        let mut store = KnowledgeStore::default();
        store
            .add_extraction(
                &[ConceptCandidate::new("Exercise")
                    .with_category("activity")
                    .with_description("Physical exertion")
                    .with_importance(0.75)],
                &[],
                "S0",
            )
            .unwrap();
        ingest(&mut store, "Exercise", "improves", "Sleep", 0.9, "S1");
        ingest(&mut store, "Exercise", "worsens", "Sleep", 0.9, "S2");
        ingest(&mut store, "Sugar", "supports", "Energy", 0.1, "S1");
        ingest(&mut store, "Sugar", "opposes", "Energy", 0.1, "S2");

        let detector = TensionDetector::with_config(&store, TensionConfig { enrich_top: 1 });
        let report = detector.get_all_tensions();
        assert_eq!(report.tensions_found, 2);
        let top = &report.productive_tensions[0];
        assert!(top.productivity_score >= report.productive_tensions[1].productivity_score);
        let context = top.context.as_ref().unwrap();
        assert_eq!(context.nodes[0].name, "Exercise");
        assert_eq!(context.nodes[0].node_type, "activity");
        assert_eq!(context.nodes[0].importance, Some(0.75));
        assert!(context.explanation.contains("Exercise"));
        assert!(report.productive_tensions[1].context.is_none());
    }

    #[test]
    fn serializes_with_type_tag() {
        let mut store = KnowledgeStore::default();
        ingest(&mut store, "Caffeine", "enables", "Focus", 0.8, "S1");
        ingest(&mut store, "Caffeine", "prevents", "Focus", 0.6, "S2");
        let report = TensionDetector::new(&store).get_all_tensions();
        let value = serde_json::to_value(&report).unwrap();
        assert_eq!(value["productive_tensions"][0]["type"], "opposing_predicates");
        assert_eq!(value["tensions_found"], 1);
    }

    #[test]
    fn detection_does_not_mutate_store() {
        let mut store = KnowledgeStore::default();
        ingest(&mut store, "Caffeine", "enables", "Focus", 0.8, "S1");
        let before = store.snapshot();
        let resolver_before = store.resolver().state().clone();
        let _ = TensionDetector::new(&store).get_all_tensions();
        assert_eq!(store.snapshot(), before);
        assert_eq!(store.resolver().state(), &resolver_before);
    }
}
