// thiserror's #[error("...{field}...")] format strings reference struct fields,
// but the compiler doesn't see through the derive macro and reports false positives.
#![allow(unused_assignments)]

//! # canon-kg
//!
//! A canonical knowledge graph built from per-document extraction output.
//!
//! ## Architecture
//!
//! - **Entity resolution** (`resolve`): free-text names → canonical names via
//!   exact, known-variation, abbreviation, plural, and fuzzy matching
//! - **Knowledge store** (`store`): deduplicated nodes and relationships,
//!   persisted to redb as one unit with the resolver state
//! - **Inference** (`infer`): transitive, symmetric, inverse, and
//!   type-inheritance rules run to a bounded fixpoint
//! - **Tension detection** (`tension`): opposing predicates and cross-source
//!   conflicting statements, ranked by productivity
//! - **Analytics** (`analytics`): PageRank and degree centrality via petgraph
//!
//! ## Library usage
//!
//! ```no_run
//! use canon_kg::infer::InferenceEngine;
//! use canon_kg::model::{ConceptCandidate, RelationshipCandidate};
//! use canon_kg::store::{KnowledgeStore, StoreConfig};
//! use canon_kg::tension::TensionDetector;
//!
//! let mut store = KnowledgeStore::open(&StoreConfig::default()).unwrap();
//! store
//!     .add_extraction(
//!         &[ConceptCandidate::new("Python"), ConceptCandidate::new("Django")],
//!         &[RelationshipCandidate::new("Python", "powers", "Django", 0.9)],
//!         "doc1",
//!     )
//!     .unwrap();
//!
//! let mut engine = InferenceEngine::default();
//! let report = store.run_inference(&mut engine, 3).unwrap();
//! println!("added {} derived relationships", report.added);
//!
//! let tensions = TensionDetector::new(&store).get_all_tensions();
//! println!("{} tensions", tensions.tensions_found);
//! ```

pub mod analytics;
pub mod config;
pub mod error;
pub mod infer;
pub mod model;
pub mod paths;
pub mod resolve;
pub mod store;
pub mod tension;
