//! Rule-based relationship inference.
//!
//! Derives implicit relationships from explicit ones using four fixed rule
//! families (transitive, symmetric, inverse, type inheritance). The engine
//! only returns what it derived; merging back into a store is the caller's
//! decision (see [`KnowledgeStore::run_inference`](crate::store::KnowledgeStore::run_inference)).

pub mod engine;
pub mod rules;

pub use engine::{InferenceConfig, InferenceEngine, InferenceOutcome};
pub use rules::{InferenceRule, RuleFamily};
