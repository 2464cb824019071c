//! Fixpoint driver for the built-in rule families.
//!
//! Runs every rule once per iteration against the accumulated relationship
//! set until an iteration derives nothing new or the iteration cap is hit.
//! A derived-triple cache spans the engine's lifetime: a triple derived once
//! is never emitted again, by a later iteration or by a later call. This is
//! what guarantees termination when transitive and symmetric rules feed each
//! other.

use std::collections::{BTreeMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::model::{Relationship, Signature};

use super::rules::InferenceRule;

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Configuration for the inference engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InferenceConfig {
    /// Default iteration cap (default: 3).
    #[serde(default = "default_max_iterations")]
    pub max_iterations: usize,
    /// Confidence factor of the transitive rule (default: 0.8).
    #[serde(default = "default_decay")]
    pub transitive_decay: f32,
    /// Confidence factor of the type-inheritance rule (default: 0.8).
    #[serde(default = "default_decay")]
    pub inheritance_decay: f32,
    /// Multiply each rule's `confidence_factor` into its derivations
    /// (default: false).
    #[serde(default)]
    pub apply_confidence_factors: bool,
}

fn default_max_iterations() -> usize {
    3
}

fn default_decay() -> f32 {
    0.8
}

impl Default for InferenceConfig {
    fn default() -> Self {
        Self {
            max_iterations: default_max_iterations(),
            transitive_decay: default_decay(),
            inheritance_decay: default_decay(),
            apply_confidence_factors: false,
        }
    }
}

// ---------------------------------------------------------------------------
// Result types
// ---------------------------------------------------------------------------

/// Result of one inference run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InferenceOutcome {
    /// Newly derived relationships, in derivation order.
    pub derived: Vec<Relationship>,
    /// Iterations actually executed.
    pub iterations: usize,
    /// Whether the run stopped because an iteration produced nothing new.
    pub reached_fixpoint: bool,
    /// Per-rule derivation counts.
    pub rule_stats: BTreeMap<String, usize>,
}

// ---------------------------------------------------------------------------
// Engine
// ---------------------------------------------------------------------------

/// Forward-chaining engine over the built-in rule families.
#[derive(Debug, Clone)]
pub struct InferenceEngine {
    config: InferenceConfig,
    rules: Vec<InferenceRule>,
    derived_cache: HashSet<Signature>,
}

impl InferenceEngine {
    pub fn new(config: InferenceConfig) -> Self {
        let rules = InferenceRule::builtin(config.transitive_decay, config.inheritance_decay);
        Self {
            config,
            rules,
            derived_cache: HashSet::new(),
        }
    }

    pub fn config(&self) -> &InferenceConfig {
        &self.config
    }

    /// The rules, in evaluation order.
    pub fn rules(&self) -> &[InferenceRule] {
        &self.rules
    }

    /// Number of triples in the derived cache.
    pub fn cached_len(&self) -> usize {
        self.derived_cache.len()
    }

    /// Whether a triple has already been derived by this engine.
    pub fn has_derived(&self, signature: &Signature) -> bool {
        self.derived_cache.contains(signature)
    }

    /// Forget every previously derived triple.
    pub fn clear(&mut self) {
        self.derived_cache.clear();
    }

    /// Derive new relationships, returning only the derived ones.
    pub fn infer(&mut self, relationships: &[Relationship], max_iterations: usize) -> Vec<Relationship> {
        self.run(relationships, max_iterations).derived
    }

    /// Derive new relationships with run statistics.
    pub fn run(&mut self, relationships: &[Relationship], max_iterations: usize) -> InferenceOutcome {
        let existing: HashSet<Signature> = relationships.iter().map(Relationship::signature).collect();
        let mut working: Vec<Relationship> = relationships.to_vec();
        let mut outcome = InferenceOutcome::default();

        for iteration in 1..=max_iterations {
            outcome.iterations = iteration;
            let mut new_this_round: Vec<Relationship> = Vec::new();

            for rule in &self.rules {
                let mut rule_count = 0usize;
                for candidate in rule.apply(&working) {
                    if candidate.subject == candidate.object {
                        continue;
                    }
                    let signature = candidate.signature();
                    if existing.contains(&signature) || self.derived_cache.contains(&signature) {
                        continue;
                    }
                    let confidence = if self.config.apply_confidence_factors {
                        candidate.confidence * rule.confidence_factor
                    } else {
                        candidate.confidence
                    };
                    let mut derived = candidate.with_lineage(vec![
                        rule.name.clone(),
                        format!("iteration-{iteration}"),
                    ]);
                    derived.confidence = confidence.clamp(0.0, 1.0);

                    self.derived_cache.insert(signature);
                    new_this_round.push(derived);
                    rule_count += 1;
                }
                *outcome.rule_stats.entry(rule.name.clone()).or_insert(0) += rule_count;
            }

            if new_this_round.is_empty() {
                outcome.reached_fixpoint = true;
                break;
            }

            working.extend(new_this_round.iter().cloned());
            outcome.derived.extend(new_this_round);
        }

        tracing::debug!(
            derived = outcome.derived.len(),
            iterations = outcome.iterations,
            fixpoint = outcome.reached_fixpoint,
            "inference run complete"
        );
        outcome
    }
}

impl Default for InferenceEngine {
    fn default() -> Self {
        Self::new(InferenceConfig::default())
    }
}
