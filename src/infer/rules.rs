//! Built-in inference rule families and their closed predicate vocabularies.
//!
//! Node types and predicates are open strings everywhere else, but the four
//! rule families only fire on the predicates listed here. The tables are
//! compiled in and not configurable at runtime.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::model::{INFERRED_SOURCE, Relationship};

// ---------------------------------------------------------------------------
// Vocabularies
// ---------------------------------------------------------------------------

/// `A p B` and `B p C` imply `A p C`.
pub static TRANSITIVE_PREDICATES: &[&str] = &[
    "is-a",
    "part-of",
    "subclass-of",
    "depends-on",
    "uses",
    "extends",
    "located-in",
    "contained-in",
    "precedes",
    "ancestor-of",
    "descendant-of",
    "derived-from",
    "implies",
];

/// `A p B` implies `B p A`.
pub static SYMMETRIC_PREDICATES: &[&str] = &[
    "related-to",
    "similar-to",
    "interacts-with",
    "connected-to",
    "associated-with",
    "equivalent-to",
    "sibling-of",
    "collaborates-with",
    "competes-with",
    "adjacent-to",
    "married-to",
];

/// `A p B` implies `B q A` for each `(p, q)` pair, in both directions.
pub static INVERSE_PAIRS: &[(&str, &str)] = &[
    ("parent-of", "child-of"),
    ("contains", "part-of"),
    ("owns", "owned-by"),
    ("precedes", "follows"),
    ("causes", "caused-by"),
    ("uses", "used-by"),
    ("creates", "created-by"),
    ("employs", "employed-by"),
    ("teaches", "taught-by"),
    ("ancestor-of", "descendant-of"),
    ("depends-on", "dependency-of"),
    ("supersedes", "superseded-by"),
];

/// Predicates that make the subject a subtype/instance of the object.
pub static INHERITANCE_PREDICATES: &[&str] = &[
    "is-a",
    "type-of",
    "instance-of",
    "subclass-of",
    "kind-of",
    "extends",
    "implements",
    "inherits-from",
];

/// Confidence multiplier applied by type inheritance to the parent's edge.
pub const INHERITANCE_CONFIDENCE: f32 = 0.9;

/// Normalize a free-text predicate for vocabulary lookup:
/// trimmed, lower-case, with spaces and underscores folded to `-`.
pub fn normalize_predicate(predicate: &str) -> String {
    predicate
        .trim()
        .to_lowercase()
        .split(|c: char| c.is_whitespace() || c == '_' || c == '-')
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join("-")
}

pub fn is_transitive(predicate: &str) -> bool {
    TRANSITIVE_PREDICATES.contains(&normalize_predicate(predicate).as_str())
}

pub fn is_symmetric(predicate: &str) -> bool {
    SYMMETRIC_PREDICATES.contains(&normalize_predicate(predicate).as_str())
}

pub fn is_inheritance(predicate: &str) -> bool {
    INHERITANCE_PREDICATES.contains(&normalize_predicate(predicate).as_str())
}

/// The inverse of a predicate, if it belongs to an inverse pair.
pub fn inverse_of(predicate: &str) -> Option<&'static str> {
    let p = normalize_predicate(predicate);
    INVERSE_PAIRS.iter().find_map(|(a, b)| {
        if *a == p {
            Some(*b)
        } else if *b == p {
            Some(*a)
        } else {
            None
        }
    })
}

// ---------------------------------------------------------------------------
// Rules
// ---------------------------------------------------------------------------

/// The four built-in rule families.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleFamily {
    Transitive,
    Symmetric,
    Inverse,
    TypeInheritance,
}

/// A named rule: a pure function over a relationship set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InferenceRule {
    pub name: String,
    pub description: String,
    pub family: RuleFamily,
    /// Multiplied into derived confidence when factors are enabled, in (0, 1].
    pub confidence_factor: f32,
}

impl InferenceRule {
    pub fn transitive(decay: f32) -> Self {
        Self::new(
            "transitive",
            "A -p-> B and B -p-> C derive A -p-> C for transitive predicates",
            RuleFamily::Transitive,
            decay,
        )
    }

    pub fn symmetric() -> Self {
        Self::new(
            "symmetric",
            "A -p-> B derives B -p-> A for symmetric predicates",
            RuleFamily::Symmetric,
            1.0,
        )
    }

    pub fn inverse() -> Self {
        Self::new(
            "inverse",
            "A -p-> B derives B -inverse(p)-> A for registered inverse pairs",
            RuleFamily::Inverse,
            0.9,
        )
    }

    pub fn type_inheritance(decay: f32) -> Self {
        Self::new(
            "type_inheritance",
            "children of a type inherit the type's non-inheritance relationships",
            RuleFamily::TypeInheritance,
            decay,
        )
    }

    fn new(name: &str, description: &str, family: RuleFamily, confidence_factor: f32) -> Self {
        let confidence_factor = if confidence_factor > 0.0 {
            confidence_factor.min(1.0)
        } else {
            1.0
        };
        Self {
            name: name.to_string(),
            description: description.to_string(),
            family,
            confidence_factor,
        }
    }

    /// The standard rule set, in evaluation order.
    pub fn builtin(transitive_decay: f32, inheritance_decay: f32) -> Vec<Self> {
        vec![
            Self::transitive(transitive_decay),
            Self::symmetric(),
            Self::inverse(),
            Self::type_inheritance(inheritance_decay),
        ]
    }

    /// Apply the rule once, returning candidate relationships.
    ///
    /// Candidate confidence is the family's base confidence; the caller
    /// filters duplicates and applies `confidence_factor`.
    pub fn apply(&self, relationships: &[Relationship]) -> Vec<Relationship> {
        match self.family {
            RuleFamily::Transitive => apply_transitive(relationships),
            RuleFamily::Symmetric => apply_symmetric(relationships),
            RuleFamily::Inverse => apply_inverse(relationships),
            RuleFamily::TypeInheritance => apply_type_inheritance(relationships),
        }
    }
}

fn derived(subject: &str, predicate: &str, object: &str, confidence: f32) -> Relationship {
    Relationship::new(subject, predicate, object, confidence).with_source(INFERRED_SOURCE)
}

fn apply_transitive(relationships: &[Relationship]) -> Vec<Relationship> {
    // (normalized predicate, subject) -> outgoing edges
    let mut outgoing: HashMap<(String, &str), Vec<&Relationship>> = HashMap::new();
    for r in relationships {
        let p = normalize_predicate(&r.predicate);
        if TRANSITIVE_PREDICATES.contains(&p.as_str()) {
            outgoing.entry((p, r.subject.as_str())).or_default().push(r);
        }
    }

    let mut out = Vec::new();
    for first in relationships {
        let p = normalize_predicate(&first.predicate);
        if !TRANSITIVE_PREDICATES.contains(&p.as_str()) {
            continue;
        }
        let Some(nexts) = outgoing.get(&(p, first.object.as_str())) else {
            continue;
        };
        for second in nexts {
            out.push(derived(
                &first.subject,
                &first.predicate,
                &second.object,
                first.confidence.min(second.confidence),
            ));
        }
    }
    out
}

fn apply_symmetric(relationships: &[Relationship]) -> Vec<Relationship> {
    relationships
        .iter()
        .filter(|r| is_symmetric(&r.predicate))
        .map(|r| derived(&r.object, &r.predicate, &r.subject, r.confidence))
        .collect()
}

fn apply_inverse(relationships: &[Relationship]) -> Vec<Relationship> {
    relationships
        .iter()
        .filter_map(|r| {
            inverse_of(&r.predicate).map(|inv| derived(&r.object, inv, &r.subject, r.confidence))
        })
        .collect()
}

fn apply_type_inheritance(relationships: &[Relationship]) -> Vec<Relationship> {
    // parent -> children, in first-seen order
    let mut children: HashMap<&str, Vec<&str>> = HashMap::new();
    for r in relationships {
        if is_inheritance(&r.predicate) {
            let entry = children.entry(r.object.as_str()).or_default();
            if !entry.contains(&r.subject.as_str()) {
                entry.push(r.subject.as_str());
            }
        }
    }
    if children.is_empty() {
        return Vec::new();
    }

    let mut out = Vec::new();
    for r in relationships {
        if is_inheritance(&r.predicate) {
            continue;
        }
        let Some(kids) = children.get(r.subject.as_str()) else {
            continue;
        };
        for child in kids {
            out.push(derived(
                child,
                &r.predicate,
                &r.object,
                r.confidence * INHERITANCE_CONFIDENCE,
            ));
        }
    }
    out
}
