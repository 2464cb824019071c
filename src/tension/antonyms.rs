//! Static antonym pairs for opposing-predicate detection.
//!
//! Pairs are bidirectional; a predicate may appear in more than one pair.

use crate::infer::rules::normalize_predicate;

pub static ANTONYM_PAIRS: &[(&str, &str)] = &[
    ("enables", "prevents"),
    ("causes", "prevents"),
    ("increases", "decreases"),
    ("supports", "opposes"),
    ("improves", "worsens"),
    ("accelerates", "slows"),
    ("promotes", "inhibits"),
    ("strengthens", "weakens"),
    ("facilitates", "hinders"),
    ("helps", "hurts"),
    ("benefits", "harms"),
    ("confirms", "refutes"),
    ("proves", "disproves"),
    ("agrees-with", "disagrees-with"),
    ("includes", "excludes"),
    ("allows", "forbids"),
    ("activates", "deactivates"),
    ("creates", "destroys"),
    ("attracts", "repels"),
    ("raises", "lowers"),
    ("expands", "contracts"),
    ("simplifies", "complicates"),
];

/// Whether two predicates are registered antonyms, in either order.
pub fn are_antonyms(a: &str, b: &str) -> bool {
    let a = normalize_predicate(a);
    let b = normalize_predicate(b);
    ANTONYM_PAIRS
        .iter()
        .any(|(x, y)| (*x == a && *y == b) || (*x == b && *y == a))
}
