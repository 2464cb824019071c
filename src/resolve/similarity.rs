//! Edit-distance similarity on a 0–100 scale.

use unicode_normalization::UnicodeNormalization;

/// Normalize a name for similarity comparison: NFC, trimmed, lower-case.
pub fn normalize(name: &str) -> String {
    name.trim().nfc().collect::<String>().to_lowercase()
}

/// Similarity ratio between two strings, 0–100.
///
/// Uses the insert/delete edit distance (substitution counts as two edits):
/// `100 * (|a| + |b| - indel) / (|a| + |b|)`, rounded. Both inputs are
/// compared after [`normalize`]. Two empty strings score 100.
pub fn ratio(a: &str, b: &str) -> u8 {
    let a: Vec<char> = normalize(a).chars().collect();
    let b: Vec<char> = normalize(b).chars().collect();
    let total = a.len() + b.len();
    if total == 0 {
        return 100;
    }
    let lcs = lcs_len(&a, &b);
    let indel = total - 2 * lcs;
    let score = 100.0 * (total - indel) as f64 / total as f64;
    score.round() as u8
}

/// Longest-common-subsequence length, two-row dynamic programming.
fn lcs_len(a: &[char], b: &[char]) -> usize {
    if a.is_empty() || b.is_empty() {
        return 0;
    }
    let mut prev = vec![0usize; b.len() + 1];
    let mut curr = vec![0usize; b.len() + 1];
    for ca in a {
        for (j, cb) in b.iter().enumerate() {
            curr[j + 1] = if ca == cb {
                prev[j] + 1
            } else {
                prev[j + 1].max(curr[j])
            };
        }
        std::mem::swap(&mut prev, &mut curr);
    }
    prev[b.len()]
}
