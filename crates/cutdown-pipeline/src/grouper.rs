//! Take grouping by transcript similarity.
//!
//! Greedy single-pass clustering: each unused segment seeds a group and
//! pulls in every later unused segment whose transcript clears the
//! similarity threshold. Group ids follow the earliest member, so group
//! order always reflects detection order.

use cutdown_models::{Group, Segment};
use tracing::debug;

/// Levenshtein edit distance over Unicode scalar values.
fn levenshtein(a: &str, b: &str) -> usize {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    if a.is_empty() {
        return b.len();
    }
    if b.is_empty() {
        return a.len();
    }

    let mut prev: Vec<usize> = (0..=b.len()).collect();
    let mut current = vec![0; b.len() + 1];

    for (i, ca) in a.iter().enumerate() {
        current[0] = i + 1;
        for (j, cb) in b.iter().enumerate() {
            let substitution = prev[j] + usize::from(ca != cb);
            current[j + 1] = substitution.min(prev[j + 1] + 1).min(current[j] + 1);
        }
        std::mem::swap(&mut prev, &mut current);
    }
    prev[b.len()]
}

/// Normalised transcript similarity in [0, 1].
///
/// Texts are lower-cased and trimmed first. Two empty texts are identical;
/// one empty text matches nothing.
pub fn similarity(a: &str, b: &str) -> f64 {
    let a = a.trim().to_lowercase();
    let b = b.trim().to_lowercase();
    if a == b {
        return 1.0;
    }
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }
    let distance = levenshtein(&a, &b);
    1.0 - distance as f64 / a.chars().count().max(b.chars().count()) as f64
}

/// Cluster segments into take groups.
pub fn group_segments(segments: &[Segment], threshold: f64) -> Vec<Group> {
    let mut used = vec![false; segments.len()];
    let mut groups = Vec::new();

    for i in 0..segments.len() {
        if used[i] {
            continue;
        }
        used[i] = true;
        let mut take_indices = vec![segments[i].index];

        for j in (i + 1)..segments.len() {
            if used[j] {
                continue;
            }
            if similarity(segments[i].text(), segments[j].text()) >= threshold {
                used[j] = true;
                take_indices.push(segments[j].index);
            }
        }

        // Longest transcript wins the summary; first occurrence keeps ties
        let text_summary = take_indices
            .iter()
            .filter_map(|&idx| segments.iter().find(|s| s.index == idx))
            .map(|s| s.text())
            .fold("", |best, text| {
                if text.chars().count() > best.chars().count() {
                    text
                } else {
                    best
                }
            })
            .to_string();

        groups.push(Group {
            group_id: groups.len(),
            take_indices,
            text_summary,
        });
    }

    debug!(
        segments = segments.len(),
        groups = groups.len(),
        "segments grouped"
    );
    groups
}
