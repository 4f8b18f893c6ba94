//! Take groups: clusters of segments believed to be the same line.

use serde::{Deserialize, Serialize};

use crate::segment::Segment;

/// A cluster of takes of the same line.
///
/// Membership is fixed once grouping has run. Takes are referenced by
/// segment index into the session's segment list, kept in original
/// detection order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Group {
    /// Stable ordinal, assigned in creation order (which follows the
    /// earliest member's detection order).
    pub group_id: usize,
    /// Segment indices of the member takes, ascending.
    pub take_indices: Vec<usize>,
    /// The longest transcription among members, ties broken by earliest
    /// index.
    pub text_summary: String,
}

impl Group {
    pub fn len(&self) -> usize {
        self.take_indices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.take_indices.is_empty()
    }

    /// Whether the given segment index belongs to this group.
    pub fn contains(&self, segment_index: usize) -> bool {
        self.take_indices.contains(&segment_index)
    }

    /// The member currently flagged as best, if any.
    pub fn best_take<'a>(&self, segments: &'a [Segment]) -> Option<&'a Segment> {
        self.take_indices
            .iter()
            .filter_map(|&i| segments.get(i))
            .find(|s| s.is_best)
    }
}
