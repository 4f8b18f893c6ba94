//! Applying oracle verdicts and user overrides to the edit list.

use cutdown_models::{AiScores, EditList, Group, Segment};
use tracing::{debug, warn};

use crate::scoring::OracleReply;

/// Apply an oracle verdict: attach scores, flag best takes, and build the
/// edit list in the suggested order.
pub fn apply_evaluation(
    segments: &mut [Segment],
    groups: &[Group],
    reply: &OracleReply,
    total_duration: f64,
) -> EditList {
    // Scores first, keyed by global segment index
    for evaluation in &reply.evaluations {
        for take in &evaluation.takes {
            match segments.iter_mut().find(|s| s.index == take.segment_index) {
                Some(segment) => {
                    segment.ai_scores = Some(
                        AiScores {
                            audio_quality: take.audio_quality,
                            content: take.content,
                            emotion: take.emotion,
                            overall: take.overall,
                            comment: take.comment.clone(),
                        }
                        .clamped(),
                    );
                }
                None => warn!(
                    segment_index = take.segment_index,
                    "oracle scored an unknown segment, ignoring"
                ),
            }
        }
    }

    // Selection second: exactly one best take per evaluated group
    for group in groups {
        let evaluation = reply
            .evaluations
            .iter()
            .find(|e| e.group_id == group.group_id);
        let chosen = evaluation.and_then(|e| resolve_best(group, e.best_take_index));

        for &idx in &group.take_indices {
            if let Some(segment) = segments.iter_mut().find(|s| s.index == idx) {
                segment.is_best = Some(idx) == chosen;
            }
        }
        if evaluation.is_some() && chosen.is_none() {
            warn!(
                group_id = group.group_id,
                "oracle best take unresolvable, group left unselected"
            );
        }
    }

    let order = sanitize_order(&reply.suggested_order, groups);
    EditList::rebuild(groups, segments, order, total_duration)
}

/// User override: select a specific take in a group and rebuild the
/// timeline. Unknown group or non-member segment is a silent no-op;
/// re-selecting the current best is idempotent.
pub fn select_take(
    segments: &mut [Segment],
    groups: &[Group],
    current: &EditList,
    group_id: usize,
    segment_index: usize,
) -> EditList {
    let Some(group) = groups
        .iter()
        .find(|g| g.group_id == group_id && g.contains(segment_index))
    else {
        debug!(group_id, segment_index, "override ignored: no such take");
        return current.clone();
    };
    for &idx in &group.take_indices {
        if let Some(segment) = segments.iter_mut().find(|s| s.index == idx) {
            segment.is_best = idx == segment_index;
        }
    }

    EditList::rebuild(
        groups,
        segments,
        current.suggested_order.clone(),
        current.total_duration,
    )
}

/// Resolve the oracle's `best_take_index` to a segment index.
///
/// The value is an index into the group's takes list. Out-of-range values
/// are read as a global segment index instead, kept for compatibility with
/// older oracle replies; anything still unresolvable selects nothing.
fn resolve_best(group: &Group, best_take_index: i64) -> Option<usize> {
    if best_take_index >= 0 && (best_take_index as usize) < group.len() {
        return Some(group.take_indices[best_take_index as usize]);
    }
    let as_global = usize::try_from(best_take_index).ok()?;
    group.contains(as_global).then_some(as_global)
}

/// Reduce a suggested order to a permutation of the known group ids:
/// unknown ids drop out, duplicates keep their first position, and any
/// group the oracle forgot is appended in id order. An empty suggestion
/// becomes the identity.
fn sanitize_order(suggested: &[usize], groups: &[Group]) -> Vec<usize> {
    if suggested.is_empty() {
        return groups.iter().map(|g| g.group_id).collect();
    }

    let mut order = Vec::with_capacity(groups.len());
    for &id in suggested {
        if groups.iter().any(|g| g.group_id == id) && !order.contains(&id) {
            order.push(id);
        }
    }
    for group in groups {
        if !order.contains(&group.group_id) {
            order.push(group.group_id);
        }
    }
    order
}
