//! The current edit decision: ordered best takes and their timeline.

use serde::{Deserialize, Serialize};

use crate::group::Group;
use crate::segment::Segment;
use crate::timecode::round3;

/// One take placed on the output timeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimelineEntry {
    pub group_id: usize,
    pub segment_index: usize,
    /// Interval in the source media, seconds.
    pub source_start: f64,
    pub source_end: f64,
    /// Interval on the rendered timeline, seconds.
    pub timeline_start: f64,
    pub timeline_end: f64,
}

/// Aggregate numbers for one edit decision.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EditSummary {
    pub group_count: usize,
    pub take_count: usize,
    pub kept_takes: usize,
    /// Seconds kept on the timeline.
    pub final_duration: f64,
    /// Seconds removed relative to the source.
    pub removed_duration: f64,
}

/// The current edit decision.
///
/// `best_takes` and `timeline` are pure functions of
/// (groups, segments, suggested_order); `rebuild` recomputes both and is
/// idempotent.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EditList {
    /// Permutation of group ids giving the playback order.
    pub suggested_order: Vec<usize>,
    /// One segment per group in `suggested_order`, each the group's
    /// currently selected take. Groups with no selection are skipped.
    pub best_takes: Vec<Segment>,
    pub timeline: Vec<TimelineEntry>,
    /// Sum of best-take durations, seconds.
    pub final_duration: f64,
    /// Duration of the source media, seconds.
    pub total_duration: f64,
}

impl EditList {
    /// Build an edit list from the group set and current selection flags.
    pub fn rebuild(
        groups: &[Group],
        segments: &[Segment],
        suggested_order: Vec<usize>,
        total_duration: f64,
    ) -> Self {
        let mut best_takes = Vec::new();
        let mut timeline = Vec::new();
        let mut running = 0.0_f64;

        for &group_id in &suggested_order {
            let Some(group) = groups.iter().find(|g| g.group_id == group_id) else {
                continue;
            };
            let Some(best) = group.best_take(segments) else {
                continue;
            };

            let timeline_start = round3(running);
            let timeline_end = round3(running + best.duration);
            timeline.push(TimelineEntry {
                group_id,
                segment_index: best.index,
                source_start: best.start,
                source_end: best.end,
                timeline_start,
                timeline_end,
            });
            running += best.duration;
            best_takes.push(best.clone());
        }

        Self {
            suggested_order,
            best_takes,
            timeline,
            final_duration: round3(running),
            total_duration: round3(total_duration),
        }
    }

    pub fn summary(&self, groups: &[Group]) -> EditSummary {
        EditSummary {
            group_count: groups.len(),
            take_count: groups.iter().map(Group::len).sum(),
            kept_takes: self.best_takes.len(),
            final_duration: self.final_duration,
            removed_duration: round3((self.total_duration - self.final_duration).max(0.0)),
        }
    }

    /// Source intervals of the kept takes, in timeline order.
    pub fn cut_intervals(&self) -> Vec<(f64, f64)> {
        self.timeline
            .iter()
            .map(|e| (e.source_start, e.source_end))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fixture() -> (Vec<Group>, Vec<Segment>) {
        let mut segments = vec![
            Segment::new(0, 0.0, 2.05),
            Segment::new(1, 2.95, 6.05),
            Segment::new(2, 6.95, 10.0),
        ];
        segments[0].is_best = true;
        segments[2].is_best = true;
        let groups = vec![
            Group {
                group_id: 0,
                take_indices: vec![0, 1],
                text_summary: "take one".to_string(),
            },
            Group {
                group_id: 1,
                take_indices: vec![2],
                text_summary: "take two".to_string(),
            },
        ];
        (groups, segments)
    }

    #[test]
    fn test_rebuild_timeline() {
        let (groups, segments) = fixture();
        let edit = EditList::rebuild(&groups, &segments, vec![0, 1], 10.0);

        assert_eq!(edit.best_takes.len(), 2);
        assert_eq!(edit.best_takes[0].index, 0);
        assert_eq!(edit.best_takes[1].index, 2);
        assert_eq!(edit.timeline[0].timeline_start, 0.0);
        assert_eq!(edit.timeline[0].timeline_end, 2.05);
        assert_eq!(edit.timeline[1].timeline_start, 2.05);
        assert_eq!(edit.timeline[1].timeline_end, 5.1);
        assert_eq!(edit.final_duration, 5.1);
        // Timeline spans equal the take durations after rounding
        for (entry, take) in edit.timeline.iter().zip(&edit.best_takes) {
            assert!((entry.timeline_end - entry.timeline_start - round3(take.duration)).abs() < 1e-9);
        }
    }

    #[test]
    fn test_rebuild_respects_order() {
        let (groups, segments) = fixture();
        let edit = EditList::rebuild(&groups, &segments, vec![1, 0], 10.0);
        assert_eq!(edit.best_takes[0].index, 2);
        assert_eq!(edit.timeline[0].timeline_start, 0.0);
        assert_eq!(edit.timeline[1].segment_index, 0);
    }

    #[test]
    fn test_rebuild_skips_unselected_group() {
        let (groups, mut segments) = fixture();
        segments[2].is_best = false;
        let edit = EditList::rebuild(&groups, &segments, vec![0, 1], 10.0);
        assert_eq!(edit.best_takes.len(), 1);
        assert_eq!(edit.final_duration, 2.05);
    }

    #[test]
    fn test_rebuild_is_idempotent() {
        let (groups, segments) = fixture();
        let a = EditList::rebuild(&groups, &segments, vec![0, 1], 10.0);
        let b = EditList::rebuild(&groups, &segments, a.suggested_order.clone(), 10.0);
        assert_eq!(a.timeline, b.timeline);
        assert_eq!(a.final_duration, b.final_duration);
    }

    #[test]
    fn test_summary() {
        let (groups, segments) = fixture();
        let edit = EditList::rebuild(&groups, &segments, vec![0, 1], 10.0);
        let summary = edit.summary(&groups);
        assert_eq!(summary.group_count, 2);
        assert_eq!(summary.take_count, 3);
        assert_eq!(summary.kept_takes, 2);
        assert_eq!(summary.final_duration, 5.1);
        assert_eq!(summary.removed_duration, 4.9);
    }
}
