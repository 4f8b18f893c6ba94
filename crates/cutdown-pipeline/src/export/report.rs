//! Structured JSON report export.

use serde::{Deserialize, Serialize};

use cutdown_models::{
    AiScores, AudioMetrics, CutConfig, EditList, EditSummary, Group, Segment,
};

/// Report format revision, bumped on breaking shape changes.
const REPORT_VERSION: u32 = 1;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceInfo {
    pub file_name: String,
    pub duration: f64,
    pub size: u64,
    pub has_video: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportTake {
    pub group_id: usize,
    pub segment_index: usize,
    pub source_start: f64,
    pub source_end: f64,
    pub timeline_start: f64,
    pub timeline_end: f64,
    pub text: String,
    pub scores: Option<AiScores>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportGroupTake {
    pub segment_index: usize,
    pub start: f64,
    pub end: f64,
    pub duration: f64,
    pub audio_metrics: Option<AudioMetrics>,
    pub text: String,
    pub scores: Option<AiScores>,
    pub is_best: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportGroup {
    pub group_id: usize,
    pub text_summary: String,
    pub takes: Vec<ReportGroupTake>,
}

/// Full record of one session: source metadata, the scored timeline, and
/// per-group take detail including selection state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CutReport {
    pub version: u32,
    pub source: SourceInfo,
    /// The configuration that produced this report.
    pub config: CutConfig,
    pub summary: EditSummary,
    pub suggested_order: Vec<usize>,
    pub timeline: Vec<ReportTake>,
    pub groups: Vec<ReportGroup>,
    pub overall_notes: String,
}

/// Assemble the report from the session's parts.
pub fn build_report(
    source: SourceInfo,
    config: &CutConfig,
    edit: &EditList,
    groups: &[Group],
    segments: &[Segment],
    overall_notes: &str,
) -> CutReport {
    let timeline = edit
        .timeline
        .iter()
        .map(|entry| {
            let take = segments.iter().find(|s| s.index == entry.segment_index);
            ReportTake {
                group_id: entry.group_id,
                segment_index: entry.segment_index,
                source_start: entry.source_start,
                source_end: entry.source_end,
                timeline_start: entry.timeline_start,
                timeline_end: entry.timeline_end,
                text: take.map(|s| s.text().to_string()).unwrap_or_default(),
                scores: take.and_then(|s| s.ai_scores.clone()),
            }
        })
        .collect();

    let report_groups = groups
        .iter()
        .map(|group| ReportGroup {
            group_id: group.group_id,
            text_summary: group.text_summary.clone(),
            takes: group
                .take_indices
                .iter()
                .filter_map(|&idx| segments.iter().find(|s| s.index == idx))
                .map(|s| ReportGroupTake {
                    segment_index: s.index,
                    start: s.start,
                    end: s.end,
                    duration: s.duration,
                    audio_metrics: s.audio_metrics,
                    text: s.text().to_string(),
                    scores: s.ai_scores.clone(),
                    is_best: s.is_best,
                })
                .collect(),
        })
        .collect();

    CutReport {
        version: REPORT_VERSION,
        source,
        config: config.clone(),
        summary: edit.summary(groups),
        suggested_order: edit.suggested_order.clone(),
        timeline,
        groups: report_groups,
        overall_notes: overall_notes.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cutdown_models::Transcription;

    #[test]
    fn test_report_round_trip() {
        let mut s0 = Segment::new(0, 0.0, 2.0);
        s0.is_best = true;
        s0.transcription = Transcription::new("the line", Vec::new());
        s0.ai_scores = Some(AiScores {
            audio_quality: 7.0,
            content: 8.0,
            emotion: 6.0,
            overall: 7.5,
            comment: "clean".to_string(),
        });
        let s1 = Segment::new(1, 3.0, 4.0);
        let segments = vec![s0, s1];
        let groups = vec![Group {
            group_id: 0,
            take_indices: vec![0, 1],
            text_summary: "the line".to_string(),
        }];
        let edit = EditList::rebuild(&groups, &segments, vec![0], 10.0);

        let report = build_report(
            SourceInfo {
                file_name: "take.mp4".to_string(),
                duration: 10.0,
                size: 1024,
                has_video: true,
            },
            &CutConfig::default(),
            &edit,
            &groups,
            &segments,
            "good session",
        );

        assert_eq!(report.version, 1);
        assert_eq!(report.timeline.len(), 1);
        assert_eq!(report.timeline[0].text, "the line");
        assert_eq!(report.groups[0].takes.len(), 2);
        assert!(report.groups[0].takes[0].is_best);
        assert!(!report.groups[0].takes[1].is_best);
        assert_eq!(report.summary.kept_takes, 1);

        // Survives a serialize/deserialize cycle with the selection intact
        let json = serde_json::to_string_pretty(&report).unwrap();
        let parsed: CutReport = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.version, report.version);
        assert!(parsed.groups[0].takes[0].is_best);
        assert_eq!(parsed.config.fps, 25);
    }
}
