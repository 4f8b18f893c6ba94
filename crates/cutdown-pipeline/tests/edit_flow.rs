//! End-to-end flow over the pure pipeline stages: silence log in, scored
//! and exported edit out. The media engine and the oracle HTTP layer are
//! exercised by their own unit tests; here their outputs are fixtures.

use cutdown_models::{CutConfig, Transcription};
use cutdown_pipeline::assembler::{apply_evaluation, select_take};
use cutdown_pipeline::export::{build_edl, build_xmeml};
use cutdown_pipeline::grouper::group_segments;
use cutdown_pipeline::scoring::parse_reply;
use cutdown_pipeline::segmenter::derive_segments;

const SILENCE_LOG: &str = r#"ffmpeg version 6.1.1 Copyright (c) 2000-2023 the FFmpeg developers
Input #0, mov,mp4,m4a,3gp,3g2,mj2, from 'session.mp4':
  Duration: 00:00:10.00, start: 0.000000, bitrate: 1053 kb/s
[silencedetect @ 0x55d4fbc19300] silence_start: 2.0
[silencedetect @ 0x55d4fbc19300] silence_end: 3.0 | silence_duration: 1.0
[silencedetect @ 0x55d4fbc19300] silence_start: 6.0
[silencedetect @ 0x55d4fbc19300] silence_end: 7.0 | silence_duration: 1.0
size=N/A time=00:00:10.00 bitrate=N/A speed= 980x
"#;

const ORACLE_REPLY: &str = r#"```json
{
  "evaluations": [
    {
      "group_id": 0,
      "takes": [
        {"segment_index": 0, "audio_quality": 6, "content": 7, "emotion": 5, "overall": 6.0, "comment": "hesitant"},
        {"segment_index": 1, "audio_quality": 8, "content": 8, "emotion": 7, "overall": 8.0, "comment": "confident"}
      ],
      "best_take_index": 1,
      "reason": "second attempt lands the line"
    },
    {
      "group_id": 1,
      "takes": [
        {"segment_index": 2, "audio_quality": 7, "content": 7, "emotion": 7, "overall": 7.0, "comment": "only take"}
      ],
      "best_take_index": 0,
      "reason": "single take"
    }
  ],
  "suggested_order": [0, 1],
  "overall_notes": "clean session"
}
```"#;

#[test]
fn silence_log_to_exports() {
    let config = CutConfig::default();

    // Segmentation from the captured log
    let mut segments = derive_segments(SILENCE_LOG, &config).unwrap();
    let bounds: Vec<(f64, f64)> = segments.iter().map(|s| (s.start, s.end)).collect();
    assert_eq!(bounds, vec![(0.0, 2.05), (2.95, 6.05), (6.95, 10.0)]);

    // Transcripts: two takes of the same line plus one distinct line
    segments[0].transcription = Transcription::new("tell me about the project", Vec::new());
    segments[1].transcription = Transcription::new("tell me about the project.", Vec::new());
    segments[2].transcription = Transcription::new("that wraps it up for today", Vec::new());

    // Grouping collapses the near-duplicates
    let groups = group_segments(&segments, config.similarity_threshold);
    assert_eq!(groups.len(), 2);
    assert_eq!(groups[0].take_indices, vec![0, 1]);
    assert_eq!(groups[0].text_summary, "tell me about the project.");

    // Oracle verdict arrives fenced; parse and apply it
    let reply = parse_reply(ORACLE_REPLY).unwrap();
    let edit = apply_evaluation(&mut segments, &groups, &reply, 10.0);

    assert_eq!(edit.suggested_order, vec![0, 1]);
    assert_eq!(edit.best_takes.len(), 2);
    assert_eq!(edit.best_takes[0].index, 1);
    assert_eq!(edit.best_takes[1].index, 2);
    // Timeline spans equal take durations
    for entry in &edit.timeline {
        let take = segments.iter().find(|s| s.index == entry.segment_index).unwrap();
        assert!((entry.timeline_end - entry.timeline_start - take.duration).abs() <= 0.001);
    }
    // 3.1s + 3.05s of kept speech
    assert!((edit.final_duration - 6.15).abs() < 1e-9);

    // Exports agree on frame math
    let xml = build_xmeml(&edit, "session.mp4", true, config.fps);
    assert!(xml.contains("<timebase>25</timebase>"));
    assert!(xml.contains("<ntsc>FALSE</ntsc>"));
    // First take: 2.95s-6.05s in source, 0-3.1s on the timeline
    assert!(xml.contains("<in>74</in><out>151</out><start>0</start><end>77</end>"));

    let edl = build_edl(&edit, "session.mp4", true, config.fps);
    assert!(edl.starts_with("TITLE: Silence Cutter Edit\nFCM: NON-DROP FRAME\n"));
    assert!(edl.contains("00:00:02:24 00:00:06:01 00:00:00:00 00:00:03:02"));
    assert!(edl.contains("* COMMENT: Take 1 | Score: 8.0 | tell me about the project."));

    // User override flips group 0 to the first take, idempotently
    let edit = select_take(&mut segments, &groups, &edit, 0, 0);
    assert_eq!(edit.best_takes[0].index, 0);
    let again = select_take(&mut segments, &groups, &edit, 0, 0);
    assert_eq!(edit.timeline, again.timeline);
    assert_eq!(edit.final_duration, again.final_duration);

    // Re-export reflects the override
    let edl = build_edl(&again, "session.mp4", true, config.fps);
    assert!(edl.contains("* COMMENT: Take 0 | Score: 6.0 | tell me about the project"));
}
