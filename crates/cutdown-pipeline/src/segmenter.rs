//! Silence-log parsing and speech-segment derivation.
//!
//! The engine's stderr log is the only source of truth for segment
//! boundaries, so all the regex rules live here and nowhere else. Segments
//! derived from the same log are identical across runs.

use cutdown_models::{parse_clock, CutConfig, Segment};
use regex::Regex;
use tracing::debug;

use crate::error::{PipelineError, PipelineResult};

/// One silence interval reported by the detect filter.
///
/// `end` is `None` when the log closed without a matching `silence_end`
/// (the filter never saw speech resume).
#[derive(Debug, Clone, PartialEq)]
pub struct SilenceInterval {
    pub start: f64,
    pub end: Option<f64>,
}

impl SilenceInterval {
    /// The interval end, with an open interval running to the end of the
    /// media.
    pub fn resolved_end(&self, total_duration: f64) -> f64 {
        self.end.unwrap_or(total_duration)
    }
}

/// Parse the total media duration from the first `Duration:` banner line.
pub fn parse_total_duration(log: &str) -> Option<f64> {
    let re = Regex::new(r"Duration:\s*(\d+:\d{2}:\d{2}(?:\.\d+)?)").unwrap();
    re.captures(log).and_then(|c| parse_clock(&c[1]))
}

/// Collect silence intervals from the filter log.
///
/// `silence_start` and `silence_end` occurrences are taken in textual
/// order and the i-th start is paired with the i-th end.
pub fn parse_silence_intervals(log: &str) -> Vec<SilenceInterval> {
    let start_re = Regex::new(r"silence_start:\s*(-?\d+(?:\.\d+)?)").unwrap();
    let end_re = Regex::new(r"silence_end:\s*(-?\d+(?:\.\d+)?)").unwrap();

    let starts: Vec<f64> = start_re
        .captures_iter(log)
        .filter_map(|c| c[1].parse().ok())
        .collect();
    let mut ends = end_re
        .captures_iter(log)
        .filter_map(|c| c[1].parse().ok());

    starts
        .into_iter()
        .map(|start| SilenceInterval {
            start,
            end: ends.next(),
        })
        .collect()
}

/// Derive padded speech segments from a silence-detect log.
///
/// Speech intervals are the gaps between silences, padded symmetrically
/// and clamped to the media bounds. Gaps shorter than `min_speech_s` are
/// dropped. An open final silence still yields a trailing candidate from
/// its own start, padded the same way.
pub fn derive_segments(log: &str, config: &CutConfig) -> PipelineResult<Vec<Segment>> {
    let total_duration = parse_total_duration(log)
        .ok_or_else(|| PipelineError::LogParse("missing Duration line".to_string()))?;
    let silences = parse_silence_intervals(log);

    debug!(
        total_duration,
        silences = silences.len(),
        "deriving speech segments"
    );

    let pad = config.padding_s;
    let mut segments: Vec<Segment> = Vec::new();
    let mut prev_end = 0.0_f64;

    let push_candidate = |segments: &mut Vec<Segment>, from: f64, to: f64| {
        let start = (from - pad).max(0.0);
        let end = (to + pad).min(total_duration);
        if end - start >= config.min_speech_s {
            segments.push(Segment::new(segments.len(), start, end));
        }
    };

    for silence in &silences {
        push_candidate(&mut segments, prev_end, silence.start);
        prev_end = match silence.end {
            Some(end) => end,
            // Open silence: the interval itself runs to the end of the
            // media, but the region after its start is still emitted as a
            // trailing candidate below.
            None => silence.start,
        };
    }

    if prev_end < total_duration {
        let start = (prev_end - pad).max(0.0);
        if total_duration - start >= config.min_speech_s {
            segments.push(Segment::new(segments.len(), start, total_duration));
        }
    }

    if segments.is_empty() {
        return Err(PipelineError::NoSpeechDetected);
    }

    debug!(segments = segments.len(), "speech segments derived");
    Ok(segments)
}
