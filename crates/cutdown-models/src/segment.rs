//! Speech segment model.

use serde::{Deserialize, Serialize};

use crate::scores::AiScores;
use crate::timecode::round3;

/// Mean level below which audio is tagged quiet, in dBFS.
const QUIET_BELOW_DB: f64 = -30.0;

/// Mean level above which audio is tagged loud/clipping, in dBFS.
const LOUD_ABOVE_DB: f64 = -5.0;

/// Assumed mean level when the volume probe reported nothing.
const MISSING_MEAN_DB: f64 = -70.0;

/// Coarse quality tag derived from the volume probe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QualityTag {
    LoudClipping,
    Good,
    Quiet,
}

impl QualityTag {
    /// Classify a mean volume reading. A missing mean counts as quiet.
    pub fn from_mean_db(mean_db: Option<f64>) -> Self {
        let mean = mean_db.unwrap_or(MISSING_MEAN_DB);
        if mean > LOUD_ABOVE_DB {
            QualityTag::LoudClipping
        } else if mean < QUIET_BELOW_DB {
            QualityTag::Quiet
        } else {
            QualityTag::Good
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            QualityTag::LoudClipping => "loud/clipping",
            QualityTag::Good => "good",
            QualityTag::Quiet => "quiet",
        }
    }
}

/// Volume metrics for one segment.
///
/// Fields the probe log did not mention stay `None`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AudioMetrics {
    pub mean_db: Option<f64>,
    pub max_db: Option<f64>,
    pub quality: QualityTag,
}

impl AudioMetrics {
    pub fn new(mean_db: Option<f64>, max_db: Option<f64>) -> Self {
        Self {
            mean_db,
            max_db,
            quality: QualityTag::from_mean_db(mean_db),
        }
    }
}

/// One timestamped sub-chunk of a transcription.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranscriptChunk {
    /// Start offset in seconds, relative to the segment.
    pub start: f64,
    /// End offset in seconds, relative to the segment.
    pub end: f64,
    pub text: String,
}

/// Transcription result for one segment.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Transcription {
    /// Trimmed transcript text. Empty when transcription failed or the
    /// segment carried no recognizable speech.
    pub text: String,
    #[serde(default)]
    pub chunks: Vec<TranscriptChunk>,
}

impl Transcription {
    pub fn new(text: impl Into<String>, chunks: Vec<TranscriptChunk>) -> Self {
        Self {
            text: text.into().trim().to_string(),
            chunks,
        }
    }
}

/// A contiguous speech interval detected between silences.
///
/// Segments are created once by the segmenter and never destroyed; later
/// stages only fill in metrics, transcription, scores, and selection state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Segment {
    /// Stable ordinal in detection order, zero-based.
    pub index: usize,
    /// Start time in seconds, three-decimal precision.
    pub start: f64,
    /// End time in seconds, three-decimal precision.
    pub end: f64,
    /// `end - start`, three-decimal precision.
    pub duration: f64,
    pub audio_metrics: Option<AudioMetrics>,
    #[serde(default)]
    pub transcription: Transcription,
    pub ai_scores: Option<AiScores>,
    /// Whether this take is currently selected within its group.
    #[serde(default)]
    pub is_best: bool,
}

impl Segment {
    /// Create a segment from raw boundary times. Times are rounded to three
    /// decimals on the way in so every downstream consumer sees the same
    /// values.
    pub fn new(index: usize, start: f64, end: f64) -> Self {
        let start = round3(start);
        let end = round3(end);
        Self {
            index,
            start,
            end,
            duration: round3(end - start),
            audio_metrics: None,
            transcription: Transcription::default(),
            ai_scores: None,
            is_best: false,
        }
    }

    /// Transcript text, trimmed.
    pub fn text(&self) -> &str {
        &self.transcription.text
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quality_tag_boundaries() {
        assert_eq!(QualityTag::from_mean_db(Some(-4.9)), QualityTag::LoudClipping);
        assert_eq!(QualityTag::from_mean_db(Some(-5.0)), QualityTag::Good);
        assert_eq!(QualityTag::from_mean_db(Some(-30.0)), QualityTag::Good);
        assert_eq!(QualityTag::from_mean_db(Some(-30.1)), QualityTag::Quiet);
        // Missing mean defaults to -70 dB, well into quiet
        assert_eq!(QualityTag::from_mean_db(None), QualityTag::Quiet);
    }

    #[test]
    fn test_segment_rounding() {
        let seg = Segment::new(0, 0.0499999, 2.0500001);
        assert_eq!(seg.start, 0.05);
        assert_eq!(seg.end, 2.05);
        assert_eq!(seg.duration, 2.0);
    }

    #[test]
    fn test_duration_matches_bounds() {
        let seg = Segment::new(3, 2.95, 6.05);
        assert!((seg.duration - (seg.end - seg.start)).abs() <= 0.001);
    }

    #[test]
    fn test_transcription_trims() {
        let t = Transcription::new("  hello world \n", Vec::new());
        assert_eq!(t.text, "hello world");
    }
}
