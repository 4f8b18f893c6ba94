//! Per-take scores returned by the scoring oracle.

use serde::{Deserialize, Serialize};

/// Scores attached to a take once the oracle has evaluated its group.
///
/// All four numeric fields are on a 0-10 scale.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AiScores {
    pub audio_quality: f64,
    pub content: f64,
    pub emotion: f64,
    pub overall: f64,
    #[serde(default)]
    pub comment: String,
}

impl AiScores {
    /// Clamp every numeric field into the valid 0-10 range.
    pub fn clamped(mut self) -> Self {
        self.audio_quality = self.audio_quality.clamp(0.0, 10.0);
        self.content = self.content.clamp(0.0, 10.0);
        self.emotion = self.emotion.clamp(0.0, 10.0);
        self.overall = self.overall.clamp(0.0, 10.0);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clamped() {
        let scores = AiScores {
            audio_quality: 12.0,
            content: -1.0,
            emotion: 5.5,
            overall: 10.0,
            comment: "solid".to_string(),
        }
        .clamped();

        assert_eq!(scores.audio_quality, 10.0);
        assert_eq!(scores.content, 0.0);
        assert_eq!(scores.emotion, 5.5);
        assert_eq!(scores.overall, 10.0);
    }

    #[test]
    fn test_comment_defaults_empty() {
        let scores: AiScores = serde_json::from_str(
            r#"{"audio_quality":7,"content":8,"emotion":6,"overall":7.5}"#,
        )
        .unwrap();
        assert!(scores.comment.is_empty());
    }
}
