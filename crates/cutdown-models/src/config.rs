//! Pipeline configuration.

use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Timebases supported by the exporters.
pub const SUPPORTED_FPS: [u32; 5] = [24, 25, 30, 50, 60];

/// Speech-engine model size.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TranscriptionModel {
    Tiny,
    Base,
    #[default]
    Small,
    Medium,
    Large,
}

impl TranscriptionModel {
    pub fn as_str(&self) -> &'static str {
        match self {
            TranscriptionModel::Tiny => "tiny",
            TranscriptionModel::Base => "base",
            TranscriptionModel::Small => "small",
            TranscriptionModel::Medium => "medium",
            TranscriptionModel::Large => "large",
        }
    }
}

impl FromStr for TranscriptionModel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "tiny" => Ok(TranscriptionModel::Tiny),
            "base" => Ok(TranscriptionModel::Base),
            "small" => Ok(TranscriptionModel::Small),
            "medium" => Ok(TranscriptionModel::Medium),
            "large" => Ok(TranscriptionModel::Large),
            other => Err(format!(
                "unknown model '{}', expected tiny/base/small/medium/large",
                other
            )),
        }
    }
}

/// Configuration for one cut-down session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CutConfig {
    /// Silence-detect noise floor in dBFS.
    pub noise_threshold_db: i32,
    /// Minimum silence duration to register a cut point, seconds.
    pub min_silence_s: f64,
    /// Speech intervals shorter than this are discarded, seconds.
    pub min_speech_s: f64,
    /// Symmetric padding added to each side of a speech interval, seconds.
    pub padding_s: f64,
    pub transcription_model: TranscriptionModel,
    /// ISO-639-1 language hint; `None` lets the engine auto-detect.
    pub transcription_language: Option<String>,
    /// Take-grouping similarity threshold in [0, 1].
    pub similarity_threshold: f64,
    /// Integer timebase for all timecode outputs.
    pub fps: u32,
}

impl Default for CutConfig {
    fn default() -> Self {
        Self {
            noise_threshold_db: -35,
            min_silence_s: 0.70,
            min_speech_s: 0.30,
            padding_s: 0.05,
            transcription_model: TranscriptionModel::Small,
            transcription_language: None,
            similarity_threshold: 0.60,
            fps: 25,
        }
    }
}

impl CutConfig {
    /// Create config from `CUTDOWN_*` environment variables, falling back
    /// to defaults for anything unset or unparseable.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            noise_threshold_db: env_parse("CUTDOWN_NOISE_DB", defaults.noise_threshold_db),
            min_silence_s: env_parse("CUTDOWN_MIN_SILENCE_S", defaults.min_silence_s),
            min_speech_s: env_parse("CUTDOWN_MIN_SPEECH_S", defaults.min_speech_s),
            padding_s: env_parse("CUTDOWN_PADDING_S", defaults.padding_s),
            transcription_model: std::env::var("CUTDOWN_MODEL")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.transcription_model),
            transcription_language: std::env::var("CUTDOWN_LANGUAGE")
                .ok()
                .filter(|s| !s.is_empty() && s != "auto"),
            similarity_threshold: env_parse(
                "CUTDOWN_SIMILARITY",
                defaults.similarity_threshold,
            ),
            fps: env_parse("CUTDOWN_FPS", defaults.fps),
        }
    }

    /// Builder-style setter for the similarity threshold, clamped to [0, 1].
    pub fn with_similarity_threshold(mut self, threshold: f64) -> Self {
        self.similarity_threshold = threshold.clamp(0.0, 1.0);
        self
    }

    /// Builder-style setter for the language hint. `"auto"` or empty means
    /// auto-detect.
    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        let language = language.into();
        self.transcription_language = if language.is_empty() || language == "auto" {
            None
        } else {
            Some(language)
        };
        self
    }

    /// Builder-style setter for padding, never negative.
    pub fn with_padding_s(mut self, padding_s: f64) -> Self {
        self.padding_s = padding_s.max(0.0);
        self
    }

    /// Validate cross-field constraints. Returns a human-readable message
    /// for the first violation found.
    pub fn validate(&self) -> Result<(), String> {
        if !SUPPORTED_FPS.contains(&self.fps) {
            return Err(format!(
                "fps {} not supported; expected one of {:?}",
                self.fps, SUPPORTED_FPS
            ));
        }
        if self.min_silence_s <= 0.0 {
            return Err("min_silence_s must be positive".to_string());
        }
        if self.min_speech_s < 0.0 {
            return Err("min_speech_s must not be negative".to_string());
        }
        if self.padding_s < 0.0 {
            return Err("padding_s must not be negative".to_string());
        }
        if !(0.0..=1.0).contains(&self.similarity_threshold) {
            return Err("similarity_threshold must be within [0, 1]".to_string());
        }
        Ok(())
    }
}

fn env_parse<T: FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = CutConfig::default();
        assert_eq!(config.noise_threshold_db, -35);
        assert!((config.min_silence_s - 0.70).abs() < f64::EPSILON);
        assert!((config.min_speech_s - 0.30).abs() < f64::EPSILON);
        assert!((config.padding_s - 0.05).abs() < f64::EPSILON);
        assert_eq!(config.transcription_model, TranscriptionModel::Small);
        assert!(config.transcription_language.is_none());
        assert!((config.similarity_threshold - 0.60).abs() < f64::EPSILON);
        assert_eq!(config.fps, 25);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_model_round_trip() {
        for name in ["tiny", "base", "small", "medium", "large"] {
            let model: TranscriptionModel = name.parse().unwrap();
            assert_eq!(model.as_str(), name);
        }
        assert!("huge".parse::<TranscriptionModel>().is_err());
    }

    #[test]
    fn test_similarity_clamping() {
        let config = CutConfig::default().with_similarity_threshold(1.5);
        assert_eq!(config.similarity_threshold, 1.0);
        let config = CutConfig::default().with_similarity_threshold(-0.2);
        assert_eq!(config.similarity_threshold, 0.0);
    }

    #[test]
    fn test_language_auto() {
        let config = CutConfig::default().with_language("auto");
        assert!(config.transcription_language.is_none());
        let config = CutConfig::default().with_language("de");
        assert_eq!(config.transcription_language.as_deref(), Some("de"));
    }

    #[test]
    fn test_validate_rejects_bad_fps() {
        let config = CutConfig {
            fps: 23,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }
}
