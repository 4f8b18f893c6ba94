//! Transcription adapter: WAV decode plus the external speech engine.
//!
//! The speech engine itself is a collaborator behind a trait; the adapter
//! owns decoding, option plumbing, and the rule that one failed segment
//! never stops the pipeline.

use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, warn};

use cutdown_models::{CutConfig, Segment, TranscriptChunk, Transcription, TranscriptionModel};

use crate::wav::decode_wav;

/// Timeout for one external transcription call.
const TRANSCRIBE_TIMEOUT_SECS: u64 = 300;

#[derive(Debug, Error)]
#[error("speech engine failed: {0}")]
pub struct TranscribeError(pub String);

/// Options passed to the speech engine per call.
#[derive(Debug, Clone)]
pub struct TranscribeOptions {
    pub return_timestamps: bool,
    pub chunk_length_s: u32,
    pub stride_length_s: u32,
    /// ISO-639-1 hint; `None` asks the engine to auto-detect.
    pub language: Option<String>,
}

impl Default for TranscribeOptions {
    fn default() -> Self {
        Self {
            return_timestamps: true,
            chunk_length_s: 30,
            stride_length_s: 5,
            language: None,
        }
    }
}

impl TranscribeOptions {
    pub fn from_config(config: &CutConfig) -> Self {
        Self {
            language: config.transcription_language.clone(),
            ..Default::default()
        }
    }
}

/// The external speech-to-text engine.
///
/// Implementations receive 16 kHz mono float32 samples in [-1.0, 1.0].
#[allow(async_fn_in_trait)]
pub trait SpeechEngine: Send {
    /// Load model resources. Called once before the first transcription.
    async fn load(&mut self, model: TranscriptionModel) -> Result<(), TranscribeError>;

    /// Transcribe one segment's samples.
    async fn transcribe(
        &mut self,
        samples: &[f32],
        options: &TranscribeOptions,
    ) -> Result<Transcription, TranscribeError>;
}

/// Transcribe every segment, storing results in place.
///
/// Failures are per-segment: a decode or engine error leaves that
/// segment's transcription empty and the loop continues.
pub async fn transcribe_segments<S: SpeechEngine>(
    engine: &mut S,
    segments: &mut [Segment],
    wavs: &[Vec<u8>],
    options: &TranscribeOptions,
    mut on_progress: impl FnMut(usize, usize),
) {
    let total = segments.len();
    for (i, segment) in segments.iter_mut().enumerate() {
        let transcription = match wavs.get(i) {
            Some(bytes) => match decode_wav(bytes) {
                Ok(samples) => match engine.transcribe(&samples, options).await {
                    Ok(t) => t,
                    Err(e) => {
                        warn!(
                            segment = segment.index,
                            error = %e,
                            "transcription failed, storing empty text"
                        );
                        Transcription::default()
                    }
                },
                Err(e) => {
                    warn!(
                        segment = segment.index,
                        error = %e,
                        "WAV decode failed, storing empty text"
                    );
                    Transcription::default()
                }
            },
            None => Transcription::default(),
        };

        debug!(
            segment = segment.index,
            chars = transcription.text.len(),
            "segment transcribed"
        );
        segment.transcription = transcription;
        on_progress(i + 1, total);
    }
}

/// JSON reply expected from the external transcriber process.
#[derive(Debug, Deserialize)]
struct CommandReply {
    text: String,
    #[serde(default)]
    chunks: Vec<CommandChunk>,
}

#[derive(Debug, Deserialize)]
struct CommandChunk {
    start: f64,
    end: f64,
    text: String,
}

/// Speech engine backed by an external transcriber command.
///
/// Samples go out as raw f32le; the command prints a JSON object
/// `{"text": ..., "chunks": [{"start", "end", "text"}, ...]}` on stdout.
pub struct CommandSpeechEngine {
    program: String,
    model: TranscriptionModel,
    loaded: bool,
}

impl CommandSpeechEngine {
    /// Use the transcriber named by `CUTDOWN_TRANSCRIBER`, defaulting to
    /// `whisper-cli` on PATH.
    pub fn from_env() -> Self {
        let program =
            std::env::var("CUTDOWN_TRANSCRIBER").unwrap_or_else(|_| "whisper-cli".to_string());
        Self::new(program)
    }

    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            model: TranscriptionModel::default(),
            loaded: false,
        }
    }
}

impl SpeechEngine for CommandSpeechEngine {
    async fn load(&mut self, model: TranscriptionModel) -> Result<(), TranscribeError> {
        which::which(&self.program).map_err(|_| {
            TranscribeError(format!("transcriber '{}' not found in PATH", self.program))
        })?;
        self.model = model;
        self.loaded = true;
        debug!(program = %self.program, model = model.as_str(), "speech engine ready");
        Ok(())
    }

    async fn transcribe(
        &mut self,
        samples: &[f32],
        options: &TranscribeOptions,
    ) -> Result<Transcription, TranscribeError> {
        if !self.loaded {
            return Err(TranscribeError("engine not loaded".to_string()));
        }

        let raw: Vec<u8> = samples.iter().flat_map(|s| s.to_le_bytes()).collect();
        let input = tempfile::NamedTempFile::new()
            .map_err(|e| TranscribeError(format!("scratch file: {}", e)))?;
        tokio::fs::write(input.path(), &raw)
            .await
            .map_err(|e| TranscribeError(format!("scratch write: {}", e)))?;

        let mut cmd = tokio::process::Command::new(&self.program);
        cmd.arg("--input")
            .arg(input.path())
            .args(["--sample-rate", "16000"])
            .args(["--model", self.model.as_str()])
            .args(["--chunk-length", &options.chunk_length_s.to_string()])
            .args(["--stride", &options.stride_length_s.to_string()])
            .arg("--json");
        if options.return_timestamps {
            cmd.arg("--timestamps");
        }
        if let Some(language) = &options.language {
            cmd.args(["--language", language]);
        }

        let output = tokio::time::timeout(
            Duration::from_secs(TRANSCRIBE_TIMEOUT_SECS),
            cmd.output(),
        )
        .await
        .map_err(|_| TranscribeError("transcriber timed out".to_string()))?
        .map_err(|e| TranscribeError(format!("failed to run transcriber: {}", e)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(TranscribeError(format!(
                "transcriber exited with {:?}: {}",
                output.status.code(),
                stderr.lines().last().unwrap_or("no output")
            )));
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        let reply: CommandReply = serde_json::from_str(stdout.trim())
            .map_err(|e| TranscribeError(format!("unparseable transcriber reply: {}", e)))?;

        let chunks = reply
            .chunks
            .into_iter()
            .map(|c| TranscriptChunk {
                start: c.start,
                end: c.end,
                text: c.text,
            })
            .collect();
        Ok(Transcription::new(reply.text, chunks))
    }
}
