//! The take-selection pipeline.
//!
//! This crate turns one spoken-word recording into a cut-down edit:
//! - Segmenter: silence-detect log text to padded speech segments
//! - Feature extractor: per-segment volume metrics and quality tags
//! - Transcription adapter: WAV decode plus the external speech engine
//! - Grouper: near-duplicate take clustering by transcript similarity
//! - Scoring adapter: oracle prompt, reply parsing and validation
//! - Assembler: score application, best-take tracking, timeline math
//! - Exporters: FCP7 XMEML, CMX3600 EDL, JSON report
//! - Session: the state machine driving all of the above

pub mod assembler;
pub mod error;
pub mod export;
pub mod features;
pub mod grouper;
pub mod scoring;
pub mod segmenter;
pub mod session;
pub mod transcribe;
pub mod wav;

pub use error::{PipelineError, PipelineResult};
pub use scoring::{OracleReply, ScoringClient};
pub use session::{Pipeline, ProgressEvent, Session, SessionState};
pub use transcribe::{CommandSpeechEngine, SpeechEngine, TranscribeOptions};
