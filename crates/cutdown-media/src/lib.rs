//! FFmpeg CLI wrapper for the cutdown pipeline.
//!
//! This crate provides:
//! - Type-safe FFmpeg command building and execution
//! - Source ingest with a streamed-read view for large files
//! - Silence-detect and volume probes returning raw log text
//! - Segment extraction to 16 kHz mono WAV
//! - Concat rendering of the final cut with progress parsing

pub mod command;
pub mod engine;
pub mod error;
pub mod progress;

pub use command::{EngineCommand, EngineOutput};
pub use engine::{MediaEngine, MediaInfo, MediaKind, OutputContainer, SourceHandle};
pub use error::{EngineError, MediaResult};
pub use progress::{ProgressFn, RenderProgress};
