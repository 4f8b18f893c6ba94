//! Shared data models for the cutdown take-selection pipeline.
//!
//! This crate provides Serde-serializable types for:
//! - Speech segments with audio metrics and transcriptions
//! - Take groups and the current edit decision
//! - Timecode parsing and frame math
//! - Pipeline configuration

pub mod config;
pub mod edit;
pub mod group;
pub mod scores;
pub mod segment;
pub mod timecode;

// Re-export common types
pub use config::{CutConfig, TranscriptionModel};
pub use edit::{EditList, EditSummary, TimelineEntry};
pub use group::Group;
pub use scores::AiScores;
pub use segment::{AudioMetrics, QualityTag, Segment, TranscriptChunk, Transcription};
pub use timecode::{edl_timecode, parse_clock, round3, to_frames};
