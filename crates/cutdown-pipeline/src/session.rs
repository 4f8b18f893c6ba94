//! Session state machine and pipeline driver.
//!
//! One `Pipeline::run` call takes a source file all the way to `Ready`:
//! every stage awaits the relevant adapter, updates the session state, and
//! emits a progress event. The session owns the engine handle, so dropping
//! it releases the scratch space and any mounted view.

use std::path::Path;

use tokio::sync::mpsc;
use tracing::{info, warn};
use uuid::Uuid;

use cutdown_media::{MediaEngine, OutputContainer, SourceHandle};
use cutdown_models::{CutConfig, EditList, Group, Segment};

use crate::assembler::{apply_evaluation, select_take};
use crate::error::{PipelineError, PipelineResult};
use crate::export::report::SourceInfo;
use crate::export::{build_edl, build_report, build_xmeml, CutReport};
use crate::features::parse_volume_log;
use crate::grouper::group_segments;
use crate::scoring::ScoringClient;
use crate::segmenter::{derive_segments, parse_total_duration};
use crate::transcribe::{transcribe_segments, SpeechEngine, TranscribeOptions};

/// Pipeline position, visible to the UI between suspension points.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    LoadingEngine,
    Probing,
    Segmenting,
    Extracting { done: usize, total: usize },
    LoadingTranscriber,
    Transcribing { done: usize, total: usize },
    Grouping,
    Scoring,
    Assembling,
    Ready,
    Rendering,
    Done,
    Failed,
}

impl std::fmt::Display for SessionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Idle => write!(f, "idle"),
            Self::LoadingEngine => write!(f, "loading engine"),
            Self::Probing => write!(f, "probing"),
            Self::Segmenting => write!(f, "segmenting"),
            Self::Extracting { done, total } => write!(f, "extracting {}/{}", done, total),
            Self::LoadingTranscriber => write!(f, "loading transcriber"),
            Self::Transcribing { done, total } => write!(f, "transcribing {}/{}", done, total),
            Self::Grouping => write!(f, "grouping"),
            Self::Scoring => write!(f, "scoring"),
            Self::Assembling => write!(f, "assembling"),
            Self::Ready => write!(f, "ready"),
            Self::Rendering => write!(f, "rendering"),
            Self::Done => write!(f, "done"),
            Self::Failed => write!(f, "failed"),
        }
    }
}

/// One progress update on the event channel.
#[derive(Debug, Clone)]
pub struct ProgressEvent {
    pub state: SessionState,
    /// Stage-local progress in percent, when the stage reports any.
    pub percent: Option<f64>,
}

/// A completed (or in-flight) run. Owns all adapter handles; the UI reads
/// a snapshot once the state reaches `Ready`.
pub struct Session {
    pub id: String,
    pub config: CutConfig,
    pub source: SourceInfo,
    pub segments: Vec<Segment>,
    pub groups: Vec<Group>,
    pub edit: EditList,
    pub overall_notes: String,
    state: SessionState,
    engine: MediaEngine,
    handle: SourceHandle,
    events: Option<mpsc::Sender<ProgressEvent>>,
}

impl Session {
    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Override the selected take in a group and recompute the timeline.
    ///
    /// Only meaningful once the session is `Ready` (or `Done`, which drops
    /// back to `Ready` so the cut can be re-rendered); anything else is a
    /// silent no-op, as is an unknown group or segment.
    pub fn select_take(&mut self, group_id: usize, segment_index: usize) {
        if !matches!(self.state, SessionState::Ready | SessionState::Done) {
            return;
        }
        self.edit = select_take(
            &mut self.segments,
            &self.groups,
            &self.edit,
            group_id,
            segment_index,
        );
        self.state = SessionState::Ready;
    }

    /// XMEML v5 document for the current edit.
    pub fn xmeml(&self) -> String {
        build_xmeml(
            &self.edit,
            &self.source.file_name,
            self.source.has_video,
            self.config.fps,
        )
    }

    /// CMX3600 EDL document for the current edit.
    pub fn edl(&self) -> String {
        build_edl(
            &self.edit,
            &self.source.file_name,
            self.source.has_video,
            self.config.fps,
        )
    }

    /// Structured report for the current edit.
    pub fn report(&self) -> CutReport {
        build_report(
            self.source.clone(),
            &self.config,
            &self.edit,
            &self.groups,
            &self.segments,
            &self.overall_notes,
        )
    }

    /// File extension of the rendered cut for this source.
    pub fn cut_extension(&self) -> &'static str {
        OutputContainer::for_kind(self.handle.kind()).extension()
    }

    /// Render the concatenated cut and return its bytes.
    pub async fn render_cut(&mut self) -> PipelineResult<Vec<u8>> {
        if self.edit.best_takes.is_empty() {
            return Err(PipelineError::export("no takes selected, nothing to render"));
        }

        self.state = SessionState::Rendering;
        self.emit(SessionState::Rendering, Some(0.0));
        info!(session = %self.id, takes = self.edit.best_takes.len(), "rendering cut");

        let container = OutputContainer::for_kind(self.handle.kind());
        let events = self.events.clone();
        let bytes = self
            .engine
            .render_cut(
                &self.handle,
                &self.edit.cut_intervals(),
                container,
                move |percent| {
                    if let Some(tx) = &events {
                        let _ = tx.try_send(ProgressEvent {
                            state: SessionState::Rendering,
                            percent: Some(percent),
                        });
                    }
                },
            )
            .await?;

        self.state = SessionState::Done;
        self.emit(SessionState::Done, None);
        Ok(bytes)
    }

    fn emit(&self, state: SessionState, percent: Option<f64>) {
        if let Some(tx) = &self.events {
            let _ = tx.try_send(ProgressEvent { state, percent });
        }
    }
}

/// Builder/driver for one session.
pub struct Pipeline<S: SpeechEngine> {
    speech: S,
    oracle: ScoringClient,
    config: CutConfig,
    events: Option<mpsc::Sender<ProgressEvent>>,
}

impl<S: SpeechEngine> Pipeline<S> {
    pub fn new(speech: S, oracle: ScoringClient, config: CutConfig) -> Self {
        Self {
            speech,
            oracle,
            config,
            events: None,
        }
    }

    /// Attach a bounded progress channel. Events are dropped rather than
    /// awaited when the receiver lags; progress is advisory.
    pub fn with_events(mut self, events: mpsc::Sender<ProgressEvent>) -> Self {
        self.events = Some(events);
        self
    }

    /// Run the full take-selection pipeline on one source file.
    pub async fn run(mut self, input: &Path) -> PipelineResult<Session> {
        let id = Uuid::new_v4().to_string();
        let result = self.run_inner(&id, input).await;
        if let Err(e) = &result {
            self.emit(SessionState::Failed, None);
            warn!(session = %id, error = %e, "session failed");
        }
        result
    }

    async fn run_inner(&mut self, id: &str, input: &Path) -> PipelineResult<Session> {
        self.config
            .validate()
            .map_err(PipelineError::Config)?;

        info!(session = %id, input = %input.display(), "session started");

        self.emit(SessionState::LoadingEngine, None);
        let engine = MediaEngine::load()?;

        self.emit(SessionState::Probing, None);
        let handle = engine.ingest(input).await?;
        let probe = engine.probe(&handle).await?;

        self.emit(SessionState::Segmenting, None);
        let log = engine
            .silence_log(&handle, self.config.noise_threshold_db, self.config.min_silence_s)
            .await?;
        let mut segments = derive_segments(&log, &self.config)?;
        // The silence log's banner is the duration every boundary was
        // derived against; the probe only fills in container facts.
        let total_duration = parse_total_duration(&log).unwrap_or(probe.duration);
        info!(session = %id, segments = segments.len(), total_duration, "segments derived");

        let total = segments.len();
        let mut wavs = Vec::with_capacity(total);
        for i in 0..total {
            let (start, end) = (segments[i].start, segments[i].end);
            let wav = engine.extract_wav(&handle, start, end).await?;
            let volume = engine.volume_log(&handle, start, end).await?;
            segments[i].audio_metrics = Some(parse_volume_log(&volume));
            wavs.push(wav);
            self.emit(
                SessionState::Extracting {
                    done: i + 1,
                    total,
                },
                Some((i + 1) as f64 / total as f64 * 100.0),
            );
        }

        self.emit(SessionState::LoadingTranscriber, None);
        if let Err(e) = self.speech.load(self.config.transcription_model).await {
            // Transcription faults are local by policy: an unloadable
            // engine degrades every segment to empty text instead of
            // failing the session.
            warn!(session = %id, error = %e, "speech engine unavailable");
        }

        let options = TranscribeOptions::from_config(&self.config);
        let events = self.events.clone();
        transcribe_segments(
            &mut self.speech,
            &mut segments,
            &wavs,
            &options,
            |done, total| {
                if let Some(tx) = &events {
                    let _ = tx.try_send(ProgressEvent {
                        state: SessionState::Transcribing { done, total },
                        percent: Some(done as f64 / total as f64 * 100.0),
                    });
                }
            },
        )
        .await;
        drop(wavs);

        self.emit(SessionState::Grouping, None);
        let groups = group_segments(&segments, self.config.similarity_threshold);

        self.emit(SessionState::Scoring, None);
        let reply = self.oracle.score(&groups, &segments).await?;

        self.emit(SessionState::Assembling, None);
        let edit = apply_evaluation(&mut segments, &groups, &reply, total_duration);

        self.emit(SessionState::Ready, None);
        info!(
            session = %id,
            groups = groups.len(),
            kept = edit.best_takes.len(),
            final_duration = edit.final_duration,
            "session ready"
        );

        Ok(Session {
            id: id.to_string(),
            config: self.config.clone(),
            source: SourceInfo {
                file_name: handle.file_name().to_string(),
                duration: total_duration,
                size: handle.size(),
                has_video: handle.kind().is_video(),
            },
            segments,
            groups,
            edit,
            overall_notes: reply.overall_notes,
            state: SessionState::Ready,
            engine,
            handle,
            events: self.events.clone(),
        })
    }

    fn emit(&self, state: SessionState, percent: Option<f64>) {
        if let Some(tx) = &self.events {
            let _ = tx.try_send(ProgressEvent { state, percent });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_display() {
        assert_eq!(SessionState::Ready.to_string(), "ready");
        assert_eq!(
            SessionState::Extracting { done: 2, total: 5 }.to_string(),
            "extracting 2/5"
        );
        assert_eq!(
            SessionState::Transcribing { done: 1, total: 3 }.to_string(),
            "transcribing 1/3"
        );
    }
}
