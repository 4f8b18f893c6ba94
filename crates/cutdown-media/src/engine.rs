//! The media engine: ingest, probes, extraction, and the final cut render.
//!
//! All scratch files live in a per-engine temp directory. Intermediate
//! outputs are read into memory and deleted immediately; dropping the
//! engine releases everything else.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use serde::Deserialize;
use tempfile::TempDir;
use tokio::io::AsyncReadExt;
use tracing::{debug, info, warn};

use crate::command::EngineCommand;
use crate::error::{EngineError, MediaResult};

/// Sources up to this size are copied into scratch space in full; larger
/// ones are read in place through a streamed view.
const INLINE_COPY_LIMIT: u64 = 500 * 1024 * 1024;

/// Probe invocations are short; give them a tighter leash than renders.
const PROBE_TIMEOUT_SECS: u64 = 180;

/// Extensions treated as video containers.
const VIDEO_EXTENSIONS: [&str; 4] = ["mp4", "mov", "mkv", "webm"];

/// Broad media classification, decided by source extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaKind {
    Video,
    Audio,
}

impl MediaKind {
    pub fn from_path(path: &Path) -> Self {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase())
            .unwrap_or_default();
        if VIDEO_EXTENSIONS.contains(&ext.as_str()) {
            MediaKind::Video
        } else {
            MediaKind::Audio
        }
    }

    pub fn is_video(&self) -> bool {
        matches!(self, MediaKind::Video)
    }
}

/// Container for the rendered cut, chosen from the source kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputContainer {
    VideoMp4,
    AudioMp3,
}

impl OutputContainer {
    pub fn for_kind(kind: MediaKind) -> Self {
        match kind {
            MediaKind::Video => OutputContainer::VideoMp4,
            MediaKind::Audio => OutputContainer::AudioMp3,
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            OutputContainer::VideoMp4 => "mp4",
            OutputContainer::AudioMp3 => "mp3",
        }
    }
}

/// An ingested source the engine can read.
#[derive(Debug, Clone)]
pub struct SourceHandle {
    path: PathBuf,
    file_name: String,
    size: u64,
    streamed: bool,
    kind: MediaKind,
}

impl SourceHandle {
    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    pub fn size(&self) -> u64 {
        self.size
    }

    /// Whether the source is read in place rather than from a scratch copy.
    pub fn is_streamed(&self) -> bool {
        self.streamed
    }

    pub fn kind(&self) -> MediaKind {
        self.kind
    }

    fn path_arg(&self) -> String {
        self.path.to_string_lossy().into_owned()
    }
}

/// Source metadata from ffprobe.
#[derive(Debug, Clone)]
pub struct MediaInfo {
    /// Duration in seconds.
    pub duration: f64,
    /// File size in bytes.
    pub size: u64,
    /// Whether the container holds a video stream.
    pub has_video: bool,
    /// Audio sample rate, when reported.
    pub sample_rate: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct FfprobeOutput {
    format: FfprobeFormat,
    #[serde(default)]
    streams: Vec<FfprobeStream>,
}

#[derive(Debug, Deserialize)]
struct FfprobeFormat {
    duration: Option<String>,
    size: Option<String>,
}

#[derive(Debug, Deserialize)]
struct FfprobeStream {
    codec_type: String,
    sample_rate: Option<String>,
}

/// The media-engine adapter.
pub struct MediaEngine {
    scratch: TempDir,
    next_scratch_id: AtomicU64,
}

impl MediaEngine {
    /// Verify the engine binaries exist and set up scratch space.
    pub fn load() -> MediaResult<Self> {
        which::which("ffmpeg")
            .map_err(|_| EngineError::load_failed("ffmpeg not found in PATH"))?;
        which::which("ffprobe")
            .map_err(|_| EngineError::load_failed("ffprobe not found in PATH"))?;

        let scratch = TempDir::new()?;
        debug!(scratch = %scratch.path().display(), "media engine loaded");
        Ok(Self {
            scratch,
            next_scratch_id: AtomicU64::new(0),
        })
    }

    /// Place the source where the engine can read it.
    ///
    /// Small sources are copied into scratch space in full; sources above
    /// the copy limit are mounted as a streamed-read view of the original
    /// path, verified with a one-byte probe read.
    pub async fn ingest(&self, source: &Path) -> MediaResult<SourceHandle> {
        let meta = tokio::fs::metadata(source).await.map_err(|e| {
            EngineError::source_unreadable(format!("{}: {}", source.display(), e))
        })?;
        if !meta.is_file() {
            return Err(EngineError::source_unreadable(format!(
                "{} is not a regular file",
                source.display()
            )));
        }

        let file_name = source
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "source".to_string());
        let kind = MediaKind::from_path(source);
        let size = meta.len();

        if size <= INLINE_COPY_LIMIT {
            let dest = self.scratch.path().join(&file_name);
            tokio::fs::copy(source, &dest).await.map_err(|e| {
                EngineError::source_unreadable(format!("copy failed: {}", e))
            })?;
            debug!(source = %source.display(), size, "source copied into scratch");
            return Ok(SourceHandle {
                path: dest,
                file_name,
                size,
                streamed: false,
                kind,
            });
        }

        // Too large to copy: keep reading from the original location, but
        // fail now if the handle cannot satisfy even a single-byte read.
        let mut file = tokio::fs::File::open(source).await.map_err(|e| {
            EngineError::source_unreadable(format!("{}: {}", source.display(), e))
        })?;
        let mut probe = [0u8; 1];
        file.read_exact(&mut probe).await.map_err(|e| {
            EngineError::source_unreadable(format!("probe read failed: {}", e))
        })?;

        info!(source = %source.display(), size, "large source mounted as streamed view");
        Ok(SourceHandle {
            path: source.to_path_buf(),
            file_name,
            size,
            streamed: true,
            kind,
        })
    }

    /// Probe source metadata.
    pub async fn probe(&self, handle: &SourceHandle) -> MediaResult<MediaInfo> {
        let output = EngineCommand::ffprobe()
            .args([
                "-v",
                "quiet",
                "-print_format",
                "json",
                "-show_format",
                "-show_streams",
            ])
            .arg(handle.path_arg())
            .timeout_secs(PROBE_TIMEOUT_SECS)
            .run()
            .await?;

        if !output.success {
            return Err(EngineError::exec_failed(
                "ffprobe failed",
                last_log_line(&output.stderr),
                output.exit_code,
            ));
        }

        let probe: FfprobeOutput = serde_json::from_str(&output.stdout).map_err(|e| {
            EngineError::exec_failed(format!("unparseable ffprobe output: {}", e), None, None)
        })?;

        let duration = probe
            .format
            .duration
            .as_deref()
            .and_then(|d| d.parse().ok())
            .unwrap_or(0.0);
        let size = probe
            .format
            .size
            .as_deref()
            .and_then(|s| s.parse().ok())
            .unwrap_or(handle.size);
        let has_video = probe.streams.iter().any(|s| s.codec_type == "video");
        let sample_rate = probe
            .streams
            .iter()
            .find(|s| s.codec_type == "audio")
            .and_then(|s| s.sample_rate.as_deref())
            .and_then(|r| r.parse().ok());

        Ok(MediaInfo {
            duration,
            size,
            has_video,
            sample_rate,
        })
    }

    /// Run the silence-detect filter and return the engine's stderr log.
    ///
    /// The log carries both the `Duration:` banner line and the
    /// `silence_start`/`silence_end` filter lines the segmenter needs.
    pub async fn silence_log(
        &self,
        handle: &SourceHandle,
        noise_db: i32,
        min_silence_s: f64,
    ) -> MediaResult<String> {
        let filter = format!("silencedetect=noise={}dB:d={}", noise_db, min_silence_s);
        let output = EngineCommand::ffmpeg()
            .args(["-i".to_string(), handle.path_arg()])
            .args(["-af".to_string(), filter])
            .args(["-f", "null", "-"])
            .timeout_secs(PROBE_TIMEOUT_SECS)
            .run()
            .await?;

        // A `-f null` probe can exit non-zero on oddly muxed sources while
        // still writing a complete log; the log is what we are here for.
        if !output.success && !output.stderr.contains("Duration:") {
            return Err(EngineError::exec_failed(
                "silence-detect probe failed",
                last_log_line(&output.stderr),
                output.exit_code,
            ));
        }
        if !output.success {
            warn!(
                exit_code = ?output.exit_code,
                "silence-detect exited non-zero with populated log, continuing"
            );
        }

        Ok(output.stderr)
    }

    /// Extract an interval as 16 kHz mono 16-bit PCM WAV and return its
    /// bytes. The scratch file is removed after reading.
    pub async fn extract_wav(
        &self,
        handle: &SourceHandle,
        start: f64,
        end: f64,
    ) -> MediaResult<Vec<u8>> {
        let out_path = self.scratch_path("segment", "wav");
        let (fast_seek, accurate_seek) = split_seek(start);

        let output = EngineCommand::ffmpeg()
            .args(["-ss".to_string(), format!("{:.3}", fast_seek)])
            .args(["-i".to_string(), handle.path_arg()])
            .args(["-ss".to_string(), format!("{:.3}", accurate_seek)])
            .args(["-t".to_string(), format!("{:.3}", end - start)])
            .arg("-vn")
            .args(["-ac", "1"])
            .args(["-ar", "16000"])
            .args(["-c:a", "pcm_s16le"])
            .args(["-f", "wav"])
            .arg(out_path.to_string_lossy())
            .run()
            .await?;

        let written = tokio::fs::metadata(&out_path)
            .await
            .map(|m| m.len() > 0)
            .unwrap_or(false);
        if !output.success && !written {
            return Err(EngineError::exec_failed(
                format!("WAV extraction failed for {:.3}-{:.3}", start, end),
                last_log_line(&output.stderr),
                output.exit_code,
            ));
        }

        let bytes = tokio::fs::read(&out_path).await?;
        tokio::fs::remove_file(&out_path).await.ok();
        Ok(bytes)
    }

    /// Run the volume probe over an interval and return the stderr log.
    pub async fn volume_log(
        &self,
        handle: &SourceHandle,
        start: f64,
        end: f64,
    ) -> MediaResult<String> {
        let (fast_seek, accurate_seek) = split_seek(start);
        let output = EngineCommand::ffmpeg()
            .args(["-ss".to_string(), format!("{:.3}", fast_seek)])
            .args(["-i".to_string(), handle.path_arg()])
            .args(["-ss".to_string(), format!("{:.3}", accurate_seek)])
            .args(["-t".to_string(), format!("{:.3}", end - start)])
            .args(["-af", "volumedetect"])
            .args(["-f", "null", "-"])
            .timeout_secs(PROBE_TIMEOUT_SECS)
            .run()
            .await?;

        if !output.success && !output.stderr.contains("volumedetect") {
            return Err(EngineError::exec_failed(
                format!("volume probe failed for {:.3}-{:.3}", start, end),
                last_log_line(&output.stderr),
                output.exit_code,
            ));
        }

        Ok(output.stderr)
    }

    /// Concatenate the given source intervals into a single cut and return
    /// its bytes.
    ///
    /// Each interval is extracted with accurate seeking, then joined with
    /// the concat demuxer under stream copy. Progress runs 0-90 across
    /// extraction and 90-100 across the concat.
    pub async fn render_cut<F>(
        &self,
        handle: &SourceHandle,
        intervals: &[(f64, f64)],
        container: OutputContainer,
        on_progress: F,
    ) -> MediaResult<Vec<u8>>
    where
        F: Fn(f64) + Send + Sync + 'static,
    {
        if intervals.is_empty() {
            return Err(EngineError::exec_failed(
                "nothing to render: no intervals",
                None,
                None,
            ));
        }

        info!(
            segments = intervals.len(),
            container = container.extension(),
            "rendering cut"
        );
        let on_progress = Arc::new(on_progress);
        on_progress(0.0);

        let mut segment_paths = Vec::with_capacity(intervals.len());
        for (i, &(start, end)) in intervals.iter().enumerate() {
            let seg_path = self.scratch.path().join(format!(
                "cut_{:04}.{}",
                i,
                container.extension()
            ));
            self.extract_render_segment(handle, start, end, container, &seg_path)
                .await?;
            segment_paths.push(seg_path);
            on_progress((i + 1) as f64 / intervals.len() as f64 * 90.0);
        }

        // Concat demuxer list; paths are scratch-owned, single-quoted per
        // the demuxer's escaping rules.
        let list_path = self.scratch_path("concat", "txt");
        let list: String = segment_paths
            .iter()
            .map(|p| format!("file '{}'\n", p.display()))
            .collect();
        tokio::fs::write(&list_path, &list).await?;

        let out_path = self.scratch_path("cut", container.extension());
        let total_ms = (intervals.iter().map(|(s, e)| e - s).sum::<f64>() * 1000.0) as i64;
        let concat_progress = Arc::clone(&on_progress);

        let mut cmd = EngineCommand::ffmpeg()
            .args(["-progress", "pipe:2"])
            .args(["-f", "concat", "-safe", "0"])
            .args(["-i".to_string(), list_path.to_string_lossy().into_owned()])
            .args(["-c", "copy"]);
        if container == OutputContainer::VideoMp4 {
            cmd = cmd.args(["-movflags", "+faststart"]);
        }
        let output = cmd
            .arg(out_path.to_string_lossy())
            .run_with_progress(move |p| {
                concat_progress(90.0 + p.percentage(total_ms) * 0.1);
            })
            .await?;

        if !output.success {
            return Err(EngineError::exec_failed(
                "concat render failed",
                last_log_line(&output.stderr),
                output.exit_code,
            ));
        }

        let bytes = tokio::fs::read(&out_path).await?;
        for path in segment_paths.iter().chain([&list_path, &out_path]) {
            tokio::fs::remove_file(path).await.ok();
        }
        on_progress(100.0);

        info!(bytes = bytes.len(), "cut rendered");
        Ok(bytes)
    }

    async fn extract_render_segment(
        &self,
        handle: &SourceHandle,
        start: f64,
        end: f64,
        container: OutputContainer,
        out_path: &Path,
    ) -> MediaResult<()> {
        let (fast_seek, accurate_seek) = split_seek(start);
        let mut cmd = EngineCommand::ffmpeg()
            .args(["-ss".to_string(), format!("{:.3}", fast_seek)])
            .args(["-i".to_string(), handle.path_arg()])
            .args(["-ss".to_string(), format!("{:.3}", accurate_seek)])
            .args(["-t".to_string(), format!("{:.3}", end - start)]);

        cmd = match container {
            // Re-encode for frame-accurate cuts: stream copy cannot cut
            // between keyframes.
            OutputContainer::VideoMp4 => cmd
                .args(["-c:v", "libx264"])
                .args(["-preset", "veryfast"])
                .args(["-crf", "20"])
                .args(["-c:a", "aac"])
                .args(["-b:a", "128k"])
                .args(["-avoid_negative_ts", "make_zero"]),
            OutputContainer::AudioMp3 => cmd
                .arg("-vn")
                .args(["-c:a", "libmp3lame"])
                .args(["-q:a", "2"]),
        };

        let output = cmd.arg(out_path.to_string_lossy()).run().await?;
        if !output.success {
            return Err(EngineError::exec_failed(
                format!("segment render failed for {:.3}-{:.3}", start, end),
                last_log_line(&output.stderr),
                output.exit_code,
            ));
        }
        Ok(())
    }

    fn scratch_path(&self, stem: &str, ext: &str) -> PathBuf {
        let id = self.next_scratch_id.fetch_add(1, Ordering::Relaxed);
        self.scratch.path().join(format!("{}_{:06}.{}", stem, id, ext))
    }
}

/// Two-pass seek: fast input seek to a nearby keyframe, accurate output
/// seek from there.
fn split_seek(start: f64) -> (f64, f64) {
    let fast = if start > 5.0 { start - 5.0 } else { 0.0 };
    (fast, start - fast)
}

fn last_log_line(stderr: &str) -> Option<String> {
    stderr
        .lines()
        .rev()
        .find(|l| !l.trim().is_empty())
        .map(|l| l.trim().to_string())
}
