//! Cut-down CLI.
//!
//! Usage:
//!   cutdown <input-file> [options]
//!
//! Examples:
//!   cutdown interview.mp4
//!   cutdown voiceover.wav --language de --fps 30
//!   cutdown take.mp4 --noise-db -40 --min-silence 0.5

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use cutdown_models::{CutConfig, TranscriptionModel};
use cutdown_pipeline::{
    CommandSpeechEngine, Pipeline, PipelineError, ProgressEvent, ScoringClient, Session,
};

/// Cut silence from a recording and keep the best take of each line.
#[derive(Parser, Debug)]
#[command(name = "cutdown")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Input audio or video file
    #[arg(required = true)]
    input: PathBuf,

    /// Directory for the generated files (default: alongside the input)
    #[arg(short, long)]
    output_dir: Option<PathBuf>,

    /// Silence-detect noise floor in dBFS
    #[arg(long, default_value_t = -35, allow_hyphen_values = true)]
    noise_db: i32,

    /// Minimum silence duration in seconds
    #[arg(long, default_value_t = 0.70)]
    min_silence: f64,

    /// Minimum speech duration in seconds
    #[arg(long, default_value_t = 0.30)]
    min_speech: f64,

    /// Padding kept around each speech interval in seconds
    #[arg(long, default_value_t = 0.05)]
    padding: f64,

    /// Transcription model: tiny, base, small, medium, or large
    #[arg(short, long, default_value = "small")]
    model: TranscriptionModel,

    /// Transcription language hint (ISO-639-1), or "auto"
    #[arg(short, long, default_value = "auto")]
    language: String,

    /// Take-grouping similarity threshold in [0, 1]
    #[arg(long, default_value_t = 0.60)]
    similarity: f64,

    /// Timebase for the exported timecodes: 24, 25, 30, 50, or 60
    #[arg(long, default_value_t = 25)]
    fps: u32,

    /// Scoring API key (default: CUTDOWN_API_KEY or GEMINI_API_KEY)
    #[arg(long, env = "CUTDOWN_API_KEY", hide_env_values = true)]
    api_key: Option<String>,

    /// Skip rendering the cut media file
    #[arg(long)]
    no_render: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();
    init_tracing();

    let args = Args::parse();
    match run(args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{}", e);
            ExitCode::from(e.exit_code() as u8)
        }
    }
}

fn init_tracing() {
    let use_json = std::env::var("LOG_FORMAT")
        .map(|v| v.to_lowercase() == "json")
        .unwrap_or(false);

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("cutdown=info"));

    if use_json {
        tracing_subscriber::registry()
            .with(fmt::layer().json())
            .with(env_filter)
            .init();
    } else {
        tracing_subscriber::registry()
            .with(
                fmt::layer()
                    .with_ansi(true)
                    .with_target(false)
                    .with_file(false)
                    .with_line_number(false),
            )
            .with(env_filter)
            .init();
    }
}

async fn run(args: Args) -> Result<(), PipelineError> {
    let config = CutConfig {
        noise_threshold_db: args.noise_db,
        min_silence_s: args.min_silence,
        min_speech_s: args.min_speech,
        padding_s: args.padding.max(0.0),
        transcription_model: args.model,
        similarity_threshold: args.similarity.clamp(0.0, 1.0),
        fps: args.fps,
        ..CutConfig::default()
    }
    .with_language(args.language.clone());

    let api_key = args
        .api_key
        .clone()
        .or_else(|| std::env::var("GEMINI_API_KEY").ok())
        .unwrap_or_default();
    let oracle = ScoringClient::new(api_key)?;

    let (events_tx, mut events_rx) = tokio::sync::mpsc::channel::<ProgressEvent>(32);
    let progress = tokio::spawn(async move {
        while let Some(event) = events_rx.recv().await {
            match event.percent {
                Some(percent) => info!("{} ({:.0}%)", event.state, percent),
                None => info!("{}", event.state),
            }
        }
    });

    let pipeline = Pipeline::new(CommandSpeechEngine::from_env(), oracle, config)
        .with_events(events_tx);
    let mut session = pipeline.run(&args.input).await?;

    let summary = session.edit.summary(&session.groups);
    info!(
        groups = summary.group_count,
        takes = summary.take_count,
        kept = summary.kept_takes,
        final_duration = summary.final_duration,
        removed = summary.removed_duration,
        "edit assembled"
    );

    let out_dir = args
        .output_dir
        .clone()
        .or_else(|| args.input.parent().map(PathBuf::from))
        .unwrap_or_else(|| PathBuf::from("."));
    tokio::fs::create_dir_all(&out_dir).await?;
    let base = args
        .input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "cutdown".to_string());

    let result = write_outputs(&mut session, &out_dir, &base, args.no_render).await;
    progress.abort();
    result
}

/// Write the exports and the rendered cut. Each export failure is logged
/// and the rest still get written; the first failure decides the exit.
async fn write_outputs(
    session: &mut Session,
    out_dir: &std::path::Path,
    base: &str,
    no_render: bool,
) -> Result<(), PipelineError> {
    let mut first_failure: Option<PipelineError> = None;

    let xml_path = out_dir.join(format!("{}_edit.xml", base));
    match tokio::fs::write(&xml_path, session.xmeml()).await {
        Ok(()) => info!(path = %xml_path.display(), "wrote XMEML"),
        Err(e) => note_failure(&mut first_failure, "XMEML", e),
    }

    let edl_path = out_dir.join(format!("{}_edit.edl", base));
    match tokio::fs::write(&edl_path, session.edl()).await {
        Ok(()) => info!(path = %edl_path.display(), "wrote EDL"),
        Err(e) => note_failure(&mut first_failure, "EDL", e),
    }

    let report_path = out_dir.join(format!("{}_report.json", base));
    match serde_json::to_string_pretty(&session.report()) {
        Ok(report) => match tokio::fs::write(&report_path, report).await {
            Ok(()) => info!(path = %report_path.display(), "wrote report"),
            Err(e) => note_failure(&mut first_failure, "report", e),
        },
        Err(e) => note_failure(&mut first_failure, "report", e),
    }

    if !no_render {
        let cut_path = out_dir.join(format!("{}_cut.{}", base, session.cut_extension()));
        let bytes = session.render_cut().await?;
        match tokio::fs::write(&cut_path, bytes).await {
            Ok(()) => info!(path = %cut_path.display(), "wrote cut"),
            Err(e) => note_failure(&mut first_failure, "cut", e),
        }
    }

    match first_failure {
        Some(e) => Err(e),
        None => {
            info!("session complete");
            Ok(())
        }
    }
}

fn note_failure(first: &mut Option<PipelineError>, what: &str, error: impl std::fmt::Display) {
    warn!("failed to write {}: {}", what, error);
    if first.is_none() {
        *first = Some(PipelineError::export(format!("{}: {}", what, error)));
    }
}
