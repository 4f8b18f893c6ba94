//! FFmpeg command builder and runner.

use std::process::Stdio;
use std::sync::{Arc, Mutex};

use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::{Child, Command};
use tracing::{debug, warn};

use crate::error::{EngineError, MediaResult};
use crate::progress::RenderProgress;

/// Default wall-clock limit for a single engine invocation.
const DEFAULT_TIMEOUT_SECS: u64 = 600;

/// Completed engine invocation.
#[derive(Debug, Clone)]
pub struct EngineOutput {
    pub success: bool,
    pub exit_code: Option<i32>,
    /// Captured stdout (ffprobe writes its JSON here).
    pub stdout: String,
    /// Full stderr text, which is where ffmpeg writes both its banner and
    /// all filter logs.
    pub stderr: String,
}

/// Builder for FFmpeg invocations.
#[derive(Debug, Clone)]
pub struct EngineCommand {
    program: String,
    args: Vec<String>,
    timeout_secs: u64,
}

impl EngineCommand {
    /// An ffmpeg invocation. `-y` and a non-quiet log level are implied:
    /// the probes depend on the stderr log being populated.
    pub fn ffmpeg() -> Self {
        Self {
            program: "ffmpeg".to_string(),
            args: vec!["-y".to_string()],
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }

    /// An ffprobe invocation.
    pub fn ffprobe() -> Self {
        Self {
            program: "ffprobe".to_string(),
            args: Vec::new(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Seek/duration pair expressed with millisecond precision.
    pub fn interval(self, start: f64, end: f64) -> Self {
        self.args(["-ss".to_string(), format!("{:.3}", start)])
            .args(["-t".to_string(), format!("{:.3}", end - start)])
    }

    pub fn timeout_secs(mut self, secs: u64) -> Self {
        self.timeout_secs = secs;
        self
    }

    /// Run to completion, capturing both output streams.
    pub async fn run(&self) -> MediaResult<EngineOutput> {
        self.run_inner(None).await
    }

    /// Run to completion while parsing `-progress pipe:2` key/value lines
    /// out of stderr. The callback receives each completed progress block.
    pub async fn run_with_progress<F>(&self, on_progress: F) -> MediaResult<EngineOutput>
    where
        F: Fn(RenderProgress) + Send + Sync + 'static,
    {
        self.run_inner(Some(Box::new(on_progress))).await
    }

    async fn run_inner(
        &self,
        on_progress: Option<Box<dyn Fn(RenderProgress) + Send + Sync>>,
    ) -> MediaResult<EngineOutput> {
        debug!(program = %self.program, args = ?self.args, "running engine command");

        let mut child = Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()?;

        let stderr = child.stderr.take().ok_or_else(|| {
            EngineError::exec_failed("stderr not captured", None, None)
        })?;
        let mut stdout = child.stdout.take().ok_or_else(|| {
            EngineError::exec_failed("stdout not captured", None, None)
        })?;

        let stdout_handle = tokio::spawn(async move {
            let mut buf = Vec::new();
            use tokio::io::AsyncReadExt;
            let _ = stdout.read_to_end(&mut buf).await;
            String::from_utf8_lossy(&buf).into_owned()
        });

        // Stderr is drained on a separate task so a chatty filter log can
        // never deadlock the child against a full pipe.
        let collected = Arc::new(Mutex::new(String::new()));
        let sink = Arc::clone(&collected);
        let reader_handle = tokio::spawn(async move {
            let mut lines = BufReader::new(stderr).lines();
            let mut progress = RenderProgress::default();
            while let Ok(Some(line)) = lines.next_line().await {
                if let Some(cb) = &on_progress {
                    if progress.ingest_line(&line) {
                        cb(progress.clone());
                    }
                }
                let mut buf = sink.lock().expect("stderr buffer poisoned");
                buf.push_str(&line);
                buf.push('\n');
            }
        });

        let status = self.wait_with_timeout(&mut child).await;
        let _ = reader_handle.await;
        let stdout_text = stdout_handle.await.unwrap_or_default();

        let status = status?;
        let stderr_text = collected.lock().expect("stderr buffer poisoned").clone();

        Ok(EngineOutput {
            success: status.success(),
            exit_code: status.code(),
            stdout: stdout_text,
            stderr: stderr_text,
        })
    }

    async fn wait_with_timeout(
        &self,
        child: &mut Child,
    ) -> MediaResult<std::process::ExitStatus> {
        let limit = std::time::Duration::from_secs(self.timeout_secs);
        match tokio::time::timeout(limit, child.wait()).await {
            Ok(result) => Ok(result?),
            Err(_) => {
                warn!(
                    program = %self.program,
                    timeout_secs = self.timeout_secs,
                    "engine command timed out, killing process"
                );
                let _ = child.kill().await;
                Err(EngineError::Timeout(self.timeout_secs))
            }
        }
    }
}
