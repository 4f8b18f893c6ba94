//! FFmpeg `-progress pipe:2` parsing.

use serde::{Deserialize, Serialize};

/// Callback invoked with render progress in percent (0-100).
pub type ProgressFn = Box<dyn Fn(f64) + Send + Sync>;

/// Progress information parsed from FFmpeg's key/value stream.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RenderProgress {
    /// Output time in milliseconds.
    pub out_time_ms: i64,
    /// Encoding speed relative to realtime (e.g. 1.5 = 1.5x).
    pub speed: f64,
    /// Whether the engine reported `progress=end`.
    pub is_complete: bool,
}

impl RenderProgress {
    /// Progress percentage given the expected output duration.
    pub fn percentage(&self, total_duration_ms: i64) -> f64 {
        if self.is_complete {
            return 100.0;
        }
        if total_duration_ms <= 0 {
            return 0.0;
        }
        ((self.out_time_ms as f64 / total_duration_ms as f64) * 100.0).min(100.0)
    }

    /// Feed one line of `-progress` output. Returns true when the line
    /// completed an update block (the `progress=` key), meaning the struct
    /// is in a consistent state to report.
    pub fn ingest_line(&mut self, line: &str) -> bool {
        let Some((key, value)) = line.trim().split_once('=') else {
            return false;
        };
        match key {
            "out_time_ms" | "out_time_us" => {
                // Despite the name, ffmpeg reports both keys in microseconds
                if let Ok(us) = value.parse::<i64>() {
                    self.out_time_ms = us / 1000;
                }
            }
            "speed" => {
                if let Some(speed) = value.strip_suffix('x').and_then(|s| s.parse().ok()) {
                    self.speed = speed;
                }
            }
            "progress" => {
                if value == "end" {
                    self.is_complete = true;
                }
                return true;
            }
            _ => {}
        }
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ingest_lines() {
        let mut progress = RenderProgress::default();

        assert!(!progress.ingest_line("out_time_ms=5000000"));
        assert_eq!(progress.out_time_ms, 5000);

        assert!(!progress.ingest_line("speed=1.5x"));
        assert!((progress.speed - 1.5).abs() < 0.01);

        assert!(progress.ingest_line("progress=continue"));
        assert!(!progress.is_complete);

        assert!(progress.ingest_line("progress=end"));
        assert!(progress.is_complete);
    }

    #[test]
    fn test_percentage() {
        let progress = RenderProgress {
            out_time_ms: 5000,
            ..Default::default()
        };
        assert!((progress.percentage(10000) - 50.0).abs() < 0.01);
        assert!((progress.percentage(0) - 0.0).abs() < 0.01);

        let done = RenderProgress {
            is_complete: true,
            ..Default::default()
        };
        assert!((done.percentage(10000) - 100.0).abs() < 0.01);
    }

    #[test]
    fn test_ignores_garbage() {
        let mut progress = RenderProgress::default();
        assert!(!progress.ingest_line("frame dropped"));
        assert!(!progress.ingest_line("speed=N/A"));
        assert_eq!(progress.out_time_ms, 0);
    }
}
