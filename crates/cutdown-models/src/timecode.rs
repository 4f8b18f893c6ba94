//! Timecode parsing and frame math.
//!
//! All timecode outputs are driven by a single conversion:
//! `to_frames(seconds, fps)`. Both exporters must agree on it, so it lives
//! here rather than in either one.

/// Round a time value to three decimals (millisecond precision).
pub fn round3(seconds: f64) -> f64 {
    (seconds * 1000.0).round() / 1000.0
}

/// Convert seconds to an absolute frame count at the given integer timebase.
///
/// Rounds to nearest with ties going down: `to_frames(2.5, 25)` is 62 and
/// `to_frames(1.5, 25)` is 37. Plain floor or ceil here would shift every
/// cut by up to a frame.
pub fn to_frames(seconds: f64, fps: u32) -> i64 {
    // Nearest-integer with half-frame ties truncated; inputs are never
    // negative (media times).
    (seconds * fps as f64 - 0.5).ceil() as i64
}

/// Format seconds as a CMX `HH:MM:SS:FF` timecode at the given timebase.
pub fn edl_timecode(seconds: f64, fps: u32) -> String {
    let total_frames = to_frames(seconds, fps).max(0);
    let fps = fps as i64;
    let frames = total_frames % fps;
    let total_secs = total_frames / fps;
    let hours = total_secs / 3600;
    let mins = (total_secs % 3600) / 60;
    let secs = total_secs % 60;
    format!("{:02}:{:02}:{:02}:{:02}", hours, mins, secs, frames)
}

/// Parse a clock string (`HH:MM:SS`, `HH:MM:SS.ff`, `MM:SS`, or `SS`) to
/// total seconds.
pub fn parse_clock(ts: &str) -> Option<f64> {
    let ts = ts.trim();
    if ts.is_empty() {
        return None;
    }

    let parts: Vec<&str> = ts.split(':').collect();
    let mut total = 0.0;
    for part in &parts {
        let value: f64 = part.parse().ok()?;
        if value < 0.0 {
            return None;
        }
        total = total * 60.0 + value;
    }
    match parts.len() {
        1..=3 => Some(total),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round3() {
        assert_eq!(round3(2.0499999), 2.05);
        assert_eq!(round3(10.0), 10.0);
        assert_eq!(round3(0.0005), 0.001);
    }

    #[test]
    fn test_to_frames_ties_round_down() {
        // 2.5s and 1.5s at 25fps land exactly between frames; ties truncate
        assert_eq!(to_frames(2.5, 25), 62);
        assert_eq!(to_frames(1.5, 25), 37);
        assert_eq!(to_frames(1.0, 25), 25);
        assert_eq!(to_frames(0.0, 25), 0);
        assert_eq!(to_frames(1.02, 25), 25);
        assert_eq!(to_frames(1.06, 25), 27);
        assert_eq!(to_frames(1.5, 30), 45);
    }

    #[test]
    fn test_edl_timecode() {
        assert_eq!(edl_timecode(0.0, 25), "00:00:00:00");
        assert_eq!(edl_timecode(1.0, 25), "00:00:01:00");
        assert_eq!(edl_timecode(2.5, 25), "00:00:02:12");
        assert_eq!(edl_timecode(1.5, 25), "00:00:01:12");
        assert_eq!(edl_timecode(3661.0, 25), "01:01:01:00");
    }

    #[test]
    fn test_parse_clock() {
        assert_eq!(parse_clock("00:00:10.00"), Some(10.0));
        assert_eq!(parse_clock("01:30:00"), Some(5400.0));
        assert_eq!(parse_clock("05:30"), Some(330.0));
        assert_eq!(parse_clock("90"), Some(90.0));
        assert!((parse_clock("00:01:02.5").unwrap() - 62.5).abs() < 1e-9);
        assert_eq!(parse_clock(""), None);
        assert_eq!(parse_clock("1:2:3:4"), None);
        assert_eq!(parse_clock("abc"), None);
    }
}
