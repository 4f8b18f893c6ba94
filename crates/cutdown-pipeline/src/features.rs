//! Per-segment audio features from the volume probe.

use cutdown_models::AudioMetrics;
use regex::Regex;

/// Parse `mean_volume` / `max_volume` readings out of a volumedetect log.
///
/// Fields the log does not mention stay absent; the quality tag then falls
/// back to treating the segment as near-silent.
pub fn parse_volume_log(log: &str) -> AudioMetrics {
    let mean_re = Regex::new(r"mean_volume:\s*(-?\d+(?:\.\d+)?)\s*dB").unwrap();
    let max_re = Regex::new(r"max_volume:\s*(-?\d+(?:\.\d+)?)\s*dB").unwrap();

    let mean_db = mean_re.captures(log).and_then(|c| c[1].parse().ok());
    let max_db = max_re.captures(log).and_then(|c| c[1].parse().ok());
    AudioMetrics::new(mean_db, max_db)
}

#[cfg(test)]
mod tests {
    use super::*;
    use cutdown_models::QualityTag;

    /// Captured-style volumedetect stderr.
    const LOG_GOOD: &str = r#"ffmpeg version 6.1.1 Copyright (c) 2000-2023 the FFmpeg developers
Input #0, wav, from 'segment.wav':
  Duration: 00:00:03.10, bitrate: 256 kb/s
[Parsed_volumedetect_0 @ 0x560be0f9a900] n_samples: 49600
[Parsed_volumedetect_0 @ 0x560be0f9a900] mean_volume: -18.3 dB
[Parsed_volumedetect_0 @ 0x560be0f9a900] max_volume: -2.1 dB
[Parsed_volumedetect_0 @ 0x560be0f9a900] histogram_2db: 15
size=N/A time=00:00:03.10 bitrate=N/A speed= 643x
"#;

    #[test]
    fn test_parse_both_fields() {
        let metrics = parse_volume_log(LOG_GOOD);
        assert_eq!(metrics.mean_db, Some(-18.3));
        assert_eq!(metrics.max_db, Some(-2.1));
        assert_eq!(metrics.quality, QualityTag::Good);
    }

    #[test]
    fn test_loud_segment() {
        let metrics = parse_volume_log(
            "[Parsed_volumedetect_0 @ 0x1] mean_volume: -3.2 dB\n[Parsed_volumedetect_0 @ 0x1] max_volume: 0.0 dB",
        );
        assert_eq!(metrics.quality, QualityTag::LoudClipping);
        assert_eq!(metrics.max_db, Some(0.0));
    }

    #[test]
    fn test_quiet_segment() {
        let metrics = parse_volume_log("[Parsed_volumedetect_0 @ 0x1] mean_volume: -41.7 dB");
        assert_eq!(metrics.quality, QualityTag::Quiet);
        assert_eq!(metrics.max_db, None);
    }

    #[test]
    fn test_silent_log_leaves_fields_absent() {
        let metrics = parse_volume_log("size=N/A time=00:00:01.00");
        assert_eq!(metrics.mean_db, None);
        assert_eq!(metrics.max_db, None);
        // Missing mean is treated as -70 dB for the tag only
        assert_eq!(metrics.quality, QualityTag::Quiet);
    }
}
