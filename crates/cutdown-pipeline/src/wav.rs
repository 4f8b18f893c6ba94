//! RIFF/WAV decoding for the transcription path.
//!
//! The engine hands back 16 kHz mono 16-bit PCM. The decoder walks the
//! RIFF chunk list to find `data`; if the walk fails on a nonstandard
//! header it falls back to the classic 44-byte offset.

use thiserror::Error;

/// Canonical WAV header size, used as a last-resort data offset.
const CLASSIC_HEADER_LEN: usize = 44;

#[derive(Debug, Error, PartialEq)]
pub enum WavError {
    #[error("not a RIFF/WAVE container")]
    NotRiff,
    #[error("container truncated")]
    Truncated,
}

/// Decode 16-bit little-endian PCM samples to float32 in [-1.0, 1.0].
pub fn decode_wav(bytes: &[u8]) -> Result<Vec<f32>, WavError> {
    if bytes.len() < 12 || &bytes[0..4] != b"RIFF" || &bytes[8..12] != b"WAVE" {
        return Err(WavError::NotRiff);
    }

    let data = match find_data_chunk(bytes) {
        Some(range) => &bytes[range.0..range.1],
        None => {
            if bytes.len() <= CLASSIC_HEADER_LEN {
                return Err(WavError::Truncated);
            }
            &bytes[CLASSIC_HEADER_LEN..]
        }
    };

    let samples = data
        .chunks_exact(2)
        .map(|b| i16::from_le_bytes([b[0], b[1]]) as f32 / 32768.0)
        .collect();
    Ok(samples)
}

/// Walk RIFF chunks from offset 12 looking for `data`. Returns the byte
/// range of the chunk payload.
fn find_data_chunk(bytes: &[u8]) -> Option<(usize, usize)> {
    let mut offset = 12;
    while offset + 8 <= bytes.len() {
        let id = &bytes[offset..offset + 4];
        let size = u32::from_le_bytes([
            bytes[offset + 4],
            bytes[offset + 5],
            bytes[offset + 6],
            bytes[offset + 7],
        ]) as usize;
        let payload = offset + 8;

        if id == b"data" {
            let end = (payload + size).min(bytes.len());
            return Some((payload, end));
        }

        // Chunks are word-aligned; odd sizes carry a pad byte
        offset = payload + size + (size & 1);
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Build a minimal valid WAV around the given PCM samples.
    fn wav_bytes(samples: &[i16]) -> Vec<u8> {
        let data_len = samples.len() * 2;
        let mut out = Vec::new();
        out.extend_from_slice(b"RIFF");
        out.extend_from_slice(&((36 + data_len) as u32).to_le_bytes());
        out.extend_from_slice(b"WAVE");
        out.extend_from_slice(b"fmt ");
        out.extend_from_slice(&16u32.to_le_bytes());
        out.extend_from_slice(&1u16.to_le_bytes()); // PCM
        out.extend_from_slice(&1u16.to_le_bytes()); // mono
        out.extend_from_slice(&16000u32.to_le_bytes());
        out.extend_from_slice(&32000u32.to_le_bytes());
        out.extend_from_slice(&2u16.to_le_bytes());
        out.extend_from_slice(&16u16.to_le_bytes());
        out.extend_from_slice(b"data");
        out.extend_from_slice(&(data_len as u32).to_le_bytes());
        for s in samples {
            out.extend_from_slice(&s.to_le_bytes());
        }
        out
    }

    #[test]
    fn test_decode_round_values() {
        let bytes = wav_bytes(&[0, 16384, -16384, 32767, -32768]);
        let samples = decode_wav(&bytes).unwrap();
        assert_eq!(samples.len(), 5);
        assert!((samples[0] - 0.0).abs() < 1e-6);
        assert!((samples[1] - 0.5).abs() < 1e-6);
        assert!((samples[2] + 0.5).abs() < 1e-6);
        assert!(samples[3] < 1.0 && samples[3] > 0.999);
        assert!((samples[4] + 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_extra_chunk_before_data() {
        // LIST chunk between fmt and data, as some muxers emit
        let mut bytes = wav_bytes(&[100, -100]);
        let data_at = bytes.len() - (4 + 4 + 4);
        let mut with_list = bytes[..data_at].to_vec();
        with_list.extend_from_slice(b"LIST");
        with_list.extend_from_slice(&4u32.to_le_bytes());
        with_list.extend_from_slice(b"INFO");
        with_list.extend_from_slice(&bytes.split_off(data_at));

        let samples = decode_wav(&with_list).unwrap();
        assert_eq!(samples.len(), 2);
    }

    #[test]
    fn test_fallback_to_classic_offset() {
        // Corrupt the data chunk id so the walk fails; payload still sits
        // at the canonical 44-byte offset
        let mut bytes = wav_bytes(&[1000, 2000, 3000]);
        let data_at = bytes.len() - (4 + 4 + 6);
        bytes[data_at..data_at + 4].copy_from_slice(b"dat\x00");
        // The bogus chunk size now sends the walk past the end
        let samples = decode_wav(&bytes).unwrap();
        assert_eq!(samples.len(), 3);
    }

    #[test]
    fn test_not_riff() {
        assert_eq!(decode_wav(b"OggS....").unwrap_err(), WavError::NotRiff);
        assert_eq!(decode_wav(b"").unwrap_err(), WavError::NotRiff);
    }

    #[test]
    fn test_empty_data_chunk() {
        let bytes = wav_bytes(&[]);
        assert!(decode_wav(&bytes).unwrap().is_empty());
    }
}
