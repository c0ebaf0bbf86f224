//! Fixtures for tests that drive the real tools.

use std::path::PathBuf;

use crate::tools::{self, FFMPEG, FFPROBE};

const WAV_HEADER_SIZE: usize = 44;

/// 44-byte RIFF header for little-endian 16-bit PCM.
fn wav_header(sample_rate: u32, channels: u16, data_size: u32) -> [u8; WAV_HEADER_SIZE] {
    let bit_depth = 16u16;
    let byte_rate = sample_rate * channels as u32 * bit_depth as u32 / 8;
    let block_align = channels * bit_depth / 8;

    let mut header = [0u8; WAV_HEADER_SIZE];
    header[0..4].copy_from_slice(b"RIFF");
    header[4..8].copy_from_slice(&(36 + data_size).to_le_bytes());
    header[8..12].copy_from_slice(b"WAVE");
    header[12..16].copy_from_slice(b"fmt ");
    header[16..20].copy_from_slice(&16u32.to_le_bytes());
    header[20..22].copy_from_slice(&1u16.to_le_bytes()); // PCM
    header[22..24].copy_from_slice(&channels.to_le_bytes());
    header[24..28].copy_from_slice(&sample_rate.to_le_bytes());
    header[28..32].copy_from_slice(&byte_rate.to_le_bytes());
    header[32..34].copy_from_slice(&block_align.to_le_bytes());
    header[34..36].copy_from_slice(&bit_depth.to_le_bytes());
    header[36..40].copy_from_slice(b"data");
    header[40..44].copy_from_slice(&data_size.to_le_bytes());
    header
}

/// Unique path in the temp directory; `name` keeps parallel tests apart.
pub fn temp_path(name: &str) -> PathBuf {
    std::env::temp_dir().join(format!("audio-pipe-{}-{}", std::process::id(), name))
}

/// Deterministic interleaved s16 ramp.
pub fn ramp(frames: usize, channels: u16) -> Vec<i16> {
    (0..frames * channels as usize)
        .map(|i| ((i * 97) % 20_000) as i16 - 10_000)
        .collect()
}

/// Write `samples` as a 16-bit PCM WAV file and return its path.
pub fn write_wav(name: &str, sample_rate: u32, channels: u16, samples: &[i16]) -> String {
    let data: Vec<u8> = samples.iter().flat_map(|s| s.to_le_bytes()).collect();
    let mut bytes = wav_header(sample_rate, channels, data.len() as u32).to_vec();
    bytes.extend_from_slice(&data);

    let path = temp_path(name);
    std::fs::write(&path, bytes).unwrap();
    path.to_string_lossy().into_owned()
}

/// True when the tests needing the real tools can run; logs why not.
pub fn tools_available() -> bool {
    let available = tools::is_installed(FFMPEG) && tools::is_installed(FFPROBE);
    if !available {
        eprintln!("skipping: ffmpeg/ffprobe not installed");
    }
    available
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wav_header_layout() {
        let header = wav_header(48000, 2, 400);
        assert_eq!(&header[0..4], b"RIFF");
        assert_eq!(&header[36..40], b"data");
        assert_eq!(u32::from_le_bytes([header[28], header[29], header[30], header[31]]), 192_000);
        assert_eq!(u16::from_le_bytes([header[32], header[33]]), 4);
    }
}
