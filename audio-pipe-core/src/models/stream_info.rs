use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use super::error::PipeError;

/// Class of elementary stream inside a container, as selected by the probe
/// tool's `-select_streams` letter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StreamClass {
    Video,
    Audio,
    Subtitle,
    Data,
    Attachment,
}

impl StreamClass {
    /// Every class other than audio, in the order they are probed.
    pub const NON_AUDIO: [StreamClass; 4] = [Self::Video, Self::Subtitle, Self::Data, Self::Attachment];

    pub fn selector(self) -> &'static str {
        match self {
            Self::Video => "v",
            Self::Audio => "a",
            Self::Subtitle => "s",
            Self::Data => "d",
            Self::Attachment => "t",
        }
    }
}

impl fmt::Display for StreamClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Video => "video",
            Self::Audio => "audio",
            Self::Subtitle => "subtitle",
            Self::Data => "data",
            Self::Attachment => "attachment",
        };
        f.write_str(name)
    }
}

/// Key/value record for one elementary stream, as reported by the probe.
///
/// The first value seen for a key is kept; later duplicates are dropped.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StreamMetadata {
    entries: HashMap<String, String>,
}

impl StreamMetadata {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert unless `key` is already present. Returns whether it was stored.
    pub fn insert_first(&mut self, key: &str, value: &str) -> bool {
        if self.entries.contains_key(key) {
            return false;
        }
        self.entries.insert(key.to_string(), value.to_string());
        true
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }

    /// Numeric value for `key`; missing or unparsable values read as `None`.
    pub fn get_f64(&self, key: &str) -> Option<f64> {
        self.get(key).and_then(|v| v.trim().parse().ok())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn as_map(&self) -> &HashMap<String, String> {
        &self.entries
    }

    pub fn to_json(&self) -> Result<String, PipeError> {
        serde_json::to_string_pretty(self)
            .map_err(|e| PipeError::InvalidConfiguration(format!("failed to serialize metadata: {}", e)))
    }
}

/// Audio properties extracted from a probe record.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AudioStreamInfo {
    pub sample_rate: u32,
    pub channels: u16,
    pub bitrate: u32,
    pub duration_secs: f64,
    pub codec: String,
}

impl AudioStreamInfo {
    /// Reads `sample_rate`, `channels`, `bit_rate`, `duration` and
    /// `codec_name`. Missing or unparsable numbers become 0.
    pub fn from_metadata(metadata: &StreamMetadata) -> Self {
        let number = |key| metadata.get_f64(key).unwrap_or(0.0);
        Self {
            sample_rate: number("sample_rate") as u32,
            channels: number("channels") as u16,
            bitrate: number("bit_rate") as u32,
            duration_secs: number("duration"),
            codec: metadata.get("codec_name").unwrap_or_default().to_string(),
        }
    }
}

/// Size in bytes of `duration_secs` of audio, rounded up to whole frames.
pub fn stream_size_bytes(sample_rate: u32, frame_size: usize, duration_secs: f64) -> usize {
    if frame_size == 0 {
        return 0;
    }
    let second = sample_rate as usize * frame_size;
    let total = (second as f64 * duration_secs).ceil() as usize;
    total + (frame_size - total % frame_size) % frame_size
}

/// A capture device found by enumeration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceDescriptor {
    /// Position in the enumeration output.
    pub index: usize,
    /// Effective name, after duplicate resolution.
    pub name: String,
}
