use serde::{Deserialize, Serialize};

use super::error::PipeError;
use super::format::AudioFormat;

/// Optional parameters shared by readers, writers and microphones.
///
/// Zero or `None` means "inherit from the source" for readers and
/// "use the built-in default" for writers. Loadable from JSON.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StreamOptions {
    /// Sample rate in Hz; the tool resamples when it differs from the source.
    pub sample_rate: u32,

    /// Number of interleaved channels.
    pub channels: u16,

    /// Encoder bitrate in bits/s (writers only).
    pub bitrate: u32,

    /// Sample format token, e.g. `s16` or `f32le`.
    pub format: Option<String>,

    /// Output codec passed to the encoder (writers only).
    pub codec: Option<String>,

    /// Video file whose non-audio streams are merged into the output
    /// (writers only).
    pub video: Option<String>,

    /// Zero-based audio stream index (readers only).
    pub stream: usize,
}

impl StreamOptions {
    pub fn from_json(json: &str) -> Result<Self, PipeError> {
        serde_json::from_str(json)
            .map_err(|e| PipeError::InvalidConfiguration(format!("failed to parse options: {}", e)))
    }

    /// Resolve the sample format, defaulting to native-order `s16`.
    pub fn audio_format(&self) -> Result<AudioFormat, PipeError> {
        match self.format.as_deref() {
            None | Some("") => Ok(AudioFormat::native_s16()),
            Some(token) => AudioFormat::normalize_native(token),
        }
    }

    pub fn validate(&self) -> Result<(), PipeError> {
        self.audio_format()?;
        if self.channels > 64 {
            return Err(PipeError::InvalidConfiguration(format!(
                "unsupported channel count: {}",
                self.channels
            )));
        }
        if matches!(self.codec.as_deref(), Some("")) {
            return Err(PipeError::InvalidConfiguration("codec name is empty".into()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_inherit_everything() {
        let options = StreamOptions::default();
        assert_eq!(options.sample_rate, 0);
        assert_eq!(options.channels, 0);
        assert_eq!(options.stream, 0);
        assert_eq!(options.audio_format().unwrap(), AudioFormat::native_s16());
        assert!(options.validate().is_ok());
    }

    #[test]
    fn partial_json_fills_defaults() {
        let options = StreamOptions::from_json(r#"{"sample_rate": 4000, "channels": 1, "format": "s8"}"#).unwrap();
        assert_eq!(options.sample_rate, 4000);
        assert_eq!(options.channels, 1);
        assert_eq!(options.audio_format().unwrap().token(), "s8");
        assert_eq!(options.codec, None);
    }

    #[test]
    fn malformed_json_is_a_configuration_error() {
        let err = StreamOptions::from_json("{\"channels\": \"two\"}").unwrap_err();
        assert!(matches!(err, PipeError::InvalidConfiguration(_)));
    }

    #[test]
    fn validate_rejects_bad_format() {
        let options = StreamOptions {
            format: Some("alaw".into()),
            ..Default::default()
        };
        assert_eq!(options.validate(), Err(PipeError::UnsupportedFormat("alaw".into())));
    }

    #[test]
    fn validate_rejects_empty_codec() {
        let options = StreamOptions {
            codec: Some(String::new()),
            ..Default::default()
        };
        assert!(matches!(options.validate(), Err(PipeError::InvalidConfiguration(_))));
    }
}
