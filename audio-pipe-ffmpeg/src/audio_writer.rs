//! Encoding raw samples into media files.

use audio_pipe_core::models::config::StreamOptions;
use audio_pipe_core::models::error::PipeError;
use audio_pipe_core::models::format::AudioFormat;
use audio_pipe_core::models::state::{CloseReason, StreamState};
use audio_pipe_core::models::stream_info::StreamClass;
use audio_pipe_core::processing::sample_codec;
use audio_pipe_core::session::cancellation::CancellationToken;
use audio_pipe_core::traits::sample_sink::SampleSink;

use crate::lifecycle::StreamLifecycle;
use crate::pipeline::PipeEnd;
use crate::probe;
use crate::tools::{self, FFMPEG, FFPROBE};

pub const DEFAULT_SAMPLE_RATE: u32 = 44100;
pub const DEFAULT_CHANNELS: u16 = 1;

/// Writes interleaved samples to an encoder that produces `filename`.
///
/// An existing output file is overwritten. When a video file is given its
/// video stream is copied into the output next to the encoded audio.
pub struct AudioWriter {
    filename: String,
    format: AudioFormat,
    sample_rate: u32,
    channels: u16,
    bitrate: u32,
    codec: Option<String>,
    video: Option<String>,
    lifecycle: StreamLifecycle,
}

impl AudioWriter {
    pub fn new(filename: &str, options: &StreamOptions) -> Result<Self, PipeError> {
        options.validate()?;
        let format = options.audio_format()?;
        tools::ensure_installed(FFMPEG)?;

        let video = match options.video.as_deref() {
            None | Some("") => None,
            Some(video) => {
                tools::ensure_exists(video)?;
                tools::ensure_installed(FFPROBE)?;
                if probe::probe(video, StreamClass::Video)?.is_empty() {
                    return Err(PipeError::NoMatchingStream {
                        target: video.to_string(),
                        class: StreamClass::Video.to_string(),
                    });
                }
                Some(video.to_string())
            }
        };

        Ok(Self::with_format(filename, format, video, options))
    }

    fn with_format(filename: &str, format: AudioFormat, video: Option<String>, options: &StreamOptions) -> Self {
        let sample_rate = if options.sample_rate == 0 { DEFAULT_SAMPLE_RATE } else { options.sample_rate };
        let channels = if options.channels == 0 { DEFAULT_CHANNELS } else { options.channels };

        Self {
            filename: filename.to_string(),
            format,
            sample_rate,
            channels,
            bitrate: options.bitrate,
            codec: options.codec.clone().filter(|c| !c.is_empty()),
            video,
            lifecycle: StreamLifecycle::new(FFMPEG, PipeEnd::Stdin),
        }
    }

    /// Kill the encoder when `token` is cancelled.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.lifecycle.set_cancellation(token);
        self
    }

    pub fn filename(&self) -> &str {
        &self.filename
    }

    /// Target bitrate in bits/s; 0 leaves it to the encoder.
    pub fn bitrate(&self) -> u32 {
        self.bitrate
    }

    pub fn codec(&self) -> Option<&str> {
        self.codec.as_deref()
    }

    pub fn video(&self) -> Option<&str> {
        self.video.as_deref()
    }

    pub fn state(&self) -> StreamState {
        self.lifecycle.state()
    }

    fn pipeline_args(&self) -> Vec<String> {
        let mut args: Vec<String> = vec![
            "-y".into(),
            "-loglevel".into(),
            "quiet".into(),
            "-f".into(),
            self.format.token(),
            "-acodec".into(),
            self.format.pcm_codec(),
            "-ar".into(),
            self.sample_rate.to_string(),
            "-ac".into(),
            self.channels.to_string(),
            "-i".into(),
            "-".into(),
        ];
        match &self.video {
            Some(video) => args.extend(["-i".into(), video.clone(), "-vcodec".into(), "copy".into()]),
            None => args.push("-vn".into()),
        }
        if let Some(codec) = &self.codec {
            args.extend(["-acodec".into(), codec.clone()]);
        }
        if self.bitrate > 0 {
            args.extend(["-ab".into(), self.bitrate.to_string()]);
        }
        args.push(self.filename.clone());
        args
    }

    /// Spawn the encoder. Does nothing when already streaming.
    pub fn start(&mut self) -> Result<(), PipeError> {
        let args = self.pipeline_args();
        self.lifecycle.start(args)
    }
}

impl SampleSink for AudioWriter {
    fn format(&self) -> AudioFormat {
        self.format
    }

    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    fn channels(&self) -> u16 {
        self.channels
    }

    fn write(&mut self, bytes: &[u8]) -> Result<(), PipeError> {
        sample_codec::check_alignment(bytes.len(), self.format.frame_size(self.channels as usize))?;
        if self.lifecycle.state().is_configured() {
            self.start()?;
        }
        self.lifecycle.write(bytes)
    }

    /// Signal end of input and wait for the encoder to finalize the file.
    fn close(&mut self) -> Result<(), PipeError> {
        let status = self.lifecycle.finish(CloseReason::Requested)?;
        match status {
            Some(status) if !status.success() && self.lifecycle.state() == StreamState::Closed(CloseReason::Requested) => {
                Err(PipeError::tool_failed(
                    FFMPEG,
                    format!("encoding {} exited with {}", self.filename, status),
                ))
            }
            _ => Ok(()),
        }
    }
}

impl Drop for AudioWriter {
    fn drop(&mut self) {
        if self.lifecycle.state().is_streaming() {
            if let Err(e) = self.close() {
                log::error!("failed to finalize {}: {}", self.filename, e);
            }
        }
    }
}
