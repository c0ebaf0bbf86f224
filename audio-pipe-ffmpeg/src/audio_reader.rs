//! Decoded audio streams read out of media files.
//!
//! The decoder converts to the requested sample format, rate and channel
//! count and writes raw interleaved samples to its standard output, which
//! the reader consumes one buffer at a time.

use audio_pipe_core::models::config::StreamOptions;
use audio_pipe_core::models::error::PipeError;
use audio_pipe_core::models::format::AudioFormat;
use audio_pipe_core::models::state::{CloseReason, StreamState};
use audio_pipe_core::models::stream_info::{self, AudioStreamInfo, StreamClass, StreamMetadata};
use audio_pipe_core::processing::sample_codec::SampleBuffer;
use audio_pipe_core::session::cancellation::CancellationToken;
use audio_pipe_core::traits::sample_source::SampleSource;

use crate::lifecycle::StreamLifecycle;
use crate::pipeline::PipeEnd;
use crate::probe;
use crate::tools::{self, FFMPEG, FFPROBE};

/// One audio stream of a media file.
///
/// Opening only probes the file; the decoder starts on `start` or on the
/// first `read`. Each successful `read` replaces the buffer contents with
/// the next chunk. Without a caller-supplied buffer, one second of audio is
/// read per call.
pub struct AudioReader {
    filename: String,
    stream: usize,
    format: AudioFormat,
    info: AudioStreamInfo,
    has_streams: bool,
    metadata: StreamMetadata,
    buffer: SampleBuffer,
    lifecycle: StreamLifecycle,
}

impl AudioReader {
    /// Open the audio stream selected by `options.stream`.
    pub fn open(filename: &str, options: &StreamOptions) -> Result<Self, PipeError> {
        let mut streams = Self::open_all(filename, options)?;
        let available = streams.len();
        if options.stream >= available {
            return Err(PipeError::InvalidStreamIndex {
                index: options.stream,
                available,
            });
        }
        Ok(streams.swap_remove(options.stream))
    }

    /// Open every audio stream in `filename`, in file order.
    pub fn open_all(filename: &str, options: &StreamOptions) -> Result<Vec<Self>, PipeError> {
        options.validate()?;
        let format = options.audio_format()?;
        tools::ensure_exists(filename)?;
        tools::ensure_installed(FFMPEG)?;
        tools::ensure_installed(FFPROBE)?;

        let records = probe::probe(filename, StreamClass::Audio)?;
        if records.is_empty() {
            return Err(PipeError::NoMatchingStream {
                target: filename.to_string(),
                class: StreamClass::Audio.to_string(),
            });
        }
        let has_streams = probe::has_non_audio_streams(filename)?;
        log::debug!("{}: {} audio stream(s), other streams: {}", filename, records.len(), has_streams);

        records
            .into_iter()
            .enumerate()
            .map(|(stream, metadata)| Self::from_metadata(filename, stream, metadata, format, has_streams, options))
            .collect()
    }

    /// Fails when neither the probe nor `options` give a usable sample rate
    /// and channel count.
    fn from_metadata(
        filename: &str,
        stream: usize,
        metadata: StreamMetadata,
        format: AudioFormat,
        has_streams: bool,
        options: &StreamOptions,
    ) -> Result<Self, PipeError> {
        let mut info = AudioStreamInfo::from_metadata(&metadata);
        if options.sample_rate != 0 {
            info.sample_rate = options.sample_rate;
        }
        if options.channels != 0 {
            info.channels = options.channels;
        }
        if info.sample_rate == 0 || info.channels == 0 {
            return Err(PipeError::InvalidConfiguration(format!(
                "audio stream {} of {} reports {} Hz and {} channel(s); set them in the options",
                stream, filename, info.sample_rate, info.channels
            )));
        }

        Ok(Self {
            filename: filename.to_string(),
            stream,
            format,
            info,
            has_streams,
            metadata,
            buffer: SampleBuffer::new(),
            lifecycle: StreamLifecycle::new(FFMPEG, PipeEnd::Stdout),
        })
    }

    /// Kill the decoder when `token` is cancelled.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.lifecycle.set_cancellation(token);
        self
    }

    pub fn filename(&self) -> &str {
        &self.filename
    }

    /// Index of this stream among the file's audio streams.
    pub fn stream(&self) -> usize {
        self.stream
    }

    /// Source bitrate in bits/s as probed.
    pub fn bitrate(&self) -> u32 {
        self.info.bitrate
    }

    /// Duration in seconds.
    pub fn duration(&self) -> f64 {
        self.info.duration_secs
    }

    pub fn codec(&self) -> &str {
        &self.info.codec
    }

    pub fn bits_per_sample(&self) -> usize {
        self.format.bits_per_sample()
    }

    /// Whether the file also carries video, subtitle, data or attachment
    /// streams.
    pub fn has_streams(&self) -> bool {
        self.has_streams
    }

    /// Raw probe record for this stream.
    pub fn metadata(&self) -> &StreamMetadata {
        &self.metadata
    }

    /// Size in bytes of the whole decoded stream, rounded up to a frame.
    pub fn total(&self) -> usize {
        stream_info::stream_size_bytes(self.info.sample_rate, self.frame_size(), self.info.duration_secs)
    }

    fn pipeline_args(&self) -> Vec<String> {
        vec![
            "-i".into(),
            self.filename.clone(),
            "-f".into(),
            self.format.token(),
            "-ar".into(),
            self.info.sample_rate.to_string(),
            "-ac".into(),
            self.info.channels.to_string(),
            "-map".into(),
            format!("0:a:{}", self.stream),
            "-loglevel".into(),
            "quiet".into(),
            "-".into(),
        ]
    }

    fn default_buffer_len(&self) -> usize {
        self.info.sample_rate as usize * self.frame_size()
    }

    /// Spawn the decoder. Does nothing when already streaming.
    pub fn start(&mut self) -> Result<(), PipeError> {
        let args = self.pipeline_args();
        self.lifecycle.start(args)
    }
}

impl SampleSource for AudioReader {
    fn format(&self) -> AudioFormat {
        self.format
    }

    fn sample_rate(&self) -> u32 {
        self.info.sample_rate
    }

    fn channels(&self) -> u16 {
        self.info.channels
    }

    fn state(&self) -> StreamState {
        self.lifecycle.state()
    }

    fn read(&mut self) -> Result<bool, PipeError> {
        if self.lifecycle.state().is_configured() {
            self.start()?;
        }
        let default_len = self.default_buffer_len();
        self.lifecycle.read(&mut self.buffer, default_len)
    }

    fn buffer(&self) -> &[u8] {
        self.buffer.as_bytes()
    }

    fn set_buffer(&mut self, buffer: SampleBuffer) -> Result<(), PipeError> {
        buffer.check_alignment(self.frame_size())?;
        self.buffer = buffer;
        Ok(())
    }

    fn close(&mut self) -> Result<(), PipeError> {
        // An early close breaks the decoder's pipe; its exit status is moot.
        self.lifecycle.finish(CloseReason::Requested).map(|_| ())
    }
}
