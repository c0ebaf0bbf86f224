//! Live capture from a system microphone.

use audio_pipe_core::models::config::StreamOptions;
use audio_pipe_core::models::error::PipeError;
use audio_pipe_core::models::format::AudioFormat;
use audio_pipe_core::models::state::{CloseReason, StreamState};
use audio_pipe_core::processing::device_parser::CaptureProperties;
use audio_pipe_core::processing::sample_codec::SampleBuffer;
use audio_pipe_core::session::cancellation::CancellationToken;
use audio_pipe_core::traits::sample_source::SampleSource;

use crate::device_enumerator::DeviceEnumerator;
use crate::lifecycle::StreamLifecycle;
use crate::pipeline::PipeEnd;
use crate::tools::{self, CaptureBackend, FFMPEG};

/// Raw samples captured from the device at a given index.
///
/// The capture process runs until the handle is closed; a microphone never
/// reaches end-of-stream on its own.
pub struct Microphone {
    device: String,
    backend: CaptureBackend,
    format: AudioFormat,
    sample_rate: u32,
    channels: u16,
    buffer: SampleBuffer,
    lifecycle: StreamLifecycle,
}

impl Microphone {
    /// Open the device at `index`, reading its default rate and channel
    /// count from the capture tool unless `options` override them.
    pub fn open(index: usize, options: &StreamOptions) -> Result<Self, PipeError> {
        options.validate()?;
        let format = options.audio_format()?;
        tools::ensure_installed(FFMPEG)?;

        let enumerator = DeviceEnumerator::new()?;
        let device = enumerator.device_input(index)?;
        let properties = enumerator.capture_properties(&device)?;
        Self::with_properties(device, enumerator.backend(), format, properties, options)
    }

    /// Fails when neither the device nor `options` give a channel count.
    fn with_properties(
        device: String,
        backend: CaptureBackend,
        format: AudioFormat,
        properties: CaptureProperties,
        options: &StreamOptions,
    ) -> Result<Self, PipeError> {
        let sample_rate = if options.sample_rate == 0 { properties.sample_rate } else { options.sample_rate };
        let channels = if options.channels == 0 { properties.channels } else { options.channels };
        if channels == 0 {
            return Err(PipeError::InvalidConfiguration(format!(
                "device {} reports no channel count; set it in the options",
                device
            )));
        }

        Ok(Self {
            device,
            backend,
            format,
            sample_rate,
            channels,
            buffer: SampleBuffer::new(),
            // Capture never ends by itself, so closing means killing.
            lifecycle: StreamLifecycle::new(FFMPEG, PipeEnd::Stdout).kill_on_close(),
        })
    }

    /// Kill the capture process when `token` is cancelled.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.lifecycle.set_cancellation(token);
        self
    }

    /// Device input handed to the capture tool.
    pub fn name(&self) -> &str {
        &self.device
    }

    pub fn bits_per_sample(&self) -> usize {
        self.format.bits_per_sample()
    }

    fn pipeline_args(&self) -> Vec<String> {
        vec![
            "-hide_banner".into(),
            "-loglevel".into(),
            "quiet".into(),
            "-f".into(),
            self.backend.input_format().into(),
            "-i".into(),
            self.device.clone(),
            "-f".into(),
            self.format.token(),
            "-acodec".into(),
            self.format.pcm_codec(),
            "-ar".into(),
            self.sample_rate.to_string(),
            "-ac".into(),
            self.channels.to_string(),
            "-".into(),
        ]
    }

    fn default_buffer_len(&self) -> usize {
        (self.sample_rate as usize).max(1) * self.frame_size()
    }

    /// Spawn the capture process. Does nothing when already streaming.
    pub fn start(&mut self) -> Result<(), PipeError> {
        let args = self.pipeline_args();
        self.lifecycle.start(args)
    }
}

impl SampleSource for Microphone {
    fn format(&self) -> AudioFormat {
        self.format
    }

    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    fn channels(&self) -> u16 {
        self.channels
    }

    fn state(&self) -> StreamState {
        self.lifecycle.state()
    }

    fn read(&mut self) -> Result<bool, PipeError> {
        if self.lifecycle.state().is_configured() {
            self.start()?;
        }
        let ended = StreamState::Closed(CloseReason::EndOfStream);
        let was_ended = self.lifecycle.state() == ended;
        let default_len = self.default_buffer_len();
        let result = self.lifecycle.read(&mut self.buffer, default_len);
        if !was_ended && self.lifecycle.state() == ended {
            log::warn!("capture from {} ended unexpectedly", self.device);
        }
        result
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
        self.lifecycle.finish(CloseReason::Requested).map(|_| ())
    }
}
