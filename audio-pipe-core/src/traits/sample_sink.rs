use crate::models::error::PipeError;
use crate::models::format::AudioFormat;
use crate::processing::sample_codec::{self, Samples};

/// A stream handle that feeds interleaved samples to an external tool.
///
/// Implemented by the file writer and the raw-sample player.
pub trait SampleSink: Send {
    fn format(&self) -> AudioFormat;

    fn sample_rate(&self) -> u32;

    fn channels(&self) -> u16;

    /// Send raw bytes; the length must be a whole number of frames.
    fn write(&mut self, bytes: &[u8]) -> Result<(), PipeError>;

    /// Flush and wait for the tool to finish.
    fn close(&mut self) -> Result<(), PipeError>;

    /// Send a typed view whose element type matches the sink's format.
    fn write_samples(&mut self, samples: Samples<'_>) -> Result<(), PipeError> {
        let format = self.format();
        let bytes = sample_codec::samples_to_bytes_for(samples, &format)?;
        self.write(bytes)
    }
}
