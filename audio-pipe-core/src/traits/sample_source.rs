use crate::models::error::PipeError;
use crate::models::format::AudioFormat;
use crate::models::state::StreamState;
use crate::processing::sample_codec::{self, SampleBuffer, Samples};

/// A stream handle that delivers interleaved samples from an external tool.
///
/// Implemented by the file reader and the microphone reader. Each `read`
/// refills the handle's buffer; a short final read shrinks the buffer to
/// the bytes actually delivered and ends the stream.
pub trait SampleSource: Send {
    fn format(&self) -> AudioFormat;

    fn sample_rate(&self) -> u32;

    fn channels(&self) -> u16;

    fn state(&self) -> StreamState;

    /// Fill the buffer with the next chunk of audio.
    ///
    /// Returns `Ok(false)` once nothing more was delivered.
    fn read(&mut self) -> Result<bool, PipeError>;

    /// Bytes delivered by the last `read`.
    fn buffer(&self) -> &[u8];

    /// Replace the read buffer. Its length must be a whole number of frames.
    fn set_buffer(&mut self, buffer: SampleBuffer) -> Result<(), PipeError>;

    fn close(&mut self) -> Result<(), PipeError>;

    /// Bytes per interleaved frame.
    fn frame_size(&self) -> usize {
        self.format().frame_size(self.channels() as usize)
    }

    /// Typed view over the current buffer.
    fn samples(&self) -> Result<Samples<'_>, PipeError> {
        let format = self.format();
        let buffer = self.buffer();
        sample_codec::bytes_to_samples(buffer, buffer.len() / format.bytes_per_sample(), &format)
    }
}
