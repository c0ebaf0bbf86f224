//! # audio-pipe-ffmpeg
//!
//! Stream handles that move raw audio through the FFmpeg command-line tools.
//!
//! Provides:
//! - `AudioReader`: decoded samples from any audio stream of a media file
//! - `AudioWriter`: encodes written samples into a media file, optionally
//!   muxed with a video
//! - `Microphone`: live capture through PulseAudio, AVFoundation or DirectShow
//! - `Player` / `play_file`: playback of raw samples or media files
//! - `DeviceEnumerator`: capture device listing and property discovery
//! - `probe`: stream metadata via `ffprobe`
//!
//! ## Requirements
//! `ffmpeg`, `ffprobe` and `ffplay` on `PATH`. Their presence is checked
//! when a handle is opened.
//!
//! ## Usage
//! ```ignore
//! use audio_pipe_core::{CancellationToken, SampleSource, StreamOptions};
//! use audio_pipe_ffmpeg::{signals, AudioReader};
//!
//! let token = CancellationToken::new();
//! signals::cancel_on_interrupt(token.clone(), Some(1))?;
//!
//! let mut reader = AudioReader::open("song.mp3", &StreamOptions::default())?
//!     .with_cancellation(token);
//! while reader.read()? {
//!     let samples = reader.samples()?;
//! }
//! ```

pub mod audio_reader;
pub mod audio_writer;
pub mod device_enumerator;
mod lifecycle;
pub mod microphone;
pub mod pipeline;
pub mod player;
pub mod probe;
pub mod signals;
pub mod tools;

#[cfg(test)]
mod test_support;

pub use audio_reader::AudioReader;
pub use audio_writer::AudioWriter;
pub use device_enumerator::DeviceEnumerator;
pub use microphone::Microphone;
pub use pipeline::{PipeEnd, ProcessPipeline};
pub use player::{play_file, Player};
pub use tools::CaptureBackend;
