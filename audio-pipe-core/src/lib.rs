//! # audio-pipe-core
//!
//! Platform-agnostic core of the audio pipe: the parts that do not spawn
//! processes.
//!
//! Provides the sample format catalog, zero-copy conversion between byte
//! buffers and typed sample views, and parsers for the free-form text the
//! external tools print. The `audio-pipe-ffmpeg` crate runs the tools and
//! builds stream handles on top of these pieces.
//!
//! ## Architecture
//!
//! ```text
//! audio-pipe-core (this crate)
//! ├── models/       ← PipeError, AudioFormat, StreamOptions, StreamState, StreamMetadata
//! ├── processing/   ← SampleBuffer + Samples codec, probe output parser, device listing parser
//! ├── session/      ← CancellationToken
//! └── traits/       ← SampleSource, SampleSink
//! ```

pub mod models;
pub mod processing;
pub mod session;
pub mod traits;

// Re-export key types at crate root for convenience.
pub use models::config::StreamOptions;
pub use models::error::PipeError;
pub use models::format::{AudioFormat, Endianness, SampleKind};
pub use models::state::{CloseReason, StreamState};
pub use models::stream_info::{AudioStreamInfo, DeviceDescriptor, StreamClass, StreamMetadata};
pub use processing::device_parser::CaptureProperties;
pub use processing::sample_codec::{bytes_to_samples, samples_to_bytes, ElementType, SampleBuffer, Samples};
pub use session::cancellation::{CancellationToken, HookId};
pub use traits::sample_sink::SampleSink;
pub use traits::sample_source::SampleSource;
