//! Playback through the player tool, either from raw samples or directly
//! from a media file.

use audio_pipe_core::models::error::PipeError;
use audio_pipe_core::models::format::AudioFormat;
use audio_pipe_core::models::state::{CloseReason, StreamState};
use audio_pipe_core::processing::sample_codec;
use audio_pipe_core::session::cancellation::CancellationToken;
use audio_pipe_core::traits::sample_sink::SampleSink;

use crate::lifecycle::StreamLifecycle;
use crate::pipeline::{PipeEnd, ProcessPipeline};
use crate::tools::{self, FFPLAY};

/// Plays interleaved samples as they are written.
///
/// The player process starts with the first `play` and exits once `close`
/// has flushed everything written so far.
pub struct Player {
    format: AudioFormat,
    sample_rate: u32,
    channels: u16,
    lifecycle: StreamLifecycle,
}

impl Player {
    pub fn new(channels: u16, sample_rate: u32, format: &str) -> Result<Self, PipeError> {
        let format = AudioFormat::normalize_native(format)?;
        if channels == 0 || sample_rate == 0 {
            return Err(PipeError::InvalidConfiguration(format!(
                "cannot play {} channel(s) at {} Hz",
                channels, sample_rate
            )));
        }
        tools::ensure_installed(FFPLAY)?;
        Ok(Self::with_format(channels, sample_rate, format))
    }

    fn with_format(channels: u16, sample_rate: u32, format: AudioFormat) -> Self {
        Self {
            format,
            sample_rate,
            channels,
            lifecycle: StreamLifecycle::new(FFPLAY, PipeEnd::Stdin),
        }
    }

    /// Kill the player when `token` is cancelled.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.lifecycle.set_cancellation(token);
        self
    }

    pub fn state(&self) -> StreamState {
        self.lifecycle.state()
    }

    fn pipeline_args(&self) -> Vec<String> {
        vec![
            "-f".into(),
            self.format.token(),
            "-ac".into(),
            self.channels.to_string(),
            "-ar".into(),
            self.sample_rate.to_string(),
            "-i".into(),
            "-".into(),
            "-nodisp".into(),
            "-autoexit".into(),
            "-loglevel".into(),
            "quiet".into(),
        ]
    }

    /// Spawn the player. Does nothing when already streaming.
    pub fn start(&mut self) -> Result<(), PipeError> {
        let args = self.pipeline_args();
        self.lifecycle.start(args)
    }

    /// Queue `bytes` for playback; blocks while the player's input is full.
    pub fn play(&mut self, bytes: &[u8]) -> Result<(), PipeError> {
        self.write(bytes)
    }
}

impl SampleSink for Player {
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

    /// Wait until everything written has been played.
    fn close(&mut self) -> Result<(), PipeError> {
        self.lifecycle.finish(CloseReason::Requested).map(|_| ())
    }
}

fn play_file_args(filename: &str) -> Vec<String> {
    ["-i", filename, "-nodisp", "-autoexit", "-loglevel", "quiet"]
        .into_iter()
        .map(String::from)
        .collect()
}

/// Play a media file and block until playback ends.
///
/// With a token, cancelling it stops playback early and returns
/// `Cancelled`.
pub fn play_file(filename: &str, token: Option<&CancellationToken>) -> Result<(), PipeError> {
    tools::ensure_exists(filename)?;
    tools::ensure_installed(FFPLAY)?;

    let mut pipeline = ProcessPipeline::new(FFPLAY, play_file_args(filename), PipeEnd::Stderr);
    if let Some(token) = token {
        pipeline = pipeline.with_cancellation(token.clone());
    }
    // Quiet logging leaves the diagnostic stream empty; it closes on exit.
    pipeline.read_to_string()?;
    let status = pipeline.close()?;

    if pipeline.was_cancelled() {
        return Err(PipeError::Cancelled);
    }
    match status {
        Some(status) if !status.success() => Err(PipeError::tool_failed(
            FFPLAY,
            format!("playing {} exited with {}", filename, status),
        )),
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use audio_pipe_core::processing::sample_codec::Samples;

    #[test]
    fn player_arguments() {
        let player = Player::with_format(2, 44100, AudioFormat::parse("f32le").unwrap());
        assert_eq!(
            player.pipeline_args().join(" "),
            "-f f32le -ac 2 -ar 44100 -i - -nodisp -autoexit -loglevel quiet"
        );
        assert_eq!(player.state(), StreamState::Configured);
    }

    #[test]
    fn file_playback_arguments() {
        assert_eq!(
            play_file_args("song.mp3").join(" "),
            "-i song.mp3 -nodisp -autoexit -loglevel quiet"
        );
    }

    #[test]
    fn rejects_unknown_formats_and_empty_layouts() {
        assert_eq!(
            Player::new(2, 44100, "mulaw").err(),
            Some(PipeError::UnsupportedFormat("mulaw".into()))
        );
        assert!(matches!(
            Player::new(0, 44100, "s16"),
            Err(PipeError::InvalidConfiguration(_))
        ));
    }

    #[test]
    fn writes_are_checked_before_starting() {
        let mut player = Player::with_format(2, 44100, AudioFormat::native_s16());
        assert!(matches!(player.play(&[0u8; 3]), Err(PipeError::BufferMisaligned { .. })));
        let doubles = [0.0f64; 2];
        assert!(matches!(
            player.write_samples(Samples::from(&doubles[..])),
            Err(PipeError::InvalidSampleType { .. })
        ));
        assert_eq!(player.state(), StreamState::Configured);
    }

    #[cfg(unix)]
    #[test]
    fn close_waits_for_queued_samples() {
        let output = crate::test_support::temp_path("scripted-player.raw");
        let mut player = Player::with_format(1, 8000, AudioFormat::native_s16());
        player
            .lifecycle
            .set_command("sh", &["-c", &format!("cat > '{}'", output.display())]);

        player.play(&[1, 2, 3, 4]).unwrap();
        assert!(player.state().is_streaming());
        player.close().unwrap();

        assert_eq!(player.state(), StreamState::Closed(CloseReason::Requested));
        assert_eq!(std::fs::read(&output).unwrap(), [1, 2, 3, 4]);
        assert_eq!(player.play(&[0u8; 2]), Err(PipeError::Closed));
        let _ = std::fs::remove_file(&output);
    }

    #[cfg(unix)]
    #[test]
    fn cancelled_player_rejects_writes() {
        let token = CancellationToken::new();
        let mut player = Player::with_format(1, 8000, AudioFormat::native_s16()).with_cancellation(token.clone());
        player.lifecycle.set_command("sleep", &["5"]);
        player.start().unwrap();

        token.cancel();
        assert!(player.play(&vec![0u8; 1 << 20]).is_err());
        assert_eq!(player.state(), StreamState::Closed(CloseReason::Cancelled));
        assert_eq!(player.play(&[0u8; 2]), Err(PipeError::Cancelled));
    }

    #[test]
    fn missing_file_is_not_played() {
        let path = crate::test_support::temp_path("missing-song.mp3").to_string_lossy().into_owned();
        assert_eq!(play_file(&path, None), Err(PipeError::TargetNotFound(path)));
    }
}
