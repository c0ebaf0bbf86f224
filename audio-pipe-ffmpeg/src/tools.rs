//! Names of the external tools and the checks run before any of them is
//! spawned for real.

use std::path::Path;
use std::process::{Command, Stdio};

use audio_pipe_core::models::error::PipeError;

pub const FFMPEG: &str = "ffmpeg";
pub const FFPROBE: &str = "ffprobe";
pub const FFPLAY: &str = "ffplay";

/// Fails with `ToolUnavailable` unless `<tool> -version` starts and exits
/// successfully.
pub fn ensure_installed(tool: &str) -> Result<(), PipeError> {
    let status = Command::new(tool)
        .arg("-version")
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status();

    match status {
        Ok(status) if status.success() => Ok(()),
        Ok(status) => {
            log::debug!("{} -version exited with {}", tool, status);
            Err(PipeError::tool_unavailable(tool))
        }
        Err(e) => {
            log::debug!("failed to start {}: {}", tool, e);
            Err(PipeError::tool_unavailable(tool))
        }
    }
}

pub fn is_installed(tool: &str) -> bool {
    ensure_installed(tool).is_ok()
}

/// Fails with `TargetNotFound` when `path` does not exist.
pub fn ensure_exists(path: &str) -> Result<(), PipeError> {
    if Path::new(path).exists() {
        Ok(())
    } else {
        Err(PipeError::TargetNotFound(path.to_string()))
    }
}

/// Input device family the capture tool reads microphones through.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureBackend {
    /// PulseAudio (Linux). Devices are addressed by index.
    Pulse,
    /// AVFoundation (macOS). Devices are addressed as `:<index>`.
    AvFoundation,
    /// DirectShow (Windows). Devices are addressed as `audio=<name>`.
    DirectShow,
}

impl CaptureBackend {
    /// Backend for the platform this crate was built for.
    pub fn current() -> Result<Self, PipeError> {
        Self::for_os(std::env::consts::OS)
    }

    pub fn for_os(os: &str) -> Result<Self, PipeError> {
        match os {
            "linux" => Ok(Self::Pulse),
            "macos" => Ok(Self::AvFoundation),
            "windows" => Ok(Self::DirectShow),
            other => Err(PipeError::UnsupportedPlatform(other.to_string())),
        }
    }

    /// Value passed to the capture tool's `-f` flag.
    pub fn input_format(self) -> &'static str {
        match self {
            Self::Pulse => "pulse",
            Self::AvFoundation => "avfoundation",
            Self::DirectShow => "dshow",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_tool_is_unavailable() {
        assert_eq!(
            ensure_installed("audio-pipe-no-such-tool"),
            Err(PipeError::tool_unavailable("audio-pipe-no-such-tool"))
        );
    }

    #[test]
    fn missing_target() {
        let path = std::env::temp_dir().join("audio-pipe-missing-target.wav");
        let path = path.to_string_lossy().to_string();
        assert_eq!(ensure_exists(&path), Err(PipeError::TargetNotFound(path.clone())));
        assert!(ensure_exists(&std::env::temp_dir().to_string_lossy()).is_ok());
    }

    #[test]
    fn backend_per_platform() {
        assert_eq!(CaptureBackend::for_os("linux"), Ok(CaptureBackend::Pulse));
        assert_eq!(CaptureBackend::for_os("macos").map(|b| b.input_format()), Ok("avfoundation"));
        assert_eq!(CaptureBackend::for_os("windows").map(|b| b.input_format()), Ok("dshow"));
        assert_eq!(
            CaptureBackend::for_os("freebsd"),
            Err(PipeError::UnsupportedPlatform("freebsd".into()))
        );
    }
}
