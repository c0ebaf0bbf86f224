use thiserror::Error;

/// Errors that can occur while configuring or streaming audio through an
/// external tool.
///
/// Configuration-time variants are returned before any subprocess is
/// started; I/O-time variants come from the read/write call that hit them.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PipeError {
    #[error("{tool} is not installed or not usable")]
    ToolUnavailable { tool: String },

    #[error("{tool} failed: {message}")]
    ToolFailed { tool: String, message: String },

    #[error("file {0} does not exist")]
    TargetNotFound(String),

    #[error("audio format {0} is not supported, must be one of u8, s8, u16, s16, u24, s24, u32, s32, f32, or f64")]
    UnsupportedFormat(String),

    #[error("unsupported platform: {0}")]
    UnsupportedPlatform(String),

    #[error("no {class} streams found in {target}")]
    NoMatchingStream { target: String, class: String },

    #[error("invalid stream index: {index}, must be between 0 and {available}")]
    InvalidStreamIndex { index: usize, available: usize },

    #[error("could not find device with index: {0}")]
    DeviceNotFound(usize),

    #[error("buffer size {len} must be a multiple of {frame}")]
    BufferMisaligned { len: usize, frame: usize },

    #[error("invalid sample type: expected {expected}, got {actual}")]
    InvalidSampleType { expected: String, actual: String },

    #[error("pipe failure: {0}")]
    PipeFailure(String),

    #[error("configuration failed: {0}")]
    InvalidConfiguration(String),

    #[error("cancelled")]
    Cancelled,

    #[error("stream is closed")]
    Closed,
}

impl PipeError {
    pub fn tool_unavailable(tool: &str) -> Self {
        Self::ToolUnavailable { tool: tool.to_string() }
    }

    pub fn tool_failed(tool: &str, message: impl Into<String>) -> Self {
        Self::ToolFailed {
            tool: tool.to_string(),
            message: message.into(),
        }
    }

    /// True for errors raised before any subprocess is started.
    pub fn is_configuration_error(&self) -> bool {
        matches!(
            self,
            Self::ToolUnavailable { .. }
                | Self::TargetNotFound(_)
                | Self::UnsupportedFormat(_)
                | Self::UnsupportedPlatform(_)
                | Self::NoMatchingStream { .. }
                | Self::InvalidStreamIndex { .. }
                | Self::DeviceNotFound(_)
                | Self::InvalidConfiguration(_)
        )
    }
}

impl From<std::io::Error> for PipeError {
    fn from(e: std::io::Error) -> Self {
        Self::PipeFailure(e.to_string())
    }
}
