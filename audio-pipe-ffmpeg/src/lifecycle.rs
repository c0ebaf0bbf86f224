//! Lifecycle shared by every stream handle.
//!
//! A handle owns one [`StreamLifecycle`]: it gates I/O on the handle state,
//! spawns the pipeline on demand and turns short reads, failures and
//! cancellation into the matching `Closed` reason. The pipeline is torn
//! down when the lifecycle is dropped.

use std::process::ExitStatus;

use audio_pipe_core::models::error::PipeError;
use audio_pipe_core::models::state::{CloseReason, StreamState};
use audio_pipe_core::processing::sample_codec::SampleBuffer;
use audio_pipe_core::session::cancellation::CancellationToken;

use crate::pipeline::{PipeEnd, ProcessPipeline};

/// Close reason for a handle whose I/O failed with `error`.
pub(crate) fn reason_for(error: &PipeError) -> CloseReason {
    match error {
        PipeError::Cancelled => CloseReason::Cancelled,
        _ => CloseReason::Failed,
    }
}

pub(crate) struct StreamLifecycle {
    tool: &'static str,
    end: PipeEnd,
    kill_on_close: bool,
    command: Option<(String, Vec<String>)>,
    token: Option<CancellationToken>,
    pipeline: Option<ProcessPipeline>,
    state: StreamState,
}

impl StreamLifecycle {
    pub(crate) fn new(tool: &'static str, end: PipeEnd) -> Self {
        Self {
            tool,
            end,
            kill_on_close: false,
            command: None,
            token: None,
            pipeline: None,
            state: StreamState::Configured,
        }
    }

    /// Kill instead of waiting when the handle closes.
    pub(crate) fn kill_on_close(mut self) -> Self {
        self.kill_on_close = true;
        self
    }

    /// Run `program args` instead of the tool and the handle's arguments.
    #[cfg(test)]
    pub(crate) fn set_command(&mut self, program: &str, args: &[&str]) {
        let args = args.iter().map(|arg| arg.to_string()).collect();
        self.command = Some((program.to_string(), args));
    }

    pub(crate) fn set_cancellation(&mut self, token: CancellationToken) {
        self.token = Some(token);
    }

    pub(crate) fn state(&self) -> StreamState {
        self.state
    }

    fn ensure_open(&self) -> Result<(), PipeError> {
        match self.state {
            StreamState::Closed(CloseReason::Cancelled) => Err(PipeError::Cancelled),
            StreamState::Closed(_) => Err(PipeError::Closed),
            _ => Ok(()),
        }
    }

    /// Spawn the pipeline with `args` unless already streaming.
    pub(crate) fn start(&mut self, args: Vec<String>) -> Result<(), PipeError> {
        self.ensure_open()?;
        if self.state.is_streaming() {
            return Ok(());
        }

        let (program, args) = match self.command.clone() {
            Some(command) => command,
            None => (self.tool.to_string(), args),
        };
        let mut pipeline = ProcessPipeline::new(&program, args, self.end);
        if let Some(token) = &self.token {
            pipeline = pipeline.with_cancellation(token.clone());
        }
        if let Err(e) = pipeline.start() {
            self.state.close(reason_for(&e));
            return Err(e);
        }

        self.pipeline = Some(pipeline);
        self.state = StreamState::Streaming;
        Ok(())
    }

    /// Refill `buffer` from the started pipeline.
    ///
    /// An empty buffer is replaced by `default_len` zero bytes first. A short
    /// read truncates the buffer and closes the handle; an empty buffer or a
    /// read after end-of-stream returns `Ok(false)`.
    pub(crate) fn read(&mut self, buffer: &mut SampleBuffer, default_len: usize) -> Result<bool, PipeError> {
        if self.state == StreamState::Closed(CloseReason::EndOfStream) {
            return Ok(false);
        }
        self.ensure_open()?;
        if buffer.is_empty() {
            *buffer = SampleBuffer::zeroed(default_len);
        }
        let wanted = buffer.len();
        if wanted == 0 {
            self.finish(CloseReason::EndOfStream)?;
            return Ok(false);
        }

        let Some(pipeline) = self.pipeline.as_mut() else {
            return Err(PipeError::Closed);
        };
        let filled = match pipeline.read_full(buffer.as_bytes_mut()) {
            Ok(filled) => filled,
            Err(e) => {
                self.finish_logged(reason_for(&e));
                return Err(e);
            }
        };
        if filled == wanted {
            return Ok(true);
        }

        let reason = if pipeline.was_cancelled() {
            CloseReason::Cancelled
        } else {
            CloseReason::EndOfStream
        };
        buffer.truncate(filled);
        if let Some(status) = self.finish(reason)? {
            if reason == CloseReason::EndOfStream && !status.success() {
                log::warn!("{} ended its stream with {}", self.tool, status);
            }
        }
        Ok(filled > 0)
    }

    /// Send `bytes` to the started pipeline.
    pub(crate) fn write(&mut self, bytes: &[u8]) -> Result<(), PipeError> {
        self.ensure_open()?;
        let Some(pipeline) = self.pipeline.as_mut() else {
            return Err(PipeError::Closed);
        };
        if let Err(e) = pipeline.write_all(bytes) {
            self.finish_logged(reason_for(&e));
            return Err(e);
        }
        Ok(())
    }

    /// Tear the pipeline down and move to `Closed`.
    ///
    /// The reason becomes `Cancelled` when the token killed the process.
    /// Returns the exit status when a process was running.
    pub(crate) fn finish(&mut self, reason: CloseReason) -> Result<Option<ExitStatus>, PipeError> {
        let Some(mut pipeline) = self.pipeline.take() else {
            self.state.close(reason);
            return Ok(None);
        };
        let status = if self.kill_on_close {
            pipeline.kill()
        } else {
            pipeline.close()
        };
        let reason = if pipeline.was_cancelled() { CloseReason::Cancelled } else { reason };
        self.state.close(reason);
        status
    }

    // Keeps the I/O error that triggered the teardown as the one reported.
    fn finish_logged(&mut self, reason: CloseReason) {
        if let Err(e) = self.finish(reason) {
            log::warn!("failed to tear down {}: {}", self.tool, e);
        }
    }
}

impl Drop for StreamLifecycle {
    fn drop(&mut self) {
        if self.pipeline.is_some() {
            if let Err(e) = self.finish(CloseReason::Requested) {
                log::error!("failed to close {}: {}", self.tool, e);
            }
        }
    }
}
